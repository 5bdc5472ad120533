//! This module provides a struct for representing reactions
use std::fmt::{Display, Formatter};

use derive_builder::Builder;
use indexmap::{IndexMap, IndexSet};

use crate::configuration;
use crate::io::gpr_parse::{parse_gpr_rule, GprParseError};
use crate::metabolic_model::error::ModelError;
use crate::metabolic_model::gene::Gpr;
use crate::metabolic_model::registry::Entity;
use crate::optimize::expression::LinearExpression;
use crate::utils::hashing::hash_as_hex_string;

/// Represents a reaction in the metabolic model
///
/// Net flux through the reaction is represented in the optimization problem by two
/// non-negative variables, forward and reverse, with flux = forward - reverse.
///
/// # Examples
/// ```rust
/// use cobrars_model::metabolic_model::reaction::ReactionBuilder;
/// let pgi = ReactionBuilder::default()
///     .id("PGI")
///     .metabolite("g6p_c", -1.)
///     .metabolite("f6p_c", 1.)
///     .build()
///     .unwrap();
/// assert_eq!(pgi.bounds(), (-1000., 1000.));
/// assert_eq!(pgi.to_string(), "PGI: g6p_c <=> f6p_c");
/// ```
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct Reaction {
    /// Used to identify the reaction
    #[builder(setter(into))]
    pub id: String,
    /// Human-readable reaction name
    #[builder(setter(into, strip_option), default = "None")]
    pub name: Option<String>,
    /// Metabolite stoichiometry of the reaction, keyed by metabolite id
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Gene Protein Reaction rule to determine if reaction is active
    #[builder(setter(strip_option), default = "None")]
    pub gpr: Option<Gpr>,
    /// Lower flux bound
    #[builder(default = "configuration::current().lower_bound")]
    pub lower_bound: f64,
    /// Upper flux bound
    #[builder(default = "configuration::current().upper_bound")]
    pub upper_bound: f64,
    /// Coefficient of the reaction flux in the objective
    ///
    /// When the reaction belongs to a model this mirrors the model objective.
    #[builder(default = "0.")]
    pub(crate) objective_coefficient: f64,
    /// Reaction subsystem
    #[builder(setter(into, strip_option), default = "None")]
    pub subsystem: Option<String>,
    /// Notes about the reaction
    #[builder(setter(into, strip_option), default = "None")]
    pub notes: Option<String>,
    /// Reaction Annotations
    #[builder(default = "IndexMap::new()")]
    pub annotation: IndexMap<String, String>,
}

impl ReactionBuilder {
    /// Add a single metabolite to the stoichiometry, a zero coefficient removes it
    pub fn metabolite<S: Into<String>>(&mut self, id: S, coefficient: f64) -> &mut Self {
        let metabolites = self.metabolites.get_or_insert_with(IndexMap::new);
        let id = id.into();
        if coefficient == 0. {
            metabolites.shift_remove(&id);
        } else {
            metabolites.insert(id, coefficient);
        }
        self
    }

    fn validate(&self) -> Result<(), String> {
        if let (Some(lb), Some(ub)) = (self.lower_bound, self.upper_bound) {
            if lb > ub {
                return Err(format!(
                    "lower bound {} is greater than upper bound {}",
                    lb, ub
                ));
            }
        }
        Ok(())
    }
}

impl Reaction {
    /// Create a reaction without metabolites, using the configured default bounds
    pub fn new(id: &str) -> Reaction {
        let config = configuration::current();
        Reaction {
            id: id.to_string(),
            name: None,
            metabolites: IndexMap::new(),
            gpr: None,
            lower_bound: config.lower_bound,
            upper_bound: config.upper_bound,
            objective_coefficient: 0.,
            subsystem: None,
            notes: None,
            annotation: IndexMap::new(),
        }
    }

    // region Accessors
    pub fn bounds(&self) -> (f64, f64) {
        (self.lower_bound, self.upper_bound)
    }

    /// Stoichiometric coefficient of a metabolite, zero if it doesn't take part
    pub fn coefficient(&self, metabolite_id: &str) -> f64 {
        self.metabolites.get(metabolite_id).copied().unwrap_or(0.)
    }

    /// Ids of the consumed metabolites
    pub fn reactants(&self) -> Vec<&str> {
        self.metabolites
            .iter()
            .filter(|(_, coef)| **coef < 0.)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Ids of the produced metabolites
    pub fn products(&self) -> Vec<&str> {
        self.metabolites
            .iter()
            .filter(|(_, coef)| **coef > 0.)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Ids of the genes in the GPR
    pub fn genes(&self) -> IndexSet<String> {
        self.gpr.as_ref().map(|gpr| gpr.genes()).unwrap_or_default()
    }

    /// GPR rendered as a string, empty when the reaction has no GPR
    pub fn gene_reaction_rule(&self) -> String {
        self.gpr
            .as_ref()
            .map(|gpr| gpr.to_string())
            .unwrap_or_default()
    }

    pub fn objective_coefficient(&self) -> f64 {
        self.objective_coefficient
    }

    /// Whether the bounds allow flux in both directions
    pub fn reversibility(&self) -> bool {
        self.lower_bound < 0. && self.upper_bound > 0.
    }

    /// A boundary reaction only has a single metabolite
    pub fn is_boundary(&self) -> bool {
        self.metabolites.len() == 1
    }
    // endregion Accessors

    // region Standalone mutation
    /// Change the bounds of a reaction which isn't part of a model
    ///
    /// Reactions inside a model are changed through
    /// [`Model::set_reaction_bounds`](crate::metabolic_model::model::Model::set_reaction_bounds)
    /// so the optimization problem follows.
    pub fn set_bounds(&mut self, lower_bound: f64, upper_bound: f64) -> Result<(), ModelError> {
        if lower_bound > upper_bound {
            return Err(ModelError::InvalidBounds {
                id: self.id.clone(),
                lower_bound,
                upper_bound,
            });
        }
        self.lower_bound = lower_bound;
        self.upper_bound = upper_bound;
        Ok(())
    }

    /// Add metabolites to the stoichiometry
    ///
    /// With `combine` the coefficients are added to existing ones, otherwise they replace
    /// them. Coefficients which end up as zero remove the metabolite.
    pub fn add_metabolites<'a, I>(&mut self, metabolites: I, combine: bool)
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        for (met, coef) in metabolites {
            let new_coef = if combine {
                self.coefficient(met) + coef
            } else {
                coef
            };
            if new_coef == 0. {
                self.metabolites.shift_remove(met);
            } else if let Some(existing) = self.metabolites.get_mut(met) {
                *existing = new_coef;
            } else {
                self.metabolites.insert(met.to_string(), new_coef);
            }
        }
    }

    /// Parse and set the GPR of a reaction which isn't part of a model
    pub fn set_gene_reaction_rule(&mut self, rule: &str) -> Result<(), GprParseError> {
        self.gpr = parse_gpr_rule(rule)?;
        Ok(())
    }

    /// Builder style variant of [`Reaction::set_gene_reaction_rule`]
    pub fn with_gene_reaction_rule(mut self, rule: &str) -> Result<Reaction, GprParseError> {
        self.set_gene_reaction_rule(rule)?;
        Ok(self)
    }

    pub(crate) fn detached(&self) -> Reaction {
        self.clone()
    }
    // endregion Standalone mutation

    // region Optimization Variables
    /// Determine the id to be associated with the forward reaction in the optimization problem
    ///
    /// # Note:
    /// The forward id is "{reaction_id}_forward"
    pub fn get_forward_id(&self) -> String {
        forward_id(&self.id)
    }

    /// Determine the id to be associated with the reverse reaction in the optimization problem
    ///
    /// # Note:
    /// The reverse id is "{reaction_id}_reverse_{hexadecimal hash of reaction_id}"
    pub fn get_reverse_id(&self) -> String {
        reverse_id(&self.id)
    }

    /// Bounds of the forward variable
    pub(crate) fn forward_bounds(&self) -> (f64, f64) {
        (self.lower_bound.max(0.), self.upper_bound.max(0.))
    }

    /// Bounds of the reverse variable
    pub(crate) fn reverse_bounds(&self) -> (f64, f64) {
        ((-self.upper_bound).max(0.), (-self.lower_bound).max(0.))
    }

    /// Net flux as an expression over the forward and reverse variables
    pub fn flux_expression(&self) -> LinearExpression {
        flux_expression(&self.id)
    }
    // endregion Optimization Variables

    /// Equation form of the reaction, e.g. `g6p_c <=> f6p_c`
    pub fn reaction_string(&self) -> String {
        let side = |ids: Vec<&str>| -> String {
            ids.into_iter()
                .map(|id| {
                    let coef = self.coefficient(id).abs();
                    if coef == 1. {
                        id.to_string()
                    } else {
                        format!("{} {}", coef, id)
                    }
                })
                .collect::<Vec<_>>()
                .join(" + ")
        };
        let arrow = if self.reversibility() {
            "<=>"
        } else if self.upper_bound <= 0. && self.lower_bound < 0. {
            "<--"
        } else {
            "-->"
        };
        format!("{} {} {}", side(self.reactants()), arrow, side(self.products()))
            .trim()
            .to_string()
    }
}

pub(crate) fn forward_id(reaction_id: &str) -> String {
    format!("{}_forward", reaction_id)
}

pub(crate) fn reverse_id(reaction_id: &str) -> String {
    format!(
        "{}_reverse_{}",
        reaction_id,
        hash_as_hex_string(reaction_id)
    )
}

pub(crate) fn flux_expression(reaction_id: &str) -> LinearExpression {
    LinearExpression::from_terms([
        (forward_id(reaction_id), 1.),
        (reverse_id(reaction_id), -1.),
    ])
}

impl Entity for Reaction {
    const KIND: &'static str = "Reaction";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Display for Reaction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.id, self.reaction_string())
    }
}
