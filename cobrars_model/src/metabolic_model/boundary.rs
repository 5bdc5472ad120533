//! Boundary reactions: exchanges, demands and sinks
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use log::debug;

use crate::configuration;
use crate::metabolic_model::error::ModelError;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::{Reaction, ReactionBuilder};

/// SBO term of exchange reactions
pub const SBO_EXCHANGE: &str = "SBO:0000627";
/// SBO term of demand reactions
pub const SBO_DEMAND: &str = "SBO:0000628";
/// SBO term of sink reactions
pub const SBO_SINK: &str = "SBO:0000632";

/// Compartment ids and names commonly used for the extracellular space
const EXTERNAL_COMPARTMENTS: [&str; 11] = [
    "e",
    "extracellular",
    "extraorganism",
    "out",
    "extracellular space",
    "extra organism",
    "extra cellular",
    "extra-cellular",
    "external",
    "external medium",
    "c_e",
];

/// Kind of boundary reaction created by [`Model::add_boundary`]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BoundaryType {
    /// Reversible exchange with the medium, only for external metabolites
    Exchange,
    /// Irreversible removal of a metabolite
    Demand,
    /// Reversible supply or removal of an intracellular metabolite
    Sink,
    /// Any other kind, the reaction id has to be given explicitly
    Custom(String),
}

impl BoundaryType {
    fn prefix(&self) -> Option<&'static str> {
        match self {
            BoundaryType::Exchange => Some("EX_"),
            BoundaryType::Demand => Some("DM_"),
            BoundaryType::Sink => Some("SK_"),
            BoundaryType::Custom(_) => None,
        }
    }

    fn sbo_term(&self) -> Option<&'static str> {
        match self {
            BoundaryType::Exchange => Some(SBO_EXCHANGE),
            BoundaryType::Demand => Some(SBO_DEMAND),
            BoundaryType::Sink => Some(SBO_SINK),
            BoundaryType::Custom(_) => None,
        }
    }
}

impl Display for BoundaryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundaryType::Exchange => write!(f, "exchange"),
            BoundaryType::Demand => write!(f, "demand"),
            BoundaryType::Sink => write!(f, "sink"),
            BoundaryType::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl Model {
    /// Add a boundary reaction for a metabolite of the model
    ///
    /// The reaction consumes the metabolite with a coefficient of -1. Unless given, the id is
    /// the metabolite id prefixed with `EX_`, `DM_` or `SK_`, and the bounds follow the
    /// configured defaults, except for demands whose lower bound is 0. If a reaction with
    /// the id already exists it is returned unchanged.
    ///
    /// # Examples
    /// ```rust
    /// use cobrars_model::metabolic_model::boundary::BoundaryType;
    /// use cobrars_model::metabolic_model::metabolite::Metabolite;
    /// use cobrars_model::metabolic_model::model::Model;
    /// let mut model = Model::new("toy");
    /// model.add_metabolites([Metabolite::new_in("atp_c", "c")]).unwrap();
    /// let demand = model
    ///     .add_boundary("atp_c", BoundaryType::Demand, None, None, None, None)
    ///     .unwrap();
    /// assert_eq!(demand.id, "DM_atp_c");
    /// assert_eq!(demand.bounds(), (0., 1000.));
    /// ```
    pub fn add_boundary(
        &mut self,
        metabolite_id: &str,
        boundary_type: BoundaryType,
        reaction_id: Option<&str>,
        lower_bound: Option<f64>,
        upper_bound: Option<f64>,
        sbo_term: Option<&str>,
    ) -> Result<&Reaction, ModelError> {
        let metabolite = self.metabolites.get_by_id(metabolite_id)?;
        let id = match (reaction_id, boundary_type.prefix()) {
            (Some(id), _) => id.to_string(),
            (None, Some(prefix)) => format!("{}{}", prefix, metabolite_id),
            (None, None) => {
                return Err(ModelError::InvalidBoundary(format!(
                    "a reaction id is needed for boundary type {}",
                    boundary_type
                )))
            }
        };
        if self.reactions.contains(&id) {
            debug!("Boundary reaction {} already exists", id);
            return self.reactions.get_by_id(&id);
        }
        if boundary_type == BoundaryType::Exchange {
            if let Some(external) = self.find_external_compartment() {
                if metabolite.compartment.as_deref() != Some(external.as_str()) {
                    return Err(ModelError::InvalidBoundary(format!(
                        "metabolite {} is not in the external compartment {}, use a sink or \
                         demand instead",
                        metabolite_id, external
                    )));
                }
            }
        }
        let config = configuration::current();
        let lower_bound = lower_bound.unwrap_or(match boundary_type {
            BoundaryType::Demand => 0.,
            _ => config.lower_bound,
        });
        let upper_bound = upper_bound.unwrap_or(config.upper_bound);
        let mut annotation = IndexMap::new();
        if let Some(sbo) = sbo_term.or(boundary_type.sbo_term()) {
            annotation.insert("sbo".to_string(), sbo.to_string());
        }
        let name = format!(
            "{} {}",
            metabolite.name.as_deref().unwrap_or(&metabolite.id),
            boundary_type
        );
        let reaction = ReactionBuilder::default()
            .id(id.as_str())
            .name(name)
            .metabolite(metabolite_id, -1.)
            .lower_bound(lower_bound)
            .upper_bound(upper_bound)
            .annotation(annotation)
            .build()
            .map_err(|err| ModelError::InvalidBoundary(err.to_string()))?;
        self.add_reactions([reaction])?;
        self.reactions.get_by_id(&id)
    }

    /// Guess the compartment representing the extracellular space
    ///
    /// Compartment ids and names are matched against common names first. Otherwise the
    /// compartment holding most metabolites of boundary reactions is used.
    pub fn find_external_compartment(&self) -> Option<String> {
        let compartments = self.compartments();
        let by_name = compartments.iter().find(|(id, name)| {
            EXTERNAL_COMPARTMENTS.contains(&id.to_lowercase().as_str())
                || EXTERNAL_COMPARTMENTS.contains(&name.to_lowercase().as_str())
        });
        if let Some((id, _)) = by_name {
            return Some(id.clone());
        }
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for reaction in self.reactions.iter().filter(|r| r.is_boundary()) {
            let compartment = reaction
                .metabolites
                .keys()
                .filter_map(|met| self.metabolites.get(met))
                .find_map(|met| met.compartment.as_deref());
            if let Some(compartment) = compartment {
                *counts.entry(compartment).or_insert(0) += 1;
            }
        }
        counts
            .into_iter()
            .max_by_key(|(_, count)| *count)
            .map(|(compartment, _)| compartment.to_string())
    }

    /// Exchange reactions, boundary reactions of external metabolites
    pub fn exchanges(&self) -> Vec<&Reaction> {
        self.boundary_of_type(&BoundaryType::Exchange)
    }

    /// Demand reactions, irreversible boundary reactions of internal metabolites
    pub fn demands(&self) -> Vec<&Reaction> {
        self.boundary_of_type(&BoundaryType::Demand)
    }

    /// Sink reactions, reversible boundary reactions of internal metabolites
    pub fn sinks(&self) -> Vec<&Reaction> {
        self.boundary_of_type(&BoundaryType::Sink)
    }

    /// All boundary reactions
    pub fn boundary(&self) -> Vec<&Reaction> {
        self.reactions.query(|r| r.is_boundary())
    }

    fn boundary_of_type(&self, boundary_type: &BoundaryType) -> Vec<&Reaction> {
        let external = self.find_external_compartment();
        self.reactions
            .query(|r| self.classify_boundary(r, external.as_deref()).as_ref() == Some(boundary_type))
    }

    /// Kind of a boundary reaction, None for reactions which aren't boundary reactions
    pub fn classify_boundary(&self, reaction: &Reaction, external: Option<&str>) -> Option<BoundaryType> {
        if !reaction.is_boundary() {
            return None;
        }
        match reaction.annotation.get("sbo").map(String::as_str) {
            Some(SBO_EXCHANGE) => return Some(BoundaryType::Exchange),
            Some(SBO_DEMAND) => return Some(BoundaryType::Demand),
            Some(SBO_SINK) => return Some(BoundaryType::Sink),
            _ => {}
        }
        let compartment = reaction
            .metabolites
            .keys()
            .filter_map(|met| self.metabolites.get(met))
            .find_map(|met| met.compartment.as_deref());
        if let (Some(external), Some(compartment)) = (external, compartment) {
            if external == compartment {
                return Some(BoundaryType::Exchange);
            }
        }
        let prefixed = [BoundaryType::Exchange, BoundaryType::Demand, BoundaryType::Sink]
            .into_iter()
            .find(|kind| {
                kind.prefix()
                    .is_some_and(|prefix| reaction.id.starts_with(prefix))
            });
        if prefixed.is_some() {
            return prefixed;
        }
        if reaction.reversibility() {
            Some(BoundaryType::Sink)
        } else {
            Some(BoundaryType::Demand)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::metabolite::Metabolite;

    fn model() -> Model {
        let mut model = Model::new("boundary");
        model
            .add_metabolites([
                Metabolite::new_in("glc_e", "e"),
                Metabolite::new_in("glc_c", "c"),
                Metabolite::new_in("atp_c", "c"),
            ])
            .unwrap();
        model
    }

    #[test]
    fn boundary_types() {
        let mut model = model();
        let exchange = model
            .add_boundary("glc_e", BoundaryType::Exchange, None, None, None, None)
            .unwrap();
        assert_eq!(exchange.id, "EX_glc_e");
        assert_eq!(exchange.reactants(), vec!["glc_e"]);
        assert_eq!(exchange.bounds(), (-1000., 1000.));
        assert_eq!(exchange.annotation["sbo"], SBO_EXCHANGE);
        let sink = model
            .add_boundary("glc_c", BoundaryType::Sink, None, None, Some(10.), None)
            .unwrap();
        assert_eq!(sink.bounds(), (-1000., 10.));
        model
            .add_boundary("atp_c", BoundaryType::Demand, None, None, None, None)
            .unwrap();
        let ids = |reactions: Vec<&Reaction>| -> Vec<String> {
            reactions.into_iter().map(|r| r.id.clone()).collect()
        };
        assert_eq!(ids(model.exchanges()), vec!["EX_glc_e"]);
        assert_eq!(ids(model.sinks()), vec!["SK_glc_c"]);
        assert_eq!(ids(model.demands()), vec!["DM_atp_c"]);
        assert_eq!(model.boundary().len(), 3);
        let forward = model.reactions().get_by_id("DM_atp_c").unwrap().get_forward_id();
        assert!(model
            .problem()
            .constraint("atp_c")
            .unwrap()
            .terms()
            .has_variable(&forward));
    }

    #[test]
    fn existing_boundary_is_returned() {
        let mut model = model();
        let first = model
            .add_boundary("glc_c", BoundaryType::Sink, None, None, None, None)
            .unwrap()
            .clone();
        let second = model
            .add_boundary("glc_c", BoundaryType::Sink, None, Some(0.), None, None)
            .unwrap();
        assert_eq!(&first, second);
        assert_eq!(model.reactions().len(), 1);
    }

    #[test]
    fn invalid_boundaries() {
        let mut model = model();
        assert!(matches!(
            model.add_boundary("glc_c", BoundaryType::Exchange, None, None, None, None),
            Err(ModelError::InvalidBoundary(_))
        ));
        assert!(matches!(
            model.add_boundary(
                "glc_c",
                BoundaryType::Custom("diffusion".to_string()),
                None,
                None,
                None,
                None
            ),
            Err(ModelError::InvalidBoundary(_))
        ));
        assert!(matches!(
            model.add_boundary("missing", BoundaryType::Sink, None, None, None, None),
            Err(ModelError::NotFound { .. })
        ));
        let custom = model
            .add_boundary(
                "glc_c",
                BoundaryType::Custom("diffusion".to_string()),
                Some("DIFF_glc"),
                Some(0.),
                None,
                Some("SBO:0000185"),
            )
            .unwrap();
        assert_eq!(custom.name.as_deref(), Some("glc_c diffusion"));
    }

    #[test]
    fn boundary_in_context() {
        let mut model = model();
        model.with_context(|m| {
            m.add_boundary("atp_c", BoundaryType::Demand, None, None, None, None)
                .unwrap();
            assert!(m.reactions().contains("DM_atp_c"));
        });
        assert!(!model.reactions().contains("DM_atp_c"));
        assert_eq!(model.problem().num_variables(), 0);
    }
}
