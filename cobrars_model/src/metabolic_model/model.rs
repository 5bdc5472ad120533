//! This module provides the Model struct for representing an entire metabolic model
//!
//! The model owns the registries of reactions, metabolites, genes and groups together with
//! the optimization problem derived from them. Every reaction contributes a forward and a
//! reverse variable, every metabolite a mass balance constraint. Entities refer to each
//! other by id, and the model keeps those back references in sync while it mutates.
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use log::{debug, warn};
use nalgebra_sparse::{CooMatrix, CscMatrix};

use crate::configuration;
use crate::io::gpr_parse::parse_gpr_rule;
use crate::metabolic_model::context::UndoAction;
use crate::metabolic_model::error::ModelError;
use crate::metabolic_model::gene::{Gene, GeneActivity, Gpr};
use crate::metabolic_model::group::{Group, GroupMember};
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::Reaction;
use crate::metabolic_model::registry::{Entity, Registry};
use crate::optimize::constraint::Constraint;
use crate::optimize::expression::LinearExpression;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::solvers::SolverKind;
use crate::optimize::variable::Variable;

/// Represents a Genome Scale Metabolic Model
///
/// # Examples
/// ```rust
/// use cobrars_model::metabolic_model::model::Model;
/// use cobrars_model::metabolic_model::reaction::ReactionBuilder;
/// let mut model = Model::new("toy");
/// let uptake = ReactionBuilder::default()
///     .id("EX_a")
///     .metabolite("a", -1.)
///     .build()
///     .unwrap();
/// model.add_reactions([uptake]).unwrap();
/// assert!(model.metabolites().contains("a"));
/// assert!(model.problem().has_constraint("a"));
/// ```
#[derive(Debug)]
pub struct Model {
    /// Id associated with the Model
    pub id: Option<String>,
    /// Human readable name of the Model
    pub name: Option<String>,
    pub notes: IndexMap<String, String>,
    pub annotation: IndexMap<String, String>,
    pub(crate) reactions: Registry<Reaction>,
    pub(crate) metabolites: Registry<Metabolite>,
    pub(crate) genes: Registry<Gene>,
    pub(crate) groups: Registry<Group>,
    /// Descriptions of the compartments, keyed by compartment id
    pub(crate) compartment_names: IndexMap<String, String>,
    /// Underlying optimization problem
    pub(crate) problem: Problem,
    /// Backend used by [`Model::optimize`]
    pub(crate) solver: SolverKind,
    /// Stack of undo logs, one per active context
    pub(crate) contexts: Vec<Vec<UndoAction>>,
    /// Set while a context is being unwound, suppresses recording
    pub(crate) unwinding: bool,
}

impl Default for Model {
    fn default() -> Self {
        Model::new_empty()
    }
}

impl Model {
    /// Create a model without an id
    pub fn new_empty() -> Self {
        Model {
            id: None,
            name: None,
            notes: IndexMap::new(),
            annotation: IndexMap::new(),
            reactions: Registry::new(),
            metabolites: Registry::new(),
            genes: Registry::new(),
            groups: Registry::new(),
            compartment_names: IndexMap::new(),
            problem: Problem::new_maximization(),
            solver: configuration::current().solver,
            contexts: Vec::new(),
            unwinding: false,
        }
    }

    pub fn new(id: &str) -> Self {
        Model {
            id: Some(id.to_string()),
            ..Model::new_empty()
        }
    }

    // region Accessors
    pub fn reactions(&self) -> &Registry<Reaction> {
        &self.reactions
    }

    pub fn metabolites(&self) -> &Registry<Metabolite> {
        &self.metabolites
    }

    pub fn genes(&self) -> &Registry<Gene> {
        &self.genes
    }

    pub fn groups(&self) -> &Registry<Group> {
        &self.groups
    }

    /// The optimization problem generated from the model
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// Solver backend used by the model
    pub fn solver(&self) -> SolverKind {
        self.solver
    }

    /// Compartments of the model's metabolites, with their descriptions
    ///
    /// Compartments without a description map to an empty string.
    pub fn compartments(&self) -> IndexMap<String, String> {
        let mut compartments = IndexMap::new();
        for compartment in self.metabolites.iter().filter_map(|m| m.compartment.as_ref()) {
            compartments
                .entry(compartment.clone())
                .or_insert_with(|| {
                    self.compartment_names
                        .get(compartment)
                        .cloned()
                        .unwrap_or_default()
                });
        }
        compartments
    }

    /// Whether the member refers to an entity of this model
    pub fn has_member(&self, member: &GroupMember) -> bool {
        match member {
            GroupMember::Reaction(id) => self.reactions.contains(id),
            GroupMember::Metabolite(id) => self.metabolites.contains(id),
            GroupMember::Gene(id) => self.genes.contains(id),
        }
    }

    /// Every group containing the member
    pub fn get_associated_groups(&self, member: &GroupMember) -> Vec<&Group> {
        self.groups.query(|group| group.contains(member))
    }

    /// Metabolite x reaction matrix of stoichiometric coefficients
    pub fn stoichiometric_matrix(&self) -> CscMatrix<f64> {
        let mut coo = CooMatrix::new(self.metabolites.len(), self.reactions.len());
        for (col, reaction) in self.reactions.iter().enumerate() {
            for (met, coef) in reaction.metabolites.iter() {
                if let Some(row) = self.metabolites.index_of(met) {
                    coo.push(row, col, *coef);
                }
            }
        }
        CscMatrix::from(&coo)
    }
    // endregion Accessors

    // region Metabolites
    /// Add metabolites to the model, metabolites which are already present are skipped
    pub fn add_metabolites<I>(&mut self, metabolites: I) -> Result<(), ModelError>
    where
        I: IntoIterator<Item = Metabolite>,
    {
        for metabolite in metabolites {
            if self.metabolites.contains(&metabolite.id) {
                debug!("Metabolite {} already in model, skipping", metabolite.id);
                continue;
            }
            let id = metabolite.id.clone();
            self.attach_metabolite(metabolite, None, None)?;
            self.record(UndoAction::AddedMetabolite(id));
        }
        Ok(())
    }

    /// Remove metabolites from the model
    ///
    /// The metabolites are removed from every reaction they take part in. When `destructive`
    /// is set, reactions left without any metabolite are removed as well. Ids which aren't
    /// part of the model are ignored.
    pub fn remove_metabolites(
        &mut self,
        metabolite_ids: &[&str],
        destructive: bool,
    ) -> Result<(), ModelError> {
        for id in metabolite_ids {
            let Some(metabolite) = self.metabolites.get(id) else {
                warn!("Metabolite {} is not in the model, ignoring", id);
                continue;
            };
            let referencing: Vec<String> = metabolite.reactions.iter().cloned().collect();
            let action = self.detach_metabolite(id)?;
            self.record(action);
            if destructive {
                for reaction in referencing {
                    let emptied = self
                        .reactions
                        .get(&reaction)
                        .is_some_and(|r| r.metabolites.is_empty());
                    if emptied {
                        let action = self.detach_reaction(&reaction)?;
                        self.record(action);
                    }
                }
            }
        }
        Ok(())
    }
    // endregion Metabolites

    // region Genes
    /// Add genes to the model, genes which are already present are skipped
    pub fn add_genes<I>(&mut self, genes: I) -> Result<(), ModelError>
    where
        I: IntoIterator<Item = Gene>,
    {
        for gene in genes {
            if self.genes.contains(&gene.id) {
                debug!("Gene {} already in model, skipping", gene.id);
                continue;
            }
            let id = gene.id.clone();
            self.attach_gene(gene, None);
            self.record(UndoAction::AddedGene(id));
        }
        Ok(())
    }

    /// Change whether a gene is active
    pub fn set_gene_activity(&mut self, gene_id: &str, activity: GeneActivity) -> Result<(), ModelError> {
        let action = self.set_gene_activity_raw(gene_id, activity)?;
        self.record(action);
        Ok(())
    }
    // endregion Genes

    // region Reactions
    /// Add reactions to the model
    ///
    /// Metabolites and genes referenced by the reactions which are not yet in the model are
    /// added as bare records. A reaction whose id is already taken is skipped with a warning,
    /// the existing reaction is kept. Non-zero objective coefficients of the new reactions are
    /// added to the model objective.
    pub fn add_reactions<I>(&mut self, reactions: I) -> Result<(), ModelError>
    where
        I: IntoIterator<Item = Reaction>,
    {
        for mut reaction in reactions {
            reaction.metabolites.retain(|_, coef| *coef != 0.);
            if self.reactions.contains(&reaction.id) {
                warn!(
                    "Ignoring reaction {} since it already exists in the model",
                    reaction.id
                );
                continue;
            }
            let new_metabolites: Vec<Metabolite> = reaction
                .metabolites
                .keys()
                .filter(|met| !self.metabolites.contains(met))
                .map(|met| Metabolite::new(met))
                .collect();
            self.add_metabolites(new_metabolites)?;
            let new_genes: Vec<Gene> = reaction
                .genes()
                .into_iter()
                .filter(|gene| !self.genes.contains(gene))
                .map(|gene| Gene::new(&gene))
                .collect();
            self.add_genes(new_genes)?;

            let id = reaction.id.clone();
            let objective_coefficient = reaction.objective_coefficient;
            let flux = reaction.flux_expression();
            self.attach_reaction(reaction, None, None)?;
            self.record(UndoAction::AddedReaction(id));
            if objective_coefficient != 0. {
                let objective =
                    self.problem.objective().expression() + &(&flux * objective_coefficient);
                self.install_objective(objective)?;
            }
        }
        Ok(())
    }

    /// Remove reactions from the model
    ///
    /// With `remove_orphans`, metabolites and genes which no longer take part in any reaction
    /// are removed as well. Ids which aren't part of the model are ignored with a warning.
    pub fn remove_reactions(
        &mut self,
        reaction_ids: &[&str],
        remove_orphans: bool,
    ) -> Result<(), ModelError> {
        for id in reaction_ids {
            let Some(reaction) = self.reactions.get(id) else {
                warn!("Reaction {} not in model, ignoring", id);
                continue;
            };
            let metabolites: Vec<String> = reaction.metabolites.keys().cloned().collect();
            let genes: Vec<String> = reaction.genes().into_iter().collect();
            let action = self.detach_reaction(id)?;
            self.record(action);
            if !remove_orphans {
                continue;
            }
            for met in metabolites {
                if self
                    .metabolites
                    .get(&met)
                    .is_some_and(|m| m.reactions.is_empty())
                {
                    let action = self.detach_metabolite(&met)?;
                    self.record(action);
                }
            }
            for gene in genes {
                if self.genes.get(&gene).is_some_and(|g| g.reactions.is_empty()) {
                    let action = self.detach_gene(&gene)?;
                    self.record(action);
                }
            }
        }
        Ok(())
    }

    /// Copy reactions, with their metabolite and gene records, from another model
    pub fn add_reactions_from(&mut self, other: &Model, reaction_ids: &[&str]) -> Result<(), ModelError> {
        let mut reactions = Vec::with_capacity(reaction_ids.len());
        for id in reaction_ids {
            let reaction = other.reactions.get_by_id(id)?;
            let metabolites: Vec<Metabolite> = reaction
                .metabolites
                .keys()
                .filter(|met| !self.metabolites.contains(met))
                .filter_map(|met| other.metabolites.get(met))
                .map(|met| met.detached())
                .collect();
            self.add_metabolites(metabolites)?;
            let genes: Vec<Gene> = reaction
                .genes()
                .iter()
                .filter(|gene| !self.genes.contains(gene))
                .filter_map(|gene| other.genes.get(gene))
                .map(|gene| gene.detached())
                .collect();
            self.add_genes(genes)?;
            reactions.push(reaction.detached());
        }
        self.add_reactions(reactions)
    }

    /// Change the flux bounds of a reaction
    pub fn set_reaction_bounds(
        &mut self,
        reaction_id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ModelError> {
        let action = self.set_bounds_raw(reaction_id, lower_bound, upper_bound)?;
        self.record(action);
        Ok(())
    }

    pub fn set_lower_bound(&mut self, reaction_id: &str, lower_bound: f64) -> Result<(), ModelError> {
        let upper_bound = self.reactions.get_by_id(reaction_id)?.upper_bound;
        self.set_reaction_bounds(reaction_id, lower_bound, upper_bound)
    }

    pub fn set_upper_bound(&mut self, reaction_id: &str, upper_bound: f64) -> Result<(), ModelError> {
        let lower_bound = self.reactions.get_by_id(reaction_id)?.lower_bound;
        self.set_reaction_bounds(reaction_id, lower_bound, upper_bound)
    }

    /// Add metabolites to the stoichiometry of a reaction
    ///
    /// With `combine` the coefficients are added to the existing ones, otherwise they
    /// replace them. A resulting coefficient of zero removes the metabolite from the
    /// reaction. Metabolites new to the model are added to it.
    pub fn add_metabolites_to_reaction(
        &mut self,
        reaction_id: &str,
        metabolites: &[(&str, f64)],
        combine: bool,
    ) -> Result<(), ModelError> {
        self.reactions.get_by_id(reaction_id)?;
        let missing: Vec<Metabolite> = metabolites
            .iter()
            .filter(|(met, _)| !self.metabolites.contains(met))
            .map(|(met, _)| Metabolite::new(met))
            .collect();
        self.add_metabolites(missing)?;
        for (met, coef) in metabolites {
            let coefficient = if combine {
                self.reactions.get_by_id(reaction_id)?.coefficient(met) + coef
            } else {
                *coef
            };
            let action = self.set_stoichiometry_raw(reaction_id, met, coefficient, None)?;
            self.record(action);
        }
        Ok(())
    }

    /// Subtract metabolites from the stoichiometry of a reaction
    pub fn subtract_metabolites_from_reaction(
        &mut self,
        reaction_id: &str,
        metabolites: &[(&str, f64)],
    ) -> Result<(), ModelError> {
        let negated: Vec<(&str, f64)> = metabolites.iter().map(|(met, coef)| (*met, -coef)).collect();
        self.add_metabolites_to_reaction(reaction_id, &negated, true)
    }

    /// Parse and set the GPR of a reaction, genes new to the model are added to it
    pub fn set_gene_reaction_rule(&mut self, reaction_id: &str, rule: &str) -> Result<(), ModelError> {
        self.reactions.get_by_id(reaction_id)?;
        let gpr = parse_gpr_rule(rule)?;
        let new_genes: Vec<Gene> = gpr
            .iter()
            .flat_map(|gpr| gpr.genes())
            .filter(|gene| !self.genes.contains(gene))
            .map(|gene| Gene::new(&gene))
            .collect();
        self.add_genes(new_genes)?;
        let action = self.set_gpr_raw(reaction_id, gpr)?;
        self.record(action);
        Ok(())
    }
    // endregion Reactions

    // region Groups
    /// Add groups to the model
    ///
    /// Reactions, metabolites and genes carried by a group which the model doesn't have yet
    /// are added first. Members which still can't be resolved are dropped with a warning.
    pub fn add_groups<I>(&mut self, groups: I) -> Result<(), ModelError>
    where
        I: IntoIterator<Item = Group>,
    {
        for group in groups {
            if self.groups.contains(&group.id) {
                warn!("Ignoring group {} since it already exists in the model", group.id);
                continue;
            }
            let metabolites: Vec<Metabolite> = group
                .carried_metabolites
                .iter()
                .filter(|met| !self.metabolites.contains(&met.id))
                .cloned()
                .collect();
            self.add_metabolites(metabolites)?;
            let genes: Vec<Gene> = group
                .carried_genes
                .iter()
                .filter(|gene| !self.genes.contains(&gene.id))
                .cloned()
                .collect();
            self.add_genes(genes)?;
            let reactions: Vec<Reaction> = group
                .carried_reactions
                .iter()
                .filter(|rxn| !self.reactions.contains(&rxn.id))
                .cloned()
                .collect();
            self.add_reactions(reactions)?;

            let mut group = group.detached();
            let missing: Vec<GroupMember> = group
                .members
                .iter()
                .filter(|member| !self.has_member(member))
                .cloned()
                .collect();
            for member in missing {
                warn!(
                    "{} is not part of the model, dropping it from group {}",
                    member, group.id
                );
                group.members.shift_remove(&member);
            }
            let id = group.id.clone();
            self.attach_group(group, None);
            self.record(UndoAction::AddedGroup(id));
        }
        Ok(())
    }

    /// Remove groups from the model, their members stay in the model
    pub fn remove_groups(&mut self, group_ids: &[&str]) -> Result<(), ModelError> {
        for id in group_ids {
            if !self.groups.contains(id) {
                warn!("Group {} not in model, ignoring", id);
                continue;
            }
            let action = self.detach_group(id)?;
            self.record(action);
        }
        Ok(())
    }

    /// Add members to a group, all members must be part of the model
    pub fn add_group_members(
        &mut self,
        group_id: &str,
        members: Vec<GroupMember>,
    ) -> Result<(), ModelError> {
        self.groups.get_by_id(group_id)?;
        if let Some(missing) = members.iter().find(|member| !self.has_member(member)) {
            return Err(ModelError::NotFound {
                kind: member_kind(missing),
                id: missing.id().to_string(),
            });
        }
        let group = self
            .groups
            .get_mut(group_id)
            .ok_or_else(|| ModelError::not_found(Group::KIND, group_id))?;
        let added: Vec<GroupMember> = members
            .into_iter()
            .filter(|member| group.members.insert(member.clone()))
            .collect();
        if !added.is_empty() {
            self.record(UndoAction::AddedGroupMembers {
                group: group_id.to_string(),
                members: added,
            });
        }
        Ok(())
    }

    /// Remove members from a group, members which aren't in the group are ignored
    pub fn remove_group_members(
        &mut self,
        group_id: &str,
        members: &[GroupMember],
    ) -> Result<(), ModelError> {
        let group = self
            .groups
            .get_mut(group_id)
            .ok_or_else(|| ModelError::not_found(Group::KIND, group_id))?;
        let mut removed = Vec::new();
        for member in members {
            if let Some((index, member)) = group.members.shift_remove_full(member) {
                removed.push((index, member));
            }
        }
        if !removed.is_empty() {
            self.record(UndoAction::RemovedGroupMembers {
                group: group_id.to_string(),
                members: removed,
            });
        }
        Ok(())
    }
    // endregion Groups

    // region Free variables and constraints
    /// Add variables and constraints which don't belong to any reaction or metabolite
    pub fn add_cons_vars(
        &mut self,
        variables: Vec<Variable>,
        constraints: Vec<Constraint>,
    ) -> Result<(), ModelError> {
        for variable in variables {
            let id = variable.id().to_string();
            self.problem.add_variable(variable)?;
            self.record(UndoAction::AddedVariable(id));
        }
        for constraint in constraints {
            let id = constraint.get_id().to_string();
            self.problem.add_constraint(constraint)?;
            self.record(UndoAction::AddedConstraint(id));
        }
        Ok(())
    }

    /// Remove variables and constraints added with [`Model::add_cons_vars`]
    ///
    /// Reaction variables and metabolite constraints can only be removed together with their
    /// reaction or metabolite.
    pub fn remove_cons_vars(
        &mut self,
        variable_ids: &[&str],
        constraint_ids: &[&str],
    ) -> Result<(), ModelError> {
        if let Some(id) = constraint_ids
            .iter()
            .find(|id| self.metabolites.contains(id))
        {
            return Err(ModelError::ManagedConsVar(id.to_string()));
        }
        if let Some(id) = variable_ids.iter().find(|id| self.is_reaction_variable(id)) {
            return Err(ModelError::ManagedConsVar(id.to_string()));
        }
        for id in constraint_ids {
            let index = self
                .problem
                .constraint_index(id)
                .ok_or_else(|| ProblemError::NonExistentConstraint(id.to_string()))?;
            let constraint = self.problem.remove_constraint(id)?;
            self.record(UndoAction::RemovedConstraint { index, constraint });
        }
        for id in variable_ids {
            let objective = self.problem.objective().expression().coefficient(id);
            let constraint_terms: Vec<(String, f64)> = self
                .problem
                .constraints()
                .filter(|cons| cons.terms().has_variable(id))
                .map(|cons| (cons.get_id().to_string(), cons.terms().coefficient(id)))
                .collect();
            let index = self
                .problem
                .variable_index(id)
                .ok_or_else(|| ProblemError::NonExistentVariable(id.to_string()))?;
            let variable = self.problem.delete_variable(id)?;
            self.record(UndoAction::RemovedVariable {
                index,
                variable,
                objective,
                constraint_terms,
            });
        }
        Ok(())
    }

    /// Whether the variable is the forward or reverse variable of a reaction
    pub(crate) fn is_reaction_variable(&self, variable_id: &str) -> bool {
        self.reactions
            .iter()
            .any(|r| r.get_forward_id() == variable_id || r.get_reverse_id() == variable_id)
    }
    // endregion Free variables and constraints

    /// Merge descriptions into the compartment names
    pub fn set_compartment_names(&mut self, names: IndexMap<String, String>) {
        let previous = self.compartment_names.clone();
        self.compartment_names.extend(names);
        self.record(UndoAction::SetCompartmentNames { previous });
    }
}

/// Registry kind of a group member, used for errors
fn member_kind(member: &GroupMember) -> &'static str {
    match member {
        GroupMember::Reaction(_) => Reaction::KIND,
        GroupMember::Metabolite(_) => Metabolite::KIND,
        GroupMember::Gene(_) => Gene::KIND,
    }
}

// region Raw mutation
// These keep the registries, back references and the problem consistent but don't record
// anything; the public API records the returned inverse actions.
impl Model {
    /// Add a metabolite and its mass balance constraint
    ///
    /// `index` positions the metabolite in the registry and `constraint_index` its
    /// constraint in the problem, both are appended when not given.
    pub(crate) fn attach_metabolite(
        &mut self,
        metabolite: Metabolite,
        index: Option<usize>,
        constraint_index: Option<usize>,
    ) -> Result<(), ModelError> {
        let constraint = Constraint::new_equality(&metabolite.id, &[], &[], 0.);
        match constraint_index {
            Some(position) => self.problem.insert_constraint_at(position, constraint)?,
            None => self.problem.add_constraint(constraint)?,
        }
        let metabolite = metabolite.detached();
        match index {
            Some(index) => self.metabolites.shift_insert(index, metabolite),
            None => self.metabolites.insert(metabolite),
        };
        Ok(())
    }

    pub(crate) fn detach_metabolite(&mut self, id: &str) -> Result<UndoAction, ModelError> {
        let (index, metabolite) = self
            .metabolites
            .remove(id)
            .ok_or_else(|| ModelError::not_found(Metabolite::KIND, id))?;
        let mut stoichiometry = Vec::new();
        for reaction_id in metabolite.reactions.iter() {
            if let Some(reaction) = self.reactions.get_mut(reaction_id) {
                if let Some((position, _, coef)) = reaction.metabolites.shift_remove_full(id) {
                    stoichiometry.push((reaction_id.clone(), position, coef));
                }
            }
        }
        let constraint_index = self
            .problem
            .constraint_index(id)
            .ok_or_else(|| ModelError::not_found("Constraint", id))?;
        self.problem.remove_constraint(id)?;
        let groups = self.detach_member(&GroupMember::Metabolite(id.to_string()));
        Ok(UndoAction::RemovedMetabolite {
            index,
            constraint_index,
            metabolite,
            stoichiometry,
            groups,
        })
    }

    /// Add a reaction, its forward and reverse variables and its stoichiometry
    ///
    /// Metabolites with a zero coefficient are dropped from the reaction. `variable_indices`
    /// positions the forward and reverse variables in the problem, they are appended when
    /// not given.
    pub(crate) fn attach_reaction(
        &mut self,
        mut reaction: Reaction,
        index: Option<usize>,
        variable_indices: Option<(usize, usize)>,
    ) -> Result<(), ModelError> {
        reaction.metabolites.retain(|_, coef| *coef != 0.);
        if let Some(met) = reaction
            .metabolites
            .keys()
            .find(|met| !self.metabolites.contains(met))
        {
            return Err(ModelError::not_found(Metabolite::KIND, met));
        }
        let forward = reaction.get_forward_id();
        let reverse = reaction.get_reverse_id();
        let (forward_lb, forward_ub) = reaction.forward_bounds();
        let (reverse_lb, reverse_ub) = reaction.reverse_bounds();
        let forward_variable = Variable {
            name: Some(reaction.id.clone()),
            ..Variable::new(&forward, forward_lb, forward_ub)
        };
        let reverse_variable = Variable {
            name: Some(reaction.id.clone()),
            ..Variable::new(&reverse, reverse_lb, reverse_ub)
        };
        if let Some(id) = [&forward, &reverse]
            .into_iter()
            .find(|id| self.problem.has_variable(id))
        {
            return Err(ProblemError::VariableIdAlreadyExists(id.to_string()).into());
        }
        let added = match variable_indices {
            // Lower position first so both land where they were
            Some((forward_index, reverse_index)) if reverse_index < forward_index => self
                .problem
                .insert_variable_at(reverse_index, reverse_variable)
                .and_then(|_| self.problem.insert_variable_at(forward_index, forward_variable)),
            Some((forward_index, reverse_index)) => self
                .problem
                .insert_variable_at(forward_index, forward_variable)
                .and_then(|_| self.problem.insert_variable_at(reverse_index, reverse_variable)),
            None => self
                .problem
                .add_variable(forward_variable)
                .and_then(|_| self.problem.add_variable(reverse_variable)),
        };
        added?;
        for (met, coef) in reaction.metabolites.iter() {
            self.problem.set_constraint_coefficient(met, &forward, *coef)?;
            self.problem.set_constraint_coefficient(met, &reverse, -coef)?;
            if let Some(metabolite) = self.metabolites.get_mut(met) {
                metabolite.reactions.insert(reaction.id.clone());
            }
        }
        for gene in reaction.genes() {
            if let Some(gene) = self.genes.get_mut(&gene) {
                gene.reactions.insert(reaction.id.clone());
            }
        }
        match index {
            Some(index) => self.reactions.shift_insert(index, reaction),
            None => self.reactions.insert(reaction),
        };
        Ok(())
    }

    pub(crate) fn detach_reaction(&mut self, id: &str) -> Result<UndoAction, ModelError> {
        let (index, reaction) = self
            .reactions
            .remove(id)
            .ok_or_else(|| ModelError::not_found(Reaction::KIND, id))?;
        let forward = reaction.get_forward_id();
        let reverse = reaction.get_reverse_id();
        let expression = self.problem.objective().expression();
        let objective = (expression.coefficient(&forward), expression.coefficient(&reverse));
        let variable_indices = match (
            self.problem.variable_index(&forward),
            self.problem.variable_index(&reverse),
        ) {
            (Some(forward_index), Some(reverse_index)) => (forward_index, reverse_index),
            (None, _) => return Err(ModelError::not_found("Variable", &forward)),
            (_, None) => return Err(ModelError::not_found("Variable", &reverse)),
        };
        self.problem.delete_variable(&forward)?;
        self.problem.delete_variable(&reverse)?;
        for met in reaction.metabolites.keys() {
            if let Some(metabolite) = self.metabolites.get_mut(met) {
                metabolite.reactions.shift_remove(id);
            }
        }
        for gene in reaction.genes() {
            if let Some(gene) = self.genes.get_mut(&gene) {
                gene.reactions.shift_remove(id);
            }
        }
        let groups = self.detach_member(&GroupMember::Reaction(id.to_string()));
        Ok(UndoAction::RemovedReaction {
            index,
            variable_indices,
            reaction,
            objective,
            groups,
        })
    }

    pub(crate) fn attach_gene(&mut self, gene: Gene, index: Option<usize>) {
        let mut gene = gene.detached();
        gene.reactions = self
            .reactions
            .iter()
            .filter(|r| r.gpr.as_ref().is_some_and(|gpr| gpr.genes().contains(&gene.id)))
            .map(|r| r.id.clone())
            .collect();
        match index {
            Some(index) => self.genes.shift_insert(index, gene),
            None => self.genes.insert(gene),
        };
    }

    pub(crate) fn detach_gene(&mut self, id: &str) -> Result<UndoAction, ModelError> {
        let (index, gene) = self
            .genes
            .remove(id)
            .ok_or_else(|| ModelError::not_found(Gene::KIND, id))?;
        let groups = self.detach_member(&GroupMember::Gene(id.to_string()));
        Ok(UndoAction::RemovedGene {
            index,
            gene,
            groups,
        })
    }

    pub(crate) fn attach_group(&mut self, group: Group, index: Option<usize>) {
        let group = group.detached();
        match index {
            Some(index) => self.groups.shift_insert(index, group),
            None => self.groups.insert(group),
        };
    }

    pub(crate) fn detach_group(&mut self, id: &str) -> Result<UndoAction, ModelError> {
        let (index, group) = self
            .groups
            .remove(id)
            .ok_or_else(|| ModelError::not_found(Group::KIND, id))?;
        Ok(UndoAction::RemovedGroup { index, group })
    }

    /// Remove a member from every group, returning (group id, position) of each removal
    pub(crate) fn detach_member(&mut self, member: &GroupMember) -> Vec<(String, usize)> {
        let mut removed = Vec::new();
        for group in self.groups.iter_mut() {
            if let Some((index, _)) = group.members.shift_remove_full(member) {
                removed.push((group.id.clone(), index));
            }
        }
        removed
    }

    /// Put a member back at its former positions
    pub(crate) fn restore_member(&mut self, member: &GroupMember, positions: Vec<(String, usize)>) {
        for (group_id, index) in positions {
            if let Some(group) = self.groups.get_mut(&group_id) {
                let index = index.min(group.members.len());
                group.members.shift_insert(index, member.clone());
            }
        }
    }

    pub(crate) fn set_bounds_raw(
        &mut self,
        reaction_id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<UndoAction, ModelError> {
        if lower_bound > upper_bound {
            return Err(ModelError::InvalidBounds {
                id: reaction_id.to_string(),
                lower_bound,
                upper_bound,
            });
        }
        let reaction = self
            .reactions
            .get_mut(reaction_id)
            .ok_or_else(|| ModelError::not_found(Reaction::KIND, reaction_id))?;
        let (previous_lb, previous_ub) = reaction.bounds();
        reaction.lower_bound = lower_bound;
        reaction.upper_bound = upper_bound;
        let (forward_lb, forward_ub) = reaction.forward_bounds();
        let (reverse_lb, reverse_ub) = reaction.reverse_bounds();
        let forward = reaction.get_forward_id();
        let reverse = reaction.get_reverse_id();
        self.problem
            .update_variable_bounds(&forward, forward_lb, forward_ub)?;
        self.problem
            .update_variable_bounds(&reverse, reverse_lb, reverse_ub)?;
        Ok(UndoAction::SetBounds {
            reaction: reaction_id.to_string(),
            lower_bound: previous_lb,
            upper_bound: previous_ub,
        })
    }

    /// Set the coefficient of a metabolite in a reaction, zero removes it
    ///
    /// A metabolite new to the reaction is placed at `position` when given and appended
    /// otherwise.
    pub(crate) fn set_stoichiometry_raw(
        &mut self,
        reaction_id: &str,
        metabolite_id: &str,
        coefficient: f64,
        position: Option<usize>,
    ) -> Result<UndoAction, ModelError> {
        if !self.metabolites.contains(metabolite_id) {
            return Err(ModelError::not_found(Metabolite::KIND, metabolite_id));
        }
        let reaction = self
            .reactions
            .get_mut(reaction_id)
            .ok_or_else(|| ModelError::not_found(Reaction::KIND, reaction_id))?;
        let previous = reaction.coefficient(metabolite_id);
        let previous_position = reaction.metabolites.get_index_of(metabolite_id);
        match position {
            Some(position) if coefficient != 0. && previous_position.is_none() => {
                let position = position.min(reaction.metabolites.len());
                reaction
                    .metabolites
                    .shift_insert(position, metabolite_id.to_string(), coefficient);
            }
            _ => reaction.add_metabolites([(metabolite_id, coefficient)], false),
        }
        let forward = reaction.get_forward_id();
        let reverse = reaction.get_reverse_id();
        self.problem
            .set_constraint_coefficient(metabolite_id, &forward, coefficient)?;
        self.problem
            .set_constraint_coefficient(metabolite_id, &reverse, -coefficient)?;
        if let Some(metabolite) = self.metabolites.get_mut(metabolite_id) {
            if coefficient == 0. {
                metabolite.reactions.shift_remove(reaction_id);
            } else {
                metabolite.reactions.insert(reaction_id.to_string());
            }
        }
        Ok(UndoAction::SetStoichiometry {
            reaction: reaction_id.to_string(),
            metabolite: metabolite_id.to_string(),
            coefficient: previous,
            position: previous_position,
        })
    }

    pub(crate) fn set_gpr_raw(
        &mut self,
        reaction_id: &str,
        gpr: Option<Gpr>,
    ) -> Result<UndoAction, ModelError> {
        let reaction = self
            .reactions
            .get_mut(reaction_id)
            .ok_or_else(|| ModelError::not_found(Reaction::KIND, reaction_id))?;
        let old_genes = reaction.genes();
        let previous = std::mem::replace(&mut reaction.gpr, gpr);
        let new_genes = reaction.genes();
        for gene in old_genes.difference(&new_genes) {
            if let Some(gene) = self.genes.get_mut(gene) {
                gene.reactions.shift_remove(reaction_id);
            }
        }
        for gene in new_genes.iter() {
            if let Some(gene) = self.genes.get_mut(gene) {
                gene.reactions.insert(reaction_id.to_string());
            }
        }
        Ok(UndoAction::SetGpr {
            reaction: reaction_id.to_string(),
            gpr: previous,
        })
    }

    pub(crate) fn set_gene_activity_raw(
        &mut self,
        gene_id: &str,
        activity: GeneActivity,
    ) -> Result<UndoAction, ModelError> {
        let gene = self
            .genes
            .get_mut(gene_id)
            .ok_or_else(|| ModelError::not_found(Gene::KIND, gene_id))?;
        let previous = std::mem::replace(&mut gene.activity, activity);
        Ok(UndoAction::SetGeneActivity {
            gene: gene_id.to_string(),
            activity: previous,
        })
    }

    /// Replace the objective expression and record the previous one
    pub(crate) fn install_objective(&mut self, expression: LinearExpression) -> Result<(), ModelError> {
        let previous = self.problem.set_objective_expression(expression)?;
        self.sync_objective_coefficients();
        self.record(UndoAction::SetObjective { previous });
        Ok(())
    }

    pub(crate) fn set_direction_raw(&mut self, sense: ObjectiveSense) -> UndoAction {
        let previous = self.problem.objective_sense();
        self.problem.update_objective_sense(sense);
        UndoAction::SetObjectiveDirection { previous }
    }

    /// Refresh the objective coefficient mirrored on every reaction
    pub(crate) fn sync_objective_coefficients(&mut self) {
        let expression = self.problem.objective().expression().clone();
        for reaction in self.reactions.iter_mut() {
            reaction.objective_coefficient = expression.coefficient(&reaction.get_forward_id());
        }
    }
}
// endregion Raw mutation

impl Display for Model {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Model {}: {} reactions, {} metabolites, {} genes, {} groups",
            self.id.as_deref().unwrap_or("<unnamed>"),
            self.reactions.len(),
            self.metabolites.len(),
            self.genes.len(),
            self.groups.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::reaction::ReactionBuilder;

    fn small_model() -> Model {
        let mut model = Model::new("small");
        model
            .add_metabolites([Metabolite::new_in("a_e", "e"), Metabolite::new_in("a_c", "c")])
            .unwrap();
        let transport = ReactionBuilder::default()
            .id("Ta")
            .metabolite("a_e", -1.)
            .metabolite("a_c", 1.)
            .build()
            .unwrap()
            .with_gene_reaction_rule("g1 or g2")
            .unwrap();
        let sink = ReactionBuilder::default()
            .id("SK_a_c")
            .metabolite("a_c", -1.)
            .lower_bound(0.)
            .build()
            .unwrap();
        model.add_reactions([transport, sink]).unwrap();
        model
    }

    #[test]
    fn reactions_build_problem() {
        let model = small_model();
        let ta = model.reactions().get_by_id("Ta").unwrap();
        assert_eq!(model.problem().num_variables(), 4);
        assert_eq!(model.problem().num_constraints(), 2);
        let a_c = model.problem().constraint("a_c").unwrap();
        assert_eq!(a_c.terms().coefficient(&ta.get_forward_id()), 1.);
        assert_eq!(a_c.terms().coefficient(&ta.get_reverse_id()), -1.);
        assert_eq!(
            model.metabolites().get_by_id("a_c").unwrap().reactions().len(),
            2
        );
        assert_eq!(model.genes().len(), 2);
        assert!(model.genes().get_by_id("g1").unwrap().reactions().contains("Ta"));
    }

    #[test]
    fn duplicate_reaction_is_skipped() {
        let mut model = small_model();
        let mut duplicate = Reaction::new("Ta");
        duplicate.lower_bound = 0.;
        model.add_reactions([duplicate]).unwrap();
        assert_eq!(model.reactions().len(), 2);
        assert_eq!(model.reactions().get_by_id("Ta").unwrap().lower_bound, -1000.);
    }

    #[test]
    fn subtractive_metabolite_removal() {
        let mut model = small_model();
        model.remove_metabolites(&["a_c"], false).unwrap();
        assert!(!model.problem().has_constraint("a_c"));
        let ta = model.reactions().get_by_id("Ta").unwrap();
        assert_eq!(ta.metabolites.len(), 1);
        assert!(model.reactions().contains("SK_a_c"));
    }

    #[test]
    fn destructive_metabolite_removal() {
        let mut model = small_model();
        model.remove_metabolites(&["a_c"], true).unwrap();
        assert!(model.reactions().contains("Ta"));
        assert!(!model.reactions().contains("SK_a_c"));
        assert!(!model.problem().has_variable("SK_a_c_forward"));
    }

    #[test]
    fn remove_reactions_with_orphans() {
        let mut model = small_model();
        model.remove_reactions(&["Ta"], false).unwrap();
        assert!(model.metabolites().contains("a_e"));
        assert!(model.genes().contains("g1"));
        assert!(model.genes().get_by_id("g1").unwrap().reactions().is_empty());

        let mut model = small_model();
        model.remove_reactions(&["Ta"], true).unwrap();
        assert!(!model.metabolites().contains("a_e"));
        assert!(model.metabolites().contains("a_c"));
        assert!(!model.genes().contains("g1"));
        assert!(!model.genes().contains("g2"));
    }

    #[test]
    fn stoichiometry_updates() {
        let mut model = small_model();
        model
            .add_metabolites_to_reaction("SK_a_c", &[("b_c", 2.)], true)
            .unwrap();
        assert!(model.metabolites().contains("b_c"));
        assert_eq!(
            model
                .problem()
                .constraint("b_c")
                .unwrap()
                .terms()
                .coefficient("SK_a_c_forward"),
            2.
        );
        model
            .subtract_metabolites_from_reaction("SK_a_c", &[("b_c", 2.)])
            .unwrap();
        assert_eq!(model.reactions().get_by_id("SK_a_c").unwrap().coefficient("b_c"), 0.);
        assert!(model.problem().constraint("b_c").unwrap().terms().is_empty());
    }

    #[test]
    fn zero_coefficients_are_not_stored() {
        let mut model = Model::new("zeros");
        model.add_metabolites([Metabolite::new("z")]).unwrap();
        let mut reaction = Reaction::new("R");
        reaction.metabolites.insert("a".to_string(), -1.);
        reaction.metabolites.insert("z".to_string(), 0.);
        reaction.metabolites.insert("y".to_string(), 0.);
        model.add_reactions([reaction]).unwrap();

        let reaction = model.reactions().get_by_id("R").unwrap();
        assert_eq!(reaction.metabolites.len(), 1);
        assert!(!reaction.metabolites.contains_key("z"));
        assert!(reaction.is_boundary());
        assert!(model.metabolites().get_by_id("z").unwrap().reactions().is_empty());
        assert!(!model.metabolites().contains("y"));
        assert!(model.problem().constraint("z").unwrap().terms().is_empty());
        assert_eq!(model.boundary().len(), 1);
    }

    #[test]
    fn gene_reaction_rule_updates_genes() {
        let mut model = small_model();
        model.set_gene_reaction_rule("Ta", "g2 and g3").unwrap();
        assert!(model.genes().get_by_id("g1").unwrap().reactions().is_empty());
        assert!(model.genes().get_by_id("g3").unwrap().reactions().contains("Ta"));
        assert!(matches!(
            model.set_gene_reaction_rule("Ta", "g2 and"),
            Err(ModelError::GprParse(_))
        ));
    }

    #[test]
    fn compartments() {
        let mut model = small_model();
        let compartments = model.compartments();
        assert_eq!(compartments.get("e").map(String::as_str), Some(""));
        model.set_compartment_names(IndexMap::from([(
            "c".to_string(),
            "cytosol".to_string(),
        )]));
        assert_eq!(model.compartments().get("c").map(String::as_str), Some("cytosol"));
    }

    #[test]
    fn stoichiometric_matrix() {
        let model = small_model();
        let s = model.stoichiometric_matrix();
        assert_eq!(s.nrows(), 2);
        assert_eq!(s.ncols(), 2);
        assert_eq!(s.nnz(), 3);
    }

    #[test]
    fn managed_cons_vars() {
        let mut model = small_model();
        model
            .add_cons_vars(
                vec![Variable::new("foo", 0., 1.)],
                vec![Constraint::new_inequality("limit", &["foo"], &[1.], 0., 0.5)],
            )
            .unwrap();
        assert!(model.problem().has_variable("foo"));
        assert_eq!(
            model.remove_cons_vars(&[], &["a_c"]),
            Err(ModelError::ManagedConsVar("a_c".to_string()))
        );
        assert_eq!(
            model.remove_cons_vars(&["Ta_forward"], &[]),
            Err(ModelError::ManagedConsVar("Ta_forward".to_string()))
        );
        model.remove_cons_vars(&["foo"], &["limit"]).unwrap();
        assert!(!model.problem().has_variable("foo"));
        assert!(!model.problem().has_constraint("limit"));
    }
}
