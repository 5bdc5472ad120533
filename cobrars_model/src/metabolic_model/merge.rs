//! Copying models and merging two models into one
use indexmap::IndexMap;
use log::{debug, info};

use crate::metabolic_model::context::UndoAction;
use crate::metabolic_model::error::ModelError;
use crate::metabolic_model::gene::Gene;
use crate::metabolic_model::group::{Group, GroupMember};
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::{forward_id, reverse_id, Reaction};
use crate::optimize::constraint::Constraint;
use crate::optimize::variable::Variable;

/// Which objective the merged model keeps
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergeObjective {
    /// Objective of the model merged into
    #[default]
    Left,
    /// Objective of the model being merged in
    Right,
    /// Sum of both objectives
    Sum,
}

impl Model {
    /// Independent copy of the model
    ///
    /// The copy has its own problem (with a new identity) and never inherits active contexts.
    pub fn copy(&self) -> Model {
        Model {
            id: self.id.clone(),
            name: self.name.clone(),
            notes: self.notes.clone(),
            annotation: self.annotation.clone(),
            reactions: self.reactions.clone(),
            metabolites: self.metabolites.clone(),
            genes: self.genes.clone(),
            groups: self.groups.clone(),
            compartment_names: self.compartment_names.clone(),
            problem: self.problem.duplicate(),
            solver: self.solver,
            contexts: Vec::new(),
            unwinding: false,
        }
    }

    /// Merge `right` into a copy of this model, see [`Model::merge_in_place`]
    pub fn merge(
        &self,
        right: &Model,
        objective: MergeObjective,
        prefix_existing: Option<&str>,
    ) -> Result<Model, ModelError> {
        let mut merged = self.copy();
        merged.merge_in_place(right, objective, prefix_existing)?;
        Ok(merged)
    }

    /// Add the reactions, metabolites, genes, groups and free variables and constraints of
    /// `right` to this model
    ///
    /// Reactions of `right` whose id is already taken are renamed with `prefix_existing`
    /// when given and skipped otherwise. Metabolites, genes and groups already present are
    /// kept as they are.
    pub fn merge_in_place(
        &mut self,
        right: &Model,
        objective: MergeObjective,
        prefix_existing: Option<&str>,
    ) -> Result<(), ModelError> {
        let mut renamed_reactions: IndexMap<String, String> = IndexMap::new();
        let mut renamed_variables: IndexMap<String, String> = IndexMap::new();
        let mut reactions: Vec<Reaction> = Vec::with_capacity(right.reactions.len());
        for reaction in right.reactions.iter() {
            let mut reaction = reaction.detached();
            reaction.objective_coefficient = 0.;
            if let Some(prefix) = prefix_existing {
                if self.reactions.contains(&reaction.id) {
                    let new_id = format!("{}{}", prefix, reaction.id);
                    renamed_variables.insert(reaction.get_forward_id(), forward_id(&new_id));
                    renamed_variables.insert(reaction.get_reverse_id(), reverse_id(&new_id));
                    renamed_reactions.insert(reaction.id.clone(), new_id.clone());
                    reaction.id = new_id;
                }
            }
            reactions.push(reaction);
        }
        if !renamed_reactions.is_empty() {
            info!(
                "Renamed {} reactions of {} which already exist",
                renamed_reactions.len(),
                right.id.as_deref().unwrap_or("<unnamed>")
            );
        }

        let metabolites: Vec<Metabolite> = right
            .metabolites
            .iter()
            .filter(|met| !self.metabolites.contains(&met.id))
            .map(|met| met.detached())
            .collect();
        self.add_metabolites(metabolites)?;
        let genes: Vec<Gene> = right
            .genes
            .iter()
            .filter(|gene| !self.genes.contains(&gene.id))
            .map(|gene| gene.detached())
            .collect();
        self.add_genes(genes)?;
        self.add_reactions(reactions)?;

        let variables: Vec<Variable> = right
            .problem
            .variables()
            .filter(|var| !right.is_reaction_variable(var.id()))
            .filter(|var| !self.problem.has_variable(var.id()))
            .cloned()
            .collect();
        let constraints: Vec<Constraint> = right
            .problem
            .constraints()
            .filter(|cons| !right.metabolites.contains(cons.get_id()))
            .filter(|cons| !self.problem.has_constraint(cons.get_id()))
            .map(|cons| {
                let mut cons = cons.clone();
                let terms = cons.terms().rename_variables(&renamed_variables);
                *cons.terms_mut() = terms;
                cons
            })
            .collect();
        debug!(
            "Merging {} free variables and {} free constraints",
            variables.len(),
            constraints.len()
        );
        self.add_cons_vars(variables, constraints)?;

        let groups: Vec<Group> = right
            .groups
            .iter()
            .filter(|group| !self.groups.contains(&group.id))
            .map(|group| {
                let members = group.members.iter().map(|member| match member {
                    GroupMember::Reaction(id) => GroupMember::Reaction(
                        renamed_reactions.get(id).unwrap_or(id).clone(),
                    ),
                    other => other.clone(),
                });
                Group {
                    members: members.collect(),
                    ..group.detached()
                }
            })
            .collect();
        self.add_groups(groups)?;

        let compartment_names: IndexMap<String, String> = right
            .compartment_names
            .iter()
            .filter(|(id, _)| !self.compartment_names.contains_key(*id))
            .map(|(id, name)| (id.clone(), name.clone()))
            .collect();
        if !compartment_names.is_empty() {
            self.set_compartment_names(compartment_names);
        }

        let right_objective = right
            .problem
            .objective()
            .expression()
            .rename_variables(&renamed_variables);
        match objective {
            MergeObjective::Left => {}
            MergeObjective::Right => {
                self.install_objective(right_objective)?;
                let action = self.set_direction_raw(right.objective_direction());
                self.record(action);
            }
            MergeObjective::Sum => {
                let sum = self.problem.objective().expression() + &right_objective;
                self.install_objective(sum)?;
            }
        }

        let previous = self.name.clone();
        self.name = Some(format!(
            "{} & {}",
            self.id.as_deref().unwrap_or("<unnamed>"),
            right.id.as_deref().unwrap_or("<unnamed>")
        ));
        self.record(UndoAction::SetName { previous });
        Ok(())
    }
}

impl Clone for Model {
    fn clone(&self) -> Self {
        self.copy()
    }
}
