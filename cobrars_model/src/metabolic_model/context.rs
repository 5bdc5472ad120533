//! Reversible modification of a model
//!
//! Entering a context pushes an empty undo log onto the model. While at least one context is
//! active, every change made through the model's mutation API records the action which
//! reverts it. Leaving the context replays the log of the innermost context in reverse
//! order, restoring the model to the state it had when the context was entered.
//!
//! # Examples
//! ```rust
//! use cobrars_model::metabolic_model::model::Model;
//! use cobrars_model::metabolic_model::reaction::Reaction;
//! let mut model = Model::new("toy");
//! model.add_reactions([Reaction::new("R1")]).unwrap();
//! {
//!     let mut ctx = model.context();
//!     ctx.set_reaction_bounds("R1", 1., 2.).unwrap();
//!     assert_eq!(ctx.reactions().get_by_id("R1").unwrap().bounds(), (1., 2.));
//! }
//! assert_eq!(model.reactions().get_by_id("R1").unwrap().bounds(), (-1000., 1000.));
//! ```
use std::ops::{Deref, DerefMut};

use indexmap::IndexMap;
use log::{debug, error};

use crate::metabolic_model::error::ModelError;
use crate::metabolic_model::gene::{Gene, GeneActivity, Gpr};
use crate::metabolic_model::group::{Group, GroupMember};
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::{forward_id, reverse_id, Reaction};
use crate::optimize::constraint::Constraint;
use crate::optimize::expression::LinearExpression;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::variable::Variable;

/// Inverse of a change made to a model
#[derive(Clone, Debug)]
pub(crate) enum UndoAction {
    SetBounds {
        reaction: String,
        lower_bound: f64,
        upper_bound: f64,
    },
    AddedMetabolite(String),
    RemovedMetabolite {
        index: usize,
        constraint_index: usize,
        metabolite: Metabolite,
        /// (reaction id, position, coefficient) the metabolite had in each reaction
        stoichiometry: Vec<(String, usize, f64)>,
        /// (group id, position) of every group membership
        groups: Vec<(String, usize)>,
    },
    AddedReaction(String),
    RemovedReaction {
        index: usize,
        /// Positions of the forward and reverse variables
        variable_indices: (usize, usize),
        reaction: Reaction,
        /// Objective coefficients of the forward and reverse variables
        objective: (f64, f64),
        groups: Vec<(String, usize)>,
    },
    SetStoichiometry {
        reaction: String,
        metabolite: String,
        coefficient: f64,
        /// Position of the metabolite in the reaction, None if it wasn't part of it
        position: Option<usize>,
    },
    SetGpr {
        reaction: String,
        gpr: Option<Gpr>,
    },
    AddedGene(String),
    RemovedGene {
        index: usize,
        gene: Gene,
        groups: Vec<(String, usize)>,
    },
    SetGeneActivity {
        gene: String,
        activity: GeneActivity,
    },
    AddedGroup(String),
    RemovedGroup {
        index: usize,
        group: Group,
    },
    AddedGroupMembers {
        group: String,
        members: Vec<GroupMember>,
    },
    RemovedGroupMembers {
        group: String,
        /// Removed members with their positions, in removal order
        members: Vec<(usize, GroupMember)>,
    },
    AddedVariable(String),
    RemovedVariable {
        index: usize,
        variable: Variable,
        objective: f64,
        constraint_terms: Vec<(String, f64)>,
    },
    AddedConstraint(String),
    RemovedConstraint {
        index: usize,
        constraint: Constraint,
    },
    SetObjective {
        previous: LinearExpression,
    },
    SetObjectiveDirection {
        previous: ObjectiveSense,
    },
    SetCompartmentNames {
        previous: IndexMap<String, String>,
    },
    SetName {
        previous: Option<String>,
    },
}

/// Guard for an active context, the context is left when the guard is dropped
///
/// The guard dereferences to the model, so the model is used through it while the context
/// is active.
pub struct ModelContext<'m> {
    model: &'m mut Model,
}

impl Deref for ModelContext<'_> {
    type Target = Model;

    fn deref(&self) -> &Self::Target {
        self.model
    }
}

impl DerefMut for ModelContext<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.model
    }
}

impl Drop for ModelContext<'_> {
    fn drop(&mut self) {
        self.model.exit_context();
    }
}

impl Model {
    /// Enter a new context, which is left when the returned guard is dropped
    pub fn context(&mut self) -> ModelContext<'_> {
        self.enter_context();
        ModelContext { model: self }
    }

    /// Run `f` inside a new context, all changes made by `f` are reverted afterwards
    pub fn with_context<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Model) -> R,
    {
        let mut ctx = self.context();
        f(&mut *ctx)
    }

    /// Push a new undo log, prefer [`Model::context`] which can't be left unbalanced
    pub fn enter_context(&mut self) {
        self.contexts.push(Vec::new());
        debug!("Entered context, depth {}", self.contexts.len());
    }

    /// Revert every change recorded since the matching [`Model::enter_context`]
    pub fn exit_context(&mut self) {
        let Some(frame) = self.contexts.pop() else {
            debug!("exit_context called without an active context");
            return;
        };
        debug!(
            "Leaving context, reverting {} changes, depth {}",
            frame.len(),
            self.contexts.len()
        );
        self.unwinding = true;
        for action in frame.into_iter().rev() {
            if let Err(err) = self.revert(action) {
                error!("Failed to revert a change while leaving a context: {}", err);
            }
        }
        self.unwinding = false;
    }

    /// Number of active contexts
    pub fn context_depth(&self) -> usize {
        self.contexts.len()
    }

    /// Add an inverse action to the innermost context, if any
    pub(crate) fn record(&mut self, action: UndoAction) {
        if self.unwinding {
            return;
        }
        if let Some(frame) = self.contexts.last_mut() {
            frame.push(action);
        }
    }

    fn revert(&mut self, action: UndoAction) -> Result<(), ModelError> {
        match action {
            UndoAction::SetBounds {
                reaction,
                lower_bound,
                upper_bound,
            } => {
                self.set_bounds_raw(&reaction, lower_bound, upper_bound)?;
            }
            UndoAction::AddedMetabolite(id) => {
                self.detach_metabolite(&id)?;
            }
            UndoAction::RemovedMetabolite {
                index,
                constraint_index,
                metabolite,
                stoichiometry,
                groups,
            } => {
                let id = metabolite.id.clone();
                self.attach_metabolite(metabolite, Some(index), Some(constraint_index))?;
                for (reaction, position, coefficient) in stoichiometry {
                    if self.reactions.contains(&reaction) {
                        self.set_stoichiometry_raw(&reaction, &id, coefficient, Some(position))?;
                    }
                }
                self.restore_member(&GroupMember::Metabolite(id), groups);
            }
            UndoAction::AddedReaction(id) => {
                self.detach_reaction(&id)?;
            }
            UndoAction::RemovedReaction {
                index,
                variable_indices,
                reaction,
                objective: (forward, reverse),
                groups,
            } => {
                let id = reaction.id.clone();
                self.attach_reaction(reaction, Some(index), Some(variable_indices))?;
                self.problem
                    .set_objective_coefficient(&forward_id(&id), forward)?;
                self.problem
                    .set_objective_coefficient(&reverse_id(&id), reverse)?;
                self.sync_objective_coefficients();
                self.restore_member(&GroupMember::Reaction(id), groups);
            }
            UndoAction::SetStoichiometry {
                reaction,
                metabolite,
                coefficient,
                position,
            } => {
                self.set_stoichiometry_raw(&reaction, &metabolite, coefficient, position)?;
            }
            UndoAction::SetGpr { reaction, gpr } => {
                self.set_gpr_raw(&reaction, gpr)?;
            }
            UndoAction::AddedGene(id) => {
                self.detach_gene(&id)?;
            }
            UndoAction::RemovedGene {
                index,
                gene,
                groups,
            } => {
                let id = gene.id.clone();
                self.attach_gene(gene, Some(index));
                self.restore_member(&GroupMember::Gene(id), groups);
            }
            UndoAction::SetGeneActivity { gene, activity } => {
                self.set_gene_activity_raw(&gene, activity)?;
            }
            UndoAction::AddedGroup(id) => {
                self.detach_group(&id)?;
            }
            UndoAction::RemovedGroup { index, group } => {
                self.attach_group(group, Some(index));
            }
            UndoAction::AddedGroupMembers { group, members } => {
                if let Some(group) = self.groups.get_mut(&group) {
                    for member in members.iter() {
                        group.members.shift_remove(member);
                    }
                }
            }
            UndoAction::RemovedGroupMembers { group, members } => {
                if let Some(group) = self.groups.get_mut(&group) {
                    for (index, member) in members.into_iter().rev() {
                        let index = index.min(group.members.len());
                        group.members.shift_insert(index, member);
                    }
                }
            }
            UndoAction::AddedVariable(id) => {
                self.problem.delete_variable(&id)?;
            }
            UndoAction::RemovedVariable {
                index,
                variable,
                objective,
                constraint_terms,
            } => {
                let id = variable.id().to_string();
                self.problem.insert_variable_at(index, variable)?;
                self.problem.set_objective_coefficient(&id, objective)?;
                for (constraint, coefficient) in constraint_terms {
                    self.problem
                        .set_constraint_coefficient(&constraint, &id, coefficient)?;
                }
            }
            UndoAction::AddedConstraint(id) => {
                self.problem.remove_constraint(&id)?;
            }
            UndoAction::RemovedConstraint { index, constraint } => {
                self.problem.insert_constraint_at(index, constraint)?;
            }
            UndoAction::SetObjective { previous } => {
                self.problem.set_objective_expression(previous)?;
                self.sync_objective_coefficients();
            }
            UndoAction::SetObjectiveDirection { previous } => {
                self.problem.update_objective_sense(previous);
            }
            UndoAction::SetCompartmentNames { previous } => {
                self.compartment_names = previous;
            }
            UndoAction::SetName { previous } => {
                self.name = previous;
            }
        }
        Ok(())
    }
}
