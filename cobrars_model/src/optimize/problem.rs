//! Provides struct representing an optimization problem
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use log::debug;
use nalgebra_sparse::{CooMatrix, CscMatrix};
use thiserror::Error;

use crate::optimize::constraint::Constraint;
use crate::optimize::expression::LinearExpression;
use crate::optimize::objective::{Objective, ObjectiveSense};
use crate::optimize::solvers::{Solver, SolverError, StandardForm};
use crate::optimize::variable::{Variable, VariableBuilder};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Source of problem identities, every new problem gets a fresh uid
static NEXT_PROBLEM_UID: AtomicU64 = AtomicU64::new(1);

/// An optimization problem
///
/// Variables and constraints are keyed by id. Constraints refer to variables by id, so
/// removing a variable also removes it from every constraint and from the objective.
#[derive(Debug)]
pub struct Problem {
    /// Identity of this problem instance
    uid: u64,
    /// Objective to optimize
    objective: Objective,
    /// Variables of the optimization problem
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem
    constraints: IndexMap<String, Constraint>,
    /// Current status of the optimization problem
    status: OptimizationStatus,
    /// Result of the last solve, None before optimization
    solution: Option<ProblemSolution>,
}

impl Problem {
    // region Creation Functions
    /// Create a new optimization problem
    pub fn new(objective_sense: ObjectiveSense) -> Self {
        Self {
            uid: NEXT_PROBLEM_UID.fetch_add(1, Ordering::Relaxed),
            objective: Objective::new(objective_sense),
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
            status: OptimizationStatus::Unoptimized,
            solution: None,
        }
    }

    /// Create a new maximization problem
    pub fn new_maximization() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new minimization problem
    pub fn new_minimization() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }

    /// Create a problem with the same content as this one but a new identity
    pub fn duplicate(&self) -> Self {
        Self {
            uid: NEXT_PROBLEM_UID.fetch_add(1, Ordering::Relaxed),
            objective: self.objective.clone(),
            variables: self.variables.clone(),
            constraints: self.constraints.clone(),
            status: self.status,
            solution: self.solution.clone(),
        }
    }
    // endregion Creation Functions

    // region Accessors
    /// Identity of the problem, distinct for every problem created in this process
    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn objective_sense(&self) -> ObjectiveSense {
        self.objective.sense()
    }

    pub fn variable(&self, id: &str) -> Option<&Variable> {
        self.variables.get(id)
    }

    pub fn constraint(&self, id: &str) -> Option<&Constraint> {
        self.constraints.get(id)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.values()
    }

    pub fn has_variable(&self, id: &str) -> bool {
        self.variables.contains_key(id)
    }

    pub fn has_constraint(&self, id: &str) -> bool {
        self.constraints.contains_key(id)
    }

    /// Position of a variable among the problem's variables
    pub fn variable_index(&self, id: &str) -> Option<usize> {
        self.variables.get_index_of(id)
    }

    /// Position of a constraint among the problem's constraints
    pub fn constraint_index(&self, id: &str) -> Option<usize> {
        self.constraints.get_index_of(id)
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn status(&self) -> OptimizationStatus {
        self.status
    }

    /// Result of the last solve
    pub fn solution(&self) -> Option<&ProblemSolution> {
        self.solution.as_ref()
    }

    /// Value of a variable in the last solution
    pub fn primal(&self, variable_id: &str) -> Option<f64> {
        self.solution
            .as_ref()
            .and_then(|sol| sol.variable_values.as_ref())
            .and_then(|values| values.get(variable_id).copied())
    }
    // endregion Accessors

    // region Update Objective
    /// Update the objective sense of the problem
    pub fn update_objective_sense(&mut self, sense: ObjectiveSense) {
        self.objective.set_sense(sense);
    }

    /// Replace the objective expression, returning the previous one
    pub fn set_objective_expression(
        &mut self,
        expression: LinearExpression,
    ) -> Result<LinearExpression, ProblemError> {
        if let Some(var) = expression.variables().find(|var| !self.has_variable(var)) {
            return Err(ProblemError::NonExistentVariablesInObjective(var.to_string()));
        }
        Ok(self.objective.set_expression(expression.simplify()))
    }

    /// Set the objective coefficient of a single variable
    pub fn set_objective_coefficient(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        if !self.has_variable(variable_id) {
            return Err(ProblemError::NonExistentVariablesInObjective(
                variable_id.to_string(),
            ));
        }
        self.objective.set_coefficient(variable_id, coefficient);
        Ok(())
    }
    // endregion Update Objective

    // region Adding Variables
    /// Add a variable to the optimization problem
    pub fn add_variable(&mut self, variable: Variable) -> Result<(), ProblemError> {
        self.validate_variable(&variable)?;
        self.variables.insert(variable.id.clone(), variable);
        Ok(())
    }

    /// Add a variable at a position, shifting the following variables back
    ///
    /// Positions past the end append the variable.
    pub fn insert_variable_at(
        &mut self,
        index: usize,
        variable: Variable,
    ) -> Result<(), ProblemError> {
        self.validate_variable(&variable)?;
        let index = index.min(self.variables.len());
        self.variables
            .shift_insert(index, variable.id.clone(), variable);
        Ok(())
    }

    /// Create a new variable and add it to the optimization problem
    pub fn add_new_variable(
        &mut self,
        id: &str,
        name: Option<&str>,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        let mut builder = VariableBuilder::default();
        builder.id(id).lower_bound(lower_bound).upper_bound(upper_bound);
        if let Some(name) = name {
            builder.name(name);
        }
        let new_var = builder
            .build()
            .map_err(|_| ProblemError::InvalidVariableBounds(id.to_string()))?;
        self.add_variable(new_var)
    }
    // endregion Adding Variables

    // region Adding Constraints
    /// Add a constraint to the problem
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), ProblemError> {
        self.validate_constraint(&constraint)?;
        self.constraints
            .insert(constraint.get_id().to_string(), constraint);
        Ok(())
    }

    /// Add a constraint at a position, shifting the following constraints back
    ///
    /// Positions past the end append the constraint.
    pub fn insert_constraint_at(
        &mut self,
        index: usize,
        constraint: Constraint,
    ) -> Result<(), ProblemError> {
        self.validate_constraint(&constraint)?;
        let index = index.min(self.constraints.len());
        self.constraints
            .shift_insert(index, constraint.get_id().to_string(), constraint);
        Ok(())
    }

    /// Create a new equality constraint and add it to the problem
    pub fn add_new_equality_constraint(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), ProblemError> {
        self.add_constraint(Constraint::new_equality(
            id,
            variables,
            coefficients,
            equals,
        ))
    }

    /// Create a new inequality constraint and add it to the problem
    pub fn add_new_inequality_constraint(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        self.add_constraint(Constraint::new_inequality(
            id,
            variables,
            coefficients,
            lower_bound,
            upper_bound,
        ))
    }

    /// Set the coefficient of a variable within a constraint, zero removes the term
    pub fn set_constraint_coefficient(
        &mut self,
        constraint_id: &str,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        if !self.has_variable(variable_id) {
            return Err(ProblemError::NonExistentVariablesInConstraint(
                variable_id.to_string(),
            ));
        }
        match self.constraints.get_mut(constraint_id) {
            Some(cons) => {
                cons.set_coefficient(variable_id, coefficient);
                Ok(())
            }
            None => Err(ProblemError::NonExistentConstraint(
                constraint_id.to_string(),
            )),
        }
    }
    // endregion Adding Constraints

    // region update variable bounds
    /// Update the bounds of a variable
    pub fn update_variable_bounds(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidVariableBounds(id.to_string()));
        }
        match self.variables.get_mut(id) {
            Some(var) => {
                var.lower_bound = lower_bound;
                var.upper_bound = upper_bound;
            }
            None => return Err(ProblemError::NonExistentVariable(id.to_string())),
        };
        Ok(())
    }
    // endregion update variable bounds

    // region Remove Variables
    /// Remove a variable from the problem, will also remove it as a term from all constraints
    /// and any terms in the objective that include this variable
    pub fn delete_variable(&mut self, variable_id: &str) -> Result<Variable, ProblemError> {
        let variable = self
            .variables
            .shift_remove(variable_id)
            .ok_or_else(|| ProblemError::NonExistentVariable(variable_id.to_string()))?;
        self.objective.remove_terms_with_variable(variable_id);
        self.constraints.values_mut().for_each(|cons| {
            cons.remove_variable(variable_id);
        });
        Ok(variable)
    }
    // endregion Remove Variables

    // region Remove Constraints
    /// Remove a constraint (by id) from the problem
    pub fn remove_constraint(&mut self, constraint_id: &str) -> Result<Constraint, ProblemError> {
        self.constraints
            .shift_remove(constraint_id)
            .ok_or_else(|| ProblemError::NonExistentConstraint(constraint_id.to_string()))
    }
    // endregion Remove Constraints

    // region Solving
    /// Lower the problem into the matrix form used by the solver backends
    pub fn to_standard_form(&self) -> StandardForm {
        let mut coo = CooMatrix::new(self.constraints.len(), self.variables.len());
        for (row, cons) in self.constraints.values().enumerate() {
            for (var, coef) in cons.terms().terms() {
                // constraints never hold variables missing from the problem
                if let Some(col) = self.variables.get_index_of(var) {
                    coo.push(row, col, coef);
                }
            }
        }
        StandardForm {
            sense: self.objective.sense(),
            costs: self
                .variables
                .keys()
                .map(|var| self.objective.expression().coefficient(var))
                .collect(),
            variable_bounds: self.variables.values().map(|var| var.bounds()).collect(),
            constraint_matrix: CscMatrix::from(&coo),
            row_bounds: self.constraints.values().map(|cons| cons.bounds()).collect(),
        }
    }

    /// Solve the problem with the given backend and record the solution
    pub fn optimize(&mut self, solver: &dyn Solver) -> Result<&ProblemSolution, ProblemError> {
        let form = self.to_standard_form();
        debug!(
            "Optimizing problem {} with {} ({} variables, {} constraints)",
            self.uid,
            solver.name(),
            form.num_variables(),
            form.num_constraints()
        );
        let output = solver.solve(&form)?;
        let solution = if output.status.is_optimal() {
            let keyed = |values: Vec<f64>, ids: Vec<&String>| -> IndexMap<String, f64> {
                ids.into_iter().cloned().zip(values).collect()
            };
            ProblemSolution {
                status: output.status,
                objective_value: Some(form.objective_value(&output.primal)),
                variable_values: Some(keyed(output.primal, self.variables.keys().collect())),
                dual_values: output
                    .row_duals
                    .map(|duals| keyed(duals, self.constraints.keys().collect())),
                reduced_costs: output
                    .reduced_costs
                    .map(|costs| keyed(costs, self.variables.keys().collect())),
            }
        } else {
            ProblemSolution::unsolved(output.status)
        };
        Ok(self.record_solution(solution))
    }

    /// Store a solution as the result of the last solve
    pub(crate) fn record_solution(&mut self, solution: ProblemSolution) -> &ProblemSolution {
        self.status = solution.status;
        self.solution.insert(solution)
    }
    // endregion Solving

    // region Validation Functions
    /// Check that a variable to be added is valid to add to this problem
    fn validate_variable(&self, variable: &Variable) -> Result<(), ProblemError> {
        if self.variables.contains_key(&variable.id) {
            return Err(ProblemError::VariableIdAlreadyExists(variable.id.clone()));
        };
        if variable.lower_bound > variable.upper_bound {
            return Err(ProblemError::InvalidVariableBounds(variable.id.clone()));
        }
        Ok(())
    }

    /// Check that a constraint to be added is valid to add to this Problem
    fn validate_constraint(&self, constraint: &Constraint) -> Result<(), ProblemError> {
        if self.constraints.contains_key(constraint.get_id()) {
            return Err(ProblemError::ConstraintAlreadyExists(
                constraint.get_id().to_string(),
            ));
        }
        let (lower_bound, upper_bound) = constraint.bounds();
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidConstraintBounds(
                constraint.get_id().to_string(),
            ));
        }
        if let Some(var) = constraint
            .terms()
            .variables()
            .find(|var| !self.has_variable(var))
        {
            return Err(ProblemError::NonExistentVariablesInConstraint(
                var.to_string(),
            ));
        }
        Ok(())
    }
    // endregion Validation Functions
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// Error when trying to add a variable with the same id as an existing variable
    #[error("Tried to add a variable with the same id as an existing variable: {0}")]
    VariableIdAlreadyExists(String),
    /// Error when trying to add variable with invalid bounds
    #[error("Tried to give variable {0} a lower_bound > upper_bound")]
    InvalidVariableBounds(String),
    /// Error when trying to add a constraint with the same id as an existing constraint
    #[error("Tried to add a constraint with the same id as an existing constraint: {0}")]
    ConstraintAlreadyExists(String),
    /// Error when trying to add a constraint with invalid bounds
    #[error("Tried to add inequality constraint {0} with lower_bound > upper_bound")]
    InvalidConstraintBounds(String),
    /// Error when trying to add a constraint that contains variables not in the problem
    #[error("Tried to use variable {0} in a constraint, but it is not in the problem")]
    NonExistentVariablesInConstraint(String),
    /// Error when trying to add an objective term which includes variables not in the problem
    #[error("Tried to use variable {0} in the objective, but it is not in the problem")]
    NonExistentVariablesInObjective(String),
    /// Error when trying to perform an update or drop on a variable that doesn't exist
    #[error("Tried to access variable {0}, which doesn't exist")]
    NonExistentVariable(String),
    /// Error when trying to perform an update or drop on a constraint that doesn't exist
    #[error("Tried to access constraint {0}, which doesn't exist")]
    NonExistentConstraint(String),
    /// The solver backend failed
    #[error(transparent)]
    Solver(#[from] SolverError),
}
