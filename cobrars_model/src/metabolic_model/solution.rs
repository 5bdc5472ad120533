//! Running the optimization of a model and reading back the results
use indexmap::IndexMap;
use log::{debug, warn};
use serde::Serialize;
use serde_json::{json, Value};

use crate::metabolic_model::error::ModelError;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::Reaction;
use crate::optimize::solvers::{SolverError, SolverKind};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Result of optimizing a model
///
/// Fluxes and reduced costs are keyed by reaction id, shadow prices by metabolite id. When
/// the optimization was not successful every value is NaN.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Solution {
    pub objective_value: f64,
    pub status: OptimizationStatus,
    pub fluxes: IndexMap<String, f64>,
    pub reduced_costs: IndexMap<String, f64>,
    pub shadow_prices: IndexMap<String, f64>,
}

impl Solution {
    /// Read the solution of the model's last solve
    fn from_model(model: &Model, solution: &ProblemSolution) -> Solution {
        let net = |values: Option<&IndexMap<String, f64>>, reaction: &Reaction| -> f64 {
            match values {
                Some(values) => {
                    let forward = values.get(&reaction.get_forward_id()).copied();
                    let reverse = values.get(&reaction.get_reverse_id()).copied();
                    match (forward, reverse) {
                        (Some(forward), Some(reverse)) => forward - reverse,
                        _ => f64::NAN,
                    }
                }
                None => f64::NAN,
            }
        };
        let fluxes = model
            .reactions
            .iter()
            .map(|r| (r.id.clone(), net(solution.variable_values.as_ref(), r)))
            .collect();
        let reduced_costs = model
            .reactions
            .iter()
            .map(|r| (r.id.clone(), net(solution.reduced_costs.as_ref(), r)))
            .collect();
        let shadow_prices = model
            .metabolites
            .ids()
            .map(|id| {
                let price = solution
                    .dual_values
                    .as_ref()
                    .and_then(|duals| duals.get(id).copied())
                    .unwrap_or(f64::NAN);
                (id.to_string(), price)
            })
            .collect();
        Solution {
            objective_value: solution.objective_value.unwrap_or(f64::NAN),
            status: solution.status,
            fluxes,
            reduced_costs,
            shadow_prices,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }

    /// Table of the reaction values, with one column per quantity
    ///
    /// ```json
    /// {"index": ["PGI", ...], "fluxes": [4.9, ...], "reduced_costs": [0.0, ...]}
    /// ```
    /// Non-finite values are written as `null`.
    pub fn to_json(&self) -> Value {
        json!({
            "index": self.fluxes.keys().collect::<Vec<_>>(),
            "fluxes": self.fluxes.values().collect::<Vec<_>>(),
            "reduced_costs": self.reduced_costs.values().collect::<Vec<_>>(),
        })
    }
}

impl Model {
    /// Optimize the model and collect the full solution
    ///
    /// If the optimization doesn't reach an optimal solution a warning is logged and a
    /// solution filled with NaN is returned, or, with `raise_error`, an
    /// [`ModelError::Optimization`] error.
    pub fn optimize(&mut self, raise_error: bool) -> Result<Solution, ModelError> {
        let status = self.run_solver()?;
        if !status.is_optimal() {
            if raise_error {
                return Err(ModelError::Optimization { status });
            }
            warn!(
                "Optimization of model {} finished with status {}",
                self.id.as_deref().unwrap_or("<unnamed>"),
                status
            );
        }
        let unsolved = ProblemSolution::unsolved(status);
        let solution = self.problem.solution().unwrap_or(&unsolved);
        Ok(Solution::from_model(self, solution))
    }

    /// Optimize the model and only return the objective value, NaN if no optimum was found
    ///
    /// # Examples
    /// ```rust
    /// use cobrars_model::metabolic_model::model::Model;
    /// use cobrars_model::metabolic_model::reaction::ReactionBuilder;
    /// let mut model = Model::new("toy");
    /// let uptake = ReactionBuilder::default()
    ///     .id("EX_a").metabolite("a", -1.).lower_bound(-5.).upper_bound(0.)
    ///     .build().unwrap();
    /// let sink = ReactionBuilder::default()
    ///     .id("SK_a").metabolite("a", -1.).lower_bound(0.).upper_bound(1000.)
    ///     .build().unwrap();
    /// model.add_reactions([uptake, sink]).unwrap();
    /// model.set_objective("SK_a", false).unwrap();
    /// assert!((model.slim_optimize() - 5.).abs() < 1e-5);
    /// ```
    pub fn slim_optimize(&mut self) -> f64 {
        match self.slim_optimize_or(Some(f64::NAN)) {
            Ok(value) => value,
            Err(err) => {
                warn!("Optimization failed: {}", err);
                f64::NAN
            }
        }
    }

    /// Optimize the model and only return the objective value
    ///
    /// On a non-optimal status `error_value` is returned, or if it is `None`, an
    /// [`ModelError::Optimization`] error.
    pub fn slim_optimize_or(&mut self, error_value: Option<f64>) -> Result<f64, ModelError> {
        let status = self.run_solver()?;
        if status.is_optimal() {
            return Ok(self
                .problem
                .solution()
                .and_then(|solution| solution.objective_value)
                .unwrap_or(f64::NAN));
        }
        match error_value {
            Some(value) => Ok(value),
            None => Err(ModelError::Optimization { status }),
        }
    }

    fn run_solver(&mut self) -> Result<OptimizationStatus, ModelError> {
        let solver = self.solver.build()?;
        debug!(
            "Optimizing model {} with {}",
            self.id.as_deref().unwrap_or("<unnamed>"),
            solver.name()
        );
        let solution = self.problem.optimize(solver.as_ref())?;
        Ok(solution.status)
    }

    /// Status of the last optimization
    pub fn status(&self) -> OptimizationStatus {
        self.problem.status()
    }

    /// Net flux of a reaction in the last solution
    pub fn flux(&self, reaction_id: &str) -> Result<f64, ModelError> {
        let reaction = self.reactions.get_by_id(reaction_id)?;
        Ok(self.net_value(reaction, |solution| solution.variable_values.as_ref()))
    }

    /// Reduced cost of a reaction in the last solution
    pub fn reduced_cost(&self, reaction_id: &str) -> Result<f64, ModelError> {
        let reaction = self.reactions.get_by_id(reaction_id)?;
        Ok(self.net_value(reaction, |solution| solution.reduced_costs.as_ref()))
    }

    /// Value of any problem variable in the last solution
    pub fn primal(&self, variable_id: &str) -> Result<f64, ModelError> {
        if !self.problem.has_variable(variable_id) {
            return Err(ModelError::not_found("Variable", variable_id));
        }
        Ok(self.problem.primal(variable_id).unwrap_or(f64::NAN))
    }

    fn net_value<F>(&self, reaction: &Reaction, values: F) -> f64
    where
        F: Fn(&ProblemSolution) -> Option<&IndexMap<String, f64>>,
    {
        let Some(values) = self.problem.solution().and_then(values) else {
            return f64::NAN;
        };
        match (
            values.get(&reaction.get_forward_id()),
            values.get(&reaction.get_reverse_id()),
        ) {
            (Some(forward), Some(reverse)) => forward - reverse,
            _ => f64::NAN,
        }
    }

    /// Switch the solver backend
    ///
    /// Switching to another backend rebuilds the optimization problem, switching to the
    /// current backend does nothing.
    pub fn set_solver(&mut self, name: &str) -> Result<(), ModelError> {
        let kind = name.parse::<SolverKind>().map_err(|err| match err {
            SolverError::UnknownSolver(name) | SolverError::Unavailable(name) => {
                ModelError::SolverNotFound(name)
            }
            SolverError::Backend(message) => ModelError::SolverNotFound(message),
        })?;
        if !kind.is_available() {
            return Err(ModelError::SolverNotFound(kind.name().to_string()));
        }
        if kind == self.solver {
            return Ok(());
        }
        debug!("Switching solver from {} to {}", self.solver, kind);
        self.problem = self.problem.duplicate();
        self.solver = kind;
        Ok(())
    }
}
