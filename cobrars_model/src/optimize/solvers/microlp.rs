//! Implements a solver interface for microlp
use log::debug;
use microlp::{ComparisonOp, OptimizationDirection};

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::{Solver, SolverError, SolverOutput, StandardForm};
use crate::optimize::OptimizationStatus;

/// Simplex backend written in pure rust, doesn't report dual values
#[derive(Clone, Debug, Default)]
pub struct MicrolpSolver {}

impl Solver for MicrolpSolver {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn provides_duals(&self) -> bool {
        false
    }

    fn solve(&self, problem: &StandardForm) -> Result<SolverOutput, SolverError> {
        let direction = match problem.sense {
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
        };
        let mut lp = microlp::Problem::new(direction);
        let columns: Vec<microlp::Variable> = problem
            .costs
            .iter()
            .zip(problem.variable_bounds.iter())
            .map(|(cost, bounds)| lp.add_var(*cost, *bounds))
            .collect();
        for (terms, (lb, ub)) in problem.row_terms().into_iter().zip(&problem.row_bounds) {
            // empty rows make microlp fail, they are feasible when the bounds include zero
            if terms.is_empty() {
                if *lb > 0. || *ub < 0. {
                    return Ok(SolverOutput::failed(OptimizationStatus::Infeasible));
                }
                continue;
            }
            let expr: Vec<(microlp::Variable, f64)> =
                terms.iter().map(|(j, a)| (columns[*j], *a)).collect();
            if lb == ub {
                lp.add_constraint(expr.as_slice(), ComparisonOp::Eq, *ub);
                continue;
            }
            if lb.is_finite() {
                lp.add_constraint(expr.as_slice(), ComparisonOp::Ge, *lb);
            }
            if ub.is_finite() {
                lp.add_constraint(expr.as_slice(), ComparisonOp::Le, *ub);
            }
        }
        debug!("Solving with microlp: {} variables", columns.len());
        match lp.solve() {
            Ok(solution) => Ok(SolverOutput {
                status: OptimizationStatus::Optimal,
                primal: columns.iter().map(|var| solution[*var]).collect(),
                row_duals: None,
                reduced_costs: None,
            }),
            Err(microlp::Error::Infeasible) => {
                Ok(SolverOutput::failed(OptimizationStatus::Infeasible))
            }
            Err(microlp::Error::Unbounded) => {
                Ok(SolverOutput::failed(OptimizationStatus::Unbounded))
            }
            Err(microlp::Error::InternalError(msg)) => Err(SolverError::Backend(msg)),
        }
    }
}
