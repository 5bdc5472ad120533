//! Implements a solver interface for HiGHS
use highs::{HighsModelStatus, RowProblem, Sense};
use log::debug;

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::{Solver, SolverError, SolverOutput, StandardForm};
use crate::optimize::OptimizationStatus;

#[derive(Clone, Debug, Default)]
pub struct HighsSolver {}

impl Solver for HighsSolver {
    fn name(&self) -> &'static str {
        "highs"
    }

    fn provides_duals(&self) -> bool {
        true
    }

    fn solve(&self, problem: &StandardForm) -> Result<SolverOutput, SolverError> {
        let mut lp = RowProblem::default();
        let columns: Vec<_> = problem
            .costs
            .iter()
            .zip(problem.variable_bounds.iter())
            .map(|(cost, (lb, ub))| lp.add_column(*cost, *lb..=*ub))
            .collect();
        for (terms, (lb, ub)) in problem.row_terms().into_iter().zip(&problem.row_bounds) {
            let row: Vec<_> = terms.iter().map(|(j, a)| (columns[*j], *a)).collect();
            lp.add_row(*lb..=*ub, row);
        }
        let sense = match problem.sense {
            ObjectiveSense::Maximize => Sense::Maximise,
            ObjectiveSense::Minimize => Sense::Minimise,
        };
        let mut model = lp.optimise(sense);
        model.make_quiet();
        debug!("Solving with highs: {} variables", columns.len());
        let solved = model.solve();
        let status = match solved.status() {
            HighsModelStatus::Optimal => OptimizationStatus::Optimal,
            HighsModelStatus::Infeasible => OptimizationStatus::Infeasible,
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                OptimizationStatus::Unbounded
            }
            HighsModelStatus::ReachedTimeLimit | HighsModelStatus::ReachedIterationLimit => {
                OptimizationStatus::SolverHalted
            }
            other => {
                debug!("HiGHS finished with status {:?}", other);
                OptimizationStatus::NumericalError
            }
        };
        if !status.is_optimal() {
            return Ok(SolverOutput::failed(status));
        }
        let solution = solved.get_solution();
        let row_duals = solution.dual_rows().to_vec();
        if row_duals.len() != problem.num_constraints() {
            return Err(SolverError::Backend(format!(
                "HiGHS returned {} row duals for {} rows",
                row_duals.len(),
                problem.num_constraints()
            )));
        }
        Ok(SolverOutput {
            status,
            primal: solution.columns().to_vec(),
            reduced_costs: Some(problem.reduced_costs(&row_duals)),
            row_duals: Some(row_duals),
        })
    }
}
