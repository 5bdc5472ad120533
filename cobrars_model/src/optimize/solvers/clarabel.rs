//! Implements a solver interface for Clarabel
use clarabel::algebra::CscMatrix as ClarabelMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use log::debug;
use nalgebra_sparse::{CooMatrix, CscMatrix};

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::{Solver, SolverError, SolverOutput, StandardForm};
use crate::optimize::OptimizationStatus;

/// Interior point backend
///
/// Clarabel solves `min 1/2 x'Px + q'x` subject to `Ax + s = b` with `s` in a product of
/// cones. Equality rows go into a zero cone, every finite side of a ranged row or variable
/// bound becomes one row of a non-negative cone.
#[derive(Clone, Debug)]
pub struct ClarabelSolver {
    max_iter: u32,
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        Self { max_iter: 200 }
    }
}

/// Which side of the original row a cone row represents
#[derive(Clone, Copy, Debug)]
enum RowSide {
    Equal,
    Upper,
    Lower,
}

/// Origin of a cone row, either a constraint row or a variable bound
#[derive(Clone, Copy, Debug)]
enum RowOrigin {
    Constraint(usize),
    Bound(usize),
}

struct ConeRow {
    origin: RowOrigin,
    side: RowSide,
    terms: Vec<(usize, f64)>,
    rhs: f64,
}

impl ClarabelSolver {
    pub fn new(max_iter: u32) -> Self {
        Self { max_iter }
    }

    /// Split the ranged rows and the variable bounds into cone rows, equalities first
    fn cone_rows(problem: &StandardForm) -> (Vec<ConeRow>, Vec<ConeRow>) {
        let mut equalities = Vec::new();
        let mut inequalities = Vec::new();
        let rows = problem
            .row_terms()
            .into_iter()
            .zip(problem.row_bounds.iter())
            .enumerate()
            .map(|(i, (terms, bounds))| (RowOrigin::Constraint(i), terms, *bounds));
        let bounds = problem
            .variable_bounds
            .iter()
            .enumerate()
            .map(|(j, bounds)| (RowOrigin::Bound(j), vec![(j, 1.)], *bounds));
        for (origin, terms, (lb, ub)) in rows.chain(bounds) {
            if lb == ub {
                equalities.push(ConeRow {
                    origin,
                    side: RowSide::Equal,
                    terms,
                    rhs: ub,
                });
                continue;
            }
            if ub.is_finite() {
                inequalities.push(ConeRow {
                    origin,
                    side: RowSide::Upper,
                    terms: terms.clone(),
                    rhs: ub,
                });
            }
            if lb.is_finite() {
                inequalities.push(ConeRow {
                    origin,
                    side: RowSide::Lower,
                    terms: terms.iter().map(|(j, a)| (*j, -a)).collect(),
                    rhs: -lb,
                });
            }
        }
        (equalities, inequalities)
    }

    fn map_status(status: SolverStatus) -> OptimizationStatus {
        match status {
            SolverStatus::Solved => OptimizationStatus::Optimal,
            SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                OptimizationStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                OptimizationStatus::Unbounded
            }
            SolverStatus::MaxIterations
            | SolverStatus::MaxTime
            | SolverStatus::InsufficientProgress => OptimizationStatus::SolverHalted,
            _ => OptimizationStatus::NumericalError,
        }
    }
}

impl Solver for ClarabelSolver {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn provides_duals(&self) -> bool {
        true
    }

    fn solve(&self, problem: &StandardForm) -> Result<SolverOutput, SolverError> {
        let n = problem.num_variables();
        if n == 0 {
            return Ok(SolverOutput {
                status: OptimizationStatus::Optimal,
                primal: Vec::new(),
                row_duals: Some(vec![0.; problem.num_constraints()]),
                reduced_costs: Some(Vec::new()),
            });
        }
        let (equalities, inequalities) = Self::cone_rows(problem);
        let cone_rows: Vec<ConeRow> = equalities.into_iter().chain(inequalities).collect();
        let num_equalities = cone_rows
            .iter()
            .filter(|row| matches!(row.side, RowSide::Equal))
            .count();
        let num_inequalities = cone_rows.len() - num_equalities;

        let mut coo = CooMatrix::new(cone_rows.len(), n);
        for (i, row) in cone_rows.iter().enumerate() {
            for (j, a) in &row.terms {
                coo.push(i, *j, *a);
            }
        }
        let (col_offsets, row_indices, values) = CscMatrix::from(&coo).disassemble();
        let a = ClarabelMatrix::new(cone_rows.len(), n, col_offsets, row_indices, values);
        let b: Vec<f64> = cone_rows.iter().map(|row| row.rhs).collect();
        let p = ClarabelMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());
        let q: Vec<f64> = match problem.sense {
            ObjectiveSense::Maximize => problem.costs.iter().map(|c| -c).collect(),
            ObjectiveSense::Minimize => problem.costs.clone(),
        };
        let mut cones = Vec::new();
        if num_equalities > 0 {
            cones.push(SupportedConeT::ZeroConeT(num_equalities));
        }
        if num_inequalities > 0 {
            cones.push(SupportedConeT::NonnegativeConeT(num_inequalities));
        }

        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .max_iter(self.max_iter)
            .build()
            .map_err(|err| SolverError::Backend(err.to_string()))?;
        debug!(
            "Solving with clarabel: {} variables, {} cone rows",
            n,
            cone_rows.len()
        );
        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = Self::map_status(solver.solution.status);
        if !status.is_optimal() {
            return Ok(SolverOutput::failed(status));
        }

        // Dual of each original row in the objective's own sense
        let sign = problem.sense.sign();
        let mut row_duals = vec![0.; problem.num_constraints()];
        for (row, z) in cone_rows.iter().zip(solver.solution.z.iter()) {
            if let RowOrigin::Constraint(i) = row.origin {
                match row.side {
                    RowSide::Equal | RowSide::Upper => row_duals[i] += sign * z,
                    RowSide::Lower => row_duals[i] -= sign * z,
                }
            }
        }
        let reduced_costs = problem.reduced_costs(&row_duals);
        Ok(SolverOutput {
            status,
            primal: solver.solution.x.clone(),
            row_duals: Some(row_duals),
            reduced_costs: Some(reduced_costs),
        })
    }
}
