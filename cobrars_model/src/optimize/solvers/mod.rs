//! Solver interfaces
//!
//! A [`Problem`](crate::optimize::problem::Problem) is lowered into a backend independent
//! [`StandardForm`] which is then handed to a [`Solver`] implementation.
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use cfg_if::cfg_if;
use nalgebra_sparse::{CscMatrix, CsrMatrix};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::OptimizationStatus;

pub mod clarabel;

cfg_if! {
    if #[cfg(feature = "minilp")] {
        pub mod microlp;
    }
}

cfg_if! {
    if #[cfg(feature = "highs")] {
        pub mod highs;
    }
}

/// Common interface of the linear programming backends
pub trait Solver {
    /// Name of the backend
    fn name(&self) -> &'static str;

    /// Whether the backend reports dual values (shadow prices and reduced costs)
    fn provides_duals(&self) -> bool;

    /// Solve the problem in standard form
    fn solve(&self, problem: &StandardForm) -> Result<SolverOutput, SolverError>;
}

/// Linear program in the form used by all backends
///
/// optimize `costs · x` subject to `row_bounds.0 <= A x <= row_bounds.1` and
/// `variable_bounds.0 <= x <= variable_bounds.1`. Infinite bounds are allowed.
#[derive(Debug, Clone)]
pub struct StandardForm {
    /// Whether the objective is maximized or minimized
    pub sense: ObjectiveSense,
    /// Objective coefficient for each column
    pub costs: Vec<f64>,
    /// (lower, upper) bound for each column
    pub variable_bounds: Vec<(f64, f64)>,
    /// Constraint matrix, one row per constraint and one column per variable
    pub constraint_matrix: CscMatrix<f64>,
    /// (lower, upper) bound for each row
    pub row_bounds: Vec<(f64, f64)>,
}

impl StandardForm {
    pub fn num_variables(&self) -> usize {
        self.costs.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.row_bounds.len()
    }

    /// Non-zero (column, coefficient) entries of every row
    pub fn row_terms(&self) -> Vec<Vec<(usize, f64)>> {
        let csr = CsrMatrix::from(&self.constraint_matrix);
        csr.row_iter()
            .map(|row| {
                row.col_indices()
                    .iter()
                    .copied()
                    .zip(row.values().iter().copied())
                    .collect()
            })
            .collect()
    }

    /// Value of the objective for the given column values
    pub fn objective_value(&self, primal: &[f64]) -> f64 {
        self.costs.iter().zip(primal).map(|(c, x)| c * x).sum()
    }

    /// Reduced cost of every column, `c_j - sum_i a_ij * y_i`
    ///
    /// `row_duals` must be expressed in the sense of the objective, so that increasing the
    /// right hand side of row `i` by one changes the objective by `y_i`.
    pub fn reduced_costs(&self, row_duals: &[f64]) -> Vec<f64> {
        (0..self.num_variables())
            .map(|j| {
                let col = self.constraint_matrix.col(j);
                let activity: f64 = col
                    .row_indices()
                    .iter()
                    .zip(col.values())
                    .map(|(i, a)| a * row_duals[*i])
                    .sum();
                self.costs[j] - activity
            })
            .collect()
    }
}

/// Raw result of a backend, indexed like the [`StandardForm`] it solved
#[derive(Debug, Clone)]
pub struct SolverOutput {
    pub status: OptimizationStatus,
    /// Column values, empty if the status is not optimal
    pub primal: Vec<f64>,
    /// Shadow price of each row in the sense of the objective
    pub row_duals: Option<Vec<f64>>,
    /// Reduced cost of each column in the sense of the objective
    pub reduced_costs: Option<Vec<f64>>,
}

impl SolverOutput {
    /// Output for a problem without a usable solution
    pub fn failed(status: OptimizationStatus) -> Self {
        Self {
            status,
            primal: Vec::new(),
            row_duals: None,
            reduced_costs: None,
        }
    }
}

/// Available solver backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolverKind {
    /// Interior point solver, always available
    Clarabel,
    /// Pure rust simplex solver, requires the `minilp` feature
    Microlp,
    /// HiGHS solver, requires the `highs` feature
    Highs,
}

impl SolverKind {
    pub fn name(&self) -> &'static str {
        match self {
            SolverKind::Clarabel => "clarabel",
            SolverKind::Microlp => "microlp",
            SolverKind::Highs => "highs",
        }
    }

    /// Whether the backend was compiled in
    pub fn is_available(&self) -> bool {
        match self {
            SolverKind::Clarabel => true,
            SolverKind::Microlp => cfg!(feature = "minilp"),
            SolverKind::Highs => cfg!(feature = "highs"),
        }
    }

    /// All backends compiled into this build
    pub fn available() -> Vec<SolverKind> {
        [SolverKind::Clarabel, SolverKind::Microlp, SolverKind::Highs]
            .into_iter()
            .filter(|kind| kind.is_available())
            .collect()
    }

    /// Create an instance of the backend
    pub fn build(&self) -> Result<Box<dyn Solver>, SolverError> {
        match self {
            SolverKind::Clarabel => Ok(Box::new(clarabel::ClarabelSolver::default())),
            SolverKind::Microlp => build_microlp(),
            SolverKind::Highs => build_highs(),
        }
    }
}

cfg_if! {
    if #[cfg(feature = "minilp")] {
        fn build_microlp() -> Result<Box<dyn Solver>, SolverError> {
            Ok(Box::new(microlp::MicrolpSolver::default()))
        }
    } else {
        fn build_microlp() -> Result<Box<dyn Solver>, SolverError> {
            Err(SolverError::Unavailable(SolverKind::Microlp.name().to_string()))
        }
    }
}

cfg_if! {
    if #[cfg(feature = "highs")] {
        fn build_highs() -> Result<Box<dyn Solver>, SolverError> {
            Ok(Box::new(highs::HighsSolver::default()))
        }
    } else {
        fn build_highs() -> Result<Box<dyn Solver>, SolverError> {
            Err(SolverError::Unavailable(SolverKind::Highs.name().to_string()))
        }
    }
}

impl Display for SolverKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SolverKind {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clarabel" => Ok(SolverKind::Clarabel),
            "microlp" | "minilp" => Ok(SolverKind::Microlp),
            "highs" => Ok(SolverKind::Highs),
            other => Err(SolverError::UnknownSolver(other.to_string())),
        }
    }
}

/// Errors raised by the solver interfaces
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The name doesn't correspond to any backend
    #[error("Unknown solver {0}")]
    UnknownSolver(String),
    /// The backend exists but was not compiled in
    #[error("Solver {0} is not available in this build")]
    Unavailable(String),
    /// The backend failed for a reason other than the problem status
    #[error("Solver backend failed: {0}")]
    Backend(String),
}
