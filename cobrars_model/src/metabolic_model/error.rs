//! Errors raised by the model layer
use thiserror::Error;

use crate::io::gpr_parse::GprParseError;
use crate::optimize::problem::ProblemError;
use crate::optimize::solvers::SolverError;
use crate::optimize::OptimizationStatus;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Lookup of an id which isn't part of the model
    #[error("{kind} {id} is not part of the model")]
    NotFound { kind: &'static str, id: String },
    /// Objective was given as a value which can't describe an objective
    #[error("Objective can't be built from {0}")]
    InvalidObjectiveType(String),
    /// Objective refers to reactions which can't be resolved
    #[error("Invalid objective: {0}")]
    InvalidObjective(String),
    /// Solver name is unknown, or the backend isn't compiled in
    #[error("Solver {0} could not be found")]
    SolverNotFound(String),
    /// Optimization finished with a non-optimal status
    #[error("Optimization failed with status {status}")]
    Optimization { status: OptimizationStatus },
    #[error("Invalid bounds for {id}: lower bound {lower_bound} is greater than upper bound {upper_bound}")]
    InvalidBounds {
        id: String,
        lower_bound: f64,
        upper_bound: f64,
    },
    /// Boundary reaction could not be created
    #[error("Invalid boundary: {0}")]
    InvalidBoundary(String),
    /// Variable or constraint is owned by a reaction or metabolite
    #[error("{0} is managed by a reaction or metabolite and can't be removed directly")]
    ManagedConsVar(String),
    #[error(transparent)]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error(transparent)]
    GprParse(#[from] GprParseError),
}

impl ModelError {
    pub(crate) fn not_found(kind: &'static str, id: &str) -> Self {
        ModelError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
