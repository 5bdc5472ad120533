//! Process wide defaults used when building reactions and models
use std::sync::{LazyLock, RwLock};

use crate::optimize::solvers::SolverKind;

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    /// Default lower flux bound of new reactions
    pub lower_bound: f64,
    /// Default upper flux bound of new reactions
    pub upper_bound: f64,
    /// Numerical tolerance used when classifying solver output
    pub tolerance: f64,
    /// Solver backend used by new models
    pub solver: SolverKind,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: -1000.,
            upper_bound: 1000.,
            tolerance: 1e-07,
            solver: SolverKind::Clarabel,
        }
    }
}

/// Snapshot of the current configuration
///
/// A poisoned lock still holds a complete configuration, so it is read through.
pub fn current() -> Configuration {
    CONFIGURATION
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}
