//! Module providing representation of optimization problem variables
use std::fmt::{Display, Formatter};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// A continuous variable of an optimization problem
///
/// # Examples
/// ```rust
/// use cobrars_model::optimize::variable::VariableBuilder;
/// let x = VariableBuilder::default()
///     .id("x")
///     .lower_bound(0.0)
///     .upper_bound(20.)
///     .build()
///     .unwrap();
/// assert_eq!(x.id(), "x");
/// ```
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct Variable {
    /// Used to identify the variable (must be unique within a problem)
    #[builder(setter(into))]
    pub(crate) id: String,
    /// Optional human-readable name
    #[builder(setter(into, strip_option), default = "None")]
    pub(crate) name: Option<String>,
    /// Lowest value the variable can take, unbounded by default
    #[builder(default = "f64::NEG_INFINITY")]
    pub(crate) lower_bound: f64,
    /// Highest value the variable can take, unbounded by default
    #[builder(default = "f64::INFINITY")]
    pub(crate) upper_bound: f64,
}

impl VariableBuilder {
    fn validate(&self) -> Result<(), String> {
        if let (Some(lb), Some(ub)) = (self.lower_bound, self.upper_bound) {
            if lb > ub {
                return Err(format!(
                    "lower bound {} is greater than upper bound {}",
                    lb, ub
                ));
            }
        }
        Ok(())
    }
}

impl Variable {
    /// Create a new variable with the given bounds
    pub fn new(id: &str, lower_bound: f64, upper_bound: f64) -> Variable {
        Variable {
            id: id.to_string(),
            name: None,
            lower_bound,
            upper_bound,
        }
    }

    /// Create a new variable without bounds
    pub fn new_free(id: &str) -> Variable {
        Variable::new(id, f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    /// Return the (lower, upper) bounds as a tuple
    pub fn bounds(&self) -> (f64, f64) {
        (self.lower_bound, self.upper_bound)
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(
                f,
                "{} <= {} ({}) <= {}",
                self.lower_bound, self.id, name, self.upper_bound
            ),
            None => write!(
                f,
                "{} <= {} <= {}",
                self.lower_bound, self.id, self.upper_bound
            ),
        }
    }
}
