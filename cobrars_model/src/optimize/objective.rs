//! Provides struct for representing an optimization problem's objective
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::optimize::expression::LinearExpression;

/// Represents the Objective of an optimization problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    /// Linear expression to optimize, see [`LinearExpression`]
    expression: LinearExpression,
    /// Sense of the objective (maximize, or minimize), see [`ObjectiveSense`]
    sense: ObjectiveSense,
}

impl Objective {
    /// Create a new empty objective, with a given sense
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            expression: LinearExpression::new(),
            sense,
        }
    }

    /// Create a new empty maximization objective
    pub fn new_maximize() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new empty minimization objective
    pub fn new_minimize() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// Change the sense of the objective
    pub fn set_sense(&mut self, sense: ObjectiveSense) {
        self.sense = sense;
    }

    pub fn expression(&self) -> &LinearExpression {
        &self.expression
    }

    /// Replace the expression of the objective, returning the previous one
    pub fn set_expression(&mut self, expression: LinearExpression) -> LinearExpression {
        std::mem::replace(&mut self.expression, expression)
    }

    /// Add a new linear term to the objective
    pub fn add_linear_term(&mut self, variable: &str, coefficient: f64) {
        self.expression.add_term(variable, coefficient);
    }

    /// Set the coefficient of a variable in the objective, zero removes the term
    pub fn set_coefficient(&mut self, variable: &str, coefficient: f64) {
        self.expression.set_coefficient(variable, coefficient);
    }

    /// Remove any terms which include the variable
    pub fn remove_terms_with_variable(&mut self, variable: &str) -> Option<f64> {
        self.expression.remove_variable(variable)
    }

    /// Remove all terms from the objective
    pub fn remove_all_terms(&mut self) {
        self.expression = LinearExpression::new();
    }
}

impl Display for Objective {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.sense, self.expression)
    }
}

/// Represents the sense of the objective, whether it should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveSense {
    /// The objective should be minimized
    Minimize,
    /// The objective should be maximized
    Maximize,
}

impl ObjectiveSense {
    /// +1 for maximization, -1 for minimization
    pub fn sign(&self) -> f64 {
        match self {
            ObjectiveSense::Maximize => 1.,
            ObjectiveSense::Minimize => -1.,
        }
    }
}

impl Display for ObjectiveSense {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectiveSense::Minimize => write!(f, "min"),
            ObjectiveSense::Maximize => write!(f, "max"),
        }
    }
}

impl FromStr for ObjectiveSense {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "max" | "maximize" | "maximise" => Ok(ObjectiveSense::Maximize),
            "min" | "minimize" | "minimise" => Ok(ObjectiveSense::Minimize),
            other => Err(format!("unknown objective direction: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sense_parsing() {
        assert_eq!(
            "max".parse::<ObjectiveSense>().unwrap(),
            ObjectiveSense::Maximize
        );
        assert_eq!(
            "Minimize".parse::<ObjectiveSense>().unwrap(),
            ObjectiveSense::Minimize
        );
        assert!("sideways".parse::<ObjectiveSense>().is_err());
    }

    #[test]
    fn replace_expression() {
        let mut objective = Objective::new_maximize();
        objective.add_linear_term("x", 1.);
        let previous = objective.set_expression(LinearExpression::from_terms([("y", 2.)]));
        assert_eq!(previous, LinearExpression::from_terms([("x", 1.)]));
        assert_eq!(format!("{}", objective), "max: 2*y");
    }
}
