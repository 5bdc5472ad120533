//! Provides struct for representing a constraint in an optimization problem
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::optimize::expression::LinearExpression;

/// Represents a linear constraint in an optimization problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// Represents an equality constraint, where `terms` = `equals`
    Equality {
        /// Identifier of the constraint
        id: String,
        /// Linear terms which are added together, see [`LinearExpression`]
        terms: LinearExpression,
        /// The right hand side of the equality constraint
        equals: f64,
    },
    /// Represents an inequality constraint, `lower_bound` <= `terms` <= `upper_bound`
    Inequality {
        /// Identifier of the constraint
        id: String,
        /// Linear terms which are added together, see [`LinearExpression`]
        terms: LinearExpression,
        /// The lowest value the sum of the terms can take
        lower_bound: f64,
        /// The highest value the sum of the terms can take
        upper_bound: f64,
    },
}

impl Constraint {
    /// Create a new equality constraint
    ///
    /// # Parameters
    /// - `id`: Identifier of the constraint
    /// - `variables`: A slice of variable ids
    /// - `coefficients`: A slice of coefficients for the variables
    /// - `equals`: The right hand side of the equality
    ///
    /// # Examples
    /// ```rust
    /// use cobrars_model::optimize::constraint::Constraint;
    /// // Create a constraint representing 3*x + 2*y = 6
    /// let new_constraint = Constraint::new_equality("c1", &["x", "y"], &[3.0, 2.0], 6.);
    /// assert_eq!(format!("{}", new_constraint), "3*x + 2*y = 6");
    /// ```
    pub fn new_equality(id: &str, variables: &[&str], coefficients: &[f64], equals: f64) -> Self {
        Constraint::Equality {
            id: id.to_string(),
            terms: Constraint::zip_into_terms(variables, coefficients),
            equals,
        }
    }

    /// Create a new inequality constraint
    ///
    /// # Examples
    /// ```rust
    /// use cobrars_model::optimize::constraint::Constraint;
    /// // represents the inequality 2 <= 3*x + 2*y <= 6
    /// let new_constraint = Constraint::new_inequality("c1", &["x", "y"], &[3.0, 2.0], 2., 6.);
    /// assert_eq!(new_constraint.bounds(), (2., 6.));
    /// ```
    pub fn new_inequality(
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Self {
        Constraint::Inequality {
            id: id.to_string(),
            terms: Constraint::zip_into_terms(variables, coefficients),
            lower_bound,
            upper_bound,
        }
    }

    /// Take a slice of variable ids, and a slice of coefficients and zip them together into
    /// a linear expression
    fn zip_into_terms(variables: &[&str], coefficients: &[f64]) -> LinearExpression {
        LinearExpression::from_terms(
            variables
                .iter()
                .zip(coefficients)
                .map(|(var, coef)| (*var, *coef)),
        )
    }

    pub fn get_id(&self) -> &str {
        match self {
            Constraint::Equality { id, .. } | Constraint::Inequality { id, .. } => id,
        }
    }

    pub fn terms(&self) -> &LinearExpression {
        match self {
            Constraint::Equality { terms, .. } | Constraint::Inequality { terms, .. } => terms,
        }
    }

    pub(crate) fn terms_mut(&mut self) -> &mut LinearExpression {
        match self {
            Constraint::Equality { terms, .. } | Constraint::Inequality { terms, .. } => terms,
        }
    }

    /// The (lower, upper) bounds of the constraint, equal for equality constraints
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Constraint::Equality { equals, .. } => (*equals, *equals),
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => (*lower_bound, *upper_bound),
        }
    }

    /// Set the coefficient of a variable, a coefficient of zero removes the variable
    pub(crate) fn set_coefficient(&mut self, variable: &str, coefficient: f64) {
        self.terms_mut().set_coefficient(variable, coefficient);
    }

    /// Remove a variable from the constraint, returning its coefficient if it was present
    pub(crate) fn remove_variable(&mut self, variable: &str) -> Option<f64> {
        self.terms_mut().remove_variable(variable)
    }

    /// Create a string representation of the terms in the Constraint
    fn constraint_to_string(&self) -> String {
        match self {
            Constraint::Equality { terms, equals, .. } => {
                format!("{} = {}", terms, equals)
            }
            Constraint::Inequality {
                terms,
                lower_bound,
                upper_bound,
                ..
            } => {
                format!("{} <= {} <= {}", lower_bound, terms, upper_bound)
            }
        }
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.constraint_to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficients_update() {
        let mut cons = Constraint::new_equality("c", &["x", "y"], &[1., 2.], 0.);
        cons.set_coefficient("x", 0.);
        assert!(!cons.terms().has_variable("x"));
        cons.set_coefficient("z", -1.);
        assert_eq!(cons.terms().coefficient("z"), -1.);
        assert_eq!(cons.remove_variable("y"), Some(2.));
        assert_eq!(cons.get_id(), "c");
    }

    #[test]
    fn display_inequality() {
        let cons = Constraint::new_inequality("c", &["x"], &[1.], 0., 4.);
        assert_eq!(format!("{}", cons), "0 <= 1*x <= 4");
    }
}
