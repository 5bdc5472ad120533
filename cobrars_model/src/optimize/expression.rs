//! Provides a sparse linear expression over problem variables, shared by constraints and
//! objectives
use std::fmt::{Display, Formatter};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A linear combination of variables, keyed by variable id
///
/// Terms keep their insertion order. Equality is by content: two expressions are equal when
/// they have the same non-zero coefficient for every variable, regardless of term order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearExpression {
    terms: IndexMap<String, f64>,
}

impl LinearExpression {
    /// Create a new empty expression
    pub fn new() -> Self {
        Self {
            terms: IndexMap::new(),
        }
    }

    /// Create an expression from (variable id, coefficient) pairs, accumulating repeated
    /// variables
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut expression = Self::new();
        for (var, coef) in terms {
            expression.add_term(var, coef);
        }
        expression
    }

    /// Add `coefficient * variable` to the expression
    pub fn add_term<S: Into<String>>(&mut self, variable: S, coefficient: f64) {
        *self.terms.entry(variable.into()).or_insert(0.) += coefficient;
    }

    /// Overwrite the coefficient of a variable, a coefficient of zero removes the term
    pub fn set_coefficient(&mut self, variable: &str, coefficient: f64) {
        if coefficient == 0. {
            self.terms.shift_remove(variable);
        } else if let Some(coef) = self.terms.get_mut(variable) {
            *coef = coefficient;
        } else {
            self.terms.insert(variable.to_string(), coefficient);
        }
    }

    /// Coefficient of a variable, zero if the variable is not part of the expression
    pub fn coefficient(&self, variable: &str) -> f64 {
        self.terms.get(variable).copied().unwrap_or(0.)
    }

    /// Remove a variable from the expression, returning its coefficient if it was present
    pub fn remove_variable(&mut self, variable: &str) -> Option<f64> {
        self.terms.shift_remove(variable)
    }

    /// Whether the variable appears in the expression
    pub fn has_variable(&self, variable: &str) -> bool {
        self.terms.contains_key(variable)
    }

    /// Iterate over the (variable id, coefficient) terms
    pub fn terms(&self) -> impl Iterator<Item = (&str, f64)> {
        self.terms.iter().map(|(var, coef)| (var.as_str(), *coef))
    }

    /// Ids of the variables in the expression
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(|var| var.as_str())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Return an equivalent expression without zero terms
    pub fn simplify(&self) -> Self {
        Self {
            terms: self
                .terms
                .iter()
                .filter(|(_, coef)| **coef != 0.)
                .map(|(var, coef)| (var.clone(), *coef))
                .collect(),
        }
    }

    /// Evaluate the expression for the given variable values, variables without a value
    /// count as zero
    pub fn evaluate(&self, values: &IndexMap<String, f64>) -> f64 {
        self.terms
            .iter()
            .map(|(var, coef)| coef * values.get(var).copied().unwrap_or(0.))
            .sum()
    }

    /// Rename the variables of the expression according to `mapping`, variables not in the
    /// mapping keep their id
    pub fn rename_variables(&self, mapping: &IndexMap<String, String>) -> Self {
        Self::from_terms(self.terms.iter().map(|(var, coef)| {
            (
                mapping.get(var).cloned().unwrap_or_else(|| var.clone()),
                *coef,
            )
        }))
    }
}

impl PartialEq for LinearExpression {
    fn eq(&self, other: &Self) -> bool {
        let left = self.simplify();
        let right = other.simplify();
        left.terms.len() == right.terms.len()
            && left
                .terms
                .iter()
                .all(|(var, coef)| right.terms.get(var) == Some(coef))
    }
}

impl AddAssign<&LinearExpression> for LinearExpression {
    fn add_assign(&mut self, rhs: &LinearExpression) {
        for (var, coef) in rhs.terms() {
            self.add_term(var, coef);
        }
    }
}

impl Add<&LinearExpression> for &LinearExpression {
    type Output = LinearExpression;

    fn add(self, rhs: &LinearExpression) -> LinearExpression {
        let mut sum = self.clone();
        sum += rhs;
        sum
    }
}

impl Neg for &LinearExpression {
    type Output = LinearExpression;

    fn neg(self) -> LinearExpression {
        self * -1.
    }
}

impl Sub<&LinearExpression> for &LinearExpression {
    type Output = LinearExpression;

    fn sub(self, rhs: &LinearExpression) -> LinearExpression {
        self + &(-rhs)
    }
}

impl Mul<f64> for &LinearExpression {
    type Output = LinearExpression;

    fn mul(self, rhs: f64) -> LinearExpression {
        LinearExpression {
            terms: self
                .terms
                .iter()
                .map(|(var, coef)| (var.clone(), coef * rhs))
                .collect(),
        }
    }
}

impl Display for LinearExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        for (position, (var, coef)) in self.terms.iter().enumerate() {
            match (position, coef.is_sign_negative()) {
                (0, false) => write!(f, "{}*{}", coef, var)?,
                (0, true) => write!(f, "-{}*{}", coef.abs(), var)?,
                (_, false) => write!(f, " + {}*{}", coef, var)?,
                (_, true) => write!(f, " - {}*{}", coef.abs(), var)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_terms() {
        let mut expr = LinearExpression::from_terms([("x", 1.), ("y", 2.)]);
        expr.add_term("x", 2.);
        assert_eq!(expr.coefficient("x"), 3.);
        assert_eq!(expr.coefficient("y"), 2.);
        assert_eq!(expr.coefficient("z"), 0.);
        expr.set_coefficient("y", 0.);
        assert!(!expr.has_variable("y"));
    }

    #[test]
    fn equality_ignores_order_and_zeros() {
        let left = LinearExpression::from_terms([("x", 1.), ("y", -1.), ("z", 0.)]);
        let right = LinearExpression::from_terms([("y", -1.), ("x", 1.)]);
        assert_eq!(left, right);
        let different = LinearExpression::from_terms([("y", -1.), ("x", 2.)]);
        assert_ne!(left, different);
    }

    #[test]
    fn arithmetic() {
        let a = LinearExpression::from_terms([("x", 1.), ("y", -1.)]);
        let b = LinearExpression::from_terms([("x", 1.)]);
        assert_eq!(&a - &b, LinearExpression::from_terms([("y", -1.)]));
        assert_eq!(&a * 2., LinearExpression::from_terms([("x", 2.), ("y", -2.)]));
        assert_eq!(
            &a + &b,
            LinearExpression::from_terms([("x", 2.), ("y", -1.)])
        );
    }

    #[test]
    fn display() {
        let expr = LinearExpression::from_terms([("x", 1.), ("y", -2.)]);
        assert_eq!(format!("{}", expr), "1*x - 2*y");
        assert_eq!(format!("{}", LinearExpression::new()), "0");
    }
}
