//! Setting the objective of a model from the different ways an objective can be described
use indexmap::IndexMap;
use serde_json::Value;

use crate::metabolic_model::error::ModelError;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::{flux_expression, Reaction};
use crate::optimize::expression::LinearExpression;
use crate::optimize::objective::{Objective, ObjectiveSense};

/// Description of a model objective
///
/// Every variant resolves to a linear expression over reaction fluxes (or, for
/// [`ObjectiveSpec::Expression`], over arbitrary problem variables).
#[derive(Clone, Debug, PartialEq)]
pub enum ObjectiveSpec {
    /// Flux of a single reaction
    ReactionId(String),
    /// Weighted sum of reaction fluxes, keyed by reaction id
    Coefficients(IndexMap<String, f64>),
    /// Sum of reaction fluxes
    Reactions(Vec<String>),
    /// Flux of the reaction at a position in the model
    Index(usize),
    /// Sum of the fluxes of the reactions at the positions
    Indices(Vec<usize>),
    /// Ready made expression over problem variables
    Expression(LinearExpression),
}

impl From<&str> for ObjectiveSpec {
    fn from(value: &str) -> Self {
        ObjectiveSpec::ReactionId(value.to_string())
    }
}

impl From<String> for ObjectiveSpec {
    fn from(value: String) -> Self {
        ObjectiveSpec::ReactionId(value)
    }
}

impl From<&Reaction> for ObjectiveSpec {
    fn from(value: &Reaction) -> Self {
        ObjectiveSpec::ReactionId(value.id.clone())
    }
}

impl From<usize> for ObjectiveSpec {
    fn from(value: usize) -> Self {
        ObjectiveSpec::Index(value)
    }
}

impl From<Vec<usize>> for ObjectiveSpec {
    fn from(value: Vec<usize>) -> Self {
        ObjectiveSpec::Indices(value)
    }
}

impl From<Vec<&str>> for ObjectiveSpec {
    fn from(value: Vec<&str>) -> Self {
        ObjectiveSpec::Reactions(value.into_iter().map(String::from).collect())
    }
}

impl From<IndexMap<String, f64>> for ObjectiveSpec {
    fn from(value: IndexMap<String, f64>) -> Self {
        ObjectiveSpec::Coefficients(value)
    }
}

impl From<LinearExpression> for ObjectiveSpec {
    fn from(value: LinearExpression) -> Self {
        ObjectiveSpec::Expression(value)
    }
}

impl TryFrom<Value> for ObjectiveSpec {
    type Error = ModelError;

    /// Interpret a dynamically typed objective
    ///
    /// Strings name a reaction, non-negative integers index one, arrays hold either and
    /// objects map reaction ids to coefficients. Anything else is rejected with
    /// [`ModelError::InvalidObjectiveType`].
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(id) => Ok(ObjectiveSpec::ReactionId(id)),
            Value::Number(number) => number
                .as_u64()
                .map(|index| ObjectiveSpec::Index(index as usize))
                .ok_or_else(|| ModelError::InvalidObjectiveType(format!("number {}", number))),
            Value::Array(items) => {
                if items.iter().all(Value::is_string) {
                    Ok(ObjectiveSpec::Reactions(
                        items
                            .iter()
                            .filter_map(|item| item.as_str().map(String::from))
                            .collect(),
                    ))
                } else if items.iter().all(Value::is_u64) {
                    Ok(ObjectiveSpec::Indices(
                        items
                            .iter()
                            .filter_map(|item| item.as_u64().map(|index| index as usize))
                            .collect(),
                    ))
                } else {
                    Err(ModelError::InvalidObjectiveType(
                        "array mixing reaction ids and other values".to_string(),
                    ))
                }
            }
            Value::Object(map) => map
                .into_iter()
                .map(|(id, coef)| match coef.as_f64() {
                    Some(coef) => Ok((id, coef)),
                    None => Err(ModelError::InvalidObjectiveType(format!(
                        "coefficient {} of {}",
                        coef, id
                    ))),
                })
                .collect::<Result<IndexMap<_, _>, _>>()
                .map(ObjectiveSpec::Coefficients),
            Value::Bool(b) => Err(ModelError::InvalidObjectiveType(format!("boolean {}", b))),
            Value::Null => Err(ModelError::InvalidObjectiveType("null".to_string())),
        }
    }
}

impl Model {
    pub fn objective(&self) -> &Objective {
        self.problem.objective()
    }

    pub fn objective_direction(&self) -> ObjectiveSense {
        self.problem.objective_sense()
    }

    /// Change between maximizing and minimizing the objective
    pub fn set_objective_direction(&mut self, sense: ObjectiveSense) {
        let action = self.set_direction_raw(sense);
        self.record(action);
    }

    /// Replace the objective, or add to it when `additive` is set
    ///
    /// # Examples
    /// ```rust
    /// use cobrars_model::metabolic_model::model::Model;
    /// use cobrars_model::metabolic_model::reaction::Reaction;
    /// let mut model = Model::new("toy");
    /// model.add_reactions([Reaction::new("R1"), Reaction::new("R2")]).unwrap();
    /// model.set_objective("R1", false).unwrap();
    /// model.set_objective(1usize, true).unwrap();
    /// let coefficients = model.linear_reaction_coefficients();
    /// assert_eq!(coefficients.get("R1"), Some(&1.));
    /// assert_eq!(coefficients.get("R2"), Some(&1.));
    /// ```
    pub fn set_objective<S: Into<ObjectiveSpec>>(
        &mut self,
        spec: S,
        additive: bool,
    ) -> Result<(), ModelError> {
        let mut expression = self.resolve_objective(&spec.into())?;
        if additive {
            expression = self.problem.objective().expression() + &expression;
        }
        self.install_objective(expression)
    }

    /// Turn an objective description into an expression over problem variables
    pub fn resolve_objective(&self, spec: &ObjectiveSpec) -> Result<LinearExpression, ModelError> {
        let by_id = |id: &str| -> Result<LinearExpression, ModelError> {
            if self.reactions.contains(id) {
                Ok(flux_expression(id))
            } else {
                Err(ModelError::InvalidObjective(format!(
                    "reaction {} is not part of the model",
                    id
                )))
            }
        };
        let by_index = |index: usize| -> Result<LinearExpression, ModelError> {
            match self.reactions.get_index(index) {
                Some(reaction) => Ok(reaction.flux_expression()),
                None => Err(ModelError::InvalidObjective(format!(
                    "reaction index {} is out of range for {} reactions",
                    index,
                    self.reactions.len()
                ))),
            }
        };
        let mut expression = LinearExpression::new();
        match spec {
            ObjectiveSpec::ReactionId(id) => expression = by_id(id)?,
            ObjectiveSpec::Coefficients(coefficients) => {
                for (id, coef) in coefficients {
                    expression += &(&by_id(id)? * *coef);
                }
            }
            ObjectiveSpec::Reactions(ids) => {
                for id in ids {
                    expression += &by_id(id)?;
                }
            }
            ObjectiveSpec::Index(index) => expression = by_index(*index)?,
            ObjectiveSpec::Indices(indices) => {
                for index in indices {
                    expression += &by_index(*index)?;
                }
            }
            ObjectiveSpec::Expression(given) => {
                if let Some(var) = given.variables().find(|var| !self.problem.has_variable(var)) {
                    return Err(ModelError::InvalidObjective(format!(
                        "variable {} is not part of the problem",
                        var
                    )));
                }
                expression = given.clone();
            }
        }
        Ok(expression.simplify())
    }

    /// Objective coefficient of a reaction's flux
    pub fn objective_coefficient(&self, reaction_id: &str) -> Result<f64, ModelError> {
        Ok(self.reactions.get_by_id(reaction_id)?.objective_coefficient)
    }

    /// Set the objective coefficient of a reaction's flux, other terms are kept
    pub fn set_objective_coefficient(
        &mut self,
        reaction_id: &str,
        coefficient: f64,
    ) -> Result<(), ModelError> {
        let reaction = self.reactions.get_by_id(reaction_id)?;
        let mut expression = self.problem.objective().expression().clone();
        expression.set_coefficient(&reaction.get_forward_id(), coefficient);
        expression.set_coefficient(&reaction.get_reverse_id(), -coefficient);
        self.install_objective(expression)
    }

    /// Reactions with a non-zero objective coefficient
    pub fn linear_reaction_coefficients(&self) -> IndexMap<String, f64> {
        self.reactions
            .iter()
            .filter(|reaction| reaction.objective_coefficient != 0.)
            .map(|reaction| (reaction.id.clone(), reaction.objective_coefficient))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::metabolic_model::reaction::ReactionBuilder;

    fn model() -> Model {
        let mut model = Model::new("objective");
        let reactions = ["A", "B", "C"].map(|id| {
            ReactionBuilder::default()
                .id(id)
                .metabolite("x", 1.)
                .build()
                .unwrap()
        });
        model.add_reactions(reactions).unwrap();
        model
    }

    #[test]
    fn every_spec_resolves_to_flux_expressions() {
        let mut model = model();
        let a = model.reactions().get_by_id("A").unwrap().flux_expression();
        let b = model.reactions().get_by_id("B").unwrap().flux_expression();
        let a_plus_b = &a + &b;

        model.set_objective("A", false).unwrap();
        assert_eq!(model.objective().expression(), &a);
        model.set_objective(0usize, false).unwrap();
        assert_eq!(model.objective().expression(), &a);
        model.set_objective(vec![0usize, 1], false).unwrap();
        assert_eq!(model.objective().expression(), &a_plus_b);
        model.set_objective(vec!["A", "B"], false).unwrap();
        assert_eq!(model.objective().expression(), &a_plus_b);
        let coefficients = IndexMap::from([("A".to_string(), 1.), ("B".to_string(), 1.)]);
        model.set_objective(coefficients, false).unwrap();
        assert_eq!(model.objective().expression(), &a_plus_b);
        model.set_objective(a_plus_b.clone(), false).unwrap();
        assert_eq!(model.objective().expression(), &a_plus_b);
        let reaction = model.reactions().get_by_id("B").unwrap().clone();
        model.set_objective(&reaction, false).unwrap();
        assert_eq!(model.objective().expression(), &b);
    }

    #[test]
    fn additive_objective() {
        let mut model = model();
        model.set_objective("A", false).unwrap();
        model.set_objective("C", true).unwrap();
        assert_eq!(model.objective_coefficient("A").unwrap(), 1.);
        assert_eq!(model.objective_coefficient("C").unwrap(), 1.);
        assert_eq!(model.objective_coefficient("B").unwrap(), 0.);
    }

    #[test]
    fn invalid_objectives() {
        let mut model = model();
        assert!(matches!(
            model.set_objective("missing", false),
            Err(ModelError::InvalidObjective(_))
        ));
        assert!(matches!(
            model.set_objective(7usize, false),
            Err(ModelError::InvalidObjective(_))
        ));
        assert!(matches!(
            ObjectiveSpec::try_from(json!(1.5)),
            Err(ModelError::InvalidObjectiveType(_))
        ));
        assert!(matches!(
            ObjectiveSpec::try_from(json!(true)),
            Err(ModelError::InvalidObjectiveType(_))
        ));
        assert!(matches!(
            ObjectiveSpec::try_from(json!(null)),
            Err(ModelError::InvalidObjectiveType(_))
        ));
        assert!(matches!(
            ObjectiveSpec::try_from(json!({"A": {"nested": 1}})),
            Err(ModelError::InvalidObjectiveType(_))
        ));
    }

    #[test]
    fn dynamic_objectives() {
        assert_eq!(
            ObjectiveSpec::try_from(json!("A")).unwrap(),
            ObjectiveSpec::ReactionId("A".to_string())
        );
        assert_eq!(
            ObjectiveSpec::try_from(json!([0, 2])).unwrap(),
            ObjectiveSpec::Indices(vec![0, 2])
        );
        assert_eq!(
            ObjectiveSpec::try_from(json!({"A": 2.0})).unwrap(),
            ObjectiveSpec::Coefficients(IndexMap::from([("A".to_string(), 2.)]))
        );
    }

    #[test]
    fn objective_coefficient_and_direction_in_context() {
        let mut model = model();
        model.set_objective("A", false).unwrap();
        model.with_context(|m| {
            m.set_objective_coefficient("B", 2.).unwrap();
            m.set_objective_direction(ObjectiveSense::Minimize);
            assert_eq!(m.linear_reaction_coefficients().len(), 2);
            let b = m.reactions().get_by_id("B").unwrap();
            assert_eq!(
                m.objective().expression().coefficient(&b.get_reverse_id()),
                -2.
            );
        });
        assert_eq!(model.objective_direction(), ObjectiveSense::Maximize);
        assert_eq!(
            model.linear_reaction_coefficients(),
            IndexMap::from([("A".to_string(), 1.)])
        );
    }
}
