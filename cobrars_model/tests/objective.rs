mod common;

use cobrars_model::metabolic_model::objective::ObjectiveSpec;
use cobrars_model::optimize::expression::LinearExpression;
use cobrars_model::ModelError;
use common::toy_model;
use indexmap::IndexMap;
use serde_json::json;

#[test]
fn objective_forms_are_equivalent() {
    let mut model = toy_model();
    let biomass = model.reactions().get_by_id("Biomass").unwrap().clone();
    let expected = LinearExpression::from_terms([
        (biomass.get_forward_id(), 1.),
        (biomass.get_reverse_id(), -1.),
    ]);
    let index = model.reactions().index_of("Biomass").unwrap();

    let specs: Vec<ObjectiveSpec> = vec![
        (&biomass).into(),
        "Biomass".into(),
        index.into(),
        vec![index].into(),
        IndexMap::from([("Biomass".to_string(), 1.)]).into(),
        expected.clone().into(),
        ObjectiveSpec::try_from(json!("Biomass")).unwrap(),
        ObjectiveSpec::try_from(json!({"Biomass": 1})).unwrap(),
    ];
    for spec in specs {
        model.set_objective("PGI", false).unwrap();
        model.set_objective(spec, false).unwrap();
        assert_eq!(model.objective().expression(), &expected);
    }
}

#[test]
fn objective_coefficients_follow_the_objective() {
    let mut model = toy_model();
    assert_eq!(model.objective_coefficient("Biomass").unwrap(), 1.);
    model.set_objective_coefficient("PGI", 0.5).unwrap();
    let coefficients = model.linear_reaction_coefficients();
    assert_eq!(coefficients.len(), 2);
    assert_eq!(coefficients["PGI"], 0.5);
    let pgi = model.reactions().get_by_id("PGI").unwrap();
    assert_eq!(
        model.objective().expression().coefficient(&pgi.get_reverse_id()),
        -0.5
    );
    model.remove_reactions(&["PGI"], false).unwrap();
    assert_eq!(model.linear_reaction_coefficients().len(), 1);
}

#[test]
fn invalid_objectives_are_rejected() {
    let mut model = toy_model();
    assert!(matches!(
        model.set_objective("PFK", false),
        Err(ModelError::InvalidObjective(_))
    ));
    assert!(matches!(
        model.set_objective(100usize, false),
        Err(ModelError::InvalidObjective(_))
    ));
    assert!(matches!(
        ObjectiveSpec::try_from(json!(0.5)),
        Err(ModelError::InvalidObjectiveType(_))
    ));
    assert!(matches!(
        ObjectiveSpec::try_from(json!(["Biomass", 1])),
        Err(ModelError::InvalidObjectiveType(_))
    ));
    assert_eq!(model.objective_coefficient("Biomass").unwrap(), 1.);
}
