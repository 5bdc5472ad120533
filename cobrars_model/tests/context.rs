mod common;

use approx::assert_abs_diff_eq;
use cobrars_model::manipulation::delete::{knock_out_genes, remove_genes};
use cobrars_model::metabolic_model::boundary::BoundaryType;
use cobrars_model::metabolic_model::group::{Group, GroupMember};
use cobrars_model::metabolic_model::metabolite::Metabolite;
use cobrars_model::metabolic_model::reaction::Reaction;
use cobrars_model::optimize::constraint::Constraint;
use cobrars_model::optimize::objective::ObjectiveSense;
use cobrars_model::optimize::variable::Variable;
use common::{toy_model, MAX_BIOMASS, TOLERANCE};

#[test]
fn nested_contexts_unwind_level_by_level() {
    let mut model = toy_model();
    let original = model.reactions().get_by_id("PGI").unwrap().bounds();
    {
        let mut outer = model.context();
        outer.set_reaction_bounds("PGI", 1., 2.).unwrap();
        {
            let mut inner = outer.context();
            inner.set_reaction_bounds("PGI", 3., 4.).unwrap();
            assert_eq!(inner.reactions().get_by_id("PGI").unwrap().bounds(), (3., 4.));
        }
        assert_eq!(outer.reactions().get_by_id("PGI").unwrap().bounds(), (1., 2.));
    }
    assert_eq!(model.reactions().get_by_id("PGI").unwrap().bounds(), original);
    let forward = model.reactions().get_by_id("PGI").unwrap().get_forward_id();
    assert_eq!(model.problem().variable(&forward).unwrap().bounds(), (0., 1000.));
}

#[test]
fn structural_changes_are_reverted() {
    let mut model = toy_model();
    let reactions_before: Vec<String> = model.reactions().ids().map(String::from).collect();
    let variables_before = model.problem().num_variables();
    model.with_context(|m| {
        m.remove_reactions(&["PGI", "HEX"], true).unwrap();
        m.add_reactions([Reaction::new("NEW")]).unwrap();
        m.remove_metabolites(&["glc_e"], true).unwrap();
        m.add_metabolites([Metabolite::new("atp_c")]).unwrap();
        m.add_boundary("f6p_c", BoundaryType::Demand, None, None, None, None)
            .unwrap();
        m.set_gene_reaction_rule("Biomass", "b0009").unwrap();
        m.add_metabolites_to_reaction("Biomass", &[("atp_c", -2.)], true)
            .unwrap();
        m.add_groups([Group::new("g").with_members([GroupMember::Reaction(
            "Biomass".to_string(),
        )])])
        .unwrap();
        assert!(!m.reactions().contains("PGI"));
        assert!(!m.genes().contains("b0002"));
    });
    let reactions_after: Vec<String> = model.reactions().ids().map(String::from).collect();
    assert_eq!(reactions_before, reactions_after);
    assert_eq!(model.problem().num_variables(), variables_before);
    assert_eq!(model.metabolites().len(), 4);
    assert_eq!(model.genes().len(), 5);
    assert!(model.groups().is_empty());
    assert_eq!(
        model.genes().get_by_id("b0002").unwrap().reactions().iter().collect::<Vec<_>>(),
        vec!["HEX"]
    );
    assert_eq!(
        model.reactions().get_by_id("Biomass").unwrap().gene_reaction_rule(),
        ""
    );
    assert_eq!(
        model.metabolites().get_by_id("glc_e").unwrap().reactions().len(),
        2
    );
    assert_abs_diff_eq!(model.slim_optimize(), MAX_BIOMASS, epsilon = TOLERANCE);
}

#[test]
fn objective_changes_are_reverted() {
    let mut model = toy_model();
    model.with_context(|m| {
        m.set_objective("PGI", false).unwrap();
        m.set_objective_direction(ObjectiveSense::Minimize);
        m.set_objective_coefficient("HEX", 2.).unwrap();
    });
    assert_eq!(model.objective_direction(), ObjectiveSense::Maximize);
    let coefficients = model.linear_reaction_coefficients();
    assert_eq!(coefficients.len(), 1);
    assert_eq!(coefficients["Biomass"], 1.);
}

#[test]
fn cons_vars_and_gene_deletions_are_reverted() {
    let mut model = toy_model();
    let biomass = model.reactions().get_by_id("Biomass").unwrap().get_forward_id();
    model.with_context(|m| {
        m.add_cons_vars(
            vec![Variable::new("slack", 0., 3.)],
            vec![Constraint::new_inequality(
                "biomass_cap",
                &[biomass.as_str(), "slack"],
                &[1., 1.],
                f64::NEG_INFINITY,
                3.,
            )],
        )
        .unwrap();
        assert_abs_diff_eq!(m.slim_optimize(), 3., epsilon = TOLERANCE);
        m.remove_cons_vars(&[], &["biomass_cap"]).unwrap();
        assert_abs_diff_eq!(m.slim_optimize(), MAX_BIOMASS, epsilon = TOLERANCE);
    });
    assert!(!model.problem().has_constraint("biomass_cap"));
    assert!(!model.problem().has_variable("slack"));

    model.with_context(|m| {
        let closed = knock_out_genes(m, &["b0002"]).unwrap();
        assert_eq!(closed, vec!["HEX"]);
        assert_abs_diff_eq!(m.slim_optimize(), 0., epsilon = TOLERANCE);
    });
    assert_abs_diff_eq!(model.slim_optimize(), MAX_BIOMASS, epsilon = TOLERANCE);

    model.with_context(|m| {
        remove_genes(m, &["b0004"], true).unwrap();
        assert!(m.reactions().contains("PGI"));
        assert_eq!(
            m.reactions().get_by_id("PGI").unwrap().gene_reaction_rule(),
            "b0005"
        );
        remove_genes(m, &["b0005"], true).unwrap();
        assert!(!m.reactions().contains("PGI"));
    });
    assert_eq!(
        model.reactions().get_by_id("PGI").unwrap().gene_reaction_rule(),
        "b0004 or b0005"
    );
    assert_eq!(model.genes().len(), 5);
}

#[test]
fn copy_inside_context_has_no_context() {
    let mut model = toy_model();
    let copy = model.with_context(|m| {
        m.set_upper_bound("EX_glc_e", 0.).unwrap();
        m.copy()
    });
    assert_eq!(copy.context_depth(), 0);
    assert_eq!(copy.reactions().get_by_id("EX_glc_e").unwrap().upper_bound, 0.);
    assert_eq!(model.reactions().get_by_id("EX_glc_e").unwrap().upper_bound, 1000.);
}
