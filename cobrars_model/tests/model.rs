mod common;

use approx::assert_abs_diff_eq;
use cobrars_model::metabolic_model::boundary::BoundaryType;
use cobrars_model::metabolic_model::group::{Group, GroupMember};
use cobrars_model::metabolic_model::merge::MergeObjective;
use cobrars_model::metabolic_model::metabolite::Metabolite;
use cobrars_model::metabolic_model::reaction::{Reaction, ReactionBuilder};
use cobrars_model::{Model, ModelError};
use common::{toy_model, MAX_BIOMASS, TOLERANCE};

#[test]
fn toy_model_structure() {
    let model = toy_model();
    assert_eq!(model.reactions().len(), 6);
    assert_eq!(model.metabolites().len(), 4);
    assert_eq!(model.genes().len(), 5);
    assert_eq!(model.problem().num_variables(), 12);
    assert_eq!(model.problem().num_constraints(), 4);
    assert_eq!(
        model.metabolites().get_by_id("g6p_c").unwrap().reactions().len(),
        3
    );
    assert_eq!(
        model.genes().get_by_id("b0002").unwrap().reactions().iter().collect::<Vec<_>>(),
        vec!["HEX"]
    );
    assert!(matches!(
        model.reactions().get_by_id("PFK"),
        Err(ModelError::NotFound { kind: "Reaction", .. })
    ));
    assert_eq!(model.reactions()[3].id, "PGI");
    assert_eq!(model.reactions().slice(0, 2).len(), 2);
}

#[test]
fn add_existing_reaction_is_ignored() {
    let mut model = toy_model();
    let replacement = ReactionBuilder::default()
        .id("PGI")
        .metabolite("glc_c", -1.)
        .build()
        .unwrap();
    model.add_reactions([replacement, Reaction::new("NEW")]).unwrap();
    assert_eq!(model.reactions().len(), 7);
    assert_eq!(
        model.reactions().get_by_id("PGI").unwrap().reactants(),
        vec!["g6p_c"]
    );
}

#[test]
fn subtractive_metabolite_removal_restores_problem() {
    let mut model = toy_model();
    let constraints_before: Vec<String> = model
        .problem()
        .constraints()
        .map(|c| c.get_id().to_string())
        .collect();
    model.add_metabolites([Metabolite::new_in("atp_c", "c")]).unwrap();
    assert!(model.problem().has_constraint("atp_c"));
    model.remove_metabolites(&["atp_c"], false).unwrap();
    let constraints_after: Vec<String> = model
        .problem()
        .constraints()
        .map(|c| c.get_id().to_string())
        .collect();
    assert_eq!(constraints_before, constraints_after);
    assert_eq!(model.metabolites().len(), 4);
}

#[test]
fn destructive_metabolite_removal() {
    let mut model = toy_model();
    model.remove_metabolites(&["glc_e"], true).unwrap();
    // EX_glc_e only had glc_e, GLCt keeps glc_c
    assert!(!model.reactions().contains("EX_glc_e"));
    assert!(model.reactions().contains("GLCt"));
    assert_eq!(model.reactions().get_by_id("GLCt").unwrap().metabolites.len(), 1);
}

#[test]
fn orphans_are_removed_on_request() {
    let mut model = toy_model();
    model.remove_reactions(&["F6PDEG"], true).unwrap();
    assert!(model.metabolites().contains("f6p_c"));

    let mut model = toy_model();
    model.remove_reactions(&["EX_glc_e", "GLCt"], true).unwrap();
    assert!(!model.metabolites().contains("glc_e"));
    assert!(!model.genes().contains("b0001"));
    assert!(model.metabolites().contains("glc_c"));

    let mut model = toy_model();
    model.remove_reactions(&["EX_glc_e", "GLCt"], false).unwrap();
    assert!(model.metabolites().contains("glc_e"));
    assert!(model.genes().contains("b0001"));
    assert!(model
        .genes()
        .get_by_id("b0001")
        .unwrap()
        .reactions()
        .is_empty());
}

#[test]
fn boundaries_of_toy_model() {
    let mut model = toy_model();
    assert_eq!(model.find_external_compartment().as_deref(), Some("e"));
    let exchanges: Vec<&str> = model.exchanges().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(exchanges, vec!["EX_glc_e"]);
    let first = model
        .add_boundary("g6p_c", BoundaryType::Sink, None, None, None, None)
        .unwrap()
        .clone();
    let second = model
        .add_boundary("g6p_c", BoundaryType::Sink, None, None, None, None)
        .unwrap()
        .clone();
    assert_eq!(first, second);
    assert_eq!(model.sinks().len(), 1);
    assert_eq!(first.name.as_deref(), Some("glucose 6-phosphate sink"));
}

#[test]
fn groups_cascade_and_query() {
    let mut model = toy_model();
    let mut pathway = Group::new("upper glycolysis").with_members([
        GroupMember::Reaction("HEX".to_string()),
        GroupMember::Reaction("PGI".to_string()),
    ]);
    pathway.add_reaction(
        ReactionBuilder::default()
            .id("PFK")
            .metabolite("f6p_c", -1.)
            .metabolite("fdp_c", 1.)
            .lower_bound(0.)
            .build()
            .unwrap(),
    );
    model.add_groups([pathway]).unwrap();
    assert!(model.reactions().contains("PFK"));
    assert!(model.metabolites().contains("fdp_c"));
    let pgi = GroupMember::Reaction("PGI".to_string());
    assert_eq!(model.get_associated_groups(&pgi).len(), 1);
    model.remove_reactions(&["PGI"], false).unwrap();
    assert!(model.get_associated_groups(&pgi).is_empty());
    assert_eq!(model.groups().get_by_id("upper glycolysis").unwrap().len(), 2);
    model.remove_groups(&["upper glycolysis"]).unwrap();
    assert!(model.reactions().contains("PFK"));
}

#[test]
fn copy_keeps_solution_and_contents() {
    let mut model = toy_model();
    model.slim_optimize();
    let forward = model.reactions().get_by_id("Biomass").unwrap().get_forward_id();
    model.enter_context();
    model.set_upper_bound("PGI", 0.).unwrap();
    let copy = model.copy();
    assert_eq!(copy.context_depth(), 0);
    assert_eq!(copy.reactions().len(), model.reactions().len());
    assert_eq!(copy.metabolites().len(), model.metabolites().len());
    assert_eq!(copy.genes().len(), model.genes().len());
    assert_eq!(copy.groups().len(), model.groups().len());
    assert_abs_diff_eq!(
        copy.primal(&forward).unwrap(),
        model.primal(&forward).unwrap(),
        epsilon = TOLERANCE
    );
    model.exit_context();
    assert_eq!(model.reactions().get_by_id("PGI").unwrap().upper_bound, 1000.);
    assert_eq!(copy.reactions().get_by_id("PGI").unwrap().upper_bound, 0.);
}

#[test]
fn reactions_copied_between_models() {
    let source = toy_model();
    let mut target = Model::new("target");
    target.add_reactions_from(&source, &["HEX", "PGI"]).unwrap();
    assert_eq!(target.reactions().len(), 2);
    assert_eq!(
        target.metabolites().get_by_id("g6p_c").unwrap().name.as_deref(),
        Some("glucose 6-phosphate")
    );
    assert_eq!(target.genes().len(), 4);
    assert_eq!(source.reactions().len(), 6);
    assert!(target.add_reactions_from(&source, &["PFK"]).is_err());
}

#[test]
fn stoichiometric_matrix_shape() {
    let model = toy_model();
    let matrix = model.stoichiometric_matrix();
    assert_eq!(matrix.nrows(), 4);
    assert_eq!(matrix.ncols(), 6);
    assert_eq!(matrix.nnz(), 10);
}

#[test]
fn merged_models_can_be_optimized() {
    let left = toy_model();
    let mut right = Model::new("right");
    right
        .add_reactions([ReactionBuilder::default()
            .id("Biomass")
            .metabolite("f6p_c", -1.)
            .lower_bound(0.)
            .build()
            .unwrap()])
        .unwrap();
    let mut merged = left
        .merge(&right, MergeObjective::Left, Some("right_"))
        .unwrap();
    assert!(merged.reactions().contains("right_Biomass"));
    assert_abs_diff_eq!(merged.slim_optimize(), MAX_BIOMASS, epsilon = TOLERANCE);
}
