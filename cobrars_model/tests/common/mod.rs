//! Toy glycolysis network shared by the integration tests
//!
//! glc_e --GLCt--> glc_c --HEX--> g6p_c <--PGI--> f6p_c, with Biomass consuming
//! 0.5 g6p_c + 0.5 f6p_c. Glucose uptake is limited to 10, so the maximal biomass flux
//! is 10.
#![allow(dead_code)]
use cobrars_model::metabolic_model::metabolite::MetaboliteBuilder;
use cobrars_model::metabolic_model::model::Model;
use cobrars_model::metabolic_model::reaction::{Reaction, ReactionBuilder};

pub const MAX_BIOMASS: f64 = 10.;
pub const TOLERANCE: f64 = 1e-5;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn reaction(id: &str, metabolites: &[(&str, f64)], bounds: (f64, f64), rule: &str) -> Reaction {
    let mut builder = ReactionBuilder::default();
    builder.id(id).lower_bound(bounds.0).upper_bound(bounds.1);
    for (met, coef) in metabolites {
        builder.metabolite(*met, *coef);
    }
    let reaction = builder.build().unwrap();
    if rule.is_empty() {
        reaction
    } else {
        reaction.with_gene_reaction_rule(rule).unwrap()
    }
}

pub fn toy_model() -> Model {
    init_logging();
    let mut model = Model::new("toy");
    let metabolites = [
        ("glc_e", "glucose", "e"),
        ("glc_c", "glucose", "c"),
        ("g6p_c", "glucose 6-phosphate", "c"),
        ("f6p_c", "fructose 6-phosphate", "c"),
    ]
    .map(|(id, name, compartment)| {
        MetaboliteBuilder::default()
            .id(id)
            .name(name)
            .compartment(compartment)
            .build()
            .unwrap()
    });
    model.add_metabolites(metabolites).unwrap();
    let mut biomass = reaction(
        "Biomass",
        &[("g6p_c", -0.5), ("f6p_c", -0.5)],
        (0., 1000.),
        "",
    );
    biomass.name = Some("biomass".to_string());
    model
        .add_reactions([
            reaction("EX_glc_e", &[("glc_e", -1.)], (-10., 1000.), ""),
            reaction("GLCt", &[("glc_e", -1.), ("glc_c", 1.)], (0., 1000.), "b0001"),
            reaction(
                "HEX",
                &[("glc_c", -1.), ("g6p_c", 1.)],
                (0., 1000.),
                "b0002 and b0003",
            ),
            reaction(
                "PGI",
                &[("g6p_c", -1.), ("f6p_c", 1.)],
                (-1000., 1000.),
                "b0004 or b0005",
            ),
            biomass,
            reaction("F6PDEG", &[("f6p_c", -1.)], (0., 1000.), ""),
        ])
        .unwrap();
    model.set_objective("Biomass", false).unwrap();
    model
}
