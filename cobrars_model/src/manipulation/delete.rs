//! Gene deletion: knocking out genes and removing them from a model
//!
//! All functions record their changes, so inside a context of the model they are reverted
//! when the context is left.
use std::collections::HashSet;

use indexmap::IndexSet;
use log::{debug, info};

use crate::metabolic_model::error::ModelError;
use crate::metabolic_model::gene::GeneActivity;
use crate::metabolic_model::model::Model;

/// Ids of the reactions which can't carry flux once the genes are knocked out
///
/// Only the given genes are considered knocked out, the activity currently stored on the
/// model's genes is ignored.
pub fn find_gene_knockout_reactions(
    model: &Model,
    gene_ids: &[&str],
) -> Result<Vec<String>, ModelError> {
    let knockouts = knockout_set(model, gene_ids)?;
    Ok(affected_reactions(model, &knockouts)
        .into_iter()
        .filter(|id| {
            model
                .reactions
                .get(id)
                .and_then(|r| r.gpr.as_ref())
                .is_some_and(|gpr| !gpr.eval_with_knockouts(&knockouts))
        })
        .collect())
}

/// Mark the genes inactive and close the reactions which lose their last functional enzyme
///
/// Returns the ids of the closed reactions.
///
/// # Examples
/// ```rust
/// use cobrars_model::manipulation::delete::knock_out_genes;
/// use cobrars_model::metabolic_model::model::Model;
/// use cobrars_model::metabolic_model::reaction::Reaction;
/// let mut model = Model::new("toy");
/// let reaction = Reaction::new("PGI").with_gene_reaction_rule("b1 or b2").unwrap();
/// model.add_reactions([reaction]).unwrap();
/// assert!(knock_out_genes(&mut model, &["b1"]).unwrap().is_empty());
/// assert_eq!(knock_out_genes(&mut model, &["b2"]).unwrap(), vec!["PGI"]);
/// assert_eq!(model.reactions().get_by_id("PGI").unwrap().bounds(), (0., 0.));
/// ```
pub fn knock_out_genes(model: &mut Model, gene_ids: &[&str]) -> Result<Vec<String>, ModelError> {
    let knockouts = knockout_set(model, gene_ids)?;
    for gene in knockouts.iter() {
        model.set_gene_activity(gene, GeneActivity::Inactive)?;
    }
    let mut closed = Vec::new();
    for id in affected_reactions(model, &knockouts) {
        let inactive = model
            .reactions
            .get(&id)
            .and_then(|r| r.gpr.as_ref())
            .is_some_and(|gpr| {
                !gpr.eval(&|gene: &str| {
                    model.genes.get(gene).map_or(true, |gene| gene.is_functional())
                })
            });
        if inactive {
            model.set_reaction_bounds(&id, 0., 0.)?;
            closed.push(id);
        }
    }
    debug!(
        "Knocked out {} genes, closing {} reactions",
        knockouts.len(),
        closed.len()
    );
    Ok(closed)
}

/// Remove genes from the model
///
/// Reactions which can't function without the genes are removed when `remove_reactions` is
/// set. The genes are pruned from the rules of every other reaction: a gene combined with
/// `or` simply disappears, and a reaction which loses all of its genes is left without a rule.
pub fn remove_genes(
    model: &mut Model,
    gene_ids: &[&str],
    remove_reactions: bool,
) -> Result<(), ModelError> {
    let knockouts = knockout_set(model, gene_ids)?;
    let affected = affected_reactions(model, &knockouts);
    let mut targets = Vec::new();
    if remove_reactions {
        targets = find_gene_knockout_reactions(model, gene_ids)?;
        let targets: Vec<&str> = targets.iter().map(String::as_str).collect();
        model.remove_reactions(&targets, false)?;
    }
    for id in affected.iter().filter(|id| !targets.contains(id)) {
        let Some(gpr) = model.reactions.get(id).and_then(|r| r.gpr.as_ref()) else {
            continue;
        };
        let pruned = gpr.without_genes(&|gene: &str| knockouts.contains(gene));
        let action = model.set_gpr_raw(id, pruned)?;
        model.record(action);
    }
    for gene in knockouts.iter() {
        let action = model.detach_gene(gene)?;
        model.record(action);
    }
    info!(
        "Removed {} genes and {} reactions",
        knockouts.len(),
        targets.len()
    );
    Ok(())
}

fn knockout_set(model: &Model, gene_ids: &[&str]) -> Result<HashSet<String>, ModelError> {
    gene_ids
        .iter()
        .map(|id| model.genes.get_by_id(id).map(|gene| gene.id.clone()))
        .collect()
}

/// Reactions whose rule mentions any of the genes, in model order
fn affected_reactions(model: &Model, knockouts: &HashSet<String>) -> Vec<String> {
    let mentioned: IndexSet<&String> = knockouts
        .iter()
        .filter_map(|gene| model.genes.get(gene))
        .flat_map(|gene| gene.reactions.iter())
        .collect();
    model
        .reactions
        .ids()
        .filter(|id| mentioned.iter().any(|m| m.as_str() == *id))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::reaction::Reaction;

    fn model() -> Model {
        let mut model = Model::new("genes");
        let reactions = [
            ("R1", "g1"),
            ("R2", "g1 and g2"),
            ("R3", "g1 or g3"),
            ("R4", "(g2 and g3) or g4"),
        ]
        .map(|(id, rule)| {
            let mut reaction = Reaction::new(id);
            reaction.set_gene_reaction_rule(rule).unwrap();
            reaction
        });
        model.add_reactions(reactions).unwrap();
        model
    }

    #[test]
    fn knockout_reactions() {
        let model = model();
        assert_eq!(
            find_gene_knockout_reactions(&model, &["g1"]).unwrap(),
            vec!["R1", "R2"]
        );
        assert_eq!(
            find_gene_knockout_reactions(&model, &["g2", "g4"]).unwrap(),
            vec!["R2", "R4"]
        );
        assert!(matches!(
            find_gene_knockout_reactions(&model, &["g9"]),
            Err(ModelError::NotFound { .. })
        ));
    }

    #[test]
    fn knock_out_in_context() {
        let mut model = model();
        model.with_context(|m| {
            let closed = knock_out_genes(m, &["g1"]).unwrap();
            assert_eq!(closed, vec!["R1", "R2"]);
            assert!(!m.genes().get_by_id("g1").unwrap().is_functional());
            assert_eq!(m.reactions().get_by_id("R3").unwrap().bounds(), (-1000., 1000.));
        });
        assert!(model.genes().get_by_id("g1").unwrap().is_functional());
        assert_eq!(model.reactions().get_by_id("R1").unwrap().bounds(), (-1000., 1000.));
    }

    #[test]
    fn remove_genes_prunes_rules() {
        let mut model = model();
        remove_genes(&mut model, &["g1"], true).unwrap();
        assert!(!model.genes().contains("g1"));
        assert!(!model.reactions().contains("R1"));
        assert!(!model.reactions().contains("R2"));
        assert_eq!(
            model.reactions().get_by_id("R3").unwrap().gene_reaction_rule(),
            "g3"
        );
        assert_eq!(
            model.genes().get_by_id("g3").unwrap().reactions().len(),
            2
        );
    }

    #[test]
    fn remove_genes_keeping_reactions() {
        let mut model = model();
        model.with_context(|m| {
            remove_genes(m, &["g1"], false).unwrap();
            assert_eq!(m.reactions().len(), 4);
            assert_eq!(m.reactions().get_by_id("R1").unwrap().gene_reaction_rule(), "");
            assert_eq!(m.reactions().get_by_id("R2").unwrap().gene_reaction_rule(), "g2");
        });
        assert_eq!(
            model.reactions().get_by_id("R2").unwrap().gene_reaction_rule(),
            "g1 and g2"
        );
        assert_eq!(
            model.genes().get_by_id("g1").unwrap().reactions().len(),
            3
        );
    }
}
