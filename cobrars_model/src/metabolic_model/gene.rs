//! This module provides the Gene struct, representing a gene, and the GPR struct, representing a
//! gene protein reaction rule
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use derive_builder::Builder;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metabolic_model::registry::Entity;

/// Structure Representing a Gene
///
/// # Examples
/// ```rust
/// use cobrars_model::metabolic_model::gene::{GeneActivity, GeneBuilder};
/// let gene = GeneBuilder::default().id("b0001").name("thrL").build().unwrap();
/// assert_eq!(gene.activity, GeneActivity::Active);
/// ```
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    /// Used to identify the gene
    #[builder(setter(into))]
    pub id: String,
    /// Human Readable Gene Name
    #[builder(setter(into, strip_option), default = "None")]
    pub name: Option<String>,
    /// Whether this gene is currently active (see [`GeneActivity`])
    #[builder(default = "GeneActivity::Active")]
    pub activity: GeneActivity,
    /// Notes about the gene
    #[builder(setter(into, strip_option), default = "None")]
    pub notes: Option<String>,
    /// Gene Annotations
    #[builder(default = "IndexMap::new()")]
    pub annotation: IndexMap<String, String>,
    /// Ids of the reactions whose GPR mentions this gene, maintained by the owning model
    #[builder(setter(skip))]
    #[serde(skip)]
    pub(crate) reactions: IndexSet<String>,
}

impl Gene {
    /// Create a new active gene with only an id
    pub fn new(id: &str) -> Gene {
        Gene {
            id: id.to_string(),
            name: None,
            activity: GeneActivity::Active,
            notes: None,
            annotation: IndexMap::new(),
            reactions: IndexSet::new(),
        }
    }

    /// Ids of the reactions associated with this gene
    pub fn reactions(&self) -> &IndexSet<String> {
        &self.reactions
    }

    pub fn is_functional(&self) -> bool {
        self.activity == GeneActivity::Active
    }

    /// Copy of the gene without any model associations
    pub(crate) fn detached(&self) -> Gene {
        Gene {
            reactions: IndexSet::new(),
            ..self.clone()
        }
    }
}

impl Entity for Gene {
    const KIND: &'static str = "Gene";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Display for Gene {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Whether a gene is active or not
#[derive(Clone, Debug, Hash, Eq, PartialEq, Copy, Serialize, Deserialize)]
pub enum GeneActivity {
    /// Gene is considered active
    Active,
    /// Gene is considered inactive
    Inactive,
}

// region GPR Functionality
/// Representation of a Gene Protein Reaction Rule as an AST
///
/// Equality compares the content of the trees, cloning creates a fresh tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Gpr {
    /// Operation on genes (see [`GprOperation`])
    Operation(GprOperation),
    /// A terminal gene Node, holding the gene id
    GeneNode(String),
}

impl Gpr {
    /// Create a new binary operation node
    pub fn new_binary_operation(
        left: Gpr,
        operator: GprOperatorType,
        right: Gpr,
    ) -> Result<Gpr, GprError> {
        let op = match operator {
            GprOperatorType::Or => GprOperation::Or {
                left: Box::new(left),
                right: Box::new(right),
            },
            GprOperatorType::And => GprOperation::And {
                left: Box::new(left),
                right: Box::new(right),
            },
            GprOperatorType::Not => return Err(GprError::InvalidBinaryOp),
        };
        Ok(Gpr::Operation(op))
    }

    /// Create a new unary operation node
    pub fn new_unary_operation(operator: GprOperatorType, operand: Gpr) -> Result<Gpr, GprError> {
        let op = match operator {
            GprOperatorType::Not => GprOperation::Not {
                val: Box::new(operand),
            },
            _ => return Err(GprError::InvalidUnaryOp),
        };
        Ok(Gpr::Operation(op))
    }

    /// Create a new gene node
    pub fn new_gene_node(gene: &str) -> Gpr {
        Gpr::GeneNode(gene.to_string())
    }

    /// Ids of all the genes in the rule, in order of first appearance
    pub fn genes(&self) -> IndexSet<String> {
        let mut genes = IndexSet::new();
        self.collect_genes(&mut genes);
        genes
    }

    fn collect_genes(&self, genes: &mut IndexSet<String>) {
        match self {
            Gpr::Operation(GprOperation::Or { left, right })
            | Gpr::Operation(GprOperation::And { left, right }) => {
                left.collect_genes(genes);
                right.collect_genes(genes);
            }
            Gpr::Operation(GprOperation::Not { val }) => val.collect_genes(genes),
            Gpr::GeneNode(gene) => {
                genes.insert(gene.clone());
            }
        }
    }

    /// Evaluate the rule, `is_active` reports the activity of each gene
    pub fn eval<F: Fn(&str) -> bool>(&self, is_active: &F) -> bool {
        match self {
            Gpr::Operation(GprOperation::Or { left, right }) => {
                left.eval(is_active) || right.eval(is_active)
            }
            Gpr::Operation(GprOperation::And { left, right }) => {
                left.eval(is_active) && right.eval(is_active)
            }
            Gpr::Operation(GprOperation::Not { val }) => !val.eval(is_active),
            Gpr::GeneNode(gene) => is_active(gene),
        }
    }

    /// Evaluate the rule with the given genes knocked out and all others active
    pub fn eval_with_knockouts(&self, knockouts: &HashSet<String>) -> bool {
        self.eval(&|gene: &str| !knockouts.contains(gene))
    }

    /// Remove the genes for which `removed` is true from the rule
    ///
    /// An operation which loses one operand collapses into the remaining operand, a rule
    /// which loses all of its genes becomes None.
    pub fn without_genes<F: Fn(&str) -> bool>(&self, removed: &F) -> Option<Gpr> {
        match self {
            Gpr::GeneNode(gene) => {
                if removed(gene) {
                    None
                } else {
                    Some(self.clone())
                }
            }
            Gpr::Operation(GprOperation::Not { val }) => val
                .without_genes(removed)
                .map(|val| Gpr::Operation(GprOperation::Not { val: Box::new(val) })),
            Gpr::Operation(GprOperation::Or { left, right }) => {
                Gpr::prune_binary(left, right, removed, |left, right| GprOperation::Or {
                    left,
                    right,
                })
            }
            Gpr::Operation(GprOperation::And { left, right }) => {
                Gpr::prune_binary(left, right, removed, |left, right| GprOperation::And {
                    left,
                    right,
                })
            }
        }
    }

    fn prune_binary<F, C>(left: &Gpr, right: &Gpr, removed: &F, combine: C) -> Option<Gpr>
    where
        F: Fn(&str) -> bool,
        C: Fn(Box<Gpr>, Box<Gpr>) -> GprOperation,
    {
        match (left.without_genes(removed), right.without_genes(removed)) {
            (Some(left), Some(right)) => {
                Some(Gpr::Operation(combine(Box::new(left), Box::new(right))))
            }
            (Some(remaining), None) | (None, Some(remaining)) => Some(remaining),
            (None, None) => None,
        }
    }

    /// Generate a GPR string with gene ids from the GPR AST
    ///
    /// Nested operations are parenthesized unless they repeat the parent operation.
    pub fn to_string_id(&self) -> String {
        match self {
            Gpr::Operation(op) => match op {
                GprOperation::Or { left, right } => {
                    format!("{} or {}", left.nested_in("or"), right.nested_in("or"))
                }
                GprOperation::And { left, right } => {
                    format!("{} and {}", left.nested_in("and"), right.nested_in("and"))
                }
                GprOperation::Not { val } => format!("not {}", val.nested_in("not")),
            },
            Gpr::GeneNode(gene) => gene.to_string(),
        }
    }

    fn nested_in(&self, parent: &str) -> String {
        match self {
            Gpr::GeneNode(_) => self.to_string_id(),
            Gpr::Operation(GprOperation::Or { .. }) if parent == "or" => self.to_string_id(),
            Gpr::Operation(GprOperation::And { .. }) if parent == "and" => self.to_string_id(),
            Gpr::Operation(_) => format!("({})", self.to_string_id()),
        }
    }
}

impl Display for Gpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_id())
    }
}

/// Possible operations on genes
#[derive(Clone, Debug, PartialEq)]
pub enum GprOperation {
    Or { left: Box<Gpr>, right: Box<Gpr> },
    And { left: Box<Gpr>, right: Box<Gpr> },
    Not { val: Box<Gpr> },
}

/// Types of Allowed GPR Operations
pub enum GprOperatorType {
    /// Or, results in active if either left or right are active
    Or,
    /// And, results in active if both left and right are active
    And,
    /// Not, results in active if val is inactive
    Not,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum GprError {
    #[error("Invalid Binary Operation")]
    InvalidBinaryOp,
    #[error("Invalid Unary Operation")]
    InvalidUnaryOp,
}
// endregion GPR Functionality

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::gpr_parse::parse_gpr_rule;

    fn gpr(rule: &str) -> Gpr {
        parse_gpr_rule(rule).unwrap().unwrap()
    }

    fn activity(rule: &str, inactive: &[&str]) -> bool {
        gpr(rule).eval(&|gene: &str| !inactive.contains(&gene))
    }

    #[test]
    fn gene_node() {
        assert!(activity("active_gene1", &["inactive_gene1"]));
        assert!(!activity("inactive_gene1", &["inactive_gene1"]));
    }

    #[test]
    fn and_or_not_nodes() {
        let inactive = ["i1", "i2"];
        assert!(activity("a1 and a2", &inactive));
        assert!(!activity("a1 and i1", &inactive));
        assert!(!activity("i1 and i2", &inactive));
        assert!(activity("a1 or i1", &inactive));
        assert!(!activity("i1 or i2", &inactive));
        assert!(activity("not i1", &inactive));
        assert!(!activity("not (a1 or i1)", &inactive));
    }

    #[test]
    fn knockouts() {
        let rule = gpr("(b1 and b2) or b3");
        let knocked: HashSet<String> = ["b1".to_string()].into_iter().collect();
        assert!(rule.eval_with_knockouts(&knocked));
        let knocked: HashSet<String> = ["b1".to_string(), "b3".to_string()].into_iter().collect();
        assert!(!rule.eval_with_knockouts(&knocked));
    }

    #[test]
    fn display() {
        assert_eq!(gpr("ActiveGene1").to_string(), "ActiveGene1");
        assert_eq!(gpr("(b1 and b2) or b3").to_string(), "(b1 and b2) or b3");
        assert_eq!(gpr("b1 and (b2 or b3)").to_string(), "b1 and (b2 or b3)");
        assert_eq!(gpr("b1 and b2 and b3").to_string(), "b1 and b2 and b3");
        assert_eq!(gpr("not (b1 or b2)").to_string(), "not (b1 or b2)");
    }

    #[test]
    fn remove_genes() {
        let rule = gpr("(b1 and b2) or b3");
        let pruned = rule.without_genes(&|g: &str| g == "b1").unwrap();
        assert_eq!(pruned, gpr("b2 or b3"));
        assert_eq!(
            rule.without_genes(&|g: &str| g != "b3").unwrap(),
            gpr("b3")
        );
        assert!(rule.without_genes(&|_: &str| true).is_none());
    }

    #[test]
    fn clone_is_independent() {
        let original = gpr("b1 and b2");
        let mut copy = original.clone();
        assert_eq!(original, copy);
        copy = copy.without_genes(&|g: &str| g == "b2").unwrap();
        assert_ne!(original, copy);
        assert_eq!(original.genes().len(), 2);
    }
}
