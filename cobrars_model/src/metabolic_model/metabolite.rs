//! This module provides the metabolite struct representing a metabolite
use std::fmt::{Display, Formatter};
use std::hash::Hash;

use derive_builder::Builder;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::metabolic_model::registry::Entity;

/// Represents a metabolite
///
/// # Examples
/// ```rust
/// use cobrars_model::metabolic_model::metabolite::MetaboliteBuilder;
/// let glc = MetaboliteBuilder::default()
///     .id("glc__D_e")
///     .compartment("e")
///     .build()
///     .unwrap();
/// assert_eq!(glc.compartment.as_deref(), Some("e"));
/// ```
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metabolite {
    /// Used to identify the metabolite (must be unique)
    #[builder(setter(into))]
    pub id: String,
    /// Human Readable name of the metabolite
    #[builder(setter(into, strip_option), default = "None")]
    pub name: Option<String>,
    /// Which compartment the metabolite is in
    #[builder(setter(into, strip_option), default = "None")]
    pub compartment: Option<String>,
    /// Electrical charge of the Metabolite
    #[builder(default = "0")]
    pub charge: i32,
    /// Chemical Formula of the metabolite
    #[builder(setter(into, strip_option), default = "None")]
    pub formula: Option<String>,
    /// Notes about the metabolite
    #[builder(setter(into, strip_option), default = "None")]
    pub notes: Option<String>,
    /// Metabolite annotations
    #[builder(default = "IndexMap::new()")]
    pub annotation: IndexMap<String, String>,
    /// Ids of the reactions consuming or producing this metabolite, maintained by the model
    #[builder(setter(skip))]
    #[serde(skip)]
    pub(crate) reactions: IndexSet<String>,
}

impl Metabolite {
    /// Create a metabolite with only an id
    pub fn new(id: &str) -> Metabolite {
        Metabolite {
            id: id.to_string(),
            name: None,
            compartment: None,
            charge: 0,
            formula: None,
            notes: None,
            annotation: IndexMap::new(),
            reactions: IndexSet::new(),
        }
    }

    /// Create a metabolite in a compartment
    pub fn new_in(id: &str, compartment: &str) -> Metabolite {
        Metabolite {
            compartment: Some(compartment.to_string()),
            ..Metabolite::new(id)
        }
    }

    /// Ids of the reactions this metabolite takes part in
    pub fn reactions(&self) -> &IndexSet<String> {
        &self.reactions
    }

    pub(crate) fn detached(&self) -> Metabolite {
        Metabolite {
            reactions: IndexSet::new(),
            ..self.clone()
        }
    }
}

impl Entity for Metabolite {
    const KIND: &'static str = "Metabolite";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Hash for Metabolite {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        if let Some(ref compartment) = self.compartment {
            compartment.hash(state)
        };
    }
}

impl Display for Metabolite {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}
