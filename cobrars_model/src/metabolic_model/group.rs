//! Groups annotate collections of reactions, metabolites and genes
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::metabolic_model::gene::Gene;
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::Reaction;
use crate::metabolic_model::registry::Entity;

/// Relationship between the members of a group (SBML groups package)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupKind {
    #[default]
    Collection,
    Classification,
    Partonomy,
}

impl Display for GroupKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            GroupKind::Collection => "collection",
            GroupKind::Classification => "classification",
            GroupKind::Partonomy => "partonomy",
        };
        write!(f, "{}", kind)
    }
}

impl FromStr for GroupKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "collection" => Ok(GroupKind::Collection),
            "classification" => Ok(GroupKind::Classification),
            "partonomy" => Ok(GroupKind::Partonomy),
            other => Err(format!("Unknown group kind {}", other)),
        }
    }
}

/// Reference to an entity of the model by id
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupMember {
    Reaction(String),
    Metabolite(String),
    Gene(String),
}

impl GroupMember {
    pub fn id(&self) -> &str {
        match self {
            GroupMember::Reaction(id) | GroupMember::Metabolite(id) | GroupMember::Gene(id) => id,
        }
    }
}

impl Display for GroupMember {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupMember::Reaction(id) => write!(f, "Reaction {}", id),
            GroupMember::Metabolite(id) => write!(f, "Metabolite {}", id),
            GroupMember::Gene(id) => write!(f, "Gene {}", id),
        }
    }
}

/// A named, ordered set of model members
///
/// A group built outside of a model can carry the reactions, metabolites and genes it refers
/// to; adding the group to a model also adds any of those which the model doesn't have yet.
///
/// # Examples
/// ```rust
/// use cobrars_model::metabolic_model::group::Group;
/// use cobrars_model::metabolic_model::reaction::Reaction;
/// let mut pathway = Group::new("pathway");
/// pathway.add_reaction(Reaction::new("PFK"));
/// pathway.add_reaction(Reaction::new("FBA"));
/// assert_eq!(pathway.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    pub id: String,
    pub name: Option<String>,
    pub kind: GroupKind,
    pub(crate) members: IndexSet<GroupMember>,
    pub(crate) carried_reactions: Vec<Reaction>,
    pub(crate) carried_metabolites: Vec<Metabolite>,
    pub(crate) carried_genes: Vec<Gene>,
}

impl Group {
    pub fn new(id: &str) -> Group {
        Group {
            id: id.to_string(),
            name: None,
            kind: GroupKind::default(),
            members: IndexSet::new(),
            carried_reactions: Vec::new(),
            carried_metabolites: Vec::new(),
            carried_genes: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: GroupKind) -> Group {
        self.kind = kind;
        self
    }

    /// Group referring to existing members by id
    pub fn with_members<I: IntoIterator<Item = GroupMember>>(mut self, members: I) -> Group {
        self.members.extend(members);
        self
    }

    pub fn members(&self) -> &IndexSet<GroupMember> {
        &self.members
    }

    pub fn contains(&self, member: &GroupMember) -> bool {
        self.members.contains(member)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Ids of the reaction members
    pub fn reactions(&self) -> Vec<&str> {
        self.members
            .iter()
            .filter_map(|member| match member {
                GroupMember::Reaction(id) => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Add a reaction as a member, carrying it along to the model the group is added to
    pub fn add_reaction(&mut self, reaction: Reaction) {
        if self.members.insert(GroupMember::Reaction(reaction.id.clone())) {
            self.carried_reactions.push(reaction);
        }
    }

    /// Add a metabolite as a member, carrying it along to the model the group is added to
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        if self
            .members
            .insert(GroupMember::Metabolite(metabolite.id.clone()))
        {
            self.carried_metabolites.push(metabolite);
        }
    }

    /// Add a gene as a member, carrying it along to the model the group is added to
    pub fn add_gene(&mut self, gene: Gene) {
        if self.members.insert(GroupMember::Gene(gene.id.clone())) {
            self.carried_genes.push(gene);
        }
    }

    /// Copy of the group with only member references
    pub(crate) fn detached(&self) -> Group {
        Group {
            carried_reactions: Vec::new(),
            carried_metabolites: Vec::new(),
            carried_genes: Vec::new(),
            ..self.clone()
        }
    }
}

impl Entity for Group {
    const KIND: &'static str = "Group";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Display for Group {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {} members)", self.id, self.kind, self.len())
    }
}
