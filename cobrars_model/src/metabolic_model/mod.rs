//! Metabolic model: reactions, metabolites, genes and groups backed by an optimization problem

pub mod boundary;
pub mod context;
pub mod error;
pub mod gene;
pub mod group;
pub mod merge;
pub mod metabolite;
pub mod model;
pub mod objective;
pub mod reaction;
pub mod registry;
pub mod solution;
