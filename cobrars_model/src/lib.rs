//! Constraint based metabolic modeling: genome scale metabolic models, their optimization
//! problems and reversible editing of both.

pub mod configuration;
pub mod io;
pub mod manipulation;
pub mod metabolic_model;
pub mod optimize;
mod utils;

pub use metabolic_model::error::ModelError;
pub use metabolic_model::gene::Gene;
pub use metabolic_model::group::Group;
pub use metabolic_model::metabolite::Metabolite;
pub use metabolic_model::model::Model;
pub use metabolic_model::objective::ObjectiveSpec;
pub use metabolic_model::reaction::Reaction;
pub use metabolic_model::solution::Solution;
