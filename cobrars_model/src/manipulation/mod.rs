//! Operations which change a model as a whole, such as deleting genes
pub mod delete;
