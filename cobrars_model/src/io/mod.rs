//! Module for reading Models and their annotations from text
pub mod gpr_parse;
