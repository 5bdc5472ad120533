//! Module for parsing Gene Protein Reaction strings into AST values

use crate::io::gpr_parse::lexer::LexerError;
use crate::io::gpr_parse::parser::ParseError;
use crate::metabolic_model::gene::{Gene, Gpr};
use indexmap::IndexMap;
use thiserror::Error;

mod lexer;
pub mod parser;
mod token;

/// Parse a Gene Protein Reaction string into a GPR Tree
///
/// # Parameters
/// - `input`: &str representing the gene protein reaction rule
/// - `gene_map`: map of gene id strings to genes, genes referenced by the rule which are not
///   yet in the map are added to it
///
/// # Returns
/// Parse result which is
/// - `Ok`: The root node of the GPR tree
/// - `Err`: Returns the GprParseError describing the issue with the GPR rule which
///     was being parsed.
///
/// # Examples
/// ```rust
/// use indexmap::IndexMap;
/// use cobrars_model::io::gpr_parse::parse_gpr;
/// let gpr: &str = "Rv0001 and Rv0002";
/// let mut gene_map = IndexMap::new();
/// let gpr_tree = parse_gpr(gpr, &mut gene_map).unwrap();
/// assert_eq!(gene_map.len(), 2);
/// assert_eq!(gpr_tree.to_string(), "Rv0001 and Rv0002");
/// ```
pub fn parse_gpr(input: &str, gene_map: &mut IndexMap<String, Gene>) -> Result<Gpr, GprParseError> {
    // Convert the GPR string into tokens
    let tokens = lexer::Lexer::new(input).lex()?;
    // Now parse those tokens into a GPR tree
    let mut parser = parser::GprParser::new(tokens, gene_map);
    Ok(parser.parse()?)
}

/// Parse a rule which may be empty, a blank rule means the reaction has no gene association
pub fn parse_gpr_rule(input: &str) -> Result<Option<Gpr>, GprParseError> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    let mut gene_map = IndexMap::new();
    parse_gpr(input, &mut gene_map).map(Some)
}

/// Enum representing possible lex and parse errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GprParseError {
    /// Lexing Error
    #[error("Error occurred during lexing (conversion of GPR string to tokens): {0}")]
    LexingError(#[from] LexerError),
    /// Parsing Error
    #[error("Error occurred during parsing (conversion of tokens to GPR tree): {0}")]
    ParsingError(#[from] ParseError),
}

#[cfg(test)]
mod tests {
    use crate::io::gpr_parse::{parse_gpr, parse_gpr_rule, GprParseError};
    use crate::metabolic_model::gene::{Gene, GeneActivity, Gpr, GprOperation};
    use indexmap::IndexMap;

    #[test]
    fn test_parse_gpr() {
        let gpr = "Rv0001 and (Rv0002 or Rv0003)";
        let mut gene_map: IndexMap<String, Gene> = IndexMap::new();
        let mut inactive = Gene::new("Rv0001");
        inactive.activity = GeneActivity::Inactive;
        gene_map.insert("Rv0001".to_string(), inactive);
        let gpr_tree = parse_gpr(gpr, &mut gene_map).unwrap();
        match gpr_tree {
            Gpr::Operation(GprOperation::And { left, right }) => {
                assert_eq!(*left, Gpr::new_gene_node("Rv0001"));
                match *right {
                    Gpr::Operation(GprOperation::Or { .. }) => {}
                    _ => panic!("Incorrect Parse"),
                }
            }
            _ => panic!("Incorrect gpr parse"),
        }
        // existing genes are kept, new ones are added
        assert_eq!(gene_map.len(), 3);
        assert_eq!(gene_map["Rv0001"].activity, GeneActivity::Inactive);
    }

    #[test]
    fn test_blank_rule() {
        assert_eq!(parse_gpr_rule("  ").unwrap(), None);
        assert!(parse_gpr_rule("b1 or b2").unwrap().is_some());
    }

    #[test]
    fn test_errors() {
        match parse_gpr_rule("b1 | b2") {
            Err(GprParseError::LexingError(_)) => {}
            _ => panic!("Lexing error not reported"),
        }
        match parse_gpr_rule("b1 or") {
            Err(GprParseError::ParsingError(_)) => {}
            _ => panic!("Parsing error not reported"),
        }
    }
}
