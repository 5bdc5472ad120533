use indexmap::IndexMap;
use thiserror::Error;

use crate::io::gpr_parse::token::Token;
use crate::metabolic_model::gene::{Gene, Gpr, GprOperatorType};
/*
GPR Grammar:
expression -> or
or -> and ("OR" and)* ;
and -> unary ("AND" unary)* ;
unary -> "NOT" unary | primary ;
primary -> GENE | "(" expression ")" ;

e.g. ( Gene1 AND Gene2) OR (Gene3 AND NOT Gene4)
 */

static EOF: Token = Token::Eof;

/// GPR Parser
pub struct GprParser<'gm> {
    /// Vector of tokens from the GPR string
    tokens: Vec<Token>,
    /// Current token being processed
    current: usize,
    /// Map containing the Genes, genes seen for the first time are added to it
    pub(crate) gene_map: &'gm mut IndexMap<String, Gene>,
}

impl<'gm> GprParser<'gm> {
    /// Create a new GprParser
    pub fn new(tokens: Vec<Token>, gene_map: &'gm mut IndexMap<String, Gene>) -> GprParser<'gm> {
        GprParser {
            tokens,
            current: 0,
            gene_map,
        }
    }

    // region Parsing Functions

    /// Parse the token vector into a GPR AST
    pub fn parse(&mut self) -> Result<Gpr, ParseError> {
        let gpr = self.or()?;
        if !self.is_at_end() {
            // If entire expression has not been parsed, and error has occurred
            return Err(ParseError::EarlyTermination(self.peek().to_string()));
        }
        Ok(gpr)
    }

    fn or(&mut self) -> Result<Gpr, ParseError> {
        let mut expr = self.and()?;
        while self.match_token(&Token::Or) {
            let right = self.and()?;
            expr = Gpr::new_binary_operation(expr, GprOperatorType::Or, right)
                .map_err(|_| ParseError::InvalidBinaryOperator)?;
        }
        Ok(expr)
    }

    fn and(&mut self) -> Result<Gpr, ParseError> {
        let mut expr = self.unary()?;
        while self.match_token(&Token::And) {
            let right = self.unary()?;
            expr = Gpr::new_binary_operation(expr, GprOperatorType::And, right)
                .map_err(|_| ParseError::InvalidBinaryOperator)?;
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Gpr, ParseError> {
        if self.match_token(&Token::Not) {
            let right = self.unary()?;
            return Gpr::new_unary_operation(GprOperatorType::Not, right)
                .map_err(|_| ParseError::InvalidUnaryOperator);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Gpr, ParseError> {
        if let Some(identifier) = self.match_identifier() {
            self.insert_if_needed(&identifier);
            return Ok(Gpr::new_gene_node(&identifier));
        }

        if self.match_token(&Token::LeftParen) {
            let expr = self.or()?;
            self.consume(&Token::RightParen, "Expect ')' after expression.")?;
            return Ok(expr);
        }

        Err(ParseError::ExpectedExpression)
    }

    // endregion Parsing Functions

    // region parsing helper functions

    /// Check whether the token at the current position matches `token`, if it does advance
    /// `self.current` and return true, otherwise return false
    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            return true;
        }
        false
    }

    /// Similar to [`match_token`], but for matching an identifier token. If the current
    /// token is an identifier return `Some(GeneId)`, where GeneId is the gene's string identifier,
    /// otherwise return None
    fn match_identifier(&mut self) -> Option<String> {
        if let Token::Identifier(id) = self.peek() {
            let id = id.clone();
            self.advance();
            return Some(id);
        }
        None
    }

    /// Check whether the current token matches the provided `token`
    fn check(&self, token: &Token) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.peek() == token
    }

    /// Advance `self.current` one position unless at end of the token Vec
    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    /// Check whether the parser is at the end of the source Vec
    fn is_at_end(&self) -> bool {
        *self.peek() == Token::Eof
    }

    /// Get the current token, a missing trailing token reads as Eof
    fn peek(&self) -> &Token {
        self.tokens.get(self.current).unwrap_or(&EOF)
    }

    /// Check whether the current token matches an input token, if it matches advance to the
    /// next token, and if it doesn't return an error. Used mainly for matching parenthesis in
    /// source GPR vec.
    fn consume(&mut self, token: &Token, msg: &str) -> Result<(), ParseError> {
        if self.check(token) {
            self.advance();
            return Ok(());
        }

        Err(ParseError::MissingToken(msg.to_string()))
    }

    // endregion parsing helper functions

    // region Gene Map Functions

    /// Check if a gene_id exists as a key in gene_map, if it doesn't insert a new gene with that id
    fn insert_if_needed(&mut self, gene_id: &str) {
        if !self.gene_map.contains_key(gene_id) {
            self.gene_map
                .insert(gene_id.to_string(), Gene::new(gene_id));
        }
    }

    // endregion Gene Map Functions
}

/// Enum representing possible parse errors
#[derive(Debug, Error, PartialEq, Clone)]
pub enum ParseError {
    /// Token was expected to be a binary operator but was not
    #[error("Invalid binary operator encountered, expected only `and` and `or`")]
    InvalidBinaryOperator,
    /// Token was expected to be a unary operator but was not
    #[error("Invalid unary operator encountered, expected only `not`")]
    InvalidUnaryOperator,
    /// Missing expected token (e.g. a right parenthesis)
    #[error("Missing expected token: {0}")]
    MissingToken(String),
    /// No expression found when one was expected
    #[error("No expression found, check that the GPR string is not empty")]
    ExpectedExpression,
    /// Expression was not completed when parsing terminated
    #[error("Parsing terminated early at `{0}`, check for a missing operator between two genes")]
    EarlyTermination(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::gpr_parse::lexer::Lexer;
    use crate::metabolic_model::gene::GprOperation;

    fn parse(rule: &str) -> Result<Gpr, ParseError> {
        let tokens = Lexer::new(rule).lex().unwrap();
        let mut gene_map = IndexMap::new();
        let mut parser = GprParser::new(tokens, &mut gene_map);
        parser.parse()
    }

    fn gene(id: &str) -> Box<Gpr> {
        Box::new(Gpr::new_gene_node(id))
    }

    #[test]
    fn single_gene_parse() {
        match parse("Rv1304").unwrap() {
            Gpr::Operation(_) => {
                panic!("Incorrect Parse Result (Should have been single gene)")
            }
            Gpr::GeneNode(gene) => {
                if gene != "Rv1304" {
                    panic!("Wrong Gene");
                }
            }
        }
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expected = Gpr::Operation(GprOperation::Or {
            left: gene("a"),
            right: Box::new(Gpr::Operation(GprOperation::And {
                left: gene("b"),
                right: gene("c"),
            })),
        });
        assert_eq!(parse("a or b and c").unwrap(), expected);
    }

    #[test]
    fn not_parse() {
        match parse("not Rv0023").unwrap() {
            Gpr::Operation(GprOperation::Not { val }) => assert_eq!(*val, *gene("Rv0023")),
            _ => panic!("Incorrect Operation Parsed"),
        }
    }

    #[test]
    fn grouping_parse() {
        let expected = Gpr::Operation(GprOperation::And {
            left: Box::new(Gpr::Operation(GprOperation::Or {
                left: gene("Rv3141"),
                right: gene("Rv0023"),
            })),
            right: gene("Rv0018"),
        });
        assert_eq!(parse("(Rv3141 or Rv0023) and Rv0018").unwrap(), expected);
    }

    #[test]
    fn repeated_binary_parse() {
        let expected = Gpr::Operation(GprOperation::And {
            left: Box::new(Gpr::Operation(GprOperation::And {
                left: gene("Rv0001"),
                right: gene("Rv0002"),
            })),
            right: gene("Rv0003"),
        });
        assert_eq!(parse("Rv0001 and Rv0002 and Rv0003").unwrap(), expected);
    }

    #[test]
    fn genes_collected() {
        let tokens = Lexer::new("g1 and (g2 or g1)").lex().unwrap();
        let mut gene_map = IndexMap::new();
        GprParser::new(tokens, &mut gene_map).parse().unwrap();
        assert_eq!(
            gene_map.keys().cloned().collect::<Vec<_>>(),
            vec!["g1".to_string(), "g2".to_string()]
        );
    }

    #[test]
    fn invalid_parse() {
        match parse("Rv0001 not Rv0023") {
            Err(ParseError::EarlyTermination(token)) => assert_eq!(token, "not"),
            _ => panic!("Incorrect error returned"),
        };
        assert_eq!(
            parse("(Rv0001 or Rv0002"),
            Err(ParseError::MissingToken(
                "Expect ')' after expression.".to_string()
            ))
        );
        assert_eq!(parse("Rv0001 and"), Err(ParseError::ExpectedExpression));
    }
}
