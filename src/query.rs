//! The two query mini-languages: join keys and targets.
//!
//! A join key is a comma-separated list of column equalities
//! (`1.3=2.2,2.3=3.1`), a target is a comma-separated list of column
//! ranges (`1.1,2.2-,-3.1,1.2-2.3`). Both share one lexer; each has its
//! own recursive-descent parser.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{Cut, JoinKey, Location, Range, Relation, Target};
pub use error::{ParseError, Span};

/// Parses a join-key expression like `1.3=2.2,2.3=3.1`.
pub fn parse_join_key(input: &str) -> Result<JoinKey, ParseError> {
    parser::Parser::new(input)?.parse_join_key()
}

/// Parses a target expression like `1.1,2.2-,-3.1,1.2-2.3`.
pub fn parse_target(input: &str) -> Result<Target, ParseError> {
    parser::Parser::new(input)?.parse_target()
}
