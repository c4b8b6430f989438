//! Recursive-descent parsers for the join-key and target grammars.
//!
//! ```text
//! key      := relation ("," relation)*
//! relation := location "=" location
//!
//! target   := range ("," range)*
//! range    := location "-" location    -- interval
//!           | location "-"             -- left limited
//!           | "-" location             -- right limited
//!           | location                 -- single column
//!
//! location := uint "." uint
//! ```

use super::ast::{JoinKey, Location, Range, Relation, Target};
use super::error::{ParseError, Span};
use super::lexer::Lexer;
use super::token::{Token, TokenKind};

/// Parser over a tokenized query expression.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Tokenizes the input and prepares a parser.
    ///
    /// # Errors
    ///
    /// Returns the first lexer error (unexpected character or a number
    /// that does not fit in 32 bits).
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize();
        if let Some(err) = lexer.take_errors().into_iter().next() {
            return Err(err);
        }
        Ok(Self { tokens, pos: 0 })
    }

    /// Parses the input as a join key.
    pub fn parse_join_key(mut self) -> Result<JoinKey, ParseError> {
        let mut relations = vec![self.parse_relation()?];
        while self.consume_token(TokenKind::Comma) {
            relations.push(self.parse_relation()?);
        }
        self.expect_eof()?;
        Ok(JoinKey::new(relations))
    }

    /// Parses the input as a target.
    pub fn parse_target(mut self) -> Result<Target, ParseError> {
        let mut ranges = vec![self.parse_range()?];
        while self.consume_token(TokenKind::Comma) {
            ranges.push(self.parse_range()?);
        }
        self.expect_eof()?;
        Ok(Target::new(ranges))
    }

    fn parse_relation(&mut self) -> Result<Relation, ParseError> {
        let left = self.parse_location()?;
        self.expect_token(TokenKind::Equal)?;
        let right = self.parse_location()?;
        Ok(Relation::new(left, right))
    }

    fn parse_range(&mut self) -> Result<Range, ParseError> {
        // "-" location
        if self.consume_token(TokenKind::Minus) {
            return Ok(Range::Right(self.parse_location()?));
        }

        let loc = self.parse_location()?;
        if !self.consume_token(TokenKind::Minus) {
            return Ok(Range::Single(loc));
        }

        // A number after the minus makes this an interval; anything
        // else leaves it left-limited.
        if matches!(self.peek_kind(), Some(TokenKind::Uint(_))) {
            return Ok(Range::Interval(loc, self.parse_location()?));
        }
        Ok(Range::Left(loc))
    }

    fn parse_location(&mut self) -> Result<Location, ParseError> {
        let src = self.expect_uint("source number")?;
        self.expect_token(TokenKind::Dot)?;
        let col = self.expect_uint("column number")?;
        Ok(Location::new(src, col))
    }

    fn expect_uint(&mut self, expected: &str) -> Result<u32, ParseError> {
        let span = self.current_span();
        match self.peek_kind() {
            Some(TokenKind::Uint(0)) => Err(ParseError::zero_index(span)),
            Some(TokenKind::Uint(n)) => {
                let n = *n;
                self.advance();
                Ok(n)
            }
            _ => Err(ParseError::unexpected_token(
                expected,
                &self.current_token_name(),
                span,
            )),
        }
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn current_span(&self) -> Span {
        self.tokens.get(self.pos).map_or(Span::at(0), |t| t.span)
    }

    fn current_token_name(&self) -> String {
        self.tokens
            .get(self.pos)
            .map_or_else(|| "end of input".to_string(), |t| t.kind.display_name())
    }

    fn consume_token(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == Some(&kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_token(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.consume_token(kind) {
            Ok(())
        } else {
            Err(ParseError::unexpected_token(
                &kind.display_name(),
                &self.current_token_name(),
                self.current_span(),
            ))
        }
    }

    fn expect_eof(&mut self) -> Result<(), ParseError> {
        if matches!(self.peek_kind(), Some(TokenKind::Eof) | None) {
            Ok(())
        } else {
            Err(ParseError::unexpected_token(
                "end of input",
                &self.current_token_name(),
                self.current_span(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{parse_join_key, parse_target};

    fn loc(src: u32, col: u32) -> Location {
        Location::new(src, col)
    }

    #[test]
    fn test_parse_single_relation() {
        let key = parse_join_key("1.3=2.2").unwrap();
        assert_eq!(
            key,
            JoinKey::new(vec![Relation::new(loc(1, 3), loc(2, 2))])
        );
    }

    #[test]
    fn test_parse_relation_list() {
        let key = parse_join_key("1.3=2.2,2.3=3.1").unwrap();
        assert_eq!(
            key,
            JoinKey::new(vec![
                Relation::new(loc(1, 3), loc(2, 2)),
                Relation::new(loc(2, 3), loc(3, 1)),
            ])
        );
    }

    #[test]
    fn test_parse_key_with_whitespace() {
        let key = parse_join_key(" 1.1 = 2.1 , 2.1 = 3.1 ").unwrap();
        assert_eq!(key.relations.len(), 2);
    }

    #[test]
    fn test_parse_key_errors() {
        assert!(parse_join_key("").is_err());
        assert!(parse_join_key("1.1").is_err());
        assert!(parse_join_key("1.1=").is_err());
        assert!(parse_join_key("1.1=2").is_err());
        assert!(parse_join_key("1.1=2.1,").is_err());
        assert!(parse_join_key("1.1=2.1 3.1").is_err());
        assert!(parse_join_key("1.1-2.1").is_err());
    }

    #[test]
    fn test_parse_key_rejects_zero() {
        let err = parse_join_key("0.1=2.1").unwrap_err();
        assert!(err.message.contains("start at 1"));
        assert!(parse_join_key("1.0=2.1").is_err());
    }

    #[test]
    fn test_parse_key_rejects_overflow() {
        let err = parse_join_key("4294967296.1=2.1").unwrap_err();
        assert!(err.message.contains("32 bits"));
    }

    #[test]
    fn test_parse_target_single() {
        let tgt = parse_target("1.2").unwrap();
        assert_eq!(tgt, Target::new(vec![Range::Single(loc(1, 2))]));
    }

    #[test]
    fn test_parse_target_left() {
        let tgt = parse_target("1.2-").unwrap();
        assert_eq!(tgt, Target::new(vec![Range::Left(loc(1, 2))]));
    }

    #[test]
    fn test_parse_target_right() {
        let tgt = parse_target("-1.2").unwrap();
        assert_eq!(tgt, Target::new(vec![Range::Right(loc(1, 2))]));
    }

    #[test]
    fn test_parse_target_interval() {
        let tgt = parse_target("1.2-2.3").unwrap();
        assert_eq!(
            tgt,
            Target::new(vec![Range::Interval(loc(1, 2), loc(2, 3))])
        );
    }

    #[test]
    fn test_parse_target_list() {
        let tgt = parse_target("-1.2,2.3,3.1-,1.2-2.3").unwrap();
        assert_eq!(
            tgt,
            Target::new(vec![
                Range::Right(loc(1, 2)),
                Range::Single(loc(2, 3)),
                Range::Left(loc(3, 1)),
                Range::Interval(loc(1, 2), loc(2, 3)),
            ])
        );
    }

    #[test]
    fn test_parse_target_duplicates_preserved() {
        let tgt = parse_target("1.2,1.2").unwrap();
        assert_eq!(
            tgt,
            Target::new(vec![Range::Single(loc(1, 2)), Range::Single(loc(1, 2))])
        );
    }

    #[test]
    fn test_parse_target_errors() {
        assert!(parse_target("").is_err());
        assert!(parse_target("-").is_err());
        assert!(parse_target("1").is_err());
        assert!(parse_target("1.").is_err());
        assert!(parse_target("1.2-2").is_err());
        assert!(parse_target("1.2,").is_err());
        assert!(parse_target("1.2=2.2").is_err());
        assert!(parse_target("0.2").is_err());
    }
}
