//! Lexer for the join-key and target grammars.
//!
//! The token set is tiny: unsigned numbers, `.`, `=`, `-`, `,` and EOF.
//! Whitespace between tokens is ignored. Numbers must fit in 32 bits;
//! anything else is reported as a descriptive error.

use super::error::{ParseError, Span};
use super::token::{Token, TokenKind};

/// Tokenizer over a query expression.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    /// Accumulated errors during tokenization.
    errors: Vec<ParseError>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input string.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Returns all errors accumulated during tokenization.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Takes all errors, leaving an empty error list.
    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    /// Tokenizes the entire input and returns all tokens.
    ///
    /// The returned vector always ends with an EOF token.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Returns the next token from the input.
    fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.pos;

        let Some(ch) = self.current_char() else {
            return Token::new(TokenKind::Eof, Span::at(start));
        };

        if ch.is_ascii_digit() {
            return self.scan_number();
        }

        self.advance();
        let kind = match ch {
            '.' => TokenKind::Dot,
            '=' => TokenKind::Equal,
            '-' => TokenKind::Minus,
            ',' => TokenKind::Comma,
            _ => {
                self.errors.push(ParseError::new(
                    format!("unexpected character '{ch}'"),
                    Span::new(start, self.pos),
                ));
                return self.next_token();
            }
        };

        Token::new(kind, Span::new(start, self.pos))
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        let literal = &self.input[start..self.pos];
        let span = Span::new(start, self.pos);
        match literal.parse::<u32>() {
            Ok(n) => Token::new(TokenKind::Uint(n), span),
            Err(_) => {
                self.errors
                    .push(ParseError::number_out_of_range(literal, span));
                Token::new(TokenKind::Uint(0), span)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize();
        assert!(
            lexer.errors().is_empty(),
            "unexpected errors: {:?}",
            lexer.errors()
        );
        tokens.into_iter().map(|t| t.kind).collect()
    }

    fn tokenize_with_errors(input: &str) -> (Vec<TokenKind>, Vec<ParseError>) {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize();
        let errors = lexer.take_errors();
        (tokens.into_iter().map(|t| t.kind).collect(), errors)
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(tokenize(""), vec![TokenKind::Eof]);
        assert_eq!(tokenize("   "), vec![TokenKind::Eof]);
        assert_eq!(tokenize(" \t\n "), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_join_key_tokens() {
        assert_eq!(
            tokenize("1.3=2.2"),
            vec![
                TokenKind::Uint(1),
                TokenKind::Dot,
                TokenKind::Uint(3),
                TokenKind::Equal,
                TokenKind::Uint(2),
                TokenKind::Dot,
                TokenKind::Uint(2),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_target_tokens() {
        assert_eq!(
            tokenize("-1.2,2.1-"),
            vec![
                TokenKind::Minus,
                TokenKind::Uint(1),
                TokenKind::Dot,
                TokenKind::Uint(2),
                TokenKind::Comma,
                TokenKind::Uint(2),
                TokenKind::Dot,
                TokenKind::Uint(1),
                TokenKind::Minus,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_whitespace_between_tokens() {
        assert_eq!(
            tokenize(" 1 . 1 = 2 . 1 "),
            vec![
                TokenKind::Uint(1),
                TokenKind::Dot,
                TokenKind::Uint(1),
                TokenKind::Equal,
                TokenKind::Uint(2),
                TokenKind::Dot,
                TokenKind::Uint(1),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_number_fits_u32() {
        assert_eq!(
            tokenize("4294967295"),
            vec![TokenKind::Uint(u32::MAX), TokenKind::Eof]
        );
    }

    #[test]
    fn test_number_overflow() {
        let (tokens, errors) = tokenize_with_errors("4294967296");
        assert_eq!(tokens, vec![TokenKind::Uint(0), TokenKind::Eof]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("does not fit in 32 bits"));
    }

    #[test]
    fn test_unexpected_character() {
        let (tokens, errors) = tokenize_with_errors("1?2");
        assert_eq!(
            tokens,
            vec![TokenKind::Uint(1), TokenKind::Uint(2), TokenKind::Eof]
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("unexpected character '?'"));
    }

    #[test]
    fn test_token_spans() {
        let mut lexer = Lexer::new("12.3");
        let tokens = lexer.tokenize();
        assert_eq!(tokens[0].span, Span::new(0, 2));
        assert_eq!(tokens[1].span, Span::new(2, 3));
        assert_eq!(tokens[2].span, Span::new(3, 4));
        assert_eq!(tokens[3].span, Span::at(4));
    }
}
