use std::fmt;

use super::tokens::{Token, TokenKind};
use crate::error::SyntaxError;

/// A read cursor over the tokens of one expression.
///
/// The token list is never empty and always ends with an
/// end-of-expression token.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    position: usize,
    expression: String,
}

impl TokenStream {
    pub fn new(mut tokens: Vec<Token>, expression: impl Into<String>) -> Self {
        let expression = expression.into();
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::eof(expression.chars().count() + 1));
        }
        TokenStream {
            tokens,
            position: 0,
            expression,
        }
    }

    pub fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// The (whitespace-normalized) source the tokens came from.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn is_eof(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    /// Moves to the next token. Fails when already on the last one.
    pub fn next(&mut self) -> Result<(), SyntaxError> {
        if self.position + 1 >= self.tokens.len() {
            return Err(SyntaxError::new(
                "Unexpected end of expression",
                Some(self.current().cursor),
                self.expression.clone(),
            ));
        }
        self.position += 1;
        Ok(())
    }

    /// Consumes the current token if it has the given kind (and value),
    /// fails otherwise.
    pub fn expect(&mut self, kind: TokenKind, value: Option<&str>, message: Option<&str>) -> Result<(), SyntaxError> {
        let token = self.current();
        if !token.test(kind, value) {
            let mut msg = String::new();
            if let Some(message) = message {
                msg.push_str(message);
                msg.push_str(". ");
            }
            msg.push_str(&format!(
                "Unexpected token \"{}\" of value \"{}\" (\"{}\" expected",
                token.kind,
                token.text(),
                kind
            ));
            if let Some(value) = value {
                msg.push_str(&format!(" with value \"{}\"", value));
            }
            msg.push(')');
            return Err(SyntaxError::new(msg, Some(token.cursor), self.expression.clone()));
        }
        self.next()
    }
}

impl fmt::Display for TokenStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.tokens.iter().map(|t| t.to_string()).collect();
        f.write_str(&lines.join("\n"))
    }
}
