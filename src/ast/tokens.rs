use std::fmt;

use crate::value::Value;

/// The lexical category of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifier, keyword literal or function name
    ///
    /// # Examples
    /// ```text
    /// user
    /// true
    /// max
    /// ```
    Name,

    /// Integer or floating-point literal, underscores already stripped
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 1_000
    /// .5e3
    /// ```
    Number,

    /// Single- or double-quoted string, escapes already decoded
    String,

    /// Symbol or word operator
    ///
    /// # Examples
    /// ```text
    /// ===
    /// not in
    /// starts with
    /// ```
    Operator,

    /// Brackets, `,` `.` `:` `?` and the two-character `?.` `??`
    Punctuation,

    /// End of expression
    Eof,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Name => "name",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Operator => "operator",
            TokenKind::Punctuation => "punctuation",
            TokenKind::Eof => "end of expression",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed lexeme and the 1-based position where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Text for names, strings, operators and punctuation; a number for
    /// numbers; `Null` at the end of the expression.
    pub value: Value,
    pub cursor: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<Value>, cursor: usize) -> Self {
        Token {
            kind,
            value: value.into(),
            cursor,
        }
    }

    pub fn eof(cursor: usize) -> Self {
        Token {
            kind: TokenKind::Eof,
            value: Value::Null,
            cursor,
        }
    }

    /// Tests the token for a kind and, optionally, a value.
    pub fn test(&self, kind: TokenKind, value: Option<&str>) -> bool {
        self.kind == kind && value.is_none_or(|v| self.text() == v)
    }

    pub fn is_punctuation(&self, value: &str) -> bool {
        self.test(TokenKind::Punctuation, Some(value))
    }

    /// The token value as source-like text; empty at the end of the
    /// expression.
    pub fn text(&self) -> String {
        match &self.value {
            Value::Null => String::new(),
            value => value.as_string(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3} {:<11} {}",
            self.cursor,
            self.kind.as_str().to_uppercase(),
            self.text()
        )
    }
}
