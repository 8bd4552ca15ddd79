use crate::ast::{Token, TokenKind, TokenStream};
use crate::error::SyntaxError;
use crate::value::Value;

/// Operators in matching order; longer spellings come before their prefixes.
const OPERATORS: &[&str] = &[
    "starts with", "ends with", "contains", "matches", "not in", "and", "not", "or", "in",
    "===", "!==", "&&", "||", "==", "!=", ">=", "<=", "<<", ">>", "**", "..",
    "!", "|", "^", "&", "<", ">", "+", "-", "~", "*", "/", "%",
];

fn is_word_operator(op: &str) -> bool {
    op.starts_with(|c: char| c.is_ascii_alphabetic())
}

fn is_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch >= '\u{7f}'
}

fn is_name_char(ch: char) -> bool {
    is_name_start(ch) || ch.is_ascii_digit()
}

/// Converts expression text into a [`TokenStream`].
///
/// Positions in lexer errors are 0-based character offsets; token cursors
/// are 1-based.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    expression: String,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let expression: String = input
            .chars()
            .map(|c| if matches!(c, '\r' | '\n' | '\t' | '\u{0b}' | '\u{0c}') { ' ' } else { c })
            .collect();
        Lexer {
            input: expression.chars().collect(),
            position: 0,
            expression,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn error(&self, message: String, position: usize) -> SyntaxError {
        SyntaxError::new(message, Some(position), self.expression.clone())
    }

    fn push(&self, tokens: &mut Vec<Token>, kind: TokenKind, value: impl Into<Value>, start: usize) {
        tokens.push(Token::new(kind, value, start + 1));
    }

    pub fn tokenize(mut self) -> Result<TokenStream, SyntaxError> {
        let mut tokens = Vec::new();
        let mut brackets: Vec<(char, usize)> = Vec::new();

        while let Some(ch) = self.current_char() {
            let start = self.position;

            if ch == ' ' {
                self.advance();
                continue;
            }

            if let Some((number, len)) = self.scan_number() {
                self.push(&mut tokens, TokenKind::Number, number, start);
                self.position += len;
                continue;
            }

            if matches!(ch, '(' | '[' | '{') {
                brackets.push((ch, start));
                self.push(&mut tokens, TokenKind::Punctuation, ch.to_string(), start);
                self.advance();
                continue;
            }

            if matches!(ch, ')' | ']' | '}') {
                let Some((open, at)) = brackets.pop() else {
                    return Err(self.error(format!("Unexpected \"{}\"", ch), start));
                };
                if closing_for(open) != ch {
                    return Err(self.error(format!("Unclosed \"{}\"", open), at));
                }
                self.push(&mut tokens, TokenKind::Punctuation, ch.to_string(), start);
                self.advance();
                continue;
            }

            if let Some((string, len)) = self.scan_string() {
                self.push(&mut tokens, TokenKind::String, string, start);
                self.position += len;
                continue;
            }

            if let Some(len) = self.scan_comment() {
                self.position += len;
                continue;
            }

            if let Some(op) = self.scan_operator() {
                self.push(&mut tokens, TokenKind::Operator, op, start);
                self.position += op.chars().count();
                continue;
            }

            if ch == '?' && matches!(self.peek_char(1), Some('.') | Some('?')) {
                let mut punct = String::from('?');
                punct.extend(self.peek_char(1));
                self.push(&mut tokens, TokenKind::Punctuation, punct, start);
                self.position += 2;
                continue;
            }

            if matches!(ch, ',' | '.' | ':' | '?') {
                self.push(&mut tokens, TokenKind::Punctuation, ch.to_string(), start);
                self.advance();
                continue;
            }

            if is_name_start(ch) {
                let name = self.read_name();
                self.push(&mut tokens, TokenKind::Name, name, start);
                continue;
            }

            return Err(self.error(format!("Unexpected character \"{}\"", ch), start));
        }

        if let Some(&(open, at)) = brackets.first() {
            return Err(self.error(format!("Unclosed \"{}\"", open), at));
        }

        tracing::trace!(tokens = tokens.len(), "tokenized expression");
        tokens.push(Token::eof(self.position + 1));
        Ok(TokenStream::new(tokens, self.expression))
    }

    fn read_name(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if is_name_char(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn count_digits(&self, from: usize) -> usize {
        let mut len = 0;
        while let Some(ch) = self.peek_char(from + len) {
            if ch.is_ascii_digit() || (len > 0 && ch == '_') {
                len += 1;
            } else {
                break;
            }
        }
        len
    }

    /// `1`, `1_000`, `1.5`, `.5`, `1e10`, `2.5E-3`
    fn scan_number(&self) -> Option<(Value, usize)> {
        let mut len = self.count_digits(0);
        let mut is_float = false;
        if len > 0 {
            if self.peek_char(len) == Some('.') {
                let fraction = self.count_digits(len + 1);
                if fraction > 0 {
                    len += 1 + fraction;
                    is_float = true;
                }
            }
        } else if self.current_char() == Some('.') {
            let fraction = self.count_digits(1);
            if fraction == 0 {
                return None;
            }
            len = 1 + fraction;
            is_float = true;
        } else {
            return None;
        }

        if matches!(self.peek_char(len), Some('e') | Some('E')) {
            let sign = usize::from(matches!(self.peek_char(len + 1), Some('+') | Some('-')));
            let exponent = self.count_digits(len + 1 + sign);
            if exponent > 0 {
                len += 1 + sign + exponent;
                is_float = true;
            }
        }

        let text: String = self.input[self.position..self.position + len]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        let value = match text.parse::<i64>() {
            Ok(n) if !is_float => Value::Integer(n),
            _ => Value::Float(text.parse::<f64>().ok()?),
        };
        Some((value, len))
    }

    /// A quoted string with its escapes decoded. Unterminated quotes are
    /// not strings.
    fn scan_string(&self) -> Option<(String, usize)> {
        let quote = self.current_char().filter(|c| *c == '"' || *c == '\'')?;
        let mut result = String::new();
        let mut offset = 1;
        loop {
            let ch = self.peek_char(offset)?;
            offset += 1;
            match ch {
                c if c == quote => return Some((result, offset)),
                '\\' => {
                    let escaped = self.peek_char(offset)?;
                    offset += 1;
                    match escaped {
                        'n' => result.push('\n'),
                        't' => result.push('\t'),
                        'r' => result.push('\r'),
                        '0' => result.push('\0'),
                        'u' => match self.read_unicode_escape(offset) {
                            Some(decoded) => {
                                result.push(decoded);
                                offset += 4;
                            }
                            None => result.push('u'),
                        },
                        other => result.push(other),
                    }
                }
                c => result.push(c),
            }
        }
    }

    fn read_unicode_escape(&self, offset: usize) -> Option<char> {
        let hex: String = (0..4).map(|i| self.peek_char(offset + i)).collect::<Option<String>>()?;
        u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
    }

    /// `/* ... */` and `/** ... */`
    fn scan_comment(&self) -> Option<usize> {
        if self.current_char() != Some('/') || self.peek_char(1) != Some('*') {
            return None;
        }
        let mut offset = 2;
        loop {
            match (self.peek_char(offset), self.peek_char(offset + 1)) {
                (Some('*'), Some('/')) => return Some(offset + 2),
                (Some(_), _) => offset += 1,
                (None, _) => return None,
            }
        }
    }

    /// Word operators only count when they stand alone: preceded by the
    /// start of input, a space or `(`, and followed by the end of input, a
    /// space or `(`. This keeps `in` from matching inside `info`.
    fn scan_operator(&self) -> Option<&'static str> {
        OPERATORS.iter().copied().find(|op| {
            let len = op.chars().count();
            let matches_here = op.chars().enumerate().all(|(i, c)| self.peek_char(i) == Some(c));
            if !matches_here {
                return false;
            }
            if !is_word_operator(op) {
                return true;
            }
            let before = self.position.checked_sub(1).and_then(|p| self.input.get(p).copied());
            let after = self.peek_char(len);
            before.is_none_or(|c| c == ' ' || c == '(') && after.is_none_or(|c| c == ' ' || c == '(')
        })
    }
}

fn closing_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Tokenizes `expression` in one call.
pub fn tokenize(expression: &str) -> Result<TokenStream, SyntaxError> {
    Lexer::new(expression).tokenize()
}

#[test]
fn test_word_operator_boundaries() {
    let stream = tokenize("info in list").unwrap();
    let kinds: Vec<TokenKind> = stream.tokens().iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![TokenKind::Name, TokenKind::Operator, TokenKind::Name, TokenKind::Eof]
    );
    assert_eq!(stream.tokens()[1].value, Value::from("in"));
}

#[test]
fn test_numbers() {
    let stream = tokenize("1_000 .5 2e3 7").unwrap();
    let values: Vec<Value> = stream.tokens().iter().map(|t| t.value.clone()).collect();
    assert_eq!(
        values,
        vec![
            Value::Integer(1000),
            Value::Float(0.5),
            Value::Float(2000.0),
            Value::Integer(7),
            Value::Null
        ]
    );
}

#[test]
fn test_range_is_not_a_decimal() {
    let stream = tokenize("1..3").unwrap();
    assert_eq!(stream.tokens()[0].value, Value::Integer(1));
    assert!(stream.tokens()[1].test(TokenKind::Operator, Some("..")));
    assert_eq!(stream.tokens()[2].value, Value::Integer(3));
}

#[test]
fn test_cursor_and_eof() {
    let stream = tokenize("a + b").unwrap();
    let cursors: Vec<usize> = stream.tokens().iter().map(|t| t.cursor).collect();
    assert_eq!(cursors, vec![1, 3, 5, 6]);
}
