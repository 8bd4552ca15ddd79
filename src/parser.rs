use std::collections::HashSet;
use std::ops::BitOr;

use crate::ast::{
    ArrayElement, Associativity, BinaryOperator, GetAttrKind, Node, Token, TokenKind, TokenStream, UnaryOperator,
};
use crate::error::SyntaxError;
use crate::evaluator::compile_pattern;
use crate::value::Value;

/// Deepest tree the parser accepts. Evaluation, compilation and dumping
/// recurse once per level, so this also bounds their stack use.
pub const MAX_NESTING: usize = 256;

/// Switches for relaxing name checks, combinable with `|`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ParseFlags(u8);

impl ParseFlags {
    pub const NONE: ParseFlags = ParseFlags(0);
    /// Accept variables that were not declared.
    pub const IGNORE_UNKNOWN_VARIABLES: ParseFlags = ParseFlags(1);
    /// Accept calls to functions that are not registered.
    pub const IGNORE_UNKNOWN_FUNCTIONS: ParseFlags = ParseFlags(2);

    pub fn contains(self, other: ParseFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for ParseFlags {
    type Output = ParseFlags;

    fn bitor(self, rhs: ParseFlags) -> ParseFlags {
        ParseFlags(self.0 | rhs.0)
    }
}

/// A variable an expression is allowed to reference.
///
/// An alias lets the expression say `source` while compiled code uses
/// `compiled`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeclaredName {
    Plain(String),
    Alias { compiled: String, source: String },
}

impl DeclaredName {
    pub fn alias(compiled: impl Into<String>, source: impl Into<String>) -> Self {
        DeclaredName::Alias {
            compiled: compiled.into(),
            source: source.into(),
        }
    }

    /// The name as written in expressions.
    pub fn source(&self) -> &str {
        match self {
            DeclaredName::Plain(name) => name,
            DeclaredName::Alias { source, .. } => source,
        }
    }

    /// The name as emitted in compiled code and looked up at evaluation.
    pub fn compiled(&self) -> &str {
        match self {
            DeclaredName::Plain(name) => name,
            DeclaredName::Alias { compiled, .. } => compiled,
        }
    }

    /// This name's contribution to an expression cache key.
    pub fn cache_token(&self) -> String {
        match self {
            DeclaredName::Plain(name) => name.clone(),
            DeclaredName::Alias { compiled, source } => format!("{}:{}", compiled, source),
        }
    }
}

impl From<&str> for DeclaredName {
    fn from(name: &str) -> Self {
        DeclaredName::Plain(name.to_string())
    }
}

impl From<String> for DeclaredName {
    fn from(name: String) -> Self {
        DeclaredName::Plain(name)
    }
}

/// Precedence-climbing parser producing a [`Node`] tree.
///
/// Holds the names of the functions that calls are validated against; the
/// set is fixed for the parser's lifetime.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    functions: Vec<String>,
    known: HashSet<String>,
}

impl Parser {
    pub fn new<I, S>(functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut functions: Vec<String> = functions.into_iter().map(Into::into).collect();
        functions.sort();
        functions.dedup();
        let known = functions.iter().cloned().collect();
        Parser { functions, known }
    }

    /// Converts a token stream into a tree.
    pub fn parse(&self, stream: TokenStream, names: &[DeclaredName], flags: ParseFlags) -> Result<Node, SyntaxError> {
        let mut state = ParseState {
            parser: self,
            stream,
            names,
            flags,
            depth: 0,
        };
        let node = state.parse_expression(0)?;
        state.check_height(node.height(), state.stream.current().cursor)?;
        if !state.stream.is_eof() {
            let token = state.stream.current();
            return Err(state.error(
                format!("Unexpected token \"{}\" of value \"{}\"", token.kind, token.text()),
                token.cursor,
            ));
        }
        Ok(node)
    }

    /// Checks the syntax of an expression without keeping the tree.
    ///
    /// `None` for `names` is the deprecated spelling of
    /// [`ParseFlags::IGNORE_UNKNOWN_VARIABLES`].
    pub fn lint(&self, stream: TokenStream, names: Option<&[DeclaredName]>, flags: ParseFlags) -> Result<(), SyntaxError> {
        match names {
            Some(names) => self.parse(stream, names, flags).map(|_| ()),
            None => {
                tracing::warn!(
                    "passing no names to lint() is deprecated; use ParseFlags::IGNORE_UNKNOWN_VARIABLES instead"
                );
                self.parse(stream, &[], flags | ParseFlags::IGNORE_UNKNOWN_VARIABLES)
                    .map(|_| ())
            }
        }
    }
}

struct ParseState<'a> {
    parser: &'a Parser,
    stream: TokenStream,
    names: &'a [DeclaredName],
    flags: ParseFlags,
    /// Nested `parse_expression` calls currently on the stack.
    depth: usize,
}

impl ParseState<'_> {
    fn error(&self, message: impl Into<String>, cursor: usize) -> SyntaxError {
        SyntaxError::new(message, Some(cursor), self.stream.expression())
    }

    fn current(&self) -> Token {
        self.stream.current().clone()
    }

    fn expect_punctuation(&mut self, value: &str, message: &str) -> Result<(), SyntaxError> {
        self.stream.expect(TokenKind::Punctuation, Some(value), Some(message))
    }

    fn binary_operator(&self) -> Option<BinaryOperator> {
        let token = self.stream.current();
        if token.kind != TokenKind::Operator {
            return None;
        }
        BinaryOperator::from_symbol(&token.text())
    }

    fn check_height(&self, height: usize, cursor: usize) -> Result<(), SyntaxError> {
        if height > MAX_NESTING {
            return Err(self.error("Expression is nested too deeply", cursor));
        }
        Ok(())
    }

    fn parse_expression(&mut self, precedence: u16) -> Result<Node, SyntaxError> {
        self.depth += 1;
        let result = match self.check_height(self.depth, self.stream.current().cursor) {
            Ok(()) => self.parse_binary_expression(precedence),
            Err(err) => Err(err),
        };
        self.depth -= 1;
        result
    }

    fn parse_binary_expression(&mut self, precedence: u16) -> Result<Node, SyntaxError> {
        let mut expr = self.get_primary()?;
        let mut height = expr.height();

        while let Some(operator) = self.binary_operator() {
            if operator.precedence() < precedence {
                break;
            }
            let cursor = self.stream.current().cursor;
            self.stream.next()?;
            let next_precedence = match operator.associativity() {
                Associativity::Left => operator.precedence() + 1,
                Associativity::Right => operator.precedence(),
            };
            let right = self.parse_expression(next_precedence)?;
            if operator == BinaryOperator::Matches {
                self.check_pattern(&right, cursor)?;
            }
            height = 1 + height.max(right.height());
            self.check_height(height, cursor)?;
            expr = Node::binary(operator, expr, right);
        }

        if precedence == 0 {
            return self.parse_conditional_expression(expr);
        }
        Ok(expr)
    }

    /// The right operand of `matches` must be a string: a valid constant
    /// pattern, a concatenation, or a value only known at evaluation.
    ///
    /// Constant patterns are checked in the `regex` dialect used for
    /// evaluation, so lookaround and backreferences are rejected even when
    /// the expression is only compiled.
    fn check_pattern(&self, right: &Node, cursor: usize) -> Result<(), SyntaxError> {
        match right {
            Node::Constant { value, .. } => {
                let pattern = value.as_string();
                compile_pattern(&pattern).map(|_| ()).map_err(|e| {
                    self.error(
                        format!("Regexp \"{}\" passed to \"matches\" is not valid: {}", pattern, e),
                        cursor,
                    )
                })
            }
            Node::Binary { operator, .. } if *operator != BinaryOperator::Concat => {
                Err(self.error("The regex passed to \"matches\" must be a string.", cursor))
            }
            _ => Ok(()),
        }
    }

    fn get_primary(&mut self) -> Result<Node, SyntaxError> {
        let token = self.current();

        if token.kind == TokenKind::Operator
            && let Some(operator) = UnaryOperator::from_symbol(&token.text())
        {
            self.stream.next()?;
            let expr = self.parse_expression(operator.precedence())?;
            return self.parse_postfix_expression(Node::unary(operator, expr));
        }

        if token.is_punctuation("(") {
            self.stream.next()?;
            let expr = self.parse_expression(0)?;
            self.expect_punctuation(")", "An opened parenthesis is not properly closed")?;
            return self.parse_postfix_expression(expr);
        }

        self.parse_primary_expression()
    }

    fn parse_primary_expression(&mut self) -> Result<Node, SyntaxError> {
        let token = self.current();
        match token.kind {
            TokenKind::Name => {
                self.stream.next()?;
                let name = token.text();
                match name.as_str() {
                    "true" | "TRUE" => Ok(Node::constant(true)),
                    "false" | "FALSE" => Ok(Node::constant(false)),
                    "null" | "NULL" => Ok(Node::constant(Value::Null)),
                    _ if self.stream.current().is_punctuation("(") => {
                        if !self.flags.contains(ParseFlags::IGNORE_UNKNOWN_FUNCTIONS)
                            && !self.parser.known.contains(&name)
                        {
                            return Err(self
                                .error(format!("The function \"{}\" does not exist.", name), token.cursor)
                                .with_proposals(&name, self.parser.functions.as_slice()));
                        }
                        let arguments = self.parse_arguments()?;
                        self.parse_postfix_expression(Node::function(name, arguments))
                    }
                    _ => {
                        let mut compiled = name.clone();
                        if !self.flags.contains(ParseFlags::IGNORE_UNKNOWN_VARIABLES) {
                            match self.names.iter().find(|n| n.source() == name) {
                                Some(declared) => compiled = declared.compiled().to_string(),
                                None if self.stream.current().is_punctuation("??") => {
                                    return Ok(Node::NullCoalescedName(name));
                                }
                                None => {
                                    let proposals: Vec<&str> = self.names.iter().map(|n| n.source()).collect();
                                    return Err(self
                                        .error(format!("Variable \"{}\" is not valid.", name), token.cursor)
                                        .with_proposals(&name, proposals.as_slice()));
                                }
                            }
                        }
                        self.parse_postfix_expression(Node::Name(compiled))
                    }
                }
            }
            TokenKind::Number | TokenKind::String => {
                self.stream.next()?;
                Ok(Node::constant(token.value))
            }
            _ if token.is_punctuation("[") => {
                let array = self.parse_array_expression()?;
                self.parse_postfix_expression(array)
            }
            _ if token.is_punctuation("{") => {
                let hash = self.parse_hash_expression()?;
                self.parse_postfix_expression(hash)
            }
            _ => Err(self.error(
                format!("Unexpected token \"{}\" of value \"{}\"", token.kind, token.text()),
                token.cursor,
            )),
        }
    }

    fn parse_array_expression(&mut self) -> Result<Node, SyntaxError> {
        self.expect_punctuation("[", "An array element was expected")?;

        let mut elements = Vec::new();
        while !self.stream.current().is_punctuation("]") {
            if !elements.is_empty() {
                self.expect_punctuation(",", "An array element must be followed by a comma")?;
                if self.stream.current().is_punctuation("]") {
                    break;
                }
            }
            elements.push(ArrayElement {
                key: None,
                value: self.parse_expression(0)?,
            });
        }

        self.expect_punctuation("]", "An opened array is not properly closed")?;
        Ok(Node::Array(elements))
    }

    fn parse_hash_expression(&mut self) -> Result<Node, SyntaxError> {
        self.expect_punctuation("{", "A hash element was expected")?;

        let mut elements = Vec::new();
        while !self.stream.current().is_punctuation("}") {
            if !elements.is_empty() {
                self.expect_punctuation(",", "A hash value must be followed by a comma")?;
                if self.stream.current().is_punctuation("}") {
                    break;
                }
            }

            let token = self.current();
            let key = match token.kind {
                TokenKind::String | TokenKind::Name | TokenKind::Number => {
                    self.stream.next()?;
                    Node::constant(token.value)
                }
                _ if token.is_punctuation("(") => self.parse_expression(0)?,
                _ => {
                    return Err(self.error(
                        format!(
                            "A hash key must be a quoted string, a number, a name, or an expression enclosed in parentheses (unexpected token \"{}\" with value \"{}\").",
                            token.kind,
                            token.text()
                        ),
                        token.cursor,
                    ));
                }
            };

            self.expect_punctuation(":", "A hash key must be followed by a colon (:)")?;
            let value = self.parse_expression(0)?;
            elements.push(ArrayElement { key: Some(key), value });
        }

        self.expect_punctuation("}", "An opened hash is not properly closed")?;
        Ok(Node::Array(elements))
    }

    fn parse_postfix_expression(&mut self, mut node: Node) -> Result<Node, SyntaxError> {
        let mut height = node.height();
        loop {
            let token = self.current();
            let (attribute, arguments, kind) = if token.is_punctuation(".") || token.is_punctuation("?.") {
                let null_safe = token.is_punctuation("?.");
                self.stream.next()?;
                let attribute = self.current();
                self.stream.next()?;

                let name_shaped = attribute.kind == TokenKind::Operator && is_name(&attribute.text());
                if attribute.kind != TokenKind::Name && !name_shaped {
                    return Err(self.error("Expected name", attribute.cursor));
                }

                let constant = Node::identifier(attribute.text(), null_safe);
                if self.stream.current().is_punctuation("(") {
                    (constant, self.parse_arguments()?, GetAttrKind::Method)
                } else {
                    (constant, Vec::new(), GetAttrKind::Property)
                }
            } else if token.is_punctuation("[") {
                self.stream.next()?;
                let attribute = self.parse_expression(0)?;
                self.stream.expect(TokenKind::Punctuation, Some("]"), None)?;
                (attribute, Vec::new(), GetAttrKind::Array)
            } else {
                return Ok(node);
            };

            let arguments_height = 1 + arguments.iter().map(Node::height).max().unwrap_or(0);
            height = 1 + height.max(attribute.height()).max(arguments_height);
            self.check_height(height, token.cursor)?;
            node = Node::get_attr(node, attribute, arguments, kind);
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Node>, SyntaxError> {
        self.expect_punctuation("(", "A list of arguments must begin with an opening parenthesis")?;

        let mut args = Vec::new();
        while !self.stream.current().is_punctuation(")") {
            if !args.is_empty() {
                self.expect_punctuation(",", "Arguments must be separated by a comma")?;
            }
            args.push(self.parse_expression(0)?);
        }

        self.expect_punctuation(")", "A list of arguments must be closed by a parenthesis")?;
        Ok(args)
    }

    fn parse_conditional_expression(&mut self, mut expr: Node) -> Result<Node, SyntaxError> {
        while self.stream.current().is_punctuation("??") {
            self.stream.next()?;
            let fallback = self.parse_expression(0)?;
            expr = Node::null_coalesce(expr, fallback);
        }

        while self.stream.current().is_punctuation("?") {
            self.stream.next()?;
            let then = if self.stream.current().is_punctuation(":") {
                expr.clone()
            } else {
                self.parse_expression(0)?
            };

            expr = if self.stream.current().is_punctuation(":") {
                self.stream.next()?;
                let otherwise = self.parse_expression(0)?;
                Node::conditional(expr, then, otherwise)
            } else {
                Node::conditional(expr, then, Node::constant(Value::Null))
            };
        }

        Ok(expr)
    }
}

fn is_name(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c >= '\u{7f}')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c >= '\u{7f}')
}
