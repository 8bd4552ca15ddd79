use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ast::Node;

/// Input accepted by the facade: either raw source or an already parsed
/// expression, which is used as-is.
#[derive(Debug, Clone)]
pub enum Expression {
    Source(String),
    Parsed(Arc<ParsedExpression>),
}

impl From<&str> for Expression {
    fn from(source: &str) -> Self {
        Expression::Source(source.to_string())
    }
}

impl From<String> for Expression {
    fn from(source: String) -> Self {
        Expression::Source(source)
    }
}

impl From<&String> for Expression {
    fn from(source: &String) -> Self {
        Expression::Source(source.clone())
    }
}

impl From<Arc<ParsedExpression>> for Expression {
    fn from(parsed: Arc<ParsedExpression>) -> Self {
        Expression::Parsed(parsed)
    }
}

impl From<&Arc<ParsedExpression>> for Expression {
    fn from(parsed: &Arc<ParsedExpression>) -> Self {
        Expression::Parsed(Arc::clone(parsed))
    }
}

impl From<ParsedExpression> for Expression {
    fn from(parsed: ParsedExpression) -> Self {
        Expression::Parsed(Arc::new(parsed))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Source(source) => f.write_str(source),
            Expression::Parsed(parsed) => f.write_str(parsed.source()),
        }
    }
}

/// Source text together with the tree it parsed to.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExpression {
    expression: String,
    nodes: Node,
}

impl ParsedExpression {
    pub fn new(expression: impl Into<String>, nodes: Node) -> Self {
        ParsedExpression {
            expression: expression.into(),
            nodes,
        }
    }

    pub fn source(&self) -> &str {
        &self.expression
    }

    pub fn nodes(&self) -> &Node {
        &self.nodes
    }

    pub fn dump(&self) -> String {
        self.nodes.dump()
    }

    /// Converts into the portable form, with the tree stored as JSON.
    pub fn serialize(&self) -> Result<SerializedParsedExpression, serde_json::Error> {
        let nodes = serde_json::to_string(&self.nodes)?;
        Ok(SerializedParsedExpression::new(self.expression.clone(), nodes))
    }
}

impl fmt::Display for ParsedExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

/// A parsed expression whose tree is kept as an opaque string, suitable
/// for storing or sending elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedParsedExpression {
    expression: String,
    nodes: String,
}

impl SerializedParsedExpression {
    pub fn new(expression: impl Into<String>, nodes: impl Into<String>) -> Self {
        SerializedParsedExpression {
            expression: expression.into(),
            nodes: nodes.into(),
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn nodes(&self) -> Result<Node, serde_json::Error> {
        serde_json::from_str(&self.nodes)
    }

    pub fn into_parsed(self) -> Result<ParsedExpression, serde_json::Error> {
        let nodes = self.nodes()?;
        Ok(ParsedExpression::new(self.expression, nodes))
    }
}
