use serde::{Deserialize, Serialize};

use super::operators::{BinaryOperator, UnaryOperator};
use crate::value::Value;

/// How a [`Node::GetAttr`] reaches into its base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GetAttrKind {
    /// `base.name`
    Property,
    /// `base.name(args)`
    Method,
    /// `base[expr]`
    Array,
}

/// One element of an array or hash literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayElement {
    /// Present only when the element was written with an explicit key.
    pub key: Option<Node>,
    pub value: Node,
}

/// Abstract Syntax Tree node of a parsed expression.
///
/// Nodes own their children; a tree is immutable once the parser returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Literal value
    ///
    /// Identifier constants name an attribute (`user.name`) and are emitted
    /// unquoted. `null_safe` is set when the attribute was reached with `?.`.
    ///
    /// # Example
    /// ```text
    /// 42
    /// "hello"
    /// ```
    Constant {
        value: Value,
        identifier: bool,
        null_safe: bool,
    },

    /// Variable reference, holding the name used in compiled code
    Name(String),

    /// Undeclared variable on the left of `??`; always `null`
    ///
    /// # Example
    /// ```text
    /// unknown ?? "default"
    /// ```
    NullCoalescedName(String),

    Unary {
        operator: UnaryOperator,
        node: Box<Node>,
    },

    Binary {
        operator: BinaryOperator,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// Ternary
    ///
    /// # Examples
    /// ```text
    /// a ? b : c
    /// a ?: c
    /// a ? b
    /// ```
    Conditional {
        condition: Box<Node>,
        then: Box<Node>,
        otherwise: Box<Node>,
    },

    /// `left ?? right`
    NullCoalesce { left: Box<Node>, right: Box<Node> },

    /// Array or hash literal
    ///
    /// # Example
    /// ```text
    /// [1, 2, 3]
    /// {"name": user.name, (key): 1}
    /// ```
    Array(Vec<ArrayElement>),

    /// Argument list of a method call
    Arguments(Vec<Node>),

    /// Property, method or item access
    GetAttr {
        node: Box<Node>,
        attribute: Box<Node>,
        /// Always a [`Node::Arguments`]; empty unless `kind` is `Method`.
        arguments: Box<Node>,
        kind: GetAttrKind,
        /// Set by the parser on every access of a chain on the left of `??`.
        null_coalesce: bool,
    },

    /// Call of a registered function
    Function {
        name: String,
        /// Always a [`Node::Group`] of the call arguments.
        arguments: Box<Node>,
    },

    /// Anonymous ordered grouping of nodes
    Group(Vec<Node>),
}

impl Node {
    pub fn constant(value: impl Into<Value>) -> Self {
        Node::Constant {
            value: value.into(),
            identifier: false,
            null_safe: false,
        }
    }

    pub fn identifier(name: impl Into<String>, null_safe: bool) -> Self {
        Node::Constant {
            value: Value::String(name.into()),
            identifier: true,
            null_safe,
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Node::Name(name.into())
    }

    pub fn unary(operator: UnaryOperator, node: Node) -> Self {
        Node::Unary {
            operator,
            node: Box::new(node),
        }
    }

    pub fn binary(operator: BinaryOperator, left: Node, right: Node) -> Self {
        Node::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn conditional(condition: Node, then: Node, otherwise: Node) -> Self {
        Node::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// Builds `left ?? right`, marking the access chain on the left so a
    /// `null` anywhere in it falls through to `right`.
    pub fn null_coalesce(left: Node, right: Node) -> Self {
        Node::NullCoalesce {
            left: Box::new(left.mark_null_coalesced()),
            right: Box::new(right),
        }
    }

    pub fn get_attr(node: Node, attribute: Node, arguments: Vec<Node>, kind: GetAttrKind) -> Self {
        Node::GetAttr {
            node: Box::new(node),
            attribute: Box::new(attribute),
            arguments: Box::new(Node::Arguments(arguments)),
            kind,
            null_coalesce: false,
        }
    }

    pub fn function(name: impl Into<String>, arguments: Vec<Node>) -> Self {
        Node::Function {
            name: name.into(),
            arguments: Box::new(Node::Group(arguments)),
        }
    }

    /// Flags this access and every access nested in it as null-coalesced.
    /// Other nodes are returned unchanged.
    pub fn mark_null_coalesced(self) -> Node {
        match self {
            Node::GetAttr {
                node,
                attribute,
                arguments,
                kind,
                ..
            } => Node::GetAttr {
                node: Box::new((*node).mark_null_coalesced()),
                attribute: Box::new((*attribute).mark_null_coalesced()),
                arguments,
                kind,
                null_coalesce: true,
            },
            other => other,
        }
    }

    /// `true` for an identifier constant reached through `?.`.
    pub fn is_null_safe(&self) -> bool {
        matches!(self, Node::Constant { null_safe: true, .. })
    }

    /// Number of nodes on the longest path from this node down to a leaf.
    pub fn height(&self) -> usize {
        let below = match self {
            Node::Constant { .. } | Node::Name(_) | Node::NullCoalescedName(_) => 0,
            Node::Unary { node, .. } => node.height(),
            Node::Binary { left, right, .. } | Node::NullCoalesce { left, right } => left.height().max(right.height()),
            Node::Conditional {
                condition,
                then,
                otherwise,
            } => condition.height().max(then.height()).max(otherwise.height()),
            Node::GetAttr {
                node,
                attribute,
                arguments,
                ..
            } => node.height().max(attribute.height()).max(arguments.height()),
            Node::Function { arguments, .. } => arguments.height(),
            Node::Array(elements) => elements
                .iter()
                .map(|e| e.value.height().max(e.key.as_ref().map_or(0, Node::height)))
                .max()
                .unwrap_or(0),
            Node::Arguments(children) | Node::Group(children) => {
                children.iter().map(Node::height).max().unwrap_or(0)
            }
        };
        below + 1
    }

    /// Whether an array literal has map semantics.
    pub fn is_hash(elements: &[ArrayElement]) -> bool {
        elements.iter().any(|e| e.key.is_some())
    }
}
