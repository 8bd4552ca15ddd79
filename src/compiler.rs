//! Turns a tree into JavaScript-compatible source.
//!
//! Operators without a native counterpart compile to calls of helpers the
//! host runtime is expected to provide:
//!
//! | operator      | emitted                 |
//! |---------------|-------------------------|
//! | `a ** b`      | `pow(a, b)`             |
//! | `a .. b`      | `range(a, b)`           |
//! | `a in b`      | `inArray(a, b)`         |
//! | `a not in b`  | `notInArray(a, b)`      |
//! | `a contains b`| `strContains(a, b)`     |
//! | `starts with` | `strStartsWith(a, b)`   |
//! | `ends with`   | `strEndsWith(a, b)`     |
//!
//! `matches` compiles to a self-contained function expression.

use crate::ast::{BinaryOperator, GetAttrKind, Node, UnaryOperator};
use crate::functions::{ExpressionFunction, FunctionRegistry};
use crate::value::Value;

const MATCHES_PRELUDE: &str = "(function (regexp, str) { try { if (regexp.startsWith(\"/\") && regexp.endsWith(\"/\")) { regexp = regexp.slice(1, -1); } return new RegExp(regexp).test(str ?? \"\"); } catch () { throw new SyntaxError('Invalid regex passed to \"matches\".'); } })(";

/// Escapes a string for a double-quoted literal.
pub(crate) fn escape_string(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            '"' => vec!['\\', '"'],
            '\\' => vec!['\\', '\\'],
            '\n' => vec!['\\', 'n'],
            '\r' => vec!['\\', 'r'],
            '\t' => vec!['\\', 't'],
            c if c.is_control() => format!("\\u{:04x}", c as u32).chars().collect(),
            c => vec![c],
        })
        .collect()
}

fn helper(op: BinaryOperator) -> Option<&'static str> {
    match op {
        BinaryOperator::Power => Some("pow"),
        BinaryOperator::Range => Some("range"),
        BinaryOperator::In => Some("inArray"),
        BinaryOperator::NotIn => Some("notInArray"),
        BinaryOperator::Contains => Some("strContains"),
        BinaryOperator::StartsWith => Some("strStartsWith"),
        BinaryOperator::EndsWith => Some("strEndsWith"),
        _ => None,
    }
}

/// Append-only source buffer that nodes are compiled into.
pub struct Compiler<'f> {
    functions: &'f FunctionRegistry,
    source: String,
}

impl<'f> Compiler<'f> {
    pub fn new(functions: &'f FunctionRegistry) -> Self {
        Compiler {
            functions,
            source: String::new(),
        }
    }

    pub fn function(&self, name: &str) -> Option<&'f ExpressionFunction> {
        self.functions.get(name)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn into_source(self) -> String {
        self.source
    }

    pub fn reset(&mut self) -> &mut Self {
        self.source.clear();
        self
    }

    pub fn raw(&mut self, fragment: &str) -> &mut Self {
        self.source.push_str(fragment);
        self
    }

    /// Appends a double-quoted, escaped string literal.
    pub fn string(&mut self, value: &str) -> &mut Self {
        self.source.push('"');
        self.source.push_str(&escape_string(value));
        self.source.push('"');
        self
    }

    /// Appends the literal form of a value; identifiers are emitted as-is.
    pub fn repr(&mut self, value: &Value, identifier: bool) -> &mut Self {
        if identifier {
            return self.raw(&value.as_string());
        }
        match value {
            Value::Null => self.raw("null"),
            Value::Boolean(b) => self.raw(if *b { "true" } else { "false" }),
            Value::Integer(n) => self.raw(&n.to_string()),
            Value::Float(n) if n.is_nan() => self.raw("NaN"),
            Value::Float(n) if n.is_infinite() => self.raw(if *n > 0.0 { "Infinity" } else { "-Infinity" }),
            // Debug keeps the fractional part: 2.0 stays a float when read back
            Value::Float(n) => self.raw(&format!("{:?}", n)),
            Value::String(s) => self.string(s),
            Value::Array(items) => {
                self.raw("[");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.raw(", ");
                    }
                    self.repr(item, false);
                }
                self.raw("]")
            }
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                self.raw("{");
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        self.raw(", ");
                    }
                    self.string(key).raw(":").repr(&map[key], false);
                }
                self.raw("}")
            }
            Value::Function(_) => self.raw("null"),
        }
    }

    /// Compiles a node into a fresh buffer and returns it, leaving the
    /// current source untouched.
    pub fn subcompile(&mut self, node: &Node) -> String {
        let outer = std::mem::take(&mut self.source);
        self.compile(node);
        std::mem::replace(&mut self.source, outer)
    }

    pub fn compile(&mut self, node: &Node) -> &mut Self {
        match node {
            Node::Constant {
                value, identifier, ..
            } => self.repr(value, *identifier),
            Node::Name(name) => self.raw(name),
            Node::NullCoalescedName(name) => self.raw(name).raw(" ?? null"),
            Node::Unary { operator, node } => {
                let symbol = match operator {
                    UnaryOperator::Not | UnaryOperator::Bang => "!",
                    other => other.symbol(),
                };
                self.raw("(").raw(symbol).compile(node).raw(")")
            }
            Node::Binary {
                operator,
                left,
                right,
            } => self.compile_binary(*operator, left, right),
            Node::Conditional {
                condition,
                then,
                otherwise,
            } => self
                .raw("((")
                .compile(condition)
                .raw(") ? (")
                .compile(then)
                .raw(") : (")
                .compile(otherwise)
                .raw("))"),
            Node::NullCoalesce { left, right } => self.raw("((").compile(left).raw(") ?? (").compile(right).raw("))"),
            Node::Array(elements) => {
                let hash = Node::is_hash(elements);
                self.raw(if hash { "{" } else { "[" });
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.raw(", ");
                    }
                    if hash {
                        match &element.key {
                            Some(key) => self.compile(key),
                            None => self.raw(&i.to_string()),
                        };
                        self.raw(": ");
                    }
                    self.compile(&element.value);
                }
                self.raw(if hash { "}" } else { "]" })
            }
            Node::Arguments(nodes) => {
                for (i, node) in nodes.iter().enumerate() {
                    if i > 0 {
                        self.raw(", ");
                    }
                    self.compile(node);
                }
                self
            }
            Node::Group(nodes) => {
                for node in nodes {
                    self.compile(node);
                }
                self
            }
            Node::GetAttr {
                node,
                attribute,
                arguments,
                kind,
                ..
            } => {
                let access = if attribute.is_null_safe() { "?." } else { "." };
                match kind {
                    GetAttrKind::Property => self.compile(node).raw(access).compile(attribute),
                    GetAttrKind::Method => self
                        .compile(node)
                        .raw(access)
                        .compile(attribute)
                        .raw("(")
                        .compile(arguments)
                        .raw(")"),
                    GetAttrKind::Array => self.compile(node).raw("[").compile(attribute).raw("]"),
                }
            }
            Node::Function { name, arguments } => {
                let nodes: &[Node] = match arguments.as_ref() {
                    Node::Group(nodes) | Node::Arguments(nodes) => nodes,
                    other => std::slice::from_ref(other),
                };
                let args: Vec<String> = nodes.iter().map(|n| self.subcompile(n)).collect();
                match self.function(name) {
                    Some(function) => {
                        let call = function.compile(&args);
                        self.raw(&call)
                    }
                    None => self.raw(name).raw("(").raw(&args.join(", ")).raw(")"),
                }
            }
        }
    }

    fn compile_binary(&mut self, op: BinaryOperator, left: &Node, right: &Node) -> &mut Self {
        if op == BinaryOperator::Matches {
            return self.raw(MATCHES_PRELUDE).compile(right).raw(", ").compile(left).raw(")");
        }
        if let Some(helper) = helper(op) {
            return self.raw(helper).raw("(").compile(left).raw(", ").compile(right).raw(")");
        }
        let symbol = match op {
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::Concat => return self.raw("(\"\" + ").compile(left).raw(" + ").compile(right).raw(")"),
            other => other.symbol(),
        };
        self.raw("(").compile(left).raw(" ").raw(symbol).raw(" ").compile(right).raw(")")
    }
}

impl Node {
    /// Compiles this tree to source with the given functions.
    pub fn compile(&self, functions: &FunctionRegistry) -> String {
        let mut compiler = Compiler::new(functions);
        compiler.compile(self);
        compiler.into_source()
    }
}
