//! Canonical textual form of a tree, distinct from compiled source:
//! binary operations are fully parenthesized and operators keep the
//! spelling they were written with.
//!
//! ```text
//! (a + (b * 2))
//! (not foo.bar?.baz())
//! (x ? "yes" : "no")
//! ```

use std::fmt;

use super::node::{GetAttrKind, Node};
use crate::compiler::escape_string;
use crate::value::{Value, format_float};

impl Node {
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out);
        out
    }

    fn dump_into(&self, out: &mut String) {
        match self {
            Node::Constant {
                value, identifier, ..
            } => {
                if *identifier {
                    out.push_str(&value.as_string());
                } else {
                    dump_value(value, out);
                }
            }
            Node::Name(name) => out.push_str(name),
            Node::NullCoalescedName(name) => {
                out.push_str(name);
                out.push_str(" ?? null");
            }
            Node::Unary { operator, node } => {
                out.push('(');
                out.push_str(operator.symbol());
                out.push(' ');
                node.dump_into(out);
                out.push(')');
            }
            Node::Binary {
                operator,
                left,
                right,
            } => {
                out.push('(');
                left.dump_into(out);
                out.push(' ');
                out.push_str(operator.symbol());
                out.push(' ');
                right.dump_into(out);
                out.push(')');
            }
            Node::Conditional {
                condition,
                then,
                otherwise,
            } => {
                out.push('(');
                condition.dump_into(out);
                out.push_str(" ? ");
                then.dump_into(out);
                out.push_str(" : ");
                otherwise.dump_into(out);
                out.push(')');
            }
            Node::NullCoalesce { left, right } => {
                out.push('(');
                left.dump_into(out);
                out.push_str(") ?? (");
                right.dump_into(out);
                out.push(')');
            }
            Node::Array(elements) => {
                let hash = Node::is_hash(elements);
                out.push(if hash { '{' } else { '[' });
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if hash {
                        match &element.key {
                            Some(key) => key.dump_into(out),
                            None => out.push_str(&i.to_string()),
                        }
                        out.push_str(": ");
                    }
                    element.value.dump_into(out);
                }
                out.push(if hash { '}' } else { ']' });
            }
            Node::Arguments(nodes) | Node::Group(nodes) => dump_list(nodes, out),
            Node::GetAttr {
                node,
                attribute,
                arguments,
                kind,
                ..
            } => {
                node.dump_into(out);
                match kind {
                    GetAttrKind::Property | GetAttrKind::Method => {
                        out.push_str(if attribute.is_null_safe() { "?." } else { "." });
                        attribute.dump_into(out);
                        if *kind == GetAttrKind::Method {
                            out.push('(');
                            arguments.dump_into(out);
                            out.push(')');
                        }
                    }
                    GetAttrKind::Array => {
                        out.push('[');
                        attribute.dump_into(out);
                        out.push(']');
                    }
                }
            }
            Node::Function { name, arguments } => {
                out.push_str(name);
                out.push('(');
                arguments.dump_into(out);
                out.push(')');
            }
        }
    }
}

fn dump_list(nodes: &[Node], out: &mut String) {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        node.dump_into(out);
    }
}

fn dump_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Integer(n) => out.push_str(&n.to_string()),
        Value::Float(n) => out.push_str(&format_float(*n)),
        Value::String(s) => {
            out.push('"');
            out.push_str(&escape_string(s));
            out.push('"');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                dump_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push('"');
                out.push_str(&escape_string(key));
                out.push_str("\": ");
                dump_value(&map[key], out);
            }
            out.push('}');
        }
        Value::Function(_) => out.push_str("function"),
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}
