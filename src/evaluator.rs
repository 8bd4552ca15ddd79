use regex::Regex;
use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};

use crate::ast::{BinaryOperator, GetAttrKind, Node, UnaryOperator};
use crate::error::EvalError;
use crate::functions::FunctionRegistry;
use crate::value::{Value, Values, type_name};

/// Longest array a `..` range may produce.
pub const MAX_RANGE_LENGTH: u64 = 1 << 20;

/// Walks a tree and computes its value against a variable context.
///
/// Evaluation never mutates the tree, so one cached tree can be evaluated
/// from several threads at once.
pub struct Evaluator<'a> {
    functions: &'a FunctionRegistry,
}

impl<'a> Evaluator<'a> {
    pub fn new(functions: &'a FunctionRegistry) -> Self {
        Evaluator { functions }
    }

    pub fn evaluate(&self, node: &Node, values: &Values) -> Result<Value, EvalError> {
        match node {
            Node::Constant { value, .. } => Ok(value.clone()),
            Node::Name(name) => Ok(values.get(name).cloned().unwrap_or(Value::Null)),
            Node::NullCoalescedName(_) => Ok(Value::Null),
            Node::Unary { operator, node } => {
                let value = self.evaluate(node, values)?;
                apply_unary(*operator, &value)
            }
            Node::Binary {
                operator,
                left,
                right,
            } => self.eval_binary(*operator, left, right, values),
            Node::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.evaluate(condition, values)?.is_truthy() {
                    self.evaluate(then, values)
                } else {
                    self.evaluate(otherwise, values)
                }
            }
            Node::NullCoalesce { left, right } => match self.evaluate(left, values)? {
                Value::Null => self.evaluate(right, values),
                value => Ok(value),
            },
            Node::Array(elements) => {
                if Node::is_hash(elements) {
                    let mut object = Values::new();
                    for (index, element) in elements.iter().enumerate() {
                        let key = match &element.key {
                            Some(key) => self.evaluate(key, values)?.as_string(),
                            None => index.to_string(),
                        };
                        object.insert(key, self.evaluate(&element.value, values)?);
                    }
                    Ok(Value::Object(object))
                } else {
                    let items = elements
                        .iter()
                        .map(|e| self.evaluate(&e.value, values))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Value::Array(items))
                }
            }
            Node::Arguments(nodes) | Node::Group(nodes) => Ok(Value::Array(self.evaluate_all(nodes, values)?)),
            Node::GetAttr { .. } => self.eval_access(node, values).map(|(value, _)| value),
            Node::Function { name, arguments } => {
                let function = self
                    .functions
                    .get(name)
                    .ok_or_else(|| EvalError::UnknownFunction(name.clone()))?;
                let args = match arguments.as_ref() {
                    Node::Group(nodes) | Node::Arguments(nodes) => self.evaluate_all(nodes, values)?,
                    other => vec![self.evaluate(other, values)?],
                };
                function.evaluate(values, &args)
            }
        }
    }

    fn evaluate_all(&self, nodes: &[Node], values: &Values) -> Result<Vec<Value>, EvalError> {
        nodes.iter().map(|n| self.evaluate(n, values)).collect()
    }

    /// Evaluates an access and reports whether its chain short-circuited.
    ///
    /// A `null` base is only an error when neither this access nor any
    /// access below it in the chain is null-safe or null-coalesced.
    fn eval_access(&self, node: &Node, values: &Values) -> Result<(Value, bool), EvalError> {
        let Node::GetAttr {
            node: base,
            attribute,
            arguments,
            kind,
            null_coalesce,
        } = node
        else {
            return Ok((self.evaluate(node, values)?, false));
        };

        let (object, upstream) = self.eval_access(base, values)?;
        if object.is_null() && (upstream || *null_coalesce || attribute.is_null_safe()) {
            return Ok((Value::Null, true));
        }

        match kind {
            GetAttrKind::Property => {
                let property = attribute_name(attribute);
                let value = match &object {
                    Value::Object(map) => map.get(&property).cloned().unwrap_or(Value::Null),
                    Value::Array(items) => array_property(items, &property),
                    _ => {
                        return Err(EvalError::Access(format!(
                            "Unable to get property \"{}\" of non-object \"{}\".",
                            attribute.dump(),
                            base.dump()
                        )));
                    }
                };
                Ok((value, false))
            }
            GetAttrKind::Method => {
                let method = attribute_name(attribute);
                let Value::Object(map) = &object else {
                    return Err(EvalError::Access(format!(
                        "Unable to call method \"{}\" of non-object \"{}\".",
                        attribute.dump(),
                        base.dump()
                    )));
                };
                match map.get(&method) {
                    Some(Value::Function(callable)) => {
                        let args = match arguments.as_ref() {
                            Node::Arguments(nodes) | Node::Group(nodes) => self.evaluate_all(nodes, values)?,
                            other => vec![self.evaluate(other, values)?],
                        };
                        Ok((callable.call(&args)?, false))
                    }
                    found => Err(EvalError::NotCallable {
                        method,
                        found: found.map(type_name).unwrap_or("undefined").to_string(),
                    }),
                }
            }
            GetAttrKind::Array => {
                let key = self.evaluate(attribute, values)?;
                let value = match &object {
                    Value::Array(items) => key
                        .as_int()
                        .and_then(|i| usize::try_from(i).ok())
                        .and_then(|i| items.get(i).cloned())
                        .unwrap_or(Value::Null),
                    Value::Object(map) => map.get(&key.as_string()).cloned().unwrap_or(Value::Null),
                    _ => {
                        return Err(EvalError::Access(format!(
                            "Unable to get an item of non-array \"{}\".",
                            base.dump()
                        )));
                    }
                };
                Ok((value, false))
            }
        }
    }

    fn eval_binary(&self, op: BinaryOperator, left: &Node, right: &Node, values: &Values) -> Result<Value, EvalError> {
        let left = self.evaluate(left, values)?;

        // or/and return the deciding operand and never touch the right side
        // once the left one settles the result
        match op {
            BinaryOperator::Or | BinaryOperator::OrOr => {
                return if left.is_truthy() { Ok(left) } else { self.evaluate(right, values) };
            }
            BinaryOperator::And | BinaryOperator::AndAnd => {
                return if left.is_truthy() { self.evaluate(right, values) } else { Ok(left) };
            }
            _ => {}
        }

        let right = self.evaluate(right, values)?;
        apply_binary(op, &left, &right)
    }
}

impl Node {
    /// Evaluates this tree with the given functions and variables.
    pub fn evaluate(&self, functions: &FunctionRegistry, values: &Values) -> Result<Value, EvalError> {
        Evaluator::new(functions).evaluate(self, values)
    }
}

fn attribute_name(attribute: &Node) -> String {
    match attribute {
        Node::Constant { value, .. } => value.as_string(),
        other => other.dump(),
    }
}

fn array_property(items: &[Value], property: &str) -> Value {
    if property == "length" {
        return Value::Integer(items.len() as i64);
    }
    property
        .parse::<usize>()
        .ok()
        .and_then(|i| items.get(i).cloned())
        .unwrap_or(Value::Null)
}

fn apply_unary(op: UnaryOperator, value: &Value) -> Result<Value, EvalError> {
    match op {
        UnaryOperator::Not | UnaryOperator::Bang => Ok(Value::Boolean(!value.is_truthy())),
        UnaryOperator::Plus => Ok(value.to_numeric()),
        UnaryOperator::Minus => Ok(match value.to_numeric() {
            Value::Integer(n) => n.checked_neg().map(Value::Integer).unwrap_or(Value::Float(-(n as f64))),
            Value::Float(n) => Value::Float(-n),
            other => other,
        }),
        UnaryOperator::Tilde => Ok(Value::Integer(i64::from(!to_int32(value)))),
    }
}

pub(crate) fn apply_binary(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value, EvalError> {
    use BinaryOperator::*;
    match op {
        Or | OrOr => Ok(if left.is_truthy() { left.clone() } else { right.clone() }),
        And | AndAnd => Ok(if left.is_truthy() { right.clone() } else { left.clone() }),

        BitOr => Ok(Value::Integer(i64::from(to_int32(left) | to_int32(right)))),
        BitXor => Ok(Value::Integer(i64::from(to_int32(left) ^ to_int32(right)))),
        BitAnd => Ok(Value::Integer(i64::from(to_int32(left) & to_int32(right)))),
        ShiftLeft => Ok(Value::Integer(i64::from(
            to_int32(left).wrapping_shl(to_int32(right) as u32 & 31),
        ))),
        ShiftRight => Ok(Value::Integer(i64::from(
            to_int32(left).wrapping_shr(to_int32(right) as u32 & 31),
        ))),

        Equal => Ok(Value::Boolean(left.loose_eq(right))),
        NotEqual => Ok(Value::Boolean(!left.loose_eq(right))),
        Identical => Ok(Value::Boolean(left.strict_eq(right))),
        NotIdentical => Ok(Value::Boolean(!left.strict_eq(right))),
        Less | Greater | LessEqual | GreaterEqual => Ok(Value::Boolean(compare(op, left, right))),

        In | NotIn => {
            let Value::Array(items) = right else {
                return Err(EvalError::TypeError(format!(
                    "Cannot search for an item in {}",
                    type_name(right)
                )));
            };
            let found = items.iter().any(|item| item.strict_eq(left));
            Ok(Value::Boolean(if op == In { found } else { !found }))
        }
        Contains | StartsWith | EndsWith => {
            if left.is_null() {
                return Ok(Value::Boolean(false));
            }
            let (haystack, needle) = (left.as_string(), right.as_string());
            Ok(Value::Boolean(match op {
                Contains => haystack.contains(&needle),
                StartsWith => haystack.starts_with(&needle),
                _ => haystack.ends_with(&needle),
            }))
        }
        Matches => {
            let pattern = right.as_string();
            let regex = compile_pattern(&pattern).map_err(|e| EvalError::InvalidRegex {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            let subject = if left.is_null() { String::new() } else { left.as_string() };
            Ok(Value::Boolean(regex.is_match(&subject)))
        }

        Range => {
            let (Some(start), Some(end)) = (left.to_numeric().as_int(), right.to_numeric().as_int()) else {
                return Err(EvalError::TypeError(format!(
                    "Cannot build a range from {} to {}",
                    type_name(left),
                    type_name(right)
                )));
            };
            if start > end {
                return Ok(Value::Array(Vec::new()));
            }
            let length = i128::from(end) - i128::from(start) + 1;
            if length > i128::from(MAX_RANGE_LENGTH) {
                return Err(EvalError::TypeError(format!(
                    "Invalid range length {} (at most {} items)",
                    length, MAX_RANGE_LENGTH
                )));
            }
            Ok(Value::Array((start..=end).map(Value::Integer).collect()))
        }

        Add => {
            if is_textual(left) || is_textual(right) {
                return Ok(Value::String(format!("{}{}", left.as_string(), right.as_string())));
            }
            arithmetic(op, left, right)
        }
        Subtract | Multiply | Power => arithmetic(op, left, right),
        Divide => {
            if is_zero(right) {
                return Err(EvalError::DivisionByZero);
            }
            arithmetic(op, left, right)
        }
        Modulo => {
            if is_zero(right) {
                return Err(EvalError::ModuloByZero);
            }
            arithmetic(op, left, right)
        }
        Concat => Ok(Value::String(format!("{}{}", left.as_string(), right.as_string()))),
    }
}

fn is_textual(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Array(_) | Value::Object(_))
}

fn is_zero(value: &Value) -> bool {
    match value.to_numeric() {
        Value::Integer(n) => n == 0,
        Value::Float(n) => n == 0.0,
        _ => false,
    }
}

/// Integer view used by the bitwise operators; non-numbers become 0.
/// Bitwise operands wrap to 32 bits, as they do in the compiled output.
fn to_int32(value: &Value) -> i32 {
    match value.to_numeric() {
        Value::Integer(n) => n as i32,
        Value::Float(n) if n.is_finite() => (n.trunc() % 4_294_967_296.0) as i64 as i32,
        _ => 0,
    }
}

fn compare(op: BinaryOperator, left: &Value, right: &Value) -> bool {
    use std::cmp::Ordering;

    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (left.to_numeric(), right.to_numeric()) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(&b)),
            (a, b) => match (a.as_float(), b.as_float()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        },
    };
    match (op, ordering) {
        (_, None) => false,
        (BinaryOperator::Less, Some(o)) => o == Ordering::Less,
        (BinaryOperator::Greater, Some(o)) => o == Ordering::Greater,
        (BinaryOperator::LessEqual, Some(o)) => o != Ordering::Greater,
        (_, Some(o)) => o != Ordering::Less,
    }
}

/// Numeric operators. Integer operands stay integral while the result is
/// exact; an integer mixed with a float goes through decimal arithmetic and
/// collapses back to an integer when the result is whole.
fn arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let (left, right) = (left.to_numeric(), right.to_numeric());
    match (&left, &right) {
        (Value::Integer(a), Value::Integer(b)) => Ok(integer_arithmetic(op, *a, *b)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_arithmetic(op, *a, *b))),
        (Value::Integer(_), Value::Float(_)) | (Value::Float(_), Value::Integer(_)) => {
            if op != BinaryOperator::Power
                && let Some(result) = decimal_arithmetic(op, &left, &right)
            {
                return Ok(result);
            }
            let (a, b) = (left.as_float().unwrap_or(f64::NAN), right.as_float().unwrap_or(f64::NAN));
            Ok(Value::Float(float_arithmetic(op, a, b)))
        }
        _ => Err(EvalError::TypeError(format!(
            "Cannot apply \"{}\" to {} and {}",
            op.symbol(),
            type_name(&left),
            type_name(&right)
        ))),
    }
}

fn integer_arithmetic(op: BinaryOperator, a: i64, b: i64) -> Value {
    let exact = match op {
        BinaryOperator::Add => a.checked_add(b),
        BinaryOperator::Subtract => a.checked_sub(b),
        BinaryOperator::Multiply => a.checked_mul(b),
        // Check if division is exact; if not, return Float
        BinaryOperator::Divide => a.checked_rem(b).filter(|r| *r == 0).and_then(|_| a.checked_div(b)),
        BinaryOperator::Modulo => a.checked_rem(b),
        BinaryOperator::Power => u32::try_from(b).ok().and_then(|e| a.checked_pow(e)),
        _ => None,
    };
    match exact {
        Some(n) => Value::Integer(n),
        None => Value::Float(float_arithmetic(op, a as f64, b as f64)),
    }
}

fn float_arithmetic(op: BinaryOperator, a: f64, b: f64) -> f64 {
    match op {
        BinaryOperator::Add => a + b,
        BinaryOperator::Subtract => a - b,
        BinaryOperator::Multiply => a * b,
        BinaryOperator::Divide => a / b,
        BinaryOperator::Modulo => a % b,
        BinaryOperator::Power => a.powf(b),
        _ => f64::NAN,
    }
}

fn decimal_arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> Option<Value> {
    let to_decimal = |v: &Value| match v {
        Value::Integer(n) => Decimal::from_i64(*n),
        Value::Float(n) => Decimal::from_f64(*n),
        _ => None,
    };
    let (ad, bd) = (to_decimal(left)?, to_decimal(right)?);
    let rd = match op {
        BinaryOperator::Add => ad.checked_add(bd),
        BinaryOperator::Subtract => ad.checked_sub(bd),
        BinaryOperator::Multiply => ad.checked_mul(bd),
        BinaryOperator::Divide => ad.checked_div(bd),
        BinaryOperator::Modulo => ad.checked_rem(bd),
        _ => None,
    }?;
    if rd.is_integer()
        && let Some(r) = rd.to_i64()
    {
        return Some(Value::Integer(r));
    }
    rd.to_f64().map(Value::Float)
}

/// `a ** b`, shared with the `pow` function.
pub(crate) fn power(left: &Value, right: &Value) -> Result<Value, EvalError> {
    arithmetic(BinaryOperator::Power, left, right)
}

/// Builds the regex for `matches`. A pattern written as `/body/flags` has
/// its delimiters stripped and its flags applied inline.
pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    if let Some(rest) = pattern.strip_prefix('/')
        && let Some(end) = rest.rfind('/')
    {
        let (body, flags) = (&rest[..end], &rest[end + 1..]);
        if flags.chars().all(|c| "gimsuxU".contains(c)) {
            let inline: String = flags.chars().filter(|c| *c != 'g').collect();
            return if inline.is_empty() {
                Regex::new(body)
            } else {
                Regex::new(&format!("(?{}){}", inline, body))
            };
        }
    }
    Regex::new(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_arithmetic_collapses() {
        let sum = apply_binary(BinaryOperator::Add, &Value::Integer(1), &Value::Float(1.0)).unwrap();
        assert_eq!(sum, Value::Integer(2));
        let sum = apply_binary(BinaryOperator::Add, &Value::Float(0.1), &Value::Integer(0)).unwrap();
        assert_eq!(sum, Value::Float(0.1));
    }

    #[test]
    fn test_integer_division() {
        assert_eq!(
            apply_binary(BinaryOperator::Divide, &Value::Integer(6), &Value::Integer(3)).unwrap(),
            Value::Integer(2)
        );
        assert_eq!(
            apply_binary(BinaryOperator::Divide, &Value::Integer(7), &Value::Integer(2)).unwrap(),
            Value::Float(3.5)
        );
    }

    #[test]
    fn test_pattern_delimiters() {
        assert!(compile_pattern("/^abc$/").unwrap().is_match("abc"));
        assert!(compile_pattern("/^abc$/i").unwrap().is_match("ABC"));
        assert!(compile_pattern("^a/b$").unwrap().is_match("a/b"));
        assert!(compile_pattern("/[a-/").is_err());
    }
}
