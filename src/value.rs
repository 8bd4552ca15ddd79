use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// The variable context an expression is evaluated against.
pub type Values = HashMap<String, Value>;

/// A value flowing through expression evaluation.
///
/// Numbers keep the distinction between integers and floats: arithmetic
/// stays integral while results are whole, and mixed operations go through
/// decimal arithmetic, so `1 + 1.0` is the integer `2`.
///
/// # Examples
///
/// ```
/// use expression_language::{NativeFunction, Value};
/// use std::collections::HashMap;
///
/// let integer = Value::Integer(42);
/// let list = Value::Array(vec![Value::Integer(1), Value::Integer(2)]);
///
/// let mut obj = HashMap::new();
/// obj.insert("name".to_string(), Value::String("Ada".to_string()));
/// obj.insert(
///     "greet".to_string(),
///     Value::Function(NativeFunction::new(|_| Ok(Value::String("hi".into())))),
/// );
/// let object = Value::Object(obj);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,

    Boolean(bool),

    Float(f64),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    String(String),

    /// Ordered list of values
    Array(Vec<Value>),

    /// Object with string keys; its callable members are the methods
    /// reachable through `obj.method(...)`.
    Object(HashMap<String, Value>),

    /// Host callable, only ever supplied through the evaluation context.
    #[serde(skip)]
    Function(NativeFunction),
}

type NativeFn = dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync;

/// A host-provided callable stored inside a [`Value`].
#[derive(Clone)]
pub struct NativeFunction(Arc<NativeFn>);

impl NativeFunction {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        NativeFunction(Arc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        (self.0)(args)
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeFunction")
    }
}

impl Value {
    /// Truthiness as used by `and`, `or`, `not` and the ternary.
    pub fn is_truthy(&self) -> bool {
        use Value::*;
        match self {
            Null => false,
            Boolean(b) => *b,
            Float(n) => *n != 0.0 && !n.is_nan(),
            Integer(n) => *n != 0,
            String(s) => !s.is_empty(),
            Array(_) | Object(_) | Function(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as integer; floats only when they are whole
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            _ => None,
        }
    }

    /// Numeric coercion: null is 0, booleans are 0/1 and numeric strings
    /// are parsed. Anything else becomes NaN.
    pub fn to_numeric(&self) -> Value {
        match self {
            Value::Integer(_) | Value::Float(_) => self.clone(),
            Value::Null => Value::Integer(0),
            Value::Boolean(b) => Value::Integer(*b as i64),
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    Value::Integer(0)
                } else if let Ok(n) = s.parse::<i64>() {
                    Value::Integer(n)
                } else {
                    Value::Float(s.parse::<f64>().unwrap_or(f64::NAN))
                }
            }
            _ => Value::Float(f64::NAN),
        }
    }

    /// Get as string (concatenation)
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(n) => format_float(*n),
            Value::Integer(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Array(items) => items
                .iter()
                .map(|v| if v.is_null() { String::new() } else { v.as_string() })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(_) => "function".to_string(),
        }
    }

    /// Loose equality (`==`): numbers, numeric strings and booleans compare
    /// by numeric value; null only equals null.
    pub fn loose_eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Null, _) | (_, Null) => false,
            (String(a), String(b)) => a == b,
            (Array(_) | Object(_) | Function(_), _) | (_, Array(_) | Object(_) | Function(_)) => {
                self.strict_eq(other)
            }
            _ => numeric_eq(&self.to_numeric(), &other.to_numeric()),
        }
    }

    /// Strict equality (`===`): same kind of value and equal content.
    /// Integers and floats are the same kind.
    pub fn strict_eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Integer(_) | Float(_), Integer(_) | Float(_)) => numeric_eq(self, other),
            (Array(a), Array(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.strict_eq(y)),
            (Object(a), Object(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v.strict_eq(w)))
            }
            _ => self == other,
        }
    }
}

fn numeric_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x == y,
        _ => match (a.as_float(), b.as_float()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

/// Human-readable type name, used in error messages.
pub fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Boolean(_) => "boolean",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Function(_) => "function",
    }
}

pub(crate) fn format_float(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        n.to_string()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}
