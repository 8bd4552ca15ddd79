//! JSON <-> expression [`Value`] conversion, for hosts that keep their
//! evaluation context as `serde_json` documents.

use crate::value::{Value, Values};

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Builds an evaluation context from a JSON object. Non-object documents
/// yield an empty context.
pub fn values_from_json(doc: serde_json::Value) -> Values {
    match doc {
        serde_json::Value::Object(obj) => obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
        _ => Values::new(),
    }
}

/// Convert a [`Value`] back to JSON. Non-finite floats and host functions
/// have no JSON form and become `null`.
pub fn to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Null | Value::Function(_) => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(arr) => serde_json::Value::Array(arr.iter().map(to_json).collect()),
        Value::Object(obj) => {
            serde_json::Value::Object(obj.iter().map(|(k, v)| (k.clone(), to_json(v))).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_keep_their_kind() {
        assert_eq!(Value::from(json!(3)), Value::Integer(3));
        assert_eq!(Value::from(json!(2.5)), Value::Float(2.5));
    }

    #[test]
    fn test_context_from_object() {
        let ctx = values_from_json(json!({"a": [1, "x"], "b": null}));
        assert_eq!(ctx.get("a"), Some(&Value::Array(vec![Value::Integer(1), Value::from("x")])));
        assert_eq!(ctx.get("b"), Some(&Value::Null));
        assert!(values_from_json(json!([1, 2])).is_empty());
    }

    #[test]
    fn test_back_to_json() {
        let v = Value::from(json!({"k": [true, 1.5]}));
        assert_eq!(to_json(&v), json!({"k": [true, 1.5]}));
        assert_eq!(to_json(&Value::Float(f64::NAN)), serde_json::Value::Null);
    }
}
