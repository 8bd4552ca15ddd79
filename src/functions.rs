//! Functions callable from expressions.
//!
//! Each [`ExpressionFunction`] knows how to emit its call into compiled
//! source and how to compute it during evaluation. A small builtin table
//! covers the math helpers; hosts add their own through
//! [`ExpressionLanguage::register`](crate::ExpressionLanguage::register) or an
//! [`ExpressionFunctionProvider`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::EvalError;
use crate::evaluator::power;
use crate::value::{Value, Values};

pub type CompileFn = Arc<dyn Fn(&[String]) -> String + Send + Sync>;
pub type EvaluateFn = Arc<dyn Fn(&Values, &[Value]) -> Result<Value, EvalError> + Send + Sync>;

type Builtin = fn(&[Value]) -> Result<Value, EvalError>;

#[derive(Clone)]
pub struct ExpressionFunction {
    name: String,
    compiler: CompileFn,
    evaluator: EvaluateFn,
}

impl ExpressionFunction {
    /// `compiler` receives the already compiled arguments; `evaluator`
    /// receives the variable context followed by the evaluated arguments.
    pub fn new<C, E>(name: impl Into<String>, compiler: C, evaluator: E) -> Self
    where
        C: Fn(&[String]) -> String + Send + Sync + 'static,
        E: Fn(&Values, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        ExpressionFunction {
            name: name.into(),
            compiler: Arc::new(compiler),
            evaluator: Arc::new(evaluator),
        }
    }

    /// Wraps a plain function: it compiles to `name(arg, ...)` and ignores
    /// the variable context.
    pub fn from_native<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        let name = name.into();
        let emitted = name.clone();
        ExpressionFunction::new(
            name,
            move |args| format!("{}({})", emitted, args.join(", ")),
            move |_, args| function(args),
        )
    }

    /// Looks a function up in the builtin table.
    pub fn builtin(name: &str) -> Option<Self> {
        BUILTINS
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(name, function)| ExpressionFunction::from_native(*name, *function))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn compile(&self, args: &[String]) -> String {
        (self.compiler)(args)
    }

    pub fn evaluate(&self, values: &Values, args: &[Value]) -> Result<Value, EvalError> {
        (self.evaluator)(values, args)
    }
}

impl fmt::Debug for ExpressionFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionFunction").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A bundle of functions registered together.
pub trait ExpressionFunctionProvider {
    fn functions(&self) -> Vec<ExpressionFunction>;
}

/// Provides every builtin function.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFunctionProvider;

impl ExpressionFunctionProvider for BuiltinFunctionProvider {
    fn functions(&self) -> Vec<ExpressionFunction> {
        BUILTINS
            .iter()
            .map(|(name, function)| ExpressionFunction::from_native(*name, *function))
            .collect()
    }
}

/// Name → function table. Registering an existing name replaces it.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, ExpressionFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, function: ExpressionFunction) {
        self.functions.insert(name.into(), function);
    }

    pub fn get(&self, name: &str) -> Option<&ExpressionFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

static BUILTINS: &[(&str, Builtin)] = &[
    ("min", min),
    ("max", max),
    ("now", now),
    ("abs", abs),
    ("ceil", ceil),
    ("floor", floor),
    ("round", round),
    ("sqrt", sqrt),
    ("pow", pow),
    ("constant", constant),
];

/// Named numeric constants reachable through `constant()`.
static CONSTANTS: &[(&str, f64)] = &[
    ("Math.PI", std::f64::consts::PI),
    ("Math.E", std::f64::consts::E),
    ("Math.LN2", std::f64::consts::LN_2),
    ("Math.LN10", std::f64::consts::LN_10),
    ("Math.LOG2E", std::f64::consts::LOG2_E),
    ("Math.LOG10E", std::f64::consts::LOG10_E),
    ("Math.SQRT2", std::f64::consts::SQRT_2),
    ("Math.SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
    ("Number.MAX_SAFE_INTEGER", 9_007_199_254_740_991.0),
    ("Number.MIN_SAFE_INTEGER", -9_007_199_254_740_991.0),
    ("Number.EPSILON", f64::EPSILON),
    ("Number.MAX_VALUE", f64::MAX),
];

fn arg<'v>(function: &str, args: &'v [Value], index: usize) -> Result<&'v Value, EvalError> {
    args.get(index).ok_or_else(|| {
        EvalError::Function(format!("{}() expects at least {} argument(s)", function, index + 1))
    })
}

fn number_arg(function: &str, args: &[Value], index: usize) -> Result<Value, EvalError> {
    Ok(arg(function, args, index)?.to_numeric())
}

/// Collapses whole finite floats to integers.
fn whole(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.2e18 {
        Value::Integer(n as i64)
    } else {
        Value::Float(n)
    }
}

fn extreme(args: &[Value], pick_greater: bool) -> Result<Value, EvalError> {
    let items = match args {
        [Value::Array(items)] => items.as_slice(),
        _ => args,
    };
    let mut best: Option<Value> = None;
    for item in items {
        let candidate = item.to_numeric();
        let Some(n) = candidate.as_float() else { continue };
        if n.is_nan() {
            return Ok(Value::Float(f64::NAN));
        }
        let replace = best.as_ref().and_then(Value::as_float).is_none_or(|current| {
            if pick_greater { n > current } else { n < current }
        });
        if replace {
            best = Some(candidate);
        }
    }
    Ok(best.unwrap_or(Value::Float(if pick_greater { f64::NEG_INFINITY } else { f64::INFINITY })))
}

fn min(args: &[Value]) -> Result<Value, EvalError> {
    extreme(args, false)
}

fn max(args: &[Value]) -> Result<Value, EvalError> {
    extreme(args, true)
}

/// Milliseconds since the Unix epoch.
fn now(_: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Integer(chrono::Utc::now().timestamp_millis()))
}

fn abs(args: &[Value]) -> Result<Value, EvalError> {
    Ok(match number_arg("abs", args, 0)? {
        Value::Integer(n) => n.checked_abs().map(Value::Integer).unwrap_or(Value::Float((n as f64).abs())),
        Value::Float(n) => Value::Float(n.abs()),
        other => other,
    })
}

fn rounding(name: &str, args: &[Value], op: fn(f64) -> f64) -> Result<Value, EvalError> {
    Ok(match number_arg(name, args, 0)? {
        Value::Float(n) => whole(op(n)),
        other => other,
    })
}

fn ceil(args: &[Value]) -> Result<Value, EvalError> {
    rounding("ceil", args, f64::ceil)
}

fn floor(args: &[Value]) -> Result<Value, EvalError> {
    rounding("floor", args, f64::floor)
}

/// Halves round towards positive infinity.
fn round(args: &[Value]) -> Result<Value, EvalError> {
    rounding("round", args, |n| (n + 0.5).floor())
}

fn sqrt(args: &[Value]) -> Result<Value, EvalError> {
    let n = number_arg("sqrt", args, 0)?.as_float().unwrap_or(f64::NAN);
    Ok(whole(n.sqrt()))
}

fn pow(args: &[Value]) -> Result<Value, EvalError> {
    power(arg("pow", args, 0)?, arg("pow", args, 1)?)
}

fn constant(args: &[Value]) -> Result<Value, EvalError> {
    let Value::String(name) = arg("constant", args, 0)? else {
        return Err(EvalError::Function(
            "constant() expects parameter 1 to be string".to_string(),
        ));
    };
    CONSTANTS
        .iter()
        .find(|(constant, _)| constant == name)
        .map(|(_, value)| whole(*value))
        .ok_or_else(|| EvalError::Function(format!("Constant '{}' is not defined", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, EvalError> {
        ExpressionFunction::builtin(name).unwrap().evaluate(&Values::new(), args)
    }

    #[test]
    fn test_min_max() {
        assert_eq!(call("min", &[Value::Integer(3), Value::Float(1.5)]).unwrap(), Value::Float(1.5));
        assert_eq!(call("max", &[Value::from(vec![1i64, 9, 4])]).unwrap(), Value::Integer(9));
    }

    #[test]
    fn test_constant_table() {
        assert_eq!(call("constant", &[Value::from("Math.PI")]).unwrap(), Value::Float(std::f64::consts::PI));
        let err = call("constant", &[Value::from("process.env")]).unwrap_err();
        assert_eq!(err.to_string(), "Constant 'process.env' is not defined");
    }

    #[test]
    fn test_native_compiles_to_call() {
        let f = ExpressionFunction::builtin("max").unwrap();
        assert_eq!(f.compile(&["a".to_string(), "2".to_string()]), "max(a, 2)");
        assert!(ExpressionFunction::builtin("eval").is_none());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(call("round", &[Value::Float(2.5)]).unwrap(), Value::Integer(3));
        assert_eq!(call("floor", &[Value::Float(-1.5)]).unwrap(), Value::Integer(-2));
        assert_eq!(call("sqrt", &[Value::Integer(16)]).unwrap(), Value::Integer(4));
    }
}
