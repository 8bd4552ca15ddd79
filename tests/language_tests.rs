use std::sync::Arc;
use std::time::Duration;

use expression_language::{
    BuiltinFunctionProvider, CacheConfig, DeclaredName, Error, ExpressionCache, ExpressionFunction,
    ExpressionFunctionProvider, ExpressionLanguage, ParseFlags, SerializedParsedExpression, Value, Values,
    values_from_json,
};
use serde_json::json;

struct GreetingProvider;

impl ExpressionFunctionProvider for GreetingProvider {
    fn functions(&self) -> Vec<ExpressionFunction> {
        vec![ExpressionFunction::from_native("greet", |args| {
            let name = args.first().map(Value::as_string).unwrap_or_default();
            Ok(Value::String(format!("Hello, {}!", name)))
        })]
    }
}

#[test]
fn test_evaluate_simple_sum() {
    let language = ExpressionLanguage::new();
    assert_eq!(language.evaluate("1 + 1", &Values::new()).unwrap(), Value::Integer(2));
}

#[test]
fn test_evaluate_json_context() {
    let language = ExpressionLanguage::new();
    let values = values_from_json(json!({"a": "a", "b": ["a", "b"]}));
    assert_eq!(language.evaluate("a in b", &values).unwrap(), Value::Boolean(true));
}

#[test]
fn test_parse_is_cached() {
    let language = ExpressionLanguage::new();
    let first = language
        .parse("a + b", &[DeclaredName::from("a"), DeclaredName::from("b")], ParseFlags::NONE)
        .unwrap();
    let second = language
        .parse("a + b", &[DeclaredName::from("b"), DeclaredName::from("a")], ParseFlags::NONE)
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(language.cache().len(), 1);
}

#[test]
fn test_parse_cache_separates_flags() {
    let language = ExpressionLanguage::new();
    assert!(
        language
            .parse("unknown", &[], ParseFlags::IGNORE_UNKNOWN_VARIABLES)
            .is_ok()
    );
    assert!(language.parse("unknown", &[], ParseFlags::NONE).is_err());
}

#[test]
fn test_parsed_expression_passes_through() {
    let language = ExpressionLanguage::new();
    let parsed = language.parse("x * 2", &[DeclaredName::from("x")], ParseFlags::NONE).unwrap();
    let again = language.parse(&parsed, &[], ParseFlags::NONE).unwrap();
    assert!(Arc::ptr_eq(&parsed, &again));

    let mut values = Values::new();
    values.insert("x".to_string(), Value::Integer(21));
    assert_eq!(language.evaluate(&parsed, &values).unwrap(), Value::Integer(42));
    assert_eq!(language.compile(parsed, &[]).unwrap(), "(x * 2)");
}

#[test]
fn test_registration_closes_after_first_parse() {
    let mut language = ExpressionLanguage::new();
    language
        .register(
            "double",
            |args| format!("({} * 2)", args[0]),
            |_, args| Ok(Value::Integer(args[0].as_int().unwrap_or(0) * 2)),
        )
        .unwrap();
    assert_eq!(language.evaluate("double(4)", &Values::new()).unwrap(), Value::Integer(8));

    let err = language
        .register("late", |_| String::new(), |_, _| Ok(Value::Null))
        .unwrap_err();
    assert!(matches!(err, Error::RegistrationSealed));
    assert_eq!(
        err.to_string(),
        "Registering functions after calling evaluate(), compile() or parse() is not supported."
    );
    assert!(language.register_provider(&GreetingProvider).is_err());
}

#[test]
fn test_lint_also_closes_registration() {
    let mut language = ExpressionLanguage::new();
    language.lint("1", Some(&[]), ParseFlags::NONE).unwrap();
    assert!(matches!(
        language.add_function(ExpressionFunction::from_native("f", |_| Ok(Value::Null))),
        Err(Error::RegistrationSealed)
    ));
}

#[test]
fn test_providers() {
    let mut language = ExpressionLanguage::new();
    language.register_provider(&GreetingProvider).unwrap();
    assert_eq!(
        language.evaluate("greet('Ada')", &Values::new()).unwrap(),
        Value::from("Hello, Ada!")
    );

    let language = ExpressionLanguage::with_providers([Box::new(BuiltinFunctionProvider) as Box<dyn ExpressionFunctionProvider>]);
    assert_eq!(language.evaluate("abs(-3) + floor(2.7)", &Values::new()).unwrap(), Value::Integer(5));
    assert_eq!(language.compile("sqrt(16)", &[]).unwrap(), "sqrt(16)");
}

#[test]
fn test_default_functions() {
    let language = ExpressionLanguage::new();
    let mut names = language.functions().names();
    names.sort();
    assert_eq!(names, vec!["max", "min", "now"]);
}

#[test]
fn test_lint() {
    let language = ExpressionLanguage::new();
    assert!(language.lint("a.b", Some(&[DeclaredName::from("a")]), ParseFlags::NONE).is_ok());
    assert!(language.lint("a.b", None, ParseFlags::NONE).is_ok());
    assert!(matches!(
        language.lint("a +", None, ParseFlags::NONE),
        Err(Error::Syntax(_))
    ));
    assert!(language.lint("nope(1)", Some(&[]), ParseFlags::IGNORE_UNKNOWN_FUNCTIONS).is_ok());
}

#[test]
fn test_dump_and_serialize() {
    let language = ExpressionLanguage::new();
    let names: Vec<DeclaredName> = vec!["user".into()];
    let parsed = language
        .parse("user.age >= 18 and user?.name", &names, ParseFlags::NONE)
        .unwrap();
    assert_eq!(parsed.dump(), "((user.age >= 18) and user?.name)");

    let serialized = parsed.serialize().unwrap();
    assert_eq!(serialized.expression(), "user.age >= 18 and user?.name");

    let transported: SerializedParsedExpression =
        serde_json::from_str(&serde_json::to_string(&serialized).unwrap()).unwrap();
    let restored = transported.into_parsed().unwrap();
    assert_eq!(restored.nodes(), parsed.nodes());

    let values = values_from_json(json!({"user": {"age": 30, "name": "Ada"}}));
    assert_eq!(language.evaluate(restored, &values).unwrap(), Value::from("Ada"));
}

#[test]
fn test_cache_eviction_through_facade() {
    let language = ExpressionLanguage::with_cache(ExpressionCache::new(CacheConfig {
        capacity: 2,
        ttl: Duration::from_secs(60),
    }));
    for expr in ["1", "2", "3"] {
        language.parse(expr, &[], ParseFlags::NONE).unwrap();
    }
    assert_eq!(language.cache().len(), 2);
}

#[test]
fn test_syntax_errors_surface_through_facade() {
    let language = ExpressionLanguage::new();
    let err = language.evaluate("foo > bar", &values_from_json(json!({"foo": 1, "baz": 2}))).unwrap_err();
    let Error::Syntax(syntax) = err else {
        panic!("expected a syntax error");
    };
    assert_eq!(syntax.suggestion(), Some("baz"));
}

#[test]
fn test_shared_across_threads() {
    let language = Arc::new(ExpressionLanguage::new());
    let handles: Vec<_> = (0..4i64)
        .map(|i| {
            let language = Arc::clone(&language);
            std::thread::spawn(move || {
                let mut values = Values::new();
                values.insert("i".to_string(), Value::Integer(i));
                language.evaluate("i * i", &values).unwrap()
            })
        })
        .collect();
    let results: Vec<Value> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(
        results,
        vec![Value::Integer(0), Value::Integer(1), Value::Integer(4), Value::Integer(9)]
    );
}
