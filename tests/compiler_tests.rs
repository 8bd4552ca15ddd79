use expression_language::{DeclaredName, ExpressionFunction, ExpressionLanguage, Value, Values};

fn names(list: &[&str]) -> Vec<DeclaredName> {
    list.iter().map(|n| DeclaredName::from(*n)).collect()
}

fn compile(expr: &str, declared: &[&str]) -> String {
    ExpressionLanguage::new().compile(expr, &names(declared)).unwrap()
}

#[test]
fn test_aliased_names() {
    let language = ExpressionLanguage::new();
    let compiled = language
        .compile("a + b", &[DeclaredName::from("a"), DeclaredName::alias("B", "b")])
        .unwrap();
    assert_eq!(compiled, "(a + B)");
}

#[test]
fn test_literals() {
    assert_eq!(compile("1", &[]), "1");
    assert_eq!(compile("1.5", &[]), "1.5");
    assert_eq!(compile("'it\"s'", &[]), "\"it\\\"s\"");
    assert_eq!(compile("true", &[]), "true");
    assert_eq!(compile("null", &[]), "null");
    assert_eq!(compile("[1, 'a']", &[]), "[1, \"a\"]");
    assert_eq!(compile("{a: 1, (k): 2}", &["k"]), "{\"a\": 1, k: 2}");
}

#[test]
fn test_operators() {
    assert_eq!(compile("a and b or c", &["a", "b", "c"]), "((a && b) || c)");
    assert_eq!(compile("not a", &["a"]), "(!a)");
    assert_eq!(compile("-a", &["a"]), "(-a)");
    assert_eq!(compile("a === 1", &["a"]), "(a === 1)");
    assert_eq!(compile("a ~ 'x'", &["a"]), "(\"\" + a + \"x\")");
}

#[test]
fn test_helper_operators() {
    assert_eq!(compile("a ** 2", &["a"]), "pow(a, 2)");
    assert_eq!(compile("1..3", &[]), "range(1, 3)");
    assert_eq!(compile("a in b", &["a", "b"]), "inArray(a, b)");
    assert_eq!(compile("a not in b", &["a", "b"]), "notInArray(a, b)");
    assert_eq!(compile("a contains 'x'", &["a"]), "strContains(a, \"x\")");
    assert_eq!(compile("a starts with 'x'", &["a"]), "strStartsWith(a, \"x\")");
    assert_eq!(compile("a ends with 'x'", &["a"]), "strEndsWith(a, \"x\")");
}

#[test]
fn test_matches() {
    let compiled = compile("a matches '/^x/'", &["a"]);
    assert!(compiled.starts_with("(function (regexp, str) {"));
    assert!(compiled.ends_with("})(\"/^x/\", a)"));
}

#[test]
fn test_conditional_and_null_coalesce() {
    assert_eq!(compile("a ? 1 : 2", &["a"]), "((a) ? (1) : (2))");
    assert_eq!(compile("a.b ?? 1", &["a"]), "((a.b) ?? (1))");
    assert_eq!(compile("x ?? 1", &[]), "((x ?? null) ?? (1))");
}

#[test]
fn test_access() {
    assert_eq!(compile("a.b", &["a"]), "a.b");
    assert_eq!(compile("a?.b", &["a"]), "a?.b");
    assert_eq!(compile("a.b(1, 2)", &["a"]), "a.b(1, 2)");
    assert_eq!(compile("a[0]['k']", &["a"]), "a[0][\"k\"]");
}

#[test]
fn test_functions() {
    assert_eq!(compile("max(1, 2)", &[]), "max(1, 2)");

    let mut language = ExpressionLanguage::new();
    language
        .add_function(ExpressionFunction::new(
            "upper",
            |args| format!("{}.toUpperCase()", args[0]),
            |_, args| Ok(Value::String(args[0].as_string().to_uppercase())),
        ))
        .unwrap();
    assert_eq!(language.compile("upper(a)", &names(&["a"])).unwrap(), "a.toUpperCase()");
}

#[test]
fn test_compiled_literals_evaluate_back() {
    let language = ExpressionLanguage::new();
    let empty = Values::new();
    for source in ["42", "-7", "2.5", "1e300", "'multi\\nline \"quoted\"'", "[1, [2, 'x'], null]", "{a: true, b: [1.5]}"] {
        let expected = language.evaluate(source, &empty).unwrap();
        let compiled = language.compile(source, &[]).unwrap();
        let reparsed = language.evaluate(compiled.as_str(), &empty).unwrap();
        assert_eq!(reparsed, expected, "{} compiled to {}", source, compiled);
    }
}
