use expression_language::{
    BinaryOperator, DeclaredName, GetAttrKind, Node, ParseFlags, Parser, SyntaxError, UnaryOperator, tokenize,
    parser::MAX_NESTING,
};

fn parse_with(expr: &str, names: &[&str], flags: ParseFlags) -> Result<Node, SyntaxError> {
    let names: Vec<DeclaredName> = names.iter().map(|n| DeclaredName::from(*n)).collect();
    Parser::new(["min", "max"]).parse(tokenize(expr)?, &names, flags)
}

fn parse(expr: &str, names: &[&str]) -> Node {
    parse_with(expr, names, ParseFlags::NONE).unwrap()
}

fn dump(expr: &str, names: &[&str]) -> String {
    parse(expr, names).dump()
}

#[test]
fn test_precedence() {
    assert_eq!(dump("1 + 2 * 3", &[]), "(1 + (2 * 3))");
    assert_eq!(dump("(1 + 2) * 3", &[]), "((1 + 2) * 3)");
    assert_eq!(dump("a or b and c", &["a", "b", "c"]), "(a or (b and c))");
    assert_eq!(dump("1 - 2 - 3", &[]), "((1 - 2) - 3)");
}

#[test]
fn test_power_is_right_associative() {
    assert_eq!(dump("2 ** 3 ** 2", &[]), "(2 ** (3 ** 2))");
}

#[test]
fn test_unary_binds_tighter_than_binary() {
    assert_eq!(
        parse("-a + 1", &["a"]),
        Node::binary(
            BinaryOperator::Add,
            Node::unary(UnaryOperator::Minus, Node::name("a")),
            Node::constant(1i64)
        )
    );
    assert_eq!(dump("not a", &["a"]), "(not a)");
}

#[test]
fn test_keywords() {
    assert_eq!(dump("true and FALSE or null", &[]), "((true and false) or null)");
}

#[test]
fn test_conditional_forms() {
    assert_eq!(dump("a ? 1 : 2", &["a"]), "(a ? 1 : 2)");
    assert_eq!(dump("a ?: 2", &["a"]), "(a ? a : 2)");
    assert_eq!(dump("a ? 1", &["a"]), "(a ? 1 : null)");
}

#[test]
fn test_arrays_and_hashes() {
    assert_eq!(dump("[1, 'two', [3]]", &[]), "[1, \"two\", [3]]");
    assert_eq!(dump("[1, 2,]", &[]), "[1, 2]");
    assert_eq!(dump("{a: 1, 'b': 2, (c): 3}", &["c"]), "{\"a\": 1, \"b\": 2, c: 3}");
    assert_eq!(dump("{}", &[]), "[]");
}

#[test]
fn test_member_access() {
    assert_eq!(dump("foo.bar.baz()", &["foo"]), "foo.bar.baz()");
    assert_eq!(dump("foo?.bar[0]", &["foo"]), "foo?.bar[0]");

    let node = parse("foo.bar(1, 2)", &["foo"]);
    assert!(matches!(
        node,
        Node::GetAttr {
            kind: GetAttrKind::Method,
            ..
        }
    ));
}

#[test]
fn test_operator_shaped_attribute_names() {
    assert_eq!(dump("foo.not", &["foo"]), "foo.not");
}

#[test]
fn test_function_calls() {
    assert_eq!(dump("max(1, min(2, 3))", &[]), "max(1, min(2, 3))");
    assert_eq!(dump("max()", &[]), "max()");
}

#[test]
fn test_unknown_function() {
    let err = parse_with("mix(1)", &[], ParseFlags::NONE).unwrap_err();
    assert_eq!(err.message(), "The function \"mix\" does not exist.");
    assert_eq!(err.suggestion(), Some("max"));
    assert_eq!(
        err.to_string(),
        "The function \"mix\" does not exist around position 1 for expression `mix(1)`. Did you mean \"max\"?"
    );
}

#[test]
fn test_unknown_function_ignored() {
    let node = parse_with("mix(1)", &[], ParseFlags::IGNORE_UNKNOWN_FUNCTIONS).unwrap();
    assert_eq!(node.dump(), "mix(1)");
}

#[test]
fn test_unknown_variable() {
    let err = parse_with("foo > bar", &["foo", "baz"], ParseFlags::NONE).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Variable \"bar\" is not valid around position 7 for expression `foo > bar`. Did you mean \"baz\"?"
    );

    // "foo" is three edits away from "baz": no hint
    let err = parse_with("foo.bar", &["baz"], ParseFlags::NONE).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Variable \"foo\" is not valid around position 1 for expression `foo.bar`."
    );
}

#[test]
fn test_unknown_variable_without_close_match() {
    let err = parse_with("foo", &["something"], ParseFlags::NONE).unwrap_err();
    assert_eq!(err.suggestion(), None);
}

#[test]
fn test_unknown_variable_ignored() {
    let node = parse_with("foo + 1", &[], ParseFlags::IGNORE_UNKNOWN_VARIABLES).unwrap();
    assert_eq!(node.dump(), "(foo + 1)");
}

#[test]
fn test_aliased_names_compile_to_their_target() {
    let names = [DeclaredName::from("a"), DeclaredName::alias("B", "b")];
    let node = Parser::new(Vec::<String>::new())
        .parse(tokenize("a + b").unwrap(), &names, ParseFlags::NONE)
        .unwrap();
    assert_eq!(node.dump(), "(a + B)");
}

#[test]
fn test_undeclared_name_before_null_coalesce() {
    let node = parse("foo ?? 'default'", &[]);
    assert_eq!(
        node,
        Node::NullCoalesce {
            left: Box::new(Node::NullCoalescedName("foo".to_string())),
            right: Box::new(Node::constant("default")),
        }
    );
    assert_eq!(node.dump(), "(foo ?? null) ?? (\"default\")");
}

#[test]
fn test_null_coalesce_marks_access_chain() {
    let node = parse("foo.bar.baz ?? 1", &["foo"]);
    let Node::NullCoalesce { left, .. } = node else {
        panic!("expected a null-coalesce node");
    };
    let Node::GetAttr {
        node: base,
        null_coalesce,
        ..
    } = *left
    else {
        panic!("expected an access");
    };
    assert!(null_coalesce);
    assert!(matches!(*base, Node::GetAttr { null_coalesce: true, .. }));
}

#[test]
fn test_matches_rejects_invalid_constant_pattern() {
    let err = parse_with("'a' matches '/[/'", &[], ParseFlags::NONE).unwrap_err();
    assert!(err.message().starts_with("Regexp \"/[/\" passed to \"matches\" is not valid"));
}

#[test]
fn test_matches_checks_patterns_in_evaluation_dialect() {
    assert!(parse_with("a matches '/(?=x)x/'", &["a"], ParseFlags::NONE).is_err());
    assert!(parse_with("a matches '/(a)\\\\1/'", &["a"], ParseFlags::NONE).is_err());
    assert!(parse_with("a matches '/(?i)^x+$/'", &["a"], ParseFlags::NONE).is_ok());
}

#[test]
fn test_matches_requires_string_pattern() {
    let err = parse_with("'a' matches 1 + 1", &[], ParseFlags::NONE).unwrap_err();
    assert_eq!(err.message(), "The regex passed to \"matches\" must be a string.");
    assert!(parse_with("'a' matches '/a/' ~ 'i'", &[], ParseFlags::NONE).is_ok());
}

#[test]
fn test_trailing_tokens() {
    let err = parse_with("1 2", &[], ParseFlags::NONE).unwrap_err();
    assert_eq!(err.message(), "Unexpected token \"number\" of value \"2\"");
    assert_eq!(err.cursor(), Some(3));
}

#[test]
fn test_unexpected_end() {
    let err = parse_with("1 +", &[], ParseFlags::NONE).unwrap_err();
    assert_eq!(err.message(), "Unexpected token \"end of expression\" of value \"\"");
}

#[test]
fn test_missing_hash_colon() {
    let err = parse_with("{a 1}", &[], ParseFlags::NONE).unwrap_err();
    assert_eq!(
        err.message(),
        "A hash key must be followed by a colon (:). Unexpected token \"number\" of value \"1\" (\"punctuation\" expected with value \":\")"
    );
}

#[test]
fn test_invalid_hash_key() {
    let err = parse_with("{[1]: 2}", &[], ParseFlags::NONE).unwrap_err();
    assert!(err.message().starts_with("A hash key must be a quoted string, a number, a name"));
}

#[test]
fn test_lint_without_names_ignores_variables() {
    let parser = Parser::new(Vec::<String>::new());
    assert!(parser.lint(tokenize("anything.at.all").unwrap(), None, ParseFlags::NONE).is_ok());
    assert!(parser.lint(tokenize("anything").unwrap(), Some(&[]), ParseFlags::NONE).is_err());
}

fn assert_too_deep(expr: &str) {
    let err = parse_with(expr, &["a"], ParseFlags::NONE).unwrap_err();
    assert_eq!(err.message(), "Expression is nested too deeply", "{}", &expr[..20]);
}

#[test]
fn test_nesting_limit() {
    let depth = MAX_NESTING + 1;
    assert_too_deep(&format!("{}1{}", "(".repeat(1500), ")".repeat(1500)));
    assert_too_deep(&format!("{}1{}", "[".repeat(depth), "]".repeat(depth)));
    assert_too_deep(&format!("{}1", "-".repeat(depth)));
    assert_too_deep(&format!("{}1", "1 + ".repeat(5000)));
    assert_too_deep(&format!("a{}", ".b".repeat(5000)));
    assert_too_deep(&format!("a{}", "[0]".repeat(depth)));
}

#[test]
fn test_nesting_below_limit() {
    let node = parse(&format!("{}1{}", "(".repeat(200), ")".repeat(200)), &[]);
    assert_eq!(node, Node::constant(1i64));

    let chain = parse(&format!("{}1", "1 + ".repeat(MAX_NESTING - 1)), &[]);
    assert_eq!(chain.height(), MAX_NESTING);
}
