// tests/parser_tests.rs

use record_rules::ast::{
    BinOp, Expr, Identifier, Literal, LogicalOp, Macro, Modifier, Operator, RequestScope, Scope,
};
use record_rules::lexer::Lexer;
use record_rules::parser::{ParseError, ParseOptions, Parser, parse};

fn field(path: &str) -> Expr {
    Expr::Identifier(Identifier::field(path))
}

fn int(n: i64) -> Expr {
    Expr::Literal(Literal::Integer(n))
}

fn string(s: &str) -> Expr {
    Expr::Literal(Literal::String(s.to_string()))
}

fn eq(left: Expr, right: Expr) -> Expr {
    Expr::compare(Operator::plain(BinOp::Equal), left, right)
}

fn parse_err(input: &str) -> ParseError {
    match parse(input) {
        Ok(expr) => panic!("Expected parse error for {input:?}, got {expr:?}"),
        Err(e) => e,
    }
}

// ============================================================================
// Comparisons
// ============================================================================

#[test]
fn test_simple_comparison() {
    assert_eq!(
        parse(r#"status = "published""#).unwrap(),
        eq(field("status"), string("published"))
    );
}

#[test]
fn test_every_operator() {
    for op in BinOp::ALL {
        for any in [false, true] {
            let operator = if any { Operator::any_of(op) } else { Operator::plain(op) };
            let input = format!("views {operator} 5");
            assert_eq!(
                parse(&input).unwrap(),
                Expr::compare(operator, field("views"), int(5)),
                "Failed for input: {}",
                input
            );
        }
    }
}

#[test]
fn test_literal_operands() {
    let test_cases = vec![
        ("a = 4.5", Expr::Literal(Literal::Float(4.5))),
        ("a = -3", int(-3)),
        ("a = true", Expr::Literal(Literal::Boolean(true))),
        ("a = null", Expr::Literal(Literal::Null)),
        ("a = 'x'", string("x")),
        ("a = b.c", field("b.c")),
    ];

    for (input, right) in test_cases {
        assert_eq!(parse(input).unwrap(), eq(field("a"), right), "Failed for input: {}", input);
    }
}

#[test]
fn test_literal_on_left() {
    assert_eq!(parse("'x' = a").unwrap(), eq(string("x"), field("a")));
}

// ============================================================================
// Precedence and grouping
// ============================================================================

#[test]
fn test_and_binds_tighter() {
    let expected = Expr::or(
        eq(field("a"), int(1)),
        Expr::and(eq(field("b"), int(2)), eq(field("c"), int(3))),
    );
    assert_eq!(parse("a = 1 || b = 2 && c = 3").unwrap(), expected);
}

#[test]
fn test_left_associative_chains() {
    let expected = Expr::and(
        Expr::and(eq(field("a"), int(1)), eq(field("b"), int(2))),
        eq(field("c"), int(3)),
    );
    assert_eq!(parse("a = 1 && b = 2 && c = 3").unwrap(), expected);

    let expected = Expr::or(
        Expr::or(eq(field("a"), int(1)), eq(field("b"), int(2))),
        eq(field("c"), int(3)),
    );
    assert_eq!(parse("a = 1 || b = 2 || c = 3").unwrap(), expected);
}

#[test]
fn test_group_overrides_precedence() {
    let expected = Expr::and(
        Expr::group(Expr::or(
            eq(field("status"), string("published")),
            eq(field("featured"), Expr::Literal(Literal::Boolean(true))),
        )),
        Expr::compare(Operator::plain(BinOp::GreaterThan), field("views"), int(50)),
    );
    assert_eq!(
        parse(r#"(status = "published" || featured = true) && views > 50"#).unwrap(),
        expected
    );
}

#[test]
fn test_nested_groups() {
    let expr = parse("((a = 1))").unwrap();
    assert_eq!(expr, Expr::group(Expr::group(eq(field("a"), int(1)))));
}

// ============================================================================
// Identifiers
// ============================================================================

#[test]
fn test_request_identifiers() {
    let test_cases = vec![
        ("@request.auth.id", RequestScope::Auth, vec!["id"]),
        ("@request.body.title", RequestScope::Body, vec!["title"]),
        ("@request.query.page", RequestScope::Query, vec!["page"]),
        ("@request.headers.x_token", RequestScope::Headers, vec!["x_token"]),
        ("@request.auth.profile.name", RequestScope::Auth, vec!["profile", "name"]),
        ("@request.method", RequestScope::Method, vec![]),
        ("@request.context", RequestScope::Context, vec![]),
    ];

    for (name, scope, path) in test_cases {
        let input = format!("{name} = ''");
        let expected = Identifier {
            scope: Scope::Request(scope),
            path: path.into_iter().map(str::to_string).collect(),
            modifier: None,
        };
        assert_eq!(
            parse(&input).unwrap(),
            eq(Expr::Identifier(expected), string("")),
            "Failed for input: {}",
            input
        );
    }
}

#[test]
fn test_collection_identifier() {
    let expected = Identifier {
        scope: Scope::Collection("users".to_string()),
        path: vec!["email".to_string()],
        modifier: None,
    };
    assert_eq!(
        parse("@collection.users.email ?= 'a@b.c'").unwrap(),
        Expr::compare(
            Operator::any_of(BinOp::Equal),
            Expr::Identifier(expected),
            string("a@b.c")
        )
    );
}

#[test]
fn test_macros() {
    for m in Macro::ALL {
        let input = format!("created > @{}", m.name());
        assert_eq!(
            parse(&input).unwrap(),
            Expr::compare(
                Operator::plain(BinOp::GreaterThan),
                field("created"),
                Expr::Literal(Literal::Macro(m))
            ),
            "Failed for input: {}",
            input
        );
    }
}

#[test]
fn test_invalid_special_identifiers() {
    for input in [
        "@request = 1",
        "@request.session.id = 1",
        "@request.body = 1",
        "@request.method.x = 1",
        "@collection.users = 1",
        "@unknown = 1",
        "@now.x = 1",
        "a = @now:lower",
    ] {
        assert!(parse(input).is_err(), "Should fail: {}", input);
    }
}

#[test]
fn test_relation_depth_limit() {
    // six hops past the first segment is the limit
    assert!(parse("a.b.c.d.e.f.g = 1").is_ok());
    let err = parse_err("a.b.c.d.e.f.g.h = 1");
    assert!(err.to_string().contains("relation levels"), "{}", err);
}

#[test]
fn test_custom_depth_limit() {
    let options = ParseOptions {
        max_relation_depth: 1,
        ..Default::default()
    };
    let mut parser = Parser::with_options(Lexer::new("a.b.c = 1"), options).unwrap();
    assert!(parser.parse().is_err());
}

// ============================================================================
// Modifiers
// ============================================================================

#[test]
fn test_modifier_positions() {
    let ok = [
        "@request.body.role:isset = false",
        "@request.query.q:isset = true",
        "@request.headers.x_api:isset = true",
        "tags:length > 2",
        "title:lower = 'draft'",
        "'draft' = title:lower",
        "@request.body.tags:each ~ 'pub'",
    ];
    for input in ok {
        assert!(parse(input).is_ok(), "Should parse: {}", input);
    }

    let rejected = [
        "role:isset = true",
        "@request.auth.id:isset = true",
        "'x' = tags:each",
        "tags:each ?= 'x'",
    ];
    for input in rejected {
        assert!(parse(input).is_err(), "Should fail: {}", input);
    }
}

#[test]
fn test_modifier_recorded() {
    let expr = parse("tags:length > 2").unwrap();
    assert_eq!(
        expr,
        Expr::compare(
            Operator::plain(BinOp::GreaterThan),
            Expr::Identifier(Identifier::field("tags").with_modifier(Modifier::Length)),
            int(2)
        )
    );
}

// ============================================================================
// Empty input and errors
// ============================================================================

#[test]
fn test_empty_inputs_always_true() {
    for input in ["", "   ", "// just a comment", "\n// one\n// two\n"] {
        assert_eq!(parse(input).unwrap(), Expr::AlwaysTrue, "Failed for input: {:?}", input);
    }
}

#[test]
fn test_syntax_errors() {
    let test_cases = vec![
        "status = ",
        "= 'x'",
        "status",
        "status 'x'",
        "a = 1 &&",
        "|| a = 1",
        "(a = 1",
        "a = 1)",
        "()",
        "a = b = c",
        "a = (b = 1)",
        "(a = 1) = 2",
        "a = 1 b = 2",
    ];

    for input in test_cases {
        assert!(parse(input).is_err(), "Should fail: {}", input);
    }
}

#[test]
fn test_dangling_operator_reports_end_of_input() {
    match parse_err("status = ") {
        ParseError::Unexpected { found, position, .. } => {
            assert_eq!(found, "end of input");
            assert_eq!(position.offset, 9);
        }
        other => panic!("Expected Unexpected, got {other:?}"),
    }
}

#[test]
fn test_lex_errors_surface() {
    assert!(matches!(parse_err("a = 'x"), ParseError::Lex(_)));
    assert!(matches!(parse_err("title:upper = 1"), ParseError::Lex(_)));
}

#[test]
fn test_expression_length_limit() {
    let long = format!("a = '{}'", "x".repeat(3500));
    assert!(parse(&long).is_err());

    let options = ParseOptions {
        max_expression_length: 10,
        ..Default::default()
    };
    assert!(Parser::with_options(Lexer::new("views > 100000"), options).is_err());
}

#[test]
fn test_reparse_equal() {
    let input = r#"(a.b ?~ "x" || @request.auth.id != "") && created >= @todayStart"#;
    assert_eq!(parse(input).unwrap(), parse(input).unwrap());
}

#[test]
fn test_logical_op_in_tree() {
    match parse("a = 1 || b = 2").unwrap() {
        Expr::Logical { op, .. } => assert_eq!(op, LogicalOp::Or),
        other => panic!("Expected logical node, got {other:?}"),
    }
}
