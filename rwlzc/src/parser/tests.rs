//! Parser tests.
//!
//! Expression shapes are checked through a compact prefix rendering with
//! inline insta snapshots; program structure is checked directly.

use super::*;
use proptest::prelude::*;

/// Helper to parse a complete program.
fn parse_program(source: &str) -> Result<Program, Vec<Diagnostic>> {
    Parser::new(source).parse_program()
}

/// Helper to parse a standalone expression.
fn parse_expr(source: &str) -> Result<Expr, Vec<Diagnostic>> {
    Parser::new(source).parse_standalone_expr()
}

/// Diagnostic codes of a failed parse, in source order.
fn error_codes(source: &str) -> Vec<String> {
    match parse_program(source) {
        Ok(_) => Vec::new(),
        Err(errors) => errors.into_iter().filter_map(|d| d.code).collect(),
    }
}

/// Prefix rendering of an expression tree: `(+ 1 (* 2 3))`.
fn sexpr(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::IntLit(v) => v.to_string(),
        ExprKind::FloatLit(v) => format!("{v:?}"),
        ExprKind::StringLit(s) => format!("{s:?}"),
        ExprKind::CharLit(c) => format!("'{c}'"),
        ExprKind::BoolLit(b) => b.to_string(),
        ExprKind::Variable(name) => name.clone(),
        ExprKind::Binary { op, left, right } => {
            format!("({op} {} {})", sexpr(left), sexpr(right))
        }
        ExprKind::Unary { op, operand } => format!("({op} {})", sexpr(operand)),
        ExprKind::Increment {
            name,
            increment,
            prefix,
        } => {
            let op = if *increment { "++" } else { "--" };
            if *prefix {
                format!("(pre{op} {name})")
            } else {
                format!("(post{op} {name})")
            }
        }
        ExprKind::Index { name, index } => format!("{name}[{}]", sexpr(index)),
        ExprKind::ArrayLit(items) => {
            let items: Vec<_> = items.iter().map(sexpr).collect();
            format!("[{}]", items.join(" "))
        }
        ExprKind::Call(call) => {
            let args: Vec<_> = call.args.iter().map(sexpr).collect();
            format!("(call {} {})", call.name, args.join(" ")).replace(" )", ")")
        }
        ExprKind::Special { form, inner } => format!("({form} {})", sexpr(inner)),
        ExprKind::Error => "<error>".to_string(),
    }
}

fn expr_shape(source: &str) -> String {
    match parse_expr(source) {
        Ok(expr) => sexpr(&expr),
        Err(errors) => {
            let codes: Vec<_> = errors.into_iter().filter_map(|d| d.code).collect();
            format!("ERROR {}", codes.join(","))
        }
    }
}

fn first_body(source: &str) -> Vec<Stmt> {
    let program = parse_program(source).expect("parse failed");
    program.functions[0].body.statements.clone()
}

// ============================================================
// Expression Tests
// ============================================================

#[test]
fn test_arithmetic_precedence() {
    insta::assert_snapshot!(expr_shape("1 + 2 * 3"), @"(+ 1 (* 2 3))");
    insta::assert_snapshot!(expr_shape("(1 + 2) * 3"), @"(* (+ 1 2) 3)");
    insta::assert_snapshot!(expr_shape("a - b - c"), @"(- (- a b) c)");
    insta::assert_snapshot!(expr_shape("a / b % c"), @"(% (/ a b) c)");
}

#[test]
fn test_logical_precedence() {
    insta::assert_snapshot!(expr_shape("a || b && c"), @"(|| a (&& b c))");
    insta::assert_snapshot!(expr_shape("a < b && c >= d"), @"(&& (< a b) (>= c d))");
    insta::assert_snapshot!(expr_shape("a == b || c != d"), @"(|| (== a b) (!= c d))");
}

#[test]
fn test_not_binds_looser_than_comparison() {
    insta::assert_snapshot!(expr_shape("!a == b"), @"(! (== a b))");
    insta::assert_snapshot!(expr_shape("!a && b"), @"(&& (! a) b)");
    insta::assert_snapshot!(expr_shape("!!done"), @"(! (! done))");
}

#[test]
fn test_unary_minus_binds_tightest() {
    insta::assert_snapshot!(expr_shape("-a * b"), @"(* (- a) b)");
    insta::assert_snapshot!(expr_shape("+x - -y"), @"(- (+ x) (- y))");
}

#[test]
fn test_int_min_literal() {
    insta::assert_snapshot!(expr_shape("-2147483648"), @"-2147483648");
    insta::assert_snapshot!(expr_shape("-2147483648 + 1"), @"(+ -2147483648 1)");
    insta::assert_snapshot!(expr_shape("-2147483647"), @"(- 2147483647)");
    insta::assert_snapshot!(expr_shape("2147483648"), @"ERROR E0005");
    insta::assert_snapshot!(expr_shape("1 - 2147483648"), @"ERROR E0005");
}

#[test]
fn test_chained_comparison_rejected() {
    insta::assert_snapshot!(expr_shape("a < b < c"), @"ERROR E0102");
    insta::assert_snapshot!(expr_shape("a == b == c"), @"ERROR E0102");
    insta::assert_snapshot!(expr_shape("(a < b) == c"), @"(== (< a b) c)");
}

#[test]
fn test_literals() {
    insta::assert_snapshot!(expr_shape("42"), @"42");
    insta::assert_snapshot!(expr_shape("3.5"), @"3.5");
    insta::assert_snapshot!(expr_shape(r#""hi""#), @r#""hi""#);
    insta::assert_snapshot!(expr_shape("'x'"), @"'x'");
    insta::assert_snapshot!(expr_shape("TRUE"), @"true");
}

#[test]
fn test_postfix_forms() {
    insta::assert_snapshot!(expr_shape("f(1, x + 2)"), @"(call f 1 (+ x 2))");
    insta::assert_snapshot!(expr_shape("f()"), @"(call f)");
    insta::assert_snapshot!(expr_shape("xs[i + 1]"), @"xs[(+ i 1)]");
    insta::assert_snapshot!(expr_shape("i++ + ++j"), @"(+ (post++ i) (pre++ j))");
    insta::assert_snapshot!(expr_shape("--k"), @"(pre-- k)");
}

#[test]
fn test_array_literals() {
    insta::assert_snapshot!(expr_shape("[1, 2, 3]"), @"[1 2 3]");
    insta::assert_snapshot!(expr_shape("[]"), @"[]");
}

#[test]
fn test_special_forms() {
    insta::assert_snapshot!(expr_shape("<prop>(speed)"), @"(<prop> speed)");
    insta::assert_snapshot!(expr_shape("<base>(x) + <breed>(y)"), @"(+ (<base> x) (<breed> y))");
    insta::assert_snapshot!(expr_shape("<hook>(1)"), @"(<hook> 1)");
}

#[test]
fn test_missing_operand() {
    insta::assert_snapshot!(expr_shape("1 +"), @"ERROR E0101");
    insta::assert_snapshot!(expr_shape("* 2"), @"ERROR E0105");
}

// ============================================================
// Program Structure Tests
// ============================================================

#[test]
fn test_minimal_program() {
    let program = parse_program("int main() { return 0; }").expect("parse failed");
    assert!(program.metadata.is_none());
    assert_eq!(program.functions.len(), 1);

    let main = &program.functions[0];
    assert_eq!(main.kind, FunctionKind::Normal);
    assert_eq!(main.return_type.map(|t| t.name), Some(TypeName::Int));
    assert!(main.params.is_empty());
    assert_eq!(main.body.statements.len(), 1);
}

#[test]
fn test_metadata() {
    let source = r#"[BepInPlugin("com.example.lizard", "Lizard", "1.0.0")]
        void init() { }"#;
    let program = parse_program(source).expect("parse failed");
    let metadata = program.metadata.expect("metadata");
    assert_eq!(metadata.id, "com.example.lizard");
    assert_eq!(metadata.name, "Lizard");
    assert_eq!(metadata.version, "1.0.0");
}

#[test]
fn test_metadata_keyword_is_case_sensitive() {
    let codes = error_codes(r#"[bepinplugin("a", "b", "c")] void f() { }"#);
    assert_eq!(codes.first().map(String::as_str), Some("E0100"));
}

#[test]
fn test_function_kinds() {
    let source = "
        <base> void a() { }
        <breed> int b() { return 1; }
        hook void c() { }
        void d() { }
    ";
    let program = parse_program(source).expect("parse failed");
    let kinds: Vec<_> = program.functions.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![
            FunctionKind::Base,
            FunctionKind::Breed,
            FunctionKind::Hook,
            FunctionKind::Normal,
        ]
    );
}

#[test]
fn test_omitted_return_type() {
    let program = parse_program("main() { print(1); }").expect("parse failed");
    assert!(program.functions[0].return_type.is_none());
}

#[test]
fn test_params() {
    let source = "float f(const int a, array float xs, string s, int ys[]) { return 0.0; }";
    let program = parse_program(source).expect("parse failed");
    let params = &program.functions[0].params;
    assert_eq!(params.len(), 4);
    assert!(params[0].ty.is_const);
    assert_eq!(params[0].ty.name, TypeName::Int);
    assert!(params[1].ty.is_array);
    assert_eq!(params[1].ty.name, TypeName::Float);
    assert!(!params[2].ty.is_array);
    assert!(params[3].ty.is_array);
    assert_eq!(params[3].name, "ys");
}

#[test]
fn test_keywords_any_case_in_programs() {
    assert!(parse_program("INT Main() { RETURN 0; }").is_ok());
}

// ============================================================
// Statement Tests
// ============================================================

#[test]
fn test_declarations() {
    let body = first_body(
        "void f() {
            int a;
            float b = 1.5;
            const string c = \"x\";
            int xs[10];
            int ys[] = [1, 2];
            char zs[2] = ['a', 'b'];
        }",
    );
    assert_eq!(body.len(), 6);

    assert!(matches!(&body[0].kind, StmtKind::VarDecl(d) if d.value.is_none()));
    assert!(matches!(&body[1].kind, StmtKind::VarDecl(d) if d.ty.name == TypeName::Float));
    assert!(matches!(&body[2].kind, StmtKind::VarDecl(d) if d.ty.is_const));
    assert!(matches!(
        &body[3].kind,
        StmtKind::ArrayDecl(d) if d.size.is_some() && d.values.is_none()
    ));
    assert!(matches!(
        &body[4].kind,
        StmtKind::ArrayDecl(d) if d.size.is_none() && d.values.as_ref().map(Vec::len) == Some(2)
    ));
    assert!(matches!(
        &body[5].kind,
        StmtKind::ArrayDecl(d) if d.size.is_some() && d.values.is_some()
    ));
}

#[test]
fn test_unsized_array_requires_initializer() {
    assert_eq!(error_codes("void f() { int xs[]; }"), vec!["E0100"]);
}

#[test]
fn test_assignments() {
    let body = first_body(
        "void f() {
            x = 1;
            x += 2;
            x -= 3;
            x *= 4;
            x /= 5;
            x++;
            x--;
            ++x;
            --x;
            xs[0] = 1;
            xs[i] += 2;
            xs[1]++;
        }",
    );
    let ops: Vec<_> = body
        .iter()
        .map(|s| match &s.kind {
            StmtKind::Assign(a) => a.op,
            other => panic!("expected assignment, got {other:?}"),
        })
        .collect();
    assert_eq!(
        ops,
        vec![
            AssignOp::Assign,
            AssignOp::AddAssign,
            AssignOp::SubAssign,
            AssignOp::MulAssign,
            AssignOp::DivAssign,
            AssignOp::Increment,
            AssignOp::Decrement,
            AssignOp::Increment,
            AssignOp::Decrement,
            AssignOp::Assign,
            AssignOp::AddAssign,
            AssignOp::Increment,
        ]
    );
    assert!(matches!(
        &body[9].kind,
        StmtKind::Assign(Assignment { target: Location::Index { .. }, .. })
    ));
}

#[test]
fn test_control_flow() {
    let body = first_body(
        "void f() {
            if (a) { } else { }
            while (b) { break; continue; }
            for (int i = 0; i < 10; i++) { }
            for (;;) { }
            return;
        }",
    );
    assert!(matches!(&body[0].kind, StmtKind::If { else_block: Some(_), .. }));
    assert!(matches!(&body[1].kind, StmtKind::While { body, .. } if body.statements.len() == 2));
    assert!(matches!(
        &body[2].kind,
        StmtKind::For { init: Some(_), condition: Some(_), update: Some(_), .. }
    ));
    assert!(matches!(
        &body[3].kind,
        StmtKind::For { init: None, condition: None, update: None, .. }
    ));
    assert!(matches!(&body[4].kind, StmtKind::Return(None)));
}

#[test]
fn test_call_and_print_statements() {
    let body = first_body("void f() { g(1, 2); print(\"hi\"); { h(); } }");
    assert!(matches!(&body[0].kind, StmtKind::Call(c) if c.name == "g" && c.args.len() == 2));
    assert!(matches!(&body[1].kind, StmtKind::Print(_)));
    assert!(matches!(&body[2].kind, StmtKind::Block(b) if b.statements.len() == 1));
}

#[test]
fn test_lines_are_recorded() {
    let body = first_body("void f() {\n  int a = 1;\n\n  a = 2;\n}");
    assert_eq!(body[0].span.line(), 2);
    assert_eq!(body[1].span.line(), 4);
}

// ============================================================
// Error Tests
// ============================================================

#[test]
fn test_empty_program_is_rejected() {
    assert_eq!(error_codes(""), vec!["E0101"]);
    assert_eq!(error_codes("// only a comment"), vec!["E0101"]);
}

#[test]
fn test_missing_semicolon() {
    let errors = parse_program("int main() {\n  int x = 1\n  return x;\n}").unwrap_err();
    assert_eq!(errors[0].code.as_deref(), Some("E0100"));
    assert_eq!(errors[0].line(), Some(3));
}

#[test]
fn test_unexpected_eof() {
    assert_eq!(error_codes("int main() { return 0;"), vec!["E0101"]);
}

#[test]
fn test_invalid_assignment_target() {
    assert_eq!(error_codes("void f() { 5 = x; }"), vec!["E0103"]);
}

#[test]
fn test_expected_type_and_identifier() {
    assert_eq!(error_codes("foo bar() { }"), vec!["E0104"]);
    assert_eq!(error_codes("int () { }"), vec!["E0106"]);
}

#[test]
fn test_recovery_reports_independent_errors() {
    let source = "
        void f() {
            int = 1;
            x = ;
            while y { z = 1; }
            print(1);
        }
        int g( { }
        void h() { return; }
    ";
    let codes = error_codes(source);
    assert!(codes.len() >= 3, "got {codes:?}");
}

#[test]
fn test_lexical_errors_block_the_tree() {
    // The stray character is withheld, so the remaining tokens are well formed.
    let errors = parse_program("int main() { @ return 0; }").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code.as_deref(), Some("E0001"));

    let errors = parse_program("int main() { float x = 00.5; return 0; }").unwrap_err();
    assert_eq!(errors[0].code.as_deref(), Some("E0004"));
}

#[test]
fn test_errors_sorted_by_position() {
    let errors = parse_program("int main() {\n  x = ;\n  string s = \"open;\n}").unwrap_err();
    let lines: Vec<_> = errors.iter().filter_map(|d| d.line()).collect();
    let mut sorted = lines.clone();
    sorted.sort_unstable();
    assert_eq!(lines, sorted);
}

// ============================================================
// Property Tests
// ============================================================

fn arb_ident() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "count", "speed", "xs"]).prop_map(String::from)
}

fn arb_expr() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (0i32..1000).prop_map(|n| n.to_string()),
        arb_ident(),
        Just("true".to_string()),
        Just("'c'".to_string()),
        Just("\"s\"".to_string()),
    ];
    leaf.prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (inner.clone(), prop::sample::select(vec!["+", "-", "*", "/", "&&", "||"]), inner.clone())
                .prop_map(|(l, op, r)| format!("{l} {op} {r}")),
            inner.clone().prop_map(|e| format!("({e})")),
            inner.clone().prop_map(|e| format!("-({e})")),
            (arb_ident(), inner.clone()).prop_map(|(f, e)| format!("{f}({e})")),
            (arb_ident(), inner).prop_map(|(a, e)| format!("{a}[{e}]")),
        ]
    })
}

proptest! {
    #[test]
    fn prop_generated_expressions_parse(expr in arb_expr()) {
        prop_assert!(parse_expr(&expr).is_ok(), "failed on {}", expr);
    }

    #[test]
    fn prop_generated_declarations_parse(
        ty in prop::sample::select(vec!["int", "float", "bool", "char", "string", "auto"]),
        name in arb_ident(),
        value in arb_expr(),
    ) {
        let source = format!("void f() {{ {ty} {name} = {value}; }}");
        prop_assert!(parse_program(&source).is_ok(), "failed on {}", source);
    }

    #[test]
    fn prop_parser_never_panics(source in "[ -~\n]{0,80}") {
        let _ = parse_program(&source);
    }

    #[test]
    fn prop_parser_never_panics_on_token_soup(
        tokens in prop::collection::vec(
            prop::sample::select(vec![
                "int", "x", "(", ")", "{", "}", "[", "]", ";", "=", "+", "<", "if",
                "while", "for", "return", "1", "\"s\"", ",", "<prop>", "++", "!",
            ]),
            0..40,
        )
    ) {
        let _ = parse_program(&tokens.join(" "));
    }
}
