//! UI Snapshot Tests for Error Messages
//!
//! These tests pin the exact text users see for common mistakes: the code,
//! the line, the message and any help attached to it.
//!
//! Uses `insta` inline snapshots.

use crate::diagnostics::{Diagnostic, DiagnosticEmitter};
use crate::parser::Parser;
use crate::typeck::check_program;

/// Parse and analyze source, collecting diagnostics.
fn get_diagnostics(source: &str) -> Vec<Diagnostic> {
    match Parser::new(source).parse_program() {
        Err(errors) => errors,
        Ok(program) => check_program(&program).diagnostics.into_vec(),
    }
}

/// Format diagnostics as a string for snapshot comparison.
fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return "No errors".to_string();
    }

    diagnostics
        .iter()
        .map(|d| {
            let mut output = d.to_string();
            for s in &d.suggestions {
                output.push_str(&format!("\n  help: {s}"));
            }
            output
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn codes(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics.iter().filter_map(|d| d.code.as_deref()).collect()
}

// ============================================================
// TYPE ERRORS
// ============================================================

#[test]
fn test_ui_mismatch_in_initializer() {
    let source = r#"
int main() {
    int x = "text";
    return x;
}
"#;
    let formatted = format_diagnostics(&get_diagnostics(source));
    insta::assert_snapshot!(formatted, @r###"
    error[E0207] line 3: type mismatch in initialization of `x`: expected `int`, found `string`
      help: strings are never converted to numbers implicitly
    "###);
}

#[test]
fn test_ui_wrong_arity() {
    let source = r#"
int add(int a, int b) { return a + b; }
int main() { return add(1); }
"#;
    let formatted = format_diagnostics(&get_diagnostics(source));
    insta::assert_snapshot!(formatted, @"error[E0213] line 3: function `add` takes 2 argument(s) but 1 were supplied");
}

// ============================================================
// NAME ERRORS
// ============================================================

#[test]
fn test_ui_undefined_variable() {
    let source = r#"
int main() {
    return missing;
}
"#;
    let formatted = format_diagnostics(&get_diagnostics(source));
    insta::assert_snapshot!(formatted, @r###"
    error[E0205] line 3: variable `missing` is not defined
      help: declare `missing` before using it
    "###);
}

// ============================================================
// CONST AND CONTROL FLOW
// ============================================================

#[test]
fn test_ui_const_without_initializer() {
    let source = r#"
void main() {
    const int limit;
}
"#;
    let formatted = format_diagnostics(&get_diagnostics(source));
    insta::assert_snapshot!(formatted, @r###"
    error[E0208] line 3: const `limit` must be initialized
      help: give the const an initial value: `const int x = 0;`
    "###);
}

#[test]
fn test_ui_assign_to_const() {
    let source = r#"
void main() {
    const int x = 1;
    x = 2;
}
"#;
    let formatted = format_diagnostics(&get_diagnostics(source));
    insta::assert_snapshot!(formatted, @"error[E0209] line 4: cannot assign to const `x`");
}

#[test]
fn test_ui_break_outside_loop() {
    let source = r#"
void main() {
    break;
}
"#;
    let formatted = format_diagnostics(&get_diagnostics(source));
    insta::assert_snapshot!(formatted, @"error[E0215] line 3: `break` outside of a loop");
}

// ============================================================
// WARNINGS
// ============================================================

#[test]
fn test_ui_missing_return() {
    let source = r#"
int answer() {
    print(42);
}
"#;
    let formatted = format_diagnostics(&get_diagnostics(source));
    insta::assert_snapshot!(formatted, @r###"
    warning[W0301] line 2: function `answer` declares return type `int` but may not return a value
      help: add a `return` statement with a value
    "###);
}

#[test]
fn test_ui_special_form() {
    let source = "void main() { print(<prop>(1)); }";
    let formatted = format_diagnostics(&get_diagnostics(source));
    insta::assert_snapshot!(formatted, @"warning[W0303] line 1: <prop> expression cannot be type-checked; its type is assumed to be `auto`");
}

#[test]
fn test_ui_clean_program() {
    let source = r#"
int main() {
    int total = 0;
    for (int i = 0; i < 3; i++) {
        total += i;
    }
    print("total: " + total);
    return 0;
}
"#;
    insta::assert_snapshot!(format_diagnostics(&get_diagnostics(source)), @"No errors");
}

// ============================================================
// LEXICAL AND SYNTAX ERRORS
// ============================================================

#[test]
fn test_ui_unterminated_string() {
    let source = "void main() {\n    print(\"oops);\n}\n";
    let diagnostics = get_diagnostics(source);
    assert_eq!(codes(&diagnostics).first(), Some(&"E0003"));
    assert!(diagnostics[0].suggestions[0].contains("closing `\"`"));
}

#[test]
fn test_ui_chained_comparison() {
    let source = "bool f(int a, int b, int c) { return a < b < c; }";
    let diagnostics = get_diagnostics(source);
    assert!(codes(&diagnostics).contains(&"E0102"));
}

// ============================================================
// RENDERING
// ============================================================

#[test]
fn test_ui_ariadne_rendering() {
    let source = "void main() {\n    continue;\n}\n";
    let diagnostics = get_diagnostics(source);
    assert_eq!(diagnostics.len(), 1);

    let rendered = DiagnosticEmitter::new("main.rwlz", source)
        .with_color(false)
        .render(&diagnostics[0]);
    assert!(rendered.contains("[E0216] `continue` outside of a loop"), "{rendered}");
    assert!(rendered.contains("main.rwlz"), "{rendered}");
}

#[test]
fn test_ui_json_rendering() {
    let diagnostics = get_diagnostics("void main() { break; }");
    let json = DiagnosticEmitter::render_json(&diagnostics).unwrap();
    assert!(json.contains("\"kind\": \"error\""), "{json}");
    assert!(json.contains("\"code\": \"E0215\""), "{json}");
}
