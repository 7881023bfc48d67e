//! Control-flow structure of generated IR.
//!
//! These tests feed parsed programs straight to the generator, so they also
//! cover inputs that analysis would normally reject.

use std::collections::HashSet;

use rwlzc::codegen::ir::{BlockId, Function, Instr, Module, Terminator};
use rwlzc::codegen::{generate, CodegenError};
use rwlzc::config::CodegenConfig;
use rwlzc::Parser;

const LIZARD: &str = include_str!("../demos/lizard.rwlz");

fn lower(source: &str) -> Result<Module, CodegenError> {
    let program = Parser::new(source)
        .parse_program()
        .expect("test source should parse");
    generate(&program, &CodegenConfig::default())
}

fn lower_ok(source: &str) -> Module {
    lower(source).unwrap_or_else(|e| panic!("generation failed: {e}"))
}

fn block_id(function: &Function, label: &str) -> BlockId {
    let index = function
        .blocks
        .iter()
        .position(|b| b.label == label)
        .unwrap_or_else(|| panic!("no block `{label}` in `{}`", function.name));
    BlockId(index as u32)
}

/// Structural checks every generated function must pass.
fn assert_well_formed(function: &Function) {
    let mut labels = HashSet::new();
    for block in &function.blocks {
        assert!(labels.insert(&block.label), "duplicate label `{}`", block.label);
        assert!(
            block.is_terminated(),
            "block `{}` in `{}` has no terminator",
            block.label,
            function.name
        );
        for target in block.successors() {
            assert!(target.index() < function.blocks.len());
        }
    }

    for block in &function.blocks[1..] {
        assert!(
            !block.instrs.iter().any(|i| matches!(i, Instr::Alloca { .. })),
            "alloca outside the entry block of `{}`",
            function.name
        );
    }
}

#[test]
fn test_if_else_with_returns() {
    let module = lower_ok("int main() { if (1) { return 1; } else { return 0; } }");
    let main = module.function("main").unwrap();
    assert_well_formed(main);

    let then_block = main.block_named("if.then").unwrap();
    let else_block = main.block_named("if.else").unwrap();
    assert!(then_block.terminator.as_ref().unwrap().is_return());
    assert!(else_block.terminator.as_ref().unwrap().is_return());

    // Still emitted, with nothing branching to it.
    let merge = block_id(main, "if.merge");
    assert!(main.predecessors(merge).is_empty());
}

#[test]
fn test_break_targets_innermost_loop() {
    let source = r#"
void main() {
    while (true) {
        while (true) {
            break;
        }
        break;
    }
}
"#;
    let module = lower_ok(source);
    let main = module.function("main").unwrap();
    assert_well_formed(main);

    let inner_body = main.block_named("while.body.1").unwrap();
    let inner_end = block_id(main, "while.end.1");
    assert_eq!(inner_body.terminator, Some(Terminator::Br(inner_end)));

    // The outer break is emitted in the inner loop's exit block.
    let after_inner = main.block_named("while.end.1").unwrap();
    let outer_end = block_id(main, "while.end");
    assert_eq!(after_inner.terminator, Some(Terminator::Br(outer_end)));
}

#[test]
fn test_for_without_condition_loops_until_break() {
    let module = lower_ok("void main() { for (;;) { break; } }");
    let main = module.function("main").unwrap();
    assert_well_formed(main);

    let cond = main.block_named("for.cond").unwrap();
    assert_eq!(cond.terminator, Some(Terminator::Br(block_id(main, "for.body"))));
}

#[test]
fn test_shadowed_variables_get_their_own_slots() {
    let module = lower_ok(r#"void main() { int x = 1; { string x = "a"; print(x); } print(x); }"#);
    let main = module.function("main").unwrap();
    let text = main.to_string();
    assert!(text.contains("%x = alloca i32"), "{text}");
    assert!(text.contains("%x.1 = alloca i8*"), "{text}");
}

#[test]
fn test_demo_program_is_well_formed() {
    let module = lower_ok(LIZARD);
    assert_eq!(module.functions.len(), 6);
    for function in &module.functions {
        assert_well_formed(function);
    }
}

#[test]
fn test_undefined_function_is_fatal() {
    let err = lower("int main() { return ghost(2); }").unwrap_err();
    assert_eq!(
        err,
        CodegenError::UndeclaredFunction {
            name: "ghost".to_string()
        }
    );
}

#[test]
fn test_undefined_variable_is_fatal() {
    let err = lower("int main() { return ghost; }").unwrap_err();
    assert!(matches!(err, CodegenError::UndeclaredVariable { .. }));
}

#[test]
fn test_special_form_is_fatal() {
    let err = lower("void main() { print(<prop>(1)); }").unwrap_err();
    assert_eq!(err, CodegenError::unsupported("a <prop> expression"));
}

#[test]
fn test_continue_outside_loop_is_fatal() {
    let err = lower("void main() { continue; }").unwrap_err();
    assert_eq!(err, CodegenError::NoEnclosingLoop { keyword: "continue" });
}
