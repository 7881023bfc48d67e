//! Code generation for RWLZ.
//!
//! This module lowers an analyzed AST to textual LLVM IR.
//!
//! # Architecture
//!
//! ```text
//! AST -> CodeGenerator -> ir::Module -> .ll text -> clang -> executable
//! ```
//!
//! The generator handles:
//! - Type lowering (source types to IR types)
//! - Stack storage for locals and arrays
//! - Control flow with labelled basic blocks
//! - Strings via the C library (see [`runtime`])
//!
//! Lowering expects a program the analyzer accepted. It reports malformed
//! input as a [`CodegenError`] rather than a diagnostic.

pub mod error;
pub mod ir;
pub mod lower;
pub mod runtime;

pub use error::CodegenError;
pub use ir::Module;
pub use lower::CodeGenerator;

use crate::ast::Program;
use crate::config::CodegenConfig;

/// Lower a program to an IR module.
pub fn generate(program: &Program, config: &CodegenConfig) -> Result<Module, CodegenError> {
    CodeGenerator::new(config).generate(program)
}

/// Lower a program to LLVM IR text.
pub fn compile_to_ir(program: &Program, config: &CodegenConfig) -> Result<String, CodegenError> {
    Ok(generate(program, config)?.to_string())
}
