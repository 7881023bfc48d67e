//! # RWLZ Compiler Library
//!
//! The compiler front end for RWLZ ("Lizard"), a small C-like language for
//! scripting creature behavior in game mods.
//!
//! ## Compiler Pipeline
//!
//! ```text
//! Source -> Lexer -> Parser -> AST -> Analysis -> Codegen -> LLVM IR text
//! ```
//!
//! ## Quick Start
//!
//! ### Lexing Source Code
//!
//! ```rust
//! use rwlzc::{Lexer, TokenKind};
//!
//! let kinds: Vec<TokenKind> = Lexer::new("int x = 1;").map(|t| t.kind).collect();
//! assert_eq!(kinds.last(), Some(&TokenKind::Eof));
//! ```
//!
//! ### Compiling a Program
//!
//! ```rust
//! use rwlzc::{compile, config::CompilerConfig};
//!
//! let source = r#"
//! int main() {
//!     print("Hello, " + "lizard");
//!     return 0;
//! }
//! "#;
//!
//! let compilation = compile(source, &CompilerConfig::default());
//! assert!(compilation.succeeded());
//! let ir = compilation.module.expect("module").to_string();
//! assert!(ir.contains("define i32 @main()"));
//! ```
//!
//! ### Error Handling
//!
//! Problems in the user's program are collected as diagnostics and never
//! stop a phase early:
//!
//! ```rust
//! use rwlzc::{analyze, config::CompilerConfig};
//!
//! let compilation = analyze("void f() { break; }", &CompilerConfig::default());
//! assert_eq!(compilation.error_count(), 1);
//! assert!(!compilation.succeeded());
//! ```
//!
//! ## Module Overview
//!
//! - [`ast`] - Abstract Syntax Tree types
//! - [`codegen`] - IR model and lowering
//! - [`config`] - `rwlz.toml` settings
//! - [`diagnostics`] - Error reporting infrastructure
//! - [`lexer`] - Tokenization (lexical analysis)
//! - [`parser`] - Parsing (syntax analysis)
//! - [`span`] - Source location tracking
//! - [`toolchain`] - Native compilation of generated IR
//! - [`typeck`] - Type rules, symbol table and semantic analysis

pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod toolchain;
pub mod typeck;

#[cfg(test)]
mod ui_tests;

// Re-export commonly used types
pub use diagnostics::{Diagnostic, DiagnosticEmitter, DiagnosticKind, Diagnostics, ErrorCode};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;
pub use span::Span;

use ast::Program;
use codegen::{CodegenError, Module};
use config::CompilerConfig;
use typeck::SymbolTable;

/// Everything one run of the pipeline produced.
#[derive(Debug, Clone)]
pub struct Compilation {
    /// `None` when lexing or parsing failed.
    pub program: Option<Program>,
    /// `None` when analysis did not run.
    pub symbols: Option<SymbolTable>,
    pub diagnostics: Diagnostics,
    /// Set only when generation ran and finished.
    pub module: Option<Module>,
    /// Set when generation ran and hit a contract violation.
    pub codegen_error: Option<CodegenError>,
    warnings_as_errors: bool,
}

impl Compilation {
    pub fn error_count(&self) -> usize {
        self.diagnostics.error_count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.warning_count()
    }

    /// Whether the front end accepted the program. Warnings count against
    /// it only under `warnings_as_errors`.
    pub fn front_end_succeeded(&self) -> bool {
        self.program.is_some()
            && self.error_count() == 0
            && !(self.warnings_as_errors && self.warning_count() > 0)
    }

    /// Whether every phase that ran finished without a failure.
    pub fn succeeded(&self) -> bool {
        self.front_end_succeeded() && self.codegen_error.is_none()
    }
}

/// Lex, parse and analyze `source`.
pub fn analyze(source: &str, config: &CompilerConfig) -> Compilation {
    let mut compilation = Compilation {
        program: None,
        symbols: None,
        diagnostics: Diagnostics::new(),
        module: None,
        codegen_error: None,
        warnings_as_errors: config.diagnostics.warnings_as_errors,
    };

    let program = match Parser::new(source).parse_program() {
        Ok(program) => program,
        Err(errors) => {
            tracing::debug!(errors = errors.len(), "parse failed");
            compilation.diagnostics.extend(errors);
            return compilation;
        }
    };

    let analysis = typeck::check_program(&program);
    compilation.diagnostics = analysis.diagnostics;
    compilation.symbols = Some(analysis.symbols);
    compilation.program = Some(program);
    compilation
}

/// Run the whole pipeline. Generation runs only when the front end
/// succeeded.
pub fn compile(source: &str, config: &CompilerConfig) -> Compilation {
    let mut compilation = analyze(source, config);
    if !compilation.front_end_succeeded() {
        return compilation;
    }

    if let Some(program) = &compilation.program {
        match codegen::generate(program, &config.codegen) {
            Ok(module) => compilation.module = Some(module),
            Err(error) => {
                tracing::error!(%error, "code generation failed");
                compilation.codegen_error = Some(error);
            }
        }
    }
    compilation
}
