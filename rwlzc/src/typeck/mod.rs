//! Semantic analysis for RWLZ.
//!
//! - [`ty`] - resolved types and the pure compatibility and operator rules
//! - [`scope`] - the arena symbol table
//! - [`check`] - the two-pass analyzer
//! - [`error`] - semantic errors and warnings
//!
//! # Process
//!
//! 1. **Registration** - every function signature enters the global table,
//!    so calls may name functions defined later in the file
//! 2. **Checking** - each body is walked in its own function scope, with a
//!    nested scope per block and per `for` header
//!
//! Analysis never fails fast. The result carries the populated symbol table
//! and every diagnostic found.

pub mod check;
pub mod error;
pub mod scope;
pub mod ty;


pub use check::{check_program, Analysis, Analyzer};
pub use error::{TypeError, TypeErrorKind};
pub use scope::{FunctionSymbol, Scope, ScopeId, ScopeKind, Symbol, SymbolTable};
pub use ty::{BaseType, ResolvedType};
