//! Generation failures.
//!
//! Every variant means the generator was handed a tree that analysis should
//! have rejected, or one that uses a construct with no lowering. None of them
//! are user diagnostics.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    #[error("variable `{name}` has no storage in function `{function}`")]
    UndeclaredVariable { name: String, function: String },

    #[error("function `{name}` was not declared")]
    UndeclaredFunction { name: String },

    #[error("function `{name}` expects {expected} argument(s) but {found} were provided")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("array `{name}` needs a positive constant size")]
    UnsupportedArraySize { name: String },

    #[error("`{name}` is not an array")]
    NotAnArray { name: String },

    #[error("`{keyword}` outside of a loop")]
    NoEnclosingLoop { keyword: &'static str },

    #[error("{what} cannot be compiled")]
    Unsupported { what: String },

    #[error("block `{block}` in function `{function}` has no terminator")]
    UnterminatedBlock { function: String, block: String },
}

impl CodegenError {
    pub fn unsupported(what: impl Into<String>) -> Self {
        CodegenError::Unsupported { what: what.into() }
    }
}
