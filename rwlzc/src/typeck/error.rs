//! Semantic errors and warnings.

use std::fmt;

use crate::ast::SpecialForm;
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::span::Span;
use crate::typeck::ty::ResolvedType;

/// A semantic problem found by the analyzer.
#[derive(Debug, Clone)]
pub struct TypeError {
    pub kind: TypeErrorKind,
    pub span: Span,
}

impl TypeError {
    pub fn new(kind: TypeErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_warning(&self) -> bool {
        self.kind.code().is_warning()
    }

    /// Convert to a diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = self.kind.code();
        let diagnostic = Diagnostic::with_kind_of(code, self.kind.message(), self.span);
        match &self.kind {
            TypeErrorKind::Mismatch { expected, found, .. }
                if expected.is_integer() && found.is_string() =>
            {
                diagnostic.with_suggestion("strings are never converted to numbers implicitly")
            }
            TypeErrorKind::UndefinedVariable { name } => {
                diagnostic.with_suggestion(format!("declare `{name}` before using it"))
            }
            _ => diagnostic,
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind.message())
    }
}

impl std::error::Error for TypeError {}

/// The kind of semantic problem.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeErrorKind {
    /// A metadata string is empty.
    IncompleteMetadata { field: &'static str },
    DuplicateFunction { name: String },
    DuplicateParameter { name: String, function: String },
    /// Name already defined in the current scope.
    Redefinition { name: String },
    UndefinedVariable { name: String },
    UndefinedFunction { name: String },
    Mismatch {
        context: String,
        expected: ResolvedType,
        found: ResolvedType,
    },
    ConstWithoutInitializer { name: String },
    AssignToConst { name: String },
    NotAnArray { name: String, found: ResolvedType },
    InvalidIndex { found: ResolvedType },
    InvalidArraySize { found: ResolvedType },
    InvalidBinaryOperands {
        op: String,
        left: ResolvedType,
        right: ResolvedType,
    },
    InvalidUnaryOperand { op: String, operand: ResolvedType },
    WrongArity {
        name: String,
        expected: usize,
        found: usize,
    },
    InvalidCondition {
        construct: &'static str,
        found: ResolvedType,
    },
    BreakOutsideLoop,
    ContinueOutsideLoop,
    VoidReturnsValue { function: String },
    MissingReturnValue {
        function: String,
        expected: ResolvedType,
    },
    /// `auto` with nothing to take a type from, e.g. "parameter `x`".
    CannotInfer { subject: String },

    // Warnings
    MissingReturn {
        function: String,
        expected: ResolvedType,
    },
    PossiblyUninitialized { name: String },
    UncheckedSpecialForm { form: SpecialForm },

    /// The analyzer itself failed.
    Internal { message: String },
}

impl TypeErrorKind {
    pub fn code(&self) -> ErrorCode {
        match self {
            TypeErrorKind::IncompleteMetadata { .. } => ErrorCode::IncompleteMetadata,
            TypeErrorKind::DuplicateFunction { .. } => ErrorCode::DuplicateFunction,
            TypeErrorKind::DuplicateParameter { .. } => ErrorCode::DuplicateParameter,
            TypeErrorKind::Redefinition { .. } => ErrorCode::Redefinition,
            TypeErrorKind::UndefinedVariable { .. } => ErrorCode::UndefinedVariable,
            TypeErrorKind::UndefinedFunction { .. } => ErrorCode::UndefinedFunction,
            TypeErrorKind::Mismatch { .. } => ErrorCode::TypeMismatch,
            TypeErrorKind::ConstWithoutInitializer { .. } => ErrorCode::ConstWithoutInitializer,
            TypeErrorKind::AssignToConst { .. } => ErrorCode::AssignToConst,
            TypeErrorKind::NotAnArray { .. } => ErrorCode::NotAnArray,
            TypeErrorKind::InvalidIndex { .. } | TypeErrorKind::InvalidArraySize { .. } => {
                ErrorCode::InvalidIndex
            }
            TypeErrorKind::InvalidBinaryOperands { .. }
            | TypeErrorKind::InvalidUnaryOperand { .. } => ErrorCode::InvalidOperands,
            TypeErrorKind::WrongArity { .. } => ErrorCode::WrongArity,
            TypeErrorKind::InvalidCondition { .. } => ErrorCode::InvalidCondition,
            TypeErrorKind::BreakOutsideLoop => ErrorCode::BreakOutsideLoop,
            TypeErrorKind::ContinueOutsideLoop => ErrorCode::ContinueOutsideLoop,
            TypeErrorKind::VoidReturnsValue { .. } => ErrorCode::VoidReturnsValue,
            TypeErrorKind::MissingReturnValue { .. } => ErrorCode::MissingReturnValue,
            TypeErrorKind::CannotInfer { .. } => ErrorCode::CannotInferType,
            TypeErrorKind::MissingReturn { .. } => ErrorCode::MissingReturn,
            TypeErrorKind::PossiblyUninitialized { .. } => ErrorCode::PossiblyUninitialized,
            TypeErrorKind::UncheckedSpecialForm { .. } => ErrorCode::UncheckedSpecialForm,
            TypeErrorKind::Internal { .. } => ErrorCode::InternalError,
        }
    }

    pub fn message(&self) -> String {
        match self {
            TypeErrorKind::IncompleteMetadata { field } => {
                format!("plugin metadata is incomplete: `{field}` is empty")
            }
            TypeErrorKind::DuplicateFunction { name } => {
                format!("function `{name}` is already defined")
            }
            TypeErrorKind::DuplicateParameter { name, function } => {
                format!("parameter `{name}` is defined more than once in `{function}`")
            }
            TypeErrorKind::Redefinition { name } => {
                format!("`{name}` is already defined in this scope")
            }
            TypeErrorKind::UndefinedVariable { name } => {
                format!("variable `{name}` is not defined")
            }
            TypeErrorKind::UndefinedFunction { name } => {
                format!("function `{name}` is not defined")
            }
            TypeErrorKind::Mismatch {
                context,
                expected,
                found,
            } => format!("type mismatch in {context}: expected `{expected}`, found `{found}`"),
            TypeErrorKind::ConstWithoutInitializer { name } => {
                format!("const `{name}` must be initialized")
            }
            TypeErrorKind::AssignToConst { name } => {
                format!("cannot assign to const `{name}`")
            }
            TypeErrorKind::NotAnArray { name, found } => {
                format!("`{name}` is not an array (it has type `{found}`)")
            }
            TypeErrorKind::InvalidIndex { found } => {
                format!("array index must be `int`, found `{found}`")
            }
            TypeErrorKind::InvalidArraySize { found } => {
                format!("array size must be `int`, found `{found}`")
            }
            TypeErrorKind::InvalidBinaryOperands { op, left, right } => {
                format!("operator `{op}` cannot be applied to `{left}` and `{right}`")
            }
            TypeErrorKind::InvalidUnaryOperand { op, operand } => {
                format!("operator `{op}` cannot be applied to `{operand}`")
            }
            TypeErrorKind::WrongArity {
                name,
                expected,
                found,
            } => format!("function `{name}` takes {expected} argument(s) but {found} were supplied"),
            TypeErrorKind::InvalidCondition { construct, found } => {
                format!("`{construct}` condition must be `bool` or numeric, found `{found}`")
            }
            TypeErrorKind::BreakOutsideLoop => "`break` outside of a loop".to_string(),
            TypeErrorKind::ContinueOutsideLoop => "`continue` outside of a loop".to_string(),
            TypeErrorKind::VoidReturnsValue { function } => {
                format!("void function `{function}` cannot return a value")
            }
            TypeErrorKind::MissingReturnValue { function, expected } => {
                format!("function `{function}` must return a value of type `{expected}`")
            }
            TypeErrorKind::CannotInfer { subject } => {
                format!("cannot infer a type for {subject}")
            }
            TypeErrorKind::MissingReturn { function, expected } => {
                format!("function `{function}` declares return type `{expected}` but may not return a value")
            }
            TypeErrorKind::PossiblyUninitialized { name } => {
                format!("variable `{name}` may not be initialized")
            }
            TypeErrorKind::UncheckedSpecialForm { form } => {
                format!("{form} expression cannot be type-checked; its type is assumed to be `auto`")
            }
            TypeErrorKind::Internal { message } => {
                format!("internal analyzer error: {message}")
            }
        }
    }
}
