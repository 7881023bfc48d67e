//! Diagnostic reporting infrastructure.
//!
//! Scanning, parsing and analysis never throw: they push [`Diagnostic`]s into
//! a per-compilation [`Diagnostics`] collector, and the compilation succeeds
//! iff the collector holds no errors once analysis is done.
//!
//! # Codes
//!
//! - **E0001-E0099**: lexical errors (malformed literals, stray characters)
//! - **E0100-E0199**: syntax errors
//! - **E0200-E0299**: semantic errors
//! - **W0300-W0399**: semantic warnings
//! - **E0900**: internal analyzer failure

use std::fmt;

use crate::span::Span;
use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use serde::Serialize;
use thiserror::Error;

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // ============================================================
    // Lexical errors (E0001-E0099)
    // ============================================================
    UnexpectedCharacter = 1,
    UnclosedBlockComment = 2,
    UnterminatedString = 3,
    InvalidFloat = 4,
    IntegerOutOfRange = 5,
    UnterminatedChar = 6,
    MalformedChar = 7,

    // ============================================================
    // Syntax errors (E0100-E0199)
    // ============================================================
    UnexpectedToken = 100,
    UnexpectedEof = 101,
    ChainedComparison = 102,
    InvalidAssignTarget = 103,
    ExpectedType = 104,
    ExpectedExpression = 105,
    ExpectedIdentifier = 106,

    // ============================================================
    // Semantic errors (E0200-E0299)
    // ============================================================
    IncompleteMetadata = 201,
    DuplicateFunction = 202,
    DuplicateParameter = 203,
    Redefinition = 204,
    UndefinedVariable = 205,
    UndefinedFunction = 206,
    TypeMismatch = 207,
    ConstWithoutInitializer = 208,
    AssignToConst = 209,
    NotAnArray = 210,
    InvalidIndex = 211,
    InvalidOperands = 212,
    WrongArity = 213,
    InvalidCondition = 214,
    BreakOutsideLoop = 215,
    ContinueOutsideLoop = 216,
    VoidReturnsValue = 217,
    MissingReturnValue = 218,
    CannotInferType = 219,

    // ============================================================
    // Semantic warnings (W0300-W0399)
    // ============================================================
    MissingReturn = 301,
    PossiblyUninitialized = 302,
    UncheckedSpecialForm = 303,

    // ============================================================
    // Internal
    // ============================================================
    InternalError = 900,
}

impl ErrorCode {
    /// Whether this code names a warning rather than an error.
    pub fn is_warning(self) -> bool {
        (300..400).contains(&(self as u16))
    }

    /// Formatted code, e.g. `E0004` or `W0301`.
    pub fn as_str(&self) -> String {
        let prefix = if self.is_warning() { 'W' } else { 'E' };
        format!("{}{:04}", prefix, *self as u16)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::UnexpectedCharacter => "unexpected character in source",
            ErrorCode::UnclosedBlockComment => "unclosed block comment",
            ErrorCode::UnterminatedString => "unterminated string literal",
            ErrorCode::InvalidFloat => "invalid floating-point literal",
            ErrorCode::IntegerOutOfRange => "integer literal out of range",
            ErrorCode::UnterminatedChar => "unterminated character literal",
            ErrorCode::MalformedChar => "malformed character literal",
            ErrorCode::UnexpectedToken => "unexpected token",
            ErrorCode::UnexpectedEof => "unexpected end of file",
            ErrorCode::ChainedComparison => "comparison operators cannot be chained",
            ErrorCode::InvalidAssignTarget => "invalid assignment target",
            ErrorCode::ExpectedType => "expected type",
            ErrorCode::ExpectedExpression => "expected expression",
            ErrorCode::ExpectedIdentifier => "expected identifier",
            ErrorCode::IncompleteMetadata => "incomplete plugin metadata",
            ErrorCode::DuplicateFunction => "function defined more than once",
            ErrorCode::DuplicateParameter => "parameter defined more than once",
            ErrorCode::Redefinition => "name already defined in this scope",
            ErrorCode::UndefinedVariable => "use of undefined variable",
            ErrorCode::UndefinedFunction => "call to undefined function",
            ErrorCode::TypeMismatch => "mismatched types",
            ErrorCode::ConstWithoutInitializer => "const declaration without initializer",
            ErrorCode::AssignToConst => "assignment to const",
            ErrorCode::NotAnArray => "indexing a non-array value",
            ErrorCode::InvalidIndex => "array index or size is not an integer",
            ErrorCode::InvalidOperands => "invalid operand types",
            ErrorCode::WrongArity => "wrong number of arguments",
            ErrorCode::InvalidCondition => "condition is neither boolean nor numeric",
            ErrorCode::BreakOutsideLoop => "`break` outside of a loop",
            ErrorCode::ContinueOutsideLoop => "`continue` outside of a loop",
            ErrorCode::VoidReturnsValue => "void function returns a value",
            ErrorCode::MissingReturnValue => "missing return value",
            ErrorCode::CannotInferType => "`auto` type cannot be inferred",
            ErrorCode::MissingReturn => "function may not return a value",
            ErrorCode::PossiblyUninitialized => "variable may not be initialized",
            ErrorCode::UncheckedSpecialForm => "engine expression is not type-checked",
            ErrorCode::InternalError => "internal compiler error",
        }
    }

    pub fn help(&self) -> Option<&'static str> {
        match self {
            ErrorCode::UnclosedBlockComment => Some("add `*/` to close the block comment"),
            ErrorCode::UnterminatedString => Some("add a closing `\"` on the same line"),
            ErrorCode::UnterminatedChar => Some("add a closing `'` to complete the character literal"),
            ErrorCode::MalformedChar => {
                Some("character literals hold exactly one character or one escape sequence")
            }
            ErrorCode::InvalidFloat => Some("remove the leading zeros before the decimal point"),
            ErrorCode::ChainedComparison => Some("split the comparison and join the halves with `&&`"),
            ErrorCode::ConstWithoutInitializer => Some("give the const an initial value: `const int x = 0;`"),
            ErrorCode::MissingReturn => Some("add a `return` statement with a value"),
            ErrorCode::CannotInferType => {
                Some("`auto` takes the type of its initializer; write the type out instead")
            }
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Error,
    Warning,
}

impl DiagnosticKind {
    fn to_report_kind(self) -> ReportKind<'static> {
        match self {
            DiagnosticKind::Error => ReportKind::Error,
            DiagnosticKind::Warning => ReportKind::Warning,
        }
    }

    fn color(self) -> Color {
        match self {
            DiagnosticKind::Error => Color::Red,
            DiagnosticKind::Warning => Color::Yellow,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Error => f.write_str("error"),
            DiagnosticKind::Warning => f.write_str("warning"),
        }
    }
}

/// A compiler diagnostic.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Formatted code (e.g. "E0207").
    pub code: Option<String>,
    pub message: String,
    /// Primary location; a dummy span means "no line".
    pub span: Span,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<DiagnosticLabel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            code: None,
            message: message.into(),
            span,
            labels: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code: None,
            message: message.into(),
            span,
            labels: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Build a diagnostic whose severity follows the code.
    pub fn with_kind_of(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        let diagnostic = if code.is_warning() {
            Self::warning(message, span)
        } else {
            Self::error(message, span)
        };
        diagnostic.with_error_code(code)
    }

    /// Set the code, attaching its help text if it has one.
    pub fn with_error_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code.as_str());
        if let Some(help) = code.help() {
            self.suggestions.push(help.to_string());
        }
        self
    }

    pub fn with_note(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(DiagnosticLabel::secondary(span, message));
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticKind::Error
    }

    /// Source line, if the diagnostic has a location.
    pub fn line(&self) -> Option<u32> {
        (!self.span.is_dummy()).then_some(self.span.start_line)
    }
}

/// Plain one-line rendering: `error[E0207] line 3: mismatched types`.
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(code) = &self.code {
            write!(f, "[{code}]")?;
        }
        if let Some(line) = self.line() {
            write!(f, " line {line}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// A secondary label in a diagnostic.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticLabel {
    pub span: Span,
    pub message: String,
    pub primary: bool,
}

impl DiagnosticLabel {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            primary: true,
        }
    }

    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            primary: false,
        }
    }
}

/// Accumulates the diagnostics of a single compilation.
///
/// Each compilation owns its own collector, so counts never leak between
/// independent runs.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.kind {
            DiagnosticKind::Error => self.errors += 1,
            DiagnosticKind::Warning => self.warnings += 1,
        }
        self.items.push(diagnostic);
    }

    pub fn error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        self.push(Diagnostic::error(message, span).with_error_code(code));
    }

    pub fn warning(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        self.push(Diagnostic::warning(message, span).with_error_code(code));
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        for diagnostic in iter {
            self.push(diagnostic);
        }
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        let mut diagnostics = Diagnostics::new();
        diagnostics.extend(iter);
        diagnostics
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Renders diagnostics against their source text.
pub struct DiagnosticEmitter<'a> {
    filename: &'a str,
    source: &'a str,
    color: bool,
}

impl<'a> DiagnosticEmitter<'a> {
    pub fn new(filename: &'a str, source: &'a str) -> Self {
        Self {
            filename,
            source,
            color: true,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn build_report(&self, diagnostic: &Diagnostic) -> Report<'a, (&'a str, std::ops::Range<usize>)> {
        let range = self.clamp(diagnostic.span);
        let mut builder = Report::build(
            diagnostic.kind.to_report_kind(),
            self.filename,
            range.start,
        )
        .with_config(Config::default().with_color(self.color));

        let message = match &diagnostic.code {
            Some(code) => format!("[{}] {}", code, diagnostic.message),
            None => diagnostic.message.clone(),
        };
        builder = builder.with_message(message);

        builder = builder.with_label(
            Label::new((self.filename, range))
                .with_color(diagnostic.kind.color())
                .with_message(&diagnostic.message),
        );

        for label in &diagnostic.labels {
            let color = if label.primary {
                diagnostic.kind.color()
            } else {
                Color::Blue
            };
            builder = builder.with_label(
                Label::new((self.filename, self.clamp(label.span)))
                    .with_color(color)
                    .with_message(&label.message),
            );
        }

        if !diagnostic.suggestions.is_empty() {
            builder = builder.with_help(diagnostic.suggestions.join("\n"));
        }

        builder.finish()
    }

    fn clamp(&self, span: Span) -> std::ops::Range<usize> {
        let end = span.end.min(self.source.len());
        span.start.min(end)..end
    }

    /// Render a diagnostic to a string.
    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        let mut out = Vec::new();
        let written = self
            .build_report(diagnostic)
            .write((self.filename, Source::from(self.source)), &mut out);
        match written {
            Ok(()) => String::from_utf8_lossy(&out).into_owned(),
            Err(_) => format!("{diagnostic}\n"),
        }
    }

    /// Print a diagnostic to stderr.
    pub fn emit(&self, diagnostic: &Diagnostic) {
        eprint!("{}", self.render(diagnostic));
    }

    pub fn emit_all<'d>(&self, diagnostics: impl IntoIterator<Item = &'d Diagnostic>) {
        for diagnostic in diagnostics {
            self.emit(diagnostic);
        }
    }

    /// Render diagnostics as a JSON array.
    pub fn render_json(diagnostics: &[Diagnostic]) -> serde_json::Result<String> {
        serde_json::to_string_pretty(diagnostics)
    }
}

/// Lexical and syntax errors.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("unexpected character `{text}`")]
    UnexpectedCharacter { text: String, span: Span },

    #[error("unclosed block comment")]
    UnclosedBlockComment { span: Span },

    #[error("unterminated string literal {text}")]
    UnterminatedString { text: String, span: Span },

    #[error("invalid floating-point literal `{text}`")]
    InvalidFloat { text: String, span: Span },

    #[error("integer literal `{text}` does not fit in 32 bits")]
    IntegerOutOfRange { text: String, span: Span },

    #[error("unterminated character literal {text}")]
    UnterminatedChar { text: String, span: Span },

    #[error("malformed character literal {text}")]
    MalformedChar { text: String, span: Span },

    #[error("syntax error at `{found}`: expected {expected}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("unexpected end of file: expected {expected}")]
    UnexpectedEof { expected: String, span: Span },

    #[error("comparison operators cannot be chained")]
    ChainedComparison { span: Span },

    #[error("invalid assignment target")]
    InvalidAssignTarget { span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedCharacter { span, .. }
            | ParseError::UnclosedBlockComment { span }
            | ParseError::UnterminatedString { span, .. }
            | ParseError::InvalidFloat { span, .. }
            | ParseError::IntegerOutOfRange { span, .. }
            | ParseError::UnterminatedChar { span, .. }
            | ParseError::MalformedChar { span, .. }
            | ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedEof { span, .. }
            | ParseError::ChainedComparison { span }
            | ParseError::InvalidAssignTarget { span } => *span,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ParseError::UnexpectedCharacter { .. } => ErrorCode::UnexpectedCharacter,
            ParseError::UnclosedBlockComment { .. } => ErrorCode::UnclosedBlockComment,
            ParseError::UnterminatedString { .. } => ErrorCode::UnterminatedString,
            ParseError::InvalidFloat { .. } => ErrorCode::InvalidFloat,
            ParseError::IntegerOutOfRange { .. } => ErrorCode::IntegerOutOfRange,
            ParseError::UnterminatedChar { .. } => ErrorCode::UnterminatedChar,
            ParseError::MalformedChar { .. } => ErrorCode::MalformedChar,
            ParseError::UnexpectedToken { .. } => ErrorCode::UnexpectedToken,
            ParseError::UnexpectedEof { .. } => ErrorCode::UnexpectedEof,
            ParseError::ChainedComparison { .. } => ErrorCode::ChainedComparison,
            ParseError::InvalidAssignTarget { .. } => ErrorCode::InvalidAssignTarget,
        }
    }
}

impl From<ParseError> for Diagnostic {
    fn from(error: ParseError) -> Self {
        Diagnostic::error(error.to_string(), error.span()).with_error_code(error.code())
    }
}
