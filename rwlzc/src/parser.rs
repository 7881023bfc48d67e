//! Parser for RWLZ.
//!
//! A hand-written recursive descent parser with Pratt parsing for
//! expressions. It is deterministic and single-pass with one token of
//! lookahead beyond the current token.
//!
//! # Parser Architecture
//!
//! - `item` - metadata, function definitions, parameters and types
//! - `stmt` - statements and blocks
//! - `expr` - expressions, with precedence and associativity
//!
//! # Example
//!
//! ```rust
//! use rwlzc::Parser;
//!
//! let source = "int add(int a, int b) { return a + b; }";
//! let program = Parser::new(source).parse_program().expect("parse failed");
//! assert_eq!(program.functions.len(), 1);
//! assert_eq!(program.functions[0].params.len(), 2);
//! ```
//!
//! # Error Recovery
//!
//! On an unexpected token the parser records a syntax diagnostic, abandons
//! the current production and skips to a synchronization point (a `;`, a
//! closing brace or the start of the next definition), so one run reports
//! as many independent mistakes as possible. Any diagnostic, lexical or
//! syntactic, makes [`Parser::parse_program`] return `Err`: no partial tree is
//! ever handed to analysis.

mod expr;
mod item;
mod stmt;

#[cfg(test)]
mod tests;

use crate::ast::*;
use crate::diagnostics::{Diagnostic, ErrorCode, ParseError};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::span::Span;

pub use self::expr::Precedence;

/// The RWLZ parser.
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    source: &'src str,
    /// Current token.
    current: Token,
    /// One-token lookahead.
    next: Token,
    previous: Token,
    errors: Vec<Diagnostic>,
    /// Set after an error until the parser resynchronizes; suppresses
    /// cascading reports.
    panic_mode: bool,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next().unwrap_or(Token::dummy(TokenKind::Eof));
        let next = lexer.next().unwrap_or(current);

        Self {
            lexer,
            source,
            current,
            next,
            previous: Token::dummy(TokenKind::Eof),
            errors: Vec::new(),
            panic_mode: false,
        }
    }

    /// Parse a complete program.
    ///
    /// Returns every lexical and syntax diagnostic, ordered by position, if
    /// anything went wrong.
    #[must_use = "parsing has no effect if the result is not used"]
    pub fn parse_program(&mut self) -> Result<Program, Vec<Diagnostic>> {
        let start = self.current.span;
        let mut metadata = None;
        let mut functions = Vec::new();

        if self.check(TokenKind::LBracket) {
            metadata = self.parse_metadata();
            if metadata.is_none() {
                self.synchronize();
            }
        }

        if self.is_at_end() {
            self.error_expected("function definition");
        }

        while !self.is_at_end() {
            match self.parse_function() {
                Some(function) => functions.push(function),
                None => self.synchronize(),
            }
        }

        let mut diagnostics = self.lexer.take_diagnostics();
        diagnostics.append(&mut self.errors);

        if diagnostics.is_empty() {
            tracing::debug!(functions = functions.len(), "parsed program");
            Ok(Program {
                metadata,
                functions,
                span: start.merge(self.previous.span),
            })
        } else {
            diagnostics.sort_by_key(|d| d.span.start);
            Err(diagnostics)
        }
    }

    /// Parse a single expression followed by end of input.
    #[must_use = "parsing has no effect if the result is not used"]
    pub fn parse_standalone_expr(&mut self) -> Result<Expr, Vec<Diagnostic>> {
        let expr = self.parse_expr();
        if !self.is_at_end() {
            self.error_expected("end of input");
        }

        let mut diagnostics = self.lexer.take_diagnostics();
        diagnostics.append(&mut self.errors);
        if diagnostics.is_empty() {
            Ok(expr)
        } else {
            diagnostics.sort_by_key(|d| d.span.start);
            Err(diagnostics)
        }
    }

    // ============================================================
    // Token handling
    // ============================================================

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn check_next(&self, kind: TokenKind) -> bool {
        self.next.kind == kind
    }

    fn is_at_end(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    /// Advance to the next token, returning the one just consumed.
    fn advance(&mut self) -> Token {
        self.previous = self.current;
        if self.current.kind == TokenKind::Eof {
            return self.previous;
        }
        self.current = self.next;
        self.next = self.lexer.next().unwrap_or(self.current);
        self.previous
    }

    /// Consume a token of the expected kind, or report it missing.
    fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            self.error_expected(kind.description());
            None
        }
    }

    fn try_consume(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn text(&self, span: &Span) -> &'src str {
        &self.source[span.start..span.end]
    }

    /// Consume an identifier and return its text.
    fn expect_ident(&mut self) -> Option<(String, Span)> {
        if self.check(TokenKind::Ident) {
            let token = self.advance();
            Some((self.text(&token.span).to_string(), token.span))
        } else {
            self.error_expected_code("identifier", ErrorCode::ExpectedIdentifier);
            None
        }
    }

    /// Contents of a quoted literal without its delimiters.
    fn unquote(&self, span: &Span) -> String {
        let text = self.text(span);
        text.get(1..text.len().saturating_sub(1))
            .unwrap_or_default()
            .to_string()
    }

    // ============================================================
    // Error handling
    // ============================================================

    fn report(&mut self, error: ParseError) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        tracing::trace!(%error, "syntax error");
        self.errors.push(error.into());
    }

    /// Report a code-specific diagnostic at the current token.
    fn report_with_code(&mut self, error: ParseError, code: ErrorCode) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        let span = error.span();
        self.errors
            .push(Diagnostic::error(error.to_string(), span).with_error_code(code));
    }

    fn error_expected(&mut self, expected: &str) {
        self.error_expected_code(expected, ErrorCode::UnexpectedToken);
    }

    /// "expected X, found Y", or "unexpected end of file" at EOF.
    fn error_expected_code(&mut self, expected: &str, code: ErrorCode) {
        let span = self.current.span;
        if self.is_at_end() {
            self.report(ParseError::UnexpectedEof {
                expected: expected.to_string(),
                span,
            });
            return;
        }
        let found = if self.current.kind.has_text() {
            self.text(&span).to_string()
        } else {
            self.current.kind.description().trim_matches('`').to_string()
        };
        let error = ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found,
            span,
        };
        if code == ErrorCode::UnexpectedToken {
            self.report(error);
        } else {
            self.report_with_code(error, code);
        }
    }

    /// Skip to the start of the next top-level definition.
    fn synchronize(&mut self) {
        self.panic_mode = false;
        while !self.is_at_end() {
            match self.current.kind {
                kind if Self::starts_function(kind) => return,
                TokenKind::LBrace => {
                    self.advance();
                    self.skip_to_closing_brace();
                    continue;
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip a brace-balanced region, consuming the closing `}`.
    fn skip_to_closing_brace(&mut self) {
        let mut depth = 1usize;
        while !self.is_at_end() {
            match self.current.kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip to the end of the current statement.
    fn synchronize_stmt(&mut self) {
        self.panic_mode = false;
        while !self.is_at_end() {
            match self.current.kind {
                TokenKind::Semi => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace => return,
                TokenKind::LBrace => {
                    self.advance();
                    self.skip_to_closing_brace();
                    continue;
                }
                TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Print
                | TokenKind::Const => return,
                kind if kind.is_type_keyword() => return,
                _ => {}
            }
            self.advance();
        }
    }

    fn starts_function(kind: TokenKind) -> bool {
        kind.is_type_keyword()
            || matches!(
                kind,
                TokenKind::BaseMarker | TokenKind::BreedMarker | TokenKind::Hook
            )
    }
}
