//! Lexical analysis for RWLZ.
//!
//! Tokenizes source text with a logos-generated DFA. Multi-character
//! operators win over their single-character prefixes and float literals win
//! over integers through longest-match, so the order of the variants below is
//! cosmetic.
//!
//! Language markers (`BepInPlugin`, `<base>`, `<breed>`, `<prop>`, `<hook>`)
//! are case-sensitive; general keywords match in any ASCII case.
//!
//! Malformed literals are never handed to the parser. The [`Lexer`] wrapper
//! turns each one into a diagnostic and skips it, so a program containing
//! one can never parse successfully.
//!
//! # Example
//!
//! ```rust
//! use rwlzc::{Lexer, TokenKind};
//!
//! let kinds: Vec<_> = Lexer::new("int x = 42;").map(|t| t.kind).collect();
//! assert_eq!(kinds, vec![
//!     TokenKind::Int,
//!     TokenKind::Ident,
//!     TokenKind::Assign,
//!     TokenKind::IntLit,
//!     TokenKind::Semi,
//!     TokenKind::Eof,
//! ]);
//! ```

use crate::diagnostics::{Diagnostic, ParseError};
use crate::span::{LineIndex, Span};
use logos::Logos;

/// Token kinds for the RWLZ lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    // ============================================================
    // Markers (case-sensitive)
    // ============================================================
    #[token("BepInPlugin")]
    BepInPlugin,
    #[token("<base>")]
    BaseMarker,
    #[token("<breed>")]
    BreedMarker,
    #[token("<prop>")]
    PropMarker,
    #[token("<hook>")]
    HookMarker,

    // ============================================================
    // Keywords (ASCII case-insensitive)
    // ============================================================
    #[token("if", ignore(ascii_case))]
    If,
    #[token("else", ignore(ascii_case))]
    Else,
    #[token("while", ignore(ascii_case))]
    While,
    #[token("for", ignore(ascii_case))]
    For,
    #[token("break", ignore(ascii_case))]
    Break,
    #[token("continue", ignore(ascii_case))]
    Continue,
    #[token("return", ignore(ascii_case))]
    Return,
    #[token("print", ignore(ascii_case))]
    Print,
    #[token("const", ignore(ascii_case))]
    Const,
    #[token("true", ignore(ascii_case))]
    True,
    #[token("false", ignore(ascii_case))]
    False,
    #[token("hook", ignore(ascii_case))]
    Hook,

    // Type keywords
    #[token("int", ignore(ascii_case))]
    Int,
    #[token("float", ignore(ascii_case))]
    Float,
    #[token("bool", ignore(ascii_case))]
    Bool,
    #[token("char", ignore(ascii_case))]
    Char,
    #[token("string", ignore(ascii_case))]
    String,
    #[token("void", ignore(ascii_case))]
    Void,
    #[token("auto", ignore(ascii_case))]
    Auto,
    #[token("array", ignore(ascii_case))]
    Array,

    // ============================================================
    // Literals
    // ============================================================
    #[regex(r"0|[1-9][0-9]*")]
    IntLit,

    #[regex(r"(0|[1-9][0-9]*)\.[0-9]+([eE][+-]?[0-9]+)?")]
    FloatLit,

    /// Float with a leading-zero integer part, e.g. `00.5` (error token).
    #[regex(r"0[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?")]
    InvalidFloat,

    #[regex(r#""([^"\\\n]|\\[^\n])*""#)]
    StringLit,

    /// String with no closing quote before the end of the line (error token).
    #[regex(r#""([^"\\\n]|\\[^\n])*"#)]
    UnterminatedString,

    #[regex(r"'([^'\\\n]|\\[^\n])'")]
    CharLit,

    /// `''` or a literal holding more than one character (error token).
    #[regex(r"'(([^'\\\n]|\\[^\n])([^'\\\n]|\\[^\n])+)?'")]
    MalformedChar,

    /// Char literal with no closing quote before the end of the line (error token).
    #[regex(r"'([^'\\\n]|\\[^\n])")]
    #[token("'")]
    UnterminatedChar,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    // ============================================================
    // Operators
    // ============================================================
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Not,

    // ============================================================
    // Punctuation
    // ============================================================
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,

    // ============================================================
    // Comments
    // ============================================================
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    /// Block comment running to end of input (error token).
    UnclosedBlockComment,

    // ============================================================
    // Special
    // ============================================================
    /// End of input, appended once by [`Lexer`].
    Eof,

    /// Character no rule matches (error token).
    Error,
}

/// Skip a `/* ... */` comment, or emit an error token if it never closes.
fn block_comment(lexer: &mut logos::Lexer<TokenKind>) -> logos::Filter<TokenKind> {
    let remainder = lexer.remainder();
    match remainder.find("*/") {
        Some(end) => {
            lexer.bump(end + 2);
            logos::Filter::Skip
        }
        None => {
            lexer.bump(remainder.len());
            logos::Filter::Emit(TokenKind::UnclosedBlockComment)
        }
    }
}

impl TokenKind {
    /// Whether this kind stands for malformed input rather than a real token.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            TokenKind::InvalidFloat
                | TokenKind::UnterminatedString
                | TokenKind::MalformedChar
                | TokenKind::UnterminatedChar
                | TokenKind::UnclosedBlockComment
                | TokenKind::Error
        )
    }

    /// Whether the token's source text is worth showing next to its kind.
    pub fn has_text(&self) -> bool {
        matches!(
            self,
            TokenKind::IntLit
                | TokenKind::FloatLit
                | TokenKind::StringLit
                | TokenKind::CharLit
                | TokenKind::Ident
        )
    }

    /// Whether this token starts a type spelling (`const` excluded).
    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Int
                | TokenKind::Float
                | TokenKind::Bool
                | TokenKind::Char
                | TokenKind::String
                | TokenKind::Void
                | TokenKind::Auto
                | TokenKind::Array
        )
    }

    /// Human-readable description used in syntax errors.
    pub fn description(&self) -> &'static str {
        match self {
            TokenKind::BepInPlugin => "`BepInPlugin`",
            TokenKind::BaseMarker => "`<base>`",
            TokenKind::BreedMarker => "`<breed>`",
            TokenKind::PropMarker => "`<prop>`",
            TokenKind::HookMarker => "`<hook>`",
            TokenKind::If => "`if`",
            TokenKind::Else => "`else`",
            TokenKind::While => "`while`",
            TokenKind::For => "`for`",
            TokenKind::Break => "`break`",
            TokenKind::Continue => "`continue`",
            TokenKind::Return => "`return`",
            TokenKind::Print => "`print`",
            TokenKind::Const => "`const`",
            TokenKind::True => "`true`",
            TokenKind::False => "`false`",
            TokenKind::Hook => "`hook`",
            TokenKind::Int => "`int`",
            TokenKind::Float => "`float`",
            TokenKind::Bool => "`bool`",
            TokenKind::Char => "`char`",
            TokenKind::String => "`string`",
            TokenKind::Void => "`void`",
            TokenKind::Auto => "`auto`",
            TokenKind::Array => "`array`",
            TokenKind::IntLit => "integer literal",
            TokenKind::FloatLit => "float literal",
            TokenKind::InvalidFloat => "invalid float literal",
            TokenKind::StringLit => "string literal",
            TokenKind::UnterminatedString => "unterminated string",
            TokenKind::CharLit => "character literal",
            TokenKind::MalformedChar => "malformed character literal",
            TokenKind::UnterminatedChar => "unterminated character literal",
            TokenKind::Ident => "identifier",
            TokenKind::EqEq => "`==`",
            TokenKind::NotEq => "`!=`",
            TokenKind::LtEq => "`<=`",
            TokenKind::GtEq => "`>=`",
            TokenKind::Lt => "`<`",
            TokenKind::Gt => "`>`",
            TokenKind::PlusEq => "`+=`",
            TokenKind::MinusEq => "`-=`",
            TokenKind::StarEq => "`*=`",
            TokenKind::SlashEq => "`/=`",
            TokenKind::PlusPlus => "`++`",
            TokenKind::MinusMinus => "`--`",
            TokenKind::Assign => "`=`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::AndAnd => "`&&`",
            TokenKind::OrOr => "`||`",
            TokenKind::Not => "`!`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::Colon => "`:`",
            TokenKind::Semi => "`;`",
            TokenKind::Comma => "`,`",
            TokenKind::LineComment | TokenKind::BlockComment => "comment",
            TokenKind::UnclosedBlockComment => "unclosed block comment",
            TokenKind::Eof => "end of file",
            TokenKind::Error => "unknown character",
        }
    }
}

/// A token with its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn dummy(kind: TokenKind) -> Self {
        Self {
            kind,
            span: Span::dummy(),
        }
    }

    pub fn line(&self) -> u32 {
        self.span.start_line
    }
}

/// The lexer for RWLZ source.
///
/// Yields only well-formed tokens followed by a single [`TokenKind::Eof`].
/// Malformed input is recorded and can be collected with
/// [`Lexer::take_diagnostics`].
#[derive(Clone)]
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, TokenKind>,
    source: &'src str,
    line_index: LineIndex,
    diagnostics: Vec<Diagnostic>,
    finished: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            source,
            line_index: LineIndex::new(source),
            diagnostics: Vec::new(),
            finished: false,
        }
    }

    /// Source text covered by a span.
    pub fn slice(&self, span: &Span) -> &'src str {
        &self.source[span.start..span.end]
    }

    /// Whether any lexical error has been seen so far.
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Drain the lexical diagnostics collected so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn span_of(&self, range: logos::Span) -> Span {
        let (line, col) = self.line_index.line_col(range.start);
        Span::new(range.start, range.end, line, col)
    }

    fn malformed(&self, kind: TokenKind, span: Span) -> ParseError {
        let text = self.slice(&span).to_string();
        match kind {
            TokenKind::InvalidFloat => ParseError::InvalidFloat { text, span },
            TokenKind::UnterminatedString => ParseError::UnterminatedString { text, span },
            TokenKind::MalformedChar => ParseError::MalformedChar { text, span },
            TokenKind::UnterminatedChar => ParseError::UnterminatedChar { text, span },
            TokenKind::UnclosedBlockComment => ParseError::UnclosedBlockComment { span },
            TokenKind::IntLit => ParseError::IntegerOutOfRange { text, span },
            _ => ParseError::UnexpectedCharacter { text, span },
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            match self.inner.next() {
                Some(Ok(kind)) => {
                    let span = self.span_of(self.inner.span());
                    // `2147483648` is kept for `-2147483648`; the parser
                    // rejects it anywhere else.
                    let out_of_range = kind == TokenKind::IntLit
                        && self
                            .slice(&span)
                            .parse::<u32>()
                            .map_or(true, |v| v > i32::MIN.unsigned_abs());
                    if kind.is_error() || out_of_range {
                        let error = self.malformed(kind, span);
                        tracing::debug!(line = span.start_line, %error, "lexical error");
                        self.diagnostics.push(error.into());
                        continue;
                    }
                    return Some(Token::new(kind, span));
                }
                Some(Err(())) => {
                    let span = self.span_of(self.inner.span());
                    let error = self.malformed(TokenKind::Error, span);
                    self.diagnostics.push(error.into());
                }
                None => {
                    self.finished = true;
                    let end = self.source.len();
                    let (line, col) = self.line_index.line_col(end);
                    return Some(Token::new(TokenKind::Eof, Span::new(end, end, line, col)));
                }
            }
        }
    }
}
