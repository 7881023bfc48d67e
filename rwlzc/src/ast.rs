//! Abstract Syntax Tree for RWLZ.
//!
//! The AST mirrors the surface syntax:
//!
//! - [`Program`] - optional plugin [`Metadata`] and the function list
//! - [`Function`] - a definition tagged with its [`FunctionKind`]
//! - [`Stmt`] / [`StmtKind`] - statements
//! - [`Expr`] / [`ExprKind`] - expressions
//! - [`TypeSpec`] - a declared type spelling
//!
//! Every node carries a [`Span`] set at construction. Its `start_line` is the
//! line the analyzer reports, so nodes are never re-spanned after parsing.
//!
//! # Example
//!
//! ```rust
//! use rwlzc::Parser;
//! use rwlzc::ast::StmtKind;
//!
//! let program = Parser::new("int main() { return 0; }")
//!     .parse_program()
//!     .expect("parse failed");
//!
//! let main = &program.functions[0];
//! assert_eq!(main.name, "main");
//! assert!(matches!(main.body.statements[0].kind, StmtKind::Return(Some(_))));
//! ```

use std::fmt;

use crate::span::Span;
use serde::Serialize;

/// A complete source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub metadata: Option<Metadata>,
    pub functions: Vec<Function>,
    pub span: Span,
}

/// `[BepInPlugin("id", "name", "version")]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub id: String,
    pub name: String,
    pub version: String,
    pub span: Span,
}

/// Which declaration form introduced a function.
///
/// Only [`FunctionKind::Normal`] has behavior of its own; the other kinds are
/// accepted and carried through as a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FunctionKind {
    Normal,
    /// `<base> type name(...)`
    Base,
    /// `<breed> type name(...)`
    Breed,
    /// `hook type name(...)`
    Hook,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FunctionKind::Normal => "normal",
            FunctionKind::Base => "base",
            FunctionKind::Breed => "breed",
            FunctionKind::Hook => "hook",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Function {
    pub kind: FunctionKind,
    pub name: String,
    pub params: Vec<Param>,
    /// `None` when the definition omits the return type (treated as `void`).
    pub return_type: Option<TypeSpec>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeSpec,
    pub span: Span,
}

/// Primitive type names as spelled in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TypeName {
    Int,
    Float,
    Bool,
    Char,
    String,
    Void,
    Auto,
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TypeName::Int => "int",
            TypeName::Float => "float",
            TypeName::Bool => "bool",
            TypeName::Char => "char",
            TypeName::String => "string",
            TypeName::Void => "void",
            TypeName::Auto => "auto",
        })
    }
}

/// A declared type: `int`, `array float`, `const string`.
///
/// This is the spelling only; the analyzer resolves it to a
/// [`ResolvedType`](crate::typeck::ResolvedType).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TypeSpec {
    pub name: TypeName,
    pub is_array: bool,
    pub is_const: bool,
    pub span: Span,
}

impl TypeSpec {
    pub fn new(name: TypeName, span: Span) -> Self {
        Self {
            name,
            is_array: false,
            is_const: false,
            span,
        }
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            f.write_str("const ")?;
        }
        if self.is_array {
            f.write_str("array ")?;
        }
        write!(f, "{}", self.name)
    }
}

/// `{ stmt* }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StmtKind {
    Block(Block),
    /// `type name [= value];` or `const type name = value;`
    VarDecl(VarDecl),
    /// `type name[size];`, `type name[] = [..];`, `type name[size] = [..];`
    ArrayDecl(ArrayDecl),
    Assign(Assignment),
    If {
        condition: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        condition: Expr,
        body: Block,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        update: Option<Box<Stmt>>,
        body: Block,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Print(Expr),
    /// A call whose result is discarded.
    Call(Call),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarDecl {
    pub name: String,
    pub ty: TypeSpec,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayDecl {
    pub name: String,
    /// Element type.
    pub ty: TypeSpec,
    pub size: Option<Expr>,
    pub values: Option<Vec<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub target: Location,
    pub op: AssignOp,
    /// `None` for `++` and `--`.
    pub value: Option<Expr>,
}

/// Something that can be assigned to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Location {
    Var { name: String, span: Span },
    Index { name: String, index: Box<Expr>, span: Span },
}

impl Location {
    pub fn name(&self) -> &str {
        match self {
            Location::Var { name, .. } | Location::Index { name, .. } => name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Location::Var { span, .. } | Location::Index { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    Increment,
    Decrement,
}

impl AssignOp {
    /// The arithmetic operator behind a compound assignment.
    pub fn binary_op(self) -> Option<BinOp> {
        match self {
            AssignOp::AddAssign => Some(BinOp::Add),
            AssignOp::SubAssign => Some(BinOp::Sub),
            AssignOp::MulAssign => Some(BinOp::Mul),
            AssignOp::DivAssign => Some(BinOp::Div),
            AssignOp::Assign | AssignOp::Increment | AssignOp::Decrement => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::Increment => "++",
            AssignOp::Decrement => "--",
        }
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn line(&self) -> u32 {
        self.span.start_line
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    IntLit(i32),
    FloatLit(f64),
    /// Raw contents between the quotes; escapes are decoded during lowering.
    StringLit(String),
    /// Raw contents between the quotes, e.g. `a` or `\n`.
    CharLit(String),
    BoolLit(bool),
    Variable(String),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `++x`, `x++`, `--x`, `x--` used as a value.
    Increment {
        name: String,
        increment: bool,
        prefix: bool,
    },
    Index {
        name: String,
        index: Box<Expr>,
    },
    ArrayLit(Vec<Expr>),
    Call(Call),
    /// `<prop>(e)`, `<base>(e)`, `<breed>(e)`, `<hook>(e)`
    Special {
        form: SpecialForm,
        inner: Box<Expr>,
    },
    /// Placeholder produced during error recovery; never survives a
    /// successful parse.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
        })
    }
}

/// Engine-provided property and override hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SpecialForm {
    Prop,
    Base,
    Breed,
    Hook,
}

impl fmt::Display for SpecialForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SpecialForm::Prop => "<prop>",
            SpecialForm::Base => "<base>",
            SpecialForm::Breed => "<breed>",
            SpecialForm::Hook => "<hook>",
        })
    }
}
