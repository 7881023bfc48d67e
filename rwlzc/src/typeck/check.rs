//! The semantic analyzer.
//!
//! Analysis walks the tree twice. The first pass registers every function
//! signature in the global scope so calls may precede definitions; the
//! second checks each body against the symbol table and the type rules.
//!
//! Problems never stop the walk. Each one becomes a diagnostic and the
//! offending expression gets the `error` type, which every rule accepts, so
//! one mistake is reported once.

use std::panic::{self, AssertUnwindSafe};

use crate::ast::*;
use crate::diagnostics::Diagnostics;
use crate::span::Span;
use crate::typeck::error::{TypeError, TypeErrorKind};
use crate::typeck::scope::{FunctionSymbol, ScopeKind, Symbol, SymbolTable};
use crate::typeck::ty::{self, ResolvedType};

/// Result of analyzing one program.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub symbols: SymbolTable,
    pub diagnostics: Diagnostics,
}

impl Analysis {
    pub fn error_count(&self) -> usize {
        self.diagnostics.error_count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.warning_count()
    }

    /// Whether the program may go on to code generation.
    pub fn succeeded(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

/// Analyze a parsed program.
///
/// A panic inside the walk is caught and reported as a single internal
/// error; diagnostics found before it are kept.
pub fn check_program(program: &Program) -> Analysis {
    let mut analyzer = Analyzer::new();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| analyzer.check_program(program)));
    if let Err(payload) = outcome {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        analyzer.report(TypeErrorKind::Internal { message }, Span::dummy());
    }

    analyzer.finish()
}

/// The enclosing function while its body is checked.
#[derive(Debug, Clone)]
struct FunctionContext {
    name: String,
    return_type: ResolvedType,
}

/// Walks a program, filling the symbol table and collecting diagnostics.
pub struct Analyzer {
    symbols: SymbolTable,
    diagnostics: Diagnostics,
    function: Option<FunctionContext>,
    in_loop: bool,
    /// Whether a `return` with a value was seen in the current function.
    return_found: bool,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            diagnostics: Diagnostics::new(),
            function: None,
            in_loop: false,
            return_found: false,
        }
    }

    pub fn finish(self) -> Analysis {
        tracing::debug!(
            errors = self.diagnostics.error_count(),
            warnings = self.diagnostics.warning_count(),
            scopes = self.symbols.scope_count(),
            "analysis finished"
        );
        Analysis {
            symbols: self.symbols,
            diagnostics: self.diagnostics,
        }
    }

    fn report(&mut self, kind: TypeErrorKind, span: Span) {
        let error = TypeError::new(kind, span);
        tracing::trace!(line = span.start_line, %error, "semantic diagnostic");
        self.diagnostics.push(error.to_diagnostic());
    }

    fn mismatch(&mut self, context: String, expected: ResolvedType, found: ResolvedType, span: Span) {
        self.report(
            TypeErrorKind::Mismatch {
                context,
                expected,
                found,
            },
            span,
        );
    }

    fn enter_scope(&mut self, kind: ScopeKind, name: &str) {
        self.symbols.enter_scope(kind, name);
    }

    fn exit_scope(&mut self) {
        if let Err(error) = self.symbols.exit_scope() {
            self.report(
                TypeErrorKind::Internal {
                    message: error.to_string(),
                },
                Span::dummy(),
            );
        }
    }

    // ============================================================
    // Program and functions
    // ============================================================

    pub fn check_program(&mut self, program: &Program) {
        if let Some(metadata) = &program.metadata {
            self.check_metadata(metadata);
        }

        for function in &program.functions {
            self.declare_function(function);
        }

        for function in &program.functions {
            self.check_function(function);
        }
    }

    fn check_metadata(&mut self, metadata: &Metadata) {
        let fields = [
            ("id", &metadata.id),
            ("name", &metadata.name),
            ("version", &metadata.version),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, value)| value.is_empty()) {
            self.report(TypeErrorKind::IncompleteMetadata { field: *field }, metadata.span);
        }
    }

    fn return_type_of(function: &Function) -> ResolvedType {
        function
            .return_type
            .as_ref()
            .map_or(ResolvedType::VOID, ResolvedType::from_spec)
    }

    /// First pass: register the signature.
    fn declare_function(&mut self, function: &Function) {
        let symbol = FunctionSymbol {
            name: function.name.clone(),
            param_types: function
                .params
                .iter()
                .map(|p| ResolvedType::from_spec(&p.ty))
                .collect(),
            param_names: function.params.iter().map(|p| p.name.clone()).collect(),
            return_type: Self::return_type_of(function),
            kind: function.kind,
            is_builtin: false,
            is_used: false,
            line: function.span.line(),
        };

        if self.symbols.define_function(symbol) {
            tracing::trace!(name = %function.name, kind = %function.kind, "registered function");
        } else {
            self.report(
                TypeErrorKind::DuplicateFunction {
                    name: function.name.clone(),
                },
                function.span,
            );
        }
    }

    /// Second pass: check the body.
    fn check_function(&mut self, function: &Function) {
        let return_type = Self::return_type_of(function);
        let previous = self.function.replace(FunctionContext {
            name: function.name.clone(),
            return_type,
        });
        self.return_found = false;

        self.enter_scope(ScopeKind::Function, &function.name);

        if function
            .return_type
            .as_ref()
            .is_some_and(|spec| spec.name == TypeName::Auto)
        {
            self.report(
                TypeErrorKind::CannotInfer {
                    subject: format!("the return type of `{}`", function.name),
                },
                function.span,
            );
        }

        for param in &function.params {
            if param.ty.name == TypeName::Auto {
                self.report(
                    TypeErrorKind::CannotInfer {
                        subject: format!("parameter `{}`", param.name),
                    },
                    param.span,
                );
            }
            let ty = ResolvedType::from_spec(&param.ty);
            if !self
                .symbols
                .define(Symbol::parameter(&param.name, ty, param.span.line()))
            {
                self.report(
                    TypeErrorKind::DuplicateParameter {
                        name: param.name.clone(),
                        function: function.name.clone(),
                    },
                    param.span,
                );
            }
        }

        self.check_block(&function.body);

        if !return_type.is_void() && !self.return_found {
            self.report(
                TypeErrorKind::MissingReturn {
                    function: function.name.clone(),
                    expected: return_type,
                },
                function.span,
            );
        }

        self.exit_scope();
        self.function = previous;
    }

    // ============================================================
    // Statements
    // ============================================================

    fn check_block(&mut self, block: &Block) {
        self.enter_scope(ScopeKind::Block, "block");
        for stmt in &block.statements {
            self.check_stmt(stmt);
        }
        self.exit_scope();
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.check_block(block),
            StmtKind::VarDecl(decl) => self.check_var_decl(decl, stmt.span),
            StmtKind::ArrayDecl(decl) => self.check_array_decl(decl, stmt.span),
            StmtKind::Assign(assignment) => self.check_assignment(assignment, stmt.span),
            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => {
                self.check_condition(condition, "if");
                self.check_block(then_block);
                if let Some(else_block) = else_block {
                    self.check_block(else_block);
                }
            }
            StmtKind::While { condition, body } => {
                self.check_condition(condition, "while");
                self.check_loop_body(body);
            }
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                self.enter_scope(ScopeKind::Loop, "for");
                if let Some(init) = init {
                    self.check_stmt(init);
                }
                if let Some(condition) = condition {
                    self.check_condition(condition, "for");
                }
                if let Some(update) = update {
                    self.check_stmt(update);
                }
                self.check_loop_body(body);
                self.exit_scope();
            }
            StmtKind::Break => {
                if !self.in_loop {
                    self.report(TypeErrorKind::BreakOutsideLoop, stmt.span);
                }
            }
            StmtKind::Continue => {
                if !self.in_loop {
                    self.report(TypeErrorKind::ContinueOutsideLoop, stmt.span);
                }
            }
            StmtKind::Return(value) => self.check_return(value.as_ref(), stmt.span),
            StmtKind::Print(value) => {
                let ty = self.check_expr(value);
                if ty.is_void() || ty.is_array {
                    self.mismatch("`print` argument".to_string(), ResolvedType::STRING, ty, value.span);
                }
            }
            StmtKind::Call(call) => {
                self.check_call(call);
            }
        }
    }

    fn check_loop_body(&mut self, body: &Block) {
        let outer = std::mem::replace(&mut self.in_loop, true);
        self.check_block(body);
        self.in_loop = outer;
    }

    fn check_condition(&mut self, condition: &Expr, construct: &'static str) {
        let ty = self.check_expr(condition);
        if !ty.is_truthy() && !ty.is_permissive() {
            self.report(TypeErrorKind::InvalidCondition { construct, found: ty }, condition.span);
        }
    }

    fn check_var_decl(&mut self, decl: &VarDecl, span: Span) {
        let mut ty = ResolvedType::from_spec(&decl.ty);
        let is_auto = decl.ty.name == TypeName::Auto;

        if self.symbols.lookup(&decl.name, true).is_some() {
            self.report(
                TypeErrorKind::Redefinition {
                    name: decl.name.clone(),
                },
                span,
            );
            return;
        }

        if let Some(value) = &decl.value {
            let value_ty = self.check_expr(value);
            if !ty::is_compatible(ty, value_ty) {
                self.mismatch(format!("initialization of `{}`", decl.name), ty, value_ty, value.span);
            }
            if is_auto && !decl.ty.is_array {
                ty = self
                    .infer_auto(&decl.name, value_ty, value.span)
                    .with_const(ty.is_const);
            }
        }

        if is_auto && (decl.value.is_none() || decl.ty.is_array) {
            self.report(
                TypeErrorKind::CannotInfer {
                    subject: format!("`{}`", decl.name),
                },
                span,
            );
        } else if decl.value.is_none() && ty.is_const {
            self.report(
                TypeErrorKind::ConstWithoutInitializer {
                    name: decl.name.clone(),
                },
                span,
            );
        }

        let mut symbol = Symbol::variable(&decl.name, ty, span.line());
        // An uninitialized const was already reported; reads of it stay quiet.
        symbol.is_initialized = decl.value.is_some() || ty.is_const;
        self.symbols.define(symbol);
    }

    fn check_array_decl(&mut self, decl: &ArrayDecl, span: Span) {
        let mut element = ResolvedType::scalar(decl.ty.name.into());
        let is_auto = decl.ty.name == TypeName::Auto;

        if self.symbols.lookup(&decl.name, true).is_some() {
            self.report(
                TypeErrorKind::Redefinition {
                    name: decl.name.clone(),
                },
                span,
            );
            return;
        }

        if let Some(size) = &decl.size {
            let size_ty = self.check_expr(size);
            if !size_ty.is_integer() && !size_ty.is_permissive() {
                self.report(TypeErrorKind::InvalidArraySize { found: size_ty }, size.span);
            }
        }

        match &decl.values {
            Some(values) if is_auto && values.is_empty() => {
                self.report(
                    TypeErrorKind::CannotInfer {
                        subject: format!("the elements of `{}`", decl.name),
                    },
                    span,
                );
            }
            Some(values) => {
                for (i, value) in values.iter().enumerate() {
                    let value_ty = self.check_expr(value);
                    // The first element fixes the type of an `auto` array.
                    if i == 0 && is_auto {
                        element = self.infer_auto(&decl.name, value_ty, value.span);
                    }
                    if !ty::is_compatible(element, value_ty) {
                        self.mismatch(
                            format!("element {} of `{}`", i + 1, decl.name),
                            element,
                            value_ty,
                            value.span,
                        );
                    }
                }
            }
            None if decl.ty.is_const => {
                self.report(
                    TypeErrorKind::ConstWithoutInitializer {
                        name: decl.name.clone(),
                    },
                    span,
                );
            }
            None if is_auto => {
                self.report(
                    TypeErrorKind::CannotInfer {
                        subject: format!("the elements of `{}`", decl.name),
                    },
                    span,
                );
            }
            None => {}
        }

        let array_ty = element.array_of().with_const(decl.ty.is_const);
        let mut symbol = Symbol::variable(&decl.name, array_ty, span.line());
        symbol.is_initialized = decl.values.is_some() || decl.ty.is_const;
        self.symbols.define(symbol);
    }

    /// The type an `auto` declaration takes from its initializer.
    fn infer_auto(&mut self, name: &str, value_ty: ResolvedType, span: Span) -> ResolvedType {
        if value_ty.is_array {
            self.report(
                TypeErrorKind::CannotInfer {
                    subject: format!("`{name}` from an array value"),
                },
                span,
            );
            return ResolvedType::ERROR;
        }
        ResolvedType::scalar(value_ty.base)
    }

    fn check_assignment(&mut self, assignment: &Assignment, span: Span) {
        let name = assignment.target.name();

        let Some(symbol) = self.symbols.lookup_mut(name) else {
            self.report(
                TypeErrorKind::UndefinedVariable {
                    name: name.to_string(),
                },
                assignment.target.span(),
            );
            if let Some(value) = &assignment.value {
                self.check_expr(value);
            }
            return;
        };
        symbol.is_used = true;
        let symbol_ty = symbol.ty;
        let is_const = symbol.is_const;

        let target_ty = match &assignment.target {
            Location::Var { .. } => symbol_ty,
            Location::Index { index, span, .. } => {
                self.check_index(index);
                if !symbol_ty.is_array && !symbol_ty.is_permissive() {
                    self.report(
                        TypeErrorKind::NotAnArray {
                            name: name.to_string(),
                            found: symbol_ty,
                        },
                        *span,
                    );
                    return;
                }
                symbol_ty.element().unwrap_or(symbol_ty)
            }
        };

        if is_const {
            self.report(
                TypeErrorKind::AssignToConst {
                    name: name.to_string(),
                },
                span,
            );
            return;
        }

        match (assignment.op, &assignment.value) {
            (AssignOp::Increment | AssignOp::Decrement, _) => {
                if !ty::supports_increment(target_ty) && !target_ty.is_permissive() {
                    self.report(
                        TypeErrorKind::InvalidUnaryOperand {
                            op: assignment.op.to_string(),
                            operand: target_ty,
                        },
                        span,
                    );
                }
            }
            (op, Some(value)) => {
                let value_ty = self.check_expr(value);
                match op.binary_op() {
                    Some(bin) if !value_ty.is_permissive() && !target_ty.is_permissive() => {
                        match ty::arithmetic_result(bin, target_ty, value_ty) {
                            None => self.report(
                                TypeErrorKind::InvalidBinaryOperands {
                                    op: op.to_string(),
                                    left: target_ty,
                                    right: value_ty,
                                },
                                span,
                            ),
                            Some(result) if !ty::is_compatible(target_ty, result) => self.mismatch(
                                format!("compound assignment to `{name}`"),
                                target_ty,
                                result,
                                value.span,
                            ),
                            Some(_) => {}
                        }
                    }
                    Some(_) => {}
                    None => {
                        if !ty::is_compatible(target_ty, value_ty) {
                            self.mismatch(format!("assignment to `{name}`"), target_ty, value_ty, value.span);
                        }
                    }
                }
            }
            (_, None) => {}
        }

        if let Some(symbol) = self.symbols.lookup_mut(name) {
            symbol.is_initialized = true;
        }
    }

    fn check_return(&mut self, value: Option<&Expr>, span: Span) {
        let Some(function) = self.function.clone() else {
            self.report(
                TypeErrorKind::Internal {
                    message: "`return` outside of a function".to_string(),
                },
                span,
            );
            return;
        };

        match value {
            Some(value) => {
                self.return_found = true;
                let value_ty = self.check_expr(value);
                if function.return_type.is_void() {
                    self.report(
                        TypeErrorKind::VoidReturnsValue {
                            function: function.name,
                        },
                        span,
                    );
                } else if !ty::is_compatible(function.return_type, value_ty) {
                    self.mismatch(
                        format!("return value of `{}`", function.name),
                        function.return_type,
                        value_ty,
                        value.span,
                    );
                }
            }
            None if !function.return_type.is_void() => {
                self.report(
                    TypeErrorKind::MissingReturnValue {
                        function: function.name,
                        expected: function.return_type,
                    },
                    span,
                );
            }
            None => {}
        }
    }

    // ============================================================
    // Expressions
    // ============================================================

    /// Type of an expression; `error` if it is invalid.
    fn check_expr(&mut self, expr: &Expr) -> ResolvedType {
        match &expr.kind {
            ExprKind::IntLit(_) => ResolvedType::INT,
            ExprKind::FloatLit(_) => ResolvedType::FLOAT,
            ExprKind::StringLit(_) => ResolvedType::STRING,
            ExprKind::CharLit(_) => ResolvedType::CHAR,
            ExprKind::BoolLit(_) => ResolvedType::BOOL,
            ExprKind::Variable(name) => self.check_variable(name, expr.span),
            ExprKind::Binary { op, left, right } => {
                let left_ty = self.check_expr(left);
                let right_ty = self.check_expr(right);
                self.check_binary(*op, left_ty, right_ty, expr.span)
            }
            ExprKind::Unary { op, operand } => {
                let operand_ty = self.check_expr(operand);
                if operand_ty.is_error() {
                    return ResolvedType::ERROR;
                }
                if operand_ty.is_permissive() {
                    return if *op == UnaryOp::Not {
                        ResolvedType::BOOL
                    } else {
                        ResolvedType::AUTO
                    };
                }
                match ty::unary_result(*op, operand_ty) {
                    Some(result) => result,
                    None => {
                        self.report(
                            TypeErrorKind::InvalidUnaryOperand {
                                op: op.to_string(),
                                operand: operand_ty,
                            },
                            expr.span,
                        );
                        ResolvedType::ERROR
                    }
                }
            }
            ExprKind::Increment {
                name, increment, ..
            } => self.check_increment(name, *increment, expr.span),
            ExprKind::Index { name, index } => {
                self.check_index(index);
                let Some(symbol) = self.symbols.lookup_mut(name) else {
                    self.report(
                        TypeErrorKind::UndefinedVariable { name: name.clone() },
                        expr.span,
                    );
                    return ResolvedType::ERROR;
                };
                symbol.is_used = true;
                let symbol_ty = symbol.ty;
                if symbol_ty.is_permissive() {
                    return ResolvedType::scalar(symbol_ty.base);
                }
                match symbol_ty.element() {
                    Some(element) => element,
                    None => {
                        self.report(
                            TypeErrorKind::NotAnArray {
                                name: name.clone(),
                                found: symbol_ty,
                            },
                            expr.span,
                        );
                        ResolvedType::ERROR
                    }
                }
            }
            ExprKind::ArrayLit(elements) => {
                let Some((first, rest)) = elements.split_first() else {
                    return ResolvedType::ERROR;
                };
                let first_ty = self.check_expr(first);
                for (i, element) in rest.iter().enumerate() {
                    let element_ty = self.check_expr(element);
                    if !ty::is_compatible(first_ty, element_ty) {
                        self.mismatch(
                            format!("array element {}", i + 2),
                            first_ty,
                            element_ty,
                            element.span,
                        );
                    }
                }
                ResolvedType::scalar(first_ty.base).array_of()
            }
            ExprKind::Call(call) => self.check_call(call),
            ExprKind::Special { form, inner } => {
                self.check_expr(inner);
                self.report(TypeErrorKind::UncheckedSpecialForm { form: *form }, expr.span);
                ResolvedType::AUTO
            }
            ExprKind::Error => ResolvedType::ERROR,
        }
    }

    fn check_variable(&mut self, name: &str, span: Span) -> ResolvedType {
        let Some(symbol) = self.symbols.lookup_mut(name) else {
            self.report(
                TypeErrorKind::UndefinedVariable {
                    name: name.to_string(),
                },
                span,
            );
            return ResolvedType::ERROR;
        };

        symbol.is_used = true;
        let ty = symbol.ty;
        if !symbol.is_initialized {
            self.report(
                TypeErrorKind::PossiblyUninitialized {
                    name: name.to_string(),
                },
                span,
            );
        }
        ty
    }

    fn check_binary(
        &mut self,
        op: BinOp,
        left: ResolvedType,
        right: ResolvedType,
        span: Span,
    ) -> ResolvedType {
        if left.is_error() || right.is_error() {
            return ResolvedType::ERROR;
        }
        if left.is_permissive() || right.is_permissive() {
            return if op.is_arithmetic() {
                ResolvedType::AUTO
            } else {
                ResolvedType::BOOL
            };
        }

        match ty::binary_result(op, left, right) {
            Some(result) => result,
            None => {
                self.report(
                    TypeErrorKind::InvalidBinaryOperands {
                        op: op.to_string(),
                        left,
                        right,
                    },
                    span,
                );
                ResolvedType::ERROR
            }
        }
    }

    fn check_increment(&mut self, name: &str, increment: bool, span: Span) -> ResolvedType {
        let Some(symbol) = self.symbols.lookup_mut(name) else {
            self.report(
                TypeErrorKind::UndefinedVariable {
                    name: name.to_string(),
                },
                span,
            );
            return ResolvedType::ERROR;
        };

        symbol.is_used = true;
        let ty = symbol.ty;
        if symbol.is_const {
            self.report(
                TypeErrorKind::AssignToConst {
                    name: name.to_string(),
                },
                span,
            );
        }
        if ty.is_permissive() {
            return ty;
        }
        if !ty::supports_increment(ty) {
            let op = if increment { "++" } else { "--" };
            self.report(
                TypeErrorKind::InvalidUnaryOperand {
                    op: op.to_string(),
                    operand: ty,
                },
                span,
            );
            return ResolvedType::ERROR;
        }
        ty.with_const(false)
    }

    fn check_index(&mut self, index: &Expr) {
        let index_ty = self.check_expr(index);
        if !index_ty.is_integer() && !index_ty.is_permissive() {
            self.report(TypeErrorKind::InvalidIndex { found: index_ty }, index.span);
        }
    }

    fn check_call(&mut self, call: &Call) -> ResolvedType {
        let Some(function) = self.symbols.lookup_function_mut(&call.name) else {
            self.report(
                TypeErrorKind::UndefinedFunction {
                    name: call.name.clone(),
                },
                call.span,
            );
            for arg in &call.args {
                self.check_expr(arg);
            }
            return ResolvedType::ERROR;
        };

        function.is_used = true;
        let return_type = function.return_type;
        let param_types = function.param_types.clone();

        if call.args.len() != param_types.len() {
            self.report(
                TypeErrorKind::WrongArity {
                    name: call.name.clone(),
                    expected: param_types.len(),
                    found: call.args.len(),
                },
                call.span,
            );
            for arg in &call.args {
                self.check_expr(arg);
            }
            return return_type;
        }

        for (i, (arg, expected)) in call.args.iter().zip(param_types).enumerate() {
            let arg_ty = self.check_expr(arg);
            if !ty::is_compatible(expected, arg_ty) {
                self.mismatch(
                    format!("argument {} of `{}`", i + 1, call.name),
                    expected,
                    arg_ty,
                    arg.span,
                );
            }
        }
        return_type
    }
}
