//! Expression parsing using Pratt parsing.

use super::*;

/// Operator precedence levels (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None = 0,
    Or = 1,         // ||
    And = 2,        // &&
    Not = 3,        // ! (prefix)
    Comparison = 4, // == != < > <= >=
    Term = 5,       // + -
    Factor = 6,     // * / %
    Unary = 7,      // - + (prefix)
    Postfix = 8,    // () [] ++ --
}

impl Precedence {
    /// Get the next higher precedence level.
    fn next(self) -> Self {
        match self {
            Precedence::None => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Not,
            Precedence::Not => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Postfix,
            Precedence::Postfix => Precedence::Postfix,
        }
    }
}

/// Get the precedence of a binary operator.
fn binary_precedence(kind: TokenKind) -> Option<Precedence> {
    match kind {
        TokenKind::OrOr => Some(Precedence::Or),
        TokenKind::AndAnd => Some(Precedence::And),
        TokenKind::EqEq
        | TokenKind::NotEq
        | TokenKind::Lt
        | TokenKind::Gt
        | TokenKind::LtEq
        | TokenKind::GtEq => Some(Precedence::Comparison),
        TokenKind::Plus | TokenKind::Minus => Some(Precedence::Term),
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some(Precedence::Factor),
        _ => None,
    }
}

/// Convert token to binary operator.
fn token_to_binop(kind: TokenKind) -> Option<BinOp> {
    match kind {
        TokenKind::Plus => Some(BinOp::Add),
        TokenKind::Minus => Some(BinOp::Sub),
        TokenKind::Star => Some(BinOp::Mul),
        TokenKind::Slash => Some(BinOp::Div),
        TokenKind::Percent => Some(BinOp::Rem),
        TokenKind::EqEq => Some(BinOp::Eq),
        TokenKind::NotEq => Some(BinOp::Ne),
        TokenKind::Lt => Some(BinOp::Lt),
        TokenKind::LtEq => Some(BinOp::Le),
        TokenKind::Gt => Some(BinOp::Gt),
        TokenKind::GtEq => Some(BinOp::Ge),
        TokenKind::AndAnd => Some(BinOp::And),
        TokenKind::OrOr => Some(BinOp::Or),
        _ => None,
    }
}

fn special_form(kind: TokenKind) -> Option<SpecialForm> {
    match kind {
        TokenKind::PropMarker => Some(SpecialForm::Prop),
        TokenKind::BaseMarker => Some(SpecialForm::Base),
        TokenKind::BreedMarker => Some(SpecialForm::Breed),
        TokenKind::HookMarker => Some(SpecialForm::Hook),
        _ => None,
    }
}

impl<'src> Parser<'src> {
    /// Parse an expression.
    pub(super) fn parse_expr(&mut self) -> Expr {
        self.parse_expr_prec(Precedence::None)
    }

    /// Parse an expression with at least the given precedence.
    fn parse_expr_prec(&mut self, min_prec: Precedence) -> Expr {
        let mut left = self.parse_prefix_expr();

        while let Some(prec) = binary_precedence(self.current.kind) {
            if prec < min_prec {
                break;
            }

            let op_token = self.advance();
            let Some(op) = token_to_binop(op_token.kind) else {
                break;
            };

            // All binary operators are left-associative.
            let right = self.parse_expr_prec(prec.next());
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );

            // Comparisons are non-associative: `a < b < c` is rejected.
            if prec == Precedence::Comparison
                && binary_precedence(self.current.kind) == Some(Precedence::Comparison)
            {
                let span = self.current.span;
                self.report(ParseError::ChainedComparison { span });
            }
        }

        left
    }

    /// The value of `-<literal>` when the literal only fits in `int` once
    /// negated, as in `-2147483648`.
    fn negated_int_literal(&self) -> Option<i32> {
        if self.current.kind != TokenKind::IntLit {
            return None;
        }
        let magnitude = self.text(&self.current.span).parse::<i64>().ok()?;
        if magnitude <= i64::from(i32::MAX) {
            return None;
        }
        i32::try_from(-magnitude).ok()
    }

    /// Parse a prefix expression: literals, names, groups and prefix operators.
    fn parse_prefix_expr(&mut self) -> Expr {
        let start = self.current.span;

        if let Some(form) = special_form(self.current.kind) {
            return self.parse_special_form(form);
        }

        match self.current.kind {
            TokenKind::IntLit => {
                let token = self.advance();
                let text = self.text(&token.span);
                match text.parse::<i32>() {
                    Ok(value) => Expr::new(ExprKind::IntLit(value), token.span),
                    Err(_) => {
                        self.errors.push(
                            ParseError::IntegerOutOfRange {
                                text: text.to_string(),
                                span: token.span,
                            }
                            .into(),
                        );
                        Expr::new(ExprKind::Error, token.span)
                    }
                }
            }
            TokenKind::FloatLit => {
                let token = self.advance();
                let value = self.text(&token.span).parse::<f64>().unwrap_or_default();
                Expr::new(ExprKind::FloatLit(value), token.span)
            }
            TokenKind::StringLit => {
                let token = self.advance();
                Expr::new(ExprKind::StringLit(self.unquote(&token.span)), token.span)
            }
            TokenKind::CharLit => {
                let token = self.advance();
                Expr::new(ExprKind::CharLit(self.unquote(&token.span)), token.span)
            }
            TokenKind::True | TokenKind::False => {
                let token = self.advance();
                Expr::new(ExprKind::BoolLit(token.kind == TokenKind::True), token.span)
            }
            TokenKind::Ident => self.parse_name_expr(),
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = self.advance();
                let Some((name, name_span)) = self.expect_ident() else {
                    return Expr::new(ExprKind::Error, start);
                };
                Expr::new(
                    ExprKind::Increment {
                        name,
                        increment: op.kind == TokenKind::PlusPlus,
                        prefix: true,
                    },
                    start.merge(name_span),
                )
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr();
                let end = self.expect(TokenKind::RParen).map_or(inner.span, |t| t.span);
                Expr::new(inner.kind, start.merge(end))
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::Not => {
                self.advance();
                // `!` binds looser than comparisons: `!a == b` is `!(a == b)`.
                let operand = self.parse_expr_prec(Precedence::Comparison);
                let span = start.merge(operand.span);
                Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Not,
                        operand: Box::new(operand),
                    },
                    span,
                )
            }
            TokenKind::Minus | TokenKind::Plus => {
                let token = self.advance();
                if token.kind == TokenKind::Minus {
                    if let Some(value) = self.negated_int_literal() {
                        let literal = self.advance();
                        return Expr::new(ExprKind::IntLit(value), start.merge(literal.span));
                    }
                }
                let op = if token.kind == TokenKind::Minus {
                    UnaryOp::Neg
                } else {
                    UnaryOp::Plus
                };
                let operand = self.parse_expr_prec(Precedence::Unary);
                let span = start.merge(operand.span);
                Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                )
            }
            _ => {
                self.error_expected_code("expression", ErrorCode::ExpectedExpression);
                Expr::new(ExprKind::Error, start)
            }
        }
    }

    /// Parse `<prop>(e)`, `<base>(e)`, `<breed>(e)` or `<hook>(e)`.
    fn parse_special_form(&mut self, form: SpecialForm) -> Expr {
        let start = self.advance().span;
        if self.expect(TokenKind::LParen).is_none() {
            return Expr::new(ExprKind::Error, start);
        }
        let inner = self.parse_expr();
        let end = self.expect(TokenKind::RParen).map_or(inner.span, |t| t.span);
        Expr::new(
            ExprKind::Special {
                form,
                inner: Box::new(inner),
            },
            start.merge(end),
        )
    }

    /// Parse an expression starting with an identifier: a variable, a call,
    /// an index or a postfix increment.
    fn parse_name_expr(&mut self) -> Expr {
        let token = self.advance();
        let name = self.text(&token.span).to_string();

        match self.current.kind {
            TokenKind::LParen => {
                let call = self.parse_call_args(name, token.span);
                let span = call.span;
                Expr::new(ExprKind::Call(call), span)
            }
            TokenKind::LBracket => {
                self.advance();
                let index = self.parse_expr();
                let end = self.expect(TokenKind::RBracket).map_or(index.span, |t| t.span);
                Expr::new(
                    ExprKind::Index {
                        name,
                        index: Box::new(index),
                    },
                    token.span.merge(end),
                )
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = self.advance();
                Expr::new(
                    ExprKind::Increment {
                        name,
                        increment: op.kind == TokenKind::PlusPlus,
                        prefix: false,
                    },
                    token.span.merge(op.span),
                )
            }
            _ => Expr::new(ExprKind::Variable(name), token.span),
        }
    }

    /// Parse `( args )` after a callee name.
    pub(super) fn parse_call_args(&mut self, name: String, name_span: Span) -> Call {
        let mut args = Vec::new();
        let mut end = name_span;

        if self.expect(TokenKind::LParen).is_some() {
            if !self.check(TokenKind::RParen) {
                loop {
                    args.push(self.parse_expr());
                    if !self.try_consume(TokenKind::Comma) {
                        break;
                    }
                }
            }
            if let Some(close) = self.expect(TokenKind::RParen) {
                end = close.span;
            }
        }

        Call {
            name,
            args,
            span: name_span.merge(end),
        }
    }

    /// Parse `[e, ...]` or `[]`.
    pub(super) fn parse_array_literal(&mut self) -> Expr {
        let start = self.current.span;
        let elements = self.parse_array_elements();
        Expr::new(ExprKind::ArrayLit(elements), start.merge(self.previous.span))
    }

    /// Parse the bracketed element list of an array literal.
    pub(super) fn parse_array_elements(&mut self) -> Vec<Expr> {
        let mut elements = Vec::new();
        if self.expect(TokenKind::LBracket).is_none() {
            return elements;
        }

        if !self.check(TokenKind::RBracket) {
            loop {
                elements.push(self.parse_expr());
                if !self.try_consume(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBracket);
        elements
    }
}
