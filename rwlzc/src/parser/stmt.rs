//! Statement and block parsing.

use super::*;

impl<'src> Parser<'src> {
    /// Parse `{ stmt* }`.
    pub(super) fn parse_block(&mut self) -> Option<Block> {
        let start = self.expect(TokenKind::LBrace)?.span;
        let mut statements = Vec::new();

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            match self.parse_stmt() {
                Some(stmt) => {
                    statements.push(stmt);
                    self.panic_mode = false;
                }
                None => self.synchronize_stmt(),
            }
        }

        let end = self.expect(TokenKind::RBrace).map_or(self.previous.span, |t| t.span);
        Some(Block {
            statements,
            span: start.merge(end),
        })
    }

    /// Parse a single statement.
    fn parse_stmt(&mut self) -> Option<Stmt> {
        let start = self.current.span;

        let kind = match self.current.kind {
            TokenKind::LBrace => StmtKind::Block(self.parse_block()?),
            kind if kind == TokenKind::Const || kind.is_type_keyword() => {
                let kind = self.parse_declaration()?;
                self.expect(TokenKind::Semi)?;
                kind
            }
            TokenKind::Ident if self.check_next(TokenKind::LParen) => {
                let token = self.advance();
                let name = self.text(&token.span).to_string();
                let call = self.parse_call_args(name, token.span);
                self.expect(TokenKind::Semi)?;
                StmtKind::Call(call)
            }
            TokenKind::Ident | TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let assignment = self.parse_assignment()?;
                self.expect(TokenKind::Semi)?;
                StmtKind::Assign(assignment)
            }
            TokenKind::If => self.parse_if()?,
            TokenKind::While => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let condition = self.parse_expr();
                self.expect(TokenKind::RParen)?;
                let body = self.parse_block()?;
                StmtKind::While { condition, body }
            }
            TokenKind::For => self.parse_for()?,
            TokenKind::Break => {
                self.advance();
                self.expect(TokenKind::Semi)?;
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(TokenKind::Semi)?;
                StmtKind::Continue
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.check(TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expr())
                };
                self.expect(TokenKind::Semi)?;
                StmtKind::Return(value)
            }
            TokenKind::Print => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let value = self.parse_expr();
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::Semi)?;
                StmtKind::Print(value)
            }
            TokenKind::IntLit
            | TokenKind::FloatLit
            | TokenKind::StringLit
            | TokenKind::CharLit
            | TokenKind::True
            | TokenKind::False
            | TokenKind::LParen => {
                self.report(ParseError::InvalidAssignTarget { span: start });
                return None;
            }
            _ => {
                self.error_expected("statement");
                return None;
            }
        };

        Some(Stmt {
            kind,
            span: start.merge(self.previous.span),
        })
    }

    /// Parse a variable or array declaration without its trailing `;`.
    fn parse_declaration(&mut self) -> Option<StmtKind> {
        let is_const = self.try_consume(TokenKind::Const);
        let mut ty = self.parse_type()?;
        ty.is_const = is_const;
        let (name, _) = self.expect_ident()?;

        if self.try_consume(TokenKind::LBracket) {
            // `type name[] = [..]` or `type name[size] [= [..]]`
            let size = if self.try_consume(TokenKind::RBracket) {
                None
            } else {
                let size = self.parse_expr();
                self.expect(TokenKind::RBracket)?;
                Some(size)
            };

            let values = if size.is_none() {
                self.expect(TokenKind::Assign)?;
                Some(self.parse_array_elements())
            } else if self.try_consume(TokenKind::Assign) {
                Some(self.parse_array_elements())
            } else {
                None
            };

            return Some(StmtKind::ArrayDecl(ArrayDecl {
                name,
                ty,
                size,
                values,
            }));
        }

        let value = if self.try_consume(TokenKind::Assign) {
            Some(self.parse_expr())
        } else {
            None
        };
        Some(StmtKind::VarDecl(VarDecl { name, ty, value }))
    }

    /// Parse `name op value`, `name[i] op value`, `name++`, `++name` and
    /// friends, without a trailing `;`.
    fn parse_assignment(&mut self) -> Option<Assignment> {
        if self.check(TokenKind::PlusPlus) || self.check(TokenKind::MinusMinus) {
            let op_token = self.advance();
            let target = self.parse_location()?;
            let op = if op_token.kind == TokenKind::PlusPlus {
                AssignOp::Increment
            } else {
                AssignOp::Decrement
            };
            return Some(Assignment {
                target,
                op,
                value: None,
            });
        }

        let target = self.parse_location()?;
        let op = match self.current.kind {
            TokenKind::Assign => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::AddAssign,
            TokenKind::MinusEq => AssignOp::SubAssign,
            TokenKind::StarEq => AssignOp::MulAssign,
            TokenKind::SlashEq => AssignOp::DivAssign,
            TokenKind::PlusPlus => AssignOp::Increment,
            TokenKind::MinusMinus => AssignOp::Decrement,
            _ => {
                self.error_expected("assignment operator");
                return None;
            }
        };
        self.advance();

        let value = match op {
            AssignOp::Increment | AssignOp::Decrement => None,
            _ => Some(self.parse_expr()),
        };
        Some(Assignment { target, op, value })
    }

    /// Parse `name` or `name[index]`.
    fn parse_location(&mut self) -> Option<Location> {
        let (name, name_span) = self.expect_ident()?;
        if !self.try_consume(TokenKind::LBracket) {
            return Some(Location::Var {
                name,
                span: name_span,
            });
        }

        let index = self.parse_expr();
        let end = self.expect(TokenKind::RBracket)?.span;
        Some(Location::Index {
            name,
            index: Box::new(index),
            span: name_span.merge(end),
        })
    }

    /// Parse `if (cond) { ... } [else { ... }]`.
    fn parse_if(&mut self) -> Option<StmtKind> {
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expr();
        self.expect(TokenKind::RParen)?;
        let then_block = self.parse_block()?;

        let else_block = if self.try_consume(TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };

        Some(StmtKind::If {
            condition,
            then_block,
            else_block,
        })
    }

    /// Parse `for (init; cond; update) { ... }`; each clause may be empty.
    fn parse_for(&mut self) -> Option<StmtKind> {
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;

        let init = if self.check(TokenKind::Semi) {
            None
        } else {
            let start = self.current.span;
            let kind = if self.current.kind.is_type_keyword() || self.check(TokenKind::Const) {
                self.parse_declaration()?
            } else {
                StmtKind::Assign(self.parse_assignment()?)
            };
            Some(Box::new(Stmt {
                kind,
                span: start.merge(self.previous.span),
            }))
        };
        self.expect(TokenKind::Semi)?;

        let condition = if self.check(TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr())
        };
        self.expect(TokenKind::Semi)?;

        let update = if self.check(TokenKind::RParen) {
            None
        } else {
            let start = self.current.span;
            let assignment = self.parse_assignment()?;
            Some(Box::new(Stmt {
                kind: StmtKind::Assign(assignment),
                span: start.merge(self.previous.span),
            }))
        };
        self.expect(TokenKind::RParen)?;

        let body = self.parse_block()?;
        Some(StmtKind::For {
            init,
            condition,
            update,
            body,
        })
    }
}
