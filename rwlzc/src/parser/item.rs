//! Top-level parsing: plugin metadata, function definitions, parameters and
//! type spellings.

use super::*;

impl<'src> Parser<'src> {
    /// Parse `[BepInPlugin("id", "name", "version")]`.
    pub(super) fn parse_metadata(&mut self) -> Option<Metadata> {
        let start = self.expect(TokenKind::LBracket)?.span;
        self.expect(TokenKind::BepInPlugin)?;
        self.expect(TokenKind::LParen)?;

        let id = self.parse_metadata_string()?;
        self.expect(TokenKind::Comma)?;
        let name = self.parse_metadata_string()?;
        self.expect(TokenKind::Comma)?;
        let version = self.parse_metadata_string()?;

        self.expect(TokenKind::RParen)?;
        let end = self.expect(TokenKind::RBracket)?.span;

        Some(Metadata {
            id,
            name,
            version,
            span: start.merge(end),
        })
    }

    fn parse_metadata_string(&mut self) -> Option<String> {
        let token = self.expect(TokenKind::StringLit)?;
        Some(self.unquote(&token.span))
    }

    /// Parse a function definition:
    /// `[<base>|<breed>|hook] [type] name ( params ) { ... }`.
    pub(super) fn parse_function(&mut self) -> Option<Function> {
        let start = self.current.span;

        let kind = match self.current.kind {
            TokenKind::BaseMarker => FunctionKind::Base,
            TokenKind::BreedMarker => FunctionKind::Breed,
            TokenKind::Hook => FunctionKind::Hook,
            _ => FunctionKind::Normal,
        };
        if kind != FunctionKind::Normal {
            self.advance();
        }

        // The return type may be omitted: `main() { ... }`.
        let return_type = if self.check(TokenKind::Ident) && self.check_next(TokenKind::LParen) {
            None
        } else {
            Some(self.parse_type()?)
        };

        let (name, _) = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen)?;

        let body = self.parse_block()?;
        let span = start.merge(body.span);

        tracing::trace!(name = %name, %kind, "parsed function");

        Some(Function {
            kind,
            name,
            params,
            return_type,
            body,
            span,
        })
    }

    /// Parse a comma-separated parameter list, stopping before `)`.
    fn parse_params(&mut self) -> Option<Vec<Param>> {
        let mut params = Vec::new();
        if self.check(TokenKind::RParen) {
            return Some(params);
        }

        loop {
            params.push(self.parse_param()?);
            if !self.try_consume(TokenKind::Comma) {
                break;
            }
        }
        Some(params)
    }

    /// Parse `[const] type name`; `type name[]` also declares an array
    /// parameter.
    fn parse_param(&mut self) -> Option<Param> {
        let start = self.current.span;
        let is_const = self.try_consume(TokenKind::Const);
        let mut ty = self.parse_type()?;
        ty.is_const = is_const;

        let (name, name_span) = self.expect_ident()?;
        if self.check(TokenKind::LBracket) && self.check_next(TokenKind::RBracket) {
            self.advance();
            self.advance();
            ty.is_array = true;
        }

        Some(Param {
            name,
            ty,
            span: start.merge(name_span),
        })
    }

    /// Parse a type spelling: `[array] base`.
    pub(super) fn parse_type(&mut self) -> Option<TypeSpec> {
        let start = self.current.span;
        let is_array = self.try_consume(TokenKind::Array);

        let name = match self.current.kind {
            TokenKind::Int => TypeName::Int,
            TokenKind::Float => TypeName::Float,
            TokenKind::Bool => TypeName::Bool,
            TokenKind::Char => TypeName::Char,
            TokenKind::String => TypeName::String,
            TokenKind::Void => TypeName::Void,
            TokenKind::Auto => TypeName::Auto,
            _ => {
                self.error_expected_code("type", ErrorCode::ExpectedType);
                return None;
            }
        };
        let end = self.advance().span;

        Some(TypeSpec {
            name,
            is_array,
            is_const: false,
            span: start.merge(end),
        })
    }
}
