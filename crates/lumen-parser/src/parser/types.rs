//! Type expression parsing.
//!
//! Shares the prefix-driven shape of the expression parser: basic-type
//! keywords produce named basic types, `*` a pointer to the following type,
//! `[` an array with a `;`-separated size expression, and a bare identifier
//! a named struct/enum reference.

use lumen_common::token::TokenKind;

use crate::ast::{BasicType, TypeId, TypeKind};

use super::Parser;

impl Parser<'_, '_> {
    pub(crate) fn parse_type(&mut self) -> Option<TypeId> {
        let token = self.current();
        match token.kind {
            TokenKind::Void
            | TokenKind::Char
            | TokenKind::Str
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::Double
            | TokenKind::Bool => {
                self.advance();
                let basic = basic_type(token.kind);
                Some(self.ast.new_type(TypeKind::Basic(basic), token.span))
            }
            TokenKind::Star => {
                self.advance();
                let pointee = self.parse_type()?;
                let span = token.span.merge(self.prev_span());
                Some(self.ast.new_type(TypeKind::Pointer(pointee), span))
            }
            TokenKind::LBracket => {
                self.advance();
                let elem = self.parse_type()?;
                self.consume(TokenKind::Semicolon, "Expected ';' between array element type and size");
                let size = self.parse_expr_lowest()?;
                self.consume(TokenKind::RBracket, "Expected ']' to close array type");
                let span = token.span.merge(self.prev_span());
                Some(self.ast.new_type(TypeKind::Array { elem, size }, span))
            }
            TokenKind::Ident => {
                self.advance();
                let name = self.text(token).to_string();
                Some(self.ast.new_type(TypeKind::Named(name), token.span))
            }
            _ => {
                self.syntax_error(
                    format!("Expected type, found '{}'", self.text(token)),
                    token,
                );
                None
            }
        }
    }
}

fn basic_type(kind: TokenKind) -> BasicType {
    match kind {
        TokenKind::Void => BasicType::Void,
        TokenKind::Char => BasicType::Char,
        TokenKind::Str => BasicType::Str,
        TokenKind::Int => BasicType::Int,
        TokenKind::Float => BasicType::Float,
        TokenKind::Double => BasicType::Double,
        TokenKind::Bool => BasicType::Bool,
        _ => unreachable!("caller matched a basic-type keyword"),
    }
}
