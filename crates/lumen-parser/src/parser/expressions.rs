//! Pratt expression parser.
//!
//! Binding powers live in a single table keyed by token kind; the core loop
//! obtains a null denotation (atom or prefix form) and then folds left
//! denotations (infix/postfix forms) while the current token binds more
//! tightly than the caller's minimum. Token kinds that appear in both roles
//! (`*` as dereference and multiply, `[` as array literal and index) need no
//! special handling beyond being present in both dispatchers.

use lumen_common::token::{Token, TokenKind};

use crate::ast::{BinaryOp, ExprId, ExprKind, UnaryOp};

use super::Parser;

/// Operator precedence levels, weakest to tightest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum BindingPower {
    None = 0,
    Lowest,
    Assign,
    Ternary,
    LogicalOr,
    LogicalAnd,
    BitOr,
    BitXor,
    BitAnd,
    Equality,
    Relational,
    Shift,
    Additive,
    Multiplicative,
    Exponent,
    Unary,
    Postfix,
    Call,
    Primary,
}

/// The left-denotation binding power of a token, or `None` for tokens that
/// cannot extend an expression.
pub fn binding_power(kind: TokenKind) -> BindingPower {
    match kind {
        TokenKind::Eq => BindingPower::Assign,
        TokenKind::Question => BindingPower::Ternary,
        TokenKind::PipePipe => BindingPower::LogicalOr,
        TokenKind::AmpAmp => BindingPower::LogicalAnd,
        TokenKind::Pipe => BindingPower::BitOr,
        TokenKind::Caret => BindingPower::BitXor,
        TokenKind::Amp => BindingPower::BitAnd,
        TokenKind::EqEq | TokenKind::NotEq => BindingPower::Equality,
        TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => {
            BindingPower::Relational
        }
        TokenKind::Shl | TokenKind::Shr => BindingPower::Shift,
        TokenKind::Plus | TokenKind::Minus => BindingPower::Additive,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => BindingPower::Multiplicative,
        TokenKind::PlusPlus | TokenKind::MinusMinus | TokenKind::Dot | TokenKind::LBracket => {
            BindingPower::Postfix
        }
        TokenKind::LParen => BindingPower::Call,
        _ => BindingPower::None,
    }
}

impl Parser<'_, '_> {
    /// Parse a full expression (statement/argument position).
    pub(crate) fn parse_expr_lowest(&mut self) -> Option<ExprId> {
        self.parse_expr(BindingPower::Lowest)
    }

    /// The core Pratt loop: nud, then led while the current token binds
    /// strictly tighter than `min_bp`.
    pub(crate) fn parse_expr(&mut self, min_bp: BindingPower) -> Option<ExprId> {
        let mut lhs = self.nud()?;
        loop {
            let bp = binding_power(self.current().kind);
            if bp <= min_bp {
                break;
            }
            lhs = self.led(lhs, bp)?;
        }
        Some(lhs)
    }

    // ── Null denotation: atoms and prefix forms ────────────────────────

    fn nud(&mut self) -> Option<ExprId> {
        let token = self.current();
        match token.kind {
            TokenKind::IntLiteral => {
                self.advance();
                let value = match self.text(token).parse::<i64>() {
                    Ok(v) => v,
                    Err(_) => {
                        self.syntax_error(
                            format!("Integer literal '{}' out of range", self.text(token)),
                            token,
                        );
                        0
                    }
                };
                Some(self.ast.new_expr(ExprKind::IntLit(value), token.span))
            }
            TokenKind::FloatLiteral => {
                self.advance();
                let value = self.text(token).parse::<f64>().unwrap_or(0.0);
                Some(self.ast.new_expr(ExprKind::FloatLit(value), token.span))
            }
            TokenKind::StringLiteral => {
                self.advance();
                let body = self.text(token).to_string();
                Some(self.ast.new_expr(ExprKind::StringLit(body), token.span))
            }
            TokenKind::True => {
                self.advance();
                Some(self.ast.new_expr(ExprKind::BoolLit(true), token.span))
            }
            TokenKind::False => {
                self.advance();
                Some(self.ast.new_expr(ExprKind::BoolLit(false), token.span))
            }
            TokenKind::Null => {
                self.advance();
                Some(self.ast.new_expr(ExprKind::NullLit, token.span))
            }
            TokenKind::Ident => {
                self.advance();
                let name = self.text(token).to_string();
                Some(self.ast.new_expr(ExprKind::Ident(name), token.span))
            }

            // Prefix operators, including dereference and address-of.
            TokenKind::Minus => self.prefix(UnaryOp::Neg, token),
            TokenKind::Plus => self.prefix(UnaryOp::Plus, token),
            TokenKind::Bang => self.prefix(UnaryOp::Not, token),
            TokenKind::Tilde => self.prefix(UnaryOp::BitNot, token),
            TokenKind::PlusPlus => self.prefix(UnaryOp::PreInc, token),
            TokenKind::MinusMinus => self.prefix(UnaryOp::PreDec, token),
            TokenKind::Star => self.prefix(UnaryOp::Deref, token),
            TokenKind::Amp => self.prefix(UnaryOp::AddrOf, token),

            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr_lowest()?;
                self.consume(TokenKind::RParen, "Expected ')' to close grouping");
                let span = token.span.merge(self.prev_span());
                Some(self.ast.new_expr(ExprKind::Grouping(inner), span))
            }

            TokenKind::LBracket => {
                self.advance();
                let mut elems = Vec::new();
                while !self.at(TokenKind::RBracket) && self.has_tokens() {
                    elems.push(self.parse_expr_lowest()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.consume(TokenKind::RBracket, "Expected ']' to close array literal");
                let span = token.span.merge(self.prev_span());
                let elems = self.ast.alloc_expr_list(elems);
                Some(self.ast.new_expr(ExprKind::ArrayLit { elems }, span))
            }

            // Memory primitives.
            TokenKind::Cast => {
                self.advance();
                self.consume(TokenKind::Lt, "Expected '<' after 'cast'");
                let ty = self.parse_type()?;
                self.consume(TokenKind::Gt, "Expected '>' after cast target type");
                self.consume(TokenKind::LParen, "Expected '(' before cast operand");
                let expr = self.parse_expr_lowest()?;
                self.consume(TokenKind::RParen, "Expected ')' after cast operand");
                let span = token.span.merge(self.prev_span());
                Some(self.ast.new_expr(ExprKind::Cast { ty, expr }, span))
            }
            TokenKind::Sizeof => {
                self.advance();
                if self.eat(TokenKind::Lt) {
                    let ty = self.parse_type()?;
                    self.consume(TokenKind::Gt, "Expected '>' after sizeof type");
                    let span = token.span.merge(self.prev_span());
                    Some(self.ast.new_expr(ExprKind::SizeOfType(ty), span))
                } else {
                    self.consume(TokenKind::LParen, "Expected '<' or '(' after 'sizeof'");
                    let expr = self.parse_expr_lowest()?;
                    self.consume(TokenKind::RParen, "Expected ')' after sizeof operand");
                    let span = token.span.merge(self.prev_span());
                    Some(self.ast.new_expr(ExprKind::SizeOfExpr(expr), span))
                }
            }
            TokenKind::Alloc => {
                self.advance();
                self.consume(TokenKind::LParen, "Expected '(' after 'alloc'");
                let size = self.parse_expr_lowest()?;
                self.consume(TokenKind::RParen, "Expected ')' after allocation size");
                let span = token.span.merge(self.prev_span());
                Some(self.ast.new_expr(ExprKind::Alloc { size }, span))
            }
            TokenKind::Free => {
                self.advance();
                self.consume(TokenKind::LParen, "Expected '(' after 'free'");
                let ptr = self.parse_expr_lowest()?;
                self.consume(TokenKind::RParen, "Expected ')' after freed pointer");
                let span = token.span.merge(self.prev_span());
                Some(self.ast.new_expr(ExprKind::Free { ptr }, span))
            }
            TokenKind::Memcpy => {
                self.advance();
                self.consume(TokenKind::LParen, "Expected '(' after 'memcpy'");
                let dst = self.parse_expr_lowest()?;
                self.consume(TokenKind::Comma, "Expected ',' after memcpy destination");
                let src = self.parse_expr_lowest()?;
                self.consume(TokenKind::Comma, "Expected ',' after memcpy source");
                let len = self.parse_expr_lowest()?;
                self.consume(TokenKind::RParen, "Expected ')' after memcpy length");
                let span = token.span.merge(self.prev_span());
                Some(self.ast.new_expr(ExprKind::Memcpy { dst, src, len }, span))
            }

            _ => {
                self.syntax_error(
                    format!("Expected expression, found '{}'", self.text(token)),
                    token,
                );
                None
            }
        }
    }

    fn prefix(&mut self, op: UnaryOp, token: Token) -> Option<ExprId> {
        self.advance();
        let operand = self.parse_expr(BindingPower::Unary)?;
        let span = token.span.merge(self.ast.expr(operand).span);
        Some(self.ast.new_expr(ExprKind::Unary { op, operand }, span))
    }

    // ── Left denotation: infix and postfix forms ───────────────────────

    fn led(&mut self, lhs: ExprId, bp: BindingPower) -> Option<ExprId> {
        let token = self.advance();
        let lhs_span = self.ast.expr(lhs).span;
        match token.kind {
            // Binary operators (left-associative: rhs parsed at the
            // operator's own power, so an equal-power operator stops).
            TokenKind::Plus => self.binary(lhs, BinaryOp::Add, bp),
            TokenKind::Minus => self.binary(lhs, BinaryOp::Sub, bp),
            TokenKind::Star => self.binary(lhs, BinaryOp::Mul, bp),
            TokenKind::Slash => self.binary(lhs, BinaryOp::Div, bp),
            TokenKind::Percent => self.binary(lhs, BinaryOp::Mod, bp),
            TokenKind::EqEq => self.binary(lhs, BinaryOp::Eq, bp),
            TokenKind::NotEq => self.binary(lhs, BinaryOp::NotEq, bp),
            TokenKind::Lt => self.binary(lhs, BinaryOp::Lt, bp),
            TokenKind::LtEq => self.binary(lhs, BinaryOp::LtEq, bp),
            TokenKind::Gt => self.binary(lhs, BinaryOp::Gt, bp),
            TokenKind::GtEq => self.binary(lhs, BinaryOp::GtEq, bp),
            TokenKind::AmpAmp => self.binary(lhs, BinaryOp::And, bp),
            TokenKind::PipePipe => self.binary(lhs, BinaryOp::Or, bp),
            TokenKind::Amp => self.binary(lhs, BinaryOp::BitAnd, bp),
            TokenKind::Pipe => self.binary(lhs, BinaryOp::BitOr, bp),
            TokenKind::Caret => self.binary(lhs, BinaryOp::BitXor, bp),
            TokenKind::Shl => self.binary(lhs, BinaryOp::Shl, bp),
            TokenKind::Shr => self.binary(lhs, BinaryOp::Shr, bp),

            // Assignment (right-associative via the lower recursion floor).
            TokenKind::Eq => {
                let value = self.parse_expr(BindingPower::Lowest)?;
                let span = lhs_span.merge(self.ast.expr(value).span);
                Some(self.ast.new_expr(ExprKind::Assign { target: lhs, value }, span))
            }

            // Ternary conditional.
            TokenKind::Question => {
                let then_expr = self.parse_expr_lowest()?;
                self.consume(TokenKind::Colon, "Expected ':' in ternary expression");
                let else_expr = self.parse_expr_lowest()?;
                let span = lhs_span.merge(self.ast.expr(else_expr).span);
                Some(self.ast.new_expr(
                    ExprKind::Ternary {
                        cond: lhs,
                        then_expr,
                        else_expr,
                    },
                    span,
                ))
            }

            // Call.
            TokenKind::LParen => {
                let mut args = Vec::new();
                while !self.at(TokenKind::RParen) && self.has_tokens() {
                    args.push(self.parse_expr_lowest()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.consume(TokenKind::RParen, "Expected ')' to close argument list");
                let span = lhs_span.merge(self.prev_span());
                let args = self.ast.alloc_expr_list(args);
                Some(self.ast.new_expr(ExprKind::Call { callee: lhs, args }, span))
            }

            // Member access.
            TokenKind::Dot => {
                let field = self.expect_name("Expected member name after '.'")?;
                let span = lhs_span.merge(self.prev_span());
                Some(self.ast.new_expr(ExprKind::Member { base: lhs, field }, span))
            }

            // Index.
            TokenKind::LBracket => {
                let index = self.parse_expr_lowest()?;
                self.consume(TokenKind::RBracket, "Expected ']' to close index");
                let span = lhs_span.merge(self.prev_span());
                Some(self.ast.new_expr(ExprKind::Index { base: lhs, index }, span))
            }

            // Postfix increment/decrement.
            TokenKind::PlusPlus => {
                let span = lhs_span.merge(token.span);
                Some(self.ast.new_expr(
                    ExprKind::Unary {
                        op: UnaryOp::PostInc,
                        operand: lhs,
                    },
                    span,
                ))
            }
            TokenKind::MinusMinus => {
                let span = lhs_span.merge(token.span);
                Some(self.ast.new_expr(
                    ExprKind::Unary {
                        op: UnaryOp::PostDec,
                        operand: lhs,
                    },
                    span,
                ))
            }

            _ => {
                self.syntax_error(
                    format!("'{}' cannot continue an expression", self.text(token)),
                    token,
                );
                None
            }
        }
    }

    fn binary(&mut self, lhs: ExprId, op: BinaryOp, bp: BindingPower) -> Option<ExprId> {
        let rhs = self.parse_expr(bp)?;
        let span = self.ast.expr(lhs).span.merge(self.ast.expr(rhs).span);
        Some(self.ast.new_expr(ExprKind::Binary { op, lhs, rhs }, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_powers_are_ordered() {
        use BindingPower::*;
        let ascending = [
            None, Lowest, Assign, Ternary, LogicalOr, LogicalAnd, BitOr, BitXor, BitAnd,
            Equality, Relational, Shift, Additive, Multiplicative, Exponent, Unary, Postfix,
            Call, Primary,
        ];
        for pair in ascending.windows(2) {
            assert!(pair[0] < pair[1], "{:?} must bind weaker than {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn table_maps_operators() {
        assert_eq!(binding_power(TokenKind::Plus), BindingPower::Additive);
        assert_eq!(binding_power(TokenKind::Star), BindingPower::Multiplicative);
        assert_eq!(binding_power(TokenKind::EqEq), BindingPower::Equality);
        assert_eq!(binding_power(TokenKind::AmpAmp), BindingPower::LogicalAnd);
        assert_eq!(binding_power(TokenKind::LParen), BindingPower::Call);
        assert_eq!(binding_power(TokenKind::Dot), BindingPower::Postfix);
        assert_eq!(binding_power(TokenKind::Semicolon), BindingPower::None);
    }
}
