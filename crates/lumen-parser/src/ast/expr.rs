//! Expression nodes.

use lumen_common::arena::IdRange;
use lumen_common::span::Span;

use super::{ExprId, TypeId};

/// An expression node: a kind plus the source span it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Every expression form in the Lumen language.
///
/// Children are ids into the owning [`Ast`](super::Ast); contiguous child
/// lists are ranges into its flattened id tables. Identifier names and
/// string literal bodies are duplicated into the tree at construction, so
/// nodes never borrow the source buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal, e.g. `42`.
    IntLit(i64),
    /// Float literal, e.g. `3.14`.
    FloatLit(f64),
    /// String literal body (escape sequences kept verbatim until lowering).
    StringLit(String),
    /// `true` / `false`.
    BoolLit(bool),
    /// `null`.
    NullLit,
    /// A name reference.
    Ident(String),
    /// `lhs op rhs`.
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// Prefix or postfix operator application.
    Unary { op: UnaryOp, operand: ExprId },
    /// `callee(args...)`.
    Call {
        callee: ExprId,
        args: IdRange<Expr>,
    },
    /// `target = value`.
    Assign { target: ExprId, value: ExprId },
    /// `cond ? then : otherwise`.
    Ternary {
        cond: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },
    /// `base.field`.
    Member { base: ExprId, field: String },
    /// `base[index]`.
    Index { base: ExprId, index: ExprId },
    /// Parenthesised expression.
    Grouping(ExprId),
    /// `[a, b, c]`.
    ArrayLit { elems: IdRange<Expr> },
    /// `cast<T>(expr)`.
    Cast { ty: TypeId, expr: ExprId },
    /// `sizeof<T>`.
    SizeOfType(TypeId),
    /// `sizeof(expr)`.
    SizeOfExpr(ExprId),
    /// `alloc(size)` -- raw allocation, yields a byte pointer.
    Alloc { size: ExprId },
    /// `free(ptr)`.
    Free { ptr: ExprId },
    /// `memcpy(dst, src, len)`.
    Memcpy {
        dst: ExprId,
        src: ExprId,
        len: ExprId,
    },
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    /// Whether this operator is `+ - * / %`.
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }

    /// Whether this operator is a comparison yielding `bool`.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }

    /// Whether this operator is `&&` or `||`.
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    /// Whether this operator is `& | ^ << >>`.
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr
        )
    }
}

/// Unary operators, prefix and postfix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Prefix `-`.
    Neg,
    /// Prefix `+`.
    Plus,
    /// Prefix `!`.
    Not,
    /// Prefix `~`.
    BitNot,
    /// Prefix `++`.
    PreInc,
    /// Prefix `--`.
    PreDec,
    /// Postfix `++`.
    PostInc,
    /// Postfix `--`.
    PostDec,
    /// Prefix `&`.
    AddrOf,
    /// Prefix `*`.
    Deref,
}
