//! Type expression nodes.

use lumen_common::arena::IdRange;
use lumen_common::span::Span;

use super::{ExprId, TypeId};

/// A type expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeKind,
    pub span: Span,
}

/// Every type form.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// A built-in basic type.
    Basic(BasicType),
    /// `*T`.
    Pointer(TypeId),
    /// `[T; size]` -- the size is an ordinary expression, parsed but never
    /// evaluated for compile-time constancy.
    Array { elem: TypeId, size: ExprId },
    /// A function signature. Never written in source; synthesised by the
    /// type checker for function symbols.
    Function {
        params: IdRange<TypeExpr>,
        ret: TypeId,
    },
    /// A reference to a user-declared struct or enum by name.
    Named(String),
}

/// The built-in basic types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    Void,
    Char,
    Str,
    Int,
    Float,
    Double,
    Bool,
}

impl BasicType {
    /// The keyword spelling of this type.
    pub fn name(self) -> &'static str {
        match self {
            BasicType::Void => "void",
            BasicType::Char => "char",
            BasicType::Str => "str",
            BasicType::Int => "int",
            BasicType::Float => "float",
            BasicType::Double => "double",
            BasicType::Bool => "bool",
        }
    }

    /// Whether arithmetic is defined on this type.
    pub fn is_numeric(self) -> bool {
        matches!(self, BasicType::Int | BasicType::Float | BasicType::Double)
    }
}
