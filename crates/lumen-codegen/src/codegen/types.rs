//! AST type to LLVM type mapping.
//!
//! Lowering works with [`LowTy`], a flattened view of the surface types:
//! `int` is i64, `bool` i1, `char` i8, `float` f32, `double` f64, `str` and
//! all pointers are opaque pointers, named struct/enum references carry
//! their `int` marker semantics, and arrays stay opaque behind a pointer.

use inkwell::context::Context;
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType};
use inkwell::AddressSpace;

use lumen_parser::ast::{Ast, BasicType as AstBasic, TypeId, TypeKind};

/// The lowered view of a Lumen type.
#[derive(Debug, Clone, PartialEq)]
pub enum LowTy {
    Void,
    Bool,
    Char,
    Int,
    Float,
    Double,
    Str,
    Ptr(Box<LowTy>),
    /// Arrays are parsed and type-checked but opaque to lowering.
    OpaqueArray,
    /// A named struct/enum reference (the `int`-marker semantics).
    Named(String),
}

impl LowTy {
    pub fn is_void(&self) -> bool {
        matches!(self, LowTy::Void)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, LowTy::Ptr(_) | LowTy::Str | LowTy::OpaqueArray)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, LowTy::Float | LowTy::Double)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, LowTy::Bool | LowTy::Char | LowTy::Int | LowTy::Named(_))
    }
}

/// Flatten an AST type node.
pub fn lower_type(ast: &Ast, ty: TypeId) -> LowTy {
    match &ast.ty(ty).kind {
        TypeKind::Basic(b) => match b {
            AstBasic::Void => LowTy::Void,
            AstBasic::Bool => LowTy::Bool,
            AstBasic::Char => LowTy::Char,
            AstBasic::Int => LowTy::Int,
            AstBasic::Float => LowTy::Float,
            AstBasic::Double => LowTy::Double,
            AstBasic::Str => LowTy::Str,
        },
        TypeKind::Pointer(pointee) => LowTy::Ptr(Box::new(lower_type(ast, *pointee))),
        TypeKind::Array { .. } => LowTy::OpaqueArray,
        TypeKind::Named(name) => LowTy::Named(name.clone()),
        TypeKind::Function { .. } => {
            // Function symbols are handled through the unit symbol tables;
            // a function type in value position lowers to a code pointer.
            LowTy::Ptr(Box::new(LowTy::Void))
        }
    }
}

/// The LLVM type for a non-void lowered type.
///
/// Returns `None` for `void`, which has no `BasicTypeEnum` representation;
/// callers decide whether that is an error in their position.
pub fn llvm_basic_type<'ctx>(context: &'ctx Context, ty: &LowTy) -> Option<BasicTypeEnum<'ctx>> {
    match ty {
        LowTy::Void => None,
        LowTy::Bool => Some(context.bool_type().into()),
        LowTy::Char => Some(context.i8_type().into()),
        LowTy::Int | LowTy::Named(_) => Some(context.i64_type().into()),
        LowTy::Float => Some(context.f32_type().into()),
        LowTy::Double => Some(context.f64_type().into()),
        LowTy::Str | LowTy::Ptr(_) | LowTy::OpaqueArray => {
            Some(context.ptr_type(AddressSpace::default()).into())
        }
    }
}

/// Build an LLVM function type from lowered parameter and return types.
pub fn llvm_fn_type<'ctx>(
    context: &'ctx Context,
    params: &[LowTy],
    ret: &LowTy,
) -> FunctionType<'ctx> {
    let param_types: Vec<BasicMetadataTypeEnum<'ctx>> = params
        .iter()
        .filter_map(|p| llvm_basic_type(context, p))
        .map(Into::into)
        .collect();
    match llvm_basic_type(context, ret) {
        Some(ret_ty) => ret_ty.fn_type(&param_types, false),
        None => context.void_type().fn_type(&param_types, false),
    }
}
