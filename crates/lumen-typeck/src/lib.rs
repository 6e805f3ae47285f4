//! Lumen type checker: scope resolution and type validation.
//!
//! Walks the parsed AST, builds the scope forest (modules under a global
//! root, a scope per function, block, if-arm, and loop), resolves plain and
//! module-qualified names with visibility filtering, and validates types
//! against the language's matching rules (strict `bool` conditions,
//! `int` <-> `float` compatibility, recursive pointer/array comparison).
//!
//! # Architecture
//!
//! - [`scope`]: the scope forest, symbols, and module imports
//! - [`check`]: the statement/expression walk
//! - [`error`]: structured error values
//! - [`diagnostics`]: ariadne rendering for the driver

pub mod check;
pub mod diagnostics;
pub mod error;
pub mod scope;

use lumen_parser::ast::{Ast, StmtId, TypeId, TypeKind};

use crate::check::Checker;
use crate::error::TypeError;
use crate::scope::{ScopeId, Scopes};

/// The result of type checking a Lumen program.
///
/// Carries the accumulated errors and warnings together with the scope
/// forest, which downstream lowering reads for symbol visibility.
pub struct TypeckResult {
    pub errors: Vec<TypeError>,
    pub warnings: Vec<TypeError>,
    pub scopes: Scopes,
    pub global: ScopeId,
}

impl TypeckResult {
    /// Whether checking found no errors (warnings do not fail the stage).
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Render all errors as formatted diagnostic strings.
    pub fn render_errors(&self, source: &str, filename: &str) -> Vec<String> {
        self.errors
            .iter()
            .map(|err| diagnostics::render_diagnostic(err, source, filename))
            .collect()
    }
}

/// Type-check a parsed program.
///
/// The `Ast` is mutable because the checker synthesises type nodes into it
/// (function signatures, pointer types, inferred array types).
pub fn check(ast: &mut Ast, root: StmtId) -> TypeckResult {
    let mut checker = Checker::new(ast);
    checker.check_program(root);
    let global = checker.scopes.global();
    TypeckResult {
        errors: checker.errors,
        warnings: checker.warnings,
        scopes: checker.scopes,
        global,
    }
}

/// Human-readable rendering of a type node.
pub fn display_type(ast: &Ast, ty: TypeId) -> String {
    match &ast.ty(ty).kind {
        TypeKind::Basic(b) => b.name().to_string(),
        TypeKind::Pointer(pointee) => format!("*{}", display_type(ast, *pointee)),
        TypeKind::Array { elem, .. } => format!("[{}]", display_type(ast, *elem)),
        TypeKind::Function { params, ret } => {
            let params = ast
                .type_list(*params)
                .iter()
                .map(|p| display_type(ast, *p))
                .collect::<Vec<_>>()
                .join(", ");
            format!("fn({params}) {}", display_type(ast, *ret))
        }
        TypeKind::Named(name) => name.clone(),
    }
}
