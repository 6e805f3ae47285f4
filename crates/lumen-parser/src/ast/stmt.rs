//! Statement and directive nodes.

use lumen_common::arena::IdRange;
use lumen_common::span::Span;

use super::{Expr, ExprId, StmtId, TypeId};

/// A statement node: a kind plus the source span it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// Declaration visibility: an explicit `pub` or `priv` modifier, or neither.
///
/// Unmarked declarations behave as private; the distinction from an explicit
/// `priv` only matters for the `main` promotion warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
    Default,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        matches!(self, Visibility::Public)
    }
}

/// Every statement and preprocessor directive form.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// The program root: a list of module directives or top-level
    /// statements.
    Program { items: IdRange<Stmt> },
    /// An expression evaluated for effect, terminated by `;`.
    ExprStmt(ExprId),
    /// `let`/`const` declaration. `let` is mutable, `const` immutable.
    VarDecl {
        name: String,
        mutable: bool,
        vis: Visibility,
        annotation: Option<TypeId>,
        init: Option<ExprId>,
    },
    /// `fn name(params) ret { body }`.
    FnDecl {
        name: String,
        params: IdRange<Param>,
        return_type: TypeId,
        vis: Visibility,
        body: StmtId,
    },
    /// `struct Name { ... }` with fields partitioned by visibility.
    StructDecl {
        name: String,
        vis: Visibility,
        public_fields: IdRange<Field>,
        private_fields: IdRange<Field>,
    },
    /// `enum Name { A, B, C }` -- member order is significant.
    EnumDecl {
        name: String,
        vis: Visibility,
        members: Vec<String>,
    },
    /// `if cond then [elif ...]* [else ...]`.
    If {
        cond: ExprId,
        then_branch: StmtId,
        elifs: IdRange<ElifArm>,
        else_branch: Option<StmtId>,
    },
    /// The single loop statement. Field population distinguishes the three
    /// shapes: no condition and no initialisers is an infinite loop; a
    /// condition alone is while-like; initialisers plus a condition is
    /// for-like.
    Loop {
        init: IdRange<Stmt>,
        cond: Option<ExprId>,
        incr: Option<ExprId>,
        body: StmtId,
    },
    /// `return [value];`.
    Return { value: Option<ExprId> },
    /// `{ ... }`.
    Block { stmts: IdRange<Stmt> },
    /// `output(...)` / `outputln(...)`.
    Print {
        args: IdRange<Expr>,
        newline: bool,
    },
    /// `break;`.
    Break,
    /// `continue;`.
    Continue,
    /// `defer stmt` -- execution delayed to scope exit, LIFO.
    Defer { stmt: StmtId },
    /// `@module name { ... }`.
    Module { name: String, body: IdRange<Stmt> },
    /// `@use name [as alias];`.
    Use { module: String, alias: Option<String> },
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeId,
    pub span: Span,
}

/// A struct field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    pub span: Span,
}

/// One `elif` arm of an if chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElifArm {
    pub cond: ExprId,
    pub body: StmtId,
}
