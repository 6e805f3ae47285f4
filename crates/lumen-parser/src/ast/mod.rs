//! The Lumen AST: a tagged tree over typed index arenas.
//!
//! [`Ast`] owns every node the parser (and later the type checker) creates.
//! Nodes address their children by typed id; contiguous child lists (call
//! arguments, statement bodies, parameters) live in flattened side tables
//! addressed by [`IdRange`]. The whole tree is reclaimed at once when the
//! `Ast` is dropped or reset -- nothing is freed individually, and no node
//! is shared, so the tree is acyclic by construction.

pub mod expr;
pub mod stmt;
pub mod ty;

pub use expr::{BinaryOp, Expr, ExprKind, UnaryOp};
pub use stmt::{ElifArm, Field, Param, Stmt, StmtKind, Visibility};
pub use ty::{BasicType, TypeExpr, TypeKind};

use lumen_common::arena::{to_u32, Arena, Id, IdRange};
use lumen_common::span::Span;

pub type ExprId = Id<Expr>;
pub type StmtId = Id<Stmt>;
pub type TypeId = Id<TypeExpr>;

/// Owner of all AST nodes for one pipeline run.
#[derive(Debug, Default)]
pub struct Ast {
    exprs: Arena<Expr>,
    stmts: Arena<Stmt>,
    types: Arena<TypeExpr>,
    expr_lists: Vec<ExprId>,
    stmt_lists: Vec<StmtId>,
    type_lists: Vec<TypeId>,
    params: Vec<Param>,
    fields: Vec<Field>,
    elifs: Vec<ElifArm>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with capacity estimated from source size.
    /// Heuristic: roughly one expression per 16 bytes of source.
    pub fn with_capacity(source_len: usize) -> Self {
        let estimated = source_len / 16;
        Self {
            exprs: Arena::with_capacity(estimated),
            stmts: Arena::with_capacity(estimated / 4),
            types: Arena::with_capacity(estimated / 8),
            expr_lists: Vec::with_capacity(estimated / 2),
            stmt_lists: Vec::with_capacity(estimated / 4),
            type_lists: Vec::with_capacity(estimated / 8),
            params: Vec::with_capacity(estimated / 8),
            fields: Vec::with_capacity(estimated / 16),
            elifs: Vec::with_capacity(estimated / 16),
        }
    }

    // ── Node constructors ──────────────────────────────────────────────

    /// Allocate an expression node, stamping its span.
    pub fn new_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        self.exprs.push(Expr { kind, span })
    }

    /// Allocate a statement node, stamping its span.
    pub fn new_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        self.stmts.push(Stmt { kind, span })
    }

    /// Allocate a type node, stamping its span.
    pub fn new_type(&mut self, kind: TypeKind, span: Span) -> TypeId {
        self.types.push(TypeExpr { kind, span })
    }

    // ── Node access ────────────────────────────────────────────────────

    #[track_caller]
    pub fn expr(&self, id: ExprId) -> &Expr {
        self.exprs.get(id)
    }

    #[track_caller]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        self.stmts.get(id)
    }

    #[track_caller]
    pub fn ty(&self, id: TypeId) -> &TypeExpr {
        self.types.get(id)
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    // ── Flattened child lists ──────────────────────────────────────────

    pub fn alloc_expr_list(&mut self, ids: Vec<ExprId>) -> IdRange<Expr> {
        let start = to_u32(self.expr_lists.len(), "expression lists");
        self.expr_lists.extend(ids);
        IdRange::new(start, to_u32(self.expr_lists.len() - start as usize, "expression list"))
    }

    pub fn expr_list(&self, range: IdRange<Expr>) -> &[ExprId] {
        &self.expr_lists[range.start as usize..range.start as usize + range.len()]
    }

    pub fn alloc_stmt_list(&mut self, ids: Vec<StmtId>) -> IdRange<Stmt> {
        let start = to_u32(self.stmt_lists.len(), "statement lists");
        self.stmt_lists.extend(ids);
        IdRange::new(start, to_u32(self.stmt_lists.len() - start as usize, "statement list"))
    }

    pub fn stmt_list(&self, range: IdRange<Stmt>) -> &[StmtId] {
        &self.stmt_lists[range.start as usize..range.start as usize + range.len()]
    }

    pub fn alloc_type_list(&mut self, ids: Vec<TypeId>) -> IdRange<TypeExpr> {
        let start = to_u32(self.type_lists.len(), "type lists");
        self.type_lists.extend(ids);
        IdRange::new(start, to_u32(self.type_lists.len() - start as usize, "type list"))
    }

    pub fn type_list(&self, range: IdRange<TypeExpr>) -> &[TypeId] {
        &self.type_lists[range.start as usize..range.start as usize + range.len()]
    }

    pub fn alloc_params(&mut self, params: Vec<Param>) -> IdRange<Param> {
        let start = to_u32(self.params.len(), "parameter lists");
        self.params.extend(params);
        IdRange::new(start, to_u32(self.params.len() - start as usize, "parameter list"))
    }

    pub fn params(&self, range: IdRange<Param>) -> &[Param] {
        &self.params[range.start as usize..range.start as usize + range.len()]
    }

    pub fn alloc_fields(&mut self, fields: Vec<Field>) -> IdRange<Field> {
        let start = to_u32(self.fields.len(), "field lists");
        self.fields.extend(fields);
        IdRange::new(start, to_u32(self.fields.len() - start as usize, "field list"))
    }

    pub fn fields(&self, range: IdRange<Field>) -> &[Field] {
        &self.fields[range.start as usize..range.start as usize + range.len()]
    }

    pub fn alloc_elifs(&mut self, elifs: Vec<ElifArm>) -> IdRange<ElifArm> {
        let start = to_u32(self.elifs.len(), "elif lists");
        self.elifs.extend(elifs);
        IdRange::new(start, to_u32(self.elifs.len() - start as usize, "elif list"))
    }

    pub fn elifs(&self, range: IdRange<ElifArm>) -> &[ElifArm] {
        &self.elifs[range.start as usize..range.start as usize + range.len()]
    }

    /// Reset every table for a pipeline re-run (keeps capacity).
    pub fn reset(&mut self) {
        self.exprs.reset();
        self.stmts.reset();
        self.types.reset();
        self.expr_lists.clear();
        self.stmt_lists.clear();
        self.type_lists.clear();
        self.params.clear();
        self.fields.clear();
        self.elifs.clear();
    }
}
