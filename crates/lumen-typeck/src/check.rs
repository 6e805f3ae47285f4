//! The type checking walk.
//!
//! `typecheck_statement` and `typecheck_expression` dispatch on node kind;
//! statements push errors and keep walking siblings, expressions return the
//! inferred type id or `None` on failure. The walk builds the scope forest
//! as it goes: modules under the global scope, a function scope per
//! declaration, and a child scope per block, if-arm, and loop.

use rustc_hash::{FxHashMap, FxHashSet};

use lumen_common::span::Span;
use lumen_parser::ast::{
    Ast, BasicType, BinaryOp, ExprId, ExprKind, StmtId, StmtKind, TypeId, TypeKind, UnaryOp,
    Visibility,
};

use crate::error::TypeError;
use crate::scope::{ModuleImport, QualifiedLookupError, ScopeId, Scopes, MODULE_SYMBOL_PREFIX};

/// How two types relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMatch {
    Exact,
    /// Convertible without a cast: `int` <-> `float`, or a typed pointer
    /// against the byte/null pointer.
    Compatible,
    None,
}

impl TypeMatch {
    pub fn is_match(self) -> bool {
        !matches!(self, TypeMatch::None)
    }
}

/// Declared struct layout, kept for member access typing.
struct StructInfo {
    /// (name, type, is_public) in declaration order, public fields first.
    fields: Vec<(String, TypeId, bool)>,
}

pub struct Checker<'a> {
    ast: &'a mut Ast,
    pub scopes: Scopes,
    pub errors: Vec<TypeError>,
    pub warnings: Vec<TypeError>,
    loop_depth: u32,
    enum_names: FxHashSet<String>,
    structs: FxHashMap<String, StructInfo>,
    t_void: TypeId,
    t_char: TypeId,
    t_int: TypeId,
    t_float: TypeId,
    t_double: TypeId,
    t_bool: TypeId,
    t_str: TypeId,
}

impl<'a> Checker<'a> {
    pub fn new(ast: &'a mut Ast) -> Self {
        let zero = Span::new(0, 0);
        let t_void = ast.new_type(TypeKind::Basic(BasicType::Void), zero);
        let t_char = ast.new_type(TypeKind::Basic(BasicType::Char), zero);
        let t_int = ast.new_type(TypeKind::Basic(BasicType::Int), zero);
        let t_float = ast.new_type(TypeKind::Basic(BasicType::Float), zero);
        let t_double = ast.new_type(TypeKind::Basic(BasicType::Double), zero);
        let t_bool = ast.new_type(TypeKind::Basic(BasicType::Bool), zero);
        let t_str = ast.new_type(TypeKind::Basic(BasicType::Str), zero);
        Self {
            ast,
            scopes: Scopes::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            loop_depth: 0,
            enum_names: FxHashSet::default(),
            structs: FxHashMap::default(),
            t_void,
            t_char,
            t_int,
            t_float,
            t_double,
            t_bool,
            t_str,
        }
    }

    /// Check a whole program rooted at `root` in the global scope.
    pub fn check_program(&mut self, root: StmtId) {
        let global = self.scopes.global();
        self.typecheck_statement(root, global);
    }

    // ── Type relations ─────────────────────────────────────────────────

    /// Compare two types. Identity is exact; identical basic names are
    /// exact; `int` <-> `float` is compatible; pointers and arrays compare
    /// element types recursively (a void pointee on either side makes any
    /// pointer pair compatible, which is how `null` assigns to typed
    /// pointers); everything else does not match.
    pub fn types_match(&self, a: TypeId, b: TypeId) -> TypeMatch {
        if a == b {
            return TypeMatch::Exact;
        }
        match (&self.ast.ty(a).kind, &self.ast.ty(b).kind) {
            (TypeKind::Basic(x), TypeKind::Basic(y)) => {
                if x == y {
                    TypeMatch::Exact
                } else if matches!(
                    (x, y),
                    (BasicType::Int, BasicType::Float) | (BasicType::Float, BasicType::Int)
                ) {
                    TypeMatch::Compatible
                } else {
                    TypeMatch::None
                }
            }
            (TypeKind::Pointer(p), TypeKind::Pointer(q)) => {
                let void_pointee = matches!(self.ast.ty(*p).kind, TypeKind::Basic(BasicType::Void))
                    || matches!(self.ast.ty(*q).kind, TypeKind::Basic(BasicType::Void));
                if void_pointee {
                    TypeMatch::Compatible
                } else {
                    self.types_match(*p, *q)
                }
            }
            (TypeKind::Array { elem: p, .. }, TypeKind::Array { elem: q, .. }) => {
                self.types_match(*p, *q)
            }
            (TypeKind::Named(x), TypeKind::Named(y)) => {
                if x == y {
                    TypeMatch::Exact
                } else {
                    TypeMatch::None
                }
            }
            (
                TypeKind::Function { params: pa, ret: ra },
                TypeKind::Function { params: pb, ret: rb },
            ) => {
                let pa = self.ast.type_list(*pa);
                let pb = self.ast.type_list(*pb);
                if pa.len() != pb.len() {
                    return TypeMatch::None;
                }
                for (x, y) in pa.iter().zip(pb.iter()) {
                    if self.types_match(*x, *y) != TypeMatch::Exact {
                        return TypeMatch::None;
                    }
                }
                if self.types_match(*ra, *rb) == TypeMatch::Exact {
                    TypeMatch::Exact
                } else {
                    TypeMatch::None
                }
            }
            _ => TypeMatch::None,
        }
    }

    fn basic_of(&self, ty: TypeId) -> Option<BasicType> {
        match self.ast.ty(ty).kind {
            TypeKind::Basic(b) => Some(b),
            _ => None,
        }
    }

    fn is_void(&self, ty: TypeId) -> bool {
        self.basic_of(ty) == Some(BasicType::Void)
    }

    fn is_numeric(&self, ty: TypeId) -> bool {
        self.basic_of(ty).is_some_and(BasicType::is_numeric)
    }

    fn display(&self, ty: TypeId) -> String {
        crate::display_type(self.ast, ty)
    }

    /// Require an exact `bool`; `int` is deliberately not truthy.
    fn require_bool(&mut self, ty: TypeId, span: Span) {
        if self.types_match(self.t_bool, ty) != TypeMatch::Exact {
            self.errors.push(TypeError::NonBoolCondition {
                found: self.display(ty),
                span,
            });
        }
    }

    // ── Statements ─────────────────────────────────────────────────────

    pub fn typecheck_statement(&mut self, id: StmtId, scope: ScopeId) {
        let stmt = self.ast.stmt(id).clone();
        match stmt.kind {
            StmtKind::Program { items } => {
                for item in self.ast.stmt_list(items).to_vec() {
                    self.typecheck_statement(item, scope);
                }
            }
            StmtKind::Module { ref name, body } => self.check_module(name, body),
            StmtKind::Use { ref module, ref alias } => {
                self.check_use(module, alias.as_deref(), stmt.span, scope)
            }
            StmtKind::ExprStmt(expr) => {
                self.typecheck_expression(expr, scope);
            }
            StmtKind::VarDecl {
                ref name,
                mutable,
                vis,
                annotation,
                init,
            } => self.check_var_decl(name, mutable, vis, annotation, init, stmt.span, scope),
            StmtKind::FnDecl {
                ref name,
                params,
                return_type,
                vis,
                body,
            } => self.check_fn_decl(id, name, params, return_type, vis, body, stmt.span, scope),
            StmtKind::StructDecl {
                ref name,
                vis,
                public_fields,
                private_fields,
            } => {
                let marker = self.ast.new_type(TypeKind::Named(name.clone()), stmt.span);
                if self
                    .scopes
                    .add_symbol(scope, name, marker, vis.is_public(), false)
                    .is_err()
                {
                    self.errors.push(TypeError::DuplicateSymbol {
                        name: name.clone(),
                        span: stmt.span,
                    });
                }
                let mut fields = Vec::new();
                for f in self.ast.fields(public_fields) {
                    fields.push((f.name.clone(), f.ty, true));
                }
                for f in self.ast.fields(private_fields) {
                    fields.push((f.name.clone(), f.ty, false));
                }
                self.structs.insert(name.clone(), StructInfo { fields });
            }
            StmtKind::EnumDecl { ref name, vis, ref members } => {
                if self
                    .scopes
                    .add_symbol(scope, name, self.t_int, vis.is_public(), false)
                    .is_err()
                {
                    self.errors.push(TypeError::DuplicateSymbol {
                        name: name.clone(),
                        span: stmt.span,
                    });
                }
                self.enum_names.insert(name.clone());
                for member in members {
                    let qualified = format!("{name}.{member}");
                    if self
                        .scopes
                        .add_symbol(scope, &qualified, self.t_int, vis.is_public(), false)
                        .is_err()
                    {
                        self.errors.push(TypeError::DuplicateSymbol {
                            name: qualified,
                            span: stmt.span,
                        });
                    }
                }
            }
            StmtKind::If {
                cond,
                then_branch,
                elifs,
                else_branch,
            } => {
                if let Some(ct) = self.typecheck_expression(cond, scope) {
                    self.require_bool(ct, self.ast.expr(cond).span);
                }
                let then_scope = self.scopes.create_child_scope(scope, "then");
                self.typecheck_statement(then_branch, then_scope);
                for arm in self.ast.elifs(elifs).to_vec() {
                    if let Some(ct) = self.typecheck_expression(arm.cond, scope) {
                        self.require_bool(ct, self.ast.expr(arm.cond).span);
                    }
                    let elif_scope = self.scopes.create_child_scope(scope, "elif");
                    self.typecheck_statement(arm.body, elif_scope);
                }
                if let Some(else_branch) = else_branch {
                    let else_scope = self.scopes.create_child_scope(scope, "else");
                    self.typecheck_statement(else_branch, else_scope);
                }
            }
            StmtKind::Loop { init, cond, incr, body } => {
                let shape = if cond.is_none() {
                    "loop.infinite"
                } else if init.is_empty() {
                    "loop.while"
                } else {
                    "loop.for"
                };
                let loop_scope = self.scopes.create_child_scope(scope, shape);
                for stmt in self.ast.stmt_list(init).to_vec() {
                    self.typecheck_statement(stmt, loop_scope);
                }
                if let Some(cond) = cond {
                    if let Some(ct) = self.typecheck_expression(cond, loop_scope) {
                        self.require_bool(ct, self.ast.expr(cond).span);
                    }
                }
                if let Some(incr) = incr {
                    self.typecheck_expression(incr, loop_scope);
                }
                self.loop_depth += 1;
                self.typecheck_statement(body, loop_scope);
                self.loop_depth -= 1;
            }
            StmtKind::Return { value } => self.check_return(value, stmt.span, scope),
            StmtKind::Block { stmts } => {
                let block_scope = self.scopes.create_child_scope(scope, "block");
                for stmt in self.ast.stmt_list(stmts).to_vec() {
                    self.typecheck_statement(stmt, block_scope);
                }
            }
            StmtKind::Print { args, .. } => {
                for arg in self.ast.expr_list(args).to_vec() {
                    self.typecheck_expression(arg, scope);
                }
            }
            StmtKind::Break => {
                if self.loop_depth == 0 {
                    self.errors.push(TypeError::BreakOutsideLoop { span: stmt.span });
                }
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.errors.push(TypeError::ContinueOutsideLoop { span: stmt.span });
                }
            }
            StmtKind::Defer { stmt: inner } => {
                self.typecheck_statement(inner, scope);
            }
        }
    }

    /// Retrieve or create a module scope under the global scope, then check
    /// the body in two passes: `@use` directives first, so modules declared
    /// later in the file can already be imported, then everything else.
    fn check_module(&mut self, name: &str, body: lumen_common::arena::IdRange<lumen_parser::ast::Stmt>) {
        let global = self.scopes.global();
        let module_scope = match self.scopes.find_module(name) {
            Some(existing) => existing,
            None => {
                let id = self.scopes.create_child_scope(global, name);
                {
                    let scope = self.scopes.get_mut(id);
                    scope.is_module_scope = true;
                    scope.module_name = Some(name.to_string());
                }
                let marker = format!("{MODULE_SYMBOL_PREFIX}{name}");
                let _ = self.scopes.add_symbol(global, &marker, self.t_void, false, false);
                id
            }
        };

        let items = self.ast.stmt_list(body).to_vec();
        for &item in &items {
            if matches!(self.ast.stmt(item).kind, StmtKind::Use { .. }) {
                self.typecheck_statement(item, module_scope);
            }
        }
        for &item in &items {
            if !matches!(self.ast.stmt(item).kind, StmtKind::Use { .. }) {
                self.typecheck_statement(item, module_scope);
            }
        }
    }

    fn check_use(&mut self, module: &str, alias: Option<&str>, span: Span, scope: ScopeId) {
        match self.scopes.find_module(module) {
            Some(target) => {
                let alias = alias.unwrap_or(module).to_string();
                self.scopes.get_mut(scope).imports.push(ModuleImport {
                    module_name: module.to_string(),
                    alias,
                    scope: target,
                });
            }
            None => self.errors.push(TypeError::UnknownModule {
                name: module.to_string(),
                span,
            }),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_var_decl(
        &mut self,
        name: &str,
        mutable: bool,
        vis: Visibility,
        annotation: Option<TypeId>,
        init: Option<ExprId>,
        span: Span,
        scope: ScopeId,
    ) {
        let init_ty = init.and_then(|e| self.typecheck_expression(e, scope));

        let ty = match (annotation, init) {
            (None, None) => {
                self.errors.push(TypeError::MissingTypeAnnotation {
                    name: name.to_string(),
                    span,
                });
                return;
            }
            (Some(ann), None) => ann,
            (None, Some(_)) => match init_ty {
                Some(t) => t,
                None => return, // initialiser failed; already reported
            },
            (Some(ann), Some(_)) => {
                if let Some(t) = init_ty {
                    if self.types_match(ann, t) == TypeMatch::None {
                        self.errors.push(TypeError::TypeMismatch {
                            expected: self.display(ann),
                            found: self.display(t),
                            context: "variable declaration",
                            span,
                        });
                    }
                }
                ann
            }
        };

        if self
            .scopes
            .add_symbol(scope, name, ty, vis.is_public(), mutable)
            .is_err()
        {
            self.errors.push(TypeError::DuplicateSymbol {
                name: name.to_string(),
                span,
            });
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_fn_decl(
        &mut self,
        id: StmtId,
        name: &str,
        params: lumen_common::arena::IdRange<lumen_parser::ast::Param>,
        return_type: TypeId,
        vis: Visibility,
        body: StmtId,
        span: Span,
        scope: ScopeId,
    ) {
        let mut public = vis.is_public();
        if name == "main" {
            if self.basic_of(return_type) != Some(BasicType::Int) {
                self.errors.push(TypeError::MainMustReturnInt { span });
            }
            public = true;
            if vis == Visibility::Private {
                self.warnings.push(TypeError::MainPromotedPublic { span });
            }
        }

        // Build the function type and insert the symbol before checking the
        // body, so recursive calls resolve.
        let params_vec = self.ast.params(params).to_vec();
        let param_tys: Vec<TypeId> = params_vec.iter().map(|p| p.ty).collect();
        let param_range = self.ast.alloc_type_list(param_tys);
        let fn_ty = self.ast.new_type(
            TypeKind::Function {
                params: param_range,
                ret: return_type,
            },
            span,
        );
        if self.scopes.add_symbol(scope, name, fn_ty, public, false).is_err() {
            self.errors.push(TypeError::DuplicateSymbol {
                name: name.to_string(),
                span,
            });
        }

        let fn_scope = self.scopes.create_child_scope(scope, name);
        {
            let s = self.scopes.get_mut(fn_scope);
            s.is_function_scope = true;
            s.decl = Some(id);
        }
        for p in &params_vec {
            if self.scopes.add_symbol(fn_scope, &p.name, p.ty, false, true).is_err() {
                self.errors.push(TypeError::DuplicateSymbol {
                    name: p.name.clone(),
                    span: p.span,
                });
            }
        }

        self.typecheck_statement(body, fn_scope);
    }

    fn check_return(&mut self, value: Option<ExprId>, span: Span, scope: ScopeId) {
        let Some(fn_scope) = self.scopes.enclosing_function_scope(scope) else {
            if let Some(v) = value {
                self.typecheck_expression(v, scope);
            }
            self.errors.push(TypeError::ReturnOutsideFunction { span });
            return;
        };
        let decl = self.scopes.get(fn_scope).decl.expect("function scope has its declaration");
        let StmtKind::FnDecl { return_type, .. } = self.ast.stmt(decl).kind else {
            unreachable!("function scope back-link is a function declaration");
        };

        if self.is_void(return_type) {
            if let Some(v) = value {
                self.typecheck_expression(v, scope);
                self.errors.push(TypeError::VoidFunctionReturnsValue { span });
            }
            return;
        }

        match value {
            None => self.errors.push(TypeError::MissingReturnValue {
                expected: self.display(return_type),
                span,
            }),
            Some(v) => {
                if let Some(vt) = self.typecheck_expression(v, scope) {
                    if self.types_match(return_type, vt) == TypeMatch::None {
                        self.errors.push(TypeError::ReturnTypeMismatch {
                            expected: self.display(return_type),
                            found: self.display(vt),
                            span,
                        });
                    }
                }
            }
        }
    }

    // ── Expressions ────────────────────────────────────────────────────

    /// Infer an expression's type, or `None` after recording an error.
    pub fn typecheck_expression(&mut self, id: ExprId, scope: ScopeId) -> Option<TypeId> {
        let expr = self.ast.expr(id).clone();
        let span = expr.span;
        match expr.kind {
            ExprKind::IntLit(_) => Some(self.t_int),
            ExprKind::FloatLit(_) => Some(self.t_float),
            ExprKind::StringLit(_) => Some(self.t_str),
            ExprKind::BoolLit(_) => Some(self.t_bool),
            ExprKind::NullLit => {
                let ty = self.ast.new_type(TypeKind::Pointer(self.t_void), span);
                Some(ty)
            }
            ExprKind::Ident(ref name) => match self.scopes.lookup(scope, name) {
                Some(sym) => Some(sym.ty),
                None => {
                    self.errors.push(TypeError::UndefinedIdentifier {
                        name: name.clone(),
                        span,
                    });
                    None
                }
            },
            ExprKind::Grouping(inner) => self.typecheck_expression(inner, scope),
            ExprKind::Binary { op, lhs, rhs } => self.check_binary(op, lhs, rhs, span, scope),
            ExprKind::Unary { op, operand } => self.check_unary(op, operand, span, scope),
            ExprKind::Assign { target, value } => self.check_assign(target, value, span, scope),
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                if let Some(ct) = self.typecheck_expression(cond, scope) {
                    self.require_bool(ct, self.ast.expr(cond).span);
                }
                let tt = self.typecheck_expression(then_expr, scope)?;
                let et = self.typecheck_expression(else_expr, scope)?;
                if self.types_match(tt, et) == TypeMatch::None {
                    self.errors.push(TypeError::TypeMismatch {
                        expected: self.display(tt),
                        found: self.display(et),
                        context: "ternary arms",
                        span,
                    });
                    return None;
                }
                Some(tt)
            }
            ExprKind::Member { base, ref field } => self.check_member(base, field, span, scope),
            ExprKind::Index { base, index } => {
                let bt = self.typecheck_expression(base, scope)?;
                if let Some(it) = self.typecheck_expression(index, scope) {
                    if self.basic_of(it) != Some(BasicType::Int) {
                        self.errors.push(TypeError::TypeMismatch {
                            expected: "int".to_string(),
                            found: self.display(it),
                            context: "index",
                            span: self.ast.expr(index).span,
                        });
                    }
                }
                match self.ast.ty(bt).kind {
                    TypeKind::Array { elem, .. } => Some(elem),
                    TypeKind::Pointer(pointee) => Some(pointee),
                    _ => {
                        self.errors.push(TypeError::NotIndexable {
                            found: self.display(bt),
                            span,
                        });
                        None
                    }
                }
            }
            ExprKind::ArrayLit { elems } => {
                let elems = self.ast.expr_list(elems).to_vec();
                if elems.is_empty() {
                    self.errors.push(TypeError::EmptyArrayLiteral { span });
                    return None;
                }
                let first = self.typecheck_expression(elems[0], scope)?;
                for &e in &elems[1..] {
                    if let Some(t) = self.typecheck_expression(e, scope) {
                        if self.types_match(first, t) == TypeMatch::None {
                            self.errors.push(TypeError::TypeMismatch {
                                expected: self.display(first),
                                found: self.display(t),
                                context: "array literal",
                                span: self.ast.expr(e).span,
                            });
                        }
                    }
                }
                let size = self
                    .ast
                    .new_expr(ExprKind::IntLit(elems.len() as i64), span);
                Some(self.ast.new_type(TypeKind::Array { elem: first, size }, span))
            }
            ExprKind::Call { callee, args } => self.check_call(callee, args, span, scope),
            ExprKind::Cast { ty, expr } => {
                self.typecheck_expression(expr, scope);
                Some(ty)
            }
            ExprKind::SizeOfType(_) => Some(self.t_int),
            ExprKind::SizeOfExpr(inner) => {
                self.typecheck_expression(inner, scope);
                Some(self.t_int)
            }
            ExprKind::Alloc { size } => {
                if let Some(st) = self.typecheck_expression(size, scope) {
                    if self.basic_of(st) != Some(BasicType::Int) {
                        self.errors.push(TypeError::TypeMismatch {
                            expected: "int".to_string(),
                            found: self.display(st),
                            context: "allocation size",
                            span,
                        });
                    }
                }
                Some(self.ast.new_type(TypeKind::Pointer(self.t_char), span))
            }
            ExprKind::Free { ptr } => {
                if let Some(pt) = self.typecheck_expression(ptr, scope) {
                    if !matches!(self.ast.ty(pt).kind, TypeKind::Pointer(_)) {
                        self.errors.push(TypeError::NotAPointer {
                            found: self.display(pt),
                            span,
                        });
                    }
                }
                Some(self.t_void)
            }
            ExprKind::Memcpy { dst, src, len } => {
                for ptr in [dst, src] {
                    if let Some(pt) = self.typecheck_expression(ptr, scope) {
                        if !matches!(self.ast.ty(pt).kind, TypeKind::Pointer(_)) {
                            self.errors.push(TypeError::NotAPointer {
                                found: self.display(pt),
                                span: self.ast.expr(ptr).span,
                            });
                        }
                    }
                }
                if let Some(lt) = self.typecheck_expression(len, scope) {
                    if self.basic_of(lt) != Some(BasicType::Int) {
                        self.errors.push(TypeError::TypeMismatch {
                            expected: "int".to_string(),
                            found: self.display(lt),
                            context: "memcpy length",
                            span: self.ast.expr(len).span,
                        });
                    }
                }
                Some(self.t_void)
            }
        }
    }

    fn check_binary(
        &mut self,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        span: Span,
        scope: ScopeId,
    ) -> Option<TypeId> {
        let lt = self.typecheck_expression(lhs, scope);
        let rt = self.typecheck_expression(rhs, scope);

        if op.is_logical() {
            // Operand types are deliberately unconstrained here.
            return Some(self.t_bool);
        }

        let lt = lt?;
        let rt = rt?;

        if op.is_arithmetic() {
            for (ty, side) in [(lt, lhs), (rt, rhs)] {
                if !self.is_numeric(ty) {
                    self.errors.push(TypeError::NonNumericOperand {
                        found: self.display(ty),
                        span: self.ast.expr(side).span,
                    });
                    return None;
                }
            }
            let result = match (self.basic_of(lt), self.basic_of(rt)) {
                (Some(BasicType::Double), _) | (_, Some(BasicType::Double)) => self.t_double,
                (Some(BasicType::Float), _) | (_, Some(BasicType::Float)) => self.t_float,
                _ => self.t_int,
            };
            return Some(result);
        }

        if op.is_comparison() {
            if !self.types_match(lt, rt).is_match() {
                self.errors.push(TypeError::TypeMismatch {
                    expected: self.display(lt),
                    found: self.display(rt),
                    context: "comparison",
                    span,
                });
                return None;
            }
            return Some(self.t_bool);
        }

        // Bitwise and shifts: int only.
        for (ty, side) in [(lt, lhs), (rt, rhs)] {
            if self.basic_of(ty) != Some(BasicType::Int) {
                self.errors.push(TypeError::NonIntegerOperand {
                    found: self.display(ty),
                    span: self.ast.expr(side).span,
                });
                return None;
            }
        }
        Some(self.t_int)
    }

    fn check_unary(
        &mut self,
        op: UnaryOp,
        operand: ExprId,
        span: Span,
        scope: ScopeId,
    ) -> Option<TypeId> {
        match op {
            UnaryOp::Neg | UnaryOp::Plus => {
                let ty = self.typecheck_expression(operand, scope)?;
                if !self.is_numeric(ty) {
                    self.errors.push(TypeError::NonNumericOperand {
                        found: self.display(ty),
                        span,
                    });
                    return None;
                }
                Some(ty)
            }
            UnaryOp::Not => {
                let ty = self.typecheck_expression(operand, scope)?;
                if self.types_match(self.t_bool, ty) != TypeMatch::Exact {
                    self.errors.push(TypeError::TypeMismatch {
                        expected: "bool".to_string(),
                        found: self.display(ty),
                        context: "operand of '!'",
                        span,
                    });
                    return None;
                }
                Some(self.t_bool)
            }
            UnaryOp::BitNot => {
                let ty = self.typecheck_expression(operand, scope)?;
                if self.basic_of(ty) != Some(BasicType::Int) {
                    self.errors.push(TypeError::NonIntegerOperand {
                        found: self.display(ty),
                        span,
                    });
                    return None;
                }
                Some(self.t_int)
            }
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                let ty = self.typecheck_expression(operand, scope)?;
                if !self.is_numeric(ty) {
                    self.errors.push(TypeError::NonNumericOperand {
                        found: self.display(ty),
                        span,
                    });
                    return None;
                }
                Some(ty)
            }
            UnaryOp::AddrOf => {
                if !self.is_lvalue(operand) {
                    self.errors.push(TypeError::NotAssignable { span });
                    return None;
                }
                let ty = self.typecheck_expression(operand, scope)?;
                Some(self.ast.new_type(TypeKind::Pointer(ty), span))
            }
            UnaryOp::Deref => {
                let ty = self.typecheck_expression(operand, scope)?;
                match self.ast.ty(ty).kind {
                    TypeKind::Pointer(pointee) => Some(pointee),
                    _ => {
                        self.errors.push(TypeError::NotAPointer {
                            found: self.display(ty),
                            span,
                        });
                        None
                    }
                }
            }
        }
    }

    /// An lvalue is an identifier, dereference, member access, or index
    /// (possibly parenthesised).
    fn is_lvalue(&self, expr: ExprId) -> bool {
        match &self.ast.expr(expr).kind {
            ExprKind::Ident(_)
            | ExprKind::Member { .. }
            | ExprKind::Index { .. } => true,
            ExprKind::Unary {
                op: UnaryOp::Deref, ..
            } => true,
            ExprKind::Grouping(inner) => self.is_lvalue(*inner),
            _ => false,
        }
    }

    fn check_assign(
        &mut self,
        target: ExprId,
        value: ExprId,
        span: Span,
        scope: ScopeId,
    ) -> Option<TypeId> {
        if !self.is_lvalue(target) {
            self.typecheck_expression(value, scope);
            self.errors.push(TypeError::NotAssignable { span });
            return None;
        }
        // Assigning to an immutable binding is refused at the identifier
        // level; derefs/members/indexes go through the value's type.
        if let ExprKind::Ident(name) = &self.ast.expr(target).kind {
            let name = name.clone();
            if let Some(sym) = self.scopes.lookup(scope, &name) {
                if !sym.is_mutable {
                    self.errors.push(TypeError::AssignToImmutable { name, span });
                }
            }
        }
        let target_ty = self.typecheck_expression(target, scope)?;
        let value_ty = self.typecheck_expression(value, scope)?;
        if self.types_match(target_ty, value_ty) == TypeMatch::None {
            self.errors.push(TypeError::TypeMismatch {
                expected: self.display(target_ty),
                found: self.display(value_ty),
                context: "assignment",
                span,
            });
            return None;
        }
        Some(target_ty)
    }

    /// Member access. An identifier base resolves against, in order: a
    /// module import alias (qualified lookup with visibility filtering),
    /// an enum (the synthesised `Enum.Member` symbol), then the base's own
    /// struct type.
    fn check_member(
        &mut self,
        base: ExprId,
        field: &str,
        span: Span,
        scope: ScopeId,
    ) -> Option<TypeId> {
        if let ExprKind::Ident(name) = &self.ast.expr(base).kind {
            let name = name.clone();
            if self.scopes.find_import(scope, &name).is_some() {
                return match self.scopes.lookup_qualified(scope, &name, field) {
                    Ok(sym) => Some(sym.ty),
                    Err(QualifiedLookupError::NotPublic) => {
                        let module = self
                            .scopes
                            .find_import(scope, &name)
                            .map(|i| i.module_name.clone())
                            .unwrap_or_default();
                        self.errors.push(TypeError::VisibilityViolation {
                            module,
                            name: field.to_string(),
                            span,
                        });
                        None
                    }
                    Err(_) => {
                        self.errors.push(TypeError::MemberMissing {
                            base: name,
                            member: field.to_string(),
                            span,
                        });
                        None
                    }
                };
            }
            if self.enum_names.contains(&name) {
                let qualified = format!("{name}.{field}");
                return match self.scopes.lookup(scope, &qualified) {
                    Some(sym) => Some(sym.ty),
                    None => {
                        self.errors.push(TypeError::MemberMissing {
                            base: name,
                            member: field.to_string(),
                            span,
                        });
                        None
                    }
                };
            }
        }

        // Struct field access through the base's type. Visibility of the
        // public/private field lists is stored but not enforced here.
        let bt = self.typecheck_expression(base, scope)?;
        if let TypeKind::Named(struct_name) = &self.ast.ty(bt).kind {
            let struct_name = struct_name.clone();
            if let Some(info) = self.structs.get(&struct_name) {
                if let Some((_, ty, _)) = info.fields.iter().find(|(n, _, _)| n == field) {
                    return Some(*ty);
                }
            }
            self.errors.push(TypeError::MemberMissing {
                base: struct_name,
                member: field.to_string(),
                span,
            });
            return None;
        }
        self.errors.push(TypeError::MemberMissing {
            base: self.display(bt),
            member: field.to_string(),
            span,
        });
        None
    }

    fn check_call(
        &mut self,
        callee: ExprId,
        args: lumen_common::arena::IdRange<lumen_parser::ast::Expr>,
        span: Span,
        scope: ScopeId,
    ) -> Option<TypeId> {
        // Resolve the callee to a function-typed symbol: either a plain
        // identifier or a module-qualified name.
        let (callee_name, fn_ty) = match self.ast.expr(callee).kind.clone() {
            ExprKind::Ident(name) => match self.scopes.lookup(scope, &name) {
                Some(sym) => (name, sym.ty),
                None => {
                    self.errors.push(TypeError::UndefinedIdentifier {
                        name,
                        span: self.ast.expr(callee).span,
                    });
                    return None;
                }
            },
            ExprKind::Member { base, field } => {
                let ty = self.check_member(base, &field, span, scope)?;
                (field, ty)
            }
            _ => {
                self.errors.push(TypeError::NotAFunction {
                    name: "expression".to_string(),
                    span,
                });
                return None;
            }
        };

        let TypeKind::Function { params, ret } = self.ast.ty(fn_ty).kind else {
            self.errors.push(TypeError::NotAFunction {
                name: callee_name,
                span,
            });
            return None;
        };

        let params = self.ast.type_list(params).to_vec();
        let args = self.ast.expr_list(args).to_vec();
        if params.len() != args.len() {
            self.errors.push(TypeError::WrongArgCount {
                callee: callee_name,
                expected: params.len(),
                found: args.len(),
                span,
            });
            return None;
        }
        for (param_ty, arg) in params.iter().zip(args.iter()) {
            if let Some(arg_ty) = self.typecheck_expression(*arg, scope) {
                if self.types_match(*param_ty, arg_ty) == TypeMatch::None {
                    self.errors.push(TypeError::TypeMismatch {
                        expected: self.display(*param_ty),
                        found: self.display(arg_ty),
                        context: "argument",
                        span: self.ast.expr(*arg).span,
                    });
                }
            }
        }
        Some(ret)
    }
}
