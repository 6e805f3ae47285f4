//! Statement emission.
//!
//! Covers module-level declarations (functions, globals, enum constants),
//! function shells with their cleanup/normal-return blocks, blocks with
//! deferred-statement frames, if chains, the three loop shapes, print, and
//! break/continue.

use inkwell::module::Linkage;
use inkwell::values::BasicValue;
use inkwell::AddressSpace;

use lumen_common::arena::IdRange;
use lumen_parser::ast::{ExprKind, Param, Stmt, StmtId, StmtKind, TypeId, Visibility};

use crate::error::CodegenError;

use super::types::{llvm_fn_type, LowTy};
use super::{CodeGen, Local, SymbolKind, UnitSymbol};

impl<'ctx> CodeGen<'ctx, '_> {
    // ── Module-level statements ──────────────────────────────────────

    /// Emit one statement of a module body (or a loose top-level item).
    pub(crate) fn emit_module_statement(&mut self, id: StmtId) -> Result<(), CodegenError> {
        let stmt = self.ast.stmt(id).clone();
        match stmt.kind {
            StmtKind::FnDecl {
                ref name,
                params,
                return_type,
                vis,
                body,
            } => self.emit_function(name, params, return_type, vis, body),
            StmtKind::VarDecl {
                ref name,
                vis,
                annotation,
                init,
                ..
            } => self.emit_global_var(name, vis, annotation, init),
            StmtKind::EnumDecl { ref name, vis, ref members } => {
                self.register_enum(name, vis, members);
                Ok(())
            }
            // Struct layouts are opaque to lowering; visibility and field
            // lists live in the type checker.
            StmtKind::StructDecl { .. } => Ok(()),
            // Imports were resolved during checking; linkage is by name.
            StmtKind::Use { .. } => Ok(()),
            StmtKind::Module { .. } => self.lower_nested_module(id),
            other => Err(CodegenError::Unsupported(format!(
                "statement at module scope: {other:?}"
            ))),
        }
    }

    fn lower_nested_module(&mut self, id: StmtId) -> Result<(), CodegenError> {
        // A module directive inside another module body behaves like a
        // top-level one.
        let StmtKind::Module { name, body } = self.ast.stmt(id).kind.clone() else {
            unreachable!("caller matched a module directive");
        };
        let saved = self.current_unit;
        self.current_unit = self.get_or_create_unit(&name);
        for stmt in self.ast.stmt_list(body).to_vec() {
            self.emit_module_statement(stmt)?;
        }
        self.current_unit = saved;
        Ok(())
    }

    /// Enum members lower to `int` constants named `Enum.Member`, in
    /// declaration order. The enum name itself is a zero constant so a
    /// bare reference still has a value.
    fn register_enum(&mut self, name: &str, vis: Visibility, members: &[String]) {
        let public = vis.is_public();
        let i64_ty = self.context.i64_type();
        self.units[self.current_unit].symbols.push(UnitSymbol {
            name: name.to_string(),
            is_public: public,
            kind: SymbolKind::Const {
                value: i64_ty.const_zero().into(),
                ty: LowTy::Int,
            },
        });
        for (index, member) in members.iter().enumerate() {
            self.units[self.current_unit].symbols.push(UnitSymbol {
                name: format!("{name}.{member}"),
                is_public: public,
                kind: SymbolKind::Const {
                    value: i64_ty.const_int(index as u64, false).into(),
                    ty: LowTy::Int,
                },
            });
        }
    }

    /// A module-level variable becomes an LLVM global with linkage from its
    /// visibility, initialised with the evaluated literal constant or zero.
    fn emit_global_var(
        &mut self,
        name: &str,
        vis: Visibility,
        annotation: Option<TypeId>,
        init: Option<lumen_parser::ast::ExprId>,
    ) -> Result<(), CodegenError> {
        let low = match annotation {
            Some(ty) => self.lower(ty),
            None => match init.map(|e| &self.ast.expr(e).kind) {
                Some(ExprKind::IntLit(_)) => LowTy::Int,
                Some(ExprKind::FloatLit(_)) => LowTy::Float,
                Some(ExprKind::BoolLit(_)) => LowTy::Bool,
                Some(ExprKind::StringLit(_)) => LowTy::Str,
                _ => {
                    return Err(CodegenError::Unsupported(format!(
                        "module global '{name}' needs an annotation or literal initialiser"
                    )))
                }
            },
        };
        let llvm_ty = self.basic_ty(&low)?;
        let global = self.module().add_global(llvm_ty, None, name);
        if !vis.is_public() {
            global.set_linkage(Linkage::Internal);
        }

        let initializer = match init.map(|e| self.ast.expr(e).kind.clone()) {
            Some(ExprKind::IntLit(v)) => match low {
                LowTy::Float | LowTy::Double => {
                    let ft = self.basic_ty(&low)?.into_float_type();
                    ft.const_float(v as f64).as_basic_value_enum()
                }
                _ => self.context.i64_type().const_int(v as u64, true).as_basic_value_enum(),
            },
            Some(ExprKind::FloatLit(v)) => {
                let ft = self.basic_ty(&low)?.into_float_type();
                ft.const_float(v).as_basic_value_enum()
            }
            Some(ExprKind::BoolLit(b)) => self
                .context
                .bool_type()
                .const_int(b as u64, false)
                .as_basic_value_enum(),
            _ => llvm_ty.const_zero(),
        };
        global.set_initializer(&initializer);

        self.units[self.current_unit].symbols.push(UnitSymbol {
            name: name.to_string(),
            is_public: vis.is_public(),
            kind: SymbolKind::Global { value: global, ty: low },
        });
        Ok(())
    }

    // ── Function emission ────────────────────────────────────────────

    /// Declare and emit one function.
    ///
    /// Layout: an `entry` block with parameter slots, the body, then a
    /// dedicated `cleanup` block replaying the function-level deferred
    /// frame, and a `ret` block producing `ret void` or a zero value. A
    /// body that falls through branches into cleanup.
    pub(crate) fn emit_function(
        &mut self,
        name: &str,
        params: IdRange<Param>,
        return_type: TypeId,
        vis: Visibility,
        body: StmtId,
    ) -> Result<(), CodegenError> {
        let params_vec = self.ast.params(params).to_vec();
        let param_lows: Vec<LowTy> = params_vec.iter().map(|p| self.lower(p.ty)).collect();
        let ret_low = self.lower(return_type);
        let fn_type = llvm_fn_type(self.context, &param_lows, &ret_low);

        // Linkage derives from visibility; `main` is always external.
        let public = vis.is_public() || name == "main";
        let linkage = if public { None } else { Some(Linkage::Internal) };
        let fn_val = self.module().add_function(name, fn_type, linkage);

        // Record in the symbol table before the body so recursion resolves.
        self.units[self.current_unit].symbols.push(UnitSymbol {
            name: name.to_string(),
            is_public: public,
            kind: SymbolKind::Function {
                value: fn_val,
                fn_type,
                params: param_lows.clone(),
                ret: ret_low.clone(),
            },
        });
        if name == "main" {
            self.units[self.current_unit].is_entry = true;
        }

        let saved_fn = self.current_fn.replace(fn_val);
        let saved_locals = std::mem::take(&mut self.locals);
        let saved_frames = std::mem::replace(&mut self.defer_frames, vec![Vec::new()]);
        let saved_ret = std::mem::replace(&mut self.current_ret, ret_low.clone());
        let saved_continue = self.continue_block.take();
        let saved_break = self.break_block.take();
        let saved_block = self.builder.get_insert_block();

        let entry = self.context.append_basic_block(fn_val, "entry");
        self.builder.position_at_end(entry);

        // A stack slot per parameter, storing the incoming argument.
        for (i, (param, low)) in params_vec.iter().zip(param_lows.iter()).enumerate() {
            let llvm_ty = self.basic_ty(low)?;
            let slot = self.builder.build_alloca(llvm_ty, &param.name)?;
            let arg = fn_val.get_nth_param(i as u32).ok_or_else(|| {
                CodegenError::InvalidProgram(format!("missing parameter {i} for '{name}'"))
            })?;
            self.builder.build_store(slot, arg)?;
            self.locals.insert(
                param.name.clone(),
                Local {
                    ptr: slot,
                    ty: low.clone(),
                },
            );
        }

        // The body's statements run directly in the function-level defer
        // frame so its defers reach the cleanup block.
        match &self.ast.stmt(body).kind {
            StmtKind::Block { stmts } => {
                for stmt in self.ast.stmt_list(*stmts).to_vec() {
                    if self.block_terminated() {
                        break;
                    }
                    self.emit_statement(stmt)?;
                }
            }
            _ => self.emit_statement(body)?,
        }

        let cleanup = self.context.append_basic_block(fn_val, "cleanup");
        let ret_block = self.context.append_basic_block(fn_val, "ret");
        if !self.block_terminated() {
            self.builder.build_unconditional_branch(cleanup)?;
        }

        self.builder.position_at_end(cleanup);
        let frame: Vec<StmtId> = self.defer_frames.first().cloned().unwrap_or_default();
        self.replay_defers(&frame)?;
        self.builder.build_unconditional_branch(ret_block)?;

        self.builder.position_at_end(ret_block);
        match &ret_low {
            LowTy::Void => {
                self.builder.build_return(None)?;
            }
            other => {
                let zero = self.basic_ty(other)?.const_zero();
                self.builder.build_return(Some(&zero))?;
            }
        }

        self.current_fn = saved_fn;
        self.locals = saved_locals;
        self.defer_frames = saved_frames;
        self.current_ret = saved_ret;
        self.continue_block = saved_continue;
        self.break_block = saved_break;
        if let Some(block) = saved_block {
            self.builder.position_at_end(block);
        }
        Ok(())
    }

    // ── Deferred statements ──────────────────────────────────────────

    /// All defers currently pending, outermost frame first.
    pub(crate) fn pending_defers(&self) -> Vec<StmtId> {
        self.defer_frames.iter().flatten().copied().collect()
    }

    /// Replay deferred statements in LIFO order. Each replayed statement
    /// runs with a fresh sub-frame so defers nested inside a deferred
    /// statement unwind too.
    pub(crate) fn replay_defers(&mut self, stmts: &[StmtId]) -> Result<(), CodegenError> {
        for &stmt in stmts.iter().rev() {
            self.defer_frames.push(Vec::new());
            self.emit_statement(stmt)?;
            let frame = self.defer_frames.pop().unwrap_or_default();
            if !frame.is_empty() {
                self.replay_defers(&frame)?;
            }
        }
        Ok(())
    }

    // ── Function-body statements ─────────────────────────────────────

    pub(crate) fn emit_statement(&mut self, id: StmtId) -> Result<(), CodegenError> {
        let stmt: Stmt = self.ast.stmt(id).clone();
        match stmt.kind {
            StmtKind::ExprStmt(expr) => {
                self.emit_expr(expr)?;
                Ok(())
            }
            StmtKind::VarDecl {
                ref name,
                annotation,
                init,
                ..
            } => self.emit_local_var(name, annotation, init),
            StmtKind::FnDecl {
                ref name,
                params,
                return_type,
                vis,
                body,
            } => self.emit_function(name, params, return_type, vis, body),
            StmtKind::EnumDecl { ref name, vis, ref members } => {
                self.register_enum(name, vis, members);
                Ok(())
            }
            StmtKind::StructDecl { .. } => Ok(()),
            StmtKind::If {
                cond,
                then_branch,
                elifs,
                else_branch,
            } => self.emit_if(cond, then_branch, elifs, else_branch),
            StmtKind::Loop { init, cond, incr, body } => self.emit_loop(init, cond, incr, body),
            StmtKind::Return { value } => self.emit_return(value),
            StmtKind::Block { stmts } => {
                // A fresh defer frame per block; block-local defers replay
                // inline at the block's normal exit.
                self.defer_frames.push(Vec::new());
                for stmt in self.ast.stmt_list(stmts).to_vec() {
                    if self.block_terminated() {
                        break;
                    }
                    self.emit_statement(stmt)?;
                }
                let frame = self.defer_frames.pop().unwrap_or_default();
                if !self.block_terminated() {
                    self.replay_defers(&frame)?;
                }
                Ok(())
            }
            StmtKind::Print { args, newline } => self.emit_print(args, newline),
            StmtKind::Break => match self.break_block {
                Some(target) => {
                    self.builder.build_unconditional_branch(target)?;
                    Ok(())
                }
                None => Err(CodegenError::InvalidProgram(
                    "'break' outside of a loop".to_string(),
                )),
            },
            StmtKind::Continue => match self.continue_block {
                Some(target) => {
                    self.builder.build_unconditional_branch(target)?;
                    Ok(())
                }
                None => Err(CodegenError::InvalidProgram(
                    "'continue' outside of a loop".to_string(),
                )),
            },
            StmtKind::Defer { stmt } => {
                self.defer_frames
                    .last_mut()
                    .expect("a defer frame is always open inside a function")
                    .push(stmt);
                Ok(())
            }
            StmtKind::Program { .. } | StmtKind::Module { .. } | StmtKind::Use { .. } => {
                Err(CodegenError::InvalidProgram(
                    "directive nested in a function body".to_string(),
                ))
            }
        }
    }

    fn emit_local_var(
        &mut self,
        name: &str,
        annotation: Option<TypeId>,
        init: Option<lumen_parser::ast::ExprId>,
    ) -> Result<(), CodegenError> {
        let emitted = match init {
            Some(e) => Some(self.emit_expr(e)?),
            None => None,
        };
        let low = match annotation {
            Some(ty) => self.lower(ty),
            None => {
                emitted
                    .as_ref()
                    .map(|e| e.ty.clone())
                    .ok_or_else(|| {
                        CodegenError::InvalidProgram(format!("'{name}' has no type"))
                    })?
            }
        };
        let llvm_ty = self.basic_ty(&low)?;
        let slot = self.builder.build_alloca(llvm_ty, name)?;
        if let Some(e) = emitted {
            let value = e.expect_value()?;
            let coerced = self.coerce(value, &e.ty, &low)?;
            self.builder.build_store(slot, coerced)?;
        }
        self.locals.insert(
            name.to_string(),
            Local {
                ptr: slot,
                ty: low,
            },
        );
        Ok(())
    }

    /// Return: with pending defers the value is parked in a stack slot,
    /// the defers replay in LIFO order, and the value is reloaded for the
    /// terminating return.
    fn emit_return(
        &mut self,
        value: Option<lumen_parser::ast::ExprId>,
    ) -> Result<(), CodegenError> {
        let emitted = match value {
            Some(e) => {
                let e = self.emit_expr(e)?;
                let raw = e.expect_value()?;
                let ret_ty = self.current_ret.clone();
                Some(self.coerce(raw, &e.ty, &ret_ty)?)
            }
            None => None,
        };

        let pending = self.pending_defers();
        if pending.is_empty() {
            match emitted {
                Some(v) => self.builder.build_return(Some(&v))?,
                None => self.builder.build_return(None)?,
            };
            return Ok(());
        }

        match emitted {
            Some(v) => {
                let slot = self.builder.build_alloca(v.get_type(), "ret_tmp")?;
                self.builder.build_store(slot, v)?;
                self.replay_defers(&pending)?;
                let loaded = self.builder.build_load(v.get_type(), slot, "ret_val")?;
                self.builder.build_return(Some(&loaded))?;
            }
            None => {
                self.replay_defers(&pending)?;
                self.builder.build_return(None)?;
            }
        }
        Ok(())
    }

    // ── Control flow ─────────────────────────────────────────────────

    fn emit_if(
        &mut self,
        cond: lumen_parser::ast::ExprId,
        then_branch: StmtId,
        elifs: IdRange<lumen_parser::ast::ElifArm>,
        else_branch: Option<StmtId>,
    ) -> Result<(), CodegenError> {
        let fn_val = self.current_function()?;
        let merge = self.context.append_basic_block(fn_val, "if_merge");

        let mut arms = vec![(cond, then_branch)];
        for arm in self.ast.elifs(elifs).to_vec() {
            arms.push((arm.cond, arm.body));
        }

        let n = arms.len();
        for (i, (arm_cond, arm_body)) in arms.into_iter().enumerate() {
            let last = i + 1 == n;
            let cond_val = self.emit_condition(arm_cond)?;
            let then_bb = self.context.append_basic_block(fn_val, "then");
            let else_bb = if !last {
                self.context.append_basic_block(fn_val, "elif")
            } else if else_branch.is_some() {
                self.context.append_basic_block(fn_val, "else")
            } else {
                merge
            };
            self.builder.build_conditional_branch(cond_val, then_bb, else_bb)?;

            self.builder.position_at_end(then_bb);
            self.emit_statement(arm_body)?;
            if !self.block_terminated() {
                self.builder.build_unconditional_branch(merge)?;
            }

            self.builder.position_at_end(else_bb);
            if last {
                if let Some(else_stmt) = else_branch {
                    self.emit_statement(else_stmt)?;
                    if !self.block_terminated() {
                        self.builder.build_unconditional_branch(merge)?;
                    }
                    self.builder.position_at_end(merge);
                }
                // Without an else, else_bb IS merge and we are positioned.
            }
        }
        Ok(())
    }

    /// The three loop shapes, selected by which fields are populated.
    fn emit_loop(
        &mut self,
        init: IdRange<Stmt>,
        cond: Option<lumen_parser::ast::ExprId>,
        incr: Option<lumen_parser::ast::ExprId>,
        body: StmtId,
    ) -> Result<(), CodegenError> {
        let fn_val = self.current_function()?;
        let saved_continue = self.continue_block;
        let saved_break = self.break_block;

        match cond {
            // Infinite: a single block that branches back to itself.
            None => {
                let loop_bb = self.context.append_basic_block(fn_val, "loop");
                let after = self.context.append_basic_block(fn_val, "after_loop");
                self.builder.build_unconditional_branch(loop_bb)?;
                self.builder.position_at_end(loop_bb);
                self.continue_block = Some(loop_bb);
                self.break_block = Some(after);
                self.emit_statement(body)?;
                if !self.block_terminated() {
                    self.builder.build_unconditional_branch(loop_bb)?;
                }
                self.builder.position_at_end(after);
            }
            // While-like: condition/body/after; the body falls through to
            // the optional increment, then back to the condition.
            Some(cond) if init.is_empty() => {
                let cond_bb = self.context.append_basic_block(fn_val, "loop_cond");
                let body_bb = self.context.append_basic_block(fn_val, "loop_body");
                let after = self.context.append_basic_block(fn_val, "after_loop");
                self.builder.build_unconditional_branch(cond_bb)?;

                self.builder.position_at_end(cond_bb);
                let cond_val = self.emit_condition(cond)?;
                self.builder.build_conditional_branch(cond_val, body_bb, after)?;

                self.continue_block = Some(cond_bb);
                self.break_block = Some(after);
                self.builder.position_at_end(body_bb);
                self.emit_statement(body)?;
                if !self.block_terminated() {
                    if let Some(incr) = incr {
                        self.emit_expr(incr)?;
                    }
                    self.builder.build_unconditional_branch(cond_bb)?;
                }
                self.builder.position_at_end(after);
            }
            // For-like: initialiser/condition/body/increment/after;
            // continue targets the increment block.
            Some(cond) => {
                let init_bb = self.context.append_basic_block(fn_val, "loop_init");
                let cond_bb = self.context.append_basic_block(fn_val, "loop_cond");
                let body_bb = self.context.append_basic_block(fn_val, "loop_body");
                let incr_bb = self.context.append_basic_block(fn_val, "loop_incr");
                let after = self.context.append_basic_block(fn_val, "after_loop");

                self.builder.build_unconditional_branch(init_bb)?;
                self.builder.position_at_end(init_bb);
                for stmt in self.ast.stmt_list(init).to_vec() {
                    self.emit_statement(stmt)?;
                }
                self.builder.build_unconditional_branch(cond_bb)?;

                self.builder.position_at_end(cond_bb);
                let cond_val = self.emit_condition(cond)?;
                self.builder.build_conditional_branch(cond_val, body_bb, after)?;

                self.continue_block = Some(incr_bb);
                self.break_block = Some(after);
                self.builder.position_at_end(body_bb);
                self.emit_statement(body)?;
                if !self.block_terminated() {
                    self.builder.build_unconditional_branch(incr_bb)?;
                }

                self.builder.position_at_end(incr_bb);
                if let Some(incr) = incr {
                    self.emit_expr(incr)?;
                }
                self.builder.build_unconditional_branch(cond_bb)?;

                self.builder.position_at_end(after);
            }
        }

        self.continue_block = saved_continue;
        self.break_block = saved_break;
        Ok(())
    }

    // ── Print ────────────────────────────────────────────────────────

    /// Lower `output`/`outputln` to `printf` calls, one per argument, with
    /// the format selected from the argument's lowered type.
    fn emit_print(
        &mut self,
        args: IdRange<lumen_parser::ast::Expr>,
        newline: bool,
    ) -> Result<(), CodegenError> {
        let printf = self.printf_fn();
        for arg in self.ast.expr_list(args).to_vec() {
            let emitted = self.emit_expr(arg)?;
            let value = emitted.expect_value()?;
            let (fmt, promoted) = match &emitted.ty {
                LowTy::Str => ("%s", value),
                LowTy::Int | LowTy::Named(_) => ("%lld", value),
                // Sub-32-bit integers promote to i32 for varargs.
                LowTy::Bool => {
                    let iv = value.into_int_value();
                    let widened = self.builder.build_int_z_extend(
                        iv,
                        self.context.i32_type(),
                        "arg_promote",
                    )?;
                    ("%d", widened.into())
                }
                LowTy::Char => {
                    let iv = value.into_int_value();
                    let widened = self.builder.build_int_s_extend(
                        iv,
                        self.context.i32_type(),
                        "arg_promote",
                    )?;
                    ("%d", widened.into())
                }
                // f32 promotes to double for varargs.
                LowTy::Float => {
                    let fv = value.into_float_value();
                    let widened = self.builder.build_float_ext(
                        fv,
                        self.context.f64_type(),
                        "arg_promote",
                    )?;
                    ("%f", widened.into())
                }
                LowTy::Double => ("%f", value),
                LowTy::Ptr(_) | LowTy::OpaqueArray => ("%p", value),
                LowTy::Void => {
                    return Err(CodegenError::Unsupported(
                        "cannot print a void value".to_string(),
                    ))
                }
            };
            let fmt_ptr = self.intern_cstring(fmt);
            self.builder
                .build_call(printf, &[fmt_ptr.into(), promoted.into()], "")?;
        }
        if newline {
            let nl = self.intern_cstring("\n");
            self.builder.build_call(printf, &[nl.into()], "")?;
        }
        Ok(())
    }

    // ── Lazily declared externals ────────────────────────────────────

    fn runtime_fn(
        &self,
        name: &str,
        ty: inkwell::types::FunctionType<'ctx>,
    ) -> inkwell::values::FunctionValue<'ctx> {
        match self.module().get_function(name) {
            Some(f) => f,
            None => self.module().add_function(name, ty, Some(Linkage::External)),
        }
    }

    /// `i32 printf(ptr, ...)`, declared once per module on first use.
    pub(crate) fn printf_fn(&self) -> inkwell::values::FunctionValue<'ctx> {
        let ptr = self.context.ptr_type(AddressSpace::default());
        let ty = self.context.i32_type().fn_type(&[ptr.into()], true);
        self.runtime_fn("printf", ty)
    }

    /// `ptr malloc(i64)`.
    pub(crate) fn malloc_fn(&self) -> inkwell::values::FunctionValue<'ctx> {
        let ptr = self.context.ptr_type(AddressSpace::default());
        let ty = ptr.fn_type(&[self.context.i64_type().into()], false);
        self.runtime_fn("malloc", ty)
    }

    /// `void free(ptr)`.
    pub(crate) fn free_fn(&self) -> inkwell::values::FunctionValue<'ctx> {
        let ptr = self.context.ptr_type(AddressSpace::default());
        let ty = self.context.void_type().fn_type(&[ptr.into()], false);
        self.runtime_fn("free", ty)
    }

    /// `ptr memcpy(ptr, ptr, i64)`.
    pub(crate) fn memcpy_fn(&self) -> inkwell::values::FunctionValue<'ctx> {
        let ptr = self.context.ptr_type(AddressSpace::default());
        let ty = ptr.fn_type(
            &[ptr.into(), ptr.into(), self.context.i64_type().into()],
            false,
        );
        self.runtime_fn("memcpy", ty)
    }

    /// Intern a C string as a private constant global, returning its
    /// address.
    pub(crate) fn intern_cstring(&mut self, s: &str) -> inkwell::values::PointerValue<'ctx> {
        self.intern_cbytes(s.as_bytes())
    }
}
