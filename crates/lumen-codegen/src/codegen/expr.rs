//! Expression emission.
//!
//! `emit_expr` returns the produced value together with its lowered type;
//! void-producing expressions (free, memcpy, void calls) carry no value.
//! Integer arithmetic and comparisons are signed; `&&`/`||` short-circuit
//! through a phi; assignment handles identifier and dereference targets.

use inkwell::module::Linkage;
use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, FunctionValue, IntValue, PointerValue};
use inkwell::{AddressSpace, FloatPredicate, IntPredicate};

use lumen_common::arena::IdRange;
use lumen_parser::ast::{BinaryOp, Expr, ExprId, ExprKind, UnaryOp};

use crate::error::CodegenError;

use super::types::LowTy;
use super::{CodeGen, SymbolKind};

/// A value produced by expression emission, tagged with its lowered type.
pub(crate) struct Emitted<'ctx> {
    pub value: Option<BasicValueEnum<'ctx>>,
    pub ty: LowTy,
}

impl<'ctx> Emitted<'ctx> {
    pub(crate) fn new(value: BasicValueEnum<'ctx>, ty: LowTy) -> Self {
        Self {
            value: Some(value),
            ty,
        }
    }

    pub(crate) fn void() -> Self {
        Self {
            value: None,
            ty: LowTy::Void,
        }
    }

    pub(crate) fn expect_value(&self) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        self.value.ok_or_else(|| {
            CodegenError::InvalidProgram("a value-producing expression was expected".to_string())
        })
    }
}

impl<'ctx> CodeGen<'ctx, '_> {
    pub(crate) fn emit_expr(&mut self, id: ExprId) -> Result<Emitted<'ctx>, CodegenError> {
        let expr = self.ast.expr(id).clone();
        match expr.kind {
            ExprKind::IntLit(v) => Ok(Emitted::new(
                self.context.i64_type().const_int(v as u64, true).into(),
                LowTy::Int,
            )),
            ExprKind::FloatLit(v) => Ok(Emitted::new(
                self.context.f32_type().const_float(v).into(),
                LowTy::Float,
            )),
            ExprKind::BoolLit(b) => Ok(Emitted::new(
                self.context.bool_type().const_int(b as u64, false).into(),
                LowTy::Bool,
            )),
            ExprKind::NullLit => Ok(Emitted::new(
                self.context.ptr_type(AddressSpace::default()).const_null().into(),
                LowTy::Ptr(Box::new(LowTy::Void)),
            )),
            ExprKind::StringLit(ref body) => {
                let bytes = process_escapes(body);
                let ptr = self.intern_cbytes(&bytes);
                Ok(Emitted::new(ptr.into(), LowTy::Str))
            }
            ExprKind::Ident(ref name) => self.emit_ident(name),
            ExprKind::Grouping(inner) => self.emit_expr(inner),
            ExprKind::Binary { op, lhs, rhs } => self.emit_binary(op, lhs, rhs),
            ExprKind::Unary { op, operand } => self.emit_unary(op, operand),
            ExprKind::Assign { target, value } => {
                let (ptr, target_ty) = self.lvalue_address(target)?;
                let emitted = self.emit_expr(value)?;
                let raw = emitted.expect_value()?;
                let coerced = self.coerce(raw, &emitted.ty, &target_ty)?;
                self.builder.build_store(ptr, coerced)?;
                Ok(Emitted::new(coerced, target_ty))
            }
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => self.emit_ternary(cond, then_expr, else_expr),
            ExprKind::Member { base, ref field } => self.emit_member(base, field),
            ExprKind::Call { callee, args } => self.emit_call(callee, args),
            ExprKind::Cast { ty, expr } => {
                let target = self.lower(ty);
                let emitted = self.emit_expr(expr)?;
                let raw = emitted.expect_value()?;
                let cast = self.emit_cast(raw, &emitted.ty, &target)?;
                Ok(Emitted::new(cast, target))
            }
            ExprKind::SizeOfType(ty) => {
                let low = self.lower(ty);
                self.emit_sizeof(&low)
            }
            ExprKind::SizeOfExpr(inner) => {
                let emitted = self.emit_expr(inner)?;
                self.emit_sizeof(&emitted.ty)
            }
            ExprKind::Alloc { size } => {
                let malloc = self.malloc_fn();
                let emitted = self.emit_expr(size)?;
                let size_val = emitted.expect_value()?;
                let call = self.builder.build_call(malloc, &[size_val.into()], "alloc")?;
                let ptr = call.try_as_basic_value().left().ok_or_else(|| {
                    CodegenError::InvalidProgram("malloc returned no value".to_string())
                })?;
                Ok(Emitted::new(ptr, LowTy::Ptr(Box::new(LowTy::Char))))
            }
            ExprKind::Free { ptr } => {
                let free = self.free_fn();
                let emitted = self.emit_expr(ptr)?;
                let ptr_val = emitted.expect_value()?;
                self.builder.build_call(free, &[ptr_val.into()], "")?;
                Ok(Emitted::void())
            }
            ExprKind::Memcpy { dst, src, len } => {
                let memcpy = self.memcpy_fn();
                let dst = self.emit_expr(dst)?.expect_value()?;
                let src = self.emit_expr(src)?.expect_value()?;
                let len = self.emit_expr(len)?.expect_value()?;
                self.builder
                    .build_call(memcpy, &[dst.into(), src.into(), len.into()], "memcpy")?;
                Ok(Emitted::void())
            }
            ExprKind::ArrayLit { .. } | ExprKind::Index { .. } => Err(CodegenError::Unsupported(
                "arrays are opaque to lowering".to_string(),
            )),
        }
    }

    // ── Identifiers and symbols ──────────────────────────────────────

    /// Variables load from their stack slot or global; enum constants are
    /// immediate; a bare function name yields its code address.
    fn emit_ident(&mut self, name: &str) -> Result<Emitted<'ctx>, CodegenError> {
        if let Some(local) = self.locals.get(name) {
            let ty = local.ty.clone();
            let ptr = local.ptr;
            let llvm_ty = self.basic_ty(&ty)?;
            let value = self.builder.build_load(llvm_ty, ptr, name)?;
            return Ok(Emitted::new(value, ty));
        }
        if let Some(sym) = self.unit().find(name) {
            match &sym.kind {
                SymbolKind::Const { value, ty } => {
                    return Ok(Emitted::new(*value, ty.clone()));
                }
                SymbolKind::Global { value, ty } => {
                    let ty = ty.clone();
                    let ptr = value.as_pointer_value();
                    let llvm_ty = self.basic_ty(&ty)?;
                    let loaded = self.builder.build_load(llvm_ty, ptr, name)?;
                    return Ok(Emitted::new(loaded, ty));
                }
                SymbolKind::Function { value, .. } => {
                    let ptr = value.as_global_value().as_pointer_value();
                    return Ok(Emitted::new(ptr.into(), LowTy::Ptr(Box::new(LowTy::Void))));
                }
            }
        }
        Err(CodegenError::MissingSymbol(name.to_string()))
    }

    /// The address of an lvalue: an alloca or global for identifiers, the
    /// inner pointer for `*p` (so `&*p` is `p` itself).
    pub(crate) fn lvalue_address(
        &mut self,
        expr: ExprId,
    ) -> Result<(PointerValue<'ctx>, LowTy), CodegenError> {
        match self.ast.expr(expr).kind.clone() {
            ExprKind::Ident(name) => {
                if let Some(local) = self.locals.get(&name) {
                    return Ok((local.ptr, local.ty.clone()));
                }
                if let Some(sym) = self.unit().find(&name) {
                    if let SymbolKind::Global { value, ty } = &sym.kind {
                        return Ok((value.as_pointer_value(), ty.clone()));
                    }
                }
                Err(CodegenError::MissingSymbol(name))
            }
            ExprKind::Grouping(inner) => self.lvalue_address(inner),
            ExprKind::Unary {
                op: UnaryOp::Deref,
                operand,
            } => {
                let emitted = self.emit_expr(operand)?;
                let LowTy::Ptr(pointee) = emitted.ty else {
                    return Err(CodegenError::InvalidProgram(
                        "dereferenced a non-pointer".to_string(),
                    ));
                };
                let ptr = emitted
                    .value
                    .ok_or_else(|| {
                        CodegenError::InvalidProgram("pointer expression has no value".to_string())
                    })?
                    .into_pointer_value();
                Ok((ptr, *pointee))
            }
            other => Err(CodegenError::Unsupported(format!(
                "assignment target: {other:?}"
            ))),
        }
    }

    // ── Operators ────────────────────────────────────────────────────

    fn emit_binary(
        &mut self,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    ) -> Result<Emitted<'ctx>, CodegenError> {
        if op.is_logical() {
            return self.emit_logical(op == BinaryOp::And, lhs, rhs);
        }

        let l = self.emit_expr(lhs)?;
        let r = self.emit_expr(rhs)?;
        let lv = l.expect_value()?;
        let rv = r.expect_value()?;

        if op.is_bitwise() {
            let (li, ri) = (lv.into_int_value(), rv.into_int_value());
            let result: IntValue<'ctx> = match op {
                BinaryOp::BitAnd => self.builder.build_and(li, ri, "and")?,
                BinaryOp::BitOr => self.builder.build_or(li, ri, "or")?,
                BinaryOp::BitXor => self.builder.build_xor(li, ri, "xor")?,
                BinaryOp::Shl => self.builder.build_left_shift(li, ri, "shl")?,
                BinaryOp::Shr => self.builder.build_right_shift(li, ri, true, "shr")?,
                _ => unreachable!("is_bitwise covers exactly these"),
            };
            return Ok(Emitted::new(result.into(), LowTy::Int));
        }

        // Pointer comparison goes through ptrtoint.
        if l.ty.is_pointer() && r.ty.is_pointer() && op.is_comparison() {
            let i64_ty = self.context.i64_type();
            let li = self
                .builder
                .build_ptr_to_int(lv.into_pointer_value(), i64_ty, "lhs_addr")?;
            let ri = self
                .builder
                .build_ptr_to_int(rv.into_pointer_value(), i64_ty, "rhs_addr")?;
            let result = self
                .builder
                .build_int_compare(int_predicate(op), li, ri, "cmp")?;
            return Ok(Emitted::new(result.into(), LowTy::Bool));
        }

        // Mixed int/float operands promote to the float side.
        if l.ty.is_float() || r.ty.is_float() {
            let wide = if l.ty == LowTy::Double || r.ty == LowTy::Double {
                LowTy::Double
            } else {
                LowTy::Float
            };
            let lf = self.to_float(lv, &l.ty, &wide)?;
            let rf = self.to_float(rv, &r.ty, &wide)?;
            if op.is_comparison() {
                let result =
                    self.builder
                        .build_float_compare(float_predicate(op), lf, rf, "fcmp")?;
                return Ok(Emitted::new(result.into(), LowTy::Bool));
            }
            let result = match op {
                BinaryOp::Add => self.builder.build_float_add(lf, rf, "fadd")?,
                BinaryOp::Sub => self.builder.build_float_sub(lf, rf, "fsub")?,
                BinaryOp::Mul => self.builder.build_float_mul(lf, rf, "fmul")?,
                BinaryOp::Div => self.builder.build_float_div(lf, rf, "fdiv")?,
                BinaryOp::Mod => self.builder.build_float_rem(lf, rf, "frem")?,
                _ => unreachable!("comparisons handled above"),
            };
            return Ok(Emitted::new(result.into(), wide));
        }

        // Signed integer arithmetic and comparisons by default.
        let (li, ri) = (lv.into_int_value(), rv.into_int_value());
        if op.is_comparison() {
            let result = self
                .builder
                .build_int_compare(int_predicate(op), li, ri, "cmp")?;
            return Ok(Emitted::new(result.into(), LowTy::Bool));
        }
        let result = match op {
            BinaryOp::Add => self.builder.build_int_add(li, ri, "add")?,
            BinaryOp::Sub => self.builder.build_int_sub(li, ri, "sub")?,
            BinaryOp::Mul => self.builder.build_int_mul(li, ri, "mul")?,
            BinaryOp::Div => self.builder.build_int_signed_div(li, ri, "div")?,
            BinaryOp::Mod => self.builder.build_int_signed_rem(li, ri, "mod")?,
            _ => unreachable!("all binary operator groups handled"),
        };
        Ok(Emitted::new(result.into(), LowTy::Int))
    }

    /// Short-circuiting `&&` / `||` with a phi at the merge.
    fn emit_logical(
        &mut self,
        is_and: bool,
        lhs: ExprId,
        rhs: ExprId,
    ) -> Result<Emitted<'ctx>, CodegenError> {
        let fn_val = self.current_function()?;
        let (rhs_name, merge_name) = if is_and {
            ("and_rhs", "and_merge")
        } else {
            ("or_rhs", "or_merge")
        };

        let l = self.emit_expr(lhs)?;
        let lv = self.to_bool(&l)?;
        let lhs_end = self
            .builder
            .get_insert_block()
            .expect("builder is positioned inside a function");

        let rhs_bb = self.context.append_basic_block(fn_val, rhs_name);
        let merge_bb = self.context.append_basic_block(fn_val, merge_name);
        if is_and {
            self.builder.build_conditional_branch(lv, rhs_bb, merge_bb)?;
        } else {
            self.builder.build_conditional_branch(lv, merge_bb, rhs_bb)?;
        }

        self.builder.position_at_end(rhs_bb);
        let r = self.emit_expr(rhs)?;
        let rv = self.to_bool(&r)?;
        let rhs_end = self
            .builder
            .get_insert_block()
            .expect("builder is positioned inside a function");
        self.builder.build_unconditional_branch(merge_bb)?;

        self.builder.position_at_end(merge_bb);
        let phi = self.builder.build_phi(self.context.bool_type(), "logical")?;
        let short_circuit = self.context.bool_type().const_int(!is_and as u64, false);
        phi.add_incoming(&[(&short_circuit, lhs_end), (&rv, rhs_end)]);
        Ok(Emitted::new(phi.as_basic_value(), LowTy::Bool))
    }

    fn emit_unary(&mut self, op: UnaryOp, operand: ExprId) -> Result<Emitted<'ctx>, CodegenError> {
        match op {
            UnaryOp::Neg => {
                let emitted = self.emit_expr(operand)?;
                let value = emitted.expect_value()?;
                if emitted.ty.is_float() {
                    let neg = self.builder.build_float_neg(value.into_float_value(), "fneg")?;
                    Ok(Emitted::new(neg.into(), emitted.ty))
                } else {
                    let neg = self.builder.build_int_neg(value.into_int_value(), "neg")?;
                    Ok(Emitted::new(neg.into(), emitted.ty))
                }
            }
            UnaryOp::Plus => self.emit_expr(operand),
            UnaryOp::Not => {
                let emitted = self.emit_expr(operand)?;
                let b = self.to_bool(&emitted)?;
                let inverted = self.builder.build_not(b, "not")?;
                Ok(Emitted::new(inverted.into(), LowTy::Bool))
            }
            UnaryOp::BitNot => {
                let emitted = self.emit_expr(operand)?;
                let value = emitted.expect_value()?.into_int_value();
                let flipped = self.builder.build_not(value, "bnot")?;
                Ok(Emitted::new(flipped.into(), LowTy::Int))
            }
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                self.emit_incdec(op, operand)
            }
            UnaryOp::AddrOf => {
                let (ptr, pointee) = self.lvalue_address(operand)?;
                Ok(Emitted::new(ptr.into(), LowTy::Ptr(Box::new(pointee))))
            }
            UnaryOp::Deref => {
                let emitted = self.emit_expr(operand)?;
                let LowTy::Ptr(pointee) = emitted.ty else {
                    return Err(CodegenError::InvalidProgram(
                        "dereferenced a non-pointer".to_string(),
                    ));
                };
                let ptr = emitted.expect_value()?.into_pointer_value();
                let llvm_ty = self.basic_ty(&pointee)?;
                let value = self.builder.build_load(llvm_ty, ptr, "deref")?;
                Ok(Emitted::new(value, *pointee))
            }
        }
    }

    /// `++`/`--`: load, adjust by one, store back; the result is the old
    /// value for the postfix forms and the new value for the prefix forms.
    fn emit_incdec(&mut self, op: UnaryOp, operand: ExprId) -> Result<Emitted<'ctx>, CodegenError> {
        let (ptr, ty) = self.lvalue_address(operand)?;
        let llvm_ty = self.basic_ty(&ty)?;
        let old = self.builder.build_load(llvm_ty, ptr, "old")?;
        let increment = matches!(op, UnaryOp::PreInc | UnaryOp::PostInc);

        let new: BasicValueEnum<'ctx> = if ty.is_float() {
            let one = llvm_ty.into_float_type().const_float(1.0);
            let fv = old.into_float_value();
            if increment {
                self.builder.build_float_add(fv, one, "inc")?.into()
            } else {
                self.builder.build_float_sub(fv, one, "dec")?.into()
            }
        } else {
            let one = llvm_ty.into_int_type().const_int(1, false);
            let iv = old.into_int_value();
            if increment {
                self.builder.build_int_add(iv, one, "inc")?.into()
            } else {
                self.builder.build_int_sub(iv, one, "dec")?.into()
            }
        };
        self.builder.build_store(ptr, new)?;

        let result = match op {
            UnaryOp::PostInc | UnaryOp::PostDec => old,
            _ => new,
        };
        Ok(Emitted::new(result, ty))
    }

    fn emit_ternary(
        &mut self,
        cond: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    ) -> Result<Emitted<'ctx>, CodegenError> {
        let fn_val = self.current_function()?;
        let cond_val = self.emit_condition(cond)?;

        let then_bb = self.context.append_basic_block(fn_val, "tern_then");
        let else_bb = self.context.append_basic_block(fn_val, "tern_else");
        let merge_bb = self.context.append_basic_block(fn_val, "tern_merge");
        self.builder.build_conditional_branch(cond_val, then_bb, else_bb)?;

        self.builder.position_at_end(then_bb);
        let t = self.emit_expr(then_expr)?;
        let tv = t.expect_value()?;
        let then_end = self
            .builder
            .get_insert_block()
            .expect("builder is positioned inside a function");
        self.builder.build_unconditional_branch(merge_bb)?;

        self.builder.position_at_end(else_bb);
        let e = self.emit_expr(else_expr)?;
        let ev_raw = e.expect_value()?;
        let ev = self.coerce(ev_raw, &e.ty, &t.ty)?;
        let else_end = self
            .builder
            .get_insert_block()
            .expect("builder is positioned inside a function");
        self.builder.build_unconditional_branch(merge_bb)?;

        self.builder.position_at_end(merge_bb);
        let phi = self.builder.build_phi(tv.get_type(), "tern")?;
        phi.add_incoming(&[(&tv, then_end), (&ev, else_end)]);
        Ok(Emitted::new(phi.as_basic_value(), t.ty))
    }

    // ── Members and calls ────────────────────────────────────────────

    /// Member reads: enum constants (`Color.Red`), and module-qualified
    /// constants or functions through an import alias. Struct field loads
    /// are opaque to lowering, like arrays.
    fn emit_member(&mut self, base: ExprId, field: &str) -> Result<Emitted<'ctx>, CodegenError> {
        let ExprKind::Ident(base_name) = self.ast.expr(base).kind.clone() else {
            return Err(CodegenError::Unsupported(
                "member access on a non-identifier base".to_string(),
            ));
        };

        // Enum constant in the current unit, then anywhere.
        let qualified = format!("{base_name}.{field}");
        if let Some(emitted) = self.find_constant(&qualified) {
            return Ok(emitted);
        }
        // Module-qualified constant (`alias.CONST`) by plain name.
        if let Some(emitted) = self.find_constant(field) {
            return Ok(emitted);
        }
        // Module-qualified function used as a value.
        if let Ok((fn_val, _, _)) = self.resolve_function(field) {
            let ptr = fn_val.as_global_value().as_pointer_value();
            return Ok(Emitted::new(ptr.into(), LowTy::Ptr(Box::new(LowTy::Void))));
        }
        Err(CodegenError::MissingSymbol(qualified))
    }

    fn find_constant(&self, name: &str) -> Option<Emitted<'ctx>> {
        let current = &self.units[self.current_unit];
        let mut candidates = vec![current];
        candidates.extend(
            self.units
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != self.current_unit)
                .map(|(_, u)| u),
        );
        for (index, unit) in candidates.iter().enumerate() {
            if let Some(sym) = unit.find(name) {
                let cross_module = index != 0;
                if cross_module && !sym.is_public {
                    continue;
                }
                if let SymbolKind::Const { value, ty } = &sym.kind {
                    return Some(Emitted::new(*value, ty.clone()));
                }
            }
        }
        None
    }

    /// Resolve a callee name: the current unit's symbol table first, then
    /// public functions of the other units (adding a declaration to the
    /// current module on first cross-module use).
    pub(crate) fn resolve_function(
        &self,
        name: &str,
    ) -> Result<(FunctionValue<'ctx>, Vec<LowTy>, LowTy), CodegenError> {
        if let Some(sym) = self.unit().find(name) {
            if let SymbolKind::Function {
                value, params, ret, ..
            } = &sym.kind
            {
                return Ok((*value, params.clone(), ret.clone()));
            }
        }
        for (i, unit) in self.units.iter().enumerate() {
            if i == self.current_unit {
                continue;
            }
            if let Some(sym) = unit.find(name) {
                if !sym.is_public {
                    continue;
                }
                if let SymbolKind::Function {
                    fn_type,
                    params,
                    ret,
                    ..
                } = &sym.kind
                {
                    let declared = match self.module().get_function(name) {
                        Some(f) => f,
                        None => self
                            .module()
                            .add_function(name, *fn_type, Some(Linkage::External)),
                    };
                    return Ok((declared, params.clone(), ret.clone()));
                }
            }
        }
        Err(CodegenError::MissingSymbol(name.to_string()))
    }

    fn emit_call(
        &mut self,
        callee: ExprId,
        args: IdRange<Expr>,
    ) -> Result<Emitted<'ctx>, CodegenError> {
        let name = match self.ast.expr(callee).kind.clone() {
            ExprKind::Ident(name) => name,
            ExprKind::Member { field, .. } => field,
            other => {
                return Err(CodegenError::Unsupported(format!(
                    "indirect call through {other:?}"
                )))
            }
        };
        let (fn_val, params, ret) = self.resolve_function(&name)?;

        let mut call_args: Vec<BasicMetadataValueEnum<'ctx>> = Vec::new();
        for (arg, param_ty) in self.ast.expr_list(args).to_vec().into_iter().zip(params.iter()) {
            let emitted = self.emit_expr(arg)?;
            let raw = emitted.expect_value()?;
            let coerced = self.coerce(raw, &emitted.ty, param_ty)?;
            call_args.push(coerced.into());
        }

        let call_name = if ret.is_void() { "" } else { "call" };
        let call = self.builder.build_call(fn_val, &call_args, call_name)?;
        match call.try_as_basic_value().left() {
            Some(value) => Ok(Emitted::new(value, ret)),
            None => Ok(Emitted::void()),
        }
    }

    // ── Casts, sizes, conversions ────────────────────────────────────

    /// Cast dispatch by source/target kind: int<->float, integer width
    /// changes, f32<->f64, pointer<->pointer, int<->pointer, and a bitcast
    /// fallback.
    fn emit_cast(
        &mut self,
        value: BasicValueEnum<'ctx>,
        from: &LowTy,
        to: &LowTy,
    ) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        if from == to {
            return Ok(value);
        }
        let target_ty = self.basic_ty(to)?;
        let cast = match (from, to) {
            (f, t) if f.is_integer() && t.is_float() => self
                .builder
                .build_signed_int_to_float(
                    value.into_int_value(),
                    target_ty.into_float_type(),
                    "itof",
                )?
                .into(),
            (f, t) if f.is_float() && t.is_integer() => self
                .builder
                .build_float_to_signed_int(
                    value.into_float_value(),
                    target_ty.into_int_type(),
                    "ftoi",
                )?
                .into(),
            (f, t) if f.is_integer() && t.is_integer() => self
                .builder
                .build_int_cast(value.into_int_value(), target_ty.into_int_type(), "icast")?
                .into(),
            (LowTy::Float, LowTy::Double) => self
                .builder
                .build_float_ext(
                    value.into_float_value(),
                    target_ty.into_float_type(),
                    "fext",
                )?
                .into(),
            (LowTy::Double, LowTy::Float) => self
                .builder
                .build_float_trunc(
                    value.into_float_value(),
                    target_ty.into_float_type(),
                    "ftrunc",
                )?
                .into(),
            (f, t) if f.is_pointer() && t.is_pointer() => value,
            (f, t) if f.is_integer() && t.is_pointer() => self
                .builder
                .build_int_to_ptr(
                    value.into_int_value(),
                    target_ty.into_pointer_type(),
                    "itop",
                )?
                .into(),
            (f, t) if f.is_pointer() && t.is_integer() => self
                .builder
                .build_ptr_to_int(
                    value.into_pointer_value(),
                    target_ty.into_int_type(),
                    "ptoi",
                )?
                .into(),
            _ => self.builder.build_bit_cast(value, target_ty, "bitcast")?,
        };
        Ok(cast)
    }

    /// Implicit conversion for `int` <-> `float` compatibility (used by
    /// assignment, argument, and return coercion).
    pub(crate) fn coerce(
        &mut self,
        value: BasicValueEnum<'ctx>,
        from: &LowTy,
        to: &LowTy,
    ) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        if from == to {
            return Ok(value);
        }
        match (from, to) {
            (f, t) if f.is_integer() && t.is_float() => {
                let ft = self.basic_ty(to)?.into_float_type();
                Ok(self
                    .builder
                    .build_signed_int_to_float(value.into_int_value(), ft, "coerce")?
                    .into())
            }
            (f, t) if f.is_float() && t.is_integer() => {
                let it = self.basic_ty(to)?.into_int_type();
                Ok(self
                    .builder
                    .build_float_to_signed_int(value.into_float_value(), it, "coerce")?
                    .into())
            }
            (LowTy::Float, LowTy::Double) => {
                let ft = self.context.f64_type();
                Ok(self
                    .builder
                    .build_float_ext(value.into_float_value(), ft, "coerce")?
                    .into())
            }
            (LowTy::Double, LowTy::Float) => {
                let ft = self.context.f32_type();
                Ok(self
                    .builder
                    .build_float_trunc(value.into_float_value(), ft, "coerce")?
                    .into())
            }
            _ => Ok(value),
        }
    }

    fn to_float(
        &mut self,
        value: BasicValueEnum<'ctx>,
        from: &LowTy,
        to: &LowTy,
    ) -> Result<inkwell::values::FloatValue<'ctx>, CodegenError> {
        Ok(self.coerce(value, from, to)?.into_float_value())
    }

    /// `sizeof` through the target-aware type size query.
    fn emit_sizeof(&mut self, ty: &LowTy) -> Result<Emitted<'ctx>, CodegenError> {
        let size: IntValue<'ctx> = match ty {
            LowTy::Void => self.context.i64_type().const_zero(),
            other => {
                let llvm_ty = self.basic_ty(other)?;
                llvm_ty.size_of().ok_or_else(|| {
                    CodegenError::Unsupported("type has no size".to_string())
                })?
            }
        };
        let widened = self
            .builder
            .build_int_cast(size, self.context.i64_type(), "size")?;
        Ok(Emitted::new(widened.into(), LowTy::Int))
    }

    // ── Truthiness ───────────────────────────────────────────────────

    /// Emit an expression and reduce it to an i1.
    pub(crate) fn emit_condition(&mut self, expr: ExprId) -> Result<IntValue<'ctx>, CodegenError> {
        let emitted = self.emit_expr(expr)?;
        self.to_bool(&emitted)
    }

    pub(crate) fn to_bool(&mut self, emitted: &Emitted<'ctx>) -> Result<IntValue<'ctx>, CodegenError> {
        let value = emitted.expect_value()?;
        match &emitted.ty {
            LowTy::Bool => Ok(value.into_int_value()),
            ty if ty.is_integer() => {
                let iv = value.into_int_value();
                let zero = iv.get_type().const_zero();
                Ok(self
                    .builder
                    .build_int_compare(IntPredicate::NE, iv, zero, "truthy")?)
            }
            ty if ty.is_float() => {
                let fv = value.into_float_value();
                let zero = fv.get_type().const_zero();
                Ok(self
                    .builder
                    .build_float_compare(FloatPredicate::ONE, fv, zero, "truthy")?)
            }
            ty if ty.is_pointer() => Ok(self
                .builder
                .build_is_not_null(value.into_pointer_value(), "truthy")?),
            _ => Err(CodegenError::Unsupported(
                "void used in condition position".to_string(),
            )),
        }
    }

    /// Intern raw bytes as a NUL-terminated constant global.
    pub(crate) fn intern_cbytes(&mut self, bytes: &[u8]) -> PointerValue<'ctx> {
        let data = self.context.const_string(bytes, true);
        let name = format!(".str.{}", self.str_counter);
        self.str_counter += 1;
        let global = self.module().add_global(data.get_type(), None, &name);
        global.set_initializer(&data);
        global.set_constant(true);
        global.set_linkage(Linkage::Private);
        global.set_unnamed_addr(true);
        global.as_pointer_value()
    }
}

/// Process string escape sequences at lowering time: `\n`, `\r`, `\t`,
/// `\\`, `\"`, `\0`; anything else after a backslash is preserved verbatim.
pub(crate) fn process_escapes(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('r') => out.push(b'\r'),
            Some('t') => out.push(b'\t'),
            Some('\\') => out.push(b'\\'),
            Some('"') => out.push(b'"'),
            Some('0') => out.push(0),
            Some(other) => {
                out.push(b'\\');
                let mut buf = [0u8; 4];
                out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => out.push(b'\\'),
        }
    }
    out
}

fn int_predicate(op: BinaryOp) -> IntPredicate {
    match op {
        BinaryOp::Eq => IntPredicate::EQ,
        BinaryOp::NotEq => IntPredicate::NE,
        BinaryOp::Lt => IntPredicate::SLT,
        BinaryOp::LtEq => IntPredicate::SLE,
        BinaryOp::Gt => IntPredicate::SGT,
        BinaryOp::GtEq => IntPredicate::SGE,
        _ => unreachable!("not a comparison operator"),
    }
}

fn float_predicate(op: BinaryOp) -> FloatPredicate {
    match op {
        BinaryOp::Eq => FloatPredicate::OEQ,
        BinaryOp::NotEq => FloatPredicate::ONE,
        BinaryOp::Lt => FloatPredicate::OLT,
        BinaryOp::LtEq => FloatPredicate::OLE,
        BinaryOp::Gt => FloatPredicate::OGT,
        BinaryOp::GtEq => FloatPredicate::OGE,
        _ => unreachable!("not a comparison operator"),
    }
}
