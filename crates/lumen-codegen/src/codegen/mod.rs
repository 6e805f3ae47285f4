//! LLVM IR generation from the type-checked AST.
//!
//! One [`CompileUnit`] is created per `@module` directive (top-level
//! statements outside any module land in a default `main` unit). Each unit
//! owns its LLVM module and symbol table; cross-module calls are resolved
//! by re-declaring public functions with external linkage, leaving the
//! final joins to the platform linker.
//!
//! ## Architecture
//!
//! - [`CodeGen`]: codegen context holding the LLVM context, builder,
//!   target machine, units, and per-function state
//! - [`types`]: surface type to LLVM type mapping
//! - [`stmt`]: statement emission (functions, control flow, defer)
//! - [`expr`]: expression emission

pub mod expr;
pub mod stmt;
pub mod types;

use std::path::{Path, PathBuf};

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::targets::{
    CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine, TargetTriple,
};
use inkwell::types::FunctionType;
use inkwell::values::{BasicValueEnum, FunctionValue, GlobalValue, PointerValue};
use inkwell::OptimizationLevel;
use rustc_hash::FxHashMap;

use lumen_parser::ast::{Ast, StmtId, StmtKind};

use crate::error::CodegenError;

use self::types::{llvm_basic_type, LowTy};

// ── Compilation units ────────────────────────────────────────────────

/// A per-module record: the LLVM module handle, its own symbol table, and
/// the entry-module flag.
pub(crate) struct CompileUnit<'ctx> {
    pub name: String,
    pub module: Module<'ctx>,
    pub symbols: Vec<UnitSymbol<'ctx>>,
    pub is_entry: bool,
}

impl<'ctx> CompileUnit<'ctx> {
    fn new(name: &str, module: Module<'ctx>) -> Self {
        Self {
            name: name.to_string(),
            module,
            symbols: Vec::new(),
            is_entry: false,
        }
    }

    pub(crate) fn find(&self, name: &str) -> Option<&UnitSymbol<'ctx>> {
        self.symbols.iter().find(|s| s.name == name)
    }
}

/// One symbol table entry: name, IR value, lowered type, function flag.
pub(crate) struct UnitSymbol<'ctx> {
    pub name: String,
    pub kind: SymbolKind<'ctx>,
    pub is_public: bool,
}

pub(crate) enum SymbolKind<'ctx> {
    Function {
        value: FunctionValue<'ctx>,
        fn_type: FunctionType<'ctx>,
        params: Vec<LowTy>,
        ret: LowTy,
    },
    Global {
        value: GlobalValue<'ctx>,
        ty: LowTy,
    },
    Const {
        value: BasicValueEnum<'ctx>,
        ty: LowTy,
    },
}

impl UnitSymbol<'_> {
    pub(crate) fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function { .. })
    }
}

/// A function-local variable slot.
pub(crate) struct Local<'ctx> {
    pub ptr: PointerValue<'ctx>,
    pub ty: LowTy,
}

// ── CodeGen ──────────────────────────────────────────────────────────

/// The code generation context.
pub struct CodeGen<'ctx, 'a> {
    pub(crate) context: &'ctx Context,
    pub(crate) builder: Builder<'ctx>,
    pub(crate) target_machine: TargetMachine,
    pub(crate) ast: &'a Ast,

    pub(crate) units: Vec<CompileUnit<'ctx>>,
    pub(crate) current_unit: usize,

    // ── Per-function state ───────────────────────────────────────────
    pub(crate) current_fn: Option<FunctionValue<'ctx>>,
    pub(crate) locals: FxHashMap<String, Local<'ctx>>,
    pub(crate) continue_block: Option<BasicBlock<'ctx>>,
    pub(crate) break_block: Option<BasicBlock<'ctx>>,
    /// Stack of deferred-statement frames: one frame per open block, the
    /// bottom frame belonging to the function body.
    pub(crate) defer_frames: Vec<Vec<StmtId>>,
    /// Return type of the function currently being emitted.
    pub(crate) current_ret: LowTy,
    /// Unique suffix for interned string globals.
    pub(crate) str_counter: u32,
}

impl<'ctx, 'a> CodeGen<'ctx, 'a> {
    /// Create a codegen context targeting the host (or an explicit triple)
    /// with position-independent relocation and the small code model.
    pub fn new(
        context: &'ctx Context,
        ast: &'a Ast,
        target_triple: Option<&str>,
    ) -> Result<Self, CodegenError> {
        Target::initialize_native(&InitializationConfig::default())
            .map_err(|e| CodegenError::Target(format!("failed to initialize native target: {e}")))?;

        let triple = match target_triple {
            Some(triple_str) => TargetTriple::create(triple_str),
            None => TargetMachine::get_default_triple(),
        };
        let target = Target::from_triple(&triple)
            .map_err(|e| CodegenError::Target(format!("invalid target triple '{triple}': {e}")))?;
        let target_machine = target
            .create_target_machine(
                &triple,
                "generic",
                "",
                OptimizationLevel::None,
                RelocMode::PIC,
                CodeModel::Small,
            )
            .ok_or_else(|| {
                CodegenError::Target(format!("failed to create target machine for '{triple}'"))
            })?;

        Ok(Self {
            context,
            builder: context.create_builder(),
            target_machine,
            ast,
            units: Vec::new(),
            current_unit: 0,
            current_fn: None,
            locals: FxHashMap::default(),
            continue_block: None,
            break_block: None,
            defer_frames: Vec::new(),
            current_ret: LowTy::Void,
            str_counter: 0,
        })
    }

    // ── Unit management ──────────────────────────────────────────────

    pub(crate) fn unit(&self) -> &CompileUnit<'ctx> {
        &self.units[self.current_unit]
    }

    pub(crate) fn module(&self) -> &Module<'ctx> {
        &self.units[self.current_unit].module
    }

    fn get_or_create_unit(&mut self, name: &str) -> usize {
        if let Some(i) = self.units.iter().position(|u| u.name == name) {
            return i;
        }
        let module = self.context.create_module(name);
        self.units.push(CompileUnit::new(name, module));
        self.units.len() - 1
    }

    /// The name of the unit containing `main`, if any.
    pub fn entry_module(&self) -> Option<&str> {
        self.units
            .iter()
            .find(|u| u.is_entry)
            .map(|u| u.name.as_str())
    }

    /// The textual IR of a unit (for tests).
    pub fn get_llvm_ir(&self, unit_name: &str) -> Option<String> {
        self.units
            .iter()
            .find(|u| u.name == unit_name)
            .map(|u| u.module.print_to_string().to_string())
    }

    // ── The module pass ──────────────────────────────────────────────

    /// Walk the program's top-level items: each `@module` directive gets a
    /// compilation unit; loose statements land in the default `main` unit.
    pub fn lower_program(&mut self, root: StmtId) -> Result<(), CodegenError> {
        let StmtKind::Program { items } = &self.ast.stmt(root).kind else {
            return Err(CodegenError::InvalidProgram(
                "lowering expects a program root".to_string(),
            ));
        };
        for item in self.ast.stmt_list(*items).to_vec() {
            self.lower_top_level(item)?;
        }
        Ok(())
    }

    fn lower_top_level(&mut self, item: StmtId) -> Result<(), CodegenError> {
        match &self.ast.stmt(item).kind {
            StmtKind::Module { name, body } => {
                let name = name.clone();
                let body = *body;
                let saved = self.current_unit;
                self.current_unit = self.get_or_create_unit(&name);
                for stmt in self.ast.stmt_list(body).to_vec() {
                    self.emit_module_statement(stmt)?;
                }
                self.current_unit = saved;
                Ok(())
            }
            _ => {
                self.current_unit = self.get_or_create_unit("main");
                self.emit_module_statement(item)
            }
        }
    }

    // ── Cross-module declarations and emission ───────────────────────

    /// For every unit, re-declare each *public* function of every other
    /// unit that the module does not already name, with external linkage.
    /// This satisfies cross-module calls at link time.
    fn declare_cross_module_functions(&self) {
        for (i, unit) in self.units.iter().enumerate() {
            let mut pending: Vec<(&str, FunctionType<'ctx>)> = Vec::new();
            for (j, other) in self.units.iter().enumerate() {
                if i == j {
                    continue;
                }
                for sym in &other.symbols {
                    if !sym.is_public || !sym.is_function() {
                        continue;
                    }
                    if let SymbolKind::Function { fn_type, .. } = &sym.kind {
                        if unit.module.get_function(&sym.name).is_none()
                            && unit.find(&sym.name).is_none()
                        {
                            pending.push((&sym.name, *fn_type));
                        }
                    }
                }
            }
            for (name, fn_type) in pending {
                unit.module.add_function(name, fn_type, Some(Linkage::External));
            }
        }
    }

    /// Verify every unit and write `<out_dir>/<module>.o` (plus `.ll` when
    /// `save_ir` is set). Creates the output directory (0755) if missing.
    pub fn emit_objects(
        &self,
        out_dir: &Path,
        save_ir: bool,
    ) -> Result<Vec<PathBuf>, CodegenError> {
        self.declare_cross_module_functions();

        create_output_dir(out_dir)?;

        let triple = self.target_machine.get_triple();
        let target_data = self.target_machine.get_target_data();
        let mut written = Vec::new();
        for unit in &self.units {
            unit.module.set_triple(&triple);
            unit.module.set_data_layout(&target_data.get_data_layout());
            unit.module.verify().map_err(|e| CodegenError::Verify {
                module: unit.name.clone(),
                message: e.to_string(),
            })?;

            if save_ir {
                let ll_path = out_dir.join(format!("{}.ll", unit.name));
                unit.module
                    .print_to_file(&ll_path)
                    .map_err(|e| CodegenError::Emit(e.to_string()))?;
            }

            let obj_path = out_dir.join(format!("{}.o", unit.name));
            self.target_machine
                .write_to_file(&unit.module, FileType::Object, &obj_path)
                .map_err(|e| CodegenError::Emit(e.to_string()))?;
            written.push(obj_path);
        }
        Ok(written)
    }

    // ── Shared helpers ───────────────────────────────────────────────

    pub(crate) fn lower(&self, ty: lumen_parser::ast::TypeId) -> LowTy {
        types::lower_type(self.ast, ty)
    }

    /// The `BasicTypeEnum` for a lowered type, erroring on `void` (which
    /// only makes sense in return position).
    pub(crate) fn basic_ty(
        &self,
        ty: &LowTy,
    ) -> Result<inkwell::types::BasicTypeEnum<'ctx>, CodegenError> {
        llvm_basic_type(self.context, ty).ok_or_else(|| {
            CodegenError::Unsupported("void has no value representation".to_string())
        })
    }

    /// Whether the block currently under the builder already ends in a
    /// terminator.
    pub(crate) fn block_terminated(&self) -> bool {
        self.builder
            .get_insert_block()
            .is_some_and(|b| b.get_terminator().is_some())
    }

    pub(crate) fn current_function(&self) -> Result<FunctionValue<'ctx>, CodegenError> {
        self.current_fn.ok_or_else(|| {
            CodegenError::InvalidProgram("statement emitted outside a function".to_string())
        })
    }
}

fn create_output_dir(out_dir: &Path) -> Result<(), CodegenError> {
    if out_dir.exists() {
        return Ok(());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o755)
            .create(out_dir)
            .map_err(|e| CodegenError::Emit(format!("cannot create {}: {e}", out_dir.display())))
    }
    #[cfg(not(unix))]
    {
        std::fs::create_dir_all(out_dir)
            .map_err(|e| CodegenError::Emit(format!("cannot create {}: {e}", out_dir.display())))
    }
}
