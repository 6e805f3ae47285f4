//! Lumen code generation: LLVM lowering and per-module object emission.
//!
//! The type-checked AST is walked once per `@module` directive into its own
//! LLVM module (compilation unit). Cross-module calls resolve through
//! external declarations; the platform linker joins the emitted objects
//! downstream.

pub mod codegen;
pub mod error;

pub use codegen::CodeGen;
pub use error::CodegenError;

use std::path::{Path, PathBuf};

use inkwell::context::Context;
use lumen_parser::ast::{Ast, StmtId};

/// Lower a type-checked program and write `<out_dir>/<module>.o` for every
/// compilation unit (plus `<module>.ll` when `save_ir` is set). Returns the
/// written object paths.
pub fn compile_to_objects(
    ast: &Ast,
    root: StmtId,
    out_dir: &Path,
    save_ir: bool,
    target_triple: Option<&str>,
) -> Result<Vec<PathBuf>, CodegenError> {
    let context = Context::create();
    let mut codegen = CodeGen::new(&context, ast, target_triple)?;
    codegen.lower_program(root)?;
    codegen.emit_objects(out_dir, save_ir)
}

/// Lower a program and return `(module name, textual IR)` per unit, without
/// touching the filesystem. Used by tests and IR inspection.
pub fn compile_to_ir(ast: &Ast, root: StmtId) -> Result<Vec<(String, String)>, CodegenError> {
    let context = Context::create();
    let mut codegen = CodeGen::new(&context, ast, None)?;
    codegen.lower_program(root)?;
    Ok(codegen
        .units
        .iter()
        .map(|u| (u.name.clone(), u.module.print_to_string().to_string()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_common::diagnostics::DiagnosticSink;

    /// Parse, type-check, and lower, returning per-unit IR.
    fn lower(source: &str) -> Vec<(String, String)> {
        let mut sink = DiagnosticSink::new();
        let parse = lumen_parser::parse(source, "test.lum", &mut sink);
        assert!(!sink.has_errors(), "parse: {:?}", sink.records());
        let mut ast = parse.ast;
        let root = parse.root.expect("program root");
        let typeck = lumen_typeck::check(&mut ast, root);
        assert!(typeck.success(), "typeck: {:?}", typeck.errors);
        compile_to_ir(&ast, root).expect("lowering should succeed")
    }

    fn unit_ir<'a>(units: &'a [(String, String)], name: &str) -> &'a str {
        units
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ir)| ir.as_str())
            .unwrap_or_else(|| panic!("no unit named {name}"))
    }

    #[test]
    fn hello_module_defines_main_and_calls_printf() {
        let units = lower("@module main { fn main() int { outputln(\"hi\"); return 0; } }");
        assert_eq!(units.len(), 1);
        let ir = unit_ir(&units, "main");
        assert!(ir.contains("define i64 @main"), "{ir}");
        assert!(ir.contains("declare i32 @printf"), "{ir}");
        assert!(ir.contains("hi\\00"), "{ir}");
    }

    #[test]
    fn loose_statements_land_in_a_default_main_unit() {
        let units = lower("fn main() int { return 0; }");
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].0, "main");
    }

    #[test]
    fn private_functions_get_internal_linkage() {
        let units = lower("@module m { priv fn helper() int { return 1; } }");
        let ir = unit_ir(&units, "m");
        assert!(ir.contains("define internal i64 @helper"), "{ir}");
    }

    #[test]
    fn public_cross_module_call_declares_the_callee() {
        let units = lower(
            "@module util { pub fn add(a int, b int) int { return a + b; } }\n\
             @module main { @use util; fn main() int { return util.add(1, 2); } }",
        );
        assert_eq!(units.len(), 2);
        let util_ir = unit_ir(&units, "util");
        assert!(util_ir.contains("define i64 @add"), "{util_ir}");
        let main_ir = unit_ir(&units, "main");
        assert!(main_ir.contains("declare i64 @add"), "{main_ir}");
        assert!(main_ir.contains("call i64 @add"), "{main_ir}");
    }

    #[test]
    fn defers_replay_in_reverse_order_before_return() {
        let units = lower(
            "fn f() void { defer output(\"A\"); defer output(\"B\"); return; }\n\
             fn main() int { return 0; }",
        );
        let ir = unit_ir(&units, "main");
        // "B" is interned first because it replays first.
        let b_at = ir.find("B\\00").expect("B literal present");
        let a_at = ir.find("A\\00").expect("A literal present");
        assert!(b_at < a_at, "defer order wrong:\n{ir}");
        assert!(ir.contains("cleanup:"), "{ir}");
        assert!(ir.contains("ret void"), "{ir}");
    }

    #[test]
    fn infinite_loop_shape() {
        let units = lower("fn main() int { loop { break; } return 0; }");
        let ir = unit_ir(&units, "main");
        assert!(ir.contains("loop:"), "{ir}");
        assert!(ir.contains("after_loop:"), "{ir}");
    }

    #[test]
    fn while_like_loop_shape() {
        let units = lower(
            "fn main() int { let i int = 0; loop (i < 10) : (i++) { } return i; }",
        );
        let ir = unit_ir(&units, "main");
        assert!(ir.contains("loop_cond:"), "{ir}");
        assert!(ir.contains("loop_body:"), "{ir}");
        assert!(!ir.contains("loop_incr:"), "{ir}");
    }

    #[test]
    fn for_like_loop_shape() {
        let units = lower(
            "fn main() int { loop [let i int = 0;] (i < 10) : (i++) { output(i); } return 0; }",
        );
        let ir = unit_ir(&units, "main");
        assert!(ir.contains("loop_init:"), "{ir}");
        assert!(ir.contains("loop_cond:"), "{ir}");
        assert!(ir.contains("loop_incr:"), "{ir}");
        assert!(ir.contains("after_loop:"), "{ir}");
    }

    #[test]
    fn alloc_and_free_declare_the_c_allocator() {
        let units = lower("fn main() int { let p = alloc(16); free(p); return 0; }");
        let ir = unit_ir(&units, "main");
        assert!(ir.contains("declare ptr @malloc"), "{ir}");
        assert!(ir.contains("declare void @free"), "{ir}");
    }

    #[test]
    fn enum_members_are_integer_constants() {
        let units = lower(
            "enum Color { Red, Green, Blue } fn main() int { return Color.Blue; }",
        );
        let ir = unit_ir(&units, "main");
        // Color.Blue is index 2; the return path stores it to the ret slot
        // or returns it directly.
        assert!(ir.contains("ret i64 2") || ir.contains("i64 2"), "{ir}");
    }

    #[test]
    fn string_escapes_are_processed_at_lowering() {
        let units = lower("fn main() int { output(\"a\\tb\\n\"); return 0; }");
        let ir = unit_ir(&units, "main");
        assert!(ir.contains("a\\09b\\0A\\00"), "{ir}");
    }

    #[test]
    fn logical_operators_short_circuit() {
        let units = lower(
            "fn main() int { let a bool = true; let b bool = false; if a && b { return 1; } return 0; }",
        );
        let ir = unit_ir(&units, "main");
        assert!(ir.contains("and_rhs"), "{ir}");
        assert!(ir.contains("and_merge"), "{ir}");
    }

    #[test]
    fn lowering_is_deterministic() {
        let source = "@module m { pub fn f(x int) int { return x * 2; } }";
        let mut sink = DiagnosticSink::new();
        let parse = lumen_parser::parse(source, "test.lum", &mut sink);
        let mut ast = parse.ast;
        let root = parse.root.unwrap();
        let typeck = lumen_typeck::check(&mut ast, root);
        assert!(typeck.success());
        let first = compile_to_ir(&ast, root).unwrap();
        let second = compile_to_ir(&ast, root).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn objects_are_written_per_module() {
        let source = "\
@module util { pub fn add(a int, b int) int { return a + b; } }
@module main { @use util; fn main() int { return util.add(1, 2); } }";
        let mut sink = DiagnosticSink::new();
        let parse = lumen_parser::parse(source, "test.lum", &mut sink);
        let mut ast = parse.ast;
        let root = parse.root.unwrap();
        let typeck = lumen_typeck::check(&mut ast, root);
        assert!(typeck.success(), "{:?}", typeck.errors);

        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("build");
        let written = compile_to_objects(&ast, root, &out, true, None).expect("emission");
        assert_eq!(written.len(), 2);
        assert!(out.join("util.o").exists());
        assert!(out.join("main.o").exists());
        assert!(out.join("util.ll").exists());
        assert!(out.join("main.ll").exists());
    }
}
