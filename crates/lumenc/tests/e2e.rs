//! End-to-end tests for the Lumen compiler.
//!
//! Each test writes a `.lum` source file into a temp project directory,
//! invokes the real `lumenc` binary, and asserts on emitted objects and
//! diagnostic output.

use std::path::PathBuf;
use std::process::{Command, Output};

/// Find the lumenc binary next to the test executable.
fn find_lumenc() -> PathBuf {
    let mut path = std::env::current_exe()
        .expect("cannot find current exe")
        .parent()
        .expect("cannot find parent dir")
        .to_path_buf();
    if path.file_name().is_some_and(|n| n == "deps") {
        path = path.parent().unwrap().to_path_buf();
    }
    let lumenc = path.join("lumenc");
    assert!(
        lumenc.exists(),
        "lumenc binary not found at {}. Run `cargo build -p lumenc` first.",
        lumenc.display()
    );
    lumenc
}

/// Compile `source` in a fresh project dir with extra CLI args; returns the
/// project dir handle and the process output.
fn compile_with(source: &str, extra_args: &[&str]) -> (tempfile::TempDir, Output) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let main_lum = dir.path().join("main.lum");
    std::fs::write(&main_lum, source).expect("failed to write main.lum");

    let mut args = vec!["build", "main.lum"];
    args.extend_from_slice(extra_args);
    let output = Command::new(find_lumenc())
        .args(&args)
        .current_dir(dir.path())
        .output()
        .expect("failed to invoke lumenc");
    (dir, output)
}

fn compile_ok(source: &str) -> (tempfile::TempDir, Output) {
    let (dir, output) = compile_with(source, &[]);
    assert!(
        output.status.success(),
        "lumenc build failed:\nstdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    (dir, output)
}

fn compile_err(source: &str) -> (tempfile::TempDir, String) {
    let (dir, output) = compile_with(source, &[]);
    assert!(
        !output.status.success(),
        "expected compilation to fail but it succeeded"
    );
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (dir, stderr)
}

// ── Scenarios ──────────────────────────────────────────────────────────

/// Hello program: the pipeline succeeds and main.o is emitted.
#[test]
fn e2e_hello_program() {
    let (dir, _) = compile_ok("@module main { fn main() int { outputln(\"hi\"); return 0; } }");
    assert!(dir.path().join("build").join("main.o").exists());
}

/// Undefined identifier: a semantic diagnostic, non-zero exit, no object.
#[test]
fn e2e_undefined_identifier() {
    let (dir, stderr) = compile_err("@module main { fn main() int { return x; } }");
    assert!(stderr.contains("Undefined identifier 'x'"), "{stderr}");
    assert!(!dir.path().join("build").join("main.o").exists());
}

/// Public cross-module function: both objects are emitted.
#[test]
fn e2e_public_cross_module_call() {
    let source = "\
@module util {
    pub fn add(a int, b int) int { return a + b; }
}
@module main {
    @use util;
    fn main() int { return util.add(1, 2); }
}";
    let (dir, _) = compile_ok(source);
    let build = dir.path().join("build");
    assert!(build.join("util.o").exists());
    assert!(build.join("main.o").exists());
}

/// Private cross-module function: a visibility error, non-zero exit.
#[test]
fn e2e_private_cross_module_call() {
    let source = "\
@module util {
    priv fn add(a int, b int) int { return a + b; }
}
@module main {
    @use util;
    fn main() int { return util.add(1, 2); }
}";
    let (dir, stderr) = compile_err(source);
    assert!(stderr.contains("private to module 'util'"), "{stderr}");
    assert!(!dir.path().join("build").join("main.o").exists());
}

/// Deferred statements and the three loop shapes all lower and emit.
#[test]
fn e2e_defer_and_loop_shapes() {
    let source = "\
fn f() void { defer output(\"A\"); defer output(\"B\"); return; }
fn main() int {
    loop { break; }
    let i int = 0;
    loop (i < 10) : (i++) { }
    loop [let j int = 0;] (j < 10) : (j++) { output(j); }
    f();
    return 0;
}";
    let (dir, _) = compile_ok(source);
    assert!(dir.path().join("build").join("main.o").exists());
}

// ── Diagnostics ────────────────────────────────────────────────────────

#[test]
fn e2e_lexical_error_reports_and_fails() {
    let (_, stderr) = compile_err("fn main() int { let $ = 1; return 0; }");
    assert!(stderr.contains("Token not found: '$'"), "{stderr}");
    assert!(stderr.contains("main.lum"), "{stderr}");
}

#[test]
fn e2e_syntax_error_reports_and_fails() {
    let (_, stderr) = compile_err("fn main() int { return 0 }");
    assert!(stderr.contains("Syntax Error"), "{stderr}");
}

#[test]
fn e2e_private_main_warns_but_compiles() {
    let (dir, output) = compile_ok("priv fn main() int { return 0; }");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("promoted to public"), "{stderr}");
    assert!(dir.path().join("build").join("main.o").exists());
}

// ── CLI surface ────────────────────────────────────────────────────────

#[test]
fn e2e_save_writes_llvm_ir() {
    let (dir, _) = compile_with_ok_args("fn main() int { return 0; }", &["--save"]);
    let build = dir.path().join("build");
    assert!(build.join("main.o").exists());
    assert!(build.join("main.ll").exists());
}

#[test]
fn e2e_clean_removes_stale_output() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.lum"), "fn main() int { return 0; }").unwrap();
    let build = dir.path().join("build");
    std::fs::create_dir_all(&build).unwrap();
    std::fs::write(build.join("stale.o"), b"junk").unwrap();

    let output = Command::new(find_lumenc())
        .args(["build", "main.lum", "--clean"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(!build.join("stale.o").exists());
    assert!(build.join("main.o").exists());
}

#[test]
fn e2e_missing_source_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(find_lumenc())
        .args(["build", "absent.lum"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn e2e_unknown_build_option_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.lum"), "fn main() int { return 0; }").unwrap();
    let output = Command::new(find_lumenc())
        .args(["build", "main.lum", "--explode"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn e2e_help_version_license_exit_zero() {
    for flag in ["--help", "--version", "--license"] {
        let output = Command::new(find_lumenc()).arg(flag).output().unwrap();
        assert!(output.status.success(), "{flag} should exit 0");
    }
}

fn compile_with_ok_args(source: &str, args: &[&str]) -> (tempfile::TempDir, Output) {
    let (dir, output) = compile_with(source, args);
    assert!(
        output.status.success(),
        "lumenc build failed:\nstderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    (dir, output)
}
