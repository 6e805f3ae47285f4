//! The Lumen compiler CLI.
//!
//! Provides the `lumenc` command:
//!
//! - `lumenc build <file.lum>` - compile a source file to per-module
//!   object files in `build/`
//!
//! Options:
//! - `--name` - name recorded for the downstream link target
//! - `--save` - save textual LLVM IR (.ll) alongside each object
//! - `--clean` - remove the output directory before building
//! - `--license` - print the license and exit

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use lumen_common::diagnostics::DiagnosticSink;
use lumen_lexer::Lexer;

const LICENSE: &str = "\
lumenc is distributed under the terms of the MIT license.
See the LICENSE file in the source distribution for the full text.";

const OUTPUT_DIR: &str = "build";

#[derive(Parser)]
#[command(name = "lumenc", version, about = "The Lumen compiler")]
struct Cli {
    /// Print the license and exit
    #[arg(short = 'l', long)]
    license: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a Lumen source file to native object files
    Build {
        /// Path to the source file
        file: PathBuf,

        /// Name recorded for the downstream link target
        #[arg(long)]
        name: Option<String>,

        /// Save textual LLVM IR (.ll) alongside each object
        #[arg(long)]
        save: bool,

        /// Remove the output directory before building
        #[arg(long)]
        clean: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if cli.license {
        println!("{LICENSE}");
        return;
    }

    match cli.command {
        Some(Commands::Build {
            file,
            name,
            save,
            clean,
        }) => {
            if let Err(e) = build(&file, name.as_deref(), save, clean) {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
        None => {
            eprintln!("error: no command given; try 'lumenc build <file.lum>'");
            process::exit(1);
        }
    }
}

/// Execute the pipeline: read -> lex -> parse -> typecheck -> lower, with
/// the diagnostic sink consulted between stages.
fn build(file: &Path, name: Option<&str>, save: bool, clean: bool) -> Result<(), String> {
    if !file.exists() {
        return Err(format!("source file '{}' does not exist", file.display()));
    }
    let source = std::fs::read_to_string(file)
        .map_err(|e| format!("failed to read '{}': {e}", file.display()))?;
    let path = file.display().to_string();

    let mut sink = DiagnosticSink::new();

    // Lex: pump tokens into a vector until end-of-input.
    let tokens = Lexer::tokenize(&source, &path, &mut sink);
    if report_sink(&sink) {
        return Err("compilation failed due to errors above".to_string());
    }

    // Parse.
    let parse = lumen_parser::parse_tokens(&tokens, &source, &path, &mut sink);
    if report_sink(&sink) {
        return Err("compilation failed due to errors above".to_string());
    }
    let Some(root) = parse.root else {
        return Err("no program could be parsed".to_string());
    };
    let mut ast = parse.ast;

    // Type check.
    let typeck = lumen_typeck::check(&mut ast, root);
    for warning in &typeck.warnings {
        eprint!(
            "{}",
            lumen_typeck::diagnostics::render_diagnostic(warning, &source, &path)
        );
    }
    if !typeck.success() {
        for rendered in typeck.render_errors(&source, &path) {
            eprint!("{rendered}");
        }
        return Err("compilation failed due to errors above".to_string());
    }

    // Lower and emit objects.
    let out_dir = PathBuf::from(OUTPUT_DIR);
    if clean && out_dir.exists() {
        std::fs::remove_dir_all(&out_dir)
            .map_err(|e| format!("failed to clean '{}': {e}", out_dir.display()))?;
    }
    let written = lumen_codegen::compile_to_objects(&ast, root, &out_dir, save, None)
        .map_err(|e| e.to_string())?;

    let target = name
        .map(str::to_string)
        .or_else(|| {
            file.file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "a.out".to_string());
    eprintln!("  Compiled {} module(s) for target '{target}':", written.len());
    for path in &written {
        eprintln!("    {}", path.display());
    }
    Ok(())
}

/// Report the sink to stderr. Returns whether it held any records.
fn report_sink(sink: &DiagnosticSink) -> bool {
    let mut stderr = std::io::stderr().lock();
    let had = sink.report(&mut stderr).unwrap_or(true);
    let _ = stderr.flush();
    had
}
