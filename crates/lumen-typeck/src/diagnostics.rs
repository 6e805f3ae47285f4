//! Ariadne-based rendering for type errors.
//!
//! The diagnostic sink owns the lexical/syntactic report format; semantic
//! errors go to stderr through this renderer instead. Output is colorless
//! so test assertions stay deterministic.

use std::ops::Range;

use ariadne::{Config, Label, Report, ReportKind, Source};

use lumen_common::span::Span;

use crate::error::TypeError;

/// Assign an error code to each variant.
fn error_code(err: &TypeError) -> &'static str {
    match err {
        TypeError::UndefinedIdentifier { .. } => "E0001",
        TypeError::DuplicateSymbol { .. } => "E0002",
        TypeError::TypeMismatch { .. } => "E0003",
        TypeError::NonNumericOperand { .. } => "E0004",
        TypeError::NonIntegerOperand { .. } => "E0005",
        TypeError::NonBoolCondition { .. } => "E0006",
        TypeError::NotAFunction { .. } => "E0007",
        TypeError::WrongArgCount { .. } => "E0008",
        TypeError::ReturnOutsideFunction { .. } => "E0009",
        TypeError::ReturnTypeMismatch { .. } => "E0010",
        TypeError::VoidFunctionReturnsValue { .. } => "E0011",
        TypeError::MissingReturnValue { .. } => "E0012",
        TypeError::BreakOutsideLoop { .. } => "E0013",
        TypeError::ContinueOutsideLoop { .. } => "E0014",
        TypeError::MemberMissing { .. } => "E0015",
        TypeError::VisibilityViolation { .. } => "E0016",
        TypeError::UnknownModule { .. } => "E0017",
        TypeError::NotAssignable { .. } => "E0018",
        TypeError::AssignToImmutable { .. } => "E0019",
        TypeError::MissingTypeAnnotation { .. } => "E0020",
        TypeError::MainMustReturnInt { .. } => "E0021",
        TypeError::NotAPointer { .. } => "E0022",
        TypeError::NotIndexable { .. } => "E0023",
        TypeError::EmptyArrayLiteral { .. } => "E0024",
        TypeError::MainPromotedPublic { .. } => "W0001",
    }
}

fn span_to_range(span: Span) -> Range<usize> {
    span.start as usize..span.end as usize
}

/// Render a type error into a formatted diagnostic string.
pub fn render_diagnostic(error: &TypeError, source: &str, _filename: &str) -> String {
    let config = Config::default().with_color(false);
    let source_len = source.len();

    // Clamp to source bounds; ariadne needs a non-empty span.
    let clamp = |r: Range<usize>| -> Range<usize> {
        let s = r.start.min(source_len);
        let e = r.end.min(source_len).max(s);
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };

    let kind = if error.is_warning() {
        ReportKind::Warning
    } else {
        ReportKind::Error
    };
    let range = clamp(span_to_range(error.span()));

    let report = Report::build(kind, range.clone())
        .with_code(error_code(error))
        .with_message(error.to_string())
        .with_config(config)
        .with_label(Label::new(range).with_message(label_text(error)))
        .finish();

    let mut buf = Vec::new();
    report
        .write(Source::from(source), &mut buf)
        .expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}

fn label_text(error: &TypeError) -> String {
    match error {
        TypeError::UndefinedIdentifier { .. } => "not found in this scope".to_string(),
        TypeError::DuplicateSymbol { .. } => "already declared here".to_string(),
        TypeError::TypeMismatch { expected, .. } => format!("expected {expected}"),
        TypeError::NonBoolCondition { found, .. } => format!("this is {found}"),
        TypeError::VisibilityViolation { module, .. } => {
            format!("declare it 'pub' in module '{module}' to use it here")
        }
        TypeError::UnknownModule { .. } => "no module with this name is declared".to_string(),
        TypeError::WrongArgCount { expected, .. } => format!("expected {expected} argument(s)"),
        TypeError::ReturnTypeMismatch { expected, .. } => format!("expected {expected}"),
        other => other.to_string(),
    }
}
