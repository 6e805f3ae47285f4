//! The diagnostic sink.
//!
//! A bounded, append-only list of structured error records. The driver owns
//! one sink per run and threads it through the lexer and parser; between
//! stages it calls [`DiagnosticSink::report`] and aborts the pipeline when
//! the sink is non-empty.

use std::io::{self, Write};

use serde::Serialize;

/// Maximum number of records a sink holds. Appends beyond this are dropped
/// silently.
pub const SINK_CAPACITY: usize = 256;

/// One structured diagnostic record.
///
/// `line_text` is the full source line containing the offending span,
/// reconstructed from the source buffer at emit time; `span_len` is the
/// byte length of the span the caret indicator underlines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub category: String,
    pub path: String,
    pub message: String,
    pub line: u32,
    pub col: u32,
    pub line_text: String,
    pub span_len: u32,
    pub label: Option<String>,
    pub note: Option<String>,
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a record with the mandatory fields; advisory fields default
    /// to absent.
    pub fn new(
        category: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
        line: u32,
        col: u32,
        line_text: impl Into<String>,
        span_len: u32,
    ) -> Self {
        Self {
            category: category.into(),
            path: path.into(),
            message: message.into(),
            line,
            col,
            line_text: line_text.into(),
            span_len,
            label: None,
            note: None,
            help: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// Bounded accumulator of diagnostics, consulted between pipeline stages.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    records: Vec<Diagnostic>,
}

impl DiagnosticSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. A full sink drops the record silently.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if self.records.len() < SINK_CAPACITY {
            self.records.push(diagnostic);
        }
    }

    /// Whether any records have been emitted.
    pub fn has_errors(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Discard all records.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// The accumulated records, in emission order.
    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    /// Walk the records and print each one to `out`. Returns whether any
    /// records were present.
    ///
    /// Per-record format:
    ///
    /// ```text
    /// <category>: <message>
    ///   --><file>:<line>::<col>
    ///  <pad> |
    ///  <line> | <source-line>
    ///  <pad> | <spaces><carets>
    /// ```
    ///
    /// followed by optional `label`, `note`, and `help` lines and a blank
    /// separator line.
    pub fn report(&self, out: &mut impl Write) -> io::Result<bool> {
        for d in &self.records {
            let line_num = d.line.to_string();
            let pad = " ".repeat(line_num.len());
            writeln!(out, "{}: {}", d.category, d.message)?;
            writeln!(out, "  -->{}:{}::{}", d.path, d.line, d.col)?;
            writeln!(out, " {pad} |")?;
            writeln!(out, " {line_num} | {}", d.line_text)?;
            let indent = " ".repeat(d.col.saturating_sub(1) as usize);
            let carets = "^".repeat((d.span_len.max(1)) as usize);
            writeln!(out, " {pad} | {indent}{carets}")?;
            if let Some(label) = &d.label {
                writeln!(out, "  label: {label}")?;
            }
            if let Some(note) = &d.note {
                writeln!(out, "  note: {note}")?;
            }
            if let Some(help) = &d.help {
                writeln!(out, "  help: {help}")?;
            }
            writeln!(out)?;
        }
        Ok(self.has_errors())
    }
}
