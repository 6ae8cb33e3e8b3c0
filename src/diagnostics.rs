// src/diagnostics.rs
//! Offset-based diagnostics shared by the lexical-grammar, regex and CFG
//! front ends.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

/// Byte offset into a grammar source.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct SourceLocation {
    pub offset: usize,
}

impl SourceLocation {
    pub const fn new(offset: usize) -> Self {
        Self { offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Note => f.write_str("note"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub offset: usize,
    pub severity: Severity,
    pub message: String,
}

/// Accumulates errors (each optionally followed by notes) so one run can
/// report every problem in a source before failing.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, offset: usize, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            offset,
            severity: Severity::Error,
            message: message.into(),
        });
    }

    pub fn note(&mut self, offset: usize, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            offset,
            severity: Severity::Note,
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    /// Converts into `Err` when at least one error was recorded.
    pub fn into_result(self, what: &'static str) -> Result<(), DiagnosticsError> {
        if self.has_errors() {
            Err(DiagnosticsError {
                what,
                diagnostics: self,
            })
        } else {
            Ok(())
        }
    }

    /// `path:line:col: severity: message`, then the offending line and a caret.
    pub fn render(&self, path: &str, source: &str) -> String {
        let mut out = String::new();
        for d in &self.entries {
            let (line, col, text) = line_col(source, d.offset);
            let _ = writeln!(out, "{path}:{line}:{col}: {}: {}", d.severity, d.message);
            let _ = writeln!(out, "    {text}");
            let _ = writeln!(out, "    {}^", " ".repeat(col.saturating_sub(1)));
        }
        out
    }
}

/// 1-based line and column (in bytes) of `offset`, plus the line's text.
fn line_col(source: &str, offset: usize) -> (usize, usize, &str) {
    let offset = offset.min(source.len());
    let bytes = source.as_bytes();
    let line_start = bytes[..offset]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    let line_end = bytes[offset..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(source.len(), |i| offset + i);
    let line = bytes[..line_start].iter().filter(|&&b| b == b'\n').count() + 1;
    let text = source.get(line_start..line_end).unwrap_or("");
    (line, offset - line_start + 1, text.trim_end_matches('\r'))
}

/// A batch of syntax or definition errors; later phases never run on the
/// source that produced it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{} error(s) in {what}", .diagnostics.error_count())]
pub struct DiagnosticsError {
    pub what: &'static str,
    pub diagnostics: Diagnostics,
}
