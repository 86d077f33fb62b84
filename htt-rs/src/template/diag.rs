//! Render diagnostics.
//!
//! Nothing that goes wrong inside a template aborts a render.  Problems are
//! recorded here as `(line, severity, message)` entries and surfaced either
//! through [`Template::take_diagnostics`](super::Template::take_diagnostics)
//! or the debug trailer.  Each entry is also mirrored as a `tracing` event.

use std::fmt;

/// How serious a [`Diagnostic`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("Warning"),
            Severity::Error => f.write_str("Error"),
        }
    }
}

/// One non-fatal problem.  `line` is 0-based and only meaningful when the
/// render tracked lines (debug mode); otherwise it is always 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Ordered collection of [`Diagnostic`]s.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning(&mut self, line: usize, message: impl Into<String>) {
        self.push(Diagnostic { line, severity: Severity::Warning, message: message.into() });
    }

    pub fn error(&mut self, line: usize, message: impl Into<String>) {
        self.push(Diagnostic { line, severity: Severity::Error, message: message.into() });
    }

    pub fn push(&mut self, diag: Diagnostic) {
        match diag.severity {
            Severity::Warning => tracing::warn!(line = diag.line, "{}", diag.message),
            Severity::Error => tracing::error!(line = diag.line, "{}", diag.message),
        }
        self.entries.push(diag);
    }

    pub fn extend(&mut self, diags: impl IntoIterator<Item = Diagnostic>) {
        for d in diags {
            self.push(d);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Entries ordered by line; entries on the same line keep record order.
    pub fn by_line(&self) -> Vec<&Diagnostic> {
        let mut sorted: Vec<&Diagnostic> = self.entries.iter().collect();
        sorted.sort_by_key(|d| d.line);
        sorted
    }

    /// Drain all entries.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.entries)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
