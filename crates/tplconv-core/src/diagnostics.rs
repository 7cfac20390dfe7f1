/*
 * diagnostics.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Non-fatal diagnostics.
//!
//! Fatal problems are [`TranspileError`](crate::TranspileError)s. Everything
//! the emitter can work around (an unnecessary join, a condition replaced by
//! a stub) is collected here instead, and logged as it happens.

use crate::position::Origin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The source is redundant; output is still exact.
    Warning,
    /// Output contains a `STAB:` placeholder that needs manual attention.
    Note,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub origin: Origin,
}

impl Diagnostic {
    /// Human-readable report in the same layout as fatal errors.
    pub fn report(&self) -> String {
        let label = match self.severity {
            Severity::Warning => "Warning",
            Severity::Note => "Note",
        };
        format!("{}\n{}: {}\n", self.origin.render(), label, self.message)
    }
}

/// Collector for diagnostics produced while emitting one template.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    /// Record a diagnostic and log it.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        let position = &diagnostic.origin.position;
        tracing::warn!(
            file = %position.filename,
            line = position.line,
            column = position.column + 1,
            severity = ?diagnostic.severity,
            "{}",
            diagnostic.message
        );
        self.diagnostics.push(diagnostic);
    }

    pub fn warn_at(&mut self, message: impl Into<String>, origin: &Origin) {
        self.add(Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            origin: origin.clone(),
        });
    }

    pub fn note_at(&mut self, message: impl Into<String>, origin: &Origin) {
        self.add(Diagnostic {
            severity: Severity::Note,
            message: message.into(),
            origin: origin.clone(),
        });
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    #[test]
    fn test_collects_in_order() {
        let origin = Origin::new(Position::start("doc.src"), "<$items: join$>");
        let mut collector = DiagnosticCollector::new();
        assert!(collector.is_empty());
        collector.warn_at("Join is not needed", &origin);
        collector.note_at("Cannot convert template as condition.", &origin);

        let diagnostics = collector.into_diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert_eq!(diagnostics[1].severity, Severity::Note);
    }

    #[test]
    fn test_report_layout() {
        let diagnostic = Diagnostic {
            severity: Severity::Warning,
            message: "Join is not needed".to_string(),
            origin: Origin::new(Position::start("doc.src"), "<$x: join$>"),
        };
        assert_eq!(
            diagnostic.report(),
            "File doc.src, line 1, column 1\n<$x: join$> (...)\nWarning: Join is not needed\n"
        );
    }
}
