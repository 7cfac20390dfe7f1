/*
 * position.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Source positions for diagnostics.
//!
//! A [`Position`] is captured on every token and copied into the AST nodes
//! built from it, so that semantic errors found long after scanning can still
//! point at the offending text.

use std::fmt;
use std::sync::Arc;

/// A location in a template source file.
///
/// Lines are 1-based, columns are 0-based and counted in characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub filename: Arc<str>,
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Position of the first character of `filename`.
    pub fn start(filename: impl Into<Arc<str>>) -> Self {
        Self {
            filename: filename.into(),
            line: 1,
            column: 0,
        }
    }

    /// Move past `text`, which was consumed at the current position.
    pub fn advance(&mut self, text: &str) {
        match text.rfind('\n') {
            Some(last) => {
                self.line += text.matches('\n').count();
                self.column = text[last + 1..].chars().count();
            }
            None => self.column += text.chars().count(),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "File {}, line {}, column {}",
            self.filename,
            self.line,
            self.column + 1
        )
    }
}

/// A position together with the literal source text found there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub position: Position,
    pub text: String,
}

impl Origin {
    pub fn new(position: Position, text: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
        }
    }

    /// Render the location line followed by the source excerpt.
    ///
    /// The excerpt is marked with `(...)` on each side where it is cut out of
    /// a longer line.
    pub fn render(&self) -> String {
        let prefix = if self.position.column > 0 { "(...) " } else { "" };
        let (body, suffix) = match self.text.strip_suffix('\n') {
            Some(body) => (body, ""),
            None => (self.text.as_str(), " (...)"),
        };
        format!("{}\n{}{}{}", self.position, prefix, body, suffix)
    }
}
