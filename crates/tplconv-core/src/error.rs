/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template transpilation.
//!
//! Every fatal condition is a [`TranspileError`]. Errors are propagated up to
//! the driver, which prints [`TranspileError::report`] once and stops.

use crate::position::Origin;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a transpilation run.
#[derive(Debug, Error)]
pub enum TranspileError {
    /// No scanner rule matches at the current offset.
    #[error("Syntax error")]
    Lexical { origin: Origin },

    /// Grammar violation: unbalanced `if`/`else`/`endif`.
    #[error("{message}")]
    Syntax {
        origin: Option<Origin>,
        message: String,
    },

    /// Bad definitions, missing templates, reference cycles.
    #[error("{message}")]
    Config {
        origin: Option<Origin>,
        message: String,
    },

    /// A reference that cannot be made single-valued in its template.
    #[error("{reference} is semantically incorrect in the current template: {conflict}")]
    Context {
        origin: Origin,
        reference: String,
        conflict: ContextConflict,
    },

    /// Reading a template or writing an output failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The ways a reference can disagree with its template's iteration context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextConflict {
    #[error("It is incompatible with base template's join context '{join}'.")]
    IncompatibleWithJoin { join: String },

    #[error(
        "It requires additional adjustment of template's base context '{base}', which already differs from join '{join}'."
    )]
    BaseAlreadyAdjusted { base: String, join: String },

    #[error(
        "It requires context '{required}', differed from template's join one '{join}', but some other reference in the template requires stronger base context '{base}'."
    )]
    StrongerBaseRequired {
        required: String,
        base: String,
        join: String,
    },

    #[error("It is incompatible with base template's context '{base}'.")]
    IncompatibleWithBase { base: String },

    #[error(
        "Parameter '{path}' is a sequence, but it is referenced as a single value. Use a join reference instead."
    )]
    ScalarSequence { path: String },
}

impl TranspileError {
    pub fn syntax(origin: Origin, message: impl Into<String>) -> Self {
        TranspileError::Syntax {
            origin: Some(origin),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        TranspileError::Config {
            origin: None,
            message: message.into(),
        }
    }

    pub fn config_at(origin: Origin, message: impl Into<String>) -> Self {
        TranspileError::Config {
            origin: Some(origin),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TranspileError::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach `origin` to a configuration error that has no location yet.
    pub fn or_origin(self, origin: &Origin) -> Self {
        match self {
            TranspileError::Config {
                origin: None,
                message,
            } => TranspileError::Config {
                origin: Some(origin.clone()),
                message,
            },
            other => other,
        }
    }

    /// The source location this error points at, if any.
    pub fn origin(&self) -> Option<&Origin> {
        match self {
            TranspileError::Lexical { origin } | TranspileError::Context { origin, .. } => {
                Some(origin)
            }
            TranspileError::Syntax { origin, .. } | TranspileError::Config { origin, .. } => {
                origin.as_ref()
            }
            TranspileError::Io { .. } => None,
        }
    }

    /// Full human-readable report: location, source excerpt, message lines.
    pub fn report(&self) -> String {
        let mut lines = Vec::new();
        if let Some(origin) = self.origin() {
            lines.push(origin.render());
        }
        match self {
            TranspileError::Context {
                reference,
                conflict,
                ..
            } => {
                lines.push(format!(
                    "Error: {} is semantically incorrect in the current template.",
                    reference
                ));
                lines.push(format!("Error: {}", conflict));
            }
            _ => lines.push(format!("Error: {}", self)),
        }
        let mut report = lines.join("\n");
        report.push('\n');
        report
    }
}

/// Result type for transpilation operations.
pub type TranspileResult<T> = Result<T, TranspileError>;
