/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Transpiler from the legacy `<$ $>` template dialect to a block-templating
//! dialect with explicit loops.
//!
//! The source dialect has no loops. A template names parameters, and whether
//! a name is single- or multi-valued comes from an external definitions
//! file. This crate infers the iteration structure and emits it explicitly:
//!
//! - References: `<$name$>` becomes `{{name}}`, or an include statement
//!   when `name` is another template
//! - Joins: `<$name: join(, )$>` becomes a `join` filter or nested
//!   `for` loops with a separator guard
//! - Conditionals: `<$if name$>...<$else$>...<$endif$>`, including
//!   `<$if concat(name)$>` over all values of a sequence
//! - Literal text, with target delimiters escaped and newlines preserved
//!
//! # Architecture
//!
//! [`Registry::load`] starts from the `document` template and loads every
//! template it reaches, resolving names and fixing each template's iteration
//! context as the AST is built. [`Registry::store`] then emits all templates
//! and writes them only if every one of them converted.
//!
//! # Example
//!
//! ```ignore
//! use tplconv_core::{Definitions, FileSystemSource, Registry};
//!
//! let definitions = Definitions::from_file(Path::new("defs.ini"))?;
//! let mut registry = Registry::new(&definitions, FileSystemSource::new("templates"));
//! registry.load()?;
//! registry.store(Path::new("out"))?;
//! ```

pub mod ast;
pub mod context;
pub mod definitions;
pub mod diagnostics;
pub mod emitter;
pub mod error;
pub mod lexer;
pub mod loader;
pub mod param_path;
pub mod position;
pub mod registry;
pub mod resolver;
pub mod scanner;
pub mod source;

use std::path::{Path, PathBuf};

// Re-export main types at crate root
pub use ast::{AstNode, ElemRef, Namespace, TemplateAst, TemplateHandle};
pub use context::{BaseContext, IterationContext};
pub use definitions::{DefinitionError, Definitions, GroupParam};
pub use diagnostics::{Diagnostic, DiagnosticCollector, Severity};
pub use emitter::{EmittedTemplate, emit_template};
pub use error::{ContextConflict, TranspileError, TranspileResult};
pub use position::{Origin, Position};
pub use registry::{ROOT_TEMPLATE, Registry, TARGET_EXTENSION};
pub use resolver::{BLOCK_TEMPLATE, BlockResolver, DocumentResolver, NameResolver};
pub use source::{FileSystemSource, MemorySource, SourceText, TemplateSource};

/// Convert every template reachable from `<input_dir>/document/document.src`
/// and write the results to `output_dir`.
///
/// # Returns
/// The paths written, documents first.
pub fn transpile_dir(
    definitions: &Definitions,
    input_dir: &Path,
    output_dir: &Path,
) -> TranspileResult<Vec<PathBuf>> {
    let mut registry = Registry::new(definitions, FileSystemSource::new(input_dir));
    registry.load()?;
    registry.store(output_dir)
}
