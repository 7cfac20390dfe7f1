/*
 * source.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template sources.
//!
//! This module provides the trait and implementations for reading template
//! text by namespace and name, from the filesystem or from memory.

use crate::ast::Namespace;
use crate::error::{TranspileError, TranspileResult};
use std::collections::HashMap;
use std::path::PathBuf;

/// Extension of source dialect template files.
pub const SOURCE_EXTENSION: &str = "src";

/// Text of one template together with the name used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub filename: String,
    pub content: String,
}

/// Trait for reading template sources.
pub trait TemplateSource {
    /// Read the template `name` of `namespace`.
    ///
    /// # Returns
    /// `Ok(None)` if no such template exists. Read failures of an existing
    /// template are errors.
    fn read(&self, namespace: Namespace, name: &str) -> TranspileResult<Option<SourceText>>;
}

/// Source reading `<dir>/document/<name>.src` and `<dir>/block/<name>.src`.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    input_dir: PathBuf,
}

impl FileSystemSource {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
        }
    }

    /// Path of the template `name` in `namespace`.
    pub fn template_path(&self, namespace: Namespace, name: &str) -> PathBuf {
        self.input_dir
            .join(namespace.dir_name())
            .join(format!("{}.{}", name, SOURCE_EXTENSION))
    }
}

impl TemplateSource for FileSystemSource {
    fn read(&self, namespace: Namespace, name: &str) -> TranspileResult<Option<SourceText>> {
        let path = self.template_path(namespace, name);
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| TranspileError::io(&path, e))?;
        Ok(Some(SourceText {
            filename: path.to_string_lossy().into_owned(),
            content,
        }))
    }
}

/// Source holding templates in memory.
///
/// Useful for tests and for embedding a template library in a binary.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    templates: HashMap<(Namespace, String), String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        namespace: Namespace,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> &mut Self {
        self.templates
            .insert((namespace, name.into()), content.into());
        self
    }

    pub fn add_document(&mut self, name: impl Into<String>, content: impl Into<String>) -> &mut Self {
        self.add(Namespace::Document, name, content)
    }

    pub fn add_block(&mut self, name: impl Into<String>, content: impl Into<String>) -> &mut Self {
        self.add(Namespace::Block, name, content)
    }

    /// Create a source with the given document templates.
    pub fn with_documents(
        documents: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let mut source = Self::new();
        for (name, content) in documents {
            source.add_document(name, content);
        }
        source
    }
}

impl TemplateSource for MemorySource {
    fn read(&self, namespace: Namespace, name: &str) -> TranspileResult<Option<SourceText>> {
        Ok(self
            .templates
            .get(&(namespace, name.to_string()))
            .map(|content| SourceText {
                filename: format!("{}/{}.{}", namespace.dir_name(), name, SOURCE_EXTENSION),
                content: content.clone(),
            }))
    }
}

impl<S: TemplateSource + ?Sized> TemplateSource for &S {
    fn read(&self, namespace: Namespace, name: &str) -> TranspileResult<Option<SourceText>> {
        (**self).read(namespace, name)
    }
}
