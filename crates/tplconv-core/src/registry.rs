/*
 * registry.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template registry.
//!
//! The registry owns every loaded [`TemplateAst`], keyed by namespace and
//! name. Loading starts from the root document template and pulls in other
//! templates on first reference, so only reachable templates are converted.
//! Each template is loaded exactly once; a template that is referenced while
//! it is still being loaded is a cycle and is rejected.

use crate::ast::{Namespace, TemplateAst, TemplateHandle};
use crate::definitions::Definitions;
use crate::emitter::{EmittedTemplate, emit_template};
use crate::error::{TranspileError, TranspileResult};
use crate::loader::Loader;
use crate::resolver::{BlockResolver, DocumentResolver};
use crate::source::{SourceText, TemplateSource};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// The document template every conversion starts from.
pub const ROOT_TEMPLATE: &str = "document";

/// Extension of emitted target dialect templates.
pub const TARGET_EXTENSION: &str = "tpl";

/// All templates of one conversion run.
#[derive(Debug)]
pub struct Registry<'d, S> {
    definitions: &'d Definitions,
    source: S,
    documents: BTreeMap<String, TemplateAst>,
    blocks: BTreeMap<String, TemplateAst>,
    /// Templates currently being loaded, outermost first.
    loading: Vec<(Namespace, String)>,
}

impl<'d, S: TemplateSource> Registry<'d, S> {
    pub fn new(definitions: &'d Definitions, source: S) -> Self {
        Self {
            definitions,
            source,
            documents: BTreeMap::new(),
            blocks: BTreeMap::new(),
            loading: Vec::new(),
        }
    }

    pub fn definitions(&self) -> &'d Definitions {
        self.definitions
    }

    /// Load the root document template and everything it references.
    pub fn load(&mut self) -> TranspileResult<()> {
        if self.template(Namespace::Document, ROOT_TEMPLATE)?.is_none() {
            return Err(TranspileError::config(format!(
                "'{}' template is absent",
                ROOT_TEMPLATE
            )));
        }
        tracing::debug!(
            documents = self.documents.len(),
            blocks = self.blocks.len(),
            "Loaded templates"
        );
        Ok(())
    }

    /// Look up a template, loading it on first use.
    ///
    /// # Returns
    /// `Ok(None)` if the source has no such template.
    pub fn template(
        &mut self,
        namespace: Namespace,
        name: &str,
    ) -> TranspileResult<Option<TemplateHandle>> {
        if let Some(template) = self.table(namespace).get(name) {
            return Ok(Some(template.handle()));
        }
        if self
            .loading
            .iter()
            .any(|(ns, loading)| *ns == namespace && loading == name)
        {
            return Err(self.cycle_error(namespace, name));
        }

        let Some(text) = self.source.read(namespace, name)? else {
            return Ok(None);
        };
        tracing::debug!("Loading {} template '{}' from {}", namespace, name, text.filename);

        self.loading.push((namespace, name.to_string()));
        let result = self.build(namespace, name, &text);
        self.loading.pop();

        let template = result?;
        let handle = template.handle();
        self.table_mut(namespace).insert(name.to_string(), template);
        Ok(Some(handle))
    }

    /// A loaded template.
    pub fn get(&self, namespace: Namespace, name: &str) -> Option<&TemplateAst> {
        self.table(namespace).get(name)
    }

    /// Loaded templates: documents first, each namespace in name order.
    pub fn templates(&self) -> impl Iterator<Item = &TemplateAst> {
        self.documents.values().chain(self.blocks.values())
    }

    /// Emit every loaded template in memory.
    ///
    /// Fails if two templates would be written to the same output file.
    pub fn emit_all(&self) -> TranspileResult<Vec<EmittedTemplate>> {
        let mut outputs: HashMap<&str, &str> = HashMap::new();
        for template in self.templates() {
            if let Some(other) = outputs.insert(&template.name, &template.filename) {
                return Err(TranspileError::config(format!(
                    "Output '{}.{}' is produced by both {} and {}",
                    template.name, TARGET_EXTENSION, other, template.filename
                )));
            }
        }

        self.templates()
            .map(|template| emit_template(template, self.definitions))
            .collect()
    }

    /// Write every loaded template to `output_dir` as `<name>.tpl`.
    ///
    /// All templates are emitted before the first file is written, so an
    /// emission error leaves the output directory untouched.
    pub fn store(&self, output_dir: &Path) -> TranspileResult<Vec<PathBuf>> {
        let emitted = self.emit_all()?;

        std::fs::create_dir_all(output_dir).map_err(|e| TranspileError::io(output_dir, e))?;
        let mut written = Vec::with_capacity(emitted.len());
        for template in emitted {
            let path = output_dir.join(format!("{}.{}", template.name, TARGET_EXTENSION));
            std::fs::write(&path, &template.text).map_err(|e| TranspileError::io(&path, e))?;
            tracing::info!("Converted: {} to {}", template.source_filename, path.display());
            written.push(path);
        }
        Ok(written)
    }

    fn build(
        &mut self,
        namespace: Namespace,
        name: &str,
        text: &SourceText,
    ) -> TranspileResult<TemplateAst> {
        let definitions = self.definitions;
        let join_context = match namespace {
            Namespace::Document => String::new(),
            Namespace::Block => match definitions.group() {
                Some(group) => group.path.clone(),
                None => {
                    return Err(TranspileError::config(format!(
                        "Block template '{}' requires a [group_param] section in the definitions file",
                        name
                    )));
                }
            },
        };

        let mut template =
            TemplateAst::new(namespace, name, join_context, text.filename.clone());
        template.nodes = match namespace {
            Namespace::Document => {
                let mut resolver = DocumentResolver::new(self);
                Loader::new(&text.content, &text.filename, definitions, &mut resolver)
                    .load(&mut template.context)?
            }
            Namespace::Block => {
                let mut resolver = BlockResolver::new(self);
                Loader::new(&text.content, &text.filename, definitions, &mut resolver)
                    .load(&mut template.context)?
            }
        };

        if template.base_context() != template.join_context() {
            tracing::debug!(
                join = template.join_context(),
                base = template.base_context(),
                "Template '{}' iterates below its join context",
                template.name
            );
        }
        Ok(template)
    }

    fn cycle_error(&self, namespace: Namespace, name: &str) -> TranspileError {
        let chain = self
            .loading
            .iter()
            .map(|(ns, loading)| format!("{}/{}", ns, loading))
            .chain(std::iter::once(format!("{}/{}", namespace, name)))
            .collect::<Vec<_>>()
            .join(" -> ");
        TranspileError::config(format!("Template '{}' references itself: {}", name, chain))
    }

    fn table(&self, namespace: Namespace) -> &BTreeMap<String, TemplateAst> {
        match namespace {
            Namespace::Document => &self.documents,
            Namespace::Block => &self.blocks,
        }
    }

    fn table_mut(&mut self, namespace: Namespace) -> &mut BTreeMap<String, TemplateAst> {
        match namespace {
            Namespace::Document => &mut self.documents,
            Namespace::Block => &mut self.blocks,
        }
    }
}
