/*
 * resolver.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Name resolution.
//!
//! A name used in a template is either another template of the same
//! namespace or a parameter. Template lookup comes first; a name that is not
//! a template is mapped through the definitions file to a parameter path.
//! Document and block templates differ in both steps, so each namespace has
//! its own [`NameResolver`].

use crate::ast::{Namespace, TemplateHandle};
use crate::error::{TranspileError, TranspileResult};
use crate::position::Origin;
use crate::registry::Registry;
use crate::source::TemplateSource;

/// Name under which document templates reach the block namespace.
pub const BLOCK_TEMPLATE: &str = "block";

/// Resolve names found in one template.
pub trait NameResolver {
    /// Load the template called `name`, if there is one.
    ///
    /// `origin` is the referencing token; configuration errors raised while
    /// loading are reported there.
    fn resolve_template(
        &mut self,
        name: &str,
        origin: &Origin,
    ) -> TranspileResult<Option<TemplateHandle>>;

    /// Parameter path for a name that is not a template.
    fn map_param(&self, name: &str) -> String;
}

/// Resolver for document templates.
///
/// Document templates see each other and the one distinguished block
/// template, [`BLOCK_TEMPLATE`]. Parameter names go through the global map,
/// then the group map.
pub struct DocumentResolver<'r, 'd, S> {
    registry: &'r mut Registry<'d, S>,
}

impl<'r, 'd, S: TemplateSource> DocumentResolver<'r, 'd, S> {
    pub fn new(registry: &'r mut Registry<'d, S>) -> Self {
        Self { registry }
    }
}

impl<S: TemplateSource> NameResolver for DocumentResolver<'_, '_, S> {
    fn resolve_template(
        &mut self,
        name: &str,
        origin: &Origin,
    ) -> TranspileResult<Option<TemplateHandle>> {
        if name != BLOCK_TEMPLATE {
            return self
                .registry
                .template(Namespace::Document, name)
                .map_err(|e| e.or_origin(origin));
        }

        if self.registry.definitions().group().is_none() {
            return Err(TranspileError::config_at(
                origin.clone(),
                "'block' template is referenced, but the [group_param] section of the definitions file is missing or empty.",
            ));
        }
        match self
            .registry
            .template(Namespace::Block, BLOCK_TEMPLATE)
            .map_err(|e| e.or_origin(origin))?
        {
            Some(handle) => Ok(Some(handle)),
            None => Err(TranspileError::config_at(
                origin.clone(),
                "'block' template is referenced, but it is absent.",
            )),
        }
    }

    fn map_param(&self, name: &str) -> String {
        self.registry.definitions().map_document_name(name)
    }
}

/// Resolver for block templates: block namespace, group map only.
pub struct BlockResolver<'r, 'd, S> {
    registry: &'r mut Registry<'d, S>,
}

impl<'r, 'd, S: TemplateSource> BlockResolver<'r, 'd, S> {
    pub fn new(registry: &'r mut Registry<'d, S>) -> Self {
        Self { registry }
    }
}

impl<S: TemplateSource> NameResolver for BlockResolver<'_, '_, S> {
    fn resolve_template(
        &mut self,
        name: &str,
        origin: &Origin,
    ) -> TranspileResult<Option<TemplateHandle>> {
        self.registry
            .template(Namespace::Block, name)
            .map_err(|e| e.or_origin(origin))
    }

    fn map_param(&self, name: &str) -> String {
        self.registry.definitions().map_block_name(name)
    }
}
