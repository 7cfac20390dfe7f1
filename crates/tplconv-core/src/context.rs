/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Iteration contexts.
//!
//! A template is rendered under its *join context*: nothing for document
//! templates, one element of the group sequence for block templates. Plain
//! references and conditions may need a deeper context, the *base context*.
//! Within one template all of them must agree on a single base context, so
//! it can be widened at most once, from the join context down to one
//! descendant sequence. Join references and concat conditions are exempt:
//! they iterate the extra sequences themselves (see
//! [`IterationContext::context_path`]).

use crate::ast::ElemRef;
use crate::definitions::Definitions;
use crate::error::{ContextConflict, TranspileError, TranspileResult};
use crate::param_path::{ancestors, is_subpath, parent};

/// State of a template's base context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseContext {
    /// Still equal to the join context.
    Unfixed,
    /// Widened to a sequence below the join context.
    Fixed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationContext {
    join: String,
    base: BaseContext,
}

impl IterationContext {
    pub fn new(join: impl Into<String>) -> Self {
        Self {
            join: join.into(),
            base: BaseContext::Unfixed,
        }
    }

    pub fn join(&self) -> &str {
        &self.join
    }

    pub fn base(&self) -> &str {
        match &self.base {
            BaseContext::Unfixed => &self.join,
            BaseContext::Fixed(path) => path,
        }
    }

    pub fn state(&self) -> &BaseContext {
        &self.base
    }

    /// Make `elem` single-valued in this template, widening the base context
    /// if that is still allowed.
    pub fn adjust(&mut self, elem: &ElemRef, definitions: &Definitions) -> TranspileResult<()> {
        let Some(context) = nearest_sequence(elem.base_context(), definitions) else {
            return Ok(());
        };
        if context == self.base() {
            return Ok(());
        }

        if self.base == BaseContext::Unfixed {
            if is_subpath(context, &self.join) {
                tracing::debug!(
                    join = %self.join,
                    base = context,
                    "Widening base context for {}",
                    elem.origin().position
                );
                self.base = BaseContext::Fixed(context.to_string());
                return Ok(());
            }
        } else if context == self.join {
            return Ok(());
        }

        let base = self.base();
        let conflict = if !is_subpath(context, &self.join) {
            ContextConflict::IncompatibleWithJoin {
                join: self.join.clone(),
            }
        } else if is_subpath(base, context) {
            ContextConflict::BaseAlreadyAdjusted {
                base: base.to_string(),
                join: self.join.clone(),
            }
        } else if is_subpath(context, base) {
            ContextConflict::StrongerBaseRequired {
                required: context.to_string(),
                base: base.to_string(),
                join: self.join.clone(),
            }
        } else {
            ContextConflict::IncompatibleWithBase {
                base: base.to_string(),
            }
        };
        Err(conflict_error(elem, conflict))
    }

    /// Sequences that must be iterated, innermost first, for `elem` to be
    /// single-valued under the join context.
    pub fn context_path(
        &self,
        elem: &ElemRef,
        definitions: &Definitions,
    ) -> TranspileResult<Vec<String>> {
        let mut result = Vec::new();
        let mut context = elem.base_context();
        if context.is_empty() {
            return Ok(result);
        }
        while context.len() > self.join.len() {
            if definitions.is_sequence(context) {
                result.push(context.to_string());
            }
            context = parent(context);
        }
        if context != self.join {
            return Err(conflict_error(
                elem,
                ContextConflict::IncompatibleWithJoin {
                    join: self.join.clone(),
                },
            ));
        }
        Ok(result)
    }
}

fn conflict_error(elem: &ElemRef, conflict: ContextConflict) -> TranspileError {
    TranspileError::Context {
        origin: elem.origin().clone(),
        reference: elem.describe(),
        conflict,
    }
}

/// `path` or its nearest ancestor that is a sequence.
pub fn nearest_sequence<'p>(path: &'p str, definitions: &Definitions) -> Option<&'p str> {
    ancestors(path).find(|p| definitions.is_sequence(p))
}

/// Express `path` relative to the loop variable of the innermost sequence
/// strictly enclosing it. The last component is never replaced, so a
/// sequence path stays as it is.
pub fn rel_param_name(path: &str, definitions: &Definitions) -> String {
    for context in ancestors(parent(path)) {
        if let Some(iterator) = definitions.sequence_iterator(context) {
            return format!("{}{}", iterator, &path[context.len()..]);
        }
    }
    path.to_string()
}
