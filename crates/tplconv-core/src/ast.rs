/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template AST types.
//!
//! One [`TemplateAst`] is built per template file. References are resolved
//! exactly once, while the tree is built, so every [`ElemRef`] already knows
//! whether it names a parameter or another template.

use crate::context::IterationContext;
use crate::position::{Origin, Position};
use std::fmt;

/// The two disjoint template namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    Document,
    Block,
}

impl Namespace {
    /// Directory holding this namespace's sources.
    pub fn dir_name(self) -> &'static str {
        match self {
            Namespace::Document => "document",
            Namespace::Block => "block",
        }
    }

    /// Name under which a template is written and included.
    ///
    /// Block templates are prefixed so they cannot collide with document
    /// templates in the shared output directory.
    pub fn output_name(self, name: &str) -> String {
        match self {
            Namespace::Document => name.to_string(),
            Namespace::Block => format!("block_{}", name),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// What a template reference needs to know about a fully loaded template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateHandle {
    /// Output name, used by include statements.
    pub name: String,
    /// The template's final base context.
    pub base_context: String,
}

/// A resolved reference to a parameter or to another template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElemRef {
    Param { path: String, origin: Origin },
    Template { template: TemplateHandle, origin: Origin },
}

impl ElemRef {
    /// The path this reference has to be single-valued against: the
    /// parameter itself, or the referenced template's base context.
    pub fn base_context(&self) -> &str {
        match self {
            ElemRef::Param { path, .. } => path,
            ElemRef::Template { template, .. } => &template.base_context,
        }
    }

    pub fn origin(&self) -> &Origin {
        match self {
            ElemRef::Param { origin, .. } | ElemRef::Template { origin, .. } => origin,
        }
    }

    /// Subject line used in semantic error reports.
    pub fn describe(&self) -> String {
        match self {
            ElemRef::Param { path, .. } => format!("Reference to the parameter {}", path),
            ElemRef::Template { template, .. } => format!(
                "Reference to the template {} [with base context {}]",
                template.name, template.base_context
            ),
        }
    }
}

/// A node in the template AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
    /// Literal text.
    Text(TextNode),
    /// `<$name$>` or `<$name: join(sep)$>`
    Ref(RefNode),
    /// `<$if name$>...<$else$>...<$endif$>`
    If(IfNode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub text: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefNode {
    pub target: ElemRef,
    /// Separator of a join reference; `None` for a plain reference.
    pub join: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfCondition {
    pub target: ElemRef,
    /// `concat(name)`: the condition tests all values of a multi-valued
    /// parameter together.
    pub concat: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfNode {
    pub condition: IfCondition,
    pub then_branch: Vec<AstNode>,
    pub else_branch: Option<Vec<AstNode>>,
}

/// The AST of one template file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateAst {
    pub namespace: Namespace,
    /// Output name (see [`Namespace::output_name`]).
    pub name: String,
    /// File the template was read from.
    pub filename: String,
    pub context: IterationContext,
    pub nodes: Vec<AstNode>,
}

impl TemplateAst {
    pub fn new(
        namespace: Namespace,
        source_name: &str,
        join_context: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            namespace,
            name: namespace.output_name(source_name),
            filename: filename.into(),
            context: IterationContext::new(join_context),
            nodes: Vec::new(),
        }
    }

    pub fn join_context(&self) -> &str {
        self.context.join()
    }

    pub fn base_context(&self) -> &str {
        self.context.base()
    }

    pub fn handle(&self) -> TemplateHandle {
        TemplateHandle {
            name: self.name.clone(),
            base_context: self.base_context().to_string(),
        }
    }
}
