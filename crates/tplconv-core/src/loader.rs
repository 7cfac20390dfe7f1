/*
 * loader.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! AST construction.
//!
//! The loader walks the token stream of one template, resolving every name
//! as it goes and fixing the template's base context. Referenced templates
//! are loaded on first use through the [`NameResolver`], so by the time a
//! template's tree is complete everything it depends on is complete too.

use crate::ast::{AstNode, ElemRef, IfCondition, IfNode, RefNode, TextNode};
use crate::context::IterationContext;
use crate::definitions::Definitions;
use crate::error::{ContextConflict, TranspileError, TranspileResult};
use crate::lexer::{Token, TokenKind, TokenStream};
use crate::position::Origin;
use crate::resolver::NameResolver;

/// Builds the node list of one template.
pub struct Loader<'a, 's, R: ?Sized> {
    tokens: TokenStream<'s>,
    definitions: &'a Definitions,
    resolver: &'a mut R,
}

impl<'a, 's, R: NameResolver + ?Sized> Loader<'a, 's, R> {
    pub fn new(
        content: &'s str,
        filename: &str,
        definitions: &'a Definitions,
        resolver: &'a mut R,
    ) -> Self {
        Self {
            tokens: TokenStream::new(content, filename),
            definitions,
            resolver,
        }
    }

    /// Load the whole template, adjusting `context` along the way.
    pub fn load(mut self, context: &mut IterationContext) -> TranspileResult<Vec<AstNode>> {
        let nodes = self.load_sequence(context)?;
        match self.tokens.next_token()? {
            None => Ok(nodes),
            Some(token) => {
                let message = match token.kind {
                    TokenKind::Else => "'else' without matching 'if'",
                    _ => "'endif' without matching 'if'",
                };
                Err(TranspileError::syntax(token.origin(), message))
            }
        }
    }

    /// Load nodes up to the end of input or an `else`/`endif`, which is left
    /// in the stream for the caller.
    fn load_sequence(&mut self, context: &mut IterationContext) -> TranspileResult<Vec<AstNode>> {
        let mut nodes = Vec::new();

        while let Some(token) = self.tokens.next_token()? {
            match token.kind {
                TokenKind::Text => nodes.push(AstNode::Text(TextNode {
                    text: token.text,
                    position: token.position,
                })),
                TokenKind::Else | TokenKind::Endif => {
                    self.tokens.unget(token);
                    break;
                }
                TokenKind::Reference { name, join } => {
                    let origin = Origin::new(token.position, token.text);
                    let target = self.elem_ref(&name, origin)?;
                    if join.is_none() {
                        self.check_single_value(&target)?;
                        context.adjust(&target, self.definitions)?;
                    }
                    nodes.push(AstNode::Ref(RefNode { target, join }));
                }
                TokenKind::If { name, concat } => {
                    let origin = Origin::new(token.position, token.text);
                    let node = self.load_if(&name, concat, origin, context)?;
                    nodes.push(AstNode::If(node));
                }
            }
        }

        Ok(nodes)
    }

    fn load_if(
        &mut self,
        name: &str,
        concat: bool,
        origin: Origin,
        context: &mut IterationContext,
    ) -> TranspileResult<IfNode> {
        let target = self.elem_ref(name, origin.clone())?;
        if !concat {
            context.adjust(&target, self.definitions)?;
        }

        let then_branch = self.load_sequence(context)?;
        let mut terminator = self.branch_end(&origin)?;
        let mut else_branch = None;
        if terminator.kind == TokenKind::Else {
            else_branch = Some(self.load_sequence(context)?);
            terminator = self.branch_end(&origin)?;
            if terminator.kind == TokenKind::Else {
                return Err(TranspileError::syntax(
                    terminator.origin(),
                    "Duplicate 'else' in 'if' statement",
                ));
            }
        }

        Ok(IfNode {
            condition: IfCondition { target, concat },
            then_branch,
            else_branch,
        })
    }

    /// The `else` or `endif` ending a branch of the `if` at `if_origin`.
    fn branch_end(&mut self, if_origin: &Origin) -> TranspileResult<Token> {
        self.tokens.next_token()?.ok_or_else(|| {
            TranspileError::syntax(if_origin.clone(), "'if' without matching 'endif'")
        })
    }

    fn elem_ref(&mut self, name: &str, origin: Origin) -> TranspileResult<ElemRef> {
        match self.resolver.resolve_template(name, &origin)? {
            Some(template) => Ok(ElemRef::Template { template, origin }),
            None => Ok(ElemRef::Param {
                path: self.resolver.map_param(name),
                origin,
            }),
        }
    }

    /// A plain reference to a sequence parameter would render the whole
    /// list where a single value is expected.
    fn check_single_value(&self, target: &ElemRef) -> TranspileResult<()> {
        match target {
            ElemRef::Param { path, origin } if self.definitions.is_sequence(path) => {
                Err(TranspileError::Context {
                    origin: origin.clone(),
                    reference: target.describe(),
                    conflict: ContextConflict::ScalarSequence { path: path.clone() },
                })
            }
            _ => Ok(()),
        }
    }
}
