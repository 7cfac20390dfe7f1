/*
 * emitter.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Target dialect emitter.
//!
//! The target dialect has three constructs: blocks `<$ ... $>`, variables
//! `{{ ... }}` and literal text. Its engine drops the first newline after a
//! block and one trailing newline at the end of a template. The emitter
//! compensates for both so rendered output keeps every newline of the
//! source text.

use crate::ast::{AstNode, ElemRef, IfCondition, IfNode, RefNode, TemplateAst};
use crate::context::rel_param_name;
use crate::definitions::Definitions;
use crate::diagnostics::{Diagnostic, DiagnosticCollector};
use crate::error::TranspileResult;
use crate::position::Origin;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Target delimiters that must not appear verbatim in literal text. A lone
/// `{` ending a text node would merge with a following `{{`.
static TARGET_DELIMITER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<\$|\$>|\{\{|\}\}|<#|#>|\{\z").unwrap());

/// Output of one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedTemplate {
    /// Output name (file stem of the `.tpl` file).
    pub name: String,
    /// The source file it was produced from.
    pub source_filename: String,
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Emit `template` in the target dialect.
pub fn emit_template(
    template: &TemplateAst,
    definitions: &Definitions,
) -> TranspileResult<EmittedTemplate> {
    let mut emitter = Emitter {
        template,
        definitions,
        out: String::new(),
        newline_trimmed: false,
        last_newline: false,
        diagnostics: DiagnosticCollector::new(),
    };
    emitter.emit_sequence(&template.nodes)?;
    emitter.finish();

    Ok(EmittedTemplate {
        name: template.name.clone(),
        source_filename: template.filename.clone(),
        text: emitter.out,
        diagnostics: emitter.diagnostics.into_diagnostics(),
    })
}

/// Escape target delimiters in literal text as string expressions.
pub fn escape_text(text: &str) -> String {
    TARGET_DELIMITER_RE
        .replace_all(text, |caps: &Captures<'_>| format!("{{{{ '{}' }}}}", &caps[0]))
        .into_owned()
}

/// Double-quoted string literal of the target expression language.
pub fn quote_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

struct Emitter<'a> {
    template: &'a TemplateAst,
    definitions: &'a Definitions,
    out: String,
    /// The engine will drop the next newline (a block was just emitted).
    newline_trimmed: bool,
    /// The last emitted character is a newline from literal text.
    last_newline: bool,
    diagnostics: DiagnosticCollector,
}

impl<'a> Emitter<'a> {
    fn emit_sequence(&mut self, nodes: &[AstNode]) -> TranspileResult<()> {
        for node in nodes {
            match node {
                AstNode::Text(text) => self.emit_text(&text.text),
                AstNode::Ref(reference) => self.emit_ref(reference)?,
                AstNode::If(if_node) => self.emit_if(if_node)?,
            }
        }
        Ok(())
    }

    fn finish(&mut self) {
        // The engine strips one trailing newline; give it a spare one.
        if self.last_newline || self.newline_trimmed {
            self.out.push('\n');
        }
    }

    fn emit_ref(&mut self, node: &RefNode) -> TranspileResult<()> {
        let Some(separator) = &node.join else {
            self.emit_ref_simple(&node.target);
            return Ok(());
        };

        let contexts = self
            .template
            .context
            .context_path(&node.target, self.definitions)?;
        if contexts.is_empty() {
            self.diagnostics
                .warn_at("Join is not needed", node.target.origin());
            self.emit_ref_simple(&node.target);
            return Ok(());
        }

        match (&node.target, contexts.as_slice()) {
            (ElemRef::Param { path, .. }, [context]) if context == path => {
                self.emit_parameter_joined(path, separator);
            }
            (ElemRef::Param { path, .. }, [context]) => {
                self.emit_parameter_joined_attr(path, separator, context);
            }
            _ => self.emit_join_generic(&node.target, &contexts, separator),
        }
        Ok(())
    }

    fn emit_ref_simple(&mut self, target: &ElemRef) {
        match target {
            ElemRef::Template { template, .. } => {
                self.emit_block(&format!("include '{}'", template.name));
            }
            ElemRef::Param { path, .. } => {
                let name = rel_param_name(path, self.definitions);
                self.emit_variable(&name);
            }
        }
    }

    /// Join through explicit loops, outermost first.
    fn emit_join_generic(&mut self, target: &ElemRef, contexts: &[String], separator: &str) {
        let depth = contexts.len();
        let track_first = depth > 1 && !separator.is_empty();

        for (index, context) in contexts.iter().rev().enumerate() {
            let iterator = self.iterator(context);
            let sequence = rel_param_name(context, self.definitions);
            self.emit_block(&format!("for {} in {}", iterator, sequence));
            // Inner loops shadow `loop`; keep the outer loop's state.
            if track_first && index + 1 < depth {
                self.emit_block(&format!("set loop{} = loop", index));
            }
        }

        if !separator.is_empty() {
            let condition = std::iter::once("not loop.first".to_string())
                .chain((0..depth - 1).map(|index| format!("not loop{}.first", index)))
                .collect::<Vec<_>>()
                .join(" or ");
            self.emit_block(&format!("if {}", condition));
            self.emit_text(separator);
            self.emit_block("endif");
        }

        match target {
            // The innermost loop already walks the parameter itself.
            ElemRef::Param { path, .. } if contexts.first() == Some(path) => {
                let iterator = self.iterator(path);
                self.emit_variable(iterator);
            }
            _ => self.emit_ref_simple(target),
        }

        for _ in contexts {
            self.emit_block("endfor");
        }
    }

    fn emit_parameter_joined(&mut self, path: &str, separator: &str) {
        let sequence = rel_param_name(path, self.definitions);
        self.emit_variable(&format!(
            "{} | join(d={})",
            sequence,
            quote_string(separator)
        ));
    }

    fn emit_parameter_joined_attr(&mut self, path: &str, separator: &str, context: &str) {
        let sequence = rel_param_name(context, self.definitions);
        let attribute = &path[context.len() + 1..];
        self.emit_variable(&format!(
            "{} | join(d={}, attribute=\"{}\")",
            sequence,
            quote_string(separator),
            attribute
        ));
    }

    fn emit_if(&mut self, node: &IfNode) -> TranspileResult<()> {
        let condition = self.condition_str(&node.condition)?;
        self.emit_block(&format!("if {}", condition));
        self.emit_sequence(&node.then_branch)?;
        if let Some(else_branch) = &node.else_branch {
            self.emit_block("else");
            self.emit_sequence(else_branch)?;
        }
        self.emit_block("endif");
        Ok(())
    }

    fn condition_str(&mut self, condition: &IfCondition) -> TranspileResult<String> {
        let path = match &condition.target {
            ElemRef::Template { template, origin } => {
                self.stub_note("Cannot convert template as condition.", origin);
                return Ok(if condition.concat {
                    format!("STAB: concat({})", template.name)
                } else {
                    format!("STAB: {}", template.name)
                });
            }
            ElemRef::Param { path, .. } => path,
        };

        let mut contexts = Vec::new();
        if condition.concat {
            contexts = self
                .template
                .context
                .context_path(&condition.target, self.definitions)?;
            if contexts.is_empty() {
                self.diagnostics
                    .warn_at("Concat is not needed.", condition.target.origin());
            }
        }
        // A sequence tested as a whole needs no extra context.
        if contexts.first() == Some(path) {
            contexts.remove(0);
        }

        Ok(match contexts.as_slice() {
            [] => rel_param_name(path, self.definitions),
            [sequence] => format!(
                "{} | join(attribute='{}')",
                rel_param_name(sequence, self.definitions),
                &path[sequence.len() + 1..]
            ),
            _ => {
                self.stub_note(
                    "Concatenation of parameters as condition here too complex for automatic conversion.",
                    condition.target.origin(),
                );
                format!("STAB: concat({})", path)
            }
        })
    }

    fn stub_note(&mut self, message: &str, origin: &Origin) {
        self.diagnostics.note_at(
            format!("{} 'STAB' will be used in the resulting template.", message),
            origin,
        );
    }

    fn iterator(&self, sequence: &str) -> &'a str {
        self.definitions
            .sequence_iterator(sequence)
            .unwrap_or_default()
    }

    fn emit_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let escaped = escape_text(text);
        if self.newline_trimmed {
            if escaped.starts_with('\n') {
                // Sacrificed to the engine's trim after the preceding block.
                self.out.push('\n');
            }
            self.newline_trimmed = false;
        }
        self.out.push_str(&escaped);
        self.last_newline = escaped.ends_with('\n');
    }

    fn emit_block(&mut self, content: &str) {
        self.out.push_str("<$");
        self.out.push_str(content);
        self.out.push_str("$>");
        self.newline_trimmed = true;
        self.last_newline = false;
    }

    fn emit_variable(&mut self, content: &str) {
        self.out.push_str("{{");
        self.out.push_str(content);
        self.out.push_str("}}");
        self.newline_trimmed = false;
        self.last_newline = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Namespace, TemplateHandle, TextNode};
    use crate::diagnostics::Severity;
    use crate::position::Position;
    use pretty_assertions::assert_eq;

    fn definitions() -> Definitions {
        let mut defs = Definitions::new();
        defs.add_sequence("items", "item").unwrap();
        defs.add_sequence("items.tags", "tag").unwrap();
        defs
    }

    fn origin() -> Origin {
        Origin::new(Position::start("document/document.src"), "<$x$>")
    }

    fn text(s: &str) -> AstNode {
        AstNode::Text(TextNode {
            text: s.to_string(),
            position: Position::start("document/document.src"),
        })
    }

    fn param(path: &str) -> ElemRef {
        ElemRef::Param {
            path: path.to_string(),
            origin: origin(),
        }
    }

    fn reference(path: &str, join: Option<&str>) -> AstNode {
        AstNode::Ref(RefNode {
            target: param(path),
            join: join.map(str::to_string),
        })
    }

    fn emit(nodes: Vec<AstNode>, defs: &Definitions) -> EmittedTemplate {
        let mut template = TemplateAst::new(Namespace::Document, "document", "", "document.src");
        template.nodes = nodes;
        emit_template(&template, defs).unwrap()
    }

    #[test]
    fn test_plain_text_and_variable() {
        let out = emit(vec![text("Hello, "), reference("name", None), text("!")], &definitions());
        assert_eq!(out.text, "Hello, {{name}}!");
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a <$ b $> c"), "a {{ '<$' }} b {{ '$>' }} c");
        assert_eq!(escape_text("{{x}} <#c#>"), "{{ '{{' }}x{{ '}}' }} {{ '<#' }}c{{ '#>' }}");
        assert_eq!(escape_text("{{{"), "{{ '{{' }}{{ '{' }}");
        assert_eq!(escape_text("a{b"), "a{b");
        assert_eq!(escape_text("plain"), "plain");
    }

    #[test]
    fn test_quote_string() {
        assert_eq!(quote_string(", "), "\", \"");
        assert_eq!(quote_string("a\"b\\\n"), "\"a\\\"b\\\\\\n\"");
    }

    #[test]
    fn test_compact_join() {
        let out = emit(vec![reference("items", Some(", "))], &definitions());
        assert_eq!(out.text, "{{items | join(d=\", \")}}");
    }

    #[test]
    fn test_compact_join_on_attribute() {
        let out = emit(vec![reference("items.name", Some("; "))], &definitions());
        assert_eq!(
            out.text,
            "{{items | join(d=\"; \", attribute=\"name\")}}"
        );
    }

    #[test]
    fn test_generic_join_two_levels() {
        let out = emit(vec![reference("items.tags", Some(", "))], &definitions());
        assert_eq!(
            out.text,
            "<$for item in items$><$set loop0 = loop$><$for tag in item.tags$>\
             <$if not loop.first or not loop0.first$>, <$endif$>{{tag}}<$endfor$><$endfor$>\n"
        );
    }

    #[test]
    fn test_generic_join_attribute_without_separator() {
        let out = emit(vec![reference("items.tags.label", Some(""))], &definitions());
        assert_eq!(
            out.text,
            "<$for item in items$><$for tag in item.tags$>{{tag.label}}<$endfor$><$endfor$>\n"
        );
    }

    #[test]
    fn test_template_join_uses_loops() {
        let node = AstNode::Ref(RefNode {
            target: ElemRef::Template {
                template: TemplateHandle {
                    name: "block_block".to_string(),
                    base_context: "items".to_string(),
                },
                origin: origin(),
            },
            join: Some("\n".to_string()),
        });
        let out = emit(vec![node], &definitions());
        assert_eq!(
            out.text,
            "<$for item in items$><$if not loop.first$>\n\n<$endif$><$include 'block_block'$><$endfor$>\n"
        );
    }

    #[test]
    fn test_unneeded_join_warns() {
        let out = emit(vec![reference("title", Some(", "))], &definitions());
        assert_eq!(out.text, "{{title}}");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].severity, Severity::Warning);
        assert_eq!(out.diagnostics[0].message, "Join is not needed");
    }

    #[test]
    fn test_newline_after_block_is_doubled() {
        let if_node = AstNode::If(IfNode {
            condition: IfCondition {
                target: param("flag"),
                concat: false,
            },
            then_branch: vec![text("\nyes\n")],
            else_branch: Some(vec![text("no")]),
        });
        let out = emit(vec![if_node, text("\nend")], &definitions());
        assert_eq!(out.text, "<$if flag$>\n\nyes\n<$else$>no<$endif$>\n\nend");
    }

    #[test]
    fn test_trailing_newline_gets_spare() {
        let out = emit(vec![text("line\n")], &definitions());
        assert_eq!(out.text, "line\n\n");
        let out = emit(vec![text("line")], &definitions());
        assert_eq!(out.text, "line");
    }

    #[test]
    fn test_concat_condition_on_attribute() {
        let if_node = AstNode::If(IfNode {
            condition: IfCondition {
                target: param("items.name"),
                concat: true,
            },
            then_branch: vec![text("x")],
            else_branch: None,
        });
        let out = emit(vec![if_node], &definitions());
        assert_eq!(
            out.text,
            "<$if items | join(attribute='name')$>x<$endif$>\n"
        );
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_concat_condition_on_sequence() {
        let if_node = AstNode::If(IfNode {
            condition: IfCondition {
                target: param("items"),
                concat: true,
            },
            then_branch: vec![],
            else_branch: None,
        });
        let out = emit(vec![if_node], &definitions());
        assert_eq!(out.text, "<$if items$><$endif$>\n");
    }

    #[test]
    fn test_concat_condition_too_deep_is_stubbed() {
        let if_node = AstNode::If(IfNode {
            condition: IfCondition {
                target: param("items.tags.label"),
                concat: true,
            },
            then_branch: vec![],
            else_branch: None,
        });
        let out = emit(vec![if_node], &definitions());
        assert_eq!(out.text, "<$if STAB: concat(items.tags.label)$><$endif$>\n");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].severity, Severity::Note);
    }

    #[test]
    fn test_unneeded_concat_warns() {
        let if_node = AstNode::If(IfNode {
            condition: IfCondition {
                target: param("title"),
                concat: true,
            },
            then_branch: vec![],
            else_branch: None,
        });
        let out = emit(vec![if_node], &definitions());
        assert_eq!(out.text, "<$if title$><$endif$>\n");
        assert_eq!(out.diagnostics[0].message, "Concat is not needed.");
    }

    #[test]
    fn test_template_condition_is_stubbed() {
        let if_node = AstNode::If(IfNode {
            condition: IfCondition {
                target: ElemRef::Template {
                    template: TemplateHandle {
                        name: "header".to_string(),
                        base_context: String::new(),
                    },
                    origin: origin(),
                },
                concat: false,
            },
            then_branch: vec![],
            else_branch: None,
        });
        let out = emit(vec![if_node], &definitions());
        assert_eq!(out.text, "<$if STAB: header$><$endif$>\n");
        assert_eq!(out.diagnostics[0].severity, Severity::Note);
    }

    #[test]
    fn test_emission_is_deterministic() {
        let nodes = vec![text("a\n"), reference("items.tags", Some(", ")), text("\nb")];
        let first = emit(nodes.clone(), &definitions());
        let second = emit(nodes, &definitions());
        assert_eq!(first, second);
    }
}
