/*
 * definitions.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Conversion definitions: the mapping tables that drive name resolution and
//! sequence detection.
//!
//! Definitions are normally read from an INI-like file:
//!
//! ```text
//! [param_map_global]
//! module = module.name
//!
//! [param_map_group]
//! function = .function.name
//!
//! [group_param]
//! functions = function
//!
//! [sequences]
//! functions.args = arg
//! ```
//!
//! Once built, a [`Definitions`] value is read-only for the rest of the run.

use crate::error::{TranspileError, TranspileResult};
use crate::position::{Origin, Position};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

static SECTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[([^\]]+)\]").unwrap());
static ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\w._]+)[ \t]*(=[ \t]*(.*))?").unwrap());

/// Rejected definition entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("Value should be given for {0}")]
    MissingValue(&'static str),

    #[error("Group parameter is already defined before")]
    DuplicateGroup,

    #[error("Sequence '{0}' is already defined")]
    DuplicateSequence(String),
}

/// The distinguished group parameter and its iteration variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupParam {
    pub path: String,
    pub iterator: String,
}

/// Mapping tables consumed by the transpiler.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    param_map_global: HashMap<String, String>,
    param_map_group: HashMap<String, String>,
    group: Option<GroupParam>,
    sequences: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    ParamMapGlobal,
    ParamMapGroup,
    GroupParam,
    Sequences,
}

impl Section {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "param_map_global" => Some(Section::ParamMapGlobal),
            "param_map_group" => Some(Section::ParamMapGroup),
            "group_param" => Some(Section::GroupParam),
            "sequences" => Some(Section::Sequences),
            _ => None,
        }
    }
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read definitions from a file.
    pub fn from_file(path: &Path) -> TranspileResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| TranspileError::io(path, e))?;
        Self::parse(&text, &path.to_string_lossy())
    }

    /// Parse definitions text; `filename` is used in error reports.
    pub fn parse(text: &str, filename: &str) -> TranspileResult<Self> {
        let mut definitions = Definitions::new();
        let mut section = None;

        for (index, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim_start();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let origin = || {
                let mut position = Position::start(filename);
                position.line = index + 1;
                Origin::new(position, format!("{}\n", raw_line))
            };

            if let Some(caps) = SECTION_RE.captures(line) {
                let name = &caps[1];
                section = Some(Section::from_name(name).ok_or_else(|| {
                    TranspileError::config_at(origin(), format!("Unknown section: {}", name))
                })?);
                continue;
            }

            let Some(caps) = ENTRY_RE.captures(line) else {
                return Err(TranspileError::config_at(origin(), "Syntax error"));
            };
            let Some(section) = section else {
                return Err(TranspileError::config_at(
                    origin(),
                    "Parameter definition without section",
                ));
            };
            let name = &caps[1];
            let value = caps.get(3).map(|m| m.as_str().trim_end());

            definitions
                .add_entry(section, name, value)
                .map_err(|e| TranspileError::config_at(origin(), e.to_string()))?;
        }

        tracing::debug!(
            sequences = definitions.sequences.len(),
            group = ?definitions.group.as_ref().map(|g| g.path.as_str()),
            "Loaded conversion definitions from {}",
            filename
        );
        Ok(definitions)
    }

    fn add_entry(
        &mut self,
        section: Section,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), DefinitionError> {
        let value = value.filter(|v| !v.is_empty());
        match section {
            Section::ParamMapGlobal => {
                let value = value.ok_or(DefinitionError::MissingValue("parameter mapping"))?;
                self.add_global_mapping(name, value);
            }
            Section::ParamMapGroup => {
                let value = value.ok_or(DefinitionError::MissingValue("parameter mapping"))?;
                self.add_group_mapping(name, value);
            }
            Section::GroupParam => {
                if self.group.is_some() {
                    return Err(DefinitionError::DuplicateGroup);
                }
                let value =
                    value.ok_or(DefinitionError::MissingValue("group parameter name"))?;
                self.set_group_param(name, value)?;
            }
            Section::Sequences => {
                if self.sequences.contains_key(name) {
                    return Err(DefinitionError::DuplicateSequence(name.to_string()));
                }
                let value =
                    value.ok_or(DefinitionError::MissingValue("sequence parameter name"))?;
                self.add_sequence(name, value)?;
            }
        }
        Ok(())
    }

    /// Map a raw name to a parameter path in every template.
    pub fn add_global_mapping(&mut self, name: impl Into<String>, path: impl Into<String>) {
        self.param_map_global.insert(name.into(), path.into());
    }

    /// Map a raw name to a parameter path; a leading `.` is relative to the
    /// group parameter.
    pub fn add_group_mapping(&mut self, name: impl Into<String>, path: impl Into<String>) {
        self.param_map_group.insert(name.into(), path.into());
    }

    pub fn set_group_param(
        &mut self,
        path: impl Into<String>,
        iterator: impl Into<String>,
    ) -> Result<(), DefinitionError> {
        if self.group.is_some() {
            return Err(DefinitionError::DuplicateGroup);
        }
        self.group = Some(GroupParam {
            path: path.into(),
            iterator: iterator.into(),
        });
        Ok(())
    }

    pub fn add_sequence(
        &mut self,
        path: impl Into<String>,
        iterator: impl Into<String>,
    ) -> Result<(), DefinitionError> {
        let path = path.into();
        if self.sequences.contains_key(&path) {
            return Err(DefinitionError::DuplicateSequence(path));
        }
        self.sequences.insert(path, iterator.into());
        Ok(())
    }

    pub fn group(&self) -> Option<&GroupParam> {
        self.group.as_ref()
    }

    /// Iteration variable for `path` when it is a sequence.
    ///
    /// The group parameter counts as a sequence.
    pub fn sequence_iterator(&self, path: &str) -> Option<&str> {
        match &self.group {
            Some(group) if group.path == path => Some(group.iterator.as_str()),
            _ => self.sequences.get(path).map(String::as_str),
        }
    }

    pub fn is_sequence(&self, path: &str) -> bool {
        self.sequence_iterator(path).is_some()
    }

    /// Resolve a raw name used in a document template.
    pub fn map_document_name(&self, name: &str) -> String {
        match self.param_map_global.get(name) {
            Some(path) => path.clone(),
            None => self.map_block_name(name),
        }
    }

    /// Resolve a raw name used in a block template.
    pub fn map_block_name(&self, name: &str) -> String {
        match self.param_map_group.get(name) {
            Some(path) => self.group_relative(path),
            None => name.to_string(),
        }
    }

    fn group_relative(&self, path: &str) -> String {
        match &self.group {
            Some(group) if path.starts_with('.') => format!("{}{}", group.path, path),
            _ => path.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
# Conversion definitions
[param_map_global]
module = module.name

[param_map_group]
function = .function.name
returnType = ret_type

[sequences]
functions.args = arg

[group_param]
functions = function
";

    #[test]
    fn test_parse_all_sections() {
        let defs = Definitions::parse(SAMPLE, "defs.ini").unwrap();
        assert_eq!(defs.map_document_name("module"), "module.name");
        assert_eq!(
            defs.group(),
            Some(&GroupParam {
                path: "functions".to_string(),
                iterator: "function".to_string(),
            })
        );
        assert_eq!(defs.sequence_iterator("functions.args"), Some("arg"));
        assert_eq!(defs.sequence_iterator("functions"), Some("function"));
        assert_eq!(defs.sequence_iterator("module"), None);
    }

    #[test]
    fn test_group_mapping_prefix_applies_after_group_section() {
        let defs = Definitions::parse(SAMPLE, "defs.ini").unwrap();
        assert_eq!(defs.map_block_name("function"), "functions.function.name");
        assert_eq!(defs.map_block_name("returnType"), "ret_type");
    }

    #[test]
    fn test_block_templates_ignore_global_map() {
        let defs = Definitions::parse(SAMPLE, "defs.ini").unwrap();
        assert_eq!(defs.map_block_name("module"), "module");
        assert_eq!(defs.map_document_name("function"), "functions.function.name");
    }

    #[test]
    fn test_unmapped_names_are_identity() {
        let defs = Definitions::new();
        assert_eq!(defs.map_document_name("a.b"), "a.b");
    }

    #[test]
    fn test_unknown_section() {
        let err = Definitions::parse("[bogus]\n", "defs.ini").unwrap_err();
        assert_eq!(err.to_string(), "Unknown section: bogus");
        assert_eq!(err.origin().unwrap().position.line, 1);
    }

    #[test]
    fn test_entry_without_section() {
        let err = Definitions::parse("\n# c\nname = value\n", "defs.ini").unwrap_err();
        assert_eq!(err.to_string(), "Parameter definition without section");
        assert_eq!(err.origin().unwrap().position.line, 3);
    }

    #[test]
    fn test_duplicate_group_param() {
        let text = "[group_param]\nfunctions = function\nothers = other\n";
        let err = Definitions::parse(text, "defs.ini").unwrap_err();
        assert_eq!(err.to_string(), "Group parameter is already defined before");
    }

    #[test]
    fn test_duplicate_sequence() {
        let text = "[sequences]\nitems = item\nitems = entry\n";
        let err = Definitions::parse(text, "defs.ini").unwrap_err();
        assert_eq!(err.to_string(), "Sequence 'items' is already defined");
        assert!(matches!(err, TranspileError::Config { .. }));
    }

    #[test]
    fn test_sequence_without_value() {
        let err = Definitions::parse("[sequences]\nitems\n", "defs.ini").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Value should be given for sequence parameter name"
        );
    }

    #[test]
    fn test_mapping_without_value() {
        for text in ["[param_map_global]\nname\n", "[param_map_global]\nname =\n"] {
            let err = Definitions::parse(text, "defs.ini").unwrap_err();
            assert_eq!(err.to_string(), "Value should be given for parameter mapping");
        }
        let err = Definitions::parse("[param_map_group]\nname =  \n", "defs.ini").unwrap_err();
        assert_eq!(err.to_string(), "Value should be given for parameter mapping");
    }

    #[test]
    fn test_empty_value_is_missing() {
        let err = Definitions::parse("[sequences]\nitems =\n", "defs.ini").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Value should be given for sequence parameter name"
        );
        assert_eq!(err.origin().unwrap().position.line, 2);

        let err = Definitions::parse("[group_param]\nfunctions =\n", "defs.ini").unwrap_err();
        assert_eq!(err.to_string(), "Value should be given for group parameter name");
    }

    #[test]
    fn test_malformed_line() {
        let err = Definitions::parse("[sequences]\n= item\n", "defs.ini").unwrap_err();
        assert_eq!(err.to_string(), "Syntax error");
    }

    #[test]
    fn test_programmatic_duplicates() {
        let mut defs = Definitions::new();
        defs.add_sequence("items", "item").unwrap();
        assert_eq!(
            defs.add_sequence("items", "x"),
            Err(DefinitionError::DuplicateSequence("items".to_string()))
        );
        defs.set_group_param("blocks", "block").unwrap();
        assert_eq!(
            defs.set_group_param("other", "o"),
            Err(DefinitionError::DuplicateGroup)
        );
    }
}
