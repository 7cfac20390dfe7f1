/*
 * scanner.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Generic rule-driven scanner.
//!
//! A [`RuleSet`] combines an ordered list of `(kind, group, pattern)` rules
//! into one alternation anchored at the current offset. The first rule whose
//! pattern matches there wins, so significant constructs must come before
//! any catch-all text rule.

use crate::error::{TranspileError, TranspileResult};
use crate::position::{Origin, Position};
use regex::{Captures, Regex};

/// A single scanner rule.
#[derive(Debug, Clone, Copy)]
pub struct Rule<K> {
    pub kind: K,
    /// Name of the capture group wrapping the whole pattern. Must be unique
    /// across the rule set, including the named groups inside patterns.
    pub group: &'static str,
    pub pattern: &'static str,
}

/// Ordered rules compiled into a single regular expression.
#[derive(Debug, Clone)]
pub struct RuleSet<K> {
    regex: Regex,
    kinds: Vec<(&'static str, K)>,
}

impl<K: Copy> RuleSet<K> {
    pub fn new(rules: &[Rule<K>]) -> Result<Self, regex::Error> {
        let alternation = rules
            .iter()
            .map(|rule| format!("(?P<{}>{})", rule.group, rule.pattern))
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&format!("^(?:{})", alternation))?;
        let kinds = rules.iter().map(|rule| (rule.group, rule.kind)).collect();
        Ok(Self { regex, kinds })
    }

    fn matching_kind(&self, captures: &Captures<'_>) -> Option<K> {
        self.kinds
            .iter()
            .find(|(group, _)| captures.name(group).is_some())
            .map(|(_, kind)| *kind)
    }
}

/// A matched token before any interpretation of its sub-groups.
#[derive(Debug)]
pub struct RawToken<'s, K> {
    pub kind: K,
    pub captures: Captures<'s>,
    pub text: &'s str,
    pub position: Position,
}

/// Cursor over one file's content.
#[derive(Debug)]
pub struct Scanner<'r, 's, K> {
    rules: &'r RuleSet<K>,
    content: &'s str,
    offset: usize,
    position: Position,
}

impl<'r, 's, K: Copy> Scanner<'r, 's, K> {
    pub fn new(rules: &'r RuleSet<K>, content: &'s str, filename: &str) -> Self {
        Self {
            rules,
            content,
            offset: 0,
            position: Position::start(filename),
        }
    }

    /// Return the next token, or `None` at end of input.
    pub fn token(&mut self) -> TranspileResult<Option<RawToken<'s, K>>> {
        let content = self.content;
        let rest = &content[self.offset..];
        if rest.is_empty() {
            return Ok(None);
        }

        let matched = self.rules.regex.captures(rest).and_then(|captures| {
            let kind = self.rules.matching_kind(&captures)?;
            let whole = captures.get(0)?;
            if whole.is_empty() {
                None
            } else {
                Some((kind, whole.as_str(), captures))
            }
        });

        let Some((kind, text, captures)) = matched else {
            let line = match rest.find('\n') {
                Some(end) => &rest[..end],
                None => rest,
            };
            return Err(TranspileError::Lexical {
                origin: Origin::new(self.position.clone(), line),
            });
        };

        let position = self.position.clone();
        self.offset += text.len();
        self.position.advance(text);
        Ok(Some(RawToken {
            kind,
            captures,
            text,
            position,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        Number,
        Word,
        Space,
    }

    fn rules() -> RuleSet<Kind> {
        RuleSet::new(&[
            Rule {
                kind: Kind::Number,
                group: "number",
                pattern: r"[0-9]+",
            },
            Rule {
                kind: Kind::Word,
                group: "word",
                pattern: r"(?P<word_head>[a-z])[a-z0-9]*",
            },
            Rule {
                kind: Kind::Space,
                group: "space",
                pattern: r"[ \n]+",
            },
        ])
        .unwrap()
    }

    fn kinds(input: &str) -> Vec<(Kind, String)> {
        let rules = rules();
        let mut scanner = Scanner::new(&rules, input, "t.src");
        let mut out = Vec::new();
        while let Some(token) = scanner.token().unwrap() {
            out.push((token.kind, token.text.to_string()));
        }
        out
    }

    #[test]
    fn test_tokens_in_order() {
        assert_eq!(
            kinds("abc 12 x9"),
            vec![
                (Kind::Word, "abc".to_string()),
                (Kind::Space, " ".to_string()),
                (Kind::Number, "12".to_string()),
                (Kind::Space, " ".to_string()),
                (Kind::Word, "x9".to_string()),
            ]
        );
    }

    #[test]
    fn test_inner_groups_are_available() {
        let rules = rules();
        let mut scanner = Scanner::new(&rules, "hello", "t.src");
        let token = scanner.token().unwrap().unwrap();
        assert_eq!(&token.captures["word_head"], "h");
    }

    #[test]
    fn test_positions_follow_newlines() {
        let rules = rules();
        let mut scanner = Scanner::new(&rules, "ab\n cd", "t.src");
        let first = scanner.token().unwrap().unwrap();
        assert_eq!((first.position.line, first.position.column), (1, 0));
        scanner.token().unwrap();
        let third = scanner.token().unwrap().unwrap();
        assert_eq!(third.text, "cd");
        assert_eq!((third.position.line, third.position.column), (2, 1));
    }

    #[test]
    fn test_unmatched_input_is_lexical_error() {
        let rules = rules();
        let mut scanner = Scanner::new(&rules, "ab ?x\nnext", "t.src");
        scanner.token().unwrap();
        scanner.token().unwrap();
        let err = scanner.token().unwrap_err();
        match err {
            TranspileError::Lexical { origin } => {
                assert_eq!(origin.text, "?x");
                assert_eq!(origin.position.column, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(kinds("").is_empty());
    }
}
