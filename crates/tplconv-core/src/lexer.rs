/*
 * lexer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Source dialect tokens.
//!
//! The source dialect has four block forms delimited by `<$` and `$>`:
//!
//! - `<$if name$>` and `<$if concat(name)$>`
//! - `<$else$>`
//! - `<$endif$>`
//! - `<$name$>`, `<$name: join$>` and `<$name: join(separator)$>`
//!
//! Everything else is literal text, cut before each `<`.

use crate::error::TranspileResult;
use crate::position::{Origin, Position};
use crate::scanner::{RawToken, Rule, RuleSet, Scanner};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    If,
    Else,
    Endif,
    Reference,
    Text,
}

static SOURCE_RULES: Lazy<RuleSet<RuleKind>> = Lazy::new(|| {
    RuleSet::new(&[
        Rule {
            kind: RuleKind::If,
            group: "if_stmt",
            pattern: r"<\$if[ \t]+(?:(?P<concat>concat\((?P<name_if_c>[\w.]+)\))|(?P<name_if>[\w.]+))[ \t]*\$>",
        },
        Rule {
            kind: RuleKind::Else,
            group: "else_stmt",
            pattern: r"<\$[ \t]*else[ \t]*\$>",
        },
        Rule {
            kind: RuleKind::Endif,
            group: "endif_stmt",
            pattern: r"<\$[ \t]*endif[ \t]*\$>",
        },
        Rule {
            kind: RuleKind::Reference,
            group: "ref_stmt",
            pattern: r"<\$[ \t]*(?P<name_ref>[\w.]+)[ \t]*(?P<join>:[ \t]*join[ \t]*(?:\((?P<join_str>[^)]*)\)[ \t]*)?)?\$>",
        },
        Rule {
            kind: RuleKind::Text,
            group: "text",
            pattern: r"[^<]+|<[^<]*",
        },
    ])
    .expect("source dialect rules are valid")
});

static JOIN_ESCAPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\n|\\t|\\\\|\\$").unwrap());

/// The kind of a source dialect token, with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    If {
        name: String,
        concat: bool,
    },
    Else,
    Endif,
    /// `join` is `Some(separator)` for join references; a bare `join`
    /// has an empty separator.
    Reference {
        name: String,
        join: Option<String>,
    },
}

/// A token with its literal text and where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn origin(&self) -> Origin {
        Origin::new(self.position.clone(), self.text.clone())
    }

    fn from_raw(raw: RawToken<'_, RuleKind>) -> Self {
        let caps = &raw.captures;
        let kind = match raw.kind {
            RuleKind::Text => TokenKind::Text,
            RuleKind::Else => TokenKind::Else,
            RuleKind::Endif => TokenKind::Endif,
            RuleKind::If => match caps.name("name_if_c") {
                Some(name) => TokenKind::If {
                    name: name.as_str().to_string(),
                    concat: true,
                },
                None => TokenKind::If {
                    name: group_text(caps, "name_if"),
                    concat: false,
                },
            },
            RuleKind::Reference => TokenKind::Reference {
                name: group_text(caps, "name_ref"),
                join: caps.name("join").map(|_| {
                    caps.name("join_str")
                        .map(|s| decode_separator(s.as_str()))
                        .unwrap_or_default()
                }),
            },
        };
        Token {
            kind,
            text: raw.text.to_string(),
            position: raw.position,
        }
    }
}

fn group_text(caps: &Captures<'_>, name: &str) -> String {
    caps.name(name)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Decode the escapes allowed inside `join(...)`: `\n`, `\t`, `\\`, and a
/// trailing lone backslash, which stands for itself.
pub fn decode_separator(raw: &str) -> String {
    JOIN_ESCAPE_RE
        .replace_all(raw, |caps: &Captures<'_>| match &caps[0] {
            "\\n" => "\n",
            "\\t" => "\t",
            _ => "\\",
        })
        .into_owned()
}

/// Token stream over one source file with one-token pushback.
#[derive(Debug)]
pub struct TokenStream<'s> {
    scanner: Scanner<'static, 's, RuleKind>,
    pending: Option<Token>,
}

impl<'s> TokenStream<'s> {
    pub fn new(content: &'s str, filename: &str) -> Self {
        Self {
            scanner: Scanner::new(&SOURCE_RULES, content, filename),
            pending: None,
        }
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> TranspileResult<Option<Token>> {
        if let Some(token) = self.pending.take() {
            return Ok(Some(token));
        }
        Ok(self.scanner.token()?.map(Token::from_raw))
    }

    /// Return `token` to the stream; the next [`next_token`](Self::next_token)
    /// yields it again. Only one token can be pending.
    pub fn unget(&mut self, token: Token) {
        debug_assert!(self.pending.is_none(), "only one token can be pushed back");
        self.pending = Some(token);
    }

    /// Look at the next token without consuming it.
    pub fn peek(&mut self) -> TranspileResult<Option<&Token>> {
        if self.pending.is_none() {
            self.pending = self.scanner.token()?.map(Token::from_raw);
        }
        Ok(self.pending.as_ref())
    }
}
