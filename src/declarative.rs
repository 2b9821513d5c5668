//! Declarative grammar files: token tables as data.
//!
//! A restricted, serializable form of the token table for grammars that need
//! no hooks or computed transitions: literal, pattern, and alternation rules
//! plus composite groups, with static `after` targets. Loaded from YAML and
//! converted into a regular [`TokenTable`].
//!
//! ```yaml
//! begin: start
//! tokens:
//!   start:
//!     match: { literal: "word1" }
//!     after: word2
//!   word2:
//!     match: { pattern: "wo?rd2", icase: true }
//!     after: eol
//!   eol:
//!     match: { pattern: "\n?$" }
//!     after: start
//! ```
//!
//! Unknown `after` targets are not validated at load time; the resolver
//! reports them as `TokenNotFound` when reached, exactly as it does for
//! tables built in code.

use crate::matcher::{Alternation, Literal, Matcher, Pattern};
use crate::table::{Token, TokenTable};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("valid name pattern"));

/// Error while loading or converting a grammar file.
#[derive(Debug)]
pub enum GrammarError {
    /// The document is not valid YAML for the grammar shape.
    Parse(serde_yaml::Error),
    /// A token name that is not a valid identifier.
    BadName(String),
    /// A `pattern` rule whose regex does not compile.
    BadPattern {
        name: String,
        pattern: String,
        error: String,
    },
    /// A `tokens` group nested inside an `any` alternation.
    GroupInsideAny(String),
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::Parse(err) => write!(f, "invalid grammar file: {}", err),
            GrammarError::BadName(name) => write!(f, "invalid token name \"{}\"", name),
            GrammarError::BadPattern { name, pattern, error } => write!(
                f,
                "token \"{}\": invalid pattern \"{}\": {}",
                name, pattern, error
            ),
            GrammarError::GroupInsideAny(name) => write!(
                f,
                "token \"{}\": a \"tokens\" group cannot appear inside \"any\"",
                name
            ),
        }
    }
}

impl Error for GrammarError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GrammarError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

/// Top-level grammar document.
#[derive(Debug, Deserialize)]
pub struct GrammarFile {
    /// Start symbol name.
    pub begin: String,
    /// Token records by name.
    pub tokens: BTreeMap<String, TokenSpec>,
}

/// One token record in data form.
#[derive(Debug, Deserialize)]
pub struct TokenSpec {
    #[serde(rename = "match")]
    pub rule: Option<RuleSpec>,
    pub after: Option<String>,
}

/// Match rule in data form. The variants are told apart by their key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RuleSpec {
    Literal {
        literal: String,
        #[serde(default)]
        icase: bool,
    },
    Pattern {
        pattern: String,
        #[serde(default)]
        icase: bool,
    },
    Any {
        any: Vec<RuleSpec>,
    },
    Group {
        tokens: Vec<String>,
    },
}

impl GrammarFile {
    /// Parse a grammar document from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, GrammarError> {
        serde_yaml::from_str(text).map_err(GrammarError::Parse)
    }

    /// Convert the document into a runnable token table.
    pub fn into_table(self) -> Result<TokenTable, GrammarError> {
        let mut table = TokenTable::new(self.begin);
        for (name, spec) in self.tokens {
            if !NAME_PATTERN.is_match(&name) {
                return Err(GrammarError::BadName(name));
            }
            let mut token = match spec.rule {
                Some(RuleSpec::Group { tokens }) => Token::group(tokens),
                Some(rule) => Token::matching_boxed(build_matcher(rule, &name)?),
                None => Token::new(),
            };
            if let Some(after) = spec.after {
                token = token.after(after);
            }
            table.define(name, token);
        }
        Ok(table)
    }
}

fn build_matcher(spec: RuleSpec, name: &str) -> Result<Box<dyn Matcher>, GrammarError> {
    match spec {
        RuleSpec::Literal { literal, icase } => Ok(if icase {
            Box::new(Literal::icase(literal))
        } else {
            Box::new(Literal::new(literal))
        }),
        RuleSpec::Pattern { pattern, icase } => {
            let built = if icase {
                Pattern::icase(&pattern)
            } else {
                Pattern::new(&pattern)
            };
            match built {
                Ok(matcher) => Ok(Box::new(matcher)),
                Err(err) => Err(GrammarError::BadPattern {
                    name: name.to_string(),
                    pattern,
                    error: err.to_string(),
                }),
            }
        }
        RuleSpec::Any { any } => {
            let members = any
                .into_iter()
                .map(|member| match member {
                    RuleSpec::Group { .. } => Err(GrammarError::GroupInsideAny(name.to_string())),
                    other => build_matcher(other, name),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Box::new(Alternation::new(members)))
        }
        RuleSpec::Group { .. } => Err(GrammarError::GroupInsideAny(name.to_string())),
    }
}
