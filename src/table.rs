//! Token table: the caller-supplied, read-only description of a grammar.
//!
//! A table maps symbolic names to token records. A leaf record carries a
//! [`Matcher`] and a transition target; a composite record carries an ordered
//! list of child names to try instead. The table declares one start symbol
//! and, optionally, a handler for positions where no candidate matches.
//!
//! Tables are immutable once built and may be shared by any number of
//! independently running parsers.

use crate::error::LexerError;
use crate::matcher::Matcher;
use crate::parser::Context;
use std::collections::HashMap;

/// Hook attached to a token, invoked with the parser context. Returning an
/// error aborts the whole parse; it propagates uncaught to the caller.
pub type Hook = Box<dyn Fn(&Context<'_>) -> Result<(), LexerError> + Send + Sync>;

/// Handler invoked when every candidate leaf for the current state failed.
pub type BadTokenHandler =
    Box<dyn Fn(&Context<'_>) -> Result<Recovery, LexerError> + Send + Sync>;

/// What a bad-token handler wants the driver to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Consume `n` characters, re-arm the start symbol, and keep parsing.
    Skip(usize),
    /// No recovery: the driver raises [`LexerError::NoMatch`].
    Decline,
}

/// Match rule of a token record.
pub enum Rule {
    /// Leaf: a concrete matcher.
    Match(Box<dyn Matcher>),
    /// Composite: ordered child token names to try in its place.
    Group(Vec<String>),
}

/// Transition target of a leaf token.
pub enum After {
    /// A fixed next-state name.
    State(String),
    /// A callable producing the next-state name from the context, letting a
    /// transition depend on captured match data.
    Choose(Box<dyn Fn(&Context<'_>) -> String + Send + Sync>),
}

/// One named token record.
///
/// Built fluently: `Token::matching(Literal::new("word1")).after("word2")`.
/// A record may be left without a rule or without a transition target; the
/// resolver reports those as [`LexerError::MissingMatcher`] and
/// [`LexerError::MissingTransition`] when the record is reached.
#[derive(Default)]
pub struct Token {
    rule: Option<Rule>,
    after: Option<After>,
    on_match: Option<Hook>,
    on_fail: Option<Hook>,
}

impl Token {
    /// An empty record with neither rule nor target.
    pub fn new() -> Self {
        Token::default()
    }

    /// A leaf record with the given matcher.
    pub fn matching(matcher: impl Matcher + 'static) -> Self {
        Token {
            rule: Some(Rule::Match(Box::new(matcher))),
            ..Token::default()
        }
    }

    /// A leaf record from an already-boxed matcher.
    pub fn matching_boxed(matcher: Box<dyn Matcher>) -> Self {
        Token {
            rule: Some(Rule::Match(matcher)),
            ..Token::default()
        }
    }

    /// A composite record with the given child names, tried in order.
    pub fn group<I>(children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Token {
            rule: Some(Rule::Group(children.into_iter().map(Into::into).collect())),
            ..Token::default()
        }
    }

    /// Set a fixed transition target.
    pub fn after(mut self, state: impl Into<String>) -> Self {
        self.after = Some(After::State(state.into()));
        self
    }

    /// Set a computed transition target.
    pub fn after_with(
        mut self,
        choose: impl Fn(&Context<'_>) -> String + Send + Sync + 'static,
    ) -> Self {
        self.after = Some(After::Choose(Box::new(choose)));
        self
    }

    /// Attach a hook run after this token matches, before the transition.
    pub fn on_match(
        mut self,
        hook: impl Fn(&Context<'_>) -> Result<(), LexerError> + Send + Sync + 'static,
    ) -> Self {
        self.on_match = Some(Box::new(hook));
        self
    }

    /// Attach a hook run when an attempt of this token fails.
    pub fn on_fail(
        mut self,
        hook: impl Fn(&Context<'_>) -> Result<(), LexerError> + Send + Sync + 'static,
    ) -> Self {
        self.on_fail = Some(Box::new(hook));
        self
    }

    pub(crate) fn rule(&self) -> Option<&Rule> {
        self.rule.as_ref()
    }

    pub(crate) fn transition(&self) -> Option<&After> {
        self.after.as_ref()
    }

    pub(crate) fn match_hook(&self) -> Option<&Hook> {
        self.on_match.as_ref()
    }

    pub(crate) fn fail_hook(&self) -> Option<&Hook> {
        self.on_fail.as_ref()
    }
}

/// Read-only mapping from token names to records, with a designated start
/// symbol and an optional bad-token handler.
pub struct TokenTable {
    tokens: HashMap<String, Token>,
    begin: String,
    on_bad_token: Option<BadTokenHandler>,
}

impl TokenTable {
    /// Create an empty table whose start symbol is `begin`.
    pub fn new(begin: impl Into<String>) -> Self {
        TokenTable {
            tokens: HashMap::new(),
            begin: begin.into(),
            on_bad_token: None,
        }
    }

    /// Add or replace a token record.
    pub fn define(&mut self, name: impl Into<String>, token: Token) -> &mut Self {
        self.tokens.insert(name.into(), token);
        self
    }

    /// Install the handler invoked when no candidate leaf matches.
    pub fn on_bad_token(
        &mut self,
        handler: impl Fn(&Context<'_>) -> Result<Recovery, LexerError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.on_bad_token = Some(Box::new(handler));
        self
    }

    /// The start symbol name.
    pub fn begin(&self) -> &str {
        &self.begin
    }

    pub(crate) fn entry(&self, name: &str) -> Option<(&str, &Token)> {
        self.tokens
            .get_key_value(name)
            .map(|(key, token)| (key.as_str(), token))
    }

    pub(crate) fn bad_token_handler(&self) -> Option<&BadTokenHandler> {
        self.on_bad_token.as_ref()
    }
}
