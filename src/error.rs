//! Structured error taxonomy for table and parse failures.
//!
//! The first four variants are structural: they indicate a malformed token
//! table and surface while the resolver expands the graph for a state, before
//! any input is consumed for that attempt. `NoMatch` is the only data error;
//! it is the one case a caller may route through a bad-token handler.
//! `Aborted` wraps an error returned by a caller hook and is the supported
//! way to stop a parse early from inside a grammar action.

use std::error::Error;
use std::fmt;

/// Error raised by the resolver or the parser driver.
#[derive(Debug)]
pub enum LexerError {
    /// A referenced token name is absent from the table.
    TokenNotFound { name: String },
    /// A token record has no match rule at all.
    MissingMatcher { name: String },
    /// A leaf token has no transition target.
    MissingTransition { name: String },
    /// A composite token was re-entered on its own expansion path.
    /// `name` is the innermost re-entered composite, not an ancestor.
    LoopDetected { name: String },
    /// Every candidate leaf failed at the current position.
    /// `lineno` and `column` are 1-based.
    NoMatch { lineno: usize, column: usize },
    /// A hook or bad-token handler aborted the parse.
    Aborted(Box<dyn Error + Send + Sync>),
}

impl LexerError {
    /// Wrap an arbitrary error (or message) as a hook abort.
    pub fn aborted(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        LexerError::Aborted(err.into())
    }
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexerError::TokenNotFound { name } => {
                write!(f, "token \"{}\" not found in table", name)
            }
            LexerError::MissingMatcher { name } => {
                write!(f, "token \"{}\" has no match rule", name)
            }
            LexerError::MissingTransition { name } => {
                write!(f, "leaf token \"{}\" has no transition target", name)
            }
            LexerError::LoopDetected { name } => {
                write!(f, "token graph loops back through \"{}\"", name)
            }
            LexerError::NoMatch { lineno, column } => {
                write!(f, "no token matched at line {}, column {}", lineno, column)
            }
            LexerError::Aborted(err) => write!(f, "parse aborted by hook: {}", err),
        }
    }
}

impl Error for LexerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LexerError::Aborted(err) => Some(&**err as &(dyn Error + 'static)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_offending_name() {
        for err in [
            LexerError::TokenNotFound { name: "spam".into() },
            LexerError::MissingMatcher { name: "spam".into() },
            LexerError::MissingTransition { name: "spam".into() },
            LexerError::LoopDetected { name: "spam".into() },
        ] {
            assert!(err.to_string().contains("spam"), "{}", err);
        }
    }

    #[test]
    fn no_match_carries_position() {
        let err = LexerError::NoMatch { lineno: 3, column: 7 };
        let text = err.to_string();
        assert!(text.contains('3') && text.contains('7'));
    }

    #[test]
    fn aborted_exposes_the_inner_error() {
        let err = LexerError::aborted("enough");
        assert!(err.source().is_some());
        assert!(err.to_string().contains("enough"));
    }
}
