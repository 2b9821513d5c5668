//! Token graph resolver: flattens a start symbol into the ordered sequence
//! of leaf candidates to try for the current state.
//!
//! The walk is a depth-first, left-to-right expansion of composite tokens,
//! carried by an explicit stack of `(name, next-child)` frames rather than
//! recursion. Two sets steer it: `onpath` holds the composites currently
//! being expanded (re-entering one is a cycle), `visited` holds composites
//! already expanded once this arming (re-reaching one is silently skipped:
//! a composite's meaning is taken to be independent of its call site).
//!
//! The walk is lazy. Structural errors surface when the offending record is
//! reached, which happens only if every earlier candidate was requested and
//! rejected, and always before any input is consumed for that attempt.

use crate::error::LexerError;
use crate::table::{Rule, Token, TokenTable};
use std::collections::HashSet;

/// In-progress expansion frame for one composite.
#[derive(Debug)]
struct Frame {
    name: String,
    children: Vec<String>,
    next: usize,
}

/// One arming of the resolver: the decision sequence for a start symbol,
/// produced candidate by candidate.
///
/// The walk does not hold a reference to the table; the driver passes it to
/// every [`next`](TokenWalk::next) call, so a walk can live inside the
/// parser that owns it while the table is shared.
#[derive(Debug)]
pub struct TokenWalk {
    pending: Option<String>,
    stack: Vec<Frame>,
    onpath: HashSet<String>,
    visited: HashSet<String>,
}

impl TokenWalk {
    /// Arm the walk at `start`. A leaf start symbol is legal and yields
    /// itself once.
    pub fn new(start: impl Into<String>) -> Self {
        TokenWalk {
            pending: Some(start.into()),
            stack: Vec::new(),
            onpath: HashSet::new(),
            visited: HashSet::new(),
        }
    }

    /// Produce the next leaf candidate, or a structural error, or `None`
    /// once the decision sequence is exhausted.
    pub fn next<'t>(
        &mut self,
        table: &'t TokenTable,
    ) -> Option<Result<(&'t str, &'t Token), LexerError>> {
        loop {
            let name = loop {
                if let Some(name) = self.pending.take() {
                    break name;
                }
                match self.stack.last_mut() {
                    None => return None,
                    Some(frame) if frame.next < frame.children.len() => {
                        let name = frame.children[frame.next].clone();
                        frame.next += 1;
                        break name;
                    }
                    Some(_) => {}
                }
                // frame exhausted: leave the composite, clearing its path mark
                if let Some(frame) = self.stack.pop() {
                    self.onpath.remove(&frame.name);
                }
            };

            let (key, token) = match table.entry(&name) {
                Some(entry) => entry,
                None => return Some(Err(LexerError::TokenNotFound { name })),
            };

            match token.rule() {
                None => return Some(Err(LexerError::MissingMatcher { name })),
                Some(Rule::Match(_)) => {
                    if token.transition().is_none() {
                        return Some(Err(LexerError::MissingTransition { name }));
                    }
                    return Some(Ok((key, token)));
                }
                Some(Rule::Group(children)) => {
                    if self.onpath.contains(&name) {
                        // report the node being re-entered, not the ancestor
                        // that created the cycle
                        return Some(Err(LexerError::LoopDetected { name }));
                    }
                    if self.visited.contains(&name) {
                        continue;
                    }
                    self.onpath.insert(name.clone());
                    self.visited.insert(name.clone());
                    self.stack.push(Frame {
                        name,
                        children: children.clone(),
                        next: 0,
                    });
                }
            }
        }
    }
}
