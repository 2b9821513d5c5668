//! Matcher abstraction and the built-in rule kinds.
//!
//! A matcher attempts exactly one thing: match its rule at a given position
//! in a line, reporting how much it consumed and a rule-specific value. It
//! never moves the cursor itself (the driver advances after a commit), and
//! any multi-line lookahead it performs goes through the [`Lookahead`] view
//! so a failed attempt can be rolled back.

use crate::buffer::Lookahead;
use regex::RegexBuilder;

/// Value captured by a successful match, handed to hooks and observers.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchValue {
    /// The literal text that matched.
    Literal(String),
    /// The full regex match plus its capture groups, in declaration order.
    Pattern {
        text: String,
        groups: Vec<Option<String>>,
    },
    /// Payload of a caller-defined matcher.
    Custom(String),
}

impl MatchValue {
    /// The matched text, whichever rule kind produced it.
    pub fn text(&self) -> &str {
        match self {
            MatchValue::Literal(text) => text,
            MatchValue::Pattern { text, .. } => text,
            MatchValue::Custom(text) => text,
        }
    }
}

/// Successful match: consumed length plus the captured value.
///
/// `len` counts from the start of the attempt in the line that is current
/// when the matcher returns. For single-line matchers that is simply the
/// number of characters consumed at `pos`; a matcher that read further lines
/// reports how far it consumed into the last line it read.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub len: usize,
    pub value: MatchValue,
}

/// One match attempt at `pos` in `line`. Returns `None` on no-match.
///
/// Implementations must be pure with respect to `line` and `pos` apart from
/// lookahead performed through `input`, and must wrap that lookahead in
/// snapshot pairs so failure leaves the buffer untouched.
pub trait Matcher: Send + Sync {
    fn attempt(&self, input: &mut Lookahead<'_, '_>, line: &str, pos: usize) -> Option<MatchOutcome>;
}

/// Exact string matcher, optionally ASCII-case-insensitive.
#[derive(Debug, Clone)]
pub struct Literal {
    text: String,
    icase: bool,
}

impl Literal {
    pub fn new(text: impl Into<String>) -> Self {
        Literal { text: text.into(), icase: false }
    }

    pub fn icase(text: impl Into<String>) -> Self {
        Literal { text: text.into(), icase: true }
    }
}

impl Matcher for Literal {
    fn attempt(&self, _input: &mut Lookahead<'_, '_>, line: &str, pos: usize) -> Option<MatchOutcome> {
        let slice = line.get(pos..pos + self.text.len())?;
        let hit = if self.icase {
            slice.eq_ignore_ascii_case(&self.text)
        } else {
            slice == self.text
        };
        if !hit {
            return None;
        }
        Some(MatchOutcome {
            len: self.text.len(),
            value: MatchValue::Literal(self.text.clone()),
        })
    }
}

/// Regular-expression matcher, anchored at the attempt position.
///
/// The pattern is compiled wrapped in `^(?:…)` and applied to the line tail
/// starting at `pos`: this is match-at-offset, not search. `$` therefore
/// asserts end of line.
#[derive(Debug)]
pub struct Pattern {
    regex: regex::Regex,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Self::build(pattern, false)
    }

    pub fn icase(pattern: &str) -> Result<Self, regex::Error> {
        Self::build(pattern, true)
    }

    fn build(pattern: &str, icase: bool) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(&format!("^(?:{})", pattern))
            .case_insensitive(icase)
            .build()?;
        Ok(Pattern { regex })
    }
}

impl Matcher for Pattern {
    fn attempt(&self, _input: &mut Lookahead<'_, '_>, line: &str, pos: usize) -> Option<MatchOutcome> {
        let tail = line.get(pos..)?;
        let caps = self.regex.captures(tail)?;
        let full = caps.get(0)?;
        let groups = (1..caps.len())
            .map(|i| caps.get(i).map(|g| g.as_str().to_string()))
            .collect();
        Some(MatchOutcome {
            len: full.end(),
            value: MatchValue::Pattern {
                text: full.as_str().to_string(),
                groups,
            },
        })
    }
}

/// Ordered alternation: tries member matchers strictly in declaration order
/// and commits the first success.
///
/// Every member attempt runs under its own buffer snapshot, discarded on
/// success and rolled back on failure, so an alternative that performed
/// multi-line lookahead cannot leave input partially consumed for the next
/// one.
pub struct Alternation {
    members: Vec<Box<dyn Matcher>>,
}

impl Alternation {
    pub fn new(members: Vec<Box<dyn Matcher>>) -> Self {
        Alternation { members }
    }
}

impl Matcher for Alternation {
    fn attempt(&self, input: &mut Lookahead<'_, '_>, line: &str, pos: usize) -> Option<MatchOutcome> {
        for member in &self.members {
            input.push();
            if let Some(outcome) = member.attempt(input, line, pos) {
                input.discard();
                return Some(outcome);
            }
            input.pop();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BacktrackBuffer;

    fn attempt(m: &dyn Matcher, line: &str, pos: usize) -> Option<MatchOutcome> {
        let mut buf = BacktrackBuffer::new(false);
        let mut closed = true;
        let mut input = Lookahead::new(&mut buf, None, &mut closed);
        m.attempt(&mut input, line, pos)
    }

    #[test]
    fn literal_matches_at_position() {
        let m = Literal::new("word");
        let out = attempt(&m, "xxword", 2).unwrap();
        assert_eq!(out.len, 4);
        assert_eq!(out.value, MatchValue::Literal("word".into()));
        assert!(attempt(&m, "xxword", 0).is_none());
    }

    #[test]
    fn literal_past_end_of_line() {
        let m = Literal::new("word");
        assert!(attempt(&m, "wor", 0).is_none());
        assert!(attempt(&m, "word", 4).is_none());
    }

    #[test]
    fn literal_icase() {
        let m = Literal::icase("word");
        assert!(attempt(&m, "WoRd", 0).is_some());
        assert!(attempt(&Literal::new("word"), "WoRd", 0).is_none());
    }

    #[test]
    fn pattern_is_anchored_not_searched() {
        let m = Pattern::new("ab+").unwrap();
        assert!(attempt(&m, "xxabb", 0).is_none());
        let out = attempt(&m, "xxabb", 2).unwrap();
        assert_eq!(out.len, 3);
        assert_eq!(out.value.text(), "abb");
    }

    #[test]
    fn pattern_captures_groups() {
        let m = Pattern::new(r"(a+)(b)?").unwrap();
        let out = attempt(&m, "aaa", 0).unwrap();
        match out.value {
            MatchValue::Pattern { text, groups } => {
                assert_eq!(text, "aaa");
                assert_eq!(groups, vec![Some("aaa".to_string()), None]);
            }
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn pattern_dollar_asserts_end_of_line() {
        let m = Pattern::new(r"word$").unwrap();
        assert!(attempt(&m, "word", 0).is_some());
        assert!(attempt(&m, "words", 0).is_none());
    }

    #[test]
    fn pattern_icase() {
        let m = Pattern::icase("wo?rd2").unwrap();
        assert!(attempt(&m, "wRD2", 0).is_some());
    }

    #[test]
    fn pattern_rejects_invalid_regex() {
        assert!(Pattern::new("(a").is_err());
    }

    #[test]
    fn alternation_first_success_wins() {
        let m = Alternation::new(vec![
            Box::new(Literal::new("nope")),
            Box::new(Literal::new("ab")),
            Box::new(Literal::new("abc")),
        ]);
        let out = attempt(&m, "abc", 0).unwrap();
        assert_eq!(out.len, 2);
    }

    #[test]
    fn alternation_leaves_snapshot_stack_balanced() {
        let mut buf = BacktrackBuffer::new(false);
        buf.append("abc\n");
        buf.take_line();
        let mut closed = true;
        let m = Alternation::new(vec![
            Box::new(Literal::new("x")),
            Box::new(Literal::new("ab")),
        ]);
        {
            let mut input = Lookahead::new(&mut buf, None, &mut closed);
            assert!(m.attempt(&mut input, "abc", 0).is_some());
        }
        assert_eq!(buf.depth(), 0);

        let miss = Alternation::new(vec![Box::new(Literal::new("x"))]);
        {
            let mut input = Lookahead::new(&mut buf, None, &mut closed);
            assert!(miss.attempt(&mut input, "abc", 0).is_none());
        }
        assert_eq!(buf.depth(), 0);
    }
}
