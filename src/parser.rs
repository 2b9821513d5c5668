//! Parser driver: the stepping loop tying lines, candidates, matchers, and
//! transitions together.
//!
//! One step: obtain a line if the current one is consumed, ask the armed
//! [`TokenWalk`] for the next leaf candidate, attempt its matcher under a
//! buffer snapshot, and either roll back and try the next candidate or
//! commit: run hooks, resolve the transition target, advance the cursor,
//! purge the buffer, and re-arm the walk for the new state.
//!
//! Two delivery modes feed the same loop. Pull mode hands the driver a
//! line-producing closure and runs to completion. Push mode makes the driver
//! a resumable object: the caller [`feed`](Parser::feed)s text blocks as
//! they arrive, and the driver suspends whenever it needs a line that has
//! not arrived yet; [`finish`](Parser::finish) closes input and flushes
//! trailing state. Both modes produce the same observable token sequence for
//! the same lines.

use crate::buffer::{BacktrackBuffer, Lookahead};
use crate::error::LexerError;
use crate::matcher::{MatchOutcome, MatchValue};
use crate::resolver::TokenWalk;
use crate::table::{After, Recovery, Rule, TokenTable};

/// Mutable per-parser snapshot exposed to hooks, transition callables, and
/// the bad-token handler. Valid only for the duration of the call.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    /// Current line text.
    pub line: &'a str,
    /// 1-based line number; 0 before the first line.
    pub lineno: usize,
    /// 0-based cursor position within the line.
    pub pos: usize,
    /// Name of the most recently matched token, if any.
    pub token: Option<&'a str>,
    /// Value captured by the most recent match, if any.
    pub value: Option<&'a MatchValue>,
}

/// Event delivered to the injected observer on every match attempt.
/// `lineno` and `pos` locate where the attempt began.
#[derive(Debug)]
pub enum MatchEvent<'a> {
    Matched {
        name: &'a str,
        lineno: usize,
        pos: usize,
        value: &'a MatchValue,
    },
    Failed {
        name: &'a str,
        lineno: usize,
        pos: usize,
    },
}

type Observer = Box<dyn FnMut(&MatchEvent<'_>)>;

/// Why a `run` returned without an error.
enum Run {
    /// End of input reached; parsing ended successfully.
    Finished,
    /// Push mode only: a line is needed that has not been fed yet.
    NeedLine,
}

/// The stepping state machine over one token table.
///
/// A parser owns its buffer, cursor, and context exclusively; the table is
/// only read, so one table may serve many parsers.
pub struct Parser<'t> {
    table: &'t TokenTable,
    buffer: BacktrackBuffer,
    walk: TokenWalk,
    last: Option<(String, MatchValue)>,
    /// Candidate whose attempt starved mid-lookahead, to retry on resume.
    retry: Option<String>,
    closed: bool,
    done: bool,
    observer: Option<Observer>,
}

impl<'t> Parser<'t> {
    /// Parser that strips line terminators from delivered lines.
    pub fn new(table: &'t TokenTable) -> Self {
        Self::build(table, false)
    }

    /// Parser that keeps a trailing `'\n'` on every delivered line.
    pub fn with_eol(table: &'t TokenTable) -> Self {
        Self::build(table, true)
    }

    fn build(table: &'t TokenTable, keep_eol: bool) -> Self {
        Parser {
            table,
            buffer: BacktrackBuffer::new(keep_eol),
            walk: TokenWalk::new(table.begin()),
            last: None,
            retry: None,
            closed: false,
            done: false,
            observer: None,
        }
    }

    /// Install the observer invoked on every match attempt, success or
    /// failure. This is the supported way to observe the token stream.
    pub fn observe(&mut self, observer: impl FnMut(&MatchEvent<'_>) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Snapshot of the current position and last match.
    pub fn context(&self) -> Context<'_> {
        Context {
            line: self.buffer.line(),
            lineno: self.buffer.lineno(),
            pos: self.buffer.pos(),
            token: self.last.as_ref().map(|(name, _)| name.as_str()),
            value: self.last.as_ref().map(|(_, value)| value),
        }
    }

    /// Whether parsing has ended (end of input or explicit finish).
    pub fn is_finished(&self) -> bool {
        self.done
    }

    /// Pull mode: run to completion, calling `read` whenever another text
    /// block is needed. `None` or an empty block ends input; blocks are
    /// split on embedded line breaks.
    pub fn parse_with<F>(&mut self, mut read: F) -> Result<(), LexerError>
    where
        F: FnMut() -> Option<String>,
    {
        if self.done {
            return Ok(());
        }
        self.run(Some(&mut read)).map(|_| ())
    }

    /// Pull mode over an in-memory sequence of text blocks.
    pub fn parse_lines<I>(&mut self, blocks: I) -> Result<(), LexerError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut blocks = blocks.into_iter();
        self.parse_with(move || blocks.next().map(|block| block.as_ref().to_string()))
    }

    /// Push mode: hand the driver one more text block and let it parse as
    /// far as the buffered lines allow. Returns once it needs a line that
    /// has not arrived yet. No-op after the parse has finished.
    pub fn feed(&mut self, block: &str) -> Result<(), LexerError> {
        if self.done {
            return Ok(());
        }
        self.buffer.append(block);
        self.run(None).map(|_| ())
    }

    /// Push mode: declare end of input and flush any trailing state.
    pub fn finish(&mut self) -> Result<(), LexerError> {
        if self.done {
            return Ok(());
        }
        self.closed = true;
        self.run(None).map(|_| ())
    }

    fn run(
        &mut self,
        mut source: Option<&mut dyn FnMut() -> Option<String>>,
    ) -> Result<Run, LexerError> {
        let table = self.table;
        loop {
            // step 1: a fresh line once the current one is consumed
            if self.buffer.pos() >= self.buffer.line().len() {
                let got = {
                    let mut input = Lookahead::new(
                        &mut self.buffer,
                        source.as_mut().map(|src| &mut **src),
                        &mut self.closed,
                    );
                    input.read_line().map(|line| line.is_empty())
                };
                match got {
                    Some(false) => {}
                    // an empty line ends parsing, same as absent input
                    Some(true) => {
                        self.done = true;
                        return Ok(Run::Finished);
                    }
                    None => {
                        if self.buffer.starved {
                            self.buffer.starved = false;
                            return Ok(Run::NeedLine);
                        }
                        self.done = true;
                        return Ok(Run::Finished);
                    }
                }
            }

            // step 2: next candidate leaf for the current state
            let (name, token) = if let Some(retry) = self.retry.take() {
                match table.entry(&retry) {
                    Some(entry) => entry,
                    None => return Err(LexerError::TokenNotFound { name: retry }),
                }
            } else {
                match self.walk.next(table) {
                    Some(Ok(entry)) => entry,
                    Some(Err(err)) => return Err(err),
                    None => {
                        let recovery = match table.bad_token_handler() {
                            Some(handler) => handler(&self.context())?,
                            None => Recovery::Decline,
                        };
                        match recovery {
                            Recovery::Skip(n) => {
                                // skip whole characters, at least one so a
                                // non-aborting handler cannot livelock
                                let start = self.buffer.pos();
                                let tail = &self.buffer.line()[start..];
                                let step = tail
                                    .char_indices()
                                    .nth(n.max(1))
                                    .map(|(i, _)| i)
                                    .unwrap_or(tail.len());
                                self.buffer.set_pos(start + step);
                                self.walk = TokenWalk::new(table.begin());
                                self.buffer.purge();
                                continue;
                            }
                            Recovery::Decline => {
                                return Err(LexerError::NoMatch {
                                    lineno: self.buffer.lineno(),
                                    column: self.buffer.pos() + 1,
                                });
                            }
                        }
                    }
                }
            };
            let matcher = match token.rule() {
                Some(Rule::Match(matcher)) => matcher,
                _ => continue, // the walk yields leaves only
            };

            // step 3: attempt under a snapshot
            self.buffer.push();
            // a starved flag left over from an earlier member of a committed
            // alternation must not misclassify this attempt's failure
            self.buffer.starved = false;
            let line = self.buffer.line().to_string();
            let pos = self.buffer.pos();
            let lineno = self.buffer.lineno();
            let outcome = {
                let mut input = Lookahead::new(
                    &mut self.buffer,
                    source.as_mut().map(|src| &mut **src),
                    &mut self.closed,
                );
                matcher.attempt(&mut input, &line, pos)
            };

            // step 4: rollback and move to the next candidate
            let Some(MatchOutcome { len, value }) = outcome else {
                if self.buffer.starved {
                    // ran out of pushed lines mid-lookahead; same candidate
                    // is retried once more input arrives
                    self.buffer.starved = false;
                    self.buffer.pop();
                    self.retry = Some(name.to_string());
                    return Ok(Run::NeedLine);
                }
                self.buffer.pop();
                if let Some(observer) = self.observer.as_mut() {
                    observer(&MatchEvent::Failed { name, lineno, pos });
                }
                if let Some(hook) = token.fail_hook() {
                    hook(&self.context())?;
                }
                continue;
            };

            // step 5: commit
            self.buffer.discard();
            self.last = Some((name.to_string(), value));
            if let Some(observer) = self.observer.as_mut() {
                if let Some((matched, value)) = self.last.as_ref() {
                    observer(&MatchEvent::Matched {
                        name: matched,
                        lineno,
                        pos,
                        value,
                    });
                }
            }
            if let Some(hook) = token.match_hook() {
                hook(&self.context())?;
            }
            let next_state = match token.transition() {
                Some(After::State(state)) => state.clone(),
                Some(After::Choose(choose)) => choose(&self.context()),
                None => {
                    return Err(LexerError::MissingTransition {
                        name: name.to_string(),
                    })
                }
            };
            if self.buffer.lineno() == lineno {
                self.buffer.set_pos(pos + len);
            } else {
                // the matcher read ahead; len counts into its final line
                self.buffer.set_pos(len);
            }
            self.walk = TokenWalk::new(next_state);
            self.buffer.purge();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{Alternation, Literal, Matcher, Pattern};
    use crate::table::Token;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn record_matches(parser: &mut Parser<'_>) -> Rc<RefCell<Vec<String>>> {
        let matched = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&matched);
        parser.observe(move |event| {
            if let MatchEvent::Matched { name, .. } = event {
                sink.borrow_mut().push(name.to_string());
            }
        });
        matched
    }

    /// Matcher spanning two lines: the rest of the current line must equal
    /// `first`, the next line must start with `second`.
    struct TwoLine {
        first: &'static str,
        second: &'static str,
    }

    impl Matcher for TwoLine {
        fn attempt(
            &self,
            input: &mut Lookahead<'_, '_>,
            line: &str,
            pos: usize,
        ) -> Option<MatchOutcome> {
            if line.get(pos..)? != self.first {
                return None;
            }
            input.push();
            let hit = match input.read_line() {
                Some(next) => next.starts_with(self.second),
                None => false,
            };
            if !hit {
                input.pop();
                return None;
            }
            input.discard();
            Some(MatchOutcome {
                len: self.second.len(),
                value: MatchValue::Custom(format!("{}{}", self.first, self.second)),
            })
        }
    }

    fn two_line_table() -> TokenTable {
        let mut table = TokenTable::new("begin");
        table
            .define(
                "begin",
                Token::matching(TwoLine { first: "ab", second: "cd" }).after("rest"),
            )
            .define("rest", Token::matching(Literal::new("ef")).after("eol"))
            .define("eol", Token::matching(Pattern::new(r"$").unwrap()).after("begin"));
        table
    }

    #[test]
    fn custom_matcher_consumes_across_lines() {
        let table = two_line_table();
        let mut parser = Parser::new(&table);
        let matched = record_matches(&mut parser);
        parser.parse_lines(["ab\ncdef"]).unwrap();
        assert_eq!(*matched.borrow(), vec!["begin", "rest"]);
    }

    #[test]
    fn failed_lookahead_replays_lines_for_later_candidates() {
        let mut table = TokenTable::new("begin");
        table
            .define(
                "begin",
                Token::matching(Alternation::new(vec![
                    Box::new(TwoLine { first: "ab", second: "XX" }),
                    Box::new(Literal::new("ab")),
                ]))
                .after("rest"),
            )
            .define("rest", Token::matching(Literal::new("cd")).after("tail"))
            .define("tail", Token::matching(Literal::new("ef")).after("begin"));
        let mut parser = Parser::new(&table);
        let matched = record_matches(&mut parser);
        parser.parse_lines(["ab\ncdef"]).unwrap();
        assert_eq!(*matched.borrow(), vec!["begin", "rest", "tail"]);
    }

    #[test]
    fn starved_lookahead_suspends_and_retries_in_push_mode() {
        let table = two_line_table();
        let mut parser = Parser::new(&table);
        let matched = record_matches(&mut parser);
        parser.feed("ab").unwrap();
        // the two-line matcher could not complete yet
        assert!(matched.borrow().is_empty());
        parser.feed("cdef").unwrap();
        parser.finish().unwrap();
        assert_eq!(*matched.borrow(), vec!["begin", "rest"]);
    }

    /// Matcher that reads ahead one line whenever the current line starts
    /// with its prefix; in push mode that lookahead can starve.
    struct PrefixThen {
        prefix: &'static str,
        next: &'static str,
    }

    impl Matcher for PrefixThen {
        fn attempt(
            &self,
            input: &mut Lookahead<'_, '_>,
            line: &str,
            pos: usize,
        ) -> Option<MatchOutcome> {
            if !line.get(pos..)?.starts_with(self.prefix) {
                return None;
            }
            input.push();
            let hit = match input.read_line() {
                Some(next) => next.starts_with(self.next),
                None => false,
            };
            if !hit {
                input.pop();
                return None;
            }
            input.discard();
            Some(MatchOutcome {
                len: self.next.len(),
                value: MatchValue::Custom(format!("{}{}", self.prefix, self.next)),
            })
        }
    }

    struct CountingMiss {
        attempts: Arc<AtomicUsize>,
    }

    impl Matcher for CountingMiss {
        fn attempt(
            &self,
            _input: &mut Lookahead<'_, '_>,
            _line: &str,
            _pos: usize,
        ) -> Option<MatchOutcome> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    #[test]
    fn committed_alternation_does_not_retry_later_failures() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let mut table = TokenTable::new("begin");
        table
            .define(
                "begin",
                Token::matching(Alternation::new(vec![
                    Box::new(PrefixThen { prefix: "ab", next: "XX" }),
                    Box::new(Literal::new("ab")),
                ]))
                .after("rest"),
            )
            .define("rest", Token::group(["never", "tail"]))
            .define(
                "never",
                Token::matching(CountingMiss { attempts: Arc::clone(&attempts) }).after("begin"),
            )
            .define("tail", Token::matching(Literal::new("cd")).after("begin"));
        let mut parser = Parser::new(&table);
        let matched = record_matches(&mut parser);
        parser.feed("abcd").unwrap();
        parser.finish().unwrap();
        assert_eq!(*matched.borrow(), vec!["begin", "tail"]);
        // the starved member of the committed alternation must not make the
        // next genuine failure look resumable
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bad_token_handler_may_skip_and_resume() {
        let mut table = TokenTable::new("begin");
        table.define("begin", Token::matching(Literal::new("ab")).after("begin"));
        table.on_bad_token(|_ctx| Ok(Recovery::Skip(1)));
        let mut parser = Parser::new(&table);
        let matched = record_matches(&mut parser);
        parser.parse_lines(["xxab"]).unwrap();
        assert_eq!(*matched.borrow(), vec!["begin"]);
    }

    #[test]
    fn skip_recovery_steps_over_whole_characters() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut table = TokenTable::new("begin");
        table.define("begin", Token::matching(Literal::new("ab")).after("begin"));
        {
            let calls = Arc::clone(&calls);
            table.on_bad_token(move |_ctx| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Recovery::Skip(1))
            });
        }
        let mut parser = Parser::new(&table);
        let matched = record_matches(&mut parser);
        parser.parse_lines(["日本ab"]).unwrap();
        assert_eq!(*matched.borrow(), vec!["begin"]);
        // one handler call per skipped character, never per skipped byte
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn declining_handler_raises_no_match() {
        let mut table = TokenTable::new("begin");
        table.define("begin", Token::matching(Literal::new("ab")).after("begin"));
        table.on_bad_token(|_ctx| Ok(Recovery::Decline));
        let mut parser = Parser::new(&table);
        let err = parser.parse_lines(["zz"]).unwrap_err();
        assert!(matches!(err, LexerError::NoMatch { lineno: 1, column: 1 }));
    }

    #[test]
    fn aborting_handler_propagates() {
        let mut table = TokenTable::new("begin");
        table.define("begin", Token::matching(Literal::new("ab")).after("begin"));
        table.on_bad_token(|_ctx| Err(LexerError::aborted("bad input")));
        let mut parser = Parser::new(&table);
        let err = parser.parse_lines(["zz"]).unwrap_err();
        assert!(matches!(err, LexerError::Aborted(_)));
    }

    #[test]
    fn empty_input_finishes_without_stepping() {
        let table = two_line_table();
        let mut parser = Parser::new(&table);
        parser.parse_lines(Vec::<&str>::new()).unwrap();
        assert!(parser.is_finished());
    }
}
