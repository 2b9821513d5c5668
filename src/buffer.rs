//! Backtrack buffer: an append-only line cache with a cursor and a stack of
//! saved cursor snapshots.
//!
//! Matchers and the driver use it for speculative multi-line lookahead:
//! `push` snapshots the read position, `pop` rolls back to the most recent
//! snapshot, `discard` commits it, and `purge` drops the whole snapshot stack
//! together with every already-consumed line. The driver purges once per
//! committed state transition, so memory is bounded by the longest in-flight
//! lookahead window.

/// Saved cursor snapshot. Frames form a stack; they are never popped or
/// discarded out of order.
#[derive(Debug, Clone)]
struct Frame {
    next_idx: usize,
    lineno: usize,
    pos: usize,
    line: String,
}

/// Line cache plus cursor state for one parser.
#[derive(Debug)]
pub struct BacktrackBuffer {
    lines: Vec<String>,
    next_idx: usize,
    frames: Vec<Frame>,
    line: String,
    lineno: usize,
    pos: usize,
    keep_eol: bool,
    /// Set by `Lookahead::read_line` when a push-fed parser runs out of
    /// buffered lines while input is still open. Cleared by the driver.
    pub(crate) starved: bool,
}

impl BacktrackBuffer {
    /// Create an empty buffer. With `keep_eol`, every line appended through
    /// [`append`](Self::append) keeps a trailing `'\n'`.
    pub fn new(keep_eol: bool) -> Self {
        BacktrackBuffer {
            lines: Vec::new(),
            next_idx: 0,
            frames: Vec::new(),
            line: String::new(),
            lineno: 0,
            pos: 0,
            keep_eol,
            starved: false,
        }
    }

    /// Split a text block on embedded line breaks and append the lines.
    pub fn append(&mut self, block: &str) {
        self.lines.extend(split_block(block, self.keep_eol));
    }

    /// Advance the cursor to the next buffered line, if any.
    pub fn take_line(&mut self) -> Option<&str> {
        if self.next_idx >= self.lines.len() {
            return None;
        }
        self.line = self.lines[self.next_idx].clone();
        self.next_idx += 1;
        self.lineno += 1;
        self.pos = 0;
        Some(&self.line)
    }

    /// Snapshot the current read position.
    pub fn push(&mut self) {
        self.frames.push(Frame {
            next_idx: self.next_idx,
            lineno: self.lineno,
            pos: self.pos,
            line: self.line.clone(),
        });
    }

    /// Restore the most recent snapshot and drop it (rollback).
    pub fn pop(&mut self) {
        if let Some(frame) = self.frames.pop() {
            self.next_idx = frame.next_idx;
            self.lineno = frame.lineno;
            self.pos = frame.pos;
            self.line = frame.line;
        }
    }

    /// Drop the most recent snapshot without restoring (commit).
    pub fn discard(&mut self) {
        self.frames.pop();
    }

    /// Clear the snapshot stack and trim every consumed line from the cache.
    /// After this, no rollback can reach any previously consumed line.
    pub fn purge(&mut self) {
        self.frames.clear();
        if self.next_idx > 0 {
            self.lines.drain(..self.next_idx);
            self.next_idx = 0;
        }
    }

    /// Current line text.
    pub fn line(&self) -> &str {
        &self.line
    }

    /// 1-based number of the current line; 0 before the first line.
    pub fn lineno(&self) -> usize {
        self.lineno
    }

    /// 0-based position of the cursor within the current line.
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Whether an unconsumed line is buffered.
    pub fn buffered(&self) -> bool {
        self.next_idx < self.lines.len()
    }

    /// Number of snapshots currently on the stack.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Number of lines still held in the cache, consumed or not.
    pub fn cached(&self) -> usize {
        self.lines.len()
    }
}

/// Matcher-facing view of the buffer for one attempt.
///
/// A matcher that needs multi-line lookahead calls [`read_line`] to advance
/// the cursor and wraps speculative reads in `push`/`pop`/`discard` pairs.
/// The driver snapshots around the whole attempt as well, so a failing
/// matcher cannot leave lines partially consumed for the next candidate.
///
/// [`read_line`]: Lookahead::read_line
pub struct Lookahead<'a, 'f> {
    buf: &'a mut BacktrackBuffer,
    source: Option<&'a mut (dyn FnMut() -> Option<String> + 'f)>,
    closed: &'a mut bool,
}

impl<'a, 'f> Lookahead<'a, 'f> {
    pub(crate) fn new(
        buf: &'a mut BacktrackBuffer,
        source: Option<&'a mut (dyn FnMut() -> Option<String> + 'f)>,
        closed: &'a mut bool,
    ) -> Self {
        Lookahead { buf, source, closed }
    }

    /// Snapshot the current read position.
    pub fn push(&mut self) {
        self.buf.push();
    }

    /// Restore the most recent snapshot (rollback).
    pub fn pop(&mut self) {
        self.buf.pop();
    }

    /// Drop the most recent snapshot without restoring (commit).
    pub fn discard(&mut self) {
        self.buf.discard();
    }

    /// Advance the cursor to the next line, pulling from the line source if
    /// one is attached. Returns `None` at end of input, or, for a push-fed
    /// parser whose input is still open, when no line has arrived yet.
    pub fn read_line(&mut self) -> Option<&str> {
        while !self.buf.buffered() && !*self.closed {
            match self.source.as_mut() {
                Some(src) => match (src)() {
                    Some(block) if !block.is_empty() => self.buf.append(&block),
                    _ => *self.closed = true,
                },
                None => {
                    self.buf.starved = true;
                    return None;
                }
            }
        }
        self.buf.take_line()
    }

    /// Current line text.
    pub fn line(&self) -> &str {
        self.buf.line()
    }

    /// 1-based number of the current line.
    pub fn lineno(&self) -> usize {
        self.buf.lineno()
    }
}

/// Split a text block into lines the way the delivery API promises: `\n` and
/// `\r\n` both end a line, a trailing terminator does not produce an empty
/// final line, and `keep_eol` re-attaches a `'\n'` to every line.
pub(crate) fn split_block(block: &str, keep_eol: bool) -> Vec<String> {
    if block.is_empty() {
        return Vec::new();
    }
    let mut out: Vec<String> = block
        .split('\n')
        .map(|piece| piece.strip_suffix('\r').unwrap_or(piece).to_string())
        .collect();
    if block.ends_with('\n') {
        out.pop();
    }
    if keep_eol {
        for line in &mut out {
            line.push('\n');
        }
    }
    out
}
