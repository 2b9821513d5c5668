//! # linelex
//!
//! A table-driven, single-pass lexical scanner for line-oriented input.
//!
//! A caller declares a named graph of tokens (match rules plus transition
//! targets) and feeds the engine a stream of text lines. The engine walks
//! the graph, attempts matchers in a deterministic depth-first order, commits
//! the first success, runs caller-supplied hooks, and advances to the next
//! declared state. Ad hoc line-oriented grammars (log formats, config
//! dialects, small DSLs) become data rather than hand-written state machines.
//!
//! ```
//! use linelex::{Literal, Parser, Pattern, Token, TokenTable};
//!
//! let mut table = TokenTable::new("begin");
//! table
//!     .define("begin", Token::matching(Literal::new("word1")).after("word2"))
//!     .define("word2", Token::matching(Literal::icase("word2")).after("eol"))
//!     .define("eol", Token::matching(Pattern::new(r"$").unwrap()).after("begin"));
//!
//! let mut parser = Parser::new(&table);
//! parser.parse_lines(["word1wOrD2"]).unwrap();
//! ```

pub mod buffer;
pub mod declarative;
pub mod error;
pub mod matcher;
pub mod parser;
pub mod resolver;
pub mod table;

pub use buffer::{BacktrackBuffer, Lookahead};
pub use declarative::{GrammarError, GrammarFile};
pub use error::LexerError;
pub use matcher::{Alternation, Literal, MatchOutcome, MatchValue, Matcher, Pattern};
pub use parser::{Context, MatchEvent, Parser};
pub use resolver::TokenWalk;
pub use table::{After, Recovery, Rule, Token, TokenTable};
