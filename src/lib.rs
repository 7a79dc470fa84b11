//! A backtracking parser engine for interactive editors.
//!
//! Bramble parses a token stream against a grammar defined at runtime (either in code, via
//! [`GrammarBuilder`], or loaded from a grammar file via [`SpecGrammar`]) and, in the same pass:
//! - decides whether the input is accepted,
//! - builds an AST by running user-supplied reducers at rule boundaries (see [`Ast`]), and
//! - reports which grammar terminals could legally appear at a given editor cursor position -
//!   both as completions ([`ParseOutcome::next_matchings`]) and, when the input is rejected, as
//!   suggestions attached to the error ([`Mismatch::suggestions`]).
//!
//! The engine is a top-down walk of a lazily-expanded grammar graph with ordered choice and
//! chronological backtracking; untried alternatives live on an explicit stack, and per-node
//! state is rewound lazily with a version-stamp scheme rather than by walking the graph.  FIRST
//! sets are cached per rule to skip alternatives that can't possibly start at the next token.
//!
//! Everything is strictly synchronous and single-threaded: one parse at a time per [`Lang`].
//! There is no timeout, but a step budget stops pathological grammars (notably left-recursive
//! ones, which the engine does not rewrite) from hanging the host.
//!
//! ```
//! use bramble::{Elem, Grammar, Lang, SpaceLexer, TokenTree};
//!
//! let grammar = Grammar::<TokenTree>::builder()
//!     .rule(
//!         "greeting",
//!         vec![
//!             Elem::lit("hello"),
//!             Elem::one_of(vec![Elem::lit("world"), Elem::lit("there")]),
//!         ],
//!     )
//!     .build()
//!     .unwrap();
//! let mut lang = Lang::new(grammar, SpaceLexer, "greeting");
//!
//! let outcome = lang.parse("hello world", 11).unwrap();
//! assert!(outcome.success);
//!
//! // What could follow `hello`?  (The `6` is the editor cursor, in characters.)
//! let completions = lang.parse("hello ", 6).unwrap();
//! let offered: Vec<&str> = completions
//!     .next_matchings
//!     .iter()
//!     .map(|m| m.value.as_str())
//!     .collect();
//! assert_eq!(offered, ["world", "there"]);
//! ```

pub mod ast;
pub mod grammar;
pub mod lexer;
pub mod matcher;
pub mod parser;
pub mod scanner;
pub mod spec;

pub use ast::{Ast, TokenTree};
pub use grammar::{BuildError, Elem, Grammar, GrammarBuilder, MatchKind, Matching};
pub use lexer::{Lexer, SpaceLexer, Span, Token};
pub use matcher::{RegexMatcher, TokenMatcher};
pub use parser::{Costs, Error, Lang, Mismatch, ParseOutcome, Parser, Reason};
pub use scanner::Scanner;
pub use spec::SpecGrammar;
