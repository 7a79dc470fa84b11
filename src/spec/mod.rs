//! A deserializable schema for grammar definition files.
//!
//! Editors want to ship grammars as data, not code, so a grammar can be written in any
//! JSON-shaped format and read into a [`SpecGrammar`]:
//! 1. Deserialize the file into a [`SpecGrammar`] (via [`serde`])
//! 2. Convert it with [`SpecGrammar::into_grammar`], which checks the definition and produces a
//!    real [`Grammar`]
//!
//! Both stages report their own errors, which bubble up to the caller.
//!
//! The schema is deliberately declarative: a rule body is a list where a string is a literal
//! token, a bool is a `loose` sentinel, a nested list is a choice between its elements, and the
//! one-field maps `{"rule": name}`, `{"plus": name}` and `{"special": name}` pull in other rules
//! and named token classes.  For example, in JSON:
//!
//! ```json
//! {
//!     "root": "expr",
//!     "rules": {
//!         "expr": [{ "rule": "term" }, ["+", "-"], { "rule": "term" }],
//!         "term": [[ "a", "b", { "special": "number" } ]]
//!     }
//! }
//! ```
//!
//! Reducers can't be written as data; attach them in code by building the [`Grammar`] through
//! [`GrammarBuilder`](crate::GrammarBuilder) instead.

pub mod convert;

use std::{collections::HashMap, rc::Rc};

use serde::Deserialize;

use crate::{grammar::Grammar, matcher::TokenMatcher};

/// The named [`TokenMatcher`]s a grammar file may refer to with `{"special": name}`.
pub type Matchers = HashMap<String, Rc<dyn TokenMatcher>>;

/// A grammar definition as read from a file.  Only produced through [`serde`], and only consumed
/// by [`into_grammar`](SpecGrammar::into_grammar).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecGrammar {
    root: String,
    rules: HashMap<String, Vec<SpecElem>>,
}

impl SpecGrammar {
    /// The name of the rule this grammar wants parses to start from
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Check this definition and convert it into a [`Grammar`], resolving `special` references
    /// against `matchers`.
    pub fn into_grammar<A>(self, matchers: &Matchers) -> convert::Result<Grammar<A>> {
        convert::convert(self, matchers)
    }

    pub(crate) fn into_parts(self) -> (String, HashMap<String, Vec<SpecElem>>) {
        (self.root, self.rules)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, untagged)]
pub(crate) enum SpecElem {
    /// A `loose` sentinel: `true` always matches (consuming nothing), `false` never matches
    Loose(bool),
    /// A single fixed token
    Literal(String),
    /// A choice between the nested elements, tried in order
    Choice(Vec<SpecElem>),
    /// A reference to another rule
    Rule { rule: String },
    /// One or more repetitions of another rule
    Plus { plus: String },
    /// A token class, looked up by name in the supplied [`Matchers`]
    Special { special: String },
}
