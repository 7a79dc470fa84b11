//! User-named terminal matchers.
//!
//! A grammar terminal is usually a fixed literal, but languages also need token *classes* -
//! identifiers, numbers, string literals and friends.  Those are expressed as a [`TokenMatcher`]:
//! a named predicate over tokens, where the name is what gets shown to the user in completion and
//! error suggestions.

use regex::Regex;

use crate::lexer::Token;

/// A named predicate deciding whether a token belongs to a terminal class.
pub trait TokenMatcher {
    /// The name advertised in suggestions (e.g. `"word"` or `"number"`)
    fn name(&self) -> &str;

    /// `true` if `token` belongs to this class
    fn is_match(&self, token: &Token) -> bool;
}

/// A [`TokenMatcher`] which accepts tokens whose text matches a [`Regex`].
///
/// The pattern is anchored at both ends before compilation, forcing the regex engine to match the
/// whole token text rather than any substring of it.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    name: String,
    regex: Regex,
}

impl RegexMatcher {
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        let anchored = format!("^(?:{})$", pattern);
        Ok(Self {
            name: name.into(),
            regex: Regex::new(&anchored)?,
        })
    }
}

impl TokenMatcher for RegexMatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_match(&self, token: &Token) -> bool {
        self.regex.is_match(&token.text)
    }
}
