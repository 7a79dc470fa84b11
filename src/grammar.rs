//! User-facing grammar definitions.
//!
//! A [`Grammar`] is a collection of named rules.  Each rule body is an ordered list of [`Elem`]s,
//! all of which must match in order; alternatives are expressed with [`Elem::OneOf`], repetition
//! with [`Elem::plus`], and other rules are pulled in by name with [`Elem::rule`].  Rules can
//! attach a reducer which collapses the row of child values into whatever [`Ast`](crate::Ast)
//! value the caller wants; rules without one keep the row as-is.
//!
//! Grammars are built through [`GrammarBuilder`], which checks the whole definition up front
//! (unknown rule references, empty choices, duplicate names) so that the parse engine can assume
//! every name it meets resolves.

use std::{
    collections::HashMap,
    fmt::{self, Debug, Formatter},
    rc::Rc,
};

use index_vec::IndexVec;
use thiserror::Error;

use crate::{lexer::Token, matcher::TokenMatcher};

index_vec::define_index_type! { pub(crate) struct RuleId = usize; }

/// A reducer: collapses the row of a completed rule's child values into one value.
pub type ReduceFn<A> = Rc<dyn Fn(Vec<A>) -> A>;

/// One element of a rule body.
#[derive(Clone)]
pub enum Elem {
    /// Matches exactly one token with this text
    Literal(String),
    /// A zero-cost sentinel: `Loose(true)` always matches without consuming a token,
    /// `Loose(false)` never matches.  `Elem::one_of(vec![elem, Elem::loose(true)])` is the
    /// standard way to make `elem` optional.
    Loose(bool),
    /// Matches one token belonging to a named class (identifier, number, ...)
    Special(Rc<dyn TokenMatcher>),
    /// Ordered alternatives; the first one to match wins
    OneOf(Vec<Elem>),
    /// The named rule, spliced in here
    Rule(String),
    /// One or more repetitions of the named rule
    RulePlus(String),
}

impl Elem {
    pub fn lit(text: impl Into<String>) -> Self {
        Elem::Literal(text.into())
    }

    pub fn loose(matches: bool) -> Self {
        Elem::Loose(matches)
    }

    pub fn special(matcher: Rc<dyn TokenMatcher>) -> Self {
        Elem::Special(matcher)
    }

    pub fn one_of(alternatives: Vec<Elem>) -> Self {
        Elem::OneOf(alternatives)
    }

    pub fn rule(name: impl Into<String>) -> Self {
        Elem::Rule(name.into())
    }

    pub fn plus(name: impl Into<String>) -> Self {
        Elem::RulePlus(name.into())
    }
}

impl Debug for Elem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Elem::Literal(text) => write!(f, "Literal({:?})", text),
            Elem::Loose(m) => write!(f, "Loose({})", m),
            Elem::Special(matcher) => write!(f, "Special({})", matcher.name()),
            Elem::OneOf(alts) => f.debug_tuple("OneOf").field(alts).finish(),
            Elem::Rule(name) => write!(f, "Rule({})", name),
            Elem::RulePlus(name) => write!(f, "RulePlus({})", name),
        }
    }
}

/// The compiled form of a terminal element, shared by the graph nodes and the FIRST-set tables.
#[derive(Clone)]
pub(crate) enum TermPattern {
    Literal(String),
    Loose(bool),
    Special(Rc<dyn TokenMatcher>),
}

impl TermPattern {
    /// `true` if this terminal would accept `token`.  `Loose` sentinels never accept a *token* -
    /// their matching is decided without looking at the input.
    pub(crate) fn admits(&self, token: &Token) -> bool {
        match self {
            TermPattern::Literal(text) => token.text == *text,
            TermPattern::Loose(_) => false,
            TermPattern::Special(matcher) => matcher.is_match(token),
        }
    }

    /// The `(kind, value)` descriptor used for display and de-duplication
    pub(crate) fn matching(&self) -> Matching {
        match self {
            TermPattern::Literal(text) => Matching {
                kind: MatchKind::Literal,
                value: text.clone(),
            },
            TermPattern::Loose(m) => Matching {
                kind: MatchKind::Loose,
                value: m.to_string(),
            },
            TermPattern::Special(matcher) => Matching {
                kind: MatchKind::Special,
                value: matcher.name().to_owned(),
            },
        }
    }
}

impl Debug for TermPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let m = self.matching();
        write!(f, "{:?}({})", m.kind, m.value)
    }
}

/// What kind of terminal a [`Matching`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    Literal,
    Loose,
    Special,
}

/// The public descriptor of a terminal, as reported in completions and error suggestions.
///
/// For a `Literal` the value is the token text; for a `Special` it is the matcher's advertised
/// name.  Suggestion lists are de-duplicated by the whole `(kind, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Matching {
    pub kind: MatchKind,
    pub value: String,
}

/// A named rule: its body, and an optional reducer.
pub struct Rule<A> {
    pub(crate) name: String,
    pub(crate) body: Vec<Elem>,
    pub(crate) reduce: Option<ReduceFn<A>>,
}

impl<A> Debug for Rule<A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("body", &self.body)
            .field("reduce", &self.reduce.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// A complete, validated grammar.
pub struct Grammar<A> {
    rules: IndexVec<RuleId, Rule<A>>,
    /// Maps rule names to their [`RuleId`]s.  **Invariant**: every name referenced anywhere in
    /// `rules` has an entry (checked by [`GrammarBuilder::build`]).
    ids_by_name: HashMap<String, RuleId>,
}

impl<A> Grammar<A> {
    pub fn builder() -> GrammarBuilder<A> {
        GrammarBuilder { rules: Vec::new() }
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }

    pub(crate) fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.ids_by_name.get(name).copied()
    }

    pub(crate) fn rule(&self, id: RuleId) -> &Rule<A> {
        &self.rules[id]
    }

    pub(crate) fn num_rules(&self) -> usize {
        self.rules.len()
    }
}

impl<A> Debug for Grammar<A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("rules", &self.rules)
            .finish()
    }
}

/// Builder for [`Grammar`]s.  Collects rules, then checks the whole definition in
/// [`build`](Self::build).
pub struct GrammarBuilder<A> {
    rules: Vec<Rule<A>>,
}

impl<A> GrammarBuilder<A> {
    /// Add a rule whose value is the row of its children's values
    pub fn rule(self, name: impl Into<String>, body: Vec<Elem>) -> Self {
        self.add(name.into(), body, None)
    }

    /// Add a rule with a reducer which collapses the row of child values
    pub fn rule_with(
        self,
        name: impl Into<String>,
        body: Vec<Elem>,
        reduce: impl Fn(Vec<A>) -> A + 'static,
    ) -> Self {
        self.add(name.into(), body, Some(Rc::new(reduce) as ReduceFn<A>))
    }

    fn add(mut self, name: String, body: Vec<Elem>, reduce: Option<ReduceFn<A>>) -> Self {
        self.rules.push(Rule { name, body, reduce });
        self
    }

    /// Check the collected rules and produce a [`Grammar`].
    ///
    /// After this returns `Ok`, every rule reference resolves, no rule or choice is empty, and no
    /// name is defined twice - the parse engine relies on all three.
    // TODO: Rewrite direct left recursion (`a -> a b | c` => `a -> c b*`) here, before the engine
    // ever sees it.  Until then such a grammar expands itself forever and the engine's visit
    // budget is what stops it.
    pub fn build(self) -> Result<Grammar<A>, BuildError> {
        let mut ids_by_name = HashMap::new();
        for (idx, rule) in self.rules.iter().enumerate() {
            let id = RuleId::new(idx);
            if ids_by_name.insert(rule.name.clone(), id).is_some() {
                return Err(BuildError::DuplicateRule(rule.name.clone()));
            }
        }

        for rule in &self.rules {
            if rule.body.is_empty() {
                return Err(BuildError::EmptyRule(rule.name.clone()));
            }
            for elem in &rule.body {
                check_elem(elem, &rule.name, &ids_by_name)?;
            }
        }

        Ok(Grammar {
            rules: self.rules.into_iter().collect(),
            ids_by_name,
        })
    }
}

fn check_elem(
    elem: &Elem,
    rule_name: &str,
    ids_by_name: &HashMap<String, RuleId>,
) -> Result<(), BuildError> {
    match elem {
        Elem::Literal(_) | Elem::Loose(_) | Elem::Special(_) => Ok(()),
        Elem::OneOf(alternatives) => {
            if alternatives.is_empty() {
                return Err(BuildError::EmptyChoice(rule_name.to_owned()));
            }
            for alt in alternatives {
                check_elem(alt, rule_name, ids_by_name)?;
            }
            Ok(())
        }
        Elem::Rule(name) | Elem::RulePlus(name) => {
            if ids_by_name.contains_key(name) {
                Ok(())
            } else {
                Err(BuildError::UnknownRule {
                    referenced: name.clone(),
                    from: rule_name.to_owned(),
                })
            }
        }
    }
}

/// The ways a grammar definition can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("rule `{referenced}` is referenced from `{from}` but never defined")]
    UnknownRule { referenced: String, from: String },
    #[error("rule `{0}` is defined more than once")]
    DuplicateRule(String),
    #[error("rule `{0}` has an empty body")]
    EmptyRule(String),
    #[error("a choice in rule `{0}` has no alternatives")]
    EmptyChoice(String),
}
