//! The public face of the engine: [`Parser`] (one compiled root rule) and [`Lang`] (a grammar
//! plus lexer bundle which memoizes a [`Parser`] per root rule you parse from).
//!
//! A parse is a synchronous call.  Each one lexes the source, runs the engine over the grammar
//! graph, and assembles a [`ParseOutcome`]: the AST on success, a ranked [`Mismatch`] diagnostic
//! on failure, and - either way - the set of terminals which could legally appear at the given
//! editor cursor.  The grammar graph and its FIRST sets persist inside the [`Parser`] and warm
//! up over the first parse; the scanner, chance stack and progress trackers are per-parse.

mod first;
mod node;
mod probe;
mod visit;

use std::{collections::HashMap, rc::Rc, time::Instant};

use itertools::Itertools;
use thiserror::Error as ThisError;

use crate::{
    ast::Ast,
    grammar::{Grammar, Matching, TermPattern},
    lexer::{Lexer, Token},
    scanner::Scanner,
    spec::{convert::ConvertError, Matchers, SpecGrammar},
};

use self::{
    first::FirstSets,
    node::Graph,
    probe::ProbeStart,
    visit::{Outcome, Run},
};

/// The ways a parse can fail *as a call*.  A source string the grammar simply doesn't accept is
/// not an `Error` - that's a [`Mismatch`] inside a successful [`ParseOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    #[error("no rule named `{0}` to start parsing from")]
    UnknownRoot(String),
    #[error("parse abandoned after {0} engine steps (is the grammar left-recursive?)")]
    BudgetExceeded(usize),
}

/// Everything a parse produces.
#[derive(Debug, Clone)]
pub struct ParseOutcome<A> {
    /// Did the grammar accept the whole token sequence?
    pub success: bool,
    /// The reduced value of the root rule; `Some` exactly when `success`
    pub ast: Option<A>,
    /// The terminals which could legally appear at the cursor position, deduplicated by
    /// `(kind, value)`.  Valid whether or not the parse succeeded.
    pub next_matchings: Vec<Matching>,
    /// Why the input was rejected; `Some` exactly when not `success`
    pub error: Option<Mismatch>,
    /// The tokens the lexer produced
    pub tokens: Vec<Token>,
    /// How many engine steps the parse (including its probes) took
    pub visit_count: usize,
    pub costs: Costs,
}

/// A diagnostic for input the grammar rejected, anchored at the furthest-reaching match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// The offending token: the one after the furthest match if there is one (`reason` is then
    /// [`Reason::Wrong`]), otherwise the furthest-matched token itself, if any
    pub token: Option<Token>,
    pub reason: Reason,
    /// The terminals which would have been accepted instead
    pub suggestions: Vec<Matching>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// A token was present but not one the grammar could accept there
    Wrong,
    /// The input stopped while the grammar still wanted more
    Incomplete,
}

/// Wall-clock costs of a parse, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Costs {
    pub lexer_ms: f64,
    pub parser_ms: f64,
}

fn ms_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// A compiled parser for one root rule of one grammar.
///
/// The grammar graph is built here and grows lazily: rule references expand the first time a
/// parse walks through them, and the expansions are kept for every later parse.  Not thread-safe
/// (nor `Send`): one parse at a time, please.
pub struct Parser<A> {
    grammar: Rc<Grammar<A>>,
    lexer: Rc<dyn Lexer>,
    graph: Graph<A>,
    first: FirstSets,
    /// The engine's epoch counter.  Lives here, not per-parse: stale-stamp checks compare for
    /// equality, so restarting the counter could let a node from an old parse masquerade as
    /// fresh.
    version: u64,
    max_steps: usize,
}

impl<A: Ast> Parser<A> {
    pub fn new(
        grammar: Rc<Grammar<A>>,
        lexer: Rc<dyn Lexer>,
        root: &str,
    ) -> Result<Self, Error> {
        let root_id = grammar
            .rule_id(root)
            .ok_or_else(|| Error::UnknownRoot(root.to_owned()))?;
        let graph = Graph::new(&grammar, root_id);
        let first = FirstSets::compute(&grammar);
        Ok(Self {
            grammar,
            lexer,
            graph,
            first,
            version: 0,
            max_steps: visit::MAX_STEPS,
        })
    }

    /// Cap the number of engine steps a single parse may take.  The default is high enough that
    /// only a runaway grammar (e.g. a left-recursive one) ever hits it.
    pub fn step_budget(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Parse `source`, reporting completions for the editor cursor sitting at character offset
    /// `cursor`.
    pub fn parse(&mut self, source: &str, cursor: usize) -> Result<ParseOutcome<A>, Error> {
        let lex_start = Instant::now();
        let tokens = self.lexer.lex(source);
        let lexer_ms = ms_since(lex_start);

        let parse_start = Instant::now();
        let cursor_prev_token = Scanner::new(&tokens).prev_token_from_char(cursor).cloned();
        let mut steps = 0;

        let (outcome, best_progress, cursor_prev_nodes) = {
            let mut run = Run::parse(
                &mut self.graph,
                &self.grammar,
                &self.first,
                &mut self.version,
                &mut steps,
                self.max_steps,
                Scanner::new(&tokens),
                cursor_prev_token.clone(),
            );
            let outcome = run.go()?;
            (outcome, run.best_progress, run.cursor_prev_nodes)
        };

        let (success, ast) = match outcome {
            Outcome::Accepted(value) => (true, Some(value)),
            Outcome::Rejected => (false, None),
        };

        // On rejection, report at the furthest-reaching match: what *would* have been accepted
        // after it, and which token got in the way
        let error = if success {
            None
        } else {
            let (probe_start, at_token) = match &best_progress {
                Some(best) => (ProbeStart::After(best.node), Some(best.token.clone())),
                None => (ProbeStart::Root, None),
            };
            let suggestions = self.matchings_at(probe_start, &mut steps)?;
            let (token, reason) = match at_token {
                Some(token) => match Scanner::new(&tokens).next_after(&token) {
                    Some(following) => (Some(following.clone()), Reason::Wrong),
                    None => (Some(token), Reason::Incomplete),
                },
                None => (None, Reason::Incomplete),
            };
            Some(Mismatch {
                token,
                reason,
                suggestions,
            })
        };

        // Completions at the cursor: union the probes of every terminal which consumed the
        // token just before it (or the whole grammar's opening terminals if nothing precedes
        // it), then keep only candidates consistent with whatever already follows the cursor
        let next_matchings = {
            let starts: Vec<ProbeStart> = match cursor_prev_token {
                None => vec![ProbeStart::Root],
                Some(_) => cursor_prev_nodes
                    .iter()
                    .map(|&node| ProbeStart::After(node))
                    .collect(),
            };
            let mut patterns = Vec::new();
            for start in starts {
                patterns.extend(self.patterns_at(start, &mut steps)?);
            }
            if let Some(following) = Scanner::new(&tokens).next_token_from_char(cursor) {
                patterns.retain(|pattern| pattern.admits(following));
            }
            patterns
                .iter()
                .map(TermPattern::matching)
                .unique()
                .collect_vec()
        };

        let parser_ms = ms_since(parse_start);
        log::debug!(
            "parse of {} token(s): success={} in {} step(s), {:.3}ms",
            tokens.len(),
            success,
            steps,
            parser_ms
        );
        Ok(ParseOutcome {
            success,
            ast,
            next_matchings,
            error,
            tokens,
            visit_count: steps,
            costs: Costs {
                lexer_ms,
                parser_ms,
            },
        })
    }

    fn patterns_at(
        &mut self,
        start: ProbeStart,
        steps: &mut usize,
    ) -> Result<Vec<TermPattern>, Error> {
        probe::probe(
            &mut self.graph,
            &self.grammar,
            &self.first,
            &mut self.version,
            steps,
            self.max_steps,
            start,
        )
    }

    fn matchings_at(
        &mut self,
        start: ProbeStart,
        steps: &mut usize,
    ) -> Result<Vec<Matching>, Error> {
        Ok(self
            .patterns_at(start, steps)?
            .iter()
            .map(TermPattern::matching)
            .unique()
            .collect_vec())
    }
}

/// A language: a grammar, the lexer that feeds it, and one memoized [`Parser`] per root rule
/// parses have started from.
///
/// This is the registry the engine hands callers instead of any process-global state: drop the
/// `Lang` and every compiled graph goes with it.
pub struct Lang<A> {
    grammar: Rc<Grammar<A>>,
    lexer: Rc<dyn Lexer>,
    root: String,
    parsers: HashMap<String, Parser<A>>,
}

impl<A: Ast> Lang<A> {
    pub fn new(grammar: Grammar<A>, lexer: impl Lexer + 'static, root: impl Into<String>) -> Self {
        Self {
            grammar: Rc::new(grammar),
            lexer: Rc::new(lexer),
            root: root.into(),
            parsers: HashMap::new(),
        }
    }

    /// Load a language from a deserialized grammar definition, resolving its named token
    /// classes against `matchers`.
    pub fn from_spec(
        spec: SpecGrammar,
        matchers: &Matchers,
        lexer: impl Lexer + 'static,
    ) -> Result<Self, ConvertError> {
        let root = spec.root().to_owned();
        let grammar = spec.into_grammar(matchers)?;
        Ok(Self::new(grammar, lexer, root))
    }

    /// The rule [`parse`](Self::parse) starts from
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Parse from the language's root rule
    pub fn parse(&mut self, source: &str, cursor: usize) -> Result<ParseOutcome<A>, Error> {
        let root = self.root.clone();
        self.parse_from(&root, source, cursor)
    }

    /// Parse from any named rule.  The parser for each root is compiled on first use and reused
    /// afterwards.
    pub fn parse_from(
        &mut self,
        root: &str,
        source: &str,
        cursor: usize,
    ) -> Result<ParseOutcome<A>, Error> {
        if !self.parsers.contains_key(root) {
            let parser = Parser::new(self.grammar.clone(), self.lexer.clone(), root)?;
            self.parsers.insert(root.to_owned(), parser);
        }
        let parser = self
            .parsers
            .get_mut(root)
            .expect("inserted by the lines above");
        parser.parse(source, cursor)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    use super::{Error, Lang, Parser, Reason};
    use crate::{
        ast::{Ast, TokenTree},
        grammar::{Elem, Grammar, MatchKind, Matching},
        lexer::SpaceLexer,
        matcher::RegexMatcher,
        spec::{Matchers, SpecGrammar},
    };

    fn lit(value: &str) -> Matching {
        Matching {
            kind: MatchKind::Literal,
            value: value.to_owned(),
        }
    }

    fn special(value: &str) -> Matching {
        Matching {
            kind: MatchKind::Special,
            value: value.to_owned(),
        }
    }

    /// `expr = term ('+' | '-') term; term = 'a' | 'b'` - the running example
    fn arith() -> Lang<TokenTree> {
        let grammar = Grammar::builder()
            .rule(
                "expr",
                vec![
                    Elem::rule("term"),
                    Elem::one_of(vec![Elem::lit("+"), Elem::lit("-")]),
                    Elem::rule("term"),
                ],
            )
            .rule(
                "term",
                vec![Elem::one_of(vec![Elem::lit("a"), Elem::lit("b")])],
            )
            .build()
            .unwrap();
        Lang::new(grammar, SpaceLexer, "expr")
    }

    #[test]
    fn accepts_and_builds_ast() {
        let mut lang = arith();
        let outcome = lang.parse("a + b", 5).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.error, None);
        assert_eq!(outcome.tokens.len(), 3);
        assert!(outcome.visit_count > 0);
        let ast = outcome.ast.unwrap();
        assert_eq!(ast.leaf_texts(), vec!["a", "+", "b"]);
        // Identity reduction mirrors the rule structure: each rule is a row, choices are
        // transparent
        match &ast {
            TokenTree::Row(children) => {
                assert_eq!(children.len(), 3);
                assert_eq!(children[0].leaf_texts(), vec!["a"]);
                assert!(matches!(children[1], TokenTree::Leaf(_)));
            }
            other => panic!("expected a row, got {:?}", other),
        }
    }

    #[test]
    fn incomplete_input_reports_suggestions() {
        let mut lang = arith();
        let outcome = lang.parse("a +", 3).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.ast, None);
        let error = outcome.error.unwrap();
        assert_eq!(error.reason, Reason::Incomplete);
        assert_eq!(error.token.map(|t| t.text), Some("+".to_owned()));
        assert_eq!(error.suggestions, vec![lit("a"), lit("b")]);
    }

    #[test]
    fn wrong_token_is_named() {
        let mut lang = arith();
        let outcome = lang.parse("a & b", 5).unwrap();
        assert!(!outcome.success);
        let error = outcome.error.unwrap();
        assert_eq!(error.reason, Reason::Wrong);
        assert_eq!(error.token.map(|t| t.text), Some("&".to_owned()));
        assert_eq!(error.suggestions, vec![lit("+"), lit("-")]);
    }

    #[test]
    fn empty_input_offers_the_grammar_opening() {
        let mut lang = arith();
        let outcome = lang.parse("", 0).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.next_matchings, vec![lit("a"), lit("b")]);
        let error = outcome.error.unwrap();
        assert_eq!(error.reason, Reason::Incomplete);
        assert_eq!(error.token, None);
        assert_eq!(error.suggestions, vec![lit("a"), lit("b")]);
    }

    #[test]
    fn cursor_after_first_word_offers_operators() {
        let mut lang = arith();
        // Source is just `a` plus a trailing space; the parse fails but the cursor info stands
        let outcome = lang.parse("a ", 2).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.next_matchings, vec![lit("+"), lit("-")]);
    }

    #[test]
    fn cursor_mid_expression_narrows_to_whats_typed() {
        let mut lang = arith();
        // Cursor between `a` and `+`: both operators could follow `a`, but only `+` is
        // consistent with the token already sitting after the cursor
        let outcome = lang.parse("a + b", 2).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.next_matchings, vec![lit("+")]);
    }

    #[test]
    fn reparsing_is_idempotent() {
        let mut lang = arith();
        let first = lang.parse("a + b", 5).unwrap();
        // ... even with a failing parse in between to dirty the graph
        let failed = lang.parse("a & b", 5).unwrap();
        assert!(!failed.success);
        let second = lang.parse("a + b", 5).unwrap();
        assert_eq!(first.success, second.success);
        assert_eq!(first.ast, second.ast);
        assert_eq!(first.next_matchings, second.next_matchings);
    }

    #[test]
    fn backtracking_rewinds_the_scanner() {
        // `ab` consumes `a` before failing on `z`, so the fallback `a` rule only works if the
        // scanner was properly rewound
        let grammar = Grammar::<TokenTree>::builder()
            .rule(
                "s",
                vec![
                    Elem::one_of(vec![Elem::rule("ab"), Elem::rule("just_a")]),
                    Elem::lit("z"),
                ],
            )
            .rule("ab", vec![Elem::lit("a"), Elem::lit("b")])
            .rule("just_a", vec![Elem::lit("a")])
            .build()
            .unwrap();
        let mut parser =
            Parser::new(Rc::new(grammar), Rc::new(SpaceLexer), "s").unwrap();
        let outcome = parser.parse("a z", 3).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.ast.unwrap().leaf_texts(), vec!["a", "z"]);
        // The graph was expanded and re-wired during the parse; its back edges must still agree
        parser.graph.assert_back_refs();
    }

    #[test]
    fn loose_true_makes_elements_optional() {
        let grammar = Grammar::<TokenTree>::builder()
            .rule(
                "s",
                vec![
                    Elem::lit("x"),
                    Elem::one_of(vec![Elem::lit("y"), Elem::loose(true)]),
                    Elem::lit("z"),
                ],
            )
            .build()
            .unwrap();
        let mut lang = Lang::new(grammar, SpaceLexer, "s");

        let with_y = lang.parse("x y z", 5).unwrap();
        assert!(with_y.success);
        assert_eq!(with_y.ast.unwrap().leaf_texts(), vec!["x", "y", "z"]);

        let without_y = lang.parse("x z", 3).unwrap();
        assert!(without_y.success);
        let ast = without_y.ast.unwrap();
        assert_eq!(ast.leaf_texts(), vec!["x", "z"]);
        // The skipped slot is a hole, not silently dropped
        match ast {
            TokenTree::Row(children) => assert_eq!(children[1], TokenTree::Hole),
            other => panic!("expected a row, got {:?}", other),
        }

        // The sentinel never shows up as a completion: after `x` the *real* options are `y` and
        // (skipping the optional) `z`
        let completions = lang.parse("x ", 2).unwrap();
        assert_eq!(completions.next_matchings, vec![lit("y"), lit("z")]);
    }

    #[test]
    fn loose_false_forces_the_next_alternative() {
        let grammar = Grammar::<TokenTree>::builder()
            .rule(
                "s",
                vec![Elem::one_of(vec![Elem::loose(false), Elem::lit("x")])],
            )
            .build()
            .unwrap();
        let mut lang = Lang::new(grammar, SpaceLexer, "s");
        let outcome = lang.parse("x", 1).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.ast.unwrap().leaf_texts(), vec!["x"]);
    }

    #[test]
    fn plus_collects_one_row_per_repetition() {
        let grammar = Grammar::<TokenTree>::builder()
            .rule(
                "pair",
                vec![Elem::lit("("), Elem::plus("item"), Elem::lit(")")],
            )
            .rule("item", vec![Elem::lit("x")])
            .build()
            .unwrap();
        let mut lang = Lang::new(grammar, SpaceLexer, "pair");
        let outcome = lang.parse("( x x x )", 9).unwrap();
        assert!(outcome.success);
        let ast = outcome.ast.unwrap();
        // pair = [ "(", <plus value>, ")" ]; the plus value is one row per repetition, each row
        // indexed by child position
        match &ast {
            TokenTree::Row(children) => match &children[1] {
                TokenTree::Row(rows) => {
                    assert_eq!(rows.len(), 3);
                    for row in rows {
                        // Each repetition row is itself a row, indexed by child position
                        assert!(matches!(row, TokenTree::Row(cells) if cells.len() == 1));
                        assert_eq!(row.leaf_texts(), vec!["x"]);
                    }
                }
                other => panic!("expected repetition rows, got {:?}", other),
            },
            other => panic!("expected a row, got {:?}", other),
        }
        assert_eq!(ast.leaf_texts(), vec!["(", "x", "x", "x", ")"]);
    }

    #[test]
    fn nested_plus_keeps_rows_straight() {
        let grammar = Grammar::<TokenTree>::builder()
            .rule(
                "grid",
                vec![Elem::lit("["), Elem::plus("group"), Elem::lit("]")],
            )
            .rule(
                "group",
                vec![Elem::lit("("), Elem::plus("item"), Elem::lit(")")],
            )
            .rule("item", vec![Elem::lit("x")])
            .build()
            .unwrap();
        let mut lang = Lang::new(grammar, SpaceLexer, "grid");
        let outcome = lang.parse("[ ( x ) ( x x ) ]", 17).unwrap();
        assert!(outcome.success);
        let ast = outcome.ast.unwrap();
        assert_eq!(
            ast.leaf_texts(),
            vec!["[", "(", "x", ")", "(", "x", "x", ")", "]"]
        );
        // Two groups; the second contains two item rows
        let groups = match &ast {
            TokenTree::Row(children) => match &children[1] {
                TokenTree::Row(rows) => rows.clone(),
                other => panic!("expected group rows, got {:?}", other),
            },
            other => panic!("expected a row, got {:?}", other),
        };
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].leaf_texts(), vec!["(", "x", ")"]);
        assert_eq!(groups[1].leaf_texts(), vec!["(", "x", "x", ")"]);
        // Each group row is [ "(", <item rows>, ")" ]; the second group holds two item rows
        let second_group_items = match &groups[1] {
            TokenTree::Row(cells) => match &cells[1] {
                TokenTree::Row(items) => items.len(),
                other => panic!("expected item rows, got {:?}", other),
            },
            other => panic!("expected a row, got {:?}", other),
        };
        assert_eq!(second_group_items, 2);
    }

    #[test]
    fn reducers_replace_the_row() {
        let grammar = Grammar::builder()
            .rule_with(
                "expr",
                vec![
                    Elem::rule("term"),
                    Elem::one_of(vec![Elem::lit("+"), Elem::lit("-")]),
                    Elem::rule("term"),
                ],
                |mut children: Vec<TokenTree>| {
                    children.reverse();
                    TokenTree::row(children)
                },
            )
            .rule(
                "term",
                vec![Elem::one_of(vec![Elem::lit("a"), Elem::lit("b")])],
            )
            .build()
            .unwrap();
        let mut lang = Lang::new(grammar, SpaceLexer, "expr");
        let outcome = lang.parse("a + b", 5).unwrap();
        assert_eq!(outcome.ast.unwrap().leaf_texts(), vec!["b", "+", "a"]);
    }

    #[test]
    fn special_matchers_match_and_suggest_by_name() {
        let number: Rc<RegexMatcher> = Rc::new(RegexMatcher::new("number", "[0-9]+").unwrap());
        let grammar = Grammar::<TokenTree>::builder()
            .rule(
                "sum",
                vec![
                    Elem::special(number.clone()),
                    Elem::lit("+"),
                    Elem::special(number),
                ],
            )
            .build()
            .unwrap();
        let mut lang = Lang::new(grammar, SpaceLexer, "sum");

        let ok = lang.parse("1 + 23", 6).unwrap();
        assert!(ok.success);
        assert_eq!(ok.ast.unwrap().leaf_texts(), vec!["1", "+", "23"]);

        let bad = lang.parse("1 + x", 5).unwrap();
        assert!(!bad.success);
        let error = bad.error.unwrap();
        assert_eq!(error.reason, Reason::Wrong);
        assert_eq!(error.token.map(|t| t.text), Some("x".to_owned()));
        assert_eq!(error.suggestions, vec![special("number")]);
    }

    #[test]
    fn prefix_matches_are_not_accepts() {
        let mut lang = arith();
        let outcome = lang.parse("a + b b", 7).unwrap();
        assert!(!outcome.success);
        let error = outcome.error.unwrap();
        // The engine got as far as the first `b`; the second one is the problem
        assert_eq!(error.reason, Reason::Wrong);
        assert_eq!(error.token.map(|t| t.text), Some("b".to_owned()));
    }

    #[test]
    fn empty_source_accepts_iff_the_root_does() {
        let grammar = Grammar::<TokenTree>::builder()
            .rule("nothing", vec![Elem::loose(true)])
            .build()
            .unwrap();
        let mut lang = Lang::new(grammar, SpaceLexer, "nothing");
        let outcome = lang.parse("", 0).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.ast.unwrap(), TokenTree::Row(vec![TokenTree::Hole]));
    }

    #[test]
    fn left_recursion_hits_the_step_budget() {
        let grammar = Grammar::<TokenTree>::builder()
            .rule("e", vec![Elem::rule("e"), Elem::lit("+")])
            .build()
            .unwrap();
        let mut parser = Parser::new(Rc::new(grammar), Rc::new(SpaceLexer), "e")
            .unwrap()
            .step_budget(10_000);
        match parser.parse("a", 1) {
            Err(Error::BudgetExceeded(steps)) => assert!(steps > 10_000),
            other => panic!("expected BudgetExceeded, got {:?}", other.map(|o| o.success)),
        }
    }

    #[test]
    fn unknown_roots_are_rejected() {
        let mut lang = arith();
        match lang.parse_from("nope", "a", 1) {
            Err(Error::UnknownRoot(name)) => assert_eq!(name, "nope"),
            other => panic!("expected UnknownRoot, got {:?}", other.map(|o| o.success)),
        }
    }

    #[test]
    fn parsers_are_memoized_per_root() {
        let mut lang = arith();
        assert!(lang.parse_from("term", "a", 1).unwrap().success);
        assert!(lang.parse_from("term", "b", 1).unwrap().success);
        assert!(!lang.parse_from("term", "a b", 3).unwrap().success);
        // The root-rule parser is untouched by all of the above
        assert!(lang.parse("a - b", 5).unwrap().success);
    }

    #[test]
    fn languages_load_from_grammar_files() {
        let spec: SpecGrammar = serde_json::from_str(
            r#"{
                "root": "expr",
                "rules": {
                    "expr": [{ "rule": "term" }, ["+", "-"], { "rule": "term" }],
                    "term": [["a", "b", { "special": "number" }]]
                }
            }"#,
        )
        .unwrap();
        let mut matchers = Matchers::new();
        matchers.insert(
            "number".to_owned(),
            Rc::new(RegexMatcher::new("number", "[0-9]+").unwrap()) as _,
        );
        let mut lang: Lang<TokenTree> = Lang::from_spec(spec, &matchers, SpaceLexer).unwrap();
        assert_eq!(lang.root(), "expr");

        let outcome = lang.parse("a + 42", 6).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.ast.unwrap().leaf_texts(), vec!["a", "+", "42"]);

        // Completion after `a` knows about the named token class too
        let completions = lang.parse("a ", 2).unwrap();
        assert_eq!(completions.next_matchings, vec![lit("+"), lit("-")]);
        let opening = lang.parse("", 0).unwrap();
        assert_eq!(
            opening.next_matchings,
            vec![lit("a"), lit("b"), special("number")]
        );
    }
}
