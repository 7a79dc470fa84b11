//! FIRST sets: for each named rule, the terminals that can begin a successful derivation of it.
//!
//! The engine uses these to prune: a named rule whose FIRST set is resolved and doesn't admit
//! the next token can be failed immediately, without expanding or walking its body.  Pruning is
//! purely an optimisation, so any rule we can't resolve a set for (mutual recursion, or a body
//! that can begin with a `loose` sentinel) simply stays unresolved and is never pruned against -
//! the parse is still correct, just slower.
//!
//! Resolution is a little dance because rules refer to each other by name.  Candidate lists are
//! collected per rule (terminals plus unresolved rule placeholders) together with the inverse
//! "who depends on me" edges; rules whose candidates are all terminals publish their set, and
//! publishing substitutes the set into every dependent, possibly making *them* publishable.  The
//! worklist runs until nothing new publishes.  Published sets are final: they are never
//! recomputed.

use index_vec::IndexVec;
use itertools::Itertools;

use crate::grammar::{Elem, Grammar, RuleId, TermPattern};

pub(crate) struct FirstSets {
    resolved: IndexVec<RuleId, Option<Vec<TermPattern>>>,
}

#[derive(Clone)]
enum Candidate {
    Term(TermPattern),
    Rule(RuleId),
}

/// Marker: the rule's first element can be a `loose` sentinel, so no set of terminals describes
/// how it starts and it must never be pruned against.
struct Unresolvable;

impl FirstSets {
    pub fn compute<A>(grammar: &Grammar<A>) -> Self {
        let num_rules = grammar.num_rules();

        // Collect candidates from the first element of every rule body.  `None` marks a rule
        // that can never resolve.
        let mut candidates: IndexVec<RuleId, Option<Vec<Candidate>>> = (0..num_rules)
            .map(|idx| {
                let rule = grammar.rule(RuleId::new(idx));
                let mut list = Vec::new();
                match collect(grammar, &rule.body[0], &mut list) {
                    Ok(()) => Some(list),
                    Err(Unresolvable) => None,
                }
            })
            .collect();

        // Inverse edges: `dependents[r]` is every rule whose candidate list mentions `r`
        let mut dependents: IndexVec<RuleId, Vec<RuleId>> =
            (0..num_rules).map(|_| Vec::new()).collect();
        for (id, list) in candidates.iter_enumerated() {
            for candidate in list.iter().flatten() {
                if let Candidate::Rule(referenced) = candidate {
                    dependents[*referenced].push(id);
                }
            }
        }

        let mut resolved: IndexVec<RuleId, Option<Vec<TermPattern>>> =
            (0..num_rules).map(|_| None).collect();

        // Seed the worklist with the rules that are already all-terminal
        let mut worklist: Vec<RuleId> = candidates
            .iter_enumerated()
            .filter(|(_id, list)| matches!(list, Some(list) if list.iter().all(is_term)))
            .map(|(id, _list)| id)
            .collect();

        while let Some(id) = worklist.pop() {
            if resolved[id].is_some() {
                continue;
            }
            let terms = candidates[id]
                .take()
                .into_iter()
                .flatten()
                .filter_map(|c| match c {
                    Candidate::Term(t) => Some(t),
                    Candidate::Rule(_) => None,
                })
                .unique_by(TermPattern::matching)
                .collect_vec();
            resolved[id] = Some(terms);

            // Substitute the published set into each dependent; any dependent left with only
            // terminals is now publishable itself
            for dependent in dependents[id].clone() {
                if resolved[dependent].is_some() {
                    continue;
                }
                let list = match &mut candidates[dependent] {
                    Some(list) => list,
                    None => continue, // unresolvable stays unresolvable
                };
                let terms = resolved[id].as_ref().expect("just published");
                let mut idx = 0;
                while idx < list.len() {
                    match list[idx] {
                        Candidate::Rule(referenced) if referenced == id => {
                            list.splice(idx..=idx, terms.iter().cloned().map(Candidate::Term));
                            idx += terms.len();
                        }
                        _ => idx += 1,
                    }
                }
                if list.iter().all(is_term) {
                    worklist.push(dependent);
                }
            }
        }

        Self { resolved }
    }

    /// The published FIRST set of `rule`, or `None` if it never resolved
    pub fn get(&self, rule: RuleId) -> Option<&[TermPattern]> {
        self.resolved[rule].as_deref()
    }
}

fn is_term(candidate: &Candidate) -> bool {
    matches!(candidate, Candidate::Term(_))
}

/// Walk the first element of a rule body, yielding terminals and rule placeholders
fn collect<A>(
    grammar: &Grammar<A>,
    elem: &Elem,
    out: &mut Vec<Candidate>,
) -> Result<(), Unresolvable> {
    match elem {
        Elem::Literal(text) => out.push(Candidate::Term(TermPattern::Literal(text.clone()))),
        Elem::Special(matcher) => {
            out.push(Candidate::Term(TermPattern::Special(matcher.clone())))
        }
        // A leading sentinel means the rule can start without consuming anything, which no
        // terminal set can express
        Elem::Loose(_) => return Err(Unresolvable),
        Elem::OneOf(alternatives) => {
            for alt in alternatives {
                collect(grammar, alt, out)?;
            }
        }
        Elem::Rule(name) | Elem::RulePlus(name) => {
            let id = grammar
                .rule_id(name)
                .expect("rule references are checked when the grammar is built");
            out.push(Candidate::Rule(id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::FirstSets;
    use crate::{
        ast::TokenTree,
        grammar::{Elem, Grammar, MatchKind, Matching},
    };

    fn lit(value: &str) -> Matching {
        Matching {
            kind: MatchKind::Literal,
            value: value.to_owned(),
        }
    }

    fn firsts(grammar: &Grammar<TokenTree>, rule: &str) -> Option<Vec<Matching>> {
        let sets = FirstSets::compute(grammar);
        let id = grammar.rule_id(rule).unwrap();
        sets.get(id)
            .map(|terms| terms.iter().map(|t| t.matching()).collect())
    }

    #[test]
    fn resolves_through_chained_references() {
        let grammar = Grammar::<TokenTree>::builder()
            .rule("a", vec![Elem::rule("b"), Elem::lit("unseen")])
            .rule("b", vec![Elem::rule("c")])
            .rule("c", vec![Elem::lit("x")])
            .build()
            .unwrap();
        assert_eq!(firsts(&grammar, "a"), Some(vec![lit("x")]));
        assert_eq!(firsts(&grammar, "b"), Some(vec![lit("x")]));
        assert_eq!(firsts(&grammar, "c"), Some(vec![lit("x")]));
    }

    #[test]
    fn choices_union_and_dedup() {
        let grammar = Grammar::<TokenTree>::builder()
            .rule(
                "a",
                vec![Elem::one_of(vec![
                    Elem::lit("x"),
                    Elem::rule("b"),
                    Elem::one_of(vec![Elem::lit("y"), Elem::lit("x")]),
                ])],
            )
            .rule("b", vec![Elem::lit("z")])
            .build()
            .unwrap();
        assert_eq!(firsts(&grammar, "a"), Some(vec![lit("x"), lit("z"), lit("y")]));
    }

    #[test]
    fn plus_references_resolve_like_plain_ones() {
        let grammar = Grammar::<TokenTree>::builder()
            .rule("list", vec![Elem::plus("item")])
            .rule("item", vec![Elem::lit("x")])
            .build()
            .unwrap();
        assert_eq!(firsts(&grammar, "list"), Some(vec![lit("x")]));
    }

    #[test]
    fn cycles_stay_unresolved() {
        let grammar = Grammar::<TokenTree>::builder()
            .rule("a", vec![Elem::rule("b")])
            .rule("b", vec![Elem::rule("a")])
            .rule("e", vec![Elem::rule("e"), Elem::lit("+")])
            .rule("fine", vec![Elem::lit("k")])
            .build()
            .unwrap();
        assert_eq!(firsts(&grammar, "a"), None);
        assert_eq!(firsts(&grammar, "b"), None);
        assert_eq!(firsts(&grammar, "e"), None);
        // ... without stopping unrelated rules from resolving
        assert_eq!(firsts(&grammar, "fine"), Some(vec![lit("k")]));
    }

    #[test]
    fn leading_sentinels_disable_resolution() {
        let grammar = Grammar::<TokenTree>::builder()
            .rule(
                "opt",
                vec![
                    Elem::one_of(vec![Elem::lit("x"), Elem::loose(true)]),
                    Elem::lit("y"),
                ],
            )
            .build()
            .unwrap();
        assert_eq!(firsts(&grammar, "opt"), None);
    }
}
