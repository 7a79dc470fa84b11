//! The engine itself: a depth-first walk of the grammar graph with ordered choice and
//! chronological backtracking.
//!
//! The walk is driven as an explicit step loop rather than host-stack recursion, so the only
//! thing bounding a pathological grammar is the step budget, not the thread's stack.  Each loop
//! iteration either descends into a node ([`Step::Into`]), climbs out of a node that matched
//! ([`Step::Up`], carrying the node's AST value), or gives up on the current attempt and pops the
//! most recent untried alternative ([`Step::Retry`]).
//!
//! Backtracking state is deliberately cheap.  A [`Chance`] records just enough to resume an
//! alternative: the node, the child index to resume at, and the scanner position to rewind to.
//! Node-local progress (`head`/`results`) is *not* snapshotted; instead every `try_chances` bumps
//! a version counter and stamps the spine of the resumed node, and any sequence or choice entered
//! with a stale stamp resets itself first.  Only the path the new attempt actually walks pays for
//! the reset.

use crate::{
    ast::Ast,
    grammar::{Grammar, TermPattern},
    lexer::Token,
    scanner::Scanner,
};

use super::{
    first::FirstSets,
    node::{Graph, Kind, NodeId},
    Error,
};

/// Default cap on engine steps per parse.  Generous enough for any sane grammar; its real job is
/// stopping left-recursive grammars (which expand themselves forever) from hanging the host.
pub(crate) const MAX_STEPS: usize = 10_000_000;

/// A saved backtracking point: "if the current attempt fails, rewind the scanner to
/// `token_index` and resume at `node`, child `head`".
struct Chance {
    node: NodeId,
    head: usize,
    token_index: usize,
    /// For sequences in `plus` mode: which repetition row the resumed attempt fills
    plus_head: usize,
}

/// The furthest-reaching terminal match seen so far.  "Furthest" means fewest tokens left
/// afterwards; on overall failure this is where the error gets reported.
pub(crate) struct BestProgress {
    pub node: NodeId,
    pub token: Token,
    pub rest: usize,
}

pub(crate) enum Outcome<A> {
    Accepted(A),
    Rejected,
}

enum Step<A> {
    Into(NodeId),
    Up(NodeId, A),
    Retry,
}

/// One execution of the engine: either a real parse, or a probe enumerating terminals.
pub(crate) struct Run<'a, 't, A> {
    graph: &'a mut Graph<A>,
    grammar: &'a Grammar<A>,
    first: &'a FirstSets,
    scanner: Scanner<'t>,
    version: &'a mut u64,
    steps: &'a mut usize,
    max_steps: usize,
    chances: Vec<Chance>,

    /// Probe mode: terminals are recorded instead of consumed, and reaching the root never
    /// accepts - the run keeps exploring until the chance stack is dry
    probing: bool,
    /// Build AST values?  (Disabled while probing)
    reduce: bool,
    /// Consult FIRST sets?  (Disabled while probing)
    prune: bool,

    /// The token immediately before the editor cursor, if any
    cursor_prev_token: Option<Token>,
    /// Terminals which consumed `cursor_prev_token` during this run
    pub cursor_prev_nodes: Vec<NodeId>,
    pub best_progress: Option<BestProgress>,
    /// Terminals offered by the grammar, collected in probe mode
    pub found: Vec<NodeId>,
}

impl<'a, 't, A: Ast> Run<'a, 't, A> {
    #[allow(clippy::too_many_arguments)]
    pub fn parse(
        graph: &'a mut Graph<A>,
        grammar: &'a Grammar<A>,
        first: &'a FirstSets,
        version: &'a mut u64,
        steps: &'a mut usize,
        max_steps: usize,
        scanner: Scanner<'t>,
        cursor_prev_token: Option<Token>,
    ) -> Self {
        Self {
            graph,
            grammar,
            first,
            scanner,
            version,
            steps,
            max_steps,
            chances: Vec::new(),
            probing: false,
            reduce: true,
            prune: true,
            cursor_prev_token,
            cursor_prev_nodes: Vec::new(),
            best_progress: None,
            found: Vec::new(),
        }
    }

    pub fn probe(
        graph: &'a mut Graph<A>,
        grammar: &'a Grammar<A>,
        first: &'a FirstSets,
        version: &'a mut u64,
        steps: &'a mut usize,
        max_steps: usize,
    ) -> Self {
        Self {
            graph,
            grammar,
            first,
            scanner: Scanner::new(&[]),
            version,
            steps,
            max_steps,
            chances: Vec::new(),
            probing: true,
            reduce: false,
            prune: false,
            cursor_prev_token: None,
            cursor_prev_nodes: Vec::new(),
            best_progress: None,
            found: Vec::new(),
        }
    }

    /// Run from the root of the graph
    pub fn go(&mut self) -> Result<Outcome<A>, Error> {
        *self.version += 1;
        let root = self.graph.root;
        self.run(Step::Into(root))
    }

    /// Run as if `node` had just matched: climb out of it and keep going.  Used by probes to ask
    /// "what could come after this terminal?".
    pub fn go_after(&mut self, node: NodeId) -> Result<Outcome<A>, Error> {
        *self.version += 1;
        self.graph.stamp_spine(node, *self.version);
        self.run(Step::Up(node, A::hole()))
    }

    fn run(&mut self, start: Step<A>) -> Result<Outcome<A>, Error> {
        let mut step = start;
        loop {
            step = match step {
                Step::Into(id) => self.visit(id)?,
                Step::Up(id, value) => match self.ascend(id, value)? {
                    Climb::Continue(step) => step,
                    Climb::Accept(value) => return Ok(Outcome::Accepted(value)),
                },
                Step::Retry => match self.try_chances() {
                    Some(step) => step,
                    None => return Ok(Outcome::Rejected),
                },
            };
        }
    }

    fn count_step(&mut self) -> Result<(), Error> {
        *self.steps += 1;
        if *self.steps > self.max_steps {
            log::warn!("engine step budget exhausted at {} steps", self.steps);
            Err(Error::BudgetExceeded(*self.steps))
        } else {
            Ok(())
        }
    }

    ////////////////
    // DESCENDING //
    ////////////////

    fn visit(&mut self, id: NodeId) -> Result<Step<A>, Error> {
        self.count_step()?;
        // Classify first so the arena borrow is released before any arm mutates the graph
        enum Class {
            Term(TermPattern),
            Seq,
            Choice,
            RuleRef,
        }
        let class = match &self.graph.nodes[id].kind {
            Kind::Term(term) => Class::Term(term.pattern.clone()),
            Kind::Seq(_) => Class::Seq,
            Kind::Choice(_) => Class::Choice,
            Kind::RuleRef(_) => Class::RuleRef,
        };
        match class {
            Class::RuleRef => {
                let expanded = self.graph.expand_in_place(self.grammar, id);
                log::trace!("expanded rule reference {:?} -> {:?}", id, expanded);
                Ok(Step::Into(expanded))
            }
            Class::Term(pattern) => Ok(self.visit_term(id, pattern)),
            Class::Seq => Ok(self.visit_seq(id)),
            Class::Choice => Ok(self.visit_choice(id)),
        }
    }

    fn visit_term(&mut self, id: NodeId, pattern: TermPattern) -> Step<A> {
        if self.probing {
            return match pattern {
                // A sentinel that always matches is invisible to completion: step over it
                TermPattern::Loose(true) => Step::Up(id, A::hole()),
                TermPattern::Loose(false) => Step::Retry,
                _ => {
                    if !self.found.contains(&id) {
                        self.found.push(id);
                    }
                    Step::Retry
                }
            };
        }

        match pattern {
            TermPattern::Loose(matches) => {
                // Sentinels consume nothing: they either succeed silently or force backtracking
                if matches {
                    Step::Up(id, A::hole())
                } else {
                    Step::Retry
                }
            }
            pattern => {
                let token = match self.scanner.peek() {
                    Some(token) => token.clone(),
                    None => return Step::Retry,
                };
                if !pattern.admits(&token) {
                    return Step::Retry;
                }
                self.scanner.advance();
                log::trace!("matched token {:?}", token.text);

                let rest = self.scanner.rest_count();
                if self.best_progress.as_ref().map_or(true, |b| rest < b.rest) {
                    self.best_progress = Some(BestProgress {
                        node: id,
                        token: token.clone(),
                        rest,
                    });
                }
                if let Some(cursor_prev) = &self.cursor_prev_token {
                    if cursor_prev.span == token.span && !self.cursor_prev_nodes.contains(&id) {
                        self.cursor_prev_nodes.push(id);
                    }
                }
                Step::Up(id, A::leaf(&token))
            }
        }
    }

    fn visit_seq(&mut self, id: NodeId) -> Step<A> {
        let version = *self.version;
        let prune_rule = {
            let seq = self.graph.seq_mut(id);
            if seq.version != version {
                seq.head = 0;
                seq.plus_head = 0;
                seq.results.clear();
                seq.version = version;
            }
            if seq.head == 0 { seq.rule } else { None }
        };

        // A named rule starting from scratch can be failed up-front if no terminal in its FIRST
        // set admits the next token.  An unresolved set never prunes.
        if self.prune {
            if let Some(terms) = prune_rule.and_then(|rule| self.first.get(rule)) {
                let admits = match self.scanner.peek() {
                    Some(token) => terms.iter().any(|t| t.admits(token)),
                    None => false,
                };
                if !admits {
                    log::trace!("pruned {:?} via its FIRST set", id);
                    return Step::Retry;
                }
            }
        }

        let seq = self.graph.seq_mut(id);
        if seq.head < seq.children.len() {
            let child = seq.children[seq.head];
            seq.head += 1;
            Step::Into(child)
        } else {
            let value = if self.reduce { self.reduce_seq(id) } else { A::hole() };
            Step::Up(id, value)
        }
    }

    /// Collapse a completed sequence's result slots into its AST value.  In `plus` mode the
    /// slots hold one row per repetition; the reducer sees the list of rows.
    fn reduce_seq(&mut self, id: NodeId) -> A {
        let seq = self.graph.seq_mut(id);
        let num_children = seq.children.len();
        let row = |slots: &[Option<A>]| -> Vec<A> {
            slots
                .iter()
                .map(|slot| slot.clone().unwrap_or_else(A::hole))
                .collect()
        };
        let values = if seq.plus {
            seq.results
                .chunks(num_children)
                .map(|chunk| A::row(row(chunk)))
                .collect()
        } else {
            row(&seq.results)
        };
        match &seq.reduce {
            Some(reduce) => reduce(values),
            None => A::row(values),
        }
    }

    fn visit_choice(&mut self, id: NodeId) -> Step<A> {
        let version = *self.version;
        let token_index = self.scanner.current_index();
        let (child, chance) = {
            let choice = self.graph.choice_mut(id);
            if choice.version != version {
                choice.head = 0;
                choice.version = version;
            }
            let head = choice.head;
            if head >= choice.children.len() {
                return Step::Retry;
            }
            // Every alternative after this one is still worth a try; remember the next
            let chance = if head + 1 < choice.children.len() {
                Some(Chance {
                    node: id,
                    head: head + 1,
                    token_index,
                    plus_head: 0,
                })
            } else {
                None
            };
            choice.head = head + 1;
            (choice.children[head], chance)
        };
        if let Some(chance) = chance {
            self.chances.push(chance);
        }
        Step::Into(child)
    }

    //////////////
    // CLIMBING //
    //////////////

    fn ascend(&mut self, id: NodeId, value: A) -> Result<Climb<A>, Error> {
        self.count_step()?;
        let (parent, parent_index) = match self.graph.parent_of(id) {
            Some(edge) => edge,
            None => {
                // The whole graph matched.  In probe mode that's not what we're here for; in a
                // real parse it only counts if every token was consumed - matching a prefix of
                // the input is not an accept.
                return Ok(if self.probing {
                    Climb::Continue(Step::Retry)
                } else if self.scanner.is_end() {
                    Climb::Accept(value)
                } else {
                    log::trace!("root matched a strict prefix; backtracking");
                    Climb::Continue(Step::Retry)
                });
            }
        };

        if matches!(self.graph.nodes[parent].kind, Kind::Choice(_)) {
            // The choice as a whole has succeeded; the value passes through unchanged
            return Ok(Climb::Continue(Step::Up(parent, value)));
        }

        let version = *self.version;
        let token_index = self.scanner.current_index();
        let reduce = self.reduce;
        let plus_chance = {
            let seq = self.graph.seq_mut(parent);
            let num_children = seq.children.len();
            if reduce {
                let slot = if seq.plus {
                    seq.plus_head * num_children + parent_index
                } else {
                    parent_index
                };
                if seq.results.len() <= slot {
                    seq.results.resize_with(slot + 1, || None);
                }
                seq.results[slot] = Some(value);
            }

            // A completed `plus` row offers to parse another row if the attempt later fails
            let row_complete = parent_index + 1 == num_children;
            let plus_chance = if seq.plus && row_complete {
                seq.plus_head += 1;
                Some(Chance {
                    node: parent,
                    head: 0,
                    token_index,
                    plus_head: seq.plus_head,
                })
            } else {
                None
            };

            // Resume the parent at the child after this one.  Setting `head` (rather than
            // trusting whatever the node held) matters after backtracking: a resumed spine keeps
            // the `head` its failed attempt left behind, which may point past children the new
            // attempt never matched.
            seq.head = parent_index + 1;
            seq.version = version;
            plus_chance
        };
        if let Some(chance) = plus_chance {
            self.chances.push(chance);
        }
        Ok(Climb::Continue(Step::Into(parent)))
    }

    //////////////////
    // BACKTRACKING //
    //////////////////

    /// Pop the most recent untried alternative and resume there, or report that the run is out
    /// of options.  Every call opens a new version epoch, even a failing one.
    fn try_chances(&mut self) -> Option<Step<A>> {
        *self.version += 1;
        let version = *self.version;
        let chance = self.chances.pop()?;
        log::trace!(
            "backtracking to {:?} (child {}, token {})",
            chance.node,
            chance.head,
            chance.token_index
        );

        self.scanner.set_index(chance.token_index);
        match &mut self.graph.nodes[chance.node].kind {
            Kind::Seq(seq) => {
                seq.head = chance.head;
                seq.plus_head = chance.plus_head;
                // Rows the failed attempt filled beyond this point are dead
                let keep = chance.plus_head * seq.children.len();
                seq.results.truncate(keep);
            }
            Kind::Choice(choice) => choice.head = chance.head,
            Kind::Term(_) | Kind::RuleRef(_) => {
                debug_assert!(false, "chances only point at sequences and choices")
            }
        }
        // Stamp the resumed node and its ancestors so they keep their progress; everything else
        // self-resets when (and if) the new attempt reaches it
        self.graph.stamp_spine(chance.node, version);
        Some(Step::Into(chance.node))
    }
}

enum Climb<A> {
    Continue(Step<A>),
    Accept(A),
}
