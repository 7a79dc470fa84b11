//! The compiled grammar graph.
//!
//! Rule bodies compile into a graph of four node kinds: terminals, sequences ("all children, in
//! order"), choices ("first matching child wins") and rule references.  References start life
//! unexpanded and are spliced out the first time the engine visits them, so recursive grammars
//! only ever build the part of themselves a parse actually touches.  Expansions are permanent:
//! later parses (and backtracking retries) reuse them.
//!
//! All nodes live in one arena ([`IndexVec`] keyed by [`NodeId`]) owned by the parser.  Child
//! edges and the `(parent, parent_index)` back-edges are plain arena indices, which neatly
//! side-steps the ownership cycle a parent-pointer tree would otherwise create.  The invariant
//! the whole engine leans on: for every non-root node,
//! `parent.children[parent_index] == self`.

use index_vec::IndexVec;

use crate::grammar::{Elem, Grammar, ReduceFn, RuleId, TermPattern};

index_vec::define_index_type! { pub(crate) struct NodeId = usize; }

pub(crate) struct Node<A> {
    pub parent: Option<NodeId>,
    pub parent_index: usize,
    pub kind: Kind<A>,
}

pub(crate) enum Kind<A> {
    Term(Term),
    Seq(Seq<A>),
    Choice(Choice),
    RuleRef(RuleRef),
}

/// A leaf: consumes (or declines) exactly one token, except for `loose` sentinels which consume
/// nothing.
pub(crate) struct Term {
    pub pattern: TermPattern,
}

/// An ordered sequence of children, all of which must match.  Every named rule expands to one of
/// these; anonymous sequences don't exist (choices nest directly).
pub(crate) struct Seq<A> {
    pub children: Vec<NodeId>,
    /// Index of the next child to visit.  Only meaningful while `version` matches the engine's
    /// current epoch; see [`visit`](super::visit).
    pub head: usize,
    pub version: u64,
    /// One slot per visited child (per repetition row in `plus` mode), written as children
    /// complete and read by the reducer when the sequence does.
    pub results: Vec<Option<A>>,
    pub reduce: Option<ReduceFn<A>>,
    /// `Some` when this sequence is the expansion of a named rule (enables FIRST-set pruning)
    pub rule: Option<RuleId>,
    /// One-or-more repetition: completing a row offers a backtracking chance to parse another
    pub plus: bool,
    /// Which repetition row is currently being filled
    pub plus_head: usize,
}

/// Ordered alternatives.  Exactly one child must match; they are tried in order via the chance
/// stack.
pub(crate) struct Choice {
    pub children: Vec<NodeId>,
    pub head: usize,
    pub version: u64,
}

/// An unexpanded reference to a named rule.
pub(crate) struct RuleRef {
    pub rule: RuleId,
    pub plus: bool,
}

pub(crate) struct Graph<A> {
    pub nodes: IndexVec<NodeId, Node<A>>,
    pub root: NodeId,
}

impl<A> Graph<A> {
    /// Build the graph for parses rooted at `root`.  Only the root rule's own body is compiled
    /// here; everything it references stays a [`RuleRef`] until visited.
    pub fn new(grammar: &Grammar<A>, root: RuleId) -> Self {
        let mut graph = Self {
            nodes: IndexVec::new(),
            root: NodeId::new(0),
        };
        graph.root = graph.add_rule_seq(grammar, root, false, None, 0);
        graph
    }

    /// Compile the body of `rule` into a fresh sequence node
    fn add_rule_seq(
        &mut self,
        grammar: &Grammar<A>,
        rule: RuleId,
        plus: bool,
        parent: Option<NodeId>,
        parent_index: usize,
    ) -> NodeId {
        let seq_id = self.nodes.push(Node {
            parent,
            parent_index,
            kind: Kind::Seq(Seq {
                children: Vec::new(),
                head: 0,
                version: 0,
                results: Vec::new(),
                reduce: grammar.rule(rule).reduce.clone(),
                rule: Some(rule),
                plus,
                plus_head: 0,
            }),
        });
        let children: Vec<NodeId> = grammar
            .rule(rule)
            .body
            .iter()
            .enumerate()
            .map(|(idx, elem)| self.add_elem(grammar, elem, seq_id, idx))
            .collect();
        match &mut self.nodes[seq_id].kind {
            Kind::Seq(seq) => seq.children = children,
            _ => unreachable!("`seq_id` was just pushed as a sequence"),
        }
        seq_id
    }

    fn add_elem(
        &mut self,
        grammar: &Grammar<A>,
        elem: &Elem,
        parent: NodeId,
        parent_index: usize,
    ) -> NodeId {
        let kind = match elem {
            Elem::Literal(text) => Kind::Term(Term {
                pattern: TermPattern::Literal(text.clone()),
            }),
            Elem::Loose(m) => Kind::Term(Term {
                pattern: TermPattern::Loose(*m),
            }),
            Elem::Special(matcher) => Kind::Term(Term {
                pattern: TermPattern::Special(matcher.clone()),
            }),
            Elem::OneOf(alternatives) => {
                let choice_id = self.nodes.push(Node {
                    parent: Some(parent),
                    parent_index,
                    kind: Kind::Choice(Choice {
                        children: Vec::new(),
                        head: 0,
                        version: 0,
                    }),
                });
                let children: Vec<NodeId> = alternatives
                    .iter()
                    .enumerate()
                    .map(|(idx, alt)| self.add_elem(grammar, alt, choice_id, idx))
                    .collect();
                match &mut self.nodes[choice_id].kind {
                    Kind::Choice(choice) => choice.children = children,
                    _ => unreachable!("`choice_id` was just pushed as a choice"),
                }
                return choice_id;
            }
            Elem::Rule(name) => Kind::RuleRef(RuleRef {
                rule: self.resolve(grammar, name),
                plus: false,
            }),
            Elem::RulePlus(name) => Kind::RuleRef(RuleRef {
                rule: self.resolve(grammar, name),
                plus: true,
            }),
        };
        self.nodes.push(Node {
            parent: Some(parent),
            parent_index,
            kind,
        })
    }

    fn resolve(&self, grammar: &Grammar<A>, name: &str) -> RuleId {
        grammar
            .rule_id(name)
            .expect("rule references are checked when the grammar is built")
    }

    /// Expand the [`RuleRef`] at `ref_id` and splice the expansion into its parent's child list
    /// in place of the reference.  The reference node itself is left orphaned in the arena.
    pub fn expand_in_place(&mut self, grammar: &Grammar<A>, ref_id: NodeId) -> NodeId {
        let node = &self.nodes[ref_id];
        let (parent, parent_index) = (node.parent, node.parent_index);
        let (rule, plus) = match &node.kind {
            Kind::RuleRef(r) => (r.rule, r.plus),
            _ => unreachable!("only rule references are expanded"),
        };
        let new_id = self.add_rule_seq(grammar, rule, plus, parent, parent_index);
        if let Some(parent) = parent {
            match &mut self.nodes[parent].kind {
                Kind::Seq(seq) => seq.children[parent_index] = new_id,
                Kind::Choice(choice) => choice.children[parent_index] = new_id,
                _ => unreachable!("terminals and references have no children"),
            }
        } else {
            self.root = new_id;
        }
        new_id
    }

    /// The sequence at `id`.  Panics if `id` is any other kind of node; callers only reach for
    /// this where the graph shape guarantees a sequence.
    pub fn seq_mut(&mut self, id: NodeId) -> &mut Seq<A> {
        match &mut self.nodes[id].kind {
            Kind::Seq(seq) => seq,
            _ => unreachable!("expected {:?} to be a sequence", id),
        }
    }

    /// The choice at `id`; same contract as [`seq_mut`](Self::seq_mut)
    pub fn choice_mut(&mut self, id: NodeId) -> &mut Choice {
        match &mut self.nodes[id].kind {
            Kind::Choice(choice) => choice,
            _ => unreachable!("expected {:?} to be a choice", id),
        }
    }

    /// The pattern of the terminal at `id`; same contract as [`seq_mut`](Self::seq_mut)
    pub fn term_pattern(&self, id: NodeId) -> TermPattern {
        match &self.nodes[id].kind {
            Kind::Term(term) => term.pattern.clone(),
            _ => unreachable!("expected {:?} to be a terminal", id),
        }
    }

    pub fn parent_of(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let node = &self.nodes[id];
        node.parent.map(|p| (p, node.parent_index))
    }

    /// Stamp `id`'s epoch (sequences and choices only; other kinds carry no resettable state)
    pub fn stamp(&mut self, id: NodeId, version: u64) {
        match &mut self.nodes[id].kind {
            Kind::Seq(seq) => seq.version = version,
            Kind::Choice(choice) => choice.version = version,
            Kind::Term(_) | Kind::RuleRef(_) => {}
        }
    }

    /// Stamp `id` and every ancestor up to the root
    pub fn stamp_spine(&mut self, id: NodeId, version: u64) {
        self.stamp(id, version);
        let mut cursor = self.nodes[id].parent;
        while let Some(ancestor) = cursor {
            self.stamp(ancestor, version);
            cursor = self.nodes[ancestor].parent;
        }
    }

    /// Check the `parent.children[parent_index] == self` invariant over the whole arena
    #[cfg(test)]
    pub fn assert_back_refs(&self) {
        for (id, node) in self.nodes.iter_enumerated() {
            let children: &[NodeId] = match &node.kind {
                Kind::Seq(seq) => &seq.children,
                Kind::Choice(choice) => &choice.children,
                Kind::Term(_) | Kind::RuleRef(_) => &[],
            };
            for (idx, &child) in children.iter().enumerate() {
                let child_node = &self.nodes[child];
                assert_eq!(child_node.parent, Some(id), "bad parent edge on {:?}", child);
                assert_eq!(
                    child_node.parent_index, idx,
                    "bad parent index on {:?}",
                    child
                );
            }
        }
    }
}
