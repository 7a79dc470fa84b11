//! The next-match probe: asking the grammar "which terminals could appear here?".
//!
//! This is the same engine as a real parse, re-run against an *empty* scanner in probe mode.
//! Probing terminals never consume anything - they record themselves and then backtrack, so the
//! run systematically walks every alternative reachable from its starting point without
//! consuming input and ends when the chance stack is dry.  `loose(true)` sentinels are stepped
//! over (they'd match without consuming anyway, and nobody wants "nothing" offered as a
//! completion); `loose(false)` sentinels dead-end exactly as they do in a real parse.
//!
//! Probes share the parser's version counter, so each one opens fresh epochs and the graph state
//! a previous run left behind melts away lazily, just like backtracking within a parse.

use crate::{
    ast::Ast,
    grammar::{Grammar, TermPattern},
};

use super::{
    first::FirstSets,
    node::{Graph, NodeId},
    visit::Run,
    Error,
};

/// Where a probe starts exploring.
pub(crate) enum ProbeStart {
    /// From the top: enumerates the terminals that could begin the whole grammar
    Root,
    /// As if this node had just matched: enumerates the terminals that could follow it
    After(NodeId),
}

/// Enumerate the terminals the grammar offers at `start`, in discovery order, regardless of
/// input.  The only error a probe can hit is the engine step budget.
#[allow(clippy::too_many_arguments)]
pub(crate) fn probe<A: Ast>(
    graph: &mut Graph<A>,
    grammar: &Grammar<A>,
    first: &FirstSets,
    version: &mut u64,
    steps: &mut usize,
    max_steps: usize,
    start: ProbeStart,
) -> Result<Vec<TermPattern>, Error> {
    let found = {
        let mut run = Run::probe(graph, grammar, first, version, steps, max_steps);
        match start {
            ProbeStart::Root => run.go()?,
            ProbeStart::After(node) => run.go_after(node)?,
        };
        run.found
    };
    Ok(found.into_iter().map(|id| graph.term_pattern(id)).collect())
}
