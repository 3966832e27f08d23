//! Graph-construction context.
//!
//! The original tuning package threaded a "current tuner" through
//! `with tuner_context(): ...` scoped blocks, implemented as a thread-local
//! global. Per the design note on global state, this core replaces it with
//! an explicit value the caller threads through its own construction code:
//! [`BuildContext`] wraps the [`Graph`] being built and an optional
//! "current clock", so a sequence of blocks meant for the same clock don't
//! need to repeat its id at every call site.

use crate::block::{Block, BlockId};
use crate::graph::{ClockId, Graph};

/// Wraps a [`Graph`] under construction with an ambient "current clock" that
/// [`BuildContext::add`] uses by default.
///
/// This is a plain value, not a global: nothing prevents a caller from
/// holding several independent contexts over different graphs, or from
/// reading/mutating the wrapped [`Graph`] directly through [`BuildContext::graph`]
/// / [`BuildContext::graph_mut`].
pub struct BuildContext<'g> {
    graph: &'g mut Graph,
    current_clock: Option<ClockId>,
}

impl<'g> BuildContext<'g> {
    /// Wraps `graph` with no current clock set.
    pub fn new(graph: &'g mut Graph) -> Self {
        BuildContext {
            graph,
            current_clock: None,
        }
    }

    /// Runs `f` with `clock` as the current clock, restoring the previous
    /// one (if any) afterwards — the explicit equivalent of a `with
    /// tuner_context(clock):` block.
    pub fn scoped_clock<R>(&mut self, clock: ClockId, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.current_clock.replace(clock);
        let result = f(self);
        self.current_clock = previous;
        result
    }

    /// Adds `block`. Bound to the current clock if one is set and the block
    /// is `Kind::Clocked`; added as a non-clocked block otherwise.
    pub fn add(&mut self, block: Box<dyn Block>) -> BlockId {
        match (self.current_clock, block.kind()) {
            (Some(clock), crate::block::Kind::Clocked) => {
                self.graph.add_clocked_block(block, clock)
            }
            _ => self.graph.add_block(block),
        }
    }

    /// The clock [`BuildContext::add`] currently binds `Clocked` blocks to.
    pub fn current_clock(&self) -> Option<ClockId> {
        self.current_clock
    }

    /// Read-only access to the wrapped graph, e.g. to wire blocks together.
    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// Mutable access to the wrapped graph.
    pub fn graph_mut(&mut self) -> &mut Graph {
        self.graph
    }
}
