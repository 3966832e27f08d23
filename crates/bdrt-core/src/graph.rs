//! The graph model: blocks, ports, wires, and clocks.
//!
//! Blocks and graph refer to each other cyclically (a block's port is
//! addressed by the graph, and the planner walks a block's neighbours
//! through the graph), so ownership follows the arena pattern from the
//! design notes: the [`Graph`] owns every block in an indexed [`Vec`] and
//! hands out [`BlockId`] handles rather than references.

use std::collections::HashMap;

use crate::block::{Block, BlockError, BlockId, Kind, Parameter, ParamValue, Sample, UnknownParam};
use crate::error::{GraphError, PortDirection};

/// Identity of a registered [`Clock`].
pub type ClockId = usize;

/// A periodic trigger: period `T` and phase `offset`, both in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    /// Tick period in seconds. Must be positive.
    pub period: f64,
    /// Phase offset in seconds, added to the first scheduled firing.
    pub offset: f64,
}

/// An output port address: `(block, port index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutPort {
    /// The owning block.
    pub block: BlockId,
    /// Output port index on that block.
    pub port: usize,
}

/// An input port address: `(block, port index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InPort {
    /// The owning block.
    pub block: BlockId,
    /// Input port index on that block.
    pub port: usize,
}

/// A directed edge from an output port to an input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wire {
    /// The producing port.
    pub from: OutPort,
    /// The consuming port. Each `InPort` is the target of at most one wire.
    pub to: InPort,
}

struct BlockSlot {
    block: Box<dyn Block>,
    inputs: Vec<Sample>,
    outputs: Vec<Sample>,
}

/// Owns every block, wire, and clock in a computation.
///
/// `Graph` exclusively owns its blocks, wires, and clocks (§4.1); blocks
/// never own the graph, only (conceptually) refer back to it through the
/// [`BlockId`] handles the graph hands out when a block is added.
pub struct Graph {
    blocks: Vec<BlockSlot>,
    clocks: Vec<Clock>,
    clock_of: HashMap<BlockId, ClockId>,
    wires: Vec<Wire>,
    incoming: HashMap<BlockId, Vec<Wire>>,
    outgoing: HashMap<BlockId, Vec<Wire>>,
    compiled: bool,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Graph {
            blocks: Vec::new(),
            clocks: Vec::new(),
            clock_of: HashMap::new(),
            wires: Vec::new(),
            incoming: HashMap::new(),
            outgoing: HashMap::new(),
            compiled: false,
        }
    }

    /// Registers a new clock and returns its id.
    pub fn add_clock(&mut self, period: f64, offset: f64) -> ClockId {
        self.clocks.push(Clock { period, offset });
        self.clocks.len() - 1
    }

    /// Adds a non-`Clocked` block (Source, Sink, or Function) and returns
    /// its id.
    pub fn add_block(&mut self, block: Box<dyn Block>) -> BlockId {
        self.insert_block(block, None)
    }

    /// Adds a `Clocked` block bound to `clock` and returns its id.
    pub fn add_clocked_block(&mut self, block: Box<dyn Block>, clock: ClockId) -> BlockId {
        self.insert_block(block, Some(clock))
    }

    fn insert_block(&mut self, block: Box<dyn Block>, clock: Option<ClockId>) -> BlockId {
        let nin = block.nin();
        let nout = block.nout();
        let id = self.blocks.len();
        self.blocks.push(BlockSlot {
            block,
            inputs: vec![Sample::Unset; nin],
            outputs: vec![Sample::Unset; nout],
        });
        if let Some(clock) = clock {
            self.clock_of.insert(id, clock);
        }
        self.incoming.entry(id).or_default();
        self.outgoing.entry(id).or_default();
        self.compiled = false;
        id
    }

    /// The clock a `Clocked` block is bound to, if any.
    pub fn clock_of(&self, block: BlockId) -> Option<ClockId> {
        self.clock_of.get(&block).copied()
    }

    /// Number of blocks in the graph.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Iterates block ids in insertion order.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        0..self.blocks.len()
    }

    /// Iterates clock ids in insertion order.
    pub fn clock_ids(&self) -> impl Iterator<Item = ClockId> {
        0..self.clocks.len()
    }

    /// Looks up a registered clock by id.
    pub fn clock(&self, id: ClockId) -> &Clock {
        &self.clocks[id]
    }

    /// This block's kind.
    pub fn kind(&self, block: BlockId) -> Kind {
        self.blocks[block].block.kind()
    }

    /// `true` if this block is excluded from real-time plans.
    pub fn sim_only(&self, block: BlockId) -> bool {
        self.blocks[block].block.sim_only()
    }

    /// `true` if this block is a continuous-time transfer function.
    pub fn is_transfer(&self, block: BlockId) -> bool {
        self.blocks[block].block.is_transfer()
    }

    /// Input arity of a block.
    pub fn nin(&self, block: BlockId) -> usize {
        self.blocks[block].inputs.len()
    }

    /// Output arity of a block.
    pub fn nout(&self, block: BlockId) -> usize {
        self.blocks[block].outputs.len()
    }

    /// Wires whose destination is `block`, in insertion order.
    pub fn incoming_wires(&self, block: BlockId) -> &[Wire] {
        self.incoming.get(&block).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Wires whose source is `block`, in insertion order.
    pub fn outgoing_wires(&self, block: BlockId) -> &[Wire] {
        self.outgoing.get(&block).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Wires every other block that `connect`s by at least one wire to or
    /// from `block`, forward and backward, deduplicated and in first-seen
    /// order. Used by the planner's partition-discovery traversal.
    pub fn neighbours(&self, block: BlockId) -> Vec<BlockId> {
        let mut seen = Vec::new();
        for wire in self.outgoing_wires(block) {
            if !seen.contains(&wire.to.block) {
                seen.push(wire.to.block);
            }
        }
        for wire in self.incoming_wires(block) {
            if !seen.contains(&wire.from.block) {
                seen.push(wire.from.block);
            }
        }
        seen
    }

    /// Wires `from` to `to`.
    ///
    /// Fails with [`GraphError::ArityError`] if `to` already carries a wire,
    /// or [`GraphError::ShapeError`] if either port index is out of range
    /// for its block.
    pub fn connect(&mut self, from: OutPort, to: InPort) -> Result<(), GraphError> {
        let out_arity = self
            .blocks
            .get(from.block)
            .ok_or(GraphError::ShapeError {
                block: from.block,
                direction: PortDirection::Out,
                port: from.port,
            })?
            .outputs
            .len();
        if from.port >= out_arity {
            return Err(GraphError::ShapeError {
                block: from.block,
                direction: PortDirection::Out,
                port: from.port,
            });
        }
        let in_arity = self
            .blocks
            .get(to.block)
            .ok_or(GraphError::ShapeError {
                block: to.block,
                direction: PortDirection::In,
                port: to.port,
            })?
            .inputs
            .len();
        if to.port >= in_arity {
            return Err(GraphError::ShapeError {
                block: to.block,
                direction: PortDirection::In,
                port: to.port,
            });
        }
        let already_wired = self
            .incoming_wires(to.block)
            .iter()
            .any(|w| w.to.port == to.port);
        if already_wired {
            return Err(GraphError::ArityError {
                block: to.block,
                port: to.port,
            });
        }
        let wire = Wire { from, to };
        self.outgoing.entry(from.block).or_default().push(wire);
        self.incoming.entry(to.block).or_default().push(wire);
        self.wires.push(wire);
        self.compiled = false;
        Ok(())
    }

    /// Sets every input and output slot back to [`Sample::Unset`]; state
    /// reinitialisation happens via [`Block::start`] at run setup, not here.
    pub fn reset(&mut self) {
        for slot in &mut self.blocks {
            for s in &mut slot.inputs {
                *s = Sample::Unset;
            }
            for s in &mut slot.outputs {
                *s = Sample::Unset;
            }
        }
    }

    /// Calls [`Block::start`] on every block, in insertion order.
    pub fn start_all(&mut self) {
        for slot in &mut self.blocks {
            slot.block.start();
        }
    }

    /// Calls [`Block::done`] on the blocks named by `order`, in that order.
    pub fn done_in_order(&mut self, order: &[BlockId]) {
        for &id in order {
            self.blocks[id].block.done();
        }
    }

    /// Verifies invariant 1 (every non-`sim_only` input is wired, or the
    /// block has `nin == 0`). Idempotent.
    pub fn compile(&mut self) -> Result<(), GraphError> {
        for id in self.block_ids() {
            if self.sim_only(id) {
                continue;
            }
            if self.kind(id) == Kind::Clocked && self.clock_of(id).is_none() {
                return Err(GraphError::ClockError(id));
            }
            if self.kind(id) != Kind::Clocked && self.clock_of(id).is_some() {
                return Err(GraphError::ClockError(id));
            }
            let wired_ports: Vec<usize> = self
                .incoming_wires(id)
                .iter()
                .map(|w| w.to.port)
                .collect();
            for port in 0..self.nin(id) {
                if !wired_ports.contains(&port) {
                    return Err(GraphError::TopologyError { block: id, port });
                }
            }
        }
        self.compiled = true;
        Ok(())
    }

    /// `true` once [`Graph::compile`] has succeeded and no mutation has
    /// happened since.
    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// Reads a block's current input vector.
    pub fn inputs(&self, block: BlockId) -> &[Sample] {
        &self.blocks[block].inputs
    }

    /// Reads a block's current output vector.
    pub fn outputs(&self, block: BlockId) -> &[Sample] {
        &self.blocks[block].outputs
    }

    /// Writes a single input slot.
    pub fn set_input(&mut self, port: InPort, value: Sample) {
        self.blocks[port.block].inputs[port.port] = value;
    }

    /// Writes a single output slot.
    pub fn set_output(&mut self, port: OutPort, value: Sample) {
        self.blocks[port.block].outputs[port.port] = value;
    }

    /// Invokes [`Block::output`] and stores the result in the block's output
    /// vector, returning a copy of it.
    pub fn invoke_output(&mut self, block: BlockId, t: f64) -> Result<Vec<Sample>, BlockError> {
        let slot = &mut self.blocks[block];
        let produced = slot.block.output(&slot.inputs, t)?;
        for (i, sample) in produced.iter().enumerate() {
            if let Some(out) = slot.outputs.get_mut(i) {
                *out = sample.clone();
            }
        }
        Ok(produced)
    }

    /// Invokes [`Block::step`] with the block's current inputs.
    pub fn invoke_step(&mut self, block: BlockId) -> Result<(), BlockError> {
        let slot = &mut self.blocks[block];
        slot.block.step(&slot.inputs)
    }

    /// Invokes [`Block::tick`].
    pub fn invoke_tick(&mut self, block: BlockId, dt: f64) -> Result<(), BlockError> {
        self.blocks[block].block.tick(dt)
    }

    /// Copies `values` into the input slot of every wire leaving `from`'s
    /// `port`-th output.
    pub fn propagate(&mut self, from: BlockId, port: usize, value: &Sample) {
        let targets: Vec<InPort> = self
            .outgoing_wires(from)
            .iter()
            .filter(|w| w.from.port == port)
            .map(|w| w.to)
            .collect();
        for to in targets {
            self.set_input(to, value.clone());
        }
    }

    /// All parameters exported by every block, in block insertion order then
    /// per-block declaration order.
    pub fn parameters(&self) -> Vec<(BlockId, Parameter)> {
        let mut out = Vec::new();
        for id in self.block_ids() {
            for param in self.blocks[id].block.params() {
                out.push((id, param));
            }
        }
        out
    }

    /// Applies a tuner-driven parameter update to a specific block.
    pub fn set_param(
        &mut self,
        block: BlockId,
        name: &str,
        value: ParamValue,
    ) -> Result<(), UnknownParam> {
        self.blocks[block].block.set_param(name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Kind;

    struct Source;
    impl Block for Source {
        fn kind(&self) -> Kind {
            Kind::Source
        }
        fn nin(&self) -> usize {
            0
        }
        fn nout(&self) -> usize {
            1
        }
        fn output(&mut self, _inputs: &[Sample], _t: f64) -> Result<Vec<Sample>, BlockError> {
            Ok(vec![Sample::Scalar(1.0)])
        }
    }

    struct Sink;
    impl Block for Sink {
        fn kind(&self) -> Kind {
            Kind::Sink
        }
        fn nin(&self) -> usize {
            1
        }
        fn nout(&self) -> usize {
            0
        }
    }

    #[test]
    fn compile_rejects_unconnected_input() {
        let mut g = Graph::new();
        g.add_block(Box::new(Sink));
        let err = g.compile().unwrap_err();
        assert!(matches!(err, GraphError::TopologyError { block: 0, port: 0 }));
    }

    #[test]
    fn compile_accepts_fully_wired_graph() {
        let mut g = Graph::new();
        let src = g.add_block(Box::new(Source));
        let sink = g.add_block(Box::new(Sink));
        g.connect(OutPort { block: src, port: 0 }, InPort { block: sink, port: 0 })
            .unwrap();
        g.compile().unwrap();
        assert!(g.is_compiled());
    }

    #[test]
    fn connect_rejects_double_wire() {
        let mut g = Graph::new();
        let src1 = g.add_block(Box::new(Source));
        let src2 = g.add_block(Box::new(Source));
        let sink = g.add_block(Box::new(Sink));
        g.connect(OutPort { block: src1, port: 0 }, InPort { block: sink, port: 0 })
            .unwrap();
        let err = g
            .connect(OutPort { block: src2, port: 0 }, InPort { block: sink, port: 0 })
            .unwrap_err();
        assert!(matches!(err, GraphError::ArityError { block, port: 0 } if block == sink));
    }

    #[test]
    fn connect_rejects_out_of_range_port() {
        let mut g = Graph::new();
        let src = g.add_block(Box::new(Source));
        let sink = g.add_block(Box::new(Sink));
        let err = g
            .connect(OutPort { block: src, port: 3 }, InPort { block: sink, port: 0 })
            .unwrap_err();
        assert!(matches!(err, GraphError::ShapeError { direction: PortDirection::Out, .. }));
    }

    #[test]
    fn neighbours_are_deduplicated_and_bidirectional() {
        let mut g = Graph::new();
        let src = g.add_block(Box::new(Source));
        let sink = g.add_block(Box::new(Sink));
        g.connect(OutPort { block: src, port: 0 }, InPort { block: sink, port: 0 })
            .unwrap();
        assert_eq!(g.neighbours(src), vec![sink]);
        assert_eq!(g.neighbours(sink), vec![src]);
    }

    #[test]
    fn reset_clears_slots_to_unset() {
        let mut g = Graph::new();
        let src = g.add_block(Box::new(Source));
        g.invoke_output(src, 0.0).unwrap();
        assert!(!g.outputs(src)[0].is_unset());
        g.reset();
        assert!(g.outputs(src)[0].is_unset());
    }

    #[test]
    fn clocked_block_without_clock_fails_compile() {
        struct ClockedNoClock;
        impl Block for ClockedNoClock {
            fn kind(&self) -> Kind {
                Kind::Clocked
            }
            fn nin(&self) -> usize {
                0
            }
            fn nout(&self) -> usize {
                0
            }
        }
        let mut g = Graph::new();
        g.add_block(Box::new(ClockedNoClock));
        let err = g.compile().unwrap_err();
        assert!(matches!(err, GraphError::ClockError(0)));
    }
}
