//! Turns a compiled [`Graph`] into a `Clock → Plan` map.
//!
//! Implements the seven-step algorithm of the design: reject unsupported
//! blocks, partition the graph by clock through a bidirectional reachability
//! walk, seed each partition's frontier, propagate readiness to build a
//! topological order, and validate multi-rate compatibility between every
//! pair of clocks.

use std::collections::{HashMap, HashSet};

use crate::block::{BlockId, Kind};
use crate::error::PlanError;
use crate::graph::{ClockId, Graph, InPort};
use crate::order::Divides;

/// The operation the executor invokes for a [`PlanEntry`], precomputed at
/// plan time so the executor's inner loop is a straight match on an enum
/// rather than a runtime kind dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOp {
    /// Call `Block::tick`, then `Block::output`/propagate if it has outputs.
    Clocked,
    /// Call `Block::step`.
    Sink,
    /// Call `Block::output` and propagate.
    Output,
}

/// One scheduled block within a [`Plan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanEntry {
    /// The block to invoke.
    pub block: BlockId,
    /// The precomputed dispatch operation.
    pub op: DispatchOp,
}

/// An ordered, topologically-sorted sequence of blocks driven by one clock.
pub type Plan = Vec<PlanEntry>;

fn dispatch_op(graph: &Graph, block: BlockId) -> DispatchOp {
    match graph.kind(block) {
        Kind::Clocked => DispatchOp::Clocked,
        Kind::Sink => DispatchOp::Sink,
        Kind::Source | Kind::Function => DispatchOp::Output,
    }
}

/// Compiles `graph` into a map from clock id to plan.
///
/// `graph` must already have passed [`Graph::compile`]. This function calls
/// [`Graph::reset`] itself (step 2 of the algorithm) before planning.
pub fn plan(graph: &mut Graph) -> Result<HashMap<ClockId, Plan>, PlanError> {
    for id in graph.block_ids() {
        if !graph.sim_only(id) && graph.is_transfer(id) {
            return Err(PlanError::UnsupportedBlockError(id));
        }
    }

    graph.reset();

    let mut clock_order: Vec<ClockId> = graph.clock_ids().collect();
    clock_order.sort_by(|&a, &b| {
        graph
            .clock(a)
            .offset
            .partial_cmp(&graph.clock(b).offset)
            .expect("clock offsets are never NaN")
            .then(a.cmp(&b))
    });

    check_pairwise_ratios(graph, &clock_order)?;

    let mut placed: HashSet<BlockId> = HashSet::new();
    let mut plans: HashMap<ClockId, Plan> = HashMap::new();

    for &k in &clock_order {
        let partition = discover_partition(graph, k, &placed);
        let entries = build_plan(graph, k, &partition);
        for entry in &entries {
            placed.insert(entry.block);
        }
        plans.insert(k, entries);
    }

    let unreached: Vec<BlockId> = graph
        .block_ids()
        .filter(|&id| !graph.sim_only(id) && !placed.contains(&id))
        .collect();
    if !unreached.is_empty() {
        return Err(PlanError::UnreachableBlockError(unreached));
    }

    Ok(plans)
}

fn check_pairwise_ratios(graph: &Graph, clocks: &[ClockId]) -> Result<(), PlanError> {
    for (i, &a) in clocks.iter().enumerate() {
        for &b in &clocks[i + 1..] {
            let pa = graph.clock(a).period;
            let pb = graph.clock(b).period;
            if !pa.divides(&pb) {
                return Err(PlanError::RatioError { a: pa, b: pb });
            }
        }
    }
    Ok(())
}

/// Step 5a: every non-`sim_only`, not-yet-placed block reachable from `k`'s
/// clocked blocks by a bidirectional wire walk, excluding `Clocked` blocks
/// bound to a different clock. Returned in graph insertion order so every
/// later step iterates deterministically (§4.2 tie-break & determinism).
fn discover_partition(graph: &Graph, k: ClockId, placed: &HashSet<BlockId>) -> Vec<BlockId> {
    let seeds: Vec<BlockId> = graph
        .block_ids()
        .filter(|&id| graph.clock_of(id) == Some(k))
        .collect();

    let mut in_partition: HashSet<BlockId> = HashSet::new();
    let mut stack = seeds;
    while let Some(b) = stack.pop() {
        if in_partition.contains(&b) || placed.contains(&b) || graph.sim_only(b) {
            continue;
        }
        if graph.kind(b) == Kind::Clocked && graph.clock_of(b) != Some(k) {
            continue;
        }
        in_partition.insert(b);
        for n in graph.neighbours(b) {
            if !in_partition.contains(&n) {
                stack.push(n);
            }
        }
    }

    graph
        .block_ids()
        .filter(|id| in_partition.contains(id))
        .collect()
}

/// `true` if `port`'s incoming wire originates outside `partition` — a
/// cross-clock read, which is always "ready" in the sense of §4.2's edge
/// case: a value exists from the source clock's previous tick, even though
/// nothing was produced this tick.
fn is_cross_partition_input(graph: &Graph, partition: &HashSet<BlockId>, port: InPort) -> bool {
    graph
        .incoming_wires(port.block)
        .iter()
        .find(|w| w.to.port == port.port)
        .map(|w| !partition.contains(&w.from.block))
        .unwrap_or(false)
}

fn all_inputs_ready(
    graph: &Graph,
    partition: &HashSet<BlockId>,
    ready: &HashMap<InPort, bool>,
    block: BlockId,
) -> bool {
    (0..graph.nin(block)).all(|port| {
        let p = InPort { block, port };
        is_cross_partition_input(graph, partition, p) || *ready.get(&p).unwrap_or(&false)
    })
}

/// Steps 5b/5c: seed the frontier, then propagate readiness to grow it into
/// a full topological order for clock `k`.
fn build_plan(graph: &Graph, k: ClockId, partition: &[BlockId]) -> Plan {
    let partition_set: HashSet<BlockId> = partition.iter().copied().collect();
    let mut ready: HashMap<InPort, bool> = HashMap::new();
    let mut in_plan: HashSet<BlockId> = HashSet::new();
    let mut order: Vec<BlockId> = Vec::new();

    for &b in partition {
        let is_seed = graph.nin(b) == 0
            || (graph.kind(b) == Kind::Clocked
                && all_inputs_ready(graph, &partition_set, &ready, b));
        if is_seed && in_plan.insert(b) {
            order.push(b);
        }
    }

    let mut cursor = 0;
    while cursor < order.len() {
        let source = order[cursor];
        cursor += 1;
        for wire in graph.outgoing_wires(source) {
            if !partition_set.contains(&wire.to.block) {
                continue;
            }
            ready.insert(wire.to, true);
            let d = wire.to.block;
            if in_plan.contains(&d) {
                continue;
            }
            let clock_ok = graph.kind(d) != Kind::Clocked || graph.clock_of(d) == Some(k);
            if clock_ok && all_inputs_ready(graph, &partition_set, &ready, d) {
                in_plan.insert(d);
                order.push(d);
                for port in 0..graph.nin(d) {
                    ready.remove(&InPort { block: d, port });
                }
            }
        }
    }

    order
        .into_iter()
        .map(|block| PlanEntry {
            block,
            op: dispatch_op(graph, block),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockError, Sample};
    use crate::graph::{InPort as GInPort, OutPort};

    /// A periodic source, re-evaluated once per clock tick: `Kind::Clocked`
    /// with a state feedthrough `output`, not `Kind::Source`, since it must
    /// fire in lock-step with the clock rather than on ad hoc demand.
    struct ClockedConstant(f64);
    impl Block for ClockedConstant {
        fn kind(&self) -> Kind {
            Kind::Clocked
        }
        fn nin(&self) -> usize {
            0
        }
        fn nout(&self) -> usize {
            1
        }
        fn output(&mut self, _inputs: &[Sample], _t: f64) -> Result<Vec<Sample>, BlockError> {
            Ok(vec![Sample::Scalar(self.0)])
        }
    }

    struct Gain(f64);
    impl Block for Gain {
        fn kind(&self) -> Kind {
            Kind::Function
        }
        fn nin(&self) -> usize {
            1
        }
        fn nout(&self) -> usize {
            1
        }
        fn output(&mut self, inputs: &[Sample], _t: f64) -> Result<Vec<Sample>, BlockError> {
            let x = match &inputs[0] {
                Sample::Scalar(v) => *v,
                _ => 0.0,
            };
            Ok(vec![Sample::Scalar(x * self.0)])
        }
    }

    struct Recorder;
    impl Block for Recorder {
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

    fn gain_pipeline() -> (Graph, ClockId, BlockId, BlockId, BlockId) {
        let mut g = Graph::new();
        let k = g.add_clock(0.01, 0.0);
        let src = g.add_clocked_block(Box::new(ClockedConstant(1.0)), k);
        let gain = g.add_block(Box::new(Gain(2.0)));
        let sink = g.add_block(Box::new(Recorder));
        g.connect(OutPort { block: src, port: 0 }, GInPort { block: gain, port: 0 })
            .unwrap();
        g.connect(OutPort { block: gain, port: 0 }, GInPort { block: sink, port: 0 })
            .unwrap();
        g.compile().unwrap();
        (g, k, src, gain, sink)
    }

    #[test]
    fn plan_orders_source_before_gain_before_sink() {
        let (mut g, k, src, gain, sink) = gain_pipeline();
        let plans = plan(&mut g).unwrap();
        let p = &plans[&k];
        let idx = |b: BlockId| p.iter().position(|e| e.block == b).unwrap();
        assert!(idx(src) < idx(gain));
        assert!(idx(gain) < idx(sink));
        assert_eq!(p[idx(src)].op, DispatchOp::Clocked);
        assert_eq!(p[idx(gain)].op, DispatchOp::Output);
        assert_eq!(p[idx(sink)].op, DispatchOp::Sink);
    }

    #[test]
    fn divisible_clocks_accepted() {
        let mut g = Graph::new();
        let k1 = g.add_clock(0.01, 0.0);
        let k2 = g.add_clock(0.04, 0.0);
        struct NullClocked;
        impl Block for NullClocked {
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
        g.add_clocked_block(Box::new(NullClocked), k1);
        g.add_clocked_block(Box::new(NullClocked), k2);
        g.compile().unwrap();
        let plans = plan(&mut g).unwrap();
        assert_eq!(plans.len(), 2);
    }

    #[test]
    fn non_divisible_clocks_rejected() {
        let mut g = Graph::new();
        let k1 = g.add_clock(1.0 / 60.0, 0.0);
        let k2 = g.add_clock(1.0 / 25.0, 0.0);
        struct NullClocked;
        impl Block for NullClocked {
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
        g.add_clocked_block(Box::new(NullClocked), k1);
        g.add_clocked_block(Box::new(NullClocked), k2);
        g.compile().unwrap();
        let err = plan(&mut g).unwrap_err();
        assert!(matches!(err, PlanError::RatioError { .. }));
    }

    #[test]
    fn non_sim_only_transfer_block_is_rejected() {
        struct ConstantSource;
        impl Block for ConstantSource {
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

        struct TransferFunction;
        impl Block for TransferFunction {
            fn kind(&self) -> Kind {
                Kind::Function
            }
            fn nin(&self) -> usize {
                1
            }
            fn nout(&self) -> usize {
                1
            }
            fn is_transfer(&self) -> bool {
                true
            }
        }

        let mut g = Graph::new();
        let source = g.add_block(Box::new(ConstantSource));
        let block = g.add_block(Box::new(TransferFunction));
        let sink = g.add_block(Box::new(Recorder));
        g.connect(OutPort { block: source, port: 0 }, GInPort { block, port: 0 })
            .unwrap();
        g.connect(OutPort { block, port: 0 }, GInPort { block: sink, port: 0 })
            .unwrap();
        g.compile().unwrap();
        let err = plan(&mut g).unwrap_err();
        assert!(matches!(err, PlanError::UnsupportedBlockError(id) if id == block));
    }
}
