//! On-disk graph description: clocks, blocks (by registered type name), and
//! wires. Deserialized with `serde_json`, the way `aion_elaborate` loads its
//! module descriptions from a structured file rather than hand-wiring a
//! graph in Rust for every deployment.

use serde::Deserialize;

use bdrt_core::graph::{Graph, InPort, OutPort};
use bdrt_core::registry::Registry;

#[derive(Debug, Deserialize)]
pub struct ClockSpec {
    pub period: f64,
    #[serde(default)]
    pub offset: f64,
}

#[derive(Debug, Deserialize)]
pub struct BlockSpec {
    /// Registered type name, looked up in the [`Registry`].
    #[serde(rename = "type")]
    pub type_name: String,
    /// Index into `clocks`, if this is a `Clocked` block.
    #[serde(default)]
    pub clock: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct WireSpec {
    pub from_block: usize,
    #[serde(default)]
    pub from_port: usize,
    pub to_block: usize,
    #[serde(default)]
    pub to_port: usize,
}

#[derive(Debug, Deserialize)]
pub struct GraphFile {
    #[serde(default)]
    pub clocks: Vec<ClockSpec>,
    pub blocks: Vec<BlockSpec>,
    #[serde(default)]
    pub wires: Vec<WireSpec>,
}

#[derive(Debug, thiserror::Error)]
pub enum GraphFileError {
    #[error("reading graph file: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing graph file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("block {0} references unknown type `{1}`")]
    UnknownBlockType(usize, String),
    #[error("block {0} references clock index {1}, but only {2} clocks are defined")]
    UnknownClock(usize, usize, usize),
    #[error(transparent)]
    Graph(#[from] bdrt_core::GraphError),
}

/// Parses and instantiates a [`Graph`] from a JSON file at `path`.
pub fn load(path: &std::path::Path, registry: &Registry) -> Result<Graph, GraphFileError> {
    let text = std::fs::read_to_string(path)?;
    let file: GraphFile = serde_json::from_str(&text)?;
    build(&file, registry)
}

fn build(file: &GraphFile, registry: &Registry) -> Result<Graph, GraphFileError> {
    let mut graph = Graph::new();
    let clock_ids: Vec<_> = file
        .clocks
        .iter()
        .map(|c| graph.add_clock(c.period, c.offset))
        .collect();

    for (i, spec) in file.blocks.iter().enumerate() {
        let block = registry
            .create(&spec.type_name)
            .map_err(|_| GraphFileError::UnknownBlockType(i, spec.type_name.clone()))?;
        match spec.clock {
            Some(idx) => {
                let clock = *clock_ids
                    .get(idx)
                    .ok_or(GraphFileError::UnknownClock(i, idx, clock_ids.len()))?;
                graph.add_clocked_block(block, clock);
            }
            None => {
                graph.add_block(block);
            }
        }
    }

    for wire in &file.wires {
        graph.connect(
            OutPort {
                block: wire.from_block,
                port: wire.from_port,
            },
            InPort {
                block: wire.to_block,
                port: wire.to_port,
            },
        )?;
    }

    Ok(graph)
}
