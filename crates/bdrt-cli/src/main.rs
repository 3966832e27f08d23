//! `bdrt`: loads a block-diagram graph, plans it, and drives it on the real
//! wall clock until it stops.
//!
//! Exit codes: `0` normal stop, `1` planning error, `2` runtime failure.

mod blocks;
mod graph_file;

use std::net::TcpStream;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use bdrt_core::executor::{self, RunConfig};
use bdrt_core::registry::Registry;
use bdrt_core::{ExecutorError, RealClock};
use bdrt_telemetry::{NodeDefinition, ParamDescriptor, Role, TunerLink};

/// Executor driver for block-diagram dataflow graphs.
#[derive(Debug, Parser)]
#[command(name = "bdrt", version)]
struct Cli {
    /// Soft deadline, in seconds of simulation time. Runs forever if omitted.
    #[arg(long)]
    max_time: Option<f64>,

    /// `host:port` of a tuner broker to connect to over TCP.
    #[arg(long, value_name = "HOST:PORT")]
    tuner_host: Option<String>,

    /// Path to a JSON graph description. Runs the built-in demo pipeline if
    /// omitted.
    graph: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut registry = Registry::new();
    if let Err(e) = blocks::register_builtin(&mut registry) {
        log::error!("failed to register built-in block types: {e}");
        return ExitCode::from(1);
    }

    let mut graph = match &cli.graph {
        Some(path) => match graph_file::load(path, &registry) {
            Ok(g) => g,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::from(1);
            }
        },
        None => default_demo_graph(&registry),
    };

    if let Err(e) = graph.compile() {
        log::error!("{e}");
        return ExitCode::from(1);
    }

    let plans = match bdrt_core::plan(&mut graph) {
        Ok(p) => p,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::from(1);
        }
    };

    let config = RunConfig {
        max_time: cli.max_time,
        ..RunConfig::host()
    };

    let result = match &cli.tuner_host {
        Some(host) => match connect_tuner(host, &graph) {
            Ok(mut link) => {
                executor::run(&mut graph, &plans, &RealClock, config, Some(&mut link))
            }
            Err(e) => {
                log::error!("failed to connect tuner link: {e}");
                return ExitCode::from(2);
            }
        },
        None => executor::run::<TcpStream>(&mut graph, &plans, &RealClock, config, None),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(err: &ExecutorError) -> ExitCode {
    match err {
        ExecutorError::Plan(_) | ExecutorError::Graph(_) => ExitCode::from(1),
        ExecutorError::BlockFailure { .. } => ExitCode::from(2),
    }
}

fn connect_tuner(
    host: &str,
    graph: &bdrt_core::Graph,
) -> Result<TunerLink<TcpStream>, Box<dyn std::error::Error>> {
    let stream = TcpStream::connect(host)?;
    stream.set_nonblocking(true)?;
    let mut link = TunerLink::connect(stream, Role::Sender)?;
    let params = graph
        .parameters()
        .into_iter()
        .map(|(block, p)| ParamDescriptor {
            param_id: executor::encode_param_id(block, &p.name),
            label: p.name,
            value: match p.value {
                bdrt_core::block::ParamValue::Number(n) => bdrt_telemetry::ParamValue::Number(n),
                bdrt_core::block::ParamValue::Text(s) => bdrt_telemetry::ParamValue::Text(s),
                bdrt_core::block::ParamValue::Bool(b) => bdrt_telemetry::ParamValue::Bool(b),
            },
            constraint: bdrt_telemetry::ParamConstraint {
                min: p.constraint.min,
                max: p.constraint.max,
                oneof: None,
                step: p.constraint.step,
                log_scale: p.constraint.log_scale,
                default: None,
            },
        })
        .collect();
    link.send_node_definition(NodeDefinition {
        params,
        scopes: Vec::new(),
        videos: Vec::new(),
    })?;
    Ok(link)
}

fn default_demo_graph(registry: &Registry) -> bdrt_core::Graph {
    let mut graph = bdrt_core::Graph::new();
    let clock = graph.add_clock(0.01, 0.0);
    let src = graph.add_clocked_block(registry.create("waveform").unwrap(), clock);
    let gain = graph.add_block(registry.create("gain").unwrap());
    let sink = graph.add_block(registry.create("print_sink").unwrap());
    graph
        .connect(
            bdrt_core::graph::OutPort { block: src, port: 0 },
            bdrt_core::graph::InPort { block: gain, port: 0 },
        )
        .expect("demo pipeline wiring is well-formed");
    graph
        .connect(
            bdrt_core::graph::OutPort { block: gain, port: 0 },
            bdrt_core::graph::InPort { block: sink, port: 0 },
        )
        .expect("demo pipeline wiring is well-formed");
    graph
}
