//! A minimal `Waveform -> Gain -> Sink` pipeline, run for one second of
//! simulated time on the real wall clock.

use std::time::Duration;

use bdrt_core::block::{Block, BlockError, Kind, Sample};
use bdrt_core::executor::{self, RunConfig};
use bdrt_core::graph::{Graph, InPort, OutPort};
use bdrt_core::RealClock;

struct Waveform {
    freq_hz: f64,
    amplitude: f64,
}

impl Block for Waveform {
    fn kind(&self) -> Kind {
        Kind::Clocked
    }
    fn nin(&self) -> usize {
        0
    }
    fn nout(&self) -> usize {
        1
    }
    fn output(&mut self, _inputs: &[Sample], t: f64) -> Result<Vec<Sample>, BlockError> {
        let v = self.amplitude * (2.0 * std::f64::consts::PI * self.freq_hz * t).sin();
        Ok(vec![Sample::Scalar(v)])
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
        let x = match inputs[0] {
            Sample::Scalar(v) => v,
            _ => 0.0,
        };
        Ok(vec![Sample::Scalar(x * self.0)])
    }
}

struct Print;
impl Block for Print {
    fn kind(&self) -> Kind {
        Kind::Sink
    }
    fn nin(&self) -> usize {
        1
    }
    fn nout(&self) -> usize {
        0
    }
    fn step(&mut self, inputs: &[Sample]) -> Result<(), BlockError> {
        if let Sample::Scalar(v) = inputs[0] {
            println!("{v:.4}");
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut graph = Graph::new();
    let clock = graph.add_clock(0.01, 0.0);
    let src = graph.add_clocked_block(
        Box::new(Waveform {
            freq_hz: 1.0,
            amplitude: 1.0,
        }),
        clock,
    );
    let gain = graph.add_block(Box::new(Gain(2.0)));
    let sink = graph.add_block(Box::new(Print));
    graph.connect(OutPort { block: src, port: 0 }, InPort { block: gain, port: 0 })?;
    graph.connect(OutPort { block: gain, port: 0 }, InPort { block: sink, port: 0 })?;
    graph.compile()?;

    let plans = bdrt_core::plan(&mut graph)?;
    let config = RunConfig {
        setup_buffer: Duration::from_millis(100),
        max_time: Some(1.0),
        skip_first_tick: false,
    };
    executor::run::<std::net::TcpStream>(&mut graph, &plans, &RealClock, config, None)?;
    Ok(())
}
