//! Built-in block types, registered under the names a graph file can
//! reference. Real deployments register camera/GPIO/ADC drivers the same
//! way; these three are enough to exercise the demo pipeline end to end.

use bdrt_core::block::{Block, BlockError, Kind, Parameter, ParamConstraint, ParamValue, Sample, UnknownParam};
use bdrt_core::registry::Registry;

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
    fn params(&self) -> Vec<Parameter> {
        vec![Parameter {
            name: "freq_hz".into(),
            value: ParamValue::Number(self.freq_hz),
            constraint: ParamConstraint {
                min: Some(0.0),
                max: Some(1000.0),
                ..Default::default()
            },
            force_gui: true,
        }]
    }
    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<(), UnknownParam> {
        match (name, value) {
            ("freq_hz", ParamValue::Number(n)) => {
                self.freq_hz = n;
                Ok(())
            }
            (other, _) => Err(UnknownParam(other.to_string())),
        }
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
    fn params(&self) -> Vec<Parameter> {
        vec![Parameter {
            name: "gain".into(),
            value: ParamValue::Number(self.0),
            constraint: ParamConstraint {
                min: Some(-100.0),
                max: Some(100.0),
                ..Default::default()
            },
            force_gui: true,
        }]
    }
    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<(), UnknownParam> {
        match (name, value) {
            ("gain", ParamValue::Number(n)) => {
                self.0 = n;
                Ok(())
            }
            (other, _) => Err(UnknownParam(other.to_string())),
        }
    }
}

struct PrintSink;
impl Block for PrintSink {
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

/// Registers every built-in block type under its wire name.
pub fn register_builtin(registry: &mut Registry) -> Result<(), bdrt_core::registry::RegistryError> {
    registry.register("waveform", || {
        Box::new(Waveform {
            freq_hz: 1.0,
            amplitude: 1.0,
        })
    })?;
    registry.register("gain", || Box::new(Gain(1.0)))?;
    registry.register("print_sink", || Box::new(PrintSink))?;
    Ok(())
}
