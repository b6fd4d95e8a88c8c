use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{NnError, Result};
use crate::math::init::Initializer;

/// Describes one layer in a network specification.
///
/// Fields:
/// - `neurons`    — output width of this layer
/// - `activation` — activation function applied after the affine transform
/// - `init`       — weight initialization strategy (defaults to uniform [-1, 1))
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub neurons: usize,
    pub activation: ActivationFunction,
    #[serde(default)]
    pub init: Initializer,
}

impl LayerSpec {
    pub fn new(neurons: usize, activation: ActivationFunction) -> LayerSpec {
        LayerSpec { neurons, activation, init: Initializer::default() }
    }

    pub fn with_init(mut self, init: Initializer) -> LayerSpec {
        self.init = init;
        self
    }
}

/// A serializable description of a network architecture.
///
/// Only the topology is stored; trained weights are never written out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Human-readable name, used in log output.
    pub name: String,
    /// Width of each input sample.
    pub input_size: usize,
    /// Ordered list of layer descriptions (input → output).
    pub layers: Vec<LayerSpec>,
}

impl NetworkSpec {
    pub fn new(name: impl Into<String>, input_size: usize, layers: Vec<LayerSpec>) -> NetworkSpec {
        NetworkSpec { name: name.into(), input_size, layers }
    }

    /// Checks that every width is positive and at least one layer exists.
    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            return Err(NnError::invalid("input_size must be positive"));
        }
        if self.layers.is_empty() {
            return Err(NnError::invalid("a network needs at least one layer"));
        }
        if let Some(i) = self.layers.iter().position(|l| l.neurons == 0) {
            return Err(NnError::invalid(format!("layer {i} has zero neurons")));
        }
        Ok(())
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes and validates a `NetworkSpec` from a JSON file.
    pub fn load_json(path: &str) -> Result<NetworkSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let spec: NetworkSpec = serde_json::from_reader(reader)?;
        spec.validate()?;
        Ok(spec)
    }
}
