use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activation::ActivationFunction;
use crate::error::NnResult;
use crate::math::WeightInit;
use crate::network::network::Network;

fn default_clipping_limit() -> f64 {
    1.0
}

/// Serializable description of a multi-layer perceptron, independent of its
/// trained weights.
///
/// ```json
/// {
///   "architecture": [2, 2, 1],
///   "hidden_activation": "Sigmoid",
///   "output_activation": "Identity",
///   "gradient_clipping_limit": 1.0,
///   "weight_init": "he"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Layer widths from input to output.
    pub architecture: Vec<usize>,
    pub hidden_activation: ActivationFunction,
    pub output_activation: ActivationFunction,
    #[serde(default = "default_clipping_limit")]
    pub gradient_clipping_limit: f64,
    #[serde(default)]
    pub weight_init: WeightInit,
}

impl NetworkSpec {
    pub fn new(
        architecture: Vec<usize>,
        hidden_activation: ActivationFunction,
        output_activation: ActivationFunction,
    ) -> Self {
        NetworkSpec {
            architecture,
            hidden_activation,
            output_activation,
            gradient_clipping_limit: default_clipping_limit(),
            weight_init: WeightInit::default(),
        }
    }

    pub fn with_clipping_limit(mut self, limit: f64) -> Self {
        self.gradient_clipping_limit = limit;
        self
    }

    pub fn with_weight_init(mut self, init: WeightInit) -> Self {
        self.weight_init = init;
        self
    }

    /// Freshly initialized network for this architecture.
    pub fn build(&self) -> Network {
        self.build_with_rng(&mut rand::thread_rng())
    }

    pub fn build_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Network {
        Network::mlp_with_rng(
            &self.architecture,
            self.hidden_activation,
            self.output_activation,
            self.gradient_clipping_limit,
            self.weight_init,
            rng,
        )
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> NnResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> NnResult<NetworkSpec> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
