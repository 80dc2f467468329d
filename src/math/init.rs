use rand::Rng;
use rand_distr::{Distribution, StandardNormal, Uniform};
use serde::{Deserialize, Serialize};

use super::tensor::Tensor;

/// Weight initialization scheme for a `[rows, cols]` weight matrix, where
/// `cols` is the fan-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightInit {
    /// `N(0, sqrt(2 / fan_in))`. Suited to ReLU-family layers.
    #[default]
    He,
    /// `Uniform(-sqrt(6 / (fan_in + fan_out)), +sqrt(6 / (fan_in + fan_out)))`.
    Xavier,
}

impl WeightInit {
    pub fn sample<R: Rng + ?Sized>(&self, rows: usize, cols: usize, rng: &mut R) -> Tensor {
        match self {
            WeightInit::He => Tensor::he(rows, cols, rng),
            WeightInit::Xavier => Tensor::xavier(rows, cols, rng),
        }
    }
}

impl Tensor {
    /// He initialization: samples from `N(0, sqrt(2 / cols))`.
    pub fn he<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Tensor {
        assert!(cols > 0, "fan-in must be positive");
        let std_dev = (2.0 / cols as f64).sqrt();
        let data = (0..rows * cols)
            .map(|_| {
                let z: f64 = StandardNormal.sample(&mut *rng);
                z * std_dev
            })
            .collect();
        Tensor::with_data(&[rows, cols], data)
    }

    /// Xavier (Glorot) uniform initialization over `rows + cols` connections.
    pub fn xavier<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Tensor {
        assert!(rows + cols > 0, "layer must have at least one connection");
        let limit = (6.0 / (rows + cols) as f64).sqrt();
        let uniform = Uniform::new_inclusive(-limit, limit);
        let data = (0..rows * cols).map(|_| uniform.sample(&mut *rng)).collect();
        Tensor::with_data(&[rows, cols], data)
    }
}
