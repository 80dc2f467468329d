use std::io::{Read, Write};

use rand::Rng;
use tracing::error;

use crate::activation::ActivationFunction;
use crate::error::{NnError, NnResult};
use crate::math::{Tensor, WeightInit};

use super::{clip_gradient, Gradient, Layer};

/// Fully connected layer: `a = activation(weights · input + biases)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FullyConnected {
    /// `[out, in]`
    weights: Tensor,
    /// `[out, 1]`
    biases: Tensor,
    activator: ActivationFunction,
}

/// Input and pre-activation `z` of one forward call.
#[derive(Debug, Clone)]
pub struct DenseState {
    pub input: Tensor,
    pub z: Tensor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DenseGradient {
    pub weights: Tensor,
    pub biases: Tensor,
}

impl FullyConnected {
    /// He-initialized weights and zero biases.
    pub fn new(input_size: usize, output_size: usize, activation: ActivationFunction) -> Self {
        Self::with_init(
            input_size,
            output_size,
            activation,
            WeightInit::He,
            &mut rand::thread_rng(),
        )
    }

    pub fn with_init<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: ActivationFunction,
        init: WeightInit,
        rng: &mut R,
    ) -> Self {
        FullyConnected {
            weights: init.sample(output_size, input_size, rng),
            biases: Tensor::new(&[output_size, 1]),
            activator: activation,
        }
    }

    /// # Panics
    /// Panics unless `weights` is `[out, in]` and `biases` is `[out, 1]`.
    pub fn from_parts(weights: Tensor, biases: Tensor, activation: ActivationFunction) -> Self {
        assert!(weights.dims() == 2, "weights must be a matrix, got shape {:?}", weights.shape());
        assert!(
            biases.is_column_vector() && biases.rows() == weights.rows(),
            "biases of shape {:?} do not match weights of shape {:?}",
            biases.shape(),
            weights.shape()
        );
        let rows = weights.rows();
        FullyConnected {
            weights,
            biases: Tensor::with_data(&[rows, 1], biases.into_data()),
            activator: activation,
        }
    }

    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    pub fn biases(&self) -> &Tensor {
        &self.biases
    }

    pub fn activation(&self) -> ActivationFunction {
        self.activator
    }

    /// Reads a layer body (activation tag, weights, biases).
    pub fn load<R: Read + ?Sized>(r: &mut R) -> NnResult<Self> {
        let activator = ActivationFunction::load(r)?;
        let weights = Tensor::load(r)?;
        let biases = Tensor::load(r)?;
        if weights.dims() != 2 {
            return Err(NnError::format(format!(
                "layer weights must be a matrix, got shape {:?}",
                weights.shape()
            )));
        }
        if !biases.is_column_vector() || biases.rows() != weights.rows() {
            return Err(NnError::format(format!(
                "layer biases of shape {:?} do not match weights of shape {:?}",
                biases.shape(),
                weights.shape()
            )));
        }
        Ok(FullyConnected::from_parts(weights, biases, activator))
    }
}

impl Gradient for DenseGradient {
    fn add(&mut self, other: &Self) {
        self.weights += &other.weights;
        self.biases += &other.biases;
    }

    fn scale(&mut self, factor: f64) {
        self.weights.scale_in_place(factor);
        self.biases.scale_in_place(factor);
    }
}

impl Layer for FullyConnected {
    type State = DenseState;
    type Gradient = DenseGradient;

    fn input_size(&self) -> usize {
        self.weights.cols()
    }

    fn output_size(&self) -> usize {
        self.weights.rows()
    }

    /// # Panics
    /// Panics unless `input` is a column vector with `input_size()` rows.
    fn forward(&self, input: &Tensor) -> (Tensor, DenseState) {
        assert!(
            input.is_column_vector() && input.rows() == self.input_size(),
            "layer expects a column vector of {} rows, got shape {:?}",
            self.input_size(),
            input.shape()
        );
        let mut z = self.weights.matmul(input);
        z += &self.biases;
        let activation = self.activator.apply_to(&z);
        let state = DenseState {
            input: input.clone(),
            z,
        };
        (activation, state)
    }

    fn compute_gradients(
        &self,
        state: &DenseState,
        upstream: &Tensor,
        clip_limit: f64,
    ) -> NnResult<(DenseGradient, Tensor)> {
        let mut delta = self.activator.derivative_of(&state.z);
        delta.mul_elementwise_in_place(upstream);
        clip_gradient(&mut delta, clip_limit);

        let weights = delta.matmul(&state.input.transpose());
        if !weights.is_finite() || !delta.is_finite() {
            error!(
                weights = ?self.weights.shape(),
                "non-finite gradient in fully connected layer"
            );
            return Err(NnError::NumericInstability(format!(
                "non-finite gradient in fully connected layer {}x{}",
                self.output_size(),
                self.input_size()
            )));
        }

        let previous = self.weights.transpose().matmul(&delta);
        Ok((DenseGradient { weights, biases: delta }, previous))
    }

    fn update_params(&mut self, gradient: &DenseGradient, learning_rate: f64) {
        if learning_rate <= 0.0 {
            return;
        }
        self.weights -= &gradient.weights.scalar_mult(learning_rate);
        self.biases -= &gradient.biases.scalar_mult(learning_rate);
    }

    fn zero_gradient(&self) -> DenseGradient {
        DenseGradient {
            weights: Tensor::new(self.weights.shape()),
            biases: Tensor::new(self.biases.shape()),
        }
    }

    fn save<W: Write + ?Sized>(&self, w: &mut W) -> NnResult<()> {
        self.activator.save(w)?;
        self.weights.save(w)?;
        self.biases.save(w)
    }
}
