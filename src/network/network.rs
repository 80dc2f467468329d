use rand::Rng;
use tracing::error;

use crate::activation::ActivationFunction;
use crate::error::NnResult;
use crate::layers::{AnyLayer, AnyState, FullyConnected, Gradient, Layer};
use crate::loss::MseLoss;
use crate::math::{Tensor, WeightInit};
use crate::network::gradient::NetworkGradient;
use crate::network::sample::Sample;

/// Ordered sequence of layers plus the L2 limit applied to every layer's
/// delta during backpropagation.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    layers: Vec<AnyLayer>,
    gradient_clipping_limit: f64,
}

impl Network {
    /// # Panics
    /// Panics if `layers` is empty, consecutive widths don't chain, or the
    /// clipping limit is not a finite positive number.
    pub fn new(layers: Vec<AnyLayer>, gradient_clipping_limit: f64) -> Network {
        assert!(!layers.is_empty(), "a network needs at least one layer");
        assert_clipping_limit(gradient_clipping_limit);
        for (i, pair) in layers.windows(2).enumerate() {
            assert_eq!(
                pair[0].output_size(),
                pair[1].input_size(),
                "layer {} outputs {} values but layer {} expects {}",
                i,
                pair[0].output_size(),
                i + 1,
                pair[1].input_size()
            );
        }
        Network {
            layers,
            gradient_clipping_limit,
        }
    }

    /// Multi-layer perceptron of fully connected layers. `architecture` lists
    /// every width including input and output; all layers but the last use
    /// `hidden`, the last uses `output`.
    pub fn mlp(
        architecture: &[usize],
        hidden: ActivationFunction,
        output: ActivationFunction,
        gradient_clipping_limit: f64,
    ) -> Network {
        Network::mlp_with_rng(
            architecture,
            hidden,
            output,
            gradient_clipping_limit,
            WeightInit::He,
            &mut rand::thread_rng(),
        )
    }

    pub fn mlp_with_rng<R: Rng + ?Sized>(
        architecture: &[usize],
        hidden: ActivationFunction,
        output: ActivationFunction,
        gradient_clipping_limit: f64,
        init: WeightInit,
        rng: &mut R,
    ) -> Network {
        assert!(
            architecture.len() >= 2,
            "architecture needs an input and an output width, got {:?}",
            architecture
        );
        let last = architecture.len() - 2;
        let layers = architecture
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                let activation = if i == last { output } else { hidden };
                AnyLayer::from(FullyConnected::with_init(w[0], w[1], activation, init, &mut *rng))
            })
            .collect();
        Network::new(layers, gradient_clipping_limit)
    }

    pub fn layers(&self) -> &[AnyLayer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn gradient_clipping_limit(&self) -> f64 {
        self.gradient_clipping_limit
    }

    pub fn set_gradient_clipping_limit(&mut self, limit: f64) {
        assert_clipping_limit(limit);
        self.gradient_clipping_limit = limit;
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].input_size()
    }

    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].output_size()
    }

    /// Widths from input to output, e.g. `[2, 2, 1]`.
    pub fn architecture(&self) -> Vec<usize> {
        std::iter::once(self.input_size())
            .chain(self.layers.iter().map(|l| l.output_size()))
            .collect()
    }

    /// Runs every layer in order. The returned states are needed by
    /// [`Network::backward`] for this same pass.
    pub fn forward(&self, input: &Tensor) -> (Tensor, Vec<AnyState>) {
        let mut states = Vec::with_capacity(self.layers.len());
        let mut activation = input.clone();
        for layer in &self.layers {
            let (next, state) = layer.forward(&activation);
            states.push(state);
            activation = next;
        }
        (activation, states)
    }

    pub fn predict(&self, input: &Tensor) -> Tensor {
        self.forward(input).0
    }

    /// Squared error of one sample, summed over output components.
    pub fn loss(&self, sample: &Sample) -> f64 {
        MseLoss::loss(&self.predict(sample.input()), sample.expected())
    }

    /// Summed squared error over `samples` divided by their count; 0 when empty.
    pub fn average_loss(&self, samples: &[Sample]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let total: f64 = samples.iter().map(|s| self.loss(s)).sum();
        total / samples.len() as f64
    }

    /// Walks the layers in reverse. The result is in architecture order.
    pub fn backward(&self, states: &[AnyState], loss_gradient: &Tensor) -> NnResult<NetworkGradient> {
        assert_eq!(
            states.len(),
            self.layers.len(),
            "backward needs one state per layer"
        );
        let mut gradients = Vec::with_capacity(self.layers.len());
        let mut upstream = loss_gradient.clone();
        for (i, (layer, state)) in self.layers.iter().zip(states).enumerate().rev() {
            let (gradient, previous) = layer
                .compute_gradients(state, &upstream, self.gradient_clipping_limit)
                .map_err(|e| {
                    error!(layer = i, "backward pass failed: {e}");
                    e
                })?;
            gradients.push(gradient);
            upstream = previous;
        }
        gradients.reverse();
        Ok(NetworkGradient::new(gradients))
    }

    /// Forward plus backward for a single sample.
    pub fn sample_gradient(&self, sample: &Sample) -> NnResult<NetworkGradient> {
        let (output, states) = self.forward(sample.input());
        let loss_gradient = MseLoss::derivative(&output, sample.expected());
        self.backward(&states, &loss_gradient)
    }

    /// Sum (not mean) of the per-sample gradients.
    pub fn batch_gradient<'a, I>(&self, samples: I) -> NnResult<NetworkGradient>
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        let mut acc = self.zero_gradient();
        for sample in samples {
            acc.add(&self.sample_gradient(sample)?);
        }
        Ok(acc)
    }

    pub fn zero_gradient(&self) -> NetworkGradient {
        NetworkGradient::new(self.layers.iter().map(|l| l.zero_gradient()).collect())
    }

    /// Updates every layer. A non-positive learning rate changes nothing.
    pub fn apply_gradient(&mut self, gradient: &NetworkGradient, learning_rate: f64) {
        assert_eq!(
            gradient.len(),
            self.layers.len(),
            "gradient does not match the network's layer count"
        );
        for (layer, g) in self.layers.iter_mut().zip(gradient.layers()) {
            layer.update_params(g, learning_rate);
        }
    }

    /// One full-batch gradient descent step: the gradient averaged over all
    /// `samples`, scaled by `learning_rate`.
    pub fn backprop_step(&mut self, samples: &[Sample], learning_rate: f64) -> NnResult<()> {
        if learning_rate <= 0.0 || samples.is_empty() {
            return Ok(());
        }
        let mut gradient = self.batch_gradient(samples)?;
        gradient.scale(1.0 / samples.len() as f64);
        self.apply_gradient(&gradient, learning_rate);
        Ok(())
    }
}

/// A clipping limit is a maximum L2 norm; anything else would flip or erase
/// the delta.
pub(crate) fn is_valid_clipping_limit(limit: f64) -> bool {
    limit.is_finite() && limit > 0.0
}

fn assert_clipping_limit(limit: f64) {
    assert!(
        is_valid_clipping_limit(limit),
        "gradient clipping limit must be finite and positive, got {limit}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NnError;
    use crate::layers::AnyGradient;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn identity_layer(weights: &[&[f64]], biases: &[f64]) -> AnyLayer {
        FullyConnected::from_parts(
            Tensor::from_rows(weights),
            Tensor::column_vector(biases),
            ActivationFunction::Identity,
        )
        .into()
    }

    fn two_layer_net() -> Network {
        Network::new(
            vec![
                identity_layer(&[&[1.0, 0.0], &[0.0, 2.0]], &[0.0, 0.0]),
                identity_layer(&[&[1.0, 1.0]], &[1.0]),
            ],
            100.0,
        )
    }

    #[test]
    fn test_mlp_layout() {
        let mut rng = StdRng::seed_from_u64(0);
        let net = Network::mlp_with_rng(
            &[3, 4, 5, 2],
            ActivationFunction::ReLU,
            ActivationFunction::Sigmoid,
            1.0,
            WeightInit::He,
            &mut rng,
        );
        assert_eq!(net.layer_count(), 3);
        assert_eq!(net.architecture(), vec![3, 4, 5, 2]);
        let activations: Vec<_> = net
            .layers()
            .iter()
            .filter_map(|l| l.as_fully_connected())
            .map(|l| l.activation())
            .collect();
        assert_eq!(
            activations,
            vec![
                ActivationFunction::ReLU,
                ActivationFunction::ReLU,
                ActivationFunction::Sigmoid
            ]
        );
    }

    #[test]
    fn test_single_layer_mlp_uses_output_activation() {
        let net = Network::mlp(&[2, 1], ActivationFunction::ReLU, ActivationFunction::Sigmoid, 1.0);
        let layer = net.layers()[0].as_fully_connected().unwrap();
        assert_eq!(layer.activation(), ActivationFunction::Sigmoid);
    }

    #[test]
    #[should_panic(expected = "finite and positive, got -1")]
    fn test_negative_clipping_limit_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        Network::mlp_with_rng(
            &[1, 1],
            ActivationFunction::Identity,
            ActivationFunction::Identity,
            -1.0,
            WeightInit::He,
            &mut rng,
        );
    }

    #[test]
    #[should_panic(expected = "finite and positive, got 0")]
    fn test_zero_clipping_limit_cannot_be_set() {
        two_layer_net().set_gradient_clipping_limit(0.0);
    }

    #[test]
    #[should_panic(expected = "outputs 3 values")]
    fn test_new_rejects_unchained_layers() {
        Network::new(
            vec![
                identity_layer(&[&[1.0], &[1.0], &[1.0]], &[0.0, 0.0, 0.0]),
                identity_layer(&[&[1.0, 1.0]], &[0.0]),
            ],
            1.0,
        );
    }

    #[test]
    fn test_forward_threads_layers() {
        let net = two_layer_net();
        let (out, states) = net.forward(&Tensor::column_vector(&[3.0, 4.0]));
        // [3, 8] then 3 + 8 + 1
        assert_eq!(out, Tensor::column_vector(&[12.0]));
        assert_eq!(states.len(), 2);
    }

    #[test]
    fn test_average_loss() {
        let net = two_layer_net();
        let samples = vec![
            Sample::from_slices(&[3.0, 4.0], &[10.0]),
            Sample::from_slices(&[0.0, 0.0], &[1.0]),
        ];
        // (12 - 10)^2 = 4 and 0, averaged over 2 samples
        assert_eq!(net.average_loss(&samples), 2.0);
        assert_eq!(net.average_loss(&[]), 0.0);
    }

    #[test]
    fn test_backward_is_in_architecture_order() {
        let net = two_layer_net();
        let sample = Sample::from_slices(&[1.0, 1.0], &[0.0]);
        // output = 1 + 2 + 1 = 4, dL/da = 8
        let grad = net.sample_gradient(&sample).unwrap();
        assert_eq!(grad.len(), 2);

        let AnyGradient::FullyConnected(first) = &grad.layers()[0];
        let AnyGradient::FullyConnected(last) = &grad.layers()[1];
        assert_eq!(last.biases, Tensor::column_vector(&[8.0]));
        assert_eq!(last.weights, Tensor::row_vector(&[8.0, 16.0]));
        // Wᵀ · 8 = [8, 8]
        assert_eq!(first.biases, Tensor::column_vector(&[8.0, 8.0]));
        assert_eq!(first.weights, Tensor::filled(&[2, 2], 8.0));
    }

    #[test]
    fn test_backward_clips_each_layer() {
        let mut net = two_layer_net();
        net.set_gradient_clipping_limit(1.0);
        let sample = Sample::from_slices(&[1.0, 1.0], &[0.0]);
        let grad = net.sample_gradient(&sample).unwrap();
        for layer in grad.layers() {
            let AnyGradient::FullyConnected(g) = layer;
            assert!(g.biases.col_vector_norm2() <= 1.0 + 1e-12);
        }
    }

    #[test]
    fn test_backward_surfaces_numeric_instability() {
        let net = two_layer_net();
        let sample = Sample::from_slices(&[f64::INFINITY, 0.0], &[0.0]);
        let err = net.sample_gradient(&sample).unwrap_err();
        assert!(matches!(err, NnError::NumericInstability(_)), "{err}");
    }

    #[test]
    fn test_backprop_step_reduces_loss() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut net = Network::mlp_with_rng(
            &[2, 3, 1],
            ActivationFunction::Sigmoid,
            ActivationFunction::Identity,
            100.0,
            WeightInit::Xavier,
            &mut rng,
        );
        let samples = vec![
            Sample::from_slices(&[0.0, 1.0], &[1.0]),
            Sample::from_slices(&[1.0, 0.0], &[-1.0]),
        ];
        let before = net.average_loss(&samples);
        net.backprop_step(&samples, 0.05).unwrap();
        assert!(net.average_loss(&samples) < before);
    }

    #[test]
    fn test_backprop_step_ignores_non_positive_rate() {
        let mut net = two_layer_net();
        let before = net.clone();
        let samples = vec![Sample::from_slices(&[1.0, 1.0], &[0.0])];
        net.backprop_step(&samples, 0.0).unwrap();
        net.backprop_step(&samples, -0.5).unwrap();
        assert_eq!(net, before);
    }
}
