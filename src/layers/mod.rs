//! Layer contract and the closed set of layer kinds a network can hold.
//!
//! A forward call hands back an explicit state value; the caller keeps it
//! and passes it to the matching `compute_gradients` call. Layers hold no
//! per-call cache, so any number of forward/backward passes may read the
//! same layer at once.

pub mod dense;

use std::io::{Read, Write};

use crate::error::{NnError, NnResult};
use crate::math::io::{read_u8, write_u8};
use crate::math::Tensor;

pub use dense::{DenseGradient, DenseState, FullyConnected};

/// Per-layer parameter gradient. Accumulated over a batch, then scaled.
pub trait Gradient: Clone + Send {
    fn add(&mut self, other: &Self);
    fn scale(&mut self, factor: f64);
}

pub trait Layer {
    /// Transient values produced by `forward` and consumed by `compute_gradients`.
    type State;
    type Gradient: Gradient;

    fn input_size(&self) -> usize;
    fn output_size(&self) -> usize;

    fn forward(&self, input: &Tensor) -> (Tensor, Self::State);

    /// Returns this layer's parameter gradient and the gradient with respect
    /// to its input, given the gradient with respect to its output.
    fn compute_gradients(
        &self,
        state: &Self::State,
        upstream: &Tensor,
        clip_limit: f64,
    ) -> NnResult<(Self::Gradient, Tensor)>;

    /// Takes one descent step. Does nothing unless `learning_rate > 0`.
    fn update_params(&mut self, gradient: &Self::Gradient, learning_rate: f64);

    fn zero_gradient(&self) -> Self::Gradient;

    fn save<W: Write + ?Sized>(&self, w: &mut W) -> NnResult<()>;
}

/// Scales `delta` down to `limit` when its L2 norm exceeds it.
pub fn clip_gradient(delta: &mut Tensor, limit: f64) {
    let norm = delta.col_vector_norm2();
    if norm > limit {
        delta.scale_in_place(limit / norm);
    }
}

/// Type tag written before each layer in the model format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LayerKind {
    FullyConnected = 0,
}

impl LayerKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> NnResult<LayerKind> {
        match tag {
            0 => Ok(LayerKind::FullyConnected),
            other => Err(NnError::format(format!("unknown layer type tag {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnyLayer {
    FullyConnected(FullyConnected),
}

#[derive(Debug, Clone)]
pub enum AnyState {
    FullyConnected(DenseState),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnyGradient {
    FullyConnected(DenseGradient),
}

impl From<FullyConnected> for AnyLayer {
    fn from(layer: FullyConnected) -> Self {
        AnyLayer::FullyConnected(layer)
    }
}

impl AnyLayer {
    pub fn kind(&self) -> LayerKind {
        match self {
            AnyLayer::FullyConnected(_) => LayerKind::FullyConnected,
        }
    }

    /// Reads one tagged layer.
    pub fn load<R: Read + ?Sized>(r: &mut R) -> NnResult<AnyLayer> {
        match LayerKind::from_tag(read_u8(r)?)? {
            LayerKind::FullyConnected => Ok(AnyLayer::FullyConnected(FullyConnected::load(r)?)),
        }
    }

    pub fn as_fully_connected(&self) -> Option<&FullyConnected> {
        match self {
            AnyLayer::FullyConnected(layer) => Some(layer),
        }
    }
}

impl Gradient for AnyGradient {
    fn add(&mut self, other: &Self) {
        match (self, other) {
            (AnyGradient::FullyConnected(a), AnyGradient::FullyConnected(b)) => a.add(b),
        }
    }

    fn scale(&mut self, factor: f64) {
        match self {
            AnyGradient::FullyConnected(g) => g.scale(factor),
        }
    }
}

impl Layer for AnyLayer {
    type State = AnyState;
    type Gradient = AnyGradient;

    fn input_size(&self) -> usize {
        match self {
            AnyLayer::FullyConnected(l) => l.input_size(),
        }
    }

    fn output_size(&self) -> usize {
        match self {
            AnyLayer::FullyConnected(l) => l.output_size(),
        }
    }

    fn forward(&self, input: &Tensor) -> (Tensor, AnyState) {
        match self {
            AnyLayer::FullyConnected(l) => {
                let (out, state) = l.forward(input);
                (out, AnyState::FullyConnected(state))
            }
        }
    }

    fn compute_gradients(
        &self,
        state: &AnyState,
        upstream: &Tensor,
        clip_limit: f64,
    ) -> NnResult<(AnyGradient, Tensor)> {
        match (self, state) {
            (AnyLayer::FullyConnected(l), AnyState::FullyConnected(s)) => {
                let (grad, prev) = l.compute_gradients(s, upstream, clip_limit)?;
                Ok((AnyGradient::FullyConnected(grad), prev))
            }
        }
    }

    fn update_params(&mut self, gradient: &AnyGradient, learning_rate: f64) {
        match (self, gradient) {
            (AnyLayer::FullyConnected(l), AnyGradient::FullyConnected(g)) => {
                l.update_params(g, learning_rate)
            }
        }
    }

    fn zero_gradient(&self) -> AnyGradient {
        match self {
            AnyLayer::FullyConnected(l) => AnyGradient::FullyConnected(l.zero_gradient()),
        }
    }

    /// Writes the type tag followed by the layer body.
    fn save<W: Write + ?Sized>(&self, w: &mut W) -> NnResult<()> {
        write_u8(w, self.kind().tag())?;
        match self {
            AnyLayer::FullyConnected(l) => l.save(w),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_clip_over_limit_hits_limit() {
        let mut delta = Tensor::column_vector(&[3.0, 4.0, 12.0]);
        clip_gradient(&mut delta, 1.0);
        assert!((delta.col_vector_norm2() - 1.0).abs() < 1e-12);
        // direction is preserved
        assert!((delta.at(&[1]) / delta.at(&[0]) - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_clip_under_limit_is_unchanged() {
        let original = Tensor::column_vector(&[0.3, -0.4]);
        let mut delta = original.clone();
        clip_gradient(&mut delta, 1.0);
        assert_eq!(delta, original);
    }

    #[test]
    fn test_unknown_layer_tag() {
        let err = AnyLayer::load(&mut Cursor::new(vec![7u8])).unwrap_err();
        assert!(matches!(err, NnError::Format(_)), "{err}");
    }
}
