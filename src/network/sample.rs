use crate::math::Tensor;

/// A training pair. Both tensors are column vectors (or shape-equal to one,
/// e.g. a scalar target for a single-output network).
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    input: Tensor,
    expected: Tensor,
}

impl Sample {
    pub fn new(input: Tensor, expected: Tensor) -> Sample {
        Sample { input, expected }
    }

    /// Builds a sample from plain slices, both stored as column vectors.
    pub fn from_slices(input: &[f64], expected: &[f64]) -> Sample {
        Sample::new(Tensor::column_vector(input), Tensor::column_vector(expected))
    }

    pub fn input(&self) -> &Tensor {
        &self.input
    }

    pub fn expected(&self) -> &Tensor {
        &self.expected
    }
}
