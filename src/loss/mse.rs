use crate::math::Tensor;

pub struct MseLoss;

impl MseLoss {
    /// Squared error of one sample, summed over output components.
    ///
    /// # Panics
    /// Panics if the shapes differ.
    pub fn loss(predicted: &Tensor, expected: &Tensor) -> f64 {
        let diff = predicted - expected;
        diff.data().iter().map(|d| d * d).sum()
    }

    /// Gradient with respect to the prediction: `2 (predicted - expected)`.
    pub fn derivative(predicted: &Tensor, expected: &Tensor) -> Tensor {
        let mut diff = predicted - expected;
        diff.scale_in_place(2.0);
        diff
    }
}
