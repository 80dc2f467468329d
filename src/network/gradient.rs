use crate::layers::{AnyGradient, Gradient};

/// One gradient per layer, in architecture order (index 0 is the first layer).
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkGradient {
    layers: Vec<AnyGradient>,
}

impl NetworkGradient {
    pub fn new(layers: Vec<AnyGradient>) -> NetworkGradient {
        NetworkGradient { layers }
    }

    pub fn layers(&self) -> &[AnyGradient] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Gradient for NetworkGradient {
    /// # Panics
    /// Panics if the two gradients belong to different architectures.
    fn add(&mut self, other: &Self) {
        assert_eq!(
            self.layers.len(),
            other.layers.len(),
            "gradients have different layer counts"
        );
        for (acc, g) in self.layers.iter_mut().zip(other.layers.iter()) {
            acc.add(g);
        }
    }

    fn scale(&mut self, factor: f64) {
        for g in self.layers.iter_mut() {
            g.scale(factor);
        }
    }
}
