use crate::network::{Network, NetworkGradient};

/// Plain SGD with inverse-time learning-rate decay:
/// `lr(epoch) = learning_rate / (1 + decay * epoch)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sgd {
    pub learning_rate: f64,
    pub decay: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd {
            learning_rate,
            decay: 0.0,
        }
    }

    pub fn with_decay(learning_rate: f64, decay: f64) -> Sgd {
        Sgd {
            learning_rate,
            decay,
        }
    }

    pub fn learning_rate_at(&self, epoch: usize) -> f64 {
        self.learning_rate / (1.0 + self.decay * epoch as f64)
    }

    /// Applies an already averaged gradient. Returns the rate used.
    pub fn step(&self, network: &mut Network, gradient: &NetworkGradient, epoch: usize) -> f64 {
        let lr = self.learning_rate_at(epoch);
        network.apply_gradient(gradient, lr);
        lr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decay_schedule() {
        let sgd = Sgd::with_decay(1.0, 0.5);
        assert_eq!(sgd.learning_rate_at(0), 1.0);
        assert_eq!(sgd.learning_rate_at(2), 0.5);
        assert_eq!(Sgd::new(0.3).learning_rate_at(1000), 0.3);
    }
}
