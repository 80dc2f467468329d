pub mod activation;
pub mod error;
pub mod layers;
pub mod loss;
pub mod math;
pub mod network;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use activation::ActivationFunction;
pub use error::{NnError, NnResult};
pub use layers::{AnyLayer, FullyConnected, Gradient, Layer};
pub use loss::MseLoss;
pub use math::{Tensor, WeightInit};
pub use network::{Network, NetworkGradient, NetworkSpec, Sample};
pub use optim::Sgd;
pub use train::{train_concurrent, train_single_threaded, EpochStats, TrainConfig};
