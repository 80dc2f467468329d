mod codec;
pub mod gradient;
pub mod network;
pub mod sample;
pub mod spec;

pub use gradient::NetworkGradient;
pub use network::Network;
pub use sample::Sample;
pub use spec::NetworkSpec;
