pub mod init;
pub(crate) mod io;
pub mod ops;
pub mod tensor;

pub use init::WeightInit;
pub use tensor::Tensor;
