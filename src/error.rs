//! Error type shared by the codec, the layers and the training drivers.
//!
//! Shape mismatches and out-of-bounds indexing are programmer errors and
//! panic at the call site. Everything that can be caused by external input
//! (a truncated model file, a diverging training run) is reported here.

use std::fmt;
use std::io;

/// Result alias used throughout the crate.
pub type NnResult<T> = Result<T, NnError>;

#[derive(Debug)]
pub enum NnError {
    /// Underlying I/O failure while reading or writing a model.
    Io(io::Error),
    /// The byte stream did not match the model format.
    Format(String),
    /// A computed gradient contained NaN or infinite values.
    NumericInstability(String),
    /// A training worker panicked while computing gradients.
    WorkerPanicked(String),
    /// Architecture spec could not be (de)serialized.
    Json(serde_json::Error),
}

impl NnError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        NnError::Format(msg.into())
    }
}

impl fmt::Display for NnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NnError::Io(err) => write!(f, "I/O error: {err}"),
            NnError::Format(msg) => write!(f, "Invalid model format: {msg}"),
            NnError::NumericInstability(msg) => write!(f, "Numeric instability: {msg}"),
            NnError::WorkerPanicked(msg) => write!(f, "Training worker panicked: {msg}"),
            NnError::Json(err) => write!(f, "Failed to (de)serialize network spec: {err}"),
        }
    }
}

impl std::error::Error for NnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NnError::Io(err) => Some(err),
            NnError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for NnError {
    /// A short read is a malformed stream, not an I/O failure.
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            NnError::Format(format!("unexpected end of stream ({err})"))
        } else {
            NnError::Io(err)
        }
    }
}

impl From<serde_json::Error> for NnError {
    fn from(err: serde_json::Error) -> Self {
        NnError::Json(err)
    }
}
