//! Conversion failure taxonomy.
//!
//! Every failure carries a stable numeric code plus a free-form message.
//! Failures bubble out of `convert`/`convert_in_driver` before any output is
//! handed to the caller, so a failed conversion never leaves partial output
//! behind.

use aero_dxbc::sm4::{DecodeError, Sm4Error};
use aero_dxbc::DxbcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// The input does not conform to the container format.
    #[error("malformed container: {0}")]
    MalformedContainer(String),
    /// The instruction stream is structurally invalid.
    #[error("malformed bytecode: {0}")]
    MalformedBytecode(String),
    /// The reconstructed CFG is not reducible.
    #[error("irreducible control flow in function {0}")]
    IrreducibleControlFlow(String),
    /// The emitted module failed verification.
    #[error("module verification failed: {0}")]
    VerificationFailed(String),
    /// An explicit allocation reservation failed.
    #[error("out of memory: {0}")]
    OutOfMemory(String),
    /// An in-driver DDI signature entry cannot be resolved.
    #[error("invalid DDI signature: {0}")]
    InvalidDdiSignature(String),
    /// The assembled container would exceed the format's size fields.
    #[error("assembled container too large: {0}")]
    DataTooLarge(String),
}

impl ConvertError {
    /// Stable error code for driver-side logging.
    pub fn code(&self) -> u32 {
        match self {
            ConvertError::MalformedContainer(_) => 1,
            ConvertError::MalformedBytecode(_) => 2,
            ConvertError::IrreducibleControlFlow(_) => 3,
            ConvertError::VerificationFailed(_) => 4,
            ConvertError::OutOfMemory(_) => 5,
            ConvertError::InvalidDdiSignature(_) => 6,
            ConvertError::DataTooLarge(_) => 7,
        }
    }
}

impl From<DxbcError> for ConvertError {
    fn from(err: DxbcError) -> ConvertError {
        match err {
            DxbcError::TooLarge { context } => ConvertError::DataTooLarge(context),
            other => ConvertError::MalformedContainer(other.to_string()),
        }
    }
}

impl From<Sm4Error> for ConvertError {
    fn from(err: Sm4Error) -> ConvertError {
        match err {
            Sm4Error::OutOfMemory { .. } => ConvertError::OutOfMemory(err.to_string()),
            other => ConvertError::MalformedContainer(other.to_string()),
        }
    }
}

impl From<DecodeError> for ConvertError {
    fn from(err: DecodeError) -> ConvertError {
        ConvertError::MalformedBytecode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
