//! Error types for the decryption oracle.

use adx_crypto::CryptoError;
use adx_fhe::FheError;
use adx_types::RequestId;
use thiserror::Error;

/// Errors that can occur while producing decryption responses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("Duplicate share from member {0}")]
    DuplicateShare(u32),

    #[error("Invalid DLEQ proof from member {0}")]
    InvalidProof(u32),

    #[error("Threshold not met: have {have}, need {need}")]
    ThresholdNotMet { have: usize, need: usize },

    #[error("Unknown committee member {0}")]
    UnknownMember(u32),

    #[error("Unknown decryption request {0}")]
    UnknownRequest(RequestId),

    #[error("Signing already started for request {0}")]
    AlreadyStarted(RequestId),

    #[error("Decryption failed: {0}")]
    Decryption(#[from] FheError),

    #[error("Cryptographic failure: {0}")]
    Crypto(#[from] CryptoError),
}
