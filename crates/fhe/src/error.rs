//! Capability error types.

use thiserror::Error;

/// Errors raised by the FHE coprocessor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FheError {
    #[error("Unknown ciphertext handle: {0}")]
    UnknownHandle(String),

    #[error("Ciphertext type mismatch: expected {expected}")]
    TypeMismatch { expected: &'static str },
}

/// Errors raised by the decryption oracle when accepting a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("Empty decryption request")]
    EmptyRequest,

    #[error("Request limit reached")]
    RequestLimit,
}
