//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Invalid G1 point encoding")]
    InvalidG1Point,

    #[error("Invalid G2 point encoding")]
    InvalidG2Point,

    #[error("Invalid signature length: {0}")]
    InvalidSignatureLength(usize),

    #[error("DLEQ proof verification failed")]
    DleqVerificationFailed,

    #[error("Aggregate signature verification failed")]
    SignatureVerificationFailed,

    #[error("Insufficient threshold shares: need {required}, got {got}")]
    InsufficientShares { required: usize, got: usize },

    #[error("Invalid sharing parameters: threshold {threshold} of {members}")]
    InvalidSharingParameters { threshold: usize, members: usize },

    #[error("Duplicate share index")]
    DuplicateShareIndex,

    #[error("Lagrange interpolation failed")]
    LagrangeInterpolationFailed,
}
