//! Exchange module error types.

use thiserror::Error;

use adx_fhe::{FheError, OracleError};
use adx_types::{BatchId, RequestId};

/// Errors that can occur in the exchange module.
///
/// Every failure aborts the triggering call without any state change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    // Authorization
    #[error("Caller is not the owner")]
    NotOwner,

    #[error("Caller is not a provider")]
    NotProvider,

    // Availability
    #[error("Exchange is paused")]
    Paused,

    // Rate
    #[error("Cooldown active until {ready_at}")]
    CooldownActive { ready_at: u64 },

    // Lifecycle
    #[error("Invalid batch state for batch {0}")]
    InvalidBatch(BatchId),

    // Data integrity
    #[error("Ciphertext not initialized")]
    NotInitialized,

    // Oracle protocol
    #[error("Decryption state mismatch")]
    InvalidState,

    #[error("Invalid decryption proof")]
    InvalidProof,

    #[error("Decryption request already processed")]
    ReplayDetected,

    #[error("Unknown decryption request: {0}")]
    UnknownRequest(RequestId),

    #[error("Malformed cleartext: {0}")]
    MalformedCleartext(String),

    // Capabilities
    #[error("FHE error: {0}")]
    Fhe(#[from] FheError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),
}
