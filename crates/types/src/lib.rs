//! Core type definitions for the sealed-bid batch exchange.
//!
//! This crate provides the shared data structures used across the exchange,
//! including ciphertext handles, batches and bids, decryption contexts, the
//! event log, and the wire types of the decryption committee's signatures.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub mod cleartext;
pub mod events;

pub use events::AuctionEvent;

// =========================
// CRYPTOGRAPHIC PRIMITIVES
// =========================

/// Compressed G1 point on BLS12-381 (48 bytes)
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct G1Point(#[serde_as(as = "[_; 48]")] pub [u8; 48]);

impl Default for G1Point {
    fn default() -> Self {
        Self([0u8; 48])
    }
}

/// Compressed G2 point on BLS12-381 (96 bytes)
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct G2Point(#[serde_as(as = "[_; 96]")] pub [u8; 96]);

impl Default for G2Point {
    fn default() -> Self {
        Self([0u8; 96])
    }
}

/// Scalar field element (32 bytes, little-endian)
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Scalar(pub [u8; 32]);

/// DLEQ proof that a partial signature was produced with the member's key share
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct DiscreteLogProof {
    pub challenge: Scalar,
    pub response: Scalar,
}

/// Partial signature from one decryption committee member
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct PartialSignatureShare {
    pub member_index: u32,
    pub partial_sig: G1Point,
    pub proof: DiscreteLogProof,
}

// =========================
// ADDRESSES AND IDENTIFIERS
// =========================

/// EVM-style account address (20 bytes)
pub type Address = [u8; 20];

/// The all-zero address, never a valid role holder.
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// Caller-supplied batch identifier.
pub type BatchId = u64;

/// Oracle-assigned decryption request identifier.
pub type RequestId = u64;

/// Errors raised when parsing hex-encoded identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

/// Parse a `0x`-prefixed (or bare) hex string into a fixed-size byte array.
pub fn parse_fixed_hex<const N: usize>(s: &str) -> Result<[u8; N], ParseError> {
    let bytes = hex::decode(s.trim().trim_start_matches("0x"))
        .map_err(|e| ParseError::InvalidHex(e.to_string()))?;
    let got = bytes.len();
    bytes
        .try_into()
        .map_err(|_| ParseError::InvalidLength { expected: N, got })
}

/// Parse an address from hex.
pub fn parse_address(s: &str) -> Result<Address, ParseError> {
    parse_fixed_hex::<20>(s)
}

/// Render an address as `0x`-prefixed hex.
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

// =========================
// CIPHERTEXT HANDLES
// =========================

/// Opaque handle to an encrypted unsigned integer held by the FHE coprocessor.
///
/// The exchange never sees the value behind a handle; it only stores handles,
/// hands them to the coprocessor for comparison, and serializes them for
/// hashing and decryption requests.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct CiphertextHandle(pub [u8; 32]);

impl CiphertextHandle {
    /// The zero handle, which never refers to an initialized ciphertext.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Fixed-size binary form used for hashing and oracle submission.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, ParseError> {
        parse_fixed_hex::<32>(s).map(Self)
    }
}

/// Opaque handle to an encrypted boolean (result of a homomorphic comparison).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct EncryptedBool(pub CiphertextHandle);

// =========================
// BATCHES AND BIDS
// =========================

/// A sealed bid. Immutable once appended to its batch.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Bid {
    pub encrypted_bid_amount: CiphertextHandle,
    pub encrypted_targeting_score: CiphertextHandle,
    pub bidder: Address,
}

/// Batch lifecycle state. Transitions only `Unopened -> Active -> Closed`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum BatchStatus {
    #[default]
    Unopened,
    Active,
    Closed,
}

/// A bounded round of bidding.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Batch {
    pub status: BatchStatus,
    /// Bids in submission order
    pub bids: Vec<Bid>,
}

impl Batch {
    pub fn is_active(&self) -> bool {
        self.status == BatchStatus::Active
    }

    pub fn is_closed(&self) -> bool {
        self.status == BatchStatus::Closed
    }
}

// =========================
// DECRYPTION
// =========================

/// Selector naming the callback the oracle must invoke.
///
/// Derived as the first four bytes of the SHA-256 digest of the callback's
/// signature string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct CallbackSelector(pub [u8; 4]);

impl CallbackSelector {
    pub fn from_signature(signature: &str) -> Self {
        let digest = Sha256::digest(signature.as_bytes());
        Self([digest[0], digest[1], digest[2], digest[3]])
    }
}

/// Opaque decryption proof. Its format is owned by the oracle.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct DecryptionProof(pub Vec<u8>);

/// Final result of a batch once the winning amount is revealed.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AuctionOutcome {
    pub batch_id: BatchId,
    pub winner: Address,
    pub winning_amount: u64,
}

/// Per-request record binding a decryption request to the batch state it was
/// issued against.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct DecryptionContext {
    pub batch_id: BatchId,
    pub state_hash: [u8; 32],
    /// Flips to true exactly once, when a callback is accepted
    pub processed: bool,
    pub outcome: Option<AuctionOutcome>,
}

impl DecryptionContext {
    pub fn new(batch_id: BatchId, state_hash: [u8; 32]) -> Self {
        Self {
            batch_id,
            state_hash,
            processed: false,
            outcome: None,
        }
    }
}

// =========================
// HELPER FUNCTIONS
// =========================

/// Commitment over the ciphertexts submitted for decryption, bound to the
/// exchange's own address so a context cannot be replayed against another
/// deployment.
pub fn compute_state_hash(handles: &[CiphertextHandle], contract_address: &Address) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"ADX_STATE_HASH_V1");
    for handle in handles {
        hasher.update(handle.to_bytes());
    }
    hasher.update(contract_address);
    hasher.finalize().into()
}
