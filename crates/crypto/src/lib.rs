//! Threshold BLS signatures for the decryption committee.
//!
//! The committee that performs threshold decryption also authenticates every
//! decryption response:
//!
//! 1. **Setup**: a master secret `s` is Shamir-shared among `n` members; any
//!    `t` of them can sign. The master public key is `MPK = s·G2`.
//!
//! 2. **Partial signing**: for a response digest `m`, member i computes
//!    σ_i = sk_i · H(m) together with a DLEQ proof tying σ_i to its public
//!    key pk_i = sk_i · G1.
//!
//! 3. **Aggregation**: any `t` verified partials combine into σ = Σ λ_i · σ_i.
//!
//! 4. **Verification**: anyone holding `MPK` checks e(σ, G2) = e(H(m), MPK).

pub mod bls;
pub mod error;
pub mod sharing;
pub mod signature;
pub mod threshold;

pub use error::CryptoError;
pub use sharing::{split_secret, SecretShare};
pub use signature::{
    decryption_digest, sign_message, signature_from_bytes, verify_aggregate_signature,
};
pub use threshold::{
    aggregate_partial_signatures, generate_partial_signature, verify_partial_signature,
};
