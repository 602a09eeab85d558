//! Capability boundary to the external FHE library and decryption oracle.
//!
//! The exchange never performs homomorphic arithmetic itself. It consumes two
//! narrow capabilities:
//!
//! - [`FheExecutor`]: validity checks and encrypted comparison over opaque
//!   ciphertext handles.
//! - [`DecryptionOracle`]: asynchronous threshold decryption with verifiable
//!   responses.
//!
//! [`mock::MockCoprocessor`] is an in-memory stand-in for the coprocessor used
//! by tests and the development chain.

pub mod error;
pub mod mock;
pub mod oracle;

use adx_types::{CiphertextHandle, EncryptedBool};

pub use error::{FheError, OracleError};
pub use mock::MockCoprocessor;
pub use oracle::DecryptionOracle;

/// Operations the exchange may perform on encrypted integers.
pub trait FheExecutor {
    /// Whether `handle` refers to a validly formed ciphertext.
    fn is_initialized(&self, handle: &CiphertextHandle) -> bool;

    /// Homomorphic `lhs >= rhs`, yielding an encrypted boolean.
    fn ge(&self, lhs: &CiphertextHandle, rhs: &CiphertextHandle) -> Result<EncryptedBool, FheError>;

    /// Convert an encrypted boolean to a native one for branching.
    fn decrypt_bool(&self, value: &EncryptedBool) -> Result<bool, FheError>;
}

/// Off-platform access to the plaintext behind a handle. Only the decryption
/// oracle holds this capability.
pub trait Decryptor {
    fn decrypt_u64(&self, handle: &CiphertextHandle) -> Result<u64, FheError>;
}
