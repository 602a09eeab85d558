//! In-memory FHE coprocessor.
//!
//! Keeps plaintexts in a handle table and evaluates comparisons in the clear.
//! It honours the same handle discipline as the real coprocessor: every
//! operation mints a fresh handle, handles are typed, and unknown handles are
//! rejected.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use adx_types::{CiphertextHandle, EncryptedBool};
use parking_lot::RwLock;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::FheError;
use crate::{Decryptor, FheExecutor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoredValue {
    Uint(u64),
    Bool(bool),
}

/// Mock coprocessor backing handles with plaintext values.
#[derive(Debug, Default)]
pub struct MockCoprocessor {
    values: RwLock<HashMap<CiphertextHandle, StoredValue>>,
    nonce: AtomicU64,
}

impl MockCoprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encrypt a client input and return its handle.
    pub fn encrypt_u64(&self, value: u64) -> CiphertextHandle {
        let handle = self.mint_handle(b"euint64");
        self.values.write().insert(handle, StoredValue::Uint(value));
        debug!(handle = %handle.to_hex(), "Encrypted input");
        handle
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    fn mint_handle(&self, kind: &[u8]) -> CiphertextHandle {
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);

        let mut hasher = Sha256::new();
        hasher.update(b"ADX_MOCK_HANDLE:");
        hasher.update(kind);
        hasher.update(nonce.to_le_bytes());
        hasher.update(salt);
        CiphertextHandle(hasher.finalize().into())
    }

    fn lookup(&self, handle: &CiphertextHandle) -> Result<StoredValue, FheError> {
        self.values
            .read()
            .get(handle)
            .copied()
            .ok_or_else(|| FheError::UnknownHandle(handle.to_hex()))
    }

    fn lookup_uint(&self, handle: &CiphertextHandle) -> Result<u64, FheError> {
        match self.lookup(handle)? {
            StoredValue::Uint(value) => Ok(value),
            StoredValue::Bool(_) => Err(FheError::TypeMismatch { expected: "euint64" }),
        }
    }
}

impl FheExecutor for MockCoprocessor {
    fn is_initialized(&self, handle: &CiphertextHandle) -> bool {
        !handle.is_zero() && matches!(self.lookup(handle), Ok(StoredValue::Uint(_)))
    }

    fn ge(&self, lhs: &CiphertextHandle, rhs: &CiphertextHandle) -> Result<EncryptedBool, FheError> {
        let result = self.lookup_uint(lhs)? >= self.lookup_uint(rhs)?;
        let handle = self.mint_handle(b"ebool");
        self.values.write().insert(handle, StoredValue::Bool(result));
        Ok(EncryptedBool(handle))
    }

    fn decrypt_bool(&self, value: &EncryptedBool) -> Result<bool, FheError> {
        match self.lookup(&value.0)? {
            StoredValue::Bool(b) => Ok(b),
            StoredValue::Uint(_) => Err(FheError::TypeMismatch { expected: "ebool" }),
        }
    }
}

impl Decryptor for MockCoprocessor {
    fn decrypt_u64(&self, handle: &CiphertextHandle) -> Result<u64, FheError> {
        self.lookup_uint(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_and_decrypt() {
        let fhe = MockCoprocessor::new();
        let handle = fhe.encrypt_u64(42);
        assert!(fhe.is_initialized(&handle));
        assert_eq!(fhe.decrypt_u64(&handle).unwrap(), 42);
    }

    #[test]
    fn test_handles_are_unique() {
        let fhe = MockCoprocessor::new();
        let a = fhe.encrypt_u64(7);
        let b = fhe.encrypt_u64(7);
        assert_ne!(a, b);
        assert_eq!(fhe.len(), 2);
    }

    #[test]
    fn test_ge_comparison() {
        let fhe = MockCoprocessor::new();
        let ten = fhe.encrypt_u64(10);
        let twenty = fhe.encrypt_u64(20);
        let other_ten = fhe.encrypt_u64(10);

        let r = fhe.ge(&twenty, &ten).unwrap();
        assert!(fhe.decrypt_bool(&r).unwrap());

        let r = fhe.ge(&ten, &twenty).unwrap();
        assert!(!fhe.decrypt_bool(&r).unwrap());

        let r = fhe.ge(&other_ten, &ten).unwrap();
        assert!(fhe.decrypt_bool(&r).unwrap());
    }

    #[test]
    fn test_uninitialized_handles() {
        let fhe = MockCoprocessor::new();
        assert!(!fhe.is_initialized(&CiphertextHandle::ZERO));
        assert!(!fhe.is_initialized(&CiphertextHandle([5u8; 32])));
    }

    #[test]
    fn test_bool_handle_is_not_an_integer() {
        let fhe = MockCoprocessor::new();
        let a = fhe.encrypt_u64(1);
        let flag = fhe.ge(&a, &a).unwrap();

        assert!(!fhe.is_initialized(&flag.0));
        assert!(matches!(
            fhe.decrypt_u64(&flag.0),
            Err(FheError::TypeMismatch { expected: "euint64" })
        ));
        assert!(matches!(
            fhe.decrypt_bool(&EncryptedBool(a)),
            Err(FheError::TypeMismatch { expected: "ebool" })
        ));
    }

    #[test]
    fn test_unknown_handle() {
        let fhe = MockCoprocessor::new();
        let known = fhe.encrypt_u64(1);
        assert!(matches!(
            fhe.ge(&known, &CiphertextHandle([3u8; 32])),
            Err(FheError::UnknownHandle(_))
        ));
    }
}
