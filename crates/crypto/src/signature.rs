//! Aggregate signature verification for decryption responses.

use bls12_381::{pairing, G1Projective, G2Affine, Scalar};
use group::Curve;
use sha2::{Digest, Sha256};

use adx_types::{CallbackSelector, CiphertextHandle, G1Point, G2Point, RequestId};

use crate::bls::{compress_g1, decompress_g1, decompress_g2, hash_to_g1};
use crate::error::CryptoError;

/// Digest the committee signs for a decryption response.
///
/// Covers the requested handles and callback as well as the cleartexts, so a
/// response only verifies against the request it answers, even when two
/// gateways share a committee and issue the same request id.
pub fn decryption_digest(
    request_id: RequestId,
    handles: &[CiphertextHandle],
    callback: &CallbackSelector,
    cleartexts: &[u8],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"ADX_DECRYPTION_RESPONSE_V2:");
    hasher.update(request_id.to_be_bytes());
    hasher.update((handles.len() as u64).to_be_bytes());
    for handle in handles {
        hasher.update(handle.to_bytes());
    }
    hasher.update(callback.0);
    hasher.update((cleartexts.len() as u64).to_be_bytes());
    hasher.update(cleartexts);
    hasher.finalize().into()
}

/// Sign `message` with a full (non-shared) secret.
pub fn sign_message(secret: &Scalar, message: &[u8]) -> G1Point {
    compress_g1(&(G1Projective::from(hash_to_g1(message)) * secret).to_affine())
}

/// Check e(σ, G2) = e(H(m), MPK).
pub fn verify_aggregate_signature(
    message: &[u8],
    signature: &G1Point,
    master_public_key: &G2Point,
) -> Result<(), CryptoError> {
    let sigma = decompress_g1(&signature.0)?;
    let mpk = decompress_g2(&master_public_key.0)?;
    let h = hash_to_g1(message);

    if pairing(&sigma, &G2Affine::generator()) == pairing(&h, &mpk) {
        Ok(())
    } else {
        Err(CryptoError::SignatureVerificationFailed)
    }
}

/// Decode a signature carried as raw proof bytes.
pub fn signature_from_bytes(bytes: &[u8]) -> Result<G1Point, CryptoError> {
    let raw: [u8; 48] = bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidSignatureLength(bytes.len()))?;
    Ok(G1Point(raw))
}
