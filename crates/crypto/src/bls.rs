//! BLS12-381 point encoding and hashing helpers.

use bls12_381::hash_to_curve::{ExpandMsgXmd, HashToCurve};
use bls12_381::{G1Affine, G1Projective, G2Affine, G2Projective, Scalar};
use group::Curve;
use rand::{CryptoRng, RngCore};
use sha2_09::Sha256;

use adx_types::{G1Point, G2Point};

use crate::error::CryptoError;

/// Domain separation tag for committee signatures.
pub const SIGNATURE_DST: &[u8] = b"ADX_KMS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_";

/// Hash a message to G1 (RFC 9380, SSWU with SHA-256).
pub fn hash_to_g1(message: &[u8]) -> G1Affine {
    <G1Projective as HashToCurve<ExpandMsgXmd<Sha256>>>::hash_to_curve(message, SIGNATURE_DST)
        .to_affine()
}

/// Sample a uniformly random scalar.
pub fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut bytes = [0u8; 64];
    rng.fill_bytes(&mut bytes);
    Scalar::from_bytes_wide(&bytes)
}

/// Public key share in G1 for a secret share.
pub fn g1_public_key(secret: &Scalar) -> G1Point {
    compress_g1(&(G1Projective::generator() * secret).to_affine())
}

/// Master public key in G2 for a secret.
pub fn g2_public_key(secret: &Scalar) -> G2Point {
    compress_g2(&(G2Projective::generator() * secret).to_affine())
}

/// Compress a G1 point to bytes.
pub fn compress_g1(point: &G1Affine) -> G1Point {
    G1Point(point.to_compressed())
}

/// Decompress a G1 point from bytes.
pub fn decompress_g1(bytes: &[u8; 48]) -> Result<G1Affine, CryptoError> {
    Option::from(G1Affine::from_compressed(bytes)).ok_or(CryptoError::InvalidG1Point)
}

/// Compress a G2 point to bytes.
pub fn compress_g2(point: &G2Affine) -> G2Point {
    G2Point(point.to_compressed())
}

/// Decompress a G2 point from bytes.
pub fn decompress_g2(bytes: &[u8; 96]) -> Result<G2Affine, CryptoError> {
    Option::from(G2Affine::from_compressed(bytes)).ok_or(CryptoError::InvalidG2Point)
}
