//! Threshold BLS partial signatures.
//!
//! In a (t, n) committee each member holds a share sk_i of the master secret.
//! For a message `m`, member i produces σ_i = sk_i · H(m) and a Chaum-Pedersen
//! DLEQ proof that log_G1(pk_i) = log_H(m)(σ_i). Any t verified partials
//! combine into σ = Σ λ_i · σ_i, where λ_i are Lagrange coefficients at x = 0.

use std::collections::HashSet;

use bls12_381::{G1Affine, G1Projective, Scalar};
use ff::Field;
use group::Curve;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use adx_types::{DiscreteLogProof, G1Point, PartialSignatureShare, Scalar as WireScalar};

use crate::bls::{compress_g1, decompress_g1, hash_to_g1, random_scalar};
use crate::error::CryptoError;

/// Produce member `member_index`'s partial signature over `message`.
pub fn generate_partial_signature<R: RngCore + CryptoRng>(
    secret_share: &Scalar,
    message: &[u8],
    member_index: u32,
    rng: &mut R,
) -> PartialSignatureShare {
    let h = hash_to_g1(message);
    let public_key = (G1Projective::generator() * secret_share).to_affine();
    let partial_sig = (G1Projective::from(h) * secret_share).to_affine();
    let proof = prove_dleq(secret_share, &h, &public_key, &partial_sig, rng);

    PartialSignatureShare {
        member_index,
        partial_sig: compress_g1(&partial_sig),
        proof,
    }
}

/// Verify a partial signature against the member's public key share.
pub fn verify_partial_signature(
    share: &PartialSignatureShare,
    message: &[u8],
    public_key: &G1Point,
) -> Result<(), CryptoError> {
    let pk = decompress_g1(&public_key.0)?;
    let partial_sig = decompress_g1(&share.partial_sig.0)?;
    let h = hash_to_g1(message);

    verify_dleq(&share.proof, &h, &pk, &partial_sig)
}

/// Combine at least `threshold` partial signatures into the full signature.
pub fn aggregate_partial_signatures(
    shares: &[(u32, G1Point)],
    threshold: usize,
) -> Result<G1Point, CryptoError> {
    if shares.len() < threshold {
        return Err(CryptoError::InsufficientShares {
            required: threshold,
            got: shares.len(),
        });
    }

    let unique: HashSet<u32> = shares.iter().map(|(idx, _)| *idx).collect();
    if unique.len() != shares.len() {
        return Err(CryptoError::DuplicateShareIndex);
    }

    let indices: Vec<u32> = shares.iter().map(|(idx, _)| *idx).collect();
    let mut result = G1Projective::identity();
    for (idx, sig_point) in shares {
        let sig = decompress_g1(&sig_point.0)?;
        result += G1Projective::from(sig) * lagrange_coefficient(*idx, &indices)?;
    }

    Ok(compress_g1(&result.to_affine()))
}

/// Lagrange coefficient at x = 0 for index `i` over `indices`:
/// λ_i = Π_{j≠i} x_j / (x_j - x_i).
pub(crate) fn lagrange_coefficient(i: u32, indices: &[u32]) -> Result<Scalar, CryptoError> {
    let x_i = Scalar::from(i as u64);
    let mut numerator = Scalar::ONE;
    let mut denominator = Scalar::ONE;

    for &j in indices.iter().filter(|&&j| j != i) {
        let x_j = Scalar::from(j as u64);
        numerator *= x_j;
        denominator *= x_j - x_i;
    }

    Option::from(denominator.invert())
        .map(|inv: Scalar| numerator * inv)
        .ok_or(CryptoError::LagrangeInterpolationFailed)
}

fn prove_dleq<R: RngCore + CryptoRng>(
    secret: &Scalar,
    h: &G1Affine,
    pk: &G1Affine,
    sig: &G1Affine,
    rng: &mut R,
) -> DiscreteLogProof {
    let k = random_scalar(rng);
    let r1 = (G1Projective::generator() * k).to_affine();
    let r2 = (G1Projective::from(*h) * k).to_affine();

    let c = dleq_challenge(h, pk, sig, &r1, &r2);
    let s = k - c * secret;

    DiscreteLogProof {
        challenge: WireScalar(c.to_bytes()),
        response: WireScalar(s.to_bytes()),
    }
}

fn verify_dleq(
    proof: &DiscreteLogProof,
    h: &G1Affine,
    pk: &G1Affine,
    sig: &G1Affine,
) -> Result<(), CryptoError> {
    let c = decode_scalar(&proof.challenge)?;
    let s = decode_scalar(&proof.response)?;

    // r1 = g^s · pk^c, r2 = h^s · sig^c
    let r1 = (G1Projective::generator() * s + G1Projective::from(*pk) * c).to_affine();
    let r2 = (G1Projective::from(*h) * s + G1Projective::from(*sig) * c).to_affine();

    if dleq_challenge(h, pk, sig, &r1, &r2) == c {
        Ok(())
    } else {
        Err(CryptoError::DleqVerificationFailed)
    }
}

fn dleq_challenge(
    h: &G1Affine,
    pk: &G1Affine,
    sig: &G1Affine,
    r1: &G1Affine,
    r2: &G1Affine,
) -> Scalar {
    let mut hasher = Sha256::new();
    hasher.update(b"ADX_KMS_DLEQ_V1");
    for point in [&G1Affine::generator(), h, pk, sig, r1, r2] {
        hasher.update(point.to_compressed());
    }

    let mut wide = [0u8; 64];
    wide[..32].copy_from_slice(&hasher.finalize());
    Scalar::from_bytes_wide(&wide)
}

fn decode_scalar(scalar: &WireScalar) -> Result<Scalar, CryptoError> {
    Option::from(Scalar::from_bytes(&scalar.0)).ok_or(CryptoError::DleqVerificationFailed)
}
