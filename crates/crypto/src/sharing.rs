//! Shamir sharing of the committee master secret.

use bls12_381::Scalar;
use ff::Field;
use rand::{CryptoRng, RngCore};

use crate::bls::random_scalar;
use crate::error::CryptoError;

/// A member's share of the master secret, evaluated at `index` (1-based).
#[derive(Clone, Debug)]
pub struct SecretShare {
    pub index: u32,
    pub value: Scalar,
}

/// Split `secret` into `members` shares, any `threshold` of which reconstruct it.
///
/// Samples f(x) = s + a_1·x + ... + a_{t-1}·x^{t-1} and hands member i the
/// evaluation f(i).
pub fn split_secret<R: RngCore + CryptoRng>(
    secret: &Scalar,
    threshold: usize,
    members: usize,
    rng: &mut R,
) -> Result<Vec<SecretShare>, CryptoError> {
    if threshold == 0 || threshold > members || members > u32::MAX as usize {
        return Err(CryptoError::InvalidSharingParameters { threshold, members });
    }

    let mut coefficients = Vec::with_capacity(threshold);
    coefficients.push(*secret);
    for _ in 1..threshold {
        coefficients.push(random_scalar(rng));
    }

    Ok((1..=members as u32)
        .map(|index| SecretShare {
            index,
            value: evaluate_polynomial(&coefficients, &Scalar::from(index as u64)),
        })
        .collect())
}

/// Horner evaluation of the polynomial with the given coefficients.
fn evaluate_polynomial(coefficients: &[Scalar], x: &Scalar) -> Scalar {
    coefficients
        .iter()
        .rev()
        .fold(Scalar::ZERO, |acc, coeff| acc * x + coeff)
}
