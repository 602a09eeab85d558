//! The key management committee that signs decryption responses.

use adx_crypto::bls::{g1_public_key, g2_public_key, random_scalar};
use adx_crypto::{generate_partial_signature, split_secret};
use adx_types::{G1Point, G2Point, PartialSignatureShare};
use bls12_381::Scalar;
use rand::{CryptoRng, RngCore};
use tracing::info;

use crate::error::CoordinatorError;

/// One committee member holding a share of the master secret.
#[derive(Clone)]
pub struct KmsMember {
    /// 1-based Shamir index
    pub index: u32,
    pub public_key: G1Point,
    secret_share: Scalar,
}

impl KmsMember {
    /// Sign `message` with this member's share, attaching a DLEQ proof.
    pub fn sign_partial<R: RngCore + CryptoRng>(
        &self,
        message: &[u8],
        rng: &mut R,
    ) -> PartialSignatureShare {
        generate_partial_signature(&self.secret_share, message, self.index, rng)
    }
}

impl std::fmt::Debug for KmsMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KmsMember")
            .field("index", &self.index)
            .field("public_key", &hex::encode(self.public_key.0))
            .finish_non_exhaustive()
    }
}

/// A t-of-n committee. Any `threshold` members can produce a signature that
/// verifies under the master public key.
#[derive(Debug, Clone)]
pub struct KmsCommittee {
    threshold: usize,
    members: Vec<KmsMember>,
    master_public_key: G2Point,
}

impl KmsCommittee {
    /// Deal a fresh master secret to `size` members.
    ///
    /// The dealer discards the master secret once shares are handed out.
    pub fn generate<R: RngCore + CryptoRng>(
        threshold: usize,
        size: usize,
        rng: &mut R,
    ) -> Result<Self, CoordinatorError> {
        let master_secret = random_scalar(rng);
        let shares = split_secret(&master_secret, threshold, size, rng)?;

        let members = shares
            .into_iter()
            .map(|share| KmsMember {
                index: share.index,
                public_key: g1_public_key(&share.value),
                secret_share: share.value,
            })
            .collect();
        let master_public_key = g2_public_key(&master_secret);

        info!(
            threshold,
            size,
            master_public_key = %hex::encode(master_public_key.0),
            "Generated KMS committee"
        );

        Ok(Self {
            threshold,
            members,
            master_public_key,
        })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> &[KmsMember] {
        &self.members
    }

    pub fn master_public_key(&self) -> &G2Point {
        &self.master_public_key
    }

    /// Member public keys by index.
    pub fn public_keys(&self) -> impl Iterator<Item = (u32, &G1Point)> + '_ {
        self.members.iter().map(|m| (m.index, &m.public_key))
    }
}
