//! Threshold signing coordinator.
//!
//! Coordinates the committee's signature over a decryption response by:
//! 1. Collecting partial signatures from members
//! 2. Verifying the DLEQ proof on each partial
//! 3. Aggregating once the threshold is met

use std::collections::{BTreeMap, HashMap};

use adx_crypto::{aggregate_partial_signatures, verify_partial_signature};
use adx_types::{G1Point, PartialSignatureShare, RequestId};
use tracing::{debug, info, warn};

use crate::committee::KmsCommittee;
use crate::error::CoordinatorError;

/// State of a signing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningState {
    /// Collecting partial signatures
    Collecting,
    /// Threshold met, ready to aggregate
    Ready,
    /// Aggregate signature produced
    Completed,
}

/// A single response being signed.
#[derive(Debug, Clone)]
pub struct SigningRequest {
    pub request_id: RequestId,
    /// Digest the committee signs
    pub message: Vec<u8>,
    /// Verified partials by member index
    pub shares: BTreeMap<u32, PartialSignatureShare>,
    pub state: SigningState,
    pub threshold: usize,
}

impl SigningRequest {
    pub fn threshold_met(&self) -> bool {
        self.shares.len() >= self.threshold
    }
}

/// Collects and aggregates committee partial signatures.
#[derive(Debug)]
pub struct DecryptionCoordinator {
    requests: HashMap<RequestId, SigningRequest>,
    /// Public key shares of members (index -> pk)
    member_public_keys: HashMap<u32, G1Point>,
    threshold: usize,
}

impl DecryptionCoordinator {
    pub fn new(threshold: usize) -> Self {
        Self {
            requests: HashMap::new(),
            member_public_keys: HashMap::new(),
            threshold,
        }
    }

    /// Coordinator preloaded with every member of `committee`.
    pub fn for_committee(committee: &KmsCommittee) -> Self {
        let mut coordinator = Self::new(committee.threshold());
        for (index, public_key) in committee.public_keys() {
            coordinator.register_member(index, public_key.clone());
        }
        coordinator
    }

    /// Register a member's public key share.
    pub fn register_member(&mut self, index: u32, public_key: G1Point) {
        debug!(member_index = index, "Registered member public key");
        self.member_public_keys.insert(index, public_key);
    }

    /// Open a signing round for `request_id` over `message`.
    pub fn start_signing(
        &mut self,
        request_id: RequestId,
        message: Vec<u8>,
    ) -> Result<(), CoordinatorError> {
        if self.requests.contains_key(&request_id) {
            return Err(CoordinatorError::AlreadyStarted(request_id));
        }

        self.requests.insert(
            request_id,
            SigningRequest {
                request_id,
                message,
                shares: BTreeMap::new(),
                state: SigningState::Collecting,
                threshold: self.threshold,
            },
        );
        debug!(request_id, "Started signing round");
        Ok(())
    }

    /// Submit a partial signature.
    pub fn submit_share(
        &mut self,
        request_id: RequestId,
        share: PartialSignatureShare,
    ) -> Result<SigningState, CoordinatorError> {
        let member_index = share.member_index;

        let request = self
            .requests
            .get_mut(&request_id)
            .ok_or(CoordinatorError::UnknownRequest(request_id))?;

        if request.shares.contains_key(&member_index) {
            return Err(CoordinatorError::DuplicateShare(member_index));
        }

        let member_pk = self
            .member_public_keys
            .get(&member_index)
            .ok_or(CoordinatorError::UnknownMember(member_index))?;

        if verify_partial_signature(&share, &request.message, member_pk).is_err() {
            warn!(member_index, request_id, "Invalid DLEQ proof");
            return Err(CoordinatorError::InvalidProof(member_index));
        }

        request.shares.insert(member_index, share);
        debug!(
            member_index,
            request_id,
            shares_collected = request.shares.len(),
            threshold = request.threshold,
            "Accepted partial signature"
        );

        if request.state == SigningState::Collecting && request.threshold_met() {
            request.state = SigningState::Ready;
        }

        Ok(request.state.clone())
    }

    /// Combine the collected partials into the aggregate signature.
    pub fn aggregate(&mut self, request_id: RequestId) -> Result<G1Point, CoordinatorError> {
        let request = self
            .requests
            .get_mut(&request_id)
            .ok_or(CoordinatorError::UnknownRequest(request_id))?;

        if !request.threshold_met() {
            return Err(CoordinatorError::ThresholdNotMet {
                have: request.shares.len(),
                need: request.threshold,
            });
        }

        let shares: Vec<(u32, G1Point)> = request
            .shares
            .iter()
            .take(request.threshold)
            .map(|(idx, share)| (*idx, share.partial_sig.clone()))
            .collect();

        let signature = aggregate_partial_signatures(&shares, request.threshold)?;
        request.state = SigningState::Completed;

        info!(request_id, signers = shares.len(), "Aggregated response signature");
        Ok(signature)
    }

    pub fn get_state(&self, request_id: RequestId) -> Option<SigningState> {
        self.requests.get(&request_id).map(|r| r.state.clone())
    }

    /// Requests that have not produced a signature yet.
    pub fn pending_requests(&self) -> Vec<RequestId> {
        let mut pending: Vec<RequestId> = self
            .requests
            .values()
            .filter(|r| r.state != SigningState::Completed)
            .map(|r| r.request_id)
            .collect();
        pending.sort_unstable();
        pending
    }

    pub fn remove_request(&mut self, request_id: RequestId) -> Option<SigningRequest> {
        self.requests.remove(&request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adx_crypto::{decryption_digest, verify_aggregate_signature};
    use adx_types::{CallbackSelector, CiphertextHandle};
    use rand::rngs::OsRng;

    fn setup(threshold: usize, size: usize) -> (KmsCommittee, DecryptionCoordinator) {
        let committee = KmsCommittee::generate(threshold, size, &mut OsRng).unwrap();
        let coordinator = DecryptionCoordinator::for_committee(&committee);
        (committee, coordinator)
    }

    #[test]
    fn test_threshold_signature_verifies() {
        let (committee, mut coordinator) = setup(2, 3);
        let digest = decryption_digest(
            1,
            &[CiphertextHandle([1u8; 32])],
            &CallbackSelector([0; 4]),
            &[0u8; 32],
        );
        coordinator.start_signing(1, digest.to_vec()).unwrap();

        let members = committee.members();
        assert_eq!(
            coordinator.submit_share(1, members[0].sign_partial(&digest, &mut OsRng)),
            Ok(SigningState::Collecting)
        );
        assert_eq!(
            coordinator.submit_share(1, members[2].sign_partial(&digest, &mut OsRng)),
            Ok(SigningState::Ready)
        );

        let signature = coordinator.aggregate(1).unwrap();
        assert!(
            verify_aggregate_signature(&digest, &signature, committee.master_public_key()).is_ok()
        );
        assert_eq!(coordinator.get_state(1), Some(SigningState::Completed));
        assert!(coordinator.pending_requests().is_empty());
    }

    #[test]
    fn test_duplicate_share_rejected() {
        let (committee, mut coordinator) = setup(2, 3);
        coordinator.start_signing(1, b"digest".to_vec()).unwrap();

        let member = &committee.members()[0];
        coordinator
            .submit_share(1, member.sign_partial(b"digest", &mut OsRng))
            .unwrap();
        assert_eq!(
            coordinator.submit_share(1, member.sign_partial(b"digest", &mut OsRng)),
            Err(CoordinatorError::DuplicateShare(1))
        );
    }

    #[test]
    fn test_share_over_other_message_rejected() {
        let (committee, mut coordinator) = setup(2, 3);
        coordinator.start_signing(1, b"digest".to_vec()).unwrap();

        let share = committee.members()[1].sign_partial(b"something else", &mut OsRng);
        assert_eq!(
            coordinator.submit_share(1, share),
            Err(CoordinatorError::InvalidProof(2))
        );
        assert_eq!(coordinator.get_state(1), Some(SigningState::Collecting));
    }

    #[test]
    fn test_unknown_member_rejected() {
        let (committee, _) = setup(2, 3);
        let mut coordinator = DecryptionCoordinator::new(2);
        coordinator.start_signing(1, b"digest".to_vec()).unwrap();

        let share = committee.members()[0].sign_partial(b"digest", &mut OsRng);
        assert_eq!(
            coordinator.submit_share(1, share),
            Err(CoordinatorError::UnknownMember(1))
        );
    }

    #[test]
    fn test_threshold_not_met() {
        let (_, mut coordinator) = setup(3, 5);
        coordinator.start_signing(9, b"digest".to_vec()).unwrap();

        assert_eq!(
            coordinator.aggregate(9),
            Err(CoordinatorError::ThresholdNotMet { have: 0, need: 3 })
        );
        assert_eq!(coordinator.pending_requests(), vec![9]);
    }

    #[test]
    fn test_unknown_request_and_restart() {
        let (committee, mut coordinator) = setup(2, 3);
        let share = committee.members()[0].sign_partial(b"digest", &mut OsRng);
        assert_eq!(
            coordinator.submit_share(4, share),
            Err(CoordinatorError::UnknownRequest(4))
        );

        coordinator.start_signing(4, b"digest".to_vec()).unwrap();
        assert_eq!(
            coordinator.start_signing(4, b"digest".to_vec()),
            Err(CoordinatorError::AlreadyStarted(4))
        );
        assert!(coordinator.remove_request(4).is_some());
    }
}
