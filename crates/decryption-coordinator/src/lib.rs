//! Threshold decryption oracle.
//!
//! Serves the exchange's decryption requests:
//! 1. [`DecryptionGateway`] records requests and verifies response proofs
//! 2. The [`KmsCommittee`] decrypts the requested handles
//! 3. [`DecryptionCoordinator`] collects the members' partial signatures over
//!    the response and aggregates them into the proof
//!
//! [`fulfil_pending`] drives steps 2 and 3 for every pending request.

pub mod committee;
pub mod coordinator;
pub mod error;
pub mod gateway;

use adx_crypto::decryption_digest;
use adx_fhe::Decryptor;
use adx_types::{cleartext, CallbackSelector, DecryptionProof, RequestId};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use committee::{KmsCommittee, KmsMember};
pub use coordinator::{DecryptionCoordinator, SigningRequest, SigningState};
pub use error::CoordinatorError;
pub use gateway::{DecryptionGateway, GatewayRequest, RequestStatus};

/// A signed oracle response, ready for delivery to its callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionResponse {
    pub request_id: RequestId,
    pub callback: CallbackSelector,
    /// One 32-byte big-endian word per requested handle
    pub cleartexts: Vec<u8>,
    pub proof: DecryptionProof,
}

/// Decrypt and sign every pending request.
///
/// Requests that cannot be decrypted are marked failed and produce no
/// response.
pub fn fulfil_pending<D, R>(
    gateway: &mut DecryptionGateway,
    committee: &KmsCommittee,
    decryptor: &D,
    rng: &mut R,
) -> Vec<DecryptionResponse>
where
    D: Decryptor + ?Sized,
    R: RngCore + CryptoRng,
{
    let mut coordinator = DecryptionCoordinator::for_committee(committee);
    let mut responses = Vec::new();

    for request in gateway.pending() {
        match respond(&mut coordinator, committee, decryptor, &request, rng) {
            Ok(response) => {
                gateway.set_status(request.request_id, RequestStatus::Fulfilled);
                info!(
                    request_id = request.request_id,
                    words = request.handles.len(),
                    "Fulfilled decryption request"
                );
                responses.push(response);
            }
            Err(e) => {
                warn!(request_id = request.request_id, error = %e, "Decryption request failed");
                gateway.set_status(request.request_id, RequestStatus::Failed(e.to_string()));
            }
        }
    }

    responses
}

fn respond<D, R>(
    coordinator: &mut DecryptionCoordinator,
    committee: &KmsCommittee,
    decryptor: &D,
    request: &GatewayRequest,
    rng: &mut R,
) -> Result<DecryptionResponse, CoordinatorError>
where
    D: Decryptor + ?Sized,
    R: RngCore + CryptoRng,
{
    let values = request
        .handles
        .iter()
        .map(|handle| decryptor.decrypt_u64(handle))
        .collect::<Result<Vec<u64>, _>>()?;
    let cleartexts = cleartext::encode_words(&values);

    let digest = decryption_digest(
        request.request_id,
        &request.handles,
        &request.callback,
        &cleartexts,
    );
    coordinator.start_signing(request.request_id, digest.to_vec())?;

    for member in committee.members() {
        let share = member.sign_partial(&digest, rng);
        if coordinator.submit_share(request.request_id, share)? == SigningState::Ready {
            break;
        }
    }

    let signature = coordinator.aggregate(request.request_id)?;

    Ok(DecryptionResponse {
        request_id: request.request_id,
        callback: request.callback,
        cleartexts,
        proof: DecryptionProof(signature.0.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use adx_fhe::{DecryptionOracle, MockCoprocessor};
    use adx_types::CiphertextHandle;
    use rand::rngs::OsRng;

    fn setup() -> (KmsCommittee, DecryptionGateway, MockCoprocessor) {
        let committee = KmsCommittee::generate(2, 3, &mut OsRng).unwrap();
        let gateway = DecryptionGateway::new(committee.master_public_key().clone());
        (committee, gateway, MockCoprocessor::new())
    }

    #[test]
    fn test_fulfil_pending_produces_verifiable_response() {
        let (committee, mut gateway, fhe) = setup();
        let selector = CallbackSelector([1, 2, 3, 4]);
        let id = gateway
            .request_decryption(vec![fhe.encrypt_u64(30)], selector)
            .unwrap();

        let responses = fulfil_pending(&mut gateway, &committee, &fhe, &mut OsRng);
        assert_eq!(responses.len(), 1);

        let response = &responses[0];
        assert_eq!(response.request_id, id);
        assert_eq!(response.callback, selector);
        assert_eq!(response.cleartexts, cleartext::encode_words(&[30]));
        assert!(gateway.verify_signatures(id, &response.cleartexts, &response.proof));
        assert_eq!(gateway.get(id).unwrap().status, RequestStatus::Fulfilled);

        // Nothing left to do
        assert!(fulfil_pending(&mut gateway, &committee, &fhe, &mut OsRng).is_empty());
    }

    #[test]
    fn test_multiple_handles_in_order() {
        let (committee, mut gateway, fhe) = setup();
        let handles = vec![fhe.encrypt_u64(5), fhe.encrypt_u64(9)];
        gateway
            .request_decryption(handles, CallbackSelector([0; 4]))
            .unwrap();

        let responses = fulfil_pending(&mut gateway, &committee, &fhe, &mut OsRng);
        assert_eq!(responses[0].cleartexts, cleartext::encode_words(&[5, 9]));
    }

    #[test]
    fn test_undecryptable_request_marked_failed() {
        let (committee, mut gateway, fhe) = setup();
        let bad = gateway
            .request_decryption(vec![CiphertextHandle([9u8; 32])], CallbackSelector([0; 4]))
            .unwrap();
        let good = gateway
            .request_decryption(vec![fhe.encrypt_u64(1)], CallbackSelector([0; 4]))
            .unwrap();

        let responses = fulfil_pending(&mut gateway, &committee, &fhe, &mut OsRng);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].request_id, good);
        assert!(matches!(
            gateway.get(bad).unwrap().status,
            RequestStatus::Failed(_)
        ));
    }

    #[test]
    fn test_proof_from_other_committee_rejected() {
        let (committee, mut gateway, fhe) = setup();
        let id = gateway
            .request_decryption(vec![fhe.encrypt_u64(3)], CallbackSelector([0; 4]))
            .unwrap();

        let rogue = KmsCommittee::generate(2, 3, &mut OsRng).unwrap();
        let mut rogue_gateway = gateway.clone();
        let responses = fulfil_pending(&mut rogue_gateway, &rogue, &fhe, &mut OsRng);

        let response = &responses[0];
        assert!(!gateway.verify_signatures(id, &response.cleartexts, &response.proof));
        assert_eq!(fulfil_pending(&mut gateway, &committee, &fhe, &mut OsRng).len(), 1);
    }
}
