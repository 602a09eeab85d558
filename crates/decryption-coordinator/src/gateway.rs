//! Request ledger of the decryption oracle.
//!
//! The gateway is the half of the oracle the exchange talks to. It accepts
//! requests, hands out ids, and verifies the committee's signature on
//! responses. Producing those responses is [`crate::fulfil_pending`]'s job.

use std::collections::BTreeMap;

use adx_crypto::{decryption_digest, signature_from_bytes, verify_aggregate_signature};
use adx_fhe::{DecryptionOracle, OracleError};
use adx_types::{CallbackSelector, CiphertextHandle, DecryptionProof, G2Point, RequestId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Lifecycle of a gateway request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Fulfilled,
    /// Decryption could not be produced
    Failed(String),
}

/// A decryption request as recorded by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub request_id: RequestId,
    pub handles: Vec<CiphertextHandle>,
    pub callback: CallbackSelector,
    pub status: RequestStatus,
}

/// Oracle endpoint holding the committee's master public key.
#[derive(Debug, Clone)]
pub struct DecryptionGateway {
    master_public_key: G2Point,
    last_request_id: RequestId,
    requests: BTreeMap<RequestId, GatewayRequest>,
}

impl DecryptionGateway {
    pub fn new(master_public_key: G2Point) -> Self {
        Self {
            master_public_key,
            last_request_id: 0,
            requests: BTreeMap::new(),
        }
    }

    pub fn master_public_key(&self) -> &G2Point {
        &self.master_public_key
    }

    pub fn get(&self, request_id: RequestId) -> Option<&GatewayRequest> {
        self.requests.get(&request_id)
    }

    /// Pending requests in id order.
    pub fn pending(&self) -> Vec<GatewayRequest> {
        self.requests
            .values()
            .filter(|r| r.status == RequestStatus::Pending)
            .cloned()
            .collect()
    }

    /// Move a request out of `Pending`. Returns false if it was not pending.
    pub fn set_status(&mut self, request_id: RequestId, status: RequestStatus) -> bool {
        match self.requests.get_mut(&request_id) {
            Some(request) if request.status == RequestStatus::Pending => {
                debug!(request_id, status = ?status, "Updated request status");
                request.status = status;
                true
            }
            _ => false,
        }
    }
}

impl DecryptionOracle for DecryptionGateway {
    fn request_decryption(
        &mut self,
        handles: Vec<CiphertextHandle>,
        callback: CallbackSelector,
    ) -> Result<RequestId, OracleError> {
        if handles.is_empty() {
            return Err(OracleError::EmptyRequest);
        }

        let request_id = self
            .last_request_id
            .checked_add(1)
            .ok_or(OracleError::RequestLimit)?;
        self.last_request_id = request_id;

        info!(
            request_id,
            handles = handles.len(),
            callback = %hex::encode(callback.0),
            "Accepted decryption request"
        );

        self.requests.insert(
            request_id,
            GatewayRequest {
                request_id,
                handles,
                callback,
                status: RequestStatus::Pending,
            },
        );
        Ok(request_id)
    }

    fn verify_signatures(
        &self,
        request_id: RequestId,
        cleartexts: &[u8],
        proof: &DecryptionProof,
    ) -> bool {
        let Some(request) = self.requests.get(&request_id) else {
            return false;
        };

        let Ok(signature) = signature_from_bytes(&proof.0) else {
            return false;
        };

        let digest =
            decryption_digest(request_id, &request.handles, &request.callback, cleartexts);
        verify_aggregate_signature(&digest, &signature, &self.master_public_key).is_ok()
    }
}
