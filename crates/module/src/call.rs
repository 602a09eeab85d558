//! Call message types for the exchange module.

use adx_types::{
    Address, AuctionOutcome, BatchId, CiphertextHandle, DecryptionProof, RequestId,
};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Call messages for the exchange module.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub enum AuctionCall {
    // === Access Control ===
    /// Hand ownership to another address.
    TransferOwnership { new_owner: Address },

    /// Grant the provider role.
    AddProvider { provider: Address },

    /// Revoke the provider role.
    RemoveProvider { provider: Address },

    /// Toggle the global pause switch.
    SetPaused { paused: bool },

    /// Set the cooldown shared by both rate limiters.
    SetCooldownSeconds { cooldown_seconds: u64 },

    // === Batch Lifecycle ===
    OpenBatch { batch_id: BatchId },

    CloseBatch { batch_id: BatchId },

    /// Submit a sealed bid (any caller).
    SubmitBid {
        batch_id: BatchId,
        encrypted_bid_amount: CiphertextHandle,
        encrypted_targeting_score: CiphertextHandle,
    },

    // === Decryption ===
    /// Ask the oracle to reveal the winning amount of a closed batch.
    RequestAuctionResultDecryption { batch_id: BatchId },

    /// Oracle response (anyone may deliver it).
    DecryptionCallback {
        request_id: RequestId,
        cleartexts: Vec<u8>,
        proof: DecryptionProof,
    },
}

impl AuctionCall {
    /// Method name, used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            AuctionCall::TransferOwnership { .. } => "transferOwnership",
            AuctionCall::AddProvider { .. } => "addProvider",
            AuctionCall::RemoveProvider { .. } => "removeProvider",
            AuctionCall::SetPaused { .. } => "setPaused",
            AuctionCall::SetCooldownSeconds { .. } => "setCooldownSeconds",
            AuctionCall::OpenBatch { .. } => "openBatch",
            AuctionCall::CloseBatch { .. } => "closeBatch",
            AuctionCall::SubmitBid { .. } => "submitBid",
            AuctionCall::RequestAuctionResultDecryption { .. } => "requestAuctionResultDecryption",
            AuctionCall::DecryptionCallback { .. } => "decryptionCallback",
        }
    }
}

/// Return value of a dispatched call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutput {
    Unit,
    /// Position of the appended bid within its batch
    BidIndex(usize),
    RequestId(RequestId),
    Outcome(AuctionOutcome),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_borsh_encoding() {
        let call = AuctionCall::SubmitBid {
            batch_id: 7,
            encrypted_bid_amount: CiphertextHandle([1u8; 32]),
            encrypted_targeting_score: CiphertextHandle([2u8; 32]),
        };

        let bytes = borsh::to_vec(&call).unwrap();
        let decoded = AuctionCall::try_from_slice(&bytes).unwrap();
        assert!(matches!(
            decoded,
            AuctionCall::SubmitBid { batch_id: 7, .. }
        ));
        assert_eq!(decoded.name(), "submitBid");
    }
}
