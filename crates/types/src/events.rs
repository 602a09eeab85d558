//! Events appended to the exchange's public log.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{Address, BatchId, RequestId};

/// Every externally observable state change. Bid contents never appear here.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum AuctionEvent {
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
    ProviderAdded {
        provider: Address,
    },
    ProviderRemoved {
        provider: Address,
    },
    PausedSet {
        paused: bool,
    },
    CooldownSet {
        cooldown_seconds: u64,
    },
    BatchOpened {
        batch_id: BatchId,
    },
    BatchClosed {
        batch_id: BatchId,
    },
    BidSubmitted {
        bidder: Address,
        batch_id: BatchId,
    },
    DecryptionRequested {
        request_id: RequestId,
        batch_id: BatchId,
    },
    DecryptionCompleted {
        request_id: RequestId,
        batch_id: BatchId,
        winning_amount: u64,
        winner: Address,
    },
}

impl AuctionEvent {
    /// Short event name, used for logging and RPC rendering.
    pub fn name(&self) -> &'static str {
        match self {
            AuctionEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
            AuctionEvent::ProviderAdded { .. } => "ProviderAdded",
            AuctionEvent::ProviderRemoved { .. } => "ProviderRemoved",
            AuctionEvent::PausedSet { .. } => "PausedSet",
            AuctionEvent::CooldownSet { .. } => "CooldownSet",
            AuctionEvent::BatchOpened { .. } => "BatchOpened",
            AuctionEvent::BatchClosed { .. } => "BatchClosed",
            AuctionEvent::BidSubmitted { .. } => "BidSubmitted",
            AuctionEvent::DecryptionRequested { .. } => "DecryptionRequested",
            AuctionEvent::DecryptionCompleted { .. } => "DecryptionCompleted",
        }
    }
}
