//! RPC-compatible types for the mock chain.
//!
//! These types are JSON-serializable versions of the core exchange types,
//! with every byte string hex encoded.

use adx_types::{format_address, AuctionEvent, Batch, BatchId, Bid, DecryptionContext, RequestId};
use serde::{Deserialize, Serialize};

/// Block info response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: u64,
    pub timestamp: u64,
}

/// Parameters for submitting a bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitBidParams {
    pub sender: String,
    pub batch_id: BatchId,
    /// Hex-encoded ciphertext handle (32 bytes)
    pub encrypted_bid_amount: String,
    /// Hex-encoded ciphertext handle (32 bytes)
    pub encrypted_targeting_score: String,
}

/// Bid for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidRpc {
    pub bidder: String,
    pub encrypted_bid_amount: String,
    pub encrypted_targeting_score: String,
}

impl From<&Bid> for BidRpc {
    fn from(bid: &Bid) -> Self {
        Self {
            bidder: format_address(&bid.bidder),
            encrypted_bid_amount: bid.encrypted_bid_amount.to_hex(),
            encrypted_targeting_score: bid.encrypted_targeting_score.to_hex(),
        }
    }
}

/// Batch for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRpc {
    pub batch_id: BatchId,
    /// "unopened", "active" or "closed"
    pub status: String,
    pub bids: Vec<BidRpc>,
}

impl BatchRpc {
    pub fn new(batch_id: BatchId, batch: &Batch) -> Self {
        Self {
            batch_id,
            status: format!("{:?}", batch.status).to_lowercase(),
            bids: batch.bids.iter().map(BidRpc::from).collect(),
        }
    }
}

/// Decryption context for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptionContextRpc {
    pub request_id: RequestId,
    pub batch_id: BatchId,
    pub state_hash: String,
    pub processed: bool,
    pub winner: Option<String>,
    pub winning_amount: Option<u64>,
}

impl DecryptionContextRpc {
    pub fn new(request_id: RequestId, ctx: &DecryptionContext) -> Self {
        Self {
            request_id,
            batch_id: ctx.batch_id,
            state_hash: hex::encode(ctx.state_hash),
            processed: ctx.processed,
            winner: ctx.outcome.as_ref().map(|o| format_address(&o.winner)),
            winning_amount: ctx.outcome.as_ref().map(|o| o.winning_amount),
        }
    }
}

/// Event log entry for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRpc {
    pub index: u64,
    pub name: String,
    pub details: String,
}

impl EventRpc {
    pub fn new(index: u64, event: &AuctionEvent) -> Self {
        let details = match event {
            AuctionEvent::OwnershipTransferred {
                previous_owner,
                new_owner,
            } => format!(
                "{} -> {}",
                format_address(previous_owner),
                format_address(new_owner)
            ),
            AuctionEvent::ProviderAdded { provider } | AuctionEvent::ProviderRemoved { provider } => {
                format_address(provider)
            }
            AuctionEvent::PausedSet { paused } => format!("paused={paused}"),
            AuctionEvent::CooldownSet { cooldown_seconds } => {
                format!("cooldown_seconds={cooldown_seconds}")
            }
            AuctionEvent::BatchOpened { batch_id } | AuctionEvent::BatchClosed { batch_id } => {
                format!("batch_id={batch_id}")
            }
            AuctionEvent::BidSubmitted { bidder, batch_id } => {
                format!("batch_id={batch_id} bidder={}", format_address(bidder))
            }
            AuctionEvent::DecryptionRequested {
                request_id,
                batch_id,
            } => format!("request_id={request_id} batch_id={batch_id}"),
            AuctionEvent::DecryptionCompleted {
                request_id,
                batch_id,
                winning_amount,
                winner,
            } => format!(
                "request_id={request_id} batch_id={batch_id} winning_amount={winning_amount} winner={}",
                format_address(winner)
            ),
        };

        Self {
            index,
            name: event.name().to_string(),
            details,
        }
    }
}

/// Exchange and oracle overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRpc {
    pub contract_address: String,
    pub owner: String,
    pub paused: bool,
    pub cooldown_seconds: u64,
    pub block_height: u64,
    pub timestamp: u64,
    pub pending_requests: Vec<RequestId>,
    pub kms_threshold: usize,
    pub kms_members: usize,
    /// Hex-encoded G2 point (96 bytes)
    pub master_public_key: String,
}

/// Rate-limit state of one address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitRpc {
    pub address: String,
    pub cooldown_seconds: u64,
    pub last_submission: Option<u64>,
    /// Earliest timestamp of the next bid, if one was ever submitted
    pub next_submission_at: Option<u64>,
    pub last_decryption_request: Option<u64>,
    pub next_decryption_request_at: Option<u64>,
}

/// Result of one relayed oracle response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayResultRpc {
    pub request_id: RequestId,
    pub accepted: bool,
    pub error: Option<String>,
}
