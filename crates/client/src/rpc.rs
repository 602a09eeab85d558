//! Response types of the mock chain's JSON-RPC API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: u64,
    pub timestamp: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BidRpc {
    pub bidder: String,
    pub encrypted_bid_amount: String,
    pub encrypted_targeting_score: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchRpc {
    pub batch_id: u64,
    pub status: String,
    pub bids: Vec<BidRpc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecryptionContextRpc {
    pub request_id: u64,
    pub batch_id: u64,
    pub state_hash: String,
    pub processed: bool,
    pub winner: Option<String>,
    pub winning_amount: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventRpc {
    pub index: u64,
    pub name: String,
    pub details: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusRpc {
    pub contract_address: String,
    pub owner: String,
    pub paused: bool,
    pub cooldown_seconds: u64,
    pub block_height: u64,
    pub timestamp: u64,
    pub pending_requests: Vec<u64>,
    pub kms_threshold: usize,
    pub kms_members: usize,
    pub master_public_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RateLimitRpc {
    pub address: String,
    pub cooldown_seconds: u64,
    pub last_submission: Option<u64>,
    pub next_submission_at: Option<u64>,
    pub last_decryption_request: Option<u64>,
    pub next_decryption_request_at: Option<u64>,
}
