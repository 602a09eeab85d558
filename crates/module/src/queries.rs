//! Query handlers for the exchange module.
//!
//! These functions provide read-only access to exchange state.

use adx_types::{Address, AuctionEvent, Batch, BatchId, DecryptionContext, RequestId};
use serde::{Deserialize, Serialize};

use crate::state::{ExchangeState, RateLimitedAction};

/// Query request types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQuery {
    /// Current owner.
    GetOwner,

    /// Whether an address holds the provider role.
    IsProvider { address: Address },

    /// Pause flag.
    IsPaused,

    /// Cooldown shared by both limiters.
    GetCooldownSeconds,

    /// Last bid submission timestamp of an address.
    GetLastSubmission { address: Address },

    /// Last decryption request timestamp of an address.
    GetLastDecryptionRequest { address: Address },

    /// Batch status and bids.
    GetBatch { batch_id: BatchId },

    /// Decryption context for an oracle request.
    GetDecryptionContext { request_id: RequestId },

    /// Events starting at `offset` (paginated).
    GetEvents { offset: u64, limit: u64 },

    /// Requests still waiting for their callback.
    GetPendingRequests,
}

/// Query response types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQueryResponse {
    Owner(Address),
    Provider(bool),
    Paused(bool),
    CooldownSeconds(u64),
    /// Timestamp of the last rate-limited action, if any.
    LastAction(Option<u64>),
    Batch(Option<Batch>),
    DecryptionContext(Option<DecryptionContext>),
    Events(Vec<AuctionEvent>),
    PendingRequests(Vec<RequestId>),
}

/// Handle a query.
pub fn handle_query(state: &ExchangeState, query: AuctionQuery) -> AuctionQueryResponse {
    match query {
        AuctionQuery::GetOwner => AuctionQueryResponse::Owner(state.config.owner),

        AuctionQuery::IsProvider { address } => {
            AuctionQueryResponse::Provider(state.is_provider(&address))
        }

        AuctionQuery::IsPaused => AuctionQueryResponse::Paused(state.config.paused),

        AuctionQuery::GetCooldownSeconds => {
            AuctionQueryResponse::CooldownSeconds(state.config.cooldown_seconds)
        }

        AuctionQuery::GetLastSubmission { address } => AuctionQueryResponse::LastAction(
            state.last_action(RateLimitedAction::Submission, &address),
        ),

        AuctionQuery::GetLastDecryptionRequest { address } => AuctionQueryResponse::LastAction(
            state.last_action(RateLimitedAction::DecryptionRequest, &address),
        ),

        AuctionQuery::GetBatch { batch_id } => {
            AuctionQueryResponse::Batch(state.get_batch(batch_id).cloned())
        }

        AuctionQuery::GetDecryptionContext { request_id } => AuctionQueryResponse::DecryptionContext(
            state.decryption_contexts.get(&request_id).cloned(),
        ),

        AuctionQuery::GetEvents { offset, limit } => {
            let events = state
                .events
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect();
            AuctionQueryResponse::Events(events)
        }

        AuctionQuery::GetPendingRequests => {
            AuctionQueryResponse::PendingRequests(state.pending_requests())
        }
    }
}
