//! On-chain state structures for the exchange module.

use std::collections::{HashMap, HashSet};

use adx_types::{
    format_address, Address, AuctionEvent, Batch, BatchId, BatchStatus, DecryptionContext,
    RequestId,
};
use tracing::info;

/// Global configuration. Mutable only by the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeConfig {
    pub owner: Address,
    /// While set, bidding, batch management and decryption requests are rejected
    pub paused: bool,
    /// Shared by the submission and decryption-request limiters
    pub cooldown_seconds: u64,
}

/// Actions subject to per-address rate limiting. Each has its own counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitedAction {
    Submission,
    DecryptionRequest,
}

/// Exchange module state.
///
/// A configuration record plus keyed maps; every entry is owned by its key
/// (address, batch id or request id).
#[derive(Debug)]
pub struct ExchangeState {
    /// Address of this deployment, bound into every decryption commitment
    pub contract_address: Address,

    pub config: ExchangeConfig,

    pub providers: HashSet<Address>,

    /// Last bid submission per address
    pub last_submission: HashMap<Address, u64>,

    /// Last decryption request per address
    pub last_decryption_request: HashMap<Address, u64>,

    /// Batches by ID. Absent means unopened.
    pub batches: HashMap<BatchId, Batch>,

    /// Decryption contexts by oracle request ID
    pub decryption_contexts: HashMap<RequestId, DecryptionContext>,

    /// Append-only event log
    pub events: Vec<AuctionEvent>,
}

impl ExchangeState {
    /// Create a new exchange state owned by `owner`.
    pub fn new(contract_address: Address, owner: Address) -> Self {
        Self {
            contract_address,
            config: ExchangeConfig {
                owner,
                paused: false,
                cooldown_seconds: 0,
            },
            providers: HashSet::new(),
            last_submission: HashMap::new(),
            last_decryption_request: HashMap::new(),
            batches: HashMap::new(),
            decryption_contexts: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.config.owner == *address
    }

    pub fn is_provider(&self, address: &Address) -> bool {
        self.providers.contains(address)
    }

    /// Get batch by ID.
    pub fn get_batch(&self, batch_id: BatchId) -> Option<&Batch> {
        self.batches.get(&batch_id)
    }

    /// Lifecycle state of a batch; never-opened ids are `Unopened`.
    pub fn batch_status(&self, batch_id: BatchId) -> BatchStatus {
        self.batches
            .get(&batch_id)
            .map(|b| b.status)
            .unwrap_or(BatchStatus::Unopened)
    }

    /// Timestamp of the address's last use of `action`.
    pub fn last_action(&self, action: RateLimitedAction, address: &Address) -> Option<u64> {
        self.limiter(action).get(address).copied()
    }

    /// Earliest timestamp at which `address` may repeat `action`, if it has
    /// used it before.
    pub fn cooldown_ready_at(&self, action: RateLimitedAction, address: &Address) -> Option<u64> {
        self.last_action(action, address)
            .map(|last| last.saturating_add(self.config.cooldown_seconds))
    }

    pub(crate) fn record_action(
        &mut self,
        action: RateLimitedAction,
        address: Address,
        timestamp: u64,
    ) {
        let limiter = match action {
            RateLimitedAction::Submission => &mut self.last_submission,
            RateLimitedAction::DecryptionRequest => &mut self.last_decryption_request,
        };
        limiter.insert(address, timestamp);
    }

    fn limiter(&self, action: RateLimitedAction) -> &HashMap<Address, u64> {
        match action {
            RateLimitedAction::Submission => &self.last_submission,
            RateLimitedAction::DecryptionRequest => &self.last_decryption_request,
        }
    }

    /// Request IDs whose callback has not been accepted yet.
    pub fn pending_requests(&self) -> Vec<RequestId> {
        let mut pending: Vec<RequestId> = self
            .decryption_contexts
            .iter()
            .filter(|(_, ctx)| !ctx.processed)
            .map(|(id, _)| *id)
            .collect();
        pending.sort_unstable();
        pending
    }

    /// Append an event to the log.
    pub(crate) fn emit(&mut self, event: AuctionEvent) {
        match &event {
            AuctionEvent::BidSubmitted { bidder, batch_id } => {
                info!(bidder = %format_address(bidder), batch_id, "BidSubmitted");
            }
            AuctionEvent::DecryptionRequested { request_id, batch_id } => {
                info!(request_id, batch_id, "DecryptionRequested");
            }
            AuctionEvent::DecryptionCompleted {
                request_id,
                batch_id,
                winning_amount,
                winner,
            } => {
                info!(
                    request_id,
                    batch_id,
                    winning_amount,
                    winner = %format_address(winner),
                    "DecryptionCompleted"
                );
            }
            other => info!(event = ?other, "{}", other.name()),
        }
        self.events.push(event);
    }
}
