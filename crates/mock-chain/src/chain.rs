//! Simulated chain: exchange state, capabilities, clock and relayer.

use std::sync::Arc;
use std::time::Duration;

use adx_decryption_oracle::{fulfil_pending, DecryptionGateway, KmsCommittee};
use adx_fhe::MockCoprocessor;
use adx_module::handlers::auction_result_callback;
use adx_module::{
    dispatch, handle_query, AuctionCall, AuctionGenesisConfig, AuctionQuery,
    AuctionQueryResponse, CallContext, CallOutput, Capabilities, ExchangeState,
    GenesisValidationError, HandlerResult,
};
use adx_types::{format_address, Address, RequestId};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use tracing::{info, warn};

use crate::types::{RateLimitRpc, StatusRpc};

/// Seconds per simulated block.
pub const BLOCK_TIME: u64 = 12;

/// Sender of oracle callbacks.
pub const RELAYER_ADDRESS: Address = [0xee; 20];

/// Shared chain state.
pub struct ChainState {
    pub exchange: ExchangeState,
    pub fhe: MockCoprocessor,
    pub gateway: DecryptionGateway,
    pub committee: KmsCommittee,
    /// Current block height (simulated)
    pub block_height: u64,
    /// Current timestamp (simulated, can be advanced)
    pub timestamp: u64,
}

/// Outcome of delivering one oracle response.
pub struct Delivery {
    pub request_id: RequestId,
    pub result: HandlerResult<CallOutput>,
}

impl ChainState {
    pub fn new(
        genesis: &AuctionGenesisConfig,
        committee: KmsCommittee,
        initial_timestamp: u64,
    ) -> Result<Self, GenesisValidationError> {
        let exchange = genesis.build_state()?;
        let gateway = DecryptionGateway::new(committee.master_public_key().clone());

        Ok(Self {
            exchange,
            fhe: MockCoprocessor::new(),
            gateway,
            committee,
            block_height: 0,
            timestamp: initial_timestamp,
        })
    }

    pub fn advance_block(&mut self) {
        self.block_height = self.block_height.saturating_add(1);
        self.timestamp = self.timestamp.saturating_add(BLOCK_TIME);
    }

    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    pub fn context(&self, sender: Address) -> CallContext {
        CallContext {
            sender,
            block_height: self.block_height,
            timestamp: self.timestamp,
        }
    }

    /// Execute a call as a transaction from `sender`.
    pub fn execute(&mut self, sender: Address, call: AuctionCall) -> HandlerResult<CallOutput> {
        let ctx = self.context(sender);
        let mut caps = Capabilities {
            fhe: &self.fhe,
            oracle: &mut self.gateway,
        };
        dispatch(&mut self.exchange, &ctx, &mut caps, call)
    }

    pub fn query(&self, query: AuctionQuery) -> AuctionQueryResponse {
        handle_query(&self.exchange, query)
    }

    /// Exchange overview assembled from the public read surface.
    ///
    /// A response of the wrong kind is returned as the error.
    pub fn status(&self) -> Result<StatusRpc, AuctionQueryResponse> {
        let owner = match self.query(AuctionQuery::GetOwner) {
            AuctionQueryResponse::Owner(owner) => owner,
            other => return Err(other),
        };
        let paused = match self.query(AuctionQuery::IsPaused) {
            AuctionQueryResponse::Paused(paused) => paused,
            other => return Err(other),
        };
        let cooldown_seconds = self.cooldown_seconds()?;
        let pending_requests = match self.query(AuctionQuery::GetPendingRequests) {
            AuctionQueryResponse::PendingRequests(ids) => ids,
            other => return Err(other),
        };

        Ok(StatusRpc {
            contract_address: format_address(&self.exchange.contract_address),
            owner: format_address(&owner),
            paused,
            cooldown_seconds,
            block_height: self.block_height,
            timestamp: self.timestamp,
            pending_requests,
            kms_threshold: self.committee.threshold(),
            kms_members: self.committee.size(),
            master_public_key: hex::encode(self.committee.master_public_key().0),
        })
    }

    /// Rate-limit timestamps of `address` and when each action is allowed again.
    pub fn rate_limits(&self, address: Address) -> Result<RateLimitRpc, AuctionQueryResponse> {
        let last_submission = match self.query(AuctionQuery::GetLastSubmission { address }) {
            AuctionQueryResponse::LastAction(at) => at,
            other => return Err(other),
        };
        let last_decryption_request =
            match self.query(AuctionQuery::GetLastDecryptionRequest { address }) {
                AuctionQueryResponse::LastAction(at) => at,
                other => return Err(other),
            };
        let cooldown_seconds = self.cooldown_seconds()?;
        let ready_at = |last: Option<u64>| last.map(|at| at.saturating_add(cooldown_seconds));

        Ok(RateLimitRpc {
            address: format_address(&address),
            cooldown_seconds,
            last_submission,
            next_submission_at: ready_at(last_submission),
            last_decryption_request,
            next_decryption_request_at: ready_at(last_decryption_request),
        })
    }

    fn cooldown_seconds(&self) -> Result<u64, AuctionQueryResponse> {
        match self.query(AuctionQuery::GetCooldownSeconds) {
            AuctionQueryResponse::CooldownSeconds(seconds) => Ok(seconds),
            other => Err(other),
        }
    }

    /// Fulfil pending oracle requests and deliver the responses.
    pub fn relay(&mut self, relayer: Address) -> Vec<Delivery> {
        let responses = fulfil_pending(&mut self.gateway, &self.committee, &self.fhe, &mut OsRng);
        let expected = auction_result_callback();

        responses
            .into_iter()
            .filter(|response| {
                let known = response.callback == expected;
                if !known {
                    warn!(
                        request_id = response.request_id,
                        callback = %hex::encode(response.callback.0),
                        "Dropping response for unknown callback"
                    );
                }
                known
            })
            .map(|response| {
                let request_id = response.request_id;
                let result = self.execute(
                    relayer,
                    AuctionCall::DecryptionCallback {
                        request_id,
                        cleartexts: response.cleartexts,
                        proof: response.proof,
                    },
                );
                Delivery { request_id, result }
            })
            .collect()
    }
}

/// Periodically deliver oracle responses until the task is aborted.
pub async fn run_relayer(state: Arc<RwLock<ChainState>>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        let deliveries = state.write().relay(RELAYER_ADDRESS);
        for delivery in deliveries {
            match delivery.result {
                Ok(output) => info!(
                    request_id = delivery.request_id,
                    output = ?output,
                    "Delivered decryption callback"
                ),
                Err(e) => warn!(
                    request_id = delivery.request_id,
                    error = %e,
                    "Decryption callback rejected"
                ),
            }
        }
    }
}
