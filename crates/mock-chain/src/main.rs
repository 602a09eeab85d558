//! Mock chain server for local testing of the sealed-bid batch exchange.
//!
//! This provides a JSON-RPC server that simulates the host chain for the
//! exchange module: every call runs under one write lock against a simulated
//! clock, and a background relayer plays the decryption oracle's part.

use anyhow::{Context, Result};
use clap::Parser;
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::Server;
use jsonrpsee::types::ErrorObjectOwned;
use parking_lot::RwLock;
use rand::rngs::OsRng;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use adx_decryption_oracle::KmsCommittee;
use adx_module::{AuctionCall, AuctionGenesisConfig, AuctionQuery, AuctionQueryResponse, CallOutput};
use adx_types::{format_address, parse_address, Address, BatchId, CiphertextHandle, RequestId};

mod chain;
mod types;
use chain::{run_relayer, ChainState, RELAYER_ADDRESS};
use types::*;

/// Development deployment address used without a genesis file.
const DEV_CONTRACT: Address = [0xad; 20];

/// Development owner used without a genesis file.
const DEV_OWNER: Address = [0x11; 20];

#[derive(Parser, Debug)]
#[command(name = "adx-mock-chain")]
#[command(about = "Mock chain hosting the sealed-bid batch exchange")]
struct Cli {
    /// Address to serve JSON-RPC on
    #[arg(long, default_value = "127.0.0.1:9944")]
    listen: SocketAddr,

    /// Exchange genesis config (JSON). A dev config is used when absent.
    #[arg(long)]
    genesis: Option<PathBuf>,

    /// Signatures required from the KMS committee
    #[arg(long, default_value_t = 2)]
    kms_threshold: usize,

    /// KMS committee size
    #[arg(long, default_value_t = 3)]
    kms_members: usize,

    /// Relayer polling interval; 0 disables the background relayer
    #[arg(long, default_value_t = 2000)]
    relay_interval_ms: u64,

    /// Starting chain timestamp (seconds)
    #[arg(long, default_value_t = 0)]
    initial_timestamp: u64,
}

/// RPC API definition for the mock chain.
#[rpc(server)]
pub trait MockChainApi {
    // ============ Admin Methods ============

    /// Advance the chain by one block.
    #[method(name = "admin_advanceBlock")]
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Set the current timestamp (for testing time-dependent logic).
    #[method(name = "admin_setTimestamp")]
    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned>;

    // ============ Exchange Methods ============

    #[method(name = "exchange_transferOwnership")]
    async fn exchange_transfer_ownership(
        &self,
        sender: String,
        new_owner: String,
    ) -> Result<bool, ErrorObjectOwned>;

    #[method(name = "exchange_addProvider")]
    async fn exchange_add_provider(
        &self,
        sender: String,
        provider: String,
    ) -> Result<bool, ErrorObjectOwned>;

    #[method(name = "exchange_removeProvider")]
    async fn exchange_remove_provider(
        &self,
        sender: String,
        provider: String,
    ) -> Result<bool, ErrorObjectOwned>;

    #[method(name = "exchange_setPaused")]
    async fn exchange_set_paused(&self, sender: String, paused: bool)
        -> Result<bool, ErrorObjectOwned>;

    #[method(name = "exchange_setCooldownSeconds")]
    async fn exchange_set_cooldown_seconds(
        &self,
        sender: String,
        cooldown_seconds: u64,
    ) -> Result<bool, ErrorObjectOwned>;

    #[method(name = "exchange_openBatch")]
    async fn exchange_open_batch(
        &self,
        sender: String,
        batch_id: BatchId,
    ) -> Result<bool, ErrorObjectOwned>;

    #[method(name = "exchange_closeBatch")]
    async fn exchange_close_batch(
        &self,
        sender: String,
        batch_id: BatchId,
    ) -> Result<bool, ErrorObjectOwned>;

    /// Submit a sealed bid. Returns the bid's index in the batch.
    #[method(name = "exchange_submitBid")]
    async fn exchange_submit_bid(&self, params: SubmitBidParams)
        -> Result<usize, ErrorObjectOwned>;

    /// Request decryption of a closed batch's winning amount.
    #[method(name = "exchange_requestDecryption")]
    async fn exchange_request_decryption(
        &self,
        sender: String,
        batch_id: BatchId,
    ) -> Result<RequestId, ErrorObjectOwned>;

    // ============ Coprocessor and Oracle ============

    /// Encrypt a client input with the mock coprocessor.
    #[method(name = "fhe_encryptInput")]
    async fn fhe_encrypt_input(&self, value: u64) -> Result<String, ErrorObjectOwned>;

    /// Fulfil and deliver pending oracle requests now.
    #[method(name = "oracle_relay")]
    async fn oracle_relay(&self) -> Result<Vec<RelayResultRpc>, ErrorObjectOwned>;

    // ============ Query Methods ============

    /// Get current block info.
    #[method(name = "chain_getBlockInfo")]
    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    #[method(name = "query_status")]
    async fn query_status(&self) -> Result<StatusRpc, ErrorObjectOwned>;

    /// Rate-limit timestamps of an address.
    #[method(name = "query_getRateLimit")]
    async fn query_get_rate_limit(&self, address: String) -> Result<RateLimitRpc, ErrorObjectOwned>;

    #[method(name = "query_isProvider")]
    async fn query_is_provider(&self, address: String) -> Result<bool, ErrorObjectOwned>;

    #[method(name = "query_getBatch")]
    async fn query_get_batch(&self, batch_id: BatchId)
        -> Result<Option<BatchRpc>, ErrorObjectOwned>;

    #[method(name = "query_getDecryptionContext")]
    async fn query_get_decryption_context(
        &self,
        request_id: RequestId,
    ) -> Result<Option<DecryptionContextRpc>, ErrorObjectOwned>;

    #[method(name = "query_getEvents")]
    async fn query_get_events(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<EventRpc>, ErrorObjectOwned>;
}

/// Implementation of the mock chain RPC server.
struct MockChainServer {
    state: Arc<RwLock<ChainState>>,
}

impl MockChainServer {
    fn new(state: Arc<RwLock<ChainState>>) -> Self {
        Self { state }
    }

    fn rpc_error(msg: &str) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(-32000, msg.to_string(), None::<()>)
    }

    fn address(s: &str) -> Result<Address, ErrorObjectOwned> {
        parse_address(s).map_err(|e| Self::rpc_error(&format!("Invalid address: {}", e)))
    }

    fn handle(s: &str) -> Result<CiphertextHandle, ErrorObjectOwned> {
        CiphertextHandle::from_hex(s).map_err(|e| Self::rpc_error(&format!("Invalid handle: {}", e)))
    }

    /// Execute a call from `sender` and map engine errors to RPC errors.
    fn execute(&self, sender: &str, call: AuctionCall) -> Result<CallOutput, ErrorObjectOwned> {
        let sender = Self::address(sender)?;
        let method = call.name();
        self.state
            .write()
            .execute(sender, call)
            .map_err(|e| Self::rpc_error(&format!("{} failed: {}", method, e)))
    }

    fn query(&self, query: AuctionQuery) -> AuctionQueryResponse {
        self.state.read().query(query)
    }

    fn unexpected(response: AuctionQueryResponse) -> ErrorObjectOwned {
        Self::rpc_error(&format!("Unexpected query response: {:?}", response))
    }
}

#[async_trait]
impl MockChainApiServer for MockChainServer {
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.advance_block();
        Ok(BlockInfo {
            height: state.block_height,
            timestamp: state.timestamp,
        })
    }

    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned> {
        self.state.write().set_timestamp(timestamp);
        info!(timestamp, "Timestamp set");
        Ok(true)
    }

    async fn exchange_transfer_ownership(
        &self,
        sender: String,
        new_owner: String,
    ) -> Result<bool, ErrorObjectOwned> {
        let new_owner = Self::address(&new_owner)?;
        self.execute(&sender, AuctionCall::TransferOwnership { new_owner })?;
        Ok(true)
    }

    async fn exchange_add_provider(
        &self,
        sender: String,
        provider: String,
    ) -> Result<bool, ErrorObjectOwned> {
        let provider = Self::address(&provider)?;
        self.execute(&sender, AuctionCall::AddProvider { provider })?;
        Ok(true)
    }

    async fn exchange_remove_provider(
        &self,
        sender: String,
        provider: String,
    ) -> Result<bool, ErrorObjectOwned> {
        let provider = Self::address(&provider)?;
        self.execute(&sender, AuctionCall::RemoveProvider { provider })?;
        Ok(true)
    }

    async fn exchange_set_paused(
        &self,
        sender: String,
        paused: bool,
    ) -> Result<bool, ErrorObjectOwned> {
        self.execute(&sender, AuctionCall::SetPaused { paused })?;
        Ok(true)
    }

    async fn exchange_set_cooldown_seconds(
        &self,
        sender: String,
        cooldown_seconds: u64,
    ) -> Result<bool, ErrorObjectOwned> {
        self.execute(&sender, AuctionCall::SetCooldownSeconds { cooldown_seconds })?;
        Ok(true)
    }

    async fn exchange_open_batch(
        &self,
        sender: String,
        batch_id: BatchId,
    ) -> Result<bool, ErrorObjectOwned> {
        self.execute(&sender, AuctionCall::OpenBatch { batch_id })?;
        Ok(true)
    }

    async fn exchange_close_batch(
        &self,
        sender: String,
        batch_id: BatchId,
    ) -> Result<bool, ErrorObjectOwned> {
        self.execute(&sender, AuctionCall::CloseBatch { batch_id })?;
        Ok(true)
    }

    async fn exchange_submit_bid(
        &self,
        params: SubmitBidParams,
    ) -> Result<usize, ErrorObjectOwned> {
        let call = AuctionCall::SubmitBid {
            batch_id: params.batch_id,
            encrypted_bid_amount: Self::handle(&params.encrypted_bid_amount)?,
            encrypted_targeting_score: Self::handle(&params.encrypted_targeting_score)?,
        };

        match self.execute(&params.sender, call)? {
            CallOutput::BidIndex(index) => Ok(index),
            other => Err(Self::rpc_error(&format!("Unexpected output: {:?}", other))),
        }
    }

    async fn exchange_request_decryption(
        &self,
        sender: String,
        batch_id: BatchId,
    ) -> Result<RequestId, ErrorObjectOwned> {
        match self.execute(&sender, AuctionCall::RequestAuctionResultDecryption { batch_id })? {
            CallOutput::RequestId(request_id) => Ok(request_id),
            other => Err(Self::rpc_error(&format!("Unexpected output: {:?}", other))),
        }
    }

    async fn fhe_encrypt_input(&self, value: u64) -> Result<String, ErrorObjectOwned> {
        Ok(self.state.read().fhe.encrypt_u64(value).to_hex())
    }

    async fn oracle_relay(&self) -> Result<Vec<RelayResultRpc>, ErrorObjectOwned> {
        let deliveries = self.state.write().relay(RELAYER_ADDRESS);
        Ok(deliveries
            .into_iter()
            .map(|d| RelayResultRpc {
                request_id: d.request_id,
                accepted: d.result.is_ok(),
                error: d.result.err().map(|e| e.to_string()),
            })
            .collect())
    }

    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(BlockInfo {
            height: state.block_height,
            timestamp: state.timestamp,
        })
    }

    async fn query_status(&self) -> Result<StatusRpc, ErrorObjectOwned> {
        self.state.read().status().map_err(Self::unexpected)
    }

    async fn query_get_rate_limit(&self, address: String) -> Result<RateLimitRpc, ErrorObjectOwned> {
        let address = Self::address(&address)?;
        self.state
            .read()
            .rate_limits(address)
            .map_err(Self::unexpected)
    }

    async fn query_is_provider(&self, address: String) -> Result<bool, ErrorObjectOwned> {
        let address = Self::address(&address)?;
        match self.query(AuctionQuery::IsProvider { address }) {
            AuctionQueryResponse::Provider(is_provider) => Ok(is_provider),
            other => Err(Self::unexpected(other)),
        }
    }

    async fn query_get_batch(
        &self,
        batch_id: BatchId,
    ) -> Result<Option<BatchRpc>, ErrorObjectOwned> {
        match self.query(AuctionQuery::GetBatch { batch_id }) {
            AuctionQueryResponse::Batch(batch) => {
                Ok(batch.map(|b| BatchRpc::new(batch_id, &b)))
            }
            other => Err(Self::unexpected(other)),
        }
    }

    async fn query_get_decryption_context(
        &self,
        request_id: RequestId,
    ) -> Result<Option<DecryptionContextRpc>, ErrorObjectOwned> {
        match self.query(AuctionQuery::GetDecryptionContext { request_id }) {
            AuctionQueryResponse::DecryptionContext(ctx) => {
                Ok(ctx.map(|c| DecryptionContextRpc::new(request_id, &c)))
            }
            other => Err(Self::unexpected(other)),
        }
    }

    async fn query_get_events(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<EventRpc>, ErrorObjectOwned> {
        match self.query(AuctionQuery::GetEvents { offset, limit }) {
            AuctionQueryResponse::Events(events) => Ok(events
                .iter()
                .zip(offset..)
                .map(|(event, index)| EventRpc::new(index, event))
                .collect()),
            other => Err(Self::unexpected(other)),
        }
    }
}

fn load_genesis(path: Option<&PathBuf>) -> Result<AuctionGenesisConfig> {
    let Some(path) = path else {
        info!(
            contract = %format_address(&DEV_CONTRACT),
            owner = %format_address(&DEV_OWNER),
            "No genesis file given, using dev config"
        );
        return Ok(AuctionGenesisConfig::new(DEV_CONTRACT, DEV_OWNER));
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading genesis file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing genesis file {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("adx_mock_chain=info".parse()?)
                .add_directive("jsonrpsee=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let genesis = load_genesis(cli.genesis.as_ref())?;
    let committee = KmsCommittee::generate(cli.kms_threshold, cli.kms_members, &mut OsRng)?;
    let chain = ChainState::new(&genesis, committee, cli.initial_timestamp)?;
    let state = Arc::new(RwLock::new(chain));

    let relayer = (cli.relay_interval_ms > 0).then(|| {
        info!(interval_ms = cli.relay_interval_ms, "Starting oracle relayer");
        tokio::spawn(run_relayer(
            state.clone(),
            Duration::from_millis(cli.relay_interval_ms),
        ))
    });

    info!("Starting mock chain server on {}", cli.listen);

    let server = Server::builder().build(cli.listen).await?;
    let handle = server.start(MockChainServer::new(state).into_rpc());

    info!("Mock chain server running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    if let Some(relayer) = relayer {
        relayer.abort();
    }
    handle.stop()?;
    handle.stopped().await;

    Ok(())
}
