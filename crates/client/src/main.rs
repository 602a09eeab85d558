//! CLI for interacting with the sealed-bid batch exchange.
//!
//! This binary provides commands for:
//! - Owner administration (ownership, providers, pause, cooldown)
//! - Provider batch management and decryption requests
//! - Encrypting inputs and submitting sealed bids
//! - Querying batches, decryption contexts and the event log

use anyhow::Result;
use clap::{Parser, Subcommand};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use tracing::info;

use adx_client::rpc::{
    BatchRpc, BlockInfo, DecryptionContextRpc, EventRpc, RateLimitRpc, StatusRpc,
};
use adx_client::{canonical_address, canonical_handle};

#[derive(Parser)]
#[command(name = "adx-cli")]
#[command(about = "CLI for the sealed-bid batch exchange")]
struct Cli {
    /// Mock chain RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:9944")]
    rpc: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hand ownership to another address
    TransferOwnership {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,

        /// New owner address (hex)
        #[arg(long)]
        new_owner: String,
    },

    /// Grant the provider role
    AddProvider {
        #[arg(long)]
        sender: String,

        #[arg(long)]
        provider: String,
    },

    /// Revoke the provider role
    RemoveProvider {
        #[arg(long)]
        sender: String,

        #[arg(long)]
        provider: String,
    },

    /// Pause or unpause the exchange
    SetPaused {
        #[arg(long)]
        sender: String,

        #[arg(long, action = clap::ArgAction::Set)]
        paused: bool,
    },

    /// Set the rate-limit cooldown
    SetCooldown {
        #[arg(long)]
        sender: String,

        /// Cooldown in seconds
        #[arg(long)]
        seconds: u64,
    },

    /// Open a batch for bidding
    OpenBatch {
        #[arg(long)]
        sender: String,

        #[arg(long)]
        batch_id: u64,
    },

    /// Close a batch
    CloseBatch {
        #[arg(long)]
        sender: String,

        #[arg(long)]
        batch_id: u64,
    },

    /// Encrypt a value with the chain's dev coprocessor
    Encrypt {
        #[arg(long)]
        value: u64,
    },

    /// Submit a sealed bid
    Bid {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,

        #[arg(long)]
        batch_id: u64,

        /// Bid amount (encrypted before submission)
        #[arg(long, conflicts_with = "amount_handle")]
        amount: Option<u64>,

        /// Existing ciphertext handle for the amount
        #[arg(long)]
        amount_handle: Option<String>,

        /// Targeting score (encrypted before submission)
        #[arg(long, default_value = "0")]
        score: u64,
    },

    /// Request decryption of a closed batch's winning amount
    RequestDecryption {
        #[arg(long)]
        sender: String,

        #[arg(long)]
        batch_id: u64,
    },

    /// Get batch status and bids
    GetBatch {
        #[arg(long)]
        batch_id: u64,
    },

    /// Get a decryption context
    GetContext {
        #[arg(long)]
        request_id: u64,
    },

    /// Show the event log
    Events {
        #[arg(long, default_value = "0")]
        offset: u64,

        #[arg(long, default_value = "50")]
        limit: u64,
    },

    /// Show exchange status
    Status,

    /// Check whether an address holds the provider role
    IsProvider {
        #[arg(long)]
        address: String,
    },

    /// Show an address's rate-limit timestamps
    RateLimit {
        #[arg(long)]
        address: String,
    },

    /// Advance chain time (for testing)
    AdvanceBlock,

    /// Set chain timestamp (for testing)
    SetTimestamp {
        /// Unix timestamp to set
        #[arg(long)]
        timestamp: u64,
    },
}

async fn encrypt(client: &HttpClient, value: u64) -> Result<String> {
    let handle: String = client.request("fhe_encryptInput", rpc_params![value]).await?;
    Ok(handle)
}

async fn submit_bid_cmd(
    client: &HttpClient,
    sender: &str,
    batch_id: u64,
    amount: Option<u64>,
    amount_handle: Option<String>,
    score: u64,
) -> Result<()> {
    let amount_handle = match (amount, amount_handle) {
        (_, Some(handle)) => canonical_handle(&handle)?,
        (Some(amount), None) => encrypt(client, amount).await?,
        (None, None) => anyhow::bail!("either --amount or --amount-handle is required"),
    };
    let score_handle = encrypt(client, score).await?;

    let params = serde_json::json!({
        "sender": canonical_address(sender)?,
        "batch_id": batch_id,
        "encrypted_bid_amount": amount_handle,
        "encrypted_targeting_score": score_handle,
    });

    let index: usize = client
        .request("exchange_submitBid", rpc_params![params])
        .await?;

    info!(batch_id, index, "Bid submitted");
    println!("Bid submitted successfully");
    println!("  Batch ID: {}", batch_id);
    println!("  Index: {}", index);
    println!("  Amount handle: {}", amount_handle);

    Ok(())
}

async fn get_batch_cmd(client: &HttpClient, batch_id: u64) -> Result<()> {
    let batch: Option<BatchRpc> = client
        .request("query_getBatch", rpc_params![batch_id])
        .await?;

    match batch {
        Some(b) => {
            println!("Batch {}:", b.batch_id);
            println!("  Status: {}", b.status);
            println!("  Bids: {}", b.bids.len());
            for (i, bid) in b.bids.iter().enumerate() {
                println!("  [{}] Bidder: {}", i, bid.bidder);
                println!("      Amount: {}", bid.encrypted_bid_amount);
            }
        }
        None => println!("Batch {} never opened", batch_id),
    }

    Ok(())
}

async fn get_context_cmd(client: &HttpClient, request_id: u64) -> Result<()> {
    let ctx: Option<DecryptionContextRpc> = client
        .request("query_getDecryptionContext", rpc_params![request_id])
        .await?;

    match ctx {
        Some(c) => {
            println!("Decryption request {}:", c.request_id);
            println!("  Batch: {}", c.batch_id);
            println!("  State hash: {}", c.state_hash);
            println!("  Processed: {}", c.processed);
            if let (Some(winner), Some(amount)) = (c.winner, c.winning_amount) {
                println!("  Winner: {}", winner);
                println!("  Winning amount: {}", amount);
            }
        }
        None => println!("Unknown request {}", request_id),
    }

    Ok(())
}

async fn events_cmd(client: &HttpClient, offset: u64, limit: u64) -> Result<()> {
    let events: Vec<EventRpc> = client
        .request("query_getEvents", rpc_params![offset, limit])
        .await?;

    if events.is_empty() {
        println!("No events");
    }
    for e in events {
        println!("  [{}] {} {}", e.index, e.name, e.details);
    }

    Ok(())
}

async fn status_cmd(client: &HttpClient) -> Result<()> {
    let s: StatusRpc = client.request("query_status", rpc_params![]).await?;

    println!("Exchange {}:", s.contract_address);
    println!("  Owner: {}", s.owner);
    println!("  Paused: {}", s.paused);
    println!("  Cooldown: {}s", s.cooldown_seconds);
    println!("  Block: {} (t={})", s.block_height, s.timestamp);
    println!("  Pending requests: {:?}", s.pending_requests);
    println!("  KMS: {}/{}", s.kms_threshold, s.kms_members);
    println!("  MPK: {}", s.master_public_key);

    Ok(())
}

async fn rate_limit_cmd(client: &HttpClient, address: &str) -> Result<()> {
    let r: RateLimitRpc = client
        .request("query_getRateLimit", rpc_params![canonical_address(address)?])
        .await?;

    let show = |t: Option<u64>| t.map_or_else(|| "never".to_string(), |t| t.to_string());

    println!("Rate limits for {}:", r.address);
    println!("  Cooldown: {}s", r.cooldown_seconds);
    println!("  Last submission: {}", show(r.last_submission));
    if let Some(at) = r.next_submission_at {
        println!("  Next submission at: {}", at);
    }
    println!("  Last decryption request: {}", show(r.last_decryption_request));
    if let Some(at) = r.next_decryption_request_at {
        println!("  Next decryption request at: {}", at);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("adx_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let client = HttpClientBuilder::default().build(&cli.rpc)?;

    match cli.command {
        Commands::TransferOwnership { sender, new_owner } => {
            let params = rpc_params![canonical_address(&sender)?, canonical_address(&new_owner)?];
            let _: bool = client.request("exchange_transferOwnership", params).await?;
            println!("Ownership transferred to {}", new_owner);
        }

        Commands::AddProvider { sender, provider } => {
            let params = rpc_params![canonical_address(&sender)?, canonical_address(&provider)?];
            let _: bool = client.request("exchange_addProvider", params).await?;
            println!("Provider {} added", provider);
        }

        Commands::RemoveProvider { sender, provider } => {
            let params = rpc_params![canonical_address(&sender)?, canonical_address(&provider)?];
            let _: bool = client.request("exchange_removeProvider", params).await?;
            println!("Provider {} removed", provider);
        }

        Commands::SetPaused { sender, paused } => {
            let params = rpc_params![canonical_address(&sender)?, paused];
            let _: bool = client.request("exchange_setPaused", params).await?;
            println!("Paused: {}", paused);
        }

        Commands::SetCooldown { sender, seconds } => {
            let params = rpc_params![canonical_address(&sender)?, seconds];
            let _: bool = client.request("exchange_setCooldownSeconds", params).await?;
            println!("Cooldown set to {}s", seconds);
        }

        Commands::OpenBatch { sender, batch_id } => {
            let params = rpc_params![canonical_address(&sender)?, batch_id];
            let _: bool = client.request("exchange_openBatch", params).await?;
            println!("Batch {} opened", batch_id);
        }

        Commands::CloseBatch { sender, batch_id } => {
            let params = rpc_params![canonical_address(&sender)?, batch_id];
            let _: bool = client.request("exchange_closeBatch", params).await?;
            println!("Batch {} closed", batch_id);
        }

        Commands::Encrypt { value } => {
            println!("{}", encrypt(&client, value).await?);
        }

        Commands::Bid {
            sender,
            batch_id,
            amount,
            amount_handle,
            score,
        } => {
            submit_bid_cmd(&client, &sender, batch_id, amount, amount_handle, score).await?;
        }

        Commands::RequestDecryption { sender, batch_id } => {
            let params = rpc_params![canonical_address(&sender)?, batch_id];
            let request_id: u64 = client.request("exchange_requestDecryption", params).await?;
            info!(batch_id, request_id, "Decryption requested");
            println!("Decryption requested: request ID {}", request_id);
        }

        Commands::GetBatch { batch_id } => {
            get_batch_cmd(&client, batch_id).await?;
        }

        Commands::GetContext { request_id } => {
            get_context_cmd(&client, request_id).await?;
        }

        Commands::Events { offset, limit } => {
            events_cmd(&client, offset, limit).await?;
        }

        Commands::Status => {
            status_cmd(&client).await?;
        }

        Commands::IsProvider { address } => {
            let params = rpc_params![canonical_address(&address)?];
            let is_provider: bool = client.request("query_isProvider", params).await?;
            println!("{} provider: {}", address, is_provider);
        }

        Commands::RateLimit { address } => {
            rate_limit_cmd(&client, &address).await?;
        }

        Commands::AdvanceBlock => {
            let info: BlockInfo = client.request("admin_advanceBlock", rpc_params![]).await?;
            println!("Block advanced: height={}, timestamp={}", info.height, info.timestamp);
        }

        Commands::SetTimestamp { timestamp } => {
            let _: bool = client
                .request("admin_setTimestamp", rpc_params![timestamp])
                .await?;
            println!("Timestamp set to {}", timestamp);
        }
    }

    Ok(())
}
