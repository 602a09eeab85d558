//! Sealed-bid batch exchange module.
//!
//! This module implements the exchange's state machine:
//!
//! - Owner-managed access control (providers, pause, cooldown)
//! - Batch lifecycle with per-address submission rate limiting
//! - Encrypted winner resolution through an FHE capability
//! - Decryption requests and verified, replay-protected callbacks
//!
//! # Architecture
//!
//! - `call`: Message types for state-changing operations
//! - `handlers`: Business logic for processing calls
//! - `resolver`: Encrypted highest-bid selection
//! - `queries`: Read-only state access
//! - `state`: Exchange state structures
//! - `genesis`: Initial configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```ignore
//! use adx_module::{handlers, AuctionCall, ExchangeState};
//!
//! let mut state = ExchangeState::new(contract, owner);
//! let mut caps = handlers::Capabilities { fhe: &coprocessor, oracle: &mut gateway };
//!
//! handlers::dispatch(&mut state, &ctx, &mut caps, AuctionCall::OpenBatch { batch_id: 1 })?;
//! ```

pub mod call;
pub mod error;
pub mod genesis;
pub mod handlers;
pub mod queries;
pub mod resolver;
pub mod state;

pub use call::{AuctionCall, CallOutput};
pub use error::AuctionError;
pub use genesis::{AuctionGenesisConfig, GenesisValidationError};
pub use handlers::{dispatch, CallContext, Capabilities, HandlerResult};
pub use queries::{handle_query, AuctionQuery, AuctionQueryResponse};
pub use resolver::{resolve_winner, ResolvedWinner};
pub use state::{ExchangeConfig, ExchangeState, RateLimitedAction};
