//! Client SDK for operating and bidding on the sealed-bid batch exchange.
//!
//! This crate provides:
//! - Input validation for addresses and ciphertext handles
//! - The mock chain's RPC response types

pub mod input;
pub mod rpc;

pub use input::{canonical_address, canonical_handle};
