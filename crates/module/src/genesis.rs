//! Genesis configuration for the exchange module.
//!
//! Defines the initial owner, provider set and limits the exchange starts
//! with. Addresses are hex encoded in the JSON form.

use std::collections::HashSet;

use adx_types::{Address, ZERO_ADDRESS};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use crate::state::ExchangeState;

/// Genesis configuration for the exchange module.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionGenesisConfig {
    /// Address the deployment is bound to
    #[serde_as(as = "Hex")]
    pub contract_address: Address,

    /// Initial owner
    #[serde_as(as = "Hex")]
    pub owner: Address,

    /// Addresses granted the provider role at startup
    #[serde_as(as = "Vec<Hex>")]
    #[serde(default)]
    pub providers: Vec<Address>,

    /// Cooldown shared by both rate limiters
    #[serde(default)]
    pub cooldown_seconds: u64,

    /// Start paused
    #[serde(default)]
    pub paused: bool,
}

impl AuctionGenesisConfig {
    /// Minimal config: an owner and nothing else.
    pub fn new(contract_address: Address, owner: Address) -> Self {
        Self {
            contract_address,
            owner,
            providers: Vec::new(),
            cooldown_seconds: 0,
            paused: false,
        }
    }

    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.contract_address == ZERO_ADDRESS {
            return Err(GenesisValidationError::ZeroAddress("contract_address"));
        }
        if self.owner == ZERO_ADDRESS {
            return Err(GenesisValidationError::ZeroAddress("owner"));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if *provider == ZERO_ADDRESS {
                return Err(GenesisValidationError::ZeroAddress("provider"));
            }
            if !seen.insert(provider) {
                return Err(GenesisValidationError::DuplicateProvider(hex::encode(
                    provider,
                )));
            }
        }

        Ok(())
    }

    /// Validate and build the initial exchange state.
    pub fn build_state(&self) -> Result<ExchangeState, GenesisValidationError> {
        self.validate()?;

        let mut state = ExchangeState::new(self.contract_address, self.owner);
        state.config.paused = self.paused;
        state.config.cooldown_seconds = self.cooldown_seconds;
        state.providers.extend(self.providers.iter().copied());
        Ok(state)
    }
}

/// Errors that can occur during genesis validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("Zero address not allowed for {0}")]
    ZeroAddress(&'static str),

    #[error("Duplicate provider: {0}")]
    DuplicateProvider(String),
}
