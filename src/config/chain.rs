use crate::account::{units, Amount};
use crate::crowdsale::CrowdsaleConfig;
use crate::token::{TokenConfig, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Everything needed to deploy the token and crowdsale
///
/// Allocations are whole tokens taken out of the deployer's initial supply:
/// `ico_allocation` backs claims, `treasury_allocation` goes to the treasury,
/// and any remainder stays with the deployer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub ico_allocation: u64,
    pub treasury_allocation: u64,
    pub token: TokenConfig,
    pub crowdsale: CrowdsaleConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            ico_allocation: 150_000,
            treasury_allocation: 350_000,
            token: TokenConfig::default(),
            crowdsale: CrowdsaleConfig::default(),
        }
    }
}

impl ChainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: TokenConfig) -> Self {
        self.token = token;
        self
    }

    pub fn with_crowdsale(mut self, crowdsale: CrowdsaleConfig) -> Self {
        self.crowdsale = crowdsale;
        self
    }

    pub fn with_allocations(mut self, ico: u64, treasury: u64) -> Self {
        self.ico_allocation = ico;
        self.treasury_allocation = treasury;
        self
    }

    /// Crowdsale token allocation in base units
    pub fn ico_allocation_base(&self) -> Amount {
        units::whole(u128::from(self.ico_allocation))
    }

    /// Treasury token allocation in base units
    pub fn treasury_allocation_base(&self) -> Amount {
        units::whole(u128::from(self.treasury_allocation))
    }

    /// Parse from TOML; missing keys fall back to the defaults
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: ChainConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject parameter combinations the crowdsale cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        let allocated = self
            .ico_allocation
            .checked_add(self.treasury_allocation)
            .ok_or_else(|| ConfigError::Invalid("allocations overflow".into()))?;
        if allocated > self.token.total_supply {
            return Err(ConfigError::Invalid(format!(
                "allocations ({}) exceed total supply ({})",
                allocated, self.token.total_supply
            )));
        }

        if self.token.tax_rate_bps > BPS_DENOMINATOR {
            return Err(ConfigError::Invalid(format!(
                "tax rate {} bps exceeds {}",
                self.token.tax_rate_bps, BPS_DENOMINATOR
            )));
        }

        let sale = &self.crowdsale;
        if sale.seed_individual_cap > sale.seed_total_cap {
            return Err(ConfigError::Invalid("seed individual cap exceeds seed total cap".into()));
        }
        if sale.general_individual_cap > sale.general_total_cap {
            return Err(ConfigError::Invalid(
                "general individual cap exceeds general total cap".into(),
            ));
        }
        if sale.seed_total_cap > sale.general_total_cap {
            return Err(ConfigError::Invalid("seed total cap exceeds general total cap".into()));
        }
        if sale.tokens_per_unit == 0 {
            return Err(ConfigError::Invalid("tokens_per_unit must be positive".into()));
        }

        Ok(())
    }
}
