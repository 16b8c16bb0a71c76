// Stage progression and per-stage contribution limits

use crate::account::{units, Amount};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown stage '{0}': expected seed, general, open or 0-2")]
pub struct ParseStageError(String);

/// Fundraising phase. Ordered; the crowdsale only ever moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Whitelisted accounts only
    Seed,
    /// Anyone, with tighter per-account caps
    General,
    /// Anyone, uncapped; claims are open
    Open,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Seed, Stage::General, Stage::Open];

    /// Numeric position of the stage (Seed = 0)
    pub fn index(self) -> u8 {
        match self {
            Stage::Seed => 0,
            Stage::General => 1,
            Stage::Open => 2,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// The stage that follows this one, if any
    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Open
    }

    /// Whether participation requires whitelisting
    pub fn requires_whitelist(self) -> bool {
        self == Stage::Seed
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Seed => "seed",
            Stage::General => "general",
            Stage::Open => "open",
        };
        f.write_str(name)
    }
}

impl FromStr for Stage {
    type Err = ParseStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seed" | "0" => Ok(Stage::Seed),
            "general" | "1" => Ok(Stage::General),
            "open" | "2" => Ok(Stage::Open),
            other => Err(ParseStageError(other.to_string())),
        }
    }
}

/// Contribution caps in effect during one stage, in base units
///
/// `None` means uncapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageLimits {
    /// Cumulative cap on a single account's contributions
    pub per_account: Option<Amount>,
    /// Cap on the cumulative total raised, counting earlier stages
    pub aggregate: Option<Amount>,
}

impl StageLimits {
    pub const UNLIMITED: StageLimits = StageLimits {
        per_account: None,
        aggregate: None,
    };
}

/// Crowdsale parameters. Caps are whole currency units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrowdsaleConfig {
    pub seed_individual_cap: u64,
    pub seed_total_cap: u64,
    pub general_individual_cap: u64,
    pub general_total_cap: u64,
    /// Tokens redeemed per unit of currency contributed
    pub tokens_per_unit: u64,
}

impl CrowdsaleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed_caps(mut self, individual: u64, total: u64) -> Self {
        self.seed_individual_cap = individual;
        self.seed_total_cap = total;
        self
    }

    pub fn with_general_caps(mut self, individual: u64, total: u64) -> Self {
        self.general_individual_cap = individual;
        self.general_total_cap = total;
        self
    }

    pub fn with_tokens_per_unit(mut self, rate: u64) -> Self {
        self.tokens_per_unit = rate;
        self
    }

    /// Caps that apply while the crowdsale is in `stage`
    pub fn limits(&self, stage: Stage) -> StageLimits {
        let cap = |whole: u64| Some(units::whole(u128::from(whole)));
        match stage {
            Stage::Seed => StageLimits {
                per_account: cap(self.seed_individual_cap),
                aggregate: cap(self.seed_total_cap),
            },
            Stage::General => StageLimits {
                per_account: cap(self.general_individual_cap),
                aggregate: cap(self.general_total_cap),
            },
            Stage::Open => StageLimits::UNLIMITED,
        }
    }
}

impl Default for CrowdsaleConfig {
    fn default() -> Self {
        Self {
            seed_individual_cap: 1_500,
            seed_total_cap: 15_000,
            general_individual_cap: 1_000,
            general_total_cap: 30_000,
            tokens_per_unit: 5,
        }
    }
}
