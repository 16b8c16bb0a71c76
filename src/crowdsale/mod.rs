// Crowdsale module - THE FUNDRAISING STATE MACHINE
// Staged contribution intake, whitelist gating, claims and withdrawals

mod engine;
mod stage;

pub use engine::{Claim, Crowdsale, CrowdsaleError};
pub use stage::{CrowdsaleConfig, ParseStageError, Stage, StageLimits};
