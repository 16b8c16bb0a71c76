// Crowdsale engine
//
// Every mutating operation checks the caller's privilege first, validates the
// whole request, and only then applies its writes. A rejected call leaves the
// state untouched.

use crate::account::{Address, Amount};
use crate::crowdsale::stage::{CrowdsaleConfig, Stage};
use crate::token::{TaxSplit, TokenError, TokenLedger};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during crowdsale operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrowdsaleError {
    #[error("Caller is not the crowdsale owner")]
    NotOwner,

    #[error("Funding is not active")]
    NotActive,

    #[error("Caller is not whitelisted for the seed stage")]
    NotWhitelisted,

    #[error("Over contribution limit: cap {cap}, would reach {attempted}")]
    ContributionLimitExceeded { cap: Amount, attempted: Amount },

    #[error("Over funding limit: cap {cap}, would reach {attempted}")]
    FundingLimitExceeded { cap: Amount, attempted: Amount },

    #[error("Invalid stage transition from {from} to {to}")]
    InvalidStageTransition { from: Stage, to: Stage },

    #[error("Tokens are claimable only in the open stage (current: {stage})")]
    WrongStageForClaim { stage: Stage },

    #[error("No tokens to claim")]
    NothingToClaim,

    #[error("No funds available to withdraw")]
    NoFundsAvailable,

    #[error("Contribution must be greater than zero")]
    InvalidAmount,

    #[error("New owner is the zero address")]
    InvalidOwner,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Token transfer failed: {0}")]
    Token(#[from] TokenError),
}

/// Result of a successful claim
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Contribution value converted by this claim
    pub redeemed: Amount,
    /// Token amount sent out of the crowdsale allocation
    pub tokens: Amount,
    /// How the token transfer was split by the ledger
    pub split: TaxSplit,
}

/// The crowdsale: stage machine, whitelist and contribution accounting
///
/// Contributed currency is held in custody under the crowdsale's own address
/// until the owner withdraws it. Purchases only accrue an entitlement; tokens
/// move when the contributor claims in the open stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Crowdsale {
    /// Account holding the token allocation and the raised funds
    address: Address,
    owner: Address,
    stage: Stage,
    active: bool,
    whitelist: HashSet<Address>,
    /// Cumulative contribution per account; never decreases
    contributions: HashMap<Address, Amount>,
    /// Portion of each contribution already converted to tokens
    redeemed: HashMap<Address, Amount>,
    total_raised: Amount,
    withdrawn: Amount,
    config: CrowdsaleConfig,
}

impl Crowdsale {
    /// Create a crowdsale in the seed stage with funding active
    pub fn new<I>(address: Address, owner: Address, whitelist: I, config: CrowdsaleConfig) -> Result<Self, CrowdsaleError>
    where
        I: IntoIterator<Item = Address>,
    {
        if owner.is_zero() {
            return Err(CrowdsaleError::InvalidOwner);
        }

        let whitelist: HashSet<Address> = whitelist.into_iter().collect();
        info!(%address, %owner, whitelisted = whitelist.len(), "crowdsale created");

        Ok(Self {
            address,
            owner,
            stage: Stage::Seed,
            active: true,
            whitelist,
            contributions: HashMap::new(),
            redeemed: HashMap::new(),
            total_raised: 0,
            withdrawn: 0,
            config,
        })
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_ico_active(&self) -> bool {
        self.active
    }

    pub fn is_whitelisted(&self, account: &Address) -> bool {
        self.whitelist.contains(account)
    }

    pub fn whitelist_len(&self) -> usize {
        self.whitelist.len()
    }

    pub fn contributions(&self, account: &Address) -> Amount {
        self.contributions.get(account).copied().unwrap_or(0)
    }

    pub fn total_raised(&self) -> Amount {
        self.total_raised
    }

    pub fn config(&self) -> &CrowdsaleConfig {
        &self.config
    }

    /// Raised funds still held in custody
    pub fn available_funds_to_withdraw(&self) -> Amount {
        self.total_raised - self.withdrawn
    }

    /// Contribution value not yet converted to tokens
    pub fn unredeemed(&self, account: &Address) -> Amount {
        let redeemed = self.redeemed.get(account).copied().unwrap_or(0);
        self.contributions(account) - redeemed
    }

    /// Tokens `account` would receive from a claim, before any transfer tax
    pub fn claimable(&self, account: &Address) -> Amount {
        self.unredeemed(account)
            .saturating_mul(u128::from(self.config.tokens_per_unit))
    }

    // ========================================================================
    // CONTRIBUTIONS
    // ========================================================================

    /// Check a contribution of `value` from `caller` against every sale rule
    ///
    /// Returns the caller's cumulative contribution if it were accepted.
    /// Nothing is written, so callers holding other ledgers can validate
    /// their own side afterwards and still fail cleanly.
    pub fn check_purchase(&self, caller: &Address, value: Amount) -> Result<Amount, CrowdsaleError> {
        if !self.active {
            return Err(CrowdsaleError::NotActive);
        }
        if self.stage.requires_whitelist() && !self.is_whitelisted(caller) {
            return Err(CrowdsaleError::NotWhitelisted);
        }
        if value == 0 {
            return Err(CrowdsaleError::InvalidAmount);
        }

        let contributed = self
            .contributions(caller)
            .checked_add(value)
            .ok_or(CrowdsaleError::Overflow)?;
        let raised = self
            .total_raised
            .checked_add(value)
            .ok_or(CrowdsaleError::Overflow)?;

        let limits = self.config.limits(self.stage);
        if let Some(cap) = limits.per_account {
            if contributed > cap {
                return Err(CrowdsaleError::ContributionLimitExceeded {
                    cap,
                    attempted: contributed,
                });
            }
        }
        if let Some(cap) = limits.aggregate {
            if raised > cap {
                return Err(CrowdsaleError::FundingLimitExceeded { cap, attempted: raised });
            }
        }

        Ok(contributed)
    }

    /// Record a contribution of `value` from `caller`
    ///
    /// Returns the caller's new cumulative contribution. The caller is expected
    /// to have moved `value` into the crowdsale's custody alongside this call.
    pub fn buy_tokens(&mut self, caller: Address, value: Amount) -> Result<Amount, CrowdsaleError> {
        let contributed = self.check_purchase(&caller, value)?;

        // check_purchase already proved this sum fits
        self.total_raised += value;
        self.contributions.insert(caller, contributed);

        info!(%caller, value = %value, stage = %self.stage, total_raised = %self.total_raised, "contribution accepted");
        Ok(contributed)
    }

    /// Convert `caller`'s outstanding contribution into tokens
    ///
    /// Tokens leave the crowdsale's allocation through `token`. If that
    /// transfer fails the entitlement is left as it was.
    pub fn claim_token(&mut self, caller: Address, token: &mut TokenLedger) -> Result<Claim, CrowdsaleError> {
        if self.stage != Stage::Open {
            return Err(CrowdsaleError::WrongStageForClaim { stage: self.stage });
        }

        let outstanding = self.unredeemed(&caller);
        if outstanding == 0 {
            return Err(CrowdsaleError::NothingToClaim);
        }

        let tokens = outstanding
            .checked_mul(u128::from(self.config.tokens_per_unit))
            .ok_or(CrowdsaleError::Overflow)?;

        let split = token.transfer(self.address, caller, tokens)?;
        self.redeemed.insert(caller, self.contributions(&caller));

        info!(%caller, redeemed = %outstanding, tokens = %tokens, "tokens claimed");
        Ok(Claim {
            redeemed: outstanding,
            tokens,
            split,
        })
    }

    // ========================================================================
    // OWNER OPERATIONS
    // ========================================================================

    /// Release all custody funds. Returns the amount to pay out to the owner.
    pub fn withdraw_funds(&mut self, caller: Address) -> Result<Amount, CrowdsaleError> {
        self.ensure_owner(caller)?;

        let available = self.available_funds_to_withdraw();
        if available == 0 {
            return Err(CrowdsaleError::NoFundsAvailable);
        }

        self.withdrawn = self.total_raised;
        info!(owner = %caller, amount = %available, "funds withdrawn");
        Ok(available)
    }

    /// Pause or resume contributions. Returns the new state.
    pub fn toggle_funding_state(&mut self, caller: Address) -> Result<bool, CrowdsaleError> {
        self.ensure_owner(caller)?;
        self.active = !self.active;
        info!(active = self.active, "funding state toggled");
        Ok(self.active)
    }

    /// Whitelist `accounts`. Returns how many were not already present.
    pub fn add_to_whitelist(&mut self, caller: Address, accounts: &[Address]) -> Result<usize, CrowdsaleError> {
        self.ensure_owner(caller)?;

        let added = accounts
            .iter()
            .filter(|account| self.whitelist.insert(**account))
            .count();

        debug!(requested = accounts.len(), added, "whitelist updated");
        Ok(added)
    }

    /// Move to a strictly later stage
    pub fn advance_stage(&mut self, caller: Address, target: Stage) -> Result<(), CrowdsaleError> {
        self.ensure_owner(caller)?;

        if target <= self.stage {
            return Err(CrowdsaleError::InvalidStageTransition {
                from: self.stage,
                to: target,
            });
        }

        info!(from = %self.stage, to = %target, "stage advanced");
        self.stage = target;
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<(), CrowdsaleError> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(CrowdsaleError::InvalidOwner);
        }

        info!(previous = %self.owner, %new_owner, "crowdsale ownership transferred");
        self.owner = new_owner;
        Ok(())
    }

    fn ensure_owner(&self, caller: Address) -> Result<(), CrowdsaleError> {
        if caller != self.owner {
            warn!(%caller, "owner-only crowdsale call rejected");
            return Err(CrowdsaleError::NotOwner);
        }
        Ok(())
    }
}
