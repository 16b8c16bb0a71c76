// Taxed token ledger

use crate::account::{units, Address, Amount};
use crate::token::tax::{TaxSplit, DEFAULT_TAX_BPS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during token operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Caller is not the token owner")]
    NotOwner,

    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: Amount, required: Amount },

    #[error("Insufficient allowance: approved {approved}, required {required}")]
    InsufficientAllowance { approved: Amount, required: Amount },

    #[error("Transfer to the zero address")]
    InvalidRecipient,

    #[error("Approval for the zero address")]
    InvalidSpender,

    #[error("New owner is the zero address")]
    InvalidOwner,

    #[error("Treasury is the zero address")]
    InvalidTreasury,
}

/// Token construction parameters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Display name
    pub name: String,
    /// Ticker symbol
    pub symbol: String,
    /// Fixed total supply in whole tokens
    pub total_supply: u64,
    /// Transfer tax rate in basis points
    pub tax_rate_bps: u16,
}

impl TokenConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_total_supply(mut self, whole_tokens: u64) -> Self {
        self.total_supply = whole_tokens;
        self
    }

    /// Total supply in base units
    pub fn total_supply_base(&self) -> Amount {
        units::whole(u128::from(self.total_supply))
    }

    pub fn with_tax_rate_bps(mut self, bps: u16) -> Self {
        self.tax_rate_bps = bps;
        self
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: "SpaceCoin".to_string(),
            symbol: "SPC".to_string(),
            total_supply: 500_000,
            tax_rate_bps: DEFAULT_TAX_BPS,
        }
    }
}

/// Fixed-supply fungible token with an optional transfer tax
///
/// The whole supply is minted to the owner at construction. While the tax is
/// enabled every transfer diverts `tax_rate_bps` of the amount to the treasury.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenLedger {
    name: String,
    symbol: String,
    total_supply: Amount,
    owner: Address,
    treasury: Address,
    tax_enabled: bool,
    tax_rate_bps: u16,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
}

impl TokenLedger {
    /// Create the ledger, minting the entire supply to `owner`
    pub fn new(owner: Address, treasury: Address, config: &TokenConfig) -> Result<Self, TokenError> {
        if owner.is_zero() {
            return Err(TokenError::InvalidOwner);
        }
        if treasury.is_zero() {
            return Err(TokenError::InvalidTreasury);
        }

        let total_supply = config.total_supply_base();
        let mut balances = HashMap::new();
        balances.insert(owner, total_supply);

        info!(%owner, %treasury, supply = %units::format_units(total_supply), "token ledger created");

        Ok(Self {
            name: config.name.clone(),
            symbol: config.symbol.clone(),
            total_supply,
            owner,
            treasury,
            tax_enabled: false,
            tax_rate_bps: config.tax_rate_bps,
            balances,
            allowances: HashMap::new(),
        })
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        units::DECIMALS as u8
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn treasury(&self) -> Address {
        self.treasury
    }

    pub fn is_tax_enabled(&self) -> bool {
        self.tax_enabled
    }

    pub fn tax_rate_bps(&self) -> u16 {
        self.tax_rate_bps
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    /// Number of accounts holding a non-zero balance
    pub fn holder_count(&self) -> usize {
        self.balances.values().filter(|b| **b > 0).count()
    }

    /// Sum of every balance; equals `total_supply` at all times
    pub fn circulating(&self) -> Amount {
        self.balances.values().sum()
    }

    /// Preview how a transfer of `amount` would be split right now
    pub fn quote_transfer(&self, amount: Amount) -> TaxSplit {
        if self.tax_enabled {
            TaxSplit::compute(amount, self.tax_rate_bps)
        } else {
            TaxSplit::untaxed(amount)
        }
    }

    // ========================================================================
    // TRANSFERS
    // ========================================================================

    /// Move `amount` from `caller` to `to`, applying the tax when enabled
    pub fn transfer(&mut self, caller: Address, to: Address, amount: Amount) -> Result<TaxSplit, TokenError> {
        self.move_balance(caller, to, amount)
    }

    /// Let `spender` move up to `amount` of `caller`'s tokens
    pub fn approve(&mut self, caller: Address, spender: Address, amount: Amount) -> Result<(), TokenError> {
        if spender.is_zero() {
            return Err(TokenError::InvalidSpender);
        }

        self.allowances.insert((caller, spender), amount);
        debug!(owner = %caller, %spender, amount = %amount, "allowance set");
        Ok(())
    }

    /// Move tokens on behalf of `from`, consuming `caller`'s allowance
    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<TaxSplit, TokenError> {
        let approved = self.allowance(&from, &caller);
        if approved < amount {
            return Err(TokenError::InsufficientAllowance {
                approved,
                required: amount,
            });
        }

        let split = self.move_balance(from, to, amount)?;
        self.allowances.insert((from, caller), approved - amount);
        Ok(split)
    }

    /// Validate fully, then debit and credit in one step
    fn move_balance(&mut self, from: Address, to: Address, amount: Amount) -> Result<TaxSplit, TokenError> {
        if to.is_zero() {
            return Err(TokenError::InvalidRecipient);
        }

        let available = self.balance_of(&from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                available,
                required: amount,
            });
        }

        let split = self.quote_transfer(amount);

        self.balances.insert(from, available - amount);
        *self.balances.entry(to).or_insert(0) += split.to_recipient;
        if split.is_taxed() {
            *self.balances.entry(self.treasury).or_insert(0) += split.to_treasury;
        }

        debug!(
            %from,
            %to,
            amount = %amount,
            tax = %split.to_treasury,
            "token transfer"
        );

        Ok(split)
    }

    // ========================================================================
    // OWNER OPERATIONS
    // ========================================================================

    /// Flip the transfer tax. Returns the new state.
    pub fn toggle_take_fee(&mut self, caller: Address) -> Result<bool, TokenError> {
        self.ensure_owner(caller)?;
        self.tax_enabled = !self.tax_enabled;
        info!(enabled = self.tax_enabled, "transfer tax toggled");
        Ok(self.tax_enabled)
    }

    /// Hand control of the tax toggle to a new owner
    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<(), TokenError> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(TokenError::InvalidOwner);
        }

        info!(previous = %self.owner, %new_owner, "token ownership transferred");
        self.owner = new_owner;
        Ok(())
    }

    fn ensure_owner(&self, caller: Address) -> Result<(), TokenError> {
        if caller != self.owner {
            warn!(%caller, "owner-only token call rejected");
            return Err(TokenError::NotOwner);
        }
        Ok(())
    }
}
