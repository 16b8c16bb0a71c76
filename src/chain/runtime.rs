// Chain runtime - composes the native ledger, token ledger and crowdsale
//
// Each public operation validates everything that can fail before the first
// write, so a returned error always means nothing changed.

use crate::account::{Address, Amount};
use crate::chain::events::{Contract, Event, EventRecord};
use crate::chain::native::{NativeError, NativeLedger};
use crate::config::ChainConfig;
use crate::crowdsale::{Claim, Crowdsale, CrowdsaleError, Stage};
use crate::token::{TaxSplit, TokenError, TokenLedger};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors surfaced by chain operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error(transparent)]
    Crowdsale(#[from] CrowdsaleError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Native(#[from] NativeError),

    #[error("Invalid deployment config: {0}")]
    InvalidConfig(String),
}

impl ChainError {
    /// Whether the rejection was an authorization failure on an owner-only call
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ChainError::Crowdsale(CrowdsaleError::NotOwner) | ChainError::Token(TokenError::NotOwner)
        )
    }
}

/// The deployed system: both ledgers, the crowdsale, and the event log
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chain {
    deployer: Address,
    token_address: Address,
    native: NativeLedger,
    token: TokenLedger,
    crowdsale: Crowdsale,
    events: Vec<EventRecord>,
}

impl Chain {
    /// Deploy the token and crowdsale and distribute the initial supply
    ///
    /// The whole supply is minted to `deployer`, after which the crowdsale's
    /// allocation and the treasury's allocation are transferred out with the
    /// tax still disabled.
    pub fn deploy<I>(deployer: Address, treasury: Address, whitelist: I, config: &ChainConfig) -> Result<Self, ChainError>
    where
        I: IntoIterator<Item = Address>,
    {
        config
            .validate()
            .map_err(|e| ChainError::InvalidConfig(e.to_string()))?;

        let token_address = deployer.derive(0);
        let crowdsale_address = deployer.derive(1);

        let token = TokenLedger::new(deployer, treasury, &config.token)?;
        let crowdsale = Crowdsale::new(crowdsale_address, deployer, whitelist, config.crowdsale.clone())?;

        let mut chain = Self {
            deployer,
            token_address,
            native: NativeLedger::new(),
            token,
            crowdsale,
            events: Vec::new(),
        };

        chain.emit(Event::Deployed {
            deployer,
            token: token_address,
            crowdsale: crowdsale_address,
            treasury,
        });

        for (to, amount) in [
            (crowdsale_address, config.ico_allocation_base()),
            (treasury, config.treasury_allocation_base()),
        ] {
            if amount == 0 {
                continue;
            }
            chain.transfer(deployer, to, amount)?;
        }

        info!(%deployer, token = %token_address, crowdsale = %crowdsale_address, "chain deployed");
        Ok(chain)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn deployer(&self) -> Address {
        self.deployer
    }

    pub fn token_address(&self) -> Address {
        self.token_address
    }

    pub fn crowdsale_address(&self) -> Address {
        self.crowdsale.address()
    }

    pub fn token(&self) -> &TokenLedger {
        &self.token
    }

    pub fn crowdsale(&self) -> &Crowdsale {
        &self.crowdsale
    }

    pub fn native(&self) -> &NativeLedger {
        &self.native
    }

    pub fn native_balance(&self, account: &Address) -> Amount {
        self.native.balance_of(account)
    }

    pub fn token_balance(&self, account: &Address) -> Amount {
        self.token.balance_of(account)
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Events with a sequence number of at least `from`
    pub fn events_since(&self, from: u64) -> &[EventRecord] {
        let start = self.events.partition_point(|record| record.seq < from);
        &self.events[start..]
    }

    // ========================================================================
    // NATIVE CURRENCY
    // ========================================================================

    /// Issue native currency to `account` from outside the system
    pub fn fund(&mut self, account: Address, amount: Amount) -> Result<Amount, ChainError> {
        let balance = self.native.credit(account, amount)?;
        self.emit(Event::Funded { account, amount });
        Ok(balance)
    }

    // ========================================================================
    // CROWDSALE OPERATIONS
    // ========================================================================

    /// Contribute `value` of `sender`'s native currency to the crowdsale
    pub fn buy_tokens(&mut self, sender: Address, value: Amount) -> Result<Amount, ChainError> {
        // Sale rules take precedence over the sender's native balance
        self.crowdsale.check_purchase(&sender, value)?;
        self.native.ensure_available(&sender, value)?;

        let stage = self.crowdsale.stage();
        let contributed = self.crowdsale.buy_tokens(sender, value)?;
        self.native.transfer(sender, self.crowdsale.address(), value)?;

        self.emit(Event::Contribution {
            contributor: sender,
            value,
            stage,
        });
        Ok(contributed)
    }

    /// Redeem `sender`'s outstanding contribution for tokens
    pub fn claim_token(&mut self, sender: Address) -> Result<Claim, ChainError> {
        let claim = self.crowdsale.claim_token(sender, &mut self.token)?;

        self.emit_transfer(self.crowdsale.address(), sender, claim.split);
        self.emit(Event::Claimed {
            contributor: sender,
            redeemed: claim.redeemed,
            tokens: claim.tokens,
        });
        Ok(claim)
    }

    /// Pay all custody funds out to the crowdsale owner
    pub fn withdraw_funds(&mut self, sender: Address) -> Result<Amount, ChainError> {
        let custody = self.crowdsale.address();
        // Custody always holds exactly the unwithdrawn raise
        self.native
            .ensure_available(&custody, self.crowdsale.available_funds_to_withdraw())?;

        let amount = self.crowdsale.withdraw_funds(sender)?;
        self.native.transfer(custody, sender, amount)?;

        self.emit(Event::Withdrawn { owner: sender, amount });
        Ok(amount)
    }

    pub fn toggle_funding_state(&mut self, sender: Address) -> Result<bool, ChainError> {
        let active = self.crowdsale.toggle_funding_state(sender)?;
        self.emit(Event::FundingToggled { active });
        Ok(active)
    }

    pub fn add_to_whitelist(&mut self, sender: Address, accounts: &[Address]) -> Result<usize, ChainError> {
        let added = self.crowdsale.add_to_whitelist(sender, accounts)?;
        self.emit(Event::Whitelisted {
            accounts: accounts.to_vec(),
        });
        Ok(added)
    }

    pub fn advance_stage(&mut self, sender: Address, target: Stage) -> Result<(), ChainError> {
        let from = self.crowdsale.stage();
        self.crowdsale.advance_stage(sender, target)?;
        self.emit(Event::StageAdvanced { from, to: target });
        Ok(())
    }

    // ========================================================================
    // TOKEN OPERATIONS
    // ========================================================================

    pub fn transfer(&mut self, sender: Address, to: Address, amount: Amount) -> Result<TaxSplit, ChainError> {
        let split = self.token.transfer(sender, to, amount)?;
        self.emit_transfer(sender, to, split);
        Ok(split)
    }

    pub fn approve(&mut self, sender: Address, spender: Address, amount: Amount) -> Result<(), ChainError> {
        self.token.approve(sender, spender, amount)?;
        self.emit(Event::Approval {
            owner: sender,
            spender,
            amount,
        });
        Ok(())
    }

    pub fn transfer_from(
        &mut self,
        sender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<TaxSplit, ChainError> {
        let split = self.token.transfer_from(sender, from, to, amount)?;
        self.emit_transfer(from, to, split);
        Ok(split)
    }

    pub fn toggle_take_fee(&mut self, sender: Address) -> Result<bool, ChainError> {
        let enabled = self.token.toggle_take_fee(sender)?;
        self.emit(Event::TaxToggled { enabled });
        Ok(enabled)
    }

    // ========================================================================
    // OWNERSHIP
    // ========================================================================

    pub fn transfer_ownership(&mut self, sender: Address, contract: Contract, new_owner: Address) -> Result<(), ChainError> {
        let previous = match contract {
            Contract::Token => {
                let previous = self.token.owner();
                self.token.transfer_ownership(sender, new_owner)?;
                previous
            }
            Contract::Crowdsale => {
                let previous = self.crowdsale.owner();
                self.crowdsale.transfer_ownership(sender, new_owner)?;
                previous
            }
        };

        self.emit(Event::OwnershipTransferred {
            contract,
            previous,
            new_owner,
        });
        Ok(())
    }

    // ========================================================================
    // EVENT LOG
    // ========================================================================

    fn emit(&mut self, event: Event) {
        let seq = self.events.len() as u64;
        debug!(seq, %event, "event");
        self.events.push(EventRecord { seq, event });
    }

    fn emit_transfer(&mut self, from: Address, to: Address, split: TaxSplit) {
        self.emit(Event::Transfer {
            from,
            to,
            amount: split.total(),
            tax: split.to_treasury,
        });
    }
}
