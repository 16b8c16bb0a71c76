// Native currency balances

use crate::account::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NativeError {
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: Amount, required: Amount },

    #[error("Balance would overflow")]
    BalanceOverflow,
}

/// Balances of the native currency presented with contributions
///
/// New currency only enters through `credit`; every other movement is a
/// transfer, so the sum of balances always equals `total_issued`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NativeLedger {
    balances: HashMap<Address, Amount>,
    issued: Amount,
}

impl NativeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total_issued(&self) -> Amount {
        self.issued
    }

    /// Issue new currency to `account`. Returns the new balance.
    pub fn credit(&mut self, account: Address, amount: Amount) -> Result<Amount, NativeError> {
        let issued = self
            .issued
            .checked_add(amount)
            .ok_or(NativeError::BalanceOverflow)?;
        // Bounded by `issued`, so this cannot overflow once the line above passed
        let balance = self.balance_of(&account) + amount;

        self.issued = issued;
        self.balances.insert(account, balance);
        Ok(balance)
    }

    /// Fail unless `account` holds at least `amount`
    pub fn ensure_available(&self, account: &Address, amount: Amount) -> Result<(), NativeError> {
        let available = self.balance_of(account);
        if available < amount {
            return Err(NativeError::InsufficientFunds {
                available,
                required: amount,
            });
        }
        Ok(())
    }

    /// Move `amount` between two accounts
    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), NativeError> {
        self.ensure_available(&from, amount)?;

        let remaining = self.balance_of(&from) - amount;
        self.balances.insert(from, remaining);
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }
}
