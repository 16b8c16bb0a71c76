// Transfer tax arithmetic

use crate::account::Amount;
use serde::{Deserialize, Serialize};

/// Default tax rate in basis points (2%)
pub const DEFAULT_TAX_BPS: u16 = 200;

/// Basis points in 100%
pub const BPS_DENOMINATOR: u16 = 10_000;

/// How a single transfer amount is divided between recipient and treasury
///
/// Invariant: `to_recipient + to_treasury` equals the debited amount exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSplit {
    pub to_recipient: Amount,
    pub to_treasury: Amount,
}

impl TaxSplit {
    /// Split `amount` at `rate_bps`, flooring the treasury share
    pub fn compute(amount: Amount, rate_bps: u16) -> Self {
        let rate = Amount::from(rate_bps.min(BPS_DENOMINATOR));
        let denom = Amount::from(BPS_DENOMINATOR);

        // floor(amount * rate / denom) without overflowing on large amounts
        let to_treasury = (amount / denom) * rate + (amount % denom) * rate / denom;

        Self {
            to_recipient: amount - to_treasury,
            to_treasury,
        }
    }

    /// A transfer with tax disabled
    pub fn untaxed(amount: Amount) -> Self {
        Self {
            to_recipient: amount,
            to_treasury: 0,
        }
    }

    /// Total amount debited from the sender
    pub fn total(&self) -> Amount {
        self.to_recipient + self.to_treasury
    }

    /// Whether any tax was taken
    pub fn is_taxed(&self) -> bool {
        self.to_treasury > 0
    }
}
