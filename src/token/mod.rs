// Token module - THE FUNGIBLE LEDGER
// Fixed-supply token balances with an owner-controlled transfer tax

mod ledger;
mod tax;

pub use ledger::{TokenConfig, TokenError, TokenLedger};
pub use tax::{TaxSplit, BPS_DENOMINATOR, DEFAULT_TAX_BPS};
