// Event log entries for accepted operations

use crate::account::{units, Address, Amount};
use crate::crowdsale::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which contract an ownership change applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Contract {
    Token,
    Crowdsale,
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contract::Token => f.write_str("token"),
            Contract::Crowdsale => f.write_str("ico"),
        }
    }
}

impl FromStr for Contract {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "token" => Ok(Contract::Token),
            "ico" | "crowdsale" => Ok(Contract::Crowdsale),
            other => Err(format!("unknown contract '{}': expected token or ico", other)),
        }
    }
}

/// Something that happened on the chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Deployed {
        deployer: Address,
        token: Address,
        crowdsale: Address,
        treasury: Address,
    },
    Funded {
        account: Address,
        amount: Amount,
    },
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
        tax: Amount,
    },
    Approval {
        owner: Address,
        spender: Address,
        amount: Amount,
    },
    TaxToggled {
        enabled: bool,
    },
    Contribution {
        contributor: Address,
        value: Amount,
        stage: Stage,
    },
    Claimed {
        contributor: Address,
        redeemed: Amount,
        tokens: Amount,
    },
    Withdrawn {
        owner: Address,
        amount: Amount,
    },
    FundingToggled {
        active: bool,
    },
    Whitelisted {
        accounts: Vec<Address>,
    },
    StageAdvanced {
        from: Stage,
        to: Stage,
    },
    OwnershipTransferred {
        contract: Contract,
        previous: Address,
        new_owner: Address,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_amount = units::format_units;
        match self {
            Event::Deployed { deployer, token, crowdsale, treasury } => write!(
                f,
                "deployed by {} (token {}, ico {}, treasury {})",
                deployer, token, crowdsale, treasury
            ),
            Event::Funded { account, amount } => write!(f, "funded {} with {}", account, fmt_amount(*amount)),
            Event::Transfer { from, to, amount, tax } => write!(
                f,
                "transfer {} -> {}: {} (tax {})",
                from,
                to,
                fmt_amount(*amount),
                fmt_amount(*tax)
            ),
            Event::Approval { owner, spender, amount } => {
                write!(f, "approval {} -> {}: {}", owner, spender, fmt_amount(*amount))
            }
            Event::TaxToggled { enabled } => write!(f, "transfer tax enabled: {}", enabled),
            Event::Contribution { contributor, value, stage } => {
                write!(f, "contribution from {}: {} during {}", contributor, fmt_amount(*value), stage)
            }
            Event::Claimed { contributor, redeemed, tokens } => write!(
                f,
                "claim by {}: {} redeemed for {} tokens",
                contributor,
                fmt_amount(*redeemed),
                fmt_amount(*tokens)
            ),
            Event::Withdrawn { owner, amount } => write!(f, "withdrawal by {}: {}", owner, fmt_amount(*amount)),
            Event::FundingToggled { active } => write!(f, "funding active: {}", active),
            Event::Whitelisted { accounts } => write!(f, "whitelisted {} account(s)", accounts.len()),
            Event::StageAdvanced { from, to } => write!(f, "stage {} -> {}", from, to),
            Event::OwnershipTransferred { contract, previous, new_owner } => {
                write!(f, "{} ownership {} -> {}", contract, previous, new_owner)
            }
        }
    }
}

/// An event with its position in the log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub event: Event,
}
