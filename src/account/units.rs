// Base-unit arithmetic
//
// Every amount in the system, native currency and token alike, is an integer
// count of base units with 18 decimals.

use thiserror::Error;

/// Amount in base units
pub type Amount = u128;

/// Number of decimal places of a whole unit
pub const DECIMALS: u32 = 18;

/// Base units per whole unit (10^18)
pub const UNIT: Amount = 1_000_000_000_000_000_000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UnitsError {
    #[error("Empty amount")]
    Empty,

    #[error("Invalid amount: {0}")]
    InvalidFormat(String),

    #[error("Too many fractional digits: at most {max}, got {got}")]
    TooPrecise { max: u32, got: usize },

    #[error("Amount overflows base units")]
    Overflow,
}

/// Convert a whole-unit count to base units, saturating on overflow
pub fn whole(units: u128) -> Amount {
    units.saturating_mul(UNIT)
}

/// Parse a decimal string ("1", "0.1", "1500.25") into base units
pub fn parse_units(s: &str) -> Result<Amount, UnitsError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(UnitsError::InvalidFormat(s.to_string()));
    }

    let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(UnitsError::InvalidFormat(s.to_string()));
    }

    if frac_part.len() > DECIMALS as usize {
        return Err(UnitsError::TooPrecise {
            max: DECIMALS,
            got: frac_part.len(),
        });
    }

    let int_value: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| UnitsError::Overflow)?
    };

    let frac_value: u128 = if frac_part.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac_part, width = DECIMALS as usize);
        padded.parse().map_err(|_| UnitsError::Overflow)?
    };

    int_value
        .checked_mul(UNIT)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or(UnitsError::Overflow)
}

/// Render base units as a decimal string, trimming trailing zeros
pub fn format_units(amount: Amount) -> String {
    let int_part = amount / UNIT;
    let frac_part = amount % UNIT;

    if frac_part == 0 {
        return int_part.to_string();
    }

    let frac = format!("{:0>width$}", frac_part, width = DECIMALS as usize);
    format!("{}.{}", int_part, frac.trim_end_matches('0'))
}
