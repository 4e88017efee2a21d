//! Fixed-point token-amount arithmetic.
//!
//! All financial values are carried as unsigned integers in base units
//! (amount × 10^decimals). Floating point is never used here: the funded
//! percentage and the unit conversions are pure integer computations so
//! large balances cannot lose precision.

use crate::errors::{ClientError, Result};

/// Percentage of a fund that has been funded, as a trimmed decimal string
/// with up to two fractional digits (`"0"`, `"33.3"`, `"100"`).
///
/// This is a display function, not a validator: `funded > available` yields
/// a value above 100 rather than an error, and `available == 0` is defined
/// as `"0"` instead of dividing by zero. Never panics.
pub fn percentage_funded(funded: u128, available: u128) -> String {
    if available == 0 {
        return "0".to_string();
    }

    // Scale by 10000 first to keep two decimal digits through the division.
    let basis = match funded.checked_mul(10_000) {
        Some(scaled) => scaled / available,
        // Astronomically funded; the quotient alone is already exact enough.
        None => (funded / available).saturating_mul(10_000),
    };

    let whole = basis / 100;
    let frac = (basis % 100) as u32;
    if frac == 0 {
        whole.to_string()
    } else if frac % 10 == 0 {
        format!("{whole}.{}", frac / 10)
    } else {
        format!("{whole}.{frac:02}")
    }
}

/// Parse a human-entered decimal amount (e.g. `"10.50"`) into base units.
///
/// Fails with [`ClientError::MalformedInput`] on empty input, stray
/// characters, more fractional digits than the token carries, or overflow.
pub fn parse_units(amount: &str, decimals: u32) -> Result<u128> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(ClientError::MalformedInput("empty amount".to_string()));
    }

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };

    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
        || (int_part.is_empty() && frac_part.is_empty())
    {
        return Err(ClientError::MalformedInput(format!(
            "not a decimal amount: {trimmed:?}"
        )));
    }
    if frac_part.len() as u32 > decimals {
        return Err(ClientError::MalformedInput(format!(
            "amount {trimmed:?} has more than {decimals} decimal places"
        )));
    }

    let overflow = || ClientError::MalformedInput(format!("amount {trimmed:?} overflows"));
    let scale = 10u128.pow(decimals);
    let whole: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| overflow())?
    };
    let frac: u128 = if frac_part.is_empty() {
        0
    } else {
        let parsed: u128 = frac_part.parse().map_err(|_| overflow())?;
        parsed * 10u128.pow(decimals - frac_part.len() as u32)
    };

    whole
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac))
        .ok_or_else(overflow)
}

/// Render base units as a human decimal string with trailing zeros trimmed.
pub fn format_units(amount: u128, decimals: u32) -> String {
    let scale = 10u128.pow(decimals);
    let whole = amount / scale;
    let frac = amount % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac_str = format!("{frac:0width$}", width = decimals as usize);
    format!("{whole}.{}", frac_str.trim_end_matches('0'))
}
