//! SOL <-> lamport conversion.
//!
//! User input is parsed as an exact decimal string. Floating point is never
//! involved, so every value with at most nine fractional digits converts
//! without loss.

use crate::error::TxError;

/// Number of lamports in one SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Fractional digits carried by a lamport amount.
pub const SOL_DECIMALS: usize = 9;

/// Parse a user-entered SOL amount into lamports.
///
/// Accepts `"1"`, `"0.5"`, `".25"` and `"2."`. Rejects empty, signed,
/// non-numeric, zero, over-precise (more than 9 fractional digits) and
/// overflowing input.
pub fn sol_to_lamports(input: &str) -> Result<u64, TxError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TxError::InvalidAmount("amount is empty".into()));
    }

    let (whole, frac) = match input.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (input, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(TxError::InvalidAmount(format!("`{input}` is not a number")));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(TxError::InvalidAmount(format!("`{input}` is not a number")));
    }
    if frac.len() > SOL_DECIMALS {
        return Err(TxError::InvalidAmount(format!(
            "at most {SOL_DECIMALS} decimal places are supported"
        )));
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| TxError::InvalidAmount(format!("`{input}` is too large")))?
    };

    let frac_lamports: u64 = if frac.is_empty() {
        0
    } else {
        // Right-pad to nine digits: "5" -> "500000000".
        format!("{frac:0<width$}", width = SOL_DECIMALS)
            .parse()
            .map_err(|_| TxError::InvalidAmount(format!("`{input}` is not a number")))?
    };

    let lamports = whole
        .checked_mul(LAMPORTS_PER_SOL)
        .and_then(|l| l.checked_add(frac_lamports))
        .ok_or_else(|| TxError::InvalidAmount(format!("`{input}` is too large")))?;

    if lamports == 0 {
        return Err(TxError::InvalidAmount("amount must be greater than 0".into()));
    }

    Ok(lamports)
}

/// Render lamports as an exact SOL decimal string, trimming trailing zeros.
pub fn lamports_to_sol_string(lamports: u64) -> String {
    let whole = lamports / LAMPORTS_PER_SOL;
    let frac = lamports % LAMPORTS_PER_SOL;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:0>width$}", width = SOL_DECIMALS);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Render lamports as SOL with a fixed number of places, rounding half up.
pub fn format_sol(lamports: u64, places: usize) -> String {
    let places = places.min(SOL_DECIMALS);
    let unit = 10u128.pow((SOL_DECIMALS - places) as u32);
    let scale = 10u128.pow(places as u32);
    let rounded = (u128::from(lamports) + unit / 2) / unit;
    let whole = rounded / scale;
    if places == 0 {
        return whole.to_string();
    }
    format!("{whole}.{:0>places$}", rounded % scale)
}
