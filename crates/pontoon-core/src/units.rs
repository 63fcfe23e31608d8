//! Decimal amount arithmetic at token precision
//!
//! Amounts cross the system as decimal strings and are compared as integer
//! base units at the token's declared precision. No floating point.

use crate::errors::AmountError;

/// Parse a decimal string into base units at the given precision.
///
/// Rejects input with more fractional digits than `decimals`.
pub fn parse_units(input: &str, decimals: u32) -> Result<u128, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let malformed = || AmountError::Malformed {
        input: input.to_string(),
    };

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(malformed());
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    if !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    if frac_part.len() as u32 > decimals {
        return Err(AmountError::ExcessPrecision {
            input: input.to_string(),
            decimals,
        });
    }

    let scale = 10u128
        .checked_pow(decimals)
        .ok_or(AmountError::Overflow)?;

    let int_value: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| AmountError::Overflow)?
    };

    let frac_value: u128 = if frac_part.is_empty() {
        0
    } else {
        let padded: u128 = frac_part.parse().map_err(|_| AmountError::Overflow)?;
        let pad_pow = 10u128
            .checked_pow(decimals - frac_part.len() as u32)
            .ok_or(AmountError::Overflow)?;
        padded.checked_mul(pad_pow).ok_or(AmountError::Overflow)?
    };

    int_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or(AmountError::Overflow)
}

/// Format base units back into a decimal string.
///
/// Trailing fractional zeros are trimmed, but at least one fractional digit
/// is kept (`10.0`, not `10`).
pub fn format_units(value: u128, decimals: u32) -> String {
    if decimals == 0 {
        return format!("{}.0", value);
    }
    let scale = 10u128.pow(decimals);
    let int_part = value / scale;
    let frac_part = value % scale;

    let frac = format!("{:0width$}", frac_part, width = decimals as usize);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        format!("{}.0", int_part)
    } else {
        format!("{}.{}", int_part, frac)
    }
}

/// Render a decimal string with exactly `places` fractional digits,
/// rounding half away from zero.
pub fn to_fixed(input: &str, places: u32) -> Result<String, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    let malformed = || AmountError::Malformed {
        input: input.to_string(),
    };

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(malformed());
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(malformed());
    }

    // Round at `places` using the digit after the cut.
    let kept: String = frac_part.chars().take(places as usize).collect();
    let kept_padded = format!("{:0<width$}", kept, width = places as usize);
    let mut scaled: u128 = if places == 0 {
        if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| AmountError::Overflow)?
        }
    } else {
        let int_value: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| AmountError::Overflow)?
        };
        let frac_value: u128 = if kept_padded.is_empty() {
            0
        } else {
            kept_padded.parse().map_err(|_| AmountError::Overflow)?
        };
        int_value
            .checked_mul(10u128.pow(places))
            .and_then(|v| v.checked_add(frac_value))
            .ok_or(AmountError::Overflow)?
    };

    if let Some(next) = frac_part.chars().nth(places as usize) {
        if next as u8 - b'0' >= 5 {
            scaled = scaled.checked_add(1).ok_or(AmountError::Overflow)?;
        }
    }

    if places == 0 {
        return Ok(format!("{}", scaled));
    }
    let scale = 10u128.pow(places);
    Ok(format!(
        "{}.{:0width$}",
        scaled / scale,
        scaled % scale,
        width = places as usize
    ))
}

/// Parse a raw base-unit decimal string, as returned by allowance queries.
///
/// Allowances approved at the max uint256 value exceed u128; those saturate,
/// which keeps `allowance >= requested` comparisons correct.
pub fn parse_base_units(input: &str) -> Result<u128, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(AmountError::Malformed {
            input: input.to_string(),
        });
    }
    Ok(trimmed.parse().unwrap_or(u128::MAX))
}
