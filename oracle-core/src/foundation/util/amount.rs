//! Fixed-point decimal parsing for BTC amounts and ticker prices.
//!
//! Values are carried as integers scaled by `10^AMOUNT_DECIMALS` so that comparisons
//! and fee arithmetic never touch floating point.

use crate::foundation::{OracleError, AMOUNT_DECIMALS, SATOSHIS_PER_BTC};

/// Largest exponent magnitude accepted in scientific notation.
const MAX_EXPONENT: i64 = 32;

/// Parses a decimal string (`"612.5"`, `"-3"`, `"0.0001"`, `"5.46e-6"`) into an integer scaled by `10^decimals`.
///
/// Scientific notation is accepted because JSON encoders print small floats that way.
pub fn parse_decimal_scaled(field: &str, raw: &str, decimals: u32) -> Result<i128, OracleError> {
    let invalid = |details: &str| OracleError::InvalidAmount { field: field.to_string(), details: format!("{details}: '{raw}'") };

    let value = raw.trim();
    let (negative, unsigned) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let (mantissa, exponent) = match unsigned.split_once(|c| c == 'e' || c == 'E') {
        Some((mantissa, exponent)) => {
            let exponent: i64 = exponent.parse().map_err(|_| invalid("not a decimal number"))?;
            if exponent.abs() > MAX_EXPONENT {
                return Err(invalid("exponent out of range"));
            }
            (mantissa, exponent)
        }
        None => (unsigned, 0),
    };
    let (whole, fraction) = match mantissa.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (mantissa, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("empty decimal"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("not a decimal number"));
    }
    let (whole, fraction) = shift_decimal_point(whole, fraction, exponent);
    let (whole, fraction) = (whole.as_str(), fraction.as_str());

    let scale = decimals as usize;
    let (kept, dropped) = if fraction.len() > scale { fraction.split_at(scale) } else { (fraction, "") };
    if dropped.bytes().any(|b| b != b'0') {
        return Err(invalid("too many decimal places"));
    }

    let mut scaled: i128 = 0;
    for b in whole.bytes().chain(kept.bytes()).chain(std::iter::repeat(b'0').take(scale - kept.len())) {
        scaled = scaled
            .checked_mul(10)
            .and_then(|v| v.checked_add(i128::from(b - b'0')))
            .ok_or_else(|| invalid("value overflows"))?;
    }
    Ok(if negative { -scaled } else { scaled })
}

/// Moves the decimal point of `whole.fraction` by `exponent` places.
fn shift_decimal_point(whole: &str, fraction: &str, exponent: i64) -> (String, String) {
    let digits = format!("{whole}{fraction}");
    let point = whole.len() as i64 + exponent;
    if point <= 0 {
        (String::new(), format!("{}{}", "0".repeat(point.unsigned_abs() as usize), digits))
    } else if point as usize >= digits.len() {
        (format!("{}{}", digits, "0".repeat(point as usize - digits.len())), String::new())
    } else {
        let (whole, fraction) = digits.split_at(point as usize);
        (whole.to_string(), fraction.to_string())
    }
}

/// Parses a BTC decimal amount into satoshis. Negative amounts are rejected.
pub fn btc_to_satoshi(field: &str, raw: &str) -> Result<u64, OracleError> {
    let scaled = parse_decimal_scaled(field, raw, AMOUNT_DECIMALS)?;
    u64::try_from(scaled)
        .map_err(|_| OracleError::InvalidAmount { field: field.to_string(), details: format!("amount must be non-negative: '{raw}'") })
}

/// Renders satoshis as a BTC decimal string with eight fractional digits.
pub fn satoshi_to_btc_string(satoshi: u64) -> String {
    format!("{}.{:08}", satoshi / SATOSHIS_PER_BTC, satoshi % SATOSHIS_PER_BTC)
}
