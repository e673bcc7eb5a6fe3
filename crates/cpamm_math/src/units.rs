//! Decimal text <-> 18-decimal fixed-point conversion

use crate::{MathError, Result, DECIMALS, SCALE};

/// Parse decimal text such as `"12.5"` into raw fixed-point units
///
/// At most `DECIMALS` fractional digits are accepted; anything finer than one
/// raw unit is rejected rather than rounded.
pub fn parse_units(text: &str) -> Result<u128> {
    let text = text.trim();
    let (whole, frac) = match text.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (text, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(MathError::Malformed);
    }
    if frac.len() > DECIMALS as usize {
        return Err(MathError::Malformed);
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(MathError::Malformed);
    }

    let whole_units = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u128>()
            .map_err(|_| MathError::Overflow)?
            .checked_mul(SCALE)
            .ok_or(MathError::Overflow)?
    };
    let frac_units = if frac.is_empty() {
        0
    } else {
        let digits = frac.parse::<u128>().map_err(|_| MathError::Malformed)?;
        digits * 10u128.pow(DECIMALS - frac.len() as u32)
    };

    whole_units.checked_add(frac_units).ok_or(MathError::Overflow)
}

/// Render raw fixed-point units as decimal text without trailing zeros
pub fn format_units(units: u128) -> String {
    let whole = units / SCALE;
    let frac = units % SCALE;
    if frac == 0 {
        return whole.to_string();
    }
    let padded = format!("{:0width$}", frac, width = DECIMALS as usize);
    format!("{}.{}", whole, padded.trim_end_matches('0'))
}
