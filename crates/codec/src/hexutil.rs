//! Hex strings, DNA decimal amounts and on-chain counter decoding.

use crate::error::CodecError;
use num_bigint::BigUint;
use num_traits::Zero;

/// Atomic units per DNA, as a decimal string.
pub const DNA_BASE: &str = "1000000000000000000";

/// Number of decimal places in a DNA amount.
const DNA_DECIMALS: usize = 18;

/// Decode a hex string with or without `0x` prefix.
pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>, CodecError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() % 2 != 0 {
        return Err(CodecError::malformed(format!("odd-length hex string ({} digits)", s.len())));
    }
    hex::decode(s).map_err(|e| CodecError::malformed(format!("hex: {e}")))
}

/// Lowercase hex encoding, optionally `0x`-prefixed.
pub fn to_hex_string(bytes: &[u8], with_prefix: bool) -> String {
    if with_prefix {
        format!("0x{}", hex::encode(bytes))
    } else {
        hex::encode(bytes)
    }
}

/// Parse a decimal DNA amount (e.g. `"1.123"`) into atomic units (× 10^18).
///
/// Negative amounts and amounts that are not a whole number of atomic units are rejected.
pub fn float_string_to_dna(value: &str) -> Result<BigUint, CodecError> {
    let value = value.trim();
    let value = value.strip_prefix('+').unwrap_or(value);
    if value.starts_with('-') {
        return Err(CodecError::malformed(format!("negative amount {value:?}")));
    }
    let (int_part, frac_part) = match value.split_once('.') {
        Some((i, f)) => (i, f),
        None => (value, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(CodecError::malformed("empty amount"));
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(CodecError::malformed(format!("not a decimal amount: {value:?}")));
    }
    let frac = if frac_part.len() > DNA_DECIMALS {
        let (kept, rest) = frac_part.split_at(DNA_DECIMALS);
        if rest.bytes().any(|b| b != b'0') {
            return Err(CodecError::malformed(format!(
                "amount {value:?} has more than {DNA_DECIMALS} decimals"
            )));
        }
        kept.to_string()
    } else {
        format!("{frac_part:0<width$}", width = DNA_DECIMALS)
    };
    let digits = format!("{int_part}{frac}");
    digits
        .parse::<BigUint>()
        .map_err(|e| CodecError::malformed(format!("amount {value:?}: {e}")))
}

/// Render atomic units as a trimmed DNA decimal (`"10"`, `"500.005"`).
pub fn dna_to_float_string(value: &BigUint) -> String {
    let digits = value.to_string();
    let digits = if digits.len() <= DNA_DECIMALS {
        format!("{digits:0>width$}", width = DNA_DECIMALS + 1)
    } else {
        digits
    };
    let (int_part, frac_part) = digits.split_at(digits.len() - DNA_DECIMALS);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    }
}

/// Decode an on-chain numeric counter to its decimal string.
///
/// The counter is stored little-endian with trailing zero bytes trimmed; the result is the
/// smallest value whose canonical encoding equals `hex`, so zero padding is tolerated.
/// An empty value carries no number and is malformed.
pub fn hex_to_decimal(hex: &str) -> Result<String, CodecError> {
    let bytes = hex_to_bytes(hex)?;
    if bytes.is_empty() {
        return Err(CodecError::malformed("empty numeric value"));
    }
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    let value = BigUint::from_bytes_le(&bytes[..end]);
    if value.is_zero() {
        return Ok("0".to_string());
    }
    Ok(value.to_string())
}
