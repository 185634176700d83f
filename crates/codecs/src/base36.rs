//! Base-36 integer conversion over the alphabet `0-9a-z`.
//!
//! Conversions run over `u128` end-to-end. Wire quantities are 8-decimal
//! fixed-point values scaled by 1e8, which exceed 53-bit float precision but
//! sit comfortably inside u128's 38 decimal digits, so arithmetic here is
//! exact by construction.

use crate::errors::CodecError;

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Encodes an integer as lowercase base-36.
pub fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_owned();
    }
    let mut buf = Vec::with_capacity(25);
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    // Digits are ASCII by construction.
    String::from_utf8(buf).expect("codecs: base36 digits are ascii")
}

/// Decodes a base-36 string (case-insensitive) into an integer.
pub fn from_base36(s: &str) -> Result<u128, CodecError> {
    if s.is_empty() {
        return Err(CodecError::Empty);
    }
    let mut acc: u128 = 0;
    for c in s.chars() {
        let d = c.to_digit(36).ok_or(CodecError::InvalidDigit(c, 36))? as u128;
        acc = acc
            .checked_mul(36)
            .and_then(|v| v.checked_add(d))
            .ok_or(CodecError::Overflow(36))?;
    }
    Ok(acc)
}

fn parse_dec(dec: &str) -> Result<u128, CodecError> {
    if dec.is_empty() {
        return Err(CodecError::Empty);
    }
    if let Some(c) = dec.chars().find(|c| !c.is_ascii_digit()) {
        return Err(CodecError::InvalidDigit(c, 10));
    }
    dec.parse().map_err(|_| CodecError::Overflow(10))
}

fn parse_hex(hex_str: &str) -> Result<u128, CodecError> {
    if hex_str.is_empty() {
        return Err(CodecError::Empty);
    }
    u128::from_str_radix(hex_str, 16).map_err(|_| CodecError::InvalidHex(hex_str.to_owned()))
}

/// Converts a decimal digit string to base-36.
pub fn dec_to_base36(dec: &str) -> Result<String, CodecError> {
    Ok(to_base36(parse_dec(dec)?))
}

/// Converts a hex digit string to base-36.
pub fn hex_to_base36(hex_str: &str) -> Result<String, CodecError> {
    Ok(to_base36(parse_hex(hex_str)?))
}

/// Converts a hex digit string to its decimal digit string.
pub fn hex_to_dec(hex_str: &str) -> Result<String, CodecError> {
    Ok(parse_hex(hex_str)?.to_string())
}

/// Converts a decimal digit string to lowercase hex.
pub fn dec_to_hex(dec: &str) -> Result<String, CodecError> {
    Ok(format!("{:x}", parse_dec(dec)?))
}
