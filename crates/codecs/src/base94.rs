//! Base-94 conversion over printable ASCII 33..=126.
//!
//! Used by settlement messages for price fields, where base-36 is too loose
//! and full decimal-fraction support is needed. A fractional price encodes
//! as `integerPart '.' fractionalPart '_'` with both parts in base-94; the
//! fractional part carries the 8-decimal scaled remainder.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{amount::COIN, errors::CodecError};

const FIRST: u8 = 33; // '!'
const LAST: u8 = 126; // '~'
const BASE: u128 = 94;

/// Encodes an integer as base-94 over printable ASCII 33..=126.
pub fn to_base94(mut value: u128) -> String {
    if value == 0 {
        return (FIRST as char).to_string();
    }
    let mut buf = Vec::new();
    while value > 0 {
        buf.push(FIRST + (value % BASE) as u8);
        value /= BASE;
    }
    buf.reverse();
    String::from_utf8(buf).expect("codecs: base94 digits are ascii")
}

/// Decodes a base-94 string into an integer.
pub fn from_base94(s: &str) -> Result<u128, CodecError> {
    if s.is_empty() {
        return Err(CodecError::Empty);
    }
    let mut acc: u128 = 0;
    for c in s.chars() {
        let b = c as u32;
        if !(FIRST as u32..=LAST as u32).contains(&b) {
            return Err(CodecError::InvalidDigit(c, 94));
        }
        let d = (b - FIRST as u32) as u128;
        acc = acc
            .checked_mul(BASE)
            .and_then(|v| v.checked_add(d))
            .ok_or(CodecError::Overflow(94))?;
    }
    Ok(acc)
}

/// Width of the fractional digit group. 94^5 > 1e8 > 94^4, so five digits
/// always hold the scaled remainder. The width is fixed because '.' is
/// itself a valid base-94 digit; a decoder that searched for the separator
/// would mis-split whenever an integer part contains the digit '.'.
const FRAC_WIDTH: usize = 5;

/// A settlement price with 8-decimal precision, stored as 1e-8 units.
///
/// Wire form is the documented scaling+separator scheme: whole prices encode
/// as a bare base-94 integer, fractional prices as
/// `base94(int) '.' base94(frac * 1e8) '_'` with the fractional group padded
/// to exactly five digits.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Default,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct Base94Price(u128);

impl Base94Price {
    pub fn from_scaled(scaled: u128) -> Self {
        Self(scaled)
    }

    pub fn to_scaled(self) -> u128 {
        self.0
    }

    pub fn encode(self) -> String {
        let int = self.0 / COIN;
        let frac = self.0 % COIN;
        if frac == 0 {
            to_base94(int)
        } else {
            let mut frac_digits = to_base94(frac);
            while frac_digits.len() < FRAC_WIDTH {
                frac_digits.insert(0, FIRST as char);
            }
            format!("{}.{}_", to_base94(int), frac_digits)
        }
    }

    pub fn decode(s: &str) -> Result<Self, CodecError> {
        match s.strip_suffix('_') {
            Some(body) => {
                // Fixed-width fractional group: last five digits, preceded
                // by the '.' separator.
                if !body.is_ascii() || body.len() < FRAC_WIDTH + 2 {
                    return Err(CodecError::MalformedPrice);
                }
                let (head, frac) = body.split_at(body.len() - FRAC_WIDTH);
                let int = head.strip_suffix('.').ok_or(CodecError::MalformedPrice)?;
                let int = from_base94(int)?;
                let frac = from_base94(frac)?;
                if frac >= COIN {
                    return Err(CodecError::MalformedPrice);
                }
                int.checked_mul(COIN)
                    .and_then(|v| v.checked_add(frac))
                    .map(Self)
                    .ok_or(CodecError::Overflow(94))
            }
            None => {
                let int = from_base94(s)?;
                int.checked_mul(COIN).map(Self).ok_or(CodecError::Overflow(94))
            }
        }
    }
}

impl fmt::Debug for Base94Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Base94Price({}.{:08})", self.0 / COIN, self.0 % COIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_roundtrip() {
        for v in [0u128, 1, 93, 94, 8835, 1_000_000_007] {
            assert_eq!(from_base94(&to_base94(v)).unwrap(), v);
        }
    }

    #[test]
    fn digits_are_printable() {
        let s = to_base94(u64::MAX as u128);
        assert!(s.bytes().all(|b| (0x21..=0x7e).contains(&b)));
    }

    #[test]
    fn whole_price_has_no_separator() {
        let p = Base94Price::from_scaled(42 * COIN);
        let s = p.encode();
        assert!(!s.contains('.'));
        assert_eq!(Base94Price::decode(&s).unwrap(), p);
    }

    #[test]
    fn fractional_price_roundtrip() {
        // 3.14159265
        let p = Base94Price::from_scaled(314_159_265);
        let s = p.encode();
        assert!(s.ends_with('_'));
        assert!(s.contains('.'));
        assert_eq!(Base94Price::decode(&s).unwrap(), p);
    }

    #[test]
    fn frac_group_is_fixed_width() {
        // 1.00000001 -> frac scaled value 1, still five digits on the wire
        let p = Base94Price::from_scaled(COIN + 1);
        let s = p.encode();
        assert_eq!(s.len(), 1 + 1 + FRAC_WIDTH + 1);
        assert_eq!(Base94Price::decode(&s).unwrap(), p);
    }

    #[test]
    fn int_part_may_contain_separator_digit() {
        // 13 encodes as the single digit '.'; the fixed-width frac group
        // keeps decode unambiguous anyway.
        assert_eq!(to_base94(13), ".");
        let p = Base94Price::from_scaled(13 * COIN + 7);
        assert_eq!(Base94Price::decode(&p.encode()).unwrap(), p);
    }

    #[test]
    fn rejects_out_of_alphabet() {
        assert!(from_base94("ab cd").is_err());
        assert!(Base94Price::decode("ab\u{7f}_").is_err());
    }
}
