//! 8-decimal fixed-point quantities and their wire encoding.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{
    base36::{from_base36, to_base36},
    errors::CodecError,
};

/// Scale factor: one whole token in 1e-8 units.
pub const COIN: u128 = 100_000_000;

/// A token quantity with 8-decimal-place precision, stored as 1e-8 units.
///
/// Wire form (the decimal-flag scheme): a whole number encodes as the plain
/// base-36 of its integer value; anything with a fractional part encodes as
/// the base-36 of the scaled value followed by a literal `~`. Decode is the
/// exact inverse; the scale division truncates (round-down), applied after
/// the base-36 parse, never before.
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
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: TokenAmount = TokenAmount(0);

    /// Constructs from 1e-8 units.
    pub const fn from_scaled(scaled: u128) -> Self {
        Self(scaled)
    }

    /// Constructs from a whole number of tokens.
    pub const fn from_whole(whole: u64) -> Self {
        Self(whole as u128 * COIN)
    }

    pub const fn to_scaled(self) -> u128 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_whole(self) -> bool {
        self.0 % COIN == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Encodes to the wire form described on the type.
    pub fn encode(self) -> String {
        if self.is_whole() {
            to_base36(self.0 / COIN)
        } else {
            format!("{}~", to_base36(self.0))
        }
    }

    /// Decodes the wire form. An empty slot decodes as zero, matching the
    /// positional-default rule of the payload grammar.
    pub fn decode(s: &str) -> Result<Self, CodecError> {
        if s.is_empty() {
            return Ok(Self::ZERO);
        }
        match s.strip_suffix('~') {
            // Decimal flag present: the digits carry the scaled value.
            Some(scaled) => Ok(Self(from_base36(scaled)?)),
            // No flag: the digits carry whole tokens.
            None => {
                let whole = from_base36(s)?;
                whole
                    .checked_mul(COIN)
                    .map(Self)
                    .ok_or(CodecError::Overflow(36))
            }
        }
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / COIN;
        let frac = self.0 % COIN;
        if frac == 0 {
            write!(f, "{whole}")
        } else {
            let s = format!("{frac:08}");
            write!(f, "{whole}.{}", s.trim_end_matches('0'))
        }
    }
}

impl fmt::Debug for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenAmount({self})")
    }
}
