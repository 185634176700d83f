//! Identifier sum types that appear inside payload bodies.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tally_codecs::{from_base36, to_base36};

/// Addresses longer than this cannot be a standard single-sig/P2WSH address
/// and are assumed to be channel identifiers too long to embed inline.
const MAX_INLINE_ADDRESS_LEN: usize = 42;

/// A property (token/collateral) identifier.
///
/// Either a plain base-36 integer, or for synthetic/derivative properties
/// the structured textual form `s-<collateralId>-<contractId>`. Decoding the
/// structured form never fails hard: this id is embedded inside other
/// payloads, and aborting an otherwise-parseable transaction over one bad
/// component would lose the whole record. Unparseable components surface as
/// `None` and render as the `s-NaN-NaN` sentinel.
#[derive(
    Copy, Clone, Eq, PartialEq, Hash, Debug, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum PropertyId {
    Linear(u64),
    Synthetic {
        collateral: Option<u64>,
        contract: Option<u64>,
    },
}

impl PropertyId {
    /// Parses a property id field. Infallible by design: non-numeric linear
    /// ids decode as property 0, and malformed synthetic components become
    /// the sentinel.
    pub fn decode(s: &str) -> Self {
        if let Some(body) = s.strip_prefix("s-") {
            let (c, k) = match body.split_once('-') {
                Some(pair) => pair,
                None => (body, ""),
            };
            return Self::Synthetic {
                collateral: parse_synthetic_component(c),
                contract: parse_synthetic_component(k),
            };
        }
        Self::Linear(parse_linear(s).unwrap_or(0))
    }

    pub fn encode(&self) -> String {
        match self {
            Self::Linear(id) => to_base36(*id as u128),
            Self::Synthetic {
                collateral,
                contract,
            } => format!(
                "s-{}-{}",
                encode_component(*collateral),
                encode_component(*contract)
            ),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Synthetic { .. })
    }
}

fn parse_linear(s: &str) -> Option<u64> {
    from_base36(s).ok().and_then(|v| u64::try_from(v).ok())
}

// Synthetic components are decimal on the wire, unlike linear ids. The
// observable consequence is the sentinel: `s-bad-bad` must decode to
// `s-NaN-NaN`, which only holds if `bad` is not a valid component digit
// string.
fn parse_synthetic_component(s: &str) -> Option<u64> {
    s.parse().ok()
}

fn encode_component(c: Option<u64>) -> String {
    match c {
        Some(v) => v.to_string(),
        None => "NaN".to_owned(),
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// An address slot in a payload: either the literal address string, or an
/// index into the transaction's outputs when the real address/channel id is
/// too long to embed. Resolution of the indexed form happens in the
/// dispatcher, never in the decoder.
#[derive(
    Clone, Eq, PartialEq, Hash, Debug, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum AddressRef {
    Direct(String),
    Indexed(u32),
}

impl AddressRef {
    /// Builds the wire form for an address, indirecting through `ref:<n>`
    /// when the address is too long to embed inline.
    pub fn for_address(addr: &str, next_ref: u32) -> Self {
        if addr.len() > MAX_INLINE_ADDRESS_LEN {
            Self::Indexed(next_ref)
        } else {
            Self::Direct(addr.to_owned())
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Self::Direct(addr) => addr.clone(),
            Self::Indexed(n) => format!("ref:{n}"),
        }
    }

    /// Parses an address slot, detecting the `ref:` prefix. Malformed ref
    /// indices fall back to index 0 rather than failing the field.
    pub fn decode(s: &str) -> Self {
        match s.strip_prefix("ref:") {
            Some(n) => Self::Indexed(n.parse().unwrap_or(0)),
            None => Self::Direct(s.to_owned()),
        }
    }

    pub fn index(&self) -> Option<u32> {
        match self {
            Self::Indexed(n) => Some(*n),
            Self::Direct(_) => None,
        }
    }
}

impl Default for AddressRef {
    fn default() -> Self {
        Self::Direct(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_roundtrip() {
        let id = PropertyId::Linear(5);
        assert_eq!(id.encode(), "5");
        assert_eq!(PropertyId::decode("5"), id);
    }

    #[test]
    fn synthetic_roundtrip() {
        let id = PropertyId::decode("s-4-11");
        assert_eq!(
            id,
            PropertyId::Synthetic {
                collateral: Some(4),
                contract: Some(11)
            }
        );
        assert_eq!(id.encode(), "s-4-11");
    }

    #[test]
    fn malformed_synthetic_yields_sentinel() {
        let id = PropertyId::decode("s-bad-bad");
        assert_eq!(id.encode(), "s-NaN-NaN");
        // And it never panics on truncated forms either.
        assert_eq!(PropertyId::decode("s-").encode(), "s-NaN-NaN");
    }

    #[test]
    fn ref_indirection() {
        let long = "l".repeat(64);
        let r = AddressRef::for_address(&long, 2);
        assert_eq!(r, AddressRef::Indexed(2));
        assert_eq!(r.encode(), "ref:2");
        assert_eq!(AddressRef::decode("ref:2"), AddressRef::Indexed(2));

        let short = AddressRef::for_address("tltc1qshortaddr", 0);
        assert_eq!(short.encode(), "tltc1qshortaddr");
        assert_eq!(
            AddressRef::decode("tltc1qshortaddr"),
            AddressRef::Direct("tltc1qshortaddr".to_owned())
        );
    }
}
