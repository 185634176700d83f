//! Numeral codecs for the Tally Layer wire format.
//!
//! Everything on the wire is positional text, so quantities travel through
//! compact alphabets: base-36 for ordinary numeric fields, base-94 for
//! settlement prices, and a fixed 256-symbol alphabet for opaque byte
//! strings that must survive embedding in a script push as UTF-8. All
//! integer conversions are exact; no floating point is involved anywhere.

mod amount;
mod base36;
mod base94;
mod base256;
mod errors;

pub use amount::{TokenAmount, COIN};
pub use base36::{dec_to_base36, dec_to_hex, from_base36, hex_to_base36, hex_to_dec, to_base36};
pub use base94::{from_base94, to_base94, Base94Price};
pub use base256::{
    alphabet, base256_to_bytes, bytes_to_base256, from_base256, hex_to_base256, to_base256,
};
pub use errors::CodecError;
