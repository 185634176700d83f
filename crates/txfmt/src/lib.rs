//! Wire format for Tally Layer transactions.
//!
//! A protocol transaction is an `OP_RETURN` output whose data push starts
//! with the 2-byte marker `tl`, a base-36 type tag, and a positional payload
//! body. This crate owns the consensus-critical pieces of that pipeline:
//! the closed type table, the per-type payload grammar (encode and decode),
//! the marker/payload extractor, and the dispatcher that feeds decoded
//! parameters through validation. Everything here is pure; the validator is
//! a trait seam the ledger crate implements.

mod decode;
mod dispatch;
mod encode;
mod errors;
mod extract;
mod ids;
mod payload;
mod types;

pub use decode::{decode_body, split_tag};
pub use dispatch::{
    dispatch, ReferenceOutput, TxContext, TxRecord, TxValidator, Verdict, VoutInfo,
};
pub use encode::{encode_body, encode_payload};
pub use errors::{DispatchError, ParseError};
pub use extract::{extract_payload, first_payload, ExtractedPayload, MARKER, MARKER_HEX};
pub use ids::{AddressRef, PropertyId};
pub use payload::{SendPayload, TxPayload};
pub use types::TxType;
