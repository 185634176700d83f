//! Type dispatch: from an extracted payload to a validated record.
//!
//! The dispatcher is the one place decoded parameters meet chain context.
//! It checks the marker, splits the tag, decodes the body, resolves any
//! output references the payload names, and hands the enriched parameters
//! to the validator exactly once. The validator's verdict is trusted
//! verbatim; the dispatcher never second-guesses ledger rules.

use async_trait::async_trait;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::{
    decode::{decode_body, split_tag},
    errors::DispatchError,
    extract::{ExtractedPayload, MARKER},
    payload::TxPayload,
    types::TxType,
};

/// One output of the transaction under dispatch, as the RPC layer saw it.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct VoutInfo {
    pub n: u32,
    pub address: Option<String>,
    pub value_sats: u64,
    pub script_hex: Option<String>,
}

/// Chain context for a single transaction, assembled by the indexer.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TxContext {
    pub sender: String,
    pub txid: String,
    pub block_height: u64,
    pub vouts: Vec<VoutInfo>,
}

/// A payload-referenced output resolved against the transaction's vouts.
/// Computed fresh per transaction, never cached past the validation call.
#[derive(
    Clone, Eq, PartialEq, Debug, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct ReferenceOutput {
    pub vout: u32,
    pub address: Option<String>,
    pub satoshis: u64,
}

/// The validator's answer for one transaction.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Verdict {
    pub valid: bool,
    pub reason: Option<String>,
}

impl Verdict {
    pub fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Ledger-rule validation, called exactly once per qualifying transaction.
#[async_trait]
pub trait TxValidator {
    async fn validate(
        &self,
        ctx: &TxContext,
        ty: TxType,
        params: &TxPayload,
        reference: &[ReferenceOutput],
    ) -> Verdict;
}

/// The fully-processed record for one qualifying transaction. Persisted
/// keyed by block height + txid and never mutated afterwards; validity
/// corrections go through an explicit upsert of the whole record.
#[derive(
    Clone, Eq, PartialEq, Debug, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct TxRecord {
    pub sender: String,
    pub txid: String,
    pub block_height: u64,
    pub marker: String,
    pub payload: String,
    pub tx_type: TxType,
    pub params: TxPayload,
    pub reference: Vec<ReferenceOutput>,
    pub valid: bool,
    pub reason: Option<String>,
}

/// Runs one extracted payload through decode, reference resolution, and
/// validation.
///
/// Errors here are per-transaction: a wrong marker or an unknown tag fails
/// this call only, and the caller's block loop carries on. A payload whose
/// references cannot be resolved is not an error; it produces an invalid
/// record with reason `"Missing outputs"` and skips the validator.
pub async fn dispatch(
    ctx: &TxContext,
    extracted: &ExtractedPayload,
    validator: &dyn TxValidator,
) -> Result<TxRecord, DispatchError> {
    if extracted.marker != MARKER {
        return Err(DispatchError::WrongMarker(extracted.marker.clone()));
    }

    let (ty, body) = split_tag(&extracted.payload)?;
    let params = decode_body(ty, body);
    trace!(txid = %ctx.txid, %ty, "decoded payload");

    let mut record = TxRecord {
        sender: ctx.sender.clone(),
        txid: ctx.txid.clone(),
        block_height: ctx.block_height,
        marker: extracted.marker.clone(),
        payload: extracted.payload.clone(),
        tx_type: ty,
        params,
        reference: Vec::new(),
        valid: false,
        reason: None,
    };

    match resolve_references(ctx, &record.params) {
        Ok(reference) => {
            record.reference = reference;
            let verdict = validator
                .validate(ctx, ty, &record.params, &record.reference)
                .await;
            record.valid = verdict.valid;
            record.reason = verdict.reason;
        }
        Err(missing) => {
            debug!(txid = %ctx.txid, vout = missing, "payload references a missing output");
            record.valid = false;
            record.reason = Some("Missing outputs".to_owned());
        }
    }

    Ok(record)
}

/// Resolves every output index the payload names against the transaction's
/// vout list, in payload order. The first unresolvable index aborts with
/// that index.
fn resolve_references(ctx: &TxContext, params: &TxPayload) -> Result<Vec<ReferenceOutput>, u32> {
    params
        .referenced_vouts()
        .into_iter()
        .map(|idx| {
            ctx.vouts
                .iter()
                .find(|v| v.n == idx)
                .map(|v| ReferenceOutput {
                    vout: idx,
                    address: v.address.clone(),
                    satoshis: v.value_sats,
                })
                .ok_or(idx)
        })
        .collect()
}
