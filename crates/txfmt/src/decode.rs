//! Payload grammar, decoding side.
//!
//! The inverse of [`crate::encode`]. Positional slots that are missing (or
//! carry digits the field's numeral system rejects) default instead of
//! failing: numerics to zero, strings to empty, lists to empty. That
//! tolerance is deliberate — it absorbs payload-shape drift within a type
//! without losing the whole transaction. The only hard failures are at the
//! tag level, where the closed type table leaves no safe interpretation.

use tally_codecs::{from_base36, Base94Price, TokenAmount};

use crate::{
    errors::ParseError,
    ids::{AddressRef, PropertyId},
    payload::{SendPayload, TxPayload},
    types::TxType,
};

/// Positional cursor over a split body. Every accessor consumes one slot
/// and applies the defaulting rules.
struct Fields<'a> {
    parts: Vec<&'a str>,
    next: usize,
}

impl<'a> Fields<'a> {
    fn split(body: &'a str, delim: char) -> Self {
        Self {
            parts: body.split(delim).collect(),
            next: 0,
        }
    }

    fn raw(&mut self) -> &'a str {
        let part = self.parts.get(self.next).copied().unwrap_or("");
        self.next += 1;
        part
    }

    fn string(&mut self) -> String {
        self.raw().to_owned()
    }

    fn u64(&mut self) -> u64 {
        from_base36(self.raw())
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(0)
    }

    fn u32(&mut self) -> u32 {
        u32::try_from(self.u64()).unwrap_or(0)
    }

    fn opt_u64(&mut self) -> Option<u64> {
        match self.u64() {
            0 => None,
            v => Some(v),
        }
    }

    fn bool(&mut self) -> bool {
        self.raw() == "1"
    }

    fn amount(&mut self) -> TokenAmount {
        TokenAmount::decode(self.raw()).unwrap_or(TokenAmount::ZERO)
    }

    fn price(&mut self) -> Base94Price {
        Base94Price::decode(self.raw()).unwrap_or_default()
    }

    fn property_id(&mut self) -> PropertyId {
        PropertyId::decode(self.raw())
    }

    fn address(&mut self) -> AddressRef {
        AddressRef::decode(self.raw())
    }

    fn u64_list(&mut self, sep: char) -> Vec<u64> {
        let raw = self.raw();
        if raw.is_empty() {
            return Vec::new();
        }
        raw.split(sep)
            .map(|part| {
                from_base36(part)
                    .ok()
                    .and_then(|v| u64::try_from(v).ok())
                    .unwrap_or(0)
            })
            .collect()
    }
}

/// Splits a marker-stripped payload into its type and field body.
///
/// The character right after the marker is the base-36 type tag; the body
/// follows behind one instance of the type's delimiter.
pub fn split_tag(payload: &str) -> Result<(TxType, &str), ParseError> {
    let mut chars = payload.char_indices();
    let (_, tag_char) = chars.next().ok_or(ParseError::MissingTag)?;
    let rest_at = chars.next().map(|(i, _)| i).unwrap_or(payload.len());

    let tag = tag_char
        .to_digit(36)
        .ok_or_else(|| ParseError::BadTag(tag_char.to_string()))? as u64;
    let ty = TxType::from_tag(tag).ok_or(ParseError::UnknownType(tag))?;

    let body = &payload[rest_at..];
    let body = body.strip_prefix(ty.delimiter()).unwrap_or(body);
    Ok((ty, body))
}

/// Decodes a positional body for a known transaction type.
pub fn decode_body(ty: TxType, body: &str) -> TxPayload {
    let mut f = Fields::split(body, ty.delimiter());
    let sep = ty.list_separator();
    match ty {
        TxType::ActivateProtocol => TxPayload::ActivateProtocol {
            feature_id: f.u64(),
            activation_block: f.u64(),
            min_client_version: f.u64(),
        },
        TxType::IssueToken => TxPayload::IssueToken {
            amount: f.amount(),
            ticker: f.string(),
            whitelist_ids: f.u64_list(sep),
            managed: f.bool(),
            nft: f.bool(),
        },
        TxType::Send => TxPayload::Send(decode_send(&mut f)),
        TxType::TradeTokenForUtxo => TxPayload::TradeTokenForUtxo {
            property_id: f.property_id(),
            amount: f.amount(),
            sats_expected: f.u64(),
            token_output: f.u32(),
            pay_to_output: f.u32(),
        },
        TxType::CommitToChannel => TxPayload::CommitToChannel {
            property_id: f.property_id(),
            amount: f.amount(),
            channel_address: f.address(),
        },
        TxType::TradeTokenForToken => TxPayload::TradeTokenForToken {
            offered_property_id: f.property_id(),
            offered_amount: f.amount(),
            desired_property_id: f.property_id(),
            desired_amount: f.amount(),
            post_only: f.bool(),
        },
        TxType::CancelOrder => TxPayload::CancelOrder {
            offered_property_id: f.property_id(),
            desired_property_id: f.property_id(),
            cancel_all: f.bool(),
            txid_to_cancel: f.string(),
        },
        TxType::CreateWhitelist => TxPayload::CreateWhitelist {
            backup_address: f.address(),
            name: f.string(),
            url: f.string(),
            description: f.string(),
        },
        TxType::UpdateAdmin => TxPayload::UpdateAdmin {
            new_address: f.address(),
            whitelist: f.bool(),
            oracle: f.bool(),
            token: f.bool(),
            id: f.u64(),
        },
        TxType::IssueAttestation => TxPayload::IssueAttestation {
            target_address: f.address(),
            whitelist_id: f.u64(),
            metadata: f.string(),
        },
        TxType::RevokeAttestation => TxPayload::RevokeAttestation {
            target_address: f.address(),
            whitelist_id: f.u64(),
        },
        TxType::GrantManagedToken => TxPayload::GrantManagedToken {
            property_id: f.property_id(),
            amount: f.amount(),
            to_address: f.address(),
        },
        TxType::RedeemManagedToken => TxPayload::RedeemManagedToken {
            property_id: f.property_id(),
            amount: f.amount(),
        },
        TxType::CreateOracle => TxPayload::CreateOracle {
            ticker: f.string(),
            url: f.string(),
            backup_address: f.address(),
            whitelist_ids: f.u64_list(sep),
            lag: f.u64(),
        },
        TxType::PublishOracleData => TxPayload::PublishOracleData {
            oracle_id: f.u64(),
            price: f.amount(),
            high: f.amount(),
            low: f.amount(),
            close: f.amount(),
        },
        TxType::CloseOracle => TxPayload::CloseOracle { oracle_id: f.u64() },
        TxType::CreateContractSeries => TxPayload::CreateContractSeries {
            native: f.bool(),
            underlying_oracle_id: f.u64(),
            onchain_data: f.u64_list(sep),
            notional_property_id: f.property_id(),
            notional_value: f.amount(),
            collateral_property_id: f.u64(),
            leverage: f.amount(),
            expiry_period: f.u64(),
            series: f.u64(),
            inverse: f.bool(),
            fee: f.bool(),
        },
        TxType::ExerciseDerivative => TxPayload::ExerciseDerivative {
            contract_id: f.u64(),
            amount: f.amount(),
        },
        TxType::TradeContractOnchain => TxPayload::TradeContractOnchain {
            contract_id: f.u64(),
            price: f.amount(),
            amount: f.amount(),
            sell: f.bool(),
            insurance: f.bool(),
        },
        TxType::TradeContractChannel => TxPayload::TradeContractChannel {
            contract_id: f.u64(),
            price: f.amount(),
            amount: f.amount(),
            column_a_is_seller: f.bool(),
            expiry_block: f.u64(),
            insurance: f.bool(),
        },
        TxType::TradeTokensChannel => TxPayload::TradeTokensChannel {
            offered_property_id: f.property_id(),
            desired_property_id: f.property_id(),
            offered_amount: f.amount(),
            desired_amount: f.amount(),
            column_a_is_offerer: f.bool(),
            expiry_block: f.u64(),
        },
        TxType::Withdrawal => TxPayload::Withdrawal {
            withdraw_all: f.bool(),
            property_id: f.property_id(),
            amount: f.amount(),
            channel_address: f.address(),
        },
        TxType::Transfer => TxPayload::Transfer {
            property_id: f.property_id(),
            amount: f.amount(),
            is_column_a: f.bool(),
            destination_address: f.address(),
        },
        TxType::SettleChannelPnl => TxPayload::SettleChannelPnl {
            contract_id: f.u64(),
            mark_price: f.price(),
            close: f.bool(),
            settled_txid: f.string(),
        },
        TxType::MintSynthetic => TxPayload::MintSynthetic {
            collateral_property_id: f.u64(),
            contract_id: f.u64(),
            amount: f.amount(),
        },
        TxType::RedeemSynthetic => TxPayload::RedeemSynthetic {
            synthetic_id: f.property_id(),
            amount: f.amount(),
        },
        TxType::PayToTokens => TxPayload::PayToTokens {
            target_property_id: f.property_id(),
            used_property_id: f.property_id(),
            amount: f.amount(),
        },
        TxType::CreateOptionSeries => TxPayload::CreateOptionSeries {
            contract_series_id: f.u64(),
            strike_interval: f.amount(),
            european_style: f.bool(),
        },
        TxType::TradeBaiUrbun => TxPayload::TradeBaiUrbun {
            down_payment_property_id: f.property_id(),
            sale_property_id: f.property_id(),
            down_payment_percent: f.amount(),
            amount: f.amount(),
            expiry_block: f.u64(),
            trade_expiry_block: f.u64(),
        },
        TxType::TradeMurabaha => TxPayload::TradeMurabaha {
            buyer_address: f.address(),
            down_payment_percent: f.amount(),
            property_id: f.property_id(),
            amount: f.amount(),
            expiry_block: f.u64(),
            installment_interval: f.u64(),
        },
        TxType::IssueInvoice => TxPayload::IssueInvoice {
            property_id: f.property_id(),
            amount: f.amount(),
            due_date_block: f.u64(),
            collateral_property_id: f.opt_u64(),
            receives_pay_to_token: f.bool(),
        },
        TxType::BatchMoveZkRollup => TxPayload::BatchMoveZkRollup {
            batch_payload: f.string(),
            proof: f.string(),
        },
        TxType::PublishNewTx => TxPayload::PublishNewTx {
            ordinal_reveal_json: f.string(),
        },
        TxType::CreateDerivativeOfLrc20 => TxPayload::CreateDerivativeOfLrc20 {
            series_id_1: f.u64(),
            series_id_2: f.u64(),
            native: f.bool(),
            expiry_period: f.u64(),
            series: f.u64(),
            inverse: f.bool(),
            fee: f.bool(),
        },
        TxType::RegisterOpCtvCovenant => TxPayload::RegisterOpCtvCovenant {
            txid: f.string(),
            associated_address_1: f.address(),
            associated_address_2: f.address(),
            covenant_type: f.u64(),
            redeem_script: f.string(),
        },
        TxType::MintColoredCoin => TxPayload::MintColoredCoin {
            property_id: f.property_id(),
            amount: f.amount(),
            color_data: f.string(),
        },
    }
}

/// Send's two wire shapes share slots; the batch discriminant is the
/// intra-field `,` list separator appearing in the property-id or amount
/// slot. A single-element batch is byte-identical to the single form and
/// canonicalizes to `Single`.
fn decode_send(f: &mut Fields<'_>) -> SendPayload {
    let address = f.address();
    let ids_raw = f.raw();
    let amts_raw = f.raw();

    if ids_raw.contains(',') || amts_raw.contains(',') {
        let property_ids = ids_raw.split(',').map(PropertyId::decode).collect();
        let amounts = amts_raw
            .split(',')
            .map(|a| TokenAmount::decode(a).unwrap_or(TokenAmount::ZERO))
            .collect();
        SendPayload::Batch {
            address,
            property_ids,
            amounts,
        }
    } else {
        SendPayload::Single {
            address,
            property_id: PropertyId::decode(ids_raw),
            amount: TokenAmount::decode(amts_raw).unwrap_or(TokenAmount::ZERO),
        }
    }
}
