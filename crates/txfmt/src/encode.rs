//! Payload grammar, encoding side.
//!
//! Every numeric field is base-36; a missing/absent numeric encodes as the
//! literal `'0'` (never an empty slot, never an error — downstream
//! validators tell "explicitly zero" from "absent" only by out-of-band
//! context, and that is a wire-format rule, not a defect). Booleans are the
//! single characters `'1'`/`'0'`. Absent list fields occupy their slot as
//! an empty string. Amounts use the decimal-flag scheme, prices in
//! settlement messages use base-94.

use tally_codecs::to_base36;

use crate::{
    extract::MARKER,
    payload::{SendPayload, TxPayload},
    types::TxType,
};

fn b36(v: u64) -> String {
    to_base36(v as u128)
}

fn opt_b36(v: Option<u64>) -> String {
    v.map(|v| to_base36(v as u128)).unwrap_or_else(|| "0".to_owned())
}

fn bit(b: bool) -> String {
    if b { "1" } else { "0" }.to_owned()
}

fn id_list(ids: &[u64], sep: char) -> String {
    ids.iter()
        .map(|id| b36(*id))
        .collect::<Vec<_>>()
        .join(&sep.to_string())
}

/// The type tag a payload encodes under.
pub(crate) fn payload_type(p: &TxPayload) -> TxType {
    match p {
        TxPayload::ActivateProtocol { .. } => TxType::ActivateProtocol,
        TxPayload::IssueToken { .. } => TxType::IssueToken,
        TxPayload::Send(_) => TxType::Send,
        TxPayload::TradeTokenForUtxo { .. } => TxType::TradeTokenForUtxo,
        TxPayload::CommitToChannel { .. } => TxType::CommitToChannel,
        TxPayload::TradeTokenForToken { .. } => TxType::TradeTokenForToken,
        TxPayload::CancelOrder { .. } => TxType::CancelOrder,
        TxPayload::CreateWhitelist { .. } => TxType::CreateWhitelist,
        TxPayload::UpdateAdmin { .. } => TxType::UpdateAdmin,
        TxPayload::IssueAttestation { .. } => TxType::IssueAttestation,
        TxPayload::RevokeAttestation { .. } => TxType::RevokeAttestation,
        TxPayload::GrantManagedToken { .. } => TxType::GrantManagedToken,
        TxPayload::RedeemManagedToken { .. } => TxType::RedeemManagedToken,
        TxPayload::CreateOracle { .. } => TxType::CreateOracle,
        TxPayload::PublishOracleData { .. } => TxType::PublishOracleData,
        TxPayload::CloseOracle { .. } => TxType::CloseOracle,
        TxPayload::CreateContractSeries { .. } => TxType::CreateContractSeries,
        TxPayload::ExerciseDerivative { .. } => TxType::ExerciseDerivative,
        TxPayload::TradeContractOnchain { .. } => TxType::TradeContractOnchain,
        TxPayload::TradeContractChannel { .. } => TxType::TradeContractChannel,
        TxPayload::TradeTokensChannel { .. } => TxType::TradeTokensChannel,
        TxPayload::Withdrawal { .. } => TxType::Withdrawal,
        TxPayload::Transfer { .. } => TxType::Transfer,
        TxPayload::SettleChannelPnl { .. } => TxType::SettleChannelPnl,
        TxPayload::MintSynthetic { .. } => TxType::MintSynthetic,
        TxPayload::RedeemSynthetic { .. } => TxType::RedeemSynthetic,
        TxPayload::PayToTokens { .. } => TxType::PayToTokens,
        TxPayload::CreateOptionSeries { .. } => TxType::CreateOptionSeries,
        TxPayload::TradeBaiUrbun { .. } => TxType::TradeBaiUrbun,
        TxPayload::TradeMurabaha { .. } => TxType::TradeMurabaha,
        TxPayload::IssueInvoice { .. } => TxType::IssueInvoice,
        TxPayload::BatchMoveZkRollup { .. } => TxType::BatchMoveZkRollup,
        TxPayload::PublishNewTx { .. } => TxType::PublishNewTx,
        TxPayload::CreateDerivativeOfLrc20 { .. } => TxType::CreateDerivativeOfLrc20,
        TxPayload::RegisterOpCtvCovenant { .. } => TxType::RegisterOpCtvCovenant,
        TxPayload::MintColoredCoin { .. } => TxType::MintColoredCoin,
    }
}

/// Encodes the positional body for a payload (no marker, no tag).
pub fn encode_body(p: &TxPayload) -> String {
    let ty = payload_type(p);
    let sep = ty.list_separator();
    let fields: Vec<String> = match p {
        TxPayload::ActivateProtocol {
            feature_id,
            activation_block,
            min_client_version,
        } => vec![b36(*feature_id), b36(*activation_block), b36(*min_client_version)],
        TxPayload::IssueToken {
            amount,
            ticker,
            whitelist_ids,
            managed,
            nft,
        } => vec![
            amount.encode(),
            ticker.clone(),
            id_list(whitelist_ids, sep),
            bit(*managed),
            bit(*nft),
        ],
        TxPayload::Send(send) => encode_send(send),
        TxPayload::TradeTokenForUtxo {
            property_id,
            amount,
            sats_expected,
            token_output,
            pay_to_output,
        } => vec![
            property_id.encode(),
            amount.encode(),
            b36(*sats_expected),
            b36(*token_output as u64),
            b36(*pay_to_output as u64),
        ],
        TxPayload::CommitToChannel {
            property_id,
            amount,
            channel_address,
        } => vec![property_id.encode(), amount.encode(), channel_address.encode()],
        TxPayload::TradeTokenForToken {
            offered_property_id,
            offered_amount,
            desired_property_id,
            desired_amount,
            post_only,
        } => vec![
            offered_property_id.encode(),
            offered_amount.encode(),
            desired_property_id.encode(),
            desired_amount.encode(),
            bit(*post_only),
        ],
        TxPayload::CancelOrder {
            offered_property_id,
            desired_property_id,
            cancel_all,
            txid_to_cancel,
        } => vec![
            offered_property_id.encode(),
            desired_property_id.encode(),
            bit(*cancel_all),
            txid_to_cancel.clone(),
        ],
        TxPayload::CreateWhitelist {
            backup_address,
            name,
            url,
            description,
        } => vec![backup_address.encode(), name.clone(), url.clone(), description.clone()],
        TxPayload::UpdateAdmin {
            new_address,
            whitelist,
            oracle,
            token,
            id,
        } => vec![
            new_address.encode(),
            bit(*whitelist),
            bit(*oracle),
            bit(*token),
            b36(*id),
        ],
        TxPayload::IssueAttestation {
            target_address,
            whitelist_id,
            metadata,
        } => vec![target_address.encode(), b36(*whitelist_id), metadata.clone()],
        TxPayload::RevokeAttestation {
            target_address,
            whitelist_id,
        } => vec![target_address.encode(), b36(*whitelist_id)],
        TxPayload::GrantManagedToken {
            property_id,
            amount,
            to_address,
        } => vec![property_id.encode(), amount.encode(), to_address.encode()],
        TxPayload::RedeemManagedToken {
            property_id,
            amount,
        } => vec![property_id.encode(), amount.encode()],
        TxPayload::CreateOracle {
            ticker,
            url,
            backup_address,
            whitelist_ids,
            lag,
        } => vec![
            ticker.clone(),
            url.clone(),
            backup_address.encode(),
            id_list(whitelist_ids, sep),
            b36(*lag),
        ],
        TxPayload::PublishOracleData {
            oracle_id,
            price,
            high,
            low,
            close,
        } => vec![
            b36(*oracle_id),
            price.encode(),
            high.encode(),
            low.encode(),
            close.encode(),
        ],
        TxPayload::CloseOracle { oracle_id } => vec![b36(*oracle_id)],
        TxPayload::CreateContractSeries {
            native,
            underlying_oracle_id,
            onchain_data,
            notional_property_id,
            notional_value,
            collateral_property_id,
            leverage,
            expiry_period,
            series,
            inverse,
            fee,
        } => vec![
            bit(*native),
            b36(*underlying_oracle_id),
            id_list(onchain_data, sep),
            notional_property_id.encode(),
            notional_value.encode(),
            b36(*collateral_property_id),
            leverage.encode(),
            b36(*expiry_period),
            b36(*series),
            bit(*inverse),
            bit(*fee),
        ],
        TxPayload::ExerciseDerivative {
            contract_id,
            amount,
        } => vec![b36(*contract_id), amount.encode()],
        TxPayload::TradeContractOnchain {
            contract_id,
            price,
            amount,
            sell,
            insurance,
        } => vec![
            b36(*contract_id),
            price.encode(),
            amount.encode(),
            bit(*sell),
            bit(*insurance),
        ],
        TxPayload::TradeContractChannel {
            contract_id,
            price,
            amount,
            column_a_is_seller,
            expiry_block,
            insurance,
        } => vec![
            b36(*contract_id),
            price.encode(),
            amount.encode(),
            bit(*column_a_is_seller),
            b36(*expiry_block),
            bit(*insurance),
        ],
        TxPayload::TradeTokensChannel {
            offered_property_id,
            desired_property_id,
            offered_amount,
            desired_amount,
            column_a_is_offerer,
            expiry_block,
        } => vec![
            offered_property_id.encode(),
            desired_property_id.encode(),
            offered_amount.encode(),
            desired_amount.encode(),
            bit(*column_a_is_offerer),
            b36(*expiry_block),
        ],
        TxPayload::Withdrawal {
            withdraw_all,
            property_id,
            amount,
            channel_address,
        } => vec![
            bit(*withdraw_all),
            property_id.encode(),
            amount.encode(),
            channel_address.encode(),
        ],
        TxPayload::Transfer {
            property_id,
            amount,
            is_column_a,
            destination_address,
        } => vec![
            property_id.encode(),
            amount.encode(),
            bit(*is_column_a),
            destination_address.encode(),
        ],
        TxPayload::SettleChannelPnl {
            contract_id,
            mark_price,
            close,
            settled_txid,
        } => vec![
            b36(*contract_id),
            mark_price.encode(),
            bit(*close),
            settled_txid.clone(),
        ],
        TxPayload::MintSynthetic {
            collateral_property_id,
            contract_id,
            amount,
        } => vec![b36(*collateral_property_id), b36(*contract_id), amount.encode()],
        TxPayload::RedeemSynthetic {
            synthetic_id,
            amount,
        } => vec![synthetic_id.encode(), amount.encode()],
        TxPayload::PayToTokens {
            target_property_id,
            used_property_id,
            amount,
        } => vec![
            target_property_id.encode(),
            used_property_id.encode(),
            amount.encode(),
        ],
        TxPayload::CreateOptionSeries {
            contract_series_id,
            strike_interval,
            european_style,
        } => vec![
            b36(*contract_series_id),
            strike_interval.encode(),
            bit(*european_style),
        ],
        TxPayload::TradeBaiUrbun {
            down_payment_property_id,
            sale_property_id,
            down_payment_percent,
            amount,
            expiry_block,
            trade_expiry_block,
        } => vec![
            down_payment_property_id.encode(),
            sale_property_id.encode(),
            down_payment_percent.encode(),
            amount.encode(),
            b36(*expiry_block),
            b36(*trade_expiry_block),
        ],
        TxPayload::TradeMurabaha {
            buyer_address,
            down_payment_percent,
            property_id,
            amount,
            expiry_block,
            installment_interval,
        } => vec![
            buyer_address.encode(),
            down_payment_percent.encode(),
            property_id.encode(),
            amount.encode(),
            b36(*expiry_block),
            b36(*installment_interval),
        ],
        TxPayload::IssueInvoice {
            property_id,
            amount,
            due_date_block,
            collateral_property_id,
            receives_pay_to_token,
        } => vec![
            property_id.encode(),
            amount.encode(),
            b36(*due_date_block),
            opt_b36(*collateral_property_id),
            bit(*receives_pay_to_token),
        ],
        TxPayload::BatchMoveZkRollup {
            batch_payload,
            proof,
        } => vec![batch_payload.clone(), proof.clone()],
        TxPayload::PublishNewTx {
            ordinal_reveal_json,
        } => vec![ordinal_reveal_json.clone()],
        TxPayload::CreateDerivativeOfLrc20 {
            series_id_1,
            series_id_2,
            native,
            expiry_period,
            series,
            inverse,
            fee,
        } => vec![
            b36(*series_id_1),
            b36(*series_id_2),
            bit(*native),
            b36(*expiry_period),
            b36(*series),
            bit(*inverse),
            bit(*fee),
        ],
        TxPayload::RegisterOpCtvCovenant {
            txid,
            associated_address_1,
            associated_address_2,
            covenant_type,
            redeem_script,
        } => vec![
            txid.clone(),
            associated_address_1.encode(),
            associated_address_2.encode(),
            b36(*covenant_type),
            redeem_script.clone(),
        ],
        TxPayload::MintColoredCoin {
            property_id,
            amount,
            color_data,
        } => vec![
            property_id.encode(),
            amount.encode(),
            color_data.clone(),
        ],
    };
    fields.join(&ty.delimiter().to_string())
}

fn encode_send(send: &SendPayload) -> Vec<String> {
    match send {
        SendPayload::Single {
            address,
            property_id,
            amount,
        } => vec![address.encode(), property_id.encode(), amount.encode()],
        SendPayload::Batch {
            address,
            property_ids,
            amounts,
        } => {
            // Parallel lists ride inside single slots, `,`-joined (Send's
            // positional delimiter is `;`).
            let ids = property_ids
                .iter()
                .map(|id| id.encode())
                .collect::<Vec<_>>()
                .join(",");
            let amts = amounts
                .iter()
                .map(|a| a.encode())
                .collect::<Vec<_>>()
                .join(",");
            vec![address.encode(), ids, amts]
        }
    }
}

/// Encodes the full payload string: marker, base-36 type tag, delimiter,
/// positional body. This is the exact byte string that lands in the
/// `OP_RETURN` data push.
pub fn encode_payload(p: &TxPayload) -> String {
    let ty = payload_type(p);
    format!(
        "{MARKER}{}{}{}",
        to_base36(ty.tag() as u128),
        ty.delimiter(),
        encode_body(p)
    )
}
