//! Decoded parameter shapes, one variant per transaction type.
//!
//! Field order within each variant mirrors the positional order on the
//! wire; the encoder and decoder in this crate are the only places that
//! ordering is spelled out.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tally_codecs::{Base94Price, TokenAmount};

use crate::ids::{AddressRef, PropertyId};

/// A Send body is one of two wire shapes, decided once at decode time.
///
/// The batch form packs parallel `,`-separated lists into the property-id
/// and amount slots (Send's positional delimiter is `;`, so `,` is free for
/// lists). A single-element batch is indistinguishable from the single form
/// on the wire and canonicalizes to `Single`.
#[derive(
    Clone, Eq, PartialEq, Debug, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum SendPayload {
    Single {
        address: AddressRef,
        property_id: PropertyId,
        amount: TokenAmount,
    },
    Batch {
        address: AddressRef,
        property_ids: Vec<PropertyId>,
        amounts: Vec<TokenAmount>,
    },
}

/// Decoded parameters for every transaction type.
#[derive(
    Clone, Eq, PartialEq, Debug, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum TxPayload {
    ActivateProtocol {
        feature_id: u64,
        activation_block: u64,
        min_client_version: u64,
    },
    IssueToken {
        amount: TokenAmount,
        ticker: String,
        whitelist_ids: Vec<u64>,
        managed: bool,
        nft: bool,
    },
    Send(SendPayload),
    TradeTokenForUtxo {
        property_id: PropertyId,
        amount: TokenAmount,
        sats_expected: u64,
        token_output: u32,
        pay_to_output: u32,
    },
    CommitToChannel {
        property_id: PropertyId,
        amount: TokenAmount,
        channel_address: AddressRef,
    },
    TradeTokenForToken {
        offered_property_id: PropertyId,
        offered_amount: TokenAmount,
        desired_property_id: PropertyId,
        desired_amount: TokenAmount,
        post_only: bool,
    },
    CancelOrder {
        offered_property_id: PropertyId,
        desired_property_id: PropertyId,
        cancel_all: bool,
        txid_to_cancel: String,
    },
    CreateWhitelist {
        backup_address: AddressRef,
        name: String,
        url: String,
        description: String,
    },
    UpdateAdmin {
        new_address: AddressRef,
        whitelist: bool,
        oracle: bool,
        token: bool,
        id: u64,
    },
    IssueAttestation {
        target_address: AddressRef,
        whitelist_id: u64,
        metadata: String,
    },
    RevokeAttestation {
        target_address: AddressRef,
        whitelist_id: u64,
    },
    GrantManagedToken {
        property_id: PropertyId,
        amount: TokenAmount,
        to_address: AddressRef,
    },
    RedeemManagedToken {
        property_id: PropertyId,
        amount: TokenAmount,
    },
    CreateOracle {
        ticker: String,
        url: String,
        backup_address: AddressRef,
        whitelist_ids: Vec<u64>,
        lag: u64,
    },
    PublishOracleData {
        oracle_id: u64,
        price: TokenAmount,
        high: TokenAmount,
        low: TokenAmount,
        close: TokenAmount,
    },
    CloseOracle {
        oracle_id: u64,
    },
    CreateContractSeries {
        native: bool,
        underlying_oracle_id: u64,
        onchain_data: Vec<u64>,
        notional_property_id: PropertyId,
        notional_value: TokenAmount,
        collateral_property_id: u64,
        leverage: TokenAmount,
        expiry_period: u64,
        series: u64,
        inverse: bool,
        fee: bool,
    },
    ExerciseDerivative {
        contract_id: u64,
        amount: TokenAmount,
    },
    TradeContractOnchain {
        contract_id: u64,
        price: TokenAmount,
        amount: TokenAmount,
        sell: bool,
        insurance: bool,
    },
    TradeContractChannel {
        contract_id: u64,
        price: TokenAmount,
        amount: TokenAmount,
        column_a_is_seller: bool,
        expiry_block: u64,
        insurance: bool,
    },
    TradeTokensChannel {
        offered_property_id: PropertyId,
        desired_property_id: PropertyId,
        offered_amount: TokenAmount,
        desired_amount: TokenAmount,
        column_a_is_offerer: bool,
        expiry_block: u64,
    },
    Withdrawal {
        withdraw_all: bool,
        property_id: PropertyId,
        amount: TokenAmount,
        channel_address: AddressRef,
    },
    Transfer {
        property_id: PropertyId,
        amount: TokenAmount,
        is_column_a: bool,
        destination_address: AddressRef,
    },
    SettleChannelPnl {
        contract_id: u64,
        mark_price: Base94Price,
        close: bool,
        settled_txid: String,
    },
    MintSynthetic {
        collateral_property_id: u64,
        contract_id: u64,
        amount: TokenAmount,
    },
    RedeemSynthetic {
        synthetic_id: PropertyId,
        amount: TokenAmount,
    },
    PayToTokens {
        target_property_id: PropertyId,
        used_property_id: PropertyId,
        amount: TokenAmount,
    },
    CreateOptionSeries {
        contract_series_id: u64,
        strike_interval: TokenAmount,
        european_style: bool,
    },
    TradeBaiUrbun {
        down_payment_property_id: PropertyId,
        sale_property_id: PropertyId,
        down_payment_percent: TokenAmount,
        amount: TokenAmount,
        expiry_block: u64,
        trade_expiry_block: u64,
    },
    TradeMurabaha {
        buyer_address: AddressRef,
        down_payment_percent: TokenAmount,
        property_id: PropertyId,
        amount: TokenAmount,
        expiry_block: u64,
        installment_interval: u64,
    },
    IssueInvoice {
        property_id: PropertyId,
        amount: TokenAmount,
        due_date_block: u64,
        collateral_property_id: Option<u64>,
        receives_pay_to_token: bool,
    },
    BatchMoveZkRollup {
        batch_payload: String,
        proof: String,
    },
    PublishNewTx {
        ordinal_reveal_json: String,
    },
    CreateDerivativeOfLrc20 {
        series_id_1: u64,
        series_id_2: u64,
        native: bool,
        expiry_period: u64,
        series: u64,
        inverse: bool,
        fee: bool,
    },
    RegisterOpCtvCovenant {
        txid: String,
        associated_address_1: AddressRef,
        associated_address_2: AddressRef,
        covenant_type: u64,
        redeem_script: String,
    },
    MintColoredCoin {
        property_id: PropertyId,
        amount: TokenAmount,
        color_data: String,
    },
}

impl TxPayload {
    /// Output indices this payload references, in payload order. Used by
    /// the dispatcher to resolve [`crate::ReferenceOutput`]s; types without
    /// reference semantics return nothing.
    pub fn referenced_vouts(&self) -> Vec<u32> {
        match self {
            Self::TradeTokenForUtxo {
                token_output,
                pay_to_output,
                ..
            } => vec![*token_output, *pay_to_output],
            Self::CommitToChannel {
                channel_address, ..
            }
            | Self::Withdrawal {
                channel_address, ..
            } => channel_address.index().into_iter().collect(),
            Self::Transfer {
                destination_address,
                ..
            } => destination_address.index().into_iter().collect(),
            Self::RegisterOpCtvCovenant {
                associated_address_1,
                associated_address_2,
                ..
            } => associated_address_1
                .index()
                .into_iter()
                .chain(associated_address_2.index())
                .collect(),
            _ => Vec::new(),
        }
    }
}
