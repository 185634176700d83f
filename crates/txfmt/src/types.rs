//! The closed transaction type table.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Transaction type tags 0..=35. The space is dense and closed: a tag
/// outside this table is a decode error, never silently ignored.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
// Persisted records carry this tag; the borsh byte is pinned to the wire
// discriminant so stored data never depends on variant declaration order.
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum TxType {
    ActivateProtocol = 0,
    IssueToken = 1,
    Send = 2,
    TradeTokenForUtxo = 3,
    CommitToChannel = 4,
    TradeTokenForToken = 5,
    CancelOrder = 6,
    CreateWhitelist = 7,
    UpdateAdmin = 8,
    IssueAttestation = 9,
    RevokeAttestation = 10,
    GrantManagedToken = 11,
    RedeemManagedToken = 12,
    CreateOracle = 13,
    PublishOracleData = 14,
    CloseOracle = 15,
    CreateContractSeries = 16,
    ExerciseDerivative = 17,
    TradeContractOnchain = 18,
    TradeContractChannel = 19,
    TradeTokensChannel = 20,
    Withdrawal = 21,
    Transfer = 22,
    SettleChannelPnl = 23,
    MintSynthetic = 24,
    RedeemSynthetic = 25,
    PayToTokens = 26,
    CreateOptionSeries = 27,
    TradeBaiUrbun = 28,
    TradeMurabaha = 29,
    IssueInvoice = 30,
    BatchMoveZkRollup = 31,
    PublishNewTx = 32,
    CreateDerivativeOfLrc20 = 33,
    RegisterOpCtvCovenant = 34,
    MintColoredCoin = 35,
}

impl TxType {
    /// Number of types in the table.
    pub const COUNT: u64 = 36;

    /// Looks a tag up in the table. `None` means the tag space rejected it.
    pub const fn from_tag(tag: u64) -> Option<Self> {
        if tag >= Self::COUNT {
            return None;
        }
        Some(match tag {
            0 => Self::ActivateProtocol,
            1 => Self::IssueToken,
            2 => Self::Send,
            3 => Self::TradeTokenForUtxo,
            4 => Self::CommitToChannel,
            5 => Self::TradeTokenForToken,
            6 => Self::CancelOrder,
            7 => Self::CreateWhitelist,
            8 => Self::UpdateAdmin,
            9 => Self::IssueAttestation,
            10 => Self::RevokeAttestation,
            11 => Self::GrantManagedToken,
            12 => Self::RedeemManagedToken,
            13 => Self::CreateOracle,
            14 => Self::PublishOracleData,
            15 => Self::CloseOracle,
            16 => Self::CreateContractSeries,
            17 => Self::ExerciseDerivative,
            18 => Self::TradeContractOnchain,
            19 => Self::TradeContractChannel,
            20 => Self::TradeTokensChannel,
            21 => Self::Withdrawal,
            22 => Self::Transfer,
            23 => Self::SettleChannelPnl,
            24 => Self::MintSynthetic,
            25 => Self::RedeemSynthetic,
            26 => Self::PayToTokens,
            27 => Self::CreateOptionSeries,
            28 => Self::TradeBaiUrbun,
            29 => Self::TradeMurabaha,
            30 => Self::IssueInvoice,
            31 => Self::BatchMoveZkRollup,
            32 => Self::PublishNewTx,
            33 => Self::CreateDerivativeOfLrc20,
            34 => Self::RegisterOpCtvCovenant,
            _ => Self::MintColoredCoin,
        })
    }

    pub const fn tag(self) -> u64 {
        self as u64
    }

    /// The positional field delimiter for this type's body.
    ///
    /// This is a frozen per-type table, not a global convention: Send
    /// historically splits on `;` (with `,` as its intra-field list
    /// separator) while every other type splits on `,`. Unifying it would
    /// silently break historically encoded transactions.
    pub const fn delimiter(self) -> char {
        match self {
            Self::Send => ';',
            _ => ',',
        }
    }

    /// The intra-field list separator, the delimiter this type does *not*
    /// use positionally.
    pub const fn list_separator(self) -> char {
        match self.delimiter() {
            ';' => ',',
            _ => ';',
        }
    }

    /// Whether this type's payload names transaction outputs by index,
    /// requiring reference-output resolution in the dispatcher.
    pub const fn uses_reference_outputs(self) -> bool {
        matches!(
            self,
            Self::TradeTokenForUtxo
                | Self::CommitToChannel
                | Self::Withdrawal
                | Self::Transfer
                | Self::RegisterOpCtvCovenant
        )
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
