//! Ledger state and the per-type validation rules.
//!
//! All ledger collections live in an explicitly-owned [`LedgerContext`]
//! passed around by handle; there is no ambient global state, so multiple
//! independent contexts can coexist (one per test, one per network).

mod apply;
mod context;
mod validator;

pub use context::{
    ChannelInfo, ContractSeriesInfo, LedgerContext, OracleInfo, PropertyInfo, Tally, WhitelistInfo,
};
pub use validator::LedgerValidator;
