//! Storage interface definitions for the indexer.

mod errors;
mod traits;

pub use errors::{DbError, DbResult};
pub use traits::TxRecordDatabase;
