//! Trait definitions for low level database interfaces.

use tally_txfmt::TxRecord;

use crate::DbResult;

/// Storage for processed transaction records and the indexer checkpoint.
/// Operations are NOT VALIDATED at this level; the indexer drives ordering.
pub trait TxRecordDatabase: Send + Sync + 'static {
    /// Upserts a record keyed by `(block_height, txid)`. Replaying a height
    /// after a crash hits this with identical keys; the write must be
    /// idempotent, last-write-wins.
    fn put_tx_record(&self, record: &TxRecord) -> DbResult<()>;

    /// Gets one record by its composite key, if present.
    fn get_tx_record(&self, block_height: u64, txid: &str) -> DbResult<Option<TxRecord>>;

    /// Gets every record stored for a height, in txid order.
    fn get_block_records(&self, block_height: u64) -> DbResult<Vec<TxRecord>>;

    /// Gets the checkpoint: the last height fully processed.
    fn get_max_height(&self) -> DbResult<Option<u64>>;

    /// Advances the checkpoint. Called only after every transaction of the
    /// height has been persisted.
    fn set_max_height(&self, height: u64) -> DbResult<()>;
}
