//! Sled-backed implementation of the storage traits.
//!
//! Records live in one tree under a composite `height ++ txid` key, height
//! big-endian so the tree iterates in chain order. The checkpoint lives in a
//! separate metadata tree and is flushed only after the record tree, which
//! is what makes crash-replay land on a height whose records are already
//! durable.

use std::path::Path;

use borsh::BorshDeserialize;
use sled::{Db, Tree};
use tally_db::{DbError, DbResult, TxRecordDatabase};
use tally_txfmt::TxRecord;

const TX_RECORD_TREE: &str = "tx_records";
const META_TREE: &str = "meta";
const MAX_HEIGHT_KEY: &[u8] = b"max_height";

#[derive(Debug)]
pub struct SledTxRecordStore {
    records: Tree,
    meta: Tree,
}

impl SledTxRecordStore {
    /// Opens (or creates) the store at `path`.
    pub fn open(path: &Path) -> DbResult<Self> {
        let db = sled::open(path).map_err(backend)?;
        Self::from_db(&db)
    }

    /// Builds the store over an already-open handle, for embedding in a
    /// database shared with other trees.
    pub fn from_db(db: &Db) -> DbResult<Self> {
        Ok(Self {
            records: db.open_tree(TX_RECORD_TREE).map_err(backend)?,
            meta: db.open_tree(META_TREE).map_err(backend)?,
        })
    }
}

fn backend(e: sled::Error) -> DbError {
    DbError::Backend(e.to_string())
}

fn codec(e: std::io::Error) -> DbError {
    DbError::Codec(e.to_string())
}

fn record_key(height: u64, txid: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + txid.len());
    key.extend_from_slice(&height.to_be_bytes());
    key.extend_from_slice(txid.as_bytes());
    key
}

fn decode_record(raw: &[u8]) -> DbResult<TxRecord> {
    TxRecord::try_from_slice(raw).map_err(codec)
}

impl TxRecordDatabase for SledTxRecordStore {
    fn put_tx_record(&self, record: &TxRecord) -> DbResult<()> {
        let key = record_key(record.block_height, &record.txid);
        let value = borsh::to_vec(record).map_err(codec)?;
        self.records.insert(key, value).map_err(backend)?;
        Ok(())
    }

    fn get_tx_record(&self, block_height: u64, txid: &str) -> DbResult<Option<TxRecord>> {
        self.records
            .get(record_key(block_height, txid))
            .map_err(backend)?
            .map(|raw| decode_record(&raw))
            .transpose()
    }

    fn get_block_records(&self, block_height: u64) -> DbResult<Vec<TxRecord>> {
        self.records
            .scan_prefix(block_height.to_be_bytes())
            .map(|entry| {
                let (_, raw) = entry.map_err(backend)?;
                decode_record(&raw)
            })
            .collect()
    }

    fn get_max_height(&self) -> DbResult<Option<u64>> {
        let raw = match self.meta.get(MAX_HEIGHT_KEY).map_err(backend)? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let bytes: [u8; 8] = raw
            .as_ref()
            .try_into()
            .map_err(|_| DbError::Codec("malformed checkpoint value".to_owned()))?;
        Ok(Some(u64::from_be_bytes(bytes)))
    }

    fn set_max_height(&self, height: u64) -> DbResult<()> {
        // Records must hit disk before the checkpoint that covers them.
        self.records.flush().map_err(backend)?;
        self.meta
            .insert(MAX_HEIGHT_KEY, &height.to_be_bytes())
            .map_err(backend)?;
        self.meta.flush().map_err(backend)?;
        Ok(())
    }
}
