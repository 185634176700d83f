//! The block-walking indexer task.
//!
//! Walks heights strictly ascending, processes transactions in block order,
//! and advances the `MaxHeight` checkpoint only after a height has been
//! fully processed. An RPC failure anywhere in a height (block fetch, tx
//! fetch, prevout fetch) aborts that height unprocessed so it retries under
//! backoff; only malformed payloads are transaction-scoped. Restart resumes
//! at checkpoint + 1; replay of a partially-processed height is harmless
//! because record writes are keyed upserts.

use std::{sync::Arc, time::Duration};

use parking_lot::RwLock;
use tally_db::TxRecordDatabase;
use tally_ledger::LedgerContext;
use tally_txfmt::{dispatch, first_payload, TxContext, TxValidator, VoutInfo};
use tracing::*;

use crate::{
    errors::ClientError,
    rpc::{ChainRpc, TxVerbose},
};

/// Indexer tuning knobs, filled in from config by the binary.
#[derive(Clone, Debug)]
pub struct IndexerParams {
    /// First protocol height, used when no checkpoint exists.
    pub genesis_height: u64,
    /// With no checkpoint, start at the current tip instead of genesis.
    pub forward_only: bool,
    /// Delay between tip polls once caught up.
    pub poll_dur: Duration,
    /// Delay before retrying after an RPC failure.
    pub retry_backoff: Duration,
}

impl Default for IndexerParams {
    fn default() -> Self {
        Self {
            genesis_height: 0,
            forward_only: false,
            poll_dur: Duration::from_secs(5),
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// Drives blocks from the node through extraction, dispatch, persistence,
/// and ledger application.
pub struct Indexer<C, D> {
    client: Arc<C>,
    db: Arc<D>,
    validator: Arc<dyn TxValidator + Send + Sync>,
    ledger: Arc<RwLock<LedgerContext>>,
    params: IndexerParams,
}

impl<C, D> std::fmt::Debug for Indexer<C, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer").field("params", &self.params).finish_non_exhaustive()
    }
}

impl<C: ChainRpc, D: TxRecordDatabase> Indexer<C, D> {
    pub fn new(
        client: Arc<C>,
        db: Arc<D>,
        validator: Arc<dyn TxValidator + Send + Sync>,
        ledger: Arc<RwLock<LedgerContext>>,
        params: IndexerParams,
    ) -> Self {
        Self {
            client,
            db,
            validator,
            ledger,
            params,
        }
    }

    /// The main task: sync to tip, then poll for new blocks forever.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!(
            genesis = self.params.genesis_height,
            forward_only = self.params.forward_only,
            "indexer started"
        );
        loop {
            match self.sync_to_tip().await {
                Ok(Some(height)) => {
                    debug!(%height, "synced to tip");
                    tokio::time::sleep(self.params.poll_dur).await;
                }
                Ok(None) => tokio::time::sleep(self.params.poll_dur).await,
                Err(err) => {
                    if is_transient(&err) {
                        warn!(%err, "transient chain failure, backing off");
                    } else {
                        error!(%err, "sync pass failed, backing off");
                    }
                    tokio::time::sleep(self.params.retry_backoff).await;
                }
            }
        }
    }

    /// Processes every unprocessed height up to the current tip, advancing
    /// the checkpoint per height. Returns the last height processed in this
    /// pass, if any.
    pub async fn sync_to_tip(&self) -> anyhow::Result<Option<u64>> {
        let tip = self.client.get_block_count().await?;
        let mut next = self.start_height(tip)?;
        let mut last = None;
        while next <= tip {
            self.process_height(next).await?;
            // Only now is the height fully processed.
            self.db.set_max_height(next)?;
            last = Some(next);
            next += 1;
        }
        Ok(last)
    }

    fn start_height(&self, tip: u64) -> anyhow::Result<u64> {
        Ok(match self.db.get_max_height()? {
            Some(h) => h + 1,
            None if self.params.forward_only => tip,
            None => self.params.genesis_height,
        })
    }

    async fn process_height(&self, height: u64) -> anyhow::Result<()> {
        let hash = self.client.get_block_hash(height).await?;
        let block = self.client.get_block(&hash).await?;
        debug!(%height, txs = block.tx.len(), "processing block");
        for txid in &block.tx {
            // A fetch failure here aborts the whole height: the checkpoint
            // must never cover a block whose transactions were not all seen.
            self.process_tx(height, txid).await?;
        }
        Ok(())
    }

    async fn process_tx(&self, height: u64, txid: &str) -> anyhow::Result<()> {
        let tx = self.client.get_raw_transaction(txid).await?;
        let vouts: Vec<VoutInfo> = tx
            .vout
            .iter()
            .map(|v| VoutInfo {
                n: v.n,
                address: v.address().map(str::to_owned),
                value_sats: v.value_sats(),
                script_hex: v.is_null_data().then(|| v.script_pub_key.hex.clone()),
            })
            .collect();

        // Marker misses are not protocol transactions; skip silently.
        let Some(extracted) = first_payload(&vouts) else {
            return Ok(());
        };

        let sender = self.resolve_sender(&tx).await?;
        let ctx = TxContext {
            sender,
            txid: tx.txid.clone(),
            block_height: height,
            vouts,
        };
        // Malformed payloads are transaction-scoped: record nothing, keep
        // walking the block.
        let record = match dispatch(&ctx, &extracted, self.validator.as_ref()).await {
            Ok(record) => record,
            Err(err) => {
                warn!(%height, %txid, %err, "skipping malformed payload");
                return Ok(());
            }
        };
        info!(%height, txid = %record.txid, ty = %record.tx_type, valid = record.valid,
              "indexed protocol transaction");
        self.db.put_tx_record(&record)?;
        self.ledger.write().apply(&record);
        Ok(())
    }

    /// The protocol sender is the address funding the first input. Coinbase
    /// transactions and inputs without a resolvable address yield an empty
    /// sender; a failed prevout fetch is a chain error and aborts the
    /// height rather than persisting a record with a blanked sender.
    async fn resolve_sender(&self, tx: &TxVerbose) -> Result<String, ClientError> {
        let Some(vin) = tx.vin.first() else {
            return Ok(String::new());
        };
        if vin.is_coinbase() {
            return Ok(String::new());
        }
        let (Some(prev_txid), Some(prev_vout)) = (&vin.txid, vin.vout) else {
            return Ok(String::new());
        };
        let prev = self.client.get_raw_transaction(prev_txid).await?;
        Ok(prev
            .vout
            .iter()
            .find(|v| v.n == prev_vout)
            .and_then(|v| v.address())
            .unwrap_or_default()
            .to_owned())
    }
}

fn is_transient(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ClientError>()
        .is_some_and(ClientError::is_transient)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use tally_codecs::TokenAmount;
    use tally_db_store_sled::SledTxRecordStore;
    use tally_ledger::{LedgerValidator, PropertyInfo};
    use tally_txfmt::{AddressRef, PropertyId, SendPayload, TxPayload, TxType};

    use super::*;
    use crate::{
        errors::{ClientError, ClientResult},
        rpc::{BlockVerbose, ScriptPubKey, VinEntry, VoutEntry},
    };

    #[derive(Default)]
    struct MockChain {
        inner: RwLock<MockChainInner>,
    }

    #[derive(Default)]
    struct MockChainInner {
        blocks: HashMap<u64, BlockVerbose>,
        txs: HashMap<String, TxVerbose>,
    }

    impl MockChain {
        fn add_block(&self, height: u64, txs: Vec<TxVerbose>) {
            let mut inner = self.inner.write();
            let block = BlockVerbose {
                hash: format!("hash-{height}"),
                height,
                tx: txs.iter().map(|t| t.txid.clone()).collect(),
            };
            inner.blocks.insert(height, block);
            for tx in txs {
                inner.txs.insert(tx.txid.clone(), tx);
            }
        }
    }

    #[async_trait]
    impl ChainRpc for MockChain {
        async fn get_block_count(&self) -> ClientResult<u64> {
            Ok(self.inner.read().blocks.keys().copied().max().unwrap_or(0))
        }

        async fn get_block_hash(&self, height: u64) -> ClientResult<String> {
            self.inner
                .read()
                .blocks
                .get(&height)
                .map(|b| b.hash.clone())
                .ok_or(ClientError::MissingResult)
        }

        async fn get_block(&self, hash: &str) -> ClientResult<BlockVerbose> {
            self.inner
                .read()
                .blocks
                .values()
                .find(|b| b.hash == hash)
                .cloned()
                .ok_or(ClientError::MissingResult)
        }

        async fn get_raw_transaction(&self, txid: &str) -> ClientResult<TxVerbose> {
            self.inner
                .read()
                .txs
                .get(txid)
                .cloned()
                .ok_or(ClientError::MissingResult)
        }

        async fn decode_raw_transaction(&self, _tx_hex: &str) -> ClientResult<TxVerbose> {
            Err(ClientError::MissingResult)
        }
    }

    fn op_return_vout(n: u32, payload: &str) -> VoutEntry {
        VoutEntry {
            value: 0.0,
            n,
            script_pub_key: ScriptPubKey {
                hex: format!("6a{:02x}{}", payload.len(), hex::encode(payload)),
                script_type: "nulldata".to_owned(),
                address: None,
                addresses: vec![],
            },
        }
    }

    fn pay_vout(n: u32, address: &str, value: f64) -> VoutEntry {
        VoutEntry {
            value,
            n,
            script_pub_key: ScriptPubKey {
                hex: "0014ab".to_owned(),
                script_type: "witness_v0_keyhash".to_owned(),
                address: Some(address.to_owned()),
                addresses: vec![],
            },
        }
    }

    fn funding_tx(txid: &str, address: &str) -> TxVerbose {
        TxVerbose {
            txid: txid.to_owned(),
            vin: vec![VinEntry {
                coinbase: Some("00".to_owned()),
                ..Default::default()
            }],
            vout: vec![pay_vout(0, address, 1.0)],
        }
    }

    fn protocol_tx(txid: &str, funding_txid: &str, payload: &str) -> TxVerbose {
        TxVerbose {
            txid: txid.to_owned(),
            vin: vec![VinEntry {
                txid: Some(funding_txid.to_owned()),
                vout: Some(0),
                coinbase: None,
            }],
            vout: vec![op_return_vout(0, payload)],
        }
    }

    /// A chain that can be told to fail fetching one transaction, the way a
    /// flaky node connection would.
    #[derive(Default)]
    struct FlakyChain {
        inner: MockChain,
        failing: RwLock<Option<String>>,
    }

    impl FlakyChain {
        fn fail_fetching(&self, txid: &str) {
            *self.failing.write() = Some(txid.to_owned());
        }

        fn heal(&self) {
            *self.failing.write() = None;
        }
    }

    #[async_trait]
    impl ChainRpc for FlakyChain {
        async fn get_block_count(&self) -> ClientResult<u64> {
            self.inner.get_block_count().await
        }

        async fn get_block_hash(&self, height: u64) -> ClientResult<String> {
            self.inner.get_block_hash(height).await
        }

        async fn get_block(&self, hash: &str) -> ClientResult<BlockVerbose> {
            self.inner.get_block(hash).await
        }

        async fn get_raw_transaction(&self, txid: &str) -> ClientResult<TxVerbose> {
            if self.failing.read().as_deref() == Some(txid) {
                return Err(ClientError::Transport("connection reset".to_owned()));
            }
            self.inner.get_raw_transaction(txid).await
        }

        async fn decode_raw_transaction(&self, tx_hex: &str) -> ClientResult<TxVerbose> {
            self.inner.decode_raw_transaction(tx_hex).await
        }
    }

    struct Harness<C: ChainRpc> {
        _dir: tempfile::TempDir,
        chain: Arc<C>,
        db: Arc<SledTxRecordStore>,
        ledger: Arc<RwLock<LedgerContext>>,
        indexer: Indexer<C, SledTxRecordStore>,
    }

    fn harness_with<C: ChainRpc>(chain: C, params: IndexerParams) -> Harness<C> {
        let dir = tempfile::tempdir().unwrap();
        let chain = Arc::new(chain);
        let db = Arc::new(SledTxRecordStore::open(dir.path()).unwrap());
        let ledger = Arc::new(RwLock::new(LedgerContext::new()));
        let validator = Arc::new(LedgerValidator::new(ledger.clone()));
        let indexer = Indexer::new(
            chain.clone(),
            db.clone(),
            validator,
            ledger.clone(),
            params,
        );
        Harness {
            _dir: dir,
            chain,
            db,
            ledger,
            indexer,
        }
    }

    fn harness(params: IndexerParams) -> Harness<MockChain> {
        harness_with(MockChain::default(), params)
    }

    fn seed_properties(ledger: &RwLock<LedgerContext>, up_to: u64) {
        let mut ctx = ledger.write();
        for i in 1..=up_to {
            ctx.register_property(PropertyInfo {
                ticker: format!("P{i}"),
                admin: "issuer".to_owned(),
                managed: false,
                nft: false,
                whitelist_ids: vec![],
            });
        }
    }

    #[tokio::test]
    async fn end_to_end_send_is_decoded_validated_and_applied() {
        let h = harness(IndexerParams {
            genesis_height: 1,
            ..Default::default()
        });
        seed_properties(&h.ledger, 5);
        h.ledger.write().credit(
            "tltc1qsender",
            PropertyId::Linear(5),
            TokenAmount::from_whole(50),
        );

        h.chain
            .add_block(1, vec![funding_tx("fund1", "tltc1qsender")]);
        h.chain.add_block(
            2,
            vec![protocol_tx("send1", "fund1", "tl2;tltc1qexampleaddress;5;a")],
        );

        assert_eq!(h.indexer.sync_to_tip().await.unwrap(), Some(2));

        let rec = h.db.get_tx_record(2, "send1").unwrap().unwrap();
        assert_eq!(rec.sender, "tltc1qsender");
        assert_eq!(rec.tx_type, TxType::Send);
        assert!(rec.valid);
        assert_eq!(
            rec.params,
            TxPayload::Send(SendPayload::Single {
                address: AddressRef::Direct("tltc1qexampleaddress".to_owned()),
                property_id: PropertyId::Linear(5),
                amount: TokenAmount::from_whole(10),
            })
        );

        // Ledger application moved the balance.
        let ctx = h.ledger.read();
        assert_eq!(
            ctx.available("tltc1qexampleaddress", PropertyId::Linear(5)),
            TokenAmount::from_whole(10)
        );
        assert_eq!(
            ctx.available("tltc1qsender", PropertyId::Linear(5)),
            TokenAmount::from_whole(40)
        );
    }

    #[tokio::test]
    async fn non_protocol_and_garbage_txs_do_not_stall_the_walk() {
        let h = harness(IndexerParams {
            genesis_height: 1,
            ..Default::default()
        });
        h.chain
            .add_block(1, vec![funding_tx("fund1", "tltc1qsender")]);
        // A tag char outside base-36: contained, not fatal.
        h.chain.add_block(
            2,
            vec![
                protocol_tx("bad1", "fund1", "tl~;x"),
                protocol_tx("ok1", "fund1", "tl2;tltc1qto;0;a"),
            ],
        );

        assert_eq!(h.indexer.sync_to_tip().await.unwrap(), Some(2));
        assert_eq!(h.db.get_max_height().unwrap(), Some(2));
        // Only the well-formed tx produced a record.
        let recs = h.db.get_block_records(2).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].txid, "ok1");
    }

    #[tokio::test]
    async fn tx_fetch_failure_aborts_the_height_without_checkpointing() {
        let h = harness_with(
            FlakyChain::default(),
            IndexerParams {
                genesis_height: 1,
                ..Default::default()
            },
        );
        h.chain
            .inner
            .add_block(1, vec![funding_tx("fund1", "tltc1qsender")]);
        h.chain.inner.add_block(
            2,
            vec![protocol_tx("send1", "fund1", "tl2;tltc1qto;0;a")],
        );

        h.chain.fail_fetching("send1");
        assert!(h.indexer.sync_to_tip().await.is_err());
        // Height 1 committed, the failed height did not.
        assert_eq!(h.db.get_max_height().unwrap(), Some(1));
        assert!(h.db.get_block_records(2).unwrap().is_empty());

        // Once the node recovers, the retry picks the height up in full.
        h.chain.heal();
        assert_eq!(h.indexer.sync_to_tip().await.unwrap(), Some(2));
        assert_eq!(h.db.get_max_height().unwrap(), Some(2));
        assert!(h.db.get_tx_record(2, "send1").unwrap().is_some());
    }

    #[tokio::test]
    async fn sender_lookup_failure_aborts_instead_of_blanking_the_sender() {
        let h = harness_with(
            FlakyChain::default(),
            IndexerParams {
                genesis_height: 1,
                ..Default::default()
            },
        );
        h.chain
            .inner
            .add_block(1, vec![funding_tx("fund1", "tltc1qsender")]);
        assert_eq!(h.indexer.sync_to_tip().await.unwrap(), Some(1));

        // The prevout fetch inside sender resolution fails.
        h.chain.fail_fetching("fund1");
        h.chain.inner.add_block(
            2,
            vec![protocol_tx("send1", "fund1", "tl2;tltc1qto;0;a")],
        );
        assert!(h.indexer.sync_to_tip().await.is_err());
        assert_eq!(h.db.get_max_height().unwrap(), Some(1));
        assert!(h.db.get_tx_record(2, "send1").unwrap().is_none());

        // The retry must record the real funding address, not "".
        h.chain.heal();
        assert_eq!(h.indexer.sync_to_tip().await.unwrap(), Some(2));
        let rec = h.db.get_tx_record(2, "send1").unwrap().unwrap();
        assert_eq!(rec.sender, "tltc1qsender");
    }

    #[tokio::test]
    async fn restart_resumes_after_checkpoint_without_duplicates() {
        let h = harness(IndexerParams {
            genesis_height: 1,
            ..Default::default()
        });
        seed_properties(&h.ledger, 5);
        h.ledger.write().credit(
            "tltc1qsender",
            PropertyId::Linear(5),
            TokenAmount::from_whole(50),
        );
        h.chain
            .add_block(1, vec![funding_tx("fund1", "tltc1qsender")]);
        h.chain.add_block(
            2,
            vec![protocol_tx("send1", "fund1", "tl2;tltc1qexampleaddress;5;a")],
        );
        assert_eq!(h.indexer.sync_to_tip().await.unwrap(), Some(2));

        // Caught up: another pass processes nothing new.
        assert_eq!(h.indexer.sync_to_tip().await.unwrap(), None);
        assert_eq!(h.db.get_block_records(2).unwrap().len(), 1);

        // New block arrives; only it is processed.
        h.chain.add_block(3, vec![funding_tx("fund2", "tltc1qother")]);
        assert_eq!(h.indexer.sync_to_tip().await.unwrap(), Some(3));
        assert_eq!(h.db.get_max_height().unwrap(), Some(3));
    }

    #[tokio::test]
    async fn replay_of_partially_processed_height_is_idempotent() {
        let h = harness(IndexerParams {
            genesis_height: 1,
            ..Default::default()
        });
        h.chain
            .add_block(1, vec![funding_tx("fund1", "tltc1qsender")]);
        h.chain.add_block(
            2,
            vec![
                protocol_tx("tx-a", "fund1", "tl2;tltc1qto;0;a"),
                protocol_tx("tx-b", "fund1", "tl2;tltc1qto;0;b"),
            ],
        );

        // Simulate a crash after tx-a persisted but before the checkpoint
        // advanced past height 2: the record exists, MaxHeight does not
        // cover it.
        h.indexer.process_tx(2, "tx-a").await.unwrap();
        h.db.set_max_height(1).unwrap();
        assert_eq!(h.db.get_block_records(2).unwrap().len(), 1);

        // Restart: height 2 replays in full, no duplicates.
        assert_eq!(h.indexer.sync_to_tip().await.unwrap(), Some(2));
        let txids: Vec<_> = h
            .db
            .get_block_records(2)
            .unwrap()
            .into_iter()
            .map(|r| r.txid)
            .collect();
        assert_eq!(txids, ["tx-a", "tx-b"]);
    }

    #[tokio::test]
    async fn forward_only_starts_at_tip() {
        let h = harness(IndexerParams {
            genesis_height: 1,
            forward_only: true,
            ..Default::default()
        });
        h.chain
            .add_block(9, vec![protocol_tx("old", "missing", "tl2;tltc1qto;0;a")]);
        h.chain.add_block(10, vec![funding_tx("fund", "tltc1qx")]);

        assert_eq!(h.indexer.sync_to_tip().await.unwrap(), Some(10));
        // The old block was never visited.
        assert!(h.db.get_block_records(9).unwrap().is_empty());
        assert_eq!(h.db.get_max_height().unwrap(), Some(10));
    }
}
