//! Tally Layer node binary entrypoint.

use std::{fs, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use argh::from_env;
use parking_lot::RwLock;
use tally_chainio::{HttpChainRpc, Indexer, IndexerParams};
use tally_common::logging;
use tally_config::Config;
use tally_db_store_sled::SledTxRecordStore;
use tally_ledger::{LedgerContext, LedgerValidator};
use tokio::runtime;
use tracing::*;

use crate::args::Args;

mod args;

fn main() -> Result<()> {
    let args: Args = from_env();

    let mut config = load_config(&args)?;
    if let Some(datadir) = args.datadir {
        config.datadir = datadir;
    }

    // Guard must outlive the runtime so file logs flush on exit.
    let _log_guard = logging::init(&config.logging);

    let rt = runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("tallyd-rt")
        .build()
        .context("failed to build runtime")?;

    rt.block_on(run(config))
}

fn load_config(args: &Args) -> Result<Config> {
    let raw = fs::read_to_string(&args.config)
        .with_context(|| format!("reading config {}", args.config.display()))?;
    toml::from_str(&raw).context("parsing config")
}

async fn run(config: Config) -> Result<()> {
    info!(datadir = %config.datadir.display(), "starting tallyd");

    let store = Arc::new(SledTxRecordStore::open(&config.datadir.join("db"))?);

    let mut ledger = LedgerContext::new();
    if let Some(admin) = &config.indexer.activation_admin {
        ledger = ledger.with_activation_admin(admin.clone());
    }
    let ledger = Arc::new(RwLock::new(ledger));
    let validator = Arc::new(LedgerValidator::new(ledger.clone()));

    let client = Arc::new(HttpChainRpc::new(
        config.chaind.rpc_url.clone(),
        config.chaind.auth(),
    )?);

    let params = IndexerParams {
        genesis_height: config.indexer.genesis_height,
        forward_only: config.indexer.forward_only,
        poll_dur: Duration::from_millis(config.indexer.poll_dur_ms),
        retry_backoff: Duration::from_millis(config.indexer.retry_backoff_ms),
    };
    let indexer = Indexer::new(client, store, validator, ledger, params);

    tokio::select! {
        res = indexer.run() => res,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received, exiting");
            Ok(())
        }
    }
}
