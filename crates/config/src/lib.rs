//! Configuration for the tallyd node, deserialized from TOML.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level node configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    // Plain values first so TOML serialization never emits a value after a
    // table.
    #[serde(default = "default_datadir")]
    pub datadir: PathBuf,
    pub chaind: ChaindConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection settings for the Litecoin-family node.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChaindConfig {
    pub rpc_url: String,
    #[serde(default)]
    pub rpc_user: Option<String>,
    #[serde(default)]
    pub rpc_password: Option<String>,
}

impl ChaindConfig {
    /// Basic-auth credentials, present only when both halves are set.
    pub fn auth(&self) -> Option<(String, String)> {
        match (&self.rpc_user, &self.rpc_password) {
            (Some(u), Some(p)) => Some((u.clone(), p.clone())),
            _ => None,
        }
    }
}

/// Indexer walk settings.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IndexerConfig {
    /// First height carrying protocol transactions.
    #[serde(default)]
    pub genesis_height: u64,
    /// Skip history: with no checkpoint, start at the current tip.
    #[serde(default)]
    pub forward_only: bool,
    #[serde(default = "default_poll_dur_ms")]
    pub poll_dur_ms: u64,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// If set, only this address may issue protocol activations.
    #[serde(default)]
    pub activation_admin: Option<String>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            genesis_height: 0,
            forward_only: false,
            poll_dur_ms: default_poll_dur_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            activation_admin: None,
        }
    }
}

/// Log output settings. The filter uses `tracing` env-filter syntax and is
/// overridden by `RUST_LOG` when that is set.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Also mirror logs into this file.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: None,
        }
    }
}

fn default_datadir() -> PathBuf {
    PathBuf::from("tallyd-data")
}

fn default_poll_dur_ms() -> u64 {
    5_000
}

fn default_retry_backoff_ms() -> u64 {
    1_000
}

fn default_log_filter() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [chaind]
            rpc_url = "http://localhost:19332"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.chaind.rpc_url, "http://localhost:19332");
        assert_eq!(cfg.chaind.auth(), None);
        assert_eq!(cfg.indexer.genesis_height, 0);
        assert!(!cfg.indexer.forward_only);
        assert_eq!(cfg.indexer.poll_dur_ms, 5_000);
        assert_eq!(cfg.logging.filter, "info");
        assert_eq!(cfg.datadir, PathBuf::from("tallyd-data"));
    }

    #[test]
    fn full_config_roundtrips() {
        let cfg: Config = toml::from_str(
            r#"
            datadir = "/var/lib/tallyd"

            [chaind]
            rpc_url = "http://127.0.0.1:9332"
            rpc_user = "rpc"
            rpc_password = "hunter2"

            [indexer]
            genesis_height = 2_100_000
            forward_only = true
            poll_dur_ms = 2000
            retry_backoff_ms = 500
            activation_admin = "tltc1qfoundation"

            [logging]
            filter = "debug,sled=warn"
            file = "tallyd.log"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.chaind.auth(), Some(("rpc".to_owned(), "hunter2".to_owned())));
        assert_eq!(cfg.indexer.genesis_height, 2_100_000);
        assert!(cfg.indexer.forward_only);
        assert_eq!(cfg.indexer.activation_admin.as_deref(), Some("tltc1qfoundation"));
        assert_eq!(cfg.logging.file, Some(PathBuf::from("tallyd.log")));

        let out = toml::to_string(&cfg).unwrap();
        let back: Config = toml::from_str(&out).unwrap();
        assert_eq!(back.indexer.poll_dur_ms, 2000);
    }
}
