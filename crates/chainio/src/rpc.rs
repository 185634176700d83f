//! The chain RPC seam and the verbose wire shapes it returns.

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::ClientResult;

/// A block in verbose form: header fields we care about plus the txid list.
#[derive(Clone, Debug, Deserialize)]
pub struct BlockVerbose {
    pub hash: String,
    pub height: u64,
    pub tx: Vec<String>,
}

/// A transaction in verbose form.
#[derive(Clone, Debug, Deserialize)]
pub struct TxVerbose {
    pub txid: String,
    #[serde(default)]
    pub vin: Vec<VinEntry>,
    #[serde(default)]
    pub vout: Vec<VoutEntry>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct VinEntry {
    pub txid: Option<String>,
    pub vout: Option<u32>,
    /// Present (and the others absent) on coinbase inputs.
    pub coinbase: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VoutEntry {
    /// Value in whole coins, as the node reports it.
    pub value: f64,
    pub n: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ScriptPubKey {
    pub hex: String,
    #[serde(rename = "type", default)]
    pub script_type: String,
    /// Newer nodes report a single `address`, older ones an `addresses`
    /// array. Both are kept and merged by [`VoutEntry::address`].
    pub address: Option<String>,
    #[serde(default)]
    pub addresses: Vec<String>,
}

impl VoutEntry {
    /// The output's address if the script has a canonical one.
    pub fn address(&self) -> Option<&str> {
        self.script_pub_key
            .address
            .as_deref()
            .or_else(|| self.script_pub_key.addresses.first().map(String::as_str))
    }

    /// The output value in 1e-8 units.
    pub fn value_sats(&self) -> u64 {
        (self.value * 1e8).round() as u64
    }

    pub fn is_null_data(&self) -> bool {
        self.script_pub_key.script_type == "nulldata"
            || self.script_pub_key.hex.starts_with("6a")
    }
}

impl VinEntry {
    pub fn is_coinbase(&self) -> bool {
        self.coinbase.is_some()
    }
}

/// What the indexer needs from a node. Calls are assumed
/// reliable-eventually: transient failures are retried by the caller, not
/// inside implementations.
#[async_trait]
pub trait ChainRpc: Send + Sync + 'static {
    async fn get_block_count(&self) -> ClientResult<u64>;

    async fn get_block_hash(&self, height: u64) -> ClientResult<String>;

    async fn get_block(&self, hash: &str) -> ClientResult<BlockVerbose>;

    async fn get_raw_transaction(&self, txid: &str) -> ClientResult<TxVerbose>;

    async fn decode_raw_transaction(&self, tx_hex: &str) -> ClientResult<TxVerbose>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vout_value_scaling() {
        let v: VoutEntry = serde_json::from_value(serde_json::json!({
            "value": 0.00000546,
            "n": 1,
            "scriptPubKey": { "hex": "0014ab", "type": "witness_v0_keyhash",
                              "address": "tltc1qexample" }
        }))
        .unwrap();
        assert_eq!(v.value_sats(), 546);
        assert_eq!(v.address(), Some("tltc1qexample"));
    }

    #[test]
    fn legacy_addresses_array_is_accepted() {
        let v: VoutEntry = serde_json::from_value(serde_json::json!({
            "value": 1.5,
            "n": 0,
            "scriptPubKey": { "hex": "76a9", "type": "pubkeyhash",
                              "addresses": ["LdAddr1", "LdAddr2"] }
        }))
        .unwrap();
        assert_eq!(v.value_sats(), 150_000_000);
        assert_eq!(v.address(), Some("LdAddr1"));
    }

    #[test]
    fn null_data_detection() {
        let v: VoutEntry = serde_json::from_value(serde_json::json!({
            "value": 0.0,
            "n": 0,
            "scriptPubKey": { "hex": "6a04746c3030", "type": "nulldata" }
        }))
        .unwrap();
        assert!(v.is_null_data());
        assert_eq!(v.address(), None);
    }
}
