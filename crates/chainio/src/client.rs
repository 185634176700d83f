//! JSON-RPC over HTTP client for Litecoin-family nodes.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::*;

use crate::{
    errors::{ClientError, ClientResult},
    rpc::{BlockVerbose, ChainRpc, TxVerbose},
};

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Concrete [`ChainRpc`] speaking bitcoind-style JSON-RPC with basic auth.
#[derive(Debug)]
pub struct HttpChainRpc {
    http: reqwest::Client,
    url: String,
    auth: Option<(String, String)>,
    next_id: AtomicU64,
}

impl HttpChainRpc {
    pub fn new(url: impl Into<String>, auth: Option<(String, String)>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
            auth,
            next_id: AtomicU64::new(0),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> ClientResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!(%method, %id, "rpc call");
        let body = json!({
            "jsonrpc": "1.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let mut req = self.http.post(&self.url).json(&body);
        if let Some((user, pass)) = &self.auth {
            req = req.basic_auth(user, Some(pass));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let parsed: RpcResponse<T> = resp
            .json()
            .await
            .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;

        if let Some(err) = parsed.error {
            return Err(ClientError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        parsed.result.ok_or(ClientError::MissingResult)
    }
}

#[async_trait]
impl ChainRpc for HttpChainRpc {
    async fn get_block_count(&self) -> ClientResult<u64> {
        self.call("getblockcount", json!([])).await
    }

    async fn get_block_hash(&self, height: u64) -> ClientResult<String> {
        self.call("getblockhash", json!([height])).await
    }

    async fn get_block(&self, hash: &str) -> ClientResult<BlockVerbose> {
        // Verbosity 1: header plus txid list.
        self.call("getblock", json!([hash, 1])).await
    }

    async fn get_raw_transaction(&self, txid: &str) -> ClientResult<TxVerbose> {
        self.call("getrawtransaction", json!([txid, true])).await
    }

    async fn decode_raw_transaction(&self, tx_hex: &str) -> ClientResult<TxVerbose> {
        self.call("decoderawtransaction", json!([tx_hex])).await
    }
}
