//! Chain RPC plumbing and the block-walking indexer.

mod client;
mod errors;
mod indexer;
mod rpc;

pub use client::HttpChainRpc;
pub use errors::{ClientError, ClientResult};
pub use indexer::{Indexer, IndexerParams};
pub use rpc::{BlockVerbose, ChainRpc, ScriptPubKey, TxVerbose, VinEntry, VoutEntry};
