use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed rpc response: {0}")]
    MalformedResponse(String),

    #[error("rpc response carried no result")]
    MissingResult,
}

impl ClientError {
    /// Whether retrying the same call later can reasonably succeed.
    /// Covers transport failures and the node's warming-up phase.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            // RPC_IN_WARMUP
            Self::Rpc { code, .. } => *code == -28,
            _ => false,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
