use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("codec failure: {0}")]
    Codec(String),

    #[error("storage backend: {0}")]
    Backend(String),
}

pub type DbResult<T> = Result<T, DbError>;
