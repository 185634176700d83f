use thiserror::Error;

/// Errors from payload parsing. Note that per the grammar most field-level
/// problems are not errors at all (missing slots default); these cover the
/// cases that genuinely cannot be interpreted.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// The payload carried no type tag at all.
    #[error("payload missing type tag")]
    MissingTag,

    /// The tag digit was outside the base-36 alphabet.
    #[error("unparseable type tag {0:?}")]
    BadTag(String),

    /// The tag decoded but names no transaction type. The tag space is
    /// closed; this is corruption or a future protocol version.
    #[error("unknown transaction type tag {0}")]
    UnknownType(u64),
}

/// Errors surfaced by the dispatcher. These are contained per-transaction
/// by the indexer and never abort a block.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The extracted marker was not the protocol marker.
    #[error("marker {0:?} is not the protocol marker")]
    WrongMarker(String),

    /// Payload parsing failed hard (tag-level).
    #[error(transparent)]
    Parse(#[from] ParseError),
}
