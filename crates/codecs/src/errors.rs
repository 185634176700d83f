use thiserror::Error;

/// Errors produced while converting between numeral systems.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// A digit fell outside the target alphabet.
    #[error("invalid digit {0:?} for base-{1}")]
    InvalidDigit(char, u32),

    /// Input was empty where at least one digit is required.
    #[error("empty input")]
    Empty,

    /// The value does not fit in the integer width conversions run over.
    #[error("value out of range for base-{0} conversion")]
    Overflow(u32),

    /// Input was not valid hex.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// A base-256 symbol was not part of the fixed alphabet.
    #[error("symbol {0:?} not in base-256 alphabet")]
    UnknownSymbol(char),

    /// A fractional price field was not of the form `int '.' frac '_'`.
    #[error("malformed base-94 price field")]
    MalformedPrice,
}
