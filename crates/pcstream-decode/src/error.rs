use thiserror::Error;

/// Result type for decode operations.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Errors that can occur while decoding point records and headers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("buffer truncated: needed {needed} bytes at offset {offset}, have {available}")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("point record layout has zero stride")]
    ZeroStride,

    #[error("unsupported LAS point format {0}")]
    UnsupportedPointFormat(u8),

    #[error(
        "record length {record_length} is too short for point format {format} (needs {minimum})"
    )]
    RecordTooShort {
        format: u8,
        record_length: u16,
        minimum: u16,
    },

    #[error("unsupported dimension `{name}`: {kind} of {size} bytes")]
    UnsupportedDimension {
        name: String,
        kind: String,
        size: usize,
    },

    #[error("schema has no `{0}` dimension")]
    MissingDimension(&'static str),

    #[error("invalid node key `{0}`")]
    InvalidKey(String),

    #[error("invalid LAS header: {0}")]
    InvalidHeader(String),
}
