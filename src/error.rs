//! Error types for record decoding, encoding, and trace assembly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MseedError {
    #[error("record too short: expected at least {expected} bytes, got {actual}")]
    RecordTooShort { expected: usize, actual: usize },

    #[error("invalid fixed header (not a miniSEED v2 record)")]
    InvalidHeader,

    #[error("invalid data quality indicator {0:?}")]
    InvalidQuality(char),

    #[error("invalid blockette chain at offset {offset}")]
    InvalidBlockette { offset: usize },

    #[error("unsupported encoding format: {0}")]
    UnsupportedEncoding(u8),

    #[error("blockette 1000 not found")]
    MissingBlockette1000,

    #[error("corrupt Steim frames: {0}")]
    SteimDecode(String),

    #[error("header declares {expected} samples, payload holds {actual}")]
    SampleCountMismatch { expected: usize, actual: usize },

    #[error("cannot write record: {0}")]
    EncodeError(String),

    #[error("sample buffer allocation failed: {0}")]
    AllocationFailed(String),
}

pub type Result<T> = std::result::Result<T, MseedError>;
