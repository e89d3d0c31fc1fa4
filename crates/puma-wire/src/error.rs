//! Wire protocol error types.

use std::io;

use puma_types::{AttributeError, DataType, OwnerKind};
use thiserror::Error;

/// Result type for wire operations.
pub type WireResult<T> = Result<T, WireError>;

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum WireError {
    /// Frame did not start with the protocol magic.
    #[error("invalid frame magic: {0:#010x}")]
    InvalidMagic(u32),

    /// Frame carries a protocol version this build does not speak.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u16),

    /// Frame payload exceeds the maximum size.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An attribute record's values do not match its data type tag.
    #[error("attribute '{id}' is tagged {tag:?} but carries {found:?} values")]
    DataTypeMismatch {
        id: String,
        tag: DataType,
        found: DataType,
    },

    /// A decoded attribute violates the attribute model.
    #[error("invalid attribute: {0}")]
    Attribute(#[from] AttributeError),

    /// A REST attribute's declared owner kind contradicts its id prefix.
    #[error("attribute '{id}' is declared {declared:?} but its prefix names {prefixed:?}")]
    OwnerKindMismatch {
        id: String,
        declared: OwnerKind,
        prefixed: OwnerKind,
    },

    /// A REST value could not be read as the attribute's data type.
    #[error("attribute '{id}' has a value that is not a valid {data_type:?}")]
    InvalidJsonValue { id: String, data_type: DataType },

    /// Postcard encoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] postcard::Error),

    /// JSON encoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading or writing the stream failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}
