//! Codec errors.

use crate::args::ArgumentFormat;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Wire bytes (protobuf, hex, fixed-width slots) could not be parsed.
    #[error("malformed data: {0}")]
    Malformed(String),

    /// A contract argument value does not fit its declared format.
    #[error("cannot parse {format} at index {index}: {cause}")]
    ArgumentEncode {
        index: usize,
        format: ArgumentFormat,
        cause: String,
    },

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

impl CodecError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}
