//! Error taxonomy for ledger access, scanning and submission.

use codec::CodecError;
use thiserror::Error;

/// Failure of one adapter call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// Connection, timeout, HTTP status or unreadable body. Retryable.
    #[error("transport: {0}")]
    Transport(String),
    /// The node answered with an `error` object.
    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },
    /// `result` did not have the expected shape.
    #[error("decode {method} result: {reason}")]
    Decode { method: String, reason: String },
}

/// Outcome classes of one scan tick.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Retry the same target after the interval.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Block or transaction absent at the moment of the call.
    #[error("not found: {0}")]
    NotFound(String),
    /// The historical source has no more data. Terminal for the backward loop only.
    #[error("no more history")]
    Exhausted,
    /// Undecodable data; the offending transaction is skipped.
    #[error("malformed data: {0}")]
    Malformed(String),
}

impl From<RpcError> for ScanError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::Decode { .. } => ScanError::Malformed(e.to_string()),
            RpcError::Transport(_) | RpcError::Node { .. } => ScanError::Transport(e.to_string()),
        }
    }
}

impl From<CodecError> for ScanError {
    fn from(e: CodecError) -> Self {
        ScanError::Malformed(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("post message is empty")]
    EmptyMessage,
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("node rejected {method}: {reason}")]
    Rejected { method: String, reason: String },
    #[error("nonce of {address} is exhausted")]
    NonceOverflow { address: String },
}
