//! Error types for the webhook provider
//!
//! This module defines all error types used throughout the workspace.

use crate::record::DnsRecord;
use thiserror::Error;

/// Result type alias for webhook provider operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the webhook provider
#[derive(Error, Debug)]
pub enum Error {
    /// Network-level failure reaching the RPC endpoint
    #[error("transport error: {0}")]
    Transport(String),

    /// HTTP 401 from the RPC endpoint
    #[error("http: unauthorized")]
    Unauthorized,

    /// HTTP 403 from the RPC endpoint
    #[error("http: forbidden")]
    Forbidden,

    /// Any other unexpected HTTP status
    #[error("http status code: {0}")]
    HttpStatus(u16),

    /// Credentials rejected by the remote login method
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Application-level error reported in the RPC response envelope
    #[error("rpc error: {0}")]
    Rpc(String),

    /// Record missing a required field or carrying an unsupported kind
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Requested update/delete records absent from the remote table
    #[error("records not found: {0:?}")]
    RecordsNotFound(Vec<DnsRecord>),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an RPC error
    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::Rpc(msg.into())
    }

    /// Create an invalid record error
    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for the HTTP statuses that trigger a single re-login
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Forbidden)
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
