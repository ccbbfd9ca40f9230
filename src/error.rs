//! Error types for acigate
//!
//! Centralized error handling using thiserror. Execute-path operations fold
//! these into [`ExecutionResult::Failure`] at the gateway boundary; only the
//! `try_*` discovery variants and configuration loading surface them raw.

use thiserror::Error;

use crate::types::{ErrorKind, ExecutionResult};

/// All error types that can occur in acigate
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The per-call deadline elapsed before the upstream responded
    #[error("upstream call timed out after {0}s")]
    Timeout(u64),

    /// The upstream returned a non-2xx status
    #[error("upstream returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Connection failure or unparseable response body
    #[error("transport failure: {0}")]
    Transport(String),

    /// Direct call against an app not in the enabled-apps allowlist
    #[error("app '{0}' is not in the enabled-apps allowlist")]
    NotEnabled(String),

    /// No function matched an intent or name lookup
    #[error("no function found for '{0}'")]
    NotFound(String),

    /// Configuration loading or validation error
    #[error("invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for acigate operations
pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    /// Project onto the wire-facing failure taxonomy.
    ///
    /// Config/IO/JSON failures have no dedicated wire kind and surface as
    /// transport failures when folded into an [`ExecutionResult`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Http { .. } => ErrorKind::Http,
            Self::Transport(_) => ErrorKind::Transport,
            Self::NotEnabled(_) => ErrorKind::NotEnabled,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Config(_) | Self::Io(_) | Self::Json(_) => ErrorKind::Transport,
        }
    }
}

impl From<GatewayError> for ExecutionResult {
    fn from(err: GatewayError) -> Self {
        ExecutionResult::failure(err.kind(), err.to_string())
    }
}
