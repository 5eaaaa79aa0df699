//! Error types for Unisearch.
//!
//! Every failure a search request can hit is one variant of [`SearchError`].
//! Variants are grouped into an [`ErrorKind`] so callers can tell an invalid
//! query apart from a misconfigured host or a failing search tool.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Why the security gate refused a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectedQuery {
    /// Query is empty after trimming.
    Empty,
    /// Query contains a double-quote character.
    Quoted,
    /// Query contains a configured sensitive keyword.
    RestrictedKeyword,
}

impl RejectedQuery {
    /// Short machine-friendly reason.
    pub fn reason(&self) -> &'static str {
        match self {
            RejectedQuery::Empty => "empty query",
            RejectedQuery::Quoted => "quoted string queries not supported",
            RejectedQuery::RestrictedKeyword => "restricted keywords",
        }
    }
}

impl fmt::Display for RejectedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            RejectedQuery::Empty => "Empty query not allowed",
            RejectedQuery::Quoted => "Quoted string queries not supported",
            RejectedQuery::RestrictedKeyword => "Query contains restricted keywords",
        };
        f.write_str(message)
    }
}

/// Main error type for the Unisearch library.
#[derive(Debug, Error)]
pub enum SearchError {
    // Query errors
    #[error("{0}")]
    Validation(RejectedQuery),

    #[error("Invalid parameters: {message}")]
    InvalidParams { message: String },

    // Environment errors
    #[error("No search provider available for {platform}")]
    UnsupportedPlatform { platform: String },

    #[error("{remediation}")]
    BackendUnavailable {
        backend: &'static str,
        remediation: String,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // Tool errors
    #[error("{tool} failed: {message}")]
    BackendExecution { tool: String, message: String },

    #[error("The {tool} database needs to be created. Please run: sudo updatedb")]
    IndexNotReady { tool: String },

    #[error("{tool} did not finish within {after:?}")]
    Timeout { tool: String, after: Duration },

    #[error("Search was cancelled")]
    Cancelled,

    // Internal errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

/// Result type alias for Unisearch operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Coarse classification of a [`SearchError`], each warranting a different
/// caller action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The query or its parameters must change.
    Validation,
    /// No backend exists for this operating system.
    Platform,
    /// A required tool or library must be installed or configured.
    Unavailable,
    /// The backend ran and reported a failure.
    Execution,
    /// Unexpected failure inside the service.
    Internal,
}

impl From<std::io::Error> for SearchError {
    fn from(err: std::io::Error) -> Self {
        SearchError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::InvalidParams {
            message: err.to_string(),
        }
    }
}

impl From<RejectedQuery> for SearchError {
    fn from(rejected: RejectedQuery) -> Self {
        SearchError::Validation(rejected)
    }
}

impl SearchError {
    /// Create a backend execution error for a named tool.
    pub fn execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        SearchError::BackendExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a parameter error.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        SearchError::InvalidParams {
            message: message.into(),
        }
    }

    /// True for an IO error caused by a missing file or executable.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SearchError::Io { source: Some(e), .. } if e.kind() == std::io::ErrorKind::NotFound
        )
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::Validation(_) | SearchError::InvalidParams { .. } => {
                ErrorKind::Validation
            }

            SearchError::UnsupportedPlatform { .. } => ErrorKind::Platform,

            SearchError::BackendUnavailable { .. }
            | SearchError::IndexNotReady { .. }
            | SearchError::Config { .. } => ErrorKind::Unavailable,

            SearchError::BackendExecution { .. }
            | SearchError::Timeout { .. }
            | SearchError::Cancelled => ErrorKind::Execution,

            SearchError::Io { .. } => ErrorKind::Internal,
        }
    }

    /// Convert to a JSON-RPC error code.
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            SearchError::InvalidParams { .. } => -32602,

            SearchError::Validation(_) => -32005,

            SearchError::UnsupportedPlatform { .. }
            | SearchError::BackendUnavailable { .. }
            | SearchError::IndexNotReady { .. } => -32001,

            SearchError::BackendExecution { .. } | SearchError::Timeout { .. } => -32003,

            SearchError::Cancelled => -32004,

            SearchError::Config { .. } | SearchError::Io { .. } => -32603,
        }
    }

    /// Check if this error should trigger a retry.
    ///
    /// None of the failure classes are fixed by retrying: they need an
    /// installation, a configuration change or a different query.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
