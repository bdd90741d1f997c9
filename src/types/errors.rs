//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation. The
//! `Display` text of a variant is what ends up in an error envelope's
//! `error` field, so messages stay short and human-readable.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the search tool server.
#[derive(Error, Debug)]
pub enum Error {
    /// Validation errors (map to JSON-RPC invalid params).
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown method or resource (map to JSON-RPC method not found).
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or placeholder credentials and other setup problems.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Search provider rejected the request or answered with a non-2xx status.
    #[error("provider error (HTTP {status}): {message}")]
    Provider { status: u16, message: String },

    /// Timeout talking to the provider.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Internal errors.
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport errors from the provider client.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON-RPC 2.0 error codes used by the server.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

impl Error {
    /// Convert to a JSON-RPC error code.
    pub fn to_jsonrpc_code(&self) -> i64 {
        match self {
            Error::Validation(_) => codes::INVALID_PARAMS,
            Error::NotFound(_) => codes::METHOD_NOT_FOUND,
            Error::Configuration(_)
            | Error::Serialization(_)
            | Error::Provider { .. }
            | Error::Timeout(_)
            | Error::Internal(_)
            | Error::Http(_)
            | Error::Io(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Short machine-readable kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::NotFound(_) => "not_found",
            Error::Configuration(_) => "configuration",
            Error::Provider { .. } => "provider",
            Error::Timeout(_) => "timeout",
            Error::Internal(_) => "internal",
            Error::Serialization(_) => "serialization",
            Error::Http(_) => "http",
            Error::Io(_) => "io",
        }
    }
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn provider(status: u16, msg: impl Into<String>) -> Self {
        Self::Provider {
            status,
            message: msg.into(),
        }
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jsonrpc_codes() {
        assert_eq!(Error::validation("x").to_jsonrpc_code(), -32602);
        assert_eq!(Error::not_found("x").to_jsonrpc_code(), -32601);
        assert_eq!(Error::provider(401, "bad key").to_jsonrpc_code(), -32603);
        assert_eq!(Error::configuration("x").to_jsonrpc_code(), -32603);
    }

    #[test]
    fn test_serialization_fault_is_internal() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert_eq!(err.kind(), "serialization");
        assert_eq!(err.to_jsonrpc_code(), codes::INTERNAL_ERROR);
    }

    #[test]
    fn test_provider_display() {
        let err = Error::provider(429, "rate limited");
        assert_eq!(err.to_string(), "provider error (HTTP 429): rate limited");
        assert_eq!(err.kind(), "provider");
    }
}
