//! Error types for ovh-dynhost.

use std::fmt;
use thiserror::Error;

/// Result type alias for ovh-dynhost.
pub type Result<T> = std::result::Result<T, DdnsError>;

/// DDNS error types.
#[derive(Error, Debug)]
pub enum DdnsError {
    /// Configuration error (missing file, missing credentials, bad values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/HTTP transport error.
    #[error("Network error: {0}")]
    Transport(String),

    /// The remote answered with a non-success HTTP status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The remote answered, but not with what we expected.
    #[error("Invalid response: {0}")]
    Protocol(String),

    /// No DynHost record matches the target.
    #[error("No DynHost record found for {subdomain:?} in zone {zone}")]
    RecordNotFound { zone: String, subdomain: String },

    /// More than one DynHost record matches the target.
    #[error("{count} DynHost records found for {subdomain:?} in zone {zone}")]
    AmbiguousRecord {
        zone: String,
        subdomain: String,
        count: usize,
    },

    /// The IP echo service returned something that is not an IPv4 address.
    #[error("Invalid IPv4 address: {0:?}")]
    InvalidIp(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse failure classes callers and tests can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Protocol,
    Cardinality,
    Validation,
    Config,
}

impl DdnsError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DdnsError::Transport(_) | DdnsError::Api { .. } => ErrorKind::Transport,
            DdnsError::Protocol(_) => ErrorKind::Protocol,
            DdnsError::RecordNotFound { .. } | DdnsError::AmbiguousRecord { .. } => {
                ErrorKind::Cardinality
            }
            DdnsError::InvalidIp(_) => ErrorKind::Validation,
            DdnsError::Config(_) | DdnsError::Io(_) => ErrorKind::Config,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Transport => "network",
            ErrorKind::Protocol => "invalid response",
            ErrorKind::Cardinality => "record lookup",
            ErrorKind::Validation => "validation",
            ErrorKind::Config => "configuration",
        };
        f.write_str(name)
    }
}

impl From<reqwest::Error> for DdnsError {
    fn from(e: reqwest::Error) -> Self {
        DdnsError::Transport(e.to_string())
    }
}

impl From<toml::de::Error> for DdnsError {
    fn from(e: toml::de::Error) -> Self {
        DdnsError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for DdnsError {
    fn from(e: serde_json::Error) -> Self {
        DdnsError::Protocol(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            DdnsError::Api {
                status: 403,
                message: "This call has not been granted".to_string()
            }
            .kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            DdnsError::AmbiguousRecord {
                zone: "example.com".to_string(),
                subdomain: "home".to_string(),
                count: 2
            }
            .kind(),
            ErrorKind::Cardinality
        );
        assert_eq!(
            DdnsError::InvalidIp("nope".to_string()).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_json_error_is_protocol() {
        let err: DdnsError = serde_json::from_str::<Vec<u64>>("{").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
