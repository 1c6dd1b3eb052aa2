//! Directory error types.
//!
//! ## Security Note
//!
//! Error messages must not leak sensitive information like
//! passwords or bind credentials.

use std::fmt;

use thiserror::Error;

/// Why a connection attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectErrorKind {
    /// DNS failure, refused connection, connect timeout.
    Network,

    /// The server certificate did not pass validation.
    CertificateRejected,
}

impl fmt::Display for ConnectErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => f.write_str("network failure"),
            Self::CertificateRejected => f.write_str("certificate rejected"),
        }
    }
}

/// Fatal directory errors.
///
/// Problems with individual search entries are not errors; they are
/// collected as [`EntryIssue`](crate::record::EntryIssue)s on the outcome.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Missing or malformed configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Could not establish the transport session.
    #[error("connection to {target} failed ({kind}): {message}")]
    Connect {
        /// Failure category.
        kind: ConnectErrorKind,
        /// `host:port` of the server.
        target: String,
        /// Underlying failure.
        message: String,
    },

    /// The directory rejected the bind.
    #[error("bind failed (rc={rc}): {message}")]
    Bind {
        /// LDAP result code, 0 when the failure happened below the protocol.
        rc: u32,
        /// Diagnostic text.
        message: String,
    },

    /// The search could not be started.
    #[error("search failed: {0}")]
    Search(String),

    /// Operation attempted in the wrong connection state.
    #[error("invalid connection state: expected {expected}, found {found}")]
    InvalidState {
        /// State required by the operation.
        expected: &'static str,
        /// State the connection was in.
        found: &'static str,
    },

    /// More than one entry carries the same numeric identifier.
    #[error("uidNumber {uid_number} is not unique: {count} entries matched")]
    AmbiguousIdentifier {
        /// Identifier looked up.
        uid_number: u32,
        /// Number of matching entries.
        count: usize,
    },

    /// Search deadline exceeded.
    #[error("search timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl DirectoryError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a network-level connection error.
    #[must_use]
    pub fn network(target: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Connect {
            kind: ConnectErrorKind::Network,
            target: target.into(),
            message: msg.into(),
        }
    }

    /// Creates a certificate rejection error.
    #[must_use]
    pub fn certificate(target: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Connect {
            kind: ConnectErrorKind::CertificateRejected,
            target: target.into(),
            message: msg.into(),
        }
    }

    /// Creates a search error.
    #[must_use]
    pub fn search(msg: impl Into<String>) -> Self {
        Self::Search(msg.into())
    }

    /// Checks if this is a connection-related error.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Timeout(_))
    }

    /// Checks if the bind failed because of bad credentials (result code 49).
    #[must_use]
    pub const fn is_invalid_credentials(&self) -> bool {
        matches!(self, Self::Bind { rc: 49, .. })
    }

    /// Returns the connect failure kind, if this is a connect error.
    #[must_use]
    pub const fn connect_kind(&self) -> Option<ConnectErrorKind> {
        match self {
            Self::Connect { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;
