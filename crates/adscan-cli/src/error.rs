//! CLI error types.

use adscan_ldap::{ConnectErrorKind, DirectoryError};
use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Directory error.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Resource not found.
    #[error("{resource_type} not found: {id}")]
    NotFound {
        /// Type of resource.
        resource_type: String,
        /// Resource identifier.
        id: String,
    },

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Directory(DirectoryError::Config(_)) => 2,
            _ => 1,
        }
    }

    /// Settings to check after a failure, if any apply.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        let Self::Directory(err) = self else {
            return None;
        };
        if err.is_invalid_credentials() {
            Some("check LoginDN and Password")
        } else if err.connect_kind() == Some(ConnectErrorKind::CertificateRejected) {
            Some("the server certificate was rejected; the bypass is only tried when ForceSSL is false")
        } else if err.is_connection_error() {
            Some("check Host, Port, UseSSL and TimeoutSeconds")
        } else {
            None
        }
    }
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
