//! Directory session lifecycle.
//!
//! A [`DirectoryConnection`] moves through
//! `Unconnected -> Connected -> Bound -> Closed`. A failed open goes straight
//! to `Closed`. [`close`](DirectoryConnection::close) may be called any number
//! of times, from any state.

use std::fmt;
use std::sync::Arc;

use crate::backend::{DirectoryBackend, DirectorySession, SearchRequest};
use crate::config::ConnectionConfig;
use crate::error::{ConnectErrorKind, DirectoryError, DirectoryResult};
use crate::trust::CertificateTrustPolicy;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not opened yet.
    Unconnected,
    /// Transport established, not authenticated.
    Connected,
    /// Authenticated.
    Bound,
    /// Released. Terminal.
    Closed,
}

impl ConnectionState {
    /// Lower-case name used in errors.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unconnected => "unconnected",
            Self::Connected => "connected",
            Self::Bound => "bound",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One directory session.
pub struct DirectoryConnection<B: DirectoryBackend> {
    backend: B,
    config: ConnectionConfig,
    trust_policy: Arc<dyn CertificateTrustPolicy>,
    session: Option<B::Session>,
    state: ConnectionState,
    bypass_installed: bool,
}

impl<B: DirectoryBackend> DirectoryConnection<B> {
    /// Creates an unconnected session.
    ///
    /// `trust_policy` is only consulted when TLS is enabled, the platform
    /// trust store rejected the server certificate, and `force_tls` is off.
    pub fn new(
        backend: B,
        config: ConnectionConfig,
        trust_policy: Arc<dyn CertificateTrustPolicy>,
    ) -> Self {
        Self {
            backend,
            config,
            trust_policy,
            session: None,
            state: ConnectionState::Unconnected,
            bypass_installed: false,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the session was established through the trust policy.
    #[must_use]
    pub const fn bypass_installed(&self) -> bool {
        self.bypass_installed
    }

    /// Configuration this session was created with.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Establishes the transport.
    ///
    /// ## Errors
    ///
    /// - [`ConnectErrorKind::CertificateRejected`] if validation failed and
    ///   `force_tls` is set, or the retry through the trust policy failed
    ///   validation as well.
    /// - [`ConnectErrorKind::Network`] for any other failure. Not retried.
    ///
    /// The connection is `Closed` after any error.
    pub async fn open(&mut self) -> DirectoryResult<()> {
        self.expect_state(ConnectionState::Unconnected)?;

        let target = self.config.target();
        tracing::debug!(server = %target, tls = self.config.use_tls(), "Opening directory connection");

        let first = self.backend.connect(&self.config, None).await;
        let result = match first {
            Err(err) if self.should_retry_with_bypass(&err) => {
                tracing::warn!(
                    server = %target,
                    policy = self.trust_policy.name(),
                    error = %err,
                    "Certificate validation failed, retrying with trust policy"
                );
                self.bypass_installed = true;
                self.backend
                    .connect(&self.config, Some(Arc::clone(&self.trust_policy)))
                    .await
            }
            other => other,
        };

        match result {
            Ok(session) => {
                self.session = Some(session);
                self.state = ConnectionState::Connected;
                tracing::info!(server = %target, "Connected to directory");
                Ok(())
            }
            Err(err) => {
                self.state = ConnectionState::Closed;
                Err(self.normalize_connect_error(err))
            }
        }
    }

    fn should_retry_with_bypass(&self, err: &DirectoryError) -> bool {
        self.config.use_tls()
            && !self.config.force_tls()
            && err.connect_kind() == Some(ConnectErrorKind::CertificateRejected)
    }

    /// Certificate failures only exist on TLS sessions.
    fn normalize_connect_error(&self, err: DirectoryError) -> DirectoryError {
        match err {
            DirectoryError::Connect {
                kind: ConnectErrorKind::CertificateRejected,
                target,
                message,
            } if !self.config.use_tls() => DirectoryError::network(target, message),
            other => other,
        }
    }

    /// Authenticates with the configured bind DN and password.
    ///
    /// ## Errors
    ///
    /// Returns [`DirectoryError::InvalidState`] unless the connection is
    /// `Connected`, or [`DirectoryError::Bind`] if the directory rejects the
    /// credentials. Not retried.
    pub async fn bind(&mut self) -> DirectoryResult<()> {
        let dn = self.config.bind_dn().to_string();
        let password = self.config.password().to_string();
        self.bind_as(&dn, &password).await
    }

    /// Authenticates with explicit credentials.
    ///
    /// ## Errors
    ///
    /// See [`bind`](Self::bind).
    pub async fn bind_as(&mut self, dn: &str, password: &str) -> DirectoryResult<()> {
        self.expect_state(ConnectionState::Connected)?;
        let session = self.session_mut()?;
        session.bind(dn, password).await?;
        self.state = ConnectionState::Bound;
        tracing::debug!(bind_dn = %dn, "Bound to directory");
        Ok(())
    }

    /// Starts a search on a bound connection.
    ///
    /// ## Errors
    ///
    /// Returns [`DirectoryError::InvalidState`] unless the connection is
    /// `Bound`, or [`DirectoryError::Search`] if the request is refused.
    pub async fn search(
        &mut self,
        request: &SearchRequest,
    ) -> DirectoryResult<<B::Session as DirectorySession>::Entries> {
        self.expect_state(ConnectionState::Bound)?;
        tracing::debug!(base = %request.base_dn, filter = %request.filter, "Starting search");
        self.session_mut()?.search(request).await
    }

    /// Releases the session. Never fails; safe to call repeatedly.
    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.unbind().await {
                tracing::warn!(error = %e, "Unbind failed");
            }
            tracing::debug!(server = %self.config.target(), "Directory connection closed");
        }
        self.state = ConnectionState::Closed;
    }

    fn session_mut(&mut self) -> DirectoryResult<&mut B::Session> {
        let found = self.state.as_str();
        self.session.as_mut().ok_or(DirectoryError::InvalidState {
            expected: "open session",
            found,
        })
    }

    fn expect_state(&self, expected: ConnectionState) -> DirectoryResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(DirectoryError::InvalidState {
                expected: expected.as_str(),
                found: self.state.as_str(),
            })
        }
    }
}

impl<B: DirectoryBackend> Drop for DirectoryConnection<B> {
    fn drop(&mut self) {
        if self.session.take().is_some() {
            tracing::warn!(
                server = %self.config.target(),
                "Directory connection dropped without close, releasing transport"
            );
        }
    }
}

impl<B: DirectoryBackend> fmt::Debug for DirectoryConnection<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConnection")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("trust_policy", &self.trust_policy.name())
            .field("bypass_installed", &self.bypass_installed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_names() {
        assert_eq!(ConnectionState::Unconnected.to_string(), "unconnected");
        assert_eq!(ConnectionState::Bound.as_str(), "bound");
        assert_eq!(ConnectionState::Closed.as_str(), "closed");
    }
}
