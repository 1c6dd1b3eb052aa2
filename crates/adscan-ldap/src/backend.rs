//! Transport abstraction.
//!
//! [`DirectoryConnection`](crate::connection::DirectoryConnection) drives a
//! [`DirectoryBackend`] and never talks to the wire itself. The production
//! backend is [`Ldap3Backend`](crate::transport::Ldap3Backend).

use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::entry::EntryStep;
use crate::error::DirectoryResult;
use crate::filter::SearchFilter;
use crate::trust::CertificateTrustPolicy;

/// Parameters of one subtree search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Search base.
    pub base_dn: String,

    /// Filter.
    pub filter: SearchFilter,

    /// Attributes to return. Empty means all user attributes.
    pub attributes: Vec<String>,

    /// Page size for the paged results control.
    pub page_size: u32,
}

/// Opens transport sessions.
#[allow(async_fn_in_trait)]
pub trait DirectoryBackend {
    /// Session type produced by [`connect`](Self::connect).
    type Session: DirectorySession;

    /// Opens a session to the configured server.
    ///
    /// `trust` is `None` for validation against the platform trust store,
    /// or the policy that replaces it.
    ///
    /// ## Errors
    ///
    /// Returns [`DirectoryError::Connect`](crate::DirectoryError::Connect)
    /// with [`ConnectErrorKind::CertificateRejected`](crate::ConnectErrorKind)
    /// when the server certificate failed validation and
    /// [`ConnectErrorKind::Network`](crate::ConnectErrorKind) otherwise.
    async fn connect(
        &self,
        config: &ConnectionConfig,
        trust: Option<Arc<dyn CertificateTrustPolicy>>,
    ) -> DirectoryResult<Self::Session>;
}

/// A live transport session.
#[allow(async_fn_in_trait)]
pub trait DirectorySession {
    /// Result stream type.
    type Entries: EntryStream;

    /// Performs a simple bind.
    async fn bind(&mut self, dn: &str, password: &str) -> DirectoryResult<()>;

    /// Starts a search and returns its result stream.
    async fn search(&mut self, request: &SearchRequest) -> DirectoryResult<Self::Entries>;

    /// Ends the session.
    async fn unbind(&mut self) -> DirectoryResult<()>;
}

/// Incrementally consumed search results.
#[allow(async_fn_in_trait)]
pub trait EntryStream {
    /// Advances by one position. `None` once the stream is exhausted.
    async fn next_step(&mut self) -> Option<EntryStep>;
}
