//! Scoped open/bind/search/close sequences.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::backend::DirectoryBackend;
use crate::config::ConnectionConfig;
use crate::connection::DirectoryConnection;
use crate::error::DirectoryResult;
use crate::record::{ResultRecord, SearchOutcome};
use crate::search::DirectorySearcher;
use crate::trust::CertificateTrustPolicy;

/// Runs each operation on a fresh session and always closes it.
pub struct DirectoryClient<B> {
    backend: B,
    config: ConnectionConfig,
    trust_policy: Arc<dyn CertificateTrustPolicy>,
    searcher: DirectorySearcher,
}

impl<B: DirectoryBackend + Clone> DirectoryClient<B> {
    /// Creates a client.
    pub fn new(
        backend: B,
        config: ConnectionConfig,
        trust_policy: Arc<dyn CertificateTrustPolicy>,
        searcher: DirectorySearcher,
    ) -> Self {
        Self {
            backend,
            config,
            trust_policy,
            searcher,
        }
    }

    /// Returns the searcher.
    #[must_use]
    pub fn searcher(&self) -> &DirectorySearcher {
        &self.searcher
    }

    /// Opens, binds, lists accounts created since `cutoff`, and closes.
    ///
    /// ## Errors
    ///
    /// Any connect, bind or search error. The session is closed first.
    pub async fn find_new_accounts(
        &self,
        cutoff: DateTime<Utc>,
        wanted_attributes: Option<&[String]>,
    ) -> DirectoryResult<SearchOutcome> {
        let mut conn = self.connection();
        let result = match Self::open_and_bind(&mut conn).await {
            Ok(()) => {
                self.searcher
                    .search(&mut conn, cutoff, wanted_attributes)
                    .await
            }
            Err(e) => Err(e),
        };
        conn.close().await;
        result
    }

    /// Opens, binds, looks up one account by numeric identifier, and closes.
    ///
    /// ## Errors
    ///
    /// Any connect, bind or search error, or
    /// [`DirectoryError::AmbiguousIdentifier`](crate::DirectoryError::AmbiguousIdentifier).
    /// The session is closed first.
    pub async fn get_user(
        &self,
        uid_number: u32,
        include_all_attributes: bool,
    ) -> DirectoryResult<Option<ResultRecord>> {
        let mut conn = self.connection();
        let result = match Self::open_and_bind(&mut conn).await {
            Ok(()) => {
                self.searcher
                    .get_user(&mut conn, uid_number, include_all_attributes)
                    .await
            }
            Err(e) => Err(e),
        };
        conn.close().await;
        result
    }

    fn connection(&self) -> DirectoryConnection<B> {
        DirectoryConnection::new(
            self.backend.clone(),
            self.config.clone(),
            Arc::clone(&self.trust_policy),
        )
    }

    async fn open_and_bind(conn: &mut DirectoryConnection<B>) -> DirectoryResult<()> {
        conn.open().await?;
        conn.bind().await
    }
}
