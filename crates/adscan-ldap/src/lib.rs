//! # adscan-ldap
//!
//! Lists Active Directory user accounts created after a cutoff date.
//!
//! The crate opens an LDAP session (optionally LDAPS with a certificate
//! trust override), binds, runs one paged subtree search and turns the
//! result stream into [`ResultRecord`]s. Bad positions in the stream are
//! skipped and reported, never fatal.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use adscan_ldap::{
//!     AcceptPresentCertificate, ConnectionConfig, DirectoryClient, DirectorySearcher,
//!     Ldap3Backend, SearchSettings,
//! };
//! use chrono::{TimeZone, Utc};
//!
//! # async fn run() -> adscan_ldap::DirectoryResult<()> {
//! let config = ConnectionConfig::builder()
//!     .host("ad.example.org")
//!     .use_tls(true)
//!     .bind_dn("CN=svc-reader,OU=Service,DC=example,DC=org")
//!     .password("secret")
//!     .build()?;
//! let searcher = DirectorySearcher::new(SearchSettings::default())?;
//! let client = DirectoryClient::new(
//!     Ldap3Backend::new(),
//!     config,
//!     Arc::new(AcceptPresentCertificate),
//!     searcher,
//! );
//!
//! let cutoff = Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap();
//! let outcome = client.find_new_accounts(cutoff, None).await?;
//! println!("Total number of new account = {}", outcome.count());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod client;
pub mod config;
pub mod connection;
pub mod entry;
pub mod error;
pub mod filter;
pub mod record;
pub mod search;
pub mod transport;
pub mod trust;

pub use backend::{DirectoryBackend, DirectorySession, EntryStream, SearchRequest};
pub use client::DirectoryClient;
pub use config::{ConnectionConfig, ConnectionConfigBuilder, SearchSettings};
pub use connection::{ConnectionState, DirectoryConnection};
pub use entry::{DirectoryEntryRaw, EntryStep};
pub use error::{ConnectErrorKind, DirectoryError, DirectoryResult};
pub use filter::{build_creation_filter, FilterTemplate, SearchFilter};
pub use record::{EntryIssue, ResultRecord, SearchOutcome};
pub use search::DirectorySearcher;
pub use transport::Ldap3Backend;
pub use trust::{AcceptPresentCertificate, CertificateTrustPolicy, RejectAll};
