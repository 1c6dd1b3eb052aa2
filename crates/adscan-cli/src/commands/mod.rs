//! Command implementations.

pub mod accounts;
pub mod user;

pub use accounts::run_new_accounts;
pub use user::run_user;

use std::sync::Arc;

use adscan_ldap::{AcceptPresentCertificate, DirectoryClient, DirectorySearcher, Ldap3Backend};

use crate::config::Settings;

/// Builds a directory client from validated settings.
///
/// Certificates that fail platform validation are accepted when present,
/// unless `ForceSSL` is set.
pub fn directory_client(settings: &Settings) -> crate::CliResult<DirectoryClient<Ldap3Backend>> {
    let searcher = DirectorySearcher::new(settings.search.clone())?;
    Ok(DirectoryClient::new(
        Ldap3Backend::new(),
        settings.connection.clone(),
        Arc::new(AcceptPresentCertificate),
        searcher,
    ))
}
