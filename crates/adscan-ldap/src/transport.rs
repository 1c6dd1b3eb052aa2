//! `ldap3` implementation of the transport traits.

use std::error::Error as StdError;
use std::sync::Arc;

use ldap3::adapters::{Adapter, PagedResults};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapResult, Scope, SearchEntry};
use tokio::sync::mpsc;

use crate::backend::{DirectoryBackend, DirectorySession, EntryStream, SearchRequest};
use crate::config::ConnectionConfig;
use crate::entry::{DirectoryEntryRaw, EntryStep};
use crate::error::{DirectoryError, DirectoryResult};
use crate::trust::{client_config, CertificateTrustPolicy};

/// Result code for invalid credentials.
const RC_INVALID_CREDENTIALS: u32 = 49;

/// Result code carried by a search done message that only holds referrals.
const RC_REFERRAL: u32 = 10;

/// Result code of a search truncated by the server time limit.
const RC_TIME_LIMIT: u32 = 3;

/// Result code of a search truncated by the server size limit.
const RC_SIZE_LIMIT: u32 = 4;

/// Result positions buffered ahead of the consumer.
const CHANNEL_CAPACITY: usize = 64;

/// Backend speaking LDAP v3 through `ldap3`.
#[derive(Debug, Clone, Default)]
pub struct Ldap3Backend;

impl Ldap3Backend {
    /// Creates a backend.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DirectoryBackend for Ldap3Backend {
    type Session = Ldap3Session;

    async fn connect(
        &self,
        config: &ConnectionConfig,
        trust: Option<Arc<dyn CertificateTrustPolicy>>,
    ) -> DirectoryResult<Ldap3Session> {
        let mut settings = LdapConnSettings::new().set_conn_timeout(config.timeout());
        if let Some(policy) = trust {
            settings = settings.set_config(client_config(policy));
        }

        let target = config.target();
        let (conn, ldap) = LdapConnAsync::with_settings(settings, &config.url())
            .await
            .map_err(|e| {
                if is_certificate_failure(&e) {
                    DirectoryError::certificate(target.clone(), e.to_string())
                } else {
                    DirectoryError::network(target.clone(), e.to_string())
                }
            })?;

        // Spawn connection driver
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!("LDAP connection driver error: {}", e);
            }
        });

        Ok(Ldap3Session { ldap, target })
    }
}

/// Checks whether a connect error came from certificate validation.
fn is_certificate_failure(err: &ldap3::LdapError) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(tls) = e.downcast_ref::<rustls::Error>() {
            return is_certificate_error(tls);
        }
        if let Some(tls) = e
            .downcast_ref::<std::io::Error>()
            .and_then(std::io::Error::get_ref)
            .and_then(|inner| inner.downcast_ref::<rustls::Error>())
        {
            return is_certificate_error(tls);
        }
        current = e.source();
    }
    err.to_string().to_ascii_lowercase().contains("certificate")
}

fn is_certificate_error(err: &rustls::Error) -> bool {
    matches!(
        err,
        rustls::Error::InvalidCertificate(_) | rustls::Error::NoCertificatesPresented
    )
}

/// A bound or unbound `ldap3` session.
pub struct Ldap3Session {
    ldap: Ldap,
    target: String,
}

impl std::fmt::Debug for Ldap3Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ldap3Session")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl DirectorySession for Ldap3Session {
    type Entries = ChannelEntries;

    async fn bind(&mut self, dn: &str, password: &str) -> DirectoryResult<()> {
        let result = self
            .ldap
            .simple_bind(dn, password)
            .await
            .map_err(|e| DirectoryError::Bind {
                rc: 0,
                message: e.to_string(),
            })?;

        if result.rc == 0 {
            return Ok(());
        }
        let message = if result.rc == RC_INVALID_CREDENTIALS {
            format!("invalid credentials: {}", result.text)
        } else {
            describe(&result)
        };
        Err(DirectoryError::Bind {
            rc: result.rc,
            message,
        })
    }

    async fn search(&mut self, request: &SearchRequest) -> DirectoryResult<ChannelEntries> {
        let page_size = i32::try_from(request.page_size)
            .map_err(|_| DirectoryError::search("page size out of range"))?;
        let adapters: Vec<Box<dyn Adapter<'static, String, Vec<String>>>> =
            vec![Box::new(PagedResults::new(page_size))];
        let attributes = if request.attributes.is_empty() {
            vec!["*".to_string()]
        } else {
            request.attributes.clone()
        };

        let mut ldap = self.ldap.clone();
        let mut stream = ldap
            .streaming_search_with(
                adapters,
                &request.base_dn,
                Scope::Subtree,
                request.filter.as_str(),
                attributes,
            )
            .await
            .map_err(|e| DirectoryError::search(e.to_string()))?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(async move {
            loop {
                let step = match stream.next().await {
                    Ok(Some(entry)) if entry.is_ref() => {
                        EntryStep::Referral(ldap3::parse_refs(entry.0))
                    }
                    Ok(Some(entry)) if entry.is_intermediate() => continue,
                    Ok(Some(entry)) => EntryStep::Entry(DirectoryEntryRaw::from_search_entry(
                        SearchEntry::construct(entry),
                    )),
                    Ok(None) => break,
                    Err(e) => {
                        // The stream cannot be resumed after a read error.
                        tracing::warn!(error = %e, "Search stream failed, ending it");
                        let _ = tx.send(EntryStep::ProtocolError(e.to_string())).await;
                        return;
                    }
                };
                if tx.send(step).await.is_err() {
                    tracing::debug!("Result consumer gone, stopping search stream");
                    return;
                }
            }

            if let Some(step) = trailer(&stream.finish().await) {
                let _ = tx.send(step).await;
            }
        });

        Ok(ChannelEntries { rx })
    }

    async fn unbind(&mut self) -> DirectoryResult<()> {
        self.ldap
            .unbind()
            .await
            .map_err(|e| DirectoryError::network(self.target.clone(), e.to_string()))
    }
}

/// Maps the final search result to a step, if it carries anything.
fn trailer(done: &LdapResult) -> Option<EntryStep> {
    match done.rc {
        0 => None,
        RC_REFERRAL => Some(EntryStep::Referral(done.refs.clone())),
        RC_TIME_LIMIT | RC_SIZE_LIMIT => Some(EntryStep::ProtocolError(describe(done))),
        rc => Some(EntryStep::SearchFailed {
            rc,
            message: describe(done),
        }),
    }
}

fn describe(result: &LdapResult) -> String {
    if result.text.is_empty() {
        format!("result code {}", result.rc)
    } else {
        format!("result code {}: {}", result.rc, result.text)
    }
}

/// Result positions forwarded from the task driving an `ldap3` search stream.
#[derive(Debug)]
pub struct ChannelEntries {
    rx: mpsc::Receiver<EntryStep>,
}

impl EntryStream for ChannelEntries {
    async fn next_step(&mut self) -> Option<EntryStep> {
        self.rx.recv().await
    }
}
