//! Account searches.
//!
//! The searcher never aborts on a bad position in the result stream.
//! Referrals, undecodable entries and unqualified accounts become
//! [`EntryIssue`]s and iteration continues, so a caller always receives
//! whatever was collected. Only a search the server refuses before
//! returning anything is an error.

use chrono::{DateTime, Utc};

use crate::backend::{DirectoryBackend, EntryStream, SearchRequest};
use crate::config::SearchSettings;
use crate::connection::DirectoryConnection;
use crate::entry::{DirectoryEntryRaw, EntryStep};
use crate::error::{DirectoryError, DirectoryResult};
use crate::filter::SearchFilter;
use crate::record::{EntryIssue, ResultRecord, SearchOutcome};

/// Runs account searches against a bound [`DirectoryConnection`].
#[derive(Debug, Clone)]
pub struct DirectorySearcher {
    settings: SearchSettings,
}

impl DirectorySearcher {
    /// Creates a searcher.
    ///
    /// ## Errors
    ///
    /// Returns [`DirectoryError::Config`] if the settings are invalid.
    pub fn new(settings: SearchSettings) -> DirectoryResult<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Lists accounts created at or after `cutoff`.
    ///
    /// `wanted_attributes` limits the returned attributes; `None` returns all
    /// user attributes. The required identifier is always requested.
    ///
    /// ## Errors
    ///
    /// Fails if the search cannot be started, the server refuses it before
    /// returning anything, or the configured deadline passes. Problems with
    /// individual entries are reported in the outcome.
    pub async fn search<B: DirectoryBackend>(
        &self,
        conn: &mut DirectoryConnection<B>,
        cutoff: DateTime<Utc>,
        wanted_attributes: Option<&[String]>,
    ) -> DirectoryResult<SearchOutcome> {
        let filter = self.settings.filter.creation_filter(cutoff);
        let attributes = match wanted_attributes {
            Some(names) if !names.is_empty() => self.with_required(names.to_vec()),
            _ => Vec::new(),
        };
        tracing::info!(cutoff = %cutoff, base = %self.settings.base_dn, "Searching for new accounts");
        self.run(conn, self.request(filter, attributes)).await
    }

    /// Fetches the account with the given numeric identifier.
    ///
    /// Returns `Ok(None)` when no entry matches.
    ///
    /// ## Errors
    ///
    /// Returns [`DirectoryError::AmbiguousIdentifier`] when more than one
    /// entry matches, plus the errors of [`search`](Self::search).
    pub async fn get_user<B: DirectoryBackend>(
        &self,
        conn: &mut DirectoryConnection<B>,
        uid_number: u32,
        include_all_attributes: bool,
    ) -> DirectoryResult<Option<ResultRecord>> {
        let filter = self
            .settings
            .filter
            .identity_filter(&self.settings.required_attribute, uid_number);
        let attributes = if include_all_attributes {
            Vec::new()
        } else {
            self.with_required(self.settings.basic_attributes.clone())
        };

        let outcome = self.run(conn, self.request(filter, attributes)).await?;
        match outcome.count() {
            0 => {
                tracing::debug!(uid_number, "No account found");
                Ok(None)
            }
            1 => Ok(outcome.records.into_iter().next()),
            count => Err(DirectoryError::AmbiguousIdentifier { uid_number, count }),
        }
    }

    fn request(&self, filter: SearchFilter, attributes: Vec<String>) -> SearchRequest {
        SearchRequest {
            base_dn: self.settings.base_dn.clone(),
            filter,
            attributes,
            page_size: self.settings.page_size,
        }
    }

    fn with_required(&self, mut attributes: Vec<String>) -> Vec<String> {
        let required = &self.settings.required_attribute;
        if !attributes.iter().any(|a| a.eq_ignore_ascii_case(required)) {
            attributes.push(required.clone());
        }
        attributes
    }

    async fn run<B: DirectoryBackend>(
        &self,
        conn: &mut DirectoryConnection<B>,
        request: SearchRequest,
    ) -> DirectoryResult<SearchOutcome> {
        match self.settings.search_timeout {
            Some(limit) => tokio::time::timeout(limit, self.collect(conn, &request))
                .await
                .map_err(|_| DirectoryError::Timeout(limit))?,
            None => self.collect(conn, &request).await,
        }
    }

    async fn collect<B: DirectoryBackend>(
        &self,
        conn: &mut DirectoryConnection<B>,
        request: &SearchRequest,
    ) -> DirectoryResult<SearchOutcome> {
        let mut entries = conn.search(request).await?;
        let mut outcome = SearchOutcome::new();
        let mut received = 0usize;

        while let Some(step) = entries.next_step().await {
            match step {
                EntryStep::Entry(entry) => {
                    received += 1;
                    match self.qualify(&entry) {
                        Ok(()) => outcome.push_record(ResultRecord::from_entry(entry)),
                        Err(reason) => {
                            tracing::warn!(dn = %entry.dn, %reason, "Not a qualified account");
                            outcome.record_issue(EntryIssue::Rejected {
                                dn: entry.dn,
                                reason,
                            });
                        }
                    }
                }
                EntryStep::Referral(urls) => {
                    received += 1;
                    tracing::debug!(?urls, "Skipping referral");
                    outcome.record_issue(EntryIssue::Referral { urls });
                }
                EntryStep::ProtocolError(message) => {
                    tracing::warn!(error = %message, "Skipping unreadable entry");
                    outcome.record_issue(EntryIssue::Protocol { message });
                }
                EntryStep::SearchFailed { message, .. } if received == 0 => {
                    return Err(DirectoryError::search(format!(
                        "refused by the directory: {message}"
                    )));
                }
                EntryStep::SearchFailed { rc, message } => {
                    tracing::warn!(rc, error = %message, "Search ended with an error");
                    outcome.record_issue(EntryIssue::Protocol { message });
                }
            }
        }

        tracing::info!("Search finished: {}", outcome.summary());
        Ok(outcome)
    }

    /// Checks the required identifier is present and numeric.
    fn qualify(&self, entry: &DirectoryEntryRaw) -> Result<(), String> {
        let attribute = &self.settings.required_attribute;
        match entry.get_attr(attribute) {
            None => Err(format!("missing {attribute}")),
            Some(value) if value.trim().parse::<u64>().is_err() => {
                Err(format!("{attribute} '{value}' is not numeric"))
            }
            Some(_) => Ok(()),
        }
    }
}
