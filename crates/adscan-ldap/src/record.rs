//! Normalized search results.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entry::{format_guid, DirectoryEntryRaw};

/// Separator placed between the values of a multi-valued attribute.
pub const VALUE_SEPARATOR: &str = "; ";

/// One matched directory entry, flattened to string values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Distinguished Name.
    pub dn: String,

    /// Attribute name to value.
    pub attributes: BTreeMap<String, String>,
}

impl ResultRecord {
    /// Flattens a raw entry.
    ///
    /// Multi-valued attributes are joined with [`VALUE_SEPARATOR`]. Binary
    /// values are hex encoded, except `objectGUID` which uses the usual
    /// GUID layout.
    #[must_use]
    pub fn from_entry(entry: DirectoryEntryRaw) -> Self {
        let mut attributes: BTreeMap<String, String> = entry
            .attributes
            .into_iter()
            .map(|(name, values)| (name, values.join(VALUE_SEPARATOR)))
            .collect();

        for (name, values) in entry.binary_attributes {
            let is_guid = name.eq_ignore_ascii_case("objectGUID");
            let rendered: Vec<String> = values
                .iter()
                .map(|v| if is_guid { format_guid(v) } else { hex::encode(v) })
                .collect();
            attributes.insert(name, rendered.join(VALUE_SEPARATOR));
        }

        Self {
            dn: entry.dn,
            attributes,
        }
    }

    /// Gets an attribute value, matching the name case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
    }
}

/// A problem with a single position in the result stream.
///
/// Issues never abort a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryIssue {
    /// The server pointed elsewhere for part of the subtree.
    Referral {
        /// Referral URLs.
        urls: Vec<String>,
    },

    /// The entry could not be read.
    Protocol {
        /// Diagnostic text.
        message: String,
    },

    /// The entry was read but is not a qualified account.
    Rejected {
        /// Entry DN.
        dn: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl fmt::Display for EntryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Referral { urls } if urls.is_empty() => f.write_str("referral skipped"),
            Self::Referral { urls } => write!(f, "referral skipped: {}", urls.join(", ")),
            Self::Protocol { message } => write!(f, "entry skipped: {message}"),
            Self::Rejected { dn, reason } => write!(f, "{dn} is not a qualified account: {reason}"),
        }
    }
}

/// Records and issues collected by one search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Records in the order the directory returned them.
    pub records: Vec<ResultRecord>,

    /// Issues in the order they were met.
    pub issues: Vec<EntryIssue>,
}

impl SearchOutcome {
    /// Creates an empty outcome.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records. Always equal to `records.len()`.
    #[must_use]
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Appends a record.
    pub fn push_record(&mut self, record: ResultRecord) {
        self.records.push(record);
    }

    /// Records an issue.
    pub fn record_issue(&mut self, issue: EntryIssue) {
        self.issues.push(issue);
    }

    /// Returns true if any position was skipped or rejected.
    #[must_use]
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Number of referrals skipped.
    #[must_use]
    pub fn referral_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| matches!(i, EntryIssue::Referral { .. }))
            .count()
    }

    /// Number of unreadable positions skipped.
    #[must_use]
    pub fn protocol_error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| matches!(i, EntryIssue::Protocol { .. }))
            .count()
    }

    /// Number of entries rejected as unqualified.
    #[must_use]
    pub fn rejected_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| matches!(i, EntryIssue::Rejected { .. }))
            .count()
    }

    /// One-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} records, {} referrals skipped, {} errors skipped, {} rejected",
            self.count(),
            self.referral_count(),
            self.protocol_error_count(),
            self.rejected_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_multi_values() {
        let entry = DirectoryEntryRaw::new("CN=Alice,DC=example,DC=org")
            .with_attr("mail", "alice@example.com")
            .with_attr("memberOf", "CN=Staff")
            .with_attr("memberOf", "CN=VPN");

        let record = ResultRecord::from_entry(entry);
        assert_eq!(record.dn, "CN=Alice,DC=example,DC=org");
        assert_eq!(record.get("mail"), Some("alice@example.com"));
        assert_eq!(record.get("memberOf"), Some("CN=Staff; CN=VPN"));
        assert_eq!(record.get("MEMBEROF"), Some("CN=Staff; CN=VPN"));
    }

    #[test]
    fn renders_binary_values() {
        let guid = vec![
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E,
            0x0F, 0x10,
        ];
        let entry = DirectoryEntryRaw::new("CN=Alice")
            .with_binary_attr("objectGUID", guid)
            .with_binary_attr("objectSid", vec![0x01, 0x05, 0xff]);

        let record = ResultRecord::from_entry(entry);
        assert_eq!(
            record.get("objectGUID"),
            Some("{04030201-0605-0807-090a-0b0c0d0e0f10}")
        );
        assert_eq!(record.get("objectSid"), Some("0105ff"));
    }

    #[test]
    fn count_is_derived_from_records() {
        let mut outcome = SearchOutcome::new();
        outcome.record_issue(EntryIssue::Referral {
            urls: vec!["ldap://dc2/DC=example".into()],
        });
        outcome.push_record(ResultRecord::from_entry(DirectoryEntryRaw::new("CN=A")));
        outcome.record_issue(EntryIssue::Rejected {
            dn: "CN=B".into(),
            reason: "missing uidNumber".into(),
        });

        assert_eq!(outcome.count(), outcome.records.len());
        assert_eq!(outcome.count(), 1);
        assert_eq!(outcome.referral_count(), 1);
        assert_eq!(outcome.rejected_count(), 1);
        assert_eq!(outcome.protocol_error_count(), 0);
        assert!(outcome.has_issues());
        assert_eq!(
            outcome.summary(),
            "1 records, 1 referrals skipped, 0 errors skipped, 1 rejected"
        );
    }

    #[test]
    fn issue_messages() {
        let rejected = EntryIssue::Rejected {
            dn: "CN=svc-backup".into(),
            reason: "missing uidNumber".into(),
        };
        assert_eq!(
            rejected.to_string(),
            "CN=svc-backup is not a qualified account: missing uidNumber"
        );
        assert_eq!(
            EntryIssue::Referral { urls: Vec::new() }.to_string(),
            "referral skipped"
        );
    }

    #[test]
    fn issues_serialize_with_kind_tag() {
        let issue = EntryIssue::Protocol {
            message: "decoding error".into(),
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["kind"], "protocol");
        assert_eq!(json["message"], "decoding error");
    }
}
