//! Raw directory entries as produced by a result stream.

use std::collections::HashMap;

use ldap3::SearchEntry;

/// One entry returned by the directory, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntryRaw {
    /// Distinguished Name.
    pub dn: String,

    /// Text attributes (all values are multi-valued).
    pub attributes: HashMap<String, Vec<String>>,

    /// Binary attributes.
    pub binary_attributes: HashMap<String, Vec<Vec<u8>>>,
}

impl DirectoryEntryRaw {
    /// Creates an entry with no attributes.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            ..Self::default()
        }
    }

    /// Adds a text value.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Adds a binary value.
    #[must_use]
    pub fn with_binary_attr(mut self, name: impl Into<String>, value: Vec<u8>) -> Self {
        self.binary_attributes
            .entry(name.into())
            .or_default()
            .push(value);
        self
    }

    /// Creates an entry from an ldap3 search entry.
    #[must_use]
    pub fn from_search_entry(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry.attrs,
            binary_attributes: entry.bin_attrs,
        }
    }

    /// Gets the first value of a text attribute, matching the name
    /// case-insensitively.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, values)| values)
            })
            .and_then(|v| v.first())
            .map(String::as_str)
    }
}

/// Outcome of advancing a result stream by one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStep {
    /// A decoded entry.
    Entry(DirectoryEntryRaw),

    /// A continuation reference to another server.
    Referral(Vec<String>),

    /// The position could not be decoded or the server reported an error.
    ProtocolError(String),

    /// The server ended the search with a failure result code.
    SearchFailed {
        /// LDAP result code.
        rc: u32,
        /// Diagnostic text.
        message: String,
    },
}

/// Formats a binary GUID in the braced Active Directory form.
#[must_use]
pub fn format_guid(bytes: &[u8]) -> String {
    if bytes.len() != 16 {
        return hex::encode(bytes);
    }

    // Data1..Data3 are little-endian
    format!(
        "{{{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{}}}",
        bytes[3],
        bytes[2],
        bytes[1],
        bytes[0],
        bytes[5],
        bytes[4],
        bytes[7],
        bytes[6],
        bytes[8],
        bytes[9],
        hex::encode(&bytes[10..16])
    )
}
