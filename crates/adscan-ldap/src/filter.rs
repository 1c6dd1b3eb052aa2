//! Search filter construction.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DirectoryError, DirectoryResult};

/// Generalized-time layout used for `whenCreated` comparisons.
const GENERALIZED_TIME: &str = "%Y%m%d%H%M%S.0Z";

/// An LDAP filter string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchFilter(String);

impl SearchFilter {
    /// Wraps a filter string verbatim.
    #[must_use]
    pub fn from_raw(filter: impl Into<String>) -> Self {
        Self(filter.into())
    }

    /// Returns the filter text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SearchFilter {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Predicates making up the account-creation filter.
///
/// The shape of the filter is fixed: object category, each object class,
/// a negated machine class, a mail address with an `@`, a negated mail
/// suffix, and the creation-time lower bound, all ANDed. Only the values
/// are configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterTemplate {
    /// Value for `objectCategory`.
    pub object_category: String,

    /// Values for `objectClass`, all required.
    pub object_classes: Vec<String>,

    /// `objectClass` value that disqualifies an entry.
    pub excluded_object_class: String,

    /// Mail domain suffix that disqualifies an entry.
    pub excluded_mail_suffix: String,
}

impl Default for FilterTemplate {
    fn default() -> Self {
        Self {
            object_category: "User".to_string(),
            object_classes: vec!["User".to_string(), "Person".to_string()],
            excluded_object_class: "Computer".to_string(),
            excluded_mail_suffix: "ersa.edu.au".to_string(),
        }
    }
}

impl FilterTemplate {
    /// Checks that every predicate has a value.
    ///
    /// ## Errors
    ///
    /// Returns [`DirectoryError::Config`] naming the first empty value.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.object_category.trim().is_empty() {
            return Err(DirectoryError::config("object category cannot be empty"));
        }
        if self.object_classes.is_empty() || self.object_classes.iter().any(|c| c.trim().is_empty())
        {
            return Err(DirectoryError::config("object classes cannot be empty"));
        }
        if self.excluded_object_class.trim().is_empty() {
            return Err(DirectoryError::config("excluded object class cannot be empty"));
        }
        if self.excluded_mail_suffix.trim().is_empty() {
            return Err(DirectoryError::config("excluded mail suffix cannot be empty"));
        }
        Ok(())
    }

    /// Builds the filter matching user accounts created at or after `cutoff`.
    #[must_use]
    pub fn creation_filter(&self, cutoff: DateTime<Utc>) -> SearchFilter {
        let mut filter = String::from("(&");
        filter.push_str(&format!("(objectCategory={})", ldap_escape(&self.object_category)));
        for class in &self.object_classes {
            filter.push_str(&format!("(objectClass={})", ldap_escape(class)));
        }
        filter.push_str(&format!(
            "(!(objectClass={}))",
            ldap_escape(&self.excluded_object_class)
        ));
        filter.push_str("(mail=*@*)");
        filter.push_str(&format!(
            "(!(mail=*{}))",
            ldap_escape(&self.excluded_mail_suffix)
        ));
        filter.push_str(&format!("(whenCreated>={})", format_generalized_time(cutoff)));
        filter.push(')');
        SearchFilter(filter)
    }

    /// Builds an equality filter on a numeric identifier attribute.
    #[must_use]
    pub fn identity_filter(&self, attribute: &str, value: u32) -> SearchFilter {
        SearchFilter(format!(
            "(&(objectCategory={})({}={value}))",
            ldap_escape(&self.object_category),
            attribute
        ))
    }
}

/// Builds the account-creation filter with the default predicates.
#[must_use]
pub fn build_creation_filter(cutoff: DateTime<Utc>) -> SearchFilter {
    FilterTemplate::default().creation_filter(cutoff)
}

/// Formats an instant as `YYYYMMDDHHMMSS.0Z`, dropping sub-second precision.
#[must_use]
pub fn format_generalized_time(instant: DateTime<Utc>) -> String {
    instant.format(GENERALIZED_TIME).to_string()
}

/// Parses an LDAP generalized-time value such as `20170101000000.0Z`.
///
/// ## Errors
///
/// Returns [`DirectoryError::Config`] if the value is not UTC generalized time.
pub fn parse_generalized_time(value: &str) -> DirectoryResult<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y%m%d%H%M%S%.fZ")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y%m%d%H%M%SZ"))
        .map_err(|e| DirectoryError::config(format!("invalid generalized time '{value}': {e}")))?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Checks that `name` is an attribute descriptor: a letter followed by
/// letters, digits or hyphens, or a numeric OID.
#[must_use]
pub fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
        }
        Some(first) if first.is_ascii_digit() => {
            name.split('.')
                .all(|arc| !arc.is_empty() && arc.bytes().all(|b| b.is_ascii_digit()))
        }
        _ => false,
    }
}

/// Escapes special characters in LDAP filter values (RFC 4515).
#[must_use]
pub fn ldap_escape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\5c"),
            '*' => result.push_str("\\2a"),
            '(' => result.push_str("\\28"),
            ')' => result.push_str("\\29"),
            '\0' => result.push_str("\\00"),
            _ => result.push(c),
        }
    }
    result
}
