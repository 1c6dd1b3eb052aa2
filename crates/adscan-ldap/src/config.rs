//! Connection and search configuration.
//!
//! [`ConnectionConfig`] is immutable once built. The builder validates
//! everything up front so that a bad value is reported before any network
//! action takes place.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DirectoryError, DirectoryResult};
use crate::filter::{is_attribute_name, FilterTemplate};

/// Default base DN searched for accounts.
pub const DEFAULT_BASE_DN: &str = "DC=ad,DC=ersa,DC=edu,DC=au";

/// Attribute every returned account must carry.
pub const DEFAULT_REQUIRED_ATTRIBUTE: &str = "uidNumber";

// ============================================================================
// Connection
// ============================================================================

/// Settings for one directory session.
#[derive(Clone)]
pub struct ConnectionConfig {
    host: String,
    port: u16,
    use_tls: bool,
    force_tls: bool,
    bind_dn: String,
    password: String,
    timeout: Duration,
}

impl ConnectionConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::new()
    }

    /// Server host name.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Server port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Whether the session starts with TLS (LDAPS).
    #[must_use]
    pub const fn use_tls(&self) -> bool {
        self.use_tls
    }

    /// Whether certificate validation failures are fatal.
    #[must_use]
    pub const fn force_tls(&self) -> bool {
        self.force_tls
    }

    /// DN used for the simple bind.
    #[must_use]
    pub fn bind_dn(&self) -> &str {
        &self.bind_dn
    }

    /// Bind password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Transport connect timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `host:port`, used in log lines and errors.
    #[must_use]
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// LDAP URL for this configuration.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.use_tls { "ldaps" } else { "ldap" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("force_tls", &self.force_tls)
            .field("bind_dn", &self.bind_dn)
            .field("password", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Builder for [`ConnectionConfig`].
#[derive(Debug, Default)]
pub struct ConnectionConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    use_tls: bool,
    force_tls: bool,
    bind_dn: Option<String>,
    password: Option<String>,
    timeout: Duration,
}

impl ConnectionConfigBuilder {
    /// Creates a new builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            ..Default::default()
        }
    }

    /// Sets the server host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the server port. Defaults to 636 with TLS, 389 without.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Enables LDAPS.
    #[must_use]
    pub const fn use_tls(mut self, enabled: bool) -> Self {
        self.use_tls = enabled;
        self
    }

    /// Makes certificate validation failures fatal.
    #[must_use]
    pub const fn force_tls(mut self, enabled: bool) -> Self {
        self.force_tls = enabled;
        self
    }

    /// Sets the bind DN.
    #[must_use]
    pub fn bind_dn(mut self, dn: impl Into<String>) -> Self {
        self.bind_dn = Some(dn.into());
        self
    }

    /// Sets the bind password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// ## Errors
    ///
    /// Returns [`DirectoryError::Config`] if the host, bind DN or password
    /// is missing, the port is zero, or the timeout is zero.
    pub fn build(self) -> DirectoryResult<ConnectionConfig> {
        let host = self
            .host
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| DirectoryError::config("host is required"))?;
        let port = self
            .port
            .unwrap_or(if self.use_tls { 636 } else { 389 });
        if port == 0 {
            return Err(DirectoryError::config("port must be between 1 and 65535"));
        }
        let bind_dn = self
            .bind_dn
            .filter(|dn| !dn.trim().is_empty())
            .ok_or_else(|| DirectoryError::config("bind DN is required"))?;
        let password = self
            .password
            .ok_or_else(|| DirectoryError::config("password is required"))?;
        if self.timeout.is_zero() {
            return Err(DirectoryError::config("timeout must be at least one second"));
        }

        Ok(ConnectionConfig {
            host: host.trim().to_string(),
            port,
            use_tls: self.use_tls,
            force_tls: self.force_tls,
            bind_dn,
            password,
            timeout: self.timeout,
        })
    }
}

// ============================================================================
// Search
// ============================================================================

/// Settings shared by every search the searcher runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Root of the subtree search.
    pub base_dn: String,

    /// Predicates of the account-creation filter.
    pub filter: FilterTemplate,

    /// Attribute an entry must carry, with a numeric value, to be reported.
    pub required_attribute: String,

    /// Attributes returned by a basic user lookup.
    pub basic_attributes: Vec<String>,

    /// Page size for the paged results control.
    pub page_size: u32,

    /// Deadline around a whole search, if any.
    #[serde(default, with = "optional_secs")]
    pub search_timeout: Option<Duration>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_dn: DEFAULT_BASE_DN.to_string(),
            filter: FilterTemplate::default(),
            required_attribute: DEFAULT_REQUIRED_ATTRIBUTE.to_string(),
            basic_attributes: [
                "cn",
                "sAMAccountName",
                "mail",
                "uidNumber",
                "whenCreated",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            page_size: 500,
            search_timeout: None,
        }
    }
}

impl SearchSettings {
    /// Validates the settings.
    ///
    /// ## Errors
    ///
    /// Returns [`DirectoryError::Config`] for an empty base DN, an attribute
    /// that is not a plain attribute name, or a zero page size.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.base_dn.trim().is_empty() {
            return Err(DirectoryError::config("base DN cannot be empty"));
        }
        if self.required_attribute.trim().is_empty() {
            return Err(DirectoryError::config("required attribute cannot be empty"));
        }
        if let Some(bad) = std::iter::once(&self.required_attribute)
            .chain(&self.basic_attributes)
            .find(|name| !is_attribute_name(name))
        {
            return Err(DirectoryError::config(format!(
                "'{bad}' is not a valid attribute name"
            )));
        }
        if self.page_size == 0 || i32::try_from(self.page_size).is_err() {
            return Err(DirectoryError::config("page size must be between 1 and 2147483647"));
        }
        self.filter.validate()
    }
}

mod optional_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ConnectionConfigBuilder {
        ConnectionConfig::builder()
            .host("ad.example.org")
            .bind_dn("CN=svc,DC=example,DC=org")
            .password("secret")
    }

    #[test]
    fn default_ports_follow_tls() {
        assert_eq!(builder().build().unwrap().port(), 389);
        assert_eq!(builder().use_tls(true).build().unwrap().port(), 636);
        assert_eq!(builder().port(3269).use_tls(true).build().unwrap().port(), 3269);
    }

    #[test]
    fn url_scheme_follows_tls() {
        let plain = builder().build().unwrap();
        let secure = builder().use_tls(true).build().unwrap();
        assert_eq!(plain.url(), "ldap://ad.example.org:389");
        assert_eq!(secure.url(), "ldaps://ad.example.org:636");
    }

    #[test]
    fn rejects_missing_fields() {
        let err = ConnectionConfig::builder().build().unwrap_err();
        assert!(matches!(err, DirectoryError::Config(_)));

        let err = builder().host("  ").build().unwrap_err();
        assert!(err.to_string().contains("host"));

        let err = ConnectionConfig::builder()
            .host("ad")
            .password("x")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("bind DN"));
    }

    #[test]
    fn rejects_zero_port_and_timeout() {
        assert!(builder().port(0).build().is_err());
        assert!(builder().timeout(Duration::ZERO).build().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let config = builder().password("hunter2").build().unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn search_settings_defaults_are_valid() {
        let settings = SearchSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.base_dn, DEFAULT_BASE_DN);
        assert_eq!(settings.required_attribute, "uidNumber");
        assert_eq!(settings.page_size, 500);
    }

    #[test]
    fn search_settings_validation() {
        let mut settings = SearchSettings::default();
        settings.page_size = 0;
        assert!(settings.validate().is_err());

        let mut settings = SearchSettings::default();
        settings.base_dn = String::new();
        assert!(settings.validate().is_err());

    }

    #[test]
    fn attribute_names_must_be_plain() {
        let mut settings = SearchSettings::default();
        settings.required_attribute = "uidNumber)(objectClass=*".into();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("not a valid attribute name"));

        let mut settings = SearchSettings::default();
        settings.basic_attributes.push("mail=*".into());
        assert!(settings.validate().is_err());

        let mut settings = SearchSettings::default();
        settings.required_attribute = "employee-number".into();
        assert!(settings.validate().is_ok());
    }
}
