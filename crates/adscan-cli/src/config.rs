//! Connection settings file.
//!
//! The file is JSON by default (`ad_connection.json`) and TOML when the
//! extension is `.toml`. Keys follow the original settings layout:
//!
//! ```json
//! {
//!   "Host": "dc1.ad.example.org",
//!   "Port": "636",
//!   "UseSSL": "true",
//!   "ForceSSL": "false",
//!   "LoginDN": "CN=svc-reader,OU=Service Accounts,DC=ad,DC=example,DC=org",
//!   "Password": "..."
//! }
//! ```
//!
//! Numbers and booleans may be given natively or as strings. Every value is
//! checked here, before any connection is attempted.

use std::path::Path;
use std::time::Duration;

use adscan_ldap::{ConnectionConfig, SearchSettings};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Default settings file name.
pub const DEFAULT_CONFIG_FILE: &str = "ad_connection.json";

/// A number or boolean that may be written as a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FlexValue {
    /// Native boolean.
    Bool(bool),
    /// Native unsigned number.
    Number(u64),
    /// String form.
    Text(String),
}

impl FlexValue {
    fn as_bool(&self, key: &str) -> CliResult<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Text(s) if s.trim().eq_ignore_ascii_case("true") => Ok(true),
            Self::Text(s) if s.trim().eq_ignore_ascii_case("false") => Ok(false),
            other => Err(CliError::config(format!(
                "{key} must be true or false, got {}",
                other.describe()
            ))),
        }
    }

    fn as_u64(&self, key: &str) -> CliResult<u64> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s.trim().parse().map_err(|_| {
                CliError::config(format!("{key} must be a whole number, got '{s}'"))
            }),
            Self::Bool(b) => Err(CliError::config(format!(
                "{key} must be a whole number, got {b}"
            ))),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => format!("'{s}'"),
        }
    }
}

/// Raw contents of the settings file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SettingsFile {
    /// Server host.
    pub host: Option<String>,
    /// Server port.
    pub port: Option<FlexValue>,
    /// Use LDAPS.
    #[serde(rename = "UseSSL")]
    pub use_ssl: Option<FlexValue>,
    /// Refuse the certificate bypass.
    #[serde(rename = "ForceSSL")]
    pub force_ssl: Option<FlexValue>,
    /// Bind DN.
    #[serde(rename = "LoginDN")]
    pub login_dn: Option<String>,
    /// Bind password.
    pub password: Option<String>,
    /// Connect timeout in seconds.
    pub timeout_seconds: Option<FlexValue>,
    /// Search base.
    #[serde(rename = "BaseDN")]
    pub base_dn: Option<String>,
    /// Mail suffix excluded from results.
    pub excluded_mail_suffix: Option<String>,
    /// Identifier every account must carry.
    pub required_attribute: Option<String>,
    /// Paged results page size.
    pub page_size: Option<FlexValue>,
    /// Deadline around the whole search, in seconds.
    pub search_timeout_seconds: Option<FlexValue>,
    /// Default cutoff date.
    pub since: Option<String>,
}

impl SettingsFile {
    /// Reads and parses a settings file.
    ///
    /// ## Errors
    ///
    /// Returns [`CliError::Config`] if the file cannot be read or parsed.
    pub fn read(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            toml::from_str(&content)
                .map_err(|e| CliError::config(format!("failed to parse {}: {e}", path.display())))
        } else {
            serde_json::from_str(&content)
                .map_err(|e| CliError::config(format!("failed to parse {}: {e}", path.display())))
        }
    }
}

/// Values given on the command line or in the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Replaces `Host`.
    pub host: Option<String>,
    /// Replaces `Password`.
    pub password: Option<String>,
}

/// Validated settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Connection settings.
    pub connection: ConnectionConfig,
    /// Search settings.
    pub search: SearchSettings,
    /// Default cutoff.
    pub since: DateTime<Utc>,
}

impl Settings {
    /// Loads and validates a settings file.
    ///
    /// ## Errors
    ///
    /// Returns [`CliError::Config`] for unreadable files and missing or
    /// malformed values.
    pub fn load(path: &Path, overrides: &Overrides) -> CliResult<Self> {
        Self::resolve(SettingsFile::read(path)?, overrides)
    }

    /// Validates parsed file contents.
    ///
    /// ## Errors
    ///
    /// Returns [`CliError::Config`] for missing or malformed values.
    pub fn resolve(file: SettingsFile, overrides: &Overrides) -> CliResult<Self> {
        let host = overrides
            .host
            .clone()
            .or(file.host)
            .ok_or_else(|| CliError::config("missing Host"))?;
        let password = overrides
            .password
            .clone()
            .or(file.password)
            .ok_or_else(|| CliError::config("missing Password"))?;
        let login_dn = file
            .login_dn
            .ok_or_else(|| CliError::config("missing LoginDN"))?;
        let port = file
            .port
            .as_ref()
            .ok_or_else(|| CliError::config("missing Port"))?
            .as_u64("Port")?;
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| CliError::config(format!("Port must be between 1 and 65535, got {port}")))?;
        let use_tls = required_bool(file.use_ssl.as_ref(), "UseSSL")?;
        let force_tls = required_bool(file.force_ssl.as_ref(), "ForceSSL")?;

        let mut builder = ConnectionConfig::builder()
            .host(host)
            .port(port)
            .use_tls(use_tls)
            .force_tls(force_tls)
            .bind_dn(login_dn)
            .password(password);
        if let Some(timeout) = &file.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(timeout.as_u64("TimeoutSeconds")?));
        }
        let connection = builder.build().map_err(|e| CliError::config(e.to_string()))?;

        let mut search = SearchSettings::default();
        if let Some(base_dn) = file.base_dn {
            search.base_dn = base_dn;
        }
        if let Some(suffix) = file.excluded_mail_suffix {
            search.filter.excluded_mail_suffix = suffix;
        }
        if let Some(attribute) = file.required_attribute {
            search.required_attribute = attribute;
        }
        if let Some(size) = &file.page_size {
            search.page_size = u32::try_from(size.as_u64("PageSize")?)
                .map_err(|_| CliError::config("PageSize is too large"))?;
        }
        if let Some(secs) = &file.search_timeout_seconds {
            search.search_timeout = Some(Duration::from_secs(secs.as_u64("SearchTimeoutSeconds")?));
        }
        search
            .validate()
            .map_err(|e| CliError::config(e.to_string()))?;

        let since = match file.since {
            Some(text) => parse_cutoff(&text).map_err(CliError::config)?,
            None => default_cutoff(),
        };

        Ok(Self {
            connection,
            search,
            since,
        })
    }
}

fn required_bool(value: Option<&FlexValue>, key: &str) -> CliResult<bool> {
    value
        .ok_or_else(|| CliError::config(format!("missing {key}")))?
        .as_bool(key)
}

/// 2017-01-01T00:00:00Z.
#[must_use]
pub fn default_cutoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Parses a cutoff given as `YYYY-MM-DD` (UTC midnight) or RFC 3339.
///
/// ## Errors
///
/// Returns a message suitable for clap when neither form matches.
pub fn parse_cutoff(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight));
        }
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| format!("expected YYYY-MM-DD or an RFC 3339 timestamp, got '{value}'"))
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
    /// DN and `name : value` lines.
    Plain,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn parse(json: &str) -> CliResult<Settings> {
        Settings::resolve(serde_json::from_str(json).unwrap(), &Overrides::default())
    }

    const STRING_VALUES: &str = r#"{
        "Host": "dc1.ad.example.org",
        "Port": "636",
        "UseSSL": "True",
        "ForceSSL": "false",
        "LoginDN": "CN=svc-reader,DC=ad,DC=example,DC=org",
        "Password": "s3cret"
    }"#;

    #[test]
    fn accepts_string_values() {
        let settings = parse(STRING_VALUES).unwrap();
        assert_eq!(settings.connection.host(), "dc1.ad.example.org");
        assert_eq!(settings.connection.port(), 636);
        assert!(settings.connection.use_tls());
        assert!(!settings.connection.force_tls());
        assert_eq!(settings.since, default_cutoff());
        assert_eq!(settings.search.base_dn, "DC=ad,DC=ersa,DC=edu,DC=au");
    }

    #[test]
    fn accepts_native_values() {
        let settings = parse(
            r#"{"Host": "dc1", "Port": 389, "UseSSL": false, "ForceSSL": true,
                "LoginDN": "CN=svc", "Password": "x", "TimeoutSeconds": 300,
                "BaseDN": "DC=example,DC=org", "ExcludedMailSuffix": "example.org",
                "PageSize": "250", "Since": "2020-07-01"}"#,
        )
        .unwrap();
        assert_eq!(settings.connection.port(), 389);
        assert!(settings.connection.force_tls());
        assert_eq!(settings.connection.timeout(), Duration::from_secs(300));
        assert_eq!(settings.search.base_dn, "DC=example,DC=org");
        assert_eq!(settings.search.filter.excluded_mail_suffix, "example.org");
        assert_eq!(settings.search.page_size, 250);
        assert_eq!(settings.since, parse_cutoff("2020-07-01T00:00:00Z").unwrap());
    }

    #[test]
    fn rejects_malformed_values() {
        let err = parse(r#"{"Host": "dc1", "Port": "ldaps", "LoginDN": "CN=svc", "Password": "x"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("Port must be a whole number"));

        let err = parse(r#"{"Host": "dc1", "Port": "70000", "LoginDN": "CN=svc", "Password": "x"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("between 1 and 65535"));

        let err = parse(
            r#"{"Host": "dc1", "Port": 636, "UseSSL": "yes", "LoginDN": "CN=svc", "Password": "x"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("UseSSL must be true or false"));
    }

    #[test]
    fn rejects_missing_values() {
        let err = parse(r#"{"Port": 636, "LoginDN": "CN=svc", "Password": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("missing Host"));
        let err = parse(r#"{"Host": "dc1", "LoginDN": "CN=svc", "Password": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("missing Port"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn tls_flags_are_required() {
        let err = parse(
            r#"{"Host": "dc1", "Port": "636", "ForceSSL": "false", "LoginDN": "CN=svc", "Password": "x"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing UseSSL"));
        assert_eq!(err.exit_code(), 2);

        let err = parse(
            r#"{"Host": "dc1", "Port": "636", "UseSSL": "true", "LoginDN": "CN=svc", "Password": "x"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing ForceSSL"));

        let err = parse(r#"{"Host": "dc1", "Port": "636", "LoginDN": "CN=svc", "Password": "x"}"#)
            .unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn overrides_replace_file_values() {
        let file: SettingsFile = serde_json::from_str(STRING_VALUES).unwrap();
        let overrides = Overrides {
            host: Some("dc2.ad.example.org".into()),
            password: Some("from-env".into()),
        };
        let settings = Settings::resolve(file, &overrides).unwrap();
        assert_eq!(settings.connection.host(), "dc2.ad.example.org");
        assert_eq!(settings.connection.password(), "from-env");
    }

    #[test]
    fn reads_json_and_toml_files() {
        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        json.write_all(STRING_VALUES.as_bytes()).unwrap();
        let settings = Settings::load(json.path(), &Overrides::default()).unwrap();
        assert_eq!(settings.connection.port(), 636);

        let mut toml_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        toml_file
            .write_all(
                b"Host = \"dc1\"\nPort = 389\nUseSSL = false\nForceSSL = false\nLoginDN = \"CN=svc\"\nPassword = \"x\"\n",
            )
            .unwrap();
        let settings = Settings::load(toml_file.path(), &Overrides::default()).unwrap();
        assert_eq!(settings.connection.port(), 389);
    }

    #[test]
    fn unreadable_file_is_config_error() {
        let err = Settings::load(Path::new("/nonexistent/ad_connection.json"), &Overrides::default())
            .unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn cutoff_formats() {
        let midnight = parse_cutoff("2017-01-01").unwrap();
        assert_eq!(midnight, default_cutoff());
        let precise = parse_cutoff("2017-01-01T10:00:00+10:00").unwrap();
        assert_eq!(precise, default_cutoff());
        assert!(parse_cutoff("01/01/2017").is_err());
    }
}
