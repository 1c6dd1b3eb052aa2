//! CLI argument parsing.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use crate::config::{parse_cutoff, OutputFormat, Overrides, DEFAULT_CONFIG_FILE};

/// List Active Directory accounts created after a cutoff date.
#[derive(Debug, Parser)]
#[command(name = "adscan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Connection settings file (JSON, or TOML by extension).
    #[arg(short, long, env = "ADSCAN_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Directory host (overrides the settings file).
    #[arg(long, env = "ADSCAN_HOST")]
    pub host: Option<String>,

    /// Bind password (overrides the settings file).
    #[arg(long, env = "ADSCAN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute. Defaults to `new-accounts`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Settings overrides taken from flags and the environment.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            password: self.password.clone(),
        }
    }

    /// The subcommand, or `new-accounts` with default arguments.
    #[must_use]
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::NewAccounts(NewAccountsArgs::default()))
    }
}

/// CLI commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List accounts created since the cutoff date.
    NewAccounts(NewAccountsArgs),

    /// Look up one account by uidNumber.
    User(UserArgs),
}

/// Arguments for `new-accounts`.
#[derive(Debug, Clone, Default, Args)]
pub struct NewAccountsArgs {
    /// Cutoff as YYYY-MM-DD (UTC) or RFC 3339. Defaults to the settings file
    /// `Since` value, then 2017-01-01.
    #[arg(long, value_parser = parse_cutoff)]
    pub since: Option<DateTime<Utc>>,

    /// Attribute to return; repeat for several. All attributes by default.
    #[arg(short, long = "attribute", value_name = "NAME")]
    pub attributes: Vec<String>,
}

/// Arguments for `user`.
#[derive(Debug, Clone, Args)]
pub struct UserArgs {
    /// Numeric account identifier.
    pub uid_number: u32,

    /// Return every attribute instead of the basic set.
    #[arg(long)]
    pub all: bool,
}
