//! # adscan-cli
//!
//! Command-line reporting of newly created Active Directory accounts.
//!
//! This crate provides:
//! - Settings file loading (`ad_connection.json`)
//! - `new-accounts`: accounts created since a cutoff date
//! - `user`: lookup by uidNumber

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;

pub use cli::Cli;
pub use config::Settings;
pub use error::{CliError, CliResult};
