//! # adscan
//!
//! Lists Active Directory accounts created after a cutoff date.

#![forbid(unsafe_code)]

use adscan_cli::{
    cli::{Cli, Command},
    commands::{run_new_accounts, run_user},
    config::Settings,
    logging::init_logging,
    output::{error, warning},
};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Load configuration
    let settings = match Settings::load(&cli.config, &cli.overrides()) {
        Ok(s) => s,
        Err(e) => {
            error(&format!("Failed to load configuration: {e}"));
            std::process::exit(e.exit_code());
        }
    };

    // Execute command
    let result = match cli.command() {
        Command::NewAccounts(args) => run_new_accounts(args, &settings, cli.output).await,
        Command::User(args) => run_user(args, &settings, cli.output).await,
    };

    if let Err(e) = result {
        error(&e.to_string());
        if let Some(hint) = e.hint() {
            warning(hint);
        }
        std::process::exit(e.exit_code());
    }
}
