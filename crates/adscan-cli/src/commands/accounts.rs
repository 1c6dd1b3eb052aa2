//! `new-accounts` command.

use crate::cli::NewAccountsArgs;
use crate::config::{OutputFormat, Settings};
use crate::output::output_outcome;

use super::directory_client;

/// Lists accounts created since the cutoff.
pub async fn run_new_accounts(
    args: NewAccountsArgs,
    settings: &Settings,
    output_format: OutputFormat,
) -> crate::CliResult<()> {
    let client = directory_client(settings)?;
    let cutoff = args.since.unwrap_or(settings.since);
    let wanted = (!args.attributes.is_empty()).then_some(args.attributes.as_slice());

    tracing::debug!(
        server = %settings.connection.target(),
        cutoff = %cutoff,
        "Listing new accounts"
    );
    let outcome = client.find_new_accounts(cutoff, wanted).await?;
    output_outcome(&outcome, output_format)
}
