//! `user` command.

use crate::cli::UserArgs;
use crate::config::{OutputFormat, Settings};
use crate::error::CliError;
use crate::output::{output_record, success};

use super::directory_client;

/// Looks up one account by uidNumber.
pub async fn run_user(
    args: UserArgs,
    settings: &Settings,
    output_format: OutputFormat,
) -> crate::CliResult<()> {
    let client = directory_client(settings)?;
    let record = client
        .get_user(args.uid_number, args.all)
        .await?
        .ok_or_else(|| CliError::NotFound {
            resource_type: "user".to_string(),
            id: args.uid_number.to_string(),
        })?;

    if output_format != OutputFormat::Json {
        success(&format!("Found uidNumber {}", args.uid_number));
    }
    output_record(&record, output_format)
}
