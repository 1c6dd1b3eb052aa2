//! Output formatting utilities.

use adscan_ldap::{EntryIssue, ResultRecord, SearchOutcome};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::config::OutputFormat;

/// Prints a success message.
pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Prints an error message.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Prints a warning message.
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Prints an info message.
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// One attribute of a record, for table output.
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct AttributeRow {
    /// Attribute name.
    #[tabled(rename = "Attribute")]
    pub name: String,
    /// Attribute value.
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Table rows for a record, in attribute-name order.
#[must_use]
pub fn attribute_rows(record: &ResultRecord) -> Vec<AttributeRow> {
    record
        .attributes
        .iter()
        .map(|(name, value)| AttributeRow {
            name: name.clone(),
            value: value.clone(),
        })
        .collect()
}

#[derive(Serialize)]
struct Report<'a> {
    count: usize,
    records: &'a [ResultRecord],
    issues: &'a [EntryIssue],
}

/// Line printed after a listing.
#[must_use]
pub fn total_line(outcome: &SearchOutcome) -> String {
    format!("Total number of new account = {}", outcome.count())
}

/// Prints a search outcome.
///
/// Entry issues always go to stderr as warnings.
pub fn output_outcome(outcome: &SearchOutcome, format: OutputFormat) -> crate::CliResult<()> {
    for issue in &outcome.issues {
        warning(&issue.to_string());
    }

    match format {
        OutputFormat::Json => {
            let report = Report {
                count: outcome.count(),
                records: &outcome.records,
                issues: &outcome.issues,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table | OutputFormat::Plain => {
            if outcome.records.is_empty() {
                info("No new accounts found.");
            }
            for record in &outcome.records {
                print_record(record, format);
            }
            println!("{}", total_line(outcome));
        }
    }
    Ok(())
}

/// Prints a single record.
pub fn output_record(record: &ResultRecord, format: OutputFormat) -> crate::CliResult<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
        OutputFormat::Table | OutputFormat::Plain => print_record(record, format),
    }
    Ok(())
}

fn print_record(record: &ResultRecord, format: OutputFormat) {
    println!("{}", record.dn.bold());
    match format {
        OutputFormat::Table => {
            let table = Table::new(attribute_rows(record))
                .with(Style::rounded())
                .to_string();
            println!("{table}");
        }
        _ => {
            for row in attribute_rows(record) {
                println!("   {} : {}", row.name, row.value);
            }
        }
    }
    println!();
}
