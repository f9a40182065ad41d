//! Implementation of `ontoguard validate --repo <path>`.
//!
//! Runs the full validation pipeline over the repository and reports every
//! diagnostic. Exit codes:
//!
//! - 0 = conformant (no error-severity diagnostics; warnings are fine)
//! - 1 = one or more error-severity diagnostics
//! - 2 = the engine could not run at all (see [`crate::error::CliError`])
use ontoguard_core::{Report, validate_repository};

use crate::OutputFormat;
use crate::error::CliError;
use crate::io::RealFileStore;

/// Runs the `validate` command against the repository at `repo`.
///
/// Diagnostics are written to stderr as they're produced, then a single JSON
/// result object is written to stdout (and, if `summary_sink` is set, to that
/// path as well).
///
/// # Errors
///
/// Returns [`CliError::ValidationErrors`] (exit code 1) if the report
/// contains any error-severity diagnostic.
pub fn run(store: &RealFileStore, format: OutputFormat, summary_sink: Option<&std::path::Path>) -> Result<(), CliError> {
    let report = validate_repository(store);

    print_diagnostics(&report, format);

    let result = result_json(&report);
    println!("{result}");
    if let Some(path) = summary_sink {
        crate::io::write_atomic(store.root(), &path.display().to_string(), format!("{result}\n").as_bytes())?;
    }

    if report.has_errors() { Err(CliError::ValidationErrors) } else { Ok(()) }
}

pub(crate) fn print_diagnostics(report: &Report, format: OutputFormat) {
    for diagnostic in &report.diagnostics {
        match format {
            OutputFormat::Human => eprintln!("{diagnostic}"),
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "rule": diagnostic.rule_id.code(),
                        "severity": diagnostic.severity.to_string(),
                        "location": diagnostic.location.to_string(),
                        "message": diagnostic.message,
                    })
                );
            }
        }
    }
}

fn result_json(report: &Report) -> serde_json::Value {
    serde_json::json!({
        "conformant": report.is_conformant(),
        "errorCount": report.errors().count(),
        "warningCount": report.warnings().count(),
        "diagnostics": report.diagnostics.iter().map(|d| serde_json::json!({
            "rule": d.rule_id.code(),
            "severity": d.severity.to_string(),
            "location": d.location.to_string(),
            "message": d.message,
        })).collect::<Vec<_>>(),
    })
}
