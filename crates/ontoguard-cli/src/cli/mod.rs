//! Clap CLI definition: root struct, subcommands, and shared argument types.
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for diagnostics written to stderr while a command runs.
///
/// Either way, the final result object is always written to stdout as JSON
/// so the CLI composes in a CI pipeline; `--format` only controls whether
/// the per-diagnostic progress lines on stderr are human-readable text or
/// NDJSON.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable diagnostic lines (default).
    Human,
    /// One JSON object per diagnostic, newline-delimited.
    Json,
}

/// All top-level subcommands exposed by the `ontoguard` binary.
#[derive(Subcommand)]
pub enum Command {
    /// Validate the repository and report every diagnostic.
    ///
    /// Exits non-zero if any error-severity diagnostic is found; warnings do
    /// not affect the exit code.
    Validate,

    /// Detect changes since `--base`, cascade version bumps, and write the
    /// results into the repository.
    ///
    /// Updates module and bundle `version` fields, the root `VERSION` file,
    /// and removes `VERSION_OVERRIDES.json` once applied.
    #[command(name = "apply-versions")]
    ApplyVersions,
}

/// Root CLI struct for the `ontoguard` binary.
///
/// All global flags are defined here and marked `global = true` so that clap
/// propagates them to every subcommand.
#[derive(Parser)]
#[command(
    name = "ontoguard",
    version,
    about = "CI validator and semantic-versioning engine for a community ontology repository",
    long_about = "Validates typed ontology entity files (categories, properties, subobjects,\n\
                  templates, modules, bundles) and computes the semantic-version bumps a\n\
                  change set requires, cascading them through the module dependency graph."
)]
pub struct Cli {
    /// Active subcommand.
    #[command(subcommand)]
    pub command: Command,

    /// Path to the repository root.
    #[arg(long, global = true, default_value = ".")]
    pub repo: PathBuf,

    /// Revision to compare the working tree against.
    #[arg(long, global = true, default_value = "HEAD")]
    pub base: String,

    /// Diagnostic output format: human (default) or json.
    #[arg(long, short = 'f', global = true, default_value = "human")]
    pub format: OutputFormat,

    /// Write the final result object to this path in addition to stdout.
    #[arg(long, global = true)]
    pub summary_sink: Option<PathBuf>,

    /// Maximum size, in bytes, of any single entity file.
    ///
    /// Default: 268435456 (256 MB).
    #[arg(long, global = true, default_value = "268435456")]
    pub max_file_size: u64,

    /// Increase stderr verbosity.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}
