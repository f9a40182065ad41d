/// CLI error types with associated exit codes.
///
/// [`CliError`] is the top-level error type for the `ontoguard` binary. Every
/// variant maps to a stable exit code via [`CliError::exit_code`]:
///
/// - Exit code **2** — host/input failure: the tool could not even run the
///   engine (bad repo path, unreadable file, git unavailable). These
///   terminate before any domain validation happens.
/// - Exit code **1** — a well-formed run that found domain errors (the
///   repository itself is non-conformant).
use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CliError
// ---------------------------------------------------------------------------

/// All error conditions that the `ontoguard` CLI can produce.
#[derive(Debug)]
pub enum CliError {
    // --- Exit code 2: host/input failures ---
    /// `--repo` does not point at a readable directory.
    RepoRootNotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// A file argument could not be found on the filesystem.
    FileNotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// The process lacks permission to read a file.
    PermissionDenied {
        /// The path that could not be read.
        path: PathBuf,
    },

    /// A file under the repository exceeds the configured `--max-file-size` limit.
    FileTooLarge {
        /// A human-readable label for the source (the repo-relative path).
        source: String,
        /// The configured size limit in bytes.
        limit: u64,
        /// The actual size in bytes.
        actual: Option<u64>,
    },

    /// A generic I/O error not covered by the more specific variants above.
    IoError {
        /// A human-readable label for the source.
        source: String,
        /// The underlying I/O error message.
        detail: String,
    },

    /// Invoking `git` failed outright (not installed, not a work tree, or a
    /// non-zero exit from a preflight check). Degrading individual
    /// `list_changed`/`read_at` calls to "no changes" is the engine's job;
    /// this variant is only for the up-front sanity check that guards
    /// `apply-versions` from silently writing zero bumps over a broken setup.
    GitUnavailable {
        /// A human-readable description of what failed.
        detail: String,
    },

    /// `VERSION_OVERRIDES.json` exists but is not valid JSON, or its values
    /// are not one of `"major"`, `"minor"`, `"patch"`.
    InvalidOverrides {
        /// A human-readable description of the problem.
        detail: String,
    },

    // --- Exit code 1: a well-formed run found domain errors ---
    /// `validate` found one or more error-severity diagnostics.
    ValidationErrors,
}

impl CliError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::RepoRootNotFound { .. }
            | Self::FileNotFound { .. }
            | Self::PermissionDenied { .. }
            | Self::FileTooLarge { .. }
            | Self::IoError { .. }
            | Self::GitUnavailable { .. }
            | Self::InvalidOverrides { .. } => 2,

            Self::ValidationErrors => 1,
        }
    }

    /// Returns a human-readable error message suitable for printing to stderr.
    pub fn message(&self) -> String {
        match self {
            Self::RepoRootNotFound { path } => {
                format!("error: repository root not found: {}", path.display())
            }
            Self::FileNotFound { path } => {
                format!("error: file not found: {}", path.display())
            }
            Self::PermissionDenied { path } => {
                format!("error: permission denied: {}", path.display())
            }
            Self::FileTooLarge { source, limit, actual: Some(actual) } => {
                format!("error: file too large: {source} is {actual} bytes, limit is {limit} bytes")
            }
            Self::FileTooLarge { source, limit, actual: None } => {
                format!("error: file too large: {source} exceeded limit of {limit} bytes")
            }
            Self::IoError { source, detail } => {
                format!("error: I/O error reading {source}: {detail}")
            }
            Self::GitUnavailable { detail } => {
                format!("error: git is unavailable: {detail}")
            }
            Self::InvalidOverrides { detail } => {
                format!("error: VERSION_OVERRIDES.json is invalid: {detail}")
            }
            Self::ValidationErrors => "error: validation failed with one or more errors".to_owned(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for CliError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use std::path::PathBuf;

    use super::*;

    #[test]
    fn repo_root_not_found_is_exit_2() {
        let e = CliError::RepoRootNotFound { path: PathBuf::from("/no/such/repo") };
        assert_eq!(e.exit_code(), 2);
    }

    #[test]
    fn file_not_found_is_exit_2() {
        let e = CliError::FileNotFound { path: PathBuf::from("categories/Ghost.json") };
        assert_eq!(e.exit_code(), 2);
    }

    #[test]
    fn permission_denied_is_exit_2() {
        let e = CliError::PermissionDenied { path: PathBuf::from("/root/secret.json") };
        assert_eq!(e.exit_code(), 2);
    }

    #[test]
    fn file_too_large_is_exit_2() {
        let e = CliError::FileTooLarge { source: "big.json".to_owned(), limit: 1024, actual: Some(2048) };
        assert_eq!(e.exit_code(), 2);
    }

    #[test]
    fn io_error_is_exit_2() {
        let e = CliError::IoError { source: "file.json".to_owned(), detail: "device full".to_owned() };
        assert_eq!(e.exit_code(), 2);
    }

    #[test]
    fn git_unavailable_is_exit_2() {
        let e = CliError::GitUnavailable { detail: "not a git repository".to_owned() };
        assert_eq!(e.exit_code(), 2);
    }

    #[test]
    fn invalid_overrides_is_exit_2() {
        let e = CliError::InvalidOverrides { detail: "not an object".to_owned() };
        assert_eq!(e.exit_code(), 2);
    }

    #[test]
    fn validation_errors_is_exit_1() {
        assert_eq!(CliError::ValidationErrors.exit_code(), 1);
    }

    #[test]
    fn file_too_large_with_actual_mentions_sizes() {
        let e = CliError::FileTooLarge { source: "big.json".to_owned(), limit: 1_000_000, actual: Some(2_000_000) };
        let msg = e.message();
        assert!(msg.contains("2000000"), "message: {msg}");
        assert!(msg.contains("1000000"), "message: {msg}");
    }

    #[test]
    fn file_too_large_without_actual_mentions_limit() {
        let e = CliError::FileTooLarge { source: "x.json".to_owned(), limit: 512, actual: None };
        let msg = e.message();
        assert!(msg.contains("512"), "message: {msg}");
    }

    #[test]
    fn repo_root_not_found_message_contains_path() {
        let e = CliError::RepoRootNotFound { path: PathBuf::from("/tmp/nope") };
        let msg = e.message();
        assert!(msg.contains("/tmp/nope"), "message: {msg}");
        assert!(msg.contains("not found"), "message: {msg}");
    }

    #[test]
    fn display_matches_message() {
        let e = CliError::ValidationErrors;
        assert_eq!(format!("{e}"), e.message());
    }

    #[test]
    fn error_trait_is_implemented() {
        let e: Box<dyn std::error::Error> = Box::new(CliError::ValidationErrors);
        assert!(!e.to_string().is_empty());
    }
}
