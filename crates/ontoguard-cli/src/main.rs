pub mod cli;
pub mod cmd;
pub mod error;
pub mod io;

pub use cli::{Cli, Command, OutputFormat};

use clap::Parser;

fn main() {
    #[cfg(unix)]
    install_sigpipe_default();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = dispatch(&cli);

    if let Err(e) = result {
        eprintln!("{}", e.message());
        std::process::exit(e.exit_code());
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Dispatches the parsed CLI arguments to the appropriate command handler.
///
/// Returns `Ok(())` on success or a [`error::CliError`] on failure. The
/// caller is responsible for printing the error message and exiting with the
/// appropriate exit code.
fn dispatch(cli: &Cli) -> Result<(), error::CliError> {
    let root = cli.repo.canonicalize().map_err(|_| error::CliError::RepoRootNotFound { path: cli.repo.clone() })?;
    let store = io::RealFileStore::new(root.clone(), cli.max_file_size);

    match &cli.command {
        Command::Validate => cmd::validate::run(&store, cli.format, cli.summary_sink.as_deref()),

        Command::ApplyVersions => {
            io::check_git_available(&root)?;
            let versioned = io::GitVersionedStore::new(root);
            cmd::apply_versions::run(&store, &versioned, &cli.base, cli.format, cli.summary_sink.as_deref())
        }
    }
}

/// Resets `SIGPIPE` to its default disposition (`SIG_DFL`).
///
/// Rust's runtime ignores `SIGPIPE` by default, which causes programs that
/// write to a closed pipe (e.g. `ontoguard validate | head`) to receive an
/// `Err(BrokenPipe)` from a write call rather than being terminated silently.
/// By restoring the default disposition, the kernel will terminate the process
/// with exit code 0 (consistent with standard Unix behavior) when a write to a
/// closed pipe occurs.
///
/// This function uses `libc::signal` which requires the `libc` crate. It is
/// only compiled on Unix targets via `#[cfg(unix)]` at the call site.
#[cfg(unix)]
fn install_sigpipe_default() {
    // SAFETY: signal() is safe to call during single-threaded program
    // initialization before any other threads are spawned. SIG_DFL is a valid
    // handler for SIGPIPE. The return value (previous handler) is discarded.
    //
    // The workspace denies `unsafe_code` globally, but this is the minimal
    // unavoidable use of libc required for SIGPIPE handling on Unix. There is
    // no safe Rust equivalent in the standard library.
    //
    // We use an inline allow rather than a workspace-level exception so the
    // scope of the unsafe block is as narrow as possible.
    #[allow(unsafe_code)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
}
