#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]

mod commands;
mod logging;

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use resolvekit_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "resolvekit")]
#[command(author, version, about = "Resolve module specifiers through an install-location authority", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Resolve a specifier to a location on disk
    Resolve {
        /// Specifier to resolve (omit to resolve the directory itself)
        specifier: Option<String>,

        /// Directory issuing the request (defaults to the working directory)
        #[arg(long, value_name = "DIR")]
        from: Option<PathBuf>,

        /// Install manifest to consult for bare specifiers
        #[arg(long, value_name = "FILE", env = "RESOLVEKIT_MANIFEST")]
        manifest: Option<PathBuf>,

        /// Report the files the answer depends on
        #[arg(long)]
        deps: bool,

        /// Print the per-hook resolution log
        #[arg(long)]
        trace: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine working directory; issuers handed to the authority must be absolute
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let cwd = dunce::canonicalize(&cwd)
        .into_diagnostic()
        .wrap_err_with(|| format!("invalid working directory {}", cwd.display()))?;

    // Build config: resolvekit.json first, flags on top
    let mut config = Config::discover(cwd.clone())
        .into_diagnostic()?
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Resolve {
            specifier,
            from,
            manifest,
            deps,
            trace,
        }) => {
            if let Some(manifest) = manifest {
                config = config.with_manifest(cwd.join(manifest));
            }
            if deps {
                config = config.with_track_dependencies(true);
            }
            if trace {
                config = config.with_trace(true);
            }

            let span = tracing::info_span!("resolve", cmd = "resolve", cwd = %cwd.display());
            let _guard = span.enter();
            commands::resolve::run(&config, specifier.as_deref(), from.as_deref(), cli.json)
        }
    }
}
