//! oc-images CLI - Reports on OpenShift release payloads and imagestreams
//!
//! This is the main entry point for the oc-images command-line interface.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};
use commands::Session;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI args; usage errors exit with status 2
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbosity(), cli.quiet);

    let session = Session::new(cli.config.as_deref(), cli.filter_by_os.clone(), cli.quiet)?;

    // Run command
    match cli.command {
        Commands::List(args) => commands::list::run(args, &session).await,
        Commands::Diff(args) => commands::diff::run(args, &session).await,
    }
}

/// Initialize tracing on stderr; `RUST_LOG` takes precedence over the flags
fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
