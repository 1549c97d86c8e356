//! jobrunner — CLI client for the remote job runner service.
//!
//! `jobrunner list | start <argv...> | status <id> | stop <id> | log <id>`.
//! All logic beyond argument parsing and response formatting lives in the
//! service; this binary is a thin, authenticated REST client (spec.md §4.5).

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use jobrunner::cli::{default_level, run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(cli.verbose)));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    rustls::crypto::ring::default_provider()
        .install_default()
        .ok();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
