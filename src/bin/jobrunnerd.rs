//! jobrunnerd — the mutually-authenticated remote job runner service.
//!
//! All logs go to stderr via `tracing`; the wire protocol is JSON over
//! HTTPS (spec.md §6). The process only exits on a fatal startup error
//! (bad TLS material, unparseable config, unable to bind) — see
//! SPEC_FULL.md §7.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use jobrunner::cli::default_level;
use jobrunner::config::{Config, ConfigOverrides};
use jobrunner::registry::Registry;
use jobrunner::server;
use jobrunner::tls;

#[derive(Debug, Parser)]
#[command(name = "jobrunnerd")]
#[command(about = "Mutually-authenticated remote job runner service", long_about = None)]
struct Args {
    /// Increase log verbosity (-v, -vv); logs go to stderr.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Address to bind the HTTPS listener on.
    #[arg(long)]
    bind: Option<String>,

    #[arg(long)]
    cert: Option<String>,
    #[arg(long)]
    key: Option<String>,
    #[arg(long = "ca-cert")]
    ca_cert: Option<String>,
    #[arg(long = "config")]
    config_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(args.verbose)));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    rustls::crypto::ring::default_provider()
        .install_default()
        .ok();

    let config = Config::resolve(ConfigOverrides {
        bind_addr: args.bind,
        cert_path: args.cert,
        key_path: args.key,
        ca_path: args.ca_cert,
        config_file: args.config_file,
    })
    .context("resolve configuration")?;

    let tls_config = tls::server_tls_config(&config.cert_path, &config.key_path, &config.ca_path)
        .context("load TLS material")?;

    let registry = Arc::new(Registry::new());
    let app = server::router(registry);

    tracing::info!(addr = %config.bind_addr, "jobrunnerd listening");

    let rustls_config = axum_server::tls_rustls::RustlsConfig::from_config(Arc::new(tls_config));
    axum_server::bind_rustls(config.bind_addr, rustls_config)
        .serve(app.into_make_service())
        .await
        .context("serve HTTPS listener")?;

    Ok(())
}
