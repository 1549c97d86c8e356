//! `clap` subcommand definitions and dispatch for the `jobrunner` client
//! binary, in the teacher's style (`#[derive(Parser, Subcommand)]`, global
//! `-v` verbosity mapped to a `tracing_subscriber::EnvFilter`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::client::{material_present, Client};
use crate::config::{Config, ConfigOverrides};

#[derive(Debug, Parser)]
#[command(name = "jobrunner")]
#[command(about = "Client for the mutually-authenticated remote job runner", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv); logs go to stderr.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Base URL of the jobrunner service, e.g. https://127.0.0.1:7443.
    #[arg(long, global = true, default_value = "https://127.0.0.1:7443")]
    pub url: String,

    #[arg(long, global = true)]
    pub cert: Option<String>,
    #[arg(long, global = true)]
    pub key: Option<String>,
    #[arg(long = "ca-cert", global = true)]
    pub ca_cert: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List all known jobs, ascending by id.
    List,
    /// Start a new job.
    Start {
        #[arg(required = true, trailing_var_arg = true)]
        argv: Vec<String>,
    },
    /// Get the status of a job.
    Status { id: String },
    /// Stop a running job.
    Stop { id: String },
    /// Get the combined output log of a job (same payload as `status`).
    Log { id: String },
}

pub fn default_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(ConfigOverrides {
        cert_path: cli.cert,
        key_path: cli.key,
        ca_path: cli.ca_cert,
        ..Default::default()
    })
    .context("resolve configuration")?;

    for (label, path) in [
        ("certificate", &config.cert_path),
        ("private key", &config.key_path),
        ("CA certificate", &config.ca_path),
    ] {
        if !material_present(path) {
            anyhow::bail!("{label} file not found: {}", path.display());
        }
    }

    let client = Client::new(&config, cli.url).context("build authenticated client")?;

    match cli.command {
        Command::List => {
            let list = client.list().await.context("list jobs")?;
            print_json(&list.id_list)?;
        }
        Command::Start { argv } => {
            let job = client.start(&argv).await.context("start job")?;
            print_json(&job)?;
        }
        Command::Status { id } => {
            let job = client.status(&id).await.context("get job status")?;
            print_json(&job)?;
        }
        Command::Stop { id } => {
            let result = client.stop(&id).await.context("stop job")?;
            print_json(&result)?;
        }
        Command::Log { id } => {
            let job = client.log(&id).await.context("get job log")?;
            print_json(&job)?;
        }
    }
    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
