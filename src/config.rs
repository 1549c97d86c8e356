//! Layered configuration: CLI flag > environment variable > config file >
//! built-in default. Generalizes the teacher's `jobstore::resolve_root`
//! (a single-field version of the same priority chain) to the handful of
//! fields this service needs.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:7443";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Resolved configuration for either the server or the CLI client.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub ca_path: PathBuf,
    pub request_timeout_ms: u64,
}

/// Overrides supplied on the command line; `None` fields fall through to
/// the environment, then the config file, then the default.
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub bind_addr: Option<String>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
    pub ca_path: Option<String>,
    pub config_file: Option<String>,
}

/// The `[jobrunner]` table of an optional TOML config file.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind_addr: Option<String>,
    cert_path: Option<String>,
    key_path: Option<String>,
    ca_path: Option<String>,
    request_timeout_ms: Option<u64>,
}

impl Config {
    /// Resolve configuration following the priority chain described above.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Config, ConfigError> {
        let file = load_file_config(overrides.config_file.as_deref())?;

        let bind_addr = overrides
            .bind_addr
            .or_else(|| std::env::var("JOBRUNNER_BIND").ok())
            .or(file.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(bind_addr.clone()))?;

        let cert_path = resolve_path(overrides.cert_path, "JOBRUNNER_CERT", file.cert_path, "ssl/server.crt");
        let key_path = resolve_path(overrides.key_path, "JOBRUNNER_KEY", file.key_path, "ssl/server.key");
        let ca_path = resolve_path(overrides.ca_path, "JOBRUNNER_CA", file.ca_path, "ssl/ca.crt");

        let request_timeout_ms = file.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);

        Ok(Config {
            bind_addr,
            cert_path,
            key_path,
            ca_path,
            request_timeout_ms,
        })
    }
}

fn resolve_path(
    cli: Option<String>,
    env_var: &str,
    file: Option<String>,
    default: &str,
) -> PathBuf {
    cli.or_else(|| std::env::var(env_var).ok())
        .or(file)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

fn load_file_config(explicit_path: Option<&str>) -> Result<FileConfig, ConfigError> {
    let path: PathBuf = match explicit_path {
        Some(p) => PathBuf::from(p),
        None => match std::env::var("JOBRUNNER_CONFIG") {
            Ok(p) => PathBuf::from(p),
            Err(_) => default_config_path(),
        },
    };

    if !path.exists() {
        return Ok(FileConfig::default());
    }

    read_file_config(&path)
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn default_config_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.config_dir().join("jobrunner").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("jobrunner.toml"))
}
