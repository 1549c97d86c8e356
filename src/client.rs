//! Typed HTTP client for the five REST operations, built over a
//! mutually-authenticated `reqwest::Client`. Used by the `jobrunner` CLI.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::ConfigError;
use crate::tls;

#[derive(Debug, Serialize, Deserialize)]
pub struct JobView {
    pub id: Option<String>,
    pub cmd: Option<String>,
    pub status: Option<String>,
    pub output: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListView {
    #[serde(rename = "idList")]
    pub id_list: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopView {
    pub success: bool,
}

#[derive(Serialize)]
struct StartRequest<'a> {
    cmd: &'a [String],
}

/// An authenticated connection to a jobrunner service.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Build a client whose mTLS identity and trust anchor come from
    /// `config`, targeting `base_url` (e.g. `https://127.0.0.1:7443`).
    pub fn new(config: &Config, base_url: impl Into<String>) -> Result<Client, ConfigError> {
        let tls_config =
            tls::client_tls_config(&config.cert_path, &config.key_path, &config.ca_path)?;

        let http = reqwest::Client::builder()
            .use_preconfigured_tls(tls_config)
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ConfigError::Io {
                path: config.cert_path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            })?;

        Ok(Client {
            http,
            base_url: base_url.into(),
        })
    }

    pub async fn list(&self) -> reqwest::Result<ListView> {
        self.http
            .get(format!("{}/api/jobs", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn start(&self, cmd: &[String]) -> reqwest::Result<JobView> {
        self.http
            .post(format!("{}/api/jobs", self.base_url))
            .json(&StartRequest { cmd })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn status(&self, id: &str) -> reqwest::Result<JobView> {
        self.http
            .get(format!("{}/api/jobs/{id}", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn log(&self, id: &str) -> reqwest::Result<JobView> {
        self.http
            .get(format!("{}/api/jobs/{id}/log", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn stop(&self, id: &str) -> reqwest::Result<StopView> {
        self.http
            .delete(format!("{}/api/jobs/{id}", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

/// True when `path` looks like it exists and is readable; used by the CLI
/// to give a clearer error than a TLS handshake failure when cert material
/// is simply missing.
pub fn material_present(path: &Path) -> bool {
    path.is_file()
}
