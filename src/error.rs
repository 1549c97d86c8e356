//! Typed error hierarchy for the supervisor, registry, and dispatcher.
//!
//! Each crate boundary gets its own `thiserror` enum; the dispatcher maps
//! these onto HTTP status codes (see `server.rs`). CLI-facing code collapses
//! everything into `anyhow::Error` the way the teacher's `main.rs` does,
//! downcasting back to a known variant only where the error code matters.

use thiserror::Error;

/// Errors that can occur while spawning or signaling a single job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to spawn {command:?}: {source}")]
    SpawnFailure {
        command: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to signal process group {pgid}: {source}")]
    SignalFailure {
        pgid: i32,
        #[source]
        source: std::io::Error,
    },
}

/// Errors returned by [`crate::registry::Registry`] operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{0} is not a valid id")]
    UnknownIdentifier(String),

    #[error(transparent)]
    Job(#[from] JobError),
}

impl RegistryError {
    /// The job identifier this error is about, when applicable. Used by the
    /// dispatcher to format the exact wire error body spec.md mandates
    /// (`"<id> is not a valid id\n"`).
    pub fn unknown_id(&self) -> Option<&str> {
        match self {
            RegistryError::UnknownIdentifier(id) => Some(id),
            RegistryError::Job(_) => None,
        }
    }
}

/// Errors surfaced by the HTTP dispatcher before a status code is chosen.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors that prevent the service from starting at all: these are fatal,
/// matching spec.md §7 ("the process itself only terminates on fatal
/// startup errors").
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid bind address {0}")]
    InvalidBindAddr(String),
}
