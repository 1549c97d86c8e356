//! jobrunner — core library
//!
//! Provides the in-memory job supervisor (`job`, `registry`), the typed
//! error hierarchy (`error`), layered configuration (`config`), mTLS
//! wiring (`tls`), the HTTP dispatcher (`server`), and the client used by
//! the CLI (`client`, `cli`).
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod job;
pub mod registry;
pub mod server;
pub mod tls;
