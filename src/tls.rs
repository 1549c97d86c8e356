//! Mutual-TLS configuration: both sides load a certificate, a private key,
//! and a trust anchor, and require a verified peer certificate. Nothing in
//! the retrieval pack implements mTLS directly; this follows upstream
//! `rustls`/`axum-server` convention, with `rustls` itself pinned the way
//! the `paritytech-polkadot-sdk` and `nextest` manifests pin it
//! (see DESIGN.md).

use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::RootCertStore;

use crate::error::ConfigError;

fn read_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ConfigError> {
    let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = std::io::BufReader::new(file);
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
}

fn read_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, ConfigError> {
    let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = std::io::BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?
        .ok_or_else(|| ConfigError::Io {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "no private key found"),
        })
}

fn build_root_store(ca_path: &Path) -> Result<RootCertStore, ConfigError> {
    let mut store = RootCertStore::empty();
    for cert in read_certs(ca_path)? {
        store.add(cert).map_err(|e| ConfigError::Io {
            path: ca_path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
        })?;
    }
    Ok(store)
}

/// Build the server-side TLS config: the service's own certificate/key,
/// plus a client-certificate verifier anchored at `ca_path` that rejects
/// any connection lacking a certificate chaining to it (spec.md §4.4).
pub fn server_tls_config(
    cert_path: &Path,
    key_path: &Path,
    ca_path: &Path,
) -> Result<rustls::ServerConfig, ConfigError> {
    let certs = read_certs(cert_path)?;
    let key = read_private_key(key_path)?;
    let roots = Arc::new(build_root_store(ca_path)?);

    let verifier = rustls::server::WebPkiClientVerifier::builder(roots)
        .build()
        .map_err(|e| ConfigError::Io {
            path: ca_path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
        })?;

    let config = rustls::ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(certs, key)
        .map_err(|e| ConfigError::Io {
            path: cert_path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
        })?;

    Ok(config)
}

/// Build the client-side TLS config: the client's own certificate/key (so
/// the server's peer-verification policy can be satisfied), plus the same
/// trust anchor as the set of accepted server authorities.
pub fn client_tls_config(
    cert_path: &Path,
    key_path: &Path,
    ca_path: &Path,
) -> Result<rustls::ClientConfig, ConfigError> {
    let certs = read_certs(cert_path)?;
    let key = read_private_key(key_path)?;
    let roots = build_root_store(ca_path)?;

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_client_auth_cert(certs, key)
        .map_err(|e| ConfigError::Io {
            path: cert_path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
        })?;

    Ok(config)
}
