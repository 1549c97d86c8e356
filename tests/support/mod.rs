//! Shared test scaffolding: ephemeral mTLS material and a harness that
//! drives the compiled `jobrunnerd` binary as a subprocess, mirroring the
//! teacher's `tests/integration.rs` `TestHarness` (a struct owning a temp
//! directory and a `Command::new(binary())` invocation) but exercising the
//! HTTPS surface instead of stdout JSON.

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::{Duration, Instant};

use rcgen::{CertificateParams, DistinguishedName, IsCa, KeyPair, SanType};

pub struct IssuedCert {
    pub cert_pem: String,
    pub key_pem: String,
}

/// A self-signed certificate authority. Can mint any number of leaf
/// certificates, so a test can build both a client identity the server
/// trusts and one signed by an unrelated `Ca` to exercise the
/// authentication-boundary rejection path.
pub struct Ca {
    pub cert_pem: String,
    cert: rcgen::Certificate,
    key: KeyPair,
}

impl Ca {
    pub fn generate() -> Ca {
        let key = KeyPair::generate().expect("generate CA key");
        let mut params = CertificateParams::new(Vec::<String>::new()).expect("CA params");
        params.is_ca = IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        params.distinguished_name = DistinguishedName::new();
        let cert = params.self_signed(&key).expect("self-sign CA");
        Ca {
            cert_pem: cert.pem(),
            cert,
            key,
        }
    }

    pub fn issue_leaf(&self, common_name: &str) -> IssuedCert {
        let key = KeyPair::generate().expect("generate leaf key");
        let mut params =
            CertificateParams::new(vec![common_name.to_string()]).expect("leaf params");
        params.subject_alt_names = vec![SanType::IpAddress("127.0.0.1".parse().unwrap())];
        let cert = params
            .signed_by(&key, &self.cert, &self.key)
            .expect("sign leaf");
        IssuedCert {
            cert_pem: cert.pem(),
            key_pem: key.serialize_pem(),
        }
    }
}

/// Find a currently-unused TCP port on localhost. Racy in theory; standard
/// practice for integration tests that need to hand a port to a subprocess.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral port")
        .local_addr()
        .expect("local addr")
        .port()
}

/// A running `jobrunnerd` subprocess, bound to an ephemeral port with a
/// freshly generated server identity and trust anchor.
pub struct ServiceHarness {
    child: Child,
    pub base_url: String,
    pub ca: Ca,
    pub ca_cert_path: PathBuf,
    tmp: tempfile::TempDir,
}

impl ServiceHarness {
    pub fn start() -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        let ca = Ca::generate();
        let server_leaf = ca.issue_leaf("server");

        let ca_cert_path = tmp.path().join("ca.crt");
        let server_cert_path = tmp.path().join("server.crt");
        let server_key_path = tmp.path().join("server.key");
        std::fs::write(&ca_cert_path, &ca.cert_pem).unwrap();
        std::fs::write(&server_cert_path, &server_leaf.cert_pem).unwrap();
        std::fs::write(&server_key_path, &server_leaf.key_pem).unwrap();

        let port = free_port();
        let bind_addr = format!("127.0.0.1:{port}");

        let child = Command::new(env!("CARGO_BIN_EXE_jobrunnerd"))
            .arg("--bind")
            .arg(&bind_addr)
            .arg("--cert")
            .arg(&server_cert_path)
            .arg("--key")
            .arg(&server_key_path)
            .arg("--ca-cert")
            .arg(&ca_cert_path)
            .spawn()
            .expect("spawn jobrunnerd");

        wait_for_port(port);

        ServiceHarness {
            child,
            base_url: format!("https://{bind_addr}"),
            ca,
            ca_cert_path,
            tmp,
        }
    }

    /// Write a client identity signed by this harness's own CA (so the
    /// server will accept it) into the harness's temp directory, returning
    /// (cert_path, key_path).
    pub fn trusted_client_identity(&self, name: &str) -> (PathBuf, PathBuf) {
        write_identity(self.tmp.path(), name, &self.ca)
    }
}

impl Drop for ServiceHarness {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn wait_for_port(port: u16) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if std::net::TcpStream::connect(("127.0.0.1", port)).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("jobrunnerd did not start listening on port {port} in time");
}

/// Write a leaf certificate issued by `ca` into `dir`, returning
/// (cert_path, key_path).
pub fn write_identity(dir: &Path, name: &str, ca: &Ca) -> (PathBuf, PathBuf) {
    let leaf = ca.issue_leaf(name);
    let cert_path = dir.join(format!("{name}.crt"));
    let key_path = dir.join(format!("{name}.key"));
    std::fs::write(&cert_path, &leaf.cert_pem).unwrap();
    std::fs::write(&key_path, &leaf.key_pem).unwrap();
    (cert_path, key_path)
}
