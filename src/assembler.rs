//! Fixture assembly and persistence
//!
//! Orchestrates the five issuance runs (trusted CA, server leaf, client leaf,
//! untrusted CA, untrusted client leaf) and writes the resulting keys and
//! certificates as PEM pairs under the output directory. The trusted and
//! untrusted chains share no key material or mutable state, so they are built
//! on two scoped threads; each chain is sequential internally.
//!
//! Failure at any stage is terminal. The error names the failing stage, and
//! callers must treat the output directory as invalid after a non-clean run.
//! CSRs are consumed in memory and never reach disk, and no serial-tracking or
//! extension files are left behind.
//!
//! # Example
//! ```no_run
//! use mtls_fixtures::assembler::FixtureAssembler;
//! # fn example() -> mtls_fixtures::error::Result<()> {
//! let manifest = FixtureAssembler::new("tests/tls").assemble()?;
//! println!("trust anchor: {}", manifest.ca.certificate.display());
//! # Ok(())
//! # }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use openssl::pkey::{PKey, Private};
use openssl::x509::X509;

use crate::authority::{CertificateAuthority, CertificateAuthorityBuilder, DEFAULT_CA_VALIDITY_DAYS};
use crate::error::{FixtureError, Result, Stage};
use crate::keypair;
use crate::leaf::{LeafCertificateBuilder, LeafRole};

const TRUSTED_CA_COMMON_NAME: &str = "test-ca";
const SERVER_COMMON_NAME: &str = "localhost";
const CLIENT_COMMON_NAME: &str = "test-client";
const UNTRUSTED_CA_COMMON_NAME: &str = "untrusted-ca";
const UNTRUSTED_CLIENT_COMMON_NAME: &str = "untrusted-client";

/// Paths of one identity's PEM-encoded private key and certificate.
#[derive(Debug, Clone)]
pub struct PemPair {
    /// PEM-encoded PKCS#8 private key
    pub key: PathBuf,
    /// PEM-encoded X.509 certificate
    pub certificate: PathBuf,
}

/// Paths of every artifact written by a successful fixture run.
///
/// Test harnesses load `ca.certificate` as the trust anchor, present the
/// `server` pair from a TLS listener and the `client` pair for mTLS, and use
/// the `untrusted_*` pairs to assert that connections with them are rejected.
#[derive(Debug, Clone)]
pub struct FixtureManifest {
    /// Trusted root (`ca.key` / `ca.crt`)
    pub ca: PemPair,
    /// Server leaf issued by the trusted CA (`server.key` / `server.crt`)
    pub server: PemPair,
    /// Client leaf issued by the trusted CA (`client.key` / `client.crt`)
    pub client: PemPair,
    /// Independent untrusted root (`untrusted-ca.key` / `untrusted-ca.crt`)
    pub untrusted_ca: PemPair,
    /// Client leaf issued by the untrusted CA (`untrusted-client.*`)
    pub untrusted_client: PemPair,
}

impl FixtureManifest {
    /// The five artifact pairs with their identity names, in issuance order.
    pub fn pairs(&self) -> [(&'static str, &PemPair); 5] {
        [
            ("ca", &self.ca),
            ("server", &self.server),
            ("client", &self.client),
            ("untrusted-ca", &self.untrusted_ca),
            ("untrusted-client", &self.untrusted_client),
        ]
    }
}

/// Builds the complete fixture set into an output directory.
pub struct FixtureAssembler {
    output_dir: PathBuf,
    validity_days: u32,
}

struct TrustedChain {
    ca: CertificateAuthority,
    server_key: PKey<Private>,
    server_cert: X509,
    client_key: PKey<Private>,
    client_cert: X509,
}

struct UntrustedChain {
    ca: CertificateAuthority,
    client_key: PKey<Private>,
    client_cert: X509,
}

impl FixtureAssembler {
    /// Create an assembler targeting `output_dir` (created if missing).
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            validity_days: DEFAULT_CA_VALIDITY_DAYS,
        }
    }

    /// Set the validity period, in days, applied to every certificate
    /// (default: 3650).
    pub fn validity_days(mut self, days: u32) -> Self {
        self.validity_days = days;
        self
    }

    /// Run all five issuances and persist the ten PEM artifacts.
    ///
    /// # Errors
    /// Any [`FixtureError`] aborts the run; issuance failures carry the
    /// failing [`Stage`], write failures carry the artifact path. No partial
    /// fixture set is usable after an error.
    pub fn assemble(&self) -> Result<FixtureManifest> {
        let days = self.validity_days;
        let (trusted, untrusted) = thread::scope(|scope| {
            let trusted = scope.spawn(move || build_trusted_chain(days));
            let untrusted = scope.spawn(move || build_untrusted_chain(days));
            (join_chain(trusted), join_chain(untrusted))
        });
        let trusted = trusted?;
        let untrusted = untrusted?;

        fs::create_dir_all(&self.output_dir).map_err(|source| FixtureError::Persistence {
            path: self.output_dir.clone(),
            source,
        })?;

        Ok(FixtureManifest {
            ca: self.write_pair("ca", trusted.ca.key(), trusted.ca.certificate())?,
            server: self.write_pair("server", &trusted.server_key, &trusted.server_cert)?,
            client: self.write_pair("client", &trusted.client_key, &trusted.client_cert)?,
            untrusted_ca: self.write_pair(
                "untrusted-ca",
                untrusted.ca.key(),
                untrusted.ca.certificate(),
            )?,
            untrusted_client: self.write_pair(
                "untrusted-client",
                &untrusted.client_key,
                &untrusted.client_cert,
            )?,
        })
    }

    /// Write one identity's key and certificate as `<stem>.key` / `<stem>.crt`.
    fn write_pair(&self, stem: &str, key: &PKey<Private>, cert: &X509) -> Result<PemPair> {
        let key_pem = key
            .private_key_to_pem_pkcs8()
            .map_err(|e| FixtureError::construction("failed to encode private key as PEM", e))?;
        let cert_pem = cert
            .to_pem()
            .map_err(|e| FixtureError::construction("failed to encode certificate as PEM", e))?;

        let key_path = self.output_dir.join(format!("{stem}.key"));
        write_artifact(&key_path, &key_pem)?;
        let cert_path = self.output_dir.join(format!("{stem}.crt"));
        write_artifact(&cert_path, &cert_pem)?;

        Ok(PemPair {
            key: key_path,
            certificate: cert_path,
        })
    }
}

fn write_artifact(path: &Path, pem: &[u8]) -> Result<()> {
    fs::write(path, pem).map_err(|source| FixtureError::Persistence {
        path: path.to_path_buf(),
        source,
    })
}

fn join_chain<T>(handle: thread::ScopedJoinHandle<'_, Result<T>>) -> Result<T> {
    handle
        .join()
        .map_err(|_| FixtureError::Construction("issuance task panicked".to_string()))?
}

fn build_trusted_chain(validity_days: u32) -> Result<TrustedChain> {
    let ca = CertificateAuthorityBuilder::new(
        keypair::generate().map_err(|e| e.at_stage(Stage::TrustedCa))?,
    )
    .common_name(TRUSTED_CA_COMMON_NAME.to_string())
    .validity_days(validity_days)
    .build()
    .map_err(|e| e.at_stage(Stage::TrustedCa))?;

    let server_key = keypair::generate().map_err(|e| e.at_stage(Stage::ServerLeaf))?;
    let server_cert = LeafCertificateBuilder::new(server_key.clone(), LeafRole::Server)
        .common_name(SERVER_COMMON_NAME.to_string())
        .validity_days(validity_days)
        .issue(&ca)
        .map_err(|e| e.at_stage(Stage::ServerLeaf))?;

    let client_key = keypair::generate().map_err(|e| e.at_stage(Stage::ClientLeaf))?;
    let client_cert = LeafCertificateBuilder::new(client_key.clone(), LeafRole::Client)
        .common_name(CLIENT_COMMON_NAME.to_string())
        .validity_days(validity_days)
        .issue(&ca)
        .map_err(|e| e.at_stage(Stage::ClientLeaf))?;

    Ok(TrustedChain {
        ca,
        server_key,
        server_cert,
        client_key,
        client_cert,
    })
}

fn build_untrusted_chain(validity_days: u32) -> Result<UntrustedChain> {
    let ca = CertificateAuthorityBuilder::new(
        keypair::generate().map_err(|e| e.at_stage(Stage::UntrustedCa))?,
    )
    .common_name(UNTRUSTED_CA_COMMON_NAME.to_string())
    .validity_days(validity_days)
    .build()
    .map_err(|e| e.at_stage(Stage::UntrustedCa))?;

    let client_key = keypair::generate().map_err(|e| e.at_stage(Stage::UntrustedClientLeaf))?;
    let client_cert = LeafCertificateBuilder::new(client_key.clone(), LeafRole::Client)
        .common_name(UNTRUSTED_CLIENT_COMMON_NAME.to_string())
        .validity_days(validity_days)
        .issue(&ca)
        .map_err(|e| e.at_stage(Stage::UntrustedClientLeaf))?;

    Ok(UntrustedChain {
        ca,
        client_key,
        client_cert,
    })
}
