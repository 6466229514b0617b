//! Root CA construction
//!
//! Builds the self-signed root certificates that anchor each fixture chain.
//! A fixture run produces two of these: the trusted CA that signs the server
//! and client leaves, and a fully independent untrusted CA used to exercise
//! rejection paths. The two share no key material by construction.
//!
//! # Certificate properties
//! - **Self-signed**: issuer and subject are the same
//! - **Basic Constraints**: CA=true, pathlen=0 (signs leaves only)
//! - **Key Usage**: keyCertSign, cRLSign, digitalSignature
//! - **Validity**: 3650 days by default, long enough to outlive any test run
//!
//! # Example
//! ```no_run
//! use mtls_fixtures::authority::CertificateAuthorityBuilder;
//! use mtls_fixtures::keypair;
//! # fn example() -> mtls_fixtures::error::Result<()> {
//! let ca = CertificateAuthorityBuilder::new(keypair::generate()?)
//!     .common_name("test-ca".to_string())
//!     .validity_days(3650)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::x509::extension::{BasicConstraints, KeyUsage};
use openssl::x509::{X509, X509Name};

use crate::error::{FixtureError, Result};

const X509_VERSION_3: i32 = 2; // X509 version 3 is represented by 2
const CA_PATH_LENGTH: u32 = 0;

/// Default CA validity: 10 years, chosen to outlive any test run.
pub const DEFAULT_CA_VALIDITY_DAYS: u32 = 3650;

/// A root certificate authority: its key pair, self-signed certificate, and
/// the serial-number counter for certificates it issues.
///
/// The counter is scoped to this CA instance (there is no shared or on-disk
/// serial state) and starts at a random 64-bit value, so serials are unique
/// within a CA and differ between independent runs. The root certificate
/// itself consumes the first serial.
pub struct CertificateAuthority {
    key: PKey<Private>,
    certificate: X509,
    next_serial: AtomicU64,
}

impl CertificateAuthority {
    /// The CA's private key, used to sign issued certificates.
    pub fn key(&self) -> &PKey<Private> {
        &self.key
    }

    /// The self-signed root certificate.
    pub fn certificate(&self) -> &X509 {
        &self.certificate
    }

    /// Take the next serial number from this CA's counter.
    pub(crate) fn next_serial(&self) -> Result<Asn1Integer> {
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        serial_to_asn1(serial)
    }
}

impl std::fmt::Debug for CertificateAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subject: Vec<String> = self
            .certificate
            .subject_name()
            .entries()
            .filter_map(|e| e.data().as_utf8().ok())
            .map(|s| s.to_string())
            .collect();
        f.debug_struct("CertificateAuthority")
            .field("subject", &subject.join(", "))
            .field("key", &"<private>")
            .finish()
    }
}

/// Builder for a self-signed root CA certificate.
///
/// Produces a [`CertificateAuthority`] whose certificate is signed with its
/// own private key over a body containing its own public key.
pub struct CertificateAuthorityBuilder {
    key_pair: PKey<Private>,
    common_name: String,
    validity_days: u32,
}

impl CertificateAuthorityBuilder {
    /// Create a builder around the CA's key pair.
    pub fn new(key_pair: PKey<Private>) -> Self {
        Self {
            key_pair,
            common_name: String::new(),
            validity_days: DEFAULT_CA_VALIDITY_DAYS,
        }
    }

    /// Set the common name (CN) identifying this CA. Must be non-empty.
    pub fn common_name(mut self, cn: String) -> Self {
        self.common_name = cn;
        self
    }

    /// Set validity period in days (default: 3650).
    pub fn validity_days(mut self, days: u32) -> Self {
        self.validity_days = days;
        self
    }

    /// Build the self-signed root certificate.
    ///
    /// # Errors
    /// Returns [`FixtureError::Construction`] if the common name is empty or
    /// any X.509 construction or signing step fails. No retries: this is a
    /// pure construction, and a failed CA aborts the whole fixture run.
    pub fn build(self) -> Result<CertificateAuthority> {
        if self.common_name.is_empty() {
            return Err(FixtureError::Construction(
                "CA subject common name must not be empty".to_string(),
            ));
        }

        let next_serial = AtomicU64::new(random_serial_start()?);
        let root_serial = serial_to_asn1(next_serial.fetch_add(1, Ordering::Relaxed))?;

        let mut builder =
            X509::builder().map_err(|e| FixtureError::construction("failed to create X509 builder", e))?;
        builder
            .set_version(X509_VERSION_3)
            .map_err(|e| FixtureError::construction("failed to set version", e))?;
        builder
            .set_serial_number(&root_serial)
            .map_err(|e| FixtureError::construction("failed to set serial number", e))?;

        let name = common_name_entry(&self.common_name)?;
        builder
            .set_subject_name(&name)
            .map_err(|e| FixtureError::construction("failed to set subject", e))?;
        // Self-signed: issuer equals subject.
        builder
            .set_issuer_name(&name)
            .map_err(|e| FixtureError::construction("failed to set issuer", e))?;

        let not_before = Asn1Time::days_from_now(0)
            .map_err(|e| FixtureError::construction("failed to create not_before", e))?;
        builder
            .set_not_before(&not_before)
            .map_err(|e| FixtureError::construction("failed to set not_before", e))?;
        let not_after = Asn1Time::days_from_now(self.validity_days)
            .map_err(|e| FixtureError::construction("failed to create not_after", e))?;
        builder
            .set_not_after(&not_after)
            .map_err(|e| FixtureError::construction("failed to set not_after", e))?;

        builder
            .set_pubkey(&self.key_pair)
            .map_err(|e| FixtureError::construction("failed to set public key", e))?;

        let bc = BasicConstraints::new()
            .critical()
            .ca()
            .pathlen(CA_PATH_LENGTH)
            .build()
            .map_err(|e| FixtureError::construction("failed to build BasicConstraints", e))?;
        builder
            .append_extension(bc)
            .map_err(|e| FixtureError::construction("failed to add BasicConstraints", e))?;

        let ku = KeyUsage::new()
            .critical()
            .key_cert_sign()
            .crl_sign()
            .digital_signature()
            .build()
            .map_err(|e| FixtureError::construction("failed to build KeyUsage", e))?;
        builder
            .append_extension(ku)
            .map_err(|e| FixtureError::construction("failed to add KeyUsage", e))?;

        builder
            .sign(&self.key_pair, MessageDigest::sha256())
            .map_err(|e| FixtureError::construction("failed to sign certificate", e))?;

        Ok(CertificateAuthority {
            key: self.key_pair,
            certificate: builder.build(),
            next_serial,
        })
    }
}

/// Build an X.509 name holding a single CN entry.
pub(crate) fn common_name_entry(cn: &str) -> Result<X509Name> {
    let mut name_builder = X509Name::builder()
        .map_err(|e| FixtureError::construction("failed to create name builder", e))?;
    name_builder
        .append_entry_by_nid(Nid::COMMONNAME, cn)
        .map_err(|e| FixtureError::construction("failed to set CN", e))?;
    Ok(name_builder.build())
}

/// Random starting point for a CA's serial counter, mirroring what
/// `openssl -CAcreateserial` seeded into the `.srl` file. The top bit is
/// cleared to keep the value positive with headroom for increments.
fn random_serial_start() -> Result<u64> {
    let mut bytes = [0u8; 8];
    openssl::rand::rand_bytes(&mut bytes).map_err(FixtureError::KeyGeneration)?;
    Ok(u64::from_be_bytes(bytes) >> 1)
}

fn serial_to_asn1(serial: u64) -> Result<Asn1Integer> {
    let bn = BigNum::from_slice(&serial.to_be_bytes())
        .map_err(|e| FixtureError::construction("failed to build serial number", e))?;
    bn.to_asn1_integer()
        .map_err(|e| FixtureError::construction("failed to convert serial number", e))
}
