//! Leaf certificate issuance
//!
//! Issues the end-entity certificates of the fixture set: the TLS server leaf
//! and the mTLS client leaves. Issuance always goes through a CSR, built and
//! self-attested by the leaf's own key and verified before signing, and the
//! resulting certificate is signed with the issuing CA's private key.
//!
//! # Role extensions
//! - **Server**: `keyUsage(digitalSignature, keyEncipherment)`,
//!   `extendedKeyUsage(serverAuth)`, and a SAN of exactly
//!   `DNS:localhost, IP:127.0.0.1, IP:::1` so a loopback TLS listener
//!   validates without hostname mismatches.
//! - **Client**: `keyUsage(digitalSignature)`, `extendedKeyUsage(clientAuth)`
//!   marking the leaf for mutual-TLS client authentication.
//!
//! # Example
//! ```no_run
//! use mtls_fixtures::authority::CertificateAuthorityBuilder;
//! use mtls_fixtures::leaf::{LeafCertificateBuilder, LeafRole};
//! use mtls_fixtures::keypair;
//! # fn example() -> mtls_fixtures::error::Result<()> {
//! let ca = CertificateAuthorityBuilder::new(keypair::generate()?)
//!     .common_name("test-ca".to_string())
//!     .build()?;
//!
//! let server_key = keypair::generate()?;
//! let server_cert = LeafCertificateBuilder::new(server_key.clone(), LeafRole::Server)
//!     .common_name("localhost".to_string())
//!     .issue(&ca)?;
//! # Ok(())
//! # }
//! ```

use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::x509::extension::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAlternativeName,
};
use openssl::x509::X509;

use crate::authority::CertificateAuthority;
use crate::error::{FixtureError, Result};
use crate::request;

const X509_VERSION_3: i32 = 2; // X509 version 3 is represented by 2

/// Default leaf validity: same 10-year policy as the CAs, so fixtures never
/// expire mid-run.
pub const DEFAULT_LEAF_VALIDITY_DAYS: u32 = 3650;

/// The role a leaf certificate plays in the TLS handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafRole {
    /// TLS server endpoint (loopback SAN, serverAuth)
    Server,
    /// mTLS client endpoint (clientAuth)
    Client,
}

/// Builder for a leaf certificate signed by a [`CertificateAuthority`].
pub struct LeafCertificateBuilder {
    key_pair: PKey<Private>,
    role: LeafRole,
    common_name: String,
    validity_days: u32,
}

impl LeafCertificateBuilder {
    /// Create a builder around the leaf's own key pair and role.
    pub fn new(key_pair: PKey<Private>, role: LeafRole) -> Self {
        Self {
            key_pair,
            role,
            common_name: String::new(),
            validity_days: DEFAULT_LEAF_VALIDITY_DAYS,
        }
    }

    /// Set the common name (CN) for the leaf. Must be non-empty.
    pub fn common_name(mut self, cn: String) -> Self {
        self.common_name = cn;
        self
    }

    /// Set validity period in days (default: 3650).
    pub fn validity_days(mut self, days: u32) -> Self {
        self.validity_days = days;
        self
    }

    /// Issue the leaf certificate, signed by `ca`.
    ///
    /// Builds and verifies a CSR for the leaf, constructs the certificate body
    /// (issuer taken from the CA certificate, serial from the CA's counter,
    /// CA=false), applies the role extensions, and signs with the CA key.
    ///
    /// # Errors
    /// Returns [`FixtureError::Construction`] on an empty common name, a CSR
    /// that fails self-verification, or any construction/signing failure.
    /// Fatal: a partially built fixture set must not be accepted by tests.
    pub fn issue(self, ca: &CertificateAuthority) -> Result<X509> {
        let csr = request::build(&self.common_name, &self.key_pair)?;
        request::verify(&csr)?;

        let mut builder = X509::builder()
            .map_err(|e| FixtureError::construction("failed to create X509 builder", e))?;
        builder
            .set_version(X509_VERSION_3)
            .map_err(|e| FixtureError::construction("failed to set version", e))?;
        let serial = ca.next_serial()?;
        builder
            .set_serial_number(&serial)
            .map_err(|e| FixtureError::construction("failed to set serial number", e))?;

        // Subject and public key come from the verified request.
        builder
            .set_subject_name(csr.subject_name())
            .map_err(|e| FixtureError::construction("failed to set subject", e))?;
        let csr_public_key = csr
            .public_key()
            .map_err(|e| FixtureError::construction("failed to read request public key", e))?;
        builder
            .set_pubkey(&csr_public_key)
            .map_err(|e| FixtureError::construction("failed to set public key", e))?;
        builder
            .set_issuer_name(ca.certificate().subject_name())
            .map_err(|e| FixtureError::construction("failed to set issuer from CA", e))?;

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

        // End-entity: CA=false.
        let bc = BasicConstraints::new()
            .critical()
            .build()
            .map_err(|e| FixtureError::construction("failed to build BasicConstraints", e))?;
        builder
            .append_extension(bc)
            .map_err(|e| FixtureError::construction("failed to add BasicConstraints", e))?;

        match self.role {
            LeafRole::Server => {
                let ku = KeyUsage::new()
                    .critical()
                    .digital_signature()
                    .key_encipherment()
                    .build()
                    .map_err(|e| FixtureError::construction("failed to build KeyUsage", e))?;
                builder
                    .append_extension(ku)
                    .map_err(|e| FixtureError::construction("failed to add KeyUsage", e))?;

                let eku = ExtendedKeyUsage::new()
                    .server_auth()
                    .build()
                    .map_err(|e| FixtureError::construction("failed to build ExtendedKeyUsage", e))?;
                builder
                    .append_extension(eku)
                    .map_err(|e| FixtureError::construction("failed to add ExtendedKeyUsage", e))?;

                // Loopback SAN set, exactly these three entries.
                let san = SubjectAlternativeName::new()
                    .dns("localhost")
                    .ip("127.0.0.1")
                    .ip("::1")
                    .build(&builder.x509v3_context(Some(ca.certificate()), None))
                    .map_err(|e| {
                        FixtureError::construction("failed to build SubjectAlternativeName", e)
                    })?;
                builder
                    .append_extension(san)
                    .map_err(|e| {
                        FixtureError::construction("failed to add SubjectAlternativeName", e)
                    })?;
            }
            LeafRole::Client => {
                let ku = KeyUsage::new()
                    .critical()
                    .digital_signature()
                    .build()
                    .map_err(|e| FixtureError::construction("failed to build KeyUsage", e))?;
                builder
                    .append_extension(ku)
                    .map_err(|e| FixtureError::construction("failed to add KeyUsage", e))?;

                let eku = ExtendedKeyUsage::new()
                    .client_auth()
                    .build()
                    .map_err(|e| FixtureError::construction("failed to build ExtendedKeyUsage", e))?;
                builder
                    .append_extension(eku)
                    .map_err(|e| FixtureError::construction("failed to add ExtendedKeyUsage", e))?;
            }
        }

        builder
            .sign(ca.key(), MessageDigest::sha256())
            .map_err(|e| FixtureError::construction("failed to sign certificate", e))?;

        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::CertificateAuthorityBuilder;
    use crate::keypair;

    fn build_ca(cn: &str) -> CertificateAuthority {
        CertificateAuthorityBuilder::new(keypair::generate().unwrap())
            .common_name(cn.to_string())
            .build()
            .unwrap()
    }

    fn issue(ca: &CertificateAuthority, role: LeafRole, cn: &str) -> (PKey<Private>, X509) {
        let key = keypair::generate().unwrap();
        let cert = LeafCertificateBuilder::new(key.clone(), role)
            .common_name(cn.to_string())
            .issue(ca)
            .unwrap();
        (key, cert)
    }

    #[test]
    fn leaf_verifies_against_its_ca_only() {
        let ca = build_ca("test-ca");
        let other_ca = build_ca("other-ca");
        let (_, cert) = issue(&ca, LeafRole::Server, "localhost");

        let ca_key = ca.certificate().public_key().unwrap();
        let other_key = other_ca.certificate().public_key().unwrap();
        assert!(cert.verify(&ca_key).unwrap());
        assert!(!cert.verify(&other_key).unwrap());
    }

    #[test]
    fn leaf_key_matches_certificate() {
        let ca = build_ca("test-ca");
        let (key, cert) = issue(&ca, LeafRole::Client, "test-client");
        assert!(cert.public_key().unwrap().public_eq(&key));
    }

    #[test]
    fn leaf_is_not_a_ca_and_names_its_issuer() {
        let ca = build_ca("test-ca");
        let (_, cert) = issue(&ca, LeafRole::Client, "test-client");

        let text = String::from_utf8(cert.to_text().unwrap()).unwrap();
        assert!(text.contains("CA:FALSE"));

        let issuer = cert.issuer_name().to_der().unwrap();
        let ca_subject = ca.certificate().subject_name().to_der().unwrap();
        assert_eq!(issuer, ca_subject);
    }

    #[test]
    fn server_leaf_carries_exact_loopback_san() {
        let ca = build_ca("test-ca");
        let (_, cert) = issue(&ca, LeafRole::Server, "localhost");

        let san = cert.subject_alt_names().unwrap();
        assert_eq!(san.len(), 3);
        let dns: Vec<&str> = san.iter().filter_map(|n| n.dnsname()).collect();
        let ips: Vec<&[u8]> = san.iter().filter_map(|n| n.ipaddress()).collect();
        assert_eq!(dns, vec!["localhost"]);
        assert_eq!(ips.len(), 2);
        assert!(ips.contains(&[127, 0, 0, 1].as_slice()));
        let v6_loopback: [u8; 16] = std::net::Ipv6Addr::LOCALHOST.octets();
        assert!(ips.contains(&v6_loopback.as_slice()));
    }

    #[test]
    fn server_leaf_carries_server_auth() {
        let ca = build_ca("test-ca");
        let (_, cert) = issue(&ca, LeafRole::Server, "localhost");
        let text = String::from_utf8(cert.to_text().unwrap()).unwrap();
        assert!(text.contains("TLS Web Server Authentication"));
    }

    #[test]
    fn client_leaf_carries_client_auth_and_no_san() {
        let ca = build_ca("test-ca");
        let (_, cert) = issue(&ca, LeafRole::Client, "test-client");
        let text = String::from_utf8(cert.to_text().unwrap()).unwrap();
        assert!(text.contains("TLS Web Client Authentication"));
        assert!(cert.subject_alt_names().is_none());
    }

    #[test]
    fn serials_are_unique_per_ca() {
        let ca = build_ca("test-ca");
        let (_, a) = issue(&ca, LeafRole::Server, "localhost");
        let (_, b) = issue(&ca, LeafRole::Client, "test-client");
        let serial_a = a.serial_number().to_bn().unwrap();
        let serial_b = b.serial_number().to_bn().unwrap();
        let serial_root = ca.certificate().serial_number().to_bn().unwrap();
        assert_ne!(serial_a, serial_b);
        assert_ne!(serial_a, serial_root);
        assert_ne!(serial_b, serial_root);
    }
}
