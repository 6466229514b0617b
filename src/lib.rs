//! mTLS Fixtures - Disposable PKI Generation for TLS Tests
//!
//! Generates a miniature public-key infrastructure for exercising TLS and
//! mutual-TLS code paths in tests: a trusted root CA, a server leaf and a
//! client leaf signed by it, plus an independent untrusted CA and client leaf
//! used to assert that code under test rejects certificates from an authority
//! it does not trust.
//!
//! ```text
//! test-ca (self-signed)                untrusted-ca (self-signed)
//!   ├── localhost      (server leaf)     └── untrusted-client (client leaf)
//!   └── test-client    (client leaf)
//! ```
//!
//! Everything is RSA, SHA-256 signed, and PEM-encoded. The artifacts are
//! throwaway test fixtures: there is no revocation, renewal, or secure key
//! storage, and every run generates fresh key material and serial numbers.
//!
//! # Quick start
//!
//! ```no_run
//! use mtls_fixtures::assembler::FixtureAssembler;
//!
//! fn main() -> anyhow::Result<()> {
//!     let manifest = FixtureAssembler::new("tests/tls").assemble()?;
//!     // Load manifest.ca.certificate as the trust anchor, present the
//!     // server pair from a TLS listener and the client pair for mTLS.
//!     println!("wrote {}", manifest.server.certificate.display());
//!     Ok(())
//! }
//! ```
//!
//! # Module overview
//!
//! - [`keypair`]: RSA key pair generation, one pair per identity.
//! - [`authority`]: self-signed root CA construction with a CA-scoped serial
//!   counter.
//! - [`request`]: transient, self-attested certificate signing requests.
//! - [`leaf`]: leaf issuance with role-specific extensions (loopback SAN for
//!   servers, clientAuth for clients).
//! - [`assembler`]: orchestrates the five issuances and writes the ten PEM
//!   artifacts.
//! - [`error`]: the [`error::FixtureError`] taxonomy. Every failure is fatal;
//!   a non-clean run leaves no usable fixtures.

pub mod assembler;
pub mod authority;
pub mod error;
pub mod keypair;
pub mod leaf;
pub mod request;

pub use assembler::{FixtureAssembler, FixtureManifest, PemPair};
pub use error::{FixtureError, Result, Stage};
