//! Error types for fixture generation
//!
//! Every failure here is fatal: a partially built PKI must never be handed to a
//! test run, so nothing is retried and callers are expected to discard the
//! output directory on any error.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`FixtureError`]
pub type Result<T> = std::result::Result<T, FixtureError>;

/// The issuance stage at which a fixture build failed.
///
/// Stages run in this order; the trusted chain (CA, server, client) and the
/// untrusted chain (CA, client) are independent and may execute concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Building the trusted root CA
    TrustedCa,
    /// Issuing the server leaf from the trusted CA
    ServerLeaf,
    /// Issuing the client leaf from the trusted CA
    ClientLeaf,
    /// Building the untrusted root CA
    UntrustedCa,
    /// Issuing the client leaf from the untrusted CA
    UntrustedClientLeaf,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::TrustedCa => "trusted CA",
            Stage::ServerLeaf => "server leaf",
            Stage::ClientLeaf => "client leaf",
            Stage::UntrustedCa => "untrusted CA",
            Stage::UntrustedClientLeaf => "untrusted client leaf",
        };
        f.write_str(name)
    }
}

/// Error type covering all fixture-generation failure modes
#[derive(Error, Debug)]
pub enum FixtureError {
    /// RSA key generation failed (entropy or library failure)
    #[error("key generation failed: {0}")]
    KeyGeneration(#[source] openssl::error::ErrorStack),

    /// Certificate or CSR construction failed (empty subject, signing or
    /// extension failure, CSR signature mismatch)
    #[error("construction error: {0}")]
    Construction(String),

    /// An artifact could not be written to the output directory
    #[error("failed to write {}: {source}", path.display())]
    Persistence {
        /// Path of the artifact that could not be written
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Wrapper surfacing which issuance stage a failure occurred in
    #[error("fixture build failed at the {stage} stage: {source}")]
    Stage {
        /// Stage that was executing when the error occurred
        stage: Stage,
        /// The underlying failure
        source: Box<FixtureError>,
    },
}

impl FixtureError {
    /// Attach the issuance stage to an error bubbling out of the assembler.
    pub(crate) fn at_stage(self, stage: Stage) -> Self {
        FixtureError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    pub(crate) fn construction(context: &str, err: openssl::error::ErrorStack) -> Self {
        FixtureError::Construction(format!("{context}: {err}"))
    }
}
