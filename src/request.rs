//! Certificate signing requests
//!
//! A CSR binds a leaf's subject name to its public key and is self-signed with
//! the leaf's private key, proving possession of the key. CSRs here are
//! transient: the issuer consumes them in memory and they are never written to
//! disk. Every leaf, including the untrusted-chain client, goes through the
//! same CSR path.

use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::x509::{X509Req, X509ReqBuilder};

use crate::authority::common_name_entry;
use crate::error::{FixtureError, Result};

/// Build a CSR for `common_name`, self-signed with `key_pair`.
///
/// # Errors
/// Returns [`FixtureError::Construction`] if the common name is empty or any
/// request-building step fails.
pub fn build(common_name: &str, key_pair: &PKey<Private>) -> Result<X509Req> {
    if common_name.is_empty() {
        return Err(FixtureError::Construction(
            "leaf subject common name must not be empty".to_string(),
        ));
    }

    let mut builder = X509ReqBuilder::new()
        .map_err(|e| FixtureError::construction("failed to create request builder", e))?;
    let subject = common_name_entry(common_name)?;
    builder
        .set_subject_name(&subject)
        .map_err(|e| FixtureError::construction("failed to set request subject", e))?;
    builder
        .set_pubkey(key_pair)
        .map_err(|e| FixtureError::construction("failed to set request public key", e))?;
    builder
        .sign(key_pair, MessageDigest::sha256())
        .map_err(|e| FixtureError::construction("failed to sign request", e))?;
    Ok(builder.build())
}

/// Check the CSR's self-signature against its embedded public key.
///
/// A request that does not verify is malformed and must not be signed.
pub fn verify(request: &X509Req) -> Result<()> {
    let public_key = request
        .public_key()
        .map_err(|e| FixtureError::construction("failed to read request public key", e))?;
    let verified = request
        .verify(&public_key)
        .map_err(|e| FixtureError::construction("failed to verify request signature", e))?;
    if !verified {
        return Err(FixtureError::Construction(
            "signing request signature does not match its public key".to_string(),
        ));
    }
    Ok(())
}
