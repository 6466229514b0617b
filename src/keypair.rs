//! RSA key pair generation
//!
//! Every identity in the fixture set (two CAs, three leaves) owns its own key
//! pair, generated here. The key size is fixed: fixtures are regenerated for
//! every test run, so 2048-bit keys keep generation fast while remaining
//! acceptable to default TLS stacks.

use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;

use crate::error::{FixtureError, Result};

const RSA_KEY_SIZE: u32 = 2048;

/// Generate a fresh RSA key pair.
///
/// # Errors
/// Returns [`FixtureError::KeyGeneration`] if the underlying library fails;
/// this is fatal for the whole run, since a fixture with a missing key is
/// unusable for testing.
pub fn generate() -> Result<PKey<Private>> {
    let rsa = Rsa::generate(RSA_KEY_SIZE).map_err(FixtureError::KeyGeneration)?;
    PKey::from_rsa(rsa).map_err(FixtureError::KeyGeneration)
}
