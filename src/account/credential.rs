//! Credential hashing.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;

/// Hash and check credential secrets. Plaintext never reaches storage.
pub trait CredentialHasher: Send + Sync {
    /// # Errors
    /// Fails only on hasher misconfiguration.
    fn hash(&self, secret: &str) -> Result<String>;

    /// `Ok(false)` for a wrong secret; errors are reserved for unusable hashes.
    ///
    /// # Errors
    /// Fails when `stored` is not a valid PHC string.
    fn verify_credential(&self, secret: &str, stored: &str) -> Result<bool>;
}

/// Argon2id. Verification reads the parameters embedded in the stored hash,
/// so changing them only affects new hashes.
#[derive(Clone, Debug, Default)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Fails when the parameters are out of argon2's accepted ranges.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|err| anyhow!("invalid argon2 parameters: {err}"))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|err| anyhow!("failed to hash credential: {err}"))?;
        Ok(hash.to_string())
    }

    fn verify_credential(&self, secret: &str, stored: &str) -> Result<bool> {
        let parsed =
            PasswordHash::new(stored).map_err(|err| anyhow!("invalid stored credential: {err}"))?;
        match self.argon2().verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(anyhow!("failed to verify credential: {err}")),
        }
    }
}

/// Minimum-cost hasher for tests.
#[cfg(test)]
pub(crate) fn fast_hasher() -> Argon2Hasher {
    Argon2Hasher::with_params(8, 1, 1).unwrap_or_default()
}
