use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::config::HashConfig;

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct HashingError(pub String);

/// Argon2id hasher with fixed cost parameters. Output is a PHC string
/// that embeds the algorithm, the parameters and the per-call salt.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    pub fn new(cfg: &HashConfig) -> Result<Self, HashingError> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| HashingError(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash_blocking(&self, plain: &str) -> Result<String, HashingError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                HashingError(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    pub fn verify_blocking(&self, plain: &str, stored: &str) -> Result<bool, HashingError> {
        let parsed = PasswordHash::new(stored).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            HashingError(e.to_string())
        })?;
        Ok(self
            .argon2
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }

    /// Hashes on the blocking pool so the runtime threads stay free.
    pub async fn hash(&self, plain: &str) -> Result<String, HashingError> {
        let this = self.clone();
        let plain = plain.to_owned();
        tokio::task::spawn_blocking(move || this.hash_blocking(&plain))
            .await
            .map_err(|e| HashingError(e.to_string()))?
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub async fn verify(&self, plain: &str, stored: &str) -> Result<bool, HashingError> {
        let this = self.clone();
        let plain = plain.to_owned();
        let stored = stored.to_owned();
        tokio::task::spawn_blocking(move || this.verify_blocking(&plain, &stored))
            .await
            .map_err(|e| HashingError(e.to_string()))?
    }
}
