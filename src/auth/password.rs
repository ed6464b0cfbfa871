use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::error;

use crate::config::{ConfigError, PasswordCost};

const DUMMY_PASSWORD: &str = "todolist-unknown-account";

/// Argon2id hashing with a fixed cost. The salt and parameters are embedded
/// in the PHC string, so verification needs nothing but the stored hash.
#[derive(Clone)]
pub struct PasswordHashing {
    argon2: Argon2<'static>,
    /// Hash of a throwaway password at the configured cost, verified against
    /// when the account does not exist.
    dummy_hash: Arc<str>,
    #[cfg(test)]
    verifications: Arc<AtomicUsize>,
}

impl PasswordHashing {
    pub fn new(cost: PasswordCost) -> Result<Self, ConfigError> {
        let params = Params::new(cost.m_cost, cost.t_cost, cost.p_cost, None).map_err(|e| {
            ConfigError::Invalid {
                key: "ARGON2_*_COST",
                reason: e.to_string(),
            }
        })?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_hash = argon2
            .hash_password(DUMMY_PASSWORD.as_bytes(), &SaltString::generate(&mut OsRng))
            .map_err(|e| ConfigError::Invalid {
                key: "ARGON2_*_COST",
                reason: e.to_string(),
            })?
            .to_string();
        Ok(Self {
            argon2,
            dummy_hash: dummy_hash.into(),
            #[cfg(test)]
            verifications: Arc::default(),
        })
    }

    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
    pub fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        #[cfg(test)]
        self.verifications.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .argon2
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }

    pub async fn hash_blocking(&self, plain: String) -> anyhow::Result<String> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.hash(&plain)).await?
    }

    pub async fn verify_blocking(&self, plain: String, hash: String) -> anyhow::Result<bool> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.verify(&plain, &hash)).await?
    }

    /// Burns one verification on the dummy hash. The outcome is discarded.
    pub async fn verify_dummy_blocking(&self, plain: String) -> anyhow::Result<()> {
        let hash = self.dummy_hash.to_string();
        self.verify_blocking(plain, hash).await.map(|_| ())
    }

    #[cfg(test)]
    pub fn verifications(&self) -> usize {
        self.verifications.load(Ordering::Relaxed)
    }
}
