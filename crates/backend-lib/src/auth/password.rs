// ============================
// edugame-backend/src/auth/password.rs
// ============================
//! Password hashing and verification.
//!
//! Hashes are Argon2id PHC strings. Verification reads the cost parameters
//! back out of the stored hash, so raising the configured cost only affects
//! new hashes.
use argon2::{
    password_hash::{
        self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use zeroize::Zeroize;

use crate::config::PasswordSettings;
use crate::error::AppError;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Input for the decoy hash; never a valid account password because it is
/// never stored.
const DECOY_PASSWORD: &str = "decoy-password-for-unknown-users";

/// One-way password hasher with a tunable cost
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    min_length: usize,
    /// Verified against when the account does not exist, so a miss costs
    /// as much as a wrong password.
    decoy_hash: String,
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("params", self.argon2.params())
            .field("min_length", &self.min_length)
            .finish()
    }
}

impl CredentialHasher {
    /// Build a hasher from configured cost parameters
    pub fn new(settings: &PasswordSettings) -> Result<Self, AppError> {
        let params = Params::new(
            settings.memory_kib,
            settings.iterations,
            settings.parallelism,
            None,
        )
        .map_err(|e| AppError::Config(format!("invalid argon2 parameters: {e}")))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let decoy_hash = Self::hash_with(&argon2, DECOY_PASSWORD)?;

        Ok(Self {
            argon2,
            min_length: settings.min_length,
            decoy_hash,
        })
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Hash a password. Each call uses a fresh salt.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        if password.chars().count() < self.min_length {
            return Err(AppError::WeakInput {
                min_length: self.min_length,
            });
        }
        Self::hash_with(&self.argon2, password)
    }

    /// Hash a password and zeroize the original
    pub fn hash_secure(&self, plain: &mut String) -> Result<String, AppError> {
        let hash = self.hash(plain);
        plain.zeroize();
        hash
    }

    /// Verify a password against a stored hash.
    ///
    /// A mismatch is `Ok(false)`; only an unusable hash is an error.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(hash).map_err(|_| AppError::CorruptHash)?;
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(_) => Err(AppError::CorruptHash),
        }
    }

    /// Burn the same work as a real verification and report failure
    pub fn verify_decoy(&self, password: &str) -> bool {
        let _ = self.verify(password, &self.decoy_hash);
        false
    }

    fn hash_with(argon2: &Argon2<'static>, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))?;
        Ok(hash.to_string())
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> CredentialHasher {
    CredentialHasher::new(&PasswordSettings {
        min_length: MIN_PASSWORD_LENGTH,
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}
