//! Secret hashing primitive consumed by the user DAO.
//!
//! # Invariants
//! - Digests are argon2id PHC strings.
//! - `verify` never panics and treats unparsable digests as a mismatch.
//! - `decoy_digest` lets callers spend one verification even when there is
//!   no stored digest to check.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashError(String);

impl Display for HashError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "secret hashing failed: {}", self.0)
    }
}

impl Error for HashError {}

pub trait SecretHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, HashError>;
    fn verify(&self, digest: &str, plaintext: &str) -> bool;
    /// A valid digest of an unguessable secret.
    fn decoy_digest(&self) -> &str;
}

pub struct Argon2SecretHasher {
    argon2: Argon2<'static>,
    decoy: String,
}

impl Argon2SecretHasher {
    /// argon2id with the crate's recommended cost parameters.
    pub fn new() -> Result<Self, HashError> {
        Self::from_argon2(Argon2::default())
    }

    /// argon2id with explicit cost parameters (memory KiB, iterations, lanes).
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, HashError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|err| HashError(format!("argon2 params: {err}")))?;
        Self::from_argon2(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    fn from_argon2(argon2: Argon2<'static>) -> Result<Self, HashError> {
        let decoy = hash_with(&argon2, &Uuid::new_v4().to_string())?;
        Ok(Self { argon2, decoy })
    }
}

impl SecretHasher for Argon2SecretHasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        hash_with(&self.argon2, plaintext)
    }

    fn verify(&self, digest: &str, plaintext: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    fn decoy_digest(&self) -> &str {
        &self.decoy
    }
}

impl Debug for Argon2SecretHasher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argon2SecretHasher").finish_non_exhaustive()
    }
}

fn hash_with(argon2: &Argon2<'static>, plaintext: &str) -> Result<String, HashError> {
    if plaintext.is_empty() {
        return Err(HashError("secret is empty".to_string()));
    }
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| HashError(format!("argon2 hash: {err}")))
}
