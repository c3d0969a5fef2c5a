//! Account registration and login.

use crate::dao::factory::DaoFactory;
use crate::dao::{DaoResult, RecordDao};
use crate::model::user::{NewUser, Role, User};
use crate::secrets::SecretHasher;
use std::sync::Arc;

pub struct AccountService<'f> {
    factory: &'f dyn DaoFactory,
    hasher: Arc<dyn SecretHasher>,
}

impl<'f> AccountService<'f> {
    pub fn new(factory: &'f dyn DaoFactory, hasher: Arc<dyn SecretHasher>) -> Self {
        Self { factory, hasher }
    }

    /// Hashes `plaintext` and creates the account.
    ///
    /// A taken email surfaces as `DaoError::Conflict`.
    pub fn register(&self, email: &str, plaintext: &str, name: &str, role: Role) -> DaoResult<User> {
        let password_hash = self.hasher.hash(plaintext)?;
        self.factory.user_dao()?.create(&NewUser {
            email: email.to_string(),
            password_hash,
            name: name.to_string(),
            role,
        })
    }

    /// Returns the account when the credentials match, `None` otherwise.
    pub fn login(&self, email: &str, plaintext: &str) -> DaoResult<Option<User>> {
        self.factory.user_dao()?.validate_login(email, plaintext)
    }
}
