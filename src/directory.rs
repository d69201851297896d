//! Directory accounts: password hashing and caller lookup.

use argon2::{
    Argon2,
    password_hash::{
        Error as HashError,
        PasswordHash,
        PasswordHasher,
        PasswordVerifier,
        SaltString,
        rand_core::OsRng,
    },
};
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::{
    access::Caller,
    db::{DbPool, PoolRunError, get_user_by_name, set_user_password},
};

/// Hash `pw` with a fresh salt.
///
/// # Errors
/// Returns any error raised by the hasher.
pub fn hash_password(argon2: &Argon2, pw: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(argon2.hash_password(pw.as_bytes(), &salt)?.to_string())
}

/// Check `pw` against a stored PHC string. Unparseable hashes never match.
#[must_use]
pub fn verify_password(hash: &str, pw: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(pw.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Directory lookup failures.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Hashing failed.
    #[error("password hashing failed: {0}")]
    Hash(HashError),
    /// No such account.
    #[error("unknown user \"{0}\"")]
    UnknownUser(String),
    /// Database failure.
    #[error(transparent)]
    Diesel(#[from] diesel::result::Error),
    /// Pool checkout failure.
    #[error(transparent)]
    Pool(#[from] PoolRunError),
}

/// Source of authenticated callers.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Resolve credentials to a caller, or `None` when they do not match.
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Caller>, DirectoryError>;

    /// Replace an account's password.
    async fn set_password(&self, username: &str, password: &str) -> Result<(), DirectoryError>;
}

/// Directory backed by the `users` table.
#[derive(Clone)]
pub struct DbDirectory {
    pool: DbPool,
    argon2: Argon2<'static>,
}

impl DbDirectory {
    /// Use `pool` for lookups and `argon2` for new hashes.
    #[must_use]
    pub const fn new(pool: DbPool, argon2: Argon2<'static>) -> Self { Self { pool, argon2 } }
}

#[async_trait]
impl Directory for DbDirectory {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Caller>, DirectoryError> {
        let mut conn = self.pool.get().await?;
        let Some(user) = get_user_by_name(&mut conn, username).await? else {
            debug!(username, "unknown user");
            return Ok(None);
        };
        if verify_password(&user.password, password) {
            Ok(Some(Caller::new(user.username, user.is_admin)))
        } else {
            debug!(username, "password mismatch");
            Ok(None)
        }
    }

    async fn set_password(&self, username: &str, password: &str) -> Result<(), DirectoryError> {
        let hashed = hash_password(&self.argon2, password).map_err(DirectoryError::Hash)?;
        let mut conn = self.pool.get().await?;
        match set_user_password(&mut conn, username, &hashed).await? {
            0 => Err(DirectoryError::UnknownUser(username.to_owned())),
            _ => Ok(()),
        }
    }
}
