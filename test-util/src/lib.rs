//! Utilities for integration tests.
//!
//! The `test-util` crate builds throwaway helpdesk databases seeded with a
//! known catalog and directory. `SQLite` databases live in a temporary
//! directory; `PostgreSQL` tests run against the server named by
//! [`postgres::TEST_URL_ENV`] and are skipped when it is unset.

#[cfg(all(feature = "sqlite", feature = "postgres", not(feature = "lint")))]
compile_error!("Choose either sqlite or postgres, not both");

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("Either feature 'sqlite' or 'postgres' must be enabled");

use std::fmt;

pub mod bdd_helpers;
pub mod fixtures;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use bdd_helpers::{SetupFn, TestDb, build_test_db_async};
pub use fixtures::{ACCOUNTS, PASSWORD, setup_helpdesk_db, with_db};

/// Error type returned by fixture helpers.
pub type AnyError = anyhow::Error;

/// Newtype wrapping a database connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseUrl(String);

impl DatabaseUrl {
    /// Constructs a new database URL from any string-like type.
    pub fn new(url: impl Into<String>) -> Self { Self(url.into()) }
    /// Returns the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for DatabaseUrl {
    fn from(value: &str) -> Self { Self(value.to_owned()) }
}

impl From<String> for DatabaseUrl {
    fn from(value: String) -> Self { Self(value) }
}

impl AsRef<str> for DatabaseUrl {
    fn as_ref(&self) -> &str { &self.0 }
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}
