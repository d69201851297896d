//! Backend-specific connection types and the shared pool.
//!
//! `lib.rs` rejects builds that enable both backends, so exactly one of the
//! blocks below is compiled.

use std::time::Duration;

use diesel_async::pooled_connection::{AsyncDieselConnectionManager, PoolError, bb8::Pool};
use diesel_migrations::{EmbeddedMigrations, embed_migrations};

#[cfg(feature = "sqlite")]
mod backend {
    use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;

    use super::{EmbeddedMigrations, embed_migrations};

    /// Diesel backend the schema is compiled against.
    pub type Backend = diesel::sqlite::Sqlite;
    /// `SQLite` connection driven through a blocking wrapper.
    pub type DbConnection = SyncConnectionWrapper<diesel::sqlite::SqliteConnection>;
    /// Schema for the ticket store.
    pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");
}

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
mod backend {
    use super::{EmbeddedMigrations, embed_migrations};

    /// Diesel backend the schema is compiled against.
    pub type Backend = diesel::pg::Pg;
    /// Native asynchronous Postgres connection.
    pub type DbConnection = diesel_async::AsyncPgConnection;
    /// Schema for the ticket store.
    pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/postgres");
}

pub use self::backend::{Backend, DbConnection, MIGRATIONS};

/// Pool shared by the HTTP handlers and admin commands.
pub type DbPool = Pool<DbConnection>;

/// Error returned when a pooled connection cannot be checked out.
pub type PoolRunError = diesel_async::pooled_connection::bb8::RunError;

/// Upper bound on open connections.
const POOL_SIZE: u32 = 8;

/// How long a request waits for a free connection.
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(10);

/// Open a pool against `database_url`, a file path for `SQLite` or a
/// `postgres://` URL.
///
/// # Errors
/// Returns the first connection failure seen while filling the pool.
pub async fn establish_pool(database_url: &str) -> Result<DbPool, PoolError> {
    let manager = AsyncDieselConnectionManager::<DbConnection>::new(database_url);
    Pool::builder()
        .max_size(POOL_SIZE)
        .connection_timeout(CHECKOUT_TIMEOUT)
        .build(manager)
        .await
}
