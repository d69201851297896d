//! Embedded migration runner.

use std::{error::Error as StdError, time::Duration};

use cfg_if::cfg_if;
use diesel::result::{Error as DieselError, QueryResult};
use diesel_migrations::MigrationHarness;
use thiserror::Error;
use tokio::time::timeout;
use tracing::info;

use super::connection::{DbConnection, MIGRATIONS};

#[derive(Debug, Error)]
#[error("migration harness error: {0}")]
struct MigrationHarnessError(Box<dyn StdError + Send + Sync>);

#[derive(Debug, Clone, Copy, Error)]
#[error("migration execution exceeded {0:?}")]
struct MigrationTimeoutError(Duration);

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
#[derive(Debug, Error)]
#[error("migration executor error: {0}")]
struct MigrationExecutorError(tokio::task::JoinError);

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
#[derive(Debug, Error)]
#[error("migration connection error: {0}")]
struct MigrationConnectionError(diesel::result::ConnectionError);

const MIGRATION_TIMEOUT: Duration = Duration::from_secs(10);

fn harness_error(err: Box<dyn StdError + Send + Sync>) -> DieselError {
    DieselError::SerializationError(Box::new(MigrationHarnessError(err)))
}

fn timeout_error() -> DieselError {
    DieselError::SerializationError(Box::new(MigrationTimeoutError(MIGRATION_TIMEOUT)))
}

fn run_pending<H>(harness: &mut H) -> QueryResult<()>
where
    H: MigrationHarness<super::connection::Backend>,
{
    if let Ok(false) = harness.has_pending_migration(MIGRATIONS) {
        info!("no pending migrations; skipping apply");
        return Ok(());
    }
    info!("applying pending migrations");
    harness
        .run_pending_migrations(MIGRATIONS)
        .map(|applied| info!(count = applied.len(), "migrations applied"))
        .map_err(harness_error)
}

cfg_if! {
    if #[cfg(feature = "sqlite")] {
        /// Run embedded migrations on an open connection.
        ///
        /// # Errors
        /// Returns any error produced by Diesel while running migrations, or a
        /// serialization error wrapping the timeout.
        #[must_use = "handle the result"]
        pub async fn run_migrations(conn: &mut DbConnection) -> QueryResult<()> {
            timeout(MIGRATION_TIMEOUT, conn.spawn_blocking(|c| run_pending(c)))
                .await
                .map_err(|_| timeout_error())??;
            Ok(())
        }
    } else if #[cfg(all(feature = "postgres", not(feature = "sqlite")))] {
        /// Run embedded migrations over a dedicated blocking connection.
        ///
        /// # Errors
        /// Returns any error produced by Diesel while running migrations, or a
        /// serialization error wrapping the timeout.
        #[must_use = "handle the result"]
        pub async fn run_migrations(database_url: &str) -> QueryResult<()> {
            use diesel::{Connection, pg::PgConnection};
            let url = database_url.to_owned();
            timeout(
                MIGRATION_TIMEOUT,
                tokio::task::spawn_blocking(move || -> QueryResult<()> {
                    let mut conn = PgConnection::establish(&url).map_err(|e| {
                        DieselError::SerializationError(Box::new(MigrationConnectionError(e)))
                    })?;
                    run_pending(&mut conn)
                }),
            )
            .await
            .map_err(|_| timeout_error())?
            .map_err(|e| DieselError::SerializationError(Box::new(MigrationExecutorError(e))))??;
            Ok(())
        }
    }
}

/// Apply embedded migrations for the compiled backend.
///
/// # Errors
/// Returns any error produced by Diesel while running migrations.
#[cfg(feature = "sqlite")]
#[must_use = "handle the result"]
pub async fn apply_migrations(conn: &mut DbConnection, _database_url: &str) -> QueryResult<()> {
    run_migrations(conn).await
}

/// Apply embedded migrations for the compiled backend.
///
/// # Errors
/// Returns any error produced by Diesel while running migrations.
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
#[must_use = "handle the result"]
pub async fn apply_migrations(conn: &mut DbConnection, url: &str) -> QueryResult<()> {
    let _ = conn;
    run_migrations(url).await
}
