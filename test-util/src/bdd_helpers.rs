//! Helpers that hand behaviour tests a seeded connection pool.

use anyhow::Context as _;
use helpdesk::db::{DbPool, establish_pool};
#[cfg(feature = "sqlite")]
use tempfile::TempDir;

use crate::{AnyError, DatabaseUrl};

/// Fixture database setup function signature.
pub type SetupFn = fn(DatabaseUrl) -> Result<(), AnyError>;

/// Holds a database pool and the guard needed to keep the database alive.
pub struct TestDb {
    pool: DbPool,
    url: DatabaseUrl,
    #[cfg(feature = "sqlite")]
    _temp_dir: TempDir,
}

impl TestDb {
    /// Clone the underlying database pool.
    #[must_use]
    pub fn pool(&self) -> DbPool { self.pool.clone() }

    /// Connection string of the database.
    #[must_use]
    pub const fn url(&self) -> &DatabaseUrl { &self.url }
}

// `setup` owns a runtime, so it must not run on a runtime thread.
async fn run_setup_fn(setup: SetupFn, db_url: DatabaseUrl) -> Result<(), AnyError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        let (result_tx, result_rx) = tokio::sync::oneshot::channel::<Result<(), AnyError>>();
        std::thread::spawn(move || {
            let _send_result = result_tx.send(setup(db_url));
        });
        result_rx
            .await
            .context("failed to receive test database setup result")?
            .context("failed to run test database setup")?;
    } else {
        setup(db_url).context("failed to run test database setup")?;
    }
    Ok(())
}

/// Build a test database, returning `None` when the backend is unavailable.
///
/// # Errors
///
/// Returns any error raised while creating the database or connection pool.
pub async fn build_test_db_async(setup: SetupFn) -> Result<Option<TestDb>, AnyError> {
    #[cfg(feature = "sqlite")]
    {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("helpdesk.db");
        let db_url = DatabaseUrl::from(
            path.to_str()
                .ok_or_else(|| anyhow::anyhow!("database path is not valid UTF-8"))?,
        );
        run_setup_fn(setup, db_url.clone()).await?;
        let pool = establish_pool(db_url.as_str())
            .await
            .context("failed to establish SQLite connection pool")?;
        Ok(Some(TestDb {
            pool,
            url: db_url,
            _temp_dir: temp_dir,
        }))
    }

    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    {
        let Some(db_url) = crate::postgres::test_url()? else {
            tracing::warn!(
                "skipping test: {} is not set",
                crate::postgres::TEST_URL_ENV
            );
            return Ok(None);
        };
        crate::postgres::reset_schema(&db_url).await?;
        run_setup_fn(setup, db_url.clone()).await?;
        let pool = establish_pool(db_url.as_str())
            .await
            .context("failed to establish Postgres connection pool")?;
        Ok(Some(TestDb { pool, url: db_url }))
    }
}
