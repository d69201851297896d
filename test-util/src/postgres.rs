//! Helpers for `PostgreSQL`-backed integration tests.

use anyhow::Context as _;
use diesel_async::{AsyncConnection, RunQueryDsl};
use helpdesk::db::DbConnection;
use url::Url;

use crate::{AnyError, DatabaseUrl};

/// Environment variable naming the server used by `PostgreSQL` tests.
pub const TEST_URL_ENV: &str = "HELPDESK_TEST_POSTGRES_URL";

/// Read and validate [`TEST_URL_ENV`]; `None` when it is unset or blank.
///
/// # Errors
///
/// Returns an error when the variable is not a `postgres://` URL.
pub fn test_url() -> Result<Option<DatabaseUrl>, AnyError> {
    let Ok(raw) = std::env::var(TEST_URL_ENV) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let parsed = Url::parse(trimmed).with_context(|| format!("{TEST_URL_ENV} is not a URL"))?;
    if !matches!(parsed.scheme(), "postgres" | "postgresql") {
        anyhow::bail!("{TEST_URL_ENV} must use the postgres scheme");
    }
    Ok(Some(DatabaseUrl::from(trimmed)))
}

/// Drop and recreate the `public` schema so each test starts empty.
///
/// # Errors
///
/// Returns any error raised while connecting or executing the reset.
pub async fn reset_schema(db: &DatabaseUrl) -> Result<(), AnyError> {
    let mut conn = DbConnection::establish(db.as_str())
        .await
        .context("failed to connect for schema reset")?;
    diesel::sql_query("DROP SCHEMA public CASCADE")
        .execute(&mut conn)
        .await?;
    diesel::sql_query("CREATE SCHEMA public")
        .execute(&mut conn)
        .await?;
    Ok(())
}
