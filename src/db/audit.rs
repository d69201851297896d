//! Backend capability checks run once at startup.

use diesel::{QueryableByName, result::Error as DieselError, result::QueryResult, sql_query, sql_types::Text};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;

#[derive(QueryableByName)]
struct VersionRow {
    #[diesel(sql_type = Text)]
    version: String,
}

fn unsupported(message: String) -> DieselError {
    DieselError::QueryBuilderError(Box::new(std::io::Error::other(message)))
}

/// Split a dotted version string into numeric components.
fn version_parts(raw: &str) -> Option<(u32, u32)> {
    let mut parts = raw.split(['.', ' ']).map(str::parse::<u32>);
    let major = parts.next()?.ok()?;
    let minor = parts.next().and_then(Result::ok).unwrap_or(0);
    Some((major, minor))
}

/// Verify that `SQLite` supports `ON CONFLICT` upserts (3.24 or newer).
///
/// # Errors
/// Returns any error produced by the version query, or a query-builder error
/// when the library is too old.
#[cfg(feature = "sqlite")]
#[must_use = "handle the result"]
pub async fn audit_sqlite_features(conn: &mut DbConnection) -> QueryResult<()> {
    let row: VersionRow = sql_query("SELECT sqlite_version() AS version")
        .get_result(conn)
        .await?;
    match version_parts(&row.version) {
        Some(found) if found >= (3, 24) => Ok(()),
        _ => Err(unsupported(format!(
            "sqlite {} is not supported (require >= 3.24)",
            row.version
        ))),
    }
}

/// Verify that the `PostgreSQL` server is version 14 or newer.
///
/// # Errors
/// Returns any error produced by the version query, or a query-builder error
/// when the server is too old.
#[cfg(feature = "postgres")]
#[must_use = "handle the result"]
pub async fn audit_postgres_features(conn: &mut DbConnection) -> QueryResult<()> {
    let row: VersionRow = sql_query("SELECT current_setting('server_version') AS version")
        .get_result(conn)
        .await?;
    match version_parts(&row.version) {
        Some((major, _)) if major >= 14 => Ok(()),
        _ => Err(unsupported(format!(
            "postgres {} is not supported (require >= 14)",
            row.version
        ))),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::version_parts;

    #[rstest]
    #[case("3.45.1", Some((3, 45)))]
    #[case("16.2 (Debian 16.2-1)", Some((16, 2)))]
    #[case("14", Some((14, 0)))]
    #[case("garbage", None)]
    fn parses_versions(#[case] raw: &str, #[case] expected: Option<(u32, u32)>) {
        assert_eq!(version_parts(raw), expected);
    }
}
