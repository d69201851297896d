//! Location queries.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;
use crate::models::{Location, LocationChangeset, NewLocation};

/// Insert a location row.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn insert_location(conn: &mut DbConnection, loc: &NewLocation<'_>) -> QueryResult<usize> {
    use crate::schema::locations::dsl::locations;
    diesel::insert_into(locations).values(loc).execute(conn).await
}

/// Fetch a location by id.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn get_location(conn: &mut DbConnection, id: &str) -> QueryResult<Option<Location>> {
    use crate::schema::locations::dsl as l;
    l::locations
        .filter(l::id.eq(id))
        .first::<Location>(conn)
        .await
        .optional()
}

/// List every location ordered by name.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn list_locations(conn: &mut DbConnection) -> QueryResult<Vec<Location>> {
    use crate::schema::locations::dsl as l;
    l::locations.order((l::name.asc(), l::id.asc())).load(conn).await
}

/// Rewrite a location.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn update_location(
    conn: &mut DbConnection,
    id: &str,
    changes: &LocationChangeset<'_>,
) -> QueryResult<usize> {
    use crate::schema::locations::dsl as l;
    diesel::update(l::locations.filter(l::id.eq(id)))
        .set(changes)
        .execute(conn)
        .await
}

/// Remove a location.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn delete_location(conn: &mut DbConnection, id: &str) -> QueryResult<usize> {
    use crate::schema::locations::dsl as l;
    diesel::delete(l::locations.filter(l::id.eq(id)))
        .execute(conn)
        .await
}

/// Number of tickets referring to a location.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn count_tickets_at_location(conn: &mut DbConnection, id: &str) -> QueryResult<i64> {
    use crate::schema::tickets::dsl as t;
    t::tickets
        .filter(t::location_id.eq(id))
        .count()
        .get_result(conn)
        .await
}
