//! System parameter rows.

use chrono::NaiveDateTime;
use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;
use crate::models::{NewSystemParameter, SystemParameter};

/// Fetch a parameter by its documented id.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn get_parameter(conn: &mut DbConnection, id: i32) -> QueryResult<Option<SystemParameter>> {
    use crate::schema::system_parameters::dsl as p;
    p::system_parameters
        .filter(p::id.eq(id))
        .first::<SystemParameter>(conn)
        .await
        .optional()
}

/// List every parameter ordered by id.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn list_parameters(conn: &mut DbConnection) -> QueryResult<Vec<SystemParameter>> {
    use crate::schema::system_parameters::dsl as p;
    p::system_parameters.order(p::id.asc()).load(conn).await
}

/// Insert a parameter unless one with the same id exists.
///
/// Returns the number of inserted rows.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn insert_parameter_if_absent(
    conn: &mut DbConnection,
    param: &NewSystemParameter<'_>,
) -> QueryResult<usize> {
    use crate::schema::system_parameters::dsl as p;
    diesel::insert_into(p::system_parameters)
        .values(param)
        .on_conflict(p::id)
        .do_nothing()
        .execute(conn)
        .await
}

/// Replace a parameter value and stamp who changed it.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn set_parameter_value(
    conn: &mut DbConnection,
    id: i32,
    value: &str,
    updated_by: &str,
    now: NaiveDateTime,
) -> QueryResult<usize> {
    use crate::schema::system_parameters::dsl as p;
    diesel::update(p::system_parameters.filter(p::id.eq(id)))
        .set((
            p::value.eq(value),
            p::updated_by.eq(updated_by),
            p::last_updated.eq(now),
        ))
        .execute(conn)
        .await
}
