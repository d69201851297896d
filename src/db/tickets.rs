//! Ticket persistence.
//!
//! Writes bump the `version` column so stale edits can be told apart from
//! missing rows.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::connection::DbConnection;
use crate::models::{NewTicket, Ticket, TicketChangeset};

/// Insert a ticket row.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn insert_ticket(conn: &mut DbConnection, ticket: &NewTicket<'_>) -> QueryResult<usize> {
    use crate::schema::tickets::dsl::tickets;
    diesel::insert_into(tickets).values(ticket).execute(conn).await
}

/// Fetch a ticket by id.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn get_ticket(conn: &mut DbConnection, id: &str) -> QueryResult<Option<Ticket>> {
    use crate::schema::tickets::dsl as t;
    t::tickets
        .filter(t::id.eq(id))
        .first::<Ticket>(conn)
        .await
        .optional()
}

/// Whether a ticket row exists.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn ticket_exists(conn: &mut DbConnection, id: &str) -> QueryResult<bool> {
    use crate::schema::tickets::dsl as t;
    diesel::select(diesel::dsl::exists(t::tickets.filter(t::id.eq(id))))
        .get_result(conn)
        .await
}

/// Apply an edit if the row still carries `expected_version`.
///
/// Returns the number of rows changed: zero means the row is gone or was
/// rewritten since it was read.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn update_ticket_versioned(
    conn: &mut DbConnection,
    id: &str,
    expected_version: i32,
    changes: &TicketChangeset<'_>,
) -> QueryResult<usize> {
    use crate::schema::tickets::dsl as t;
    diesel::update(
        t::tickets
            .filter(t::id.eq(id))
            .filter(t::version.eq(expected_version)),
    )
    .set((changes, t::version.eq(t::version + 1)))
    .execute(conn)
    .await
}

/// Delete a ticket together with its updates.
///
/// # Errors
/// Returns any error produced by the database; the transaction is rolled
/// back on failure.
#[must_use = "handle the result"]
pub async fn delete_ticket(conn: &mut DbConnection, id: &str) -> QueryResult<usize> {
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        Box::pin(async move {
            use crate::schema::{tickets::dsl as t, updates::dsl as u};
            diesel::delete(u::updates.filter(u::ticket_id.eq(id)))
                .execute(conn)
                .await?;
            diesel::delete(t::tickets.filter(t::id.eq(id)))
                .execute(conn)
                .await
        })
    })
    .await
}
