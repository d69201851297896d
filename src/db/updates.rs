//! Update records attached to tickets.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::connection::DbConnection;
use crate::{
    models::{NewUpdate, Update},
    status::TicketStatus,
};

/// Record an update and move its ticket to `status` in one transaction.
///
/// # Errors
/// Returns [`diesel::result::Error::NotFound`] when the ticket vanished, or
/// any other database error; nothing is written on failure.
#[must_use = "handle the result"]
pub async fn record_update(
    conn: &mut DbConnection,
    update: &NewUpdate<'_>,
    status: TicketStatus,
) -> QueryResult<()> {
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        Box::pin(async move {
            use crate::schema::{tickets::dsl as t, updates::dsl as u};
            let touched = diesel::update(t::tickets.filter(t::id.eq(update.ticket_id)))
                .set((
                    t::status.eq(status.code()),
                    t::last_updated.eq(update.date_created),
                    t::version.eq(t::version + 1),
                ))
                .execute(conn)
                .await?;
            if touched == 0 {
                return Err(diesel::result::Error::NotFound);
            }
            diesel::insert_into(u::updates)
                .values(update)
                .execute(conn)
                .await?;
            Ok(())
        })
    })
    .await
}

/// Updates for a ticket, newest first.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn list_updates(conn: &mut DbConnection, ticket_id: &str) -> QueryResult<Vec<Update>> {
    use crate::schema::updates::dsl as u;
    u::updates
        .filter(u::ticket_id.eq(ticket_id))
        .order((u::date_created.desc(), u::id.asc()))
        .load(conn)
        .await
}
