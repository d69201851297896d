//! Filtered, access-controlled ticket listing.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use crate::{
    access::Caller,
    db::{DbConnection, owned_category_ids},
    filter::ResolvedFilter,
    kind::TicketKind,
    models::Ticket,
    severity::Severity,
    status::TicketStatus,
};

/// Predicate for [`get_tickets`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TicketFilter {
    /// Categories to include; empty means every category.
    pub category_ids: Vec<String>,
    /// Statuses to include.
    pub statuses: Vec<TicketStatus>,
    /// Severities to include.
    pub severities: Vec<Severity>,
    /// Keep tickets whose username ends with this text.
    pub username_suffix: Option<String>,
    /// Keep tickets of this kind only.
    pub kind: Option<TicketKind>,
}

impl TicketFilter {
    /// Filter matching every ticket.
    #[must_use]
    pub fn everything() -> Self {
        Self {
            category_ids: Vec::new(),
            statuses: TicketStatus::ALL.to_vec(),
            severities: Severity::ALL.to_vec(),
            username_suffix: None,
            kind: None,
        }
    }

    /// Restrict by username suffix; blank text is ignored.
    #[must_use]
    pub fn with_username_suffix(mut self, suffix: Option<&str>) -> Self {
        self.username_suffix = suffix
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);
        self
    }

    /// Restrict by kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: Option<TicketKind>) -> Self {
        self.kind = kind;
        self
    }
}

impl From<ResolvedFilter> for TicketFilter {
    fn from(resolved: ResolvedFilter) -> Self {
        Self {
            category_ids: resolved.category_ids,
            statuses: resolved.statuses,
            severities: resolved.severities,
            username_suffix: None,
            kind: None,
        }
    }
}

fn like_suffix(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 1);
    pattern.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern
}

/// Tickets matching `filter` that `caller` may see, newest activity first.
///
/// Non-admin callers only get tickets they submitted or tickets routed to a
/// category they own (directly or through its parent).
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn get_tickets(
    conn: &mut DbConnection,
    filter: &TicketFilter,
    caller: &Caller,
) -> QueryResult<Vec<Ticket>> {
    use crate::schema::tickets::dsl as t;

    let mut query = t::tickets.into_boxed();
    if !filter.category_ids.is_empty() {
        query = query.filter(t::category_id.eq_any(filter.category_ids.clone()));
    }
    let statuses: Vec<i32> = filter.statuses.iter().map(|s| s.code()).collect();
    let severities: Vec<i32> = filter.severities.iter().map(|s| s.code()).collect();
    query = query
        .filter(t::status.eq_any(statuses))
        .filter(t::severity.eq_any(severities));
    if let Some(kind) = filter.kind {
        query = query.filter(t::kind.eq(kind.as_str()));
    }
    if let Some(suffix) = &filter.username_suffix {
        query = query.filter(t::username.like(like_suffix(suffix)).escape('\\'));
    }
    if !caller.is_admin {
        let owned = owned_category_ids(conn, &caller.username).await?;
        query = query.filter(
            t::username
                .eq(caller.username.clone())
                .or(t::category_id.eq_any(owned)),
        );
    }
    query
        .order((t::last_updated.desc(), t::id.asc()))
        .load::<Ticket>(conn)
        .await
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::like_suffix;

    #[rstest]
    #[case("smith", "%smith")]
    #[case("50%_off", "%50\\%\\_off")]
    fn escapes_like_wildcards(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(like_suffix(text), expected);
    }
}
