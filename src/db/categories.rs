//! Category queries.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;
use crate::models::{Category, CategoryChangeset, NewCategory};

/// Insert a category row.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn insert_category(conn: &mut DbConnection, cat: &NewCategory<'_>) -> QueryResult<usize> {
    use crate::schema::categories::dsl::categories;
    diesel::insert_into(categories).values(cat).execute(conn).await
}

/// Fetch a category by id, including soft-deleted rows.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn get_category(conn: &mut DbConnection, id: &str) -> QueryResult<Option<Category>> {
    use crate::schema::categories::dsl as c;
    c::categories
        .filter(c::id.eq(id))
        .first::<Category>(conn)
        .await
        .optional()
}

/// List categories ordered by name.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn list_categories(
    conn: &mut DbConnection,
    include_deleted: bool,
) -> QueryResult<Vec<Category>> {
    use crate::schema::categories::dsl as c;
    let mut query = c::categories.into_boxed();
    if !include_deleted {
        query = query.filter(c::deleted.eq(false));
    }
    query.order((c::name.asc(), c::id.asc())).load(conn).await
}

/// Rewrite the editable columns of a category.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn update_category(
    conn: &mut DbConnection,
    id: &str,
    changes: &CategoryChangeset<'_>,
) -> QueryResult<usize> {
    use crate::schema::categories::dsl as c;
    diesel::update(c::categories.filter(c::id.eq(id)))
        .set(changes)
        .execute(conn)
        .await
}

/// Flag a category as deleted while keeping the row for historical tickets.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn soft_delete_category(conn: &mut DbConnection, id: &str) -> QueryResult<usize> {
    use crate::schema::categories::dsl as c;
    diesel::update(c::categories.filter(c::id.eq(id)))
        .set(c::deleted.eq(true))
        .execute(conn)
        .await
}

/// Count live categories nested under `id`.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn count_children(conn: &mut DbConnection, id: &str) -> QueryResult<i64> {
    use crate::schema::categories::dsl as c;
    c::categories
        .filter(c::parent_category_id.eq(id))
        .filter(c::deleted.eq(false))
        .count()
        .get_result(conn)
        .await
}

/// Ids of categories owned by `username`, directly or through their parent.
///
/// # Errors
/// Returns any error produced by the database.
#[must_use = "handle the result"]
pub async fn owned_category_ids(conn: &mut DbConnection, username: &str) -> QueryResult<Vec<String>> {
    use crate::schema::categories::dsl as c;
    let mut owned: Vec<String> = c::categories
        .filter(c::user_name.eq(username))
        .select(c::id)
        .load(conn)
        .await?;
    if owned.is_empty() {
        return Ok(owned);
    }
    let children: Vec<String> = c::categories
        .filter(c::parent_category_id.eq_any(owned.clone()))
        .select(c::id)
        .load(conn)
        .await?;
    owned.extend(children);
    owned.sort_unstable();
    owned.dedup();
    Ok(owned)
}
