//! Directory account rows.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;
use crate::models::{NewUser, User};

/// Look up an account by username.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn get_user_by_name(conn: &mut DbConnection, name: &str) -> QueryResult<Option<User>> {
    use crate::schema::users::dsl::{username, users};
    users
        .filter(username.eq(name))
        .first::<User>(conn)
        .await
        .optional()
}

/// Insert a new account.
///
/// # Errors
/// Returns any error produced by the insertion query.
#[must_use = "handle the result"]
pub async fn create_user(conn: &mut DbConnection, user: &NewUser<'_>) -> QueryResult<usize> {
    use crate::schema::users::dsl::users;
    diesel::insert_into(users).values(user).execute(conn).await
}

/// Replace an account's password hash.
///
/// # Errors
/// Returns any error produced by the update query.
#[must_use = "handle the result"]
pub async fn set_user_password(conn: &mut DbConnection, name: &str, hash: &str) -> QueryResult<usize> {
    use crate::schema::users::dsl::{password, username, users};
    diesel::update(users.filter(username.eq(name)))
        .set(password.eq(hash))
        .execute(conn)
        .await
}
