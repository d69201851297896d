//! Database fixtures used by integration tests.
//!
//! Centralises the directory accounts and catalog rows most scenarios start
//! from, so tests can compose databases with minimal boilerplate.

use diesel_async::AsyncConnection;
use futures_util::future::BoxFuture;
use helpdesk::{
    db::{DbConnection, apply_migrations, create_user},
    directory::hash_password,
    models::NewUser,
    test_support::seed_scenario,
};

use crate::{AnyError, DatabaseUrl};

/// Password shared by every seeded account.
pub const PASSWORD: &str = "secret";

/// Seeded accounts as `(username, is_admin)`.
///
/// `facilities` owns Buildings, `hvac-tech` owns Buildings - HVAC and
/// `helpdesk` owns IT; `jdoe` owns nothing.
pub const ACCOUNTS: [(&str, bool); 5] = [
    ("alice", true),
    ("jdoe", false),
    ("facilities", false),
    ("hvac-tech", false),
    ("helpdesk", false),
];

/// Open `db`, apply migrations and run `f` on a dedicated runtime.
///
/// # Errors
///
/// Returns any error raised while connecting, migrating, or by `f`.
pub fn with_db<F>(db: &DatabaseUrl, f: F) -> Result<(), AnyError>
where
    F: for<'c> FnOnce(&'c mut DbConnection) -> BoxFuture<'c, Result<(), AnyError>>,
{
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut conn = DbConnection::establish(db.as_str()).await?;
        apply_migrations(&mut conn, db.as_str()).await?;
        f(&mut conn).await
    })
}

/// Seed the standard catalog, parameters and [`ACCOUNTS`].
///
/// # Errors
///
/// Returns any error raised while hashing passwords or writing rows.
pub fn setup_helpdesk_db(db: DatabaseUrl) -> Result<(), AnyError> {
    with_db(&db, |conn| {
        Box::pin(async move {
            let argon2 = argon2::Argon2::default();
            for (username, is_admin) in ACCOUNTS {
                let hashed = hash_password(&argon2, PASSWORD).map_err(|e| anyhow::anyhow!(e))?;
                let email = format!("{username}@example.org");
                create_user(
                    conn,
                    &NewUser {
                        username,
                        password: &hashed,
                        email: Some(&email),
                        is_admin,
                    },
                )
                .await?;
            }
            seed_scenario(conn).await?;
            Ok(())
        })
    })
}
