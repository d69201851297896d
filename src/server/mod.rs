//! Server orchestration: configuration, administrative commands and the HTTP
//! daemon.
//!
//! Binary crates stay thin wrappers that only need to call [`run`].

#![expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! macro usage"
)]

pub mod admin;
pub mod cli;
pub mod http;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::CommandFactory;
use tokio::net::TcpListener;
use tracing::{info, warn};
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
use url::Url;

pub use self::{
    admin::{argon2_from_config, run_command},
    cli::{AppConfig, Cli, Commands, CreateUserArgs, SetParamArgs},
    http::{AppState, router},
};
use crate::{
    db::{DbPool, apply_migrations, establish_pool},
    directory::DbDirectory,
    notify::SmtpRelay,
    params::{DbParameterStore, ParameterStore, seed_parameters},
};

/// Parse CLI arguments and execute the requested command or daemon.
///
/// # Errors
///
/// Returns any error emitted while parsing configuration or running the
/// daemon.
pub async fn run() -> Result<()> {
    let matches = Cli::command().get_matches();
    run_with_cli(Cli::from_layers(&matches)?).await
}

/// Execute the server logic using an already parsed [`Cli`].
///
/// # Errors
///
/// Propagates any failure reported by the command or daemon.
pub async fn run_with_cli(cli: Cli) -> Result<()> {
    let Cli { config, command } = cli;
    if let Some(command) = command {
        run_command(command, &config).await
    } else {
        run_daemon(config).await
    }
}

/// Serve the HTTP API until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns any failure reported while preparing the database, binding the
/// socket, or serving requests.
pub async fn run_daemon(cfg: AppConfig) -> Result<()> {
    let argon2 = argon2_from_config(&cfg)?;
    let pool = setup_database(&cfg.database).await?;

    let params: Arc<dyn ParameterStore> = Arc::new(DbParameterStore::new(pool.clone()));
    let relay = Arc::new(SmtpRelay::new(Arc::clone(&params)));
    let directory = Arc::new(DbDirectory::new(pool.clone(), argon2));
    let state = Arc::new(AppState::new(
        &pool,
        &params,
        relay,
        directory,
        cfg.items_per_page,
    ));

    let listener = TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind))?;
    info!(bind = %cfg.bind, "helpdesk listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("helpdesk stopped");
    Ok(())
}

/// Determine whether the supplied connection string targets Postgres.
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
fn is_postgres_url(s: &str) -> bool {
    match Url::parse(s) {
        Ok(u) => matches!(u.scheme(), "postgres" | "postgresql"),
        Err(err) => {
            warn!(target = "server", "invalid database url '{s}': {err}");
            false
        }
    }
}

/// Build the pool, audit backend features, apply migrations and seed the
/// parameter registry.
async fn setup_database(database: &str) -> Result<DbPool> {
    let pool: DbPool = establish_pool(database)
        .await
        .with_context(|| format!("failed to open database '{database}'"))?;
    {
        let mut conn = pool.get().await.context("failed to get db connection")?;
        #[cfg(feature = "sqlite")]
        crate::db::audit_sqlite_features(&mut conn).await?;
        #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
        if is_postgres_url(database) {
            crate::db::audit_postgres_features(&mut conn).await?;
        }
        apply_migrations(&mut conn, database).await?;
        seed_parameters(&mut conn).await?;
    }
    Ok(pool)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => {
                        if let Err(err) = res {
                            warn!(error = %err, "failed to listen for Ctrl-C");
                        }
                    },
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                wait_for_ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        wait_for_ctrl_c().await;
    }
    info!("shutdown signal received");
}

async fn wait_for_ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl-C");
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::db::list_parameters;

    #[rstest]
    #[tokio::test]
    async fn setup_database_migrates_and_seeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("daemon.db").display().to_string();
        let pool = setup_database(&path).await.expect("setup");
        let mut conn = pool.get().await.expect("conn");
        let seeded = list_parameters(&mut conn).await.expect("list");
        assert_eq!(seeded.len(), crate::params::Param::ALL.len());
        drop(conn);

        // a second start keeps existing rows
        let again = setup_database(&path).await.expect("setup again");
        let mut reopened = again.get().await.expect("conn");
        assert_eq!(
            list_parameters(&mut reopened).await.expect("list").len(),
            crate::params::Param::ALL.len()
        );
    }
}
