//! Administrative command handlers.
//!
//! These run against the database directly, without starting the HTTP
//! listener, so operators can bootstrap accounts and configuration.

#![allow(
    clippy::shadow_reuse,
    reason = "intentional shadowing for config merging"
)]
#![allow(
    clippy::print_stdout,
    reason = "intentional user output for CLI commands"
)]

use anyhow::{Context, Result, anyhow, bail};
use argon2::{Algorithm, Argon2, ParamsBuilder, Version};
use chrono::Utc;
use diesel_async::AsyncConnection;
use ortho_config::load_and_merge_subcommand_for;
use tracing::info;

use super::{AppConfig, Commands, CreateUserArgs, SetParamArgs};
use crate::{
    db::{DbConnection, apply_migrations, create_user, get_parameter, set_parameter_value},
    directory::hash_password,
    models,
    params::{Param, seed_parameters},
};

/// Recorded as the editor of parameters changed from the command line.
pub const CLI_EDITOR: &str = "cli";

/// Execute an administrative command.
///
/// # Errors
///
/// Propagates failures from configuration merging or database operations.
pub async fn run_command(command: Commands, cfg: &AppConfig) -> Result<()> {
    match command {
        Commands::CreateUser(args) => {
            let args = load_and_merge_subcommand_for::<CreateUserArgs>(&args)?;
            run_create_user(args, cfg).await
        }
        Commands::SetParam(args) => {
            let args = load_and_merge_subcommand_for::<SetParamArgs>(&args)?;
            run_set_param(args, cfg).await
        }
    }
}

/// Build an Argon2 instance using the supplied configuration parameters.
///
/// # Errors
///
/// Returns any error emitted while constructing the Argon2 parameter set.
pub fn argon2_from_config(cfg: &AppConfig) -> Result<Argon2<'static>> {
    let params = ParamsBuilder::new()
        .m_cost(cfg.argon2_m_cost)
        .t_cost(cfg.argon2_t_cost)
        .p_cost(cfg.argon2_p_cost)
        .build()
        .with_context(|| {
            format!(
                "invalid Argon2 params derived from config: m_cost={}, t_cost={}, p_cost={}",
                cfg.argon2_m_cost, cfg.argon2_t_cost, cfg.argon2_p_cost
            )
        })?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

async fn prepared_connection(cfg: &AppConfig) -> Result<DbConnection> {
    let mut conn = DbConnection::establish(&cfg.database)
        .await
        .with_context(|| format!("failed to open database '{}'", cfg.database))?;
    apply_migrations(&mut conn, &cfg.database).await?;
    seed_parameters(&mut conn).await?;
    Ok(conn)
}

async fn run_create_user(args: CreateUserArgs, cfg: &AppConfig) -> Result<()> {
    let username = args.username.ok_or_else(|| anyhow!("missing username"))?;
    let password = args.password.ok_or_else(|| anyhow!("missing password"))?;

    let argon2 = argon2_from_config(cfg)?;
    let hashed = hash_password(&argon2, &password).map_err(|e| anyhow!("failed to hash password: {e}"))?;
    let new_user = models::NewUser {
        username: &username,
        password: &hashed,
        email: args.email.as_deref(),
        is_admin: args.admin.unwrap_or(false),
    };
    let mut conn = prepared_connection(cfg).await?;
    create_user(&mut conn, &new_user)
        .await
        .with_context(|| format!("failed to create user '{username}'"))?;
    info!(user = %username, admin = new_user.is_admin, "user created");
    println!("User {username} created");
    Ok(())
}

async fn run_set_param(args: SetParamArgs, cfg: &AppConfig) -> Result<()> {
    let id = args.id.ok_or_else(|| anyhow!("missing id"))?;
    let value = args.value.ok_or_else(|| anyhow!("missing value"))?;
    let Some(param) = Param::from_id(id) else {
        bail!("unknown parameter {id}");
    };

    let mut conn = prepared_connection(cfg).await?;
    let current = get_parameter(&mut conn, id)
        .await?
        .ok_or_else(|| anyhow!("parameter {id} is not seeded"))?;
    if current.required && value.trim().is_empty() {
        bail!("parameter {id} ({}) requires a value", current.name);
    }
    set_parameter_value(&mut conn, id, value.trim(), CLI_EDITOR, Utc::now().naive_utc())
        .await
        .with_context(|| format!("failed to update parameter {id}"))?;
    info!(parameter = id, name = ?param, "parameter updated from the command line");
    println!("Parameter {id} ({}) updated", current.name);
    Ok(())
}
