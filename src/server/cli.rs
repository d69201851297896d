//! Command-line interface definitions for the helpdesk server.
//!
//! The same [`AppConfig`] feeds the HTTP daemon and the administrative
//! subcommands, layered from CLI flags, `HELPDESK_` environment variables and
//! a `.helpdesk.toml` dotfile.

#![expect(
    non_snake_case,
    reason = "Clap/OrthoConfig derive macros generate helper modules with uppercase names"
)]
#![allow(
    missing_docs,
    reason = "OrthoConfig and Clap derive macros generate items that cannot be documented"
)]
#![allow(
    unfulfilled_lint_expectations,
    reason = "derive macros conditionally generate items"
)]

use std::ffi::OsString;

use argon2::Params;
use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand, parser::ValueSource};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

/// Arguments for the `create-user` administrative subcommand.
#[expect(
    missing_docs,
    reason = "OrthoConfig derive macro generates items that cannot be documented"
)]
#[derive(Parser, OrthoConfig, Deserialize, Serialize, Default, Debug, Clone)]
#[ortho_config(prefix = "HELPDESK_")]
pub struct CreateUserArgs {
    /// Username for the new account.
    #[arg(long)]
    pub username: Option<String>,
    /// Password for the new account.
    #[arg(long)]
    pub password: Option<String>,
    /// Contact address for the new account.
    #[arg(long)]
    pub email: Option<String>,
    /// Grant the administrators role.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub admin: Option<bool>,
}

/// Arguments for the `set-param` administrative subcommand.
#[expect(
    missing_docs,
    reason = "OrthoConfig derive macro generates items that cannot be documented"
)]
#[derive(Parser, OrthoConfig, Deserialize, Serialize, Default, Debug, Clone)]
#[ortho_config(prefix = "HELPDESK_")]
pub struct SetParamArgs {
    /// Documented parameter id.
    #[arg(long)]
    pub id: Option<i32>,
    /// New value.
    #[arg(long)]
    pub value: Option<String>,
}

/// CLI subcommands exposed by `helpdesk`.
#[derive(Subcommand, Deserialize, Serialize, Debug, Clone)]
pub enum Commands {
    /// Create a new user account.
    #[command(name = "create-user")]
    CreateUser(CreateUserArgs),
    /// Change a system parameter.
    #[command(name = "set-param")]
    SetParam(SetParamArgs),
}

/// Runtime configuration shared by the daemon and subcommands.
#[expect(
    missing_docs,
    reason = "OrthoConfig derive macro generates items that cannot be documented"
)]
#[derive(Args, OrthoConfig, Serialize, Deserialize, Default, Debug, Clone)]
#[ortho_config(prefix = "HELPDESK_")]
pub struct AppConfig {
    /// HTTP bind address.
    #[ortho_config(default = "0.0.0.0:8080".to_owned())]
    #[arg(long, default_value_t = String::from("0.0.0.0:8080"))]
    pub bind: String,
    /// Database connection string or path.
    #[ortho_config(default = "helpdesk.db".to_owned())]
    #[arg(long, default_value_t = String::from("helpdesk.db"))]
    pub database: String,
    /// Tickets per listing page.
    #[ortho_config(default = 25)]
    #[arg(long, default_value_t = 25)]
    pub items_per_page: usize,
    /// Argon2 memory cost parameter.
    #[ortho_config(default = Params::DEFAULT_M_COST)]
    #[arg(long, default_value_t = Params::DEFAULT_M_COST)]
    pub argon2_m_cost: u32,
    /// Argon2 time cost parameter.
    #[ortho_config(default = Params::DEFAULT_T_COST)]
    #[arg(long, default_value_t = Params::DEFAULT_T_COST)]
    pub argon2_t_cost: u32,
    /// Argon2 parallelism cost parameter.
    #[ortho_config(default = Params::DEFAULT_P_COST)]
    #[arg(long, default_value_t = Params::DEFAULT_P_COST)]
    pub argon2_p_cost: u32,
}

/// Top-level CLI entry point consumed by the binary.
#[derive(Parser, Deserialize, Serialize, Debug, Clone)]
#[command(name = "helpdesk", about = "IT and facilities helpdesk service")]
pub struct Cli {
    /// Application configuration.
    #[command(flatten)]
    pub config: AppConfig,
    /// Optional subcommand.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Build the CLI from parsed arguments, resolving [`AppConfig`] through
    /// its layers: flags typed on the command line, then `HELPDESK_`
    /// environment variables, then `.helpdesk.toml`, then defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the matches do not fit [`Cli`] or a
    /// configuration layer cannot be read.
    pub fn from_layers(matches: &ArgMatches) -> anyhow::Result<Self> {
        let cli = Self::from_arg_matches(matches)?;
        let config = AppConfig::load_from_iter(typed_global_flags(matches))?;
        Ok(Self { config, ..cli })
    }
}

/// Global flags the user actually typed, rebuilt as argv for the layered
/// loader. Clap fills untyped flags with defaults, which would otherwise mask
/// the environment and dotfile.
fn typed_global_flags(matches: &ArgMatches) -> Vec<OsString> {
    let command = Cli::command();
    let mut argv = vec![OsString::from(command.get_name())];
    for arg in command.get_arguments() {
        let id = arg.get_id().as_str();
        let Some(long) = arg.get_long() else {
            continue;
        };
        if matches.value_source(id) != Some(ValueSource::CommandLine) {
            continue;
        }
        let Ok(Some(values)) = matches.try_get_raw(id) else {
            continue;
        };
        for value in values {
            argv.push(OsString::from(format!("--{long}")));
            argv.push(value.to_owned());
        }
    }
    argv
}
