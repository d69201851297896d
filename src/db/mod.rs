//! Manage database connections and ticket store queries.
//!
//! This module tree exposes helpers for creating pooled Diesel connections,
//! running embedded migrations, auditing backend capabilities, and the
//! per-table queries used by the helpdesk services.

mod audit;
mod categories;
mod connection;
mod locations;
mod migrations;
mod parameters;
mod tickets;
mod updates;
mod users;


#[cfg(feature = "postgres")]
pub use self::audit::audit_postgres_features;
#[cfg(feature = "sqlite")]
pub use self::audit::audit_sqlite_features;
pub use self::{
    categories::{
        count_children,
        get_category,
        insert_category,
        list_categories,
        owned_category_ids,
        soft_delete_category,
        update_category,
    },
    connection::{Backend, DbConnection, DbPool, MIGRATIONS, PoolRunError, establish_pool},
    locations::{
        count_tickets_at_location,
        delete_location,
        get_location,
        insert_location,
        list_locations,
        update_location,
    },
    migrations::{apply_migrations, run_migrations},
    parameters::{get_parameter, insert_parameter_if_absent, list_parameters, set_parameter_value},
    tickets::{delete_ticket, get_ticket, insert_ticket, ticket_exists, update_ticket_versioned},
    updates::{list_updates, record_update},
    users::{create_user, get_user_by_name, set_user_password},
};
