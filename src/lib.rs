//! Core library for the helpdesk daemon.
//!
//! Tickets are routed through a two-level category hierarchy, filtered by
//! category, status and severity selectors, and announced by email built
//! from the system parameter registry. Only one database backend (either
//! `sqlite` or `postgres`) should be enabled at a time.
cfg_if::cfg_if! {
    if #[cfg(all(feature = "sqlite", feature = "postgres", not(feature = "lint")))] {
        compile_error!("Choose either sqlite or postgres, not both");
    } else if #[cfg(feature = "sqlite")] {
        pub use diesel::sqlite::Sqlite as DbBackend;
    } else if #[cfg(feature = "postgres")] {
        pub use diesel::pg::Pg as DbBackend;
    } else {
        compile_error!("Either the 'sqlite' or 'postgres' feature must be enabled");
    }
}

pub mod access;
pub mod category;
pub mod dashboard;
pub mod db;
pub mod detail;
pub mod directory;
pub mod error;
pub mod filter;
pub mod kind;
pub mod models;
pub mod notify;
pub mod paging;
pub mod params;
pub mod query;
#[expect(missing_docs, reason = "diesel table! macros generate undocumented items")]
pub mod schema;
pub mod server;
pub mod services;
pub mod severity;
pub mod status;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
