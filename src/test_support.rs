//! Builders and database fixtures shared by unit and integration tests.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};

use crate::{
    access::Caller,
    db::{DbConnection, insert_category, insert_location, insert_ticket, set_parameter_value},
    directory::{Directory, DirectoryError},
    kind::TicketKind,
    models::{Category, Location, LocationChangeset, NewCategory, NewLocation, NewTicket, Ticket},
    params::{Param, seed_parameters},
    services::TicketForm,
    severity::Severity,
    status::TicketStatus,
};

/// Ids of the rows written by [`seed_scenario`].
pub mod ids {
    /// Root category owned by `facilities`.
    pub const BUILDINGS: &str = "bld";
    /// `Buildings - HVAC`, owned by `hvac-tech`.
    pub const HVAC: &str = "hvac";
    /// Root category owned by `helpdesk`.
    pub const IT: &str = "it";
    /// Location whose contact is copied on notifications.
    pub const MAIN_CAMPUS: &str = "main";
    /// Location that opted out of notifications.
    pub const ANNEX: &str = "annex";
}

/// Sender configured by [`seed_scenario`].
pub const SENDER: &str = "Helpdesk <helpdesk@example.org>";

/// Administrator list configured by [`seed_scenario`].
pub const ADMIN_LIST: &str = "boss@example.org;deputy@example.org";

/// Fixed timestamp used by sample rows.
#[must_use]
pub fn sample_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap_or_default()
}

/// Category owned by `owner`, whose contact is `"{name} Contact"` at
/// `{owner}@example.org`.
#[must_use]
pub fn sample_category(id: &str, name: &str, parent: Option<&str>, owner: &str) -> Category {
    Category {
        id: id.to_owned(),
        name: name.to_owned(),
        parent_category_id: parent.map(str::to_owned),
        primary_contact: format!("{name} Contact"),
        user_name: owner.to_owned(),
        primary_email: format!("{owner}@example.org"),
        phone: None,
        deleted: false,
    }
}

/// Location whose contact is `"{name} Desk"` at `{id}@example.org`.
#[must_use]
pub fn sample_location(id: &str, name: &str, send_email: bool) -> Location {
    Location {
        id: id.to_owned(),
        name: name.to_owned(),
        address1: None,
        address2: None,
        city: None,
        state: "NY".to_owned(),
        zip: None,
        primary_contact: format!("{name} Desk"),
        primary_email: format!("{id}@example.org"),
        phone: "555-0100".to_owned(),
        send_email,
    }
}

/// Submitted general ticket filed by `username` at `{username}@example.org`.
#[must_use]
pub fn sample_ticket(id: &str, category_id: &str, username: &str) -> Ticket {
    Ticket {
        id: id.to_owned(),
        kind: TicketKind::General,
        username: username.to_owned(),
        first_name: "Pat".to_owned(),
        last_name: Some("Doe".to_owned()),
        email: format!("{username}@example.org"),
        phone: None,
        category_id: category_id.to_owned(),
        location_id: None,
        description: "Air conditioning is broken".to_owned(),
        severity: Severity::Medium,
        status: TicketStatus::Submitted,
        assigned_to: None,
        notes: None,
        resolution: None,
        pc_name: None,
        target_ministry: None,
        existing_footage: false,
        story_boards: false,
        deadline: None,
        date_submitted: sample_time(),
        last_updated: sample_time(),
        version: 0,
    }
}

/// Intake form from `jdoe` that passes validation.
#[must_use]
pub fn sample_form(category_id: &str, location_id: Option<&str>) -> TicketForm {
    TicketForm {
        kind: TicketKind::General,
        first_name: "Jane".to_owned(),
        last_name: Some("Doe".to_owned()),
        email: "jdoe@example.org".to_owned(),
        phone: Some("555-123-4567".to_owned()),
        category_id: category_id.to_owned(),
        location_id: location_id.map(str::to_owned),
        description: "Air conditioning is broken".to_owned(),
        severity: Severity::Medium,
        status: None,
        assigned_to: None,
        notes: None,
        resolution: None,
        pc_name: None,
        target_ministry: None,
        existing_footage: false,
        story_boards: false,
        deadline: None,
    }
}

async fn seed_category(conn: &mut DbConnection, row: &Category) -> Result<usize, diesel::result::Error> {
    insert_category(
        conn,
        &NewCategory {
            id: &row.id,
            name: &row.name,
            parent_category_id: row.parent_category_id.as_deref(),
            primary_contact: &row.primary_contact,
            user_name: &row.user_name,
            primary_email: &row.primary_email,
            phone: row.phone.as_deref(),
            deleted: row.deleted,
        },
    )
    .await
}

async fn seed_location(conn: &mut DbConnection, row: &Location) -> Result<usize, diesel::result::Error> {
    insert_location(
        conn,
        &NewLocation {
            id: &row.id,
            fields: LocationChangeset {
                name: &row.name,
                address1: row.address1.as_deref(),
                address2: row.address2.as_deref(),
                city: row.city.as_deref(),
                state: &row.state,
                zip: row.zip.as_deref(),
                primary_contact: &row.primary_contact,
                primary_email: &row.primary_email,
                phone: &row.phone,
                send_email: row.send_email,
            },
        },
    )
    .await
}

/// Store `row` exactly as given, bypassing form validation.
///
/// # Errors
/// Returns any error produced by the database.
pub async fn seed_ticket(conn: &mut DbConnection, row: &Ticket) -> Result<usize, diesel::result::Error> {
    insert_ticket(
        conn,
        &NewTicket {
            id: &row.id,
            kind: row.kind.as_str(),
            username: &row.username,
            first_name: &row.first_name,
            last_name: row.last_name.as_deref(),
            email: &row.email,
            phone: row.phone.as_deref(),
            category_id: &row.category_id,
            location_id: row.location_id.as_deref(),
            description: &row.description,
            severity: row.severity.code(),
            status: row.status.code(),
            assigned_to: row.assigned_to.as_deref(),
            notes: row.notes.as_deref(),
            resolution: row.resolution.as_deref(),
            pc_name: row.pc_name.as_deref(),
            target_ministry: row.target_ministry.as_deref(),
            existing_footage: row.existing_footage,
            story_boards: row.story_boards,
            deadline: row.deadline,
            date_submitted: row.date_submitted,
            last_updated: row.last_updated,
            version: row.version,
        },
    )
    .await
}

/// Seed the parameter registry with a usable sender and the standard
/// catalog: Buildings with HVAC beneath it, IT, Main Campus (copied on mail)
/// and Annex (not copied).
///
/// # Errors
/// Returns any error produced by the database.
pub async fn seed_scenario(conn: &mut DbConnection) -> Result<(), diesel::result::Error> {
    seed_parameters(conn).await?;
    let now = Utc::now().naive_utc();
    set_parameter_value(conn, Param::Sender.id(), SENDER, "test", now).await?;
    set_parameter_value(conn, Param::AdminList.id(), ADMIN_LIST, "test", now).await?;
    for category in [
        sample_category(ids::BUILDINGS, "Buildings", None, "facilities"),
        sample_category(ids::HVAC, "HVAC", Some(ids::BUILDINGS), "hvac-tech"),
        sample_category(ids::IT, "IT", None, "helpdesk"),
    ] {
        seed_category(conn, &category).await?;
    }
    for location in [
        sample_location(ids::MAIN_CAMPUS, "Main Campus", true),
        sample_location(ids::ANNEX, "Annex", false),
    ] {
        seed_location(conn, &location).await?;
    }
    Ok(())
}

/// Directory holding plain-text credentials in memory.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    users: Mutex<HashMap<String, (String, bool)>>,
}

impl StaticDirectory {
    /// Add an account.
    #[must_use]
    pub fn with_user(self, username: &str, password: &str, is_admin: bool) -> Self {
        if let Ok(mut users) = self.users.lock() {
            users.insert(username.to_owned(), (password.to_owned(), is_admin));
        }
        self
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Caller>, DirectoryError> {
        Ok(self.users.lock().ok().and_then(|users| {
            users
                .get(username)
                .filter(|(stored, _)| stored == password)
                .map(|(_, is_admin)| Caller::new(username, *is_admin))
        }))
    }

    async fn set_password(&self, username: &str, password: &str) -> Result<(), DirectoryError> {
        let updated = self.users.lock().ok().is_some_and(|mut users| {
            users
                .get_mut(username)
                .map(|(stored, _)| password.clone_into(stored))
                .is_some()
        });
        if updated {
            Ok(())
        } else {
            Err(DirectoryError::UnknownUser(username.to_owned()))
        }
    }
}

#[cfg(feature = "sqlite")]
pub use self::database::{TempDatabase, seeded_database, temp_database};

#[cfg(feature = "sqlite")]
mod database {
    use anyhow::{Context, Result};
    use tempfile::TempDir;

    use crate::db::{DbPool, apply_migrations, establish_pool};

    /// Migrated `SQLite` database in a temporary directory.
    pub struct TempDatabase {
        /// Pool over the database file.
        pub pool: DbPool,
        /// Path of the database file.
        pub url: String,
        _dir: TempDir,
    }

    /// Create and migrate a throwaway database, then apply
    /// [`seed_scenario`](super::seed_scenario).
    ///
    /// # Errors
    /// Returns any error raised while creating or seeding the database.
    pub async fn seeded_database() -> Result<TempDatabase> {
        let db = temp_database().await?;
        {
            let mut conn = db.pool.get().await.context("failed to get db connection")?;
            super::seed_scenario(&mut conn)
                .await
                .context("failed to seed scenario")?;
        }
        Ok(db)
    }

    /// Create and migrate a throwaway database.
    ///
    /// # Errors
    /// Returns any error raised while creating the file, pool or schema.
    pub async fn temp_database() -> Result<TempDatabase> {
        let dir = TempDir::new().context("failed to create tempdir")?;
        let url = dir
            .path()
            .join("helpdesk.db")
            .to_str()
            .context("database path is not valid UTF-8")?
            .to_owned();
        let pool = establish_pool(&url)
            .await
            .context("failed to establish SQLite pool")?;
        {
            let mut conn = pool.get().await.context("failed to get db connection")?;
            apply_migrations(&mut conn, &url)
                .await
                .context("failed to apply migrations")?;
        }
        Ok(TempDatabase {
            pool,
            url,
            _dir: dir,
        })
    }
}
