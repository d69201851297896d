//! Row types mapped onto the `schema` tables.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{kind::TicketKind, severity::Severity, status::TicketStatus};

/// Directory account.
#[derive(Queryable, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    /// Surrogate key.
    pub id: i32,
    /// Login name.
    pub username: String,
    /// Argon2 PHC string.
    #[serde(skip_serializing)]
    pub password: String,
    /// Contact address.
    pub email: Option<String>,
    /// Member of the administrators role.
    pub is_admin: bool,
}

/// Insertable directory account.
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser<'a> {
    /// Login name.
    pub username: &'a str,
    /// Argon2 PHC string.
    pub password: &'a str,
    /// Contact address.
    pub email: Option<&'a str>,
    /// Member of the administrators role.
    pub is_admin: bool,
}

/// Routing and ownership classification for tickets.
#[derive(Queryable, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// UUID.
    pub id: String,
    /// Short name.
    pub name: String,
    /// Parent category; parents are always roots.
    pub parent_category_id: Option<String>,
    /// Contact display name.
    pub primary_contact: String,
    /// Directory username of the owner.
    pub user_name: String,
    /// Contact address.
    pub primary_email: String,
    /// Contact phone.
    pub phone: Option<String>,
    /// Soft-delete flag.
    pub deleted: bool,
}

/// Insertable category row.
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::categories)]
pub struct NewCategory<'a> {
    /// UUID.
    pub id: &'a str,
    /// Short name.
    pub name: &'a str,
    /// Parent category.
    pub parent_category_id: Option<&'a str>,
    /// Contact display name.
    pub primary_contact: &'a str,
    /// Directory username of the owner.
    pub user_name: &'a str,
    /// Contact address.
    pub primary_email: &'a str,
    /// Contact phone.
    pub phone: Option<&'a str>,
    /// Soft-delete flag.
    pub deleted: bool,
}

/// Editable category columns.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::categories, treat_none_as_null = true)]
pub struct CategoryChangeset<'a> {
    /// Short name.
    pub name: &'a str,
    /// Parent category.
    pub parent_category_id: Option<&'a str>,
    /// Contact display name.
    pub primary_contact: &'a str,
    /// Directory username of the owner.
    pub user_name: &'a str,
    /// Contact address.
    pub primary_email: &'a str,
    /// Contact phone.
    pub phone: Option<&'a str>,
}

/// Physical site a ticket may refer to.
#[derive(Queryable, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// UUID.
    pub id: String,
    /// Site name.
    pub name: String,
    /// First address line.
    pub address1: Option<String>,
    /// Second address line.
    pub address2: Option<String>,
    /// City.
    pub city: Option<String>,
    /// State code.
    pub state: String,
    /// Postal code.
    pub zip: Option<String>,
    /// Contact display name.
    pub primary_contact: String,
    /// Contact address.
    pub primary_email: String,
    /// Contact phone.
    pub phone: String,
    /// Copy the contact on ticket notifications.
    pub send_email: bool,
}

/// Insertable location row.
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::locations)]
pub struct NewLocation<'a> {
    /// UUID.
    pub id: &'a str,
    /// Remaining columns.
    #[diesel(embed)]
    pub fields: LocationChangeset<'a>,
}

/// Editable location columns.
#[derive(Insertable, AsChangeset, Debug)]
#[diesel(table_name = crate::schema::locations, treat_none_as_null = true)]
pub struct LocationChangeset<'a> {
    /// Site name.
    pub name: &'a str,
    /// First address line.
    pub address1: Option<&'a str>,
    /// Second address line.
    pub address2: Option<&'a str>,
    /// City.
    pub city: Option<&'a str>,
    /// State code.
    pub state: &'a str,
    /// Postal code.
    pub zip: Option<&'a str>,
    /// Contact display name.
    pub primary_contact: &'a str,
    /// Contact address.
    pub primary_email: &'a str,
    /// Contact phone.
    pub phone: &'a str,
    /// Copy the contact on ticket notifications.
    pub send_email: bool,
}

/// A user-submitted request.
#[derive(Queryable, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    /// UUID.
    pub id: String,
    /// Intake form.
    #[diesel(deserialize_as = String)]
    pub kind: TicketKind,
    /// Submitter's directory username.
    pub username: String,
    /// Submitter first name.
    pub first_name: String,
    /// Submitter last name.
    pub last_name: Option<String>,
    /// Submitter address.
    pub email: String,
    /// Submitter phone.
    pub phone: Option<String>,
    /// Routing category.
    pub category_id: String,
    /// Site, when relevant.
    pub location_id: Option<String>,
    /// Problem description (the "general idea" for AV requests).
    pub description: String,
    /// Urgency.
    #[diesel(deserialize_as = i32)]
    pub severity: Severity,
    /// Lifecycle position.
    #[diesel(deserialize_as = i32)]
    pub status: TicketStatus,
    /// Staff member handling the ticket.
    pub assigned_to: Option<String>,
    /// Staff notes.
    pub notes: Option<String>,
    /// Resolution summary.
    pub resolution: Option<String>,
    /// IT: affected machine.
    pub pc_name: Option<String>,
    /// AV: audience.
    pub target_ministry: Option<String>,
    /// AV: footage already exists.
    pub existing_footage: bool,
    /// AV: storyboards already exist.
    pub story_boards: bool,
    /// AV: due date.
    pub deadline: Option<NaiveDateTime>,
    /// Creation time.
    pub date_submitted: NaiveDateTime,
    /// Last mutation, including updates.
    pub last_updated: NaiveDateTime,
    /// Optimistic concurrency token.
    pub version: i32,
}

/// Insertable ticket row.
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::tickets)]
pub struct NewTicket<'a> {
    /// UUID.
    pub id: &'a str,
    /// Stored kind discriminator.
    pub kind: &'a str,
    /// Submitter's directory username.
    pub username: &'a str,
    /// Submitter first name.
    pub first_name: &'a str,
    /// Submitter last name.
    pub last_name: Option<&'a str>,
    /// Submitter address.
    pub email: &'a str,
    /// Submitter phone.
    pub phone: Option<&'a str>,
    /// Routing category.
    pub category_id: &'a str,
    /// Site.
    pub location_id: Option<&'a str>,
    /// Problem description.
    pub description: &'a str,
    /// Severity code.
    pub severity: i32,
    /// Status code.
    pub status: i32,
    /// Assignee.
    pub assigned_to: Option<&'a str>,
    /// Staff notes.
    pub notes: Option<&'a str>,
    /// Resolution summary.
    pub resolution: Option<&'a str>,
    /// IT: affected machine.
    pub pc_name: Option<&'a str>,
    /// AV: audience.
    pub target_ministry: Option<&'a str>,
    /// AV: footage already exists.
    pub existing_footage: bool,
    /// AV: storyboards already exist.
    pub story_boards: bool,
    /// AV: due date.
    pub deadline: Option<NaiveDateTime>,
    /// Creation time.
    pub date_submitted: NaiveDateTime,
    /// Last mutation.
    pub last_updated: NaiveDateTime,
    /// Initial concurrency token.
    pub version: i32,
}

/// Columns rewritten by a staff edit.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::tickets, treat_none_as_null = true)]
pub struct TicketChangeset<'a> {
    /// Submitter first name.
    pub first_name: &'a str,
    /// Submitter last name.
    pub last_name: Option<&'a str>,
    /// Submitter address.
    pub email: &'a str,
    /// Submitter phone.
    pub phone: Option<&'a str>,
    /// Routing category.
    pub category_id: &'a str,
    /// Site.
    pub location_id: Option<&'a str>,
    /// Problem description.
    pub description: &'a str,
    /// Severity code.
    pub severity: i32,
    /// Status code.
    pub status: i32,
    /// Assignee.
    pub assigned_to: Option<&'a str>,
    /// Staff notes.
    pub notes: Option<&'a str>,
    /// Resolution summary.
    pub resolution: Option<&'a str>,
    /// IT: affected machine.
    pub pc_name: Option<&'a str>,
    /// AV: audience.
    pub target_ministry: Option<&'a str>,
    /// AV: footage already exists.
    pub existing_footage: bool,
    /// AV: storyboards already exist.
    pub story_boards: bool,
    /// AV: due date.
    pub deadline: Option<NaiveDateTime>,
    /// Mutation time.
    pub last_updated: NaiveDateTime,
}

/// Immutable progress note attached to a ticket.
#[derive(Queryable, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// UUID.
    pub id: String,
    /// Owning ticket.
    pub ticket_id: String,
    /// Author.
    pub username: String,
    /// Note text.
    pub notes: String,
    /// Closes the ticket.
    pub is_resolved: bool,
    /// Status code requested by the author.
    pub status: Option<i32>,
    /// Creation time.
    pub date_created: NaiveDateTime,
}

impl Update {
    /// Requested status, when the stored code is recognised.
    #[must_use]
    pub fn requested_status(&self) -> Option<TicketStatus> {
        self.status.and_then(|code| TicketStatus::try_from(code).ok())
    }
}

/// Insertable update row.
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::updates)]
pub struct NewUpdate<'a> {
    /// UUID.
    pub id: &'a str,
    /// Owning ticket.
    pub ticket_id: &'a str,
    /// Author.
    pub username: &'a str,
    /// Note text.
    pub notes: &'a str,
    /// Closes the ticket.
    pub is_resolved: bool,
    /// Requested status code.
    pub status: Option<i32>,
    /// Creation time.
    pub date_created: NaiveDateTime,
}

/// Runtime configuration entry.
#[derive(Queryable, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SystemParameter {
    /// Documented integer key.
    pub id: i32,
    /// Short name.
    pub name: String,
    /// What the value controls.
    pub description: String,
    /// Raw value.
    pub value: String,
    /// Must be present for the system to operate.
    pub required: bool,
    /// Administrators may change the value.
    pub can_be_edited: bool,
    /// Value is a secret.
    pub is_password: bool,
    /// Creation time.
    pub date_created: NaiveDateTime,
    /// Last change.
    pub last_updated: NaiveDateTime,
    /// Who made the last change.
    pub updated_by: String,
}

/// Insertable parameter row.
#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::system_parameters)]
pub struct NewSystemParameter<'a> {
    /// Documented integer key.
    pub id: i32,
    /// Short name.
    pub name: &'a str,
    /// What the value controls.
    pub description: &'a str,
    /// Raw value.
    pub value: &'a str,
    /// Must be present for the system to operate.
    pub required: bool,
    /// Administrators may change the value.
    pub can_be_edited: bool,
    /// Value is a secret.
    pub is_password: bool,
    /// Creation time.
    pub date_created: NaiveDateTime,
    /// Last change.
    pub last_updated: NaiveDateTime,
    /// Who made the last change.
    pub updated_by: &'a str,
}
