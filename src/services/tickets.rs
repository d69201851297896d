//! Ticket intake, triage and removal.

use chrono::NaiveDateTime;
use diesel::result::Error as DieselError;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{is_blank, is_email, is_phone, new_id, non_blank, now};
use crate::{
    access::Caller,
    category::CategoryTree,
    db::{
        DbConnection,
        DbPool,
        delete_ticket,
        get_category,
        get_location,
        get_ticket,
        insert_ticket,
        list_categories,
        list_updates,
        record_update,
        ticket_exists,
        update_ticket_versioned,
    },
    detail::TicketDetail,
    error::{HelpdeskError, ValidationErrors},
    filter::{FilterCriteria, FilterDisplay, FilterResolver},
    kind::TicketKind,
    models::{NewTicket, NewUpdate, Ticket, TicketChangeset},
    notify::{Mailer, NotificationComposer, NotificationEvent, should_notify_delete},
    paging::{Page, PagingService},
    query::{TicketFilter, get_tickets},
    severity::Severity,
    status::TicketStatus,
};

/// Listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketQuery {
    /// Selectors for category, status and severity.
    pub criteria: FilterCriteria,
    /// Username suffix filter.
    pub username: Option<String>,
    /// Kind filter.
    pub kind: Option<TicketKind>,
    /// Zero-based page.
    pub page: usize,
}

impl Default for TicketQuery {
    fn default() -> Self {
        Self {
            criteria: FilterCriteria::landing(),
            username: None,
            kind: None,
            page: 0,
        }
    }
}

/// One page of tickets with the select lists that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketPage {
    /// Tickets on this page.
    pub tickets: Vec<Ticket>,
    /// Page metadata.
    pub page: Page,
    /// Select lists with the active selection marked.
    pub filters: FilterDisplay,
}

/// Fields accepted when submitting or editing a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TicketForm {
    /// Intake form; ignored on edit.
    #[serde(default)]
    pub kind: TicketKind,
    /// Submitter first name.
    pub first_name: String,
    /// Submitter last name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Submitter address.
    pub email: String,
    /// Submitter phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Routing category.
    pub category_id: String,
    /// Site.
    #[serde(default)]
    pub location_id: Option<String>,
    /// Problem description.
    pub description: String,
    /// Urgency.
    pub severity: Severity,
    /// Requested status; new tickets default to submitted.
    #[serde(default)]
    pub status: Option<TicketStatus>,
    /// Assignee.
    #[serde(default)]
    pub assigned_to: Option<String>,
    /// Staff notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Resolution summary.
    #[serde(default)]
    pub resolution: Option<String>,
    /// IT: affected machine.
    #[serde(default)]
    pub pc_name: Option<String>,
    /// AV: audience.
    #[serde(default)]
    pub target_ministry: Option<String>,
    /// AV: footage exists.
    #[serde(default)]
    pub existing_footage: bool,
    /// AV: storyboards exist.
    #[serde(default)]
    pub story_boards: bool,
    /// AV: due date.
    #[serde(default)]
    pub deadline: Option<NaiveDateTime>,
}

/// Edit request: the form plus the version the editor last saw.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EditTicketForm {
    /// Concurrency token read with the ticket.
    pub version: i32,
    /// New field values.
    #[serde(flatten)]
    pub ticket: TicketForm,
}

/// Progress note request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateForm {
    /// Note text.
    pub notes: String,
    /// Close the ticket.
    #[serde(default)]
    pub is_resolved: bool,
    /// Requested forward status.
    #[serde(default)]
    pub status: Option<TicketStatus>,
}

/// What happened to the notification for a mutation.
#[derive(Debug)]
pub enum Delivery {
    /// A message was handed to the relay on this task.
    Dispatched(JoinHandle<()>),
    /// No message was due.
    Suppressed,
}

impl Delivery {
    /// Whether a message was sent off.
    #[must_use]
    pub const fn was_dispatched(&self) -> bool { matches!(self, Self::Dispatched(_)) }

    /// Wait for the background send, if any, to finish.
    pub async fn settle(self) {
        if let Self::Dispatched(handle) = self {
            if let Err(err) = handle.await {
                debug!(error = %err, "delivery task did not complete");
            }
        }
    }
}

/// Result of a mutation together with its notification.
#[derive(Debug)]
pub struct Notified<T> {
    /// Mutated record.
    pub value: T,
    /// Notification hand-off.
    pub delivery: Delivery,
}

/// Ticket operations.
#[derive(Clone)]
pub struct TicketService {
    pool: DbPool,
    composer: NotificationComposer,
    mailer: Mailer,
    paging: PagingService,
    resolver: FilterResolver,
}

impl TicketService {
    /// Assemble the service from its collaborators.
    #[must_use]
    pub const fn new(
        pool: DbPool,
        composer: NotificationComposer,
        mailer: Mailer,
        paging: PagingService,
    ) -> Self {
        Self {
            pool,
            composer,
            mailer,
            paging,
            resolver: FilterResolver,
        }
    }

    /// Filtered, paged tickets visible to `caller`.
    ///
    /// # Errors
    /// Returns [`HelpdeskError::Filter`] for malformed selectors, or database
    /// errors.
    pub async fn list(&self, query: &TicketQuery, caller: &Caller) -> Result<TicketPage, HelpdeskError> {
        let mut conn = self.pool.get().await?;
        let tree = CategoryTree::new(list_categories(&mut conn, true).await?);
        let (resolved, filters) = self.resolver.resolve(&query.criteria, &tree)?;
        let filter = TicketFilter::from(resolved)
            .with_username_suffix(query.username.as_deref())
            .with_kind(query.kind);
        let tickets = get_tickets(&mut conn, &filter, caller).await?;
        let (tickets, page) = self.paging.paginate(tickets, query.page);
        Ok(TicketPage {
            tickets,
            page,
            filters,
        })
    }

    /// One ticket with its category, location and updates.
    ///
    /// # Errors
    /// Returns [`HelpdeskError::NotFound`] or [`HelpdeskError::Forbidden`]
    /// when the ticket is missing or hidden from `caller`.
    pub async fn detail(&self, id: &str, caller: &Caller) -> Result<TicketDetail, HelpdeskError> {
        let mut conn = self.pool.get().await?;
        let ticket = visible_ticket(&mut conn, id, caller).await?;
        load_detail(&mut conn, ticket).await
    }

    /// Submit a ticket on behalf of `caller` and notify its recipients.
    ///
    /// # Errors
    /// Returns [`HelpdeskError::Validation`] for bad input, in which case
    /// nothing is stored. Configuration errors raised while composing the
    /// notification are returned after the ticket has been stored.
    pub async fn create(
        &self,
        form: &TicketForm,
        caller: &Caller,
    ) -> Result<Notified<TicketDetail>, HelpdeskError> {
        let detail = {
            let mut conn = self.pool.get().await?;
            validate_form(&mut conn, form, None).await?;
            let id = new_id();
            let stamp = now();
            let status = form.status.unwrap_or(TicketStatus::Submitted).normalize_initial();
            let row = NewTicket {
                id: &id,
                kind: form.kind.as_str(),
                username: &caller.username,
                first_name: form.first_name.trim(),
                last_name: non_blank(form.last_name.as_deref()),
                email: form.email.trim(),
                phone: non_blank(form.phone.as_deref()),
                category_id: &form.category_id,
                location_id: non_blank(form.location_id.as_deref()),
                description: &form.description,
                severity: form.severity.code(),
                status: status.code(),
                assigned_to: non_blank(form.assigned_to.as_deref()),
                notes: non_blank(form.notes.as_deref()),
                resolution: non_blank(form.resolution.as_deref()),
                pc_name: non_blank(form.pc_name.as_deref()),
                target_ministry: non_blank(form.target_ministry.as_deref()),
                existing_footage: form.existing_footage,
                story_boards: form.story_boards,
                deadline: form.deadline,
                date_submitted: stamp,
                last_updated: stamp,
                version: 0,
            };
            insert_ticket(&mut conn, &row).await?;
            info!(ticket = %id, kind = %form.kind, user = %caller.username, "ticket created");
            let ticket = get_ticket(&mut conn, &id)
                .await?
                .ok_or_else(|| HelpdeskError::not_found("ticket", &id))?;
            load_detail(&mut conn, ticket).await?
        };
        let delivery = self.notify(NotificationEvent::Create, &detail, false).await?;
        Ok(Notified {
            value: detail,
            delivery,
        })
    }

    /// Rewrite a ticket if it still has `form.version`.
    ///
    /// Any status may be set here; moving backwards or out of a terminal
    /// state is logged as an override.
    ///
    /// # Errors
    /// Returns [`HelpdeskError::ConcurrencyConflict`] when the ticket changed
    /// since it was read, [`HelpdeskError::NotFound`] when it vanished, and
    /// validation or access errors as for [`Self::create`].
    pub async fn edit(
        &self,
        id: &str,
        form: &EditTicketForm,
        caller: &Caller,
    ) -> Result<Notified<TicketDetail>, HelpdeskError> {
        let (detail, resolved) = {
            let mut conn = self.pool.get().await?;
            let current = visible_ticket(&mut conn, id, caller).await?;
            let fields = &form.ticket;
            validate_form(&mut conn, fields, Some(current.category_id.as_str())).await?;
            let status = fields.status.unwrap_or(current.status);
            if current.status.is_override(status) {
                warn!(
                    ticket = %id,
                    from = %current.status,
                    to = %status,
                    user = %caller.username,
                    "manual status override"
                );
            }
            let changes = TicketChangeset {
                first_name: fields.first_name.trim(),
                last_name: non_blank(fields.last_name.as_deref()),
                email: fields.email.trim(),
                phone: non_blank(fields.phone.as_deref()),
                category_id: &fields.category_id,
                location_id: non_blank(fields.location_id.as_deref()),
                description: &fields.description,
                severity: fields.severity.code(),
                status: status.code(),
                assigned_to: non_blank(fields.assigned_to.as_deref()),
                notes: non_blank(fields.notes.as_deref()),
                resolution: non_blank(fields.resolution.as_deref()),
                pc_name: non_blank(fields.pc_name.as_deref()),
                target_ministry: non_blank(fields.target_ministry.as_deref()),
                existing_footage: fields.existing_footage,
                story_boards: fields.story_boards,
                deadline: fields.deadline,
                last_updated: now(),
            };
            let touched = update_ticket_versioned(&mut conn, id, form.version, &changes).await?;
            if touched == 0 {
                return Err(stale_write(&mut conn, id).await?);
            }
            info!(ticket = %id, status = %status, user = %caller.username, "ticket edited");
            let ticket = get_ticket(&mut conn, id)
                .await?
                .ok_or_else(|| HelpdeskError::not_found("ticket", id))?;
            let resolved = status == TicketStatus::Closed && current.status != TicketStatus::Closed;
            (load_detail(&mut conn, ticket).await?, resolved)
        };
        let delivery = self.notify(NotificationEvent::Edit, &detail, resolved).await?;
        Ok(Notified {
            value: detail,
            delivery,
        })
    }

    /// Attach a progress note and advance the ticket's status.
    ///
    /// # Errors
    /// Returns [`HelpdeskError::Validation`] for blank notes or a status that
    /// would move the ticket backwards or out of a terminal state.
    pub async fn add_update(
        &self,
        id: &str,
        form: &UpdateForm,
        caller: &Caller,
    ) -> Result<Notified<TicketDetail>, HelpdeskError> {
        let (detail, resolved) = {
            let mut conn = self.pool.get().await?;
            let current = visible_ticket(&mut conn, id, caller).await?;
            let mut errors = ValidationErrors::default();
            errors.check(!is_blank(&form.notes), "notes", "notes are required");
            errors.finish()?;
            let next = current.status.after_update(form.is_resolved, form.status)?;
            let update_id = new_id();
            let row = NewUpdate {
                id: &update_id,
                ticket_id: id,
                username: &caller.username,
                notes: form.notes.trim(),
                is_resolved: form.is_resolved,
                status: form.status.map(TicketStatus::code),
                date_created: now(),
            };
            record_update(&mut conn, &row, next)
                .await
                .map_err(|err| match err {
                    DieselError::NotFound => HelpdeskError::not_found("ticket", id),
                    other => other.into(),
                })?;
            info!(ticket = %id, update = %update_id, status = %next, user = %caller.username, "update recorded");
            let ticket = get_ticket(&mut conn, id)
                .await?
                .ok_or_else(|| HelpdeskError::not_found("ticket", id))?;
            let resolved = form.is_resolved
                || (next == TicketStatus::Closed && current.status != TicketStatus::Closed);
            (load_detail(&mut conn, ticket).await?, resolved)
        };
        let delivery = self.notify(NotificationEvent::Update, &detail, resolved).await?;
        Ok(Notified {
            value: detail,
            delivery,
        })
    }

    /// Remove a ticket and its updates.
    ///
    /// Only administrators removing a ticket that was not closed trigger a
    /// notification.
    ///
    /// # Errors
    /// Returns [`HelpdeskError::NotFound`] or [`HelpdeskError::Forbidden`]
    /// when the ticket is missing or hidden from `caller`.
    pub async fn delete(&self, id: &str, caller: &Caller) -> Result<Notified<Ticket>, HelpdeskError> {
        let (ticket, detail) = {
            let mut conn = self.pool.get().await?;
            let ticket = visible_ticket(&mut conn, id, caller).await?;
            let detail = if should_notify_delete(&ticket, caller) {
                Some(load_detail(&mut conn, ticket.clone()).await?)
            } else {
                None
            };
            if delete_ticket(&mut conn, id).await? == 0 {
                return Err(HelpdeskError::not_found("ticket", id));
            }
            info!(ticket = %id, user = %caller.username, "ticket deleted");
            (ticket, detail)
        };
        let delivery = match detail {
            Some(detail) => self.notify(NotificationEvent::Delete, &detail, false).await?,
            None => Delivery::Suppressed,
        };
        Ok(Notified {
            value: ticket,
            delivery,
        })
    }

    async fn notify(
        &self,
        event: NotificationEvent,
        detail: &TicketDetail,
        resolved: bool,
    ) -> Result<Delivery, HelpdeskError> {
        let message = self.composer.compose_message(event, detail, resolved).await?;
        Ok(Delivery::Dispatched(self.mailer.dispatch(message)))
    }
}

async fn visible_ticket(conn: &mut DbConnection, id: &str, caller: &Caller) -> Result<Ticket, HelpdeskError> {
    let ticket = get_ticket(conn, id)
        .await?
        .ok_or_else(|| HelpdeskError::not_found("ticket", id))?;
    if caller.is_admin || ticket.username == caller.username {
        return Ok(ticket);
    }
    let tree = CategoryTree::new(list_categories(conn, true).await?);
    if caller.can_view(&ticket, &tree) {
        Ok(ticket)
    } else {
        Err(HelpdeskError::Forbidden(format!(
            "{} may not access ticket {id}",
            caller.username
        )))
    }
}

/// Classify a versioned write that matched no row: the ticket either
/// vanished or carries a newer version.
pub(super) async fn stale_write(conn: &mut DbConnection, id: &str) -> Result<HelpdeskError, HelpdeskError> {
    Ok(if ticket_exists(conn, id).await? {
        HelpdeskError::ConcurrencyConflict(id.to_owned())
    } else {
        HelpdeskError::not_found("ticket", id)
    })
}

async fn load_detail(conn: &mut DbConnection, ticket: Ticket) -> Result<TicketDetail, HelpdeskError> {
    let category = get_category(conn, &ticket.category_id)
        .await?
        .ok_or_else(|| HelpdeskError::not_found("category", &ticket.category_id))?;
    let parent_category = match category.parent_category_id.as_deref() {
        Some(parent_id) => get_category(conn, parent_id).await?,
        None => None,
    };
    let location = match ticket.location_id.as_deref() {
        Some(location_id) => get_location(conn, location_id).await?,
        None => None,
    };
    let updates = list_updates(conn, &ticket.id).await?;
    Ok(TicketDetail {
        ticket,
        category,
        parent_category,
        location,
        updates,
    })
}

/// `kept_category` is the ticket's stored category; it stays valid after a
/// soft delete.
async fn validate_form(
    conn: &mut DbConnection,
    form: &TicketForm,
    kept_category: Option<&str>,
) -> Result<(), HelpdeskError> {
    let mut errors = ValidationErrors::default();
    errors.check(!is_blank(&form.first_name), "first_name", "first name is required");
    errors.check(!is_blank(&form.description), "description", "description is required");
    errors.check(is_email(&form.email), "email", "email is not a valid address");
    if let Some(phone) = non_blank(form.phone.as_deref()) {
        errors.check(is_phone(phone), "phone", "phone must look like 555-555-5555");
    }
    match get_category(conn, &form.category_id).await? {
        Some(category) if !category.deleted || kept_category == Some(category.id.as_str()) => {}
        Some(_) => errors.push("category_id", "category has been deleted"),
        None => errors.push("category_id", "category does not exist"),
    }
    if let Some(location_id) = non_blank(form.location_id.as_deref()) {
        if get_location(conn, location_id).await?.is_none() {
            errors.push("location_id", "location does not exist");
        }
    }
    errors.finish()
}
