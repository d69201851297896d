//! Lifecycle notifications.
//!
//! [`NotificationComposer`] turns a ticket and an event into an addressed
//! [`Message`]; [`Mailer`] hands it to a [`MailRelay`] in the background.
//!
//! Recipients:
//! - To: the submitter, the category contact (also Reply-To) and the
//!   per-kind routing address when one is configured.
//! - Cc: the parent category contact, the location contact when the location
//!   opts in, and the administrator list when the admin-cc toggle is on.

mod message;
mod relay;
mod template;


use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

#[cfg(any(test, feature = "test-support"))]
pub use self::relay::RecordingRelay;
pub use self::{
    message::{Message, RecipientList, contact_mailbox, parse_mailbox},
    relay::{MailRelay, MailSettings, Mailer, RelayError, SmtpRelay},
    template::{BuiltinRenderer, RenderError, TemplateKey, TemplateRenderer},
};
use crate::{
    access::Caller,
    detail::TicketDetail,
    kind::TicketKind,
    models::Ticket,
    params::{Param, ParameterError, ParameterStore},
    status::TicketStatus,
};

/// Ticket lifecycle events that trigger mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NotificationEvent {
    /// Ticket submitted.
    Create,
    /// Ticket edited by staff.
    Edit,
    /// Progress update recorded.
    Update,
    /// Ticket removed.
    Delete,
}

/// Composition failures.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// A required parameter is missing or malformed.
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    /// The sender parameter is not an address.
    #[error("sender address \"{0}\" is not a valid mailbox")]
    InvalidSender(String),
    /// The body could not be rendered.
    #[error(transparent)]
    Render(#[from] RenderError),
}

const STUB_CHARS: usize = 9;

/// Leading characters of a description for use in a subject line.
#[must_use]
pub fn subject_stub(description: &str) -> String {
    let flattened: String = description
        .chars()
        .map(|c| if matches!(c, '\r' | '\n') { ' ' } else { c })
        .collect();
    let mut chars = flattened.trim().chars();
    let head: String = chars.by_ref().take(STUB_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head.trim_end())
    } else {
        head
    }
}

/// Subject line for `event`.
#[must_use]
pub fn subject_line(event: NotificationEvent, kind: TicketKind, description: &str, resolved: bool) -> String {
    let label = kind.label();
    let stub = subject_stub(description);
    match event {
        NotificationEvent::Create => format!("New {label} Created - {stub}"),
        NotificationEvent::Edit if resolved => format!("{label} Resolved - {stub}"),
        NotificationEvent::Edit => format!("{label} Edited - {stub}"),
        NotificationEvent::Update if resolved => format!("{label} Resolved - {stub}"),
        NotificationEvent::Update => format!("{label} Updated - {stub}"),
        NotificationEvent::Delete => format!("{label} Deleted - {stub}"),
    }
}

/// Whether deleting `ticket` should notify anyone: only administrators
/// deleting tickets that were not already closed.
#[must_use]
pub fn should_notify_delete(ticket: &Ticket, caller: &Caller) -> bool {
    caller.is_admin && ticket.status != TicketStatus::Closed
}

const fn routing_param(kind: TicketKind) -> Option<Param> {
    match kind {
        TicketKind::It => Some(Param::ItAddress),
        TicketKind::Buildings => Some(Param::BuildingsAddress),
        TicketKind::General | TicketKind::Av => None,
    }
}

/// Builds addressed notification messages.
#[derive(Clone)]
pub struct NotificationComposer {
    params: Arc<dyn ParameterStore>,
    renderer: Arc<dyn TemplateRenderer>,
}

impl NotificationComposer {
    /// Compose with the given parameter source and renderer.
    #[must_use]
    pub fn new(params: Arc<dyn ParameterStore>, renderer: Arc<dyn TemplateRenderer>) -> Self {
        Self { params, renderer }
    }

    /// Build the message for `event` on `detail`.
    ///
    /// `resolved` selects the "Resolved" subject wording for edits and
    /// updates.
    ///
    /// # Errors
    /// Returns [`NotifyError`] when required parameters are missing, the
    /// sender is malformed, or rendering fails. Malformed recipient addresses
    /// are skipped instead.
    pub async fn compose_message(
        &self,
        event: NotificationEvent,
        detail: &TicketDetail,
        resolved: bool,
    ) -> Result<Message, NotifyError> {
        let sender_raw = self.params.required(Param::Sender).await?;
        let sender = parse_mailbox(&sender_raw).ok_or(NotifyError::InvalidSender(sender_raw))?;
        let admin_list = self.params.list(Param::AdminList).await?;
        let admin_cc = self.params.flag(Param::AdminCc).await?;
        let routing = match routing_param(detail.ticket.kind) {
            Some(param) => self.params.optional(param).await?,
            None => None,
        };

        let ticket = &detail.ticket;
        let mut to = RecipientList::default();
        let mut reply_to = Vec::new();
        to.push_raw("submitter", &ticket.email);
        if let Some(owner) = to.push_contact(
            "category",
            &detail.category.primary_contact,
            &detail.category.primary_email,
        ) {
            reply_to.push(owner.clone());
        }
        if let Some(address) = &routing {
            to.push_raw("routing", address);
        }

        let mut cc = RecipientList::default();
        if let Some(parent) = &detail.parent_category {
            cc.push_contact("parent category", &parent.primary_contact, &parent.primary_email);
        }
        if let Some(location) = detail.location.as_ref().filter(|l| l.send_email) {
            cc.push_contact("location", &location.primary_contact, &location.primary_email);
        }
        if admin_cc {
            for address in &admin_list {
                cc.push_raw("admin", address);
            }
        }

        let key = TemplateKey {
            event,
            kind: ticket.kind,
        };
        let html_body = self.renderer.render(key, detail)?;
        Ok(Message {
            from: sender.clone(),
            sender,
            to: to.into_inner(),
            cc: cc.into_inner(),
            reply_to,
            subject: subject_line(event, ticket.kind, &ticket.description, resolved),
            html_body,
        })
    }
}
