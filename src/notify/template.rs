//! Notification body rendering.

use std::fmt::Write as _;

use serde::Serialize;
use thiserror::Error;

use super::NotificationEvent;
use crate::{detail::TicketDetail, kind::TicketKind};

/// Selects the body template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TemplateKey {
    /// Lifecycle event.
    pub event: NotificationEvent,
    /// Intake kind of the ticket.
    pub kind: TicketKind,
}

/// Rendering failure.
#[derive(Debug, Error)]
#[error("failed to render {key:?}: {reason}")]
pub struct RenderError {
    /// Template that failed.
    pub key: TemplateKey,
    /// Cause.
    pub reason: String,
}

/// Produces the HTML body for a notification.
pub trait TemplateRenderer: Send + Sync {
    /// Render `ticket` with the template chosen by `key`.
    ///
    /// # Errors
    /// Returns [`RenderError`] when the template cannot be rendered.
    fn render(&self, key: TemplateKey, ticket: &TicketDetail) -> Result<String, RenderError>;
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Plain HTML summary used when no custom templates are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinRenderer;

impl BuiltinRenderer {
    fn heading(key: TemplateKey) -> String {
        let label = key.kind.label();
        match key.event {
            NotificationEvent::Create => format!("A new {label} has been submitted"),
            NotificationEvent::Edit => format!("{label} has been edited"),
            NotificationEvent::Update => format!("{label} has a new update"),
            NotificationEvent::Delete => format!("{label} has been deleted"),
        }
    }

    fn kind_rows(detail: &TicketDetail) -> Vec<(&'static str, String)> {
        let ticket = &detail.ticket;
        match ticket.kind {
            TicketKind::It => vec![("PC Name", ticket.pc_name.clone().unwrap_or_default())],
            TicketKind::Av => vec![
                ("Target Ministry", ticket.target_ministry.clone().unwrap_or_default()),
                ("Existing Footage", yes_no(ticket.existing_footage).to_owned()),
                ("Storyboards", yes_no(ticket.story_boards).to_owned()),
                (
                    "Deadline",
                    ticket
                        .deadline
                        .map(|d| d.format("%m-%d-%Y").to_string())
                        .unwrap_or_default(),
                ),
            ],
            TicketKind::General | TicketKind::Buildings => Vec::new(),
        }
    }
}

const fn yes_no(flag: bool) -> &'static str { if flag { "Yes" } else { "No" } }

impl TemplateRenderer for BuiltinRenderer {
    fn render(&self, key: TemplateKey, detail: &TicketDetail) -> Result<String, RenderError> {
        let ticket = &detail.ticket;
        let submitter = match &ticket.last_name {
            Some(last) => format!("{} {last}", ticket.first_name),
            None => ticket.first_name.clone(),
        };
        let mut rows = vec![
            ("Submitted By", submitter),
            ("Email", ticket.email.clone()),
            ("Category", detail.category_display_name()),
            (
                "Location",
                detail
                    .location
                    .as_ref()
                    .map(|l| l.name.clone())
                    .unwrap_or_default(),
            ),
            ("Severity", ticket.severity.to_string()),
            ("Status", ticket.status.to_string()),
            ("Assigned To", ticket.assigned_to.clone().unwrap_or_default()),
            ("Description", ticket.description.clone()),
            ("Resolution", ticket.resolution.clone().unwrap_or_default()),
        ];
        rows.extend(Self::kind_rows(detail));

        let mut html = String::new();
        html.push_str("<html><body>");
        html.push_str("<h2>");
        html.push_str(&html_escape(&Self::heading(key)));
        html.push_str("</h2><table>");
        for (label, value) in rows {
            html.push_str("<tr><th align=\"left\">");
            html.push_str(label);
            html.push_str("</th><td>");
            html.push_str(&html_escape(&value));
            html.push_str("</td></tr>");
        }
        html.push_str("</table>");
        if !detail.updates.is_empty() {
            html.push_str("<h3>Updates</h3><ul>");
            for update in &detail.updates {
                write!(
                    html,
                    "<li>{} ({}): {}</li>",
                    html_escape(&update.username),
                    update.date_created.format("%m-%d-%Y %H:%M"),
                    html_escape(&update.notes)
                )
                .map_err(|e| RenderError {
                    key,
                    reason: e.to_string(),
                })?;
            }
            html.push_str("</ul>");
        }
        html.push_str("</body></html>");
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::html_escape;

    #[rstest]
    fn escapes_markup() {
        assert_eq!(html_escape("<b>\"R&D\"</b>"), "&lt;b&gt;&quot;R&amp;D&quot;&lt;/b&gt;");
    }
}
