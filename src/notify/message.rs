//! Addressed notification messages.

use lettre::{
    Address,
    message::{Mailbox, header::ContentType},
};
use tracing::warn;

/// A fully addressed notification ready for a relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Author.
    pub from: Mailbox,
    /// Submitting agent.
    pub sender: Mailbox,
    /// Primary recipients.
    pub to: Vec<Mailbox>,
    /// Copied recipients.
    pub cc: Vec<Mailbox>,
    /// Reply targets.
    pub reply_to: Vec<Mailbox>,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html_body: String,
}

impl Message {
    /// Every address the message goes to, To first.
    pub fn recipients(&self) -> impl Iterator<Item = &Mailbox> { self.to.iter().chain(&self.cc) }

    /// Build the wire message.
    ///
    /// # Errors
    /// Returns the builder error, e.g. when there are no recipients at all.
    pub fn to_lettre(&self) -> Result<lettre::Message, lettre::error::Error> {
        let mut builder = lettre::Message::builder()
            .from(self.from.clone())
            .sender(self.sender.clone())
            .subject(self.subject.clone())
            .header(ContentType::TEXT_HTML);
        for mailbox in &self.to {
            builder = builder.to(mailbox.clone());
        }
        for mailbox in &self.cc {
            builder = builder.cc(mailbox.clone());
        }
        for mailbox in &self.reply_to {
            builder = builder.reply_to(mailbox.clone());
        }
        builder.body(self.html_body.clone())
    }
}

/// Parse a bare address or `Name <address>` form.
#[must_use]
pub fn parse_mailbox(raw: &str) -> Option<Mailbox> { raw.trim().parse::<Mailbox>().ok() }

/// Mailbox for a named contact.
#[must_use]
pub fn contact_mailbox(name: &str, email: &str) -> Option<Mailbox> {
    let address = email.trim().parse::<Address>().ok()?;
    let name = name.trim();
    Some(Mailbox::new((!name.is_empty()).then(|| name.to_owned()), address))
}

/// Collects recipients, skipping malformed addresses one at a time.
#[derive(Debug, Default)]
pub struct RecipientList {
    mailboxes: Vec<Mailbox>,
}

impl RecipientList {
    /// Add a raw address.
    pub fn push_raw(&mut self, role: &str, raw: &str) -> Option<&Mailbox> {
        match parse_mailbox(raw) {
            Some(mailbox) => {
                self.mailboxes.push(mailbox);
                self.mailboxes.last()
            }
            None => {
                warn!(role, address = raw, "skipping malformed recipient");
                None
            }
        }
    }

    /// Add a named contact.
    pub fn push_contact(&mut self, role: &str, name: &str, email: &str) -> Option<&Mailbox> {
        match contact_mailbox(name, email) {
            Some(mailbox) => {
                self.mailboxes.push(mailbox);
                self.mailboxes.last()
            }
            None => {
                warn!(role, contact = name, address = email, "skipping malformed recipient");
                None
            }
        }
    }

    /// Collected mailboxes.
    #[must_use]
    pub fn into_inner(self) -> Vec<Mailbox> { self.mailboxes }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn contacts_render_as_name_and_address() {
        let mailbox = contact_mailbox("Hank Vance", "hvac@example.org").expect("mailbox");
        assert_eq!(mailbox.to_string(), "Hank Vance <hvac@example.org>");
    }

    #[rstest]
    fn malformed_addresses_are_skipped() {
        let mut list = RecipientList::default();
        assert!(list.push_raw("to", "not an address").is_none());
        assert!(list.push_contact("cc", "Someone", "nobody@").is_none());
        assert!(list.push_raw("to", "ok@example.org").is_some());
        assert_eq!(list.into_inner().len(), 1);
    }

    #[rstest]
    fn builds_wire_message() {
        let from = parse_mailbox("desk@example.org").expect("from");
        let message = Message {
            from: from.clone(),
            sender: from,
            to: vec![parse_mailbox("user@example.org").expect("to")],
            cc: Vec::new(),
            reply_to: Vec::new(),
            subject: "New Ticket Created - Printer".to_owned(),
            html_body: "<p>hi</p>".to_owned(),
        };
        let wire = message.to_lettre().expect("message builds");
        let text = String::from_utf8(wire.formatted()).expect("utf8");
        assert!(text.contains("Subject: New Ticket Created - Printer"));
        assert!(text.contains("Content-Type: text/html"));
    }
}
