//! Caller identity and ticket visibility.

use serde::{Deserialize, Serialize};

use crate::{category::CategoryTree, models::Ticket};

/// Authenticated principal making a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Directory username.
    pub username: String,
    /// Member of the administrators role.
    pub is_admin: bool,
}

impl Caller {
    /// Build a caller.
    #[must_use]
    pub fn new(username: impl Into<String>, is_admin: bool) -> Self {
        Self {
            username: username.into(),
            is_admin,
        }
    }

    /// Whether the caller may see `ticket`: administrators see everything,
    /// everyone else sees what they submitted and what is routed to a
    /// category they own.
    #[must_use]
    pub fn can_view(&self, ticket: &Ticket, tree: &CategoryTree) -> bool {
        self.is_admin
            || ticket.username == self.username
            || tree.is_owned_by(&ticket.category_id, &self.username)
    }
}
