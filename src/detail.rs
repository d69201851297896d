//! Fully populated ticket view.

use serde::Serialize;

use crate::{
    category::display_name,
    models::{Category, Location, Ticket, Update},
};

/// A ticket with the records it references and its update history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketDetail {
    /// Ticket row.
    pub ticket: Ticket,
    /// Routing category.
    pub category: Category,
    /// Parent of the routing category.
    pub parent_category: Option<Category>,
    /// Referenced location.
    pub location: Option<Location>,
    /// Updates, newest first.
    pub updates: Vec<Update>,
}

impl TicketDetail {
    /// Category label, e.g. `"Buildings - HVAC"`.
    #[must_use]
    pub fn category_display_name(&self) -> String {
        display_name(&self.category, self.parent_category.as_ref())
    }
}
