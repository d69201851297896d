//! Request-level operations over the ticket store.
//!
//! Each service owns a pool handle and returns [`HelpdeskError`] so the HTTP
//! layer can map outcomes onto status codes in one place.

mod catalog;
mod parameters;
mod tickets;

#[cfg(all(test, feature = "sqlite"))]
mod tests;

use std::sync::LazyLock;

use chrono::{NaiveDateTime, Utc};
use lettre::Address;
use regex::Regex;
use tracing::error;
use uuid::Uuid;

pub use self::{
    catalog::{CatalogService, CategoryForm, CategoryView, LocationForm},
    parameters::{MASKED_VALUE, ParameterService, ParameterView},
    tickets::{
        Delivery,
        EditTicketForm,
        Notified,
        TicketForm,
        TicketPage,
        TicketQuery,
        TicketService,
        UpdateForm,
    },
};
use crate::{access::Caller, error::HelpdeskError};

const PHONE_PATTERN: &str = r"^\(?\d{3}\)?[-. ]?\d{3}[-. ]?\d{4}$";
const ZIP_PATTERN: &str = r"^\d{5}(-\d{4})?$";

static PHONE: LazyLock<Option<Regex>> = LazyLock::new(|| compile(PHONE_PATTERN));
static ZIP: LazyLock<Option<Regex>> = LazyLock::new(|| compile(ZIP_PATTERN));

/// A pattern that fails to compile rejects every value; the failure is logged
/// once when the pattern is first used.
fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .inspect_err(|err| error!(%pattern, error = %err, "validation pattern failed to compile"))
        .ok()
}

pub(crate) fn now() -> NaiveDateTime { Utc::now().naive_utc() }

pub(crate) fn new_id() -> String { Uuid::new_v4().to_string() }

pub(crate) fn is_email(raw: &str) -> bool { raw.trim().parse::<Address>().is_ok() }

pub(crate) fn is_phone(raw: &str) -> bool {
    PHONE.as_ref().is_some_and(|re| re.is_match(raw.trim()))
}

pub(crate) fn is_zip(raw: &str) -> bool { ZIP.as_ref().is_some_and(|re| re.is_match(raw.trim())) }

pub(crate) fn is_blank(raw: &str) -> bool { raw.trim().is_empty() }

/// Trimmed text, or `None` when blank.
pub(crate) fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

pub(crate) fn require_admin(caller: &Caller, action: &str) -> Result<(), HelpdeskError> {
    if caller.is_admin {
        Ok(())
    } else {
        Err(HelpdeskError::Forbidden(format!(
            "only administrators may {action}"
        )))
    }
}
