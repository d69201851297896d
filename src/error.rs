//! Errors surfaced by helpdesk services.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::{
    category::HierarchyError,
    db::PoolRunError,
    filter::FilterError,
    notify::{NotifyError, RenderError},
    params::ParameterError,
    status::TransitionError,
};

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Input field name.
    pub field: &'static str,
    /// Human-readable reason.
    pub message: String,
}

/// Field-level validation failures collected from one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Record a failure for `field`.
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Record a failure for `field` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: &'static str, message: &str) {
        if !ok {
            self.push(field, message);
        }
    }

    /// Whether no failures were recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Recorded failures.
    #[must_use]
    pub fn fields(&self) -> &[FieldError] { &self.0 }

    /// `Ok(())` when empty, otherwise the collected failures.
    ///
    /// # Errors
    /// Returns [`HelpdeskError::Validation`] when any failure was recorded.
    pub fn finish(self) -> Result<(), HelpdeskError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(HelpdeskError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for e in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

/// Failures returned by helpdesk operations.
#[derive(Debug, Error)]
pub enum HelpdeskError {
    /// A referenced record does not exist.
    #[error("{entity} \"{id}\" not found")]
    NotFound {
        /// Record type.
        entity: &'static str,
        /// Requested id.
        id: String,
    },
    /// The ticket changed since the caller read it.
    #[error("ticket \"{0}\" was modified by someone else")]
    ConcurrencyConflict(String),
    /// A system parameter is missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(#[from] ParameterError),
    /// Request input failed validation.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    /// The caller may not perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// A filter selection could not be decoded.
    #[error(transparent)]
    Filter(#[from] FilterError),
    /// A notification body could not be rendered.
    #[error(transparent)]
    Render(#[from] RenderError),
    /// Database failure.
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    /// Pool checkout failure.
    #[error("database pool error: {0}")]
    Pool(#[from] PoolRunError),
}

impl HelpdeskError {
    /// Shorthand for [`HelpdeskError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Single-field validation failure.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::default();
        errors.push(field, message);
        Self::Validation(errors)
    }
}

impl From<NotifyError> for HelpdeskError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::Parameter(e) => Self::Configuration(e),
            NotifyError::InvalidSender(raw) => Self::Configuration(ParameterError::Invalid {
                id: crate::params::Param::Sender.id(),
                value: raw,
                expected: "a mailbox such as \"Helpdesk <helpdesk@example.org>\"",
            }),
            NotifyError::Render(e) => Self::Render(e),
        }
    }
}

impl From<HierarchyError> for HelpdeskError {
    fn from(err: HierarchyError) -> Self { Self::invalid("parent_category_id", err.to_string()) }
}

impl From<TransitionError> for HelpdeskError {
    fn from(err: TransitionError) -> Self { Self::invalid("status", err.to_string()) }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn collects_fields_in_order() {
        let mut errors = ValidationErrors::default();
        errors.check(true, "email", "unused");
        errors.push("email", "is not an address");
        errors.check(false, "description", "is required");
        assert_eq!(errors.to_string(), "email: is not an address; description: is required");
        assert!(matches!(errors.finish(), Err(HelpdeskError::Validation(e)) if e.fields().len() == 2));
    }

    #[rstest]
    fn empty_validation_passes() {
        assert!(ValidationErrors::default().finish().is_ok());
    }

    #[rstest]
    fn malformed_sender_is_configuration() {
        let err = HelpdeskError::from(NotifyError::InvalidSender("nobody".into()));
        assert!(matches!(
            err,
            HelpdeskError::Configuration(ParameterError::Invalid { id: 10, .. })
        ));
    }
}
