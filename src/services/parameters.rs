//! System parameter administration.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{now, require_admin};
use crate::{
    access::Caller,
    db::{DbPool, get_parameter, list_parameters, set_parameter_value},
    error::HelpdeskError,
    models::SystemParameter,
};

/// Placeholder shown instead of secret values.
pub const MASKED_VALUE: &str = "********";

/// Parameter as shown to administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterView {
    /// Documented id.
    pub id: i32,
    /// Short name.
    pub name: String,
    /// What the value controls.
    pub description: String,
    /// Value, masked for secrets.
    pub value: String,
    /// Must be present for the system to operate.
    pub required: bool,
    /// Administrators may change the value.
    pub can_be_edited: bool,
    /// Value is a secret.
    pub is_password: bool,
    /// Last change.
    pub last_updated: NaiveDateTime,
    /// Who made the last change.
    pub updated_by: String,
}

impl From<SystemParameter> for ParameterView {
    fn from(p: SystemParameter) -> Self {
        let value = if p.is_password && !p.value.is_empty() {
            MASKED_VALUE.to_owned()
        } else {
            p.value
        };
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            value,
            required: p.required,
            can_be_edited: p.can_be_edited,
            is_password: p.is_password,
            last_updated: p.last_updated,
            updated_by: p.updated_by,
        }
    }
}

/// Admin-only parameter reads and edits.
#[derive(Clone)]
pub struct ParameterService {
    pool: DbPool,
}

impl ParameterService {
    /// Wrap a pool.
    #[must_use]
    pub const fn new(pool: DbPool) -> Self { Self { pool } }

    /// Every parameter ordered by id.
    ///
    /// # Errors
    /// Returns [`HelpdeskError::Forbidden`] for non-administrators.
    pub async fn list(&self, caller: &Caller) -> Result<Vec<ParameterView>, HelpdeskError> {
        require_admin(caller, "view system parameters")?;
        let mut conn = self.pool.get().await?;
        Ok(list_parameters(&mut conn)
            .await?
            .into_iter()
            .map(ParameterView::from)
            .collect())
    }

    /// One parameter.
    ///
    /// # Errors
    /// Returns [`HelpdeskError::Forbidden`] for non-administrators and
    /// [`HelpdeskError::NotFound`] for unknown ids.
    pub async fn get(&self, id: i32, caller: &Caller) -> Result<ParameterView, HelpdeskError> {
        require_admin(caller, "view system parameters")?;
        let mut conn = self.pool.get().await?;
        get_parameter(&mut conn, id)
            .await?
            .map(ParameterView::from)
            .ok_or_else(|| HelpdeskError::not_found("parameter", id.to_string()))
    }

    /// Replace a parameter value, recording `caller` as the editor.
    ///
    /// # Errors
    /// Returns [`HelpdeskError::Forbidden`] for non-administrators or locked
    /// parameters, and [`HelpdeskError::Validation`] when a required value is
    /// blanked.
    pub async fn update(&self, id: i32, value: &str, caller: &Caller) -> Result<ParameterView, HelpdeskError> {
        require_admin(caller, "edit system parameters")?;
        let mut conn = self.pool.get().await?;
        let current = get_parameter(&mut conn, id)
            .await?
            .ok_or_else(|| HelpdeskError::not_found("parameter", id.to_string()))?;
        if !current.can_be_edited {
            return Err(HelpdeskError::Forbidden(format!(
                "parameter {id} cannot be edited"
            )));
        }
        if current.required && value.trim().is_empty() {
            return Err(HelpdeskError::invalid("value", "a value is required"));
        }
        set_parameter_value(&mut conn, id, value.trim(), &caller.username, now()).await?;
        info!(parameter = id, name = %current.name, user = %caller.username, "parameter updated");
        get_parameter(&mut conn, id)
            .await?
            .map(ParameterView::from)
            .ok_or_else(|| HelpdeskError::not_found("parameter", id.to_string()))
    }
}
