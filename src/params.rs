//! System parameter registry.
//!
//! Mail settings and notification routing live in the `system_parameters`
//! table under small integer ids so administrators can change them at
//! runtime. Reading a parameter that has no row is a configuration error.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::{
    db::{DbConnection, DbPool, PoolRunError, get_parameter, insert_parameter_if_absent},
    models::NewSystemParameter,
};

/// Documented parameter ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    /// SMTP relay host.
    SmtpHost,
    /// SMTP login.
    SmtpUser,
    /// SMTP password.
    SmtpPassword,
    /// SMTP port.
    SmtpPort,
    /// Use TLS for SMTP.
    SmtpTls,
    /// `;`-separated administrator addresses.
    AdminList,
    /// Copy administrators on every notification.
    AdminCc,
    /// Extra recipient for IT tickets.
    ItAddress,
    /// Extra recipient for Buildings tickets.
    BuildingsAddress,
    /// Sender address.
    Sender,
    /// HELO domain announced to the relay.
    SmtpDomain,
    /// SMTP timeout in milliseconds.
    SmtpTimeout,
    /// Dashboard status chart title.
    StatusChartTitle,
    /// Dashboard status chart value-axis label.
    StatusChartLabel,
    /// Dashboard activity chart title.
    ActivityChartTitle,
    /// Dashboard activity chart value-axis label.
    ActivityChartLabel,
    /// Dashboard request-type chart title.
    RequestTypeChartTitle,
}

struct ParamDef {
    name: &'static str,
    description: &'static str,
    default: &'static str,
    required: bool,
    is_password: bool,
}

impl Param {
    /// Every documented parameter.
    pub const ALL: [Self; 17] = [
        Self::SmtpHost,
        Self::SmtpUser,
        Self::SmtpPassword,
        Self::SmtpPort,
        Self::SmtpTls,
        Self::AdminList,
        Self::AdminCc,
        Self::ItAddress,
        Self::BuildingsAddress,
        Self::Sender,
        Self::SmtpDomain,
        Self::SmtpTimeout,
        Self::StatusChartTitle,
        Self::StatusChartLabel,
        Self::ActivityChartTitle,
        Self::ActivityChartLabel,
        Self::RequestTypeChartTitle,
    ];

    /// Stored id.
    #[must_use]
    pub const fn id(self) -> i32 {
        match self {
            Self::SmtpHost => 1,
            Self::SmtpUser => 2,
            Self::SmtpPassword => 3,
            Self::SmtpPort => 4,
            Self::SmtpTls => 5,
            Self::AdminList => 6,
            Self::AdminCc => 7,
            Self::ItAddress => 8,
            Self::BuildingsAddress => 9,
            Self::Sender => 10,
            Self::SmtpDomain => 11,
            Self::SmtpTimeout => 1002,
            Self::StatusChartTitle => 1003,
            Self::StatusChartLabel => 1004,
            Self::ActivityChartTitle => 1005,
            Self::ActivityChartLabel => 1006,
            Self::RequestTypeChartTitle => 1007,
        }
    }

    /// Look up a documented parameter by id.
    #[must_use]
    pub fn from_id(id: i32) -> Option<Self> { Self::ALL.into_iter().find(|p| p.id() == id) }

    const fn def(self) -> ParamDef {
        let (name, description, default, required, is_password) = match self {
            Self::SmtpHost => ("SMTP Host", "Mail relay host name", "", true, false),
            Self::SmtpUser => ("SMTP User", "Mail relay login", "", false, false),
            Self::SmtpPassword => ("SMTP Password", "Mail relay password", "", false, true),
            Self::SmtpPort => ("SMTP Port", "Mail relay port", "587", true, false),
            Self::SmtpTls => ("SMTP TLS", "Use TLS when talking to the relay", "true", true, false),
            Self::AdminList => ("Admin List", "Administrator addresses separated by ';'", "", false, false),
            Self::AdminCc => ("Admin CC", "Copy administrators on every notification", "false", true, false),
            Self::ItAddress => ("IT Address", "Extra recipient for IT tickets", "", false, false),
            Self::BuildingsAddress => ("Buildings Address", "Extra recipient for Buildings tickets", "", false, false),
            Self::Sender => ("Sender", "From address for notifications", "", true, false),
            Self::SmtpDomain => ("SMTP Domain", "HELO domain announced to the relay", "", false, false),
            Self::SmtpTimeout => ("SMTP Timeout", "Relay timeout in milliseconds", "10000", true, false),
            Self::StatusChartTitle => ("Status Chart Title", "Dashboard status chart title", "Open Tickets by Category", false, false),
            Self::StatusChartLabel => ("Status Chart Label", "Dashboard status chart axis label", "Tickets", false, false),
            Self::ActivityChartTitle => ("Activity Chart Title", "Dashboard activity chart title", "Ticket Activity", false, false),
            Self::ActivityChartLabel => ("Activity Chart Label", "Dashboard activity chart axis label", "Tickets", false, false),
            Self::RequestTypeChartTitle => ("Request Type Chart Title", "Dashboard request type chart title", "Requests by Type", false, false),
        };
        ParamDef {
            name,
            description,
            default,
            required,
            is_password,
        }
    }

    /// Value used when seeding an empty registry.
    #[must_use]
    pub const fn default_value(self) -> &'static str { self.def().default }
}

/// Parameter lookup failures.
#[derive(Debug, Error)]
pub enum ParameterError {
    /// No row exists for the id.
    #[error("Parameter \"{0}\" does not exist.")]
    Missing(i32),
    /// The stored value cannot be interpreted.
    #[error("Parameter \"{id}\" has invalid value \"{value}\": expected {expected}")]
    Invalid {
        /// Parameter id.
        id: i32,
        /// Stored value.
        value: String,
        /// What the value should look like.
        expected: &'static str,
    },
    /// Database failure.
    #[error(transparent)]
    Diesel(#[from] diesel::result::Error),
    /// Pool checkout failure.
    #[error(transparent)]
    Pool(#[from] PoolRunError),
}

/// Read access to the parameter registry.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Raw value for `id`, or `None` when the row is absent.
    async fn value(&self, id: i32) -> Result<Option<String>, ParameterError>;

    /// Value that must exist.
    async fn required(&self, param: Param) -> Result<String, ParameterError> {
        self.value(param.id())
            .await?
            .ok_or(ParameterError::Missing(param.id()))
    }

    /// Value that may be absent or blank.
    async fn optional(&self, param: Param) -> Result<Option<String>, ParameterError> {
        Ok(self
            .value(param.id())
            .await?
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty()))
    }

    /// Boolean toggle; anything other than `true` reads as off.
    async fn flag(&self, param: Param) -> Result<bool, ParameterError> {
        Ok(self.required(param).await?.trim().eq_ignore_ascii_case("true"))
    }

    /// Unsigned number.
    async fn number(&self, param: Param) -> Result<u64, ParameterError> {
        let raw = self.required(param).await?;
        raw.trim().parse().map_err(|_| ParameterError::Invalid {
            id: param.id(),
            value: raw,
            expected: "an unsigned integer",
        })
    }

    /// `;`-separated list with blanks removed.
    async fn list(&self, param: Param) -> Result<Vec<String>, ParameterError> {
        Ok(split_list(&self.required(param).await?))
    }
}

/// Split a `;`-separated address list.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parameter store backed by the `system_parameters` table.
#[derive(Clone)]
pub struct DbParameterStore {
    pool: DbPool,
}

impl DbParameterStore {
    /// Wrap a pool.
    #[must_use]
    pub const fn new(pool: DbPool) -> Self { Self { pool } }
}

#[async_trait]
impl ParameterStore for DbParameterStore {
    async fn value(&self, id: i32) -> Result<Option<String>, ParameterError> {
        let mut conn = self.pool.get().await?;
        Ok(get_parameter(&mut conn, id).await?.map(|p| p.value))
    }
}

/// Insert every documented parameter that is not yet present.
///
/// Returns the number of rows created.
///
/// # Errors
/// Returns any error produced by the database.
pub async fn seed_parameters(conn: &mut DbConnection) -> Result<usize, diesel::result::Error> {
    let now = Utc::now().naive_utc();
    let mut created = 0;
    for param in Param::ALL {
        let def = param.def();
        let row = NewSystemParameter {
            id: param.id(),
            name: def.name,
            description: def.description,
            value: def.default,
            required: def.required,
            can_be_edited: true,
            is_password: def.is_password,
            date_created: now,
            last_updated: now,
            updated_by: "system",
        };
        created += insert_parameter_if_absent(conn, &row).await?;
    }
    info!(created, "seeded system parameters");
    Ok(created)
}

#[cfg(any(test, feature = "test-support"))]
pub use self::memory::MemoryParameterStore;

#[cfg(any(test, feature = "test-support"))]
mod memory {
    use std::{collections::HashMap, sync::Mutex};

    use async_trait::async_trait;

    use super::{Param, ParameterError, ParameterStore};

    /// In-memory parameter store for tests.
    #[derive(Debug, Default)]
    pub struct MemoryParameterStore {
        values: Mutex<HashMap<i32, String>>,
    }

    impl MemoryParameterStore {
        /// Store with every documented parameter at its seed default.
        #[must_use]
        pub fn with_defaults() -> Self {
            let store = Self::default();
            for param in Param::ALL {
                store.set(param, param.default_value());
            }
            store
        }

        /// Set a value.
        pub fn set(&self, param: Param, value: &str) {
            if let Ok(mut values) = self.values.lock() {
                values.insert(param.id(), value.to_owned());
            }
        }

        /// Remove a value.
        pub fn remove(&self, param: Param) {
            if let Ok(mut values) = self.values.lock() {
                values.remove(&param.id());
            }
        }
    }

    #[async_trait]
    impl ParameterStore for MemoryParameterStore {
        async fn value(&self, id: i32) -> Result<Option<String>, ParameterError> {
            Ok(self
                .values
                .lock()
                .ok()
                .and_then(|values| values.get(&id).cloned()))
        }
    }
}
