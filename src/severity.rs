//! Ticket severity levels.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How urgent a ticket is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Can wait.
    Low,
    /// Normal priority.
    Medium,
    /// Needs prompt attention.
    High,
    /// Everything is on fire.
    Stratosphere,
}

/// Raised when a stored severity code has no matching variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown severity code {0}")]
pub struct UnknownSeverity(pub i32);

/// Raised when a severity name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown severity \"{0}\"")]
pub struct UnknownSeverityName(pub String);

impl Severity {
    /// Every severity, lowest first.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Stratosphere];

    /// Stored numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Stratosphere => 4,
        }
    }

    /// Stable identifier used in filter selectors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Stratosphere => "Stratosphere",
        }
    }
}

impl TryFrom<i32> for Severity {
    type Error = UnknownSeverity;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|severity| severity.code() == code)
            .ok_or(UnknownSeverity(code))
    }
}

impl From<Severity> for i32 {
    fn from(severity: Severity) -> Self { severity.code() }
}

impl FromStr for Severity {
    type Err = UnknownSeverityName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|severity| severity.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownSeverityName(trimmed.to_owned()))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}
