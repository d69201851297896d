//! Ticket intake kinds.
//!
//! Every ticket shares one record shape; the kind decides which intake
//! fields are meaningful, which notification template is used and which
//! routing address is copied.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Intake form a ticket was submitted through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketKind {
    /// Generic request.
    #[default]
    General,
    /// IT support.
    It,
    /// Buildings and grounds.
    Buildings,
    /// Audio/video production.
    Av,
}

/// Raised when a stored or requested kind is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown ticket kind \"{0}\"")]
pub struct UnknownKind(pub String);

impl TicketKind {
    /// Stored discriminator value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::It => "it",
            Self::Buildings => "buildings",
            Self::Av => "av",
        }
    }

    /// Label used in notification subjects.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::General => "Ticket",
            Self::It => "IT Ticket",
            Self::Buildings => "Buildings Ticket",
            Self::Av => "AV Ticket",
        }
    }
}

impl FromStr for TicketKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "it" => Ok(Self::It),
            "buildings" => Ok(Self::Buildings),
            "av" => Ok(Self::Av),
            _ => Err(UnknownKind(s.to_owned())),
        }
    }
}

impl TryFrom<String> for TicketKind {
    type Error = UnknownKind;

    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

impl fmt::Display for TicketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}
