use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of a ticket. Also used as the collection filter.
#[derive(
    Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Open,
    Closed,
}

impl Status {
    /// Value persisted in the `status` field
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::Closed => "closed",
        }
    }

    /// Label shown on filter chips and status banners
    pub fn label(&self) -> &'static str {
        match self {
            Status::Open => "in progress",
            Status::Closed => "finished",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = TicketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Status::Open),
            "closed" => Ok(Status::Closed),
            other => Err(TicketError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TicketError {
    #[error("Unknown ticket status '{0}'")]
    UnknownStatus(String),

    #[error("Field '{0}' is required")]
    MissingField(&'static str),

    #[error("A closed ticket must have a solution")]
    ClosedWithoutSolution,

    #[error("A closed ticket must have a closing timestamp")]
    ClosedWithoutTimestamp,

    #[error("An open ticket cannot carry a solution")]
    OpenWithSolution,

    #[error("An open ticket cannot carry a closing timestamp")]
    OpenWithTimestamp,

    #[error("Ticket closed at {closed_at} before it was created at {created_at}")]
    ClosedBeforeCreated {
        created_at: Timestamp,
        closed_at: Timestamp,
    },
}

/// Persisted shape of a ticket. The document id is the key it is stored
/// under, not a field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TicketDocument {
    /// Asset tag of the equipment the ticket is about
    pub patrimony: String,
    /// Free text describing the problem
    pub description: String,
    pub status: Status,
    /// How the problem was solved, set when the ticket is closed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    /// Assigned by the store when the ticket is created
    pub created_at: Timestamp,
    /// Assigned by the store when the ticket is closed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<Timestamp>,
}

impl TicketDocument {
    pub fn validate(&self) -> Result<(), TicketError> {
        if is_blank(&self.patrimony) {
            return Err(TicketError::MissingField("patrimony"));
        }
        if is_blank(&self.description) {
            return Err(TicketError::MissingField("description"));
        }

        let has_solution = self.solution.as_deref().is_some_and(|s| !is_blank(s));

        match self.status {
            Status::Open => {
                if has_solution {
                    return Err(TicketError::OpenWithSolution);
                }
                if self.closed_at.is_some() {
                    return Err(TicketError::OpenWithTimestamp);
                }
            }
            Status::Closed => {
                if !has_solution {
                    return Err(TicketError::ClosedWithoutSolution);
                }
                match self.closed_at {
                    None => return Err(TicketError::ClosedWithoutTimestamp),
                    Some(closed_at) if closed_at < self.created_at => {
                        return Err(TicketError::ClosedBeforeCreated {
                            created_at: self.created_at,
                            closed_at,
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(())
    }
}

/// A document together with the id it is stored under
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: String,
    pub data: TicketDocument,
}

/// Placeholder resolved by the store to its own clock at commit time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerTimestamp;

/// Partial update of a ticket document. Fields left as `None` are untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketPatch {
    pub status: Option<Status>,
    pub solution: Option<String>,
    pub closed_at: Option<ServerTimestamp>,
}

impl TicketPatch {
    /// Payload of the open -> closed transition
    pub fn close(solution: impl Into<String>) -> Self {
        Self {
            status: Some(Status::Closed),
            solution: Some(solution.into()),
            closed_at: Some(ServerTimestamp),
        }
    }

    /// Applies the patch in place, resolving `ServerTimestamp` to `now`.
    pub fn apply_to(&self, document: &mut TicketDocument, now: Timestamp) {
        if let Some(status) = self.status {
            document.status = status;
        }
        if let Some(solution) = &self.solution {
            document.solution = Some(solution.clone());
        }
        if self.closed_at.is_some() {
            document.closed_at = Some(now.max(document.created_at));
        }
    }
}

/// Creation payload. The store fills in status and creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub patrimony: String,
    pub description: String,
}

impl NewTicket {
    pub fn into_document(self, created_at: Timestamp) -> TicketDocument {
        TicketDocument {
            patrimony: self.patrimony,
            description: self.description,
            status: Status::Open,
            solution: None,
            created_at,
            closed_at: None,
        }
    }
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
