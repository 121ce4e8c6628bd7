use crate::format::DateFormatter;
use crate::models::ticket::{Status, Ticket};

/// List row for a ticket, rebuilt on every snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub id: String,
    pub patrimony: String,
    pub description: String,
    pub status: Status,
    /// Formatted creation time
    pub when: String,
}

impl Issue {
    pub fn project(ticket: &Ticket, formatter: &DateFormatter) -> Self {
        Self {
            id: ticket.id.clone(),
            patrimony: ticket.data.patrimony.clone(),
            description: ticket.data.description.clone(),
            status: ticket.data.status,
            when: formatter.format(ticket.data.created_at),
        }
    }
}

/// Everything the details screen shows about one ticket
#[derive(Debug, Clone, PartialEq)]
pub struct IssueDetail {
    pub id: String,
    pub patrimony: String,
    pub description: String,
    pub status: Status,
    pub when: String,
    pub solution: Option<String>,
    /// Formatted closing time, only for closed tickets
    pub closing_date: Option<String>,
}

impl IssueDetail {
    pub fn project(ticket: &Ticket, formatter: &DateFormatter) -> Self {
        Self {
            id: ticket.id.clone(),
            patrimony: ticket.data.patrimony.clone(),
            description: ticket.data.description.clone(),
            status: ticket.data.status,
            when: formatter.format(ticket.data.created_at),
            solution: ticket.data.solution.clone(),
            closing_date: ticket.data.closed_at.map(|ts| formatter.format(ts)),
        }
    }
}
