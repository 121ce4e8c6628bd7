use thiserror::Error;

use crate::{
    models::ticket::{NewTicket, Status, Ticket, TicketDocument, TicketError, TicketPatch},
    storage::StorageError,
    subscription::Subscription,
};

pub mod local;

/// Collection holding the tickets
pub const ISSUES_COLLECTION: &str = "issues";

/// Filter of a live query: `status == <value>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Query {
    pub status: Status,
}

impl Query {
    pub fn status_equals(status: Status) -> Self {
        Self { status }
    }

    pub fn matches(&self, document: &TicketDocument) -> bool {
        document.status == self.status
    }
}

/// Full result set of a live query at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySnapshot {
    pub docs: Vec<Ticket>,
}

impl QuerySnapshot {
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document '{id}' not found in collection '{collection}'")]
    NotFound { collection: String, id: String },

    #[error("Ticket '{0}' is closed and cannot be reopened")]
    InvalidTransition(String),

    #[error("Rejected write to '{id}': {source}")]
    Invalid {
        id: String,
        #[source]
        source: TicketError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type SnapshotListener = Box<dyn FnMut(&QuerySnapshot)>;

/// Collection-scoped access to ticket documents
pub trait DocumentStore {
    /// Reads a single document. `Ok(None)` when the id does not resolve.
    fn get_one(&self, collection: &str, id: &str) -> Result<Option<Ticket>, StoreError>;

    /// Registers a live query. The listener receives the full matching set
    /// once after registration and again after every change to that set,
    /// until the returned subscription is cancelled.
    fn live_query(&self, collection: &str, query: Query, listener: SnapshotListener)
    -> Subscription;

    /// Applies a partial update as a single all-or-nothing write.
    fn update(&self, collection: &str, id: &str, patch: TicketPatch) -> Result<(), StoreError>;

    /// Creates a document, assigning its id and creation time.
    fn add(&self, collection: &str, ticket: NewTicket) -> Result<Ticket, StoreError>;
}
