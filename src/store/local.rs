use std::cell::RefCell;
use std::collections::BTreeSet;

use jiff::Timestamp;
use uuid::Uuid;

use crate::{
    models::{
        database::Database,
        ticket::{NewTicket, Status, Ticket, TicketPatch},
    },
    storage::Storage,
    store::{DocumentStore, Query, QuerySnapshot, SnapshotListener, StoreError},
    subscription::{Registry, Subscription},
};

/// (collection, document id)
type DocumentKey = (String, String);

/// Document store over a `Storage` backend. The store's clock is the only
/// source of creation and closing timestamps.
pub struct LocalStore<S: Storage> {
    storage: S,
    database: RefCell<Database>,
    listeners: Registry<(String, Query), QuerySnapshot>,
}

impl<S: Storage> LocalStore<S> {
    pub fn open(storage: S) -> Result<Self, StoreError> {
        let database = storage.load()?;
        Ok(Self {
            storage,
            database: RefCell::new(database),
            listeners: Registry::new(),
        })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Hands queued snapshots to their listeners. Returns how many were sent.
    pub fn deliver_pending(&self) -> usize {
        self.listeners.deliver_pending()
    }

    pub fn active_listeners(&self) -> usize {
        self.listeners.active()
    }

    /// Reloads the backend and publishes documents changed by other writers.
    /// Returns the number of documents that changed.
    pub fn sync(&self) -> Result<usize, StoreError> {
        let fresh = self.storage.load()?;
        let changed = changed_documents(&self.database.borrow(), &fresh);
        if changed.is_empty() {
            return Ok(0);
        }

        tracing::debug!(changed = changed.len(), "picked up external changes");
        let previous = self.database.replace(fresh);
        self.publish(&previous, &changed);
        Ok(changed.len())
    }

    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn snapshot(&self, collection: &str, query: Query) -> QuerySnapshot {
        let database = self.database.borrow();
        let docs = database
            .collection(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|(_, document)| query.matches(document))
                    .map(|(id, document)| Ticket {
                        id: id.clone(),
                        data: document.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        QuerySnapshot { docs }
    }

    /// Applies `change` to the stored database under the backend's write
    /// lock, adopts the result and publishes every document that differs
    /// from what this store last saw, including other writers' changes.
    fn commit<T>(
        &self,
        change: impl FnOnce(&mut Database) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let (next, value) = self.storage.modify(change)?;
        let changed = changed_documents(&self.database.borrow(), &next);
        let previous = self.database.replace(next);
        self.publish(&previous, &changed);
        Ok(value)
    }

    /// Queues a fresh snapshot for every query whose result set a change touched
    fn publish(&self, previous: &Database, changed: &[DocumentKey]) {
        for (listener, (collection, query)) in self.listeners.keys() {
            let affected = changed.iter().any(|(changed_collection, id)| {
                if *changed_collection != collection {
                    return false;
                }
                let matched_before = previous
                    .document(&collection, id)
                    .is_some_and(|document| query.matches(document));
                let matches_now = self
                    .database
                    .borrow()
                    .document(&collection, id)
                    .is_some_and(|document| query.matches(document));
                matched_before || matches_now
            });

            if affected {
                let snapshot = self.snapshot(&collection, query);
                tracing::debug!(listener, docs = snapshot.len(), "snapshot queued");
                self.listeners.enqueue(listener, snapshot);
            }
        }
    }
}

impl<S: Storage> DocumentStore for LocalStore<S> {
    fn get_one(&self, collection: &str, id: &str) -> Result<Option<Ticket>, StoreError> {
        let database = self.database.borrow();
        Ok(database.document(collection, id).map(|document| Ticket {
            id: id.to_string(),
            data: document.clone(),
        }))
    }

    fn live_query(
        &self,
        collection: &str,
        query: Query,
        listener: SnapshotListener,
    ) -> Subscription {
        let (id, subscription) = self
            .listeners
            .register((collection.to_string(), query), listener);
        tracing::debug!(listener = id, collection, status = %query.status, "live query opened");

        self.listeners.enqueue(id, self.snapshot(collection, query));
        subscription
    }

    fn update(&self, collection: &str, id: &str, patch: TicketPatch) -> Result<(), StoreError> {
        let now = self.now();
        let status = self.commit(|database| {
            let document = database
                .document_mut(collection, id)
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;

            if document.status == Status::Closed && patch.status == Some(Status::Open) {
                return Err(StoreError::InvalidTransition(id.to_string()));
            }

            patch.apply_to(document, now);
            document.validate().map_err(|source| StoreError::Invalid {
                id: id.to_string(),
                source,
            })?;
            Ok(document.status)
        })?;

        tracing::info!(collection, id, %status, "ticket updated");
        Ok(())
    }

    fn add(&self, collection: &str, ticket: NewTicket) -> Result<Ticket, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let document = ticket.into_document(self.now());
        document.validate().map_err(|source| StoreError::Invalid {
            id: id.clone(),
            source,
        })?;

        self.commit(|database| {
            database.insert(collection, id.clone(), document.clone());
            Ok(())
        })?;
        tracing::info!(collection, id = %id, "ticket created");
        Ok(Ticket { id, data: document })
    }
}

fn changed_documents(previous: &Database, next: &Database) -> Vec<DocumentKey> {
    let collections: BTreeSet<&String> = previous
        .collections
        .keys()
        .chain(next.collections.keys())
        .collect();

    let mut changed = Vec::new();
    for collection in collections {
        let ids: BTreeSet<&String> = previous
            .collection(collection)
            .into_iter()
            .chain(next.collection(collection))
            .flat_map(|documents| documents.keys())
            .collect();

        for id in ids {
            if previous.document(collection, id) != next.document(collection, id) {
                changed.push((collection.clone(), id.clone()));
            }
        }
    }
    changed
}
