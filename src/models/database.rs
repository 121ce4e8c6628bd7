use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::ticket::TicketDocument;

/// Current schema version
pub const CURRENT_VERSION: u32 = 1;

/// Documents of one collection keyed by id. Iteration order is id order.
pub type Collection = BTreeMap<String, TicketDocument>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Database {
    #[serde(default = "first_version")]
    pub version: u32,
    #[serde(default)]
    pub collections: BTreeMap<String, Collection>,
}

fn first_version() -> u32 {
    1
}

impl Database {
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<&TicketDocument> {
        self.collection(collection)?.get(id)
    }

    pub fn document_mut(&mut self, collection: &str, id: &str) -> Option<&mut TicketDocument> {
        self.collections.get_mut(collection)?.get_mut(id)
    }

    pub fn insert(&mut self, collection: &str, id: String, document: TicketDocument) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, document);
    }
}

impl Default for Database {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            collections: BTreeMap::new(),
        }
    }
}
