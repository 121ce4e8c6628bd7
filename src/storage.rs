use std::path::PathBuf;

use thiserror::Error;

use crate::models::database::Database;

pub mod json;
#[cfg(test)]
pub mod memory;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to load database from '{path}': {source}")]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON from '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to save database to '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize database to JSON: {source}")]
    SerializeFailed {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to create backup at '{path}': {source}")]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to cleanup old backups in '{dir}': {source}")]
    CleanupFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Database file was created by a newer version of issuedesk (version {0}). Please upgrade issuedesk to open this file."
    )]
    FutureVersion(u32),
}

pub trait Storage {
    fn load(&self) -> Result<Database, StorageError>;
    fn save(&self, database: &Database) -> Result<(), StorageError>;

    /// Reads the stored database, lets `change` edit it and writes it back.
    /// Returns what was written. Nothing is written when `change` fails.
    ///
    /// Backends shared between processes must hold their write lock from
    /// the read to the write, so a concurrent writer is never overwritten.
    fn modify<T, E>(
        &self,
        change: impl FnOnce(&mut Database) -> Result<T, E>,
    ) -> Result<(Database, T), E>
    where
        E: From<StorageError>,
    {
        let mut database = self.load()?;
        let value = change(&mut database)?;
        self.save(&database)?;
        Ok((database, value))
    }
}
