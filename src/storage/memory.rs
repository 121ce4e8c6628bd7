use std::cell::{Cell, RefCell};
use std::io;
use std::path::PathBuf;

use crate::{
    models::database::Database,
    storage::{Storage, StorageError},
};

/// Keeps the database in memory. Used by tests to stand in for the file and
/// to simulate an unreachable backend.
#[derive(Default)]
pub struct MemoryStorage {
    database: RefCell<Database>,
    save_attempts: Cell<usize>,
    fail_saves: Cell<bool>,
    fail_loads: Cell<bool>,
}

impl MemoryStorage {
    /// Number of times `save` was called, successful or not
    pub fn save_attempts(&self) -> usize {
        self.save_attempts.get()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.set(fail);
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.set(fail);
    }

    /// Replace the stored database behind the back of any store reading it,
    /// the way another process writing the same file would.
    pub fn overwrite(&self, database: Database) {
        *self.database.borrow_mut() = database;
    }

    fn unavailable() -> io::Error {
        io::Error::new(io::ErrorKind::ConnectionRefused, "storage unavailable")
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Database, StorageError> {
        if self.fail_loads.get() {
            return Err(StorageError::LoadFailed {
                path: PathBuf::from("<memory>"),
                source: Self::unavailable(),
            });
        }
        Ok(self.database.borrow().clone())
    }

    fn save(&self, database: &Database) -> Result<(), StorageError> {
        self.save_attempts.set(self.save_attempts.get() + 1);
        if self.fail_saves.get() {
            return Err(StorageError::SaveFailed {
                path: PathBuf::from("<memory>"),
                source: Self::unavailable(),
            });
        }
        *self.database.borrow_mut() = database.clone();
        Ok(())
    }
}
