use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
};

use fs2::FileExt;
use jiff::Timestamp;
use uuid::Uuid;

use crate::{
    models::database::{CURRENT_VERSION, Database},
    storage::{Storage, StorageError},
};

/// Number of previous database files kept in `backups/`
const MAX_BACKUPS: usize = 5;

/// Database kept in one pretty-printed JSON file. Writers serialize on an
/// exclusive lock of `<file>.lock`.
pub struct JsonFileStorage {
    path: PathBuf,
}

/// Held for the duration of a write. Released when dropped.
struct WriteLock {
    file: File,
    path: PathBuf,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release lock");
        }
    }
}

impl JsonFileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn lock(&self) -> Result<WriteLock, StorageError> {
        let path = self.path.with_extension("lock");
        let locked = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .and_then(|file| file.lock_exclusive().map(|()| file));
        match locked {
            Ok(file) => Ok(WriteLock { file, path }),
            Err(e) => Err(StorageError::SaveFailed { path, source: e }),
        }
    }

    /// Replaces the file with `database`. The caller holds the lock.
    fn write_locked(&self, database: &Database, _lock: &WriteLock) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(database)
            .map_err(|e| StorageError::SerializeFailed { source: e })?;

        let temp_path = PathBuf::from(format!("{}.tmp.{}", self.path.display(), Uuid::new_v4()));
        fs::write(&temp_path, json).map_err(|e| StorageError::SaveFailed {
            path: temp_path.clone(),
            source: e,
        })?;

        let replaced = self.backup_current().and_then(|()| {
            fs::rename(&temp_path, &self.path).map_err(|e| StorageError::SaveFailed {
                path: self.path.clone(),
                source: e,
            })
        });
        if replaced.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        replaced
    }

    fn backup_dir(&self) -> PathBuf {
        self.path.parent().unwrap_or(Path::new(".")).join("backups")
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("database.json"))
    }

    /// Copies the current file into `backups/` and prunes all but the newest
    /// `MAX_BACKUPS` copies. Does nothing before the first write.
    fn backup_current(&self) -> Result<(), StorageError> {
        match fs::metadata(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(StorageError::BackupFailed {
                    path: self.path.clone(),
                    source: e,
                });
            }
            Ok(_) => {}
        }

        let dir = self.backup_dir();
        let prefix = format!("{}-", self.file_name());
        // Zero-padded nanoseconds keep name order equal to age order
        let now = Timestamp::now();
        let backup = dir.join(format!(
            "{}{}{:09}Z",
            prefix,
            now.strftime("%Y%m%dT%H%M%S"),
            now.subsec_nanosecond()
        ));
        fs::create_dir_all(&dir)
            .and_then(|()| fs::copy(&self.path, &backup))
            .map_err(|e| StorageError::BackupFailed {
                path: backup.clone(),
                source: e,
            })?;

        let cleanup_failed = |e: io::Error| StorageError::CleanupFailed {
            dir: dir.clone(),
            source: e,
        };
        let mut backups: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(cleanup_failed)?
            .flatten()
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
            .map(|entry| entry.path())
            .collect();
        backups.sort();

        let excess = backups.len().saturating_sub(MAX_BACKUPS);
        for stale in &backups[..excess] {
            fs::remove_file(stale).map_err(cleanup_failed)?;
        }
        Ok(())
    }
}

impl Storage for JsonFileStorage {
    fn load(&self) -> Result<Database, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Database::default()),
            Err(e) => {
                return Err(StorageError::LoadFailed {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        let database: Database =
            serde_json::from_str(&content).map_err(|e| StorageError::ParseFailed {
                path: self.path.clone(),
                source: e,
            })?;
        if database.version > CURRENT_VERSION {
            return Err(StorageError::FutureVersion(database.version));
        }
        Ok(database)
    }

    fn save(&self, database: &Database) -> Result<(), StorageError> {
        let lock = self.lock()?;
        self.write_locked(database, &lock)
    }

    fn modify<T, E>(
        &self,
        change: impl FnOnce(&mut Database) -> Result<T, E>,
    ) -> Result<(Database, T), E>
    where
        E: From<StorageError>,
    {
        let lock = self.lock()?;
        let mut database = self.load()?;
        let value = change(&mut database)?;
        self.write_locked(&database, &lock)?;
        Ok((database, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::{NewTicket, Status, TicketPatch};

    fn sample_database() -> Database {
        let mut document = NewTicket {
            patrimony: String::from("PRN-3"),
            description: String::from("Paper jam"),
        }
        .into_document("2024-01-10T10:00:00Z".parse().unwrap());
        let mut database = Database::default();
        database.insert("issues", String::from("a1"), document.clone());

        TicketPatch::close("Cleared the tray")
            .apply_to(&mut document, "2024-01-11T10:00:00Z".parse().unwrap());
        database.insert("issues", String::from("b2"), document);
        database
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("database.json"));
        let database = sample_database();

        storage.save(&database).unwrap();
        let loaded = storage.load().unwrap();

        assert_eq!(loaded, database);
        assert_eq!(
            loaded.document("issues", "b2").map(|d| d.status),
            Some(Status::Closed)
        );
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("nothing.json"));

        let loaded = storage.load().unwrap();

        assert_eq!(loaded, Database::default());
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        fs::write(&path, "{ this is not valid json }").unwrap();

        let result = JsonFileStorage::new(path).load();

        assert!(matches!(result, Err(StorageError::ParseFailed { .. })));
    }

    #[test]
    fn test_load_without_version_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        let json = r#"{
            "collections": {
                "issues": {
                    "x9": {
                        "patrimony": "NB-12",
                        "description": "Battery swollen",
                        "status": "open",
                        "created_at": "2024-02-01T09:00:00Z"
                    }
                }
            }
        }"#;
        fs::write(&path, json).unwrap();

        let loaded = JsonFileStorage::new(path).load().unwrap();

        assert_eq!(loaded.version, 1);
        assert_eq!(
            loaded.document("issues", "x9").map(|d| d.patrimony.as_str()),
            Some("NB-12")
        );
    }

    #[test]
    fn test_load_future_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        fs::write(&path, r#"{ "version": 999, "collections": {} }"#).unwrap();

        let result = JsonFileStorage::new(path).load();

        assert!(matches!(result, Err(StorageError::FutureVersion(999))));
    }

    #[test]
    fn test_backup_creation_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("database.json"));

        for _ in 0..7 {
            storage.save(&sample_database()).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        let backup_count = fs::read_dir(dir.path().join("backups"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.metadata().map(|m| m.is_file()).unwrap_or(false))
            .count();

        assert_eq!(backup_count, MAX_BACKUPS, "Should keep exactly 5 backups");
    }

    #[test]
    fn test_backup_directory_created_on_second_save() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("database.json"));
        let backups_dir = dir.path().join("backups");

        storage.save(&Database::default()).unwrap();
        assert!(
            !backups_dir.exists(),
            "Backups dir should not exist after first save"
        );

        storage.save(&sample_database()).unwrap();
        assert!(backups_dir.is_dir(), "Backups dir should exist after second save");
    }

    #[test]
    fn test_modify_starts_from_what_is_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        let ours = JsonFileStorage::new(path.clone());
        let theirs = JsonFileStorage::new(path);
        assert_eq!(ours.load().unwrap(), Database::default());

        theirs.save(&sample_database()).unwrap();
        let (written, seen) = ours
            .modify(|database| {
                Ok::<_, StorageError>(database.collection("issues").map(|c| c.len()))
            })
            .unwrap();

        assert_eq!(seen, Some(2));
        assert_eq!(written, sample_database());
        assert_eq!(theirs.load().unwrap(), sample_database());
    }

    #[test]
    fn test_failed_modify_writes_nothing_and_releases_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("database.json"));
        storage.save(&sample_database()).unwrap();

        let result = storage.modify(|database| {
            database.collections.clear();
            Err::<(), _>(StorageError::FutureVersion(2))
        });

        assert!(matches!(result, Err(StorageError::FutureVersion(2))));
        assert_eq!(storage.load().unwrap(), sample_database());
        storage.save(&Database::default()).unwrap();
        assert_eq!(storage.load().unwrap(), Database::default());
    }
}
