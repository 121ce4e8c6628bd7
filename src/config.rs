use std::fs;
use std::path::{Path, PathBuf};

use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{format::DateFormatter, store::ISSUES_COLLECTION};

const CONFIG_FILE: &str = "config.json";
const DATABASE_FILE: &str = "database.json";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config from '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config from '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown time zone '{name}': {source}")]
    UnknownTimeZone {
        name: String,
        #[source]
        source: jiff::Error,
    },

    #[error("Failed to create data directory '{path}': {source}")]
    DataDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Optional settings read from `config.json` in the data directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Collection holding the tickets
    #[serde(default = "default_collection")]
    pub collection: String,

    /// IANA time zone used to display dates (default: system)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,

    /// How often `watch` looks for changes, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_collection() -> String {
    ISSUES_COLLECTION.to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            time_zone: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Config {
    /// Reads `config.json` from `data_dir`. A missing file means defaults.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = data_dir.join(CONFIG_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseFailed { path, source: e }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::ReadFailed { path, source: e }),
        }
    }

    pub fn formatter(&self) -> Result<DateFormatter, ConfigError> {
        match &self.time_zone {
            Some(name) => TimeZone::get(name)
                .map(DateFormatter::new)
                .map_err(|e| ConfigError::UnknownTimeZone {
                    name: name.clone(),
                    source: e,
                }),
            None => Ok(DateFormatter::system()),
        }
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms.max(50))
    }
}

/// Files kept in the data directory
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// `<local data dir>/issuedesk`, or the working directory when the
    /// platform has none
    pub fn default_root() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("issuedesk")
    }

    pub fn ensure_exists(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.root).map_err(|e| ConfigError::DataDirFailed {
            path: self.root.clone(),
            source: e,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn session(&self) -> PathBuf {
        self.root.join(SESSION_FILE)
    }
}
