use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::subscription::Subscription;

pub mod local;

/// Signed-in identity
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub uid: String,
    pub email: String,
}

/// What an auth listener is told: the current user, or `None` when nobody
/// is signed in
pub type AuthState = Option<User>;

pub type AuthListener = Box<dyn FnMut(&AuthState)>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("'{0}' is not a valid e-mail address")]
    InvalidEmail(String),

    #[error("Password must have at least {0} characters")]
    WeakPassword(usize),

    #[error("Failed to read session from '{path}': {source}")]
    SessionLoadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse session from '{path}': {source}")]
    SessionParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write session to '{path}': {source}")]
    SessionSaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize session: {source}")]
    SerializeFailed {
        #[source]
        source: serde_json::Error,
    },
}

pub trait AuthProvider {
    /// Registers for auth-state changes. The listener is told the current
    /// state first and then every change, until the subscription is released.
    fn on_auth_state_changed(&self, listener: AuthListener) -> Subscription;

    fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError>;

    fn sign_out(&self) -> Result<(), AuthError>;
}
