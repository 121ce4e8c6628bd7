use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

use uuid::Uuid;

use crate::{
    auth::{AuthError, AuthListener, AuthProvider, AuthState, User},
    subscription::{Registry, Subscription},
};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Auth provider for a single device. The signed-in user is kept in a
/// session file so it survives between runs.
pub struct LocalAuth {
    session_path: Option<PathBuf>,
    current: RefCell<AuthState>,
    listeners: Registry<(), AuthState>,
}

impl LocalAuth {
    /// Provider without a session file. Starts signed out.
    pub fn in_memory() -> Self {
        Self {
            session_path: None,
            current: RefCell::new(None),
            listeners: Registry::new(),
        }
    }

    pub fn open(session_path: PathBuf) -> Result<Self, AuthError> {
        let current = match fs::read_to_string(&session_path) {
            Ok(content) => Some(serde_json::from_str::<User>(&content).map_err(|e| {
                AuthError::SessionParseFailed {
                    path: session_path.clone(),
                    source: e,
                }
            })?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(AuthError::SessionLoadFailed {
                    path: session_path,
                    source: e,
                });
            }
        };

        Ok(Self {
            session_path: Some(session_path),
            current: RefCell::new(current),
            listeners: Registry::new(),
        })
    }

    pub fn current_user(&self) -> AuthState {
        self.current.borrow().clone()
    }

    pub fn deliver_pending(&self) -> usize {
        self.listeners.deliver_pending()
    }

    pub fn active_listeners(&self) -> usize {
        self.listeners.active()
    }

    fn persist(&self, state: &AuthState) -> Result<(), AuthError> {
        let Some(path) = &self.session_path else {
            return Ok(());
        };

        match state {
            Some(user) => {
                let json = serde_json::to_string_pretty(user)
                    .map_err(|e| AuthError::SerializeFailed { source: e })?;
                fs::write(path, json).map_err(|e| AuthError::SessionSaveFailed {
                    path: path.clone(),
                    source: e,
                })
            }
            None => match fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(AuthError::SessionSaveFailed {
                    path: path.clone(),
                    source: e,
                }),
            },
        }
    }

    fn transition(&self, state: AuthState) -> Result<(), AuthError> {
        if *self.current.borrow() == state {
            return Ok(());
        }

        self.persist(&state)?;
        match &state {
            Some(user) => tracing::info!(email = %user.email, "signed in"),
            None => tracing::info!("signed out"),
        }

        for (listener, ()) in self.listeners.keys() {
            self.listeners.enqueue(listener, state.clone());
        }
        *self.current.borrow_mut() = state;
        Ok(())
    }
}

impl AuthProvider for LocalAuth {
    fn on_auth_state_changed(&self, listener: AuthListener) -> Subscription {
        let (id, subscription) = self.listeners.register((), listener);
        self.listeners.enqueue(id, self.current_user());
        subscription
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail(email));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
        }

        let user = User {
            uid: Uuid::new_v5(&Uuid::NAMESPACE_OID, email.as_bytes())
                .simple()
                .to_string(),
            email,
        };
        self.transition(Some(user.clone()))?;
        Ok(user)
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        self.transition(None)
    }
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    fn record(auth: &LocalAuth) -> (Rc<RefCell<Vec<AuthState>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let subscription = auth.on_auth_state_changed(Box::new(move |state: &AuthState| {
            sink.borrow_mut().push(state.clone())
        }));
        (seen, subscription)
    }

    #[test]
    fn test_listener_is_told_current_state_then_changes() {
        let auth = LocalAuth::in_memory();
        let (seen, _subscription) = record(&auth);

        auth.deliver_pending();
        let user = auth.sign_in("Tech@Example.com", "secret1").unwrap();
        auth.sign_out().unwrap();
        auth.deliver_pending();

        assert_eq!(user.email, "tech@example.com");
        assert_eq!(*seen.borrow(), vec![None, Some(user), None]);
    }

    #[test]
    fn test_uid_is_stable_per_email() {
        let auth = LocalAuth::in_memory();
        let first = auth.sign_in("tech@example.com", "secret1").unwrap();
        auth.sign_out().unwrap();
        let second = auth.sign_in("TECH@example.com", "another").unwrap();
        assert_eq!(first.uid, second.uid);
    }

    #[test]
    fn test_rejected_credentials_leave_state_alone() {
        let auth = LocalAuth::in_memory();

        assert!(matches!(
            auth.sign_in("not-an-email", "secret1"),
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.sign_in("tech@example.com", "123"),
            Err(AuthError::WeakPassword(MIN_PASSWORD_LEN))
        ));
        assert_eq!(auth.current_user(), None);
    }

    #[test]
    fn test_session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let user = {
            let auth = LocalAuth::open(path.clone()).unwrap();
            auth.sign_in("tech@example.com", "secret1").unwrap()
        };
        assert_eq!(LocalAuth::open(path.clone()).unwrap().current_user(), Some(user));

        LocalAuth::open(path.clone()).unwrap().sign_out().unwrap();
        assert!(!path.exists());
        assert_eq!(LocalAuth::open(path).unwrap().current_user(), None);
    }

    #[test]
    fn test_sign_out_fails_when_session_cannot_be_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let auth = LocalAuth::open(path.clone()).unwrap();
        auth.sign_in("tech@example.com", "secret1").unwrap();
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        let result = auth.sign_out();

        assert!(matches!(result, Err(AuthError::SessionSaveFailed { .. })));
        assert!(auth.current_user().is_some());
    }

    #[test]
    fn test_released_listener_is_not_notified() {
        let auth = LocalAuth::in_memory();
        let (seen, subscription) = record(&auth);
        drop(subscription);

        auth.sign_in("tech@example.com", "secret1").unwrap();
        auth.deliver_pending();

        assert!(seen.borrow().is_empty());
        assert_eq!(auth.active_listeners(), 0);
    }
}
