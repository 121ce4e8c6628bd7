use std::rc::Rc;

use thiserror::Error;

use crate::{
    auth::{AuthError, AuthProvider, User},
    models::ticket::is_blank,
    screens::Notifier,
};

const ALERT_TITLE: &str = "Sign in";
const CREDENTIALS_REQUIRED: &str = "Enter your e-mail and password.";
const SIGN_IN_FAILED: &str = "Could not sign in.";

#[derive(Debug, Error)]
pub enum SignInError {
    #[error("E-mail and password are required")]
    MissingCredentials,

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Sign-in form. A successful sign-in is picked up by the auth gate, which
/// replaces this screen.
pub struct SignInScreen {
    auth: Rc<dyn AuthProvider>,
    notifier: Rc<dyn Notifier>,
    email: String,
    password: String,
}

impl SignInScreen {
    pub fn mount(auth: Rc<dyn AuthProvider>, notifier: Rc<dyn Notifier>) -> Self {
        Self {
            auth,
            notifier,
            email: String::new(),
            password: String::new(),
        }
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
    }

    pub fn submit(&mut self) -> Result<User, SignInError> {
        if is_blank(&self.email) || self.password.is_empty() {
            self.notifier.alert(ALERT_TITLE, CREDENTIALS_REQUIRED);
            return Err(SignInError::MissingCredentials);
        }

        self.auth
            .sign_in(&self.email, &self.password)
            .map_err(|e| {
                tracing::warn!(error = %e, "sign in failed");
                self.notifier.alert(ALERT_TITLE, SIGN_IN_FAILED);
                e.into()
            })
    }
}
