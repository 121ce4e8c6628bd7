use std::cell::RefCell;
use std::rc::Rc;

use crate::{
    auth::{AuthProvider, AuthState, User},
    subscription::Subscription,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// No auth notification received yet
    Pending,
    Authenticated(User),
    Unauthenticated,
}

/// Which top-level view the gate mounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopLevelView {
    Loading,
    /// Ticket list, details and registration
    App,
    SignIn,
}

/// Picks the top-level view from the auth state. Owns its auth subscription
/// for as long as it is mounted.
pub struct AuthGate {
    state: Rc<RefCell<GateState>>,
    subscription: Subscription,
}

impl AuthGate {
    pub fn mount(auth: &dyn AuthProvider) -> Self {
        let state = Rc::new(RefCell::new(GateState::Pending));

        let sink = Rc::clone(&state);
        let subscription = auth.on_auth_state_changed(Box::new(move |auth_state: &AuthState| {
            let next = match auth_state {
                Some(user) => GateState::Authenticated(user.clone()),
                None => GateState::Unauthenticated,
            };
            tracing::debug!(?next, "auth gate transition");
            *sink.borrow_mut() = next;
        }));

        Self {
            state,
            subscription,
        }
    }

    pub fn state(&self) -> GateState {
        self.state.borrow().clone()
    }

    pub fn view(&self) -> TopLevelView {
        match *self.state.borrow() {
            GateState::Pending => TopLevelView::Loading,
            GateState::Authenticated(_) => TopLevelView::App,
            GateState::Unauthenticated => TopLevelView::SignIn,
        }
    }

    pub fn user(&self) -> Option<User> {
        match &*self.state.borrow() {
            GateState::Authenticated(user) => Some(user.clone()),
            _ => None,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_active()
    }

    pub fn teardown(&mut self) {
        self.subscription.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::local::LocalAuth;

    #[test]
    fn test_pending_until_first_notification() {
        let auth = LocalAuth::in_memory();
        let gate = AuthGate::mount(&auth);

        assert_eq!(gate.state(), GateState::Pending);
        assert_eq!(gate.view(), TopLevelView::Loading);

        auth.deliver_pending();

        assert_eq!(gate.view(), TopLevelView::SignIn);
    }

    #[test]
    fn test_follows_sign_in_and_sign_out_without_remount() {
        let auth = LocalAuth::in_memory();
        let gate = AuthGate::mount(&auth);
        auth.deliver_pending();
        assert_eq!(gate.state(), GateState::Unauthenticated);

        let user = auth.sign_in("tech@example.com", "secret1").unwrap();
        auth.deliver_pending();
        assert_eq!(gate.view(), TopLevelView::App);
        assert_eq!(gate.user(), Some(user));

        auth.sign_out().unwrap();
        auth.deliver_pending();
        assert_eq!(gate.view(), TopLevelView::SignIn);
        assert_eq!(auth.active_listeners(), 1);
    }

    #[test]
    fn test_starts_authenticated_with_existing_session() {
        let auth = LocalAuth::in_memory();
        auth.sign_in("tech@example.com", "secret1").unwrap();

        let gate = AuthGate::mount(&auth);
        auth.deliver_pending();

        assert_eq!(gate.view(), TopLevelView::App);
    }

    #[test]
    fn test_teardown_releases_subscription_once() {
        let auth = LocalAuth::in_memory();
        let mut gate = AuthGate::mount(&auth);
        auth.deliver_pending();

        gate.teardown();
        gate.teardown();
        auth.sign_in("tech@example.com", "secret1").unwrap();
        auth.deliver_pending();

        assert!(!gate.is_mounted());
        assert_eq!(auth.active_listeners(), 0);
        assert_eq!(gate.view(), TopLevelView::SignIn);
    }

    #[test]
    fn test_dropping_the_gate_releases_subscription() {
        let auth = LocalAuth::in_memory();
        {
            let _gate = AuthGate::mount(&auth);
            assert_eq!(auth.active_listeners(), 1);
        }
        assert_eq!(auth.active_listeners(), 0);
    }
}
