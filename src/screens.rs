//! View state of the app's screens, independent of how they are drawn.
//!
//! Each screen owns its state and the subscriptions it opened, and talks to
//! the outside world only through the collaborators in `ScreenContext`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::{auth::AuthProvider, format::DateFormatter, store::DocumentStore};

pub mod details;
pub mod gate;
pub mod home;
pub mod register;
pub mod sign_in;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Details { issue_id: String },
    Register,
}

/// Asks the host to mount another screen
pub trait Navigator {
    fn navigate(&self, route: Route);
}

/// User-visible messages (alert dialogs)
pub trait Notifier {
    fn alert(&self, title: &str, message: &str);
}

/// Collaborators shared by the screens of a signed-in session
#[derive(Clone)]
pub struct ScreenContext {
    pub store: Rc<dyn DocumentStore>,
    pub auth: Rc<dyn AuthProvider>,
    pub navigator: Rc<dyn Navigator>,
    pub notifier: Rc<dyn Notifier>,
    pub formatter: DateFormatter,
    /// Collection the tickets live in
    pub collection: String,
}

/// Navigator that records requests for the host to act on
#[derive(Debug, Default)]
pub struct NavigationQueue {
    requests: RefCell<Vec<Route>>,
}

impl NavigationQueue {
    pub fn take(&self) -> Vec<Route> {
        self.requests.take()
    }

    pub fn last(&self) -> Option<Route> {
        self.requests.borrow().last().cloned()
    }
}

impl Navigator for NavigationQueue {
    fn navigate(&self, route: Route) {
        tracing::debug!(?route, "navigate");
        self.requests.borrow_mut().push(route);
    }
}
