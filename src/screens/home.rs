use std::cell::RefCell;
use std::rc::Rc;

use crate::{
    auth::AuthError,
    models::{issue::Issue, ticket::Status},
    screens::{Route, ScreenContext},
    store::{Query, QuerySnapshot},
    subscription::Subscription,
};

pub const TITLE: &str = "Tickets";

const LOGOUT_ALERT_TITLE: &str = "Authentication";
const LOGOUT_FAILED: &str = "Could not sign out.";

/// Message shown when the selected filter matches no tickets
pub fn empty_message(filter: Status) -> &'static str {
    match filter {
        Status::Open => "You have no tickets in progress yet",
        Status::Closed => "You have no finished tickets yet",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChip {
    pub status: Status,
    pub title: &'static str,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HomeBody {
    Loading,
    Empty(&'static str),
    Issues(Vec<Issue>),
}

#[derive(Debug, Default)]
struct HomeState {
    issues: Vec<Issue>,
    is_loading: bool,
}

/// Live list of the tickets matching the selected filter
pub struct HomeScreen {
    ctx: ScreenContext,
    selected_filter: Status,
    state: Rc<RefCell<HomeState>>,
    subscription: Option<Subscription>,
}

impl HomeScreen {
    pub fn mount(ctx: ScreenContext) -> Self {
        let mut screen = Self {
            ctx,
            selected_filter: Status::Open,
            state: Rc::new(RefCell::new(HomeState::default())),
            subscription: None,
        };
        screen.subscribe();
        screen
    }

    /// Releases the current live query, if any, then opens one for the
    /// selected filter.
    fn subscribe(&mut self) {
        if let Some(mut previous) = self.subscription.take() {
            previous.cancel();
        }

        {
            let mut state = self.state.borrow_mut();
            state.issues.clear();
            state.is_loading = true;
        }

        let state = Rc::clone(&self.state);
        let formatter = self.ctx.formatter.clone();
        let subscription = self.ctx.store.live_query(
            &self.ctx.collection,
            Query::status_equals(self.selected_filter),
            Box::new(move |snapshot: &QuerySnapshot| {
                let mut state = state.borrow_mut();
                state.issues = snapshot
                    .docs
                    .iter()
                    .map(|ticket| Issue::project(ticket, &formatter))
                    .collect();
                state.is_loading = false;
            }),
        );
        self.subscription = Some(subscription);
    }

    pub fn select_filter(&mut self, filter: Status) {
        if filter == self.selected_filter {
            return;
        }
        tracing::debug!(from = %self.selected_filter, to = %filter, "filter changed");
        self.selected_filter = filter;
        self.subscribe();
    }

    pub fn selected_filter(&self) -> Status {
        self.selected_filter
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.state.borrow().issues.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Number shown next to the title
    pub fn count(&self) -> usize {
        self.state.borrow().issues.len()
    }

    pub fn filters(&self) -> [FilterChip; 2] {
        [Status::Open, Status::Closed].map(|status| FilterChip {
            status,
            title: status.label(),
            is_active: status == self.selected_filter,
        })
    }

    pub fn body(&self) -> HomeBody {
        let state = self.state.borrow();
        if state.is_loading {
            HomeBody::Loading
        } else if state.issues.is_empty() {
            HomeBody::Empty(empty_message(self.selected_filter))
        } else {
            HomeBody::Issues(state.issues.clone())
        }
    }

    pub fn open_issue(&self, issue_id: &str) {
        self.ctx.navigator.navigate(Route::Details {
            issue_id: issue_id.to_string(),
        });
    }

    pub fn new_issue(&self) {
        self.ctx.navigator.navigate(Route::Register);
    }

    /// Ends the session. On success the auth gate swaps to the sign-in view
    /// by itself, so nothing is navigated here.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.ctx.auth.sign_out().inspect_err(|e| {
            tracing::warn!(error = %e, "sign out failed");
            self.ctx.notifier.alert(LOGOUT_ALERT_TITLE, LOGOUT_FAILED);
        })
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    pub fn unmount(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}
