use thiserror::Error;

use crate::{
    models::{
        issue::IssueDetail,
        ticket::{Status, TicketPatch, is_blank},
    },
    screens::{Route, ScreenContext},
    store::StoreError,
};

const ALERT_TITLE: &str = "Ticket";
const CLOSE_ALERT_TITLE: &str = "Close ticket";
const NOT_FOUND: &str = "This ticket does not exist anymore.";
const LOAD_FAILED: &str = "Could not load the ticket.";
const SOLUTION_REQUIRED: &str = "Describe the solution to close the ticket.";
const CLOSED: &str = "Ticket closed.";
const CLOSE_FAILED: &str = "Could not close the ticket.";

#[derive(Debug, Clone, PartialEq)]
pub enum DetailPhase {
    Loading,
    Viewing(IssueDetail),
    /// The id did not resolve to a document
    NotFound,
    /// The read failed; `load` may be called again
    Failed,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Ticket '{0}' not found")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum CloseError {
    #[error("The ticket is not loaded")]
    NotLoaded,

    #[error("Ticket '{0}' is already closed")]
    AlreadyClosed(String),

    #[error("A solution is required to close the ticket")]
    EmptySolution,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// One ticket, with the local solution draft and the close action
pub struct DetailsScreen {
    ctx: ScreenContext,
    issue_id: String,
    phase: DetailPhase,
    solution: String,
}

impl DetailsScreen {
    pub fn mount(ctx: ScreenContext, issue_id: impl Into<String>) -> Self {
        Self {
            ctx,
            issue_id: issue_id.into(),
            phase: DetailPhase::Loading,
            solution: String::new(),
        }
    }

    pub fn load(&mut self) -> Result<(), LoadError> {
        match self.ctx.store.get_one(&self.ctx.collection, &self.issue_id) {
            Ok(Some(ticket)) => {
                let detail = IssueDetail::project(&ticket, &self.ctx.formatter);
                self.phase = DetailPhase::Viewing(detail);
                Ok(())
            }
            Ok(None) => {
                tracing::warn!(id = %self.issue_id, "ticket not found");
                self.phase = DetailPhase::NotFound;
                self.ctx.notifier.alert(ALERT_TITLE, NOT_FOUND);
                Err(LoadError::NotFound(self.issue_id.clone()))
            }
            Err(e) => {
                tracing::warn!(id = %self.issue_id, error = %e, "failed to load ticket");
                self.phase = DetailPhase::Failed;
                self.ctx.notifier.alert(ALERT_TITLE, LOAD_FAILED);
                Err(e.into())
            }
        }
    }

    pub fn issue_id(&self) -> &str {
        &self.issue_id
    }

    pub fn phase(&self) -> &DetailPhase {
        &self.phase
    }

    pub fn issue(&self) -> Option<&IssueDetail> {
        match &self.phase {
            DetailPhase::Viewing(issue) => Some(issue),
            _ => None,
        }
    }

    pub fn solution(&self) -> &str {
        &self.solution
    }

    pub fn set_solution(&mut self, solution: impl Into<String>) {
        self.solution = solution.into();
    }

    /// The solution input and the close action are only offered while open
    pub fn can_close(&self) -> bool {
        self.issue().is_some_and(|issue| issue.status == Status::Open)
    }

    pub fn status_banner(&self) -> Option<&'static str> {
        self.issue().map(|issue| issue.status.label())
    }

    pub fn close(&mut self) -> Result<(), CloseError> {
        let issue = self.issue().ok_or(CloseError::NotLoaded)?;
        if issue.status == Status::Closed {
            return Err(CloseError::AlreadyClosed(issue.id.clone()));
        }
        if is_blank(&self.solution) {
            self.ctx.notifier.alert(CLOSE_ALERT_TITLE, SOLUTION_REQUIRED);
            return Err(CloseError::EmptySolution);
        }

        let patch = TicketPatch::close(self.solution.clone());
        match self
            .ctx
            .store
            .update(&self.ctx.collection, &self.issue_id, patch)
        {
            Ok(()) => {
                self.ctx.notifier.alert(CLOSE_ALERT_TITLE, CLOSED);
                self.ctx.navigator.navigate(Route::Home);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(id = %self.issue_id, error = %e, "failed to close ticket");
                self.ctx.notifier.alert(ALERT_TITLE, CLOSE_FAILED);
                Err(e.into())
            }
        }
    }

    pub fn go_back(&self) {
        self.ctx.navigator.navigate(Route::Home);
    }
}
