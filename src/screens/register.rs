use thiserror::Error;

use crate::{
    models::ticket::{NewTicket, Ticket, is_blank},
    screens::{Route, ScreenContext},
    store::StoreError,
};

const ALERT_TITLE: &str = "Register";
const FIELDS_REQUIRED: &str = "Fill in all the fields.";
const REGISTERED: &str = "Ticket registered.";
const REGISTER_FAILED: &str = "Could not register the ticket.";

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("Both the patrimony and the description are required")]
    MissingFields,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Form for opening a new ticket
pub struct RegisterScreen {
    ctx: ScreenContext,
    patrimony: String,
    description: String,
}

impl RegisterScreen {
    pub fn mount(ctx: ScreenContext) -> Self {
        Self {
            ctx,
            patrimony: String::new(),
            description: String::new(),
        }
    }

    pub fn set_patrimony(&mut self, patrimony: impl Into<String>) {
        self.patrimony = patrimony.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn submit(&mut self) -> Result<Ticket, RegisterError> {
        if is_blank(&self.patrimony) || is_blank(&self.description) {
            self.ctx.notifier.alert(ALERT_TITLE, FIELDS_REQUIRED);
            return Err(RegisterError::MissingFields);
        }

        let new_ticket = NewTicket {
            patrimony: self.patrimony.trim().to_string(),
            description: self.description.trim().to_string(),
        };
        match self.ctx.store.add(&self.ctx.collection, new_ticket) {
            Ok(ticket) => {
                self.ctx.notifier.alert(ALERT_TITLE, REGISTERED);
                self.ctx.navigator.navigate(Route::Home);
                Ok(ticket)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to register ticket");
                self.ctx.notifier.alert(ALERT_TITLE, REGISTER_FAILED);
                Err(e.into())
            }
        }
    }
}
