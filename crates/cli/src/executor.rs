// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Operation executor.
//!
//! Maps each [`Operation`] to exactly one remote call and returns the
//! authoritative ticket the server reports back. The executor never touches
//! the engine's views and never retries.

use chrono::NaiveDate;
use tracing::{debug, warn};

use turno_core::{
    Error, ObservationsRequest, Operation, Result, SectorRef, Ticket, TicketId,
};

use crate::api::TicketApi;

/// Executes ticket operations against a [`TicketApi`].
pub struct OperationExecutor<A> {
    api: A,
}

impl<A: TicketApi> OperationExecutor<A> {
    pub fn new(api: A) -> Self {
        OperationExecutor { api }
    }

    /// Underlying transport, used by the engine for view fetches.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Validates the payload and performs the remote mutation.
    ///
    /// Errors from the server pass through with their original kind.
    pub async fn execute(&self, op: &Operation) -> Result<Ticket> {
        op.validate()?;

        let kind = op.kind();
        match op.ticket_id() {
            Some(id) => debug!(op = %kind, ticket = %id, "executing operation"),
            None => debug!(op = %kind, "executing operation"),
        }

        let result = match op {
            Operation::Issue(request) => self.api.issue(request.clone()).await,
            Operation::Call {
                ticket_id,
                observations,
            } => {
                let body = ObservationsRequest {
                    observations: observations.clone(),
                };
                self.api.call(*ticket_id, body).await
            }
            Operation::StartAttention { ticket_id } => self.api.start_attention(*ticket_id).await,
            Operation::Finish {
                ticket_id,
                observations,
            } => {
                let body = ObservationsRequest {
                    observations: observations.clone(),
                };
                self.api.finish(*ticket_id, body).await
            }
            Operation::MarkAbsent {
                ticket_id,
                observations,
            } => {
                let body = ObservationsRequest {
                    observations: Some(observations.clone()),
                };
                self.api.mark_absent(*ticket_id, body).await
            }
            Operation::Redirect { ticket_id, request } => {
                self.api.redirect(*ticket_id, request.clone()).await
            }
        };

        let ticket = match result {
            Ok(ticket) => ticket,
            Err(e) => {
                warn!(op = %kind, kind = %e.kind(), "operation failed: {}", e);
                return Err(e);
            }
        };

        if let Some(id) = op.ticket_id() {
            if ticket.id != id {
                warn!(op = %kind, requested = %id, returned = %ticket.id, "server returned another ticket");
                return Err(Error::Validation(format!(
                    "server answered {} on ticket {} with ticket {}",
                    kind, id, ticket.id
                )));
            }
        }
        debug!(op = %kind, ticket = %ticket.id, state = %ticket.state, "operation applied");
        Ok(ticket)
    }

    /// Fetches one ticket by id.
    pub async fn ticket(&self, id: TicketId) -> Result<Ticket> {
        self.api.ticket(id).await
    }

    /// Fetches a ticket by display code, optionally on a given day.
    pub async fn by_code(&self, code: &str, date: Option<NaiveDate>) -> Result<Ticket> {
        if code.trim().is_empty() {
            return Err(Error::Validation("ticket code must not be empty".to_string()));
        }
        self.api.ticket_by_code(code, date).await
    }

    /// Fetches every ticket of a citizen.
    pub async fn by_citizen(&self, national_id: &str) -> Result<Vec<Ticket>> {
        if turno_core::citizen::is_null_national_id(national_id) {
            return Err(Error::Validation(format!(
                "'{}' is not a usable national id",
                national_id
            )));
        }
        self.api.tickets_by_citizen(national_id).await
    }

    pub async fn sectors(&self) -> Result<Vec<SectorRef>> {
        self.api.sectors().await
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
