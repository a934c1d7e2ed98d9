// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client-initiated ticket operations and their payloads.
//!
//! An [`Operation`] names one remote mutation. Payload validation and the
//! state-machine guard live here so they can be checked before any network
//! traffic happens.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::ticket::{Appointment, SectorId, Ticket, TicketId, TicketState, TicketType};

/// The six remote mutations a ticket can be subjected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Issue,
    Call,
    StartAttention,
    Finish,
    MarkAbsent,
    Redirect,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Issue => "issue",
            OperationKind::Call => "call",
            OperationKind::StartAttention => "start_attention",
            OperationKind::Finish => "finish",
            OperationKind::MarkAbsent => "mark_absent",
            OperationKind::Redirect => "redirect",
        }
    }

    /// State a ticket is in after this operation succeeds.
    pub fn target_state(&self) -> TicketState {
        match self {
            OperationKind::Issue => TicketState::Generated,
            OperationKind::Call => TicketState::Called,
            OperationKind::StartAttention => TicketState::InAttention,
            OperationKind::Finish => TicketState::Finished,
            OperationKind::MarkAbsent => TicketState::Absent,
            OperationKind::Redirect => TicketState::Redirected,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "issue" => Ok(OperationKind::Issue),
            "call" => Ok(OperationKind::Call),
            "start_attention" | "start" => Ok(OperationKind::StartAttention),
            "finish" => Ok(OperationKind::Finish),
            "mark_absent" | "absent" => Ok(OperationKind::MarkAbsent),
            "redirect" => Ok(OperationKind::Redirect),
            _ => Err(Error::Validation(format!("invalid operation: '{}'", s))),
        }
    }
}

/// Body of an issue-new request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    pub sector_id: SectorId,
    pub national_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_priority: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_reason: Option<String>,
    #[serde(default)]
    pub ticket_type: TicketType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment: Option<Appointment>,
}

impl IssueRequest {
    /// A NORMAL, non-priority request for the given citizen.
    pub fn new(sector_id: SectorId, national_id: impl Into<String>) -> Self {
        IssueRequest {
            sector_id,
            national_id: national_id.into(),
            full_name: None,
            phone: None,
            is_priority: false,
            priority_reason: None,
            ticket_type: TicketType::Normal,
            appointment: None,
        }
    }
}

/// Body of call / finish / mark-absent requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
}

/// Body of a redirect request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectRequest {
    pub target_sector_id: SectorId,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
}

/// One remote mutation, with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Issue(IssueRequest),
    Call {
        ticket_id: TicketId,
        observations: Option<String>,
    },
    StartAttention {
        ticket_id: TicketId,
    },
    Finish {
        ticket_id: TicketId,
        observations: Option<String>,
    },
    MarkAbsent {
        ticket_id: TicketId,
        observations: String,
    },
    Redirect {
        ticket_id: TicketId,
        request: RedirectRequest,
    },
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Issue(_) => OperationKind::Issue,
            Operation::Call { .. } => OperationKind::Call,
            Operation::StartAttention { .. } => OperationKind::StartAttention,
            Operation::Finish { .. } => OperationKind::Finish,
            Operation::MarkAbsent { .. } => OperationKind::MarkAbsent,
            Operation::Redirect { .. } => OperationKind::Redirect,
        }
    }

    /// The ticket this operation targets; `None` for issuance.
    pub fn ticket_id(&self) -> Option<TicketId> {
        match self {
            Operation::Issue(_) => None,
            Operation::Call { ticket_id, .. }
            | Operation::StartAttention { ticket_id }
            | Operation::Finish { ticket_id, .. }
            | Operation::MarkAbsent { ticket_id, .. }
            | Operation::Redirect { ticket_id, .. } => Some(*ticket_id),
        }
    }

    /// Checks the payload on its own, without knowledge of the ticket.
    pub fn validate(&self) -> Result<()> {
        match self {
            Operation::Issue(req) => {
                if is_blank(&req.national_id) {
                    return Err(Error::Validation(
                        "national id is required to issue a ticket".to_string(),
                    ));
                }
                if req.ticket_type == TicketType::Special && req.appointment.is_none() {
                    return Err(Error::Validation(
                        "a SPECIAL ticket requires an appointment".to_string(),
                    ));
                }
                Ok(())
            }
            Operation::MarkAbsent { observations, .. } if is_blank(observations) => Err(
                Error::Validation("observations are required to mark a ticket absent".to_string()),
            ),
            Operation::Redirect { request, .. } if is_blank(&request.reason) => Err(
                Error::Validation("a reason is required to redirect a ticket".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Checks the operation against the ticket's last known record.
    ///
    /// Guards use the ticket's state as seen from the `active` sector; a
    /// ticket that already was redirected can never be redirected again.
    pub fn check_guard(&self, ticket: &Ticket, active: SectorId) -> Result<()> {
        let kind = self.kind();
        let state = ticket.effective_state(active);
        let already_redirected =
            kind == OperationKind::Redirect && ticket.state == TicketState::Redirected;

        if !state.permits(kind) || already_redirected {
            return Err(Error::InvalidState {
                ticket: ticket.id.to_string(),
                op: kind.to_string(),
                state: ticket.state.to_string(),
                valid_targets: ticket.state.valid_targets(),
            });
        }

        if let Operation::Redirect { request, .. } = self {
            if request.target_sector_id == ticket.sector.id {
                return Err(Error::Validation(format!(
                    "ticket {} already belongs to sector {}",
                    ticket.id, ticket.sector.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
