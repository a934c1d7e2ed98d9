// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Core ticket types for the turno service counter.
//!
//! This module contains the ticket record as reported by the server, its
//! lifecycle state machine, and the reference objects a ticket points at
//! (sector, citizen, employee, appointment).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::citizen;
use crate::error::{Error, Result};
use crate::operation::OperationKind;

/// Server-assigned ticket identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub u64);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TicketId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(TicketId)
            .map_err(|_| Error::Validation(format!("invalid ticket id: '{}'", s)))
    }
}

/// Server-assigned sector identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectorId(pub u64);

impl fmt::Display for SectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SectorId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(SectorId)
            .map_err(|_| Error::Validation(format!("invalid sector id: '{}'", s)))
    }
}

/// Lifecycle state of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketState {
    /// Issued and waiting. Initial state.
    Generated,
    /// Called to a counter.
    Called,
    /// Citizen is being attended.
    InAttention,
    /// Attention completed.
    Finished,
    /// Citizen did not show up.
    Absent,
    /// Moved to another sector's queue.
    Redirected,
}

impl TicketState {
    /// All states, in lifecycle order.
    pub const ALL: [TicketState; 6] = [
        TicketState::Generated,
        TicketState::Called,
        TicketState::InAttention,
        TicketState::Finished,
        TicketState::Absent,
        TicketState::Redirected,
    ];

    /// Returns the string representation used on the wire and in display.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketState::Generated => "GENERATED",
            TicketState::Called => "CALLED",
            TicketState::InAttention => "IN_ATTENTION",
            TicketState::Finished => "FINISHED",
            TicketState::Absent => "ABSENT",
            TicketState::Redirected => "REDIRECTED",
        }
    }

    /// Check if a transition from this state to target is a lifecycle edge.
    pub fn can_transition_to(&self, target: TicketState) -> bool {
        use TicketState::*;
        matches!(
            (self, target),
            (Generated, Called)
                | (Called, InAttention)
                | (InAttention, Finished)
                | (Generated | Called | InAttention, Absent)
                | (Generated | Called | InAttention, Redirected)
        )
    }

    /// Get valid transition targets as a formatted string.
    pub fn valid_targets(&self) -> String {
        let targets: Vec<&str> = Self::ALL
            .iter()
            .filter(|t| self.can_transition_to(**t))
            .map(|t| t.as_str())
            .collect();
        if targets.is_empty() {
            "none (terminal)".to_string()
        } else {
            targets.join(", ")
        }
    }

    /// Returns true for FINISHED, ABSENT and REDIRECTED.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TicketState::Finished | TicketState::Absent | TicketState::Redirected
        )
    }

    pub fn can_be_called(&self) -> bool {
        *self == TicketState::Generated
    }

    pub fn can_start_attention(&self) -> bool {
        *self == TicketState::Called
    }

    pub fn can_finish(&self) -> bool {
        *self == TicketState::InAttention
    }

    pub fn can_redirect_or_mark_absent(&self) -> bool {
        !self.is_terminal()
    }

    /// Guard for a client-initiated operation against a ticket in this state.
    ///
    /// `Issue` creates a ticket and is never permitted against an existing one.
    pub fn permits(&self, op: OperationKind) -> bool {
        match op {
            OperationKind::Issue => false,
            OperationKind::Call => self.can_be_called(),
            OperationKind::StartAttention => self.can_start_attention(),
            OperationKind::Finish => self.can_finish(),
            OperationKind::MarkAbsent | OperationKind::Redirect => {
                self.can_redirect_or_mark_absent()
            }
        }
    }

    /// Returns true once the ticket has been called (CALLED or any later
    /// state reached through a call).
    pub fn reached_called(&self) -> bool {
        matches!(
            self,
            TicketState::Called | TicketState::InAttention | TicketState::Finished
        )
    }

    /// Returns true once attention has started.
    pub fn reached_attention(&self) -> bool {
        matches!(self, TicketState::InAttention | TicketState::Finished)
    }
}

impl fmt::Display for TicketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TicketState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "GENERATED" => Ok(TicketState::Generated),
            "CALLED" => Ok(TicketState::Called),
            "IN_ATTENTION" => Ok(TicketState::InAttention),
            "FINISHED" => Ok(TicketState::Finished),
            "ABSENT" => Ok(TicketState::Absent),
            "REDIRECTED" => Ok(TicketState::Redirected),
            _ => Err(Error::Validation(format!(
                "invalid ticket state: '{}'\n  hint: valid states are: generated, called, in_attention, finished, absent, redirected",
                s
            ))),
        }
    }
}

/// Whether a ticket was issued at the counter or booked in advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketType {
    #[default]
    Normal,
    /// Booked appointment; carries an [`Appointment`].
    Special,
}

impl TicketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketType::Normal => "NORMAL",
            TicketType::Special => "SPECIAL",
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Appointment details of a SPECIAL ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub date: NaiveDate,
    pub time: NaiveTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Reference to the sector owning a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorRef {
    pub id: SectorId,
    /// Short code used as the ticket code prefix (e.g. "INT").
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SectorRef {
    pub fn new(id: u64, code: &str, name: &str) -> Self {
        SectorRef {
            id: SectorId(id),
            code: code.to_string(),
            name: name.to_string(),
            color: None,
        }
    }
}

/// Reference to the citizen holding a ticket. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citizen {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Citizen {
    /// Name to show for this citizen, falling back through national id.
    pub fn display_name(&self) -> String {
        citizen::display_name(self)
    }
}

/// Reference to the employee who called or attended a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRef {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// A ticket as last reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Stable identifier.
    pub id: TicketId,
    /// Human-readable code, unique per (code, creation date).
    pub code: String,
    pub state: TicketState,
    /// Owning sector; changes only through redirection.
    pub sector: SectorRef,
    #[serde(default)]
    pub citizen: Citizen,
    #[serde(default)]
    pub is_priority: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_reason: Option<String>,
    #[serde(default)]
    pub ticket_type: TicketType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment: Option<Appointment>,
    pub created_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub called_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attention_started_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub called_by: Option<EmployeeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attended_by: Option<EmployeeRef>,
}

impl Ticket {
    /// Creates a freshly generated NORMAL ticket with no citizen data.
    pub fn new(id: u64, code: &str, sector: SectorRef, created_at: NaiveDateTime) -> Self {
        Ticket {
            id: TicketId(id),
            code: code.to_string(),
            state: TicketState::Generated,
            sector,
            citizen: Citizen::default(),
            is_priority: false,
            priority_reason: None,
            ticket_type: TicketType::Normal,
            appointment: None,
            created_at,
            called_at: None,
            attention_started_at: None,
            finished_at: None,
            observations: None,
            called_by: None,
            attended_by: None,
        }
    }

    pub fn belongs_to(&self, sector: SectorId) -> bool {
        self.sector.id == sector
    }

    /// State used for guards when viewed from `active` sector.
    ///
    /// A ticket redirected into the active sector waits in its queue like a
    /// generated one.
    pub fn effective_state(&self, active: SectorId) -> TicketState {
        if self.state == TicketState::Redirected && self.belongs_to(active) {
            TicketState::Generated
        } else {
            self.state
        }
    }

    /// Validates the timestamp invariants of a server-reported record.
    pub fn check_timestamps(&self) -> Result<()> {
        let violation = |field: &str| {
            Err(Error::Validation(format!(
                "ticket {} ({}) has inconsistent {} for state {}",
                self.id, self.code, field, self.state
            )))
        };

        // ABSENT and REDIRECTED may be reached from any open state, so only
        // the implication chain constrains them.
        let open_or_finished = !matches!(self.state, TicketState::Absent | TicketState::Redirected);
        if open_or_finished && self.called_at.is_some() != self.state.reached_called() {
            return violation("called_at");
        }
        if open_or_finished && self.attention_started_at.is_some() != self.state.reached_attention()
        {
            return violation("attention_started_at");
        }
        if self.finished_at.is_some() != (self.state == TicketState::Finished) {
            return violation("finished_at");
        }
        if self.attention_started_at.is_some() && self.called_at.is_none() {
            return violation("called_at");
        }

        let mut last = self.created_at;
        for ts in [self.called_at, self.attention_started_at, self.finished_at]
            .into_iter()
            .flatten()
        {
            if ts < last {
                return violation("timestamp order");
            }
            last = ts;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "ticket_tests.rs"]
mod tests;
