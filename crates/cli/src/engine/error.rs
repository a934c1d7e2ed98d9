// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use thiserror::Error;

use turno_core::{ErrorKind, OperationKind, SectorId, TicketId, ViewKind};

/// A failed ticket operation, tagged with what was attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationError {
    pub kind: OperationKind,
    pub ticket_id: Option<TicketId>,
    pub source: turno_core::Error,
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ticket_id {
            Some(id) => write!(f, "{} on ticket {} failed: {}", self.kind, id, self.source),
            None => write!(f, "{} failed: {}", self.kind, self.source),
        }
    }
}

impl std::error::Error for OperationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl OperationError {
    pub fn error_kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// One view that could not be refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewFailure {
    pub view: ViewKind,
    pub error: turno_core::Error,
}

impl fmt::Display for ViewFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.view, self.error)
    }
}

/// Errors from a resync.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResyncError {
    /// Some views kept their previous contents because their fetch failed.
    #[error("sector {sector}: {} of 4 views not refreshed ({})", failures.len(), describe(failures))]
    Partial {
        sector: SectorId,
        failures: Vec<ViewFailure>,
    },
}

fn describe(failures: &[ViewFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ResyncError {
    pub fn failures(&self) -> &[ViewFailure] {
        match self {
            ResyncError::Partial { failures, .. } => failures,
        }
    }

    /// Returns true if `view` is among the failed views.
    pub fn failed(&self, view: ViewKind) -> bool {
        self.failures().iter().any(|f| f.view == view)
    }
}
