// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for turno-core operations.

use std::fmt;

use thiserror::Error;

/// Coarse classification of an [`Error`], used by callers that branch on
/// the failure category rather than the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    OperationInProgress,
    Conflict,
    Forbidden,
    Transport,
    Validation,
}

impl ErrorKind {
    /// Returns the canonical upper-case name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::OperationInProgress => "OPERATION_IN_PROGRESS",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::Transport => "TRANSPORT",
            ErrorKind::Validation => "VALIDATION",
        }
    }

    /// True for kinds detected locally, before any remote call is made.
    pub fn is_local(&self) -> bool {
        matches!(self, ErrorKind::InvalidState | ErrorKind::OperationInProgress)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// All possible errors that can occur in turno operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("cannot {op} ticket {ticket} in state {state}\n  hint: from '{state}' the ticket can go to: {valid_targets}")]
    InvalidState {
        ticket: String,
        op: String,
        state: String,
        valid_targets: String,
    },

    #[error("an operation on ticket {0} is already in progress\n  hint: wait for it to complete before retrying")]
    OperationInProgress(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{0}")]
    Validation(String),
}

impl Error {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidState { .. } => ErrorKind::InvalidState,
            Error::OperationInProgress(_) => ErrorKind::OperationInProgress,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::Transport(_) => ErrorKind::Transport,
            Error::Validation(_) => ErrorKind::Validation,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(format!("malformed payload: {}", err))
    }
}

/// A specialized Result type for turno-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
