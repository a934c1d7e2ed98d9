// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::engine::{OperationError, ResyncError};

/// All possible errors that can occur in the turno library.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] turno_core::Error),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("refresh incomplete: {0}")]
    Resync(#[from] ResyncError),

    #[error("{field} is required")]
    FieldRequired { field: &'static str },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Classification of the underlying ticket error, if there is one.
    pub fn kind(&self) -> Option<turno_core::ErrorKind> {
        match self {
            Error::Core(e) => Some(e.kind()),
            Error::Operation(e) => Some(e.error_kind()),
            _ => None,
        }
    }
}

/// A specialized Result type for turno operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
