// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! turno - client for a municipal service counter ticket server.
//!
//! This crate provides the `turno` CLI and the pieces behind it: the remote
//! ticket API, the operation executor, the queue synchronization engine
//! that keeps a sector's views consistent, and the push listener that
//! invalidates them.
//!
//! # Main Components
//!
//! - [`TicketApi`] - Remote API boundary, with [`HttpTicketApi`] for production
//! - [`OperationExecutor`] - Validates and dispatches one ticket operation
//! - [`Engine`] - Canonical ticket set and projected views for the active sector
//! - [`push`] - Server-sent event stream and reconnecting listener
//! - [`Config`] - Client configuration
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use turno::{Engine, EngineConfig, HttpTicketApi, OperationExecutor};
//!
//! let api = HttpTicketApi::new("http://localhost:8080/api", None, timeout)?;
//! let engine = Engine::new(
//!     OperationExecutor::new(api),
//!     Arc::new(turno_core::SystemClock),
//!     EngineConfig::default(),
//! );
//! engine.set_active_sector(SectorId(1)).await?;
//! let snapshot = engine.snapshot();
//! ```

pub mod api;
mod cli;
mod commands;
pub mod config;
mod display;
pub mod engine;
pub mod error;
pub mod executor;
pub mod logging;
pub mod push;
#[cfg(test)]
mod test_helpers;

pub use api::{HttpTicketApi, TicketApi};
pub use cli::{Cli, Command, OutputArgs, OutputFormat, SectorArgs};
pub use config::Config;
pub use engine::{
    Engine, EngineConfig, EngineSnapshot, OperationError, ResyncError, ResyncOutcome,
};
pub use error::{Error, Result};
pub use executor::OperationExecutor;

/// Runs one parsed invocation: loads configuration, installs logging and
/// drives the command on a fresh runtime.
pub fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.config.as_deref())?;
    logging::setup_logging(cli.verbose, config.log_file.as_deref());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(commands::dispatch(cli.command, &config))
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
