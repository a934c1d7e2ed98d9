// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared argument structs for CLI commands.
//!
//! These structs are used with `#[command(flatten)]` to reduce duplication
//! across commands that share common options.

use clap::Args;
use turno_core::SectorId;

use super::OutputFormat;

/// Sector selection.
#[derive(Args, Clone, Debug)]
pub struct SectorArgs {
    /// Sector id (see `turno sectors`)
    #[arg(long, short)]
    pub sector: SectorId,
}

/// Output format selection.
#[derive(Args, Clone, Copy, Debug, Default)]
pub struct OutputArgs {
    /// Output format
    #[arg(long, short, value_enum, default_value_t)]
    pub output: OutputFormat,
}
