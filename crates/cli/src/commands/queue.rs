// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use turno_core::SectorId;

use crate::api::TicketApi;
use crate::cli::OutputFormat;
use crate::display::format_snapshot;
use crate::engine::Engine;
use crate::error::Result;

use super::{select_sector, write_json};

/// Loads `sector` and prints its views and statistics once.
pub async fn run<A: TicketApi + 'static>(
    engine: &Engine<A>,
    sector: SectorId,
    with_day: bool,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    select_sector(engine, sector).await?;
    let snapshot = engine.snapshot();

    match format {
        OutputFormat::Json => write_json(out, snapshot.as_ref()),
        OutputFormat::Text => {
            writeln!(out, "{}", format_snapshot(&snapshot, with_day))?;
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
