// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use turno_core::TicketId;

use crate::api::TicketApi;
use crate::cli::OutputFormat;
use crate::display::format_ticket_details;
use crate::engine::Engine;
use crate::error::Result;

use super::write_json;

/// Prints one ticket as the server currently reports it.
pub async fn run<A: TicketApi + 'static>(
    engine: &Engine<A>,
    id: TicketId,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let ticket = engine.executor().ticket(id).await?;
    match format {
        OutputFormat::Json => write_json(out, &ticket),
        OutputFormat::Text => {
            writeln!(out, "{}", format_ticket_details(&ticket))?;
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "show_tests.rs"]
mod tests;
