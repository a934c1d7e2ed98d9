// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use crate::api::TicketApi;
use crate::cli::OutputFormat;
use crate::display::format_sector_line;
use crate::engine::Engine;
use crate::error::Result;

use super::write_json;

pub async fn run<A: TicketApi + 'static>(
    engine: &Engine<A>,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let mut sectors = engine.executor().sectors().await?;
    sectors.sort_by_key(|s| s.id);

    match format {
        OutputFormat::Json => write_json(out, &sectors),
        OutputFormat::Text => {
            if sectors.is_empty() {
                writeln!(out, "No sectors")?;
            }
            for sector in &sectors {
                writeln!(out, "{}", format_sector_line(sector))?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "sectors_tests.rs"]
mod tests;
