// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use chrono::NaiveDate;

use crate::api::TicketApi;
use crate::cli::OutputFormat;
use crate::display::{format_ticket_details, format_ticket_line};
use crate::engine::Engine;
use crate::error::Result;

use super::write_json;

/// Looks a ticket up by its code, for `date` or today.
pub async fn by_code<A: TicketApi + 'static>(
    engine: &Engine<A>,
    code: &str,
    date: Option<NaiveDate>,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let ticket = engine.executor().by_code(code, date).await?;
    match format {
        OutputFormat::Json => write_json(out, &ticket),
        OutputFormat::Text => {
            writeln!(out, "{}", format_ticket_details(&ticket))?;
            Ok(())
        }
    }
}

/// Lists every ticket held by a citizen, newest first.
pub async fn by_citizen<A: TicketApi + 'static>(
    engine: &Engine<A>,
    national_id: &str,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let mut tickets = engine.executor().by_citizen(national_id).await?;
    tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    match format {
        OutputFormat::Json => write_json(out, &tickets),
        OutputFormat::Text => {
            if tickets.is_empty() {
                writeln!(out, "No tickets for citizen {}", national_id.trim())?;
            }
            for ticket in &tickets {
                writeln!(
                    out,
                    "{} [{}] {}",
                    format_ticket_line(ticket, None),
                    ticket.sector.code,
                    ticket.created_at.date()
                )?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "find_tests.rs"]
mod tests;
