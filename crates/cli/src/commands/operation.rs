// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use turno_core::{Operation, OperationKind, Ticket};

use crate::api::TicketApi;
use crate::cli::OutputFormat;
use crate::engine::Engine;
use crate::error::{Error, Result};

use super::{select_sector, write_json};

fn verb(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Issue => "Issued",
        OperationKind::Call => "Called",
        OperationKind::StartAttention => "Started",
        OperationKind::Finish => "Finished",
        OperationKind::MarkAbsent => "Marked absent",
        OperationKind::Redirect => "Redirected",
    }
}

/// Performs one ticket operation through the engine.
///
/// The engine is pointed at the sector that owns the ticket first, so the
/// operation is checked against fresh views and its result lands in them.
pub async fn run<A: TicketApi + 'static>(
    engine: &Engine<A>,
    op: Operation,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    op.validate()?;
    let sector = match (&op, op.ticket_id()) {
        (Operation::Issue(request), _) => request.sector_id,
        (_, Some(id)) => engine.executor().ticket(id).await?.sector.id,
        (_, None) => return Err(Error::FieldRequired { field: "ticket id" }),
    };
    select_sector(engine, sector).await?;

    let kind = op.kind();
    let ticket = engine.perform_operation(op).await?;

    match format {
        OutputFormat::Json => write_json(out, &ticket),
        OutputFormat::Text => write_text(engine, kind, &ticket, out),
    }
}

fn write_text<A: TicketApi + 'static>(
    engine: &Engine<A>,
    kind: OperationKind,
    ticket: &Ticket,
    out: &mut impl Write,
) -> Result<()> {
    let name = ticket.citizen.display_name();
    match kind {
        OperationKind::Redirect => writeln!(
            out,
            "{} {} ({}) to {}",
            verb(kind),
            ticket.code,
            name,
            ticket.sector.name
        )?,
        _ => writeln!(
            out,
            "{} {} ({}) [{}]",
            verb(kind),
            ticket.code,
            name,
            ticket.state
        )?,
    }

    let snapshot = engine.snapshot();
    if kind == OperationKind::Issue {
        if let Some(pos) = snapshot.queue().iter().position(|t| t.id == ticket.id) {
            writeln!(out, "Position {} of {} in queue", pos + 1, snapshot.queue().len())?;
        }
        return Ok(());
    }
    match snapshot.next() {
        Some(next) => writeln!(out, "Next: {} {}", next.code, next.citizen.display_name())?,
        None => writeln!(out, "Next: none")?,
    }
    Ok(())
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
