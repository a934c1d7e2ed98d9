// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod find;
pub mod operation;
pub mod queue;
pub mod sectors;
pub mod show;
pub mod watch;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use turno_core::{
    Appointment, IssueRequest, Operation, RedirectRequest, SectorId, SystemClock, TicketType,
    ViewKind,
};

use crate::api::http::HttpTicketApi;
use crate::api::TicketApi;
use crate::cli::Command;
use crate::config::Config;
use crate::engine::{Engine, EngineConfig};
use crate::error::{Error, Result};
use crate::executor::OperationExecutor;

/// Builds the HTTP client and an engine on top of it.
///
/// `refresh_interval` is `None` for one-shot commands.
pub fn connect(config: &Config, refresh_interval: Option<Duration>) -> Result<Engine<HttpTicketApi>> {
    let api = HttpTicketApi::new(&config.base_url, config.token.clone(), config.request_timeout())?;
    Ok(Engine::new(
        OperationExecutor::new(api),
        Arc::new(SystemClock),
        EngineConfig { refresh_interval },
    ))
}

/// Write one value as a single JSON line.
pub(crate) fn write_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    writeln!(out, "{json}")?;
    Ok(())
}

/// Selects `sector` and loads its views.
///
/// A partial refresh is reported as a warning; it only fails when no view
/// could be loaded at all.
pub(crate) async fn select_sector<A: TicketApi + 'static>(
    engine: &Engine<A>,
    sector: SectorId,
) -> Result<()> {
    match engine.set_active_sector(sector).await {
        Ok(_) => Ok(()),
        Err(e) if e.failures().len() == ViewKind::ALL.len() => Err(Error::Resync(e)),
        Err(e) => {
            warn!("{}", e);
            eprintln!("warning: {}", e);
            Ok(())
        }
    }
}

/// Runs one parsed command against the configured server.
pub async fn dispatch(command: Command, config: &Config) -> Result<()> {
    let refresh = if matches!(command, Command::Watch { .. }) {
        config.refresh_interval()
    } else {
        None
    };
    let engine = connect(config, refresh)?;
    let mut out = std::io::stdout();

    let result = match command {
        Command::Sectors { output } => sectors::run(&engine, output.output, &mut out).await,
        Command::Queue {
            sector,
            all,
            output,
        } => queue::run(&engine, sector.sector, all, output.output, &mut out).await,
        Command::Watch { sector, no_push } => {
            watch::run(&engine, config, sector.sector, !no_push, &mut out).await
        }
        Command::Show { id, output } => show::run(&engine, id, output.output, &mut out).await,
        Command::Find {
            code,
            date,
            citizen,
            output,
        } => match (code, citizen) {
            (Some(code), _) => find::by_code(&engine, &code, date, output.output, &mut out).await,
            (None, Some(citizen)) => {
                find::by_citizen(&engine, &citizen, output.output, &mut out).await
            }
            (None, None) => Err(Error::FieldRequired {
                field: "--code or --citizen",
            }),
        },
        Command::Issue {
            sector,
            national_id,
            name,
            phone,
            priority,
            reason,
            special,
            appointment_date,
            appointment_time,
            appointment_reason,
            output,
        } => {
            let mut request = IssueRequest::new(sector.sector, national_id);
            request.full_name = name;
            request.phone = phone;
            request.is_priority = priority;
            request.priority_reason = reason;
            if special {
                request.ticket_type = TicketType::Special;
            }
            request.appointment = match (appointment_date, appointment_time) {
                (Some(date), Some(time)) => Some(Appointment {
                    date,
                    time,
                    reason: appointment_reason,
                }),
                _ => None,
            };
            operation::run(&engine, Operation::Issue(request), output.output, &mut out).await
        }
        Command::Call { id, obs, output } => {
            let op = Operation::Call {
                ticket_id: id,
                observations: obs,
            };
            operation::run(&engine, op, output.output, &mut out).await
        }
        Command::Start { id, output } => {
            let op = Operation::StartAttention { ticket_id: id };
            operation::run(&engine, op, output.output, &mut out).await
        }
        Command::Finish { id, obs, output } => {
            let op = Operation::Finish {
                ticket_id: id,
                observations: obs,
            };
            operation::run(&engine, op, output.output, &mut out).await
        }
        Command::Absent { id, obs, output } => {
            let op = Operation::MarkAbsent {
                ticket_id: id,
                observations: obs,
            };
            operation::run(&engine, op, output.output, &mut out).await
        }
        Command::Redirect {
            id,
            to,
            reason,
            obs,
            output,
        } => {
            let op = Operation::Redirect {
                ticket_id: id,
                request: RedirectRequest {
                    target_sector_id: to,
                    reason,
                    observations: obs,
                },
            };
            operation::run(&engine, op, output.output, &mut out).await
        }
    };

    engine.shutdown();
    result
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
