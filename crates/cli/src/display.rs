// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::NaiveDateTime;

use turno_core::{EmployeeRef, QueueStats, SectorId, SectorRef, Ticket, TicketState, TicketType};

use crate::engine::EngineSnapshot;

/// Maximum line width for wrapped text content (excluding 4-space indent).
const WRAP_WIDTH: usize = 96;

/// Wrap text at word boundaries if it's a single line.
///
/// - If content contains newlines: return as-is (preserve user formatting)
/// - If content is single line >width: wrap at word boundaries
/// - If content is single line <=width: return as-is
pub fn wrap_text(content: &str, width: usize) -> String {
    if content.contains('\n') || content.len() <= width {
        return content.to_string();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in content.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.len() + 1 + word.len() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

pub fn format_time(at: NaiveDateTime) -> String {
    at.format("%H:%M").to_string()
}

pub fn format_datetime(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

/// Format a wait as `1h 05m`, `4m 30s` or `45s`.
pub fn format_wait(secs: i64) -> String {
    let secs = secs.max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {:02}m", h, m)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// One-line summary of a ticket.
///
/// The state shown is the one seen from `active`, so a ticket redirected
/// into the active sector reads as waiting.
pub fn format_ticket_line(ticket: &Ticket, active: Option<SectorId>) -> String {
    let state = match active {
        Some(sector) => ticket.effective_state(sector),
        None => ticket.state,
    };
    let mut line = format!(
        "- [{}] {}: {} ({})",
        state,
        ticket.code,
        ticket.citizen.display_name(),
        format_time(ticket.created_at)
    );
    if ticket.is_priority {
        line.push_str(" [priority]");
    }
    if ticket.ticket_type == TicketType::Special {
        line.push_str(" [appointment]");
    }
    line
}

fn employee_suffix(employee: Option<&EmployeeRef>) -> String {
    match employee.and_then(|e| e.full_name.as_deref()) {
        Some(name) => format!(" by {}", name),
        None => String::new(),
    }
}

/// Full ticket description for `show` and operation results.
pub fn format_ticket_details(ticket: &Ticket) -> String {
    let mut lines = vec![
        format!("[{}] {} (#{})", ticket.state, ticket.code, ticket.id),
        format!("Sector: {} ({})", ticket.sector.name, ticket.sector.code),
        format!("Citizen: {}", ticket.citizen.display_name()),
    ];
    if let Some(id) = ticket.citizen.national_id.as_deref() {
        if !turno_core::citizen::is_null_national_id(id) {
            lines.push(format!("National ID: {}", id.trim()));
        }
    }
    if let Some(phone) = ticket.citizen.phone.as_deref() {
        lines.push(format!("Phone: {}", phone));
    }
    if ticket.is_priority {
        match ticket.priority_reason.as_deref() {
            Some(reason) => lines.push(format!("Priority: {}", reason)),
            None => lines.push("Priority: yes".to_string()),
        }
    }
    if let Some(appt) = &ticket.appointment {
        let mut line = format!("Appointment: {} {}", appt.date, appt.time.format("%H:%M"));
        if let Some(reason) = appt.reason.as_deref() {
            line.push_str(&format!(" ({})", reason));
        }
        lines.push(line);
    }

    lines.push(String::new());
    lines.push(format!("Created: {}", format_datetime(ticket.created_at)));
    if let Some(at) = ticket.called_at {
        lines.push(format!(
            "Called: {}{}",
            format_datetime(at),
            employee_suffix(ticket.called_by.as_ref())
        ));
    }
    if let Some(at) = ticket.attention_started_at {
        lines.push(format!(
            "Attention: {}{}",
            format_datetime(at),
            employee_suffix(ticket.attended_by.as_ref())
        ));
    }
    if let Some(at) = ticket.finished_at {
        lines.push(format!("Finished: {}", format_datetime(at)));
    }
    if let Some(obs) = ticket.observations.as_deref().filter(|o| !o.trim().is_empty()) {
        lines.push(String::new());
        lines.push("Observations:".to_string());
        for line in wrap_text(obs.trim(), WRAP_WIDTH).lines() {
            lines.push(format!("    {}", line));
        }
    }
    lines.join("\n")
}

pub fn format_sector_line(sector: &SectorRef) -> String {
    format!("{:>4}  {:<6} {}", sector.id.0, sector.code, sector.name)
}

/// Statistics block: waiting counts, today's totals, average wait.
pub fn format_stats(stats: &QueueStats) -> Vec<String> {
    let mut lines = vec![format!(
        "Waiting: {} ({} priority)",
        stats.waiting, stats.waiting_priority
    )];

    let counts: Vec<String> = TicketState::ALL
        .iter()
        .filter(|s| stats.count(**s) > 0)
        .map(|s| format!("{} {}", stats.count(*s), s.as_str().to_lowercase()))
        .collect();
    if counts.is_empty() {
        lines.push(format!("Today: {} issued", stats.day_total));
    } else {
        lines.push(format!(
            "Today: {} issued, {}",
            stats.day_total,
            counts.join(", ")
        ));
    }
    if let Some(secs) = stats.average_wait_secs {
        lines.push(format!("Average wait: {}", format_wait(secs)));
    }
    lines
}

fn sector_heading(snapshot: &EngineSnapshot) -> String {
    let Some(sector) = snapshot.sector else {
        return "No active sector".to_string();
    };
    let named = snapshot
        .views
        .records()
        .map(|t| &t.sector)
        .find(|s| s.id == sector);
    match named {
        Some(s) => format!("Sector {} ({})", s.name, s.code),
        None => format!("Sector {}", sector),
    }
}

fn ticket_lines(snapshot: &EngineSnapshot, tickets: &[Ticket]) -> Vec<String> {
    tickets
        .iter()
        .map(|t| {
            let mut line = format_ticket_line(t, snapshot.sector);
            if let Some(op) = snapshot.in_flight.get(&t.id) {
                line.push_str(&format!(" <{} pending>", op));
            }
            line
        })
        .collect()
}

/// Render a snapshot as text: next ticket, queue, stats and optionally the
/// day list.
pub fn format_snapshot(snapshot: &EngineSnapshot, with_day: bool) -> String {
    let mut lines = vec![sector_heading(snapshot)];

    lines.push(String::new());
    match snapshot.next() {
        Some(next) => lines.push(format!(
            "Next: {} {}",
            next.code,
            next.citizen.display_name()
        )),
        None => lines.push("Next: none".to_string()),
    }

    lines.push(String::new());
    lines.push(format!("Queue ({}):", snapshot.queue().len()));
    if snapshot.queue().is_empty() {
        lines.push("  (empty)".to_string());
    }
    for line in ticket_lines(snapshot, snapshot.queue()) {
        lines.push(format!("  {}", line));
    }

    if with_day {
        lines.push(String::new());
        lines.push(format!("Today ({}):", snapshot.day().len()));
        for line in ticket_lines(snapshot, snapshot.day()) {
            lines.push(format!("  {}", line));
        }
    }

    lines.push(String::new());
    lines.extend(format_stats(&snapshot.stats));
    if let Some(at) = snapshot.last_resync {
        lines.push(format!("Refreshed: {}", format_time(at)));
    }
    lines.join("\n")
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
