// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod args;

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};
use turno_core::{SectorId, TicketId};

pub use args::{OutputArgs, SectorArgs};

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Parse a wall-clock time as `HH:MM` or `HH:MM:SS`.
fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| format!("invalid time '{}': expected HH:MM", s))
}

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "turno")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Service counter ticket client: queues, calls and live sector views")]
pub struct Cli {
    /// Config file (default: ~/.config/turno/config.toml)
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    // ─────────────────────────────────────────────────────────────────────────
    // Sector views
    // ─────────────────────────────────────────────────────────────────────────
    /// List sectors
    Sectors {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show a sector's waiting queue, next ticket and day statistics
    Queue {
        #[command(flatten)]
        sector: SectorArgs,

        /// Also list every ticket issued today
        #[arg(long, short)]
        all: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Follow a sector's queue live until interrupted
    Watch {
        #[command(flatten)]
        sector: SectorArgs,

        /// Do not subscribe to push notifications
        #[arg(long)]
        no_push: bool,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────────
    /// Show one ticket
    Show {
        id: TicketId,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Find tickets by code or by citizen
    Find {
        /// Ticket code, e.g. INT012
        #[arg(long, required_unless_present = "citizen", conflicts_with = "citizen")]
        code: Option<String>,

        /// Day the code was issued (YYYY-MM-DD)
        #[arg(long, requires = "code", conflicts_with = "citizen")]
        date: Option<NaiveDate>,

        /// Citizen national id
        #[arg(long)]
        citizen: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Ticket operations
    // ─────────────────────────────────────────────────────────────────────────
    /// Issue a new ticket
    Issue {
        #[command(flatten)]
        sector: SectorArgs,

        /// Citizen national id
        #[arg(long, value_parser = non_empty_string)]
        national_id: String,

        /// Citizen full name
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        /// Serve before non-priority tickets
        #[arg(long)]
        priority: bool,

        /// Why the ticket is prioritized
        #[arg(long, requires = "priority")]
        reason: Option<String>,

        /// Appointment ticket (requires --appointment-date and --appointment-time)
        #[arg(long)]
        special: bool,

        /// Appointment day (YYYY-MM-DD)
        #[arg(long, requires = "appointment_time")]
        appointment_date: Option<NaiveDate>,

        /// Appointment time (HH:MM)
        #[arg(long, value_parser = parse_time, requires = "appointment_date")]
        appointment_time: Option<NaiveTime>,

        /// Appointment subject
        #[arg(long)]
        appointment_reason: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Call a waiting ticket to the counter
    Call {
        id: TicketId,

        /// Observations
        #[arg(long)]
        obs: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Start attending a called ticket
    Start {
        id: TicketId,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Finish attending a ticket
    Finish {
        id: TicketId,

        /// Observations
        #[arg(long)]
        obs: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Mark a ticket absent
    Absent {
        id: TicketId,

        /// Observations (required)
        #[arg(long, value_parser = non_empty_string)]
        obs: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Send a ticket to another sector's queue
    Redirect {
        id: TicketId,

        /// Target sector id
        #[arg(long)]
        to: SectorId,

        /// Why the ticket is redirected
        #[arg(long, value_parser = non_empty_string)]
        reason: String,

        /// Observations
        #[arg(long)]
        obs: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[cfg(test)]
#[path = "../cli_tests/mod.rs"]
mod tests;
