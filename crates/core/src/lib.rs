// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! turno-core: Shared library for the turno service counter client
//!
//! This crate provides the ticket record, its lifecycle state machine,
//! operation payloads, the error taxonomy, and the view projector used by
//! the synchronization engine in the `turno` crate.

pub mod citizen;
pub mod clock;
pub mod error;
pub mod operation;
pub mod projector;
pub mod ticket;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Error, ErrorKind, Result};
pub use operation::{
    IssueRequest, ObservationsRequest, Operation, OperationKind, RedirectRequest,
};
pub use projector::{ProjectionContext, QueueStats, ViewKind, Views};
pub use ticket::{
    Appointment, Citizen, EmployeeRef, SectorId, SectorRef, Ticket, TicketId, TicketState,
    TicketType,
};
