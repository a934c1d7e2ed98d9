// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote ticket API abstraction.
//!
//! Provides a trait-based boundary to the ticket server that enables:
//! - A real JSON-over-HTTP client for production ([`HttpTicketApi`])
//! - In-memory fakes for engine and executor tests

use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;
use turno_core::{
    IssueRequest, ObservationsRequest, RedirectRequest, Result, SectorId, SectorRef, Ticket,
    TicketId,
};

pub(crate) mod http;

pub use http::HttpTicketApi;

/// Boxed future returned by every [`TicketApi`] method.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Remote ticket API.
///
/// Every mutation returns the updated ticket as reported by the server.
/// Failures are classified with [`turno_core::ErrorKind`] by the
/// implementation; callers never see raw transport errors.
pub trait TicketApi: Send + Sync {
    /// Fetch one ticket by id.
    fn ticket(&self, id: TicketId) -> ApiFuture<'_, Ticket>;

    /// Fetch a ticket by its display code, optionally scoped to a date.
    fn ticket_by_code(&self, code: &str, date: Option<NaiveDate>) -> ApiFuture<'_, Ticket>;

    /// Fetch every ticket held by a citizen.
    fn tickets_by_citizen(&self, national_id: &str) -> ApiFuture<'_, Vec<Ticket>>;

    /// Waiting queue of a sector.
    fn queue(&self, sector: SectorId) -> ApiFuture<'_, Vec<Ticket>>;

    /// Next ticket to be called in a sector, if any.
    fn next(&self, sector: SectorId) -> ApiFuture<'_, Option<Ticket>>;

    /// Pending tickets of a sector.
    fn pending(&self, sector: SectorId) -> ApiFuture<'_, Vec<Ticket>>;

    /// Every ticket of a sector created on `date`.
    fn day_list(&self, sector: SectorId, date: NaiveDate) -> ApiFuture<'_, Vec<Ticket>>;

    /// Sector reference data.
    fn sectors(&self) -> ApiFuture<'_, Vec<SectorRef>>;

    fn issue(&self, request: IssueRequest) -> ApiFuture<'_, Ticket>;

    fn call(&self, id: TicketId, body: ObservationsRequest) -> ApiFuture<'_, Ticket>;

    fn start_attention(&self, id: TicketId) -> ApiFuture<'_, Ticket>;

    fn finish(&self, id: TicketId, body: ObservationsRequest) -> ApiFuture<'_, Ticket>;

    fn mark_absent(&self, id: TicketId, body: ObservationsRequest) -> ApiFuture<'_, Ticket>;

    fn redirect(&self, id: TicketId, body: RedirectRequest) -> ApiFuture<'_, Ticket>;
}
