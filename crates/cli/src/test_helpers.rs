// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers: an in-memory ticket server.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::Notify;

use turno_core::projector::serving_order;
use turno_core::{
    Error, FixedClock, IssueRequest, ObservationsRequest, RedirectRequest, Result, SectorId,
    SectorRef, Ticket, TicketId, TicketState,
};

use crate::api::{ApiFuture, TicketApi};
use crate::engine::{Engine, EngineConfig};
use crate::executor::OperationExecutor;

/// Remote endpoints the fake can fail or hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Ticket,
    ByCode,
    ByCitizen,
    Queue,
    Next,
    Pending,
    DayList,
    Sectors,
    Issue,
    Call,
    StartAttention,
    Finish,
    MarkAbsent,
    Redirect,
}

/// 2026-03-02 09:00, the fake server's opening time.
pub fn opening_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

pub fn opening_clock() -> FixedClock {
    FixedClock(opening_time())
}

pub fn minutes(n: i64) -> NaiveDateTime {
    opening_time() + chrono::Duration::minutes(n)
}

pub fn sector_a() -> SectorRef {
    SectorRef::new(1, "INT", "Intendencia")
}

pub fn sector_b() -> SectorRef {
    SectorRef::new(2, "REN", "Rentas")
}

/// A GENERATED ticket in `sector`, created `created_min` minutes after opening.
pub fn waiting_ticket(id: u64, sector: &SectorRef, created_min: i64) -> Ticket {
    let mut ticket = Ticket::new(
        id,
        &format!("{}{:03}", sector.code, id),
        sector.clone(),
        minutes(created_min),
    );
    ticket.citizen.national_id = Some(format!("30{:06}", id));
    ticket
}

#[derive(Default)]
struct FakeState {
    tickets: BTreeMap<TicketId, Ticket>,
    sectors: Vec<SectorRef>,
    failures: HashMap<Endpoint, Error>,
    gates: HashMap<Endpoint, Arc<Notify>>,
    calls: HashMap<Endpoint, usize>,
    next_id: u64,
    minute: i64,
}

/// In-memory [`TicketApi`] with server-side transition checks.
///
/// Clones share the same state so tests can inspect the server after
/// handing a copy to the engine.
#[derive(Clone, Default)]
pub struct FakeApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeApi {
    pub fn new() -> Self {
        let fake = FakeApi::default();
        {
            let mut s = fake.lock();
            s.sectors = vec![sector_a(), sector_b()];
            s.next_id = 100;
            s.minute = 60;
        }
        fake
    }

    pub fn with_tickets(tickets: impl IntoIterator<Item = Ticket>) -> Self {
        let fake = FakeApi::new();
        for ticket in tickets {
            fake.put(ticket);
        }
        fake
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Stores a ticket as the server's record.
    pub fn put(&self, ticket: Ticket) {
        self.lock().tickets.insert(ticket.id, ticket);
    }

    pub fn get(&self, id: u64) -> Option<Ticket> {
        self.lock().tickets.get(&TicketId(id)).cloned()
    }

    /// Makes every call to `endpoint` fail with `error` until cleared.
    pub fn fail(&self, endpoint: Endpoint, error: Error) {
        self.lock().failures.insert(endpoint, error);
    }

    pub fn clear_failure(&self, endpoint: Endpoint) {
        self.lock().failures.remove(&endpoint);
    }

    /// Holds the next call to `endpoint` until the returned gate is notified.
    pub fn hold(&self, endpoint: Endpoint) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().gates.insert(endpoint, Arc::clone(&gate));
        gate
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.lock().calls.get(&endpoint).copied().unwrap_or(0)
    }

    async fn enter(&self, endpoint: Endpoint) -> Result<()> {
        let gate = {
            let mut s = self.lock();
            *s.calls.entry(endpoint).or_insert(0) += 1;
            s.gates.remove(&endpoint)
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.lock().failures.get(&endpoint) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn waiting(&self, sector: SectorId) -> Vec<Ticket> {
        let mut out: Vec<Ticket> = self
            .lock()
            .tickets
            .values()
            .filter(|t| t.belongs_to(sector))
            .filter(|t| matches!(t.state, TicketState::Generated | TicketState::Redirected))
            .cloned()
            .collect();
        out.sort_by(serving_order);
        out
    }

    fn transition(
        &self,
        id: TicketId,
        target: TicketState,
        apply: impl FnOnce(&mut Ticket, NaiveDateTime, &[SectorRef]) -> Result<()>,
    ) -> Result<Ticket> {
        let mut s = self.lock();
        s.minute += 1;
        let now = minutes(s.minute);
        let sectors = s.sectors.clone();
        let ticket = s
            .tickets
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("ticket {}", id)))?;
        // Tickets redirected into a sector wait there like generated ones.
        let from = if ticket.state == TicketState::Redirected && target != TicketState::Redirected
        {
            TicketState::Generated
        } else {
            ticket.state
        };
        if !from.can_transition_to(target) {
            return Err(Error::Conflict(format!(
                "ticket {} cannot go from {} to {}",
                id, ticket.state, target
            )));
        }
        apply(ticket, now, &sectors)?;
        ticket.state = target;
        Ok(ticket.clone())
    }

    fn run<'a, T: Send + 'a>(
        &'a self,
        endpoint: Endpoint,
        body: impl FnOnce(&'a FakeApi) -> Result<T> + Send + 'a,
    ) -> ApiFuture<'a, T> {
        Box::pin(async move {
            self.enter(endpoint).await?;
            body(self)
        })
    }
}

impl TicketApi for FakeApi {
    fn ticket(&self, id: TicketId) -> ApiFuture<'_, Ticket> {
        self.run(Endpoint::Ticket, move |f| {
            f.get(id.0)
                .ok_or_else(|| Error::NotFound(format!("ticket {}", id)))
        })
    }

    fn ticket_by_code(&self, code: &str, date: Option<NaiveDate>) -> ApiFuture<'_, Ticket> {
        let code = code.to_string();
        self.run(Endpoint::ByCode, move |f| {
            f.lock()
                .tickets
                .values()
                .find(|t| t.code == code && date.map_or(true, |d| t.created_at.date() == d))
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("ticket {}", code)))
        })
    }

    fn tickets_by_citizen(&self, national_id: &str) -> ApiFuture<'_, Vec<Ticket>> {
        let national_id = national_id.to_string();
        self.run(Endpoint::ByCitizen, move |f| {
            Ok(f.lock()
                .tickets
                .values()
                .filter(|t| t.citizen.national_id.as_deref() == Some(national_id.as_str()))
                .cloned()
                .collect())
        })
    }

    fn queue(&self, sector: SectorId) -> ApiFuture<'_, Vec<Ticket>> {
        self.run(Endpoint::Queue, move |f| Ok(f.waiting(sector)))
    }

    fn next(&self, sector: SectorId) -> ApiFuture<'_, Option<Ticket>> {
        self.run(Endpoint::Next, move |f| Ok(f.waiting(sector).into_iter().next()))
    }

    fn pending(&self, sector: SectorId) -> ApiFuture<'_, Vec<Ticket>> {
        self.run(Endpoint::Pending, move |f| Ok(f.waiting(sector)))
    }

    fn day_list(&self, sector: SectorId, date: NaiveDate) -> ApiFuture<'_, Vec<Ticket>> {
        self.run(Endpoint::DayList, move |f| {
            Ok(f.lock()
                .tickets
                .values()
                .filter(|t| t.belongs_to(sector) && t.created_at.date() == date)
                .cloned()
                .collect())
        })
    }

    fn sectors(&self) -> ApiFuture<'_, Vec<SectorRef>> {
        self.run(Endpoint::Sectors, |f| Ok(f.lock().sectors.clone()))
    }

    fn issue(&self, request: IssueRequest) -> ApiFuture<'_, Ticket> {
        self.run(Endpoint::Issue, move |f| {
            let mut s = f.lock();
            let sector = s
                .sectors
                .iter()
                .find(|sec| sec.id == request.sector_id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("sector {}", request.sector_id)))?;
            s.next_id += 1;
            s.minute += 1;
            let id = s.next_id;
            let mut ticket = Ticket::new(
                id,
                &format!("{}{:03}", sector.code, id),
                sector,
                minutes(s.minute),
            );
            ticket.citizen.national_id = Some(request.national_id);
            ticket.citizen.full_name = request.full_name;
            ticket.is_priority = request.is_priority;
            ticket.priority_reason = request.priority_reason;
            ticket.ticket_type = request.ticket_type;
            ticket.appointment = request.appointment;
            s.tickets.insert(ticket.id, ticket.clone());
            Ok(ticket)
        })
    }

    fn call(&self, id: TicketId, body: ObservationsRequest) -> ApiFuture<'_, Ticket> {
        self.run(Endpoint::Call, move |f| {
            f.transition(id, TicketState::Called, |t, now, _| {
                t.called_at = Some(now);
                if body.observations.is_some() {
                    t.observations = body.observations;
                }
                Ok(())
            })
        })
    }

    fn start_attention(&self, id: TicketId) -> ApiFuture<'_, Ticket> {
        self.run(Endpoint::StartAttention, move |f| {
            f.transition(id, TicketState::InAttention, |t, now, _| {
                t.attention_started_at = Some(now);
                Ok(())
            })
        })
    }

    fn finish(&self, id: TicketId, body: ObservationsRequest) -> ApiFuture<'_, Ticket> {
        self.run(Endpoint::Finish, move |f| {
            f.transition(id, TicketState::Finished, |t, now, _| {
                t.finished_at = Some(now);
                if body.observations.is_some() {
                    t.observations = body.observations;
                }
                Ok(())
            })
        })
    }

    fn mark_absent(&self, id: TicketId, body: ObservationsRequest) -> ApiFuture<'_, Ticket> {
        self.run(Endpoint::MarkAbsent, move |f| {
            f.transition(id, TicketState::Absent, |t, _, _| {
                t.observations = body.observations;
                Ok(())
            })
        })
    }

    fn redirect(&self, id: TicketId, body: RedirectRequest) -> ApiFuture<'_, Ticket> {
        self.run(Endpoint::Redirect, move |f| {
            f.transition(id, TicketState::Redirected, |t, _, sectors| {
                let target = sectors
                    .iter()
                    .find(|s| s.id == body.target_sector_id)
                    .cloned()
                    .ok_or_else(|| {
                        Error::NotFound(format!("sector {}", body.target_sector_id))
                    })?;
                t.sector = target;
                t.observations = Some(body.reason);
                Ok(())
            })
        })
    }
}

/// An engine over `fake` at opening time, without background refresh.
pub fn test_engine(fake: &FakeApi) -> Engine<FakeApi> {
    Engine::new(
        OperationExecutor::new(fake.clone()),
        Arc::new(opening_clock()),
        EngineConfig {
            refresh_interval: None,
        },
    )
}

/// Polls `cond` until it holds, failing the test after a second.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(1), async {
        while !cond() {
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached in time");
}

/// Runs `fut` with a one-second timeout.
pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(1), fut)
        .await
        .expect("future did not complete in time")
}
