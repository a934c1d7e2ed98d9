// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue synchronization engine.
//!
//! Owns the canonical ticket set for exactly one active sector and keeps the
//! four projected views consistent with it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  invalidate  ┌─────────────┐   resync    ┌─────────────┐
//! │    Push     │─────────────►│  Refresher  │────────────►│   Engine    │
//! │  Listener   │              │   (task)    │             │   state     │
//! └─────────────┘              └─────────────┘             └──────┬──────┘
//!                                                                 │ publish
//! ┌─────────────┐  perform_operation  ┌─────────────┐             ▼
//! │   Caller    │────────────────────►│  Executor   │      watch::Sender
//! └─────────────┘                     └─────────────┘     <EngineSnapshot>
//! ```
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await`. Remote calls run unlocked; their results are merged afterwards
//! under the lock, in completion order. Each resync captures the sector
//! epoch and a sequence number when it starts and is discarded at merge
//! time if the sector changed or a newer resync already landed.

mod error;
mod refresher;
mod snapshot;

pub use error::{OperationError, ResyncError, ViewFailure};
pub use snapshot::EngineSnapshot;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use turno_core::{
    Clock, Operation, OperationKind, ProjectionContext, QueueStats, SectorId, Ticket, TicketId,
    ViewKind, Views,
};

use crate::api::TicketApi;
use crate::executor::OperationExecutor;
use refresher::RefreshHandle;

/// Engine tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Period of the background refresh; `None` disables it.
    pub refresh_interval: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            refresh_interval: Some(Duration::from_secs(30)),
        }
    }
}

/// What happened to a resync's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncOutcome {
    /// Results were merged and published.
    Applied,
    /// Results arrived for a sector that is no longer active, or after a
    /// newer resync, and were dropped.
    Discarded,
}

#[derive(Default)]
struct EngineState {
    sector: Option<SectorId>,
    /// Incremented on every sector switch.
    epoch: u64,
    views: Views,
    canonical: BTreeMap<TicketId, Ticket>,
    in_flight: BTreeMap<TicketId, OperationKind>,
    /// Sequence number handed to the most recently started resync.
    issued_seq: u64,
    /// Sequence number of the most recently applied resync.
    applied_seq: u64,
    revision: u64,
    last_resync: Option<NaiveDateTime>,
}

struct EngineInner<A> {
    executor: OperationExecutor<A>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    state: Mutex<EngineState>,
    snapshot_tx: watch::Sender<Arc<EngineSnapshot>>,
    sector_tx: watch::Sender<Option<SectorId>>,
    refresher: Mutex<Option<RefreshHandle>>,
}

/// Cheaply cloneable handle to one synchronization engine.
pub struct Engine<A: TicketApi + 'static> {
    inner: Arc<EngineInner<A>>,
}

impl<A: TicketApi + 'static> Clone for Engine<A> {
    fn clone(&self) -> Self {
        Engine {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Clears a ticket's in-flight marker when the operation ends, however
/// it ends.
struct InFlightMarker<'a, A: TicketApi + 'static> {
    engine: &'a Engine<A>,
    id: TicketId,
}

impl<A: TicketApi + 'static> Drop for InFlightMarker<'_, A> {
    fn drop(&mut self) {
        let mut state = self.engine.lock_state();
        if state.in_flight.remove(&self.id).is_some() {
            self.engine.publish(&mut state);
        }
    }
}

impl<A: TicketApi + 'static> Engine<A> {
    pub fn new(executor: OperationExecutor<A>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(EngineSnapshot::default()));
        let (sector_tx, _) = watch::channel(None);
        Engine {
            inner: Arc::new(EngineInner {
                executor,
                clock,
                config,
                state: Mutex::new(EngineState::default()),
                snapshot_tx,
                sector_tx,
                refresher: Mutex::new(None),
            }),
        }
    }

    pub fn executor(&self) -> &OperationExecutor<A> {
        &self.inner.executor
    }

    pub fn active_sector(&self) -> Option<SectorId> {
        self.lock_state().sector
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Receives every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<Arc<EngineSnapshot>> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Receives active sector changes.
    pub fn watch_sector(&self) -> watch::Receiver<Option<SectorId>> {
        self.inner.sector_tx.subscribe()
    }

    /// The canonical record of a ticket in the active sector.
    pub fn ticket(&self, id: TicketId) -> Option<Ticket> {
        let state = self.lock_state();
        state
            .canonical
            .get(&id)
            .or_else(|| state.views.get(id))
            .cloned()
    }

    /// Searches the active sector's day list and queue.
    pub fn search(&self, query: &str) -> Vec<Ticket> {
        self.lock_state()
            .views
            .search(query)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Makes `sector` the active sector and resyncs it.
    ///
    /// Switching clears every view in one published step, stops the previous
    /// sector's refresher and starts a new one. Selecting the already active
    /// sector only resyncs.
    pub async fn set_active_sector(
        &self,
        sector: SectorId,
    ) -> Result<ResyncOutcome, ResyncError> {
        let switched = {
            let mut state = self.lock_state();
            if state.sector == Some(sector) {
                false
            } else {
                state.sector = Some(sector);
                state.epoch += 1;
                state.views = Views::default();
                state.canonical.clear();
                state.last_resync = None;
                self.publish(&mut state);
                true
            }
        };

        if switched {
            info!(%sector, "active sector changed");
            self.inner.sector_tx.send_replace(Some(sector));
            self.restart_refresher(sector);
        }
        self.resync(sector).await
    }

    /// Reloads all four views of `sector` and swaps them in at once.
    ///
    /// Views whose fetch failed keep their previous contents and are listed
    /// in the returned error; the other views are still applied.
    pub async fn resync(&self, sector: SectorId) -> Result<ResyncOutcome, ResyncError> {
        let (epoch, seq) = {
            let mut state = self.lock_state();
            if state.sector != Some(sector) {
                debug!(%sector, "resync skipped: sector not active");
                return Ok(ResyncOutcome::Discarded);
            }
            state.issued_seq += 1;
            (state.epoch, state.issued_seq)
        };

        let today = self.inner.clock.today();
        let api = self.inner.executor.api();
        debug!(%sector, seq, "resync started");
        let (queue, next, pending, day) = tokio::join!(
            api.queue(sector),
            api.next(sector),
            api.pending(sector),
            api.day_list(sector, today),
        );

        let mut state = self.lock_state();
        if state.epoch != epoch || seq < state.applied_seq {
            debug!(%sector, seq, "resync result is stale, discarding");
            return Ok(ResyncOutcome::Discarded);
        }
        state.applied_seq = seq;

        let ctx = ProjectionContext::new(sector, today);
        let mut views = state.views.clone();
        let mut failures = Vec::new();
        let mut fresh: BTreeMap<TicketId, Ticket> = BTreeMap::new();
        let mut apply = |view: ViewKind, fetched: turno_core::Result<Vec<Ticket>>| match fetched {
            Ok(records) => {
                views.replace(view, &records, &ctx);
                for record in records {
                    fresh.entry(record.id).or_insert(record);
                }
            }
            Err(error) => failures.push(ViewFailure { view, error }),
        };
        apply(ViewKind::Queue, queue);
        apply(ViewKind::Pending, pending);
        apply(ViewKind::DayList, day);
        match next {
            Ok(next) => apply(ViewKind::Next, Ok(next.into_iter().collect())),
            Err(error) => failures.push(ViewFailure {
                view: ViewKind::Next,
                error,
            }),
        }

        if failures.len() < ViewKind::ALL.len() {
            // Views that kept old data take the copies fetched in this pass.
            let failed = |view: ViewKind| failures.iter().any(|f| f.view == view);
            for view in ViewKind::ALL {
                if failed(view) {
                    views.reconcile(view, &fresh, &ctx);
                }
            }
            // Next is the queue head; keep it in step with a fresh queue.
            if failed(ViewKind::Next) && !failed(ViewKind::Queue) {
                views.next = views.queue.first().cloned();
            }
            state.canonical = views
                .records()
                .map(|t| (t.id, fresh.get(&t.id).unwrap_or(t).clone()))
                .collect();
            state.views = views;
            state.last_resync = Some(self.inner.clock.now());
            self.publish(&mut state);
        }
        drop(state);

        if failures.is_empty() {
            debug!(%sector, seq, "resync applied");
            Ok(ResyncOutcome::Applied)
        } else {
            let err = ResyncError::Partial { sector, failures };
            warn!("{}", err);
            Err(err)
        }
    }

    /// Runs one operation against the server and merges its result.
    ///
    /// Rejected locally, before any remote call, when the ticket's state does
    /// not permit the operation or another operation on the same ticket is
    /// still in flight. On failure the canonical set is left untouched.
    pub async fn perform_operation(&self, op: Operation) -> Result<Ticket, OperationError> {
        let kind = op.kind();
        let ticket_id = op.ticket_id();
        let fail = |source| OperationError {
            kind,
            ticket_id,
            source,
        };
        op.validate().map_err(fail)?;

        let _marker = match ticket_id {
            Some(id) => {
                let known = self.lock_state().canonical.get(&id).cloned();
                let record = match known {
                    Some(record) => record,
                    None => self.inner.executor.ticket(id).await.map_err(fail)?,
                };
                Some(self.begin(&op, id, record).map_err(fail)?)
            }
            None => None,
        };

        let ticket = self.inner.executor.execute(&op).await.map_err(fail)?;

        let mut state = self.lock_state();
        self.merge_record(&mut state, &ticket);
        if let Some(id) = ticket_id {
            state.in_flight.remove(&id);
        }
        self.publish(&mut state);
        Ok(ticket)
    }

    /// Checks the guards and marks the ticket in flight.
    fn begin(
        &self,
        op: &Operation,
        id: TicketId,
        fetched: Ticket,
    ) -> turno_core::Result<InFlightMarker<'_, A>> {
        let mut state = self.lock_state();
        if state.in_flight.contains_key(&id) {
            return Err(turno_core::Error::OperationInProgress(id.to_string()));
        }
        let record = state.canonical.get(&id).unwrap_or(&fetched);
        let active = state.sector.unwrap_or(record.sector.id);
        op.check_guard(record, active)?;

        state.in_flight.insert(id, op.kind());
        self.publish(&mut state);
        Ok(InFlightMarker { engine: self, id })
    }

    /// Merges an authoritative record by id into the canonical set and views.
    fn merge_record(&self, state: &mut EngineState, ticket: &Ticket) {
        if let Err(e) = ticket.check_timestamps() {
            warn!("server record failed validation: {}", e);
        }
        let Some(sector) = state.sector else {
            return;
        };
        let ctx = ProjectionContext::new(sector, self.inner.clock.today());
        if ticket.belongs_to(sector) {
            state.canonical.insert(ticket.id, ticket.clone());
        } else {
            debug!(ticket = %ticket.id, to = %ticket.sector.id, "ticket left active sector");
            state.canonical.remove(&ticket.id);
        }
        state.views.merge(ticket, &ctx);
    }

    /// Schedules a resync of `sector` if it is the active one.
    ///
    /// Returns false when the invalidation was ignored.
    pub fn on_push_invalidate(&self, sector: SectorId) -> bool {
        if self.active_sector() != Some(sector) {
            debug!(%sector, "ignoring invalidation for inactive sector");
            return false;
        }
        let refresher = self.lock_refresher();
        match refresher.as_ref() {
            Some(handle) if handle.sector == sector => {
                handle.trigger();
                true
            }
            _ => false,
        }
    }

    /// Stops background refreshing. The engine stays usable for explicit
    /// resyncs and operations.
    pub fn shutdown(&self) {
        if let Some(handle) = self.lock_refresher().take() {
            handle.cancel();
            info!(sector = %handle.sector, "refresher shut down");
        }
    }

    fn restart_refresher(&self, sector: SectorId) {
        let handle = RefreshHandle::spawn(
            Arc::downgrade(&self.inner),
            sector,
            self.inner.config.refresh_interval,
        );
        // Replacing the old handle drops it, which cancels its task.
        *self.lock_refresher() = Some(handle);
    }

    fn publish(&self, state: &mut EngineState) {
        state.revision += 1;
        let snapshot = EngineSnapshot {
            revision: state.revision,
            sector: state.sector,
            stats: QueueStats::compute(&state.views),
            views: state.views.clone(),
            in_flight: state.in_flight.clone(),
            last_resync: state.last_resync,
        };
        self.inner.snapshot_tx.send_replace(Arc::new(snapshot));
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_refresher(&self) -> MutexGuard<'_, Option<RefreshHandle>> {
        self.inner.refresher.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Date the day list is computed for.
    pub fn today(&self) -> NaiveDate {
        self.inner.clock.today()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
