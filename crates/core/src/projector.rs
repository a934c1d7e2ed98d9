// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! View projection over a sector's ticket records.
//!
//! The same records feed four overlapping views:
//!
//! | View      | Members                                             | Order                        |
//! |-----------|-----------------------------------------------------|------------------------------|
//! | Queue     | sector tickets GENERATED or REDIRECTED into sector  | priority first, then FIFO    |
//! | Next      | head of Queue                                       | -                            |
//! | Pending   | same predicate as Queue                             | priority first, then FIFO    |
//! | Day list  | sector tickets created today, any state             | creation time                |
//!
//! Statistics are derived from the views on demand and never stored on
//! their own.

use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::citizen::matches_query;
use crate::ticket::{SectorId, Ticket, TicketId, TicketState};

/// The views maintained for the active sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Queue,
    Next,
    Pending,
    DayList,
}

impl ViewKind {
    pub const ALL: [ViewKind; 4] = [
        ViewKind::Queue,
        ViewKind::Next,
        ViewKind::Pending,
        ViewKind::DayList,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::Queue => "queue",
            ViewKind::Next => "next",
            ViewKind::Pending => "pending",
            ViewKind::DayList => "day_list",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a projection is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionContext {
    pub sector: SectorId,
    pub today: NaiveDate,
}

impl ProjectionContext {
    pub fn new(sector: SectorId, today: NaiveDate) -> Self {
        ProjectionContext { sector, today }
    }
}

/// Returns true if `ticket` belongs in view `kind`.
pub fn admits(kind: ViewKind, ticket: &Ticket, ctx: &ProjectionContext) -> bool {
    if !ticket.belongs_to(ctx.sector) {
        return false;
    }
    match kind {
        ViewKind::Queue | ViewKind::Next | ViewKind::Pending => matches!(
            ticket.state,
            TicketState::Generated | TicketState::Redirected
        ),
        ViewKind::DayList => ticket.created_at.date() == ctx.today,
    }
}

/// Canonical serving order: priority tickets first, then oldest first.
pub fn serving_order(a: &Ticket, b: &Ticket) -> Ordering {
    b.is_priority
        .cmp(&a.is_priority)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}

fn creation_order(a: &Ticket, b: &Ticket) -> Ordering {
    a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))
}

fn order_for(kind: ViewKind) -> fn(&Ticket, &Ticket) -> Ordering {
    match kind {
        ViewKind::DayList => creation_order,
        _ => serving_order,
    }
}

/// Filters and orders `records` for a view, keeping the last record seen
/// for each id.
pub fn project<'a, I>(kind: ViewKind, records: I, ctx: &ProjectionContext) -> Vec<Ticket>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let mut by_id: BTreeMap<TicketId, &Ticket> = BTreeMap::new();
    for ticket in records {
        by_id.insert(ticket.id, ticket);
    }

    let mut out: Vec<Ticket> = by_id
        .into_values()
        .filter(|t| admits(kind, t, ctx))
        .cloned()
        .collect();
    out.sort_by(order_for(kind));
    if kind == ViewKind::Next {
        out.truncate(1);
    }
    out
}

/// The four projected views of one sector.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Views {
    pub queue: Vec<Ticket>,
    pub next: Option<Ticket>,
    pub pending: Vec<Ticket>,
    pub day: Vec<Ticket>,
}

impl Views {
    /// Projects every view from one batch of records.
    pub fn project(records: &[Ticket], ctx: &ProjectionContext) -> Self {
        let queue = project(ViewKind::Queue, records, ctx);
        Views {
            next: queue.first().cloned(),
            pending: project(ViewKind::Pending, records, ctx),
            day: project(ViewKind::DayList, records, ctx),
            queue,
        }
    }

    /// Replaces one view with freshly fetched records.
    ///
    /// Records that do not satisfy the view's predicate are dropped. A
    /// fetched Next that does not qualify falls back to the queue head.
    pub fn replace(&mut self, kind: ViewKind, records: &[Ticket], ctx: &ProjectionContext) {
        let projected = project(kind, records, ctx);
        match kind {
            ViewKind::Queue => self.queue = projected,
            ViewKind::Pending => self.pending = projected,
            ViewKind::DayList => self.day = projected,
            ViewKind::Next => {
                self.next = projected
                    .into_iter()
                    .next()
                    .or_else(|| self.queue.first().cloned());
            }
        }
    }

    /// Swaps in fresher copies of the records view `kind` still holds.
    ///
    /// For views whose own fetch failed: entries with a copy in `fresh` take
    /// that copy and leave the view when they no longer qualify.
    pub fn reconcile(
        &mut self,
        kind: ViewKind,
        fresh: &BTreeMap<TicketId, Ticket>,
        ctx: &ProjectionContext,
    ) {
        let refreshed = |list: &[Ticket]| -> Vec<Ticket> {
            let updated: Vec<Ticket> = list
                .iter()
                .map(|t| fresh.get(&t.id).unwrap_or(t).clone())
                .collect();
            project(kind, &updated, ctx)
        };
        match kind {
            ViewKind::Queue => self.queue = refreshed(&self.queue),
            ViewKind::Pending => self.pending = refreshed(&self.pending),
            ViewKind::DayList => self.day = refreshed(&self.day),
            ViewKind::Next => {
                let head = self.next.take().map(|t| fresh.get(&t.id).cloned().unwrap_or(t));
                self.next = head
                    .filter(|t| admits(ViewKind::Next, t, ctx))
                    .or_else(|| self.queue.first().cloned());
            }
        }
    }

    /// Merges one authoritative record into every view by identity.
    ///
    /// The previous entry with the same id is removed from each view and the
    /// record is re-inserted, in order, wherever it still qualifies. Next is
    /// re-derived from the queue head. Returns true if the record is still
    /// visible in some view.
    pub fn merge(&mut self, record: &Ticket, ctx: &ProjectionContext) -> bool {
        let mut visible = false;
        for (kind, list) in [
            (ViewKind::Queue, &mut self.queue),
            (ViewKind::Pending, &mut self.pending),
            (ViewKind::DayList, &mut self.day),
        ] {
            list.retain(|t| t.id != record.id);
            if admits(kind, record, ctx) {
                let order = order_for(kind);
                let pos = list.partition_point(|t| order(t, record) == Ordering::Less);
                list.insert(pos, record.clone());
                visible = true;
            }
        }
        self.next = self.queue.first().cloned();
        visible
    }

    /// Removes a ticket from every view.
    pub fn remove(&mut self, id: TicketId) {
        self.queue.retain(|t| t.id != id);
        self.pending.retain(|t| t.id != id);
        self.day.retain(|t| t.id != id);
        if self.next.as_ref().is_some_and(|t| t.id == id) {
            self.next = self.queue.first().cloned();
        }
    }

    /// Iterates over every distinct record across the views.
    pub fn records(&self) -> impl Iterator<Item = &Ticket> {
        let mut seen = HashSet::new();
        self.queue
            .iter()
            .chain(self.next.iter())
            .chain(self.pending.iter())
            .chain(self.day.iter())
            .filter(move |t| seen.insert(t.id))
    }

    /// Looks a ticket up by id in any view.
    pub fn get(&self, id: TicketId) -> Option<&Ticket> {
        self.records().find(|t| t.id == id)
    }

    pub fn contains(&self, kind: ViewKind, id: TicketId) -> bool {
        match kind {
            ViewKind::Queue => self.queue.iter().any(|t| t.id == id),
            ViewKind::Pending => self.pending.iter().any(|t| t.id == id),
            ViewKind::DayList => self.day.iter().any(|t| t.id == id),
            ViewKind::Next => self.next.as_ref().is_some_and(|t| t.id == id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty() && self.next.is_none() && self.pending.is_empty() && self.day.is_empty()
    }

    /// Searches the day list, then any queued ticket from an earlier day.
    pub fn search(&self, query: &str) -> Vec<&Ticket> {
        let mut seen = HashSet::new();
        self.day
            .iter()
            .chain(self.queue.iter())
            .filter(|t| seen.insert(t.id))
            .filter(|t| matches_query(t, query))
            .collect()
    }
}

/// Statistics derived from a set of views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Day-list counts for every state.
    pub by_state: BTreeMap<TicketState, usize>,
    pub day_total: usize,
    pub waiting: usize,
    pub waiting_priority: usize,
    /// Mean seconds from creation to call, over today's called tickets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_wait_secs: Option<i64>,
}

impl QueueStats {
    pub fn compute(views: &Views) -> Self {
        let mut by_state: BTreeMap<TicketState, usize> =
            TicketState::ALL.iter().map(|s| (*s, 0)).collect();
        for ticket in &views.day {
            *by_state.entry(ticket.state).or_insert(0) += 1;
        }

        let waits: Vec<i64> = views
            .day
            .iter()
            .filter_map(|t| t.called_at.map(|c| (c - t.created_at).num_seconds()))
            .collect();
        let average_wait_secs = if waits.is_empty() {
            None
        } else {
            Some(waits.iter().sum::<i64>() / waits.len() as i64)
        };

        QueueStats {
            by_state,
            day_total: views.day.len(),
            waiting: views.queue.len(),
            waiting_priority: views.queue.iter().filter(|t| t.is_priority).count(),
            average_wait_secs,
        }
    }

    pub fn count(&self, state: TicketState) -> usize {
        self.by_state.get(&state).copied().unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "projector_tests.rs"]
mod tests;
