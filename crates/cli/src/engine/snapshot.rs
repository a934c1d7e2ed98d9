// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use turno_core::{OperationKind, QueueStats, SectorId, Ticket, TicketId, Views};

/// Immutable view of the engine published after every change.
///
/// Consumers only ever see whole snapshots; the four views inside one
/// snapshot always come from the same resync or merge.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    /// Increases by one with every published change.
    pub revision: u64,
    pub sector: Option<SectorId>,
    pub views: Views,
    pub stats: QueueStats,
    /// Tickets with an operation awaiting the server.
    pub in_flight: BTreeMap<TicketId, OperationKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_resync: Option<NaiveDateTime>,
}

impl EngineSnapshot {
    pub fn queue(&self) -> &[Ticket] {
        &self.views.queue
    }

    pub fn next(&self) -> Option<&Ticket> {
        self.views.next.as_ref()
    }

    pub fn pending(&self) -> &[Ticket] {
        &self.views.pending
    }

    pub fn day(&self) -> &[Ticket] {
        &self.views.day
    }

    pub fn is_in_flight(&self, id: TicketId) -> bool {
        self.in_flight.contains_key(&id)
    }
}
