// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background refresh task for the active sector.
//!
//! One task per active sector. It resyncs when the interval elapses or when
//! a push invalidation arrives. `Notify` keeps at most one stored permit, so
//! any number of invalidations received during a resync collapse into a
//! single follow-up resync.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use turno_core::SectorId;

use super::{Engine, EngineInner, ResyncOutcome};
use crate::api::TicketApi;

/// Handle to a running refresher. Dropping it stops the task.
pub(super) struct RefreshHandle {
    pub(super) sector: SectorId,
    notify: Arc<Notify>,
    cancel: CancellationToken,
}

impl RefreshHandle {
    pub(super) fn spawn<A: TicketApi + 'static>(
        inner: Weak<EngineInner<A>>,
        sector: SectorId,
        period: Option<Duration>,
    ) -> Self {
        let notify = Arc::new(Notify::new());
        let cancel = CancellationToken::new();
        tokio::spawn(run(
            inner,
            sector,
            period,
            Arc::clone(&notify),
            cancel.clone(),
        ));
        RefreshHandle {
            sector,
            notify,
            cancel,
        }
    }

    /// Schedules a resync, collapsing with any already pending.
    pub(super) fn trigger(&self) {
        self.notify.notify_one();
    }

    pub(super) fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn run<A: TicketApi + 'static>(
    inner: Weak<EngineInner<A>>,
    sector: SectorId,
    period: Option<Duration>,
    notify: Arc<Notify>,
    cancel: CancellationToken,
) {
    let mut interval = period.map(|p| {
        let mut interval = tokio::time::interval_at(Instant::now() + p, p);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    debug!(%sector, "refresher started");
    loop {
        let trigger = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = notify.notified() => "invalidation",
            _ = tick(&mut interval) => "interval",
        };

        let Some(inner) = inner.upgrade() else {
            break;
        };
        let engine = Engine { inner };
        debug!(%sector, trigger, "refreshing sector");
        match engine.resync(sector).await {
            Ok(ResyncOutcome::Applied) => {}
            Ok(ResyncOutcome::Discarded) => debug!(%sector, "refresh result discarded"),
            Err(e) => warn!(%sector, "refresh incomplete: {}", e),
        }
    }
    debug!(%sector, "refresher stopped");
}
