// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Push listener: turns push events into engine invalidations.
//!
//! The listener follows the engine's active sector, keeps one event stream
//! open for it, and reconnects with exponential backoff when the stream
//! drops. Every reconnect is followed by an invalidation, since events may
//! have been missed while disconnected.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use turno_core::SectorId;

use super::source::{EventSource, PushError, PushResult};
use super::sse::SseEvent;
use crate::api::TicketApi;
use crate::config::PushConfig;
use crate::engine::Engine;

/// Connection state values for atomic state field.
pub const STATE_DISCONNECTED: u8 = 0;
pub const STATE_CONNECTING: u8 = 1;
pub const STATE_CONNECTED: u8 = 2;

/// Receiver of push invalidations.
pub trait QueueInvalidation: Send + Sync {
    /// Schedules a resync of `sector`; false if the sector is not active.
    fn on_push_invalidate(&self, sector: SectorId) -> bool;

    /// Active sector changes the listener should follow.
    fn watch_sector(&self) -> watch::Receiver<Option<SectorId>>;
}

impl<A: TicketApi + 'static> QueueInvalidation for Engine<A> {
    fn on_push_invalidate(&self, sector: SectorId) -> bool {
        Engine::on_push_invalidate(self, sector)
    }

    fn watch_sector(&self) -> watch::Receiver<Option<SectorId>> {
        Engine::watch_sector(self)
    }
}

/// Listener state visible to the front end.
///
/// Uses atomic fields for lock-free reads.
pub struct SharedPushState {
    state: AtomicU8,
    attempt: AtomicU32,
    events: AtomicU64,
}

impl SharedPushState {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(STATE_DISCONNECTED),
            attempt: AtomicU32::new(0),
            events: AtomicU64::new(0),
        }
    }

    pub fn get(&self) -> u8 {
        self.state.load(Ordering::Acquire)
    }

    pub fn set(&self, state: u8) {
        self.state.store(state, Ordering::Release);
    }

    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::Acquire)
    }

    pub fn set_attempt(&self, attempt: u32) {
        self.attempt.store(attempt, Ordering::Release);
    }

    /// Number of invalidation events received.
    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Acquire)
    }

    fn record_event(&self) {
        self.events.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_connected(&self) -> bool {
        self.get() == STATE_CONNECTED
    }

    pub fn status_string(&self) -> String {
        match self.get() {
            STATE_DISCONNECTED => "disconnected".to_string(),
            STATE_CONNECTING => {
                let attempt = self.attempt();
                if attempt > 1 {
                    format!("connecting (attempt {})", attempt)
                } else {
                    "connecting".to_string()
                }
            }
            STATE_CONNECTED => "connected".to_string(),
            _ => "unknown".to_string(),
        }
    }
}

impl Default for SharedPushState {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Event name that signals invalidation.
    pub event_name: String,
    /// Maximum consecutive connection attempts (0 = unlimited).
    pub max_retries: u32,
    /// Initial delay for exponential backoff (milliseconds).
    pub initial_delay_ms: u64,
    /// Maximum delay between reconnection attempts (seconds).
    pub max_delay_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        ListenerConfig::from(&PushConfig::default())
    }
}

impl From<&PushConfig> for ListenerConfig {
    fn from(config: &PushConfig) -> Self {
        ListenerConfig {
            event_name: config.event_name.clone(),
            max_retries: config.max_retries,
            initial_delay_ms: config.initial_delay_ms,
            max_delay_secs: config.max_delay_secs,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvalidationPayload {
    #[serde(alias = "sector_id", alias = "sector")]
    sector_id: SectorId,
}

/// Sector named by an event's data, if any.
///
/// Accepts a bare id or a JSON object with a `sectorId` field.
pub fn sector_from_data(data: &str) -> Option<SectorId> {
    let data = data.trim();
    if data.is_empty() {
        return None;
    }
    if let Ok(id) = data.parse::<SectorId>() {
        return Some(id);
    }
    serde_json::from_str::<InvalidationPayload>(data)
        .ok()
        .map(|p| p.sector_id)
}

enum Connect {
    Connected,
    SectorChanged,
    Stopped,
}

enum Step {
    Event(SseEvent),
    Lost(String),
    SectorChanged,
    Stop,
}

/// Listens to the push stream of the active sector.
pub struct PushListener<S, T> {
    source: S,
    target: T,
    config: ListenerConfig,
    state: Arc<SharedPushState>,
    cancel: CancellationToken,
}

impl<S: EventSource, T: QueueInvalidation> PushListener<S, T> {
    pub fn new(source: S, target: T, config: ListenerConfig) -> Self {
        PushListener {
            source,
            target,
            config,
            state: Arc::new(SharedPushState::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> Arc<SharedPushState> {
        Arc::clone(&self.state)
    }

    /// Token that stops the listener when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs until cancelled, or until reconnection gives up.
    pub async fn run(mut self) -> PushResult<()> {
        let mut sectors = self.target.watch_sector();
        let mut resync_on_connect = false;

        loop {
            let current = *sectors.borrow_and_update();
            let Some(sector) = current else {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Ok(()),
                    changed = sectors.changed() => {
                        if changed.is_err() {
                            return Ok(());
                        }
                    }
                }
                continue;
            };

            match self.connect_with_retry(sector, &mut sectors).await? {
                Connect::Connected => {}
                Connect::SectorChanged => {
                    resync_on_connect = false;
                    continue;
                }
                Connect::Stopped => return Ok(()),
            }
            if resync_on_connect {
                debug!(%sector, "invalidating after reconnect");
                self.target.on_push_invalidate(sector);
            }

            loop {
                let step = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => Step::Stop,
                    changed = sectors.changed() => match changed {
                        Ok(()) => Step::SectorChanged,
                        Err(_) => Step::Stop,
                    },
                    event = self.source.next_event() => match event {
                        Ok(Some(event)) => Step::Event(event),
                        Ok(None) => Step::Lost("stream closed by server".to_string()),
                        Err(e) => Step::Lost(e.to_string()),
                    },
                };

                match step {
                    Step::Event(event) => self.handle_event(sector, event),
                    Step::Lost(reason) => {
                        warn!(%sector, "push stream lost: {}", reason);
                        self.source.disconnect();
                        self.state.set(STATE_DISCONNECTED);
                        resync_on_connect = true;
                        break;
                    }
                    Step::SectorChanged => {
                        self.source.disconnect();
                        self.state.set(STATE_DISCONNECTED);
                        // Switching sector already resyncs the new one.
                        resync_on_connect = false;
                        break;
                    }
                    Step::Stop => {
                        self.source.disconnect();
                        self.state.set(STATE_DISCONNECTED);
                        return Ok(());
                    }
                }
            }
        }
    }

    fn handle_event(&self, sector: SectorId, event: SseEvent) {
        if event.event != self.config.event_name {
            debug!(event = %event.event, "ignoring push event");
            return;
        }
        let target = sector_from_data(&event.data).unwrap_or(sector);
        self.state.record_event();
        info!(sector = %target, "queue invalidated by push");
        if !self.target.on_push_invalidate(target) {
            debug!(sector = %target, "invalidation not applied");
        }
    }

    /// Connects to `sector` with exponential backoff.
    async fn connect_with_retry(
        &mut self,
        sector: SectorId,
        sectors: &mut watch::Receiver<Option<SectorId>>,
    ) -> PushResult<Connect> {
        let mut attempt = 0u32;
        let mut delay_ms = self.config.initial_delay_ms;

        loop {
            if self.cancel.is_cancelled() {
                self.state.set(STATE_DISCONNECTED);
                return Ok(Connect::Stopped);
            }

            attempt = attempt.saturating_add(1);
            self.state.set(STATE_CONNECTING);
            self.state.set_attempt(attempt);

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.state.set(STATE_DISCONNECTED);
                    return Ok(Connect::Stopped);
                }
                result = self.source.connect(sector) => result,
            };

            let error = match result {
                Ok(()) => {
                    self.state.set(STATE_CONNECTED);
                    self.state.set_attempt(0);
                    info!(%sector, attempt, "push stream connected");
                    return Ok(Connect::Connected);
                }
                Err(e) => e.to_string(),
            };

            // Check if we've exceeded max retries (0 = unlimited)
            if self.config.max_retries > 0 && attempt >= self.config.max_retries {
                self.state.set(STATE_DISCONNECTED);
                warn!(%sector, attempt, "giving up on push stream: {}", error);
                return Err(PushError::RetriesExhausted {
                    attempts: attempt,
                    last_error: error,
                });
            }

            // The server's requested retry delay is a floor on the backoff.
            let wait_ms = self
                .source
                .retry_hint()
                .map(|hint| u64::try_from(hint.as_millis()).unwrap_or(u64::MAX))
                .map_or(delay_ms, |hint_ms| delay_ms.max(hint_ms));
            warn!(%sector, attempt, "push connect failed, retrying in {}ms: {}", wait_ms, error);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.state.set(STATE_DISCONNECTED);
                    return Ok(Connect::Stopped);
                }
                changed = sectors.changed() => {
                    self.state.set(STATE_DISCONNECTED);
                    return Ok(match changed {
                        Ok(()) => Connect::SectorChanged,
                        Err(_) => Connect::Stopped,
                    });
                }
                _ = tokio::time::sleep(Duration::from_millis(wait_ms)) => {}
            }

            delay_ms = std::cmp::min(
                delay_ms.saturating_mul(2),
                self.config.max_delay_secs.saturating_mul(1000),
            );
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
