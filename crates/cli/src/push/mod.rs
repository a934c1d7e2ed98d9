// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Push notifications for queue changes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Server    │────►│ EventSource │────►│  Listener   │──► Engine::on_push_invalidate
//! │ (SSE stream)│     │   (trait)   │     │ (backoff)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! Push carries no ticket data. Every accepted event only schedules a
//! full resync of the sector it names.

mod listener;
mod source;
mod sse;

pub use listener::{
    sector_from_data, ListenerConfig, PushListener, QueueInvalidation, SharedPushState,
    STATE_CONNECTED, STATE_CONNECTING, STATE_DISCONNECTED,
};
pub use source::{EventSource, PushError, PushResult, SseEventSource};
pub use sse::{SseDecoder, SseEvent};
