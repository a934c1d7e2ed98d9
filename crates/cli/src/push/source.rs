// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Push stream abstraction.
//!
//! Provides a trait-based event source that enables:
//! - A real SSE connection over reqwest for production
//! - Scripted sources for listener tests

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{Client, Method};
use tracing::debug;

use turno_core::SectorId;

use super::sse::{SseDecoder, SseEvent};
use crate::api::http::{status_error, transport_error};
use crate::api::HttpTicketApi;

/// Error type for push stream operations.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The server could not be reached.
    #[error("push connection failed: {0}")]
    ConnectionFailed(String),

    /// The server answered the subscription with an error status.
    #[error("push subscription rejected: {0}")]
    Rejected(turno_core::Error),

    /// Reading from an open stream failed.
    #[error("push stream read failed: {0}")]
    ReceiveFailed(String),

    #[error("push stream not connected")]
    NotConnected,

    /// Reconnection gave up.
    #[error("push stream unavailable after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// Result type for push stream operations.
pub type PushResult<T> = Result<T, PushError>;

/// Source of server-sent events for one sector at a time.
pub trait EventSource: Send {
    /// Opens the stream for `sector`, replacing any open stream.
    fn connect(
        &mut self,
        sector: SectorId,
    ) -> Pin<Box<dyn Future<Output = PushResult<()>> + Send + '_>>;

    /// Next event from the open stream.
    ///
    /// Returns `None` when the server closed the stream.
    fn next_event(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = PushResult<Option<SseEvent>>> + Send + '_>>;

    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Reconnection delay last requested by the server, if any.
    fn retry_hint(&self) -> Option<Duration> {
        None
    }
}

/// SSE event source over `GET /sectors/{id}/events`.
pub struct SseEventSource {
    api: HttpTicketApi,
    stream: Option<BoxStream<'static, reqwest::Result<Vec<u8>>>>,
    decoder: SseDecoder,
    pending: VecDeque<SseEvent>,
}

impl SseEventSource {
    /// Creates a source for `base_url`.
    ///
    /// Only the connect phase is bounded by `connect_timeout`; an open
    /// stream may stay idle indefinitely.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        connect_timeout: Duration,
    ) -> turno_core::Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| turno_core::Error::Transport(format!("cannot build http client: {}", e)))?;
        Ok(SseEventSource {
            api: HttpTicketApi::with_client(client, base_url, token),
            stream: None,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
        })
    }
}

impl EventSource for SseEventSource {
    fn connect(
        &mut self,
        sector: SectorId,
    ) -> Pin<Box<dyn Future<Output = PushResult<()>> + Send + '_>> {
        Box::pin(async move {
            self.disconnect();
            let path = format!("/sectors/{}/events", sector);
            debug!("GET {} (event stream)", path);

            let mut request = self
                .api
                .request(Method::GET, &path)
                .header(ACCEPT, "text/event-stream")
                .header(CACHE_CONTROL, "no-cache");
            if let Some(id) = self.decoder.last_event_id() {
                request = request.header("Last-Event-ID", id);
            }

            let resp = request
                .send()
                .await
                .map_err(|e| PushError::ConnectionFailed(transport_error(e).to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(PushError::Rejected(status_error(status, &body)));
            }

            self.stream = Some(
                resp.bytes_stream()
                    .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                    .boxed(),
            );
            Ok(())
        })
    }

    fn next_event(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = PushResult<Option<SseEvent>>> + Send + '_>> {
        Box::pin(async move {
            loop {
                if let Some(event) = self.pending.pop_front() {
                    return Ok(Some(event));
                }
                let stream = self.stream.as_mut().ok_or(PushError::NotConnected)?;
                match stream.next().await {
                    Some(Ok(chunk)) => {
                        let events = self.decoder.feed(&chunk);
                        self.pending.extend(events);
                    }
                    Some(Err(e)) => {
                        self.stream = None;
                        return Err(PushError::ReceiveFailed(e.to_string()));
                    }
                    None => {
                        self.stream = None;
                        return Ok(None);
                    }
                }
            }
        })
    }

    fn disconnect(&mut self) {
        self.stream = None;
        self.pending.clear();
        self.decoder.reset();
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn retry_hint(&self) -> Option<Duration> {
        self.decoder.retry()
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
