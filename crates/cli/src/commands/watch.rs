// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Live view of one sector.
//!
//! Re-renders whenever the engine publishes a new snapshot. Snapshots come
//! from push invalidations, the periodic refresh, or both.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use turno_core::SectorId;

use crate::api::TicketApi;
use crate::config::Config;
use crate::display::{format_snapshot, format_time};
use crate::engine::{Engine, EngineSnapshot};
use crate::error::Result;
use crate::push::{
    EventSource, ListenerConfig, PushListener, PushResult, SharedPushState, SseEventSource,
};

use super::select_sector;

/// Watches `sector` until Ctrl-C.
pub async fn run<A: TicketApi + 'static>(
    engine: &Engine<A>,
    config: &Config,
    sector: SectorId,
    push: bool,
    out: &mut impl Write,
) -> Result<()> {
    let source = if push && config.push.enabled {
        Some(SseEventSource::new(
            &config.base_url,
            config.token.clone(),
            config.request_timeout(),
        )?)
    } else {
        None
    };
    let stop = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };
    run_impl(
        engine,
        source,
        ListenerConfig::from(&config.push),
        sector,
        out,
        stop,
    )
    .await
}

struct Push {
    handle: JoinHandle<PushResult<()>>,
    cancel: CancellationToken,
    state: Arc<SharedPushState>,
}

/// Internal implementation that accepts the event source and stop signal
/// for testing.
pub(crate) async fn run_impl<A, S, W, F>(
    engine: &Engine<A>,
    source: Option<S>,
    listener: ListenerConfig,
    sector: SectorId,
    out: &mut W,
    stop: F,
) -> Result<()>
where
    A: TicketApi + 'static,
    S: EventSource + 'static,
    W: Write,
    F: Future<Output = ()>,
{
    let mut snapshots = engine.subscribe();
    if let Err(e) = select_sector(engine, sector).await {
        // Keep watching; the next refresh may succeed.
        warn!("{}", e);
        eprintln!("warning: {}", e);
    }

    let mut push = source.map(|source| {
        let listener = PushListener::new(source, engine.clone(), listener);
        Push {
            cancel: listener.cancel_token(),
            state: listener.state(),
            handle: tokio::spawn(listener.run()),
        }
    });

    let snapshot = snapshots.borrow_and_update().clone();
    let mut last_revision = snapshot.revision;
    render(out, &snapshot, push.as_ref())?;

    tokio::pin!(stop);
    loop {
        tokio::select! {
            biased;
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if snapshot.revision != last_revision {
                    last_revision = snapshot.revision;
                    render(out, &snapshot, push.as_ref())?;
                }
            }
            result = listener_done(&mut push), if push.is_some() => {
                push = None;
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!("push disabled: {}", e);
                        eprintln!("warning: push disabled, relying on periodic refresh: {}", e);
                    }
                    Err(e) => warn!("push listener panicked: {}", e),
                }
            }
            _ = &mut stop => break,
        }
    }

    if let Some(push) = push {
        push.cancel.cancel();
        let _ = push.handle.await;
    }
    engine.shutdown();
    info!(%sector, "watch stopped");
    Ok(())
}

async fn listener_done(
    push: &mut Option<Push>,
) -> std::result::Result<PushResult<()>, JoinError> {
    match push {
        Some(p) => (&mut p.handle).await,
        None => std::future::pending().await,
    }
}

fn render(
    out: &mut impl Write,
    snapshot: &EngineSnapshot,
    push: Option<&Push>,
) -> Result<()> {
    let push_status = match push {
        Some(p) => p.state.status_string(),
        None => "off".to_string(),
    };
    let at = snapshot
        .last_resync
        .map(format_time)
        .unwrap_or_else(|| "--:--".to_string());
    writeln!(
        out,
        "=== revision {} at {} (push: {}) ===",
        snapshot.revision, at, push_status
    )?;
    writeln!(out, "{}", format_snapshot(snapshot, false))?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
