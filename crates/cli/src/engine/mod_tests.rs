// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use crate::test_helpers::{
    eventually, minutes, opening_clock, sector_a, sector_b, waiting_ticket, within, Endpoint,
    FakeApi,
};
use turno_core::{Error, ErrorKind, RedirectRequest, TicketState};

fn engine_for(fake: &FakeApi, refresh_interval: Option<Duration>) -> Engine<FakeApi> {
    Engine::new(
        OperationExecutor::new(fake.clone()),
        Arc::new(opening_clock()),
        EngineConfig { refresh_interval },
    )
}

/// Normal ticket 1 at T0 and priority ticket 2 at T0+1m, both in sector A.
fn priority_scenario() -> FakeApi {
    let mut priority = waiting_ticket(2, &sector_a(), 1);
    priority.is_priority = true;
    priority.priority_reason = Some("senior citizen".into());
    FakeApi::with_tickets([waiting_ticket(1, &sector_a(), 0), priority])
}

fn call(id: u64) -> Operation {
    Operation::Call {
        ticket_id: TicketId(id),
        observations: None,
    }
}

/// Server copy of ticket `id`, moved to CALLED behind the engine's back.
fn called_on_server(fake: &FakeApi, id: u64) -> Ticket {
    let mut ticket = fake.get(id).unwrap();
    ticket.state = TicketState::Called;
    ticket.called_at = Some(minutes(10));
    ticket
}

fn ids(tickets: &[Ticket]) -> Vec<u64> {
    tickets.iter().map(|t| t.id.0).collect()
}

#[tokio::test]
async fn set_active_sector_loads_all_views() {
    let fake = priority_scenario();
    fake.put(waiting_ticket(3, &sector_b(), 0));
    let engine = engine_for(&fake, None);

    let outcome = engine.set_active_sector(sector_a().id).await.unwrap();

    assert_eq!(outcome, ResyncOutcome::Applied);
    let snap = engine.snapshot();
    assert_eq!(snap.sector, Some(sector_a().id));
    assert_eq!(ids(snap.queue()), vec![2, 1]);
    assert_eq!(snap.next().map(|t| t.id), Some(TicketId(2)));
    assert_eq!(ids(snap.pending()), vec![2, 1]);
    assert_eq!(ids(snap.day()), vec![1, 2]);
    assert_eq!(snap.stats.waiting, 2);
    assert_eq!(snap.stats.waiting_priority, 1);
    assert!(snap.last_resync.is_some());
}

#[tokio::test]
async fn call_advances_next_and_leaves_queue() {
    let fake = priority_scenario();
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();

    let called = engine.perform_operation(call(2)).await.unwrap();

    assert_eq!(called.state, TicketState::Called);
    let snap = engine.snapshot();
    assert_eq!(ids(snap.queue()), vec![1]);
    assert_eq!(snap.next().map(|t| t.id), Some(TicketId(1)));
    assert!(snap.day().iter().any(|t| t.id == TicketId(2) && t.state == TicketState::Called));
    assert_eq!(snap.stats.count(TicketState::Called), 1);
    assert!(snap.in_flight.is_empty());
}

#[tokio::test]
async fn calling_last_ticket_empties_next() {
    let fake = FakeApi::with_tickets([waiting_ticket(1, &sector_a(), 0)]);
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();

    engine.perform_operation(call(1)).await.unwrap();

    let snap = engine.snapshot();
    assert!(snap.next().is_none());
    assert!(snap.queue().is_empty());
}

#[tokio::test]
async fn invalid_state_is_rejected_locally() {
    let mut finished = waiting_ticket(1, &sector_a(), 0);
    finished.state = TicketState::Finished;
    finished.called_at = Some(minutes(1));
    finished.attention_started_at = Some(minutes(2));
    finished.finished_at = Some(minutes(3));
    let fake = FakeApi::with_tickets([finished.clone()]);
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();
    let before = engine.snapshot().revision;

    let err = engine.perform_operation(call(1)).await.unwrap_err();

    assert_eq!(err.error_kind(), ErrorKind::InvalidState);
    assert_eq!(err.kind, OperationKind::Call);
    assert_eq!(err.ticket_id, Some(TicketId(1)));
    assert_eq!(fake.calls(Endpoint::Call), 0);
    assert_eq!(engine.ticket(TicketId(1)), Some(finished));
    assert_eq!(engine.snapshot().revision, before);
}

#[tokio::test]
async fn second_operation_on_same_ticket_is_in_progress() {
    let fake = FakeApi::with_tickets([waiting_ticket(1, &sector_a(), 0)]);
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();
    let gate = fake.hold(Endpoint::Call);

    let first = tokio::spawn({
        let engine = engine.clone();
        async move { engine.perform_operation(call(1)).await }
    });
    eventually(|| fake.calls(Endpoint::Call) == 1).await;
    assert!(engine.snapshot().is_in_flight(TicketId(1)));

    let err = engine.perform_operation(call(1)).await.unwrap_err();
    assert_eq!(err.error_kind(), ErrorKind::OperationInProgress);
    assert_eq!(fake.calls(Endpoint::Call), 1);

    gate.notify_one();
    let called = within(first).await.unwrap().unwrap();
    assert_eq!(called.state, TicketState::Called);
    assert!(!engine.snapshot().is_in_flight(TicketId(1)));

    let started = engine
        .perform_operation(Operation::StartAttention {
            ticket_id: TicketId(1),
        })
        .await
        .unwrap();
    assert_eq!(started.state, TicketState::InAttention);
}

#[tokio::test]
async fn operations_on_different_tickets_overlap() {
    let fake = priority_scenario();
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();
    let gate = fake.hold(Endpoint::Call);

    let first = tokio::spawn({
        let engine = engine.clone();
        async move { engine.perform_operation(call(2)).await }
    });
    eventually(|| fake.calls(Endpoint::Call) == 1).await;

    let absent = engine
        .perform_operation(Operation::MarkAbsent {
            ticket_id: TicketId(1),
            observations: "did not show up".into(),
        })
        .await
        .unwrap();
    assert_eq!(absent.state, TicketState::Absent);

    gate.notify_one();
    within(first).await.unwrap().unwrap();
    assert!(engine.snapshot().queue().is_empty());
}

#[tokio::test]
async fn remote_failure_leaves_state_untouched() {
    let fake = FakeApi::with_tickets([waiting_ticket(1, &sector_a(), 0)]);
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();
    let before = engine.ticket(TicketId(1));
    fake.fail(Endpoint::Call, Error::Conflict("already called".into()));

    let err = engine.perform_operation(call(1)).await.unwrap_err();

    assert_eq!(err.source, Error::Conflict("already called".into()));
    assert_eq!(engine.ticket(TicketId(1)), before);
    let snap = engine.snapshot();
    assert!(snap.in_flight.is_empty());
    assert_eq!(ids(snap.queue()), vec![1]);

    fake.clear_failure(Endpoint::Call);
    engine.perform_operation(call(1)).await.unwrap();
}

#[tokio::test]
async fn redirect_moves_ticket_between_sectors() {
    let fake = priority_scenario();
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();

    let moved = engine
        .perform_operation(Operation::Redirect {
            ticket_id: TicketId(2),
            request: RedirectRequest {
                target_sector_id: sector_b().id,
                reason: "wrong department".into(),
                observations: None,
            },
        })
        .await
        .unwrap();

    assert_eq!(moved.state, TicketState::Redirected);
    assert_eq!(moved.sector.id, sector_b().id);
    let snap = engine.snapshot();
    assert_eq!(ids(snap.queue()), vec![1]);
    assert_eq!(ids(snap.pending()), vec![1]);
    assert_eq!(snap.next().map(|t| t.id), Some(TicketId(1)));
    assert!(engine.ticket(TicketId(2)).is_none());

    engine.set_active_sector(sector_b().id).await.unwrap();
    let snap = engine.snapshot();
    assert_eq!(ids(snap.queue()), vec![2]);

    // A ticket redirected into the active sector can be called there.
    let called = engine.perform_operation(call(2)).await.unwrap();
    assert_eq!(called.state, TicketState::Called);
}

#[tokio::test]
async fn redirect_to_same_sector_is_rejected() {
    let fake = FakeApi::with_tickets([waiting_ticket(1, &sector_a(), 0)]);
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();

    let err = engine
        .perform_operation(Operation::Redirect {
            ticket_id: TicketId(1),
            request: RedirectRequest {
                target_sector_id: sector_a().id,
                reason: "loop".into(),
                observations: None,
            },
        })
        .await
        .unwrap_err();

    assert_eq!(err.error_kind(), ErrorKind::Validation);
    assert_eq!(fake.calls(Endpoint::Redirect), 0);
}

#[tokio::test]
async fn issue_merges_new_ticket_into_queue() {
    let fake = FakeApi::with_tickets([waiting_ticket(1, &sector_a(), 0)]);
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();

    let mut request = turno_core::IssueRequest::new(sector_a().id, "30999888");
    request.is_priority = true;
    let issued = engine
        .perform_operation(Operation::Issue(request))
        .await
        .unwrap();

    let snap = engine.snapshot();
    assert_eq!(snap.next().map(|t| t.id), Some(issued.id));
    assert_eq!(snap.queue().len(), 2);
}

#[tokio::test]
async fn unknown_ticket_is_fetched_before_guard() {
    let fake = FakeApi::with_tickets([waiting_ticket(1, &sector_a(), 0)]);
    let engine = engine_for(&fake, None);

    let called = engine.perform_operation(call(1)).await.unwrap();

    assert_eq!(called.state, TicketState::Called);
    assert_eq!(fake.calls(Endpoint::Ticket), 1);
}

#[tokio::test]
async fn partial_resync_reports_failed_view() {
    let fake = priority_scenario();
    fake.fail(Endpoint::DayList, Error::Transport("connection reset".into()));
    let engine = engine_for(&fake, None);

    let err = engine.set_active_sector(sector_a().id).await.unwrap_err();

    assert_eq!(err.failures().len(), 1);
    assert!(err.failed(ViewKind::DayList));
    let snap = engine.snapshot();
    assert_eq!(ids(snap.queue()), vec![2, 1]);
    assert_eq!(ids(snap.pending()), vec![2, 1]);
    assert_eq!(snap.next().map(|t| t.id), Some(TicketId(2)));
    assert!(snap.day().is_empty());
}

#[tokio::test]
async fn failed_view_keeps_previous_contents() {
    let fake = priority_scenario();
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();

    fake.put(waiting_ticket(3, &sector_a(), 5));
    fake.fail(Endpoint::Pending, Error::Transport("timed out".into()));
    let err = engine.resync(sector_a().id).await.unwrap_err();

    assert!(err.failed(ViewKind::Pending));
    let snap = engine.snapshot();
    assert_eq!(ids(snap.queue()), vec![2, 1, 3]);
    assert_eq!(ids(snap.pending()), vec![2, 1]);
}

#[tokio::test]
async fn failed_next_follows_fresh_queue() {
    let fake = priority_scenario();
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();

    fake.put(called_on_server(&fake, 2));
    fake.fail(Endpoint::Next, Error::Transport("timed out".into()));
    let err = engine.resync(sector_a().id).await.unwrap_err();

    assert!(err.failed(ViewKind::Next));
    assert_eq!(engine.snapshot().next().map(|t| t.id), Some(TicketId(1)));
}

#[tokio::test]
async fn failed_queue_takes_fresh_copies_from_other_views() {
    let fake = priority_scenario();
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();

    fake.put(called_on_server(&fake, 2));
    fake.fail(Endpoint::Queue, Error::Transport("timed out".into()));
    let err = engine.resync(sector_a().id).await.unwrap_err();

    assert!(err.failed(ViewKind::Queue));
    let snap = engine.snapshot();
    assert_eq!(ids(snap.queue()), vec![1]);
    assert_eq!(snap.next().map(|t| t.id), Some(TicketId(1)));
    let day_copy = snap.day().iter().find(|t| t.id == TicketId(2)).cloned();
    assert_eq!(day_copy.map(|t| t.state), Some(TicketState::Called));
    assert_eq!(
        engine.ticket(TicketId(2)).map(|t| t.state),
        Some(TicketState::Called)
    );

    let err = engine.perform_operation(call(2)).await.unwrap_err();
    assert_eq!(err.error_kind(), ErrorKind::InvalidState);
    assert_eq!(fake.calls(Endpoint::Call), 0);
}

#[tokio::test]
async fn late_resync_after_switch_is_discarded() {
    let fake = priority_scenario();
    fake.put(waiting_ticket(3, &sector_b(), 0));
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();

    let gate = fake.hold(Endpoint::Queue);
    let stale = tokio::spawn({
        let engine = engine.clone();
        async move { engine.resync(sector_a().id).await }
    });
    eventually(|| fake.calls(Endpoint::Queue) == 2).await;

    engine.set_active_sector(sector_b().id).await.unwrap();
    gate.notify_one();

    assert_eq!(
        within(stale).await.unwrap().unwrap(),
        ResyncOutcome::Discarded
    );
    let snap = engine.snapshot();
    assert_eq!(snap.sector, Some(sector_b().id));
    assert_eq!(ids(snap.queue()), vec![3]);
}

#[tokio::test]
async fn older_resync_does_not_overwrite_newer() {
    let fake = priority_scenario();
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();

    let gate = fake.hold(Endpoint::Queue);
    let older = tokio::spawn({
        let engine = engine.clone();
        async move { engine.resync(sector_a().id).await }
    });
    eventually(|| fake.calls(Endpoint::Queue) == 2).await;

    fake.put(waiting_ticket(3, &sector_a(), 5));
    assert_eq!(
        engine.resync(sector_a().id).await.unwrap(),
        ResyncOutcome::Applied
    );
    gate.notify_one();

    assert_eq!(
        within(older).await.unwrap().unwrap(),
        ResyncOutcome::Discarded
    );
    assert_eq!(ids(engine.snapshot().queue()), vec![2, 1, 3]);
}

#[tokio::test]
async fn switching_sector_clears_views_in_one_step() {
    let fake = priority_scenario();
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();
    let mut rx = engine.subscribe();
    let gate = fake.hold(Endpoint::Queue);

    let switch = tokio::spawn({
        let engine = engine.clone();
        async move { engine.set_active_sector(sector_b().id).await }
    });
    within(rx.changed()).await.unwrap();
    let cleared = rx.borrow_and_update().clone();
    assert_eq!(cleared.sector, Some(sector_b().id));
    assert!(cleared.views.is_empty());

    gate.notify_one();
    within(switch).await.unwrap().unwrap();
}

#[tokio::test]
async fn resync_of_inactive_sector_is_discarded() {
    let fake = priority_scenario();
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();

    let outcome = engine.resync(sector_b().id).await.unwrap();

    assert_eq!(outcome, ResyncOutcome::Discarded);
    assert_eq!(fake.calls(Endpoint::Queue), 1);
}

#[tokio::test]
async fn rapid_invalidations_collapse_into_one_resync() {
    let fake = priority_scenario();
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();
    assert_eq!(fake.calls(Endpoint::Queue), 1);

    for _ in 0..5 {
        assert!(engine.on_push_invalidate(sector_a().id));
    }
    eventually(|| fake.calls(Endpoint::Queue) == 2).await;
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }

    assert_eq!(fake.calls(Endpoint::Queue), 2);
}

#[tokio::test]
async fn invalidation_for_other_sector_is_ignored() {
    let fake = priority_scenario();
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();

    assert!(!engine.on_push_invalidate(sector_b().id));
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    assert_eq!(fake.calls(Endpoint::Queue), 1);
}

#[tokio::test(start_paused = true)]
async fn periodic_refresh_resyncs_active_sector() {
    let fake = priority_scenario();
    let engine = engine_for(&fake, Some(Duration::from_secs(30)));
    engine.set_active_sector(sector_a().id).await.unwrap();

    fake.put(waiting_ticket(3, &sector_a(), 5));
    tokio::time::sleep(Duration::from_secs(31)).await;
    eventually(|| fake.calls(Endpoint::Queue) == 2).await;

    eventually(|| engine.snapshot().queue().len() == 3).await;
}

#[tokio::test]
async fn shutdown_stops_refresher() {
    let fake = priority_scenario();
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();

    engine.shutdown();

    assert!(!engine.on_push_invalidate(sector_a().id));
    // Explicit resyncs still work.
    assert_eq!(
        engine.resync(sector_a().id).await.unwrap(),
        ResyncOutcome::Applied
    );
}

#[tokio::test]
async fn revisions_increase_with_each_publish() {
    let fake = priority_scenario();
    let engine = engine_for(&fake, None);
    let rx = engine.subscribe();

    engine.set_active_sector(sector_a().id).await.unwrap();
    let after_switch = engine.snapshot().revision;
    engine.perform_operation(call(2)).await.unwrap();

    assert!(engine.snapshot().revision > after_switch);
    assert_eq!(rx.borrow().revision, engine.snapshot().revision);
}

#[tokio::test]
async fn search_matches_code_and_citizen() {
    let fake = priority_scenario();
    let engine = engine_for(&fake, None);
    engine.set_active_sector(sector_a().id).await.unwrap();

    assert_eq!(ids(&engine.search("int002")), vec![2]);
    assert_eq!(ids(&engine.search("30000001")), vec![1]);
    assert_eq!(engine.search("").len(), 2);
}
