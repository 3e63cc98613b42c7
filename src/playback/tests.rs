use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::classify::Alert;
use crate::error::ControlError;
use crate::events::{Event, EventKind};
use crate::records::{EventSource, RawRecord, Record};
use crate::subscribers::{Broadcaster, Subscription};

use super::*;

const BASE: Duration = Duration::from_secs(1);

fn rec(i: u32, ground: &str, nusuk: &str, temp: f64) -> Record {
    Record {
        timestamp: NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(8, 0, i)
            .unwrap(),
        subject_id: format!("P{i:05}"),
        temperature: temp,
        actual_location: ground.into(),
        permitted_location: nusuk.into(),
        distress_flag: false,
        separated_from_id: None,
    }
}

fn scenario() -> Vec<Record> {
    vec![
        rec(1, "Mina", "Mina", 38.0),
        rec(2, "Mina", "Arafat", 38.0),
        rec(3, "Haram", "Haram", 41.0),
    ]
}

struct Rig {
    handle: PlaybackHandle,
    sub: Subscription,
    broadcaster: Arc<Broadcaster>,
    token: CancellationToken,
    join: JoinHandle<()>,
}

fn rig_with(source: EventSource, autostart: bool) -> Rig {
    let broadcaster = Arc::new(Broadcaster::default());
    let sub = broadcaster.subscribe(None);
    let (actor, handle) = PlaybackActor::new(
        Arc::new(source),
        Arc::clone(&broadcaster),
        PlaybackParams {
            base_interval: BASE,
            speed: Speed::X1,
            autostart,
            command_capacity: 8,
        },
    );
    let token = CancellationToken::new();
    let join = tokio::spawn(actor.run(token.clone()));
    Rig {
        handle,
        sub,
        broadcaster,
        token,
        join,
    }
}

fn rig(records: &[Record]) -> Rig {
    rig_with(EventSource::from_records(records), false)
}

fn drain(sub: &mut Subscription) -> Vec<Arc<Event>> {
    let mut out = Vec::new();
    while let Some(ev) = sub.try_recv() {
        out.push(ev);
    }
    out
}

fn alerts(events: &[Arc<Event>]) -> Vec<Alert> {
    events
        .iter()
        .filter_map(|e| e.as_classified().map(|c| c.alert))
        .collect()
}

fn statuses(events: &[Arc<Event>]) -> Vec<&'static str> {
    events
        .iter()
        .filter_map(|e| e.as_status().map(|s| s.status))
        .collect()
}

async fn finished(h: &PlaybackHandle) -> PlaybackSnapshot {
    h.wait_for(|s| s.mode == Mode::Stopped && s.cursor == s.total)
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn end_to_end_three_records() {
    let mut r = rig(&scenario());

    assert_eq!(r.handle.send(Command::Start).await.unwrap(), "Simulation started.");
    let snap = finished(&r.handle).await;

    assert_eq!(snap.cursor, 3);
    assert_eq!(
        snap.counters,
        Counters {
            red: 1,
            orange: 0,
            yellow: 1,
            blue: 0,
            total: 3
        }
    );

    let events = drain(&mut r.sub);
    assert_eq!(alerts(&events), vec![Alert::Green, Alert::Red, Alert::Yellow]);
    assert_eq!(statuses(&events), vec!["start", "finished"]);

    let last = events.last().unwrap().as_status().unwrap();
    assert_eq!(last.status, "finished");
    assert!(!last.running);

    // each record is followed by its location summary
    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind()).collect();
    assert_eq!(kinds[1], EventKind::RecordClassified);
    assert_eq!(kinds[2], EventKind::LocationSummary);
}

#[tokio::test(start_paused = true)]
async fn reset_zeroes_cursor_and_counters() {
    let r = rig(&scenario());

    r.handle.send(Command::Step).await.unwrap();
    r.handle.send(Command::Step).await.unwrap();
    assert_eq!(r.handle.status().cursor, 2);
    assert_eq!(r.handle.stats().total, 2);

    assert_eq!(r.handle.send(Command::Reset).await.unwrap(), "Simulation reset.");
    let status = r.handle.status();
    assert_eq!(status.cursor, 0);
    assert_eq!(status.total, 3);
    assert!(!status.running);
    assert_eq!(r.handle.stats(), Counters::default());

    // while running, too
    r.handle.send(Command::Start).await.unwrap();
    r.handle.wait_for(|s| s.cursor >= 1).await.unwrap();
    r.handle.send(Command::Reset).await.unwrap();
    let snap = r.handle.snapshot();
    assert_eq!((snap.cursor, snap.total, snap.mode), (0, 3, Mode::Stopped));
    assert_eq!(snap.counters, Counters::default());
}

#[tokio::test(start_paused = true)]
async fn step_emits_exactly_one_and_stops_at_end() {
    let mut r = rig(&scenario()[..1]);

    r.handle.send(Command::Step).await.unwrap();
    assert_eq!(r.handle.status().cursor, 1);
    let events = drain(&mut r.sub);
    assert_eq!(alerts(&events).len(), 1);
    assert_eq!(statuses(&events), vec!["step"]);

    for _ in 0..2 {
        let err = r.handle.send(Command::Step).await.unwrap_err();
        assert!(matches!(err, ControlError::InvalidTransition { .. }));
        assert_eq!(r.handle.status().cursor, 1);
    }
    // rejected commands publish nothing
    assert!(drain(&mut r.sub).is_empty());
}

#[tokio::test(start_paused = true)]
async fn step_while_running_is_rejected() {
    let r = rig(&scenario());
    r.handle.send(Command::Start).await.unwrap();
    r.handle.wait_for(|s| s.cursor == 1).await.unwrap();

    let err = r.handle.send(Command::Step).await.unwrap_err();
    assert!(matches!(err, ControlError::InvalidTransition { .. }));
    assert_eq!(r.handle.status().cursor, 1);
    assert!(r.handle.status().running);
}

#[tokio::test(start_paused = true)]
async fn emission_interval_follows_speed() {
    let records: Vec<Record> = (0..5).map(|i| rec(i, "Mina", "Mina", 37.0)).collect();

    for (speed, want) in [
        (Speed::X1, Duration::from_millis(1000)),
        (Speed::X2, Duration::from_millis(500)),
        (Speed::X4, Duration::from_millis(250)),
    ] {
        let mut r = rig(&records);
        r.handle.send(Command::SetSpeed(speed)).await.unwrap();
        r.handle.send(Command::Start).await.unwrap();

        let mut stamps = Vec::new();
        while stamps.len() < records.len() {
            let ev = r.sub.recv().await.unwrap();
            if ev.kind() == EventKind::RecordClassified {
                stamps.push(Instant::now());
            }
        }
        for pair in stamps.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(
                gap >= want && gap <= want + Duration::from_millis(5),
                "speed {speed}: gap {gap:?}, want {want:?}"
            );
        }
    }
}

#[tokio::test(start_paused = true)]
async fn start_twice_does_not_emit_twice() {
    let mut r = rig(&scenario());
    r.handle.send(Command::Start).await.unwrap();
    r.handle.send(Command::Start).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let events = drain(&mut r.sub);
    assert_eq!(alerts(&events).len(), 1);
    assert_eq!(statuses(&events), vec!["start", "start"]);
    assert_eq!(r.handle.status().cursor, 1);
    assert!(r.handle.status().running);
}

#[tokio::test(start_paused = true)]
async fn pause_interrupts_pending_delay() {
    let r = rig(&scenario());
    r.handle.send(Command::Start).await.unwrap();
    r.handle.wait_for(|s| s.cursor == 1).await.unwrap();

    let before = Instant::now();
    assert_eq!(r.handle.send(Command::Pause).await.unwrap(), "Simulation paused.");
    assert!(Instant::now() - before < BASE);
    assert!(!r.handle.status().running);

    tokio::time::sleep(BASE * 10).await;
    assert_eq!(r.handle.status().cursor, 1);

    // resuming picks up where it left off
    r.handle.send(Command::Start).await.unwrap();
    let snap = finished(&r.handle).await;
    assert_eq!(snap.counters.total, 3);
}

#[tokio::test(start_paused = true)]
async fn speed_change_while_running_repaces() {
    let records: Vec<Record> = (0..4).map(|i| rec(i, "Mina", "Mina", 37.0)).collect();
    let mut r = rig(&records);
    r.handle.send(Command::Start).await.unwrap();
    r.handle.wait_for(|s| s.cursor == 1).await.unwrap();
    let first = Instant::now();

    assert_eq!(
        r.handle.send(Command::SetSpeed(Speed::X4)).await.unwrap(),
        "Playback speed set to 4x."
    );
    r.handle.wait_for(|s| s.cursor == 2).await.unwrap();
    assert!(Instant::now() - first <= Duration::from_millis(255));

    let snap = finished(&r.handle).await;
    assert_eq!(snap.speed, Speed::X4);
    let speed_notice = drain(&mut r.sub)
        .iter()
        .find_map(|e| e.as_status().filter(|s| s.status == "speed").cloned())
        .unwrap();
    assert_eq!(speed_notice.speed, Speed::X4);
    assert!(speed_notice.running);
}

#[tokio::test(start_paused = true)]
async fn detaching_a_subscriber_mid_stream_does_not_disturb_others() {
    let mut r = rig(&scenario());
    let early_leaver = r.broadcaster.subscribe(None);

    r.handle.send(Command::Start).await.unwrap();
    r.handle.wait_for(|s| s.cursor == 1).await.unwrap();
    assert!(r.broadcaster.detach(early_leaver.id()));
    drop(early_leaver);

    finished(&r.handle).await;
    assert_eq!(alerts(&drain(&mut r.sub)).len(), 3);
    assert_eq!(r.broadcaster.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn undecodable_record_is_skipped() {
    let mut rows: Vec<RawRecord> = scenario().iter().map(RawRecord::from).collect();
    rows[1].temp = "n/a".into();
    let mut r = rig_with(EventSource::from_raw(rows), false);

    r.handle.send(Command::Start).await.unwrap();
    let snap = finished(&r.handle).await;

    assert_eq!(snap.cursor, 3);
    assert_eq!(snap.skipped, 1);
    assert_eq!(snap.counters.total, 2);
    assert_eq!(alerts(&drain(&mut r.sub)), vec![Alert::Green, Alert::Yellow]);
}

#[tokio::test(start_paused = true)]
async fn step_over_undecodable_record_counts_a_skip() {
    let mut rows: Vec<RawRecord> = scenario().iter().map(RawRecord::from).collect();
    rows[0].timestamp = "yesterday".into();
    let mut r = rig_with(EventSource::from_raw(rows), false);

    let msg = r.handle.send(Command::Step).await.unwrap();
    assert_eq!(msg, "Record 1/3 skipped.");
    let snap = r.handle.snapshot();
    assert_eq!((snap.cursor, snap.skipped, snap.mode), (1, 1, Mode::Stopped));
    assert_eq!(snap.counters.total, 0);

    let events = drain(&mut r.sub);
    assert!(alerts(&events).is_empty());
    assert_eq!(statuses(&events), vec!["step"]);

    let msg = r.handle.send(Command::Step).await.unwrap();
    assert_eq!(msg, "Stepped to record 2/3.");
    assert_eq!(alerts(&drain(&mut r.sub)), vec![Alert::Red]);
}

#[tokio::test(start_paused = true)]
async fn send_waits_for_room_instead_of_failing() {
    let broadcaster = Arc::new(Broadcaster::default());
    let (actor, handle) = PlaybackActor::new(
        Arc::new(EventSource::from_records(&scenario())),
        broadcaster,
        PlaybackParams {
            base_interval: BASE,
            speed: Speed::X1,
            autostart: false,
            command_capacity: 1,
        },
    );

    let first = tokio::spawn({
        let h = handle.clone();
        async move { h.send(Command::SetSpeed(Speed::X2)).await }
    });
    let second = tokio::spawn({
        let h = handle.clone();
        async move { h.send(Command::SetSpeed(Speed::X4)).await }
    });
    tokio::task::yield_now().await;

    let token = CancellationToken::new();
    let join = tokio::spawn(actor.run(token.clone()));
    assert!(first.await.unwrap().is_ok());
    assert!(second.await.unwrap().is_ok());

    token.cancel();
    join.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn empty_source_is_idle_and_steppable_to_nothing() {
    let mut r = rig_with(EventSource::empty(), false);

    r.handle.send(Command::Start).await.unwrap();
    let snap = r.handle.snapshot();
    assert_eq!((snap.cursor, snap.total, snap.mode), (0, 0, Mode::Stopped));
    assert_eq!(statuses(&drain(&mut r.sub)), vec!["start", "finished"]);

    let err = r.handle.send(Command::Step).await.unwrap_err();
    assert!(matches!(err, ControlError::InvalidTransition { .. }));
}

#[tokio::test(start_paused = true)]
async fn autostart_runs_without_a_command() {
    let mut r = rig_with(EventSource::from_records(&scenario()), true);
    let snap = finished(&r.handle).await;
    assert_eq!(snap.counters.total, 3);
    assert_eq!(statuses(&drain(&mut r.sub)), vec!["start", "finished"]);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_without_draining() {
    let records: Vec<Record> = (0..50).map(|i| rec(i, "Mina", "Mina", 37.0)).collect();
    let r = rig(&records);
    r.handle.send(Command::Start).await.unwrap();
    r.handle.wait_for(|s| s.cursor == 2).await.unwrap();

    r.token.cancel();
    r.join.await.unwrap();
    assert!(r.handle.status().cursor < 50);
    assert_eq!(r.handle.send(Command::Start).await, Err(ControlError::Closed));
}
