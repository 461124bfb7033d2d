//! Transport state machine tests against a mock audio context
//!
//! Time is driven by a `ManualClock`; nothing sleeps.

mod common;

use common::{audio_bytes, DeviceFactory, Harness};
use emepetre_audio::{ContextState, OutputRing};
use emepetre_playback::{EngineEvent, EventKind, PlaybackEngine, PlaybackError};
use std::sync::{Arc, Mutex};

fn time_updates(events: &[EngineEvent]) -> Vec<(f64, f64)> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::TimeUpdated { current, duration } => Some((*current, *duration)),
            _ => None,
        })
        .collect()
}

fn state_changes(events: &[EngineEvent]) -> Vec<bool> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::StateChanged { playing } => Some(*playing),
            _ => None,
        })
        .collect()
}

// ===== Transport =====

#[tokio::test]
async fn test_position_tracks_the_clock() {
    let h = Harness::new();
    let mut engine = h.engine();

    engine.load(audio_bytes(180.0)).await.unwrap();
    engine.play().unwrap();
    engine.drain_events();

    h.clock.advance(30.0);
    engine.tick();

    let updates = time_updates(&engine.drain_events());
    assert_eq!(updates.len(), 1);
    let (current, duration) = updates[0];
    assert!((current - 30.0).abs() < 0.01, "current {current}");
    assert_eq!(duration, 180.0);
}

#[tokio::test]
async fn test_play_emits_state_change_once() {
    let h = Harness::new();
    let mut engine = h.engine();
    engine.load(audio_bytes(10.0)).await.unwrap();

    engine.play().unwrap();
    engine.play().unwrap();

    assert!(engine.is_playing());
    assert_eq!(state_changes(&engine.drain_events()), vec![true]);
    assert!(engine.transport().start_clock_time.is_some());
}

#[tokio::test]
async fn test_pause_stops_position_reports() {
    let h = Harness::new();
    let mut engine = h.engine();
    engine.load(audio_bytes(60.0)).await.unwrap();
    engine.play().unwrap();
    h.clock.advance(5.0);
    engine.pause();
    engine.pause();

    let events = engine.drain_events();
    assert_eq!(state_changes(&events), vec![true, false]);
    assert!((engine.current_time() - 5.0).abs() < 1e-9);

    h.clock.advance(5.0);
    engine.tick();
    assert!(engine.drain_events().is_empty());
    assert!(engine.transport().start_clock_time.is_none());
}

#[tokio::test]
async fn test_stop_rewinds_and_reports() {
    let h = Harness::new();
    let mut engine = h.engine();
    engine.load(audio_bytes(60.0)).await.unwrap();
    engine.play().unwrap();
    h.clock.advance(12.0);
    engine.drain_events();

    engine.stop();

    let events = engine.drain_events();
    assert_eq!(
        events,
        vec![
            EngineEvent::TimeUpdated {
                current: 0.0,
                duration: 60.0
            },
            EngineEvent::StateChanged { playing: false },
        ]
    );
    assert_eq!(engine.current_time(), 0.0);
    assert!(!engine.is_playing());
}

#[tokio::test]
async fn test_seek_while_playing_keeps_playing() {
    let h = Harness::new();
    let mut engine = h.engine();
    engine.load(audio_bytes(100.0)).await.unwrap();
    engine.play().unwrap();
    h.clock.advance(10.0);
    engine.drain_events();

    engine.seek(70.0).unwrap();

    let events = engine.drain_events();
    assert_eq!(
        events,
        vec![EngineEvent::TimeUpdated {
            current: 70.0,
            duration: 100.0
        }]
    );
    assert!(engine.is_playing());

    h.clock.advance(2.0);
    assert!((engine.current_time() - 72.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_seek_is_clamped_to_track() {
    let h = Harness::new();
    let mut engine = h.engine();
    engine.load(audio_bytes(20.0)).await.unwrap();

    engine.seek(1000.0).unwrap();
    assert_eq!(engine.current_time(), 20.0);
    engine.seek(-1.0).unwrap();
    assert_eq!(engine.current_time(), 0.0);
}

// ===== End of track =====

#[tokio::test]
async fn test_natural_end_emits_ended_and_rewinds() {
    let h = Harness::new();
    let mut engine = h.engine();
    engine.load(audio_bytes(3.0)).await.unwrap();
    engine.play().unwrap();
    engine.drain_events();

    h.clock.advance(3.05);
    engine.tick();

    assert_eq!(engine.drain_events(), vec![EngineEvent::Ended]);
    assert!(!engine.is_playing());
    assert_eq!(engine.current_time(), 0.0);

    // The frame task was cancelled with playback
    h.clock.advance(1.0);
    engine.tick();
    assert!(engine.drain_events().is_empty());
}

#[tokio::test]
async fn test_device_clock_drives_playback_to_the_end() {
    let ring = Arc::new(OutputRing::new(8000, 400));
    let mut engine = PlaybackEngine::new(Arc::new(DeviceFactory::new(Arc::clone(&ring))));
    engine.load(audio_bytes(1.0)).await.unwrap();
    engine.play().unwrap();
    engine.drain_events();

    engine.tick();
    assert_eq!(ring.queued_frames(), 400);

    // The device plays 50 ms between frames
    let mut device = vec![0.0f32; 2 * 400];
    let mut ended_at = None;
    for i in 1..=30 {
        ring.fill(&mut device, 2);
        engine.tick();
        if i == 10 {
            assert!((engine.current_time() - 0.5).abs() < 1e-9);
        }
        if engine.drain_events().contains(&EngineEvent::Ended) {
            ended_at = Some(ring.seconds_played());
            break;
        }
    }

    let ended_at = ended_at.expect("track never ended");
    assert!((0.9..=1.0).contains(&ended_at), "ended at {ended_at}");
    assert_eq!(ring.underruns(), 0);
    assert!(!engine.is_playing());
}

#[tokio::test]
async fn test_early_source_end_is_not_track_end() {
    let h = Harness::new();
    let mut engine = h.engine();
    engine.load(audio_bytes(1.0)).await.unwrap();
    engine.play().unwrap();
    engine.drain_events();

    // Render the whole buffer without the clock moving: the source runs dry
    // long before the transport says the track is over
    let mut block = vec![0.0f32; 2 * 9000];
    engine.render(&mut block);
    engine.tick();

    assert!(!engine.drain_events().contains(&EngineEvent::Ended));
    assert!(engine.is_playing());
}

// ===== Deferred start =====

#[tokio::test]
async fn test_play_waits_for_context_resume() {
    let h = Harness::new();
    h.defer_resume();
    let mut engine = h.engine();
    engine.load(audio_bytes(30.0)).await.unwrap();
    engine.drain_events();

    engine.play().unwrap();
    assert!(!engine.is_playing());
    assert!(engine.is_start_pending());
    engine.tick();
    assert!(!engine.is_playing());

    h.complete_resume();
    h.clock.advance(0.2);
    engine.tick();

    assert!(engine.is_playing());
    assert_eq!(state_changes(&engine.drain_events()), vec![true]);
    assert_eq!(engine.current_time(), 0.0);
}

#[tokio::test]
async fn test_load_invalidates_deferred_start() {
    let h = Harness::new();
    h.defer_resume();
    let mut engine = h.engine();
    engine.load(audio_bytes(30.0)).await.unwrap();
    engine.play().unwrap();

    engine.load(audio_bytes(45.0)).await.unwrap();
    h.complete_resume();
    engine.tick();

    assert!(!engine.is_playing());
    assert!(!engine.is_start_pending());
    assert_eq!(engine.duration(), 45.0);
}

#[tokio::test]
async fn test_pause_and_stop_cancel_deferred_start() {
    let h = Harness::new();
    h.defer_resume();
    let mut engine = h.engine();
    engine.load(audio_bytes(30.0)).await.unwrap();

    engine.play().unwrap();
    engine.pause();
    h.complete_resume();
    engine.tick();
    assert!(!engine.is_playing());

    h.defer_resume();
    h.control.lock().unwrap().state = ContextState::Suspended;
    engine.play().unwrap();
    engine.stop();
    h.complete_resume();
    engine.tick();
    assert!(!engine.is_playing());
}

// ===== Failures =====

#[tokio::test]
async fn test_decode_failure_leaves_engine_empty() {
    let h = Harness::new();
    let mut engine = h.engine();

    let result = engine.load(b"garbage".to_vec()).await;

    assert!(matches!(result, Err(PlaybackError::Audio(_))));
    assert!(!engine.has_track());
    let events = engine.drain_events();
    assert!(matches!(events.as_slice(), [EngineEvent::Error { .. }]));
    assert!(matches!(engine.play(), Err(PlaybackError::NoTrackLoaded)));
}

#[tokio::test]
async fn test_decode_failure_keeps_previous_track() {
    let h = Harness::new();
    let mut engine = h.engine();
    engine.load(audio_bytes(42.0)).await.unwrap();

    assert!(engine.load(b"garbage".to_vec()).await.is_err());
    assert!(engine.has_track());
    assert_eq!(engine.duration(), 42.0);
}

#[tokio::test]
async fn test_initialization_failure_is_reported() {
    let h = Harness::new();
    h.fail_create();
    let mut engine = h.engine();

    let result = engine.load(audio_bytes(10.0)).await;

    assert!(matches!(result, Err(PlaybackError::Initialization(_))));
    assert!(!engine.is_initialized());
    match engine.drain_events().as_slice() {
        [EngineEvent::Error { message, cause }] => {
            assert!(message.contains("initialization"));
            assert!(cause.contains("no audio device"));
        }
        other => panic!("unexpected events {other:?}"),
    }
}

// ===== Listeners =====

#[tokio::test]
async fn test_listener_panic_does_not_break_delivery() {
    let h = Harness::new();
    let mut engine = h.engine();
    let seen = Arc::new(Mutex::new(Vec::new()));

    engine.on(EventKind::StateChanged, |_| panic!("bad listener"));
    let sink = Arc::clone(&seen);
    engine.on(EventKind::StateChanged, move |e| sink.lock().unwrap().push(e.clone()));

    engine.load(audio_bytes(10.0)).await.unwrap();
    engine.play().unwrap();
    engine.pause();

    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unsubscribe_and_clear() {
    let h = Harness::new();
    let mut engine = h.engine();
    let count = Arc::new(Mutex::new(0));

    let c = Arc::clone(&count);
    let handle = engine.on(EventKind::Loaded, move |_| *c.lock().unwrap() += 1);
    engine.load(audio_bytes(1.0)).await.unwrap();
    assert!(engine.off(handle));
    engine.load(audio_bytes(1.0)).await.unwrap();
    assert_eq!(*count.lock().unwrap(), 1);

    let c = Arc::clone(&count);
    engine.on(EventKind::Loaded, move |_| *c.lock().unwrap() += 1);
    engine.clear_listeners(EventKind::Loaded);
    engine.load(audio_bytes(1.0)).await.unwrap();
    assert_eq!(*count.lock().unwrap(), 1);
}

// ===== Teardown =====

#[tokio::test]
async fn test_destroy_is_idempotent() {
    let h = Harness::new();
    let mut engine = h.engine();
    let seen = Arc::new(Mutex::new(0));
    let s = Arc::clone(&seen);
    engine.on(EventKind::StateChanged, move |_| *s.lock().unwrap() += 1);

    engine.load(audio_bytes(10.0)).await.unwrap();
    engine.play().unwrap();
    engine.destroy();
    engine.destroy();

    assert!(!engine.is_initialized());
    assert!(!engine.has_track());
    assert!(!engine.is_playing());
    assert_eq!(h.context_state(), ContextState::Closed);
    // play + the stop forced by destroy
    assert_eq!(*seen.lock().unwrap(), 2);

    // Listeners are gone, but the engine can start over
    engine.load(audio_bytes(5.0)).await.unwrap();
    engine.play().unwrap();
    assert_eq!(*seen.lock().unwrap(), 2);
    assert!(engine.is_playing());
}

// ===== Parameters =====

#[tokio::test]
async fn test_mute_keeps_volume() {
    let h = Harness::new();
    let mut engine = h.engine();
    engine.set_volume(0.35);

    engine.set_muted(true);
    assert!(engine.is_muted());
    engine.set_muted(false);

    assert_eq!(engine.volume(), 0.35);
}

#[tokio::test]
async fn test_parameters_work_before_initialization() {
    let h = Harness::new();
    let mut engine = h.engine();

    engine.set_band_gain(3, 20.0);
    engine.set_all_bands(&[1.0, 2.0, 3.0]);
    engine.set_limiter_ratio(50.0);

    assert_eq!(engine.band_gains()[3], 12.0);
    assert_eq!(engine.limiter_settings().ratio, 20.0);
    assert!(engine.frequency_data().is_empty());
    assert!(engine.waveform_data().is_empty());
    assert_eq!(engine.limiter_reduction(), 0.0);
}
