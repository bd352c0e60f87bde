mod common;

use std::sync::atomic::Ordering;

use common::{drain_notices, next_notice, wait_state, wait_until, Harness};
use moodtunes_lib::{
    acquisition::AcquisitionMode,
    error::{Rejection, SessionError},
    models::Mood,
    playback::PreviewAction,
    session::{SessionEvent, SessionPhase, StreamStatus},
};

fn write_face_png(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("face.png");
    image::RgbImage::from_pixel(8, 8, image::Rgb([200, 150, 120]))
        .save(&path)
        .unwrap();
    path
}

#[tokio::test]
async fn upload_happy_face_recommends_jai_ho_first() {
    let harness = Harness::new("happy", 0.92);
    let dir = tempfile::tempdir().unwrap();
    let path = write_face_png(dir.path());
    let mut events = harness.session.subscribe_events();

    harness.session.select_mode(AcquisitionMode::Upload).await.unwrap();
    let state = harness.session.submit_file(&path).await.unwrap();
    assert!(state.is_analyzing);
    assert!(state.last_result.is_none());

    harness.inference.release();
    match next_notice(&mut events).await {
        SessionEvent::EmotionDetected { result, summary } => {
            assert_eq!(result.mood, Mood::Happy);
            assert_eq!(summary, "We detected happy with 92.0% confidence");
        }
        other => panic!("unexpected notice {:?}", other),
    }

    let snapshot = harness.session.snapshot().await;
    assert_eq!(snapshot.phase, SessionPhase::Resulted);
    assert_eq!(snapshot.recommendations[0].title, "Jai Ho");
    assert_eq!(snapshot.recommendations[0].artist, "A.R. Rahman");
}

#[tokio::test]
async fn second_submission_while_analyzing_is_rejected() {
    let harness = Harness::new("sad", 0.8);
    let image = moodtunes_lib::acquisition::ImagePayload::new(vec![1; 8], 1, 1, "png");
    harness.session.select_mode(AcquisitionMode::Upload).await.unwrap();

    harness.session.submit_image(image.clone()).await.unwrap();
    let second = harness.session.submit_image(image.clone()).await;
    assert!(matches!(
        second,
        Err(SessionError::Rejected(Rejection::AnalysisInFlight))
    ));

    let inference = harness.inference.clone();
    wait_until(|| inference.calls() == 1).await;
    harness.inference.release();

    let mut state_rx = harness.session.subscribe_state();
    wait_state(&mut state_rx, |s| !s.is_analyzing).await;

    // A fresh analysis is accepted once the first has settled.
    harness.session.submit_image(image).await.unwrap();
    harness.inference.release();
    wait_state(&mut state_rx, |s| !s.is_analyzing && s.last_result.is_some()).await;

    assert_eq!(harness.inference.calls(), 2);
    assert_eq!(harness.inference.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn result_arriving_after_mode_switch_is_discarded() {
    let harness = Harness::new("angry", 0.95);
    let image = moodtunes_lib::acquisition::ImagePayload::new(vec![1; 8], 1, 1, "png");
    let mut events = harness.session.subscribe_events();
    let mut state_rx = harness.session.subscribe_state();

    harness.session.select_mode(AcquisitionMode::Upload).await.unwrap();
    harness.session.submit_image(image).await.unwrap();
    let inference = harness.inference.clone();
    wait_until(|| inference.calls() == 1).await;

    let switched = harness.session.select_mode(AcquisitionMode::Camera).await.unwrap();
    assert_eq!(switched.stream, StreamStatus::Live);
    assert!(switched.is_analyzing);

    // Only the stale settlement may clear the flag.
    let err = harness.session.capture_and_analyze().await.unwrap_err();
    assert!(matches!(err, SessionError::Rejected(Rejection::AnalysisInFlight)));

    harness.inference.release();
    let settled = wait_state(&mut state_rx, |s| !s.is_analyzing).await;
    assert!(settled.last_result.is_none());
    assert_eq!(settled.mode, AcquisitionMode::Camera);

    assert!(drain_notices(&mut events)
        .iter()
        .all(|e| !matches!(e, SessionEvent::EmotionDetected { .. })));
    assert_eq!(harness.session.recommendations().await[0].title, "Vande Mataram");
}

#[tokio::test]
async fn repeated_reload_leaves_exactly_one_stream() {
    let harness = Harness::new("neutral", 0.75);
    harness.session.select_mode(AcquisitionMode::Camera).await.unwrap();

    for _ in 0..3 {
        let state = harness.session.reload_camera().await.unwrap();
        assert_eq!(state.stream, StreamStatus::Live);
    }
    assert_eq!(harness.camera.live_streams(), 1);
    assert_eq!(harness.camera.opened.load(Ordering::SeqCst), 4);

    harness.session.select_mode(AcquisitionMode::Upload).await.unwrap();
    assert_eq!(harness.camera.live_streams(), 0);
}

#[tokio::test]
async fn denied_camera_stays_in_mode_with_prompt() {
    let harness = Harness::new("happy", 0.9);
    harness.camera.deny.store(true, Ordering::SeqCst);
    let mut events = harness.session.subscribe_events();

    let state = harness.session.select_mode(AcquisitionMode::Camera).await.unwrap();
    assert_eq!(state.mode, AcquisitionMode::Camera);
    assert_eq!(state.stream, StreamStatus::Inactive);
    assert_eq!(
        state.last_error.as_deref(),
        Some("Camera access denied. Please allow camera permissions.")
    );
    assert!(matches!(
        next_notice(&mut events).await,
        SessionEvent::AcquisitionFailed { .. }
    ));

    let err = harness.session.capture_and_analyze().await.unwrap_err();
    assert!(matches!(err, SessionError::Rejected(Rejection::StreamNotLive)));

    harness.camera.deny.store(false, Ordering::SeqCst);
    let state = harness.session.start_camera().await.unwrap();
    assert_eq!(state.stream, StreamStatus::Live);
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn capture_on_a_dead_stream_marks_camera_inactive() {
    let harness = Harness::new("happy", 0.9);
    let mut state_rx = harness.session.subscribe_state();
    let state = harness.session.select_mode(AcquisitionMode::Camera).await.unwrap();
    assert_eq!(state.stream, StreamStatus::Live);

    harness.camera.unplugged.store(true, Ordering::SeqCst);
    harness.session.capture_and_analyze().await.unwrap();

    let settled = wait_state(&mut state_rx, |s| !s.is_analyzing).await;
    assert_eq!(settled.stream, StreamStatus::Inactive);
    assert_eq!(
        settled.last_error.as_deref(),
        Some("No camera available. Check that a camera is connected and not in use.")
    );
    assert_eq!(harness.camera.live_streams(), 0);
    assert_eq!(harness.inference.calls(), 0);

    let err = harness.session.capture_and_analyze().await.unwrap_err();
    assert!(matches!(err, SessionError::Rejected(Rejection::StreamNotLive)));

    harness.camera.unplugged.store(false, Ordering::SeqCst);
    let state = harness.session.reload_camera().await.unwrap();
    assert_eq!(state.stream, StreamStatus::Live);
    assert_eq!(harness.camera.live_streams(), 1);
}

#[tokio::test]
async fn camera_capture_flow_and_stop() {
    let harness = Harness::new("surprised", 0.81);
    let mut state_rx = harness.session.subscribe_state();
    harness.session.select_mode(AcquisitionMode::Camera).await.unwrap();

    harness.session.capture_and_analyze().await.unwrap();
    harness.inference.release();
    let state = wait_state(&mut state_rx, |s| s.last_result.is_some()).await;
    assert_eq!(state.last_result.map(|r| r.mood), Some(Mood::Surprised));

    let state = harness.session.stop_camera().await.unwrap();
    assert_eq!(state.stream, StreamStatus::Inactive);
    assert_eq!(harness.camera.live_streams(), 0);

    harness.session.deselect_mode().await.unwrap();
    assert_eq!(harness.session.snapshot().await.phase, SessionPhase::Idle);
}

#[tokio::test]
async fn preview_switch_stops_previous_before_loading_next() {
    let harness = Harness::new("happy", 0.9);
    let mut state_rx = harness.session.subscribe_state();
    harness.session.select_mode(AcquisitionMode::Upload).await.unwrap();
    harness
        .session
        .submit_image(moodtunes_lib::acquisition::ImagePayload::new(vec![1], 1, 1, "png"))
        .await
        .unwrap();
    harness.inference.release();
    wait_state(&mut state_rx, |s| s.last_result.is_some()).await;

    let tracks = harness.session.recommendations().await;
    let (a, b) = (tracks[0].id.clone(), tracks[1].id.clone());
    let mut playback_rx = harness.session.playback().subscribe();

    assert_eq!(harness.session.select_preview(&a).await.unwrap(), PreviewAction::Starting);
    tokio::time::timeout(common::WAIT, playback_rx.wait_for(|p| p.is_sounding))
        .await
        .unwrap()
        .unwrap();

    harness.session.select_preview(&b).await.unwrap();
    tokio::time::timeout(
        common::WAIT,
        playback_rx.wait_for(|p| p.is_sounding && p.active_track_id.as_deref() == Some(b.as_str())),
    )
    .await
    .unwrap()
    .unwrap();

    let calls = harness.output.calls();
    let stop_at = calls.iter().position(|c| c == "stop").unwrap();
    let load_b = calls.iter().position(|c| *c == format!("load:{b}")).unwrap();
    assert!(stop_at < load_b, "calls were {:?}", calls);

    assert_eq!(harness.session.select_preview(&b).await.unwrap(), PreviewAction::Paused);
    let paused = harness.session.playback().state().await;
    assert_eq!(paused.active_track_id.as_deref(), Some(b.as_str()));
    assert!(!paused.is_sounding);

    harness.session.open_external(&b).await.unwrap();
    assert_eq!(harness.opener.opened.lock().unwrap().len(), 1);
    assert_eq!(harness.session.playback().state().await, paused);
}
