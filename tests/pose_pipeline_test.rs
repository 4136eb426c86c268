//! End-to-end tests of detection, extraction, smoothing and publication

mod test_helpers;

use parking_lot::Mutex;
use specular_mirror::{
    camera::{CameraStream, ReadyState, VideoFrame},
    filters::{create_filter, SmoothedPose},
    landmarks::LandmarkSource,
    pose::{extract_pose, RawPose},
    render_loop::{RenderLoop, StreamSlot, TrackerSlot},
    Error,
};
use std::sync::{atomic::Ordering, Arc};
use test_helpers::{centered_face, face, live_stream, test_frame, ScriptedSource};

fn render_loop_with(source: Option<ScriptedSource>, stream: Option<Arc<dyn CameraStream>>) -> RenderLoop {
    let tracker: TrackerSlot = Arc::new(Mutex::new(source.map(|s| Box::new(s) as Box<dyn LandmarkSource>)));
    let stream: StreamSlot = Arc::new(Mutex::new(stream));
    RenderLoop::new(create_filter("exponential").unwrap(), tracker, stream, Some(0.0))
}

#[test]
fn test_centered_face_converges_to_rest() {
    let raw = extract_pose(&centered_face());
    assert!(raw.angles.pitch.abs() < 1e-12);
    assert!(raw.angles.yaw.abs() < 1e-12);
    assert!(raw.angles.roll.abs() < 1e-12);
    assert!((raw.proximity - 1.0).abs() < 1e-12);

    let mut render_loop = render_loop_with(Some(ScriptedSource::constant(Some(centered_face()))), Some(live_stream()));
    let mut last = None;
    for i in 0..500 {
        last = render_loop.tick(f64::from(i) * 16.0);
    }
    let pose = last.unwrap().pose;
    assert!(pose.angles.pitch.abs() < 1e-9);
    assert!(pose.angles.yaw.abs() < 1e-9);
    assert!(pose.angles.roll.abs() < 1e-9);
    assert!((pose.proximity - 1.0).abs() < 1e-9);
}

#[test]
fn test_first_frame_yaw() {
    let turned = face((0.6, 0.5), 0.45, 0.45, 0.3);
    let mut render_loop = render_loop_with(Some(ScriptedSource::constant(Some(turned))), Some(live_stream()));

    let snapshot = render_loop.tick(16.0).unwrap();
    assert!(snapshot.face_detected);
    assert!((snapshot.diagnostics.pose.yaw - (-1.8)).abs() < 1e-9);
    assert!((snapshot.pose.angles.yaw - (-0.144)).abs() < 1e-9);
    assert!((snapshot.pose.translation.x - (-0.144 * 1.5)).abs() < 1e-9);
    assert!(snapshot.pose.translation.y.abs() < 1e-12);
}

#[test]
fn test_lost_face_decays_instead_of_snapping() {
    let turned = face((0.7, 0.5), 0.45, 0.45, 0.3);
    let mut script: Vec<_> = (0..20).map(|_| Ok(Some(turned.clone()))).collect();
    script.push(Ok(None));
    let mut render_loop = render_loop_with(Some(ScriptedSource::new(script)), Some(live_stream()));

    let mut yaw = 0.0;
    for i in 0..20 {
        yaw = render_loop.tick(f64::from(i) * 16.0).unwrap().pose.angles.yaw;
    }
    assert!(yaw < -1.0);

    let after_loss = render_loop.tick(400.0).unwrap();
    assert!(!after_loss.face_detected);
    let expected = yaw + (0.0 - yaw) * 0.08;
    assert!((after_loss.pose.angles.yaw - expected).abs() < 1e-9);
    assert!(after_loss.pose.angles.yaw < 0.0, "pose must not snap to rest");

    // Bounding box and raw angles stay at the last detected face
    assert!((after_loss.diagnostics.pose.yaw - (0.7 - 0.5) * -18.0).abs() < 1e-9);
    assert!(after_loss.diagnostics.bbox.w > 0.0);
}

#[test]
fn test_no_face_target_is_neutral_and_smoothing_advances() {
    let mut render_loop = render_loop_with(Some(ScriptedSource::constant(None)), Some(live_stream()));
    let snapshot = render_loop.tick(16.0).unwrap();
    assert!(!snapshot.face_detected);
    assert_eq!(snapshot.pose, SmoothedPose::neutral());
    assert_eq!(snapshot.frame, 1);
    assert_eq!(render_loop.tick(32.0).unwrap().frame, 2);
    assert_eq!(specular_mirror::pose::pose_target(None), RawPose::neutral());
}

#[test]
fn test_detector_failure_does_not_stop_the_loop() {
    let turned = face((0.6, 0.5), 0.45, 0.45, 0.3);
    let script = vec![Err(Error::TrackerUnavailable("gpu lost".into())), Ok(Some(turned))];
    let mut render_loop = render_loop_with(Some(ScriptedSource::new(script)), Some(live_stream()));

    let failed = render_loop.tick(16.0).unwrap();
    assert!(!failed.face_detected);
    assert_eq!(failed.pose, SmoothedPose::neutral());

    let recovered = render_loop.tick(32.0).unwrap();
    assert!(recovered.face_detected);
    assert!(recovered.pose.angles.yaw < 0.0);
}

#[test]
fn test_waits_for_tracker() {
    let mut render_loop = render_loop_with(None, Some(live_stream()));
    let rx = render_loop.subscribe();
    assert!(render_loop.tick(16.0).is_none());
    assert_eq!(rx.borrow().frame, 0);
}

struct BufferingStream;

impl CameraStream for BufferingStream {
    fn ready_state(&self) -> ReadyState {
        ReadyState::HaveMetadata
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        Some(test_frame())
    }

    fn stop(&self) {}

    fn is_live(&self) -> bool {
        true
    }
}

#[test]
fn test_skips_undecodable_frames() {
    let source = ScriptedSource::constant(Some(centered_face()));
    let calls = Arc::clone(&source.calls);
    let mut render_loop = render_loop_with(Some(source), Some(Arc::new(BufferingStream)));

    assert!(render_loop.tick(16.0).is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_fps_published_after_one_second() {
    let mut render_loop = render_loop_with(Some(ScriptedSource::constant(None)), Some(live_stream()));
    let mut fps = 0;
    for i in 1..=30 {
        fps = render_loop.tick(f64::from(i) * 1000.0 / 30.0).unwrap().diagnostics.fps;
        if i < 30 {
            assert_eq!(fps, 0);
        }
    }
    assert_eq!(fps, 30);
    assert_eq!(render_loop.diagnostics().fps, 30);
}
