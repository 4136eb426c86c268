//! Helper functions and utilities for tests

#![allow(dead_code)]

use async_trait::async_trait;
use image::RgbImage;
use parking_lot::Mutex;
use specular_mirror::{
    aura::{ClassificationRequest, RemoteClassifier},
    camera::{CameraAccess, CameraConstraints, CameraStream, StillImageStream, VideoFrame},
    constants::{LEFT_EYE, MIN_LANDMARKS, NOSE_TIP, RIGHT_EYE},
    landmarks::{LandmarkPoint, LandmarkSet, LandmarkSource},
    render_loop::FrameClock,
    Error, Result,
};
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::sync::{mpsc, Notify};

/// Build a face whose nose, eyes and horizontal extent are set explicitly
pub fn face(nose: (f64, f64), left_eye_y: f64, right_eye_y: f64, face_width: f64) -> LandmarkSet {
    let left = 0.5 - face_width / 2.0;
    let mut points = vec![LandmarkPoint::new(0.5, 0.5); MIN_LANDMARKS];
    points[0] = LandmarkPoint::new(left, 0.45);
    points[2] = LandmarkPoint::new(left + face_width, 0.55);
    points[NOSE_TIP] = LandmarkPoint::new(nose.0, nose.1);
    points[LEFT_EYE] = LandmarkPoint::new(0.45, left_eye_y);
    points[RIGHT_EYE] = LandmarkPoint::new(0.55, right_eye_y);
    LandmarkSet::from_points(points).expect("face has enough landmarks")
}

/// A face looking straight at the camera from the reference distance
pub fn centered_face() -> LandmarkSet {
    face((0.5, 0.5), 0.45, 0.45, 0.3)
}

pub fn test_frame() -> VideoFrame {
    VideoFrame::new(RgbImage::from_pixel(64, 48, image::Rgb([90, 140, 200])))
}

pub fn live_stream() -> Arc<dyn CameraStream> {
    Arc::new(StillImageStream::new(RgbImage::from_pixel(64, 48, image::Rgb([90, 140, 200]))))
}

/// Landmark source returning scripted detections, then the last one forever
pub struct ScriptedSource {
    script: VecDeque<Result<Option<LandmarkSet>>>,
    last: Option<LandmarkSet>,
    pub released: Arc<AtomicBool>,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<Option<LandmarkSet>>>) -> Self {
        Self {
            script: script.into(),
            last: None,
            released: Arc::new(AtomicBool::new(false)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn constant(face: Option<LandmarkSet>) -> Self {
        Self::new(vec![Ok(face)])
    }
}

impl LandmarkSource for ScriptedSource {
    fn detect(&mut self, _frame: &VideoFrame, _timestamp_ms: f64) -> Result<Option<LandmarkSet>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.pop_front() {
            Some(Ok(detection)) => {
                self.last = detection.clone();
                Ok(detection)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last.clone()),
        }
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "ScriptedSource"
    }
}

/// Frame clock yielding fixed timestamps, then never again
pub struct ScriptedClock {
    timestamps: VecDeque<f64>,
}

impl ScriptedClock {
    pub fn new(timestamps: impl IntoIterator<Item = f64>) -> Self {
        Self {
            timestamps: timestamps.into_iter().collect(),
        }
    }

    /// `count` frames spaced evenly at `rate` frames per second
    pub fn at_rate(count: u32, rate: f64) -> Self {
        Self::new((1..=count).map(|i| f64::from(i) * 1000.0 / rate))
    }
}

#[async_trait]
impl FrameClock for ScriptedClock {
    async fn next_frame(&mut self) -> f64 {
        match self.timestamps.pop_front() {
            Some(ts) => {
                tokio::task::yield_now().await;
                ts
            }
            None => std::future::pending().await,
        }
    }
}

/// Frame clock fed by hand through a channel
pub struct ChannelClock {
    frames: mpsc::UnboundedReceiver<f64>,
}

impl ChannelClock {
    pub fn new() -> (mpsc::UnboundedSender<f64>, Self) {
        let (tx, frames) = mpsc::unbounded_channel();
        (tx, Self { frames })
    }
}

#[async_trait]
impl FrameClock for ChannelClock {
    async fn next_frame(&mut self) -> f64 {
        match self.frames.recv().await {
            Some(ts) => ts,
            None => std::future::pending().await,
        }
    }
}

/// How a mock camera answers access requests
#[derive(Clone, Copy)]
pub enum CameraBehavior {
    Grant,
    Deny,
    Fail,
}

pub struct MockCamera {
    behavior: Mutex<CameraBehavior>,
    pub requests: AtomicUsize,
    pub last_constraints: Mutex<Option<CameraConstraints>>,
    pub streams: Mutex<Vec<Arc<dyn CameraStream>>>,
}

impl MockCamera {
    pub fn new(behavior: CameraBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            requests: AtomicUsize::new(0),
            last_constraints: Mutex::new(None),
            streams: Mutex::new(Vec::new()),
        }
    }

    pub fn set_behavior(&self, behavior: CameraBehavior) {
        *self.behavior.lock() = behavior;
    }
}

#[async_trait]
impl CameraAccess for MockCamera {
    async fn request_access(&self, constraints: &CameraConstraints) -> Result<Arc<dyn CameraStream>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.last_constraints.lock() = Some(constraints.clone());
        let behavior = *self.behavior.lock();
        match behavior {
            CameraBehavior::Grant => {
                let stream = live_stream();
                self.streams.lock().push(Arc::clone(&stream));
                Ok(stream)
            }
            CameraBehavior::Deny => Err(Error::PermissionDenied),
            CameraBehavior::Fail => Err(Error::Camera("device busy".to_string())),
        }
    }
}

/// Classifier answering from a queue; can be held open until released
pub struct MockClassifier {
    responses: Mutex<VecDeque<Result<String>>>,
    gate: Option<Arc<Notify>>,
    pub calls: AtomicUsize,
    pub last_request: Mutex<Option<ClassificationRequest>>,
}

impl MockClassifier {
    pub fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            gate: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Every request waits for `gate.notify_one()` before answering
    pub fn gated(responses: Vec<Result<String>>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(responses)
        }
    }

    pub fn answering(json: &str) -> Self {
        Self::new(vec![Ok(json.to_string())])
    }
}

#[async_trait]
impl RemoteClassifier for MockClassifier {
    async fn classify(&self, request: ClassificationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock() = Some(request);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Classifier("no scripted response".to_string())))
    }
}
