//! Per-frame tracking loop.
//!
//! Every presented frame runs, in order: FPS bookkeeping, landmark detection,
//! pose extraction, smoothing, and publication of a fresh snapshot. The loop
//! owns the smoothing filter outright; observers only ever see copies.

use crate::{
    camera::CameraStream,
    constants::FPS_WINDOW_MS,
    filters::{PoseFilter, SmoothedPose},
    landmarks::LandmarkSource,
    pose::{pose_target, BoundingBox, EulerAngles},
};
use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    sync::watch,
    time::{Interval, MissedTickBehavior},
};

/// Slot filled once the landmark detector finishes initializing
pub type TrackerSlot = Arc<Mutex<Option<Box<dyn LandmarkSource>>>>;

/// Slot holding the current camera stream, if access was granted
pub type StreamSlot = Arc<Mutex<Option<Arc<dyn CameraStream>>>>;

/// Frames-per-second over a one second aggregation window
#[derive(Debug, Clone)]
pub struct FpsCounter {
    last_checkpoint_ms: Option<f64>,
    frames: u32,
}

impl FpsCounter {
    /// Counter whose first window opens at `start_ms`, or at the first recorded frame when `None`
    #[must_use]
    pub fn new(start_ms: Option<f64>) -> Self {
        Self {
            last_checkpoint_ms: start_ms,
            frames: 0,
        }
    }

    /// Count one frame; returns the frame count once a full window has elapsed
    pub fn record(&mut self, now_ms: f64) -> Option<u32> {
        let Some(checkpoint) = self.last_checkpoint_ms else {
            self.last_checkpoint_ms = Some(now_ms);
            return None;
        };
        self.frames += 1;
        if now_ms - checkpoint >= FPS_WINDOW_MS {
            let fps = self.frames;
            self.frames = 0;
            self.last_checkpoint_ms = Some(now_ms);
            Some(fps)
        } else {
            None
        }
    }
}

/// Values shown by the debug overlay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostics {
    pub fps: u32,
    /// Bounding box of the last frame that contained a face
    pub bbox: BoundingBox,
    /// Raw angles of the last frame that contained a face
    pub pose: EulerAngles,
    pub proximity: f64,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            fps: 0,
            bbox: BoundingBox::default(),
            pose: EulerAngles::default(),
            proximity: 1.0,
        }
    }
}

/// Immutable per-frame publication
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSnapshot {
    pub frame: u64,
    pub pose: SmoothedPose,
    pub face_detected: bool,
    pub diagnostics: Diagnostics,
}

impl Default for PoseSnapshot {
    fn default() -> Self {
        Self {
            frame: 0,
            pose: SmoothedPose::neutral(),
            face_detected: false,
            diagnostics: Diagnostics::default(),
        }
    }
}

/// Frame-presentation service driving the loop
#[async_trait]
pub trait FrameClock: Send {
    /// Wait for the next frame and return its timestamp in milliseconds
    async fn next_frame(&mut self) -> f64;
}

/// Frame clock ticking at a fixed display refresh rate
pub struct IntervalFrameClock {
    interval: Interval,
    origin: Instant,
}

impl IntervalFrameClock {
    #[must_use]
    pub fn new(refresh_rate: u32) -> Self {
        let period = Duration::from_secs_f64(1.0 / f64::from(refresh_rate.max(1)));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval,
            origin: Instant::now(),
        }
    }
}

#[async_trait]
impl FrameClock for IntervalFrameClock {
    async fn next_frame(&mut self) -> f64 {
        self.interval.tick().await;
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Render-loop driver
pub struct RenderLoop {
    filter: Box<dyn PoseFilter>,
    fps: FpsCounter,
    diagnostics: Diagnostics,
    tracker: TrackerSlot,
    stream: StreamSlot,
    publisher: watch::Sender<PoseSnapshot>,
    frame: u64,
}

impl RenderLoop {
    /// Create a loop owning `filter`, reading from the shared tracker and stream slots
    ///
    /// The FPS window opens at `start_ms`, or at the first presented frame when `None`.
    #[must_use]
    pub fn new(filter: Box<dyn PoseFilter>, tracker: TrackerSlot, stream: StreamSlot, start_ms: Option<f64>) -> Self {
        let (publisher, _) = watch::channel(PoseSnapshot::default());
        Self {
            filter,
            fps: FpsCounter::new(start_ms),
            diagnostics: Diagnostics::default(),
            tracker,
            stream,
            publisher,
            frame: 0,
        }
    }

    /// Receive every snapshot published from now on
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PoseSnapshot> {
        self.publisher.subscribe()
    }

    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    /// Process one frame presented at `now_ms`
    ///
    /// Returns the published snapshot, or `None` when the tracker or the video
    /// frame was not ready and only FPS bookkeeping ran.
    pub fn tick(&mut self, now_ms: f64) -> Option<PoseSnapshot> {
        self.frame += 1;

        if let Some(fps) = self.fps.record(now_ms) {
            self.diagnostics.fps = fps;
            self.publisher.send_modify(|snapshot| snapshot.diagnostics.fps = fps);
        }

        let stream = self.stream.lock().clone()?;
        if !stream.ready_state().is_decodable() {
            return None;
        }
        let frame = stream.current_frame()?;

        let detection = {
            let mut tracker = self.tracker.lock();
            let tracker = tracker.as_mut()?;
            match tracker.detect(&frame, now_ms) {
                Ok(detection) => detection,
                Err(e) => {
                    warn!("Landmark detection failed on frame {}: {}", self.frame, e);
                    None
                }
            }
        };

        let target = pose_target(detection.as_ref());
        if detection.is_some() {
            self.diagnostics.bbox = target.bbox;
            self.diagnostics.pose = target.angles;
        }

        let pose = self.filter.apply(&target);
        self.diagnostics.proximity = pose.proximity;

        let snapshot = PoseSnapshot {
            frame: self.frame,
            pose,
            face_detected: detection.is_some(),
            diagnostics: self.diagnostics,
        };
        debug!(
            "frame {} pitch={:.2} yaw={:.2} roll={:.2} scale={:.3} fps={}",
            snapshot.frame,
            pose.angles.pitch,
            pose.angles.yaw,
            pose.angles.roll,
            pose.proximity,
            self.diagnostics.fps
        );
        self.publisher.send_replace(snapshot);
        Some(snapshot)
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped
    pub async fn run<C: FrameClock>(mut self, mut clock: C, mut shutdown: watch::Receiver<bool>) {
        info!("Render loop started with {} filter", self.filter.name());
        while !*shutdown.borrow() {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                now = clock.next_frame() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    self.tick(now);
                }
            }
        }
        info!("Render loop stopped after {} frames", self.frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_window() {
        let mut counter = FpsCounter::new(Some(0.0));
        let mut published = None;
        for i in 1..=30 {
            published = counter.record(f64::from(i) * 1000.0 / 30.0);
            if i < 30 {
                assert!(published.is_none());
            }
        }
        assert_eq!(published, Some(30));
    }

    #[test]
    fn test_fps_resets_after_publish() {
        let mut counter = FpsCounter::new(Some(0.0));
        assert_eq!(counter.record(1000.0), Some(1));
        assert_eq!(counter.record(1500.0), None);
        assert_eq!(counter.record(2000.0), Some(2));
    }

    #[test]
    fn test_tick_without_stream_only_counts() {
        let tracker: TrackerSlot = Arc::new(Mutex::new(None));
        let stream: StreamSlot = Arc::new(Mutex::new(None));
        let mut render_loop = RenderLoop::new(crate::filters::create_filter("exponential").unwrap(), tracker, stream, Some(0.0));
        let rx = render_loop.subscribe();

        assert!(render_loop.tick(500.0).is_none());
        assert!(render_loop.tick(1000.0).is_none());
        assert_eq!(rx.borrow().diagnostics.fps, 2);
        assert_eq!(rx.borrow().pose, SmoothedPose::neutral());
    }

    #[test]
    fn test_fps_window_opens_at_first_frame() {
        let mut counter = FpsCounter::new(None);
        assert_eq!(counter.record(86_400_000.0), None);
        for i in 1..30 {
            assert_eq!(counter.record(86_400_000.0 + f64::from(i) * 1000.0 / 30.0), None);
        }
        assert_eq!(counter.record(86_401_000.0), Some(30));
    }
}
