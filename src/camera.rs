//! Camera access seam and frame types.

use crate::{
    constants::{CAMERA_HEIGHT, CAMERA_WIDTH},
    Error, Result,
};
use async_trait::async_trait;
use image::RgbImage;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// Outcome of the most recent camera access request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PermissionState {
    /// No request has settled yet
    #[default]
    Unknown,
    Granted,
    Denied,
}

/// Which camera to open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

/// Constraints passed to the camera on every access request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConstraints {
    pub width: u32,
    pub height: u32,
    pub facing: FacingMode,
    pub audio: bool,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            width: CAMERA_WIDTH,
            height: CAMERA_HEIGHT,
            facing: FacingMode::User,
            audio: false,
        }
    }
}

/// How much media data the stream has buffered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

impl ReadyState {
    /// Whether a frame can be presented at this level
    #[must_use]
    pub fn is_decodable(self) -> bool {
        self >= Self::HaveCurrentData
    }
}

/// One decoded video frame at native resolution
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub image: Arc<RgbImage>,
}

impl VideoFrame {
    #[must_use]
    pub fn new(image: RgbImage) -> Self {
        Self { image: Arc::new(image) }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// A live camera stream shared read-only between consumers
pub trait CameraStream: Send + Sync {
    fn ready_state(&self) -> ReadyState;

    /// Latest frame, if any
    fn current_frame(&self) -> Option<VideoFrame>;

    /// Stop every track of the stream
    fn stop(&self);

    fn is_live(&self) -> bool;
}

/// Grants camera streams
#[async_trait]
pub trait CameraAccess: Send + Sync {
    /// Ask for a stream matching `constraints`
    ///
    /// # Errors
    ///
    /// Returns `Error::PermissionDenied` when the user refuses access and
    /// `Error::Camera` for every other failure
    async fn request_access(&self, constraints: &CameraConstraints) -> Result<Arc<dyn CameraStream>>;
}

/// Stream that presents the same still image on every frame
pub struct StillImageStream {
    frame: Mutex<Option<VideoFrame>>,
    live: AtomicBool,
}

impl StillImageStream {
    #[must_use]
    pub fn new(image: RgbImage) -> Self {
        Self {
            frame: Mutex::new(Some(VideoFrame::new(image))),
            live: AtomicBool::new(true),
        }
    }
}

impl CameraStream for StillImageStream {
    fn ready_state(&self) -> ReadyState {
        if self.is_live() {
            ReadyState::HaveEnoughData
        } else {
            ReadyState::HaveNothing
        }
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        if !self.is_live() {
            return None;
        }
        self.frame.lock().clone()
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
        self.frame.lock().take();
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// Camera that serves an image file, resized to the requested constraints
pub struct StillImageCamera {
    path: PathBuf,
}

impl StillImageCamera {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl CameraAccess for StillImageCamera {
    async fn request_access(&self, constraints: &CameraConstraints) -> Result<Arc<dyn CameraStream>> {
        log::info!(
            "Opening still image camera {} at {}x{}",
            self.path.display(),
            constraints.width,
            constraints.height
        );
        let path = self.path.clone();
        let (width, height) = (constraints.width, constraints.height);
        let image = tokio::task::spawn_blocking(move || -> Result<RgbImage> {
            let decoded = image::open(&path)?.to_rgb8();
            Ok(image::imageops::resize(
                &decoded,
                width,
                height,
                image::imageops::FilterType::Triangle,
            ))
        })
        .await
        .map_err(|e| Error::Camera(e.to_string()))?
        .map_err(|e| match e {
            Error::Io(io) if io.kind() == std::io::ErrorKind::PermissionDenied => Error::PermissionDenied,
            Error::Image(image::ImageError::IoError(io)) if io.kind() == std::io::ErrorKind::PermissionDenied => {
                Error::PermissionDenied
            }
            other => Error::Camera(other.to_string()),
        })?;
        Ok(Arc::new(StillImageStream::new(image)))
    }
}
