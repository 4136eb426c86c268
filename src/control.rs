//! The mounted mirror control: session lifecycle and wiring between the
//! camera, the landmark tracker, the render loop and the aura pipeline.

use crate::{
    aura::{AuraOutcome, AuraPipeline, AuraResult, RejectReason, RemoteClassifier},
    camera::{CameraAccess, PermissionState},
    config::Config,
    landmarks::LandmarkSource,
    render_loop::{FrameClock, PoseSnapshot, RenderLoop, StreamSlot, TrackerSlot},
    surface::SurfaceTransform,
    Error, Result,
};
use log::{error, info};
use parking_lot::Mutex;
use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};
use tokio::{sync::watch, task::JoinHandle};

/// Lifecycle flags of the mounted control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingSessionState {
    /// True until the landmark tracker has initialized
    pub model_loading: bool,
    pub permission: PermissionState,
    /// True while an aura request is in flight
    pub analyzing: bool,
    /// Short user-visible status, empty when there is nothing to report
    pub status: String,
}

impl Default for TrackingSessionState {
    fn default() -> Self {
        Self {
            model_loading: true,
            permission: PermissionState::Unknown,
            analyzing: false,
            status: String::new(),
        }
    }
}

/// Mounted mirror control
pub struct MirrorControl {
    config: Config,
    camera: Arc<dyn CameraAccess>,
    state: Arc<Mutex<TrackingSessionState>>,
    tracker: TrackerSlot,
    stream: StreamSlot,
    aura: AuraPipeline,
    poses: watch::Receiver<PoseSnapshot>,
    shutdown: watch::Sender<bool>,
    render_task: Option<JoinHandle<()>>,
    last_trigger: AtomicU64,
    pressed: AtomicBool,
}

impl MirrorControl {
    /// Mount the control and start its render loop on the current tokio runtime
    ///
    /// # Errors
    ///
    /// Returns an error if the configured filter cannot be created
    pub fn mount<C>(
        config: Config,
        camera: Arc<dyn CameraAccess>,
        classifier: Arc<dyn RemoteClassifier>,
        clock: C,
    ) -> Result<Self>
    where
        C: FrameClock + 'static,
    {
        let tracker: TrackerSlot = Arc::new(Mutex::new(None));
        let stream: StreamSlot = Arc::new(Mutex::new(None));

        let render_loop = RenderLoop::new(config.create_filter()?, Arc::clone(&tracker), Arc::clone(&stream), None);
        let poses = render_loop.subscribe();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let render_task = tokio::spawn(render_loop.run(clock, shutdown_rx));

        let aura = AuraPipeline::from_config(classifier, &config.classifier);
        info!("Mirror control mounted");

        Ok(Self {
            config,
            camera,
            state: Arc::new(Mutex::new(TrackingSessionState::default())),
            tracker,
            stream,
            aura,
            poses,
            shutdown,
            render_task: Some(render_task),
            last_trigger: AtomicU64::new(0),
            pressed: AtomicBool::new(false),
        })
    }

    /// Wait for the landmark tracker to initialize and hand it to the render loop
    ///
    /// # Errors
    ///
    /// Returns `Error::TrackerUnavailable` if initialization fails; the control
    /// stays usable without pose tracking
    pub async fn init_tracker<F>(&self, init: F) -> Result<()>
    where
        F: Future<Output = Result<Box<dyn LandmarkSource>>>,
    {
        match init.await {
            Ok(source) => {
                info!("Landmark tracker ready: {}", source.name());
                *self.tracker.lock() = Some(source);
                self.state.lock().model_loading = false;
                Ok(())
            }
            Err(e) => {
                let e = match e {
                    Error::TrackerUnavailable(_) => e,
                    other => Error::TrackerUnavailable(other.to_string()),
                };
                error!("{}", e);
                self.state.lock().status = e.status_text().to_string();
                Err(e)
            }
        }
    }

    /// Request camera access with the configured constraints
    ///
    /// # Errors
    ///
    /// Returns `Error::PermissionDenied` or `Error::Camera`; both are also
    /// reflected in the session state
    pub async fn setup_camera(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.status.clear();
            state.permission = PermissionState::Unknown;
        }
        if let Some(previous) = self.stream.lock().take() {
            previous.stop();
        }

        match self.camera.request_access(&self.config.camera.constraints()).await {
            Ok(stream) => {
                info!("Camera access granted");
                *self.stream.lock() = Some(stream);
                self.state.lock().permission = PermissionState::Granted;
                Ok(())
            }
            Err(e) => {
                error!("Camera access failed: {}", e);
                let mut state = self.state.lock();
                state.permission = PermissionState::Denied;
                state.status = e.status_text().to_string();
                Err(e)
            }
        }
    }

    /// React to the host's camera trigger counter; a new positive value re-requests access
    ///
    /// # Errors
    ///
    /// Propagates camera access failures
    pub async fn on_external_trigger(&self, counter: u64) -> Result<()> {
        let previous = self.last_trigger.swap(counter, Ordering::SeqCst);
        if counter > 0 && counter != previous {
            info!("External camera trigger {}", counter);
            self.setup_camera().await
        } else {
            Ok(())
        }
    }

    /// Press the control: starts an aura analysis unless one is running or no camera is live
    ///
    /// # Errors
    ///
    /// Returns why no analysis was started
    pub fn press(&self) -> std::result::Result<JoinHandle<AuraOutcome>, RejectReason> {
        self.pressed.store(true, Ordering::SeqCst);
        let stream = if self.permission() == PermissionState::Granted {
            self.stream.lock().clone()
        } else {
            None
        };
        let (guard, stream) = self.aura.begin(stream)?;
        let aura = self.aura.clone();
        Ok(tokio::spawn(async move { aura.complete(guard, stream).await }))
    }

    pub fn release(&self) {
        self.pressed.store(false, Ordering::SeqCst);
    }

    /// Click the control: retries camera access after a denial
    ///
    /// # Errors
    ///
    /// Propagates camera access failures
    pub async fn click(&self) -> Result<()> {
        if self.permission() == PermissionState::Denied {
            self.setup_camera().await
        } else {
            Ok(())
        }
    }

    #[must_use]
    pub fn permission(&self) -> PermissionState {
        self.state.lock().permission
    }

    #[must_use]
    pub fn session_state(&self) -> TrackingSessionState {
        let mut state = self.state.lock().clone();
        state.analyzing = self.aura.is_analyzing() && !self.aura.is_detached();
        state
    }

    #[must_use]
    pub fn subscribe_poses(&self) -> watch::Receiver<PoseSnapshot> {
        self.poses.clone()
    }

    #[must_use]
    pub fn subscribe_aura(&self) -> watch::Receiver<Option<AuraResult>> {
        self.aura.subscribe()
    }

    #[must_use]
    pub fn latest_aura(&self) -> Option<AuraResult> {
        self.aura.latest()
    }

    /// Transform of the visual surface for the latest published pose
    #[must_use]
    pub fn surface_transform(&self) -> SurfaceTransform {
        let pose = self.poses.borrow().pose;
        SurfaceTransform::from_pose(
            &pose,
            self.pressed.load(Ordering::SeqCst),
            self.permission() == PermissionState::Granted,
        )
    }

    /// Stop the render loop, the camera and the tracker, and reset the session
    ///
    /// An aura request still in flight settles without publishing.
    pub async fn teardown(&mut self) {
        self.aura.detach();
        self.shutdown.send_replace(true);
        if let Some(task) = self.render_task.take() {
            if let Err(e) = task.await {
                error!("Render loop task failed: {}", e);
            }
        }
        self.release_resources();
        *self.state.lock() = TrackingSessionState::default();
        self.last_trigger.store(0, Ordering::SeqCst);
        self.pressed.store(false, Ordering::SeqCst);
        info!("Mirror control torn down");
    }

    fn release_resources(&self) {
        if let Some(stream) = self.stream.lock().take() {
            stream.stop();
        }
        if let Some(mut tracker) = self.tracker.lock().take() {
            tracker.release();
        }
    }
}

impl Drop for MirrorControl {
    fn drop(&mut self) {
        self.aura.detach();
        self.shutdown.send_replace(true);
        if let Some(task) = self.render_task.take() {
            task.abort();
        }
        self.release_resources();
    }
}
