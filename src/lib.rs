//! Head-pose driven mirror control.
//!
//! This library turns a stream of per-frame facial landmarks into a temporally
//! stable pose signal for a visual surface, and classifies the "aura" of a
//! captured frame with a remote vision model:
//! 1. A landmark source finds the primary face in each frame
//! 2. Pose extraction maps nose and eye positions to pitch, yaw, roll and proximity
//! 3. An exponential filter smooths the pose from frame to frame
//! 4. The render loop publishes a snapshot every presented frame
//! 5. The aura pipeline runs at most one remote classification at a time
//!
//! # Examples
//!
//! ## Pose extraction and smoothing
//!
//! ```
//! use specular_mirror::{
//!     constants::MIN_LANDMARKS,
//!     filters::{create_filter, PoseFilter},
//!     landmarks::{LandmarkPoint, LandmarkSet},
//!     pose::extract_pose,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut points = vec![LandmarkPoint::new(0.5, 0.5); MIN_LANDMARKS];
//! points[1] = LandmarkPoint::new(0.6, 0.5);
//! let landmarks = LandmarkSet::from_points(points)?;
//!
//! let raw = extract_pose(&landmarks);
//! let mut filter = create_filter("exponential")?;
//! let smoothed = filter.apply(&raw);
//! println!("yaw {:.3} -> {:.3}", raw.angles.yaw, smoothed.angles.yaw);
//! # Ok(())
//! # }
//! ```
//!
//! ## Mounting the control
//!
//! ```no_run
//! use specular_mirror::{
//!     aura::GeminiClassifier,
//!     camera::StillImageCamera,
//!     config::Config,
//!     control::MirrorControl,
//!     landmarks::{LandmarkSource, ReplayLandmarkSource},
//!     render_loop::IntervalFrameClock,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let classifier = Arc::new(GeminiClassifier::new(&config.classifier)?);
//! let camera = Arc::new(StillImageCamera::new("frame.png"));
//! let clock = IntervalFrameClock::new(config.tracking.refresh_rate);
//! let mut control = MirrorControl::mount(config, camera, classifier, clock)?;
//!
//! control
//!     .init_tracker(async {
//!         let source: Box<dyn LandmarkSource> = Box::new(ReplayLandmarkSource::from_file("trace.json")?);
//!         Ok(source)
//!     })
//!     .await?;
//! control.setup_camera().await?;
//!
//! if let Ok(flight) = control.press() {
//!     println!("{:?}", flight.await?);
//! }
//! control.teardown().await;
//! # Ok(())
//! # }
//! ```

/// Single-flight remote aura classification
pub mod aura;

/// Camera access seam and frame types
pub mod camera;

/// Configuration management
pub mod config;

/// Constants used throughout the library
pub mod constants;

/// Session lifecycle and component wiring
pub mod control;

/// Error types and result handling
pub mod error;

/// Temporal pose filters
pub mod filters;

/// Facial landmark types and sources
pub mod landmarks;

/// Pose extraction from landmarks
pub mod pose;

/// Per-frame tracking loop
pub mod render_loop;

/// Visual surface transforms
pub mod surface;

pub use error::{Error, Result};
