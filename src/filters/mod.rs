//! Temporal filtering of per-frame pose targets.
//!
//! Landmark detectors jitter from frame to frame. A filter keeps the only pose
//! state that outlives a frame and turns each raw target into a render-ready
//! pose.

/// Exponential moving average filter
pub mod exponential;

use crate::{
    constants::{DEFAULT_SMOOTHING_ALPHA, TRANSLATION_GAIN},
    pose::{EulerAngles, RawPose},
    Error, Result,
};
use serde::{Deserialize, Serialize};

/// Screen-space offset that follows the smoothed rotation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub x: f64,
    pub y: f64,
}

impl Translation {
    /// Derive translation from rotation so both stay phase-locked
    #[must_use]
    pub fn from_angles(angles: &EulerAngles) -> Self {
        Self {
            x: angles.yaw * TRANSLATION_GAIN,
            y: -angles.pitch * TRANSLATION_GAIN,
        }
    }
}

/// Filtered pose published to the visual surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedPose {
    pub angles: EulerAngles,
    pub proximity: f64,
    pub translation: Translation,
}

impl SmoothedPose {
    #[must_use]
    pub fn new(angles: EulerAngles, proximity: f64) -> Self {
        Self {
            angles,
            proximity,
            translation: Translation::from_angles(&angles),
        }
    }

    /// Pose at rest
    #[must_use]
    pub fn neutral() -> Self {
        let rest = RawPose::neutral();
        Self::new(rest.angles, rest.proximity)
    }
}

impl Default for SmoothedPose {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Trait for all pose filters
pub trait PoseFilter: Send + Sync {
    /// Advance the filter one frame towards `target`
    fn apply(&mut self, target: &RawPose) -> SmoothedPose;

    /// Return to the rest pose
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

/// Pass-through filter, useful for inspecting raw detector output
pub struct NoFilter;

impl PoseFilter for NoFilter {
    fn apply(&mut self, target: &RawPose) -> SmoothedPose {
        SmoothedPose::new(target.angles, target.proximity)
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "NoFilter"
    }
}

/// Create a pose filter from a spec such as `exponential`, `exponential:0.2` or `none`
///
/// # Errors
///
/// Returns an error for unknown filter names or out-of-range parameters
pub fn create_filter(spec: &str) -> Result<Box<dyn PoseFilter>> {
    let lowered = spec.to_lowercase();
    let mut parts = lowered.split(':');
    let name = parts.next().unwrap_or_default();
    let param = parts.next();

    match name {
        "none" | "nofilter" => Ok(Box::new(NoFilter)),
        "exponential" | "ema" => {
            let alpha = match param {
                Some(raw) => raw
                    .parse::<f64>()
                    .map_err(|e| Error::FilterError(format!("Invalid alpha '{raw}': {e}")))?,
                None => DEFAULT_SMOOTHING_ALPHA,
            };
            Ok(Box::new(exponential::ExponentialFilter::try_new(alpha)?))
        }
        _ => Err(Error::FilterError(format!("Unknown filter type: {spec}"))),
    }
}
