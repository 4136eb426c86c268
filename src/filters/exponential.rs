use super::{PoseFilter, SmoothedPose};
use crate::{
    constants::{DEFAULT_SMOOTHING_ALPHA, EPSILON},
    pose::{EulerAngles, RawPose},
    Error, Result,
};

/// Single-pole exponential smoothing of rotation and proximity.
///
/// Each frame moves the accumulator a fixed fraction `alpha` of the remaining
/// gap towards the target, so it converges monotonically and never overshoots.
pub struct ExponentialFilter {
    alpha: f64,
    current: EulerAngles,
    proximity: f64,
}

impl ExponentialFilter {
    /// Create a new exponential filter starting at the rest pose
    ///
    /// # Panics
    ///
    /// Panics if alpha is not in the range (0, 1]
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        assert!(alpha > 0.0 && alpha <= 1.0, "Alpha must be in (0, 1]");
        let rest = RawPose::neutral();
        Self {
            alpha,
            current: rest.angles,
            proximity: rest.proximity,
        }
    }

    /// Fallible constructor for user-supplied alpha values
    ///
    /// # Errors
    ///
    /// Returns an error if alpha is not in the range (0, 1]
    pub fn try_new(alpha: f64) -> Result<Self> {
        if alpha > EPSILON && alpha <= 1.0 {
            Ok(Self::new(alpha))
        } else {
            Err(Error::FilterError(format!("Alpha must be in (0, 1], got {alpha}")))
        }
    }

    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Current accumulator without advancing it
    #[must_use]
    pub fn current(&self) -> SmoothedPose {
        SmoothedPose::new(self.current, self.proximity)
    }

    fn step(&self, current: f64, target: f64) -> f64 {
        self.alpha.mul_add(target - current, current)
    }
}

impl Default for ExponentialFilter {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_ALPHA)
    }
}

impl PoseFilter for ExponentialFilter {
    fn apply(&mut self, target: &RawPose) -> SmoothedPose {
        self.current = EulerAngles {
            pitch: self.step(self.current.pitch, target.angles.pitch),
            yaw: self.step(self.current.yaw, target.angles.yaw),
            roll: self.step(self.current.roll, target.angles.roll),
        };
        self.proximity = self.step(self.proximity, target.proximity);
        self.current()
    }

    fn reset(&mut self) {
        let rest = RawPose::neutral();
        self.current = rest.angles;
        self.proximity = rest.proximity;
    }

    fn name(&self) -> &str {
        "ExponentialFilter"
    }
}
