//! Visual surface transforms derived from published poses.
//!
//! Everything here is a pure function of a snapshot; the surface never writes
//! back into the tracker.

use crate::{
    aura::AuraResult,
    constants::{DEFAULT_TINT, IDLE_DEPTH_PX, PRESSED_DEPTH_PX},
    control::TrackingSessionState,
    filters::SmoothedPose,
};

/// Drop shadow under the control
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowTransform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale: f64,
    pub blur_px: f64,
    pub opacity: f64,
}

/// 3D transform of the control for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceTransform {
    pub rotate_x: f64,
    pub rotate_y: f64,
    pub rotate_z: f64,
    pub scale: f64,
    pub depth_px: f64,
    /// Scale of the mirrored video layer
    pub video_scale: f64,
    pub video_blur_px: f64,
    /// Specular highlight offset in percent of the control
    pub highlight_x: f64,
    pub highlight_y: f64,
    pub shadow: ShadowTransform,
}

impl SurfaceTransform {
    #[must_use]
    pub fn from_pose(pose: &SmoothedPose, pressed: bool, camera_granted: bool) -> Self {
        let translation = pose.translation;
        Self {
            rotate_x: pose.angles.pitch,
            rotate_y: pose.angles.yaw,
            rotate_z: pose.angles.roll,
            scale: pose.proximity,
            depth_px: if pressed { PRESSED_DEPTH_PX } else { IDLE_DEPTH_PX },
            video_scale: 1.05 * pose.proximity,
            video_blur_px: if pressed { 12.0 } else { 2.0 },
            highlight_x: -pose.angles.yaw * 2.0,
            highlight_y: -pose.angles.pitch * 1.5,
            shadow: ShadowTransform {
                translate_x: -translation.x,
                translate_y: translation.y,
                scale: pose.proximity,
                blur_px: 12.0 + (translation.y / 3.0).abs(),
                opacity: if camera_granted { 0.15 * pose.proximity } else { 0.0 },
            },
        }
    }
}

/// Background tint of the control
#[must_use]
pub fn tint(aura: Option<&AuraResult>) -> String {
    aura.map_or_else(|| DEFAULT_TINT.to_string(), AuraResult::tint)
}

/// Label shown on the control
#[must_use]
pub fn status_label(state: &TrackingSessionState) -> &'static str {
    if state.model_loading {
        "Booting..."
    } else if state.analyzing {
        "Scanning..."
    } else if state.permission == crate::camera::PermissionState::Granted {
        "Reflect"
    } else {
        "Connect"
    }
}
