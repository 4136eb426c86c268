//! Pose extraction from a single landmark set.

use crate::{
    constants::{
        IMAGE_CENTER, LEFT_EYE, NEUTRAL_PROXIMITY, NOSE_TIP, PITCH_GAIN, PROXIMITY_GAIN, PROXIMITY_MAX, PROXIMITY_MIN,
        REFERENCE_FACE_WIDTH, RIGHT_EYE, ROLL_GAIN, YAW_GAIN,
    },
    landmarks::LandmarkSet,
};
use serde::{Deserialize, Serialize};

/// Axis-aligned box in normalized image coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Head orientation in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EulerAngles {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// Unfiltered pose of one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPose {
    pub angles: EulerAngles,
    /// Target scale factor derived from apparent face width
    pub proximity: f64,
    pub bbox: BoundingBox,
}

impl RawPose {
    /// Rest pose that the tracker decays towards when no face is visible
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            angles: EulerAngles::default(),
            proximity: NEUTRAL_PROXIMITY,
            bbox: BoundingBox::default(),
        }
    }
}

/// Map a normalized face width onto the clamped proximity scale
#[must_use]
pub fn proximity_target(face_width: f64) -> f64 {
    PROXIMITY_GAIN
        .mul_add(face_width - REFERENCE_FACE_WIDTH, 1.0)
        .clamp(PROXIMITY_MIN, PROXIMITY_MAX)
}

/// Bounding box spanning every landmark
#[must_use]
pub fn landmark_bounds(landmarks: &LandmarkSet) -> BoundingBox {
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (1.0_f64, 1.0_f64, 0.0_f64, 0.0_f64);
    for pt in landmarks.points() {
        min_x = min_x.min(pt.x);
        min_y = min_y.min(pt.y);
        max_x = max_x.max(pt.x);
        max_y = max_y.max(pt.y);
    }
    BoundingBox {
        x: min_x,
        y: min_y,
        w: max_x - min_x,
        h: max_y - min_y,
    }
}

/// Derive pitch, yaw, roll and proximity from the primary face
#[must_use]
pub fn extract_pose(landmarks: &LandmarkSet) -> RawPose {
    let bbox = landmark_bounds(landmarks);
    let nose = landmarks.point(NOSE_TIP);
    let left_eye = landmarks.point(LEFT_EYE);
    let right_eye = landmarks.point(RIGHT_EYE);

    RawPose {
        angles: EulerAngles {
            pitch: (nose.y - IMAGE_CENTER) * PITCH_GAIN,
            yaw: (nose.x - IMAGE_CENTER) * YAW_GAIN,
            roll: (left_eye.y - right_eye.y) * ROLL_GAIN,
        },
        proximity: proximity_target(bbox.w),
        bbox,
    }
}

/// Pose target for a frame: the extracted pose, or neutral when no face was found
#[must_use]
pub fn pose_target(landmarks: Option<&LandmarkSet>) -> RawPose {
    landmarks.map_or_else(RawPose::neutral, extract_pose)
}
