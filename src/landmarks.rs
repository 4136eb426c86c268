//! Facial landmark types and the landmark source seam.
//!
//! The detector itself is a black box: anything that turns a video frame into
//! at most one set of normalized landmark points can drive the tracker.

use crate::{camera::VideoFrame, constants::MIN_LANDMARKS, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single landmark in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
}

impl LandmarkPoint {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Ordered landmarks of the primary detected face
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: Vec<LandmarkPoint>,
}

impl LandmarkSet {
    /// Build a landmark set from detector output
    ///
    /// # Errors
    ///
    /// Returns an error if the set is too short to contain the nose, eye and chin indices
    pub fn from_points(points: Vec<LandmarkPoint>) -> Result<Self> {
        if points.len() < MIN_LANDMARKS {
            return Err(Error::InvalidInput(format!(
                "Expected at least {} landmarks, got {}",
                MIN_LANDMARKS,
                points.len()
            )));
        }
        Ok(Self { points })
    }

    /// Landmark at a detector index. Indices below `MIN_LANDMARKS` always exist.
    #[must_use]
    pub fn point(&self, index: usize) -> LandmarkPoint {
        self.points[index]
    }

    #[must_use]
    pub fn points(&self) -> &[LandmarkPoint] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Per-frame facial landmark detector
pub trait LandmarkSource: Send {
    /// Detect the primary face in a frame
    ///
    /// Returns `Ok(None)` when no face is visible.
    ///
    /// # Errors
    ///
    /// Returns an error when the detector fails on this frame
    fn detect(&mut self, frame: &VideoFrame, timestamp_ms: f64) -> Result<Option<LandmarkSet>>;

    /// Free the detector model
    fn release(&mut self);

    /// Get detector name
    fn name(&self) -> &str;
}

/// Replays a recorded landmark trace, one entry per frame, looping at the end
pub struct ReplayLandmarkSource {
    frames: Vec<Option<LandmarkSet>>,
    cursor: usize,
    released: bool,
}

impl ReplayLandmarkSource {
    #[must_use]
    pub fn new(frames: Vec<Option<LandmarkSet>>) -> Self {
        Self {
            frames,
            cursor: 0,
            released: false,
        }
    }

    /// Parse a JSON trace: a list of frames, each `null` or a list of `[x, y]` pairs
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a face entry is too short
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: Vec<Option<Vec<[f64; 2]>>> = serde_json::from_str(content)?;
        let frames = raw
            .into_iter()
            .map(|frame| {
                frame
                    .map(|pts| LandmarkSet::from_points(pts.into_iter().map(|[x, y]| LandmarkPoint::new(x, y)).collect()))
                    .transpose()
            })
            .collect::<Result<Vec<_>>>()?;
        log::info!("Loaded landmark trace with {} frames", frames.len());
        Ok(Self::new(frames))
    }

    /// Load a JSON trace from disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        log::info!("Loading landmark trace: {}", path.as_ref().display());
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl LandmarkSource for ReplayLandmarkSource {
    fn detect(&mut self, _frame: &VideoFrame, _timestamp_ms: f64) -> Result<Option<LandmarkSet>> {
        if self.released {
            return Err(Error::TrackerUnavailable("replay source released".to_string()));
        }
        if self.frames.is_empty() {
            return Ok(None);
        }
        let frame = self.frames[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.frames.len();
        Ok(frame)
    }

    fn release(&mut self) {
        self.released = true;
        self.frames.clear();
    }

    fn name(&self) -> &str {
        "ReplayLandmarkSource"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn blank_frame() -> VideoFrame {
        VideoFrame::new(RgbImage::new(4, 4))
    }

    #[test]
    fn test_short_set_rejected() {
        let points = vec![LandmarkPoint::new(0.5, 0.5); 10];
        assert!(LandmarkSet::from_points(points).is_err());
    }

    #[test]
    fn test_replay_cycles() {
        let face = LandmarkSet::from_points(vec![LandmarkPoint::new(0.5, 0.5); MIN_LANDMARKS]).unwrap();
        let mut source = ReplayLandmarkSource::new(vec![Some(face), None]);
        let frame = blank_frame();

        assert!(source.detect(&frame, 0.0).unwrap().is_some());
        assert!(source.detect(&frame, 16.0).unwrap().is_none());
        assert!(source.detect(&frame, 33.0).unwrap().is_some());
    }

    #[test]
    fn test_replay_from_json() {
        let face: Vec<[f64; 2]> = vec![[0.4, 0.6]; MIN_LANDMARKS];
        let json = serde_json::to_string(&vec![None, Some(face)]).unwrap();
        let mut source = ReplayLandmarkSource::from_json(&json).unwrap();
        let frame = blank_frame();

        assert!(source.detect(&frame, 0.0).unwrap().is_none());
        let set = source.detect(&frame, 16.0).unwrap().unwrap();
        assert_eq!(set.point(1), LandmarkPoint::new(0.4, 0.6));
    }

    #[test]
    fn test_released_source_errors() {
        let mut source = ReplayLandmarkSource::new(vec![None]);
        source.release();
        assert!(source.is_released());
        assert!(source.detect(&blank_frame(), 0.0).is_err());
    }
}
