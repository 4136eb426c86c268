//! Constants used throughout the tracking and aura pipelines

/// Landmark index of the nose tip
pub const NOSE_TIP: usize = 1;

/// Landmark index of the left eye
pub const LEFT_EYE: usize = 33;

/// Landmark index of the right eye
pub const RIGHT_EYE: usize = 263;

/// Landmark index of the chin
pub const CHIN: usize = 152;

/// Minimum number of points a landmark set must carry to address every index above
pub const MIN_LANDMARKS: usize = RIGHT_EYE + 1;

/// Normalized image centre
pub const IMAGE_CENTER: f64 = 0.5;

/// Pose gains (degrees per unit of normalized offset)
pub const YAW_GAIN: f64 = -18.0;
pub const PITCH_GAIN: f64 = 18.0;
pub const ROLL_GAIN: f64 = 15.0;

/// Proximity mapping around a reference face width
pub const REFERENCE_FACE_WIDTH: f64 = 0.3;
pub const PROXIMITY_GAIN: f64 = 0.2;
pub const PROXIMITY_MIN: f64 = 0.98;
pub const PROXIMITY_MAX: f64 = 1.05;
pub const NEUTRAL_PROXIMITY: f64 = 1.0;

/// Default exponential smoothing factor per frame
pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.08;

/// Translation derived from smoothed rotation
pub const TRANSLATION_GAIN: f64 = 1.5;

/// FPS aggregation window in milliseconds
pub const FPS_WINDOW_MS: f64 = 1000.0;

/// Default frame clock rate when no display refresh rate is known
pub const DEFAULT_REFRESH_RATE: u32 = 60;

/// Camera constraints
pub const CAMERA_WIDTH: u32 = 640;
pub const CAMERA_HEIGHT: u32 = 480;

/// JPEG quality used for still captures sent to the classifier
pub const DEFAULT_JPEG_QUALITY: u8 = 50;

/// Classifier defaults
pub const DEFAULT_CLASSIFIER_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_CLASSIFIER_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_API_KEY_ENV: &str = "API_KEY";
pub const DEFAULT_CLASSIFIER_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_AURA_INSTRUCTION: &str =
    "What is the vibe/aura here? Return JSON with hex 'color' and 'mood'.";

/// Surface tint before any aura has been classified
pub const DEFAULT_TINT: &str = "rgba(37, 99, 235, 0.4)";

/// Alpha suffix appended to a classified hex color to form the surface tint
pub const TINT_ALPHA_SUFFIX: &str = "66";

/// Surface depth offsets in pixels
pub const IDLE_DEPTH_PX: f64 = 30.0;
pub const PRESSED_DEPTH_PX: f64 = -10.0;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
