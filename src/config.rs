//! Configuration management for the mirror control

use crate::{
    camera::{CameraConstraints, FacingMode},
    constants::{
        CAMERA_HEIGHT, CAMERA_WIDTH, DEFAULT_API_KEY_ENV, DEFAULT_AURA_INSTRUCTION, DEFAULT_CLASSIFIER_ENDPOINT,
        DEFAULT_CLASSIFIER_MODEL, DEFAULT_CLASSIFIER_TIMEOUT_SECS, DEFAULT_JPEG_QUALITY, DEFAULT_REFRESH_RATE,
        DEFAULT_SMOOTHING_ALPHA,
    },
    filters::PoseFilter,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pose tracking configuration
    pub tracking: TrackingConfig,

    /// Camera request configuration
    pub camera: CameraConfig,

    /// Remote classifier configuration
    pub classifier: ClassifierConfig,
}

/// Pose tracking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Filter type (`exponential` or `none`)
    pub filter: String,

    /// Fraction of the remaining gap closed per frame
    pub smoothing_alpha: f64,

    /// Frame clock rate in Hz
    pub refresh_rate: u32,
}

/// Camera constraints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    pub facing: FacingMode,
}

/// Remote classifier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Base URL of the generative language API
    pub endpoint: String,

    /// Model name
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// JPEG quality of the uploaded still (1-100)
    pub jpeg_quality: u8,

    /// Instruction sent alongside the still
    pub instruction: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            filter: "exponential".to_string(),
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
            refresh_rate: DEFAULT_REFRESH_RATE,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: CAMERA_WIDTH,
            height: CAMERA_HEIGHT,
            facing: FacingMode::User,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CLASSIFIER_ENDPOINT.to_string(),
            model: DEFAULT_CLASSIFIER_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            instruction: DEFAULT_AURA_INSTRUCTION.to_string(),
            timeout_secs: DEFAULT_CLASSIFIER_TIMEOUT_SECS,
        }
    }
}

impl CameraConfig {
    /// Constraints for a camera access request; audio is never requested
    #[must_use]
    pub fn constraints(&self) -> CameraConstraints {
        CameraConstraints {
            width: self.width,
            height: self.height,
            facing: self.facing,
            audio: false,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Serialize configuration to YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))
    }

    /// Create the pose filter named by the tracking section
    ///
    /// # Errors
    ///
    /// Returns an error for unknown filters or an invalid alpha
    pub fn create_filter(&self) -> Result<Box<dyn PoseFilter>> {
        use crate::filters::{create_filter, exponential::ExponentialFilter};

        let name = self.tracking.filter.trim().to_lowercase();
        match name.as_str() {
            "exponential" | "ema" => Ok(Box::new(ExponentialFilter::try_new(self.tracking.smoothing_alpha)?)),
            other => create_filter(other),
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found
    pub fn validate(&self) -> Result<()> {
        if !(self.tracking.smoothing_alpha > 0.0 && self.tracking.smoothing_alpha <= 1.0) {
            return Err(Error::ConfigError("Smoothing alpha must be in (0, 1]".to_string()));
        }
        if self.tracking.refresh_rate == 0 {
            return Err(Error::ConfigError("Refresh rate must be greater than 0".to_string()));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(Error::ConfigError("Camera dimensions must be greater than 0".to_string()));
        }
        if !(1..=100).contains(&self.classifier.jpeg_quality) {
            return Err(Error::ConfigError("JPEG quality must be between 1 and 100".to_string()));
        }
        if self.classifier.model.trim().is_empty() {
            return Err(Error::ConfigError("Classifier model must not be empty".to_string()));
        }
        if self.classifier.endpoint.trim().is_empty() {
            return Err(Error::ConfigError("Classifier endpoint must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Specular mirror configuration

# Pose tracking
tracking:
  filter: "exponential"
  smoothing_alpha: 0.08
  refresh_rate: 60

# Camera request
camera:
  width: 640
  height: 480
  facing: user

# Remote aura classifier
classifier:
  endpoint: "https://generativelanguage.googleapis.com"
  model: "gemini-3-flash-preview"
  api_key_env: "API_KEY"
  jpeg_quality: 50
  instruction: "What is the vibe/aura here? Return JSON with hex 'color' and 'mood'."
  timeout_secs: 30
"#;
