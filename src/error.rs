//! Error types for the mirror control library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Landmark detector could not be initialized or used
    #[error("Tracker unavailable: {0}")]
    TrackerUnavailable(String),

    /// The user refused camera access
    #[error("Camera permission denied")]
    PermissionDenied,

    /// Any other camera failure
    #[error("Camera error: {0}")]
    Camera(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Image decoding or encoding failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// HTTP transport failed
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote classifier answered without a usable payload
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Filter initialization error
    #[error("Filter error: {0}")]
    FilterError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Short status string shown on the control for errors that reach the user
    #[must_use]
    pub fn status_text(&self) -> &'static str {
        match self {
            Self::TrackerUnavailable(_) => "Tracker Error",
            Self::PermissionDenied => "Denied",
            _ => "Error",
        }
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
