//! Single-flight aura classification.
//!
//! A press captures the current camera frame, sends it to a remote vision
//! model and publishes the returned `(color, mood)` pair. At most one request
//! runs at a time; failures are logged and leave the previous result in place.

use crate::{
    camera::{CameraStream, VideoFrame},
    config::ClassifierConfig,
    constants::TINT_ALPHA_SUFFIX,
    Error, Result,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, ColorType};
use log::{error, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::watch;

/// Classified scene color and mood
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuraResult {
    /// Hex color such as `#3b82f6`
    pub color: String,
    pub mood: String,
}

impl AuraResult {
    /// Translucent surface tint for this aura
    #[must_use]
    pub fn tint(&self) -> String {
        format!("{}{}", self.color, TINT_ALPHA_SUFFIX)
    }
}

#[derive(Deserialize, Default)]
struct AuraPayload {
    color: Option<String>,
    mood: Option<String>,
}

/// Parse the classifier's JSON answer
///
/// An empty answer is treated as an empty object.
///
/// # Errors
///
/// Returns `Error::Json` for malformed JSON and `Error::Classifier` when no
/// usable color is present
pub fn parse_aura(text: &str) -> Result<AuraResult> {
    let text = text.trim();
    let payload: AuraPayload = if text.is_empty() {
        AuraPayload::default()
    } else {
        serde_json::from_str(text)?
    };
    match payload.color {
        Some(color) if !color.trim().is_empty() => Ok(AuraResult {
            color,
            mood: payload.mood.unwrap_or_default(),
        }),
        _ => Err(Error::Classifier("response has no color".to_string())),
    }
}

/// One image plus instructions for the remote model
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub image: Vec<u8>,
    pub mime_type: &'static str,
    pub instruction: String,
    pub response_mime_type: &'static str,
}

/// Remote vision model
#[async_trait]
pub trait RemoteClassifier: Send + Sync {
    /// Send one request and return the raw text payload
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an unusable response envelope
    async fn classify(&self, request: ClassificationRequest) -> Result<String>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    Text { text: &'a str },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Google Generative Language `generateContent` client
pub struct GeminiClassifier {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl GeminiClassifier {
    /// Build a client from configuration, reading the API key from the configured variable
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            warn!("{} is not set; classifier requests will be unauthenticated", config.api_key_env);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: format!(
                "{}/v1beta/models/{}:generateContent",
                config.endpoint.trim_end_matches('/'),
                config.model
            ),
            api_key,
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RemoteClassifier for GeminiClassifier {
    async fn classify(&self, request: ClassificationRequest) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: request.mime_type,
                            data: STANDARD.encode(&request.image),
                        },
                    },
                    Part::Text {
                        text: &request.instruction,
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: request.response_mime_type,
            },
        };

        let mut builder = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-goog-api-key", key);
        }
        let response: GenerateResponse = builder.send().await?.error_for_status()?.json().await?;

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::Classifier("response has no candidates".to_string()))?;
        Ok(candidate
            .content
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect::<String>())
            .unwrap_or_default())
    }
}

/// Encode a frame as JPEG at the given quality (1-100)
///
/// # Errors
///
/// Returns an error if encoding fails
pub fn encode_still(frame: &VideoFrame, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode(
        frame.image.as_raw(),
        frame.width(),
        frame.height(),
        ColorType::Rgb8,
    )?;
    Ok(buffer)
}

/// Whether a classification is running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlightState {
    #[default]
    Idle,
    InFlight,
}

/// Holds the pipeline in `InFlight` until dropped
pub struct FlightGuard {
    state: Arc<Mutex<FlightState>>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        *self.state.lock() = FlightState::Idle;
    }
}

/// Why an activation did not start a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    AlreadyInFlight,
    NoCamera,
}

/// Result of one activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuraOutcome {
    /// A new aura was published
    Classified(AuraResult),
    /// Nothing was started
    Rejected(RejectReason),
    /// Capture, encoding or transport failed
    TransientFailure(String),
    /// The classifier answered with something unusable
    Malformed(String),
    /// Classified after the pipeline was detached; nothing was published
    Discarded(AuraResult),
}

/// Capture, classify and publish, one request at a time
#[derive(Clone)]
pub struct AuraPipeline {
    classifier: Arc<dyn RemoteClassifier>,
    flight: Arc<Mutex<FlightState>>,
    publisher: Arc<watch::Sender<Option<AuraResult>>>,
    detached: Arc<AtomicBool>,
    jpeg_quality: u8,
    instruction: String,
}

impl AuraPipeline {
    #[must_use]
    pub fn new(classifier: Arc<dyn RemoteClassifier>, jpeg_quality: u8, instruction: impl Into<String>) -> Self {
        let (publisher, _) = watch::channel(None);
        Self {
            classifier,
            flight: Arc::new(Mutex::new(FlightState::Idle)),
            publisher: Arc::new(publisher),
            detached: Arc::new(AtomicBool::new(false)),
            jpeg_quality,
            instruction: instruction.into(),
        }
    }

    /// Pipeline configured from the classifier section of the config
    #[must_use]
    pub fn from_config(classifier: Arc<dyn RemoteClassifier>, config: &ClassifierConfig) -> Self {
        Self::new(classifier, config.jpeg_quality, config.instruction.clone())
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<AuraResult>> {
        self.publisher.subscribe()
    }

    /// Most recently published aura
    #[must_use]
    pub fn latest(&self) -> Option<AuraResult> {
        self.publisher.borrow().clone()
    }

    #[must_use]
    pub fn state(&self) -> FlightState {
        *self.flight.lock()
    }

    #[must_use]
    pub fn is_analyzing(&self) -> bool {
        self.state() == FlightState::InFlight
    }

    /// Stop publishing; flights still running settle without touching the latest result
    pub fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    /// Move `Idle -> InFlight`, or `None` if a request is already running
    #[must_use]
    pub fn try_begin(&self) -> Option<FlightGuard> {
        let mut state = self.flight.lock();
        if *state == FlightState::InFlight {
            return None;
        }
        *state = FlightState::InFlight;
        Some(FlightGuard {
            state: Arc::clone(&self.flight),
        })
    }

    /// Check the preconditions and enter `InFlight` synchronously
    ///
    /// # Errors
    ///
    /// Returns the reason when there is no live stream or a request is already running
    pub fn begin(
        &self,
        stream: Option<Arc<dyn CameraStream>>,
    ) -> std::result::Result<(FlightGuard, Arc<dyn CameraStream>), RejectReason> {
        let stream = stream.filter(|s| s.is_live()).ok_or(RejectReason::NoCamera)?;
        let guard = self.try_begin().ok_or(RejectReason::AlreadyInFlight)?;
        Ok((guard, stream))
    }

    /// Classify the current frame of `stream`
    pub async fn analyze(&self, stream: Option<Arc<dyn CameraStream>>) -> AuraOutcome {
        match self.begin(stream) {
            Ok((guard, stream)) => self.complete(guard, stream).await,
            Err(reason) => AuraOutcome::Rejected(reason),
        }
    }

    /// Run a flight started with [`AuraPipeline::begin`]; the guard is released when it settles
    pub async fn complete(&self, guard: FlightGuard, stream: Arc<dyn CameraStream>) -> AuraOutcome {
        let _guard = guard;
        let request = match self.capture(stream.as_ref()) {
            Ok(request) => request,
            Err(e) => {
                error!("Aura capture failed: {}", e);
                return AuraOutcome::TransientFailure(e.to_string());
            }
        };

        let text = match self.classifier.classify(request).await {
            Ok(text) => text,
            Err(e) => {
                error!("Aura classification failed: {}", e);
                return AuraOutcome::TransientFailure(e.to_string());
            }
        };

        match parse_aura(&text) {
            Ok(aura) if self.is_detached() => {
                info!("Aura detected after detach, discarding: color={}", aura.color);
                AuraOutcome::Discarded(aura)
            }
            Ok(aura) => {
                info!("Aura detected: color={} mood={}", aura.color, aura.mood);
                self.publisher.send_replace(Some(aura.clone()));
                AuraOutcome::Classified(aura)
            }
            Err(e) => {
                error!("Aura response unusable: {}", e);
                AuraOutcome::Malformed(e.to_string())
            }
        }
    }

    fn capture(&self, stream: &dyn CameraStream) -> Result<ClassificationRequest> {
        let frame = stream
            .current_frame()
            .ok_or_else(|| Error::Camera("no frame available".to_string()))?;
        Ok(ClassificationRequest {
            image: encode_still(&frame, self.jpeg_quality)?,
            mime_type: "image/jpeg",
            instruction: self.instruction.clone(),
            response_mime_type: "application/json",
        })
    }
}
