//! Generative-AI provider contract for Palaver.
//!
//! Defines the four capabilities the engine depends on (conversational turn,
//! image synthesis, multimodal image edit, text-to-speech) as an async trait,
//! plus a fully in-memory mock for tests and a REST adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use palaver_core::types::AspectRatio;

pub mod gemini;
pub mod mock;

pub use gemini::GeminiProvider;
pub use mock::MockProvider;

// =============================================================================
// Errors
// =============================================================================

/// Errors from a provider implementation.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider initialization failed: {0}")]
    Initialization(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("unknown conversation handle: {0}")]
    UnknownHandle(HandleId),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Request(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

// =============================================================================
// Types
// =============================================================================

/// Opaque reference to a provider-side stateful conversation.
///
/// The provider, not the engine, retains the turn history behind a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(pub Uuid);

impl HandleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Raw image bytes plus their MIME type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Options for image synthesis.
#[derive(Clone, Debug)]
pub struct ImageOptions {
    pub aspect_ratio: AspectRatio,
    /// Number of images requested. The engine always asks for exactly one.
    pub count: u32,
    pub output_mime: String,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::Square,
            count: 1,
            output_mime: "image/png".to_string(),
        }
    }
}

/// Options for speech synthesis.
#[derive(Clone, Debug)]
pub struct SpeechOptions {
    /// Prebuilt voice name.
    pub voice: String,
}

/// One part of a multimodal edit response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditPart {
    InlineImage(ImageData),
    Text(String),
}

/// Response from a multimodal edit call.
///
/// The caller scans `parts` for the first inline image; `block_reason` is
/// populated when the provider refused the request on policy grounds.
#[derive(Clone, Debug, Default)]
pub struct EditResponse {
    pub parts: Vec<EditPart>,
    pub block_reason: Option<String>,
}

impl EditResponse {
    /// First inline image part, if any.
    pub fn first_image(&self) -> Option<&ImageData> {
        self.parts.iter().find_map(|p| match p {
            EditPart::InlineImage(img) => Some(img),
            EditPart::Text(_) => None,
        })
    }
}

// =============================================================================
// Trait
// =============================================================================

/// The generative-AI capabilities the engine consumes.
///
/// All calls are asynchronous I/O-bound operations; implementations must not
/// retry internally — every failure is surfaced to the caller.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Open a stateful conversation with the given system instruction.
    async fn open_conversation(&self, system_instruction: &str) -> Result<HandleId>;

    /// Send one turn over an open conversation; the handle retains all prior
    /// turns on the provider side.
    async fn conversation_turn(&self, handle: HandleId, text: &str) -> Result<String>;

    /// Synthesize images for a prompt. Stateless.
    async fn synthesize_image(&self, prompt: &str, opts: &ImageOptions) -> Result<Vec<ImageData>>;

    /// Edit a single image according to an instruction, requesting image-only
    /// output. Stateless.
    async fn edit_image(&self, image: &ImageData, instruction: &str) -> Result<EditResponse>;

    /// Render text as speech, returning raw PCM bytes, or `None` when the
    /// provider produced no audio.
    async fn synthesize_speech(&self, text: &str, opts: &SpeechOptions)
        -> Result<Option<Vec<u8>>>;
}
