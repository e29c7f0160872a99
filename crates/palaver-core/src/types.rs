use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier for an isolated multi-channel conversation context.
///
/// Workspaces are created at process start from configuration and are never
/// destroyed during a run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(pub String);

impl WorkspaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkspaceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// =============================================================================
// Enums
// =============================================================================

/// A fixed conversation surface within a workspace.
///
/// The set is statically enumerated; channels are not user-creatable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Plain conversation plus slash-commands.
    General,
    /// Two-stage prompt-refinement + image synthesis.
    ImageGenerator,
    /// Text reply with a spoken rendering.
    LiveVoice,
    /// Code snippets reviewed over a dedicated conversation.
    CodeReviewer,
    /// Iterative edits against the last uploaded or produced image.
    ImageEditor,
}

impl Channel {
    /// All channels, in display order.
    pub const ALL: [Channel; 5] = [
        Channel::General,
        Channel::CodeReviewer,
        Channel::ImageGenerator,
        Channel::ImageEditor,
        Channel::LiveVoice,
    ];
}

/// Who produced a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Ai,
}

/// Purpose of a provider-side conversation handle.
///
/// One handle exists per workspace per purpose; the provider retains the
/// turn history for each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlePurpose {
    /// General conversation (also used by slash-commands and live voice).
    Chat,
    /// Multi-turn image-prompt refinement.
    ImageRefiner,
    /// Code review.
    CodeReview,
}

/// Supported aspect ratios for image synthesis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "3:4")]
    Classic,
}

impl AspectRatio {
    /// The literal ratio token, as sent to the provider and shown in the UI.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Wide => "16:9",
            AspectRatio::Tall => "9:16",
            AspectRatio::Standard => "4:3",
            AspectRatio::Classic => "3:4",
        }
    }

    /// Parse a literal ratio token. Unknown ratios (e.g. `5:7`) return `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "1:1" => Some(AspectRatio::Square),
            "16:9" => Some(AspectRatio::Wide),
            "9:16" => Some(AspectRatio::Tall),
            "4:3" => Some(AspectRatio::Standard),
            "3:4" => Some(AspectRatio::Classic),
            _ => None,
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Messages
// =============================================================================

/// An image produced by the provider or uploaded by the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// The ratio the image was synthesized at. The editing surface does not
    /// track one and tags `1:1`.
    pub aspect_ratio: AspectRatio,
}

/// The most recent image available as input to the next edit operation.
///
/// At most one per workspace; overwritten by each upload or successful edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Payload of a chat message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageBody {
    Text(String),
    Error(String),
    Image(ImageArtifact),
}

/// One entry in a session history.
///
/// Immutable once appended; display order equals append order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub body: MessageBody,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            body: MessageBody::Text(text.into()),
            sent_at: Utc::now(),
        }
    }

    pub fn ai_text(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Ai,
            body: MessageBody::Text(text.into()),
            sent_at: Utc::now(),
        }
    }

    pub fn ai_error(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Ai,
            body: MessageBody::Error(text.into()),
            sent_at: Utc::now(),
        }
    }

    pub fn ai_image(artifact: ImageArtifact) -> Self {
        Self {
            sender: Sender::Ai,
            body: MessageBody::Image(artifact),
            sent_at: Utc::now(),
        }
    }

    pub fn user_image(artifact: ImageArtifact) -> Self {
        Self {
            sender: Sender::User,
            body: MessageBody::Image(artifact),
            sent_at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.body, MessageBody::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio_round_trip() {
        for ratio in [
            AspectRatio::Square,
            AspectRatio::Wide,
            AspectRatio::Tall,
            AspectRatio::Standard,
            AspectRatio::Classic,
        ] {
            assert_eq!(AspectRatio::from_token(ratio.as_str()), Some(ratio));
        }
    }

    #[test]
    fn test_aspect_ratio_unknown_token() {
        assert_eq!(AspectRatio::from_token("5:7"), None);
        assert_eq!(AspectRatio::from_token("wide"), None);
        assert_eq!(AspectRatio::from_token(""), None);
    }

    #[test]
    fn test_aspect_ratio_default_is_square() {
        assert_eq!(AspectRatio::default(), AspectRatio::Square);
    }

    #[test]
    fn test_aspect_ratio_serde_uses_token() {
        let json = serde_json::to_string(&AspectRatio::Wide).unwrap();
        assert_eq!(json, "\"16:9\"");
        let back: AspectRatio = serde_json::from_str("\"9:16\"").unwrap();
        assert_eq!(back, AspectRatio::Tall);
    }

    #[test]
    fn test_channel_all_is_exhaustive() {
        assert_eq!(Channel::ALL.len(), 5);
        assert!(Channel::ALL.contains(&Channel::General));
        assert!(Channel::ALL.contains(&Channel::LiveVoice));
    }

    #[test]
    fn test_channel_serde_snake_case() {
        let json = serde_json::to_string(&Channel::ImageGenerator).unwrap();
        assert_eq!(json, "\"image_generator\"");
    }

    #[test]
    fn test_workspace_id_display() {
        let id = WorkspaceId::new("programming");
        assert_eq!(id.to_string(), "programming");
        assert_eq!(id.as_str(), "programming");
    }

    #[test]
    fn test_message_constructors() {
        let msg = Message::user_text("hello");
        assert_eq!(msg.sender, Sender::User);
        assert!(matches!(msg.body, MessageBody::Text(ref t) if t == "hello"));
        assert!(!msg.is_error());

        let msg = Message::ai_error("boom");
        assert_eq!(msg.sender, Sender::Ai);
        assert!(msg.is_error());
    }

    #[test]
    fn test_image_message() {
        let art = ImageArtifact {
            bytes: vec![1, 2, 3],
            mime_type: "image/png".to_string(),
            aspect_ratio: AspectRatio::Wide,
        };
        let msg = Message::ai_image(art.clone());
        assert!(matches!(msg.body, MessageBody::Image(ref a) if *a == art));
    }
}
