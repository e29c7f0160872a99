use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PalaverError, Result};
use crate::i18n::Language;

/// Top-level configuration for the Palaver client.
///
/// Loaded from `~/.palaver/config.toml` by default. Each section corresponds
/// to a bounded context or cross-cutting concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PalaverConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    /// The workspace roster. Every workspace in this list exists for the
    /// whole process lifetime.
    #[serde(default = "default_workspaces")]
    pub workspaces: Vec<WorkspaceConfig>,
}

impl Default for PalaverConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            provider: ProviderConfig::default(),
            audio: AudioConfig::default(),
            engine: EngineConfig::default(),
            workspaces: default_workspaces(),
        }
    }
}

impl PalaverConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PalaverConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PalaverError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Interface language for localized engine messages.
    pub language: Language,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            language: Language::default(),
        }
    }
}

/// Remote generative-AI provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Base URL of the REST API.
    pub base_url: String,
    /// Model used for conversational turns.
    pub chat_model: String,
    /// Model used for image synthesis.
    pub image_model: String,
    /// Model used for multimodal image edits.
    pub edit_model: String,
    /// Model used for text-to-speech.
    pub tts_model: String,
    /// Prebuilt voice name for speech synthesis.
    pub voice: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key_env: "PALAVER_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            chat_model: "gemini-2.5-flash".to_string(),
            image_model: "imagen-4.0-generate-001".to_string(),
            edit_model: "gemini-2.5-flash-image".to_string(),
            tts_model: "gemini-2.5-flash-preview-tts".to_string(),
            voice: "Kore".to_string(),
        }
    }
}

/// Voice-output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Playback sample rate in Hz for decoded speech.
    pub sample_rate: u32,
    /// Channel count of the provider's PCM stream.
    pub channels: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            channels: 1,
        }
    }
}

/// Dispatch-engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Busy-gate scope: "global" (one dispatch in flight per process) or
    /// "per_session" (one per workspace/channel pair).
    pub gate_mode: String,
    /// Default aspect ratio when the prompt carries no directive.
    pub default_aspect_ratio: crate::types::AspectRatio,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gate_mode: "global".to_string(),
            default_aspect_ratio: crate::types::AspectRatio::Square,
        }
    }
}

/// One configured workspace and its per-purpose system instructions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub id: String,
    pub name: String,
    /// System instruction for the general conversation handle.
    pub chat_instruction: String,
    /// System instruction for the image-prompt refiner handle.
    pub refiner_instruction: String,
    /// System instruction for the code-review handle.
    pub review_instruction: String,
}

fn default_workspaces() -> Vec<WorkspaceConfig> {
    vec![
        WorkspaceConfig {
            id: "palaver".to_string(),
            name: "Palaver Server".to_string(),
            chat_instruction: "You are a helpful and creative assistant. Be friendly and concise."
                .to_string(),
            refiner_instruction: "You are an AI assistant that refines user prompts for an image \
                 generation model. Based on the conversation history, generate a single, \
                 complete, and descriptive prompt that combines the user's requests. Only output \
                 the final, refined prompt and nothing else."
                .to_string(),
            review_instruction: "You are a world-class software engineer and code reviewer. \
                 Analyze the provided code snippet and offer constructive feedback. Identify \
                 potential bugs, suggest performance improvements, and recommend best practices \
                 for style and readability. Be concise and provide code examples for your \
                 suggestions."
                .to_string(),
        },
        WorkspaceConfig {
            id: "programming".to_string(),
            name: "Programming Help".to_string(),
            chat_instruction: "You are an expert programming assistant. Provide clear, concise, \
                 and accurate code examples and explanations. Always format code snippets using \
                 markdown code blocks."
                .to_string(),
            refiner_instruction: "You are an AI assistant that refines user prompts for an image \
                 generation model, focusing on technical or abstract concepts. Based on the \
                 conversation history, generate a single, complete, and descriptive prompt that \
                 combines the user's requests. Only output the final, refined prompt and nothing \
                 else."
                .to_string(),
            review_instruction: "You are a world-class software engineer and code reviewer. \
                 Analyze the provided code snippet and offer constructive feedback. Identify \
                 potential bugs, suggest performance improvements, and recommend best practices \
                 for style and readability. Be concise and provide code examples for your \
                 suggestions."
                .to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PalaverConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.language, Language::Es);
        assert_eq!(config.audio.sample_rate, 24_000);
        assert_eq!(config.audio.channels, 1);
        assert_eq!(config.engine.gate_mode, "global");
        assert_eq!(config.workspaces.len(), 2);
    }

    #[test]
    fn test_default_workspaces_have_distinct_instructions() {
        let config = PalaverConfig::default();
        assert_ne!(
            config.workspaces[0].chat_instruction,
            config.workspaces[1].chat_instruction
        );
        assert_ne!(config.workspaces[0].id, config.workspaces[1].id);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = PalaverConfig::default();
        config.general.log_level = "debug".to_string();
        config.provider.voice = "Puck".to_string();
        config.save(&path).unwrap();

        let loaded = PalaverConfig::load(&path).unwrap();
        assert_eq!(loaded.general.log_level, "debug");
        assert_eq!(loaded.provider.voice, "Puck");
        assert_eq!(loaded.workspaces.len(), 2);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let result = PalaverConfig::load(Path::new("/nonexistent/palaver.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_falls_back() {
        let config = PalaverConfig::load_or_default(Path::new("/nonexistent/palaver.toml"));
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_partial_toml_uses_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general]\nlog_level = \"trace\"\n").unwrap();

        let config = PalaverConfig::load(&path).unwrap();
        assert_eq!(config.general.log_level, "trace");
        // Untouched sections fall back to their defaults.
        assert_eq!(config.audio.sample_rate, 24_000);
        assert_eq!(config.workspaces.len(), 2);
    }
}
