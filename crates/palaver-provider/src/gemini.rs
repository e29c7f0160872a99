//! REST adapter for a Gemini-style generative API.
//!
//! Conversation handles are provider-side state; this adapter mirrors each
//! handle's content history locally and replays it on every turn, which is
//! how the stateless REST surface models a stateful chat.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header;
use serde::{Deserialize, Serialize};

use palaver_core::config::ProviderConfig;

use crate::{
    EditPart, EditResponse, HandleId, ImageData, ImageOptions, Provider, ProviderError, Result,
    SpeechOptions,
};

const API_VERSION: &str = "v1beta";

/// HTTP client for the Gemini REST API.
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    config: ProviderConfig,
    conversations: Mutex<HashMap<HandleId, ChatState>>,
}

#[derive(Clone)]
struct ChatState {
    system_instruction: String,
    contents: Vec<Content>,
}

impl GeminiProvider {
    /// Build a provider from configuration, resolving the API key from the
    /// configured environment variable.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            ProviderError::Initialization(format!("{} is not set", config.api_key_env))
        })?;
        Self::with_api_key(config, &api_key)
    }

    /// Build a provider with an explicit API key.
    pub fn with_api_key(config: ProviderConfig, api_key: &str) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            api_key
                .parse()
                .map_err(|_| ProviderError::Initialization("invalid API key".to_string()))?,
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::Initialization(e.to_string()))?;

        let base_url = format!("{}/{}", config.base_url.trim_end_matches('/'), API_VERSION);
        Ok(Self {
            client,
            base_url,
            config,
            conversations: Mutex::new(HashMap::new()),
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post<Req, Resp>(&self, url: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: for<'de> Deserialize<'de>,
    {
        tracing::debug!(url, "sending provider request");
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "provider request failed");
            return Err(ProviderError::Request(format!("{status}: {detail}")));
        }
        Ok(response.json::<Resp>().await?)
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn open_conversation(&self, system_instruction: &str) -> Result<HandleId> {
        let handle = HandleId::new();
        self.conversations
            .lock()
            .map_err(|_| ProviderError::Initialization("conversation lock poisoned".to_string()))?
            .insert(
                handle,
                ChatState {
                    system_instruction: system_instruction.to_string(),
                    contents: Vec::new(),
                },
            );
        Ok(handle)
    }

    async fn conversation_turn(&self, handle: HandleId, text: &str) -> Result<String> {
        // Snapshot the history before awaiting so the lock is never held
        // across an I/O suspension point.
        let state = {
            let conversations = self
                .conversations
                .lock()
                .map_err(|_| ProviderError::Request("conversation lock poisoned".to_string()))?;
            conversations
                .get(&handle)
                .cloned()
                .ok_or(ProviderError::UnknownHandle(handle))?
        };

        let user_content = Content {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        };
        let mut contents = state.contents.clone();
        contents.push(user_content.clone());

        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(SystemInstruction {
                parts: vec![Part::text(&state.system_instruction)],
            }),
            generation_config: None,
        };

        let url = self.model_url(&self.config.chat_model, "generateContent");
        let response: GenerateContentResponse = self.post(&url, &request).await?;
        let reply = response
            .first_text()
            .ok_or_else(|| ProviderError::UnexpectedResponse("no text candidate".to_string()))?;

        if let Ok(mut conversations) = self.conversations.lock() {
            if let Some(chat) = conversations.get_mut(&handle) {
                chat.contents.push(user_content);
                chat.contents.push(Content {
                    role: Some("model".to_string()),
                    parts: vec![Part::text(&reply)],
                });
            }
        }
        Ok(reply)
    }

    async fn synthesize_image(&self, prompt: &str, opts: &ImageOptions) -> Result<Vec<ImageData>> {
        let request = PredictRequest {
            instances: vec![Instance {
                prompt: prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: opts.count,
                aspect_ratio: opts.aspect_ratio.as_str().to_string(),
                output_mime_type: opts.output_mime.clone(),
            },
        };

        let url = self.model_url(&self.config.image_model, "predict");
        let response: PredictResponse = self.post(&url, &request).await?;

        let mut images = Vec::new();
        for prediction in response.predictions {
            let Some(encoded) = prediction.bytes_base64_encoded else {
                continue;
            };
            let bytes = BASE64
                .decode(encoded)
                .map_err(|e| ProviderError::UnexpectedResponse(e.to_string()))?;
            images.push(ImageData {
                bytes,
                mime_type: prediction
                    .mime_type
                    .unwrap_or_else(|| opts.output_mime.clone()),
            });
        }
        Ok(images)
    }

    async fn edit_image(&self, image: &ImageData, instruction: &str) -> Result<EditResponse> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::inline(&image.mime_type, &BASE64.encode(&image.bytes)),
                    Part::text(instruction),
                ],
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["IMAGE".to_string()]),
                speech_config: None,
            }),
        };

        let url = self.model_url(&self.config.edit_model, "generateContent");
        let response: GenerateContentResponse = self.post(&url, &request).await?;

        let mut parts = Vec::new();
        for part in response.all_parts() {
            if let Some(ref inline) = part.inline_data {
                let bytes = BASE64
                    .decode(&inline.data)
                    .map_err(|e| ProviderError::UnexpectedResponse(e.to_string()))?;
                parts.push(EditPart::InlineImage(ImageData {
                    bytes,
                    mime_type: inline.mime_type.clone(),
                }));
            } else if let Some(ref text) = part.text {
                parts.push(EditPart::Text(text.clone()));
            }
        }

        Ok(EditResponse {
            parts,
            block_reason: response.prompt_feedback.and_then(|f| f.block_reason),
        })
    }

    async fn synthesize_speech(
        &self,
        text: &str,
        opts: &SpeechOptions,
    ) -> Result<Option<Vec<u8>>> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(text)],
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: opts.voice.clone(),
                        },
                    },
                }),
            }),
        };

        let url = self.model_url(&self.config.tts_model, "generateContent");
        let response: GenerateContentResponse = self.post(&url, &request).await?;

        let Some(encoded) = response
            .all_parts()
            .iter()
            .find_map(|p| p.inline_data.as_ref().map(|d| d.data.clone()))
        else {
            return Ok(None);
        };
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| ProviderError::UnexpectedResponse(e.to_string()))?;
        Ok(Some(bytes))
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }

    fn inline(mime_type: &str, data: &str) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<String> {
        self.all_parts().iter().find_map(|p| p.text.clone())
    }

    fn all_parts(&self) -> Vec<Part> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictRequest {
    instances: Vec<Instance>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct Instance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: String,
    output_mime_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
