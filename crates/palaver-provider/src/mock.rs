//! In-memory mock provider for tests.
//!
//! Keeps per-handle turn history, counts every capability call, and supports
//! failure injection so precondition properties ("zero provider calls") are
//! directly observable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use palaver_core::types::AspectRatio;

use crate::{
    EditPart, EditResponse, HandleId, ImageData, ImageOptions, Provider, ProviderError, Result,
    SpeechOptions,
};

/// Default speech payload: two PCM16 LE samples, 16384 and -16384.
const DEFAULT_PCM: [u8; 4] = [0x00, 0x40, 0x00, 0xC0];

#[derive(Debug, Default)]
struct MockConversation {
    system_instruction: String,
    /// (user text, reply) pairs, oldest first.
    turns: Vec<(String, String)>,
}

/// Scriptable in-memory provider.
#[derive(Default)]
pub struct MockProvider {
    conversations: Mutex<HashMap<HandleId, MockConversation>>,

    open_calls: AtomicUsize,
    turn_calls: AtomicUsize,
    image_calls: AtomicUsize,
    edit_calls: AtomicUsize,
    speech_calls: AtomicUsize,

    last_turn_text: Mutex<Option<String>>,
    last_image_request: Mutex<Option<(String, AspectRatio)>>,
    last_edit_instruction: Mutex<Option<String>>,

    fail_open: AtomicBool,
    fail_turns: AtomicBool,
    fail_images: AtomicBool,
    empty_images: AtomicBool,
    block_edits: AtomicBool,
    fail_speech: AtomicBool,
    silent_speech: AtomicBool,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- failure injection ----

    /// Opening a conversation fails, as a missing or invalid API key would.
    pub fn fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::Relaxed);
    }

    pub fn fail_turns(&self, fail: bool) {
        self.fail_turns.store(fail, Ordering::Relaxed);
    }

    pub fn fail_images(&self, fail: bool) {
        self.fail_images.store(fail, Ordering::Relaxed);
    }

    /// Image synthesis succeeds but returns an empty result set.
    pub fn empty_images(&self, empty: bool) {
        self.empty_images.store(empty, Ordering::Relaxed);
    }

    /// Edits return no image part and a safety block reason.
    pub fn block_edits(&self, block: bool) {
        self.block_edits.store(block, Ordering::Relaxed);
    }

    pub fn fail_speech(&self, fail: bool) {
        self.fail_speech.store(fail, Ordering::Relaxed);
    }

    /// Speech synthesis succeeds but produces no audio.
    pub fn silent_speech(&self, silent: bool) {
        self.silent_speech.store(silent, Ordering::Relaxed);
    }

    // ---- observation ----

    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::Relaxed)
    }

    pub fn turn_calls(&self) -> usize {
        self.turn_calls.load(Ordering::Relaxed)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::Relaxed)
    }

    pub fn edit_calls(&self) -> usize {
        self.edit_calls.load(Ordering::Relaxed)
    }

    pub fn speech_calls(&self) -> usize {
        self.speech_calls.load(Ordering::Relaxed)
    }

    /// Total calls across all capabilities.
    pub fn total_calls(&self) -> usize {
        self.turn_calls() + self.image_calls() + self.edit_calls() + self.speech_calls()
    }

    /// Text of the most recent conversation turn, across all handles.
    pub fn last_turn_text(&self) -> Option<String> {
        self.last_turn_text.lock().expect("mock lock").clone()
    }

    /// Prompt and ratio of the most recent image synthesis request.
    pub fn last_image_request(&self) -> Option<(String, AspectRatio)> {
        self.last_image_request.lock().expect("mock lock").clone()
    }

    pub fn last_edit_instruction(&self) -> Option<String> {
        self.last_edit_instruction.lock().expect("mock lock").clone()
    }

    /// Turn history for a handle, oldest first.
    pub fn turns_for(&self, handle: HandleId) -> Vec<(String, String)> {
        self.conversations
            .lock()
            .expect("mock lock")
            .get(&handle)
            .map(|c| c.turns.clone())
            .unwrap_or_default()
    }

    pub fn system_instruction_for(&self, handle: HandleId) -> Option<String> {
        self.conversations
            .lock()
            .expect("mock lock")
            .get(&handle)
            .map(|c| c.system_instruction.clone())
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn open_conversation(&self, system_instruction: &str) -> Result<HandleId> {
        self.open_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_open.load(Ordering::Relaxed) {
            return Err(ProviderError::Initialization(
                "mock initialization failure".to_string(),
            ));
        }
        let handle = HandleId::new();
        self.conversations.lock().expect("mock lock").insert(
            handle,
            MockConversation {
                system_instruction: system_instruction.to_string(),
                turns: Vec::new(),
            },
        );
        Ok(handle)
    }

    async fn conversation_turn(&self, handle: HandleId, text: &str) -> Result<String> {
        self.turn_calls.fetch_add(1, Ordering::Relaxed);
        *self.last_turn_text.lock().expect("mock lock") = Some(text.to_string());

        if self.fail_turns.load(Ordering::Relaxed) {
            return Err(ProviderError::Request("mock turn failure".to_string()));
        }

        let mut conversations = self.conversations.lock().expect("mock lock");
        let conversation = conversations
            .get_mut(&handle)
            .ok_or(ProviderError::UnknownHandle(handle))?;

        // Deterministic reply carrying the turn index, so multi-turn
        // accumulation is observable in assertions.
        let reply = format!("re[{}]: {}", conversation.turns.len(), text);
        conversation.turns.push((text.to_string(), reply.clone()));
        Ok(reply)
    }

    async fn synthesize_image(&self, prompt: &str, opts: &ImageOptions) -> Result<Vec<ImageData>> {
        self.image_calls.fetch_add(1, Ordering::Relaxed);
        *self.last_image_request.lock().expect("mock lock") =
            Some((prompt.to_string(), opts.aspect_ratio));

        if self.fail_images.load(Ordering::Relaxed) {
            return Err(ProviderError::Request("mock image failure".to_string()));
        }
        if self.empty_images.load(Ordering::Relaxed) {
            return Ok(Vec::new());
        }

        Ok((0..opts.count)
            .map(|_| ImageData {
                bytes: prompt.as_bytes().to_vec(),
                mime_type: opts.output_mime.clone(),
            })
            .collect())
    }

    async fn edit_image(&self, image: &ImageData, instruction: &str) -> Result<EditResponse> {
        self.edit_calls.fetch_add(1, Ordering::Relaxed);
        *self.last_edit_instruction.lock().expect("mock lock") = Some(instruction.to_string());

        if self.block_edits.load(Ordering::Relaxed) {
            return Ok(EditResponse {
                parts: vec![EditPart::Text("request refused".to_string())],
                block_reason: Some("SAFETY".to_string()),
            });
        }

        let mut bytes = image.bytes.clone();
        bytes.extend_from_slice(instruction.as_bytes());
        Ok(EditResponse {
            parts: vec![EditPart::InlineImage(ImageData {
                bytes,
                mime_type: image.mime_type.clone(),
            })],
            block_reason: None,
        })
    }

    async fn synthesize_speech(
        &self,
        _text: &str,
        _opts: &SpeechOptions,
    ) -> Result<Option<Vec<u8>>> {
        self.speech_calls.fetch_add(1, Ordering::Relaxed);

        if self.fail_speech.load(Ordering::Relaxed) {
            return Err(ProviderError::Request("mock speech failure".to_string()));
        }
        if self.silent_speech.load(Ordering::Relaxed) {
            return Ok(None);
        }
        Ok(Some(DEFAULT_PCM.to_vec()))
    }
}

// =============================================================================
// Tests
// =============================================================================
