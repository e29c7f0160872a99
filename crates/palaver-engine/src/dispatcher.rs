//! Submission dispatcher.
//!
//! Owns the session store, the dispatch gate, and the pipeline routing
//! table. Every submission funnels through [`ChatEngine::submit`], which
//! guarantees the busy gate is released and the renderer notified on both
//! the success and failure paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{error, info};

use palaver_audio::AudioSink;
use palaver_core::config::PalaverConfig;
use palaver_core::i18n::{self, Language, MessageKey};
use palaver_core::types::{
    AspectRatio, Channel, HandlePurpose, ImageArtifact, Message, PendingImage, WorkspaceId,
};
use palaver_provider::Provider;

use crate::error::EngineError;
use crate::gate::{DispatchGate, GateMode};
use crate::handlers::{self, PipelineContext};
use crate::render::StateListener;
use crate::store::SessionStore;
use crate::types::{RejectReason, Submission, TurnRecord};

/// The conversation orchestration engine.
///
/// One instance serves every configured workspace. Construction opens the
/// three provider conversations each workspace needs; if any of them fails,
/// the engine comes up inert: an initialization error lands in every general
/// channel and all further submissions are rejected without provider calls.
pub struct ChatEngine {
    store: SessionStore,
    provider: Arc<dyn Provider>,
    sink: Arc<dyn AudioSink>,
    listener: Arc<dyn StateListener>,
    gate: DispatchGate,
    language: Language,
    voice: String,
    sample_rate: u32,
    channels: usize,
    default_ratio: Mutex<AspectRatio>,
    inert: AtomicBool,
}

impl ChatEngine {
    /// Build the engine and open all provider conversations.
    pub async fn initialize(
        config: &PalaverConfig,
        provider: Arc<dyn Provider>,
        sink: Arc<dyn AudioSink>,
        listener: Arc<dyn StateListener>,
    ) -> Self {
        let language = config.general.language;
        let workspace_ids: Vec<WorkspaceId> = config
            .workspaces
            .iter()
            .map(|w| WorkspaceId::new(w.id.clone()))
            .collect();
        let store = SessionStore::new(&workspace_ids, language);

        let engine = Self {
            store,
            provider,
            sink,
            listener,
            gate: DispatchGate::new(GateMode::from_config(&config.engine.gate_mode)),
            language,
            voice: config.provider.voice.clone(),
            sample_rate: config.audio.sample_rate,
            channels: config.audio.channels,
            default_ratio: Mutex::new(config.engine.default_aspect_ratio),
            inert: AtomicBool::new(false),
        };

        if let Err(e) = engine.open_conversations(config).await {
            error!(error = %e, "engine initialization failed, going inert");
            engine.inert.store(true, Ordering::SeqCst);
            let text = i18n::text(language, MessageKey::InitializationError);
            for workspace in &workspace_ids {
                // The roster is fixed, so these appends cannot miss.
                let _ = engine
                    .store
                    .append(workspace, Channel::General, Message::ai_error(text));
                engine.listener.on_state_changed(workspace, Channel::General);
            }
        } else {
            info!(
                workspaces = workspace_ids.len(),
                "engine initialized, all conversations open"
            );
        }
        engine
    }

    async fn open_conversations(&self, config: &PalaverConfig) -> Result<(), EngineError> {
        for workspace in &config.workspaces {
            let id = WorkspaceId::new(workspace.id.clone());
            let purposes = [
                (HandlePurpose::Chat, &workspace.chat_instruction),
                (HandlePurpose::ImageRefiner, &workspace.refiner_instruction),
                (HandlePurpose::CodeReview, &workspace.review_instruction),
            ];
            for (purpose, instruction) in purposes {
                let handle = self.provider.open_conversation(instruction).await?;
                self.store.register_handle(&id, purpose, handle)?;
            }
        }
        Ok(())
    }

    /// Dispatch one submission.
    ///
    /// Rejections (empty input, busy gate, inert engine) are no-ops with zero
    /// side effects. A dispatched turn always appends the user message first,
    /// and any pipeline failure is converted into an in-session error message
    /// rather than surfaced to the caller; only infrastructure failures
    /// (unknown workspace, poisoned storage) come back as `Err`.
    pub async fn submit(
        &self,
        workspace: &WorkspaceId,
        channel: Channel,
        raw_text: &str,
    ) -> Result<Submission, EngineError> {
        if !self.store.contains(workspace) {
            return Err(EngineError::UnknownWorkspace(workspace.clone()));
        }
        let text = raw_text.trim();
        if text.is_empty() {
            return Ok(Submission::Rejected(RejectReason::EmptyInput));
        }
        if self.inert.load(Ordering::SeqCst) {
            return Ok(Submission::Rejected(RejectReason::Inert));
        }
        let Some(permit) = self.gate.acquire(workspace, channel) else {
            return Ok(Submission::Rejected(RejectReason::Busy));
        };

        self.store
            .append(workspace, channel, Message::user_text(text))?;
        self.listener.on_state_changed(workspace, channel);

        let ctx = PipelineContext {
            store: &self.store,
            provider: self.provider.as_ref(),
            sink: self.sink.as_ref(),
            language: self.language,
            workspace,
            default_ratio: self.default_ratio_snapshot(),
            sample_rate: self.sample_rate,
            channels: self.channels,
            voice: &self.voice,
        };
        let result = route(&ctx, channel, text).await;
        drop(permit);

        let outcome = match result {
            Ok(()) => Ok(Submission::Dispatched),
            Err(EngineError::Provider(e)) => {
                self.append_caught_error(workspace, channel, &e.to_string())?;
                Ok(Submission::Dispatched)
            }
            Err(EngineError::Audio(e)) => {
                self.append_caught_error(workspace, channel, &e.to_string())?;
                Ok(Submission::Dispatched)
            }
            Err(other) => Err(other),
        };
        self.listener.on_state_changed(workspace, channel);
        outcome
    }

    fn append_caught_error(
        &self,
        workspace: &WorkspaceId,
        channel: Channel,
        detail: &str,
    ) -> Result<(), EngineError> {
        let prefix = i18n::text(self.language, MessageKey::ApiErrorPrefix);
        self.store.append(
            workspace,
            channel,
            Message::ai_error(format!("{prefix}{detail}")),
        )
    }

    /// Store an uploaded image as the workspace's pending edit context and
    /// echo it into the editor channel.
    pub fn upload_image(
        &self,
        workspace: &WorkspaceId,
        bytes: Vec<u8>,
        mime_type: impl Into<String>,
    ) -> Result<(), EngineError> {
        let mime_type = mime_type.into();
        self.store.set_pending_image(
            workspace,
            PendingImage {
                bytes: bytes.clone(),
                mime_type: mime_type.clone(),
            },
        )?;
        self.store.append(
            workspace,
            Channel::ImageEditor,
            Message::user_image(ImageArtifact {
                bytes,
                mime_type,
                aspect_ratio: AspectRatio::Square,
            }),
        )?;
        self.store.append(
            workspace,
            Channel::ImageEditor,
            Message::ai_text(i18n::text(self.language, MessageKey::ImageLoaded)),
        )?;
        self.listener
            .on_state_changed(workspace, Channel::ImageEditor);
        Ok(())
    }

    // -----------------------------------------------------------------
    // State accessors
    // -----------------------------------------------------------------

    pub fn history(
        &self,
        workspace: &WorkspaceId,
        channel: Channel,
    ) -> Result<Vec<Message>, EngineError> {
        self.store.history(workspace, channel)
    }

    pub fn pending_image(
        &self,
        workspace: &WorkspaceId,
    ) -> Result<Option<PendingImage>, EngineError> {
        self.store.pending_image(workspace)
    }

    /// Locally mirrored turns for a workspace conversation.
    pub fn turn_log(
        &self,
        workspace: &WorkspaceId,
        purpose: HandlePurpose,
    ) -> Result<Vec<TurnRecord>, EngineError> {
        self.store.turn_log(workspace, purpose)
    }

    pub fn workspaces(&self) -> &[WorkspaceId] {
        self.store.workspaces()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn is_inert(&self) -> bool {
        self.inert.load(Ordering::SeqCst)
    }

    pub fn is_busy(&self, workspace: &WorkspaceId, channel: Channel) -> bool {
        self.gate.is_busy(workspace, channel)
    }

    pub fn default_ratio(&self) -> AspectRatio {
        self.default_ratio_snapshot()
    }

    /// Change the process-wide default ratio used when a prompt carries no
    /// directive.
    pub fn set_default_ratio(&self, ratio: AspectRatio) {
        let mut guard = match self.default_ratio.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = ratio;
    }

    fn default_ratio_snapshot(&self) -> AspectRatio {
        match self.default_ratio.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Route a submission to its pipeline.
///
/// Precedence matches the channel contract: slash commands only exist in the
/// general channel; every other channel owns exactly one pipeline.
async fn route(
    ctx: &PipelineContext<'_>,
    channel: Channel,
    text: &str,
) -> Result<(), EngineError> {
    match channel {
        Channel::General if text.starts_with('/') => handlers::slash::handle(ctx, text).await,
        Channel::General => handlers::text::handle(ctx, text).await,
        Channel::ImageGenerator => handlers::image_gen::handle(ctx, text).await,
        Channel::LiveVoice => handlers::live_voice::handle(ctx, text).await,
        Channel::CodeReviewer => handlers::code_review::handle(ctx, text).await,
        Channel::ImageEditor => handlers::image_edit::handle(ctx, text).await,
    }
}

// =============================================================================
// Tests
// =============================================================================
