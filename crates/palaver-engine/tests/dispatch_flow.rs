//! End-to-end dispatch tests for the orchestration engine.
//!
//! Drives the full public surface (initialize, submit, upload) against the
//! mock provider, including real concurrent submissions against the
//! single-flight gate. Each test builds an independent engine.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use palaver_audio::{AudioSink, MockAudioSink};
use palaver_core::config::PalaverConfig;
use palaver_core::i18n::Language;
use palaver_core::types::{AspectRatio, Channel, MessageBody, Sender, WorkspaceId};
use palaver_engine::{ChatEngine, NullListener, RejectReason, StateListener, Submission};
use palaver_provider::{
    EditResponse, HandleId, ImageData, ImageOptions, MockProvider, Provider,
    Result as ProviderResult, SpeechOptions,
};

// =============================================================================
// Helpers
// =============================================================================

fn config() -> PalaverConfig {
    let mut config = PalaverConfig::default();
    config.general.language = Language::En;
    config
}

fn first_workspace(config: &PalaverConfig) -> WorkspaceId {
    WorkspaceId::new(config.workspaces[0].id.clone())
}

async fn make_engine(provider: Arc<MockProvider>) -> ChatEngine {
    ChatEngine::initialize(
        &config(),
        provider,
        Arc::new(MockAudioSink::new()),
        Arc::new(NullListener),
    )
    .await
}

/// Provider that parks `conversation_turn` until released, so a dispatch can
/// be held in flight while another submission races it.
struct ParkedProvider {
    inner: MockProvider,
    entered: Notify,
    release: Notify,
}

impl ParkedProvider {
    fn new() -> Self {
        Self {
            inner: MockProvider::new(),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl Provider for ParkedProvider {
    async fn open_conversation(&self, system_instruction: &str) -> ProviderResult<HandleId> {
        self.inner.open_conversation(system_instruction).await
    }

    async fn conversation_turn(&self, handle: HandleId, text: &str) -> ProviderResult<String> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.conversation_turn(handle, text).await
    }

    async fn synthesize_image(
        &self,
        prompt: &str,
        opts: &ImageOptions,
    ) -> ProviderResult<Vec<ImageData>> {
        self.inner.synthesize_image(prompt, opts).await
    }

    async fn edit_image(&self, image: &ImageData, instruction: &str) -> ProviderResult<EditResponse> {
        self.inner.edit_image(image, instruction).await
    }

    async fn synthesize_speech(
        &self,
        text: &str,
        opts: &SpeechOptions,
    ) -> ProviderResult<Option<Vec<u8>>> {
        self.inner.synthesize_speech(text, opts).await
    }
}

// =============================================================================
// Full conversation flows
// =============================================================================

#[tokio::test]
async fn test_multi_turn_chat_accumulates_context() {
    let provider = Arc::new(MockProvider::new());
    let engine = make_engine(Arc::clone(&provider)).await;
    let workspace = first_workspace(&config());

    engine
        .submit(&workspace, Channel::General, "first question")
        .await
        .unwrap();
    engine
        .submit(&workspace, Channel::General, "second question")
        .await
        .unwrap();

    let history = engine.history(&workspace, Channel::General).unwrap();
    assert_eq!(history.len(), 5); // welcome + 2 * (user + reply)

    // The mock's reply index proves both turns went over the same handle.
    let replies: Vec<&str> = history
        .iter()
        .filter(|m| m.sender == Sender::Ai)
        .filter_map(|m| match &m.body {
            MessageBody::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert!(replies.contains(&"re[0]: first question"));
    assert!(replies.contains(&"re[1]: second question"));
}

#[tokio::test]
async fn test_iterative_image_refinement_flow() {
    let provider = Arc::new(MockProvider::new());
    let engine = make_engine(Arc::clone(&provider)).await;
    let workspace = first_workspace(&config());

    engine
        .submit(&workspace, Channel::ImageGenerator, "a lighthouse, landscape")
        .await
        .unwrap();
    engine
        .submit(&workspace, Channel::ImageGenerator, "add a storm")
        .await
        .unwrap();

    // Second refinement saw the first turn.
    let (prompt, _) = provider.last_image_request().unwrap();
    assert_eq!(prompt, "re[1]: add a storm");
    assert_eq!(provider.image_calls(), 2);

    // First image carries the extracted ratio, second the default.
    let history = engine.history(&workspace, Channel::ImageGenerator).unwrap();
    let ratios: Vec<AspectRatio> = history
        .iter()
        .filter_map(|m| match &m.body {
            MessageBody::Image(artifact) => Some(artifact.aspect_ratio),
            _ => None,
        })
        .collect();
    assert_eq!(ratios, vec![AspectRatio::Wide, engine.default_ratio()]);
}

#[tokio::test]
async fn test_upload_edit_and_generate_are_independent_surfaces() {
    let provider = Arc::new(MockProvider::new());
    let engine = make_engine(Arc::clone(&provider)).await;
    let workspace = first_workspace(&config());

    engine
        .upload_image(&workspace, vec![0xAB], "image/png")
        .unwrap();
    engine
        .submit(&workspace, Channel::ImageEditor, "sharpen it")
        .await
        .unwrap();
    engine
        .submit(&workspace, Channel::ImageGenerator, "a harbor")
        .await
        .unwrap();

    assert_eq!(provider.edit_calls(), 1);
    assert_eq!(provider.image_calls(), 1);
    assert_eq!(provider.last_edit_instruction().as_deref(), Some("sharpen it"));

    // The generator result does not disturb the editor's pending image.
    let pending = engine.pending_image(&workspace).unwrap().unwrap();
    assert!(pending.bytes.starts_with(&[0xAB]));
}

#[tokio::test]
async fn test_workspaces_are_fully_isolated() {
    let provider = Arc::new(MockProvider::new());
    let engine = make_engine(Arc::clone(&provider)).await;
    let cfg = config();
    let first = WorkspaceId::new(cfg.workspaces[0].id.clone());
    let second = WorkspaceId::new(cfg.workspaces[1].id.clone());

    engine
        .submit(&first, Channel::General, "hello from first")
        .await
        .unwrap();
    engine
        .upload_image(&first, vec![1], "image/png")
        .unwrap();

    assert_eq!(engine.history(&second, Channel::General).unwrap().len(), 1);
    assert!(engine.pending_image(&second).unwrap().is_none());

    // Conversations are per workspace: the second workspace's turn index
    // starts from zero.
    engine
        .submit(&second, Channel::General, "hello from second")
        .await
        .unwrap();
    let history = engine.history(&second, Channel::General).unwrap();
    assert!(matches!(
        &history[2].body,
        MessageBody::Text(text) if text == "re[0]: hello from second"
    ));
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_concurrent_submission_rejected_while_in_flight() {
    let provider = Arc::new(ParkedProvider::new());
    let engine = Arc::new(
        ChatEngine::initialize(
            &config(),
            Arc::clone(&provider) as Arc<dyn Provider>,
            Arc::new(MockAudioSink::new()) as Arc<dyn AudioSink>,
            Arc::new(NullListener) as Arc<dyn StateListener>,
        )
        .await,
    );
    let cfg = config();
    let first = WorkspaceId::new(cfg.workspaces[0].id.clone());
    let second = WorkspaceId::new(cfg.workspaces[1].id.clone());

    let engine_clone = Arc::clone(&engine);
    let held_workspace = first.clone();
    let in_flight = tokio::spawn(async move {
        engine_clone
            .submit(&held_workspace, Channel::General, "slow turn")
            .await
    });

    // Wait until the first dispatch is parked inside the provider, then race
    // a submission from a different workspace against the global gate.
    provider.entered.notified().await;
    let outcome = engine
        .submit(&second, Channel::General, "racing turn")
        .await
        .unwrap();
    assert_eq!(outcome, Submission::Rejected(RejectReason::Busy));

    provider.release.notify_one();
    let first_outcome = in_flight.await.unwrap().unwrap();
    assert_eq!(first_outcome, Submission::Dispatched);

    // Gate released; the rejected workspace can dispatch now.
    provider.release.notify_one();
    let engine_clone = Arc::clone(&engine);
    let retry = tokio::spawn(async move {
        engine_clone
            .submit(&second, Channel::General, "retry")
            .await
    });
    provider.entered.notified().await;
    let outcome = retry.await.unwrap().unwrap();
    assert_eq!(outcome, Submission::Dispatched);
}

// =============================================================================
// Localization of the whole surface
// =============================================================================

#[tokio::test]
async fn test_spanish_engine_speaks_spanish() {
    let mut cfg = config();
    cfg.general.language = Language::Es;
    let engine = ChatEngine::initialize(
        &cfg,
        Arc::new(MockProvider::new()) as Arc<dyn Provider>,
        Arc::new(MockAudioSink::new()) as Arc<dyn AudioSink>,
        Arc::new(NullListener) as Arc<dyn StateListener>,
    )
    .await;
    let workspace = first_workspace(&cfg);

    engine
        .submit(&workspace, Channel::General, "/traducir")
        .await
        .unwrap();
    let history = engine.history(&workspace, Channel::General).unwrap();
    assert!(matches!(
        history.last().map(|m| &m.body),
        Some(MessageBody::Error(text)) if text.contains("/traducir")
    ));

    engine
        .submit(&workspace, Channel::ImageEditor, "edita esto")
        .await
        .unwrap();
    let history = engine.history(&workspace, Channel::ImageEditor).unwrap();
    assert!(matches!(
        history.last().map(|m| &m.body),
        Some(MessageBody::Error(text)) if text.contains("sube una imagen")
    ));
}
