//! Error types for the orchestration engine.

use palaver_audio::AudioError;
use palaver_core::error::PalaverError;
use palaver_core::types::WorkspaceId;
use palaver_provider::ProviderError;

/// Errors from the dispatch engine.
///
/// Provider and audio failures are surfaced to the user as in-session
/// messages; `UnknownWorkspace` is a programming-error class failure and is
/// never rendered as chat content.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown workspace: {0}")]
    UnknownWorkspace(WorkspaceId),
    #[error("storage error: {0}")]
    Storage(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Audio(#[from] AudioError),
}

impl From<EngineError> for PalaverError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Provider(e) => PalaverError::Provider(e.to_string()),
            EngineError::Audio(e) => PalaverError::Audio(e.to_string()),
            other => PalaverError::Engine(other.to_string()),
        }
    }
}
