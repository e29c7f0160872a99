//! Channel pipelines.
//!
//! One module per specialized pipeline. Handlers append their own results
//! (including pipeline-specific localized errors) to the session; only
//! failures a pipeline does not claim bubble up to the dispatcher's
//! catch-all.

use palaver_audio::AudioSink;
use palaver_core::i18n::Language;
use palaver_core::types::{AspectRatio, WorkspaceId};
use palaver_provider::Provider;

use crate::store::SessionStore;

pub(crate) mod code_review;
pub(crate) mod image_edit;
pub(crate) mod image_gen;
pub(crate) mod live_voice;
pub(crate) mod slash;
pub(crate) mod text;

/// Everything a pipeline needs for one dispatched turn.
pub(crate) struct PipelineContext<'a> {
    pub store: &'a SessionStore,
    pub provider: &'a dyn Provider,
    pub sink: &'a dyn AudioSink,
    pub language: Language,
    pub workspace: &'a WorkspaceId,
    /// Process-wide default ratio, resolved before dispatch.
    pub default_ratio: AspectRatio,
    pub sample_rate: u32,
    pub channels: usize,
    pub voice: &'a str,
}
