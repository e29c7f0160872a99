//! Two-stage image generation pipeline.
//!
//! Stage one refines the prompt over the workspace's stateful refiner
//! conversation; stage two synthesizes exactly one image at the resolved
//! aspect ratio. The ratio comes from an in-prompt directive when present,
//! otherwise from the process-wide default.

use palaver_core::i18n::{self, MessageKey};
use palaver_core::types::{Channel, HandlePurpose, ImageArtifact, Message};
use palaver_provider::ImageOptions;

use crate::error::EngineError;
use crate::handlers::PipelineContext;
use crate::ratio::extract_aspect_ratio;

pub(crate) async fn handle(ctx: &PipelineContext<'_>, text: &str) -> Result<(), EngineError> {
    match generate(ctx, text).await {
        Ok(()) => Ok(()),
        // Provider failures stay in this channel; no retry.
        Err(EngineError::Provider(e)) => ctx.store.append(
            ctx.workspace,
            Channel::ImageGenerator,
            Message::ai_error(e.to_string()),
        ),
        Err(other) => Err(other),
    }
}

async fn generate(ctx: &PipelineContext<'_>, text: &str) -> Result<(), EngineError> {
    let (prompt, detected) = extract_aspect_ratio(text);
    let ratio = detected.unwrap_or(ctx.default_ratio);

    let handle = ctx.store.handle(ctx.workspace, HandlePurpose::ImageRefiner)?;
    let refined = ctx.provider.conversation_turn(handle, &prompt).await?;
    ctx.store
        .record_turn(ctx.workspace, HandlePurpose::ImageRefiner, &prompt, &refined)?;

    let opts = ImageOptions {
        aspect_ratio: ratio,
        ..ImageOptions::default()
    };
    let images = ctx.provider.synthesize_image(&refined, &opts).await?;

    match images.into_iter().next() {
        Some(image) => ctx.store.append(
            ctx.workspace,
            Channel::ImageGenerator,
            Message::ai_image(ImageArtifact {
                bytes: image.bytes,
                mime_type: image.mime_type,
                aspect_ratio: ratio,
            }),
        ),
        None => ctx.store.append(
            ctx.workspace,
            Channel::ImageGenerator,
            Message::ai_error(i18n::text(ctx.language, MessageKey::NoImageFromModel)),
        ),
    }
}
