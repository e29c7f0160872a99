//! Chained image editing pipeline.
//!
//! Requires a pending image (from an upload or a prior successful edit).
//! Each successful edit overwrites the pending image, so edits chain without
//! re-uploading. A blocked or imageless response leaves the pending image
//! untouched.

use tracing::error;

use palaver_core::i18n::{self, MessageKey};
use palaver_core::types::{
    AspectRatio, Channel, ImageArtifact, Message, PendingImage,
};
use palaver_provider::ImageData;

use crate::error::EngineError;
use crate::handlers::PipelineContext;

pub(crate) async fn handle(ctx: &PipelineContext<'_>, text: &str) -> Result<(), EngineError> {
    let Some(pending) = ctx.store.pending_image(ctx.workspace)? else {
        ctx.store.append(
            ctx.workspace,
            Channel::ImageEditor,
            Message::ai_error(i18n::text(ctx.language, MessageKey::UploadImageFirst)),
        )?;
        return Ok(());
    };

    match edit(ctx, &pending, text).await {
        Ok(()) => Ok(()),
        Err(EngineError::Provider(e)) => ctx.store.append(
            ctx.workspace,
            Channel::ImageEditor,
            Message::ai_error(e.to_string()),
        ),
        Err(other) => Err(other),
    }
}

async fn edit(
    ctx: &PipelineContext<'_>,
    pending: &PendingImage,
    instruction: &str,
) -> Result<(), EngineError> {
    let source = ImageData {
        bytes: pending.bytes.clone(),
        mime_type: pending.mime_type.clone(),
    };
    let response = ctx.provider.edit_image(&source, instruction).await?;

    let Some(image) = response.first_image().cloned() else {
        if let Some(reason) = &response.block_reason {
            error!(reason = %reason, "image edit blocked by provider");
        }
        ctx.store.append(
            ctx.workspace,
            Channel::ImageEditor,
            Message::ai_error(i18n::text(ctx.language, MessageKey::NoImageInResponse)),
        )?;
        return Ok(());
    };

    // The editing surface does not track a ratio; tag the square placeholder.
    ctx.store.append(
        ctx.workspace,
        Channel::ImageEditor,
        Message::ai_image(ImageArtifact {
            bytes: image.bytes.clone(),
            mime_type: image.mime_type.clone(),
            aspect_ratio: AspectRatio::Square,
        }),
    )?;
    ctx.store.set_pending_image(
        ctx.workspace,
        PendingImage {
            bytes: image.bytes,
            mime_type: image.mime_type,
        },
    )?;
    Ok(())
}
