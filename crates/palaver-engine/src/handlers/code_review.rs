//! Code review pipeline.

use palaver_core::types::{Channel, HandlePurpose, Message};

use crate::error::EngineError;
use crate::handlers::PipelineContext;

/// One turn over the workspace's review conversation. Provider failures
/// propagate to the dispatcher's catch-all.
pub(crate) async fn handle(ctx: &PipelineContext<'_>, text: &str) -> Result<(), EngineError> {
    let handle = ctx.store.handle(ctx.workspace, HandlePurpose::CodeReview)?;
    let reply = ctx.provider.conversation_turn(handle, text).await?;
    ctx.store
        .record_turn(ctx.workspace, HandlePurpose::CodeReview, text, &reply)?;
    ctx.store
        .append(ctx.workspace, Channel::CodeReviewer, Message::ai_text(reply))?;
    Ok(())
}
