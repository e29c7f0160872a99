//! Plain chat pipeline for the general channel.

use palaver_core::types::{Channel, HandlePurpose, Message};

use crate::error::EngineError;
use crate::handlers::PipelineContext;

/// One turn over the workspace's general conversation. Provider failures
/// propagate to the dispatcher's catch-all.
pub(crate) async fn handle(ctx: &PipelineContext<'_>, text: &str) -> Result<(), EngineError> {
    let handle = ctx.store.handle(ctx.workspace, HandlePurpose::Chat)?;
    let reply = ctx.provider.conversation_turn(handle, text).await?;
    ctx.store
        .record_turn(ctx.workspace, HandlePurpose::Chat, text, &reply)?;
    ctx.store
        .append(ctx.workspace, Channel::General, Message::ai_text(reply))?;
    Ok(())
}
