//! Slash-command pipeline for the general channel.

use palaver_core::i18n::{self, MessageKey};
use palaver_core::types::{Channel, HandlePurpose, Message};

use crate::command::{parse_slash_command, ParsedCommand};
use crate::error::EngineError;
use crate::handlers::PipelineContext;

/// Parse and execute a `/`-prefixed submission.
///
/// Invalid commands are answered locally without a provider call; a valid
/// command's expanded prompt goes over the general conversation, and provider
/// failures propagate to the dispatcher's catch-all.
pub(crate) async fn handle(ctx: &PipelineContext<'_>, text: &str) -> Result<(), EngineError> {
    match parse_slash_command(text) {
        ParsedCommand::Valid(command) => {
            let prompt = command.prompt();
            let handle = ctx.store.handle(ctx.workspace, HandlePurpose::Chat)?;
            let reply = ctx.provider.conversation_turn(handle, &prompt).await?;
            ctx.store
                .record_turn(ctx.workspace, HandlePurpose::Chat, &prompt, &reply)?;
            ctx.store
                .append(ctx.workspace, Channel::General, Message::ai_text(reply))?;
        }
        ParsedCommand::Usage(key) => {
            ctx.store.append(
                ctx.workspace,
                Channel::General,
                Message::ai_error(i18n::text(ctx.language, key)),
            )?;
        }
        ParsedCommand::Redirect => {
            // Redirect reads as an ordinary reply, not an error.
            ctx.store.append(
                ctx.workspace,
                Channel::General,
                Message::ai_text(i18n::text(ctx.language, MessageKey::ImagineRedirect)),
            )?;
        }
        ParsedCommand::Unknown(verb) => {
            let prefix = i18n::text(ctx.language, MessageKey::UnknownCommandPrefix);
            ctx.store.append(
                ctx.workspace,
                Channel::General,
                Message::ai_error(format!("{prefix}/{verb}")),
            )?;
        }
    }
    Ok(())
}
