//! Voice channel pipeline.
//!
//! The text reply lands first and stands on its own; speech synthesis and
//! playback run after it and can only add a distinct error message, never
//! retract the reply. Absent audio is a diagnostic, not a failure.

use tracing::warn;

use palaver_audio::decode_pcm16;
use palaver_core::i18n::{self, MessageKey};
use palaver_core::types::{Channel, HandlePurpose, Message};
use palaver_provider::SpeechOptions;

use crate::error::EngineError;
use crate::handlers::PipelineContext;

pub(crate) async fn handle(ctx: &PipelineContext<'_>, text: &str) -> Result<(), EngineError> {
    let prefix = i18n::text(ctx.language, MessageKey::LiveResponseErrorPrefix);

    let handle = ctx.store.handle(ctx.workspace, HandlePurpose::Chat)?;
    let reply = match ctx.provider.conversation_turn(handle, text).await {
        Ok(reply) => reply,
        // A failed text turn ends the whole turn; no speech attempt.
        Err(e) => {
            ctx.store.append(
                ctx.workspace,
                Channel::LiveVoice,
                Message::ai_error(format!("{prefix}{e}")),
            )?;
            return Ok(());
        }
    };
    ctx.store
        .record_turn(ctx.workspace, HandlePurpose::Chat, text, &reply)?;
    ctx.store.append(
        ctx.workspace,
        Channel::LiveVoice,
        Message::ai_text(reply.clone()),
    )?;

    let opts = SpeechOptions {
        voice: ctx.voice.to_string(),
    };
    match ctx.provider.synthesize_speech(&reply, &opts).await {
        Ok(Some(pcm)) => {
            let buffer = decode_pcm16(&pcm, ctx.sample_rate, ctx.channels);
            if let Err(e) = ctx.sink.play(&buffer) {
                ctx.store.append(
                    ctx.workspace,
                    Channel::LiveVoice,
                    Message::ai_error(format!("{prefix}{e}")),
                )?;
            }
        }
        Ok(None) => {
            warn!("speech synthesis returned no audio; text reply stands");
        }
        Err(e) => {
            ctx.store.append(
                ctx.workspace,
                Channel::LiveVoice,
                Message::ai_error(format!("{prefix}{e}")),
            )?;
        }
    }
    Ok(())
}
