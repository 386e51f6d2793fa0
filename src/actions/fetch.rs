//! Fetch a text from a remote source, echo it and speak it.

use super::speech::speak_text;
use super::ActionContext;
use crate::command::FetchSource;
use crate::error::Result;
use crate::platform::send_or_log;
use crate::voice::DEFAULT_VOICE;

pub const SLUR_REFUSAL: &str = "I can't say slurs in general anymore :x:";
pub const SLUR_UNCACHED: &str = "\nUnfortunately we can't generate a voice message for this slur :cry:";

pub async fn speak_fetched(ctx: &ActionContext<'_>, voice: &str, source: FetchSource) -> Result<()> {
    let sources = &ctx.services.sources;
    let text = match source {
        FetchSource::Insult => sources.insult().await?,
        FetchSource::Fact => sources.fact().await?,
        FetchSource::Joke => sources.joke().await?,
        FetchSource::Slur => return say_slur(ctx, voice).await,
    };

    send_or_log(
        ctx.platform.as_ref(),
        ctx.message.channel_id,
        &format!("```\n{}\n```", text),
    )
    .await;
    speak_text(ctx, voice, &text).await
}

/// Post a random slur and play it only when a rendition is already cached.
async fn say_slur(ctx: &ActionContext<'_>, voice: &str) -> Result<()> {
    let restricted = ctx.services.sources.restricted_channel();
    match ctx.platform.channel_name(ctx.message.channel_id).await {
        Ok(name) if name.eq_ignore_ascii_case(restricted) => {
            tracing::info!(channel = %name, "refusing to say a slur");
            ctx.reply(SLUR_REFUSAL).await?;
            return Ok(());
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("failed to resolve channel name: {}", e),
    }

    let slur = ctx.services.sources.random_slur().await?;
    let content = slur.describe();
    tracing::info!("{}", content);

    let provider = ctx
        .services
        .voices
        .generator_for_voice(voice)
        .map(|g| g.cache_provider().to_string())
        .unwrap_or_else(|| DEFAULT_VOICE.to_string());

    let mut text = format!("||```\n{}\n```||", content);
    match ctx.services.cache.lookup(&provider, voice, &content) {
        Some(path) => {
            let target = ctx.voice_target().await?;
            ctx.reply(&text).await?;
            return ctx.platform.play_file(target, &path).await;
        }
        None => text.push_str(SLUR_UNCACHED),
    }
    ctx.reply(&text).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::{message, services};
    use crate::error::Error;
    use crate::platform::testing::RecordingPlatform;
    use crate::voice::testing::registry;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_slur_refused_in_restricted_channel() {
        let temp = TempDir::new().unwrap();
        let services = services(&temp, registry(&[]));
        let platform = Arc::new(RecordingPlatform::new().with_channel_name(10, "General"));
        let msg = message("!marcus-slur");
        let ctx = ActionContext {
            platform: platform.clone(),
            services: &services,
            message: &msg,
            target_channel: None,
        };

        speak_fetched(&ctx, "marcus", FetchSource::Slur).await.unwrap();
        assert_eq!(platform.sent_texts(), vec![SLUR_REFUSAL.to_string()]);
        assert!(platform.played_files().is_empty());
    }

    #[tokio::test]
    async fn test_source_failure_is_returned() {
        let temp = TempDir::new().unwrap();
        let services = services(&temp, registry(&[]));
        let platform = Arc::new(RecordingPlatform::new());
        let msg = message("!marcus-fact");
        let ctx = ActionContext {
            platform: platform.clone(),
            services: &services,
            message: &msg,
            target_channel: None,
        };

        let err = speak_fetched(&ctx, "marcus", FetchSource::Fact)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_) | Error::Api(_)));
        assert!(platform.sent_texts().is_empty());
    }
}
