//! Speech and clip playback.

use std::path::{Path, PathBuf};

use super::{ActionContext, Services};
use crate::error::{Error, Result};

/// Resolve the playback target, render the text and play it.
pub async fn speak_text(ctx: &ActionContext<'_>, voice: &str, text: &str) -> Result<()> {
    let target = ctx.voice_target().await?;
    let path = synthesize(ctx.services, voice, text).await?;
    ctx.platform.play_file(target, &path).await
}

/// A playable file for the text in the voice, reusing cached audio.
pub async fn synthesize(services: &Services, voice: &str, text: &str) -> Result<PathBuf> {
    let generator = services.voices.generator_for_voice(voice).ok_or_else(|| {
        Error::Voice(format!("failed to find TTS generator for voice '{}'", voice))
    })?;

    if let Some(path) = services.cache.lookup(generator.cache_provider(), voice, text) {
        tracing::info!(voice, generator = generator.name(), "using cached TTS");
        return Ok(path);
    }

    tracing::info!(voice, generator = generator.name(), "TTS not cached, generating");
    generator.generate_speech(text, voice).await
}

/// Play an existing audio file.
pub async fn play_file(ctx: &ActionContext<'_>, path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(Error::NotFound(format!(
            "failed to find file {}",
            path.display()
        )));
    }
    let target = ctx.voice_target().await?;
    ctx.platform.play_file(target, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::{message, services};
    use crate::platform::testing::RecordingPlatform;
    use crate::platform::VoiceTarget;
    use crate::voice::testing::registry;
    use std::sync::Arc;
    use tempfile::TempDir;

    const LOUNGE: VoiceTarget = VoiceTarget {
        guild_id: 100,
        channel_id: 55,
    };

    #[tokio::test]
    async fn test_cached_audio_skips_generation() {
        let temp = TempDir::new().unwrap();
        let services = services(&temp, registry(&["liam"]));
        let cached = services
            .cache
            .store("stub", "liam", "hello there", b"RIFF")
            .unwrap();

        let path = synthesize(&services, "liam", "hello there").await.unwrap();
        assert_eq!(path, cached);

        let path = synthesize(&services, "liam", "something new").await.unwrap();
        assert_eq!(path, PathBuf::from("/tmp/stub.wav"));

        let err = synthesize(&services, "bob", "hi").await.unwrap_err();
        assert!(err.to_string().contains("voice 'bob'"));
    }

    #[tokio::test]
    async fn test_speak_plays_into_author_channel() {
        let temp = TempDir::new().unwrap();
        let services = services(&temp, registry(&["liam"]));
        let platform = Arc::new(RecordingPlatform::new().with_user_in_voice(7, LOUNGE));
        let msg = message("v!liam hi");
        let ctx = ActionContext {
            platform: platform.clone(),
            services: &services,
            message: &msg,
            target_channel: None,
        };

        speak_text(&ctx, "liam", "hi").await.unwrap();
        assert_eq!(
            platform.played_files(),
            vec![(LOUNGE, PathBuf::from("/tmp/stub.wav"))]
        );
    }

    #[tokio::test]
    async fn test_missing_clip_is_reported() {
        let temp = TempDir::new().unwrap();
        let services = services(&temp, registry(&[]));
        let platform = Arc::new(RecordingPlatform::new().with_user_in_voice(7, LOUNGE));
        let msg = message("!gone");
        let ctx = ActionContext {
            platform: platform.clone(),
            services: &services,
            message: &msg,
            target_channel: None,
        };

        let err = play_file(&ctx, &temp.path().join("gone.wav")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(platform.played_files().is_empty());
    }
}
