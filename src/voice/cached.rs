//! Cache-only generator for the default voice.
//!
//! The default voice has no live synthesis backend any more; it can only
//! replay phrases that were rendered in the past.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::{AudioCache, VoiceGenerator, DEFAULT_VOICE};
use crate::error::{Error, Result};

pub struct CachedVoice {
    cache: Arc<AudioCache>,
}

impl CachedVoice {
    pub fn new(cache: Arc<AudioCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl VoiceGenerator for CachedVoice {
    fn name(&self) -> &str {
        DEFAULT_VOICE
    }

    async fn generate_speech(&self, text: &str, voice: &str) -> Result<PathBuf> {
        let path = self
            .cache
            .lookup(self.cache_provider(), voice, text)
            .ok_or_else(|| {
                Error::Voice(format!("cached file not found for voice '{}'", voice))
            })?;
        tracing::info!(file = %path.display(), voice, "found cached TTS file");
        Ok(path)
    }

    fn supports_voice(&self, voice: &str) -> bool {
        voice.trim().eq_ignore_ascii_case(DEFAULT_VOICE)
    }

    async fn list_supported_voices(&self) -> Result<Vec<String>> {
        Ok(vec![DEFAULT_VOICE.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_only_replays_cached_phrases() {
        let temp = TempDir::new().unwrap();
        let cache = Arc::new(AudioCache::new(temp.path()));
        let voice = CachedVoice::new(cache.clone());

        assert!(voice.supports_voice("Marcus"));
        assert!(!voice.supports_voice("liam"));
        assert!(voice.generate_speech("never said", "marcus").await.is_err());

        let stored = cache.store("marcus", "marcus", "said before", b"RIFF").unwrap();
        assert_eq!(
            voice.generate_speech("said before", "marcus").await.unwrap(),
            stored
        );
    }
}
