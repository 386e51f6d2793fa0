//! Text-to-speech generators.
//!
//! Every backend implements [`VoiceGenerator`]; the [`VoiceRegistry`] keeps
//! them in priority order and answers which backend renders a voice.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub mod cache;
pub mod cached;
pub mod elevenlabs;
pub mod tiktok;

pub use cache::AudioCache;

use crate::config::Settings;
use crate::error::Result;

/// Voice used when a speech request names none.
pub const DEFAULT_VOICE: &str = "marcus";

#[async_trait]
pub trait VoiceGenerator: Send + Sync {
    /// Stable backend name.
    fn name(&self) -> &str;

    /// Cache provider directory this backend's audio lives under.
    fn cache_provider(&self) -> &str {
        self.name()
    }

    /// Render the text with the voice and return a playable file.
    async fn generate_speech(&self, text: &str, voice: &str) -> Result<PathBuf>;

    /// Whether the backend can render the (lower-cased) voice id.
    fn supports_voice(&self, voice: &str) -> bool;

    /// Human readable list of supported voices.
    async fn list_supported_voices(&self) -> Result<Vec<String>>;

    /// Refresh a remotely maintained voice catalog.
    async fn refresh_voices(&self) -> Result<()> {
        Ok(())
    }
}

/// Ordered set of voice backends, shared by the builder and the handlers.
#[derive(Clone, Default)]
pub struct VoiceRegistry {
    generators: Vec<Arc<dyn VoiceGenerator>>,
}

impl VoiceRegistry {
    pub fn new(generators: Vec<Arc<dyn VoiceGenerator>>) -> Self {
        Self { generators }
    }

    /// Build the registry from settings: the cache-backed default voice is
    /// always present, remote backends only when credentials are configured.
    pub fn from_settings(settings: &Settings, cache: Arc<AudioCache>) -> Self {
        let mut generators: Vec<Arc<dyn VoiceGenerator>> =
            vec![Arc::new(cached::CachedVoice::new(cache.clone()))];

        let tiktok = &settings.voices.tiktok;
        if let Some(session) = &tiktok.session_id {
            generators.push(Arc::new(tiktok::TikTokVoice::new(
                session.clone(),
                tiktok.endpoint.clone(),
                cache.clone(),
            )));
        }

        let eleven = &settings.voices.elevenlabs;
        match &eleven.api_key {
            Some(key) => generators.push(Arc::new(elevenlabs::ElevenLabsVoice::new(
                key.clone(),
                eleven.base_url.clone(),
                eleven.model_id.clone(),
                settings.voices.catalog_refresh(),
                cache,
            ))),
            None => tracing::warn!("ELEVEN_LABS_API_KEY not set, ElevenLabs voices disabled"),
        }

        Self::new(generators)
    }

    pub fn generators(&self) -> &[Arc<dyn VoiceGenerator>] {
        &self.generators
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Case-insensitive check against every backend.
    pub fn supports_voice(&self, voice: &str) -> bool {
        self.generator_for_voice(voice).is_some()
    }

    /// First backend, in registration order, that renders the voice.
    pub fn generator_for_voice(&self, voice: &str) -> Option<Arc<dyn VoiceGenerator>> {
        let voice = voice.trim().to_lowercase();
        self.generators
            .iter()
            .find(|g| g.supports_voice(&voice))
            .cloned()
    }

    /// Supported voices grouped by backend name. Backends whose listing
    /// fails are skipped.
    pub async fn voices_by_generator(&self) -> Vec<(String, Vec<String>)> {
        let mut grouped = Vec::new();
        for generator in &self.generators {
            match generator.list_supported_voices().await {
                Ok(voices) => grouped.push((generator.name().to_string(), voices)),
                Err(e) => {
                    tracing::error!("failed to list voices for {}: {}", generator.name(), e)
                }
            }
        }
        grouped
    }

    /// Refresh every backend's catalog, logging failures.
    pub async fn refresh_all(&self) {
        for generator in &self.generators {
            if let Err(e) = generator.refresh_voices().await {
                tracing::warn!("failed to refresh voices for {}: {}", generator.name(), e);
            }
        }
    }
}

/// Periodically refresh remote voice catalogs. Backends skip the refresh
/// themselves when their last one is recent enough.
pub fn spawn_catalog_refresher(
    registry: Arc<VoiceRegistry>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            tracing::debug!("refreshing voice catalogs");
            registry.refresh_all().await;
        }
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    use crate::error::Error;

    /// Generator with a fixed voice list that writes nothing and records
    /// every synthesis request.
    pub struct StubVoice {
        pub name: String,
        pub voices: Vec<String>,
        pub output: PathBuf,
        pub requests: Mutex<Vec<(String, String)>>,
    }

    impl StubVoice {
        pub fn new(name: &str, voices: &[&str]) -> Self {
            Self {
                name: name.to_string(),
                voices: voices.iter().map(|v| v.to_string()).collect(),
                output: PathBuf::from(format!("/tmp/{}.wav", name)),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VoiceGenerator for StubVoice {
        fn name(&self) -> &str {
            &self.name
        }

        async fn generate_speech(&self, text: &str, voice: &str) -> Result<PathBuf> {
            if !self.supports_voice(voice) {
                return Err(Error::Voice(format!("unsupported voice: {}", voice)));
            }
            self.requests
                .lock()
                .unwrap()
                .push((text.to_string(), voice.to_string()));
            Ok(self.output.clone())
        }

        fn supports_voice(&self, voice: &str) -> bool {
            self.voices.iter().any(|v| v == voice)
        }

        async fn list_supported_voices(&self) -> Result<Vec<String>> {
            Ok(self.voices.clone())
        }
    }

    pub fn registry(voices: &[&str]) -> VoiceRegistry {
        VoiceRegistry::new(vec![
            Arc::new(StubVoice::new("marcus", &["marcus"])),
            Arc::new(StubVoice::new("stub", voices)),
        ])
    }
}
