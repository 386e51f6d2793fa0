//! ElevenLabs HTTP generator.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use super::{AudioCache, VoiceGenerator};
use crate::error::{Error, Result};

pub struct ElevenLabsVoice {
    client: Client,
    api_key: String,
    base_url: String,
    model_id: String,
    refresh_window: Duration,
    cache: Arc<AudioCache>,
    catalog: RwLock<VoiceCatalog>,
}

#[derive(Default)]
struct VoiceCatalog {
    /// Keyed by the lower-cased first word of the display name.
    voices: HashMap<String, CatalogVoice>,
    names: Vec<String>,
    last_checked: Option<Instant>,
}

#[derive(Clone, Debug)]
struct CatalogVoice {
    voice_id: String,
}

#[derive(Deserialize)]
struct VoiceListResponse {
    voices: Vec<VoiceInfo>,
}

#[derive(Deserialize)]
struct VoiceInfo {
    voice_id: String,
    name: String,
}

#[derive(Serialize)]
struct DialogueRequest<'a> {
    inputs: Vec<DialogueInput<'a>>,
    model_id: &'a str,
    settings: DialogueSettings,
}

#[derive(Serialize)]
struct DialogueInput<'a> {
    text: &'a str,
    voice_id: &'a str,
}

#[derive(Serialize)]
struct DialogueSettings {
    stability: f32,
}

/// Catalog key for a display name such as "Liam - Energetic".
fn catalog_key(display_name: &str) -> Option<String> {
    let (first, _) = display_name.split_once(' ')?;
    Some(first.to_lowercase())
}

impl ElevenLabsVoice {
    pub fn new(
        api_key: String,
        base_url: String,
        model_id: String,
        refresh_window: Duration,
        cache: Arc<AudioCache>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model_id,
            refresh_window,
            cache,
            catalog: RwLock::new(VoiceCatalog::default()),
        }
    }

    fn is_fresh(&self) -> bool {
        self.catalog
            .read()
            .ok()
            .and_then(|c| c.last_checked)
            .map(|at| at.elapsed() < self.refresh_window)
            .unwrap_or(false)
    }

    fn voice_entry(&self, voice: &str) -> Option<CatalogVoice> {
        self.catalog.read().ok()?.voices.get(voice).cloned()
    }

    async fn fetch_catalog(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/v2/voices?page_size=100", self.base_url))
            .header("xi-api-key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!(
                "elevenlabs api returned status {}: {}",
                status, text
            )));
        }

        let list: VoiceListResponse = response.json().await?;
        tracing::info!(count = list.voices.len(), "found ElevenLabs voices");

        let mut catalog = VoiceCatalog {
            last_checked: Some(Instant::now()),
            ..Default::default()
        };
        for voice in list.voices {
            match catalog_key(&voice.name) {
                Some(key) => {
                    catalog.voices.insert(
                        key,
                        CatalogVoice {
                            voice_id: voice.voice_id,
                        },
                    );
                }
                None => tracing::info!(voice = %voice.name, "no space in voice name, skipping voice"),
            }
            catalog.names.push(voice.name);
        }

        let mut guard = self
            .catalog
            .write()
            .map_err(|_| Error::other("voice catalog lock poisoned"))?;
        *guard = catalog;
        Ok(())
    }
}

#[async_trait]
impl VoiceGenerator for ElevenLabsVoice {
    fn name(&self) -> &str {
        "elevenlabs"
    }

    async fn generate_speech(&self, text: &str, voice: &str) -> Result<PathBuf> {
        if voice.is_empty() {
            return Err(Error::Voice(
                "must provide a voice, use v!voices to list supported voices".to_string(),
            ));
        }

        let entry = self
            .voice_entry(voice)
            .ok_or_else(|| Error::Voice(format!("unsupported voice: {}", voice)))?;

        tracing::info!(voice, "requesting ElevenLabs TTS generation");

        let request = DialogueRequest {
            inputs: vec![DialogueInput {
                text,
                voice_id: &entry.voice_id,
            }],
            model_id: &self.model_id,
            settings: DialogueSettings { stability: 0.5 },
        };

        let response = self
            .client
            .post(format!("{}/v1/text-to-dialogue", self.base_url))
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, "ElevenLabs API non-2xx");
            return Err(Error::Api(format!(
                "elevenlabs api returned status {}: {}",
                status, body
            )));
        }

        let bytes = response.bytes().await?;
        self.cache.store(self.cache_provider(), voice, text, &bytes)
    }

    fn supports_voice(&self, voice: &str) -> bool {
        self.voice_entry(voice).is_some()
    }

    async fn list_supported_voices(&self) -> Result<Vec<String>> {
        self.refresh_voices().await?;
        let catalog = self
            .catalog
            .read()
            .map_err(|_| Error::other("voice catalog lock poisoned"))?;
        Ok(catalog.names.clone())
    }

    async fn refresh_voices(&self) -> Result<()> {
        if self.is_fresh() {
            return Ok(());
        }
        tracing::info!("refreshing ElevenLabs voice list");
        self.fetch_catalog().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_key_uses_first_word() {
        assert_eq!(catalog_key("Liam - Energetic"), Some("liam".to_string()));
        assert_eq!(catalog_key("Alice Clear"), Some("alice".to_string()));
        assert_eq!(catalog_key("Single"), None);
    }

    #[test]
    fn test_unrefreshed_catalog_supports_nothing() {
        let voice = ElevenLabsVoice::new(
            "key".to_string(),
            "http://localhost/".to_string(),
            "eleven_v3".to_string(),
            Duration::from_secs(600),
            Arc::new(AudioCache::new("/tmp/marcus-audio")),
        );
        assert!(!voice.is_fresh());
        assert!(!voice.supports_voice("liam"));
        assert_eq!(voice.base_url, "http://localhost");
    }

    #[tokio::test]
    async fn test_generate_rejects_unknown_voice_without_request() {
        let voice = ElevenLabsVoice::new(
            "key".to_string(),
            "http://127.0.0.1:9".to_string(),
            "eleven_v3".to_string(),
            Duration::from_secs(600),
            Arc::new(AudioCache::new("/tmp/marcus-audio")),
        );
        let err = voice.generate_speech("hi", "liam").await.unwrap_err();
        assert!(err.to_string().contains("unsupported voice"));
    }
}
