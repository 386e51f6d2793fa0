//! TikTok text-to-speech generator.
//!
//! Only registered when a session id is configured. Its audio shares the
//! default voice's cache directory.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::{AudioCache, VoiceGenerator, DEFAULT_VOICE};
use crate::error::{Error, Result};

const USER_AGENT: &str = "com.zhiliaoapp.musically/2022600030 (Linux; U; Android 7.1.2; es_ES; SM-G988N; Build/NRD90M;tt-ok/3.12.13.1)";

const SUPPORTED_VOICES: &[(&str, &str)] = &[("en_male_narration", "English Male Narration")];

pub struct TikTokVoice {
    client: Client,
    session_id: String,
    endpoint: String,
    cache: Arc<AudioCache>,
}

#[derive(Deserialize, Default)]
struct SpeechResponse {
    #[serde(default)]
    data: SpeechData,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status_code: i64,
    #[serde(default)]
    status_msg: String,
}

#[derive(Deserialize, Default)]
struct SpeechData {
    #[serde(default)]
    v_str: String,
}

impl SpeechResponse {
    /// Decode the base64 audio payload, or report the API's error.
    fn into_audio(self) -> Result<Vec<u8>> {
        if self.status_code != 0
            && !self.status_msg.eq_ignore_ascii_case("success")
            && self.data.v_str.is_empty()
        {
            tracing::error!(api_message = %self.message, "TTS API reported error");
            return Err(Error::Api(format!(
                "tts api error: code {} message {}",
                self.status_code, self.status_msg
            )));
        }

        base64::engine::general_purpose::STANDARD
            .decode(self.data.v_str.as_bytes())
            .map_err(|e| Error::Api(format!("failed to decode audio data: {}", e)))
    }
}

impl TikTokVoice {
    pub fn new(session_id: String, endpoint: String, cache: Arc<AudioCache>) -> Self {
        Self {
            client: Client::new(),
            session_id,
            endpoint,
            cache,
        }
    }
}

#[async_trait]
impl VoiceGenerator for TikTokVoice {
    fn name(&self) -> &str {
        "tiktok"
    }

    fn cache_provider(&self) -> &str {
        DEFAULT_VOICE
    }

    async fn generate_speech(&self, text: &str, voice: &str) -> Result<PathBuf> {
        tracing::info!(text_speaker = voice, "requesting TikTok TTS generation");

        let response = self
            .client
            .post(&self.endpoint)
            .header("User-Agent", USER_AGENT)
            .header("Cookie", format!("sessionid={}", self.session_id))
            .query(&[
                ("aid", "1233"),
                ("speaker_map_type", "0"),
                ("text_speaker", voice),
                ("req_text", text),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!(
                "tts api returned status {}: {}",
                status, body
            )));
        }

        let parsed: SpeechResponse = response.json().await?;
        let audio = parsed.into_audio()?;
        self.cache.store(self.cache_provider(), voice, text, &audio)
    }

    fn supports_voice(&self, voice: &str) -> bool {
        SUPPORTED_VOICES.iter().any(|(id, _)| *id == voice)
    }

    async fn list_supported_voices(&self) -> Result<Vec<String>> {
        Ok(SUPPORTED_VOICES
            .iter()
            .map(|(id, description)| format!("{} ({})", id, description))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_audio_payload() {
        let response: SpeechResponse = serde_json::from_str(
            r#"{"data": {"v_str": "UklGRg=="}, "message": "success", "status_code": 0, "status_msg": ""}"#,
        )
        .unwrap();
        assert_eq!(response.into_audio().unwrap(), b"RIFF".to_vec());
    }

    #[test]
    fn test_reports_api_error() {
        let response: SpeechResponse = serde_json::from_str(
            r#"{"data": {}, "message": "Couldn't load speech", "status_code": 4, "status_msg": "Invalid session"}"#,
        )
        .unwrap();
        let err = response.into_audio().unwrap_err();
        assert!(err.to_string().contains("Invalid session"));
    }
}
