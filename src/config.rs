//! Configuration loading for Marcus.
//!
//! Settings are read from `~/.marcus/settings.json` when it exists and then
//! overridden by environment variables, so a bare environment is enough to
//! run the bot.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Get the Marcus home directory (~/.marcus).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".marcus"))
}

/// Get the settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from ~/.marcus/settings.json and apply environment overrides.
pub fn load_settings() -> Result<Settings> {
    let path = get_settings_path()?;

    let mut settings = if path.exists() {
        let content = std::fs::read_to_string(&path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        tracing::debug!("Loaded settings from {}", path.display());
        settings
    } else {
        tracing::debug!("No settings file at {}, using defaults", path.display());
        Settings::default()
    };

    settings.apply_env(|key| std::env::var(key).ok());
    validate_settings(&settings)?;

    Ok(settings)
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.memes.refresh_interval_secs == 0 {
        return Err(Error::Config(
            "memes.refresh_interval_secs must be greater than zero".to_string(),
        ));
    }
    if settings.voices.catalog_refresh_secs == 0 {
        return Err(Error::Config(
            "voices.catalog_refresh_secs must be greater than zero".to_string(),
        ));
    }
    if settings.ask.thinking_tick_secs == 0 {
        return Err(Error::Config(
            "ask.thinking_tick_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Discord connection configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Discord {
    pub bot_token: Option<String>,
}

impl Discord {
    /// The bot token, required to open the gateway.
    pub fn require_token(&self) -> Result<&str> {
        self.bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "please provide DISCORD_BOT_TOKEN in the environment variables".to_string(),
                )
            })
    }
}

/// Filesystem locations.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Paths {
    #[serde(default = "default_memes_dir")]
    pub memes_dir: PathBuf,
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,
}

fn default_memes_dir() -> PathBuf {
    PathBuf::from("memes")
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from(".").join("audio")
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            memes_dir: default_memes_dir(),
            audio_dir: default_audio_dir(),
        }
    }
}

/// Meme index configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Memes {
    #[serde(default = "default_meme_refresh")]
    pub refresh_interval_secs: u64,
}

fn default_meme_refresh() -> u64 {
    10
}

impl Default for Memes {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_meme_refresh(),
        }
    }
}

impl Memes {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// ElevenLabs provider configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ElevenLabs {
    pub api_key: Option<String>,
    #[serde(default = "default_elevenlabs_url")]
    pub base_url: String,
    #[serde(default = "default_elevenlabs_model")]
    pub model_id: String,
}

fn default_elevenlabs_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_elevenlabs_model() -> String {
    "eleven_v3".to_string()
}

impl Default for ElevenLabs {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_elevenlabs_url(),
            model_id: default_elevenlabs_model(),
        }
    }
}

/// TikTok provider configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TikTok {
    pub session_id: Option<String>,
    #[serde(default = "default_tiktok_url")]
    pub endpoint: String,
}

fn default_tiktok_url() -> String {
    "https://api16-normal-useast5.us.tiktokv.com/media/api/text/speech/invoke/".to_string()
}

impl Default for TikTok {
    fn default() -> Self {
        Self {
            session_id: None,
            endpoint: default_tiktok_url(),
        }
    }
}

/// Voice generator configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Voices {
    #[serde(default = "default_catalog_refresh")]
    pub catalog_refresh_secs: u64,
    #[serde(default)]
    pub elevenlabs: ElevenLabs,
    #[serde(default)]
    pub tiktok: TikTok,
}

fn default_catalog_refresh() -> u64 {
    600
}

impl Default for Voices {
    fn default() -> Self {
        Self {
            catalog_refresh_secs: default_catalog_refresh(),
            elevenlabs: ElevenLabs::default(),
            tiktok: TikTok::default(),
        }
    }
}

impl Voices {
    pub fn catalog_refresh(&self) -> Duration {
        Duration::from_secs(self.catalog_refresh_secs)
    }
}

/// Model question configuration (OpenRouter).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Ask {
    pub api_key: Option<String>,
    #[serde(default = "default_openrouter_url")]
    pub base_url: String,
    #[serde(default = "default_persona_model")]
    pub persona_model: String,
    #[serde(default = "default_general_model")]
    pub general_model: String,
    #[serde(default = "default_thinking_tick")]
    pub thinking_tick_secs: u64,
    #[serde(default = "default_thinking_ceiling")]
    pub thinking_ceiling_secs: u64,
}

fn default_openrouter_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_persona_model() -> String {
    "tngtech/deepseek-r1t2-chimera:free".to_string()
}

fn default_general_model() -> String {
    "google/gemma-3n-e2b-it:free".to_string()
}

fn default_thinking_tick() -> u64 {
    3
}

fn default_thinking_ceiling() -> u64 {
    120
}

impl Default for Ask {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openrouter_url(),
            persona_model: default_persona_model(),
            general_model: default_general_model(),
            thinking_tick_secs: default_thinking_tick(),
            thinking_ceiling_secs: default_thinking_ceiling(),
        }
    }
}

/// Endpoints of the text sources used by the fetch-and-speak actions.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Sources {
    #[serde(default = "default_insult_url")]
    pub insult_url: String,
    #[serde(default = "default_fact_url")]
    pub fact_url: String,
    #[serde(default = "default_joke_url")]
    pub joke_url: String,
    #[serde(default = "default_slur_url")]
    pub slur_url: String,
    /// Text channel in which the slur action refuses to run.
    #[serde(default = "default_restricted_channel")]
    pub slur_restricted_channel: String,
}

fn default_insult_url() -> String {
    "https://evilinsult.com/generate_insult.php?lang=en&type=json".to_string()
}

fn default_fact_url() -> String {
    "https://uselessfacts.jsph.pl/api/v2/facts/random".to_string()
}

fn default_joke_url() -> String {
    "https://v2.jokeapi.dev/joke/Miscellaneous,Dark?blacklistFlags=nsfw,religious,political,racist,sexist,explicit&type=single".to_string()
}

fn default_slur_url() -> String {
    "https://gist.githubusercontent.com/Vizdun/0e9d76834d609dde09842be9bab53db7/raw/71116ec3446288aea56bd52a228f54881568844e/rsdb.json".to_string()
}

fn default_restricted_channel() -> String {
    "general".to_string()
}

impl Default for Sources {
    fn default() -> Self {
        Self {
            insult_url: default_insult_url(),
            fact_url: default_fact_url(),
            joke_url: default_joke_url(),
            slur_url: default_slur_url(),
            slur_restricted_channel: default_restricted_channel(),
        }
    }
}

/// Marcus settings.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Settings {
    #[serde(default)]
    pub discord: Discord,

    #[serde(default)]
    pub paths: Paths,

    #[serde(default)]
    pub memes: Memes,

    #[serde(default)]
    pub voices: Voices,

    #[serde(default)]
    pub ask: Ask,

    #[serde(default)]
    pub sources: Sources,
}

impl Settings {
    /// Apply environment overrides using the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("DISCORD_BOT_TOKEN") {
            self.discord.bot_token = Some(token);
        }
        if let Some(key) = get("ELEVEN_LABS_API_KEY") {
            self.voices.elevenlabs.api_key = Some(key);
        }
        if let Some(key) = get("OPEN_ROUTER_KEY") {
            self.ask.api_key = Some(key);
        }
        if let Some(session) = get("TIKTOK_SESSION_ID").or_else(|| get("magic_key")) {
            self.voices.tiktok.session_id = Some(session);
        }
        if let Some(dir) = get("MEMES_LOCATION") {
            self.paths.memes_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("AUDIO_DIR") {
            self.paths.audio_dir = PathBuf::from(dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_bot_behavior() {
        let settings = Settings::default();
        assert_eq!(settings.paths.memes_dir, PathBuf::from("memes"));
        assert_eq!(settings.memes.refresh_interval(), Duration::from_secs(10));
        assert_eq!(settings.voices.catalog_refresh(), Duration::from_secs(600));
        assert_eq!(settings.ask.thinking_ceiling_secs, 120);
        assert!(settings.discord.require_token().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DISCORD_BOT_TOKEN", "token"),
            ("MEMES_LOCATION", "/srv/memes"),
            ("AUDIO_DIR", "/srv/audio"),
            ("magic_key", "session"),
            ("OPEN_ROUTER_KEY", "  "),
        ]);

        let mut settings = Settings::default();
        settings.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(settings.discord.require_token().unwrap(), "token");
        assert_eq!(settings.paths.memes_dir, PathBuf::from("/srv/memes"));
        assert_eq!(settings.paths.audio_dir, PathBuf::from("/srv/audio"));
        assert_eq!(settings.voices.tiktok.session_id.as_deref(), Some("session"));
        assert!(settings.ask.api_key.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"memes": {"refresh_interval_secs": 30}}"#).unwrap();
        assert_eq!(settings.memes.refresh_interval_secs, 30);
        assert_eq!(settings.ask.general_model, "google/gemma-3n-e2b-it:free");
        assert!(validate_settings(&settings).is_ok());

        let mut broken = settings.clone();
        broken.voices.catalog_refresh_secs = 0;
        assert!(validate_settings(&broken).is_err());
    }
}
