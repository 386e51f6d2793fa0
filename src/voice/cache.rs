//! On-disk audio cache for synthesized speech.
//!
//! Layout: `<root>/<provider>/<voice>/<hash>.wav`, where `hash` is the first
//! 12 hex characters of the SHA-256 of the text. Every provider/voice
//! directory carries a `metadata.json` describing its entries.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use crate::error::{Error, Result};

const METADATA_FILE: &str = "metadata.json";
const METADATA_VERSION: &str = "1.0";

/// Metadata for one provider/voice directory.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CacheMetadata {
    pub version: String,
    pub provider: String,
    pub voice: String,
    pub cache_entries: Vec<CacheEntry>,
}

/// A single cached audio file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub hash: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub file_size: u64,
}

impl CacheMetadata {
    fn new(provider: &str, voice: &str) -> Self {
        Self {
            version: METADATA_VERSION.to_string(),
            provider: provider.to_string(),
            voice: voice.to_string(),
            cache_entries: Vec::new(),
        }
    }
}

pub struct AudioCache {
    root: PathBuf,
    metadata_lock: Mutex<()>,
}

/// First 12 hex characters of the SHA-256 of the text.
pub fn text_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(&digest[..6])
}

fn invalid_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).expect("valid regex"))
}

fn repeated_underscores() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_+").expect("valid regex"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Replace characters that are invalid in file names and collapse underscores.
pub fn sanitize_component(name: &str) -> String {
    let replaced = invalid_chars().replace_all(name, "_");
    repeated_underscores().replace_all(&replaced, "_").into_owned()
}

fn directory_component(name: &str) -> String {
    let cleaned = sanitize_component(name.trim()).to_lowercase();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

impl AudioCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            metadata_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn voice_dir(&self, provider: &str, voice: &str) -> PathBuf {
        self.root
            .join(directory_component(provider))
            .join(directory_component(voice))
    }

    /// Deterministic cache path for the text, whether or not it exists yet.
    pub fn path_for(&self, provider: &str, voice: &str, text: &str) -> PathBuf {
        self.voice_dir(provider, voice)
            .join(format!("{}.wav", text_hash(text)))
    }

    /// Flat name used before the hashed layout: spaces become underscores.
    fn legacy_path(&self, text: &str) -> PathBuf {
        let name = text.split(' ').collect::<Vec<_>>().join("_");
        let name = name.strip_suffix('.').unwrap_or(&name);
        // Separators are replaced so the name stays a single component under the root.
        self.root.join(format!("{}.wav", sanitize_component(name)))
    }

    /// Voice-prefixed flat name: `<voice>__<sanitized text>.wav`.
    fn voice_prefixed_path(&self, voice: &str, text: &str) -> PathBuf {
        let base = text.trim();
        let base = base.strip_suffix('.').unwrap_or(base);
        let base = sanitize_component(base);
        let base = whitespace_runs().replace_all(&base, "_");
        let base = base.trim_matches(|c| c == ' ' || c == '.' || c == '_');
        let base = if base.is_empty() { "tts" } else { base };

        let voice = voice.trim();
        let voice = if voice.is_empty() { super::DEFAULT_VOICE } else { voice };

        self.root
            .join(format!("{}__{}.wav", sanitize_component(voice), base))
    }

    /// Find an existing rendition of the text, checking the hashed layout
    /// first and then both legacy names.
    pub fn lookup(&self, provider: &str, voice: &str, text: &str) -> Option<PathBuf> {
        let candidates = [
            self.path_for(provider, voice, text),
            self.legacy_path(text),
            self.voice_prefixed_path(voice, text),
        ];

        let found = candidates.into_iter().find(|p| p.is_file());
        match &found {
            Some(path) => tracing::debug!(path = %path.display(), "found cached audio"),
            None => tracing::debug!(provider, voice, "no cached audio"),
        }
        found
    }

    /// Write synthesized audio into the cache and record it in the metadata.
    pub fn store(&self, provider: &str, voice: &str, text: &str, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self.voice_dir(provider, voice);
        std::fs::create_dir_all(&dir)?;

        let path = self.path_for(provider, voice, text);
        std::fs::write(&path, bytes)?;
        tracing::info!(file = %path.display(), bytes = bytes.len(), "stored synthesized audio");

        // The audio is already usable, a metadata failure only loses bookkeeping.
        if let Err(e) = self.record(provider, voice, text, bytes.len() as u64) {
            tracing::warn!("failed to update cache metadata: {}", e);
        }

        Ok(path)
    }

    /// Read the metadata of a provider/voice directory.
    pub fn metadata(&self, provider: &str, voice: &str) -> Result<CacheMetadata> {
        let path = self.voice_dir(provider, voice).join(METADATA_FILE);
        if !path.exists() {
            return Ok(CacheMetadata::new(provider, voice));
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn record(&self, provider: &str, voice: &str, text: &str, size: u64) -> Result<()> {
        let _guard = self
            .metadata_lock
            .lock()
            .map_err(|_| Error::other("cache metadata lock poisoned"))?;

        let mut metadata = match self.metadata(provider, voice) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("unreadable cache metadata, starting fresh: {}", e);
                CacheMetadata::new(provider, voice)
            }
        };

        let hash = text_hash(text);
        metadata.cache_entries.retain(|e| e.hash != hash);
        metadata.cache_entries.push(CacheEntry {
            hash,
            text: text.to_string(),
            created_at: Utc::now(),
            file_size: size,
        });

        let path = self.voice_dir(provider, voice).join(METADATA_FILE);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&metadata)?)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}
