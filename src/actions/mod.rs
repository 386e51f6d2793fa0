//! Action handlers.
//!
//! Each handler talks to one external collaborator and reports failures by
//! returning an error; the executor turns that into a single chat reply.

use reqwest::Client;
use std::sync::Arc;

pub mod ask;
pub mod fetch;
pub mod memes;
pub mod speech;
pub mod voices;

use crate::apis::TextSources;
use crate::command::Action;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::memes::MemeIndex;
use crate::platform::{ChatPlatform, IncomingMessage, VoiceTarget};
use crate::voice::{AudioCache, VoiceRegistry};

/// Maximum length of a single chat message.
pub const MESSAGE_LIMIT: usize = 2000;

/// Long-lived collaborators shared by every dispatch.
pub struct Services {
    pub voices: Arc<VoiceRegistry>,
    pub memes: Arc<MemeIndex>,
    pub cache: Arc<AudioCache>,
    pub sources: TextSources,
    pub ask: ask::AskClient,
    pub http: Client,
}

impl Services {
    pub fn from_settings(settings: &Settings) -> Self {
        let http = Client::new();
        let cache = Arc::new(AudioCache::new(settings.paths.audio_dir.clone()));
        let voices = Arc::new(VoiceRegistry::from_settings(settings, cache.clone()));
        let memes = Arc::new(MemeIndex::new(settings.paths.memes_dir.clone()));

        Self {
            voices,
            memes,
            cache,
            sources: TextSources::new(http.clone(), settings.sources.clone()),
            ask: ask::AskClient::new(http.clone(), settings.ask.clone()),
            http,
        }
    }
}

/// Everything a handler needs for one dispatch.
pub struct ActionContext<'a> {
    pub platform: Arc<dyn ChatPlatform>,
    pub services: &'a Services,
    pub message: &'a IncomingMessage,
    pub target_channel: Option<&'a str>,
}

impl ActionContext<'_> {
    /// Reply in the channel the command came from.
    pub async fn reply(&self, text: &str) -> Result<u64> {
        self.platform.send_message(self.message.channel_id, text).await
    }

    /// Reply, splitting text that exceeds the message limit.
    pub async fn reply_long(&self, text: &str) -> Result<()> {
        for chunk in split_message(text, MESSAGE_LIMIT) {
            self.reply(&chunk).await?;
        }
        Ok(())
    }

    /// Voice channel to play into: the named channel when one was given,
    /// otherwise the author's current channel.
    pub async fn voice_target(&self) -> Result<VoiceTarget> {
        if let Some(name) = self.target_channel {
            let guild_id = self.message.guild_id.ok_or_else(|| {
                Error::Platform("channel targets only work inside a server".to_string())
            })?;
            return self
                .platform
                .find_voice_channel(guild_id, name)
                .await
                .map_err(|e| {
                    Error::NotFound(format!(
                        "failed to find voice channel with name '{}': {}",
                        name, e
                    ))
                });
        }

        self.platform
            .user_voice_channel(self.message.author_id)
            .await
            .ok_or(Error::NotInVoice)
    }
}

/// Run the handler bound to the action.
pub async fn run(action: &Action, ctx: &ActionContext<'_>) -> Result<()> {
    match action {
        Action::ListVoices => voices::list_voices(ctx).await,
        Action::Speak { voice, text } => speech::speak_text(ctx, voice, text).await,
        Action::SpeakFetched { voice, source } => fetch::speak_fetched(ctx, voice, *source).await,
        Action::Usage { message } => ctx.reply(message).await.map(|_| ()),
        Action::Ask {
            persona,
            voice,
            question,
        } => ask::answer(ctx, *persona, voice, question).await,
        Action::ListMemes => memes::list_memes(ctx).await,
        Action::AddMeme { name } => memes::add_meme(ctx, name).await,
        Action::PlayMeme { path, .. } => speech::play_file(ctx, path).await,
    }
}

/// Split text into chunks of at most `limit` characters, preferring line
/// breaks.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > limit {
        let window_end = rest
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let cut = match rest[..window_end].rfind('\n') {
            Some(i) if i > 0 => i,
            _ => window_end,
        };
        chunks.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start_matches('\n');
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config;
    use tempfile::TempDir;

    /// Services over a temp directory, stub voices and unreachable remotes.
    pub fn services(temp: &TempDir, voices: VoiceRegistry) -> Services {
        let http = Client::new();
        let cache = Arc::new(AudioCache::new(temp.path().join("audio")));
        let memes = Arc::new(MemeIndex::new(temp.path().join("memes")));
        let unreachable = "http://127.0.0.1:9".to_string();

        let sources = config::Sources {
            insult_url: unreachable.clone(),
            fact_url: unreachable.clone(),
            joke_url: unreachable.clone(),
            slur_url: unreachable.clone(),
            ..Default::default()
        };
        let ask = config::Ask {
            base_url: unreachable,
            ..Default::default()
        };

        Services {
            voices: Arc::new(voices),
            memes,
            cache,
            sources: TextSources::new(http.clone(), sources),
            ask: ask::AskClient::new(http.clone(), ask),
            http,
        }
    }

    pub fn message(content: &str) -> IncomingMessage {
        IncomingMessage {
            id: 1,
            channel_id: 10,
            guild_id: Some(100),
            author_id: 7,
            author_name: "tester".to_string(),
            content: content.to_string(),
            referenced_attachments: None,
        }
    }
}
