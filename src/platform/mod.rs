//! Chat platform boundary.
//!
//! The dispatch pipeline only talks to the chat service through
//! [`ChatPlatform`], which keeps command handling testable without a
//! gateway connection.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

pub mod discord;

/// A file attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
}

/// An inbound chat message, reduced to the fields the bot consumes.
#[derive(Debug, Clone, Default)]
pub struct IncomingMessage {
    pub id: u64,
    pub channel_id: u64,
    pub guild_id: Option<u64>,
    pub author_id: u64,
    pub author_name: String,
    pub content: String,
    /// Attachments of the message this one replies to, if it is a reply.
    pub referenced_attachments: Option<Vec<Attachment>>,
}

/// A voice channel the bot can join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceTarget {
    pub guild_id: u64,
    pub channel_id: u64,
}

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Send a text message, returning the id of the created message.
    async fn send_message(&self, channel_id: u64, text: &str) -> Result<u64>;

    /// Replace the text of a message previously sent by the bot.
    async fn edit_message(&self, channel_id: u64, message_id: u64, text: &str) -> Result<()>;

    /// Name of a text channel.
    async fn channel_name(&self, channel_id: u64) -> Result<String>;

    /// Voice channel the user currently occupies in any guild the bot sees.
    ///
    /// This is a point-in-time lookup against live gateway state.
    async fn user_voice_channel(&self, user_id: u64) -> Option<VoiceTarget>;

    /// Look up a voice channel of a guild by its exact name.
    async fn find_voice_channel(&self, guild_id: u64, name: &str) -> Result<VoiceTarget>;

    /// Join the voice channel, play the file to completion and leave.
    async fn play_file(&self, target: VoiceTarget, path: &Path) -> Result<()>;
}

/// Send a message, logging instead of failing when delivery fails.
pub async fn send_or_log(platform: &dyn ChatPlatform, channel_id: u64, text: &str) {
    if let Err(e) = platform.send_message(channel_id, text).await {
        tracing::error!(channel_id, "failed to send message: {}", e);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    use crate::error::Error;

    /// Platform double that records every outbound call.
    #[derive(Default)]
    pub struct RecordingPlatform {
        pub presence: Mutex<HashMap<u64, VoiceTarget>>,
        pub voice_channels: Mutex<HashMap<String, VoiceTarget>>,
        pub channel_names: Mutex<HashMap<u64, String>>,
        pub sent: Mutex<Vec<(u64, String)>>,
        pub edits: Mutex<Vec<(u64, String)>>,
        pub played: Mutex<Vec<(VoiceTarget, PathBuf)>>,
        pub fail_sends: std::sync::atomic::AtomicBool,
        next_id: AtomicU64,
    }

    impl RecordingPlatform {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_user_in_voice(self, user_id: u64, target: VoiceTarget) -> Self {
            self.presence.lock().unwrap().insert(user_id, target);
            self
        }

        pub fn with_voice_channel(self, name: &str, target: VoiceTarget) -> Self {
            self.voice_channels
                .lock()
                .unwrap()
                .insert(name.to_string(), target);
            self
        }

        pub fn with_channel_name(self, channel_id: u64, name: &str) -> Self {
            self.channel_names
                .lock()
                .unwrap()
                .insert(channel_id, name.to_string());
            self
        }

        pub fn sent_texts(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
        }

        pub fn edited_texts(&self) -> Vec<String> {
            self.edits.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
        }

        pub fn played_files(&self) -> Vec<(VoiceTarget, PathBuf)> {
            self.played.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatPlatform for RecordingPlatform {
        async fn send_message(&self, channel_id: u64, text: &str) -> Result<u64> {
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err(Error::Platform("send refused".to_string()));
            }
            self.sent.lock().unwrap().push((channel_id, text.to_string()));
            Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1000)
        }

        async fn edit_message(&self, _channel_id: u64, message_id: u64, text: &str) -> Result<()> {
            self.edits.lock().unwrap().push((message_id, text.to_string()));
            Ok(())
        }

        async fn channel_name(&self, channel_id: u64) -> Result<String> {
            self.channel_names
                .lock()
                .unwrap()
                .get(&channel_id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("channel {}", channel_id)))
        }

        async fn user_voice_channel(&self, user_id: u64) -> Option<VoiceTarget> {
            self.presence.lock().unwrap().get(&user_id).copied()
        }

        async fn find_voice_channel(&self, _guild_id: u64, name: &str) -> Result<VoiceTarget> {
            self.voice_channels
                .lock()
                .unwrap()
                .get(name)
                .copied()
                .ok_or_else(|| {
                    Error::NotFound(format!("failed to find channel with the name {}", name))
                })
        }

        async fn play_file(&self, target: VoiceTarget, path: &Path) -> Result<()> {
            self.played
                .lock()
                .unwrap()
                .push((target, path.to_path_buf()));
            Ok(())
        }
    }
}
