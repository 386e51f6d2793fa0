//! Discord adapter.
//!
//! The gateway connection and text channel calls go through serenity;
//! voice playback goes through songbird. Serenity runs the message handler
//! on its own task per event.

use async_trait::async_trait;
use serenity::all::{
    ChannelId, ChannelType, Context, EditMessage, EventHandler, GatewayIntents, GuildId, Message,
    MessageId, Ready, UserId,
};
use serenity::cache::Cache;
use serenity::http::Http;
use serenity::Client;
use songbird::events::{Event, EventContext, TrackEvent};
use songbird::{EventHandler as VoiceEventHandler, SerenityInit, Songbird};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use super::{Attachment, ChatPlatform, IncomingMessage, VoiceTarget};
use crate::actions::Services;
use crate::command::Executor;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::{memes, voice};

/// Longest a single clip may hold the voice connection.
const PLAYBACK_CEILING: Duration = Duration::from_secs(600);

/// Live Discord state needed by the dispatch pipeline.
pub struct DiscordPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
    songbird: Arc<Songbird>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>, songbird: Arc<Songbird>) -> Self {
        Self {
            http,
            cache,
            songbird,
        }
    }
}

fn platform_error(context: &str, e: serenity::Error) -> Error {
    Error::Platform(format!("{}: {}", context, e))
}

/// Wakes the player once its track stops, for any reason.
struct TrackFinished(Arc<Notify>);

#[async_trait]
impl VoiceEventHandler for TrackFinished {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        self.0.notify_one();
        None
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn send_message(&self, channel_id: u64, text: &str) -> Result<u64> {
        let sent = ChannelId::new(channel_id)
            .say(&*self.http, text)
            .await
            .map_err(|e| platform_error("failed to send message", e))?;
        Ok(sent.id.get())
    }

    async fn edit_message(&self, channel_id: u64, message_id: u64, text: &str) -> Result<()> {
        ChannelId::new(channel_id)
            .edit_message(
                &*self.http,
                MessageId::new(message_id),
                EditMessage::new().content(text),
            )
            .await
            .map_err(|e| platform_error("failed to edit message", e))?;
        Ok(())
    }

    async fn channel_name(&self, channel_id: u64) -> Result<String> {
        let channel = ChannelId::new(channel_id)
            .to_channel(&*self.http)
            .await
            .map_err(|e| platform_error("failed to fetch channel", e))?;
        channel
            .guild()
            .map(|c| c.name)
            .ok_or_else(|| Error::NotFound(format!("channel {} is not a server channel", channel_id)))
    }

    async fn user_voice_channel(&self, user_id: u64) -> Option<VoiceTarget> {
        let user_id = UserId::new(user_id);
        for guild_id in self.cache.guilds() {
            let Some(guild) = self.cache.guild(guild_id) else {
                continue;
            };
            let channel = guild
                .voice_states
                .get(&user_id)
                .and_then(|state| state.channel_id);
            if let Some(channel) = channel {
                return Some(VoiceTarget {
                    guild_id: guild_id.get(),
                    channel_id: channel.get(),
                });
            }
        }
        None
    }

    async fn find_voice_channel(&self, guild_id: u64, name: &str) -> Result<VoiceTarget> {
        let channels = GuildId::new(guild_id)
            .channels(&*self.http)
            .await
            .map_err(|e| platform_error("failed to list channels", e))?;

        channels
            .values()
            .find(|c| c.kind == ChannelType::Voice && c.name == name)
            .map(|c| VoiceTarget {
                guild_id,
                channel_id: c.id.get(),
            })
            .ok_or_else(|| Error::NotFound(format!("failed to find channel with the name {}", name)))
    }

    async fn play_file(&self, target: VoiceTarget, path: &Path) -> Result<()> {
        let guild_id = GuildId::new(target.guild_id);
        let call = self
            .songbird
            .join(guild_id, ChannelId::new(target.channel_id))
            .await
            .map_err(|e| Error::Platform(format!("failed to join voice channel: {}", e)))?;

        let finished = Arc::new(Notify::new());
        {
            let mut call = call.lock().await;
            let input = songbird::input::File::new(path.to_path_buf());
            let track = call.play_input(input.into());
            for event in [TrackEvent::End, TrackEvent::Error] {
                if let Err(e) = track.add_event(Event::Track(event), TrackFinished(finished.clone())) {
                    tracing::warn!("failed to watch track: {}", e);
                }
            }
        }
        tracing::info!(file = %path.display(), channel_id = target.channel_id, "playing audio");

        if tokio::time::timeout(PLAYBACK_CEILING, finished.notified())
            .await
            .is_err()
        {
            tracing::warn!(file = %path.display(), "playback did not finish in time, leaving");
        }

        if let Err(e) = self.songbird.remove(guild_id).await {
            tracing::warn!("failed to leave voice channel: {}", e);
        }
        Ok(())
    }
}

/// Reduce a gateway message to the fields the bot consumes.
fn to_incoming(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        id: msg.id.get(),
        channel_id: msg.channel_id.get(),
        guild_id: msg.guild_id.map(|g| g.get()),
        author_id: msg.author.id.get(),
        author_name: msg.author.name.clone(),
        content: msg.content.clone(),
        referenced_attachments: msg.referenced_message.as_ref().map(|referenced| {
            referenced
                .attachments
                .iter()
                .map(|a| Attachment {
                    filename: a.filename.clone(),
                    url: a.url.clone(),
                })
                .collect()
        }),
    }
}

struct Handler {
    services: Arc<Services>,
    songbird: Arc<Songbird>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let platform = Arc::new(DiscordPlatform::new(
            ctx.http.clone(),
            ctx.cache.clone(),
            self.songbird.clone(),
        ));
        let executor = Executor::new(platform, self.services.clone());
        let outcome = executor.handle_message(&to_incoming(&msg)).await;
        tracing::debug!(message_id = msg.id.get(), ?outcome, "handled message");
    }

    async fn ready(&self, _: Context, ready: Ready) {
        tracing::info!("{} is connected!", ready.user.name);
    }
}

/// Start background refreshers and run the gateway until shutdown.
pub async fn run_bot(settings: Settings) -> anyhow::Result<()> {
    let token = settings.discord.require_token()?.to_string();
    let services = Arc::new(Services::from_settings(&settings));

    match services.memes.rebuild() {
        Ok(count) => tracing::info!(count, "built meme set"),
        Err(e) => tracing::error!("failed to build meme set: {}", e),
    }
    memes::spawn_refresher(services.memes.clone(), settings.memes.refresh_interval());
    voice::spawn_catalog_refresher(services.voices.clone(), settings.voices.catalog_refresh());

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::MESSAGE_CONTENT;

    let songbird = Songbird::serenity();
    let mut client = Client::builder(&token, intents)
        .event_handler(Handler {
            services,
            songbird: songbird.clone(),
        })
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down");
            shard_manager.shutdown_all().await;
        }
    });

    tracing::info!("Starting Discord bot...");
    if let Err(why) = client.start().await {
        tracing::error!("Client error: {:?}", why);
        anyhow::bail!("Discord client error: {:?}", why);
    }
    Ok(())
}
