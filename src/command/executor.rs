//! Command executor.
//!
//! Applies the voice-channel gate and invokes the bound action exactly
//! once. Nothing in here panics or propagates an action failure: every
//! failure becomes one chat reply plus a log line.

use std::sync::Arc;
use tracing::Instrument;

use super::{build, Command, Resolution};
use crate::actions::{self, ActionContext, Services};
use crate::error::Error;
use crate::platform::{send_or_log, ChatPlatform, IncomingMessage};

/// Reply sent when a gated command is used outside a voice channel.
pub const VOICE_GATE_MESSAGE: &str = "You must be in a voice channel to use this command.";

/// What happened to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not a command.
    Ignored,
    /// Rejected at parse time and reported.
    ParseError,
    /// Stopped by the voice-channel gate.
    Blocked,
    /// The action ran, successfully or not.
    Executed,
}

#[derive(Clone)]
pub struct Executor {
    platform: Arc<dyn ChatPlatform>,
    services: Arc<Services>,
}

impl Executor {
    pub fn new(platform: Arc<dyn ChatPlatform>, services: Arc<Services>) -> Self {
        Self { platform, services }
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// Build and execute the command for an inbound message.
    pub async fn handle_message(&self, message: &IncomingMessage) -> Outcome {
        let command = build(
            &message.content,
            &self.services.voices,
            &self.services.memes,
        );
        self.execute(&command, message).await
    }

    pub async fn execute(&self, command: &Command, message: &IncomingMessage) -> Outcome {
        let action = match &command.resolution {
            Resolution::Ignored => return Outcome::Ignored,
            Resolution::Failed(e) => {
                tracing::warn!(
                    user = %message.author_name,
                    content = %command.raw_content,
                    "failed to parse command: {}",
                    e
                );
                send_or_log(
                    self.platform.as_ref(),
                    message.channel_id,
                    &format!("Error executing command: {}", e),
                )
                .await;
                return Outcome::ParseError;
            }
            Resolution::Resolved(action) => action,
        };

        let span = tracing::info_span!(
            "dispatch",
            user = %message.author_name,
            guild = ?message.guild_id,
            command = %command.command_name,
            subcommand = %command.subcommand_name,
            target_channel = command.target_channel.as_deref().unwrap_or(""),
            action = action.kind(),
        );

        async {
            if !command.usable_outside_voice_channel
                && self
                    .platform
                    .user_voice_channel(message.author_id)
                    .await
                    .is_none()
            {
                tracing::info!("author not in a voice channel, refusing");
                send_or_log(self.platform.as_ref(), message.channel_id, VOICE_GATE_MESSAGE).await;
                return Outcome::Blocked;
            }

            tracing::info!(content = %command.content, "executing command");
            let ctx = ActionContext {
                platform: self.platform.clone(),
                services: &self.services,
                message,
                target_channel: command.target_channel.as_deref(),
            };

            if let Err(e) = actions::run(action, &ctx).await {
                tracing::error!("{}: {}", action.failure_context(), e);
                let reply = match &e {
                    Error::Usage(text) => text.clone(),
                    Error::NotInVoice => e.to_string(),
                    _ => format!("{}: {}", action.failure_context(), e),
                };
                send_or_log(self.platform.as_ref(), message.channel_id, &reply).await;
            }
            Outcome::Executed
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::{message, services};
    use crate::platform::testing::RecordingPlatform;
    use crate::platform::VoiceTarget;
    use crate::voice::testing::registry;
    use std::path::Path;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    const LOUNGE: VoiceTarget = VoiceTarget {
        guild_id: 100,
        channel_id: 55,
    };
    const STAGE: VoiceTarget = VoiceTarget {
        guild_id: 100,
        channel_id: 66,
    };

    fn setup(platform: RecordingPlatform) -> (TempDir, Arc<RecordingPlatform>, Executor) {
        let temp = TempDir::new().unwrap();
        let services = services(&temp, registry(&["liam"]));
        let root = services.memes.root().to_path_buf();
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("airhorn.wav"), b"RIFF").unwrap();
        services.memes.rebuild().unwrap();

        let platform = Arc::new(platform);
        let executor = Executor::new(platform.clone(), Arc::new(services));
        (temp, platform, executor)
    }

    #[tokio::test]
    async fn test_plain_chat_is_silent() {
        let (_temp, platform, executor) = setup(RecordingPlatform::new());
        assert_eq!(
            executor.handle_message(&message("hello everyone")).await,
            Outcome::Ignored
        );
        assert_eq!(
            executor.handle_message(&message("!not-a-meme")).await,
            Outcome::Ignored
        );
        assert!(platform.sent_texts().is_empty());
    }

    #[tokio::test]
    async fn test_parse_error_is_reported_once() {
        let (_temp, platform, executor) = setup(RecordingPlatform::new().with_user_in_voice(7, LOUNGE));
        let outcome = executor.handle_message(&message("v!nobody hi")).await;
        assert_eq!(outcome, Outcome::ParseError);
        assert_eq!(
            platform.sent_texts(),
            vec!["Error executing command: unknown voice 'nobody'"]
        );
        assert!(platform.played_files().is_empty());
    }

    #[tokio::test]
    async fn test_gate_blocks_invocation() {
        let (_temp, platform, executor) = setup(RecordingPlatform::new());
        let outcome = executor.handle_message(&message("!airhorn")).await;
        assert_eq!(outcome, Outcome::Blocked);
        assert_eq!(platform.sent_texts(), vec![VOICE_GATE_MESSAGE]);
        assert!(platform.played_files().is_empty());
    }

    #[tokio::test]
    async fn test_gated_command_runs_when_present() {
        let (temp, platform, executor) = setup(RecordingPlatform::new().with_user_in_voice(7, LOUNGE));
        let outcome = executor.handle_message(&message("!airhorn")).await;
        assert_eq!(outcome, Outcome::Executed);
        assert_eq!(
            platform.played_files(),
            vec![(LOUNGE, temp.path().join("memes").join("airhorn.wav"))]
        );
        assert!(platform.sent_texts().is_empty());
    }

    #[tokio::test]
    async fn test_channel_target_bypasses_gate() {
        let (_temp, platform, executor) =
            setup(RecordingPlatform::new().with_voice_channel("stage", STAGE));
        let outcome = executor.handle_message(&message("v!liam <stage> hi there")).await;
        assert_eq!(outcome, Outcome::Executed);
        assert_eq!(
            platform.played_files(),
            vec![(STAGE, Path::new("/tmp/stub.wav").to_path_buf())]
        );
    }

    #[tokio::test]
    async fn test_exempt_command_runs_outside_voice() {
        let (_temp, platform, executor) = setup(RecordingPlatform::new());
        let outcome = executor.handle_message(&message("!list-memes")).await;
        assert_eq!(outcome, Outcome::Executed);
        assert_eq!(platform.sent_texts(), vec!["```\nairhorn\n```\n"]);
    }

    #[tokio::test]
    async fn test_action_failure_becomes_one_reply() {
        let (_temp, platform, executor) =
            setup(RecordingPlatform::new().with_voice_channel("stage", STAGE));
        let outcome = executor.handle_message(&message("!airhorn <backstage>")).await;
        assert_eq!(outcome, Outcome::Executed);

        let sent = platform.sent_texts();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("failed to play meme 'airhorn': "));
        assert!(sent[0].contains("failed to find voice channel with name 'backstage'"));
    }

    #[tokio::test]
    async fn test_usage_is_replied_verbatim() {
        let (_temp, platform, executor) = setup(RecordingPlatform::new());
        executor.handle_message(&message("!addmeme bruh")).await;
        assert_eq!(platform.sent_texts(), vec![actions::memes::ADD_MEME_USAGE]);
    }

    #[tokio::test]
    async fn test_failed_reply_is_only_logged() {
        let (_temp, platform, executor) = setup(RecordingPlatform::new());
        platform.fail_sends.store(true, Ordering::SeqCst);
        assert_eq!(
            executor.handle_message(&message("!airhorn")).await,
            Outcome::Blocked
        );
        assert_eq!(
            executor.handle_message(&message("v!nobody")).await,
            Outcome::ParseError
        );
        assert!(platform.sent_texts().is_empty());
    }
}
