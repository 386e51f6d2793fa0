//! Command builder.
//!
//! Binds the extracted parts of a message to exactly one [`Action`] and
//! decides whether that action needs the author to be in a voice channel.

use super::action::{Action, AskPersona, FetchSource};
use super::parse::{self, split_command_and_subcommand, LIST_VOICES};
use super::{Command, ParseError, Resolution};
use crate::memes::MemeIndex;
use crate::voice::{VoiceRegistry, DEFAULT_VOICE};

/// Reply for a speech request that carries nothing to say.
pub const SPEECH_USAGE: &str = "Unknown subcommand. Try 'v!voices' or provide a message.";

/// Build the command for a raw message.
///
/// Never fails: malformed input resolves to [`Resolution::Failed`] and
/// anything that is not a command resolves to [`Resolution::Ignored`].
pub fn build(raw: &str, voices: &VoiceRegistry, memes: &MemeIndex) -> Command {
    let extracted = match parse::extract(raw, voices) {
        Ok(extracted) => extracted,
        Err(e) => {
            tracing::debug!(content = raw, "rejected command: {}", e);
            return Command::failed(raw, e);
        }
    };

    if extracted.is_empty() {
        return Command::ignored(raw);
    }

    let (base, sub) = split_command_and_subcommand(&extracted.command);
    let voice = if extracted.voice.is_empty() {
        DEFAULT_VOICE.to_string()
    } else {
        extracted.voice.clone()
    };

    // A named channel means the author's own voice presence is irrelevant.
    let target_channel = Some(extracted.channel.clone()).filter(|c| !c.is_empty());
    let mut command = Command {
        raw_content: raw.to_string(),
        voice: voice.clone(),
        command_name: base.to_string(),
        subcommand_name: sub.to_string(),
        usable_outside_voice_channel: target_channel.is_some(),
        target_channel,
        content: extracted.content.clone(),
        is_speech: extracted.is_speech,
        resolution: Resolution::Ignored,
    };

    // (action, exempt from the voice-channel gate)
    let bound = if extracted.command == LIST_VOICES {
        Some((Action::ListVoices, true))
    } else if extracted.is_speech {
        Some(bind_speech(sub, &voice, &extracted.content))
    } else if base.starts_with("ask") {
        match sub {
            "marcus" => Some((ask(AskPersona::Marcus, &voice, &extracted.content), false)),
            "ai" => Some((ask(AskPersona::General, &voice, &extracted.content), true)),
            other => {
                command.resolution =
                    Resolution::Failed(ParseError::UnknownAskSubcommand(other.to_string()));
                return command;
            }
        }
    } else if base == "list" && sub == "memes" {
        Some((Action::ListMemes, true))
    } else if base == "addmeme" {
        Some((
            Action::AddMeme {
                name: extracted.content.clone(),
            },
            true,
        ))
    } else {
        memes
            .lookup(&extracted.command)
            .and_then(|entry| entry.pick())
            .map(|path| {
                (
                    Action::PlayMeme {
                        name: extracted.command.clone(),
                        path,
                    },
                    false,
                )
            })
    };

    match bound {
        Some((action, exempt)) => {
            command.usable_outside_voice_channel |= exempt;
            command.resolution = Resolution::Resolved(action);
        }
        None => tracing::trace!(command = %extracted.command, "no action bound"),
    }
    command
}

fn bind_speech(sub: &str, voice: &str, content: &str) -> (Action, bool) {
    if let Some(source) = FetchSource::from_subcommand(sub) {
        return (
            Action::SpeakFetched {
                voice: voice.to_string(),
                source,
            },
            false,
        );
    }

    if content.trim().is_empty() {
        return (
            Action::Usage {
                message: SPEECH_USAGE.to_string(),
            },
            true,
        );
    }

    (
        Action::Speak {
            voice: voice.to_string(),
            text: content.to_string(),
        },
        false,
    )
}

fn ask(persona: AskPersona, voice: &str, question: &str) -> Action {
    Action::Ask {
        persona,
        voice: voice.to_string(),
        question: question.to_string(),
    }
}
