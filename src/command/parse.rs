//! Message tokenizer.
//!
//! Turns a raw chat message into its command parts without touching any
//! shared state beyond the voice registry's known voices.
//!
//! Recognised forms:
//! - `v!voices`
//! - `v!<voice>[-<sub>] [<channel>] [content]`
//! - `v!<voice> !<command> ...` (voice recorded, command resolved normally)
//! - `!marcus[-<sub>] [<channel>] [content]`, `!m [<channel>] [content]`
//! - `!<command>[-<sub>] [<channel>] [content]`

use super::ParseError;
use crate::voice::{VoiceRegistry, DEFAULT_VOICE};

/// Command name of the voice listing.
pub const LIST_VOICES: &str = "list-voices";

/// Base command of every speech request.
pub const SPEECH_COMMAND: &str = "marcus";

/// The parts of a message, before any action is chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    /// Resolved voice; empty for non-speech commands without `v!`.
    pub voice: String,
    /// Full command token, possibly hyphenated. Empty means "not a command".
    pub command: String,
    pub channel: String,
    pub content: String,
    pub is_speech: bool,
}

impl Extracted {
    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }
}

/// Split `base-sub` at the first hyphen.
pub fn split_command_and_subcommand(command: &str) -> (&str, &str) {
    command.split_once('-').unwrap_or((command, ""))
}

/// Join a base command and an optional subcommand.
pub fn build_command(base: &str, subcommand: &str) -> String {
    if subcommand.is_empty() {
        base.to_string()
    } else {
        format!("{}-{}", base, subcommand)
    }
}

fn strip_channel(token: &str) -> Option<&str> {
    token.strip_prefix('<')?.strip_suffix('>')
}

/// Extract an optional leading `<channel>` token; the rest is content.
///
/// A leading token that is not closed by `>` leaves the whole input as
/// content.
pub fn parse_channel_and_content(input: &str) -> (String, String) {
    let input = input.trim();
    if !input.starts_with('<') {
        return (String::new(), input.to_string());
    }

    let (token, rest) = match input.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim()),
        None => (input, ""),
    };

    match strip_channel(token) {
        Some(channel) => (channel.to_string(), rest.to_string()),
        None => (String::new(), input.to_string()),
    }
}

/// Split off the first whitespace-delimited token.
fn first_token(input: &str) -> (&str, &str) {
    match input.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim()),
        None => (input, ""),
    }
}

/// Whether a token names the speech command explicitly (`!marcus`, `!m`,
/// with or without a subcommand or a glued `<channel>`).
fn is_explicit_speech_token(token: &str) -> bool {
    let Some(name) = token.strip_prefix('!') else {
        return false;
    };
    let (base, _) = split_command_and_subcommand(name);
    let base = base.split('<').next().unwrap_or(base);
    base == SPEECH_COMMAND || base == "m"
}

/// Parse a raw message into its parts.
pub fn extract(message: &str, voices: &VoiceRegistry) -> Result<Extracted, ParseError> {
    let message = message.trim();
    if message.is_empty() {
        return Ok(Extracted::default());
    }

    if let Some(rest) = message.strip_prefix("v!") {
        return extract_voice_syntax(rest, voices);
    }

    if let Some(rest) = message.strip_prefix('!') {
        let (token, _) = first_token(message);
        if is_explicit_speech_token(token) {
            return Ok(extract_speech_syntax(rest));
        }
        return Ok(extract_plain_command(rest, String::new()));
    }

    Ok(Extracted::default())
}

/// `v!voices` or `v!<voice>[-<sub>] ...`; `rest` has the `v!` stripped.
fn extract_voice_syntax(rest: &str, voices: &VoiceRegistry) -> Result<Extracted, ParseError> {
    if rest.starts_with("voices") {
        return Ok(Extracted {
            command: LIST_VOICES.to_string(),
            ..Default::default()
        });
    }

    let (specifier, remainder) = first_token(rest);
    let (voice, subcommand) = split_command_and_subcommand(specifier);
    let voice = voice.to_lowercase();

    let (next, _) = first_token(remainder);
    if is_explicit_speech_token(next) {
        return Err(ParseError::VoiceConflict);
    }

    if voices.is_empty() {
        return Err(ParseError::NoGenerators);
    }
    if voice.is_empty() || !voices.supports_voice(&voice) {
        return Err(ParseError::UnknownVoice(voice));
    }

    if let Some(command) = remainder.strip_prefix('!') {
        return Ok(extract_plain_command(command, voice));
    }

    let (channel, content) = parse_channel_and_content(remainder);
    Ok(Extracted {
        voice,
        command: build_command(SPEECH_COMMAND, subcommand),
        channel,
        content,
        is_speech: true,
    })
}

/// `!marcus[-<sub>] ...` or `!m ...`; `rest` has the `!` stripped.
fn extract_speech_syntax(rest: &str) -> Extracted {
    let (token, remainder) = first_token(rest);

    // A channel glued to the command, as in `!marcus<general> hi`.
    let (token, remainder) = match token.find('<') {
        Some(idx) => (&token[..idx], &rest[idx..]),
        None => (token, remainder),
    };

    let (_, subcommand) = split_command_and_subcommand(token);
    let (channel, content) = parse_channel_and_content(remainder);

    Extracted {
        voice: DEFAULT_VOICE.to_string(),
        command: build_command(SPEECH_COMMAND, subcommand),
        channel,
        content,
        is_speech: true,
    }
}

/// Any other `!<command> [<channel>] [content]`; `rest` has the `!` stripped.
fn extract_plain_command(rest: &str, voice: String) -> Extracted {
    let (command, remainder) = first_token(rest.trim());
    let (channel, content) = parse_channel_and_content(remainder);

    Extracted {
        voice,
        command: command.to_string(),
        channel,
        content,
        is_speech: false,
    }
}
