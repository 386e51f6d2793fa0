//! Command parsing and dispatch.
//!
//! A message flows through three stages:
//! - [`parse`] splits it into voice, command, channel and content
//! - [`builder`] binds an [`Action`] and decides whether it is gated
//! - [`executor`] applies the voice-channel gate and runs the action once

pub mod action;
pub mod builder;
pub mod executor;
pub mod parse;

use thiserror::Error;

pub use action::{Action, AskPersona, FetchSource};
pub use builder::build;
pub use executor::{Executor, Outcome};

/// Malformed or conflicting command syntax.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown voice '{0}'")]
    UnknownVoice(String),

    #[error("do not combine v!<voice> with !marcus in the same message")]
    VoiceConflict,

    #[error("unknown !ask subcommand: {0}")]
    UnknownAskSubcommand(String),

    #[error("no voice generators configured")]
    NoGenerators,
}

/// Outcome of building a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Not a command; nothing is replied.
    Ignored,
    /// Rejected at parse time; never executed.
    Failed(ParseError),
    Resolved(Action),
}

/// A fully resolved command for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub raw_content: String,
    /// Voice used by speaking actions, already defaulted.
    pub voice: String,
    pub command_name: String,
    pub subcommand_name: String,
    pub target_channel: Option<String>,
    pub content: String,
    pub is_speech: bool,
    pub usable_outside_voice_channel: bool,
    pub resolution: Resolution,
}

impl Command {
    pub(crate) fn ignored(raw: &str) -> Self {
        Self {
            raw_content: raw.to_string(),
            voice: String::new(),
            command_name: String::new(),
            subcommand_name: String::new(),
            target_channel: None,
            content: String::new(),
            is_speech: false,
            usable_outside_voice_channel: false,
            resolution: Resolution::Ignored,
        }
    }

    pub(crate) fn failed(raw: &str, error: ParseError) -> Self {
        Self {
            resolution: Resolution::Failed(error),
            ..Self::ignored(raw)
        }
    }

    pub fn action(&self) -> Option<&Action> {
        match &self.resolution {
            Resolution::Resolved(action) => Some(action),
            _ => None,
        }
    }

    pub fn is_ignored(&self) -> bool {
        self.resolution == Resolution::Ignored
    }

    pub fn error(&self) -> Option<&ParseError> {
        match &self.resolution {
            Resolution::Failed(e) => Some(e),
            _ => None,
        }
    }
}
