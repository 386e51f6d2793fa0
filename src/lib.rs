//! Marcus library root.

pub mod actions;
pub mod apis;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod memes;
pub mod platform;
pub mod voice;

pub use cli::Commands;
pub use command::{build, Action, Command, Executor, Outcome, ParseError, Resolution};
pub use config::{load_settings, Settings};
pub use error::{Error, Result};
pub use memes::MemeIndex;
pub use platform::ChatPlatform;
pub use voice::{VoiceGenerator, VoiceRegistry};
