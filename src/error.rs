//! Error types for Marcus.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Voice error: {0}")]
    Voice(String),

    #[error("Meme error: {0}")]
    Meme(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The user must join a voice channel first.
    #[error("you need to be in a voice channel to use this command")]
    NotInVoice,

    /// Malformed input; the message is shown to the user as-is.
    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn other(s: impl Into<String>) -> Self {
        Error::Other(s.into())
    }
}
