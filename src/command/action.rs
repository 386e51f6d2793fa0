//! Actions a command can resolve to.

use std::fmt;
use std::path::PathBuf;

/// Remote text source spoken by the fetch-and-speak actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Insult,
    Fact,
    Joke,
    Slur,
}

impl FetchSource {
    pub fn from_subcommand(sub: &str) -> Option<Self> {
        match sub {
            "insult" => Some(FetchSource::Insult),
            "fact" => Some(FetchSource::Fact),
            "joke" => Some(FetchSource::Joke),
            "slur" => Some(FetchSource::Slur),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FetchSource::Insult => "insult",
            FetchSource::Fact => "fact",
            FetchSource::Joke => "joke",
            FetchSource::Slur => "slur",
        }
    }
}

/// Which prompt a model question is asked with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskPersona {
    /// In-character answer, also spoken.
    Marcus,
    /// Plain answer, text only.
    General,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ListVoices,
    Speak { voice: String, text: String },
    SpeakFetched { voice: String, source: FetchSource },
    /// Reply with a usage hint.
    Usage { message: String },
    Ask {
        persona: AskPersona,
        voice: String,
        question: String,
    },
    ListMemes,
    AddMeme { name: String },
    PlayMeme { name: String, path: PathBuf },
}

impl Action {
    /// Stable name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::ListVoices => "list_voices",
            Action::Speak { .. } => "speak",
            Action::SpeakFetched { source, .. } => match source {
                FetchSource::Insult => "say_insult",
                FetchSource::Fact => "say_fact",
                FetchSource::Joke => "say_joke",
                FetchSource::Slur => "say_slur",
            },
            Action::Usage { .. } => "usage",
            Action::Ask {
                persona: AskPersona::Marcus,
                ..
            } => "ask_marcus",
            Action::Ask {
                persona: AskPersona::General,
                ..
            } => "ask_ai",
            Action::ListMemes => "list_memes",
            Action::AddMeme { .. } => "add_meme",
            Action::PlayMeme { .. } => "play_meme",
        }
    }

    /// Prefix of the chat reply sent when the action fails.
    pub fn failure_context(&self) -> String {
        match self {
            Action::ListVoices => "failed to list voices".to_string(),
            Action::Speak { .. } => "failed to generate TTS".to_string(),
            Action::SpeakFetched { source, .. } => {
                format!("the {} API returned an error", source.as_str())
            }
            Action::Usage { .. } => "failed to send usage".to_string(),
            Action::Ask { .. } => "failed to respond to question".to_string(),
            Action::ListMemes => "failed to list memes".to_string(),
            Action::AddMeme { .. } => "failed to add meme".to_string(),
            Action::PlayMeme { name, .. } => format!("failed to play meme '{}'", name),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subcommand_sources() {
        assert_eq!(FetchSource::from_subcommand("joke"), Some(FetchSource::Joke));
        assert_eq!(FetchSource::from_subcommand("slur"), Some(FetchSource::Slur));
        assert_eq!(FetchSource::from_subcommand("poem"), None);
    }

    #[test]
    fn test_kind_names() {
        let ask = Action::Ask {
            persona: AskPersona::General,
            voice: "marcus".to_string(),
            question: "why".to_string(),
        };
        assert_eq!(ask.kind(), "ask_ai");
        assert_eq!(ask.to_string(), "ask_ai");
        assert_eq!(
            Action::SpeakFetched {
                voice: "liam".to_string(),
                source: FetchSource::Fact
            }
            .failure_context(),
            "the fact API returned an error"
        );
    }
}
