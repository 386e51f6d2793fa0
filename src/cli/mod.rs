//! CLI commands for Marcus using clap.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::actions::Services;
use crate::command::{build, Resolution};
use crate::config::load_settings;
use crate::platform::discord::run_bot;

/// Marcus - Discord voice bot.
#[derive(Parser)]
#[command(name = "marcus")]
#[command(version = "0.1.0")]
#[command(about = "Marcus - text-to-speech, meme clips and model questions for Discord", long_about = None)]
pub struct Commands {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Connect to Discord and serve commands
    Run,

    /// Show how a chat message would be resolved, without running it
    Parse {
        /// Raw message text, e.g. "v!liam hello"
        message: String,
    },

    /// List voices of every configured generator
    Voices,

    /// List meme commands found in the meme directory
    Memes,
}

impl Commands {
    /// Run the command.
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Command::Run => cmd_run().await,
            Command::Parse { message } => cmd_parse(message).await,
            Command::Voices => cmd_voices().await,
            Command::Memes => cmd_memes().await,
        }
    }
}

// Command implementations

async fn cmd_run() -> Result<()> {
    let settings = load_settings()?;
    run_bot(settings).await
}

/// Services with a freshly built meme index.
fn local_services() -> Result<Arc<Services>> {
    let settings = load_settings()?;
    let services = Services::from_settings(&settings);
    services.memes.rebuild()?;
    Ok(Arc::new(services))
}

async fn cmd_parse(message: &str) -> Result<()> {
    let services = local_services()?;
    services.voices.refresh_all().await;

    let command = build(message, &services.voices, &services.memes);
    match &command.resolution {
        Resolution::Ignored => println!("Ignored: not a command"),
        Resolution::Failed(e) => println!("Error: {}", e),
        Resolution::Resolved(action) => {
            println!("Action:   {}", action.kind());
            println!("Voice:    {}", command.voice);
            println!(
                "Command:  {}{}",
                command.command_name,
                if command.subcommand_name.is_empty() {
                    String::new()
                } else {
                    format!(" (sub: {})", command.subcommand_name)
                }
            );
            if let Some(channel) = &command.target_channel {
                println!("Channel:  {}", channel);
            }
            if !command.content.is_empty() {
                println!("Content:  {}", command.content);
            }
            println!(
                "Gated:    {}",
                if command.usable_outside_voice_channel {
                    "no"
                } else {
                    "yes (author must be in a voice channel)"
                }
            );
        }
    }
    Ok(())
}

async fn cmd_voices() -> Result<()> {
    let services = local_services()?;
    services.voices.refresh_all().await;

    for (platform, voices) in services.voices.voices_by_generator().await {
        println!("{}:", platform);
        if voices.is_empty() {
            println!("  (none)");
        }
        for voice in voices {
            println!("  - {}", voice);
        }
    }
    Ok(())
}

async fn cmd_memes() -> Result<()> {
    let services = local_services()?;
    let names = services.memes.names();
    if names.is_empty() {
        println!("No memes found in {}", services.memes.root().display());
        return Ok(());
    }

    for name in &names {
        println!("!{}", name);
    }
    println!("\n{} meme command(s)", names.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_shape() {
        Commands::command().debug_assert();

        let parsed = Commands::try_parse_from(["marcus", "parse", "v!liam hello"]).unwrap();
        assert!(matches!(parsed.command, Command::Parse { ref message } if message == "v!liam hello"));

        assert!(Commands::try_parse_from(["marcus", "run"]).is_ok());
        assert!(Commands::try_parse_from(["marcus", "bogus"]).is_err());
    }
}
