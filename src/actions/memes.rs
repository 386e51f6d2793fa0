//! Meme listing and upload.

use std::path::Path;

use super::{ActionContext, MESSAGE_LIMIT};
use crate::error::{Error, Result};
use crate::memes::paginate;

pub const ADD_MEME_USAGE: &str = "```\nUsage: !addmeme <command-name> - creates a command that plays an audio file\n\n\
This command can only be used as a reply to a message which contains a single wav file attachment. \
The attachment file name must end in .wav, and the command cannot include spaces or emoji.\n\n\
Example: !addmeme test - creates a command that plays the audio file attached to the message with the command name '!test'\n```";

pub async fn list_memes(ctx: &ActionContext<'_>) -> Result<()> {
    let names = ctx.services.memes.names();
    if names.is_empty() {
        ctx.reply("No memes are available yet.").await?;
        return Ok(());
    }

    for page in paginate(&names, MESSAGE_LIMIT) {
        ctx.reply(&page).await?;
    }
    Ok(())
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Write the clip beside its final name and link it into place. A failed
/// write leaves no file under the meme name, and an existing file is never
/// replaced.
fn persist_new(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let partial = path.with_extension("wav.part");
    let result = std::fs::write(&partial, bytes).and_then(|()| std::fs::hard_link(&partial, path));
    if let Err(e) = std::fs::remove_file(&partial) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(file = %partial.display(), "failed to remove partial download: {}", e);
        }
    }
    result
}

/// Save the single wav attached to the replied-to message as a new meme.
pub async fn add_meme(ctx: &ActionContext<'_>, name: &str) -> Result<()> {
    let usage = || Error::Usage(ADD_MEME_USAGE.to_string());

    let attachment = match ctx.message.referenced_attachments.as_deref() {
        Some([attachment]) => attachment,
        _ => return Err(usage()),
    };
    if !attachment.filename.to_ascii_lowercase().ends_with(".wav") || !is_valid_name(name) {
        return Err(usage());
    }

    let memes = &ctx.services.memes;
    let path = memes.path_for_new(name);
    if memes.lookup(name).is_some() || path.exists() {
        return Err(Error::Usage(format!("A meme named '!{}' already exists", name)));
    }

    let response = ctx.services.http.get(&attachment.url).send().await?;
    if !response.status().is_success() {
        return Err(Error::Api(format!(
            "failed to download referenced audio file, received unexpected response code {}",
            response.status().as_u16()
        )));
    }
    let bytes = response.bytes().await?;

    std::fs::create_dir_all(memes.root())?;
    persist_new(&path, &bytes).map_err(|e| match e.kind() {
        std::io::ErrorKind::AlreadyExists => {
            Error::Usage(format!("A meme named '!{}' already exists", name))
        }
        _ => Error::Io(e),
    })?;
    tracing::info!(name, file = %path.display(), bytes = bytes.len(), "added meme");

    if let Err(e) = memes.rebuild() {
        tracing::error!("failed to rebuild meme set after upload: {}", e);
    }

    ctx.reply(&format!(
        "File downloaded, command '!{}' will be created shortly",
        name
    ))
    .await?;
    Ok(())
}
