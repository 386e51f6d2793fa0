//! Voice listing.

use super::{ActionContext, MESSAGE_LIMIT};
use crate::error::Result;
use crate::memes::paginate;

/// Lines of the voice listing, grouped by backend, with usage examples.
pub fn voice_list_lines(grouped: &[(String, Vec<String>)]) -> Vec<String> {
    let mut lines = vec!["Supported voices:".to_string()];
    for (platform, voices) in grouped {
        lines.push(format!("Platform: {}", platform));
        lines.extend(voices.iter().map(|voice| format!("\t- Voice: {}", voice)));
    }
    lines.push(String::new());
    lines.push("Examples:".to_string());
    lines.push("\tv!<voice> <text>            speak text in a voice".to_string());
    lines.push("\tv!<voice>-joke <channel>    tell a joke in a named voice channel".to_string());
    lines.push("\t!marcus <text>              speak text in the default voice".to_string());
    lines
}

/// Each page is a closed code block, so long catalogs never split a fence.
pub async fn list_voices(ctx: &ActionContext<'_>) -> Result<()> {
    let grouped = ctx.services.voices.voices_by_generator().await;
    if grouped.iter().all(|(_, voices)| voices.is_empty()) {
        ctx.reply("No voices are currently available.").await?;
        return Ok(());
    }

    for page in paginate(&voice_list_lines(&grouped), MESSAGE_LIMIT) {
        ctx.reply(&page).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::{message, services};
    use crate::platform::testing::RecordingPlatform;
    use crate::voice::testing::registry;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_lines_group_by_platform() {
        let lines = voice_list_lines(&[
            ("marcus".to_string(), vec!["marcus".to_string()]),
            ("elevenlabs".to_string(), vec!["Liam".to_string(), "Alice".to_string()]),
        ]);
        assert_eq!(
            &lines[..6],
            &[
                "Supported voices:",
                "Platform: marcus",
                "\t- Voice: marcus",
                "Platform: elevenlabs",
                "\t- Voice: Liam",
                "\t- Voice: Alice",
            ]
        );
        assert!(lines.contains(&"Examples:".to_string()));
    }

    #[tokio::test]
    async fn test_large_catalog_pages_keep_fences_balanced() {
        let temp = TempDir::new().unwrap();
        let names: Vec<String> = (0..300).map(|i| format!("voice{:03}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let services = services(&temp, registry(&refs));
        let platform = Arc::new(RecordingPlatform::new());
        let msg = message("v!voices");
        let ctx = ActionContext {
            platform: platform.clone(),
            services: &services,
            message: &msg,
            target_channel: None,
        };

        list_voices(&ctx).await.unwrap();
        let sent = platform.sent_texts();
        assert!(sent.len() > 1);
        for page in &sent {
            assert!(page.chars().count() <= MESSAGE_LIMIT);
            assert!(page.starts_with("```\n") && page.ends_with("```\n"));
            assert_eq!(page.matches("```").count(), 2);
        }
        assert!(sent.concat().contains("\t- Voice: voice299\n"));
    }

    #[tokio::test]
    async fn test_list_voices_replies_once() {
        let temp = TempDir::new().unwrap();
        let services = services(&temp, registry(&["liam"]));
        let platform = Arc::new(RecordingPlatform::new());
        let msg = message("v!voices");
        let ctx = ActionContext {
            platform: platform.clone(),
            services: &services,
            message: &msg,
            target_channel: None,
        };

        list_voices(&ctx).await.unwrap();
        let sent = platform.sent_texts();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Platform: stub\n\t- Voice: liam\n"));
    }
}
