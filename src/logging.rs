//! tracing subscriber for the bot.
//!
//! Console output is compact and human oriented. The daily file under the
//! data directory records full span context, so every line written while a
//! command runs carries the `dispatch` span fields (user, guild, command,
//! action) and the span's close event records how long the command took.
//!
//! `MARCUS_LOG_FORMAT=json` switches the file to one JSON object per line;
//! `MARCUS_LOG_DIR` moves it.

use anyhow::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE: &str = "marcus.log";
const DEFAULT_FILTER: &str = "info,marcus=debug,serenity=warn,songbird=warn";

/// Keeps the file writer alive; dropping it flushes pending lines.
pub struct LogHandle {
    pub dir: PathBuf,
    _guard: WorkerGuard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Text,
    Json,
}

impl FileFormat {
    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "json" => FileFormat::Json,
            _ => FileFormat::Text,
        }
    }
}

fn log_dir(override_dir: Option<String>) -> Result<PathBuf> {
    if let Some(dir) = override_dir.filter(|d| !d.trim().is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let dirs = directories::ProjectDirs::from("com", "marcus", "marcus")
        .ok_or_else(|| anyhow::anyhow!("could not determine a data directory for logs"))?;
    Ok(dirs.data_dir().join("logs"))
}

/// Install the global subscriber.
pub fn init() -> Result<LogHandle> {
    let dir = log_dir(std::env::var("MARCUS_LOG_DIR").ok())?;
    std::fs::create_dir_all(&dir)?;
    let format = FileFormat::from_env_value(std::env::var("MARCUS_LOG_FORMAT").ok().as_deref());

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, LOG_FILE));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = match format {
        FileFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(writer)
            .boxed(),
        FileFormat::Text => fmt::layer()
            .with_ansi(false)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(writer)
            .boxed(),
    };

    let console_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::debug!(dir = %dir.display(), ?format, "logging initialized");
    Ok(LogHandle { dir, _guard: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_format_from_env() {
        assert_eq!(FileFormat::from_env_value(None), FileFormat::Text);
        assert_eq!(FileFormat::from_env_value(Some(" JSON ")), FileFormat::Json);
        assert_eq!(FileFormat::from_env_value(Some("pretty")), FileFormat::Text);
    }

    #[test]
    fn test_log_dir_override() {
        assert_eq!(
            log_dir(Some("/var/log/marcus".to_string())).unwrap(),
            PathBuf::from("/var/log/marcus")
        );
        let fallback = log_dir(Some("  ".to_string()));
        if let Ok(dir) = fallback {
            assert!(dir.ends_with("logs"));
        }
    }
}
