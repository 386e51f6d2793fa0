//! Meme clip index.
//!
//! Maps a hyphen-joined path under the meme directory to either a single
//! clip or a collection of clips. The index is rebuilt from the filesystem
//! on a timer; a rebuild produces a fresh snapshot that replaces the old one
//! in a single swap, so lookups never observe a partially built index.

use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{Error, Result};

const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg", "flac"];

/// What a meme command plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemeEntry {
    File(PathBuf),
    /// A directory, reduced to the audio files directly inside it.
    Collection(Vec<PathBuf>),
}

impl MemeEntry {
    /// Clip to play: the file itself, or a random member of a collection.
    pub fn pick(&self) -> Option<PathBuf> {
        match self {
            MemeEntry::File(path) => Some(path.clone()),
            MemeEntry::Collection(files) => files.choose(&mut rand::thread_rng()).cloned(),
        }
    }
}

type Snapshot = HashMap<String, MemeEntry>;

pub struct MemeIndex {
    root: PathBuf,
    snapshot: RwLock<Arc<Snapshot>>,
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Command name for a path relative to the meme root: separators become
/// hyphens and the extension is dropped.
fn command_name(relative: &Path) -> String {
    let without_ext = relative.with_extension("");
    without_ext
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("-")
}

fn scan(root: &Path, dir: &Path, out: &mut Snapshot) -> Result<()> {
    // `DirEntry::file_type` does not follow symlinks, so linked directories
    // are never descended into and a link cycle cannot recurse.
    let mut entries: Vec<(PathBuf, std::fs::FileType)> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_type().ok().map(|t| (e.path(), t)))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut files = Vec::new();
    for (path, file_type) in entries {
        let relative = match path.strip_prefix(root) {
            Ok(r) => r.to_path_buf(),
            Err(_) => continue,
        };

        if file_type.is_symlink() && path.is_dir() {
            tracing::debug!(path = %path.display(), "skipping linked meme directory");
        } else if file_type.is_dir() {
            if let Err(e) = scan(root, &path, out) {
                tracing::error!(path = %path.display(), "failed to walk meme directory: {}", e);
            }
        } else if is_audio_file(&path) {
            out.insert(command_name(&relative), MemeEntry::File(path.clone()));
            files.push(path);
        }
    }

    if dir != root && !files.is_empty() {
        if let Ok(relative) = dir.strip_prefix(root) {
            out.insert(command_name(relative), MemeEntry::Collection(files));
        }
    }
    Ok(())
}

/// Build a snapshot of the meme directory. A missing directory yields an
/// empty index.
pub fn build_snapshot(root: &Path) -> Result<HashMap<String, MemeEntry>> {
    let mut snapshot = HashMap::new();
    if !root.exists() {
        tracing::warn!(path = %root.display(), "memes directory not found, meme commands disabled");
        return Ok(snapshot);
    }
    scan(root, root, &mut snapshot)?;
    Ok(snapshot)
}

impl MemeIndex {
    /// Create an empty index rooted at the meme directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            snapshot: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn current(&self) -> Arc<Snapshot> {
        match self.snapshot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Rebuild from the filesystem and swap the new snapshot in.
    pub fn rebuild(&self) -> Result<usize> {
        let fresh = build_snapshot(&self.root)?;
        let count = fresh.len();
        let mut guard = self
            .snapshot
            .write()
            .map_err(|_| Error::Meme("meme index lock poisoned".to_string()))?;
        *guard = Arc::new(fresh);
        Ok(count)
    }

    pub fn lookup(&self, command: &str) -> Option<MemeEntry> {
        self.current().get(command).cloned()
    }

    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted command names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.current().keys().cloned().collect();
        names.sort();
        names
    }

    /// Where a newly added single-file meme is written.
    pub fn path_for_new(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.wav", name))
    }
}

/// Render meme names into code-block pages that each fit within `limit`
/// characters.
pub fn paginate(names: &[String], limit: usize) -> Vec<String> {
    const FENCE: &str = "```\n";
    let overhead = FENCE.len() * 2;

    let mut pages = Vec::new();
    let mut body = String::new();
    for name in names {
        if !body.is_empty() && body.len() + name.len() + 1 + overhead > limit {
            pages.push(format!("{FENCE}{body}{FENCE}"));
            body.clear();
        }
        body.push_str(name);
        body.push('\n');
    }
    if !body.is_empty() {
        pages.push(format!("{FENCE}{body}{FENCE}"));
    }
    pages
}

/// Rebuild the index on a fixed tick. Filesystem walks run on the blocking
/// pool.
pub fn spawn_refresher(index: Arc<MemeIndex>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let index = index.clone();
            match tokio::task::spawn_blocking(move || index.rebuild()).await {
                Ok(Ok(count)) => tracing::debug!(count, "refreshed meme set"),
                Ok(Err(e)) => tracing::error!("failed to build meme set: {}", e),
                Err(e) => tracing::error!("meme refresh task failed: {}", e),
            }
        }
    })
}
