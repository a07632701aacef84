//! Clipboard history file and the engine observer that feeds it.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};
use typist_core::engine::{EngineObserver, Feature};
use typist_core::{ClipboardSnapshot, Result, TypistError};

/// Appends every captured snapshot to a JSON-lines file.
pub struct HistoryRecorder {
    path: PathBuf,
}

impl HistoryRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, snapshot: &ClipboardSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(snapshot)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

impl EngineObserver for HistoryRecorder {
    fn on_clipboard_captured(&mut self, snapshot: &ClipboardSnapshot) {
        if let Err(err) = self.append(snapshot) {
            warn!(error = %err, path = %self.path.display(), "Failed to record clipboard item");
        }
    }

    fn on_expansion_performed(&mut self, shortcut_id: &str) {
        debug!(shortcut = shortcut_id, "Expansion performed");
    }

    fn on_feature_unavailable(&mut self, feature: Feature, error: &TypistError) {
        error!(feature = feature.name(), error = %error, "Feature unavailable for this session");
    }

    fn on_hotkey_conflict(&mut self, identifier: &str, error: &TypistError) {
        warn!(identifier, error = %error, "Hotkey is taken by another application");
    }
}

/// The most recent `limit` entries, newest first. Unreadable lines are skipped.
pub fn read_history(path: &Path, limit: usize) -> Result<Vec<ClipboardSnapshot>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(fs::File::open(path)?);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ClipboardSnapshot>(&line) {
            Ok(snapshot) => entries.push(snapshot),
            Err(err) => debug!(error = %err, "Skipping unreadable history line"),
        }
    }

    entries.reverse();
    entries.truncate(limit);
    Ok(entries)
}
