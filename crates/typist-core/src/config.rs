use crate::error::{Result, TypistError};
use crate::models::FormattingMode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

pub const PID_FILENAME: &str = "typist-daemon.pid";
pub const DB_FILENAME: &str = "shortcuts.json";
pub const SETTINGS_FILENAME: &str = "settings.json";
pub const HISTORY_FILENAME: &str = "history.jsonl";
pub const LOG_FILENAME: &str = "daemon.log";

pub const DEFAULT_BUFFER_CAPACITY: usize = 128;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 50;
pub const DEFAULT_CLIPBOARD_POLL_MS: u64 = 250;
pub const DEFAULT_DELIMITERS: &str = " \t\n.,;!?";

pub const ACTION_PASTE_LAST: &str = "paste_last";
pub const ACTION_TOGGLE_EXPANSION: &str = "toggle_expansion";

/// Get the typist configuration directory
pub fn get_config_dir() -> PathBuf {
    if let Ok(dir) = env::var("TYPIST_HOME") {
        return PathBuf::from(dir);
    }
    env::var("HOME")
        .map(|home| PathBuf::from(home).join(".typist"))
        .unwrap_or_else(|_| PathBuf::from(".typist"))
}

/// Ensure the configuration directory and the shortcut database exist
pub fn ensure_config_dir() -> Result<PathBuf> {
    let config_dir = get_config_dir();
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    let db_path = get_db_file_path();
    if !db_path.exists() {
        fs::write(&db_path, "[]")?;
    }

    Ok(config_dir)
}

/// Get the path to the PID file
pub fn get_pid_file_path() -> PathBuf {
    get_config_dir().join(PID_FILENAME)
}

/// Get the path to the shortcut database
pub fn get_db_file_path() -> PathBuf {
    get_config_dir().join(DB_FILENAME)
}

pub fn get_settings_file_path() -> PathBuf {
    get_config_dir().join(SETTINGS_FILENAME)
}

pub fn get_history_file_path() -> PathBuf {
    get_config_dir().join(HISTORY_FILENAME)
}

/// Check if daemon is running
pub fn is_daemon_running() -> Result<Option<u32>> {
    let pid_file = get_pid_file_path();
    if !pid_file.exists() {
        return Ok(None);
    }

    match fs::read_to_string(&pid_file) {
        Ok(contents) => match contents.trim().parse::<u32>() {
            Ok(pid) => Ok(Some(pid)),
            Err(_) => {
                // Invalid PID, treat as not running and clean up
                let _ = fs::remove_file(&pid_file);
                Ok(None)
            }
        },
        Err(_) => {
            let _ = fs::remove_file(&pid_file);
            Ok(None)
        }
    }
}

/// Characters that end a typed word and trigger matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DelimiterSet(BTreeSet<char>);

impl DelimiterSet {
    pub fn new(chars: impl IntoIterator<Item = char>) -> Self {
        Self(chars.into_iter().collect())
    }

    pub fn contains(&self, c: char) -> bool {
        self.0.contains(&c)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for DelimiterSet {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITERS.chars())
    }
}

impl From<String> for DelimiterSet {
    fn from(value: String) -> Self {
        Self::new(value.chars())
    }
}

impl From<DelimiterSet> for String {
    fn from(value: DelimiterSet) -> Self {
        value.0.into_iter().collect()
    }
}

/// User settings consulted by the engine. Every field has a default so a
/// partial settings file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub delimiters: DelimiterSet,
    pub date_format: String,
    pub time_format: String,
    pub formatting_mode: FormattingMode,
    pub settle_delay_ms: u64,
    pub buffer_capacity: usize,
    /// Fold typed letters to lowercase before matching.
    pub fold_case: bool,
    /// Put the previous clipboard content back after an expansion.
    pub restore_clipboard: bool,
    pub capture_clipboard: bool,
    pub clipboard_poll_ms: u64,
    /// action name -> combo, e.g. "paste_last" -> "Ctrl+Shift+V"
    pub hotkeys: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        let mut hotkeys = BTreeMap::new();
        hotkeys.insert(ACTION_PASTE_LAST.to_string(), "Ctrl+Shift+V".to_string());
        hotkeys.insert(ACTION_TOGGLE_EXPANSION.to_string(), "Ctrl+Alt+F12".to_string());

        Self {
            delimiters: DelimiterSet::default(),
            date_format: "yyyy-MM-dd".to_string(),
            time_format: "HH:mm".to_string(),
            formatting_mode: FormattingMode::default(),
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            fold_case: true,
            restore_clipboard: false,
            capture_clipboard: true,
            clipboard_poll_ms: DEFAULT_CLIPBOARD_POLL_MS,
            hotkeys,
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults when the file is missing or empty.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let settings: Settings = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity < 2 {
            return Err(TypistError::InvalidConfig(
                "buffer_capacity must be at least 2".to_string(),
            ));
        }
        if self.clipboard_poll_ms == 0 {
            return Err(TypistError::InvalidConfig(
                "clipboard_poll_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Reject a trigger that could never be typed under these settings:
    /// one holding a delimiter, or uppercase letters while typing is folded
    /// to lowercase.
    pub fn check_trigger(&self, trigger: &str) -> Result<()> {
        if let Some(c) = trigger.chars().find(|c| self.delimiters.contains(*c)) {
            return Err(TypistError::InvalidConfig(format!(
                "trigger '{}' contains the delimiter {:?}",
                trigger, c
            )));
        }
        if self.fold_case && trigger.chars().any(char::is_uppercase) {
            return Err(TypistError::InvalidConfig(format!(
                "trigger '{}' has uppercase letters but typing is matched in lowercase; use '{}'",
                trigger,
                trigger.to_lowercase()
            )));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn clipboard_poll_interval(&self) -> Duration {
        Duration::from_millis(self.clipboard_poll_ms)
    }
}

/// Settings shared across threads. Readers take an `Arc` snapshot; writers
/// replace the whole snapshot.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings(Arc<RwLock<Arc<Settings>>>);

impl SharedSettings {
    pub fn new(settings: Settings) -> Self {
        Self(Arc::new(RwLock::new(Arc::new(settings))))
    }

    pub fn snapshot(&self) -> Arc<Settings> {
        match self.0.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn replace(&self, settings: Settings) {
        let next = Arc::new(settings);
        match self.0.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    pub fn formatting_mode(&self) -> FormattingMode {
        self.snapshot().formatting_mode
    }

    pub fn set_formatting_mode(&self, mode: FormattingMode) {
        let mut next = (*self.snapshot()).clone();
        next.formatting_mode = mode;
        self.replace(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_settings_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, r#"{"date_format":"dd/MM/yyyy","delimiters":" ."}"#).unwrap();

        let settings = Settings::load_or_default(&path).unwrap();
        assert_eq!(settings.date_format, "dd/MM/yyyy");
        assert_eq!(settings.time_format, "HH:mm");
        assert!(settings.delimiters.contains('.'));
        assert!(!settings.delimiters.contains(','));
        assert_eq!(settings.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
    }

    #[test]
    fn missing_settings_file_is_default() {
        let dir = tempdir().unwrap();
        let settings = Settings::load_or_default(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn invalid_capacity_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, r#"{"buffer_capacity":1}"#).unwrap();
        assert!(matches!(
            Settings::load_or_default(&path),
            Err(TypistError::InvalidConfig(_))
        ));
    }

    #[test]
    fn settings_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILENAME);
        let mut settings = Settings::default();
        settings.formatting_mode = FormattingMode::UseDestination;
        settings.save(&path).unwrap();
        assert_eq!(Settings::load_or_default(&path).unwrap(), settings);
    }

    #[test]
    fn formatting_mode_update_replaces_snapshot() {
        let shared = SharedSettings::new(Settings::default());
        let before = shared.snapshot();
        shared.set_formatting_mode(FormattingMode::MergeFormatting);
        assert_eq!(before.formatting_mode, FormattingMode::KeepOriginal);
        assert_eq!(shared.formatting_mode(), FormattingMode::MergeFormatting);
    }
}
