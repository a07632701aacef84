use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypistError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Keyboard controller error: {0}")]
    Enigo(String),
    #[error("Keyboard hook error: {0}")]
    Hook(String),
    #[error("Clipboard error: {0}")]
    Clipboard(String),
    #[error("Clipboard is locked by another process")]
    ClipboardLocked,
    #[error("Invalid hotkey '{combo}': {reason}")]
    InvalidHotkey { combo: String, reason: String },
    #[error("Hotkey '{0}' is already registered by another application")]
    HotkeyConflict(String),
    #[error("Global hotkeys are unavailable: {0}")]
    HotkeysUnavailable(String),
    #[error("Hotkey backend error: {0}")]
    HotkeyBackend(String),
    #[error("Focused window lookup failed: {0}")]
    WindowLabel(String),
    #[error("Shortcut not found: {0}")]
    ShortcutNotFound(String),
    #[error("Trigger '{0}' is already used by another shortcut")]
    DuplicateTrigger(String),
    #[error("Daemon already running with PID {0}")]
    DaemonAlreadyRunning(u32),
    #[error("Daemon is not running")]
    DaemonNotRunning,
    #[error("Invalid PID in daemon file")]
    InvalidPid,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Error: {0}")]
    Other(String),
}

/// How an error is surfaced once it reaches an event boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The feature (expansion, hotkeys) is unavailable for the session.
    FatalToFeature,
    /// One hotkey could not be bound; everything else keeps working.
    RecoverableConflict,
    /// Skip this event only.
    Transient,
    /// Continue with a degraded result.
    BestEffort,
    Other,
}

impl TypistError {
    pub fn class(&self) -> ErrorClass {
        match self {
            TypistError::Hook(_)
            | TypistError::HotkeysUnavailable(_)
            | TypistError::PermissionDenied(_) => ErrorClass::FatalToFeature,
            TypistError::HotkeyConflict(_) => ErrorClass::RecoverableConflict,
            TypistError::ClipboardLocked => ErrorClass::Transient,
            TypistError::WindowLabel(_) => ErrorClass::BestEffort,
            _ => ErrorClass::Other,
        }
    }

    /// Only fatal and conflict errors are shown to the user.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::FatalToFeature | ErrorClass::RecoverableConflict
        )
    }

    pub(crate) fn invalid_hotkey(combo: &str, reason: impl Into<String>) -> Self {
        TypistError::InvalidHotkey {
            combo: combo.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TypistError>;
