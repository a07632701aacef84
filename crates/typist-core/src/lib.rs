pub mod buffer;
pub mod clipboard;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod focus;
pub mod hotkey;
pub mod keymap;
pub mod matcher;
pub mod models;
pub mod monitor;
pub mod prompt;
pub mod registrar;
pub mod storage;
pub mod suppression;
pub mod synth;
pub mod tokens;
pub mod watcher;

// Re-export common items for convenience
pub use clipboard::{ArboardGateway, ClipboardContent, ClipboardGateway};
pub use config::{get_config_dir, is_daemon_running, Settings, SharedSettings};
pub use coordinator::{ExpansionCoordinator, ExpansionRequest};
pub use engine::{Engine, EngineCommand, EngineObserver, EngineParts, Feature, HotkeyAction};
pub use error::{ErrorClass, Result, TypistError};
pub use hotkey::{format_combo, normalize_combo, parse_combo};
pub use matcher::{find_match, ShortcutSet};
pub use models::{preview_text, ClipboardSnapshot, FormattingMode, Shortcut};
pub use monitor::{
    spawn_input_monitor, ExpansionSwitch, HookDecision, InputMonitor, KeyAction, KeyEvent,
    KeystrokeSource,
};
pub use storage::{find_trigger_conflicts, ShortcutStore};
pub use tokens::{Clock, FixedClock, SystemClock, TokenExpander};
