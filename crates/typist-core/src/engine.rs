//! The engine thread.
//!
//! Owns the clipboard gateway, synthesizer, watcher (with its suppression
//! token), token expander and hotkey registrar. Every queued command runs to
//! completion before the next one, and the clipboard and hotkey backend are
//! polled in between.

use crate::clipboard::ClipboardGateway;
use crate::config::{SharedSettings, Settings, ACTION_PASTE_LAST, ACTION_TOGGLE_EXPANSION};
use crate::coordinator::{ExpansionCoordinator, ExpansionRequest};
use crate::error::{ErrorClass, TypistError};
use crate::focus::WindowLabeler;
use crate::hotkey::normalize_combo;
use crate::matcher::ShortcutSet;
use crate::models::{ClipboardSnapshot, Shortcut};
use crate::monitor::ExpansionSwitch;
use crate::registrar::{HotkeyBackend, HotkeyCallback, HotkeyRegistrar};
use crate::synth::InputSynthesizer;
use crate::tokens::{DateFormats, TokenExpander};
use crate::watcher::{ChangeOutcome, ClipboardWatcher};
use std::collections::HashSet;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const HOTKEY_POLL_INTERVAL: Duration = Duration::from_millis(30);
const SHORTCUT_HOTKEY_PREFIX: &str = "shortcut:";

/// What a hotkey does when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotkeyAction {
    /// Paste the most recently captured clipboard item.
    PasteLast,
    ToggleExpansion,
    /// Insert a shortcut's content without typing its trigger.
    InsertShortcut(String),
}

impl HotkeyAction {
    /// Parse an action name from the settings `hotkeys` map.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            ACTION_PASTE_LAST => Some(HotkeyAction::PasteLast),
            ACTION_TOGGLE_EXPANSION => Some(HotkeyAction::ToggleExpansion),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum EngineCommand {
    Expand(ExpansionRequest),
    Hotkey(HotkeyAction),
    ReplaceShortcuts(Vec<Shortcut>),
    ReplaceSettings(Settings),
    /// The keystroke hook could not be installed or died.
    HookFailed(TypistError),
    Shutdown,
}

/// A capability that can be lost for the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Expansion,
    Hotkeys,
}

impl Feature {
    pub fn name(&self) -> &'static str {
        match self {
            Feature::Expansion => "text expansion",
            Feature::Hotkeys => "global hotkeys",
        }
    }
}

/// Receives what the engine produced. All methods run on the engine thread.
pub trait EngineObserver {
    fn on_clipboard_captured(&mut self, _snapshot: &ClipboardSnapshot) {}

    fn on_expansion_performed(&mut self, _shortcut_id: &str) {}

    fn on_feature_unavailable(&mut self, _feature: Feature, _error: &TypistError) {}

    fn on_hotkey_conflict(&mut self, _identifier: &str, _error: &TypistError) {}
}

/// Ignores everything.
pub struct NullObserver;

impl EngineObserver for NullObserver {}

/// Everything the engine needs, injected.
pub struct EngineParts {
    pub gateway: Box<dyn ClipboardGateway>,
    pub synth: Box<dyn InputSynthesizer>,
    pub expander: TokenExpander,
    pub labeler: Box<dyn WindowLabeler>,
    /// `None` when global hotkeys are unavailable.
    pub hotkeys: Option<Box<dyn HotkeyBackend>>,
    pub observer: Box<dyn EngineObserver>,
    pub shortcuts: ShortcutSet,
    pub settings: SharedSettings,
    pub switch: ExpansionSwitch,
}

pub struct Engine {
    gateway: Box<dyn ClipboardGateway>,
    synth: Box<dyn InputSynthesizer>,
    expander: TokenExpander,
    watcher: ClipboardWatcher,
    registrar: Option<HotkeyRegistrar>,
    observer: Box<dyn EngineObserver>,
    shortcuts: ShortcutSet,
    settings: SharedSettings,
    switch: ExpansionSwitch,
    commands: Sender<EngineCommand>,
    last_snapshot: Option<ClipboardSnapshot>,
    last_clipboard_poll: Option<Instant>,
}

impl Engine {
    /// `commands` is the sending half of the queue `run` will read; hotkey
    /// callbacks post through it.
    pub fn new(parts: EngineParts, commands: Sender<EngineCommand>) -> Self {
        Self {
            gateway: parts.gateway,
            synth: parts.synth,
            expander: parts.expander,
            watcher: ClipboardWatcher::new(parts.labeler),
            registrar: parts.hotkeys.map(HotkeyRegistrar::new),
            observer: parts.observer,
            shortcuts: parts.shortcuts,
            settings: parts.settings,
            switch: parts.switch,
            commands,
            last_snapshot: None,
            last_clipboard_poll: None,
        }
    }

    pub fn last_snapshot(&self) -> Option<&ClipboardSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn registrar(&self) -> Option<&HotkeyRegistrar> {
        self.registrar.as_ref()
    }

    /// Report a feature that could not be started.
    pub fn feature_unavailable(&mut self, feature: Feature, err: &TypistError) {
        error!(feature = feature.name(), error = %err, "Feature unavailable");
        self.observer.on_feature_unavailable(feature, err);
    }

    /// Process commands until `Shutdown` or until every sender is gone.
    pub fn run(&mut self, commands: Receiver<EngineCommand>) {
        info!("Engine started");
        self.sync_hotkeys();
        self.poll_clipboard(true);

        loop {
            match commands.recv_timeout(HOTKEY_POLL_INTERVAL) {
                Ok(command) => {
                    if !self.handle(command) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.tick();
        }

        if let Some(registrar) = self.registrar.as_mut() {
            registrar.unregister_all();
        }
        info!("Engine stopped");
    }

    /// Handle one command. Returns false on `Shutdown`.
    pub fn handle(&mut self, command: EngineCommand) -> bool {
        match command {
            EngineCommand::Expand(request) => {
                if self.switch.is_enabled() {
                    self.expand(&request);
                } else {
                    debug!("Expansion disabled; dropping request");
                }
            }
            EngineCommand::Hotkey(action) => self.run_action(action),
            EngineCommand::ReplaceShortcuts(shortcuts) => {
                info!(count = shortcuts.len(), "Shortcut set replaced");
                self.shortcuts.replace(shortcuts);
                self.sync_hotkeys();
            }
            EngineCommand::ReplaceSettings(settings) => {
                info!("Settings replaced");
                self.settings.replace(settings);
                self.sync_hotkeys();
            }
            EngineCommand::HookFailed(err) => self.feature_unavailable(Feature::Expansion, &err),
            EngineCommand::Shutdown => return false,
        }
        true
    }

    /// Poll the hotkey backend, and the clipboard when its interval elapsed.
    pub fn tick(&mut self) {
        if let Some(registrar) = self.registrar.as_mut() {
            registrar.poll();
        }
        self.poll_clipboard(false);
    }

    fn poll_clipboard(&mut self, force: bool) {
        let settings = self.settings.snapshot();
        if !settings.capture_clipboard {
            return;
        }
        let due = match self.last_clipboard_poll {
            Some(at) => at.elapsed() >= settings.clipboard_poll_interval(),
            None => true,
        };
        if !(force || due) {
            return;
        }
        self.last_clipboard_poll = Some(Instant::now());

        if let Some(outcome) = self.watcher.poll(&mut *self.gateway) {
            self.handle_outcome(outcome);
        }
    }

    fn handle_outcome(&mut self, outcome: ChangeOutcome) {
        match outcome {
            ChangeOutcome::Captured(snapshot) => {
                debug!(chars = snapshot.plain_text.chars().count(), "Clipboard captured");
                self.observer.on_clipboard_captured(&snapshot);
                self.last_snapshot = Some(snapshot);
            }
            other => debug!(outcome = ?other, "Clipboard change not captured"),
        }
    }

    /// Let the watcher see our own write before anything else touches the
    /// clipboard.
    fn after_self_write(&mut self) {
        if !self.settings.snapshot().capture_clipboard {
            self.watcher.suppression_mut().disarm();
            return;
        }
        if let Some(outcome) = self.watcher.poll_after_self_write(&mut *self.gateway) {
            self.handle_outcome(outcome);
        }
        self.last_clipboard_poll = Some(Instant::now());
    }

    fn report(&mut self, context: &str, err: TypistError) {
        match err.class() {
            ErrorClass::FatalToFeature => self.feature_unavailable(Feature::Expansion, &err),
            ErrorClass::Transient | ErrorClass::BestEffort => {
                debug!(error = %err, "{} skipped", context)
            }
            _ => error!(error = %err, "{} failed", context),
        }
    }

    fn expand(&mut self, request: &ExpansionRequest) {
        let settings = self.settings.snapshot();
        let formats = DateFormats::from(&*settings);

        let mut coordinator = ExpansionCoordinator::new(
            &mut *self.gateway,
            &mut *self.synth,
            &mut self.watcher,
            &settings,
        );
        let result = coordinator.expand(request, &self.expander, &formats);
        let observed = coordinator.take_observed();
        self.handle_observed(observed);

        match result {
            Ok(_) => {
                info!(shortcut = %request.shortcut_id, "Expanded shortcut");
                self.observer.on_expansion_performed(&request.shortcut_id);
            }
            Err(err) => self.report("Expansion", err),
        }
        self.after_self_write();
    }

    fn handle_observed(&mut self, observed: Vec<ChangeOutcome>) {
        for outcome in observed {
            self.handle_outcome(outcome);
        }
    }

    fn run_action(&mut self, action: HotkeyAction) {
        match action {
            HotkeyAction::PasteLast => {
                // A copy made since the last poll is the newest item.
                self.poll_clipboard(true);
                let Some(snapshot) = self.last_snapshot.clone() else {
                    debug!("Nothing captured yet; paste-last ignored");
                    return;
                };
                let settings = self.settings.snapshot();
                let mut coordinator = ExpansionCoordinator::new(
                    &mut *self.gateway,
                    &mut *self.synth,
                    &mut self.watcher,
                    &settings,
                );
                let result = coordinator.paste_snapshot(&snapshot, settings.formatting_mode);
                let observed = coordinator.take_observed();
                self.handle_observed(observed);

                if let Err(err) = result {
                    self.report("Paste", err);
                }
                self.after_self_write();
            }
            HotkeyAction::ToggleExpansion => {
                let enabled = self.switch.toggle();
                info!(enabled, "Expansion toggled");
            }
            HotkeyAction::InsertShortcut(id) => {
                let Some(shortcut) = self.shortcuts.find_by_id(&id) else {
                    warn!(id = %id, "Hotkey bound to a shortcut that no longer exists");
                    return;
                };
                if !shortcut.enabled || !self.switch.is_enabled() {
                    return;
                }
                let request = ExpansionRequest {
                    shortcut_id: shortcut.id,
                    trigger_len: 0,
                    content: shortcut.content,
                    delimiter: ' ',
                    delimiter_suppressed: true,
                };
                self.expand(&request);
            }
        }
    }

    /// Hotkeys wanted by the current settings and shortcuts.
    fn desired_hotkeys(&self) -> Vec<(String, String, HotkeyAction)> {
        let settings = self.settings.snapshot();
        let mut desired = Vec::new();

        for (name, combo) in &settings.hotkeys {
            match HotkeyAction::from_name(name) {
                Some(action) => desired.push((name.clone(), combo.clone(), action)),
                None => warn!(action = %name, "Unknown hotkey action in settings"),
            }
        }

        for shortcut in self.shortcuts.snapshot().iter() {
            if let Some(combo) = &shortcut.hotkey {
                desired.push((
                    format!("{}{}", SHORTCUT_HOTKEY_PREFIX, shortcut.id),
                    combo.clone(),
                    HotkeyAction::InsertShortcut(shortcut.id.clone()),
                ));
            }
        }
        desired
    }

    /// Bring the registrar in line with settings and shortcuts, touching only
    /// bindings that changed.
    pub fn sync_hotkeys(&mut self) {
        let desired = self.desired_hotkeys();
        let Some(registrar) = self.registrar.as_mut() else {
            return;
        };

        let wanted: HashSet<&str> = desired.iter().map(|(id, _, _)| id.as_str()).collect();
        for identifier in registrar.identifiers() {
            if !wanted.contains(identifier.as_str()) {
                registrar.unregister(&identifier);
            }
        }

        let mut conflicts = Vec::new();
        let mut unavailable = None;
        for (identifier, combo, action) in desired {
            let canonical = normalize_combo(&combo).ok();
            if canonical.is_some() && registrar.combo_of(&identifier) == canonical.as_deref() {
                continue;
            }

            let commands = self.commands.clone();
            let callback: HotkeyCallback = Box::new(move || {
                commands
                    .send(EngineCommand::Hotkey(action.clone()))
                    .map_err(|_| TypistError::Other("engine queue closed".to_string()))
            });

            match registrar.register(&identifier, &combo, callback) {
                Ok(_) => {}
                Err(err) => match err.class() {
                    ErrorClass::RecoverableConflict => conflicts.push((identifier, err)),
                    ErrorClass::FatalToFeature => {
                        unavailable = Some(err);
                        break;
                    }
                    _ => warn!(identifier = %identifier, error = %err, "Could not register hotkey"),
                },
            }
        }

        for (identifier, err) in conflicts {
            warn!(identifier = %identifier, error = %err, "Hotkey conflict");
            self.observer.on_hotkey_conflict(&identifier, &err);
        }
        if let Some(err) = unavailable {
            self.feature_unavailable(Feature::Hotkeys, &err);
        }
    }
}
