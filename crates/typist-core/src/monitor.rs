//! Keystroke handling on the hook thread.
//!
//! The monitor only does buffer bookkeeping. A matched trigger is posted to
//! the engine as an `ExpansionRequest` and the callback returns right away.

use crate::buffer::TypingBuffer;
use crate::config::SharedSettings;
use crate::coordinator::ExpansionRequest;
use crate::engine::EngineCommand;
use crate::error::Result;
use crate::keymap::{map_key, MappedKey, ModifierKey};
use crate::matcher::{find_match, ShortcutSet};
use rdev::Key;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub action: KeyAction,
}

impl KeyEvent {
    pub fn press(key: Key) -> Self {
        Self {
            key,
            action: KeyAction::Press,
        }
    }

    pub fn release(key: Key) -> Self {
        Self {
            key,
            action: KeyAction::Release,
        }
    }
}

/// Whether the keystroke should reach the focused application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookDecision {
    Pass,
    Suppress,
}

/// Global on/off switch for expansion, flipped by the toggle hotkey.
#[derive(Debug, Clone)]
pub struct ExpansionSwitch(Arc<AtomicBool>);

impl ExpansionSwitch {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Relaxed);
    }

    /// Flip the switch and return the new state.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::Relaxed)
    }
}

impl Default for ExpansionSwitch {
    fn default() -> Self {
        Self::new(true)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct HeldModifiers {
    shift: bool,
    control: bool,
    alt: bool,
    meta: bool,
}

impl HeldModifiers {
    fn set(&mut self, modifier: ModifierKey, down: bool) {
        match modifier {
            ModifierKey::Shift => self.shift = down,
            ModifierKey::Control => self.control = down,
            ModifierKey::Alt => self.alt = down,
            ModifierKey::Meta => self.meta = down,
            ModifierKey::CapsLock => {}
        }
    }

    /// A character typed with one of these held is a chord, not text.
    fn chording(&self) -> bool {
        self.control || self.alt || self.meta
    }
}

pub struct InputMonitor {
    buffer: TypingBuffer,
    modifiers: HeldModifiers,
    shortcuts: ShortcutSet,
    settings: SharedSettings,
    switch: ExpansionSwitch,
    commands: Sender<EngineCommand>,
    can_suppress: bool,
}

impl InputMonitor {
    pub fn new(
        shortcuts: ShortcutSet,
        settings: SharedSettings,
        switch: ExpansionSwitch,
        commands: Sender<EngineCommand>,
    ) -> Self {
        let capacity = settings.snapshot().buffer_capacity;
        Self {
            buffer: TypingBuffer::new(capacity),
            modifiers: HeldModifiers::default(),
            shortcuts,
            settings,
            switch,
            commands,
            can_suppress: true,
        }
    }

    /// Set whether the keystroke source can swallow the delimiter.
    pub fn with_suppression(mut self, can_suppress: bool) -> Self {
        self.can_suppress = can_suppress;
        self
    }

    pub fn buffer(&self) -> &TypingBuffer {
        &self.buffer
    }

    /// Process one raw key event. Never blocks.
    pub fn handle(&mut self, event: &KeyEvent) -> HookDecision {
        let settings = self.settings.snapshot();
        let mapped = map_key(event.key, self.modifiers.shift, settings.fold_case);

        if event.action == KeyAction::Release {
            if let MappedKey::Modifier(modifier) = mapped {
                self.modifiers.set(modifier, false);
            }
            return HookDecision::Pass;
        }

        if let MappedKey::Modifier(modifier) = mapped {
            self.modifiers.set(modifier, true);
            return HookDecision::Pass;
        }

        if !self.switch.is_enabled() {
            self.buffer.clear();
            return HookDecision::Pass;
        }

        if self.buffer.capacity() != settings.buffer_capacity.max(2) {
            self.buffer = TypingBuffer::new(settings.buffer_capacity);
        }

        match mapped {
            MappedKey::Backspace => {
                self.buffer.pop();
                HookDecision::Pass
            }
            MappedKey::Named(_) | MappedKey::Modifier(_) => {
                self.buffer.clear();
                HookDecision::Pass
            }
            MappedKey::Char(_) if self.modifiers.chording() => {
                self.buffer.clear();
                HookDecision::Pass
            }
            MappedKey::Char(c) if settings.delimiters.contains(c) => {
                let typed = self.buffer.text();
                self.buffer.clear();

                let shortcuts = self.shortcuts.snapshot();
                let Some(shortcut) = find_match(&typed, &shortcuts, &settings.delimiters) else {
                    return HookDecision::Pass;
                };

                let request = ExpansionRequest {
                    shortcut_id: shortcut.id.clone(),
                    trigger_len: shortcut.trigger_len(),
                    content: shortcut.content.clone(),
                    delimiter: c,
                    delimiter_suppressed: self.can_suppress,
                };
                debug!(trigger = %shortcut.trigger, "Trigger matched");

                match self.commands.send(EngineCommand::Expand(request)) {
                    Ok(()) if self.can_suppress => HookDecision::Suppress,
                    Ok(()) => HookDecision::Pass,
                    Err(_) => {
                        warn!("Engine stopped; letting the delimiter through");
                        HookDecision::Pass
                    }
                }
            }
            MappedKey::Char(c) => {
                self.buffer.push(c);
                HookDecision::Pass
            }
        }
    }

    fn commands(&self) -> Sender<EngineCommand> {
        self.commands.clone()
    }
}

/// Delivers raw key events from the OS.
pub trait KeystrokeSource {
    /// Whether returning `HookDecision::Suppress` actually swallows the key.
    fn can_suppress(&self) -> bool;

    /// Install the hook and deliver events until it stops. Blocks.
    fn run(self: Box<Self>, handler: Box<dyn FnMut(KeyEvent) -> HookDecision>) -> Result<()>;
}

/// Run `source` on its own thread with `monitor` handling every event.
///
/// A hook that fails to install, or stops with an error, is reported to the
/// engine once as `EngineCommand::HookFailed`. It is not retried.
pub fn spawn_input_monitor(
    source: Box<dyn KeystrokeSource + Send>,
    monitor: InputMonitor,
) -> Result<JoinHandle<()>> {
    let monitor = monitor.with_suppression(source.can_suppress());
    let commands = monitor.commands();

    let handle = thread::Builder::new()
        .name("typist-input".to_string())
        .spawn(move || {
            let mut monitor = monitor;
            let handler = Box::new(move |event: KeyEvent| monitor.handle(&event));
            if let Err(err) = source.run(handler) {
                error!(error = %err, "Keystroke hook stopped");
                let _ = commands.send(EngineCommand::HookFailed(err));
            }
        })?;
    Ok(handle)
}
