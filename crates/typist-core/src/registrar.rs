//! Global hotkey registration and dispatch.

use crate::error::{Result, TypistError};
use crate::hotkey::{format_combo, parse_combo};
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error, info, warn};

/// Identifier of one registration, allocated from the reserved range.
pub type Atom = u16;

pub const ATOM_FIRST: Atom = 0xC000;
pub const ATOM_LAST: Atom = 0xFFFF;

pub type HotkeyCallback = Box<dyn FnMut() -> Result<()>>;

/// The OS side of hotkey registration.
pub trait HotkeyBackend {
    /// Bind a combo to `atom`. Held-down repeats must not fire again.
    fn bind(&mut self, atom: Atom, modifiers: Modifiers, code: Code) -> Result<()>;

    fn unbind(&mut self, atom: Atom) -> Result<()>;

    /// Atoms whose hotkey was pressed since the last call, in order.
    fn poll_fired(&mut self) -> Vec<Atom>;
}

struct Registration {
    identifier: String,
    combo: String,
    callback: HotkeyCallback,
}

pub struct HotkeyRegistrar {
    backend: Box<dyn HotkeyBackend>,
    next_atom: Atom,
    by_atom: HashMap<Atom, Registration>,
    by_identifier: HashMap<String, Atom>,
}

impl HotkeyRegistrar {
    pub fn new(backend: Box<dyn HotkeyBackend>) -> Self {
        Self {
            backend,
            next_atom: ATOM_FIRST,
            by_atom: HashMap::new(),
            by_identifier: HashMap::new(),
        }
    }

    fn allocate_atom(&mut self) -> Result<Atom> {
        let range = usize::from(ATOM_LAST - ATOM_FIRST) + 1;
        for _ in 0..range {
            let atom = self.next_atom;
            self.next_atom = if atom == ATOM_LAST {
                ATOM_FIRST
            } else {
                atom + 1
            };
            if !self.by_atom.contains_key(&atom) {
                return Ok(atom);
            }
        }
        Err(TypistError::HotkeyBackend(
            "no free hotkey identifiers left".to_string(),
        ))
    }

    /// Bind `combo` to `identifier`, replacing any earlier binding for it.
    ///
    /// A combo already owned by another application fails with
    /// `TypistError::HotkeyConflict`; the other registrations are untouched.
    pub fn register(
        &mut self,
        identifier: &str,
        combo: &str,
        callback: HotkeyCallback,
    ) -> Result<Atom> {
        let (modifiers, code) = parse_combo(combo)?;
        self.unregister(identifier);

        let atom = self.allocate_atom()?;
        self.backend.bind(atom, modifiers, code)?;

        let combo = format_combo(modifiers, code);
        info!(identifier, combo = %combo, atom, "Registered hotkey");
        self.by_identifier.insert(identifier.to_string(), atom);
        self.by_atom.insert(
            atom,
            Registration {
                identifier: identifier.to_string(),
                combo,
                callback,
            },
        );
        Ok(atom)
    }

    /// Release the binding for `identifier`. Returns false if there was none.
    pub fn unregister(&mut self, identifier: &str) -> bool {
        let Some(atom) = self.by_identifier.remove(identifier) else {
            return false;
        };
        self.by_atom.remove(&atom);
        if let Err(err) = self.backend.unbind(atom) {
            // Our tables are already updated; the OS side may linger.
            warn!(identifier, atom, error = %err, "Failed to unbind hotkey");
        }
        debug!(identifier, atom, "Unregistered hotkey");
        true
    }

    pub fn unregister_all(&mut self) {
        for identifier in self.identifiers() {
            self.unregister(&identifier);
        }
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.by_identifier.keys().cloned().collect()
    }

    pub fn atom_of(&self, identifier: &str) -> Option<Atom> {
        self.by_identifier.get(identifier).copied()
    }

    /// Canonical combo bound to `identifier`.
    pub fn combo_of(&self, identifier: &str) -> Option<&str> {
        let atom = self.by_identifier.get(identifier)?;
        self.by_atom.get(atom).map(|r| r.combo.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_atom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_atom.is_empty()
    }

    /// Run the callback registered for `atom`. Errors and panics inside the
    /// callback are logged here and never propagated.
    pub fn dispatch(&mut self, atom: Atom) -> bool {
        let Some(registration) = self.by_atom.get_mut(&atom) else {
            debug!(atom, "Hotkey fired for unknown atom");
            return false;
        };

        let Registration {
            identifier,
            callback,
            ..
        } = registration;
        let identifier = identifier.as_str();
        match catch_unwind(AssertUnwindSafe(|| callback())) {
            Ok(Ok(())) => debug!(identifier, "Hotkey handled"),
            Ok(Err(err)) => warn!(identifier, error = %err, "Hotkey callback failed"),
            Err(_) => error!(identifier, "Hotkey callback panicked"),
        }
        true
    }

    /// Dispatch everything the backend reported since the last poll.
    pub fn poll(&mut self) -> usize {
        let fired = self.backend.poll_fired();
        fired.into_iter().filter(|atom| self.dispatch(*atom)).count()
    }
}

impl Drop for HotkeyRegistrar {
    fn drop(&mut self) {
        self.unregister_all();
    }
}

/// Backend over the `global-hotkey` crate.
///
/// On Windows and macOS the OS only delivers hotkey presses to the thread
/// that registered them, and only while that thread services its message
/// queue or run loop. `poll_fired` does that servicing, so the backend must
/// be created and polled on the same thread (the main thread on macOS).
pub struct GlobalHotkeyBackend {
    manager: GlobalHotKeyManager,
    bound: HashMap<Atom, HotKey>,
    atoms_by_id: HashMap<u32, Atom>,
    held: HashSet<u32>,
}

impl GlobalHotkeyBackend {
    pub fn new() -> Result<Self> {
        #[cfg(target_os = "macos")]
        if !on_main_thread() {
            return Err(TypistError::HotkeysUnavailable(
                "hotkeys must be registered from the main thread".to_string(),
            ));
        }

        let manager = GlobalHotKeyManager::new()
            .map_err(|err| TypistError::HotkeysUnavailable(err.to_string()))?;
        Ok(Self {
            manager,
            bound: HashMap::new(),
            atoms_by_id: HashMap::new(),
            held: HashSet::new(),
        })
    }
}

fn map_hotkey_error(err: global_hotkey::Error, combo: String) -> TypistError {
    match err {
        global_hotkey::Error::AlreadyRegistered(_) | global_hotkey::Error::FailedToRegister(_) => {
            TypistError::HotkeyConflict(combo)
        }
        other => TypistError::HotkeyBackend(format!("'{}': {}", combo, other)),
    }
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn bind(&mut self, atom: Atom, modifiers: Modifiers, code: Code) -> Result<()> {
        let mods = if modifiers.is_empty() {
            None
        } else {
            Some(modifiers)
        };
        let hotkey = HotKey::new(mods, code);
        self.manager
            .register(hotkey)
            .map_err(|err| map_hotkey_error(err, format_combo(modifiers, code)))?;

        self.atoms_by_id.insert(hotkey.id(), atom);
        self.bound.insert(atom, hotkey);
        Ok(())
    }

    fn unbind(&mut self, atom: Atom) -> Result<()> {
        let Some(hotkey) = self.bound.remove(&atom) else {
            return Ok(());
        };
        self.atoms_by_id.remove(&hotkey.id());
        self.held.remove(&hotkey.id());
        self.manager
            .unregister(hotkey)
            .map_err(|err| TypistError::HotkeyBackend(err.to_string()))
    }

    fn poll_fired(&mut self) -> Vec<Atom> {
        pump_platform_events();

        let mut fired = Vec::new();
        for event in GlobalHotKeyEvent::receiver().try_iter() {
            match event.state {
                HotKeyState::Pressed => {
                    // Auto-repeat delivers more presses before the release.
                    if !self.held.insert(event.id) {
                        continue;
                    }
                    if let Some(atom) = self.atoms_by_id.get(&event.id) {
                        fired.push(*atom);
                    }
                }
                HotKeyState::Released => {
                    self.held.remove(&event.id);
                }
            }
        }
        fired
    }
}

/// Service pending window messages so hotkey presses get dispatched. Never
/// blocks.
#[cfg(windows)]
pub fn pump_platform_events() {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE,
    };

    unsafe {
        let mut msg = MSG::default();
        while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).into() {
            let _ = TranslateMessage(&msg);
            let _ = DispatchMessageW(&msg);
        }
    }
}

/// Run the current run loop once without waiting so Carbon hotkey events
/// are dispatched.
#[cfg(target_os = "macos")]
pub fn pump_platform_events() {
    use core_foundation::runloop::{kCFRunLoopDefaultMode, CFRunLoop, CFRunLoopRunResult};
    use std::time::Duration;

    // One source per call; keep going until nothing is pending.
    while let CFRunLoopRunResult::HandledSource =
        CFRunLoop::run_in_mode(unsafe { kCFRunLoopDefaultMode }, Duration::ZERO, true)
    {}
}

/// X11 hotkeys are read by global-hotkey's own thread.
#[cfg(not(any(windows, target_os = "macos")))]
pub fn pump_platform_events() {}

#[cfg(target_os = "macos")]
fn on_main_thread() -> bool {
    use objc::runtime::{Class, BOOL, NO};
    use objc::{msg_send, sel, sel_impl};

    match Class::get("NSThread") {
        Some(class) => {
            let main: BOOL = unsafe { msg_send![class, isMainThread] };
            main != NO
        }
        None => false,
    }
}
