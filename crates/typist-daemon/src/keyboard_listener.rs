use rdev::{Event, EventType};
use typist_core::monitor::{HookDecision, KeyEvent, KeystrokeSource};
use typist_core::{Result, TypistError};

/// Keystroke source over rdev.
///
/// Uses `rdev::grab` where it is available, so a matched delimiter can be
/// swallowed. Elsewhere it falls back to `rdev::listen`, which only observes.
#[derive(Debug, Default, Clone, Copy)]
pub struct RdevSource;

impl RdevSource {
    pub fn new() -> Self {
        Self
    }
}

fn to_key_event(event: &Event) -> Option<KeyEvent> {
    match event.event_type {
        EventType::KeyPress(key) => Some(KeyEvent::press(key)),
        EventType::KeyRelease(key) => Some(KeyEvent::release(key)),
        _ => None,
    }
}

impl KeystrokeSource for RdevSource {
    fn can_suppress(&self) -> bool {
        cfg!(any(
            target_os = "macos",
            target_os = "windows",
            feature = "grab"
        ))
    }

    #[cfg(any(target_os = "macos", target_os = "windows", feature = "grab"))]
    fn run(self: Box<Self>, handler: Box<dyn FnMut(KeyEvent) -> HookDecision>) -> Result<()> {
        use std::cell::RefCell;

        let handler = RefCell::new(handler);
        rdev::grab(move |event: Event| {
            let Some(key_event) = to_key_event(&event) else {
                return Some(event);
            };
            let decision = {
                let mut handler = handler.borrow_mut();
                (*handler)(key_event)
            };
            match decision {
                HookDecision::Suppress => None,
                HookDecision::Pass => Some(event),
            }
        })
        .map_err(|err| TypistError::Hook(format!("{:?}", err)))
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", feature = "grab")))]
    fn run(self: Box<Self>, mut handler: Box<dyn FnMut(KeyEvent) -> HookDecision>) -> Result<()> {
        rdev::listen(move |event: Event| {
            if let Some(key_event) = to_key_event(&event) {
                // Observe-only: the decision cannot be honoured here.
                let _ = handler(key_event);
            }
        })
        .map_err(|err| TypistError::Hook(format!("{:?}", err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdev::Key;
    use std::time::SystemTime;
    use typist_core::monitor::KeyAction;

    fn event(event_type: EventType) -> Event {
        Event {
            time: SystemTime::now(),
            name: None,
            event_type,
        }
    }

    #[test]
    fn key_events_are_translated() {
        let press = to_key_event(&event(EventType::KeyPress(Key::KeyA))).unwrap();
        assert_eq!(press.key, Key::KeyA);
        assert_eq!(press.action, KeyAction::Press);

        let release = to_key_event(&event(EventType::KeyRelease(Key::Space))).unwrap();
        assert_eq!(release.action, KeyAction::Release);
    }

    #[test]
    fn mouse_events_are_ignored() {
        assert_eq!(
            to_key_event(&event(EventType::MouseMove { x: 1.0, y: 2.0 })),
            None
        );
    }
}
