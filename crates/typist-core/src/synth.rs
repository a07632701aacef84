use crate::error::{Result, TypistError};
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use std::thread;
use std::time::Duration;

/// Sends synthetic key events to the focused application.
pub trait InputSynthesizer {
    /// Send `count` backspace key presses.
    fn erase(&mut self, count: usize) -> Result<()>;

    /// Send the platform paste shortcut.
    fn paste(&mut self) -> Result<()>;
}

/// Synthesizer backed by enigo.
pub struct EnigoSynthesizer {
    keyboard: Enigo,
    key_delay: Duration,
}

impl EnigoSynthesizer {
    pub fn new() -> Result<Self> {
        let keyboard = Enigo::new(&Settings::default()).map_err(|err| {
            TypistError::Enigo(format!("Failed to create keyboard controller: {}", err))
        })?;
        Ok(Self {
            keyboard,
            key_delay: Duration::from_millis(2),
        })
    }

    fn key(&mut self, key: Key, direction: Direction) -> Result<()> {
        self.keyboard
            .key(key, direction)
            .map_err(|err| TypistError::Enigo(format!("Failed to send {:?}: {}", key, err)))
    }
}

#[cfg(target_os = "macos")]
const PASTE_MODIFIER: Key = Key::Meta;
#[cfg(not(target_os = "macos"))]
const PASTE_MODIFIER: Key = Key::Control;

impl InputSynthesizer for EnigoSynthesizer {
    fn erase(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            thread::sleep(self.key_delay);
            self.key(Key::Backspace, Direction::Click)?;
        }
        Ok(())
    }

    fn paste(&mut self) -> Result<()> {
        self.key(PASTE_MODIFIER, Direction::Press)?;
        let clicked = self.key(Key::Unicode('v'), Direction::Click);
        // Release the modifier even when the click failed so it is not left stuck.
        let released = self.key(PASTE_MODIFIER, Direction::Release);
        clicked.and(released)
    }
}
