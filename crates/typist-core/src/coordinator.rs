//! One expansion or replay cycle: erase, write the clipboard, paste.

use crate::clipboard::{ClipboardContent, ClipboardGateway};
use crate::config::Settings;
use crate::error::Result;
use crate::models::{ClipboardSnapshot, FormattingMode};
use crate::synth::InputSynthesizer;
use crate::tokens::{DateFormats, TokenExpander};
use crate::watcher::{ChangeOutcome, ClipboardWatcher};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// A matched trigger handed from the input monitor to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionRequest {
    pub shortcut_id: String,
    /// Characters to erase, not bytes.
    pub trigger_len: usize,
    pub content: String,
    pub delimiter: char,
    /// False when the keystroke source could not swallow the delimiter and it
    /// already reached the target application.
    pub delimiter_suppressed: bool,
}

/// Borrows the gateway, synthesizer and clipboard watcher for one cycle.
///
/// Every clipboard write goes through the watcher's suppression token. Right
/// before each write the watcher is polled once, so a copy the user made
/// earlier (for instance while a prompt dialog was open) is observed as an
/// external change instead of being charged to our write.
pub struct ExpansionCoordinator<'a> {
    gateway: &'a mut dyn ClipboardGateway,
    synth: &'a mut dyn InputSynthesizer,
    watcher: &'a mut ClipboardWatcher,
    settle_delay: Duration,
    restore_clipboard: bool,
    capture_clipboard: bool,
    observed: Vec<ChangeOutcome>,
}

impl<'a> ExpansionCoordinator<'a> {
    pub fn new(
        gateway: &'a mut dyn ClipboardGateway,
        synth: &'a mut dyn InputSynthesizer,
        watcher: &'a mut ClipboardWatcher,
        settings: &Settings,
    ) -> Self {
        Self {
            gateway,
            synth,
            watcher,
            settle_delay: settings.settle_delay(),
            restore_clipboard: settings.restore_clipboard,
            capture_clipboard: settings.capture_clipboard,
            observed: Vec::new(),
        }
    }

    /// External clipboard changes seen just before our writes, oldest first.
    pub fn take_observed(&mut self) -> Vec<ChangeOutcome> {
        std::mem::take(&mut self.observed)
    }

    fn settle(&self) {
        if !self.settle_delay.is_zero() {
            thread::sleep(self.settle_delay);
        }
    }

    /// Replace the typed trigger with the expanded content. Returns the text
    /// that was pasted.
    pub fn expand(
        &mut self,
        request: &ExpansionRequest,
        expander: &TokenExpander,
        formats: &DateFormats,
    ) -> Result<String> {
        let mut erase = request.trigger_len;
        if !request.delimiter_suppressed {
            erase += 1;
        }
        self.synth.erase(erase)?;
        self.settle();

        let mut text = expander.expand(&request.content, formats, &mut *self.gateway);
        if !request.delimiter_suppressed {
            text.push(request.delimiter);
        }

        let previous = if self.restore_clipboard {
            match self.gateway.read() {
                Ok(content) => Some(content),
                Err(err) => {
                    debug!(error = %err, "Could not save clipboard before expansion");
                    None
                }
            }
        } else {
            None
        };

        self.write(&ClipboardContent::plain(text.clone()), &text)?;
        self.settle();
        self.synth.paste()?;

        if let Some(previous) = previous {
            self.settle();
            let expected = previous.plain_text.clone().unwrap_or_default();
            if let Err(err) = self.write(&previous, &expected) {
                warn!(error = %err, "Failed to restore clipboard after expansion");
            }
        }

        debug!(shortcut = %request.shortcut_id, erased = erase, "Expansion pasted");
        Ok(text)
    }

    /// Paste a captured item using the given formatting policy.
    pub fn paste_snapshot(
        &mut self,
        snapshot: &ClipboardSnapshot,
        mode: FormattingMode,
    ) -> Result<()> {
        let content = content_for_mode(snapshot, mode);
        self.write(&content, &snapshot.plain_text)?;
        self.settle();
        self.synth.paste()
    }

    /// Observe any pending change, then write under a token bound to
    /// `expected`. A failed write leaves no token behind.
    fn write(&mut self, content: &ClipboardContent, expected: &str) -> Result<()> {
        if self.capture_clipboard {
            if let Some(outcome) = self.watcher.poll(&mut *self.gateway) {
                self.observed.push(outcome);
            }
        }

        self.watcher.suppression_mut().arm();
        self.watcher.suppression_mut().expect(expected);
        if let Err(err) = self.gateway.write(content) {
            self.watcher.suppression_mut().disarm();
            return Err(err);
        }
        Ok(())
    }
}

/// The clipboard slots a replay writes under each formatting mode.
pub fn content_for_mode(snapshot: &ClipboardSnapshot, mode: FormattingMode) -> ClipboardContent {
    let plain_text = Some(snapshot.plain_text.clone());
    match mode {
        FormattingMode::KeepOriginal => ClipboardContent {
            plain_text,
            rich_text: snapshot.rich_text.clone(),
            markup_text: snapshot.markup_text.clone(),
        },
        FormattingMode::UseDestination => ClipboardContent {
            plain_text,
            ..ClipboardContent::default()
        },
        FormattingMode::MergeFormatting => ClipboardContent {
            plain_text,
            rich_text: None,
            markup_text: snapshot.markup_text.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TypistError;
    use crate::focus::NoWindowLabel;
    use crate::prompt::NoPrompt;
    use crate::tokens::FixedClock;
    use chrono::{Local, TimeZone};

    #[derive(Default)]
    struct RecordingSynth {
        erased: usize,
        pastes: usize,
        fail_erase: bool,
    }

    impl InputSynthesizer for RecordingSynth {
        fn erase(&mut self, count: usize) -> Result<()> {
            if self.fail_erase {
                return Err(TypistError::Enigo("no input access".to_string()));
            }
            self.erased += count;
            Ok(())
        }

        fn paste(&mut self) -> Result<()> {
            self.pastes += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryClipboard {
        content: ClipboardContent,
        writes: Vec<ClipboardContent>,
    }

    impl ClipboardGateway for MemoryClipboard {
        fn read(&mut self) -> Result<ClipboardContent> {
            Ok(self.content.clone())
        }

        fn write(&mut self, content: &ClipboardContent) -> Result<()> {
            self.content = content.clone();
            self.writes.push(content.clone());
            Ok(())
        }
    }

    fn watcher() -> ClipboardWatcher {
        ClipboardWatcher::new(Box::new(NoWindowLabel))
    }

    fn settings() -> Settings {
        Settings {
            settle_delay_ms: 0,
            ..Settings::default()
        }
    }

    fn expander() -> TokenExpander {
        let now = Local.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        TokenExpander::new(Box::new(FixedClock(now)), Box::new(NoPrompt))
    }

    fn request(suppressed: bool) -> ExpansionRequest {
        ExpansionRequest {
            shortcut_id: "sig".to_string(),
            trigger_len: 3,
            content: "Best regards,\n{date}".to_string(),
            delimiter: ' ',
            delimiter_suppressed: suppressed,
        }
    }

    fn snapshot() -> ClipboardSnapshot {
        ClipboardSnapshot {
            rich_text: Some("{\\rtf1 hi}".to_string()),
            markup_text: Some("<b>hi</b>".to_string()),
            ..ClipboardSnapshot::from_text("hi")
        }
    }

    #[test]
    fn expansion_erases_trigger_writes_plain_text_and_pastes() {
        let mut clipboard = MemoryClipboard::default();
        let mut synth = RecordingSynth::default();
        let mut watcher = watcher();
        let formats = DateFormats::from(&settings());

        let text = ExpansionCoordinator::new(&mut clipboard, &mut synth, &mut watcher, &settings())
            .expand(&request(true), &expander(), &formats)
            .unwrap();

        assert_eq!(text, "Best regards,\n2024-01-15");
        assert_eq!(synth.erased, 3);
        assert_eq!(synth.pastes, 1);
        assert_eq!(clipboard.content, ClipboardContent::plain("Best regards,\n2024-01-15"));
        assert!(watcher.suppression_mut().consume(Some("Best regards,\n2024-01-15")));
    }

    #[test]
    fn unsuppressed_delimiter_is_erased_and_retyped() {
        let mut clipboard = MemoryClipboard::default();
        let mut synth = RecordingSynth::default();
        let mut watcher = watcher();
        let formats = DateFormats::from(&settings());

        let text = ExpansionCoordinator::new(&mut clipboard, &mut synth, &mut watcher, &settings())
            .expand(&request(false), &expander(), &formats)
            .unwrap();

        assert_eq!(synth.erased, 4);
        assert!(text.ends_with("2024-01-15 "));
    }

    #[test]
    fn failed_erase_disarms_and_leaves_clipboard_alone() {
        let mut clipboard = MemoryClipboard::default();
        let mut synth = RecordingSynth {
            fail_erase: true,
            ..RecordingSynth::default()
        };
        let mut watcher = watcher();
        let formats = DateFormats::from(&settings());

        let result = ExpansionCoordinator::new(&mut clipboard, &mut synth, &mut watcher, &settings())
            .expand(&request(true), &expander(), &formats);

        assert!(result.is_err());
        assert!(!watcher.suppression().is_armed());
        assert!(clipboard.writes.is_empty());
    }

    #[test]
    fn restore_puts_previous_content_back() {
        let mut clipboard = MemoryClipboard {
            content: ClipboardContent::plain("before"),
            ..MemoryClipboard::default()
        };
        let mut synth = RecordingSynth::default();
        let mut watcher = watcher();
        let settings = Settings {
            restore_clipboard: true,
            ..settings()
        };
        let formats = DateFormats::from(&settings);

        ExpansionCoordinator::new(&mut clipboard, &mut synth, &mut watcher, &settings)
            .expand(&request(true), &expander(), &formats)
            .unwrap();

        assert_eq!(clipboard.writes.len(), 2);
        assert_eq!(clipboard.content, ClipboardContent::plain("before"));
        assert!(watcher.suppression_mut().consume(Some("before")));
    }

    #[test]
    fn paste_snapshot_honours_formatting_mode() {
        for (mode, rich, markup) in [
            (FormattingMode::KeepOriginal, true, true),
            (FormattingMode::UseDestination, false, false),
            (FormattingMode::MergeFormatting, false, true),
        ] {
            let mut clipboard = MemoryClipboard::default();
            let mut synth = RecordingSynth::default();
            let mut watcher = watcher();

            ExpansionCoordinator::new(&mut clipboard, &mut synth, &mut watcher, &settings())
                .paste_snapshot(&snapshot(), mode)
                .unwrap();

            assert_eq!(clipboard.content.plain_text.as_deref(), Some("hi"));
            assert_eq!(clipboard.content.rich_text.is_some(), rich, "{:?}", mode);
            assert_eq!(clipboard.content.markup_text.is_some(), markup, "{:?}", mode);
            assert_eq!(synth.pastes, 1);
        }
    }

    #[test]
    fn copy_made_before_the_write_is_captured_not_suppressed() {
        let mut clipboard = MemoryClipboard {
            content: ClipboardContent::plain("old"),
            ..MemoryClipboard::default()
        };
        let mut synth = RecordingSynth::default();
        let mut watcher = watcher();
        watcher.poll(&mut clipboard);

        // The user copies something after the last poll but before the expansion writes.
        clipboard.content = ClipboardContent::plain("user copy");

        let mut coordinator =
            ExpansionCoordinator::new(&mut clipboard, &mut synth, &mut watcher, &settings());
        coordinator
            .expand(&request(true), &expander(), &DateFormats::from(&settings()))
            .unwrap();
        let observed = coordinator.take_observed();

        assert_eq!(observed.len(), 1);
        match &observed[0] {
            ChangeOutcome::Captured(snapshot) => assert_eq!(snapshot.plain_text, "user copy"),
            other => panic!("expected the user's copy, got {:?}", other),
        }
        assert_eq!(
            watcher.poll_after_self_write(&mut clipboard),
            Some(ChangeOutcome::Suppressed)
        );
    }

    #[test]
    fn no_pending_change_is_observed_when_capture_is_off() {
        let mut clipboard = MemoryClipboard::default();
        let mut synth = RecordingSynth::default();
        let mut watcher = watcher();
        watcher.poll(&mut clipboard);
        clipboard.content = ClipboardContent::plain("user copy");
        let settings = Settings {
            capture_clipboard: false,
            ..settings()
        };

        let mut coordinator =
            ExpansionCoordinator::new(&mut clipboard, &mut synth, &mut watcher, &settings);
        coordinator.paste_snapshot(&snapshot(), FormattingMode::UseDestination).unwrap();
        assert!(coordinator.take_observed().is_empty());
    }
}
