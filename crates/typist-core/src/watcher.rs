//! Clipboard change observation and capture.
//!
//! The watcher turns clipboard changes into `ClipboardSnapshot`s. It owns the
//! suppression token so the engine's own writes are never captured, and it
//! deduplicates against the last snapshot it emitted.

use crate::clipboard::{ClipboardContent, ClipboardGateway};
use crate::error::TypistError;
use crate::focus::WindowLabeler;
use crate::models::ClipboardSnapshot;
use crate::suppression::Suppression;
use chrono::Local;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::{debug, warn};

/// What happened to one observed clipboard change.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeOutcome {
    Captured(ClipboardSnapshot),
    /// The engine's own write.
    Suppressed,
    /// Same plain text as the previous snapshot.
    Duplicate,
    /// Image-only, file-only or empty content.
    NoText,
    /// Another process holds the clipboard; this event is dropped.
    Locked,
    Failed,
}

pub struct ClipboardWatcher {
    suppression: Suppression,
    last_emitted: Option<String>,
    last_change_count: Option<i64>,
    last_seen_hash: Option<u64>,
    labeler: Box<dyn WindowLabeler>,
}

impl ClipboardWatcher {
    pub fn new(labeler: Box<dyn WindowLabeler>) -> Self {
        Self {
            suppression: Suppression::new(),
            last_emitted: None,
            last_change_count: None,
            last_seen_hash: None,
            labeler,
        }
    }

    /// The token writers arm before touching the clipboard.
    pub fn suppression_mut(&mut self) -> &mut Suppression {
        &mut self.suppression
    }

    pub fn suppression(&self) -> &Suppression {
        &self.suppression
    }

    pub fn last_emitted(&self) -> Option<&str> {
        self.last_emitted.as_deref()
    }

    /// Handle one clipboard-change notification.
    pub fn on_clipboard_changed(&mut self, gateway: &mut dyn ClipboardGateway) -> ChangeOutcome {
        if self.suppression.is_blind() {
            self.suppression.consume(None);
            debug!("Skipping clipboard change caused by our own write");
            return ChangeOutcome::Suppressed;
        }

        match gateway.read() {
            Ok(content) => self.process(content),
            Err(TypistError::ClipboardLocked) => {
                // Expected under contention; the token still expires with this event.
                self.suppression.consume(None);
                ChangeOutcome::Locked
            }
            Err(err) => {
                self.suppression.consume(None);
                warn!(error = %err, "Failed to read clipboard after change");
                ChangeOutcome::Failed
            }
        }
    }

    fn process(&mut self, content: ClipboardContent) -> ChangeOutcome {
        let text = content.text();
        if self.suppression.consume(text) {
            debug!("Skipping clipboard change caused by our own write");
            return ChangeOutcome::Suppressed;
        }

        let Some(text) = text else {
            return ChangeOutcome::NoText;
        };

        if self.last_emitted.as_deref() == Some(text) {
            return ChangeOutcome::Duplicate;
        }

        let source_label = match self.labeler.focused_label() {
            Ok(label) => label,
            Err(err) => {
                debug!(error = %err, "Focused window lookup failed");
                None
            }
        };

        let snapshot = ClipboardSnapshot {
            plain_text: text.to_string(),
            rich_text: content.rich_text.clone(),
            markup_text: content.markup_text.clone(),
            source_label,
            timestamp: Local::now(),
        };
        self.last_emitted = Some(snapshot.plain_text.clone());
        ChangeOutcome::Captured(snapshot)
    }

    /// Poll right after the engine's own writes. A token that no change
    /// consumed (for example a restored clipboard that hashes the same as
    /// before) is dropped so it cannot swallow a later external copy.
    pub fn poll_after_self_write(
        &mut self,
        gateway: &mut dyn ClipboardGateway,
    ) -> Option<ChangeOutcome> {
        let outcome = self.poll(gateway);
        if outcome.is_none() {
            self.suppression.disarm();
        }
        outcome
    }

    /// Check for a clipboard change and handle it. Returns `None` when the
    /// clipboard did not change since the last poll.
    ///
    /// Uses the OS change counter when the gateway has one, otherwise compares
    /// a hash of the plain text. The content present at the first poll is
    /// taken as the baseline, not as a change.
    pub fn poll(&mut self, gateway: &mut dyn ClipboardGateway) -> Option<ChangeOutcome> {
        if let Some(count) = gateway.change_count() {
            let previous = self.last_change_count.replace(count);
            return match previous {
                Some(previous) if previous != count => Some(self.on_clipboard_changed(gateway)),
                _ => None,
            };
        }

        let text = match gateway.read_text() {
            Ok(text) => text,
            Err(TypistError::ClipboardLocked) => return None,
            Err(err) => {
                debug!(error = %err, "Clipboard poll failed");
                return None;
            }
        };

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let hash = hasher.finish();

        match self.last_seen_hash.replace(hash) {
            Some(previous) if previous != hash => Some(self.on_clipboard_changed(gateway)),
            _ => None,
        }
    }
}
