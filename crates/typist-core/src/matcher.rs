use crate::config::DelimiterSet;
use crate::models::Shortcut;
use std::sync::{Arc, RwLock};

/// Find the shortcut whose trigger ends the buffer at a word boundary.
///
/// Shortcuts are tried in list order and the first hit wins; there is no
/// longest-match preference. Duplicate triggers are the store's problem.
pub fn find_match<'a>(
    buffer: &str,
    shortcuts: &'a [Shortcut],
    delimiters: &DelimiterSet,
) -> Option<&'a Shortcut> {
    shortcuts.iter().find(|shortcut| {
        if !shortcut.enabled || shortcut.trigger.is_empty() {
            return false;
        }
        let Some(prefix) = buffer.strip_suffix(shortcut.trigger.as_str()) else {
            return false;
        };
        match prefix.chars().next_back() {
            None => true,
            Some(c) => delimiters.contains(c),
        }
    })
}

/// The active shortcut list, replaced wholesale whenever the store changes.
#[derive(Debug, Clone, Default)]
pub struct ShortcutSet(Arc<RwLock<Arc<Vec<Shortcut>>>>);

impl ShortcutSet {
    pub fn new(shortcuts: Vec<Shortcut>) -> Self {
        Self(Arc::new(RwLock::new(Arc::new(shortcuts))))
    }

    pub fn snapshot(&self) -> Arc<Vec<Shortcut>> {
        match self.0.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn replace(&self, shortcuts: Vec<Shortcut>) {
        let next = Arc::new(shortcuts);
        match self.0.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    pub fn find_by_id(&self, id: &str) -> Option<Shortcut> {
        self.snapshot().iter().find(|s| s.id == id).cloned()
    }
}
