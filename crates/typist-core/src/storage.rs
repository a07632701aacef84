use crate::config::{ensure_config_dir, get_db_file_path, Settings};
use crate::error::{Result, TypistError};
use crate::models::Shortcut;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// JSON-file backed shortcut database.
#[derive(Debug, Clone)]
pub struct ShortcutStore {
    path: PathBuf,
    /// Delimiters and case folding that new triggers are checked against.
    rules: Settings,
}

impl ShortcutStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rules: Settings::default(),
        }
    }

    /// Check new triggers against `settings` instead of the defaults.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.rules = settings;
        self
    }

    /// The store at the default location, creating the config directory if needed.
    pub fn open_default() -> Result<Self> {
        ensure_config_dir()?;
        Ok(Self::new(get_db_file_path()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all shortcuts from the database
    pub fn load(&self) -> Result<Vec<Shortcut>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }

        let content = fs::read_to_string(&self.path)?;

        // Handle empty database file
        if content.trim().is_empty() {
            return Ok(vec![]);
        }

        serde_json::from_str(&content).map_err(|e| e.into())
    }

    /// Save shortcuts to the database file
    pub fn save(&self, shortcuts: &[Shortcut]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(&shortcuts)?;
        fs::write(&self.path, serialized)?;
        Ok(())
    }

    /// Add a new shortcut. Empty, duplicate and untypeable triggers are
    /// rejected here so the matcher never has to arbitrate between them.
    pub fn add(&self, shortcut: Shortcut) -> Result<Shortcut> {
        if shortcut.trigger.is_empty() {
            return Err(TypistError::InvalidConfig(
                "trigger must not be empty".to_string(),
            ));
        }
        self.rules.check_trigger(&shortcut.trigger)?;

        let mut shortcuts = self.load()?;
        if shortcuts.iter().any(|s| s.trigger == shortcut.trigger) {
            return Err(TypistError::DuplicateTrigger(shortcut.trigger));
        }

        shortcuts.push(shortcut.clone());
        self.save(&shortcuts)?;
        Ok(shortcut)
    }

    /// Delete a shortcut by trigger
    pub fn delete(&self, trigger: &str) -> Result<()> {
        let mut shortcuts = self.load()?;
        let before = shortcuts.len();
        shortcuts.retain(|s| s.trigger != trigger);
        if shortcuts.len() == before {
            return Err(TypistError::ShortcutNotFound(trigger.to_string()));
        }
        self.save(&shortcuts)
    }

    /// Replace the content of an existing shortcut
    pub fn update(&self, trigger: &str, content: String) -> Result<()> {
        self.modify(trigger, |s| s.content = content)
    }

    pub fn set_hotkey(&self, trigger: &str, combo: Option<String>) -> Result<()> {
        self.modify(trigger, |s| s.hotkey = combo)
    }

    pub fn set_enabled(&self, trigger: &str, enabled: bool) -> Result<()> {
        self.modify(trigger, |s| s.enabled = enabled)
    }

    fn modify(&self, trigger: &str, change: impl FnOnce(&mut Shortcut)) -> Result<()> {
        let mut shortcuts = self.load()?;
        let entry = shortcuts
            .iter_mut()
            .find(|s| s.trigger == trigger)
            .ok_or_else(|| TypistError::ShortcutNotFound(trigger.to_string()))?;
        change(entry);
        self.save(&shortcuts)
    }
}

/// Triggers used by more than one shortcut, with the ids involved in list order.
pub fn find_trigger_conflicts(shortcuts: &[Shortcut]) -> Vec<(String, Vec<String>)> {
    let mut by_trigger: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for shortcut in shortcuts {
        by_trigger
            .entry(shortcut.trigger.as_str())
            .or_default()
            .push(shortcut.id.clone());
    }

    by_trigger
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(trigger, ids)| (trigger.to_string(), ids))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DelimiterSet;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, ShortcutStore) {
        let dir = tempdir().unwrap();
        let store = ShortcutStore::new(dir.path().join("shortcuts.json"));
        (dir, store)
    }

    #[test]
    fn missing_and_empty_files_load_as_empty() {
        let (_dir, store) = store();
        assert!(store.load().unwrap().is_empty());
        fs::write(store.path(), "  \n").unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn add_update_delete() {
        let (_dir, store) = store();
        store.add(Shortcut::new("sig", "Best regards")).unwrap();
        store.update("sig", "Cheers".to_string()).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].content, "Cheers");

        store.delete("sig").unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn duplicate_trigger_is_rejected() {
        let (_dir, store) = store();
        store.add(Shortcut::new("sig", "one")).unwrap();
        let err = store.add(Shortcut::new("sig", "two")).unwrap_err();
        assert!(matches!(err, TypistError::DuplicateTrigger(t) if t == "sig"));
    }

    #[test]
    fn empty_trigger_is_rejected() {
        let (_dir, store) = store();
        assert!(matches!(
            store.add(Shortcut::new("", "x")),
            Err(TypistError::InvalidConfig(_))
        ));
    }

    #[test]
    fn trigger_with_delimiter_is_rejected() {
        let (_dir, store) = store();
        for trigger in ["my sig", "sig.", "a,b"] {
            assert!(
                matches!(
                    store.add(Shortcut::new(trigger, "x")),
                    Err(TypistError::InvalidConfig(_))
                ),
                "{:?} was accepted",
                trigger
            );
        }
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn uppercase_trigger_depends_on_case_folding() {
        let (dir, store) = store();
        assert!(matches!(
            store.add(Shortcut::new("Sig", "x")),
            Err(TypistError::InvalidConfig(_))
        ));

        let settings = Settings {
            fold_case: false,
            ..Settings::default()
        };
        let exact = ShortcutStore::new(dir.path().join("shortcuts.json")).with_settings(settings);
        exact.add(Shortcut::new("Sig", "x")).unwrap();
        assert_eq!(exact.load().unwrap()[0].trigger, "Sig");
    }

    #[test]
    fn custom_delimiters_free_up_punctuation() {
        let (dir, _store) = store();
        let settings = Settings {
            delimiters: DelimiterSet::new([' ']),
            ..Settings::default()
        };
        let store = ShortcutStore::new(dir.path().join("shortcuts.json")).with_settings(settings);
        store.add(Shortcut::new("e.g", "for example")).unwrap();
    }

    #[test]
    fn unknown_trigger_reports_not_found() {
        let (_dir, store) = store();
        assert!(matches!(
            store.set_enabled("nope", false),
            Err(TypistError::ShortcutNotFound(_))
        ));
        assert!(matches!(
            store.delete("nope"),
            Err(TypistError::ShortcutNotFound(_))
        ));
    }

    #[test]
    fn conflicts_are_reported_for_hand_edited_files() {
        let mut first = Shortcut::new("sig", "one");
        first.id = "a".to_string();
        let mut second = Shortcut::new("sig", "two");
        second.id = "b".to_string();
        let other = Shortcut::new("addr", "street");

        let conflicts = find_trigger_conflicts(&[first, other, second]);
        assert_eq!(
            conflicts,
            vec![("sig".to_string(), vec!["a".to_string(), "b".to_string()])]
        );
    }
}
