use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn enabled_by_default() -> bool {
    true
}

/// A snippet the user can expand by typing its trigger.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    #[serde(default = "new_id")]
    pub id: String,
    pub trigger: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl Shortcut {
    pub fn new(trigger: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            trigger: trigger.into(),
            content: content.into(),
            hotkey: None,
            enabled: true,
        }
    }

    pub fn with_hotkey(mut self, combo: impl Into<String>) -> Self {
        self.hotkey = Some(combo.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Trigger length in characters, which is what has to be erased.
    pub fn trigger_len(&self) -> usize {
        self.trigger.chars().count()
    }
}

/// One captured clipboard item.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClipboardSnapshot {
    pub plain_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rich_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_label: Option<String>,
    pub timestamp: DateTime<Local>,
}

impl ClipboardSnapshot {
    pub fn from_text(plain_text: impl Into<String>) -> Self {
        Self {
            plain_text: plain_text.into(),
            rich_text: None,
            markup_text: None,
            source_label: None,
            timestamp: Local::now(),
        }
    }

    pub fn preview(&self, width: usize) -> String {
        preview_text(&self.plain_text, width)
    }
}

/// One-line form of `text` for listings: control characters become spaces
/// and anything past `width` characters is cut with an ellipsis.
pub fn preview_text(text: &str, width: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= width {
        flat
    } else {
        let cut: String = flat.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

/// How a replayed clipboard item is formatted in the destination.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FormattingMode {
    /// Every format the item was captured with.
    #[default]
    KeepOriginal,
    /// Plain text only; the destination applies its own style.
    UseDestination,
    /// Plain text plus markup; rich text is dropped.
    MergeFormatting,
}

impl FormattingMode {
    pub fn name(&self) -> &'static str {
        match self {
            FormattingMode::KeepOriginal => "keep_original",
            FormattingMode::UseDestination => "use_destination",
            FormattingMode::MergeFormatting => "merge_formatting",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortcut_json_defaults_id_and_enabled() {
        let parsed: Shortcut =
            serde_json::from_str(r#"{"trigger":"sig","content":"Best regards"}"#).unwrap();
        assert!(parsed.enabled);
        assert!(!parsed.id.is_empty());
        assert_eq!(parsed.hotkey, None);
    }

    #[test]
    fn trigger_len_counts_chars_not_bytes() {
        assert_eq!(Shortcut::new("été", "summer").trigger_len(), 3);
    }

    #[test]
    fn preview_flattens_and_truncates() {
        let snapshot = ClipboardSnapshot::from_text("line one\nline two");
        assert_eq!(snapshot.preview(40), "line one line two");
        assert_eq!(snapshot.preview(5), "line…");
        assert_eq!(preview_text("tab\tstop", 20), "tab stop");
    }

    #[test]
    fn formatting_mode_uses_snake_case() {
        let json = serde_json::to_string(&FormattingMode::MergeFormatting).unwrap();
        assert_eq!(json, "\"merge_formatting\"");
    }
}
