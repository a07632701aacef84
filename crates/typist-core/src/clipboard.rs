use crate::error::{Result, TypistError};
use arboard::Clipboard;
use tracing::debug;

/// The format slots read from or written to the clipboard in one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardContent {
    pub plain_text: Option<String>,
    /// Opaque rich-text blob (RTF).
    pub rich_text: Option<String>,
    /// Opaque markup blob (HTML).
    pub markup_text: Option<String>,
}

impl ClipboardContent {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            plain_text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Plain text, if present and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.plain_text.as_deref().filter(|t| !t.is_empty())
    }
}

/// Access to the system clipboard.
pub trait ClipboardGateway {
    /// Read every available slot. Missing slots are `None`.
    fn read(&mut self) -> Result<ClipboardContent>;

    /// Read only the plain text slot.
    fn read_text(&mut self) -> Result<Option<String>> {
        Ok(self.read()?.plain_text)
    }

    /// Replace the clipboard with `content`, all slots at once.
    fn write(&mut self, content: &ClipboardContent) -> Result<()>;

    /// A counter the OS bumps on every clipboard change, when it exposes one.
    fn change_count(&mut self) -> Option<i64> {
        None
    }
}

/// Clipboard gateway backed by arboard.
///
/// arboard exposes plain text and HTML; there is no RTF slot, so rich text is
/// neither read nor written by this backend.
pub struct ArboardGateway {
    clipboard: Clipboard,
}

impl ArboardGateway {
    pub fn new() -> Result<Self> {
        let clipboard = Clipboard::new().map_err(map_arboard_error)?;
        Ok(Self { clipboard })
    }
}

fn map_arboard_error(err: arboard::Error) -> TypistError {
    match err {
        arboard::Error::ClipboardOccupied => TypistError::ClipboardLocked,
        other => TypistError::Clipboard(other.to_string()),
    }
}

/// `ContentNotAvailable` just means the slot is empty.
fn optional<T>(result: std::result::Result<T, arboard::Error>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(arboard::Error::ContentNotAvailable) => Ok(None),
        Err(err) => Err(map_arboard_error(err)),
    }
}

impl ClipboardGateway for ArboardGateway {
    fn read(&mut self) -> Result<ClipboardContent> {
        let plain_text = optional(self.clipboard.get_text())?;
        let markup_text = match optional(self.clipboard.get().html()) {
            Ok(html) => html,
            Err(TypistError::ClipboardLocked) => return Err(TypistError::ClipboardLocked),
            Err(err) => {
                debug!(error = %err, "HTML clipboard slot unreadable");
                None
            }
        };

        Ok(ClipboardContent {
            plain_text,
            rich_text: None,
            markup_text,
        })
    }

    fn read_text(&mut self) -> Result<Option<String>> {
        optional(self.clipboard.get_text())
    }

    fn write(&mut self, content: &ClipboardContent) -> Result<()> {
        let plain = content.plain_text.clone().unwrap_or_default();
        match &content.markup_text {
            Some(html) => self
                .clipboard
                .set_html(html.clone(), Some(plain))
                .map_err(map_arboard_error),
            None => self.clipboard.set_text(plain).map_err(map_arboard_error),
        }
    }

    fn change_count(&mut self) -> Option<i64> {
        pasteboard_change_count()
    }
}

/// NSPasteboard changeCount: a cheap integer read that increments on every change.
#[cfg(target_os = "macos")]
fn pasteboard_change_count() -> Option<i64> {
    use cocoa::appkit::NSPasteboard;
    use cocoa::base::nil;
    use objc::runtime::Object;
    use objc::{msg_send, sel, sel_impl};

    unsafe {
        let pasteboard: *mut Object = NSPasteboard::generalPasteboard(nil);
        if pasteboard.is_null() {
            return None;
        }
        let change_count: i64 = msg_send![pasteboard, changeCount];
        Some(change_count)
    }
}

#[cfg(not(target_os = "macos"))]
fn pasteboard_change_count() -> Option<i64> {
    None
}
