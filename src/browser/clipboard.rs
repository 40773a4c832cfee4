use crate::error::{UiError, UiResult};

/// Puts text on the system clipboard so it can be pasted into the page.
pub trait ClipboardWriter: Send + Sync {
    fn set_text(&self, text: &str) -> UiResult<()>;
}

pub struct SystemClipboard;

impl ClipboardWriter for SystemClipboard {
    fn set_text(&self, text: &str) -> UiResult<()> {
        // Opened per call: the handle is not Send on every platform.
        let mut clipboard = arboard::Clipboard::new().map_err(|e| UiError::Clipboard(e.to_string()))?;
        clipboard.set_text(text.to_string()).map_err(|e| UiError::Clipboard(e.to_string()))
    }
}
