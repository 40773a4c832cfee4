use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::UiResult;

pub mod catalog;
pub mod clipboard;
#[cfg(test)]
pub mod mock;
pub mod selector;
pub mod webdriver;

pub use selector::{Selector, SelectorSet};

/// What a wait has to observe before it hands the element back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Present,
    Clickable,
}

/// The remote-controlled browser. Only the calls the posting flow sequences
/// are exposed; everything site-specific lives in the selector catalog.
#[async_trait]
pub trait Browser: Send + Sync {
    type Element: Clone + Send + Sync;

    async fn goto(&self, url: &str) -> UiResult<()>;

    /// Waits up to `timeout` for `selector`. A miss is `UiError::Timeout`.
    async fn wait_for(&self, selector: &Selector, readiness: Readiness, timeout: Duration) -> UiResult<Self::Element>;

    async fn is_displayed(&self, element: &Self::Element) -> UiResult<bool>;

    async fn is_enabled(&self, element: &Self::Element) -> UiResult<bool>;

    async fn scroll_into_center(&self, element: &Self::Element) -> UiResult<()>;

    async fn click(&self, element: &Self::Element) -> UiResult<()>;

    async fn script_click(&self, element: &Self::Element) -> UiResult<()>;

    async fn press_enter(&self, element: &Self::Element) -> UiResult<()>;

    async fn send_text(&self, element: &Self::Element, text: &str) -> UiResult<()>;

    /// Select-all followed by delete, through the keyboard.
    async fn select_all_and_delete(&self, element: &Self::Element) -> UiResult<()>;

    async fn clear(&self, element: &Self::Element) -> UiResult<()>;

    /// Paste shortcut into the focused element.
    async fn paste(&self, element: &Self::Element) -> UiResult<()>;

    /// Readings of the rendered text, most specific first: the editor's text
    /// spans joined in order, then the element's own text.
    async fn rendered_texts(&self, element: &Self::Element) -> UiResult<Vec<String>>;

    /// Assigns text through the DOM and dispatches a bubbling `input` event.
    async fn set_text_with_input_event(&self, element: &Self::Element, text: &str) -> UiResult<()>;

    async fn upload_file(&self, element: &Self::Element, path: &Path) -> UiResult<()>;

    async fn screenshot(&self, path: &Path) -> UiResult<()>;

    async fn quit(&self) -> UiResult<()>;
}

/// Opens one browser session per posting attempt.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    type Session: Browser;

    async fn launch(&self) -> UiResult<Self::Session>;
}
