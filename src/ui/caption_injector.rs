use std::fmt;

use crate::browser::clipboard::ClipboardWriter;
use crate::browser::{Browser, Readiness, SelectorSet};
use crate::error::UiResult;
use crate::ui::pacing::{Pacing, PauseRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Clipboard,
    Typing,
    Script,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Clipboard => write!(f, "clipboard paste"),
            Strategy::Typing => write!(f, "typing"),
            Strategy::Script => write!(f, "script assignment"),
        }
    }
}

const STRATEGIES: [Strategy; 3] = [Strategy::Clipboard, Strategy::Typing, Strategy::Script];

/// Puts caption text into the rich-text caption field.
pub struct CaptionInjector<'a, B: Browser> {
    browser: &'a B,
    clipboard: &'a dyn ClipboardWriter,
    pacing: &'a Pacing,
}

impl<'a, B: Browser> CaptionInjector<'a, B> {
    pub fn new(browser: &'a B, clipboard: &'a dyn ClipboardWriter, pacing: &'a Pacing) -> Self {
        Self { browser, clipboard, pacing }
    }

    /// Returns whether the text was verified in the field. Never fails the
    /// attempt; callers carry on without a caption on `false`.
    pub async fn inject(&self, field: &SelectorSet, text: &str) -> bool {
        tracing::info!("Inserting caption");

        let Some(element) = self.locate(field).await else {
            tracing::error!("Caption field not found on the page");
            return false;
        };

        if let Err(e) = self.browser.scroll_into_center(&element).await {
            tracing::debug!("Scroll to caption field failed: {}", e);
        }
        self.pacing.pause(self.pacing.settle).await;

        for strategy in STRATEGIES {
            tracing::info!("Trying caption strategy: {}", strategy);
            match self.apply(strategy, &element, text).await {
                Ok(()) => {}
                Err(e) => {
                    tracing::error!("Caption strategy {} failed: {}", strategy, e);
                    continue;
                }
            }
            self.pacing.pause(self.pacing.verify_delay).await;

            if self.verify(&element, text).await {
                tracing::info!("Caption inserted with {}: '{}'", strategy, text);
                return true;
            }
            tracing::warn!("Caption strategy {} did not pass verification", strategy);
        }

        tracing::error!("Every caption strategy failed");
        false
    }

    async fn locate(&self, field: &SelectorSet) -> Option<B::Element> {
        for selector in field.iter() {
            if let Ok(element) = self.browser.wait_for(selector, Readiness::Present, self.pacing.wait_timeout).await {
                return Some(element);
            }
        }
        None
    }

    async fn apply(&self, strategy: Strategy, element: &B::Element, text: &str) -> UiResult<()> {
        match strategy {
            Strategy::Clipboard => {
                self.browser.click(element).await?;
                self.pacing.pause(self.half_settle()).await;
                self.browser.select_all_and_delete(element).await?;
                self.pacing.pause(self.pacing.settle).await;
                self.clipboard.set_text(text)?;
                self.browser.paste(element).await
            }
            Strategy::Typing => {
                self.browser.click(element).await?;
                self.pacing.pause(self.half_settle()).await;
                self.browser.clear(element).await?;
                self.pacing.pause(self.half_settle()).await;
                let mut buf = [0u8; 4];
                for c in text.chars() {
                    self.browser.send_text(element, c.encode_utf8(&mut buf)).await?;
                    self.pacing.pause(self.pacing.keystroke).await;
                }
                Ok(())
            }
            Strategy::Script => self.browser.set_text_with_input_event(element, text).await,
        }
    }

    async fn verify(&self, element: &B::Element, text: &str) -> bool {
        match self.browser.rendered_texts(element).await {
            Ok(readings) => readings.iter().any(|rendered| rendered.contains(text)),
            Err(e) => {
                tracing::warn!("Could not read caption field back: {}", e);
                false
            }
        }
    }

    fn half_settle(&self) -> PauseRange {
        PauseRange::fixed(self.pacing.settle.min / 2.0)
    }
}
