use std::fmt;
use std::time::Duration;

use crate::browser::{Browser, Readiness, SelectorSet};
use crate::error::{PosterError, PosterResult};
use crate::ui::pacing::Pacing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMethod {
    DirectClick,
    ScriptClick,
    KeyConfirm,
}

impl fmt::Display for ActivationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationMethod::DirectClick => write!(f, "direct click"),
            ActivationMethod::ScriptClick => write!(f, "script click"),
            ActivationMethod::KeyConfirm => write!(f, "enter key"),
        }
    }
}

const ACTIVATION_ORDER: [ActivationMethod; 3] = [ActivationMethod::DirectClick, ActivationMethod::ScriptClick, ActivationMethod::KeyConfirm];

/// Finds a control through its selector set and activates it, falling back
/// across selectors and activation methods.
pub struct UiActionRunner<'a, B: Browser> {
    browser: &'a B,
    pacing: &'a Pacing,
}

impl<'a, B: Browser> UiActionRunner<'a, B> {
    pub fn new(browser: &'a B, pacing: &'a Pacing) -> Self {
        Self { browser, pacing }
    }

    /// Activates a required control. Exhausting every selector is fatal to the
    /// attempt.
    pub async fn activate(&self, set: &SelectorSet, timeout: Duration) -> PosterResult<()> {
        tracing::info!("Looking for '{}'", set.label());
        if self.try_activate(set, timeout).await {
            Ok(())
        } else {
            tracing::error!("Could not find or activate '{}'", set.label());
            Err(PosterError::ActivationFailed(set.label().to_string()))
        }
    }

    /// Activates a control that may legitimately be absent.
    pub async fn activate_optional(&self, set: &SelectorSet, timeout: Duration) -> bool {
        let activated = self.try_activate(set, timeout).await;
        if !activated {
            tracing::info!("'{}' not present, continuing", set.label());
        }
        activated
    }

    async fn try_activate(&self, set: &SelectorSet, timeout: Duration) -> bool {
        for (index, selector) in set.iter().enumerate() {
            tracing::debug!("Trying selector #{} for '{}': {}", index + 1, set.label(), selector);

            let element = match self.browser.wait_for(selector, Readiness::Clickable, timeout).await {
                Ok(element) => element,
                Err(e) => {
                    tracing::debug!("Selector #{} for '{}' missed: {}", index + 1, set.label(), e);
                    continue;
                }
            };

            match self.is_usable(&element).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!("Selector #{} for '{}' matched a hidden or disabled element", index + 1, set.label());
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Could not inspect '{}': {}", set.label(), e);
                    continue;
                }
            }

            if let Err(e) = self.browser.scroll_into_center(&element).await {
                tracing::debug!("Scroll to '{}' failed: {}", set.label(), e);
            }
            self.pacing.pause(self.pacing.settle).await;

            if self.activate_element(&element, set.label()).await {
                self.pacing.pause(self.pacing.after_click).await;
                return true;
            }
        }
        false
    }

    async fn is_usable(&self, element: &B::Element) -> crate::error::UiResult<bool> {
        Ok(self.browser.is_displayed(element).await? && self.browser.is_enabled(element).await?)
    }

    async fn activate_element(&self, element: &B::Element, label: &str) -> bool {
        for method in ACTIVATION_ORDER {
            let result = match method {
                ActivationMethod::DirectClick => self.browser.click(element).await,
                ActivationMethod::ScriptClick => self.browser.script_click(element).await,
                ActivationMethod::KeyConfirm => self.browser.press_enter(element).await,
            };
            match result {
                Ok(()) => {
                    tracing::info!("Activated '{}' with {}", label, method);
                    return true;
                }
                Err(e) if e.is_interception() => {
                    tracing::info!("{} on '{}' was intercepted, trying the next method", method, label);
                    self.pacing.pause(self.pacing.intercept_backoff).await;
                }
                Err(e) => {
                    tracing::warn!("{} on '{}' failed: {}", method, label, e);
                }
            }
        }
        false
    }
}
