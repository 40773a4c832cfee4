use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thirtyfour::prelude::*;

use crate::browser::{Browser, BrowserLauncher, Readiness, Selector};
use crate::config::BrowserConfig;
use crate::error::{UiError, UiResult};

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const LEXICAL_SPAN: &str = r#"span[data-lexical-text="true"]"#;

const SCROLL_CENTER_SCRIPT: &str = "arguments[0].scrollIntoView({block: 'center', behavior: 'smooth'});";
const CLICK_SCRIPT: &str = "arguments[0].click();";
const SET_TEXT_SCRIPT: &str = "arguments[0].innerText = arguments[1]; arguments[0].dispatchEvent(new Event('input', {bubbles: true}));";

fn to_ui_error(e: WebDriverError) -> UiError {
    match e {
        WebDriverError::ElementClickIntercepted(..) => UiError::Intercepted(e.to_string()),
        WebDriverError::NoSuchElement(..) => UiError::NotFound(e.to_string()),
        other => UiError::Driver(other.to_string()),
    }
}

fn by(selector: &Selector) -> By {
    match selector {
        Selector::Css(expr) => By::Css(expr.as_str()),
        Selector::XPath(expr) => By::XPath(expr.as_str()),
        Selector::Name(expr) => By::Name(expr.as_str()),
    }
}

/// A Chrome session driven over the WebDriver protocol.
pub struct WebDriverBrowser {
    driver: WebDriver,
}

#[async_trait]
impl Browser for WebDriverBrowser {
    type Element = WebElement;

    async fn goto(&self, url: &str) -> UiResult<()> {
        self.driver.goto(url).await.map_err(to_ui_error)
    }

    async fn wait_for(&self, selector: &Selector, readiness: Readiness, timeout: Duration) -> UiResult<WebElement> {
        let query = self.driver.query(by(selector)).wait(timeout, POLL_INTERVAL);
        let query = match readiness {
            Readiness::Present => query,
            Readiness::Clickable => query.and_clickable(),
        };
        query.first().await.map_err(|e| match to_ui_error(e) {
            UiError::NotFound(_) => UiError::Timeout(selector.to_string()),
            other => other,
        })
    }

    async fn is_displayed(&self, element: &WebElement) -> UiResult<bool> {
        element.is_displayed().await.map_err(to_ui_error)
    }

    async fn is_enabled(&self, element: &WebElement) -> UiResult<bool> {
        element.is_enabled().await.map_err(to_ui_error)
    }

    async fn scroll_into_center(&self, element: &WebElement) -> UiResult<()> {
        let args = vec![element.to_json().map_err(to_ui_error)?];
        self.driver.execute(SCROLL_CENTER_SCRIPT, args).await.map_err(to_ui_error)?;
        Ok(())
    }

    async fn click(&self, element: &WebElement) -> UiResult<()> {
        element.click().await.map_err(to_ui_error)
    }

    async fn script_click(&self, element: &WebElement) -> UiResult<()> {
        let args = vec![element.to_json().map_err(to_ui_error)?];
        self.driver.execute(CLICK_SCRIPT, args).await.map_err(to_ui_error)?;
        Ok(())
    }

    async fn press_enter(&self, element: &WebElement) -> UiResult<()> {
        element.send_keys(Key::Enter).await.map_err(to_ui_error)
    }

    async fn send_text(&self, element: &WebElement, text: &str) -> UiResult<()> {
        element.send_keys(text).await.map_err(to_ui_error)
    }

    async fn select_all_and_delete(&self, element: &WebElement) -> UiResult<()> {
        element.send_keys(Key::Control + "a").await.map_err(to_ui_error)?;
        tokio::time::sleep(Duration::from_millis(500)).await;
        element.send_keys(Key::Delete).await.map_err(to_ui_error)
    }

    async fn clear(&self, element: &WebElement) -> UiResult<()> {
        element.clear().await.map_err(to_ui_error)
    }

    async fn paste(&self, element: &WebElement) -> UiResult<()> {
        element.send_keys(Key::Control + "v").await.map_err(to_ui_error)
    }

    async fn rendered_texts(&self, element: &WebElement) -> UiResult<Vec<String>> {
        let mut readings = Vec::new();
        if let Ok(spans) = element.find_all(By::Css(LEXICAL_SPAN)).await {
            let mut joined = String::new();
            for span in spans {
                if let Ok(text) = span.text().await {
                    joined.push_str(&text);
                }
            }
            if !joined.is_empty() {
                readings.push(joined);
            }
        }
        readings.push(element.text().await.map_err(to_ui_error)?);
        Ok(readings)
    }

    async fn set_text_with_input_event(&self, element: &WebElement, text: &str) -> UiResult<()> {
        let args = vec![element.to_json().map_err(to_ui_error)?, serde_json::Value::String(text.to_string())];
        self.driver.execute(SET_TEXT_SCRIPT, args).await.map_err(to_ui_error)?;
        Ok(())
    }

    async fn upload_file(&self, element: &WebElement, path: &Path) -> UiResult<()> {
        let path = path.to_string_lossy().into_owned();
        element.send_keys(path).await.map_err(to_ui_error)
    }

    async fn screenshot(&self, path: &Path) -> UiResult<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| UiError::Driver(e.to_string()))?;
        }
        self.driver.screenshot(path).await.map_err(to_ui_error)
    }

    async fn quit(&self) -> UiResult<()> {
        self.driver.clone().quit().await.map_err(to_ui_error)
    }
}

/// Connects to an already running chromedriver.
pub struct WebDriverLauncher {
    config: BrowserConfig,
}

impl WebDriverLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    type Session = WebDriverBrowser;

    async fn launch(&self) -> UiResult<WebDriverBrowser> {
        let mut caps = DesiredCapabilities::chrome();
        for arg in &self.config.args {
            caps.add_arg(arg).map_err(to_ui_error)?;
        }
        if self.config.headless {
            caps.set_headless().map_err(to_ui_error)?;
        }
        caps.add_experimental_option("excludeSwitches", vec!["enable-automation"]).map_err(to_ui_error)?;

        tracing::info!("Opening browser session at {}", self.config.webdriver_url);
        let driver = WebDriver::new(&self.config.webdriver_url, caps).await.map_err(to_ui_error)?;
        Ok(WebDriverBrowser { driver })
    }
}
