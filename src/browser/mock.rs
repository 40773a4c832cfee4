use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::browser::clipboard::ClipboardWriter;
use crate::browser::{Browser, BrowserLauncher, Readiness, Selector};
use crate::error::{UiError, UiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickBehavior {
    Works,
    Intercepted,
    Fails,
}

impl ClickBehavior {
    fn outcome(self, what: &str) -> UiResult<()> {
        match self {
            ClickBehavior::Works => Ok(()),
            ClickBehavior::Intercepted => Err(UiError::Intercepted(what.to_string())),
            ClickBehavior::Fails => Err(UiError::Driver(what.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElementSpec {
    pub displayed: bool,
    pub enabled: bool,
    pub click: ClickBehavior,
    pub script_click: ClickBehavior,
    pub enter: ClickBehavior,
    pub accepts_text: bool,
    /// Text renders across several spans; the first reading holds only the first word.
    pub fragmented: bool,
}

impl Default for ElementSpec {
    fn default() -> Self {
        Self {
            displayed: true,
            enabled: true,
            click: ClickBehavior::Works,
            script_click: ClickBehavior::Works,
            enter: ClickBehavior::Works,
            accepts_text: true,
            fragmented: false,
        }
    }
}

#[derive(Default)]
struct MockState {
    elements: HashMap<String, ElementSpec>,
    texts: HashMap<String, String>,
    calls: Vec<String>,
    quits: usize,
}

/// Scripted in-memory browser. Elements are keyed by selector expression; a
/// selector that was never registered times out immediately.
#[derive(Clone, Default)]
pub struct MockBrowser {
    state: Arc<Mutex<MockState>>,
    clipboard: Arc<Mutex<String>>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, expr: &str, spec: ElementSpec) -> Self {
        self.state.lock().unwrap().elements.insert(expr.to_string(), spec);
        self
    }

    pub fn with_clickable(self, expr: &str) -> Self {
        self.with(expr, ElementSpec::default())
    }

    /// Registers the first selector of every set.
    pub fn with_first_of(mut self, sets: &[&crate::browser::SelectorSet]) -> Self {
        for set in sets {
            self = self.with_clickable(set.selectors()[0].expr());
        }
        self
    }

    pub fn clipboard(&self) -> MockClipboard {
        MockClipboard { contents: Arc::clone(&self.clipboard) }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn quits(&self) -> usize {
        self.state.lock().unwrap().quits
    }

    pub fn text_of(&self, expr: &str) -> String {
        self.state.lock().unwrap().texts.get(expr).cloned().unwrap_or_default()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn spec(&self, expr: &str) -> UiResult<ElementSpec> {
        self.state.lock().unwrap().elements.get(expr).cloned().ok_or_else(|| UiError::NotFound(expr.to_string()))
    }

    fn edit_text(&self, expr: &str, edit: impl FnOnce(&mut String)) -> UiResult<()> {
        let accepts = self.spec(expr)?.accepts_text;
        if accepts {
            let mut state = self.state.lock().unwrap();
            edit(state.texts.entry(expr.to_string()).or_default());
        }
        Ok(())
    }
}

#[async_trait]
impl Browser for MockBrowser {
    type Element = String;

    async fn goto(&self, url: &str) -> UiResult<()> {
        self.record(format!("goto {url}"));
        Ok(())
    }

    async fn wait_for(&self, selector: &Selector, _readiness: Readiness, _timeout: Duration) -> UiResult<String> {
        self.record(format!("wait {}", selector.expr()));
        match self.spec(selector.expr()) {
            Ok(_) => Ok(selector.expr().to_string()),
            Err(_) => Err(UiError::Timeout(selector.to_string())),
        }
    }

    async fn is_displayed(&self, element: &String) -> UiResult<bool> {
        Ok(self.spec(element)?.displayed)
    }

    async fn is_enabled(&self, element: &String) -> UiResult<bool> {
        Ok(self.spec(element)?.enabled)
    }

    async fn scroll_into_center(&self, element: &String) -> UiResult<()> {
        self.record(format!("scroll {element}"));
        Ok(())
    }

    async fn click(&self, element: &String) -> UiResult<()> {
        self.record(format!("click {element}"));
        self.spec(element)?.click.outcome(element)
    }

    async fn script_click(&self, element: &String) -> UiResult<()> {
        self.record(format!("script_click {element}"));
        self.spec(element)?.script_click.outcome(element)
    }

    async fn press_enter(&self, element: &String) -> UiResult<()> {
        self.record(format!("enter {element}"));
        self.spec(element)?.enter.outcome(element)
    }

    async fn send_text(&self, element: &String, text: &str) -> UiResult<()> {
        self.record(format!("send_text {element}"));
        self.edit_text(element, |current| current.push_str(text))
    }

    async fn select_all_and_delete(&self, element: &String) -> UiResult<()> {
        self.record(format!("select_all_delete {element}"));
        self.edit_text(element, |current| current.clear())
    }

    async fn clear(&self, element: &String) -> UiResult<()> {
        self.record(format!("clear {element}"));
        self.edit_text(element, |current| current.clear())
    }

    async fn paste(&self, element: &String) -> UiResult<()> {
        self.record(format!("paste {element}"));
        let pasted = self.clipboard.lock().unwrap().clone();
        self.edit_text(element, |current| current.push_str(&pasted))
    }

    async fn rendered_texts(&self, element: &String) -> UiResult<Vec<String>> {
        let text = self.text_of(element);
        if self.spec(element)?.fragmented {
            let first = text.split_whitespace().next().unwrap_or_default().to_string();
            Ok(vec![first, text])
        } else {
            Ok(vec![text])
        }
    }

    async fn set_text_with_input_event(&self, element: &String, text: &str) -> UiResult<()> {
        self.record(format!("set_text {element}"));
        self.edit_text(element, |current| *current = text.to_string())
    }

    async fn upload_file(&self, element: &String, path: &Path) -> UiResult<()> {
        self.record(format!("upload {element} {}", path.display()));
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> UiResult<()> {
        self.record(format!("screenshot {}", path.display()));
        Ok(())
    }

    async fn quit(&self) -> UiResult<()> {
        self.record("quit".to_string());
        self.state.lock().unwrap().quits += 1;
        Ok(())
    }
}

pub struct MockClipboard {
    contents: Arc<Mutex<String>>,
}

impl ClipboardWriter for MockClipboard {
    fn set_text(&self, text: &str) -> UiResult<()> {
        *self.contents.lock().unwrap() = text.to_string();
        Ok(())
    }
}

/// Hands out clones of one scripted browser, so tests can inspect it after
/// the attempt has released its session.
pub struct MockLauncher {
    pub browser: MockBrowser,
    pub launches: Arc<Mutex<usize>>,
}

impl MockLauncher {
    pub fn new(browser: MockBrowser) -> Self {
        Self { browser, launches: Arc::new(Mutex::new(0)) }
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    type Session = MockBrowser;

    async fn launch(&self) -> UiResult<MockBrowser> {
        *self.launches.lock().unwrap() += 1;
        Ok(self.browser.clone())
    }
}

