use std::fmt;

/// A locator expression for one element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Css(String),
    XPath(String),
    Name(String),
}

impl Selector {
    pub fn css(expr: impl Into<String>) -> Self {
        Selector::Css(expr.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Selector::XPath(expr.into())
    }

    pub fn name(expr: impl Into<String>) -> Self {
        Selector::Name(expr.into())
    }

    pub fn expr(&self) -> &str {
        match self {
            Selector::Css(expr) | Selector::XPath(expr) | Selector::Name(expr) => expr,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(expr) => write!(f, "css={expr}"),
            Selector::XPath(expr) => write!(f, "xpath={expr}"),
            Selector::Name(expr) => write!(f, "name={expr}"),
        }
    }
}

/// Equivalent selectors for one logical control, most specific first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorSet {
    label: String,
    selectors: Vec<Selector>,
}

impl SelectorSet {
    pub fn new(label: impl Into<String>, selectors: Vec<Selector>) -> Self {
        Self { label: label.into(), selectors }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn iter(&self) -> impl Iterator<Item = &Selector> {
        self.selectors.iter()
    }
}
