//! Browser automation for the UI suite
//!
//! Tests talk to a [`Page`]; the production implementation drives a real
//! browser over WebDriver, see [`webdriver::WebDriverPage`].

pub mod webdriver;

use async_trait::async_trait;
use thiserror::Error;

pub use webdriver::{WebDriverFactory, WebDriverPage};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BrowserError {
    #[error("could not start browser session: {0}")]
    Session(String),
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("no element at index {index} for {locator}")]
    NotFound { locator: String, index: usize },
    #[error("browser action timed out after {0} ms")]
    Timeout(u128),
    #[error("browser command failed: {0}")]
    Command(String),
}

/// How an element is found on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: &str) -> Self {
        Locator::Css(selector.to_string())
    }

    pub fn xpath(path: &str) -> Self {
        Locator::XPath(path.to_string())
    }

    /// `[data-testid='<id>']`
    pub fn test_id(id: &str) -> Self {
        Locator::Css(format!("[data-testid='{}']", id))
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css={}", selector),
            Locator::XPath(path) => write!(f, "xpath={}", path),
        }
    }
}

/// One open page in a browser session
#[async_trait]
pub trait Page: Send {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Whether the first element matching `locator` is displayed. No match is `false`.
    async fn is_visible(&mut self, locator: &Locator) -> Result<bool, BrowserError>;

    async fn click_nth(&mut self, locator: &Locator, index: usize) -> Result<(), BrowserError>;

    /// Text of the `cell_index`-th `cell` inside the `row_index`-th `row`
    async fn nested_text(
        &mut self,
        row: &Locator,
        row_index: usize,
        cell: &Locator,
        cell_index: usize,
    ) -> Result<String, BrowserError>;

    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Opens a fresh page per test
#[async_trait]
pub trait PageFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Page>, BrowserError>;
}

/// An open page that is closed even if the owning test is aborted.
///
/// Call [`PageSession::close`] on the normal path. If the session is dropped
/// while still open, closing is handed to a task on the current runtime.
pub struct PageSession {
    page: Option<Box<dyn Page>>,
}

impl PageSession {
    pub async fn open(factory: &dyn PageFactory) -> Result<Self, BrowserError> {
        Ok(Self {
            page: Some(factory.open().await?),
        })
    }

    pub fn page(&mut self) -> Result<&mut dyn Page, BrowserError> {
        match self.page.as_mut() {
            Some(page) => Ok(&mut **page),
            None => Err(BrowserError::Session("page already closed".to_string())),
        }
    }

    pub async fn close(mut self) -> Result<(), BrowserError> {
        match self.page.take() {
            Some(mut page) => page.close().await,
            None => Ok(()),
        }
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        let Some(mut page) = self.page.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        tracing::warn!("Browser session did not close after abort: {}", e);
                    }
                });
            }
            Err(_) => tracing::warn!("Browser session dropped outside a runtime, left open"),
        }
    }
}
