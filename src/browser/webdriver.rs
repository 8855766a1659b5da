use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use tracing::{debug, warn};

use super::{BrowserError, Locator, Page, PageFactory};

fn as_fantoccini(locator: &Locator) -> fantoccini::Locator<'_> {
    match locator {
        Locator::Css(selector) => fantoccini::Locator::Css(selector),
        Locator::XPath(path) => fantoccini::Locator::XPath(path),
    }
}

/// Starts a headless browser session per test through a WebDriver server
pub struct WebDriverFactory {
    webdriver_url: String,
    action_timeout: Duration,
}

impl WebDriverFactory {
    pub fn new(webdriver_url: &str, action_timeout: Duration) -> Self {
        Self {
            webdriver_url: webdriver_url.to_string(),
            action_timeout,
        }
    }
}

#[async_trait]
impl PageFactory for WebDriverFactory {
    async fn open(&self) -> Result<Box<dyn Page>, BrowserError> {
        let mut capabilities = serde_json::Map::new();
        capabilities.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": ["--headless", "--disable-gpu"] }),
        );
        capabilities.insert(
            "moz:firefoxOptions".to_string(),
            json!({ "args": ["-headless"] }),
        );

        let mut builder = ClientBuilder::native();
        builder.capabilities(capabilities);

        let client = tokio::time::timeout(self.action_timeout, builder.connect(&self.webdriver_url))
            .await
            .map_err(|_| BrowserError::Timeout(self.action_timeout.as_millis()))?
            .map_err(|e| BrowserError::Session(e.to_string()))?;

        debug!("Opened WebDriver session at {}", self.webdriver_url);
        Ok(Box::new(WebDriverPage {
            client: Some(client),
            action_timeout: self.action_timeout,
        }))
    }
}

pub struct WebDriverPage {
    client: Option<Client>,
    action_timeout: Duration,
}

impl WebDriverPage {
    fn client(&self) -> Result<&Client, BrowserError> {
        self.client
            .as_ref()
            .ok_or_else(|| BrowserError::Session("session already closed".to_string()))
    }

    /// Run one WebDriver command bounded by the action timeout
    async fn bounded<T, F>(&self, command: F) -> Result<T, BrowserError>
    where
        F: Future<Output = Result<T, CmdError>>,
    {
        tokio::time::timeout(self.action_timeout, command)
            .await
            .map_err(|_| BrowserError::Timeout(self.action_timeout.as_millis()))?
            .map_err(|e| BrowserError::Command(e.to_string()))
    }

    async fn nth(&self, locator: &Locator, index: usize) -> Result<Element, BrowserError> {
        let client = self.client()?;
        let mut elements = self.bounded(client.find_all(as_fantoccini(locator))).await?;
        if index >= elements.len() {
            return Err(BrowserError::NotFound {
                locator: locator.to_string(),
                index,
            });
        }
        Ok(elements.swap_remove(index))
    }
}

#[async_trait]
impl Page for WebDriverPage {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        let client = self.client()?;
        tokio::time::timeout(self.action_timeout, client.goto(url))
            .await
            .map_err(|_| BrowserError::Timeout(self.action_timeout.as_millis()))?
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn is_visible(&mut self, locator: &Locator) -> Result<bool, BrowserError> {
        let client = self.client()?;
        let elements = self.bounded(client.find_all(as_fantoccini(locator))).await?;
        match elements.first() {
            Some(element) => self.bounded(element.is_displayed()).await,
            None => Ok(false),
        }
    }

    async fn click_nth(&mut self, locator: &Locator, index: usize) -> Result<(), BrowserError> {
        let element = self.nth(locator, index).await?;
        self.bounded(element.click()).await
    }

    async fn nested_text(
        &mut self,
        row: &Locator,
        row_index: usize,
        cell: &Locator,
        cell_index: usize,
    ) -> Result<String, BrowserError> {
        let row_element = self.nth(row, row_index).await?;
        let cells = self.bounded(row_element.find_all(as_fantoccini(cell))).await?;
        let cell_element = cells.get(cell_index).ok_or_else(|| BrowserError::NotFound {
            locator: cell.to_string(),
            index: cell_index,
        })?;
        self.bounded(cell_element.text()).await
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if let Some(client) = self.client.take() {
            if let Err(e) = client.close().await {
                warn!("Failed to close WebDriver session: {}", e);
                return Err(BrowserError::Command(e.to_string()));
            }
        }
        Ok(())
    }
}
