//! Browser automation capability.
//!
//! The booking sites render availability client-side, so pages must be
//! loaded in a real browser. Extractors only ever see the rendered DOM as
//! HTML text; this module hides how that text is obtained behind two small
//! traits.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;

use crate::error::ScrapeError;

/// One browser session, exclusively owned by one scrape run.
#[async_trait]
pub trait Browser: Send + fmt::Debug {
    /// Loads `url` in the current window.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Navigation`] if the page cannot be loaded.
    async fn navigate(&mut self, url: &str) -> Result<(), ScrapeError>;

    /// Returns the current DOM serialized as HTML.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Navigation`] if the DOM cannot be read.
    async fn page_source(&mut self) -> Result<String, ScrapeError>;

    /// Ends the session and releases the browser process.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Browser`] if the session could not be ended
    /// cleanly.
    async fn close(&mut self) -> Result<(), ScrapeError>;
}

/// Starts browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync + fmt::Debug {
    /// Starts a new session.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Browser`] if no session can be started.
    async fn launch(&self) -> Result<Box<dyn Browser>, ScrapeError>;
}

/// Launches Firefox sessions through a WebDriver server such as
/// geckodriver.
#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    webdriver_url: String,
    headless: bool,
}

impl WebDriverLauncher {
    /// Creates a launcher for the WebDriver server at `webdriver_url`.
    #[must_use]
    pub fn new(webdriver_url: impl Into<String>, headless: bool) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            headless,
        }
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>, ScrapeError> {
        tracing::debug!(url = %self.webdriver_url, "initialising webdriver session");

        let mut capabilities = serde_json::Map::new();
        if self.headless {
            capabilities.insert(
                "moz:firefoxOptions".to_string(),
                json!({ "args": ["-headless"] }),
            );
        }

        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        Ok(Box::new(WebDriverBrowser { client }))
    }
}

/// A live WebDriver session.
#[derive(Debug)]
pub struct WebDriverBrowser {
    client: Client,
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        self.client
            .goto(url)
            .await
            .map_err(|e| ScrapeError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn page_source(&mut self) -> Result<String, ScrapeError> {
        let url = self
            .client
            .current_url()
            .await
            .map(|u| u.to_string())
            .unwrap_or_default();
        self.client
            .source()
            .await
            .map_err(|e| ScrapeError::Navigation {
                url,
                message: e.to_string(),
            })
    }

    async fn close(&mut self) -> Result<(), ScrapeError> {
        tracing::debug!("closing webdriver session");
        self.client
            .clone()
            .close()
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))
    }
}

/// Serves previously captured pages from memory instead of a live site.
///
/// Useful for replaying saved pages and for exercising the runner without
/// a browser. URLs with no page fail to load. Tracks how many sessions
/// were launched and closed.
#[derive(Debug, Clone, Default)]
pub struct ReplayLauncher {
    pages: Arc<HashMap<String, String>>,
    fail_launch: bool,
    launched: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl ReplayLauncher {
    /// Creates a launcher serving `pages`, keyed by URL.
    #[must_use]
    pub fn new(pages: HashMap<String, String>) -> Self {
        Self {
            pages: Arc::new(pages),
            ..Self::default()
        }
    }

    /// Creates a launcher whose sessions never start.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            fail_launch: true,
            ..Self::default()
        }
    }

    /// Number of sessions launched so far.
    #[must_use]
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    /// Number of sessions closed so far.
    #[must_use]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for ReplayLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>, ScrapeError> {
        if self.fail_launch {
            return Err(ScrapeError::Browser("replay browser unavailable".to_string()));
        }
        self.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ReplayBrowser {
            pages: Arc::clone(&self.pages),
            current: None,
            closed: Arc::clone(&self.closed),
        }))
    }
}

#[derive(Debug)]
struct ReplayBrowser {
    pages: Arc<HashMap<String, String>>,
    current: Option<String>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl Browser for ReplayBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        if !self.pages.contains_key(url) {
            self.current = None;
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                message: "no captured page".to_string(),
            });
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String, ScrapeError> {
        self.current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .cloned()
            .ok_or_else(|| ScrapeError::Navigation {
                url: self.current.clone().unwrap_or_default(),
                message: "no page loaded".to_string(),
            })
    }

    async fn close(&mut self) -> Result<(), ScrapeError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replay_serves_captured_pages() {
        let launcher = ReplayLauncher::new(HashMap::from([(
            "https://a.test/".to_string(),
            "<p>hi</p>".to_string(),
        )]));
        let Ok(mut browser) = launcher.launch().await else {
            panic!("launch failed");
        };
        assert!(browser.navigate("https://a.test/").await.is_ok());
        assert_eq!(browser.page_source().await.ok().as_deref(), Some("<p>hi</p>"));

        let missing = browser.navigate("https://b.test/").await;
        assert!(matches!(missing, Err(ScrapeError::Navigation { .. })));
        assert!(browser.page_source().await.is_err());

        assert!(browser.close().await.is_ok());
        assert_eq!(launcher.launched(), 1);
        assert_eq!(launcher.closed(), 1);
    }

    #[tokio::test]
    async fn unavailable_launcher_fails_to_launch() {
        let launcher = ReplayLauncher::unavailable();
        assert!(matches!(launcher.launch().await, Err(ScrapeError::Browser(_))));
        assert_eq!(launcher.launched(), 0);
    }
}
