//! Headless-browser scraping: render the page, then read the DOM.
//!
//! Each request launches its own Chrome on a throwaway profile directory,
//! so no cookies or storage leak between requests and concurrent launches
//! never share a profile lock. Every path out of [`ChromeRenderer::render`]
//! closes the browser and removes the profile.
//!
//! Navigation goes through `Page::goto`, which turns Chrome's navigation
//! failures (`net::ERR_*`) into errors instead of rendering its error page.

use super::{ScrapeRequest, WebScraper};
use crate::config::GatewayConfig;
use crate::error::ScrapeError;
use crate::model::WebScrapeResult;
use crate::pipeline::html;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Produces the fully rendered HTML of a page.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, ScrapeError>;
}

/// [`PageRenderer`] backed by a fresh headless Chrome per call.
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    wait: Duration,
    executable: Option<PathBuf>,
}

impl ChromeRenderer {
    pub fn new(wait: Duration, executable: Option<PathBuf>) -> Self {
        Self { wait, executable }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            Duration::from_secs(config.browser_wait_secs),
            config.chrome_executable.clone(),
        )
    }

    /// Fresh profile directory for one launch, removed on drop.
    fn profile_dir() -> Result<TempDir, ScrapeError> {
        tempfile::Builder::new()
            .prefix("scrape-gateway-chrome-")
            .tempdir()
            .map_err(|e| ScrapeError::Browser(format!("cannot create browser profile: {}", e)))
    }

    fn browser_config(&self, profile: &Path) -> Result<BrowserConfig, ScrapeError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile)
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(ScrapeError::Browser)
    }

    /// Navigate, wait for `<body>`, and read back the DOM.
    async fn visit(&self, browser: &Browser, url: &str) -> Result<String, ScrapeError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;
        page.goto(url).await.map_err(navigation_error)?;
        debug!("Navigated to {}", url);

        timeout(self.wait, async {
            while page.find_element("body").await.is_err() {
                sleep(Duration::from_millis(250)).await;
            }
        })
        .await
        .map_err(|_| {
            ScrapeError::Browser(format!(
                "timed out after {}s waiting for <body>",
                self.wait.as_secs()
            ))
        })?;

        page.content()
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &str) -> Result<String, ScrapeError> {
        // dropped only after `browser.wait()` so Chrome has released it
        let profile = Self::profile_dir()?;
        let (mut browser, mut handler) = Browser::launch(self.browser_config(profile.path())?)
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let outcome = self.visit(&browser, url).await;

        if let Err(e) = browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        let _ = browser.wait().await;
        events.abort();
        if let Err(e) = profile.close() {
            warn!("Browser profile cleanup failed: {}", e);
        }

        outcome
    }
}

/// Chrome reports failed navigations as `net::ERR_*` messages.
fn navigation_error(err: CdpError) -> ScrapeError {
    ScrapeError::Browser(err.to_string())
}

/// Web adapter that scrapes the rendered DOM.
pub struct BrowserAdapter {
    renderer: Arc<dyn PageRenderer>,
}

impl BrowserAdapter {
    pub fn new(renderer: Arc<dyn PageRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl WebScraper for BrowserAdapter {
    fn name(&self) -> &str {
        "browser"
    }

    async fn scrape(&self, request: ScrapeRequest<'_>) -> Result<WebScrapeResult, ScrapeError> {
        info!("Rendering {}", request.url);
        let dom = self.renderer.render(request.url).await?;
        debug!("Rendered DOM: {} bytes", dom.len());
        Ok(html::browser_markdown(request.url, &dom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticPage(&'static str);

    #[async_trait]
    impl PageRenderer for StaticPage {
        async fn render(&self, _url: &str) -> Result<String, ScrapeError> {
            Ok(self.0.to_string())
        }
    }

    struct BrokenBrowser;

    #[async_trait]
    impl PageRenderer for BrokenBrowser {
        async fn render(&self, _url: &str) -> Result<String, ScrapeError> {
            Err(ScrapeError::Browser("net::ERR_NAME_NOT_RESOLVED".into()))
        }
    }

    #[tokio::test]
    async fn scrapes_the_rendered_dom() {
        let adapter = BrowserAdapter::new(Arc::new(StaticPage(
            r#"<body><h1>Hi</h1><img src="/logo.png"></body>"#,
        )));
        let out = adapter
            .scrape(ScrapeRequest {
                url: "https://site.test/",
                api_key: None,
            })
            .await
            .unwrap();
        assert!(out.markdown.starts_with("# Extracted Content from https://site.test/"));
        assert_eq!(out.image_urls, vec!["https://site.test/logo.png"]);
    }

    #[test]
    fn navigation_failure_keeps_chrome_message() {
        let err = navigation_error(CdpError::ChromeMessage(
            "net::ERR_CONNECTION_REFUSED".into(),
        ));
        assert_eq!(
            err.to_string(),
            "Error during scraping: net::ERR_CONNECTION_REFUSED"
        );
    }

    #[test]
    fn every_launch_gets_its_own_profile() {
        let first = ChromeRenderer::profile_dir().unwrap();
        let second = ChromeRenderer::profile_dir().unwrap();
        assert_ne!(first.path(), second.path());
        assert!(first.path().is_dir());

        let path = first.path().to_path_buf();
        drop(first);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn renderer_failure_keeps_the_prefix() {
        let adapter = BrowserAdapter::new(Arc::new(BrokenBrowser));
        let err = adapter
            .scrape(ScrapeRequest {
                url: "https://nowhere.invalid/",
                api_key: None,
            })
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error during scraping: net::ERR_NAME_NOT_RESOLVED"
        );
    }
}
