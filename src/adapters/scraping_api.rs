//! Third-party scraping API: the provider fetches the page, we parse its HTML.

use super::{ScrapeRequest, WebScraper};
use crate::error::ScrapeError;
use crate::model::WebScrapeResult;
use crate::pipeline::html;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use tracing::{debug, info};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Web adapter for the scraping API.
pub struct ScrapingApiAdapter {
    client: reqwest::Client,
    endpoint: String,
}

impl ScrapingApiAdapter {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl WebScraper for ScrapingApiAdapter {
    fn name(&self) -> &str {
        "scraping-api"
    }

    async fn scrape(&self, request: ScrapeRequest<'_>) -> Result<WebScrapeResult, ScrapeError> {
        let key = request
            .api_key
            .ok_or_else(|| ScrapeError::Transport("no API key supplied".into()))?;

        info!("Fetching {} through the scraping API", request.url);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("api_key", key), ("url", request.url)])
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .map_err(|e| ScrapeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScrapeError::Transport(e.to_string()))?;
        debug!("Scraping API returned {} bytes", body.len());

        Ok(html::scraping_api_markdown(&body))
    }
}
