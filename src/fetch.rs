//! Image download for the web routes.
//!
//! Only transport failures fail a download. A broken `<img>` (404, 403)
//! still yields whatever body the server sent, so one dead image does not
//! sink the whole scrape.

use crate::error::GatewayError;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Downloads the bytes behind a URL.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, GatewayError>;
}

/// [`AssetFetcher`] over a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, GatewayError> {
        let fail = |e: reqwest::Error| GatewayError::ImageDownload {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(fail)?;
        let status = response.status();
        if !status.is_success() {
            warn!("Image {} answered HTTP {}, storing the body as-is", url, status);
        }

        let bytes = response.bytes().await.map_err(fail)?;
        debug!("Downloaded {} ({} bytes)", url, bytes.len());
        Ok(bytes.to_vec())
    }
}
