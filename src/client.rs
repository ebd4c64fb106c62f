//! Typed HTTP client for the gateway routes, used by the dashboard.

use crate::error::ClientError;
use crate::gateway::{
    PdfScrapeResponse, PdfVariant, ScrapeMethod, WebScrapeRequest, WebScrapeResponse,
};
use crate::server::ErrorBody;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::debug;

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8000";

/// Client for a running gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    base_url: String,
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload a PDF to the route for `variant`.
    pub async fn scrape_pdf(
        &self,
        variant: PdfVariant,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<PdfScrapeResponse, ClientError> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        let url = format!("{}/pdf/{}-scrape", self.base_url, variant.as_str());
        debug!("POST {}", url);
        let response = self.http.post(url).multipart(form).send().await?;
        decode(response).await
    }

    /// Ask the gateway to scrape `url` with `method`.
    pub async fn scrape_web(
        &self,
        method: ScrapeMethod,
        url: &str,
        api_key: Option<String>,
    ) -> Result<WebScrapeResponse, ClientError> {
        let body = WebScrapeRequest {
            url: Some(url.to_string()),
            method: method.as_str().to_string(),
            api_key,
        };

        let endpoint = format!("{}/web/scrape", self.base_url);
        debug!("POST {}", endpoint);
        let response = self.http.post(endpoint).json(&body).send().await?;
        decode(response).await
    }
}

/// Success bodies deserialize into `T`; anything else becomes
/// [`ClientError::Rejected`] with the server's `detail`, or the raw body when
/// it is not an error envelope.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await?;
    let detail = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.detail)
        .unwrap_or(text);
    Err(ClientError::Rejected {
        status: status.as_u16(),
        detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = GatewayClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
