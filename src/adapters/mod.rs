//! Extraction adapters: one per backend, no shared state between them.
//!
//! ```text
//! PDF bytes ──▶ cloud     (document-analysis REST API, submit + poll)
//!           └─▶ embedded  (pdfium, spawn_blocking)
//! URL       ──▶ browser   (headless Chrome, rendered DOM)
//!           └─▶ scraping_api (third-party fetch, raw HTML)
//! ```
//!
//! The router only sees the two traits below, so tests substitute fakes and
//! the binary wires in the real providers.

pub mod browser;
pub mod cloud;
pub mod embedded;
pub mod scraping_api;

use crate::error::{GatewayError, ScrapeError};
use crate::model::{ExtractionResult, WebScrapeResult};
use async_trait::async_trait;

pub use browser::{BrowserAdapter, ChromeRenderer, PageRenderer};
pub use cloud::CloudDocumentAdapter;
pub use embedded::EmbeddedPdfAdapter;
pub use scraping_api::ScrapingApiAdapter;

/// A backend that turns PDF bytes into structured content.
#[async_trait]
pub trait PdfExtractor: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Analyze a PDF.
    ///
    /// `Ok(None)` means the backend ran but has nothing to report (the cloud
    /// adapter folds provider failures into this); the router answers it with
    /// "No Data Extracted From the PDF". `Err` is a hard processing failure.
    async fn analyze(&self, pdf: &[u8]) -> Result<Option<ExtractionResult>, GatewayError>;
}

/// What a web adapter is asked to fetch.
#[derive(Debug, Clone, Copy)]
pub struct ScrapeRequest<'a> {
    pub url: &'a str,
    /// Credential for backends that need one; ignored by the others.
    pub api_key: Option<&'a str>,
}

/// A backend that turns a URL into Markdown plus image URLs.
#[async_trait]
pub trait WebScraper: Send + Sync {
    fn name(&self) -> &str;

    async fn scrape(&self, request: ScrapeRequest<'_>) -> Result<WebScrapeResult, ScrapeError>;
}
