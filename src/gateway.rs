//! Request router: validate, dispatch to an adapter, normalize, persist.
//!
//! ## Why a struct of trait objects?
//!
//! Every collaborator (PDF backends, web backends, object store, image
//! fetcher) sits behind a trait and is injected through [`GatewayBuilder`].
//! The HTTP layer holds one `Arc<Gateway>`; tests build the same `Gateway`
//! out of fakes and an in-memory store and exercise every route without a
//! network.
//!
//! Requests are independent. Nothing is shared between them except the
//! injected collaborators, which hold no per-request state.

use crate::adapters::{
    BrowserAdapter, ChromeRenderer, CloudDocumentAdapter, EmbeddedPdfAdapter, PdfExtractor,
    ScrapeRequest, ScrapingApiAdapter, WebScraper,
};
use crate::config::{EmptyContentPolicy, GatewayConfig};
use crate::error::GatewayError;
use crate::fetch::{AssetFetcher, HttpFetcher};
use crate::model::StorageObject;
use crate::pipeline::markdown::{self, MarkdownFlavor, RenderOptions};
use crate::storage::{self, ObjectStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const PDF_HEADER_WINDOW: usize = 1024;

pub const PDF_SUCCESS_MESSAGE: &str = "Successfully processed the PDF and saved to S3.";
pub const WEB_SUCCESS_MESSAGE: &str = "Scraping completed and saved to S3.";

// ── Route selectors ──────────────────────────────────────────────────────

/// Which PDF backend a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfVariant {
    /// Cloud document analysis.
    Enterprise,
    /// Embedded pdfium.
    OpenSource,
}

impl PdfVariant {
    /// Path segment and storage folder name.
    pub fn as_str(self) -> &'static str {
        match self {
            PdfVariant::Enterprise => "enterprise",
            PdfVariant::OpenSource => "opensource",
        }
    }

    fn flavor(self) -> MarkdownFlavor {
        match self {
            PdfVariant::Enterprise => MarkdownFlavor::Enterprise,
            PdfVariant::OpenSource => MarkdownFlavor::OpenSource,
        }
    }

    fn folder(self) -> String {
        format!("pdf_extraction/{}", self.as_str())
    }
}

impl fmt::Display for PdfVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which web backend a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeMethod {
    /// Headless browser.
    Selenium,
    /// Third-party scraping API.
    ScrapingBee,
}

impl ScrapeMethod {
    /// Parse the wire value. Matching is exact: `"selenium"` is rejected.
    pub fn parse(method: &str) -> Result<Self, GatewayError> {
        match method {
            "Selenium" => Ok(ScrapeMethod::Selenium),
            "ScrapingBee" => Ok(ScrapeMethod::ScrapingBee),
            other => Err(GatewayError::InvalidMethod {
                method: other.to_string(),
            }),
        }
    }

    /// Wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            ScrapeMethod::Selenium => "Selenium",
            ScrapeMethod::ScrapingBee => "ScrapingBee",
        }
    }

    fn folder(self) -> &'static str {
        match self {
            ScrapeMethod::Selenium => "web_scraping/selenium",
            ScrapeMethod::ScrapingBee => "web_scraping/scrapingbee",
        }
    }
}

impl fmt::Display for ScrapeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Envelopes ────────────────────────────────────────────────────────────

/// Success body of the PDF routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfScrapeResponse {
    pub message: String,
    pub markdown_content: String,
}

/// Body of `POST /web/scrape`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebScrapeRequest {
    #[serde(default)]
    pub url: Option<String>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Success body of the web route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebScrapeResponse {
    pub message: String,
    pub markdown_content: String,
    /// Storage locations of the re-uploaded images, in DOM order.
    pub image_urls: Vec<String>,
}

// ── Gateway ──────────────────────────────────────────────────────────────

/// The request router.
pub struct Gateway {
    enterprise: Arc<dyn PdfExtractor>,
    opensource: Arc<dyn PdfExtractor>,
    browser: Arc<dyn WebScraper>,
    scraping_api: Arc<dyn WebScraper>,
    store: Arc<dyn ObjectStore>,
    fetcher: Arc<dyn AssetFetcher>,
    scraping_api_key: Option<String>,
    empty_content: EmptyContentPolicy,
    render: RenderOptions,
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("enterprise", &self.enterprise.name())
            .field("opensource", &self.opensource.name())
            .field("browser", &self.browser.name())
            .field("scraping_api", &self.scraping_api.name())
            .field(
                "scraping_api_key",
                &self.scraping_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("empty_content", &self.empty_content)
            .field("render", &self.render)
            .finish()
    }
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::default()
    }

    /// Wire the production adapters and store described by `config`.
    pub async fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::Internal(format!("HTTP client: {}", e)))?;
        let store = storage::build_store(config).await?;

        Gateway::builder()
            .enterprise(Arc::new(CloudDocumentAdapter::from_config(
                config,
                http.clone(),
            )))
            .opensource(Arc::new(EmbeddedPdfAdapter::new(
                config.pdfium_library_dir.clone(),
            )))
            .browser(Arc::new(BrowserAdapter::new(Arc::new(
                ChromeRenderer::from_config(config),
            ))))
            .scraping_api(Arc::new(ScrapingApiAdapter::new(
                http.clone(),
                config.scraping_api_endpoint.clone(),
            )))
            .store(store)
            .fetcher(Arc::new(HttpFetcher::new(http)))
            .scraping_api_key(config.scraping_api_key.clone())
            .empty_content(config.empty_content)
            .render_layout_blocks(config.render_layout_blocks)
            .build()
    }

    /// Extract a PDF upload, persist every artifact, return the Markdown.
    ///
    /// # Errors
    /// - [`GatewayError::NotAPdf`] before anything is stored
    /// - [`GatewayError::NoDataExtracted`] when the backend found nothing
    ///   (or found only whitespace under [`EmptyContentPolicy::Reject`])
    /// - [`GatewayError::StorageWrite`] when any write fails
    pub async fn scrape_pdf(
        &self,
        variant: PdfVariant,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<PdfScrapeResponse, GatewayError> {
        let start = Instant::now();
        let filename = sanitize_filename(filename);
        info!("PDF request ({}): {} ({} bytes)", variant, filename, bytes.len());

        // ── Step 1: Validate ─────────────────────────────────────────────
        if !has_pdf_header(&bytes) {
            return Err(GatewayError::NotAPdf {
                filename,
                magic: bytes.iter().take(4).copied().collect(),
            });
        }

        let folder = variant.folder();
        let adapter = match variant {
            PdfVariant::Enterprise => &self.enterprise,
            PdfVariant::OpenSource => &self.opensource,
        };

        // ── Step 2: Store the upload ─────────────────────────────────────
        let pdf = StorageObject::new(&folder, &filename, bytes, "application/pdf");
        let upload_key = pdf.key();
        let pdf_bytes = pdf.bytes.clone();
        self.store.put(pdf).await?;
        debug!("Stored upload at {}", upload_key);

        // ── Step 3: Extract ──────────────────────────────────────────────
        let extracted = adapter
            .analyze(&pdf_bytes)
            .await?
            .ok_or(GatewayError::NoDataExtracted)?;
        if extracted.is_blank() {
            match self.empty_content {
                EmptyContentPolicy::Reject => return Err(GatewayError::NoDataExtracted),
                EmptyContentPolicy::Accept => {
                    warn!("{} extracted no content from {}", adapter.name(), filename)
                }
            }
        }

        // ── Step 4: Render and store Markdown ────────────────────────────
        let markdown = markdown::render(&extracted, variant.flavor(), self.render);
        self.store
            .put(StorageObject::new(
                format!("{}/markdown", folder),
                markdown_filename(&filename),
                markdown.clone().into_bytes(),
                "text/markdown",
            ))
            .await?;

        // ── Step 5: Store images ─────────────────────────────────────────
        for image in &extracted.images {
            let png = image.decoded().map_err(|e| {
                GatewayError::Internal(format!("image {} is not valid base64: {}", image.filename, e))
            })?;
            self.store
                .put(StorageObject::new(
                    format!("{}/images", folder),
                    &image.filename,
                    png,
                    "image/png",
                ))
                .await?;
        }

        info!(
            "PDF {} processed by {} in {}ms ({} chars, {} tables, {} images)",
            filename,
            adapter.name(),
            start.elapsed().as_millis(),
            markdown.len(),
            extracted.tables.len(),
            extracted.images.len()
        );

        Ok(PdfScrapeResponse {
            message: PDF_SUCCESS_MESSAGE.to_string(),
            markdown_content: markdown,
        })
    }

    /// Scrape a URL, persist the URL, Markdown and images, return the Markdown
    /// plus the storage locations of the images.
    ///
    /// The method is validated first, so an unknown method never touches the
    /// network. A missing scraping-API key fails the same way.
    pub async fn scrape_web(
        &self,
        request: &WebScrapeRequest,
    ) -> Result<WebScrapeResponse, GatewayError> {
        let start = Instant::now();

        // ── Step 1: Validate ─────────────────────────────────────────────
        let method = ScrapeMethod::parse(&request.method)?;
        let url = request
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(GatewayError::MissingUrl)?;
        info!("Web request ({}): {}", method, url);

        // ── Step 2: Scrape ───────────────────────────────────────────────
        let result = match method {
            ScrapeMethod::Selenium => {
                self.browser
                    .scrape(ScrapeRequest { url, api_key: None })
                    .await?
            }
            ScrapeMethod::ScrapingBee => {
                let key = request
                    .api_key
                    .as_deref()
                    .filter(|k| !k.trim().is_empty())
                    .or(self.scraping_api_key.as_deref())
                    .ok_or_else(|| {
                        GatewayError::NotConfigured("ScrapingBee API key not configured".into())
                    })?;
                self.scraping_api
                    .scrape(ScrapeRequest {
                        url,
                        api_key: Some(key),
                    })
                    .await?
            }
        };

        // ── Step 3: Store URL and Markdown ───────────────────────────────
        let folder = method.folder();
        self.store
            .put(StorageObject::new(
                folder,
                "scraped_url.txt",
                url.as_bytes().to_vec(),
                "text/plain",
            ))
            .await?;
        self.store
            .put(StorageObject::new(
                folder,
                "scraped_data.md",
                result.markdown.clone().into_bytes(),
                "text/markdown",
            ))
            .await?;

        // ── Step 4: Re-host images, one at a time, in DOM order ──────────
        let mut image_urls = Vec::with_capacity(result.image_urls.len());
        for (idx, image_url) in result.image_urls.iter().enumerate() {
            let bytes = self.fetcher.fetch(image_url).await?;
            let location = self
                .store
                .put(StorageObject::new(
                    format!("{}/images", folder),
                    format!("image_{}.jpg", idx + 1),
                    bytes,
                    "image/jpeg",
                ))
                .await?;
            image_urls.push(location);
        }

        info!(
            "Scraped {} with {} in {}ms ({} images)",
            url,
            method,
            start.elapsed().as_millis(),
            image_urls.len()
        );

        Ok(WebScrapeResponse {
            message: WEB_SUCCESS_MESSAGE.to_string(),
            markdown_content: result.markdown,
            image_urls,
        })
    }
}

/// Last path component of a client-supplied filename.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "." || base == ".." {
        "upload.pdf".to_string()
    } else {
        base.to_string()
    }
}

/// pdfium accepts the `%PDF` header anywhere in the first 1024 bytes.
fn has_pdf_header(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(PDF_HEADER_WINDOW)]
        .windows(4)
        .any(|w| w == b"%PDF")
}

/// `report.pdf` → `report.md`; names without a `.pdf` suffix get `.md` appended.
fn markdown_filename(name: &str) -> String {
    let stem = if name.to_ascii_lowercase().ends_with(".pdf") {
        &name[..name.len() - 4]
    } else {
        name
    };
    format!("{}.md", stem)
}

// ── Builder ──────────────────────────────────────────────────────────────

/// Builder for [`Gateway`]. Every collaborator is required.
#[derive(Default)]
pub struct GatewayBuilder {
    enterprise: Option<Arc<dyn PdfExtractor>>,
    opensource: Option<Arc<dyn PdfExtractor>>,
    browser: Option<Arc<dyn WebScraper>>,
    scraping_api: Option<Arc<dyn WebScraper>>,
    store: Option<Arc<dyn ObjectStore>>,
    fetcher: Option<Arc<dyn AssetFetcher>>,
    scraping_api_key: Option<String>,
    empty_content: EmptyContentPolicy,
    render: RenderOptions,
}

impl GatewayBuilder {
    pub fn enterprise(mut self, adapter: Arc<dyn PdfExtractor>) -> Self {
        self.enterprise = Some(adapter);
        self
    }

    pub fn opensource(mut self, adapter: Arc<dyn PdfExtractor>) -> Self {
        self.opensource = Some(adapter);
        self
    }

    pub fn browser(mut self, adapter: Arc<dyn WebScraper>) -> Self {
        self.browser = Some(adapter);
        self
    }

    pub fn scraping_api(mut self, adapter: Arc<dyn WebScraper>) -> Self {
        self.scraping_api = Some(adapter);
        self
    }

    pub fn store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Server-side scraping-API key, used when a request carries none.
    pub fn scraping_api_key(mut self, key: Option<String>) -> Self {
        self.scraping_api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn empty_content(mut self, policy: EmptyContentPolicy) -> Self {
        self.empty_content = policy;
        self
    }

    pub fn render_layout_blocks(mut self, enabled: bool) -> Self {
        self.render.layout_blocks = enabled;
        self
    }

    pub fn build(self) -> Result<Gateway, GatewayError> {
        fn required<T>(value: Option<T>, what: &str) -> Result<T, GatewayError> {
            value.ok_or_else(|| GatewayError::InvalidConfig(format!("gateway needs a {}", what)))
        }

        Ok(Gateway {
            enterprise: required(self.enterprise, "enterprise PDF adapter")?,
            opensource: required(self.opensource, "open-source PDF adapter")?,
            browser: required(self.browser, "browser adapter")?,
            scraping_api: required(self.scraping_api, "scraping-API adapter")?,
            store: required(self.store, "object store")?,
            fetcher: required(self.fetcher, "image fetcher")?,
            scraping_api_key: self.scraping_api_key,
            empty_content: self.empty_content,
            render: self.render,
        })
    }
}
