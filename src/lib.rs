//! # scrape-gateway
//!
//! Extract PDF documents and web pages to Markdown and persist every
//! artifact to object storage.
//!
//! ## Why a gateway?
//!
//! Four very different extractors (a cloud layout-analysis API, embedded
//! pdfium, a headless browser, a third-party scraping API) sit behind one
//! HTTP surface and one response shape. Callers pick a backend per request;
//! the gateway validates the input, runs the backend, normalizes its output
//! into Markdown, and stores the upload, the Markdown and every image.
//!
//! ## Request Flow
//!
//! ```text
//! request
//!  │
//!  ├─ 1. Validate  method, URL, PDF magic bytes
//!  ├─ 2. Store     raw PDF / scraped URL
//!  ├─ 3. Extract   cloud | embedded | browser | scraping API
//!  ├─ 4. Render    ExtractionResult → Markdown (PDF routes)
//!  ├─ 5. Store     Markdown, then each image
//!  └─ 6. Respond   {message, markdown_content[, image_urls]}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scrape_gateway::{server, Gateway, GatewayConfig, StorageBackend};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::builder()
//!         .storage_backend(StorageBackend::Filesystem)
//!         .fs_root("object-store")
//!         .build()?;
//!     let gateway = Arc::new(Gateway::from_config(&config).await?);
//!     server::serve(gateway, &config).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Purpose |
//! |---------|---------|---------|
//! | `cli` | yes | `scrape-gateway` server and `scrape-dash` dashboard binaries |
//!
//! Disable `cli` when embedding the router in another service:
//! ```toml
//! scrape-gateway = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod adapters;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod model;
pub mod pipeline;
pub mod server;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::GatewayClient;
pub use config::{EmptyContentPolicy, GatewayConfig, GatewayConfigBuilder, StorageBackend};
pub use error::{ClientError, GatewayError, ScrapeError};
pub use gateway::{
    Gateway, GatewayBuilder, PdfScrapeResponse, PdfVariant, ScrapeMethod, WebScrapeRequest,
    WebScrapeResponse,
};
pub use model::{ExtractionResult, ImageAsset, StorageObject, WebScrapeResult};
pub use storage::{MemoryStore, ObjectStore};
