//! Error types for the scrape-gateway library.
//!
//! Three error types, one per side of the wire:
//!
//! * [`GatewayError`]: **fatal for the request**. Bad input, an unreachable
//!   provider, a failed storage write. Every route boundary converts it into
//!   a single `{"detail": ...}` message with an HTTP status category from
//!   [`GatewayError::status`].
//!
//! * [`ScrapeError`]: a web adapter could not produce a result. It is the
//!   `Err` half of every web scrape; the router wraps it in
//!   [`GatewayError::Scrape`] without inspecting its text.
//!
//! * [`ClientError`]: what [`crate::client::GatewayClient`] callers see. A
//!   rejected request carries the server's `detail` verbatim.
//!
//! No structured error codes exist beyond the status category; the dashboard
//! displays the message verbatim.

use axum::http::StatusCode;
use thiserror::Error;

/// All request-fatal errors returned by the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The scraping method is not one of the supported values.
    #[error("Invalid Scraping Method")]
    InvalidMethod { method: String },

    /// The request did not carry a URL to scrape.
    #[error("A URL is required for web scraping")]
    MissingUrl,

    /// The upload was not a PDF.
    #[error("Uploaded file '{filename}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { filename: String, magic: Vec<u8> },

    /// The request body could not be read (missing multipart field, bad JSON).
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The PDF adapter produced nothing usable.
    #[error("No Data Extracted From the PDF")]
    NoDataExtracted,

    /// The embedded PDF library failed on the document.
    #[error("PDF processing failed: {0}")]
    ProcessingFailed(String),

    /// A web adapter reported a failure.
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    /// An image referenced by a scraped page could not be downloaded.
    #[error("Failed to download image '{url}': {reason}")]
    ImageDownload { url: String, reason: String },

    // ── Storage errors ────────────────────────────────────────────────────
    /// The object store rejected a write.
    #[error("S3 Upload Failed: {reason}")]
    StorageWrite { key: String, reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// A required credential or endpoint is not configured.
    #[error("{0}")]
    NotConfigured(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status category reported for this error.
    ///
    /// Input and "nothing extracted" errors are client-shaped (400); provider,
    /// storage, and internal failures are server-shaped (500).
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidMethod { .. }
            | GatewayError::MissingUrl
            | GatewayError::NotAPdf { .. }
            | GatewayError::MalformedRequest(_)
            | GatewayError::NoDataExtracted
            | GatewayError::NotConfigured(_) => StatusCode::BAD_REQUEST,
            GatewayError::ProcessingFailed(_)
            | GatewayError::Scrape(_)
            | GatewayError::ImageDownload { .. }
            | GatewayError::StorageWrite { .. }
            | GatewayError::InvalidConfig(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure of a web adapter.
///
/// Each variant renders the message users have always seen for that backend,
/// so the dashboard output is unchanged even though callers now match on the
/// variant instead of sniffing a string prefix.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScrapeError {
    /// Headless-browser navigation or extraction failed.
    #[error("Error during scraping: {0}")]
    Browser(String),

    /// The scraping API answered with a non-success status.
    #[error("Error: Failed to scrape the page. Status code: {status}")]
    Status { status: u16 },

    /// The scraping API could not be reached.
    #[error("Error: An error occurred: {0}")]
    Transport(String),
}

/// Failure of a call made through the gateway client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The gateway answered with an error envelope.
    #[error("{detail}")]
    Rejected { status: u16, detail: String },

    /// The gateway could not be reached or its answer could not be read.
    #[error("Request to gateway failed: {0}")]
    Transport(#[from] reqwest::Error),
}
