//! Per-request data types flowing from adapters through the router.
//!
//! Everything here is transient: created for one request, consumed once by
//! the Markdown normalizer or the storage step, then dropped. Nothing is
//! cached and nothing carries identity beyond the request.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// Structured output of a PDF adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Full document text, in page order.
    pub text: String,
    /// Provider-detected tables. Only the cloud adapter fills this.
    pub tables: Vec<TableBlock>,
    /// Structural page dump. Only the embedded adapter fills this.
    pub layout_blocks: Vec<LayoutBlock>,
    /// Images pulled out of the document.
    pub images: Vec<ImageAsset>,
    /// Per-page text, when the adapter tracks pages.
    pub page_breakdown: Option<Vec<PageText>>,
}

impl ExtractionResult {
    /// True when the extraction carries no text, tables, or images.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.tables.is_empty() && self.images.is_empty()
    }
}

/// Text of a single page (1-indexed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub page_number: usize,
    pub text: String,
}

/// A provider-detected table. Cells appear in provider order; missing cells
/// are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBlock {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCell {
    pub row: usize,
    pub column: usize,
    pub text: String,
}

/// What a layout block holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutBlockKind {
    Text,
    Image,
}

/// One block of a page's structural dump: lines, each a run of spans.
///
/// This is a layout approximation, not a table model. Non-tabular text shows
/// up here exactly as it sits on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutBlock {
    pub page_number: usize,
    pub kind: LayoutBlockKind,
    pub lines: Vec<Vec<String>>,
}

/// How [`ImageAsset::content`] is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    Base64,
    Raw,
}

/// An image extracted from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    /// Caller-assigned name, e.g. `image_2_1.png`. Not validated for uniqueness.
    pub filename: String,
    pub content: Vec<u8>,
    pub encoding: ImageEncoding,
}

impl ImageAsset {
    /// Base64 payload for embedding in a data URI.
    pub fn base64(&self) -> String {
        match self.encoding {
            ImageEncoding::Base64 => String::from_utf8_lossy(&self.content).into_owned(),
            ImageEncoding::Raw => STANDARD.encode(&self.content),
        }
    }

    /// Raw image bytes, decoding base64 content if needed.
    pub fn decoded(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match self.encoding {
            ImageEncoding::Base64 => STANDARD.decode(&self.content),
            ImageEncoding::Raw => Ok(self.content.clone()),
        }
    }
}

/// Output of a web adapter: Markdown assembled directly from the page plus
/// the absolute image URLs found, in DOM order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebScrapeResult {
    pub markdown: String,
    pub image_urls: Vec<String>,
}

/// A write-once object destined for the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageObject {
    pub folder_path: String,
    pub filename: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl StorageObject {
    pub fn new(
        folder_path: impl Into<String>,
        filename: impl Into<String>,
        bytes: Vec<u8>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            folder_path: folder_path.into(),
            filename: filename.into(),
            bytes,
            content_type: content_type.into(),
        }
    }

    /// Object key: `{folder_path}/{filename}`.
    pub fn key(&self) -> String {
        format!(
            "{}/{}",
            self.folder_path.trim_end_matches('/'),
            self.filename
        )
    }
}
