//! Pure transformation stages shared by the adapters and the router.
//!
//! Nothing in here does I/O, so every stage is unit-tested on literals.
//!
//! ```text
//! pdfium image ──▶ encode   ──▶ ImageAsset (base64 PNG)
//! ExtractionResult ──▶ markdown ──▶ PDF-route Markdown
//! HTML / DOM ──▶ html     ──▶ web-route Markdown + image URLs
//! ```

pub mod encode;
pub mod html;
pub mod markdown;
