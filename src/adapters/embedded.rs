//! Embedded PDF extraction via pdfium: page text, layout blocks, images.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and blocks while it parses. The whole extraction runs on the
//! blocking pool so Tokio worker threads never stall on a large document.
//!
//! ## Where does pdfium come from?
//!
//! A library next to the binary (or in `PDFIUM_LIB_DIR`) wins; otherwise the
//! system-installed one is used. Either missing is a processing failure for
//! the request, not a startup error, so the cloud and web routes keep working
//! on hosts without pdfium.

use super::PdfExtractor;
use crate::error::GatewayError;
use crate::model::{ExtractionResult, LayoutBlock, LayoutBlockKind, PageText};
use crate::pipeline::encode::encode_image_asset;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Adapter for the embedded pdfium extractor.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedPdfAdapter {
    library_dir: Option<PathBuf>,
}

impl EmbeddedPdfAdapter {
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }
}

#[async_trait]
impl PdfExtractor for EmbeddedPdfAdapter {
    fn name(&self) -> &str {
        "embedded-pdfium"
    }

    async fn analyze(&self, pdf: &[u8]) -> Result<Option<ExtractionResult>, GatewayError> {
        let bytes = pdf.to_vec();
        let dir = self.library_dir.clone();

        let result = tokio::task::spawn_blocking(move || extract_blocking(dir.as_deref(), &bytes))
            .await
            .map_err(|e| GatewayError::Internal(format!("Extraction task panicked: {}", e)))??;

        Ok(Some(result))
    }
}

fn bind_pdfium(dir: Option<&Path>) -> Result<Pdfium, GatewayError> {
    let local = dir
        .map(|d| d.to_string_lossy().into_owned())
        .unwrap_or_else(|| "./".to_string());

    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
        local.as_str(),
    ))
    .or_else(|_| Pdfium::bind_to_system_library())
    .map_err(|e| GatewayError::ProcessingFailed(format!("pdfium library unavailable: {:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of the extraction.
fn extract_blocking(dir: Option<&Path>, bytes: &[u8]) -> Result<ExtractionResult, GatewayError> {
    let pdfium = bind_pdfium(dir)?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| GatewayError::ProcessingFailed(format!("{:?}", e)))?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut result = ExtractionResult::default();
    let mut breakdown = Vec::new();

    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;

        let page_text = page
            .text()
            .map_err(|e| GatewayError::ProcessingFailed(format!("page {}: {:?}", page_num, e)))?
            .all();
        let page_text = normalise_line_endings(&page_text);

        let _ = write!(result.text, "### Page {}\n\n{}\n\n", page_num, page_text);
        breakdown.push(PageText {
            page_number: page_num,
            text: page_text,
        });

        let mut image_index = 0;
        for object in page.objects().iter() {
            collect_object(&object, page_num, &mut image_index, &mut result)?;
        }
        debug!("Page {}: {} images", page_num, image_index);
    }

    result.page_breakdown = Some(breakdown);
    Ok(result)
}

/// Record one page object, descending into form XObjects so nested text
/// and images are found too.
fn collect_object(
    object: &PdfPageObject<'_>,
    page_num: usize,
    image_index: &mut usize,
    result: &mut ExtractionResult,
) -> Result<(), GatewayError> {
    if let Some(text_object) = object.as_text_object() {
        let lines = text_lines(&text_object.text());
        if !lines.is_empty() {
            result.layout_blocks.push(LayoutBlock {
                page_number: page_num,
                kind: LayoutBlockKind::Text,
                lines,
            });
        }
    } else if let Some(image_object) = object.as_image_object() {
        *image_index += 1;
        let index = *image_index;
        let raw = image_object.get_raw_image().map_err(|e| {
            GatewayError::ProcessingFailed(format!("image {} on page {}: {:?}", index, page_num, e))
        })?;
        let asset = encode_image_asset(&raw, page_num, index).map_err(|e| {
            GatewayError::ProcessingFailed(format!("image {} on page {}: {}", index, page_num, e))
        })?;
        result.images.push(asset);
        result.layout_blocks.push(LayoutBlock {
            page_number: page_num,
            kind: LayoutBlockKind::Image,
            lines: Vec::new(),
        });
    } else if let Some(form) = object.as_x_object_form_object() {
        for child in form.iter() {
            collect_object(&child, page_num, image_index, result)?;
        }
    }
    Ok(())
}

/// Non-blank lines of a text object, one span per line.
fn text_lines(text: &str) -> Vec<Vec<String>> {
    normalise_line_endings(text)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| vec![l.to_string()])
        .collect()
}

/// pdfium reports line breaks as `\r\n`.
fn normalise_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc\n"), "a\nb\nc\n");
    }

    #[test]
    fn text_object_lines_skip_blanks() {
        assert_eq!(
            text_lines("Total\r\n  \r\n42"),
            vec![vec!["Total".to_string()], vec!["42".to_string()]]
        );
        assert!(text_lines(" \n\t").is_empty());
    }
}
