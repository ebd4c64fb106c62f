//! Markdown normalizer for the PDF routes.
//!
//! Output order is fixed and downstream consumers depend on it:
//!
//! 1. title heading
//! 2. full text block
//! 3. table section (only when the adapter found tables)
//! 4. layout-block section (opt-in)
//! 5. image embeds (open-source flavor only)
//!
//! The two flavors keep the headings each backend has always produced.

use crate::model::{ExtractionResult, LayoutBlockKind};
use std::fmt::Write as _;

/// Which backend's Markdown conventions to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkdownFlavor {
    /// Cloud document-analysis output.
    Enterprise,
    /// Embedded pdfium output; embeds images as data URIs.
    OpenSource,
}

/// Rendering switches not implied by the flavor.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Emit the embedded adapter's layout dump.
    pub layout_blocks: bool,
}

/// Render an extraction result as a single Markdown document.
pub fn render(result: &ExtractionResult, flavor: MarkdownFlavor, opts: RenderOptions) -> String {
    let mut md = String::with_capacity(result.text.len() + 256);

    match flavor {
        MarkdownFlavor::Enterprise => {
            md.push_str("# Extracted PDF Data\n\n");
            let _ = write!(md, "## Text Data\n\n{}\n\n", result.text);
        }
        MarkdownFlavor::OpenSource => {
            md.push_str("# Extracted Data from PDF\n\n");
            md.push_str("## Extracted Text\n");
            md.push_str(&result.text);
        }
    }

    if !result.tables.is_empty() {
        let heading = match flavor {
            MarkdownFlavor::Enterprise => "## Tables",
            MarkdownFlavor::OpenSource => "## Extracted Tables",
        };
        let _ = write!(md, "{heading}\n\n");
        for table in &result.tables {
            md.push_str("### Table\n\n");
            for cell in &table.cells {
                let _ = writeln!(md, "Row: {}, Column: {} - {}", cell.row, cell.column, cell.text);
            }
            md.push('\n');
        }
    }

    if opts.layout_blocks && !result.layout_blocks.is_empty() {
        render_layout_blocks(&mut md, result);
    }

    if flavor == MarkdownFlavor::OpenSource {
        md.push_str("## Extracted Images\n");
        for img in &result.images {
            let _ = writeln!(
                md,
                "![{}](data:image/png;base64,{})",
                img.filename,
                img.base64()
            );
        }
    }

    md
}

/// One `### Page n` subsection per page; each text line is its spans joined
/// with ` | `. Image blocks carry no text and are skipped.
fn render_layout_blocks(md: &mut String, result: &ExtractionResult) {
    md.push_str("## Layout Blocks\n");
    let mut current_page = None;
    for block in &result.layout_blocks {
        if current_page != Some(block.page_number) {
            if current_page.is_some() {
                md.push('\n');
            }
            let _ = writeln!(md, "### Page {}", block.page_number);
            current_page = Some(block.page_number);
        }
        if block.kind != LayoutBlockKind::Text {
            continue;
        }
        for line in &block.lines {
            let _ = writeln!(md, "{}", line.join(" | "));
        }
    }
    md.push('\n');
}
