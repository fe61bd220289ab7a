//! PDF document model, report and errors.

use thiserror::Error;

/// PDF export failure.
#[derive(Debug, Error)]
pub enum PdfExportError {
    /// A block carries values that cannot be laid out.
    #[error("invalid pdf content: {0}")]
    InvalidContent(String),
}

/// One table cell.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecPdfTableCell {
    /// Cell text.
    pub text: String,
    /// Number of columns covered; at least 1.
    pub col_span: usize,
}

impl SpecPdfTableCell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            col_span: 1,
        }
    }

    pub fn with_col_span(mut self, col_span: usize) -> Self {
        self.col_span = col_span.max(1);
        self
    }
}

/// Table block: header rows (filled, bold) then body rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecPdfTable {
    /// Header rows.
    pub headers: Vec<Vec<SpecPdfTableCell>>,
    /// Body rows.
    pub rows: Vec<Vec<SpecPdfTableCell>>,
    /// Column widths in millimetres; defaults to 40 mm per column.
    pub col_widths: Option<Vec<f32>>,
}

/// One content block.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumPdfBlock {
    /// Wrapped text.
    Paragraph {
        text: String,
        bold: bool,
        italic: bool,
        /// Points; values `<= 0` fall back to the body size.
        font_size: Option<f32>,
    },
    /// Bordered table.
    Table(SpecPdfTable),
    /// Image reference; not rendered.
    Image { path: String },
}

/// Whole document: optional centered title and ordered blocks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecPdfDocument {
    pub title: Option<String>,
    pub blocks: Vec<EnumPdfBlock>,
}

/// Outcome of one PDF export.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecPdfReport {
    /// Pages emitted.
    pub n_pages: usize,
    /// Blocks rendered.
    pub n_blocks_written: usize,
    /// Blocks skipped and text that lost characters.
    pub warnings: Vec<String>,
}

impl SpecPdfReport {
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}
