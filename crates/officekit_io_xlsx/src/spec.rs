//! Shared XLSX specification models and the export error taxonomy.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;

use crate::conf::{DUR_FETCH_TIMEOUT_DEFAULT, N_BYTES_FETCH_MAX_DEFAULT};

////////////////////////////////////////////////////////////////////////////////
// #region ErrorTaxonomy

/// Top-level export failure.
///
/// Every variant except [`ExportError::AssetFetchFailed`] aborts the export;
/// asset failures are absorbed by the layout that requested the image.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Malformed or empty request input.
    #[error("invalid request: {0}")]
    Validation(String),
    /// Template file missing for the requested id and kind.
    #[error("template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),
    /// Workbook mutation, style, merge, formula, template read or save failure.
    #[error("operation failed: {0}")]
    OperationFailed(String),
    /// Remote image could not be fetched or embedded.
    #[error("asset fetch failed: {0}")]
    AssetFetchFailed(String),
    /// Caller cancelled the export.
    #[error("export cancelled")]
    Cancelled,
    /// Export kind exists but is not implemented.
    #[error("{0}")]
    Unsupported(String),
}

impl ExportError {
    /// Numeric code carried in `{code, message}` payloads.
    pub fn code(&self) -> u16 {
        match self {
            ExportError::Validation(_) => 400,
            ExportError::TemplateNotFound(_) => 404,
            ExportError::Cancelled => 499,
            ExportError::Unsupported(_) => 501,
            ExportError::OperationFailed(_) | ExportError::AssetFetchFailed(_) => 500,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Immutable style descriptor.
///
/// Structurally equal descriptors intern to the same handle in
/// [`crate::style::StyleRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,
    /// Font color as `#RRGGBB`.
    pub font_color: Option<String>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Border style for all sides.
    pub border: Option<i64>,
    /// Top border override.
    pub top: Option<i64>,
    /// Bottom border override.
    pub bottom: Option<i64>,
    /// Left border override.
    pub left: Option<i64>,
    /// Right border override.
    pub right: Option<i64>,
    /// Border color as `#RRGGBB`.
    pub border_color: Option<String>,

    /// Solid background fill color as `#RRGGBB`.
    pub bg_color: Option<String>,
    /// Number format code.
    pub num_format: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            text_wrap: other.text_wrap.or(self.text_wrap),
            border: other.border.or(self.border),
            top: other.top.or(self.top),
            bottom: other.bottom.or(self.bottom),
            left: other.left.or(self.left),
            right: other.right.or(self.right),
            border_color: other
                .border_color
                .clone()
                .or_else(|| self.border_color.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
        }
    }

    /// Keep only the font part of the descriptor (rich text runs).
    pub fn font_only(&self) -> SpecCellFormat {
        SpecCellFormat {
            font_name: self.font_name.clone(),
            font_size: self.font_size,
            bold: self.bold,
            italic: self.italic,
            font_color: self.font_color.clone(),
            ..Default::default()
        }
    }
}

/// One run of text inside a rich text cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRichTextSegment {
    /// Run text.
    pub text: String,
    /// Run font; only the font fields are honored.
    pub format: SpecCellFormat,
}

impl SpecRichTextSegment {
    pub fn new(text: impl Into<String>, format: SpecCellFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValueSpecification

/// Normalized cell value.
///
/// Request fields arrive as `None`/`String`/`Number`/`Boolean`; layouts
/// additionally emit `Formula` and `RichText` cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
    /// Formula without the leading `=`.
    Formula(String),
    /// Ordered rich text runs.
    RichText(Vec<SpecRichTextSegment>),
}

impl EnumCellValue {
    /// Numeric view used by totals; only real numbers count.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            EnumCellValue::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    /// Text view used by labels and image URLs.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            EnumCellValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, EnumCellValue::None)
    }
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        EnumCellValue::String(value.to_string())
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        EnumCellValue::String(value)
    }
}

impl From<f64> for EnumCellValue {
    fn from(value: f64) -> Self {
        EnumCellValue::Number(value)
    }
}

/// One request row: layout-specific label to value.
pub type TypeItemRow = BTreeMap<String, EnumCellValue>;

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region AddressSpecification

/// Cell address with a 1-based row and 1-based column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpecCellAddress {
    /// 1-based row number.
    pub row: u32,
    /// 1-based column number.
    pub col: u16,
}

impl SpecCellAddress {
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Zero-based `(row, col)` as used by the workbook writer.
    pub fn to_zero_based(self) -> (u32, u16) {
        (self.row.saturating_sub(1), self.col.saturating_sub(1))
    }
}

impl fmt::Display for SpecCellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            crate::util::derive_column_letters(self.col),
            self.row
        )
    }
}

/// Rectangular merge range; both corners inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpecMergeRange {
    /// Top-left corner.
    pub start: SpecCellAddress,
    /// Bottom-right corner.
    pub end: SpecCellAddress,
}

impl SpecMergeRange {
    /// Whether `addr` falls inside the range.
    pub fn contains(&self, addr: SpecCellAddress) -> bool {
        addr.row >= self.start.row
            && addr.row <= self.end.row
            && addr.col >= self.start.col
            && addr.col <= self.end.col
    }

    /// Whether two ranges share at least one cell.
    pub fn overlaps(&self, other: &SpecMergeRange) -> bool {
        self.start.row <= other.end.row
            && other.start.row <= self.end.row
            && self.start.col <= other.end.col
            && other.start.col <= self.end.col
    }
}

impl fmt::Display for SpecMergeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetInputSpecification

/// Typed layout-specific fields that live next to `items` in a sheet entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecSheetAux {
    /// Budget logo image (A1).
    pub logo_url: Option<String>,
    /// Budget floor plan image (G2).
    pub floor_plan_url: Option<String>,
    /// Cover logo image (A1).
    pub cover_logo_url: Option<String>,
    /// Project name shown by the budget and cover layouts.
    pub project_name: Option<String>,
    /// Cover: project address.
    pub project_address: Option<String>,
    /// Cover: scheme content.
    pub project_content: Option<String>,
    /// Cover: approver.
    pub approver: Option<String>,
    /// Cover: reviewer.
    pub reviewer: Option<String>,
    /// Cover: designer.
    pub designer: Option<String>,
    /// Cover: date text.
    pub date: Option<String>,
    /// Cover: contact person.
    pub contact: Option<String>,
    /// Cover: phone number.
    pub phone: Option<String>,
    /// Cover: WeChat id.
    pub wechat: Option<String>,
}

/// One entry of the request's `sheets` list after schema validation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSheetInput {
    /// Requested sheet name; `Sheet<N>` when absent or blank.
    pub name: Option<String>,
    /// Per-sheet layout override.
    pub template_id: Option<String>,
    /// Item rows; `None` when absent or not a list.
    pub items: Option<Vec<TypeItemRow>>,
    /// Layout-specific top-level fields.
    pub aux: SpecSheetAux,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExportOptions

/// Cooperative cancellation flag shared between caller and export.
#[derive(Debug, Clone, Default)]
pub struct SpecCancelToken {
    flag: Arc<AtomicBool>,
}

impl SpecCancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; visible to every clone.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Writer-wide export options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxExportOptions {
    /// Timeout of one remote image fetch.
    pub fetch_timeout: Duration,
    /// Maximum accepted image body size.
    pub bytes_fetch_max: usize,
    /// Fall back to bundled example rows when `items` is absent.
    pub if_use_example_data: bool,
}

impl Default for SpecXlsxExportOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: DUR_FETCH_TIMEOUT_DEFAULT,
            bytes_fetch_max: N_BYTES_FETCH_MAX_DEFAULT,
            if_use_example_data: true,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// One image embedded into a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecEmbeddedImage {
    /// Anchor cell, e.g. `G2`.
    pub anchor: String,
    /// Source URL.
    pub url: String,
}

/// Per-sheet outcome of one layout run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSheetReport {
    /// Final unique sheet name.
    pub sheet_name: String,
    /// Layout key that produced the sheet.
    pub layout_key: String,
    /// Merged ranges, in emission order.
    pub merges: Vec<SpecMergeRange>,
    /// Formula cells as `(cell, formula)`.
    pub formulas: Vec<(String, String)>,
    /// Images that made it into the sheet.
    pub images: Vec<SpecEmbeddedImage>,
    /// Whether bundled example rows replaced missing items.
    pub if_example_data: bool,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecSheetReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

/// Workbook-level report.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecXlsxReport {
    /// Per-sheet reports, in workbook order.
    pub sheets: Vec<SpecSheetReport>,
    /// Non-fatal workbook-level warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }

    /// Count of warnings across the workbook and all sheets.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
            + self
                .sheets
                .iter()
                .map(|sheet| sheet.warnings.len())
                .sum::<usize>()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
