//! `officekit_io_xlsx` v1:
//! Template-driven spreadsheet generation engine.
//!
//! Modules, leaves first:
//! - `conf`     : constants and default style presets
//! - `spec`     : specs/models/options and the export error taxonomy
//! - `util`     : pure helper functions (addresses, sheet names, text)
//! - `style`    : per-workbook style registry
//! - `fetch`    : remote image fetching and staging
//! - `template` : template workbook reader and standard template generators
//! - `canvas`   : buffered per-sheet model flushed into a worksheet
//! - `layout`   : layout strategies (`budget`, `simple`, `quote`, `cover`)
//! - `writer`   : sheet orchestrator and output serializer
pub mod canvas;
pub mod conf;
pub mod fetch;
pub mod layout;
pub mod spec;
pub mod style;
pub mod template;
pub mod util;
pub mod writer;

pub use canvas::{SheetCanvas, SpecCanvasContext, SpecImagePlacement};
pub use conf::{
    C_LAYOUT_KEY_DEFAULT, N_LEN_EXCEL_SHEET_NAME_MAX, N_QUOTE_DISCOUNT_RATE, TUP_EXCEL_ILLEGAL,
    derive_default_style_presets, derive_style_preset,
};
pub use fetch::{AssetFetcher, HttpAssetFetcher, SpecFetchedAsset};
pub use layout::{
    BudgetLayout, CoverLayout, LayoutRegistry, LayoutStrategy, QuoteLayout, SimpleLayout,
    SpecLayoutInput, derive_layout_key,
};
pub use spec::{
    EnumCellValue, ExportError, SpecCancelToken, SpecCellAddress, SpecCellFormat,
    SpecEmbeddedImage, SpecMergeRange, SpecRichTextSegment, SpecSheetAux, SpecSheetInput,
    SpecSheetReport, SpecXlsxExportOptions, SpecXlsxReport, TypeItemRow,
};
pub use style::{StyleHandle, StyleRegistry};
pub use template::{
    SpecTemplateSheet, SpecTemplateWorkbook, write_blank_template, write_quote_template,
};
pub use util::{derive_column_letters, derive_rmb_uppercase, sanitize_sheet_name};
pub use writer::{XlsxWriter, export_xlsx, validate_sheet_inputs};
