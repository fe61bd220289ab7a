//! `officekit_io_pdf` v1:
//! Minimal PDF exporter for title, paragraph and table documents.
//!
//! - `conf`   : page geometry and font resources
//! - `spec`   : document model, report and errors
//! - `util`   : text encoding, wrapping and column planning
//! - `writer` : page layout and PDF assembly
pub mod conf;
pub mod spec;
pub mod util;
pub mod writer;

pub use spec::{
    EnumPdfBlock, PdfExportError, SpecPdfDocument, SpecPdfReport, SpecPdfTable, SpecPdfTableCell,
};
pub use writer::export_pdf;
