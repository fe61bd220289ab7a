//! `officekit_export` v1:
//! Export service over the spreadsheet and PDF engines.
//!
//! - `conf`     : TOML service configuration
//! - `spec`     : document kinds, request/response models and error payloads
//! - `template` : template store (resolve, list, init)
//! - `request`  : JSON request boundary into typed export inputs
//! - `service`  : export dispatch by document kind
//! - `batch`    : concurrent export of many request files
pub mod batch;
pub mod conf;
pub mod request;
pub mod service;
pub mod spec;
pub mod template;

pub use batch::{ReportBatch, calculate_worker_limit, export_batch};
pub use conf::SpecServiceConfig;
pub use request::{parse_pdf_document, parse_sheet_inputs};
pub use service::ExportService;
pub use spec::{
    EnumDocumentKind, EnumExportReport, ExportRequest, ServiceError, SpecErrorResponse,
    SpecExportOutput, SpecTemplateInfo,
};
pub use template::{TemplateStore, init_templates};
