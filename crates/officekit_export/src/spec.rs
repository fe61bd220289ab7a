//! Service-level models, error payloads and document kinds.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use officekit_io_xlsx::{ExportError, SpecXlsxReport};
use officekit_io_pdf::SpecPdfReport;

use crate::conf::{C_EXT_EXCEL, C_EXT_PDF, C_EXT_WORD};

////////////////////////////////////////////////////////////////////////////////
// #region ErrorSpecification

/// Service failure: an export error or a local setup problem.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Export(#[from] ExportError),
    /// Config file unreadable or malformed.
    #[error("invalid config: {0}")]
    Config(String),
    /// Request or output file could not be read or written.
    #[error("io error: {0}")]
    Io(String),
}

impl ServiceError {
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::Export(e) => e.code(),
            ServiceError::Config(_) | ServiceError::Io(_) => 500,
        }
    }

    pub fn to_response(&self) -> SpecErrorResponse {
        SpecErrorResponse {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// `{code, message}` error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecErrorResponse {
    pub code: u16,
    pub message: String,
}

impl SpecErrorResponse {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| format!("{{\"code\":{},\"message\":\"\"}}", self.code))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DocumentKind

/// Exportable document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumDocumentKind {
    Excel,
    Word,
    Pdf,
}

impl EnumDocumentKind {
    pub const ALL: [EnumDocumentKind; 3] = [
        EnumDocumentKind::Excel,
        EnumDocumentKind::Word,
        EnumDocumentKind::Pdf,
    ];

    /// Parse a `data_type` value; unknown kinds are validation errors.
    pub fn parse(value: &str) -> Result<Self, ExportError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "excel" => Ok(EnumDocumentKind::Excel),
            "word" => Ok(EnumDocumentKind::Word),
            "pdf" => Ok(EnumDocumentKind::Pdf),
            other => Err(ExportError::Validation(format!(
                "unsupported file type: {other:?}"
            ))),
        }
    }

    /// Template directory name under the template root.
    pub fn as_str(self) -> &'static str {
        match self {
            EnumDocumentKind::Excel => "excel",
            EnumDocumentKind::Word => "word",
            EnumDocumentKind::Pdf => "pdf",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            EnumDocumentKind::Excel => C_EXT_EXCEL,
            EnumDocumentKind::Word => C_EXT_WORD,
            EnumDocumentKind::Pdf => C_EXT_PDF,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            EnumDocumentKind::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            EnumDocumentKind::Word => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            EnumDocumentKind::Pdf => "application/pdf",
        }
    }

    /// Suggested download name, e.g. `export.xlsx`.
    pub fn filename(self) -> String {
        format!("export{}", self.extension())
    }
}

impl fmt::Display for EnumDocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RequestResponse

/// Export request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    #[serde(default, alias = "templateID", alias = "templateId")]
    pub template_id: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Kind-specific outcome of one export.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumExportReport {
    Xlsx(SpecXlsxReport),
    Pdf(SpecPdfReport),
}

impl EnumExportReport {
    pub fn warnings(&self) -> Vec<&str> {
        match self {
            EnumExportReport::Xlsx(report) => report
                .warnings
                .iter()
                .chain(report.sheets.iter().flat_map(|s| s.warnings.iter()))
                .map(String::as_str)
                .collect(),
            EnumExportReport::Pdf(report) => report.warnings.iter().map(String::as_str).collect(),
        }
    }
}

/// Serialized document plus response metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecExportOutput {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
    pub report: EnumExportReport,
}

/// One template file found under the template root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecTemplateInfo {
    /// File stem.
    pub id: String,
    /// File name.
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: EnumDocumentKind,
    pub path: PathBuf,
}

// #endregion
