//! Export dispatch by document kind.

use log::{info, warn};

use officekit_io_pdf::export_pdf;
use officekit_io_xlsx::{
    AssetFetcher, ExportError, HttpAssetFetcher, SpecCancelToken, SpecXlsxExportOptions,
    SpecXlsxReport, export_xlsx,
};

use crate::conf::{C_TEMPLATE_ID_DEFAULT, SpecServiceConfig};
use crate::request::{parse_pdf_document, parse_sheet_inputs};
use crate::spec::{EnumDocumentKind, EnumExportReport, ExportRequest, SpecExportOutput};
use crate::template::TemplateStore;

const C_WORD_UNSUPPORTED: &str =
    "Word export is not yet available; please use Excel or PDF export instead";

/// Stateless export service over one template store.
pub struct ExportService {
    store: TemplateStore,
    options: SpecXlsxExportOptions,
    fetcher: Box<dyn AssetFetcher>,
}

impl ExportService {
    /// Build from configuration with an HTTP image fetcher.
    pub fn from_config(cfg: &SpecServiceConfig) -> Result<Self, ExportError> {
        let options = cfg.to_xlsx_options();
        let fetcher = HttpAssetFetcher::new(options.fetch_timeout, options.bytes_fetch_max)?;
        Ok(Self::new(
            TemplateStore::new(cfg.template.path.clone()),
            options,
            Box::new(fetcher),
        ))
    }

    pub fn new(
        store: TemplateStore,
        options: SpecXlsxExportOptions,
        fetcher: Box<dyn AssetFetcher>,
    ) -> Self {
        Self {
            store,
            options,
            fetcher,
        }
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    /// Export `request`, dispatching on `request.data_type`.
    pub fn export(
        &self,
        request: &ExportRequest,
        cancel: &SpecCancelToken,
    ) -> Result<SpecExportOutput, ExportError> {
        let kind = EnumDocumentKind::parse(&request.data_type)?;
        self.export_as(kind, request, cancel)
    }

    /// Export `request` as `kind`, ignoring `request.data_type`.
    pub fn export_as(
        &self,
        kind: EnumDocumentKind,
        request: &ExportRequest,
        cancel: &SpecCancelToken,
    ) -> Result<SpecExportOutput, ExportError> {
        let (bytes, report) = match kind {
            EnumDocumentKind::Excel => {
                let (bytes, report) = self.export_excel(request, cancel)?;
                (bytes, EnumExportReport::Xlsx(report))
            }
            EnumDocumentKind::Word => {
                return Err(ExportError::Unsupported(C_WORD_UNSUPPORTED.to_string()));
            }
            EnumDocumentKind::Pdf => {
                let doc = parse_pdf_document(&request.data)?;
                let (bytes, report) =
                    export_pdf(&doc).map_err(|e| ExportError::OperationFailed(e.to_string()))?;
                (bytes, EnumExportReport::Pdf(report))
            }
        };

        let n_warnings = report.warnings().len();
        if n_warnings > 0 {
            warn!("{kind} export finished with {n_warnings} warnings");
        }
        info!("{kind} export produced {} bytes", bytes.len());
        Ok(SpecExportOutput {
            bytes,
            content_type: kind.content_type(),
            filename: kind.filename(),
            report,
        })
    }

    fn export_excel(
        &self,
        request: &ExportRequest,
        cancel: &SpecCancelToken,
    ) -> Result<(Vec<u8>, SpecXlsxReport), ExportError> {
        let l_sheets = parse_sheet_inputs(&request.data)?;
        let c_template_id = match request.template_id.trim() {
            "" => C_TEMPLATE_ID_DEFAULT,
            id => id,
        };
        let path_template = self.store.get_path(c_template_id, EnumDocumentKind::Excel)?;
        export_xlsx(
            &path_template,
            c_template_id,
            &l_sheets,
            &self.options,
            self.fetcher.as_ref(),
            cancel,
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::template::init_templates;
    use officekit_io_xlsx::SpecFetchedAsset;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Fetcher that never reaches the network.
    pub(crate) struct OfflineFetcher;

    impl AssetFetcher for OfflineFetcher {
        fn fetch(
            &self,
            url: &str,
            _cancel: &SpecCancelToken,
        ) -> Result<SpecFetchedAsset, ExportError> {
            Err(ExportError::AssetFetchFailed(format!("offline: {url}")))
        }
    }

    pub(crate) fn create_service() -> (tempfile::TempDir, ExportService) {
        let dir = tempfile::tempdir().expect("tempdir");
        init_templates(dir.path()).expect("init");
        let service = ExportService::new(
            TemplateStore::new(dir.path()),
            SpecXlsxExportOptions::default(),
            Box::new(OfflineFetcher),
        );
        (dir, service)
    }

    fn create_request(template_id: &str, data_type: &str, data: serde_json::Value) -> ExportRequest {
        ExportRequest {
            template_id: template_id.to_string(),
            data_type: data_type.to_string(),
            data,
        }
    }

    #[test]
    fn test_excel_export_uses_default_template() {
        let (_dir, service) = create_service();
        let req = create_request("", "excel", json!({"sheets": [{"name": "S", "template_id": "simple", "items": []}]}));
        let out = service.export(&req, &SpecCancelToken::new()).expect("export");
        assert_eq!(out.filename, "export.xlsx");
        assert_eq!(out.content_type, EnumDocumentKind::Excel.content_type());
        assert!(out.bytes.starts_with(b"PK"));
        let EnumExportReport::Xlsx(report) = out.report else {
            panic!("xlsx report expected");
        };
        assert_eq!(report.sheets.len(), 1);
        assert_eq!(report.sheets[0].layout_key, "simple");
    }

    #[test]
    fn test_excel_rejects_empty_sheets_before_template_lookup() {
        let (_dir, service) = create_service();
        let req = create_request("missing", "excel", json!({"sheets": []}));
        let err = service.export(&req, &SpecCancelToken::new()).expect_err("empty");
        assert_eq!(err.code(), 400);
    }

    #[test]
    fn test_unknown_template_is_not_found() {
        let (_dir, service) = create_service();
        let req = create_request("nope", "excel", json!({"sheets": [{"items": []}]}));
        let err = service.export(&req, &SpecCancelToken::new()).expect_err("missing");
        assert_eq!(err.code(), 404);
    }

    #[test]
    fn test_word_is_unsupported() {
        let (_dir, service) = create_service();
        let req = create_request("default", "word", json!({}));
        let err = service.export(&req, &SpecCancelToken::new()).expect_err("word");
        assert_eq!(err.code(), 501);
        assert!(err.to_string().contains("not yet available"));
    }

    #[test]
    fn test_pdf_export() {
        let (_dir, service) = create_service();
        let req = create_request(
            "",
            "pdf",
            json!({"title": "Report", "content": [{"type": "paragraph", "text": "Body"}]}),
        );
        let out = service.export(&req, &SpecCancelToken::new()).expect("pdf");
        assert_eq!(out.filename, "export.pdf");
        assert!(out.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_invalid_pdf_widths_map_to_operation_failed() {
        let (_dir, service) = create_service();
        let req = create_request(
            "",
            "pdf",
            json!({"content": [{"type": "table", "data": {
                "headers": [[{"text": "a"}]], "rows": [], "col_widths": [-5]
            }}]}),
        );
        let err = service.export(&req, &SpecCancelToken::new()).expect_err("widths");
        assert_eq!(err.code(), 500);
    }
}
