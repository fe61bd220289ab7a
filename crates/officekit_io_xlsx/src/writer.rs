//! Sheet orchestrator and output serializer.
//!
//! [`XlsxWriter`] owns one workbook and one style registry. Each sheet entry
//! gets a unique name, a layout resolved by key, and a canvas that the layout
//! fills and the writer flushes. The template's placeholder sheet is only
//! emitted when no sheet was written.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rust_xlsxwriter::Workbook;

use crate::canvas::{SheetCanvas, SpecCanvasContext, derive_xlsx_error};
use crate::fetch::AssetFetcher;
use crate::layout::{LayoutRegistry, SpecLayoutInput, derive_layout_key};
use crate::spec::{
    ExportError, SpecCancelToken, SpecSheetInput, SpecSheetReport, SpecXlsxExportOptions,
    SpecXlsxReport,
};
use crate::style::StyleRegistry;
use crate::template::SpecTemplateWorkbook;
use crate::util::{create_sheet_identifier, derive_unique_sheet_name, sanitize_sheet_name};

/// Stateful workbook writer bound to one opened template.
pub struct XlsxWriter<'a> {
    template: SpecTemplateWorkbook,
    workbook: Workbook,
    registry: StyleRegistry,
    layouts: LayoutRegistry,
    fetcher: &'a dyn AssetFetcher,
    cancel: SpecCancelToken,
    options: SpecXlsxExportOptions,
    path_dir_temp: Option<PathBuf>,
    set_sheet_names_lower: BTreeSet<String>,
    report: SpecXlsxReport,
}

impl<'a> XlsxWriter<'a> {
    /// Create a writer with the standard layouts.
    pub fn new(
        template: SpecTemplateWorkbook,
        fetcher: &'a dyn AssetFetcher,
        options: SpecXlsxExportOptions,
        cancel: SpecCancelToken,
    ) -> Self {
        Self {
            template,
            workbook: Workbook::new(),
            registry: StyleRegistry::new(),
            layouts: LayoutRegistry::with_standard_layouts(),
            fetcher,
            cancel,
            options,
            path_dir_temp: None,
            set_sheet_names_lower: BTreeSet::new(),
            report: SpecXlsxReport::default(),
        }
    }

    /// Replace the layout registry.
    pub fn with_layouts(mut self, layouts: LayoutRegistry) -> Self {
        self.layouts = layouts;
        self
    }

    /// Stage fetched images under `path_dir` instead of the system temp dir.
    pub fn with_temp_dir(mut self, path_dir: &Path) -> Self {
        self.path_dir_temp = Some(path_dir.to_path_buf());
        self
    }

    /// Reports of the sheets written so far.
    pub fn report(&self) -> &SpecXlsxReport {
        &self.report
    }

    /// Write every entry of `sheets`, in order.
    pub fn write_sheets(
        &mut self,
        sheets: &[SpecSheetInput],
        request_template_id: &str,
    ) -> Result<(), ExportError> {
        validate_sheet_inputs(sheets)?;
        for (idx, sheet) in sheets.iter().enumerate() {
            self.write_sheet(idx, sheet, request_template_id)?;
        }
        Ok(())
    }

    /// Write one sheet entry at zero-based request position `idx`.
    pub fn write_sheet(
        &mut self,
        idx: usize,
        sheet: &SpecSheetInput,
        request_template_id: &str,
    ) -> Result<&SpecSheetReport, ExportError> {
        if self.cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        let c_name_requested = sheet
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToString::to_string)
            .unwrap_or_else(|| create_sheet_identifier(idx));
        let sheet_name = derive_unique_sheet_name(
            &sanitize_sheet_name(&c_name_requested, "_"),
            &mut self.set_sheet_names_lower,
        );
        let layout_key = derive_layout_key(sheet.template_id.as_deref(), request_template_id);
        let layout = self.layouts.resolve(&layout_key)?;

        let mut canvas = SheetCanvas::new(SpecCanvasContext {
            registry: &mut self.registry,
            fetcher: self.fetcher,
            cancel: &self.cancel,
            path_dir_temp: self.path_dir_temp.as_deref(),
        });
        let input = SpecLayoutInput {
            items: sheet.items.as_deref(),
            aux: &sheet.aux,
            template: Some(&self.template.placeholder),
            if_use_example_data: self.options.if_use_example_data,
        };
        layout.apply(&mut canvas, &input)?;

        let worksheet = self.workbook.add_worksheet();
        worksheet
            .set_name(sheet_name.as_str())
            .map_err(derive_xlsx_error)?;
        let mut sheet_report = canvas.flush(worksheet)?;
        sheet_report.sheet_name = sheet_name;
        sheet_report.layout_key = layout_key;

        info!(
            "sheet {:?} written with layout {:?} ({} merges, {} images, {} warnings)",
            sheet_report.sheet_name,
            sheet_report.layout_key,
            sheet_report.merges.len(),
            sheet_report.images.len(),
            sheet_report.warnings.len()
        );
        self.report.sheets.push(sheet_report);
        let n_sheets = self.report.sheets.len();
        Ok(&self.report.sheets[n_sheets - 1])
    }

    /// Serialize the workbook into bytes.
    pub fn close(mut self) -> Result<(Vec<u8>, SpecXlsxReport), ExportError> {
        if self.report.sheets.is_empty() {
            self.write_placeholder()?;
        } else {
            debug!(
                "placeholder sheet {:?} dropped",
                self.template.placeholder.name
            );
        }
        let v_bytes = self
            .workbook
            .save_to_buffer()
            .map_err(derive_xlsx_error)?;
        Ok((v_bytes, self.report))
    }

    fn write_placeholder(&mut self) -> Result<(), ExportError> {
        let placeholder = &self.template.placeholder;
        let mut canvas = SheetCanvas::new(SpecCanvasContext {
            registry: &mut self.registry,
            fetcher: self.fetcher,
            cancel: &self.cancel,
            path_dir_temp: self.path_dir_temp.as_deref(),
        });
        canvas.seed_from_template(placeholder, u32::MAX)?;
        let worksheet = self.workbook.add_worksheet();
        worksheet
            .set_name(placeholder.name.as_str())
            .map_err(derive_xlsx_error)?;
        canvas.flush(worksheet)?;
        self.report
            .warn(format!("no sheets written; kept placeholder {:?}", placeholder.name));
        Ok(())
    }
}

/// Reject an empty sheet list before any workbook work.
pub fn validate_sheet_inputs(sheets: &[SpecSheetInput]) -> Result<(), ExportError> {
    if sheets.is_empty() {
        return Err(ExportError::Validation(
            "sheets must be a non-empty list".to_string(),
        ));
    }
    Ok(())
}

/// Open `path_template`, write `sheets` and return the serialized workbook.
pub fn export_xlsx(
    path_template: &Path,
    request_template_id: &str,
    sheets: &[SpecSheetInput],
    options: &SpecXlsxExportOptions,
    fetcher: &dyn AssetFetcher,
    cancel: &SpecCancelToken,
) -> Result<(Vec<u8>, SpecXlsxReport), ExportError> {
    validate_sheet_inputs(sheets)?;
    let template = SpecTemplateWorkbook::open(path_template)?;
    info!(
        "exporting {} sheets from template {}",
        sheets.len(),
        path_template.display()
    );

    let mut writer = XlsxWriter::new(template, fetcher, options.clone(), cancel.clone());
    writer.write_sheets(sheets, request_template_id)?;
    writer.close()
}
