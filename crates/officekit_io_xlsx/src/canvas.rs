//! Buffered per-sheet model that layouts write into.
//!
//! Layouts address cells with `A1` references, set values and styles
//! independently (a style applied to a range keeps existing values), declare
//! merges and images, and the canvas flushes everything into a
//! `rust_xlsxwriter::Worksheet` in one pass.

use std::collections::BTreeMap;
use std::path::Path;

use log::warn;
use rust_xlsxwriter::{Format, Image, Worksheet, XlsxError};

use crate::fetch::{AssetFetcher, load_remote_image};
use crate::spec::{
    EnumCellValue, ExportError, SpecCancelToken, SpecCellAddress, SpecCellFormat,
    SpecEmbeddedImage, SpecMergeRange, SpecRichTextSegment, SpecSheetReport,
};
use crate::style::{StyleHandle, StyleRegistry};
use crate::template::SpecTemplateSheet;
use crate::util::{parse_cell_address, parse_merge_range};

/// Placement of one remote image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecImagePlacement {
    /// Horizontal scale factor.
    pub scale_x: f64,
    /// Vertical scale factor.
    pub scale_y: f64,
    /// Horizontal offset in pixels from the anchor cell.
    pub offset_x: u32,
    /// Vertical offset in pixels from the anchor cell.
    pub offset_y: u32,
}

impl SpecImagePlacement {
    pub fn scaled(scale_x: f64, scale_y: f64) -> Self {
        Self {
            scale_x,
            scale_y,
            offset_x: 0,
            offset_y: 0,
        }
    }

    pub fn with_offset(mut self, offset_x: u32, offset_y: u32) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }
}

#[derive(Debug, Clone, Default)]
struct SpecCanvasCell {
    value: EnumCellValue,
    fmt: Option<SpecCellFormat>,
    style: Option<StyleHandle>,
}

struct SpecPlacedImage {
    anchor: SpecCellAddress,
    image: Image,
    offset_x: u32,
    offset_y: u32,
}

/// Collaborators shared by every canvas of one workbook.
pub struct SpecCanvasContext<'a> {
    /// Workbook style registry.
    pub registry: &'a mut StyleRegistry,
    /// Remote image source.
    pub fetcher: &'a dyn AssetFetcher,
    /// Caller cancellation.
    pub cancel: &'a SpecCancelToken,
    /// Directory for staged images; system temp dir when `None`.
    pub path_dir_temp: Option<&'a Path>,
}

/// In-memory sheet buffer.
pub struct SheetCanvas<'a> {
    ctx: SpecCanvasContext<'a>,
    dict_cells: BTreeMap<SpecCellAddress, SpecCanvasCell>,
    l_merges: Vec<SpecMergeRange>,
    dict_col_widths: BTreeMap<u16, f64>,
    dict_row_heights: BTreeMap<u32, f64>,
    l_images: Vec<SpecPlacedImage>,
    report: SpecSheetReport,
}

impl<'a> SheetCanvas<'a> {
    pub fn new(ctx: SpecCanvasContext<'a>) -> Self {
        Self {
            ctx,
            dict_cells: BTreeMap::new(),
            l_merges: Vec::new(),
            dict_col_widths: BTreeMap::new(),
            dict_row_heights: BTreeMap::new(),
            l_images: Vec::new(),
            report: SpecSheetReport::default(),
        }
    }

    ////////////////////////////////////////////////////////////////////////////
    // #region CellWrites

    /// Set the value of one cell, keeping its style.
    pub fn set_value(
        &mut self,
        cell: &str,
        value: impl Into<EnumCellValue>,
    ) -> Result<(), ExportError> {
        let addr = parse_cell_address(cell)?;
        let value = value.into();
        if let EnumCellValue::Formula(c_formula) = &value {
            self.report
                .formulas
                .push((addr.to_string(), c_formula.clone()));
        }
        if let EnumCellValue::RichText(l_segments) = &value {
            for segment in l_segments {
                self.ctx.registry.get(&segment.format.font_only())?;
            }
        }
        self.dict_cells.entry(addr).or_default().value = value;
        Ok(())
    }

    /// Set a formula (no leading `=`).
    pub fn set_formula(&mut self, cell: &str, formula: &str) -> Result<(), ExportError> {
        let c_formula = formula.trim_start_matches('=').to_string();
        self.set_value(cell, EnumCellValue::Formula(c_formula))
    }

    /// Set ordered rich text runs.
    pub fn set_rich_text(
        &mut self,
        cell: &str,
        segments: Vec<SpecRichTextSegment>,
    ) -> Result<(), ExportError> {
        self.set_value(cell, EnumCellValue::RichText(segments))
    }

    /// Apply `fmt` to every cell of the inclusive rectangle `cell_from:cell_to`.
    pub fn set_style(
        &mut self,
        cell_from: &str,
        cell_to: &str,
        fmt: &SpecCellFormat,
    ) -> Result<(), ExportError> {
        let addr_from = parse_cell_address(cell_from)?;
        let addr_to = parse_cell_address(cell_to)?;
        let handle = self.ctx.registry.get(fmt)?;

        let (n_row_lo, n_row_hi) = (
            addr_from.row.min(addr_to.row),
            addr_from.row.max(addr_to.row),
        );
        let (n_col_lo, n_col_hi) = (
            addr_from.col.min(addr_to.col),
            addr_from.col.max(addr_to.col),
        );
        for n_row in n_row_lo..=n_row_hi {
            for n_col in n_col_lo..=n_col_hi {
                let cell = self
                    .dict_cells
                    .entry(SpecCellAddress::new(n_row, n_col))
                    .or_default();
                cell.fmt = Some(fmt.clone());
                cell.style = Some(handle);
            }
        }
        Ok(())
    }

    /// Set value and style of one cell.
    pub fn write(
        &mut self,
        cell: &str,
        value: impl Into<EnumCellValue>,
        fmt: &SpecCellFormat,
    ) -> Result<(), ExportError> {
        self.set_value(cell, value)?;
        self.set_style(cell, cell, fmt)
    }

    /// Merge an `A1:B2` range; rejects inverted, single-cell and overlapping ranges.
    pub fn merge(&mut self, range: &str) -> Result<(), ExportError> {
        let range = parse_merge_range(range)?;
        if let Some(other) = self.l_merges.iter().find(|other| other.overlaps(&range)) {
            return Err(ExportError::OperationFailed(format!(
                "merge range {range} overlaps {other}"
            )));
        }
        self.l_merges.push(range);
        self.report.merges.push(range);
        Ok(())
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region Geometry

    /// Set the width of every column from `col_from` to `col_to` (letters).
    pub fn set_column_width(
        &mut self,
        col_from: &str,
        col_to: &str,
        width: f64,
    ) -> Result<(), ExportError> {
        let n_col_from = parse_cell_address(&format!("{col_from}1"))?.col;
        let n_col_to = parse_cell_address(&format!("{col_to}1"))?.col;
        for n_col in n_col_from.min(n_col_to)..=n_col_from.max(n_col_to) {
            self.dict_col_widths.insert(n_col, width);
        }
        Ok(())
    }

    /// Set the height of a 1-based row.
    pub fn set_row_height(&mut self, row: u32, height: f64) -> Result<(), ExportError> {
        if row == 0 {
            return Err(ExportError::OperationFailed(
                "row numbers start at 1".to_string(),
            ));
        }
        self.dict_row_heights.insert(row, height);
        Ok(())
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region Images

    /// Fetch `url` and anchor it at `cell`.
    ///
    /// Fetch and decode failures are logged and recorded as sheet warnings;
    /// they never fail the layout. Returns whether the image was placed.
    pub fn insert_image_from_url(
        &mut self,
        cell: &str,
        url: &str,
        placement: SpecImagePlacement,
    ) -> Result<bool, ExportError> {
        let anchor = parse_cell_address(cell)?;
        let res_image = load_remote_image(
            self.ctx.fetcher,
            url,
            self.ctx.cancel,
            self.ctx.path_dir_temp,
        );
        let image = match res_image {
            Ok(image) => image,
            Err(err) => {
                warn!("image at {anchor} skipped: {err}");
                self.report.warn(format!("image at {anchor} skipped: {err}"));
                return Ok(false);
            }
        };

        let image = image
            .set_scale_width(placement.scale_x)
            .set_scale_height(placement.scale_y);
        self.l_images.push(SpecPlacedImage {
            anchor,
            image,
            offset_x: placement.offset_x,
            offset_y: placement.offset_y,
        });
        self.report.images.push(SpecEmbeddedImage {
            anchor: anchor.to_string(),
            url: url.to_string(),
        });
        Ok(true)
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region TemplateSeed

    /// Copy template values and merges that lie entirely within rows `1..=n_row_last`.
    pub fn seed_from_template(
        &mut self,
        template: &SpecTemplateSheet,
        n_row_last: u32,
    ) -> Result<(), ExportError> {
        for (addr, value) in &template.cells {
            if addr.row <= n_row_last {
                self.dict_cells.entry(*addr).or_default().value = value.clone();
            }
        }
        for range in &template.merges {
            if range.end.row <= n_row_last {
                self.merge(&range.to_string())?;
            }
        }
        Ok(())
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region Inspection

    /// Current value of one cell.
    pub fn value(&self, cell: &str) -> Option<&EnumCellValue> {
        let addr = parse_cell_address(cell).ok()?;
        self.dict_cells.get(&addr).map(|cell| &cell.value)
    }

    /// Current style descriptor of one cell.
    pub fn style(&self, cell: &str) -> Option<&SpecCellFormat> {
        let addr = parse_cell_address(cell).ok()?;
        self.dict_cells.get(&addr).and_then(|cell| cell.fmt.as_ref())
    }

    /// Highest row holding a value or style.
    pub fn last_row(&self) -> u32 {
        self.dict_cells.keys().map(|addr| addr.row).max().unwrap_or(0)
    }

    pub fn column_width(&self, col: &str) -> Option<f64> {
        let n_col = parse_cell_address(&format!("{col}1")).ok()?.col;
        self.dict_col_widths.get(&n_col).copied()
    }

    pub fn row_height(&self, row: u32) -> Option<f64> {
        self.dict_row_heights.get(&row).copied()
    }

    /// Mutable sheet report (layouts add warnings and flags).
    pub fn report_mut(&mut self) -> &mut SpecSheetReport {
        &mut self.report
    }

    pub fn report(&self) -> &SpecSheetReport {
        &self.report
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region Flush

    /// Write the buffered sheet into `worksheet` and return the sheet report.
    pub fn flush(self, worksheet: &mut Worksheet) -> Result<SpecSheetReport, ExportError> {
        let SheetCanvas {
            ctx,
            dict_cells,
            l_merges,
            dict_col_widths,
            dict_row_heights,
            l_images,
            report,
        } = self;
        let registry = ctx.registry;
        let fmt_default = Format::new();

        for (n_col, n_width) in &dict_col_widths {
            worksheet
                .set_column_width(n_col.saturating_sub(1), *n_width)
                .map_err(derive_xlsx_error)?;
        }
        for (n_row, n_height) in &dict_row_heights {
            worksheet
                .set_row_height(n_row.saturating_sub(1), *n_height)
                .map_err(derive_xlsx_error)?;
        }

        for range in &l_merges {
            let format = dict_cells
                .get(&range.start)
                .and_then(|cell| cell.style)
                .and_then(|handle| registry.format(handle))
                .unwrap_or(&fmt_default);
            let (n_row_start, n_col_start) = range.start.to_zero_based();
            let (n_row_end, n_col_end) = range.end.to_zero_based();
            worksheet
                .merge_range(n_row_start, n_col_start, n_row_end, n_col_end, "", format)
                .map_err(derive_xlsx_error)?;
        }

        for (addr, cell) in &dict_cells {
            write_canvas_cell(worksheet, registry, *addr, cell, &fmt_default)?;
        }

        for placed in &l_images {
            let (n_row, n_col) = placed.anchor.to_zero_based();
            worksheet
                .insert_image_with_offset(
                    n_row,
                    n_col,
                    &placed.image,
                    placed.offset_x,
                    placed.offset_y,
                )
                .map_err(derive_xlsx_error)?;
        }

        Ok(report)
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
}

fn write_canvas_cell(
    worksheet: &mut Worksheet,
    registry: &mut StyleRegistry,
    addr: SpecCellAddress,
    cell: &SpecCanvasCell,
    fmt_default: &Format,
) -> Result<(), ExportError> {
    let (n_row, n_col) = addr.to_zero_based();
    let format = match cell.style {
        Some(handle) => registry.format(handle).cloned().unwrap_or_default(),
        None => fmt_default.clone(),
    };

    match &cell.value {
        EnumCellValue::None => {
            if cell.style.is_some() {
                worksheet
                    .write_blank(n_row, n_col, &format)
                    .map_err(derive_xlsx_error)?;
            }
        }
        EnumCellValue::String(val) => {
            worksheet
                .write_string_with_format(n_row, n_col, val, &format)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::Number(val) => {
            worksheet
                .write_number_with_format(n_row, n_col, *val, &format)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet
                .write_boolean_with_format(n_row, n_col, *val, &format)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::Formula(val) => {
            worksheet
                .write_formula_with_format(n_row, n_col, val.as_str(), &format)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::RichText(l_segments) => {
            let l_segments: Vec<&SpecRichTextSegment> = l_segments
                .iter()
                .filter(|segment| !segment.text.is_empty())
                .collect();
            match l_segments.as_slice() {
                [] => {
                    worksheet
                        .write_blank(n_row, n_col, &format)
                        .map_err(derive_xlsx_error)?;
                }
                [segment] => {
                    let fmt_cell = cell.fmt.clone().unwrap_or_default();
                    let handle = registry.get(&fmt_cell.merge(&segment.format.font_only()))?;
                    let format = registry.format(handle).cloned().unwrap_or_default();
                    worksheet
                        .write_string_with_format(n_row, n_col, &segment.text, &format)
                        .map_err(derive_xlsx_error)?;
                }
                _ => {
                    let mut l_formats = Vec::with_capacity(l_segments.len());
                    for segment in &l_segments {
                        let handle = registry.get(&segment.format.font_only())?;
                        l_formats.push(registry.format(handle).cloned().unwrap_or_default());
                    }
                    let l_runs: Vec<(&Format, &str)> = l_formats
                        .iter()
                        .zip(l_segments.iter())
                        .map(|(format, segment)| (format, segment.text.as_str()))
                        .collect();
                    worksheet
                        .write_rich_string_with_format(n_row, n_col, &l_runs, &format)
                        .map_err(derive_xlsx_error)?;
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn derive_xlsx_error(err: XlsxError) -> ExportError {
    ExportError::OperationFailed(format!("xlsx write error: {err}"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::conf::derive_style_preset;
    use crate::fetch::tests::StubAssetFetcher;

    /// Run `f` against a fresh canvas backed by the stub fetcher.
    pub(crate) fn with_canvas<T>(f: impl FnOnce(&mut SheetCanvas<'_>) -> T) -> T {
        let mut registry = StyleRegistry::new();
        let cancel = SpecCancelToken::new();
        let dir = tempfile::tempdir().expect("tempdir");
        let mut canvas = SheetCanvas::new(SpecCanvasContext {
            registry: &mut registry,
            fetcher: &StubAssetFetcher,
            cancel: &cancel,
            path_dir_temp: Some(dir.path()),
        });
        f(&mut canvas)
    }

    #[test]
    fn test_style_range_keeps_values() {
        with_canvas(|canvas| {
            canvas.set_value("B2", "品牌").expect("value");
            canvas
                .set_style("A1", "C3", &derive_style_preset("data"))
                .expect("style");
            assert_eq!(canvas.value("B2"), Some(&EnumCellValue::from("品牌")));
            assert_eq!(canvas.style("C3"), Some(&derive_style_preset("data")));
            assert_eq!(canvas.value("A1"), Some(&EnumCellValue::None));
            assert_eq!(canvas.last_row(), 3);
        });
    }

    #[test]
    fn test_merge_rejects_overlap_and_inversion() {
        with_canvas(|canvas| {
            canvas.merge("A1:H1").expect("first merge");
            assert!(canvas.merge("D1:E2").is_err());
            assert!(canvas.merge("H3:A3").is_err());
            assert!(canvas.merge("C5:C5").is_err());
            canvas.merge("A2:D2").expect("disjoint merge");
            assert_eq!(canvas.report().merges.len(), 2);
        });
    }

    #[test]
    fn test_formula_is_recorded_without_equals() {
        with_canvas(|canvas| {
            canvas.set_formula("H8", "=SUM(H6:H7)").expect("formula");
            assert_eq!(
                canvas.report().formulas,
                vec![("H8".to_string(), "SUM(H6:H7)".to_string())]
            );
        });
    }

    #[test]
    fn test_failed_image_is_a_warning() {
        with_canvas(|canvas| {
            let if_placed = canvas
                .insert_image_from_url(
                    "A1",
                    "https://missing.example.com/logo.png",
                    SpecImagePlacement::scaled(0.2, 0.1),
                )
                .expect("never fatal");
            assert!(!if_placed);
            assert!(canvas.report().images.is_empty());
            assert_eq!(canvas.report().warnings.len(), 1);

            let if_placed = canvas
                .insert_image_from_url(
                    "G2",
                    "https://ok.example.com/plan.png",
                    SpecImagePlacement::scaled(0.3, 0.125).with_offset(26, 6),
                )
                .expect("placed");
            assert!(if_placed);
            assert_eq!(canvas.report().images[0].anchor, "G2");
        });
    }

    #[test]
    fn test_flush_writes_worksheet() {
        let mut registry = StyleRegistry::new();
        let cancel = SpecCancelToken::new();
        let mut canvas = SheetCanvas::new(SpecCanvasContext {
            registry: &mut registry,
            fetcher: &StubAssetFetcher,
            cancel: &cancel,
            path_dir_temp: None,
        });
        let fmt_bold = derive_style_preset("label");
        canvas.merge("A1:D1").expect("merge");
        canvas
            .write("A1", "简单报表", &derive_style_preset("title"))
            .expect("title");
        canvas
            .set_rich_text(
                "A2",
                vec![
                    SpecRichTextSegment::new("项目名称：", fmt_bold.clone()),
                    SpecRichTextSegment::new("", SpecCellFormat::default()),
                ],
            )
            .expect("rich");
        canvas.set_column_width("A", "D", 20.0).expect("width");
        canvas.set_row_height(1, 42.0).expect("height");

        let mut worksheet = Worksheet::new();
        let report = canvas.flush(&mut worksheet).expect("flush");
        assert_eq!(report.merges.len(), 1);
    }
}
