//! Template workbook reading and standard template generation.
//!
//! Templates are read with `calamine`: sheet names plus the values and merged
//! regions of the placeholder (first) sheet. Styles and themes are not read.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, Xlsx, open_workbook};
use log::debug;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, FormatPattern, Workbook, Worksheet};

use crate::canvas::derive_xlsx_error;
use crate::conf::C_QUOTE_HEADER_FILL;
use crate::layout::quote::derive_quote_example_items;
use crate::spec::{EnumCellValue, ExportError, SpecCellAddress, SpecMergeRange};

/// Placeholder sheet content captured from a template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecTemplateSheet {
    /// Sheet name inside the template.
    pub name: String,
    /// Non-empty cell values.
    pub cells: BTreeMap<SpecCellAddress, EnumCellValue>,
    /// Merged regions spanning more than one cell.
    pub merges: Vec<SpecMergeRange>,
}

/// Opened template workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecTemplateWorkbook {
    /// Source path.
    pub path: PathBuf,
    /// All sheet names, in workbook order.
    pub sheet_names: Vec<String>,
    /// First sheet of the template; replaced by the generated sheets.
    pub placeholder: SpecTemplateSheet,
}

impl SpecTemplateWorkbook {
    /// Open and validate a template workbook.
    pub fn open(path: &Path) -> Result<Self, ExportError> {
        if !path.is_file() {
            return Err(ExportError::TemplateNotFound(path.to_path_buf()));
        }

        let mut workbook: Xlsx<_> = open_workbook(path).map_err(|err| {
            ExportError::OperationFailed(format!(
                "failed to open template {}: {err}",
                path.display()
            ))
        })?;
        workbook.load_merged_regions().map_err(|err| {
            ExportError::OperationFailed(format!(
                "failed to read merged regions of {}: {err}",
                path.display()
            ))
        })?;

        let sheet_names = workbook.sheet_names();
        let Some(name_placeholder) = sheet_names.first().cloned() else {
            return Err(ExportError::OperationFailed(format!(
                "template {} has no sheets",
                path.display()
            )));
        };

        let range = workbook.worksheet_range(&name_placeholder).map_err(|err| {
            ExportError::OperationFailed(format!(
                "failed to read sheet {name_placeholder:?} of {}: {err}",
                path.display()
            ))
        })?;
        let (n_row_start, n_col_start) = range.start().unwrap_or((0, 0));
        let mut cells = BTreeMap::new();
        for (n_row, n_col, data) in range.cells() {
            let Some(value) = convert_template_data(data) else {
                continue;
            };
            let addr = SpecCellAddress::new(
                n_row_start + n_row as u32 + 1,
                (n_col_start + n_col as u32 + 1) as u16,
            );
            cells.insert(addr, value);
        }

        let l_dims = match workbook.worksheet_merge_cells(&name_placeholder) {
            Some(Ok(l_dims)) => l_dims,
            Some(Err(err)) => {
                return Err(ExportError::OperationFailed(format!(
                    "failed to read merged cells of sheet {name_placeholder:?} in {}: {err}",
                    path.display()
                )));
            }
            None => Vec::new(),
        };
        let merges = l_dims
            .into_iter()
            .map(|dims| SpecMergeRange {
                start: SpecCellAddress::new(dims.start.0 + 1, (dims.start.1 + 1) as u16),
                end: SpecCellAddress::new(dims.end.0 + 1, (dims.end.1 + 1) as u16),
            })
            .filter(|range| range.start != range.end)
            .collect::<Vec<_>>();

        debug!(
            "opened template {} ({} sheets, {} placeholder cells, {} merges)",
            path.display(),
            sheet_names.len(),
            cells.len(),
            merges.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            sheet_names,
            placeholder: SpecTemplateSheet {
                name: name_placeholder,
                cells,
                merges,
            },
        })
    }
}

fn convert_template_data(data: &Data) -> Option<EnumCellValue> {
    match data {
        Data::Empty => None,
        Data::String(val) if val.is_empty() => None,
        Data::String(val) => Some(EnumCellValue::String(val.clone())),
        Data::Float(val) => Some(EnumCellValue::Number(*val)),
        Data::Int(val) => Some(EnumCellValue::Number(*val as f64)),
        Data::Bool(val) => Some(EnumCellValue::Boolean(*val)),
        other => Some(EnumCellValue::String(other.to_string())),
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region TemplateGeneration

/// Write a template holding one blank placeholder sheet.
pub fn write_blank_template(path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    workbook
        .add_worksheet()
        .set_name("Sheet1")
        .map_err(derive_xlsx_error)?;
    save_template(&mut workbook, path)
}

/// Write the standard quote template: company header, column headers on rows
/// 5-6 merged vertically, and an example body with totals.
pub fn write_quote_template(path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("报价单").map_err(derive_xlsx_error)?;
    fill_quote_template(worksheet)?;
    save_template(&mut workbook, path)
}

fn fill_quote_template(worksheet: &mut Worksheet) -> Result<(), ExportError> {
    let fmt_title = Format::new()
        .set_bold()
        .set_font_size(16)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    let fmt_header = Format::new()
        .set_bold()
        .set_font_size(12)
        .set_pattern(FormatPattern::Solid)
        .set_background_color(C_QUOTE_HEADER_FILL)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
        .set_border_color("#000000");
    let fmt_data = Format::new()
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Thin)
        .set_border_color("#000000");
    let fmt_amount = fmt_data.clone().set_align(FormatAlign::Right);

    worksheet
        .set_column_range_width(0, 9, 15)
        .and_then(|ws| ws.set_column_width(1, 8))
        .and_then(|ws| ws.set_column_width(3, 20))
        .map_err(derive_xlsx_error)?;

    worksheet
        .merge_range(0, 0, 0, 9, "稻壳科技有限公司", &fmt_title)
        .and_then(|ws| ws.merge_range(1, 0, 1, 9, "报价单", &fmt_title))
        .and_then(|ws| ws.write_string(2, 0, "公司地址：XXXX稻壳科技有限公司"))
        .and_then(|ws| ws.write_string(2, 4, "联系电话：0000-0000-0000"))
        .and_then(|ws| ws.write_string(2, 6, "地址：XXXX常州路15号"))
        .and_then(|ws| {
            ws.write_string(3, 0, "报价说明：此为报价单说明，如有疑问，联系相关负责人！")
        })
        .map_err(derive_xlsx_error)?;

    let l_headers = [
        "品名", "产品图片", "规格", "材质说明", "颜色", "数量", "单价", "总价", "备注",
    ];
    for (n_col, c_header) in l_headers.iter().enumerate() {
        let n_col = n_col as u16;
        worksheet
            .merge_range(4, n_col, 5, n_col, c_header, &fmt_header)
            .map_err(derive_xlsx_error)?;
    }

    let l_items = derive_quote_example_items();
    let mut n_total = 0.0;
    for (n_idx, item) in l_items.iter().enumerate() {
        let n_row = 6 + n_idx as u32;
        for n_col in 0..9u16 {
            let format = if (6..=7).contains(&n_col) {
                &fmt_amount
            } else {
                &fmt_data
            };
            worksheet
                .write_blank(n_row, n_col, format)
                .map_err(derive_xlsx_error)?;
        }
        write_template_value(worksheet, n_row, 0, &item.product_name, &fmt_data)?;
        write_template_value(worksheet, n_row, 2, &item.specification, &fmt_data)?;
        write_template_value(worksheet, n_row, 3, &item.material, &fmt_data)?;
        write_template_value(worksheet, n_row, 4, &item.color, &fmt_data)?;
        write_template_value(worksheet, n_row, 5, &item.quantity, &fmt_data)?;
        write_template_value(worksheet, n_row, 6, &item.unit_price, &fmt_amount)?;
        write_template_value(worksheet, n_row, 7, &item.total_price, &fmt_amount)?;
        write_template_value(worksheet, n_row, 8, &item.remark, &fmt_data)?;
        n_total += item.total_price.as_number().unwrap_or(0.0);
    }

    let n_row_total = 6 + l_items.len() as u32;
    let n_row_discount = n_row_total + 1;
    worksheet
        .merge_range(n_row_total, 0, n_row_total, 3, "合计（金额大写）：", &fmt_data)
        .and_then(|ws| {
            ws.merge_range(
                n_row_total,
                4,
                n_row_total,
                6,
                &crate::util::derive_rmb_uppercase(n_total),
                &fmt_data,
            )
        })
        .and_then(|ws| ws.write_string_with_format(n_row_total, 7, "小计：", &fmt_amount))
        .and_then(|ws| ws.write_number_with_format(n_row_total, 8, n_total, &fmt_amount))
        .and_then(|ws| {
            ws.merge_range(
                n_row_discount,
                0,
                n_row_discount,
                6,
                "此价格含运输，安装，增值税发票",
                &fmt_data,
            )
        })
        .and_then(|ws| ws.write_string_with_format(n_row_discount, 7, "优惠价：", &fmt_amount))
        .and_then(|ws| {
            ws.write_number_with_format(
                n_row_discount,
                8,
                n_total * crate::conf::N_QUOTE_DISCOUNT_RATE,
                &fmt_amount,
            )
        })
        .map_err(derive_xlsx_error)?;

    let n_row_company = n_row_discount + 3;
    worksheet
        .write_string(n_row_company, 0, "报价单位（盖章）：")
        .and_then(|ws| ws.write_string(n_row_company, 5, "询价单位（盖章）："))
        .and_then(|ws| ws.write_string(n_row_company + 1, 0, "报价单位（签名）："))
        .and_then(|ws| ws.write_string(n_row_company + 1, 5, "询价单位（签名）："))
        .map_err(derive_xlsx_error)?;

    Ok(())
}

fn write_template_value(
    worksheet: &mut Worksheet,
    n_row: u32,
    n_col: u16,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), ExportError> {
    match value {
        EnumCellValue::String(val) => worksheet
            .write_string_with_format(n_row, n_col, val, format)
            .map(|_| ()),
        EnumCellValue::Number(val) => worksheet
            .write_number_with_format(n_row, n_col, *val, format)
            .map(|_| ()),
        _ => Ok(()),
    }
    .map_err(derive_xlsx_error)
}

fn save_template(workbook: &mut Workbook, path: &Path) -> Result<(), ExportError> {
    if let Some(path_dir) = path.parent()
        && !path_dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(path_dir).map_err(|err| {
            ExportError::OperationFailed(format!("creating {}: {err}", path_dir.display()))
        })?;
    }
    workbook.save(path).map_err(derive_xlsx_error)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_template_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = SpecTemplateWorkbook::open(&dir.path().join("nope.xlsx")).expect_err("missing");
        assert!(matches!(err, ExportError::TemplateNotFound(_)));
    }

    #[test]
    fn test_non_workbook_template_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip").expect("write");
        let err = SpecTemplateWorkbook::open(&path).expect_err("broken");
        assert!(matches!(err, ExportError::OperationFailed(_)));
    }

    fn write_raw_workbook(path: &Path, c_sheet_xml: &str) {
        use std::io::Write;

        const C_NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
        const C_NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
        const C_NS_PKG: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
        let l_parts = [
            (
                "[Content_Types].xml".to_string(),
                "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
                 <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
                 <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
                 <Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
                 <Override PartName=\"/xl/worksheets/sheet1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>\
                 </Types>"
                    .to_string(),
            ),
            (
                "_rels/.rels".to_string(),
                format!(
                    "<Relationships xmlns=\"{C_NS_PKG}\"><Relationship Id=\"rId1\" \
                     Type=\"{C_NS_REL}/officeDocument\" Target=\"xl/workbook.xml\"/></Relationships>"
                ),
            ),
            (
                "xl/workbook.xml".to_string(),
                format!(
                    "<workbook xmlns=\"{C_NS_MAIN}\" xmlns:r=\"{C_NS_REL}\"><sheets>\
                     <sheet name=\"Sheet1\" sheetId=\"1\" r:id=\"rId1\"/></sheets></workbook>"
                ),
            ),
            (
                "xl/_rels/workbook.xml.rels".to_string(),
                format!(
                    "<Relationships xmlns=\"{C_NS_PKG}\"><Relationship Id=\"rId1\" \
                     Type=\"{C_NS_REL}/worksheet\" Target=\"worksheets/sheet1.xml\"/></Relationships>"
                ),
            ),
            (
                "xl/worksheets/sheet1.xml".to_string(),
                format!("<worksheet xmlns=\"{C_NS_MAIN}\">{c_sheet_xml}</worksheet>"),
            ),
        ];

        let file = std::fs::File::create(path).expect("create");
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (c_name, c_body) in &l_parts {
            writer.start_file(c_name.as_str(), options).expect("start");
            writer.write_all(c_body.as_bytes()).expect("body");
        }
        writer.finish().expect("finish");
    }

    #[test]
    fn test_unreadable_merge_regions_fail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad_merge.xlsx");
        write_raw_workbook(
            &path,
            "<sheetData><row r=\"1\"><c r=\"A1\" t=\"inlineStr\"><is><t>报价单</t></is></c></row>\
             </sheetData><mergeCells count=\"1\"><mergeCell ref=\"A1:!!\"/></mergeCells>",
        );
        let err = SpecTemplateWorkbook::open(&path).expect_err("bad merge");
        assert!(matches!(err, ExportError::OperationFailed(_)));
    }

    #[test]
    fn test_blank_template_has_single_placeholder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("excel/default.xlsx");
        write_blank_template(&path).expect("write");

        let template = SpecTemplateWorkbook::open(&path).expect("open");
        assert_eq!(template.sheet_names, vec!["Sheet1".to_string()]);
        assert_eq!(template.placeholder.name, "Sheet1");
        assert!(template.placeholder.cells.is_empty());
    }

    #[test]
    fn test_quote_template_header_is_readable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("quote.xlsx");
        write_quote_template(&path).expect("write");

        let template = SpecTemplateWorkbook::open(&path).expect("open");
        let placeholder = &template.placeholder;
        assert_eq!(placeholder.name, "报价单");
        assert_eq!(
            placeholder.cells.get(&SpecCellAddress::new(2, 1)),
            Some(&EnumCellValue::from("报价单"))
        );
        assert_eq!(
            placeholder.cells.get(&SpecCellAddress::new(5, 8)),
            Some(&EnumCellValue::from("总价"))
        );
        assert!(placeholder.merges.contains(&SpecMergeRange {
            start: SpecCellAddress::new(1, 1),
            end: SpecCellAddress::new(1, 10),
        }));
        assert!(placeholder.merges.contains(&SpecMergeRange {
            start: SpecCellAddress::new(5, 9),
            end: SpecCellAddress::new(6, 9),
        }));
    }
}
