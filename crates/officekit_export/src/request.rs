//! Request schema boundary: untyped JSON `data` into typed export inputs.
//!
//! The envelope is strict (`data.sheets` must be a non-empty list); entries,
//! rows and blocks inside it are lenient and skipped with a warning when
//! malformed.

use log::warn;
use serde_json::{Map, Value};

use officekit_io_pdf::{EnumPdfBlock, SpecPdfDocument, SpecPdfTable, SpecPdfTableCell};
use officekit_io_xlsx::conf::C_SHEET_NAME_PREFIX;
use officekit_io_xlsx::{EnumCellValue, ExportError, SpecSheetAux, SpecSheetInput, TypeItemRow};

type TypeJsonObject = Map<String, Value>;

////////////////////////////////////////////////////////////////////////////////
// #region SheetParsing

/// Decode `data.sheets` into sheet inputs.
///
/// A blank or missing `name` becomes `Sheet<N>` where `N` is the 1-based
/// position in the request list, skipped entries included.
pub fn parse_sheet_inputs(data: &Value) -> Result<Vec<SpecSheetInput>, ExportError> {
    let l_sheets = data
        .get("sheets")
        .and_then(Value::as_array)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| {
            ExportError::Validation("data.sheets must be a non-empty array".to_string())
        })?;

    let mut l_inputs = Vec::with_capacity(l_sheets.len());
    for (idx, v_sheet) in l_sheets.iter().enumerate() {
        let Some(dict_sheet) = v_sheet.as_object() else {
            warn!("sheet entry {} is not an object; skipped", idx + 1);
            continue;
        };
        l_inputs.push(parse_sheet_input(idx, dict_sheet));
    }
    if l_inputs.is_empty() {
        return Err(ExportError::Validation(
            "data.sheets holds no object entries".to_string(),
        ));
    }
    Ok(l_inputs)
}

fn parse_sheet_input(idx: usize, dict_sheet: &TypeJsonObject) -> SpecSheetInput {
    let name = derive_text_field(dict_sheet, "name")
        .unwrap_or_else(|| format!("{C_SHEET_NAME_PREFIX}{}", idx + 1));
    let items = dict_sheet.get("items").and_then(Value::as_array).map(|l_rows| {
        l_rows
            .iter()
            .enumerate()
            .filter_map(|(n_row, v_row)| match v_row.as_object() {
                Some(dict_row) => Some(convert_item_row(dict_row)),
                None => {
                    warn!("sheet {name:?}: item {} is not an object; skipped", n_row + 1);
                    None
                }
            })
            .collect::<Vec<_>>()
    });

    SpecSheetInput {
        name: Some(name),
        template_id: derive_text_field(dict_sheet, "template_id"),
        items,
        aux: parse_sheet_aux(dict_sheet),
    }
}

fn parse_sheet_aux(dict_sheet: &TypeJsonObject) -> SpecSheetAux {
    let field = |key: &str| derive_text_field(dict_sheet, key);
    SpecSheetAux {
        logo_url: field("logoUrl"),
        floor_plan_url: field("floorPlanUrl"),
        cover_logo_url: field("coverLogoUrl"),
        project_name: field("projectName"),
        project_address: field("projectAddress"),
        project_content: field("projectContent"),
        approver: field("approver"),
        reviewer: field("reviewer"),
        designer: field("designer"),
        date: field("date"),
        contact: field("contact"),
        phone: field("phone"),
        wechat: field("wechat"),
    }
}

/// Normalize one JSON row into cell values.
pub fn convert_item_row(dict_row: &TypeJsonObject) -> TypeItemRow {
    dict_row
        .iter()
        .map(|(key, v)| (key.clone(), convert_json_value(v)))
        .collect()
}

fn convert_json_value(value: &Value) -> EnumCellValue {
    match value {
        Value::Null => EnumCellValue::None,
        Value::Bool(b) => EnumCellValue::Boolean(*b),
        Value::Number(n) => n
            .as_f64()
            .map(EnumCellValue::Number)
            .unwrap_or_else(|| EnumCellValue::String(n.to_string())),
        Value::String(s) => EnumCellValue::String(s.clone()),
        other => EnumCellValue::String(other.to_string()),
    }
}

/// Non-blank string field.
fn derive_text_field(dict: &TypeJsonObject, key: &str) -> Option<String> {
    dict.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(ToString::to_string)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PdfParsing

/// Decode `data.title` and `data.content` into a PDF document.
pub fn parse_pdf_document(data: &Value) -> Result<SpecPdfDocument, ExportError> {
    let dict_data = data
        .as_object()
        .ok_or_else(|| ExportError::Validation("data must be an object".to_string()))?;
    let title = derive_text_field(dict_data, "title");

    let mut l_blocks = Vec::new();
    if let Some(l_content) = dict_data.get("content").and_then(Value::as_array) {
        for (idx, v_block) in l_content.iter().enumerate() {
            match parse_pdf_block(v_block) {
                Some(block) => l_blocks.push(block),
                None => warn!("content block {} is malformed; skipped", idx + 1),
            }
        }
    }
    Ok(SpecPdfDocument {
        title,
        blocks: l_blocks,
    })
}

fn parse_pdf_block(value: &Value) -> Option<EnumPdfBlock> {
    let dict_block = value.as_object()?;
    match dict_block.get("type").and_then(Value::as_str)? {
        "paragraph" => Some(EnumPdfBlock::Paragraph {
            text: dict_block
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            bold: derive_flag(dict_block, "bold"),
            italic: derive_flag(dict_block, "italic"),
            font_size: dict_block
                .get("font_size")
                .and_then(Value::as_f64)
                .map(|n| n as f32),
        }),
        "table" => parse_pdf_table(dict_block.get("data")?.as_object()?).map(EnumPdfBlock::Table),
        "image" => Some(EnumPdfBlock::Image {
            path: dict_block
                .get("path")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        _ => None,
    }
}

fn parse_pdf_table(dict_table: &TypeJsonObject) -> Option<SpecPdfTable> {
    let headers = parse_pdf_rows(dict_table.get("headers")?.as_array()?);
    let rows = parse_pdf_rows(dict_table.get("rows")?.as_array()?);
    let col_widths = dict_table
        .get("col_widths")
        .and_then(Value::as_array)
        .map(|l| {
            l.iter()
                .filter_map(Value::as_f64)
                .map(|n| n as f32)
                .collect::<Vec<_>>()
        });
    Some(SpecPdfTable {
        headers,
        rows,
        col_widths,
    })
}

fn parse_pdf_rows(l_rows: &[Value]) -> Vec<Vec<SpecPdfTableCell>> {
    l_rows
        .iter()
        .filter_map(Value::as_array)
        .map(|l_cells| {
            l_cells
                .iter()
                .filter_map(Value::as_object)
                .map(|dict_cell| {
                    let text = dict_cell
                        .get("text")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    let n_span = dict_cell
                        .get("col_span")
                        .and_then(Value::as_f64)
                        .filter(|n| n.is_finite() && *n >= 1.0)
                        .map_or(1, |n| n as usize);
                    SpecPdfTableCell::new(text).with_col_span(n_span)
                })
                .collect()
        })
        .collect()
}

fn derive_flag(dict: &TypeJsonObject, key: &str) -> bool {
    dict.get(key).and_then(Value::as_bool).unwrap_or(false)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
