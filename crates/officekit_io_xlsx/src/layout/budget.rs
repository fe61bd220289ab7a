//! Budget summary layout (also the `default` layout).
//!
//! Fixed header block on rows 1-5, one row per item from row 6, then a totals
//! row carrying a `SUM` formula, the amount in words and a reminder row.

use log::debug;

use crate::canvas::{SheetCanvas, SpecImagePlacement};
use crate::conf::{C_FONT_FAMILY_DEFAULT, N_ROW_BUDGET_ITEMS_START, derive_style_preset};
use crate::layout::{LayoutStrategy, SpecLayoutInput, derive_field, derive_layout_items};
use crate::spec::{
    EnumCellValue, ExportError, SpecCellFormat, SpecRichTextSegment, TypeItemRow,
};
use crate::util::derive_rmb_uppercase;

const C_BUDGET_TITLE: &str = "全屋智能家居方案A套餐预算汇总表";
const C_BUDGET_REMINDER: &str = "1、该报价为根据报价需求提供的方案报价，实际成交价以签约合同为准。 2、报价单仅供预算参考，具体内容以实际签订的合同为准。";

/// House types of the checklist in C4 and whether each one is ticked.
const TUP_HOUSE_TYPES: [(&str, bool); 12] = [
    ("别墅", false),
    ("大平层", false),
    ("户型房", true),
    ("商铺", false),
    ("办公室", false),
    ("展厅", false),
    ("超市", false),
    ("商场", false),
    ("客房", false),
    ("公寓", false),
    ("民宿", false),
    ("其他", false),
];

const TUP_BUDGET_COL_WIDTHS: [(&str, f64); 8] = [
    ("A", 8.0),
    ("B", 15.0),
    ("C", 15.0),
    ("D", 80.0),
    ("E", 10.0),
    ("F", 10.0),
    ("G", 15.0),
    ("H", 15.0),
];

const TUP_BUDGET_HEADERS: [(&str, &str); 8] = [
    ("A5", "序号"),
    ("B5", "品牌"),
    ("C5", "区域"),
    ("D5", "系统说明"),
    ("E5", "单位"),
    ("F5", "工程量"),
    ("G5", "预算价（元）"),
    ("H5", "单项预算合价（元）"),
];

/// One decoded budget row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecBudgetItem {
    /// `序号`
    pub index: EnumCellValue,
    /// `品牌`
    pub brand: EnumCellValue,
    /// `区域`
    pub area: EnumCellValue,
    /// `系统说明`
    pub description: EnumCellValue,
    /// `单位`
    pub unit: EnumCellValue,
    /// `工程量`
    pub quantity: EnumCellValue,
    /// `预算价`
    pub unit_price: EnumCellValue,
    /// `单项预算合价`
    pub total_price: EnumCellValue,
}

impl SpecBudgetItem {
    pub fn from_row(row: &TypeItemRow) -> Self {
        Self {
            index: derive_field(row, "序号"),
            brand: derive_field(row, "品牌"),
            area: derive_field(row, "区域"),
            description: derive_field(row, "系统说明"),
            unit: derive_field(row, "单位"),
            quantity: derive_field(row, "工程量"),
            unit_price: derive_field(row, "预算价"),
            total_price: derive_field(row, "单项预算合价"),
        }
    }
}

/// Bundled two-row example used when a budget sheet has no items.
pub fn derive_budget_example_items() -> Vec<SpecBudgetItem> {
    vec![
        SpecBudgetItem {
            index: 1.0.into(),
            brand: "小米".into(),
            area: "全屋智能主控系统".into(),
            description: "1、AI智能语音、自定义设备各种场景（回家、离家、会客、就餐、休闲、阅读等模式），完美实现智能化体验。 2、智能品类包括：智能灯光、智能遮阳、智能空调，智能安防等； 3、最大优势及亮点 \"无缝接入米家APP、AI智能语音控制、轻成本、轻设计、轻方案、轻对接、轻落地、轻维护\"； 4、可以根据所需的智能开关与空调语音小助手进行DIY定制。".into(),
            unit: "项".into(),
            quantity: 1.0.into(),
            unit_price: 1928.0.into(),
            total_price: 1928.0.into(),
        },
        SpecBudgetItem {
            index: 2.0.into(),
            brand: "FSXRT".into(),
            area: "智能灯光".into(),
            description: "1、自定义色温：智能双色温（2700~6500K的灯具，可以根据需求DIY自定义设置色温参数； 2、控制方式：单灯控制、回路控制、互控、集成控制、远程控制等； 3、自定义氛围场景：娱乐、聚会、休闲、会客等灯光场景。".into(),
            unit: "项".into(),
            quantity: 1.0.into(),
            unit_price: 6759.0.into(),
            total_price: 6759.0.into(),
        },
    ]
}

/// Checklist text rendered in C4, e.g. `☐别墅  ☑户型房`.
pub fn derive_house_type_checklist() -> String {
    TUP_HOUSE_TYPES
        .iter()
        .map(|(c_label, if_checked)| {
            let c_box = if *if_checked { '☑' } else { '☐' };
            format!("{c_box}{c_label}")
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// Budget summary sheet.
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetLayout;

impl LayoutStrategy for BudgetLayout {
    fn key(&self) -> &'static str {
        "budget"
    }

    fn apply(
        &self,
        canvas: &mut SheetCanvas<'_>,
        input: &SpecLayoutInput<'_>,
    ) -> Result<(), ExportError> {
        let l_items = derive_layout_items(
            canvas,
            input,
            SpecBudgetItem::from_row,
            Some(derive_budget_example_items as fn() -> Vec<SpecBudgetItem>),
        );
        write_budget_header(canvas, input)?;
        let n_total = write_budget_items(canvas, &l_items)?;
        write_budget_summary(canvas, l_items.len() as u32, n_total)?;
        debug!("budget sheet: {} items, total {n_total}", l_items.len());
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region HeaderBlock

fn write_budget_header(
    canvas: &mut SheetCanvas<'_>,
    input: &SpecLayoutInput<'_>,
) -> Result<(), ExportError> {
    for (c_col, n_width) in TUP_BUDGET_COL_WIDTHS {
        canvas.set_column_width(c_col, c_col, n_width)?;
    }
    for (n_row, n_height) in [(1, 42.0), (2, 42.0), (3, 42.0), (4, 25.0), (5, 42.0)] {
        canvas.set_row_height(n_row, n_height)?;
    }

    for range in [
        "A1:H1", "A2:D2", "E2:F3", "G2:H3", "A3:D3", "A4:B4", "C4:D4", "E4:H4",
    ] {
        canvas.merge(range)?;
    }

    let fmt_boxed_left = derive_style_preset("data").with_(SpecCellFormat {
        align: Some("left".to_string()),
        text_wrap: Some(false),
        ..Default::default()
    });
    let fmt_project = fmt_boxed_left.with_(SpecCellFormat {
        font_size: Some(14),
        ..Default::default()
    });
    let fmt_box_title = SpecCellFormat {
        font_size: Some(14),
        bg_color: None,
        text_wrap: None,
        ..derive_style_preset("header")
    };

    if let Some(url) = input.aux.logo_url.as_deref() {
        canvas.insert_image_from_url("A1", url, SpecImagePlacement::scaled(0.2, 0.1))?;
    }
    canvas.set_value("A1", C_BUDGET_TITLE)?;
    canvas.set_style("A1", "H1", &derive_style_preset("title"))?;

    let fmt_label = SpecCellFormat {
        font_name: Some(C_FONT_FAMILY_DEFAULT.to_string()),
        font_size: Some(14),
        bold: Some(true),
        font_color: Some("#000000".to_string()),
        ..Default::default()
    };
    let fmt_value = SpecCellFormat {
        font_size: Some(12),
        bold: Some(false),
        ..fmt_label.clone()
    };
    canvas.set_rich_text(
        "A2",
        vec![
            SpecRichTextSegment::new("项目名称：", fmt_label),
            SpecRichTextSegment::new(
                input.aux.project_name.clone().unwrap_or_default(),
                fmt_value,
            ),
        ],
    )?;
    canvas.set_style("A2", "D2", &fmt_project)?;

    canvas.set_value("E2", "参考户型图")?;
    canvas.set_style("E2", "F3", &fmt_box_title)?;
    if let Some(url) = input.aux.floor_plan_url.as_deref() {
        canvas.insert_image_from_url(
            "G2",
            url,
            SpecImagePlacement::scaled(0.3, 0.125).with_offset(26, 6),
        )?;
    }

    canvas.set_value(
        "A3",
        format!(
            "客户经理：{:<40}设计师：{}",
            "",
            input.aux.designer.as_deref().unwrap_or_default()
        ),
    )?;
    canvas.set_style("A3", "D3", &fmt_boxed_left)?;

    canvas.set_value("A4", "户型分类")?;
    canvas.set_value("C4", derive_house_type_checklist())?;
    canvas.set_value("E4", "套内面积(m²)：约80~110m²")?;
    canvas.set_style("A4", "H4", &derive_style_preset("data"))?;

    for (cell, c_header) in TUP_BUDGET_HEADERS {
        canvas.set_value(cell, c_header)?;
    }
    canvas.set_style("A5", "H5", &derive_style_preset("header"))?;
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ItemRows

/// Emit item rows from row 6; returns the sum of numeric `单项预算合价`.
fn write_budget_items(
    canvas: &mut SheetCanvas<'_>,
    l_items: &[SpecBudgetItem],
) -> Result<f64, ExportError> {
    let fmt_data = derive_style_preset("data");
    let fmt_amount = derive_style_preset("amount");
    let mut n_total = 0.0;

    for (n_idx, item) in l_items.iter().enumerate() {
        let n_row = N_ROW_BUDGET_ITEMS_START + n_idx as u32;
        canvas.set_value(&format!("A{n_row}"), item.index.clone())?;
        canvas.set_value(&format!("B{n_row}"), item.brand.clone())?;
        canvas.set_value(&format!("C{n_row}"), item.area.clone())?;
        canvas.set_value(&format!("D{n_row}"), item.description.clone())?;
        canvas.set_value(&format!("E{n_row}"), item.unit.clone())?;
        canvas.set_value(&format!("F{n_row}"), item.quantity.clone())?;
        canvas.set_value(&format!("G{n_row}"), item.unit_price.clone())?;
        canvas.set_value(&format!("H{n_row}"), item.total_price.clone())?;

        canvas.set_style(&format!("A{n_row}"), &format!("F{n_row}"), &fmt_data)?;
        canvas.set_style(&format!("G{n_row}"), &format!("H{n_row}"), &fmt_amount)?;
        n_total += item.total_price.as_number().unwrap_or(0.0);
    }
    Ok(n_total)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SummaryRows

fn write_budget_summary(
    canvas: &mut SheetCanvas<'_>,
    n_items: u32,
    n_total: f64,
) -> Result<(), ExportError> {
    let fmt_data = derive_style_preset("data");
    let n_row_total = N_ROW_BUDGET_ITEMS_START + n_items;

    canvas.set_value(&format!("A{n_row_total}"), n_row_total as f64)?;
    canvas.set_value(&format!("B{n_row_total}"), "/")?;
    canvas.set_value(&format!("C{n_row_total}"), "项目合计总价(不含增值税)")?;
    if n_items == 0 {
        canvas.set_value(&format!("H{n_row_total}"), 0.0)?;
    } else {
        canvas.set_formula(
            &format!("H{n_row_total}"),
            &format!("SUM(H{N_ROW_BUDGET_ITEMS_START}:H{})", n_row_total - 1),
        )?;
    }
    canvas.merge(&format!("D{n_row_total}:G{n_row_total}"))?;
    canvas.set_style(
        &format!("A{n_row_total}"),
        &format!("G{n_row_total}"),
        &derive_style_preset("header"),
    )?;
    canvas.set_style(
        &format!("H{n_row_total}"),
        &format!("H{n_row_total}"),
        &derive_style_preset("amount"),
    )?;

    let n_row_capital = n_row_total + 1;
    canvas.set_value(&format!("A{n_row_capital}"), "总价大写(元)")?;
    canvas.set_value(&format!("D{n_row_capital}"), derive_rmb_uppercase(n_total))?;
    canvas.merge(&format!("A{n_row_capital}:C{n_row_capital}"))?;
    canvas.merge(&format!("D{n_row_capital}:H{n_row_capital}"))?;
    canvas.set_style(
        &format!("A{n_row_capital}"),
        &format!("H{n_row_capital}"),
        &fmt_data,
    )?;

    let n_row_reminder = n_row_capital + 2;
    canvas.set_value(&format!("A{n_row_reminder}"), "温馨提醒：")?;
    canvas.set_value(&format!("B{n_row_reminder}"), C_BUDGET_REMINDER)?;
    canvas.merge(&format!("B{n_row_reminder}:H{n_row_reminder}"))?;
    canvas.set_style(
        &format!("A{n_row_reminder}"),
        &format!("H{n_row_reminder}"),
        &fmt_data,
    )?;
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::tests::with_canvas;
    use crate::spec::SpecSheetAux;
    use pretty_assertions::assert_eq;

    fn create_row(l_pairs: &[(&str, EnumCellValue)]) -> TypeItemRow {
        l_pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_single_item_sums_exactly_emitted_rows() {
        let l_rows = vec![create_row(&[
            ("序号", 1.0.into()),
            ("品牌", "小米".into()),
            ("单项预算合价", 8687.0.into()),
        ])];
        let aux = SpecSheetAux::default();
        with_canvas(|canvas| {
            let input = SpecLayoutInput {
                items: Some(&l_rows),
                aux: &aux,
                template: None,
                if_use_example_data: true,
            };
            BudgetLayout.apply(canvas, &input).expect("apply");

            assert_eq!(canvas.value("A1"), Some(&EnumCellValue::from(C_BUDGET_TITLE)));
            assert_eq!(canvas.value("B6"), Some(&EnumCellValue::from("小米")));
            assert_eq!(canvas.value("C6"), Some(&EnumCellValue::None));
            assert_eq!(
                canvas.value("H7"),
                Some(&EnumCellValue::Formula("SUM(H6:H6)".to_string()))
            );
            assert_eq!(
                canvas.value("D8"),
                Some(&EnumCellValue::from("捌仟陆佰捌拾柒元整"))
            );
            assert_eq!(canvas.value("A10"), Some(&EnumCellValue::from("温馨提醒：")));
            assert!(!canvas.report().if_example_data);
        });
    }

    #[test]
    fn test_missing_items_use_example_rows() {
        let aux = SpecSheetAux::default();
        with_canvas(|canvas| {
            let input = SpecLayoutInput {
                items: None,
                aux: &aux,
                template: None,
                if_use_example_data: true,
            };
            BudgetLayout.apply(canvas, &input).expect("apply");
            assert!(canvas.report().if_example_data);
            assert_eq!(canvas.value("B7"), Some(&EnumCellValue::from("FSXRT")));
            assert_eq!(
                canvas.report().formulas,
                vec![("H8".to_string(), "SUM(H6:H7)".to_string())]
            );
            assert_eq!(canvas.value("D9"), Some(&EnumCellValue::from("捌仟陆佰捌拾柒元整")));
        });
    }

    #[test]
    fn test_empty_items_write_zero_total() {
        let aux = SpecSheetAux::default();
        let l_rows: Vec<TypeItemRow> = Vec::new();
        with_canvas(|canvas| {
            let input = SpecLayoutInput {
                items: Some(&l_rows),
                aux: &aux,
                template: None,
                if_use_example_data: true,
            };
            BudgetLayout.apply(canvas, &input).expect("apply");
            assert_eq!(canvas.value("H6"), Some(&EnumCellValue::Number(0.0)));
            assert!(canvas.report().formulas.is_empty());
            assert_eq!(canvas.value("D7"), Some(&EnumCellValue::from("零元整")));
        });
    }

    #[test]
    fn test_header_block_and_images() {
        let aux = SpecSheetAux {
            logo_url: Some("https://ok.example.com/logo.png".to_string()),
            floor_plan_url: Some("https://missing.example.com/plan.png".to_string()),
            project_name: Some("滨江花园".to_string()),
            ..Default::default()
        };
        let l_rows: Vec<TypeItemRow> = Vec::new();
        with_canvas(|canvas| {
            let input = SpecLayoutInput {
                items: Some(&l_rows),
                aux: &aux,
                template: None,
                if_use_example_data: false,
            };
            BudgetLayout.apply(canvas, &input).expect("apply");

            let report = canvas.report();
            assert_eq!(report.images.len(), 1);
            assert_eq!(report.images[0].anchor, "A1");
            assert_eq!(report.warnings.len(), 1);
            assert_eq!(report.merges[0].to_string(), "A1:H1");
            assert_eq!(canvas.column_width("D"), Some(80.0));
            assert_eq!(canvas.row_height(4), Some(25.0));

            let Some(EnumCellValue::RichText(l_segments)) = canvas.value("A2") else {
                panic!("project name must be rich text");
            };
            assert_eq!(l_segments[0].text, "项目名称：");
            assert_eq!(l_segments[1].text, "滨江花园");
            assert_eq!(canvas.value("H5"), Some(&EnumCellValue::from("单项预算合价（元）")));
        });
    }

    #[test]
    fn test_house_type_checklist() {
        let c_checklist = derive_house_type_checklist();
        assert!(c_checklist.starts_with("☐别墅  ☐大平层  ☑户型房"));
        assert!(c_checklist.ends_with("☐其他"));
    }
}
