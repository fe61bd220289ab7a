//! Quote layout.
//!
//! Rows 1-6 (company header and column headers) come from the template's
//! placeholder sheet. Items start on row 7; the layout appends a subtotal row
//! and a discount row computed from the numeric `总价` values it emitted.

use log::debug;

use crate::canvas::SheetCanvas;
use crate::conf::{
    C_QUOTE_HEADER_FILL, N_QUOTE_DISCOUNT_RATE, N_ROW_QUOTE_ITEMS_START, derive_style_preset,
};
use crate::layout::{LayoutStrategy, SpecLayoutInput, derive_field, derive_layout_items};
use crate::spec::{EnumCellValue, ExportError, SpecCellFormat, TypeItemRow};
use crate::template::SpecTemplateSheet;

const C_MATERIAL_PANEL: &str = "环保要求：甲醛释放量≤5mg/100g。\n2、基材：E0级\n3、木皮表面";

/// One decoded quote row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecQuoteItem {
    /// `品名`
    pub product_name: EnumCellValue,
    /// `规格`
    pub specification: EnumCellValue,
    /// `材质说明`
    pub material: EnumCellValue,
    /// `颜色`
    pub color: EnumCellValue,
    /// `数量`
    pub quantity: EnumCellValue,
    /// `单价`
    pub unit_price: EnumCellValue,
    /// `总价`
    pub total_price: EnumCellValue,
    /// `备注`
    pub remark: EnumCellValue,
}

impl SpecQuoteItem {
    pub fn from_row(row: &TypeItemRow) -> Self {
        Self {
            product_name: derive_field(row, "品名"),
            specification: derive_field(row, "规格"),
            material: derive_field(row, "材质说明"),
            color: derive_field(row, "颜色"),
            quantity: derive_field(row, "数量"),
            unit_price: derive_field(row, "单价"),
            total_price: derive_field(row, "总价"),
            remark: derive_field(row, "备注"),
        }
    }
}

fn create_quote_item(
    product_name: &str,
    specification: &str,
    material: &str,
    color: &str,
    quantity: f64,
    unit_price: f64,
) -> SpecQuoteItem {
    SpecQuoteItem {
        product_name: product_name.into(),
        specification: specification.into(),
        material: material.into(),
        color: color.into(),
        quantity: quantity.into(),
        unit_price: unit_price.into(),
        total_price: (quantity * unit_price).into(),
        remark: "".into(),
    }
}

/// Bundled five-row example shared by the quote layout and the quote template.
pub fn derive_quote_example_items() -> Vec<SpecQuoteItem> {
    vec![
        create_quote_item("大班台", "2400*2000*750", C_MATERIAL_PANEL, "黑色", 2.0, 10141.0),
        create_quote_item("文件柜", "2400*450*2000", C_MATERIAL_PANEL, "黑色", 3.0, 10716.0),
        create_quote_item("会客桌", "2000*800*750", C_MATERIAL_PANEL, "黑色", 6.0, 4500.0),
        create_quote_item("会客椅", "常规", C_MATERIAL_PANEL, "黑色", 1.0, 400.0),
        create_quote_item(
            "中式隔断",
            "定制2800*2100",
            "采用行列式手法，风格、功能设计",
            "不锈钢包边",
            6.0,
            1200.0,
        ),
    ]
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteLayout;

impl LayoutStrategy for QuoteLayout {
    fn key(&self) -> &'static str {
        "quote"
    }

    fn apply(
        &self,
        canvas: &mut SheetCanvas<'_>,
        input: &SpecLayoutInput<'_>,
    ) -> Result<(), ExportError> {
        if let Some(template) = input.template {
            canvas.seed_from_template(template, N_ROW_QUOTE_ITEMS_START - 1)?;
            restyle_seeded_header(canvas, template)?;
        }
        canvas.set_column_width("A", "J", 15.0)?;
        canvas.set_column_width("B", "B", 8.0)?;
        canvas.set_column_width("D", "D", 20.0)?;

        let l_items = derive_layout_items(
            canvas,
            input,
            SpecQuoteItem::from_row,
            Some(derive_quote_example_items as fn() -> Vec<SpecQuoteItem>),
        );

        let fmt_data = derive_style_preset("data");
        let fmt_amount = derive_style_preset("amount");
        let mut n_total = 0.0;
        for (n_idx, item) in l_items.iter().enumerate() {
            let n_row = N_ROW_QUOTE_ITEMS_START + n_idx as u32;
            canvas.set_value(&format!("A{n_row}"), item.product_name.clone())?;
            canvas.set_value(&format!("C{n_row}"), item.specification.clone())?;
            canvas.set_value(&format!("D{n_row}"), item.material.clone())?;
            canvas.set_value(&format!("E{n_row}"), item.color.clone())?;
            canvas.set_value(&format!("F{n_row}"), item.quantity.clone())?;
            canvas.set_value(&format!("G{n_row}"), item.unit_price.clone())?;
            canvas.set_value(&format!("H{n_row}"), item.total_price.clone())?;
            canvas.set_value(&format!("I{n_row}"), item.remark.clone())?;

            canvas.set_style(&format!("A{n_row}"), &format!("I{n_row}"), &fmt_data)?;
            canvas.set_style(&format!("G{n_row}"), &format!("H{n_row}"), &fmt_amount)?;
            n_total += item.total_price.as_number().unwrap_or(0.0);
        }

        let n_row_total = N_ROW_QUOTE_ITEMS_START + l_items.len() as u32;
        canvas.set_value(&format!("A{n_row_total}"), "合计（金额大写）：")?;
        canvas.set_value(&format!("H{n_row_total}"), "小计：")?;
        canvas.set_value(&format!("I{n_row_total}"), n_total)?;
        canvas.set_style(
            &format!("G{n_row_total}"),
            &format!("I{n_row_total}"),
            &fmt_amount,
        )?;

        let n_row_discount = n_row_total + 1;
        canvas.set_value(&format!("H{n_row_discount}"), "优惠价：")?;
        canvas.set_value(
            &format!("I{n_row_discount}"),
            n_total * N_QUOTE_DISCOUNT_RATE,
        )?;
        canvas.set_style(
            &format!("G{n_row_discount}"),
            &format!("I{n_row_discount}"),
            &fmt_amount,
        )?;

        debug!("quote sheet: {} items, subtotal {n_total}", l_items.len());
        Ok(())
    }
}

/// Template values arrive without styles; give the seeded company rows (1-2)
/// and column headers (5-6) the header look back. Blank cells stay unstyled.
fn restyle_seeded_header(
    canvas: &mut SheetCanvas<'_>,
    template: &SpecTemplateSheet,
) -> Result<(), ExportError> {
    let fmt_company = SpecCellFormat {
        border: None,
        border_color: None,
        font_size: Some(16),
        ..derive_style_preset("title")
    };
    let fmt_header = SpecCellFormat {
        bg_color: Some(C_QUOTE_HEADER_FILL.to_string()),
        ..derive_style_preset("header")
    };

    for addr in template.cells.keys() {
        let fmt = match addr.row {
            1 | 2 => &fmt_company,
            5 | 6 => &fmt_header,
            _ => continue,
        };
        let (addr_from, addr_to) = template
            .merges
            .iter()
            .find(|range| range.contains(*addr) && range.end.row < N_ROW_QUOTE_ITEMS_START)
            .map_or((*addr, *addr), |range| (range.start, range.end));
        canvas.set_style(&addr_from.to_string(), &addr_to.to_string(), fmt)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::tests::with_canvas;
    use crate::spec::{SpecCellAddress, SpecMergeRange, SpecSheetAux};
    use pretty_assertions::assert_eq;

    fn create_row(product_name: &str, total_price: EnumCellValue) -> TypeItemRow {
        [
            ("品名".to_string(), EnumCellValue::from(product_name)),
            ("总价".to_string(), total_price),
        ]
        .into()
    }

    #[test]
    fn test_discount_covers_numeric_totals_only() {
        let l_rows = vec![
            create_row("大班台", 1000.0.into()),
            create_row("文件柜", "面议".into()),
            create_row("会客椅", 500.0.into()),
        ];
        let aux = SpecSheetAux::default();
        with_canvas(|canvas| {
            let input = SpecLayoutInput {
                items: Some(&l_rows),
                aux: &aux,
                template: None,
                if_use_example_data: true,
            };
            QuoteLayout.apply(canvas, &input).expect("apply");
            assert_eq!(canvas.value("A7"), Some(&EnumCellValue::from("大班台")));
            assert_eq!(canvas.value("H8"), Some(&EnumCellValue::from("面议")));
            assert_eq!(canvas.value("H10"), Some(&EnumCellValue::from("小计：")));
            assert_eq!(canvas.value("I10"), Some(&EnumCellValue::Number(1500.0)));
            assert_eq!(canvas.value("H11"), Some(&EnumCellValue::from("优惠价：")));
            assert_eq!(canvas.value("I11"), Some(&EnumCellValue::Number(1500.0 * 0.7)));
        });
    }

    #[test]
    fn test_fallback_rows_are_deterministic() {
        let l_first = derive_quote_example_items();
        let l_second = derive_quote_example_items();
        assert_eq!(l_first, l_second);
        assert_eq!(l_first.len(), 5);
        let n_total: f64 = l_first
            .iter()
            .filter_map(|item| item.total_price.as_number())
            .sum();
        assert_eq!(n_total, 87030.0);

        let aux = SpecSheetAux::default();
        with_canvas(|canvas| {
            let input = SpecLayoutInput {
                items: None,
                aux: &aux,
                template: None,
                if_use_example_data: true,
            };
            QuoteLayout.apply(canvas, &input).expect("apply");
            assert!(canvas.report().if_example_data);
            assert_eq!(canvas.value("I12"), Some(&EnumCellValue::Number(87030.0)));
            assert_eq!(canvas.value("I13"), Some(&EnumCellValue::Number(87030.0 * 0.7)));
        });
    }

    #[test]
    fn test_header_rows_are_seeded_from_template() {
        let template = SpecTemplateSheet {
            name: "报价单".to_string(),
            cells: [
                (SpecCellAddress::new(1, 1), EnumCellValue::from("稻壳科技有限公司")),
                (SpecCellAddress::new(5, 1), EnumCellValue::from("品名")),
                (SpecCellAddress::new(8, 1), EnumCellValue::from("示例行")),
            ]
            .into(),
            merges: vec![
                SpecMergeRange {
                    start: SpecCellAddress::new(1, 1),
                    end: SpecCellAddress::new(1, 10),
                },
                SpecMergeRange {
                    start: SpecCellAddress::new(5, 1),
                    end: SpecCellAddress::new(6, 1),
                },
            ],
        };
        let l_rows = vec![create_row("会客桌", 27000.0.into())];
        let aux = SpecSheetAux::default();
        with_canvas(|canvas| {
            let input = SpecLayoutInput {
                items: Some(&l_rows),
                aux: &aux,
                template: Some(&template),
                if_use_example_data: true,
            };
            QuoteLayout.apply(canvas, &input).expect("apply");
            assert_eq!(
                canvas.value("A1"),
                Some(&EnumCellValue::from("稻壳科技有限公司"))
            );
            assert_eq!(canvas.value("A5"), Some(&EnumCellValue::from("品名")));
            assert_eq!(canvas.value("A7"), Some(&EnumCellValue::from("会客桌")));
            assert_eq!(canvas.value("A8"), Some(&EnumCellValue::from("合计（金额大写）：")));
            assert_eq!(canvas.report().merges.len(), 2);

            let fmt_header = canvas.style("A6").expect("merged header styled");
            assert_eq!(fmt_header.bg_color.as_deref(), Some(C_QUOTE_HEADER_FILL));
            assert_eq!(canvas.style("A5"), Some(fmt_header));
            assert!(canvas.style("J1").is_some());
        });
    }

    #[test]
    fn test_blank_template_header_rows_stay_unstyled() {
        let template = SpecTemplateSheet {
            name: "Sheet1".to_string(),
            cells: [(SpecCellAddress::new(5, 2), EnumCellValue::from("产品图片"))].into(),
            merges: Vec::new(),
        };
        let l_rows = vec![create_row("会客桌", 27000.0.into())];
        let aux = SpecSheetAux::default();
        with_canvas(|canvas| {
            let input = SpecLayoutInput {
                items: Some(&l_rows),
                aux: &aux,
                template: Some(&template),
                if_use_example_data: true,
            };
            QuoteLayout.apply(canvas, &input).expect("apply");
            assert_eq!(canvas.style("A1"), None);
            assert_eq!(canvas.style("A5"), None);
            assert_eq!(canvas.style("C6"), None);
            assert!(canvas.style("B5").is_some());
        });
    }
}
