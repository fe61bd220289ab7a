//! Four-column report without totals.

use crate::canvas::SheetCanvas;
use crate::conf::N_ROW_SIMPLE_ITEMS_START;
use crate::layout::{LayoutStrategy, SpecLayoutInput, derive_field, derive_layout_items};
use crate::spec::{EnumCellValue, ExportError, SpecCellFormat, TypeItemRow};

/// One decoded simple-report row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSimpleItem {
    /// `品牌`
    pub name: EnumCellValue,
    /// `工程量`
    pub quantity: EnumCellValue,
    /// `预算价`
    pub amount: EnumCellValue,
}

impl SpecSimpleItem {
    pub fn from_row(row: &TypeItemRow) -> Self {
        Self {
            name: derive_field(row, "品牌"),
            quantity: derive_field(row, "工程量"),
            amount: derive_field(row, "预算价"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleLayout;

impl LayoutStrategy for SimpleLayout {
    fn key(&self) -> &'static str {
        "simple"
    }

    fn apply(
        &self,
        canvas: &mut SheetCanvas<'_>,
        input: &SpecLayoutInput<'_>,
    ) -> Result<(), ExportError> {
        let fmt_title = SpecCellFormat {
            font_size: Some(16),
            bold: Some(true),
            align: Some("center".to_string()),
            ..Default::default()
        };
        let fmt_header = SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            valign: Some("vcenter".to_string()),
            text_wrap: Some(true),
            ..Default::default()
        };
        let fmt_data = SpecCellFormat {
            valign: Some("vcenter".to_string()),
            text_wrap: Some(true),
            ..Default::default()
        };

        canvas.set_column_width("A", "D", 20.0)?;
        canvas.set_value("A1", "简单报表")?;
        canvas.merge("A1:D1")?;
        canvas.set_style("A1", "D1", &fmt_title)?;

        for (cell, c_header) in [("A2", "序号"), ("B2", "名称"), ("C2", "数量"), ("D2", "金额")] {
            canvas.set_value(cell, c_header)?;
        }
        canvas.set_style("A2", "D2", &fmt_header)?;

        // No bundled rows: an absent list yields an empty body.
        let l_items = derive_layout_items(canvas, input, SpecSimpleItem::from_row, None);
        for (n_idx, item) in l_items.iter().enumerate() {
            let n_row = N_ROW_SIMPLE_ITEMS_START + n_idx as u32;
            canvas.set_value(&format!("A{n_row}"), (n_idx + 1) as f64)?;
            canvas.set_value(&format!("B{n_row}"), item.name.clone())?;
            canvas.set_value(&format!("C{n_row}"), item.quantity.clone())?;
            canvas.set_value(&format!("D{n_row}"), item.amount.clone())?;
            canvas.set_style(&format!("A{n_row}"), &format!("D{n_row}"), &fmt_data)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::tests::with_canvas;
    use crate::spec::SpecSheetAux;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rows_are_numbered_from_one() {
        let l_rows: Vec<TypeItemRow> = vec![
            [("品牌".to_string(), EnumCellValue::from("小米"))].into(),
            [
                ("品牌".to_string(), EnumCellValue::from("FSXRT")),
                ("工程量".to_string(), EnumCellValue::Number(3.0)),
            ]
            .into(),
        ];
        let aux = SpecSheetAux::default();
        with_canvas(|canvas| {
            let input = SpecLayoutInput {
                items: Some(&l_rows),
                aux: &aux,
                template: None,
                if_use_example_data: true,
            };
            SimpleLayout.apply(canvas, &input).expect("apply");
            assert_eq!(canvas.value("A1"), Some(&EnumCellValue::from("简单报表")));
            assert_eq!(canvas.value("A3"), Some(&EnumCellValue::Number(1.0)));
            assert_eq!(canvas.value("A4"), Some(&EnumCellValue::Number(2.0)));
            assert_eq!(canvas.value("B4"), Some(&EnumCellValue::from("FSXRT")));
            assert_eq!(canvas.value("C3"), Some(&EnumCellValue::None));
            assert_eq!(canvas.value("C4"), Some(&EnumCellValue::Number(3.0)));
            assert!(canvas.report().formulas.is_empty());
        });
    }

    #[test]
    fn test_missing_items_leave_body_empty() {
        let aux = SpecSheetAux::default();
        with_canvas(|canvas| {
            let input = SpecLayoutInput {
                items: None,
                aux: &aux,
                template: None,
                if_use_example_data: true,
            };
            SimpleLayout.apply(canvas, &input).expect("apply");
            assert_eq!(canvas.last_row(), 2);
            assert!(!canvas.report().if_example_data);
            assert_eq!(canvas.column_width("C"), Some(20.0));
        });
    }
}
