//! Cover page layout: logo, tagline, vertical title and labeled input lines.

use crate::canvas::{SheetCanvas, SpecImagePlacement};
use crate::conf::{C_FONT_FAMILY_DEFAULT, derive_style_preset};
use crate::layout::{LayoutStrategy, SpecLayoutInput};
use crate::spec::{ExportError, SpecCellFormat, SpecRichTextSegment, SpecSheetAux};
use crate::util::derive_vertical_text;

const C_COVER_TAGLINE: &str = "——全屋智能家居综合解决方案提供商";
const C_COVER_TITLE: &str = "全屋智能家居方案预算";

/// Labeled input lines as `(anchor, merge range, label)`.
const TUP_COVER_FIELDS: [(&str, &str, &str); 10] = [
    ("B12", "B12:I12", "项目名称："),
    ("B13", "B13:I13", "项目地址："),
    ("B14", "B14:I14", "方案内容："),
    ("B15", "B15:D15", "批准："),
    ("E15", "E15:F15", "审核："),
    ("G15", "G15:I15", "设计师："),
    ("B16", "B16:I16", "日期："),
    ("B17", "B17:D17", "联系人："),
    ("E17", "E17:F17", "电话："),
    ("G17", "G17:I17", "微信号："),
];

/// Values of the input lines, in the order of [`TUP_COVER_FIELDS`].
fn derive_cover_values(aux: &SpecSheetAux) -> [Option<&str>; 10] {
    [
        aux.project_name.as_deref(),
        aux.project_address.as_deref(),
        aux.project_content.as_deref(),
        aux.approver.as_deref(),
        aux.reviewer.as_deref(),
        aux.designer.as_deref(),
        aux.date.as_deref(),
        aux.contact.as_deref(),
        aux.phone.as_deref(),
        aux.wechat.as_deref(),
    ]
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CoverLayout;

impl LayoutStrategy for CoverLayout {
    fn key(&self) -> &'static str {
        "cover"
    }

    fn apply(
        &self,
        canvas: &mut SheetCanvas<'_>,
        input: &SpecLayoutInput<'_>,
    ) -> Result<(), ExportError> {
        let fmt_label = derive_style_preset("label");
        let fmt_vertical_title = SpecCellFormat {
            font_name: Some(C_FONT_FAMILY_DEFAULT.to_string()),
            font_size: Some(26),
            bold: Some(true),
            font_color: Some("#000000".to_string()),
            align: Some("center".to_string()),
            valign: Some("vcenter".to_string()),
            text_wrap: Some(true),
            ..Default::default()
        };
        let fmt_underline = derive_style_preset("underline");
        let fmt_value = fmt_label.with_(SpecCellFormat {
            bold: Some(false),
            ..Default::default()
        });

        if let Some(url) = input.aux.cover_logo_url.as_deref() {
            canvas.insert_image_from_url("A1", url, SpecImagePlacement::scaled(0.3, 0.3))?;
        }

        canvas.write("D4", C_COVER_TAGLINE, &fmt_label)?;
        canvas.write("E8", derive_vertical_text(C_COVER_TITLE), &fmt_vertical_title)?;
        canvas.set_column_width("E", "E", 10.0)?;

        let l_values = derive_cover_values(input.aux);
        for ((cell, range, c_label), value) in TUP_COVER_FIELDS.into_iter().zip(l_values) {
            canvas.set_rich_text(
                cell,
                vec![
                    SpecRichTextSegment::new(c_label, fmt_label.font_only()),
                    SpecRichTextSegment::new(value.unwrap_or_default(), fmt_value.font_only()),
                ],
            )?;
            canvas.merge(range)?;
            let (cell_from, cell_to) = range.split_once(':').unwrap_or((cell, cell));
            canvas.set_style(cell_from, cell_to, &fmt_underline)?;
        }
        for n_row in 13..=17 {
            canvas.set_row_height(n_row, 30.0)?;
        }
        Ok(())
    }
}
