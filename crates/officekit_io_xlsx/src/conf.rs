//! XLSX constants and default style preset factories.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use crate::spec::SpecCellFormat;

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];
/// Excel limit on distinct cell formats in one workbook.
pub const N_STYLES_EXCEL_MAX: usize = 64_000;
/// Smallest font size accepted by Excel.
pub const N_FONT_SIZE_MIN: i64 = 1;
/// Largest font size accepted by Excel.
pub const N_FONT_SIZE_MAX: i64 = 409;

/// Prefix of generated sheet names (`Sheet1`, `Sheet2`, ...).
pub const C_SHEET_NAME_PREFIX: &str = "Sheet";
/// Sheet name Excel reserves for change tracking.
pub const C_SHEET_NAME_RESERVED: &str = "History";
/// Layout key used when neither the sheet nor the request names one.
pub const C_LAYOUT_KEY_DEFAULT: &str = "default";

/// Font family shared by every layout.
pub const C_FONT_FAMILY_DEFAULT: &str = "微软雅黑";

/// Fallback image extension when neither URL nor content type tells.
pub const C_IMAGE_EXT_DEFAULT: &str = "jpg";
/// Temp file prefix for staged remote images.
pub const C_IMAGE_TEMP_PREFIX: &str = "excel-image-";
/// Content type to extension table for remote images.
pub const TUP_IMAGE_CONTENT_TYPES: [(&str, &str); 5] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/bmp", "bmp"),
    ("image/webp", "webp"),
];
/// Default HTTP timeout for one image fetch.
pub const DUR_FETCH_TIMEOUT_DEFAULT: Duration = Duration::from_secs(10);
/// Default cap on one image body.
pub const N_BYTES_FETCH_MAX_DEFAULT: usize = 10 * 1024 * 1024;

/// First item row (1-based) of the budget layout.
pub const N_ROW_BUDGET_ITEMS_START: u32 = 6;
/// First item row (1-based) of the simple layout.
pub const N_ROW_SIMPLE_ITEMS_START: u32 = 3;
/// First item row (1-based) of the quote layout.
pub const N_ROW_QUOTE_ITEMS_START: u32 = 7;
/// Column header fill of the quote template.
pub const C_QUOTE_HEADER_FILL: &str = "#E0EBF5";
/// Discount factor applied to the quote total.
pub const N_QUOTE_DISCOUNT_RATE: f64 = 0.7;

/// Build the named style presets shared by the layouts.
///
/// Keys: `title`, `data`, `amount`, `header`, `label`, `underline`.
pub fn derive_default_style_presets() -> BTreeMap<String, SpecCellFormat> {
    let cfg_base_fmt_spec = SpecCellFormat {
        font_name: Some(C_FONT_FAMILY_DEFAULT.to_string()),
        font_size: Some(12),
        font_color: Some("#000000".to_string()),
        ..Default::default()
    };

    let mut dict_fmt = BTreeMap::new();
    dict_fmt.insert(
        "title".to_string(),
        cfg_base_fmt_spec.with_(SpecCellFormat {
            font_size: Some(20),
            bold: Some(true),
            align: Some("center".to_string()),
            valign: Some("vcenter".to_string()),
            border: Some(1),
            border_color: Some("#000000".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        "data".to_string(),
        cfg_base_fmt_spec.with_(SpecCellFormat {
            valign: Some("vcenter".to_string()),
            text_wrap: Some(true),
            border: Some(1),
            border_color: Some("#000000".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        "amount".to_string(),
        SpecCellFormat {
            align: Some("right".to_string()),
            valign: Some("vcenter".to_string()),
            text_wrap: Some(true),
            border: Some(1),
            border_color: Some("#000000".to_string()),
            ..Default::default()
        },
    );
    dict_fmt.insert(
        "header".to_string(),
        cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            bg_color: Some("#D0CECE".to_string()),
            align: Some("center".to_string()),
            valign: Some("vcenter".to_string()),
            text_wrap: Some(true),
            border: Some(1),
            border_color: Some("#000000".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        "label".to_string(),
        cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            align: Some("left".to_string()),
            valign: Some("vcenter".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        "underline".to_string(),
        cfg_base_fmt_spec.with_(SpecCellFormat {
            valign: Some("vcenter".to_string()),
            bottom: Some(1),
            border_color: Some("#000000".to_string()),
            ..Default::default()
        }),
    );

    dict_fmt
}

/// Look up one preset, falling back to an empty format for unknown keys.
///
/// The preset map is built once per process.
pub fn derive_style_preset(key: &str) -> SpecCellFormat {
    static DICT_PRESETS: LazyLock<BTreeMap<String, SpecCellFormat>> =
        LazyLock::new(derive_default_style_presets);
    DICT_PRESETS.get(key).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_derive_style_preset_reads_shared_presets() {
        let dict_fmt = derive_default_style_presets();
        for (key, fmt) in &dict_fmt {
            assert_eq!(&derive_style_preset(key), fmt);
        }
        assert_eq!(derive_style_preset("missing"), SpecCellFormat::default());
    }
}
