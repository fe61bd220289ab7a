//! Per-workbook style registry.
//!
//! Layouts describe styles as [`SpecCellFormat`] values; the registry turns
//! each distinct descriptor into one `rust_xlsxwriter::Format` and hands out a
//! copyable [`StyleHandle`]. Equal descriptors always get the same handle.

use std::collections::HashMap;

use log::debug;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, FormatPattern};

use crate::conf::{N_FONT_SIZE_MAX, N_FONT_SIZE_MIN, N_STYLES_EXCEL_MAX};
use crate::spec::{ExportError, SpecCellFormat};

/// Opaque reference to an interned style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyleHandle(usize);

/// Interning table owned by exactly one workbook writer.
#[derive(Debug)]
pub struct StyleRegistry {
    l_formats: Vec<Format>,
    dict_handles: HashMap<SpecCellFormat, StyleHandle>,
    n_styles_max: usize,
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::with_limit(N_STYLES_EXCEL_MAX)
    }

    /// Registry that refuses to hold more than `n_styles_max` distinct styles.
    pub fn with_limit(n_styles_max: usize) -> Self {
        Self {
            l_formats: Vec::new(),
            dict_handles: HashMap::new(),
            n_styles_max,
        }
    }

    /// Intern `spec`, creating the backing format on first use.
    pub fn get(&mut self, spec: &SpecCellFormat) -> Result<StyleHandle, ExportError> {
        if let Some(handle) = self.dict_handles.get(spec) {
            return Ok(*handle);
        }
        if self.l_formats.len() >= self.n_styles_max {
            return Err(ExportError::OperationFailed(format!(
                "style table full ({} styles)",
                self.n_styles_max
            )));
        }

        let format = derive_rust_xlsx_format(spec)?;
        let handle = StyleHandle(self.l_formats.len());
        self.l_formats.push(format);
        self.dict_handles.insert(spec.clone(), handle);
        debug!("interned style #{} {spec:?}", handle.0);
        Ok(handle)
    }

    /// Backing format of an issued handle.
    pub fn format(&self, handle: StyleHandle) -> Option<&Format> {
        self.l_formats.get(handle.0)
    }

    pub fn len(&self) -> usize {
        self.l_formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.l_formats.is_empty()
    }
}

/// Convert one descriptor into a writer format, rejecting invalid values.
pub fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Result<Format, ExportError> {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.as_str());
    }
    if let Some(val) = spec.font_size {
        if !(N_FONT_SIZE_MIN..=N_FONT_SIZE_MAX).contains(&val) {
            return Err(derive_style_error(format!("font size out of range: {val}")));
        }
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }
    if let Some(val) = &spec.font_color {
        validate_color(val)?;
        format = format.set_font_color(val.as_str());
    }

    if let Some(val) = &spec.align {
        let align = derive_format_align(val)
            .ok_or_else(|| derive_style_error(format!("unknown horizontal alignment: {val:?}")))?;
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign {
        let align = derive_format_valign(val)
            .ok_or_else(|| derive_style_error(format!("unknown vertical alignment: {val:?}")))?;
        format = format.set_align(align);
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val)?);
    }
    if let Some(val) = spec.top {
        format = format.set_border_top(derive_format_border(val)?);
    }
    if let Some(val) = spec.bottom {
        format = format.set_border_bottom(derive_format_border(val)?);
    }
    if let Some(val) = spec.left {
        format = format.set_border_left(derive_format_border(val)?);
    }
    if let Some(val) = spec.right {
        format = format.set_border_right(derive_format_border(val)?);
    }
    if let Some(val) = &spec.border_color {
        validate_color(val)?;
        format = format.set_border_color(val.as_str());
    }

    if let Some(val) = &spec.bg_color {
        validate_color(val)?;
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(val.as_str());
    }
    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.as_str());
    }

    Ok(format)
}

fn validate_color(color: &str) -> Result<(), ExportError> {
    let c_hex = color.strip_prefix('#').unwrap_or(color);
    if c_hex.len() == 6 && c_hex.chars().all(|chr| chr.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(derive_style_error(format!("invalid color: {color:?}")))
    }
}

fn derive_format_border(border: i64) -> Result<FormatBorder, ExportError> {
    let value = match border {
        0 => FormatBorder::None,
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        8 => FormatBorder::MediumDashed,
        9 => FormatBorder::DashDot,
        10 => FormatBorder::MediumDashDot,
        11 => FormatBorder::DashDotDot,
        12 => FormatBorder::MediumDashDotDot,
        13 => FormatBorder::SlantDashDot,
        _ => return Err(derive_style_error(format!("unknown border style: {border}"))),
    };
    Ok(value)
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "center_across" => Some(FormatAlign::CenterAcross),
        "distributed" => Some(FormatAlign::Distributed),
        _ => None,
    }
}

fn derive_format_valign(valign: &str) -> Option<FormatAlign> {
    let value = valign.trim().to_ascii_lowercase();
    match value.as_str() {
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "center" | "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        "justify" | "vjustify" | "vertical_justify" => Some(FormatAlign::VerticalJustify),
        "distributed" | "vdistributed" | "vertical_distributed" => {
            Some(FormatAlign::VerticalDistributed)
        }
        _ => None,
    }
}

fn derive_style_error(msg: String) -> ExportError {
    ExportError::OperationFailed(format!("style creation failed: {msg}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::derive_style_preset;

    #[test]
    fn test_equal_descriptors_share_handle() {
        let mut registry = StyleRegistry::new();
        let fmt_a = derive_style_preset("data");
        let fmt_b = derive_style_preset("data");
        let fmt_c = fmt_a.with_(SpecCellFormat {
            align: Some("right".to_string()),
            ..Default::default()
        });

        let handle_a = registry.get(&fmt_a).expect("style a");
        let handle_b = registry.get(&fmt_b).expect("style b");
        let handle_c = registry.get(&fmt_c).expect("style c");

        assert_eq!(handle_a, handle_b);
        assert_ne!(handle_a, handle_c);
        assert_eq!(registry.len(), 2);
        assert!(registry.format(handle_c).is_some());
    }

    #[test]
    fn test_registries_are_independent() {
        let mut registry_a = StyleRegistry::new();
        let mut registry_b = StyleRegistry::new();
        registry_a
            .get(&derive_style_preset("title"))
            .expect("title");
        let handle = registry_a
            .get(&derive_style_preset("header"))
            .expect("header");
        assert!(registry_b.is_empty());
        let handle_b = registry_b
            .get(&derive_style_preset("header"))
            .expect("header");
        assert_ne!(handle, handle_b);
    }

    #[test]
    fn test_invalid_descriptors_fail() {
        let mut registry = StyleRegistry::new();
        let l_invalid = [
            SpecCellFormat {
                font_size: Some(0),
                ..Default::default()
            },
            SpecCellFormat {
                bg_color: Some("#GG0000".to_string()),
                ..Default::default()
            },
            SpecCellFormat {
                align: Some("sideways".to_string()),
                ..Default::default()
            },
            SpecCellFormat {
                border: Some(42),
                ..Default::default()
            },
        ];
        for spec in &l_invalid {
            let err = registry.get(spec).expect_err("invalid style");
            assert!(matches!(err, ExportError::OperationFailed(_)));
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_style_table_is_bounded() {
        let mut registry = StyleRegistry::with_limit(2);
        for n_size in [10, 11] {
            registry
                .get(&SpecCellFormat {
                    font_size: Some(n_size),
                    ..Default::default()
                })
                .expect("within limit");
        }
        let err = registry
            .get(&SpecCellFormat {
                font_size: Some(12),
                ..Default::default()
            })
            .expect_err("table full");
        assert!(err.to_string().contains("style table full"));
    }
}
