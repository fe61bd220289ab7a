//! Layout strategies: one routine per visual layout variant.
//!
//! Every strategy fills one [`SheetCanvas`] from one sheet entry. Strategies
//! are looked up by key through [`LayoutRegistry`]; unknown keys resolve to
//! the default (budget) layout.

use std::collections::BTreeMap;

use log::{info, warn};

use crate::canvas::SheetCanvas;
use crate::conf::C_LAYOUT_KEY_DEFAULT;
use crate::spec::{EnumCellValue, ExportError, SpecSheetAux, TypeItemRow};
use crate::template::SpecTemplateSheet;

pub mod budget;
pub mod cover;
pub mod quote;
pub mod simple;

pub use budget::BudgetLayout;
pub use cover::CoverLayout;
pub use quote::QuoteLayout;
pub use simple::SimpleLayout;

/// Inputs handed to a layout for one sheet.
#[derive(Debug, Clone, Copy)]
pub struct SpecLayoutInput<'a> {
    /// Item rows; `None` when the entry had no list.
    pub items: Option<&'a [TypeItemRow]>,
    /// Layout-specific top-level fields.
    pub aux: &'a SpecSheetAux,
    /// Placeholder sheet of the opened template.
    pub template: Option<&'a SpecTemplateSheet>,
    /// Whether absent items fall back to bundled example rows.
    pub if_use_example_data: bool,
}

/// One layout variant.
pub trait LayoutStrategy: Send + Sync {
    /// Registry key, e.g. `quote`.
    fn key(&self) -> &'static str;

    /// Fill `canvas` from `input`.
    fn apply(&self, canvas: &mut SheetCanvas<'_>, input: &SpecLayoutInput<'_>)
    -> Result<(), ExportError>;
}

/// Key to strategy map with default fallback.
pub struct LayoutRegistry {
    dict_layouts: BTreeMap<String, Box<dyn LayoutStrategy>>,
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::with_standard_layouts()
    }
}

impl LayoutRegistry {
    /// Empty registry; [`Self::resolve`] fails until a `default` layout is added.
    pub fn new() -> Self {
        Self {
            dict_layouts: BTreeMap::new(),
        }
    }

    /// Registry holding `default`, `budget`, `simple`, `quote` and `cover`.
    pub fn with_standard_layouts() -> Self {
        let mut registry = Self::new();
        registry.register_as(C_LAYOUT_KEY_DEFAULT, Box::new(BudgetLayout));
        registry.register(Box::new(BudgetLayout));
        registry.register(Box::new(SimpleLayout));
        registry.register(Box::new(QuoteLayout));
        registry.register(Box::new(CoverLayout));
        registry
    }

    /// Register under the strategy's own key.
    pub fn register(&mut self, layout: Box<dyn LayoutStrategy>) {
        let c_key = layout.key().to_string();
        self.dict_layouts.insert(c_key, layout);
    }

    /// Register under an alias key.
    pub fn register_as(&mut self, key: &str, layout: Box<dyn LayoutStrategy>) {
        self.dict_layouts.insert(key.to_string(), layout);
    }

    /// Strategy for `key`, or the default strategy for unknown keys.
    pub fn resolve(&self, key: &str) -> Result<&dyn LayoutStrategy, ExportError> {
        if let Some(layout) = self.dict_layouts.get(key) {
            return Ok(layout.as_ref());
        }
        self.dict_layouts
            .get(C_LAYOUT_KEY_DEFAULT)
            .map(|layout| layout.as_ref())
            .ok_or_else(|| {
                ExportError::OperationFailed(format!(
                    "no layout registered for {key:?} and no default layout"
                ))
            })
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.dict_layouts.keys().cloned().collect()
    }
}

/// Effective layout key: sheet override, then request id, then `default`.
pub fn derive_layout_key(sheet_template_id: Option<&str>, request_template_id: &str) -> String {
    [sheet_template_id.unwrap_or_default(), request_template_id]
        .into_iter()
        .map(str::trim)
        .find(|key| !key.is_empty())
        .unwrap_or(C_LAYOUT_KEY_DEFAULT)
        .to_string()
}

/// Decode request rows into typed items, or fall back to example rows.
///
/// The fallback applies only when the entry had no item list at all and
/// `fallback` is given; it is logged and flagged in the sheet report.
pub(crate) fn derive_layout_items<T>(
    canvas: &mut SheetCanvas<'_>,
    input: &SpecLayoutInput<'_>,
    from_row: impl Fn(&TypeItemRow) -> T,
    fallback: Option<fn() -> Vec<T>>,
) -> Vec<T> {
    if let Some(l_rows) = input.items {
        return l_rows.iter().map(from_row).collect();
    }
    match fallback {
        Some(fallback) if input.if_use_example_data => {
            warn!("sheet has no items; using bundled example rows");
            let report = canvas.report_mut();
            report.if_example_data = true;
            report.warn("no items given; bundled example rows used");
            fallback()
        }
        _ => {
            info!("sheet has no items");
            Vec::new()
        }
    }
}

/// Field of a row, `None` when missing.
pub(crate) fn derive_field(row: &TypeItemRow, key: &str) -> EnumCellValue {
    row.get(key).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_layout_key_precedence() {
        assert_eq!(derive_layout_key(Some("cover"), "quote"), "cover");
        assert_eq!(derive_layout_key(Some(""), "quote"), "quote");
        assert_eq!(derive_layout_key(None, "quote"), "quote");
        assert_eq!(derive_layout_key(None, "  "), "default");
    }

    #[test]
    fn test_registry_falls_back_to_default() {
        let registry = LayoutRegistry::with_standard_layouts();
        assert_eq!(registry.resolve("quote").expect("quote").key(), "quote");
        assert_eq!(registry.resolve("unknown").expect("fallback").key(), "budget");
        assert_eq!(registry.resolve("default").expect("default").key(), "budget");
        assert_eq!(
            registry.keys(),
            vec!["budget", "cover", "default", "quote", "simple"]
        );
    }

    #[test]
    fn test_empty_registry_cannot_resolve() {
        let registry = LayoutRegistry::new();
        assert!(registry.resolve("budget").is_err());
    }
}
