//! Stateless helper utilities used by the layouts and the workbook writer.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::conf::{
    C_IMAGE_EXT_DEFAULT, C_SHEET_NAME_PREFIX, C_SHEET_NAME_RESERVED, N_LEN_EXCEL_SHEET_NAME_MAX,
    N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL, TUP_IMAGE_CONTENT_TYPES,
};
use crate::spec::{ExportError, SpecCellAddress, SpecMergeRange};

////////////////////////////////////////////////////////////////////////////////
// #region CellAddressing

/// Encode a 1-based column index as letters (`1 -> A`, `27 -> AA`).
///
/// Returns an empty string for `0`.
pub fn derive_column_letters(col: u16) -> String {
    let mut n_col = col as u32;
    let mut l_chars = Vec::new();
    while n_col > 0 {
        let n_rem = (n_col - 1) % 26;
        l_chars.push((b'A' + n_rem as u8) as char);
        n_col = (n_col - 1) / 26;
    }
    l_chars.iter().rev().collect()
}

/// Parse an `A1`-style reference into a 1-based address.
pub fn parse_cell_address(reference: &str) -> Result<SpecCellAddress, ExportError> {
    let c_ref = reference.trim().to_ascii_uppercase();
    let n_split = c_ref
        .find(|chr: char| chr.is_ascii_digit())
        .ok_or_else(|| {
            ExportError::OperationFailed(format!("invalid cell reference: {reference:?}"))
        })?;
    let (c_letters, c_digits) = c_ref.split_at(n_split);
    if c_letters.is_empty() || !c_letters.chars().all(|chr| chr.is_ascii_uppercase()) {
        return Err(ExportError::OperationFailed(format!(
            "invalid cell reference: {reference:?}"
        )));
    }

    let mut n_col: usize = 0;
    for chr in c_letters.chars() {
        n_col = n_col * 26 + (chr as usize - 'A' as usize + 1);
        if n_col > N_NCOLS_EXCEL_MAX {
            return Err(ExportError::OperationFailed(format!(
                "column out of range: {reference:?}"
            )));
        }
    }
    let n_row: usize = c_digits.parse().map_err(|_| {
        ExportError::OperationFailed(format!("invalid cell reference: {reference:?}"))
    })?;
    if n_row == 0 || n_row > N_NROWS_EXCEL_MAX {
        return Err(ExportError::OperationFailed(format!(
            "row out of range: {reference:?}"
        )));
    }

    Ok(SpecCellAddress::new(n_row as u32, n_col as u16))
}

/// Parse an `A1:H1` range; start must not exceed end on either axis.
pub fn parse_merge_range(reference: &str) -> Result<SpecMergeRange, ExportError> {
    let Some((c_start, c_end)) = reference.split_once(':') else {
        return Err(ExportError::OperationFailed(format!(
            "invalid merge range: {reference:?}"
        )));
    };
    let range = SpecMergeRange {
        start: parse_cell_address(c_start)?,
        end: parse_cell_address(c_end)?,
    };
    validate_merge_range(&range)?;
    Ok(range)
}

/// Reject inverted or single-cell merge ranges.
pub fn validate_merge_range(range: &SpecMergeRange) -> Result<(), ExportError> {
    if range.start.row > range.end.row || range.start.col > range.end.col {
        return Err(ExportError::OperationFailed(format!(
            "merge range start exceeds end: {range}"
        )));
    }
    if range.start == range.end {
        return Err(ExportError::OperationFailed(format!(
            "merge range covers a single cell: {range}"
        )));
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Sanitize a user-provided sheet name for Excel constraints.
///
/// Truncation happens before edge trimming so the result never starts or ends
/// with an apostrophe. The reserved name `History` gets a trailing `_`.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    let c_cut: String = c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect();
    let mut c_name = trim_sheet_name_edges(&c_cut).to_string();
    if c_name.is_empty() {
        c_name = C_SHEET_NAME_PREFIX.to_string();
    }
    if c_name.eq_ignore_ascii_case(C_SHEET_NAME_RESERVED) {
        c_name.push('_');
    }
    c_name
}

fn trim_sheet_name_edges(name: &str) -> &str {
    name.trim_matches(|chr: char| chr.is_whitespace() || chr == '\'')
}

/// Default name of the sheet at zero-based position `idx`.
pub fn create_sheet_identifier(idx: usize) -> String {
    format!("{C_SHEET_NAME_PREFIX}{}", idx + 1)
}

/// Return `name` or, when taken, the first free `name(k)` for `k = 1, 2, ...`.
///
/// Names are compared case-insensitively; the chosen name is recorded in
/// `set_names_lower`.
pub fn derive_unique_sheet_name(name: &str, set_names_lower: &mut BTreeSet<String>) -> String {
    if set_names_lower.insert(name.to_lowercase()) {
        return name.to_string();
    }

    let mut n_idx = 1usize;
    loop {
        let c_suffix = format!("({n_idx})");
        let n_len_base = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_suffix.chars().count());
        let c_cut: String = name.chars().take(n_len_base).collect();
        let c_base = match trim_sheet_name_edges(&c_cut) {
            "" => C_SHEET_NAME_PREFIX,
            c_trimmed => c_trimmed,
        };
        let candidate = format!("{c_base}{c_suffix}");
        if set_names_lower.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n_idx += 1;
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TextUtils

/// Stack characters vertically: each character followed by a line break,
/// without a trailing break.
pub fn derive_vertical_text(text: &str) -> String {
    let mut c_out = String::with_capacity(text.len() * 2);
    for chr in text.chars() {
        c_out.push(chr);
        c_out.push('\n');
    }
    c_out.trim_end_matches('\n').to_string()
}

const TUP_RMB_DIGITS: [&str; 10] = ["零", "壹", "贰", "叁", "肆", "伍", "陆", "柒", "捌", "玖"];
const TUP_RMB_UNITS_IN_GROUP: [&str; 4] = ["仟", "佰", "拾", ""];
const TUP_RMB_UNITS_GROUP: [&str; 4] = ["", "万", "亿", "万亿"];

/// Render an amount as Chinese uppercase RMB text, e.g. `贰万贰仟肆佰伍拾玖元贰角整`.
///
/// Rounded to the fen; negative amounts are prefixed with `负`.
pub fn derive_rmb_uppercase(amount: f64) -> String {
    if !amount.is_finite() {
        return String::new();
    }
    let n_fen_total = (amount.abs() * 100.0).round() as u64;
    let n_integer = n_fen_total / 100;
    let n_jiao = (n_fen_total / 10 % 10) as usize;
    let n_fen = (n_fen_total % 10) as usize;

    let mut c_out = String::new();
    if amount < 0.0 && n_fen_total > 0 {
        c_out.push('负');
    }
    c_out.push_str(&convert_rmb_integer_part(n_integer));
    c_out.push('元');

    if n_jiao == 0 && n_fen == 0 {
        c_out.push('整');
        return c_out;
    }
    if n_jiao > 0 {
        c_out.push_str(TUP_RMB_DIGITS[n_jiao]);
        c_out.push('角');
    } else if n_integer > 0 {
        c_out.push_str(TUP_RMB_DIGITS[0]);
    }
    if n_fen > 0 {
        c_out.push_str(TUP_RMB_DIGITS[n_fen]);
        c_out.push('分');
    } else {
        c_out.push('整');
    }
    c_out
}

fn convert_rmb_integer_part(n_value: u64) -> String {
    if n_value == 0 {
        return TUP_RMB_DIGITS[0].to_string();
    }

    let mut l_groups = Vec::new();
    let mut n_rest = n_value;
    while n_rest > 0 {
        l_groups.push((n_rest % 10_000) as usize);
        n_rest /= 10_000;
    }

    let mut c_out = String::new();
    let mut if_need_zero = false;
    for (n_idx_group, n_group) in l_groups.iter().enumerate().rev() {
        if *n_group == 0 {
            if !c_out.is_empty() {
                if_need_zero = true;
            }
            continue;
        }
        if !c_out.is_empty() && (*n_group < 1000 || if_need_zero) {
            c_out.push_str(TUP_RMB_DIGITS[0]);
        }
        c_out.push_str(&convert_rmb_group(*n_group));
        c_out.push_str(TUP_RMB_UNITS_GROUP[n_idx_group.min(TUP_RMB_UNITS_GROUP.len() - 1)]);
        if_need_zero = false;
    }
    c_out
}

fn convert_rmb_group(n_group: usize) -> String {
    let l_digits = [
        n_group / 1000,
        n_group / 100 % 10,
        n_group / 10 % 10,
        n_group % 10,
    ];
    let mut c_out = String::new();
    let mut if_started = false;
    let mut if_pending_zero = false;
    for (n_idx, n_digit) in l_digits.iter().enumerate() {
        if *n_digit == 0 {
            if if_started {
                if_pending_zero = true;
            }
            continue;
        }
        if if_pending_zero {
            c_out.push_str(TUP_RMB_DIGITS[0]);
            if_pending_zero = false;
        }
        c_out.push_str(TUP_RMB_DIGITS[*n_digit]);
        c_out.push_str(TUP_RMB_UNITS_IN_GROUP[n_idx]);
        if_started = true;
    }
    c_out
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ImageExtension

fn derive_extension_regex() -> Option<&'static Regex> {
    static RE_EXT: OnceLock<Option<Regex>> = OnceLock::new();
    RE_EXT
        .get_or_init(|| Regex::new(r"\.([A-Za-z0-9]{1,5})$").ok())
        .as_ref()
}

/// Extension from the URL's last path segment, query and fragment stripped.
pub fn derive_extension_from_url(url: &str) -> Option<String> {
    let c_no_query = url.split(['?', '#']).next().unwrap_or_default();
    let c_path = match c_no_query.split_once("://") {
        Some((_, c_rest)) => c_rest.split_once('/').map(|(_, p)| p)?,
        None => c_no_query,
    };
    let c_segment = c_path.rsplit('/').next().unwrap_or_default();
    derive_extension_regex()?
        .captures(c_segment)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// Extension from a `Content-Type` header value (parameters ignored).
pub fn derive_extension_from_content_type(content_type: &str) -> Option<String> {
    let c_mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    TUP_IMAGE_CONTENT_TYPES
        .iter()
        .find(|(c_type, _)| *c_type == c_mime)
        .map(|(_, c_ext)| c_ext.to_string())
}

/// Infer the staged file extension: URL first, then content type, then `jpg`.
pub fn derive_image_extension(url: &str, content_type: Option<&str>) -> String {
    derive_extension_from_url(url)
        .or_else(|| content_type.and_then(derive_extension_from_content_type))
        .unwrap_or_else(|| C_IMAGE_EXT_DEFAULT.to_string())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
