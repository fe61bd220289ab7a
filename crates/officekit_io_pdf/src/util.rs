//! Text encoding, wrapping and table geometry helpers.

use crate::conf::{N_BYTE_UNENCODABLE, N_COL_WIDTH_DEFAULT_MM, N_GLYPH_WIDTH_RATIO};
use crate::spec::{PdfExportError, SpecPdfTable};

const TUP_WIN_ANSI_EXTRA: [(char, u8); 9] = [
    ('€', 0x80),
    ('‘', 0x91),
    ('’', 0x92),
    ('“', 0x93),
    ('”', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('™', 0x99),
];

/// Encode `text` for a WinAnsi Type1 font.
///
/// Returns the bytes and whether any character had to be replaced with `?`.
pub fn encode_win_ansi(text: &str) -> (Vec<u8>, bool) {
    let mut v_out = Vec::with_capacity(text.len());
    let mut if_lossy = false;
    for chr in text.chars() {
        let n_code = chr as u32;
        let byte = match chr {
            '\t' => b' ',
            _ if (0x20..=0x7E).contains(&n_code) || (0xA0..=0xFF).contains(&n_code) => {
                n_code as u8
            }
            _ => match TUP_WIN_ANSI_EXTRA.iter().find(|(c, _)| *c == chr) {
                Some((_, byte)) => *byte,
                None => {
                    if_lossy = true;
                    N_BYTE_UNENCODABLE
                }
            },
        };
        v_out.push(byte);
    }
    (v_out, if_lossy)
}

/// Approximate rendered width of `text` in points.
pub fn derive_text_width_pt(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * N_GLYPH_WIDTH_RATIO
}

/// Greedy word wrap of `text` into lines no wider than `n_width_pt`.
///
/// Explicit newlines start new lines; words longer than a line are split.
pub fn wrap_text(text: &str, n_width_pt: f32, font_size: f32) -> Vec<String> {
    let n_chars_max = ((n_width_pt / (font_size * N_GLYPH_WIDTH_RATIO)).floor() as usize).max(1);
    let mut l_lines = Vec::new();

    for c_paragraph in text.split('\n') {
        let mut c_line = String::new();
        let mut n_line = 0usize;
        for c_word in c_paragraph.split_whitespace() {
            let l_word: Vec<char> = c_word.chars().collect();
            for l_piece in l_word.chunks(n_chars_max) {
                let n_piece = l_piece.len();
                let n_needed = if n_line == 0 { n_piece } else { n_line + 1 + n_piece };
                if n_needed > n_chars_max && n_line > 0 {
                    l_lines.push(std::mem::take(&mut c_line));
                    n_line = 0;
                }
                if n_line > 0 {
                    c_line.push(' ');
                    n_line += 1;
                }
                c_line.extend(l_piece.iter());
                n_line += n_piece;
            }
        }
        l_lines.push(c_line);
    }
    l_lines
}

/// Column count of a table: widest row measured in spanned columns.
pub fn derive_table_column_count(table: &SpecPdfTable) -> usize {
    table
        .headers
        .iter()
        .chain(table.rows.iter())
        .map(|row| row.iter().map(|cell| cell.col_span.max(1)).sum::<usize>())
        .max()
        .unwrap_or(0)
}

/// Column widths in millimetres; explicit widths must be finite and positive.
pub fn plan_column_widths(table: &SpecPdfTable) -> Result<Vec<f32>, PdfExportError> {
    match &table.col_widths {
        Some(l_widths) if !l_widths.is_empty() => {
            if let Some(n_bad) = l_widths.iter().find(|n| !n.is_finite() || **n <= 0.0) {
                return Err(PdfExportError::InvalidContent(format!(
                    "column width must be positive, got {n_bad}"
                )));
            }
            Ok(l_widths.clone())
        }
        _ => Ok(vec![N_COL_WIDTH_DEFAULT_MM; derive_table_column_count(table)]),
    }
}
