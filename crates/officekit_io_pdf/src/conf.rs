//! PDF page geometry, font resources and block defaults.

/// Points per millimetre.
pub const N_PT_PER_MM: f32 = 72.0 / 25.4;

/// A4 portrait width in millimetres.
pub const N_PAGE_WIDTH_MM: f32 = 210.0;
/// A4 portrait height in millimetres.
pub const N_PAGE_HEIGHT_MM: f32 = 297.0;
/// Margin on every side, in millimetres.
pub const N_PAGE_MARGIN_MM: f32 = 10.0;

/// Body font size in points.
pub const N_FONT_SIZE_BODY: f32 = 12.0;
/// Title font size in points.
pub const N_FONT_SIZE_TITLE: f32 = 24.0;
/// Table body font size in points.
pub const N_FONT_SIZE_TABLE: f32 = 11.0;

/// Line height of a title, in millimetres.
pub const N_LINE_HEIGHT_TITLE_MM: f32 = 10.0;
/// Line height of paragraph text, in millimetres.
pub const N_LINE_HEIGHT_TEXT_MM: f32 = 5.0;
/// Height of one table row, in millimetres.
pub const N_ROW_HEIGHT_TABLE_MM: f32 = 7.0;
/// Default table column width, in millimetres.
pub const N_COL_WIDTH_DEFAULT_MM: f32 = 40.0;
/// Inner horizontal padding of a table cell, in millimetres.
pub const N_CELL_PADDING_MM: f32 = 1.0;

/// Gap after the title.
pub const N_GAP_AFTER_TITLE_MM: f32 = 10.0;
/// Gap after a paragraph.
pub const N_GAP_AFTER_PARAGRAPH_MM: f32 = 5.0;
/// Gap after a table.
pub const N_GAP_AFTER_TABLE_MM: f32 = 10.0;

/// Average Helvetica glyph width as a fraction of the font size.
pub const N_GLYPH_WIDTH_RATIO: f32 = 0.5;

/// Table header fill, RGB in `0..=1`.
pub const TUP_HEADER_FILL_RGB: (f32, f32, f32) = (200.0 / 255.0, 220.0 / 255.0, 1.0);
/// Table border width in points.
pub const N_TABLE_LINE_WIDTH: f32 = 0.3 * N_PT_PER_MM;

/// Standard font resources as `(resource name, base font)`:
/// regular, bold, italic, bold italic.
pub const TUP_FONTS: [(&str, &str); 4] = [
    ("F1", "Helvetica"),
    ("F2", "Helvetica-Bold"),
    ("F3", "Helvetica-Oblique"),
    ("F4", "Helvetica-BoldOblique"),
];

/// Byte written for characters outside WinAnsi.
pub const N_BYTE_UNENCODABLE: u8 = b'?';
