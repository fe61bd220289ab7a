//! PDF writer: lays out title, paragraphs and tables top-down on A4 pages.

use log::{debug, info, warn};
use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};

use crate::conf::{
    N_CELL_PADDING_MM, N_FONT_SIZE_BODY, N_FONT_SIZE_TABLE, N_FONT_SIZE_TITLE,
    N_GAP_AFTER_PARAGRAPH_MM, N_GAP_AFTER_TABLE_MM, N_GAP_AFTER_TITLE_MM, N_LINE_HEIGHT_TEXT_MM,
    N_LINE_HEIGHT_TITLE_MM, N_PAGE_HEIGHT_MM, N_PAGE_MARGIN_MM, N_PAGE_WIDTH_MM, N_PT_PER_MM,
    N_ROW_HEIGHT_TABLE_MM, N_TABLE_LINE_WIDTH, TUP_FONTS, TUP_HEADER_FILL_RGB,
};
use crate::spec::{
    EnumPdfBlock, PdfExportError, SpecPdfDocument, SpecPdfReport, SpecPdfTable, SpecPdfTableCell,
};
use crate::util::{derive_text_width_pt, encode_win_ansi, plan_column_widths, wrap_text};

/// Font variant of one text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumFontStyle {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl EnumFontStyle {
    fn from_flags(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => EnumFontStyle::Regular,
            (true, false) => EnumFontStyle::Bold,
            (false, true) => EnumFontStyle::Italic,
            (true, true) => EnumFontStyle::BoldItalic,
        }
    }

    fn resource_name(self) -> &'static [u8] {
        let idx = match self {
            EnumFontStyle::Regular => 0,
            EnumFontStyle::Bold => 1,
            EnumFontStyle::Italic => 2,
            EnumFontStyle::BoldItalic => 3,
        };
        TUP_FONTS[idx].0.as_bytes()
    }
}

/// Page-by-page layout state. Coordinates are points from the page top-left.
struct PdfLayoutCursor {
    l_pages: Vec<Content>,
    n_y_pt: f32,
    report: SpecPdfReport,
}

impl PdfLayoutCursor {
    fn new() -> Self {
        Self {
            l_pages: vec![Content::new()],
            n_y_pt: N_PAGE_MARGIN_MM * N_PT_PER_MM,
            report: SpecPdfReport::default(),
        }
    }

    fn n_width_body_pt(&self) -> f32 {
        (N_PAGE_WIDTH_MM - 2.0 * N_PAGE_MARGIN_MM) * N_PT_PER_MM
    }

    fn n_x_left_pt(&self) -> f32 {
        N_PAGE_MARGIN_MM * N_PT_PER_MM
    }

    /// Start a new page when `n_height_pt` does not fit below the cursor.
    fn reserve(&mut self, n_height_pt: f32) {
        let n_y_max = (N_PAGE_HEIGHT_MM - N_PAGE_MARGIN_MM) * N_PT_PER_MM;
        if self.n_y_pt + n_height_pt > n_y_max && self.n_y_pt > self.n_x_left_pt() {
            self.l_pages.push(Content::new());
            self.n_y_pt = N_PAGE_MARGIN_MM * N_PT_PER_MM;
        }
    }

    fn advance(&mut self, n_height_pt: f32) {
        self.n_y_pt += n_height_pt;
    }

    fn content(&mut self) -> &mut Content {
        let n_last = self.l_pages.len() - 1;
        &mut self.l_pages[n_last]
    }

    /// Show one line of text with its baseline `n_baseline_pt` below the page top.
    fn show_text(
        &mut self,
        text: &str,
        style: EnumFontStyle,
        font_size: f32,
        n_x_pt: f32,
        n_baseline_pt: f32,
    ) {
        let (v_bytes, if_lossy) = encode_win_ansi(text);
        if if_lossy {
            self.report
                .warn(format!("characters outside WinAnsi replaced in {text:?}"));
        }
        let n_y_pdf = N_PAGE_HEIGHT_MM * N_PT_PER_MM - n_baseline_pt;
        self.content()
            .begin_text()
            .set_font(Name(style.resource_name()), font_size)
            .next_line(n_x_pt, n_y_pdf)
            .show(Str(&v_bytes))
            .end_text();
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region Blocks

fn write_title(cursor: &mut PdfLayoutCursor, title: &str) {
    let n_line_pt = N_LINE_HEIGHT_TITLE_MM * N_PT_PER_MM;
    cursor.reserve(n_line_pt);
    let n_width_text = derive_text_width_pt(title, N_FONT_SIZE_TITLE);
    let n_x = cursor.n_x_left_pt() + ((cursor.n_width_body_pt() - n_width_text) / 2.0).max(0.0);
    let n_baseline = cursor.n_y_pt + n_line_pt * 0.75;
    cursor.show_text(title, EnumFontStyle::Bold, N_FONT_SIZE_TITLE, n_x, n_baseline);
    cursor.advance(n_line_pt + N_GAP_AFTER_TITLE_MM * N_PT_PER_MM);
}

fn write_paragraph(
    cursor: &mut PdfLayoutCursor,
    text: &str,
    bold: bool,
    italic: bool,
    font_size: Option<f32>,
) {
    let font_size = font_size
        .filter(|size| size.is_finite() && *size > 0.0)
        .unwrap_or(N_FONT_SIZE_BODY);
    let style = EnumFontStyle::from_flags(bold, italic);
    let n_line_pt = (N_LINE_HEIGHT_TEXT_MM * N_PT_PER_MM).max(font_size * 1.2);

    for c_line in wrap_text(text, cursor.n_width_body_pt(), font_size) {
        cursor.reserve(n_line_pt);
        let n_baseline = cursor.n_y_pt + n_line_pt * 0.8;
        let n_x = cursor.n_x_left_pt();
        cursor.show_text(&c_line, style, font_size, n_x, n_baseline);
        cursor.advance(n_line_pt);
    }
    cursor.advance(N_GAP_AFTER_PARAGRAPH_MM * N_PT_PER_MM);
}

fn write_table(cursor: &mut PdfLayoutCursor, table: &SpecPdfTable) -> Result<bool, PdfExportError> {
    let l_widths_mm = plan_column_widths(table)?;
    if l_widths_mm.is_empty() {
        return Ok(false);
    }
    for row in &table.headers {
        write_table_row(cursor, row, &l_widths_mm, true);
    }
    for row in &table.rows {
        write_table_row(cursor, row, &l_widths_mm, false);
    }
    cursor.advance(N_GAP_AFTER_TABLE_MM * N_PT_PER_MM);
    Ok(true)
}

fn write_table_row(
    cursor: &mut PdfLayoutCursor,
    row: &[SpecPdfTableCell],
    l_widths_mm: &[f32],
    if_header: bool,
) {
    let n_row_pt = N_ROW_HEIGHT_TABLE_MM * N_PT_PER_MM;
    cursor.reserve(n_row_pt);
    let (style, font_size) = if if_header {
        (EnumFontStyle::Bold, N_FONT_SIZE_BODY)
    } else {
        (EnumFontStyle::Regular, N_FONT_SIZE_TABLE)
    };
    let n_page_height_pt = N_PAGE_HEIGHT_MM * N_PT_PER_MM;

    let mut n_col = 0usize;
    let mut n_x = cursor.n_x_left_pt();
    for cell in row {
        let n_span = cell.col_span.max(1);
        let n_width_pt: f32 = l_widths_mm.iter().skip(n_col).take(n_span).sum::<f32>() * N_PT_PER_MM;
        n_col += n_span;
        if n_width_pt <= 0.0 {
            continue;
        }

        let n_y_bottom_pdf = n_page_height_pt - cursor.n_y_pt - n_row_pt;
        let content = cursor.content();
        content.save_state();
        content.set_line_width(N_TABLE_LINE_WIDTH);
        if if_header {
            let (r, g, b) = TUP_HEADER_FILL_RGB;
            content.set_fill_rgb(r, g, b);
            content.rect(n_x, n_y_bottom_pdf, n_width_pt, n_row_pt);
            content.fill_nonzero_and_stroke();
        } else {
            content.rect(n_x, n_y_bottom_pdf, n_width_pt, n_row_pt);
            content.stroke();
        }
        content.restore_state();

        let n_x_text = if if_header {
            let n_width_text = derive_text_width_pt(&cell.text, font_size);
            n_x + ((n_width_pt - n_width_text) / 2.0).max(N_CELL_PADDING_MM * N_PT_PER_MM)
        } else {
            n_x + N_CELL_PADDING_MM * N_PT_PER_MM
        };
        let n_baseline = cursor.n_y_pt + n_row_pt * 0.7;
        cursor.show_text(&cell.text, style, font_size, n_x_text, n_baseline);
        n_x += n_width_pt;
    }
    cursor.advance(n_row_pt);
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

/// Render `document` into PDF bytes.
pub fn export_pdf(document: &SpecPdfDocument) -> Result<(Vec<u8>, SpecPdfReport), PdfExportError> {
    let mut cursor = PdfLayoutCursor::new();

    if let Some(title) = document.title.as_deref().filter(|title| !title.is_empty()) {
        write_title(&mut cursor, title);
    }
    for (idx, block) in document.blocks.iter().enumerate() {
        match block {
            EnumPdfBlock::Paragraph {
                text,
                bold,
                italic,
                font_size,
            } => {
                if text.is_empty() {
                    continue;
                }
                write_paragraph(&mut cursor, text, *bold, *italic, *font_size);
            }
            EnumPdfBlock::Table(table) => {
                if !write_table(&mut cursor, table)? {
                    cursor.report.warn(format!("block {idx}: empty table skipped"));
                    continue;
                }
            }
            EnumPdfBlock::Image { path } => {
                warn!("block {idx}: image {path:?} skipped; images are not rendered");
                cursor
                    .report
                    .warn(format!("block {idx}: image {path:?} skipped"));
                continue;
            }
        }
        cursor.report.n_blocks_written += 1;
    }

    let PdfLayoutCursor {
        l_pages,
        mut report,
        ..
    } = cursor;
    report.n_pages = l_pages.len();
    let v_bytes = assemble_pdf(l_pages);
    info!(
        "pdf written: {} pages, {} blocks, {} bytes",
        report.n_pages,
        report.n_blocks_written,
        v_bytes.len()
    );
    Ok((v_bytes, report))
}

fn assemble_pdf(l_pages: Vec<Content>) -> Vec<u8> {
    let mut pdf = Pdf::new();
    let mut n_next_id = 1i32;
    let mut alloc = || {
        let id = Ref::new(n_next_id);
        n_next_id += 1;
        id
    };

    let id_catalog = alloc();
    let id_pages = alloc();
    let l_font_ids: Vec<Ref> = TUP_FONTS.iter().map(|_| alloc()).collect();
    let l_page_ids: Vec<Ref> = l_pages.iter().map(|_| alloc()).collect();
    let l_content_ids: Vec<Ref> = l_pages.iter().map(|_| alloc()).collect();

    pdf.catalog(id_catalog).pages(id_pages);
    pdf.pages(id_pages)
        .kids(l_page_ids.iter().copied())
        .count(l_page_ids.len() as i32);

    for ((_, c_base_font), id_font) in TUP_FONTS.iter().zip(&l_font_ids) {
        pdf.type1_font(*id_font)
            .base_font(Name(c_base_font.as_bytes()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }

    let media_box = Rect::new(
        0.0,
        0.0,
        N_PAGE_WIDTH_MM * N_PT_PER_MM,
        N_PAGE_HEIGHT_MM * N_PT_PER_MM,
    );
    for ((content, id_page), id_content) in l_pages.into_iter().zip(&l_page_ids).zip(&l_content_ids)
    {
        let v_content = content.finish();
        pdf.stream(*id_content, &v_content);

        let mut page = pdf.page(*id_page);
        page.media_box(media_box)
            .parent(id_pages)
            .contents(*id_content);
        let mut resources = page.resources();
        let mut fonts = resources.fonts();
        for ((c_name, _), id_font) in TUP_FONTS.iter().zip(&l_font_ids) {
            fonts.pair(Name(c_name.as_bytes()), *id_font);
        }
    }
    debug!("pdf assembled with {} font resources", TUP_FONTS.len());
    pdf.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn create_paragraph(text: &str) -> EnumPdfBlock {
        EnumPdfBlock::Paragraph {
            text: text.to_string(),
            bold: false,
            italic: false,
            font_size: None,
        }
    }

    #[test]
    fn test_export_title_paragraph_table() {
        let document = SpecPdfDocument {
            title: Some("Quarterly report".to_string()),
            blocks: vec![
                create_paragraph("Revenue grew in every region."),
                EnumPdfBlock::Table(SpecPdfTable {
                    headers: vec![vec![
                        SpecPdfTableCell::new("Region"),
                        SpecPdfTableCell::new("Amount"),
                    ]],
                    rows: vec![vec![
                        SpecPdfTableCell::new("North"),
                        SpecPdfTableCell::new("1200"),
                    ]],
                    col_widths: Some(vec![60.0, 40.0]),
                }),
            ],
        };
        let (v_bytes, report) = export_pdf(&document).expect("pdf");
        assert!(v_bytes.starts_with(b"%PDF-"));
        assert_eq!(report.n_pages, 1);
        assert_eq!(report.n_blocks_written, 2);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_images_and_empty_blocks_are_skipped() {
        let document = SpecPdfDocument {
            title: None,
            blocks: vec![
                EnumPdfBlock::Image {
                    path: "logo.png".to_string(),
                },
                create_paragraph(""),
                EnumPdfBlock::Table(SpecPdfTable::default()),
            ],
        };
        let (v_bytes, report) = export_pdf(&document).expect("pdf");
        assert!(v_bytes.starts_with(b"%PDF-"));
        assert_eq!(report.n_blocks_written, 0);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_long_content_paginates() {
        let document = SpecPdfDocument {
            title: None,
            blocks: (0..80).map(|idx| create_paragraph(&format!("Line {idx}"))).collect(),
        };
        let (_, report) = export_pdf(&document).expect("pdf");
        assert!(report.n_pages > 1);
    }

    #[test]
    fn test_invalid_column_width_fails() {
        let document = SpecPdfDocument {
            title: None,
            blocks: vec![EnumPdfBlock::Table(SpecPdfTable {
                headers: vec![vec![SpecPdfTableCell::new("A")]],
                rows: Vec::new(),
                col_widths: Some(vec![f32::NAN]),
            })],
        };
        assert!(matches!(
            export_pdf(&document),
            Err(PdfExportError::InvalidContent(_))
        ));
    }
}
