use std::io::{BufRead, BufReader, Cursor, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;
use std::time::Duration;

use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use officekit_io_xlsx::{
    EnumCellValue, ExportError, HttpAssetFetcher, SpecCancelToken, SpecSheetAux, SpecSheetInput,
    SpecXlsxExportOptions, TypeItemRow, export_xlsx, write_blank_template, write_quote_template,
};
use pretty_assertions::assert_eq;

fn create_fetcher() -> HttpAssetFetcher {
    HttpAssetFetcher::new(Duration::from_secs(5), 1024 * 1024).expect("fetcher")
}

fn create_row(l_pairs: &[(&str, EnumCellValue)]) -> TypeItemRow {
    l_pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

fn read_back(v_bytes: Vec<u8>) -> Xlsx<Cursor<Vec<u8>>> {
    open_workbook_from_rs(Cursor::new(v_bytes)).expect("readable workbook")
}

fn read_cell(workbook: &mut Xlsx<Cursor<Vec<u8>>>, sheet: &str, pos: (u32, u32)) -> Data {
    let range = workbook.worksheet_range(sheet).expect("sheet range");
    range.get_value(pos).cloned().unwrap_or(Data::Empty)
}

/// One-shot HTTP server answering every request with `404 Not Found`.
fn spawn_not_found_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut line = String::new();
            while reader.read_line(&mut line).map(|n| n > 2).unwrap_or(false) {
                line.clear();
            }
            let mut stream = stream;
            let _ = stream.write_all(
                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
        }
    });
    format!("http://{addr}/missing.png")
}

fn write_template(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    write_blank_template(&path).expect("template");
    path
}

#[test]
fn test_budget_single_item_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path_template = write_template(dir.path(), "budget.xlsx");
    let l_sheets = vec![SpecSheetInput {
        name: Some("预算汇总表".to_string()),
        items: Some(vec![create_row(&[
            ("序号", 1.0.into()),
            ("品牌", "小米".into()),
            ("区域", "全屋智能主控系统".into()),
            ("单项预算合价", 1928.0.into()),
        ])]),
        ..Default::default()
    }];

    let (v_bytes, report) = export_xlsx(
        &path_template,
        "budget",
        &l_sheets,
        &SpecXlsxExportOptions::default(),
        &create_fetcher(),
        &SpecCancelToken::new(),
    )
    .expect("export");

    assert_eq!(report.sheets.len(), 1);
    assert_eq!(
        report.sheets[0].formulas,
        vec![("H7".to_string(), "SUM(H6:H6)".to_string())]
    );

    let mut workbook = read_back(v_bytes);
    assert_eq!(workbook.sheet_names(), vec!["预算汇总表".to_string()]);
    assert_eq!(
        read_cell(&mut workbook, "预算汇总表", (0, 0)),
        Data::String("全屋智能家居方案A套餐预算汇总表".to_string())
    );
    assert_eq!(
        read_cell(&mut workbook, "预算汇总表", (4, 7)),
        Data::String("单项预算合价（元）".to_string())
    );
    assert_eq!(
        read_cell(&mut workbook, "预算汇总表", (5, 1)),
        Data::String("小米".to_string())
    );
    let formulas = workbook.worksheet_formula("预算汇总表").expect("formulas");
    assert_eq!(
        formulas.get_value((6, 7)).map(String::as_str),
        Some("SUM(H6:H6)")
    );
}

#[test]
fn test_duplicate_names_and_placeholder_removed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path_template = write_template(dir.path(), "simple.xlsx");
    let l_sheets: Vec<SpecSheetInput> = ["A", "A", "A"]
        .iter()
        .map(|name| SpecSheetInput {
            name: Some(name.to_string()),
            items: Some(Vec::new()),
            ..Default::default()
        })
        .collect();

    let (v_bytes, _) = export_xlsx(
        &path_template,
        "simple",
        &l_sheets,
        &SpecXlsxExportOptions::default(),
        &create_fetcher(),
        &SpecCancelToken::new(),
    )
    .expect("export");
    let workbook = read_back(v_bytes);
    assert_eq!(
        workbook.sheet_names(),
        vec!["A".to_string(), "A(1)".to_string(), "A(2)".to_string()]
    );
}

#[test]
fn test_quote_discount_over_emitted_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path_template = dir.path().join("quote.xlsx");
    write_quote_template(&path_template).expect("quote template");
    let l_sheets = vec![SpecSheetInput {
        name: Some("报价单".to_string()),
        items: Some(vec![
            create_row(&[("品名", "大班台".into()), ("总价", 20282.0.into())]),
            create_row(&[("品名", "文件柜".into()), ("总价", 32148.0.into())]),
        ]),
        ..Default::default()
    }];

    let (v_bytes, report) = export_xlsx(
        &path_template,
        "quote",
        &l_sheets,
        &SpecXlsxExportOptions::default(),
        &create_fetcher(),
        &SpecCancelToken::new(),
    )
    .expect("export");
    assert!(!report.sheets[0].if_example_data);

    let mut workbook = read_back(v_bytes);
    assert_eq!(
        read_cell(&mut workbook, "报价单", (1, 0)),
        Data::String("报价单".to_string())
    );
    assert_eq!(
        read_cell(&mut workbook, "报价单", (6, 0)),
        Data::String("大班台".to_string())
    );
    assert_eq!(
        read_cell(&mut workbook, "报价单", (8, 8)),
        Data::Float(52430.0)
    );
    assert_eq!(
        read_cell(&mut workbook, "报价单", (9, 8)),
        Data::Float(52430.0 * 0.7)
    );
}

#[test]
fn test_not_found_image_does_not_abort() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path_template = write_template(dir.path(), "budget.xlsx");
    let l_sheets = vec![SpecSheetInput {
        items: Some(Vec::new()),
        aux: SpecSheetAux {
            logo_url: Some(spawn_not_found_server()),
            ..Default::default()
        },
        ..Default::default()
    }];

    let (v_bytes, report) = export_xlsx(
        &path_template,
        "budget",
        &l_sheets,
        &SpecXlsxExportOptions::default(),
        &create_fetcher(),
        &SpecCancelToken::new(),
    )
    .expect("export survives the failed image");
    assert!(report.sheets[0].images.is_empty());
    assert_eq!(report.warning_count(), 1);
    assert_eq!(read_back(v_bytes).sheet_names(), vec!["Sheet1".to_string()]);
}

#[test]
fn test_missing_template_is_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = export_xlsx(
        &dir.path().join("excel/nope.xlsx"),
        "nope",
        &[SpecSheetInput::default()],
        &SpecXlsxExportOptions::default(),
        &create_fetcher(),
        &SpecCancelToken::new(),
    )
    .expect_err("missing template");
    assert!(matches!(err, ExportError::TemplateNotFound(_)));
    assert_eq!(err.code(), 404);
}
