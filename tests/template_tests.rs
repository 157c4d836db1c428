use posreport::config::FillStrategy;
use posreport::excel::{fill_worksheet, read_cell, MergeMap, SheetWriter};
use posreport::models::{CellValue, ProductCatalog};
use posreport::{ReportConfig, SalesRecord};

fn sheet_with(cells: &[(u32, u32, &str)]) -> umya_spreadsheet::Spreadsheet {
    let mut book = umya_spreadsheet::new_file();
    let ws = book.get_sheet_mut(&0).unwrap();
    for (row, col, text) in cells {
        ws.get_cell_mut((*col, *row)).set_value_string(*text);
    }
    book
}

fn number(ws: &umya_spreadsheet::Worksheet, row: u32, col: u32) -> Option<f64> {
    read_cell(ws, row, col).as_number()
}

#[test]
fn writes_inside_merged_region_land_on_anchor() {
    let mut book = sheet_with(&[]);
    let ws = book.get_sheet_mut(&0).unwrap();
    ws.add_merge_cells("C5:E6");
    let merges = MergeMap::from_worksheet(ws);
    let mut sheet = SheetWriter::new(ws, merges);

    let mut value = 1.0;
    for row in 5..=6 {
        for col in 3..=5 {
            sheet.write_number(row, col, value);
            assert_eq!(sheet.read(5, 3), CellValue::Number(value));
            assert_eq!(sheet.read(row, col), CellValue::Number(value));
            value += 1.0;
        }
    }
    sheet.write_number(7, 3, 42.0);
    assert_eq!(sheet.cells_written(), 7);
    assert_eq!(number(sheet.worksheet(), 7, 3), Some(42.0));
}

#[test]
fn sequential_fill_follows_combined_order() {
    let mut book = sheet_with(&[
        (1, 1, "店名"),
        (1, 2, "品名"),
        (1, 3, "售量"),
        (2, 1, "北屯店"),
        (2, 2, "特幼"),
        (3, 1, "彰草店"),
        (4, 1, "員林店"),
    ]);
    let ws = book.get_sheet_mut(&0).unwrap();
    ws.get_cell_mut((3, 4)).set_value_number(99.0);

    let combined = vec![
        SalesRecord::new("員林店", "特幼", 3.0),
        SalesRecord::new("北屯店", "特幼", 7.0),
    ];
    let config = ReportConfig { fill_strategy: FillStrategy::SequentialFill, ..ReportConfig::default() };
    let report = fill_worksheet(ws, &Default::default(), &combined, &config);

    assert_eq!(number(ws, 2, 3), Some(3.0));
    assert_eq!(number(ws, 3, 3), Some(7.0));
    // cola agotada: la celda se pone a cero
    assert_eq!(number(ws, 4, 3), Some(0.0));
    // una escritura por fila de tienda
    assert_eq!(report.cells_written, 3);
}

#[test]
fn lookup_fill_leaves_unmatched_rows_untouched() {
    let mut book = sheet_with(&[
        (2, 1, "店名"),
        (2, 2, "品名"),
        (2, 3, "售量"),
        (3, 1, "北屯店"),
        (3, 2, "特幼"),
        (4, 1, "不存在店"),
        (5, 1, "合計"),
    ]);
    let ws = book.get_sheet_mut(&0).unwrap();
    ws.get_cell_mut((3, 4)).set_value_string("舊值");

    let catalog: ProductCatalog = [("特幼".to_string(), 116)].into_iter().collect();
    let config = ReportConfig { catalog: catalog.clone(), ..ReportConfig::default() };
    let combined = vec![SalesRecord::new("北屯店", "特幼", 6.0)];
    let aggregated = posreport::aggregate::aggregate(&combined, &catalog);
    let report = fill_worksheet(ws, &aggregated, &combined, &config);

    assert_eq!(number(ws, 3, 3), Some(6.0));
    assert_eq!(read_cell(ws, 4, 3), CellValue::Text("舊值".to_string()));
    assert_eq!(read_cell(ws, 5, 3), CellValue::Empty);
    assert!(!report.warnings.is_empty());
}

#[test]
fn unit_summary_and_grand_totals() {
    let mut book = sheet_with(&[
        (1, 1, "店名"),
        (1, 2, "品名"),
        (1, 3, "售量"),
        (1, 4, "品名"),
        (1, 5, "售量"),
        (2, 1, "北屯店"),
        (2, 2, "特幼"),
        (2, 4, "普通"),
        (3, 1, "銷售包數"),
        (4, 1, "銷售粒數"),
        (5, 1, "粒數統計"),
        (6, 1, "總粒數"),
        (7, 1, "總包數"),
    ]);
    let ws = book.get_sheet_mut(&0).unwrap();
    ws.add_merge_cells("A7:B7");

    let catalog: ProductCatalog = [("特幼".to_string(), 10), ("普通".to_string(), 0)].into_iter().collect();
    let config = ReportConfig {
        catalog: catalog.clone(),
        unit_summary_exclusions: vec!["普通".to_string()],
        ..ReportConfig::default()
    };
    let combined = vec![SalesRecord::new("北屯店", "特幼", 4.0), SalesRecord::new("北屯店", "普通", 2.0)];
    let aggregated = posreport::aggregate::aggregate(&combined, &catalog);
    let report = fill_worksheet(ws, &aggregated, &combined, &config);

    // fila de paquetes: 粒數 por paquete en la columna de etiqueta, paquetes en la de cantidad
    assert_eq!(number(ws, 3, 2), Some(10.0));
    assert_eq!(number(ws, 3, 3), Some(4.0));
    assert_eq!(number(ws, 4, 3), Some(40.0));
    assert_eq!(number(ws, 3, 4), Some(0.0));
    assert_eq!(number(ws, 3, 5), Some(2.0));
    // per-pack 0: no se escribe total de unidades
    assert_eq!(read_cell(ws, 4, 5), CellValue::Empty);

    assert_eq!(number(ws, 5, 3), Some(40.0));
    assert_eq!(read_cell(ws, 5, 5), CellValue::Empty);

    assert_eq!(number(ws, 6, 2), Some(40.0));
    assert_eq!(number(ws, 7, 3), Some(6.0));
    assert_eq!(report.total_packs(), 6.0);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[test]
fn two_store_triples_fill_and_total_independently() {
    let mut book = sheet_with(&[
        (1, 1, "店名"),
        (1, 2, "品名"),
        (1, 3, "售量"),
        (1, 4, "店名"),
        (1, 5, "品名"),
        (1, 6, "售量"),
        (2, 1, "S1"),
        (2, 2, "特幼"),
        (3, 1, "S2"),
        (2, 4, "S3"),
        (2, 5, "多粒"),
        (3, 4, "S4"),
        (4, 1, "銷售包數"),
        (5, 1, "銷售粒數"),
    ]);
    let ws = book.get_sheet_mut(&0).unwrap();

    let catalog: ProductCatalog = [("特幼".to_string(), 2), ("多粒".to_string(), 3)].into_iter().collect();
    let config = ReportConfig { catalog: catalog.clone(), ..ReportConfig::default() };
    let combined = vec![
        SalesRecord::new("S1", "特幼", 1.0),
        SalesRecord::new("S2", "特幼", 2.0),
        SalesRecord::new("S3", "多粒", 4.0),
        SalesRecord::new("S4", "多粒", 5.0),
    ];
    let aggregated = posreport::aggregate::aggregate(&combined, &catalog);
    let report = fill_worksheet(ws, &aggregated, &combined, &config);

    assert_eq!(number(ws, 2, 3), Some(1.0));
    assert_eq!(number(ws, 3, 3), Some(2.0));
    assert_eq!(number(ws, 2, 6), Some(4.0));
    assert_eq!(number(ws, 3, 6), Some(5.0));

    assert_eq!(number(ws, 4, 2), Some(2.0));
    assert_eq!(number(ws, 4, 3), Some(3.0));
    assert_eq!(number(ws, 5, 3), Some(6.0));
    assert_eq!(number(ws, 4, 5), Some(3.0));
    assert_eq!(number(ws, 4, 6), Some(9.0));
    assert_eq!(number(ws, 5, 6), Some(27.0));

    assert_eq!(report.total_packs(), 12.0);
    assert_eq!(report.total_units(), 33.0);
}
