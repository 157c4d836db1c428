//! Escritura de resultados sobre la plantilla.
//!
//! Sólo se sobreescriben celdas de datos concretas; estilos, combinaciones y
//! fórmulas del resto de la hoja se conservan. Toda escritura pasa por
//! `SheetWriter`, que redirige a la celda ancla de las regiones combinadas.

use indexmap::IndexMap;
use std::collections::HashSet;
use std::io::Cursor;
use tracing::{debug, info, warn};
use umya_spreadsheet::Worksheet;

use crate::aggregate::{fuzzy_match_key, product_queues};
use crate::config::{FillStrategy, ReportConfig};
use crate::error::TemplateError;
use crate::excel::io::read_cell;
use crate::excel::layout::{infer_layout, PackRow, TemplateLayout};
use crate::excel::merge::{MergeMap, SheetWriter};
use crate::models::{CellValue, CombinedTable, StoreProductAggregate};

/// Resumen de una escritura.
#[derive(Debug, Clone, Default)]
pub struct FillReport {
    pub cells_written: usize,
    pub warnings: Vec<String>,
    /// Total de paquetes por producto canónico (suma de todas las filas 銷售包數)
    pub packs_by_product: IndexMap<String, f64>,
    /// Total de unidades por producto canónico
    pub units_by_product: IndexMap<String, f64>,
}

impl FillReport {
    pub fn total_packs(&self) -> f64 {
        self.packs_by_product.values().sum()
    }

    pub fn total_units(&self) -> f64 {
        self.units_by_product.values().sum()
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Texto de la etiqueta de tienda (los números se aceptan como nombres).
fn store_label(value: CellValue) -> Option<String> {
    match value {
        CellValue::Text(s) => Some(s),
        CellValue::Number(n) => Some(n.to_string()),
        CellValue::Empty => None,
    }
}

/// Paso 3: filas de tienda. Por nombre de tienda o por cola secuencial.
fn fill_store_rows(
    sheet: &mut SheetWriter<'_>,
    layout: &TemplateLayout,
    aggregate: &StoreProductAggregate,
    combined: &CombinedTable,
    config: &ReportConfig,
) {
    if layout.header_row.is_none() {
        return;
    }
    let catalog = &config.catalog;
    let mut queues = match config.fill_strategy {
        FillStrategy::SequentialFill => Some(product_queues(combined, catalog)),
        FillStrategy::LookupByStore => None,
    };

    for block in &layout.blocks {
        let mut current_product: Option<String> = None;
        for row in layout.first_data_row()..=layout.max_row {
            let Some(store) = store_label(sheet.read(row, block.store_col)) else { continue };
            if config.markers.is_summary_label(&store) {
                continue;
            }
            if let Some(label) = sheet.text(row, block.product_col) {
                current_product = Some(label);
            }
            let Some(product) = current_product.as_deref() else { continue };
            let key = fuzzy_match_key(product, catalog).unwrap_or(product).to_string();

            match queues.as_mut() {
                Some(queues) => {
                    // cola agotada o producto sin datos: la celda queda en cero
                    let value = queues.get_mut(&key).and_then(|q| q.pop_front()).unwrap_or(0.0);
                    sheet.write_number(row, block.quantity_col, value);
                }
                None => {
                    let quantity = aggregate
                        .get(&store)
                        .and_then(|products| products.get(&key))
                        .copied()
                        .unwrap_or(0.0);
                    if quantity > 0.0 {
                        sheet.write_number(row, block.quantity_col, quantity);
                    }
                }
            }
        }
    }
}

/// Busca hacia arriba (hasta `lookback` filas) una etiqueta que coincida con el catálogo.
fn product_above(sheet: &SheetWriter<'_>, pack_row: u32, col: u32, config: &ReportConfig) -> Option<String> {
    let lowest = pack_row.saturating_sub(config.product_lookback_rows).max(1);
    (lowest..pack_row).rev().find_map(|row| {
        let text = sheet.text(row, col)?;
        if config.markers.is_summary_label(&text) {
            return None;
        }
        fuzzy_match_key(&text, &config.catalog).map(|k| k.to_string())
    })
}

/// Suma los números de `col` entre la primera fila de datos y `pack_row`,
/// saltando filas de resumen. Es el recálculo autoritativo.
fn column_total(ws: &Worksheet, layout: &TemplateLayout, col: u32, pack_row: u32, config: &ReportConfig) -> f64 {
    (layout.first_data_row()..pack_row)
        .filter(|&row| {
            read_cell(ws, row, layout.primary_store_col)
                .as_text()
                .is_none_or(|label| !config.markers.is_summary_label(label))
        })
        .filter_map(|row| read_cell(ws, row, col).as_number())
        .sum()
}

/// Paso 4: por cada fila 銷售包數 identifica los grupos de producto y escribe
/// 粒數 por paquete, total de paquetes y total de unidades.
fn fill_pack_row(
    sheet: &mut SheetWriter<'_>,
    layout: &TemplateLayout,
    pack: PackRow,
    config: &ReportConfig,
    product_columns: &mut Vec<(u32, String)>,
    report: &mut FillReport,
) {
    let store_cols: HashSet<u32> = layout
        .blocks
        .iter()
        .map(|b| b.store_col)
        .chain([layout.primary_store_col])
        .collect();
    let mut consumed: HashSet<u32> = HashSet::new();
    let mut identified = 0usize;

    for col in 1..layout.max_col {
        if store_cols.contains(&col) || consumed.contains(&col) {
            continue;
        }
        let Some(key) = product_above(sheet, pack.row, col, config) else { continue };
        let quantity_col = col + 1;
        consumed.insert(quantity_col);

        let per_pack = config.catalog.get(&key).copied().unwrap_or(0);
        sheet.write_number(pack.row, col, f64::from(per_pack));

        let packs = column_total(sheet.worksheet(), layout, quantity_col, pack.row, config);
        sheet.write_number(pack.row, quantity_col, packs);

        let units = packs * f64::from(per_pack);
        if let Some(unit_row) = pack.unit_row {
            if per_pack > 0 {
                sheet.write_number(unit_row, quantity_col, units);
            }
        }

        debug!(row = pack.row, product = %key, packs, units, "pack totals");
        *report.packs_by_product.entry(key.clone()).or_insert(0.0) += packs;
        *report.units_by_product.entry(key.clone()).or_insert(0.0) += units;
        if !product_columns.iter().any(|(c, _)| *c == quantity_col) {
            product_columns.push((quantity_col, key));
        }
        identified += 1;
    }

    if identified == 0 {
        report.warn(format!("pack-count row {} has no product label within {} rows above", pack.row, config.product_lookback_rows));
    }
}

/// Paso 5: fila 粒數統計, una celda por columna de cantidad identificada.
fn fill_unit_summary(
    sheet: &mut SheetWriter<'_>,
    layout: &TemplateLayout,
    product_columns: &[(u32, String)],
    config: &ReportConfig,
    report: &mut FillReport,
) {
    let Some(row) = layout.unit_summary_row else {
        if !product_columns.is_empty() {
            report.warn(format!("no '{}' row found; per-product unit totals not written", config.markers.unit_summary));
        }
        return;
    };
    for (col, key) in product_columns {
        if config.unit_summary_exclusions.iter().any(|e| e == key) {
            sheet.write_blank(row, *col);
        } else {
            let units = report.units_by_product.get(key).copied().unwrap_or(0.0);
            sheet.write_number(row, *col, units);
        }
    }
}

/// Paso 6: totales generales de 粒數 y 包數.
fn fill_grand_totals(sheet: &mut SheetWriter<'_>, layout: &TemplateLayout, config: &ReportConfig, report: &mut FillReport) {
    let (units, packs) = (report.total_units(), report.total_packs());
    for &(row, col) in &layout.grand_total_units {
        sheet.write_number(row, col, units);
    }
    for &(row, col) in &layout.grand_total_packs {
        sheet.write_number(row, col, packs);
    }
    if layout.grand_total_units.is_empty() {
        report.warn(format!("no '{}' cell found; grand total units not written", config.markers.grand_total_units));
    }
    if layout.grand_total_packs.is_empty() {
        report.warn(format!("no '{}' cell found; grand total packs not written", config.markers.grand_total_packs));
    }
}

/// Rellena una hoja ya abierta. Los fallos de inferencia se devuelven como avisos.
pub fn fill_worksheet(
    ws: &mut Worksheet,
    aggregate: &StoreProductAggregate,
    combined: &CombinedTable,
    config: &ReportConfig,
) -> FillReport {
    let merges = MergeMap::from_worksheet(ws);
    let layout = infer_layout(ws, &merges, config);
    let mut report = FillReport { warnings: layout.warnings.clone(), ..FillReport::default() };
    let mut sheet = SheetWriter::new(ws, merges);

    fill_store_rows(&mut sheet, &layout, aggregate, combined, config);

    let mut product_columns: Vec<(u32, String)> = Vec::new();
    for pack in &layout.pack_rows {
        fill_pack_row(&mut sheet, &layout, *pack, config, &mut product_columns, &mut report);
    }
    fill_unit_summary(&mut sheet, &layout, &product_columns, config, &mut report);
    fill_grand_totals(&mut sheet, &layout, config, &mut report);

    report.cells_written = sheet.cells_written();
    info!(cells = report.cells_written, warnings = report.warnings.len(), "template filled");
    report
}

/// Abre una copia propia de la plantilla, la rellena y la serializa.
/// Todo o nada: cualquier error aborta y no se devuelve salida parcial.
pub fn fill_template(
    template: &[u8],
    aggregate: &StoreProductAggregate,
    combined: &CombinedTable,
    config: &ReportConfig,
) -> Result<(Vec<u8>, FillReport), TemplateError> {
    let mut book = umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(template.to_vec()), true)
        .map_err(|e| TemplateError::Open(e.to_string()))?;
    let ws = book.get_sheet_mut(&0).ok_or(TemplateError::NoWorksheet)?;
    let report = fill_worksheet(ws, aggregate, combined, config);

    let mut out = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut out).map_err(|e| TemplateError::Save(e.to_string()))?;
    Ok((out.into_inner(), report))
}
