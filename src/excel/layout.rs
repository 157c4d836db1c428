//! Inferencia del layout de la plantilla.
//!
//! Nada está en coordenadas fijas: la fila de encabezado, los bloques
//! repetidos (店名 | 品名 | 售量), las filas 銷售包數 / 銷售粒數, la fila
//! 粒數統計 y las celdas de total general se encuentran buscando texto.
//! Lo que no se encuentra queda como aviso, no como error.

use tracing::{debug, warn};
use umya_spreadsheet::Worksheet;

use crate::config::{BlockLayout, ReportConfig};
use crate::excel::io::read_cell;
use crate::excel::merge::MergeMap;

/// Bloque de tres columnas: tienda, etiqueta de producto, cantidad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreBlock {
    pub store_col: u32,
    pub product_col: u32,
    pub quantity_col: u32,
}

/// Fila 銷售包數 y, si está justo debajo, su fila 銷售粒數.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackRow {
    pub row: u32,
    pub unit_row: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateLayout {
    pub header_row: Option<u32>,
    /// Columna 店名 principal (la primera); donde viven las etiquetas de resumen
    pub primary_store_col: u32,
    pub blocks: Vec<StoreBlock>,
    pub pack_rows: Vec<PackRow>,
    pub unit_summary_row: Option<u32>,
    /// Celdas destino (fila, columna) del total general de 粒數
    pub grand_total_units: Vec<(u32, u32)>,
    /// Celdas destino (fila, columna) del total general de 包數
    pub grand_total_packs: Vec<(u32, u32)>,
    pub max_row: u32,
    pub max_col: u32,
    pub warnings: Vec<String>,
}

impl TemplateLayout {
    /// Primera fila que puede contener datos de tienda.
    pub fn first_data_row(&self) -> u32 {
        self.header_row.map(|h| h + 1).unwrap_or(1)
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

fn text_at(ws: &Worksheet, row: u32, col: u32) -> Option<String> {
    read_cell(ws, row, col).as_text().map(|s| s.to_string())
}

fn contains(ws: &Worksheet, row: u32, col: u32, marker: &str) -> bool {
    read_cell(ws, row, col).contains(marker)
}

/// Dimensiones usadas, incluyendo regiones combinadas que sobresalen.
fn sheet_bounds(ws: &Worksheet, merges: &MergeMap) -> (u32, u32) {
    let (max_col, max_row) = ws.get_highest_column_and_row();
    let merged_row = merges.regions().iter().map(|r| r.last_row).max().unwrap_or(0);
    let merged_col = merges.regions().iter().map(|r| r.last_col).max().unwrap_or(0);
    (max_row.max(merged_row), max_col.max(merged_col))
}

fn find_header(ws: &Worksheet, config: &ReportConfig, max_col: u32, max_row: u32) -> Option<(u32, u32)> {
    let last = config.template_header_scan_rows.min(max_row);
    for row in 1..=last {
        for col in 1..=max_col {
            if contains(ws, row, col, &config.markers.store) {
                return Some((row, col));
            }
        }
    }
    None
}

fn discover_blocks(ws: &Worksheet, config: &ReportConfig, header: u32, primary: u32, max_col: u32) -> Vec<StoreBlock> {
    let markers = &config.markers;
    let store_cols: Vec<u32> = (1..=max_col).filter(|c| contains(ws, header, *c, &markers.store)).collect();

    let triples: Vec<StoreBlock> = store_cols
        .iter()
        .map(|&c| StoreBlock { store_col: c, product_col: c + 1, quantity_col: c + 2 })
        .collect();

    let pairs: Vec<StoreBlock> = (1..max_col)
        .filter(|c| contains(ws, header, *c, &markers.product) && contains(ws, header, c + 1, &markers.quantity))
        .map(|c| {
            let store_col = store_cols.iter().copied().filter(|s| *s < c).max().unwrap_or(primary);
            StoreBlock { store_col, product_col: c, quantity_col: c + 1 }
        })
        .collect();

    let mut blocks = match config.block_layout {
        BlockLayout::StoreTriples => triples,
        BlockLayout::ProductPairs => pairs,
        BlockLayout::Auto => {
            let mut all = triples;
            for pair in pairs {
                if !all.iter().any(|b| b.product_col == pair.product_col || b.quantity_col == pair.quantity_col) {
                    all.push(pair);
                }
            }
            all
        }
    };
    blocks.sort_by_key(|b| b.product_col);
    blocks
}

/// Destino de un total general: la celda a la derecha de la etiqueta, o la
/// columna siguiente al borde derecho si la etiqueta está combinada.
fn grand_total_target(merges: &MergeMap, row: u32, col: u32) -> (u32, u32) {
    match merges.region_at(row, col) {
        Some(region) => (region.first_row, region.last_col + 1),
        None => (row, col + 1),
    }
}

pub fn infer_layout(ws: &Worksheet, merges: &MergeMap, config: &ReportConfig) -> TemplateLayout {
    let markers = &config.markers;
    let (max_row, max_col) = sheet_bounds(ws, merges);
    let mut layout = TemplateLayout { max_row, max_col, primary_store_col: 1, ..TemplateLayout::default() };

    match find_header(ws, config, max_col, max_row) {
        Some((row, col)) => {
            layout.header_row = Some(row);
            layout.primary_store_col = col;
            layout.blocks = discover_blocks(ws, config, row, col, max_col);
            if layout.blocks.is_empty() {
                layout.warn(format!("header row {} has no store/product/quantity blocks", row));
            }
        }
        None => layout.warn(format!(
            "no cell containing '{}' in the first {} rows; store rows will not be filled",
            markers.store, config.template_header_scan_rows
        )),
    }

    let primary = layout.primary_store_col;
    for row in layout.first_data_row()..=max_row {
        if contains(ws, row, primary, &markers.pack_count) {
            let unit_row = (row < max_row && contains(ws, row + 1, primary, &markers.unit_count)).then_some(row + 1);
            if unit_row.is_none() {
                layout.warn(format!("pack-count row {} has no '{}' row below it", row, markers.unit_count));
            }
            layout.pack_rows.push(PackRow { row, unit_row });
        }
    }
    if layout.pack_rows.is_empty() {
        layout.warn(format!("no '{}' row found in column {}", markers.pack_count, primary));
    }

    layout.unit_summary_row =
        (1..=max_row).find(|&row| (1..=max_col).any(|col| contains(ws, row, col, &markers.unit_summary)));

    for row in 1..=max_row {
        for col in 1..=max_col {
            let Some(text) = text_at(ws, row, col) else { continue };
            if !markers.grand_total_units.is_empty() && text.contains(markers.grand_total_units.as_str()) {
                layout.grand_total_units.push(grand_total_target(merges, row, col));
            }
            if !markers.grand_total_packs.is_empty() && text.contains(markers.grand_total_packs.as_str()) {
                layout.grand_total_packs.push(grand_total_target(merges, row, col));
            }
        }
    }

    debug!(
        header_row = ?layout.header_row,
        blocks = layout.blocks.len(),
        pack_rows = layout.pack_rows.len(),
        unit_summary_row = ?layout.unit_summary_row,
        "template layout inferred"
    );
    layout
}
