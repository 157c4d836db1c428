//! Celdas combinadas y escritura segura.
//!
//! Una región combinada sólo guarda valor en su celda ancla (arriba a la
//! izquierda). Toda escritura dentro de la región se redirige al ancla, así
//! nunca falla y el valor siempre queda visible.

use umya_spreadsheet::{Range, Worksheet};

use crate::excel::io::read_cell;
use crate::models::CellValue;

/// Región combinada, coordenadas 1-based inclusivas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedRegion {
    pub first_row: u32,
    pub first_col: u32,
    pub last_row: u32,
    pub last_col: u32,
}

impl MergedRegion {
    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.first_row..=self.last_row).contains(&row) && (self.first_col..=self.last_col).contains(&col)
    }

    pub fn anchor(&self) -> (u32, u32) {
        (self.first_row, self.first_col)
    }
}

fn region_of(range: &Range) -> Option<MergedRegion> {
    let first_col = *range.get_coordinate_start_col()?.get_num();
    let first_row = *range.get_coordinate_start_row()?.get_num();
    let last_col = range.get_coordinate_end_col().map(|c| *c.get_num()).unwrap_or(first_col);
    let last_row = range.get_coordinate_end_row().map(|r| *r.get_num()).unwrap_or(first_row);
    Some(MergedRegion {
        first_row: first_row.min(last_row),
        first_col: first_col.min(last_col),
        last_row: first_row.max(last_row),
        last_col: first_col.max(last_col),
    })
}

#[derive(Debug, Clone, Default)]
pub struct MergeMap {
    regions: Vec<MergedRegion>,
}

impl MergeMap {
    pub fn new(regions: Vec<MergedRegion>) -> Self {
        MergeMap { regions }
    }

    /// Regiones de la hoja. Rangos sin fila o sin columna (A:A, 3:3) se ignoran.
    pub fn from_worksheet(ws: &Worksheet) -> Self {
        let regions = ws.get_merge_cells().iter().filter_map(region_of).collect();
        MergeMap { regions }
    }

    pub fn regions(&self) -> &[MergedRegion] {
        &self.regions
    }

    pub fn region_at(&self, row: u32, col: u32) -> Option<&MergedRegion> {
        self.regions.iter().find(|r| r.contains(row, col))
    }

    /// Celda que realmente recibe un valor escrito en (row, col).
    pub fn anchor_of(&self, row: u32, col: u32) -> (u32, u32) {
        self.region_at(row, col).map(|r| r.anchor()).unwrap_or((row, col))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Envoltura de la hoja que aplica el contrato de escritura segura.
pub struct SheetWriter<'a> {
    ws: &'a mut Worksheet,
    merges: MergeMap,
    cells_written: usize,
}

impl<'a> SheetWriter<'a> {
    pub fn new(ws: &'a mut Worksheet, merges: MergeMap) -> Self {
        SheetWriter { ws, merges, cells_written: 0 }
    }

    pub fn merges(&self) -> &MergeMap {
        &self.merges
    }

    pub fn worksheet(&self) -> &Worksheet {
        &*self.ws
    }

    /// Lee el valor visible de (row, col): dentro de una región es el del ancla.
    pub fn read(&self, row: u32, col: u32) -> CellValue {
        let (r, c) = self.merges.anchor_of(row, col);
        read_cell(&*self.ws, r, c)
    }

    pub fn text(&self, row: u32, col: u32) -> Option<String> {
        self.read(row, col).as_text().map(|s| s.to_string())
    }

    pub fn write_number(&mut self, row: u32, col: u32, value: f64) {
        let (r, c) = self.merges.anchor_of(row, col);
        self.ws.get_cell_mut((c, r)).set_value_number(value);
        self.cells_written += 1;
    }

    pub fn write_blank(&mut self, row: u32, col: u32) {
        let (r, c) = self.merges.anchor_of(row, col);
        self.ws.get_cell_mut((c, r)).set_value_string("");
        self.cells_written += 1;
    }

    pub fn cells_written(&self) -> usize {
        self.cells_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(first_row: u32, first_col: u32, last_row: u32, last_col: u32) -> MergedRegion {
        MergedRegion { first_row, first_col, last_row, last_col }
    }

    #[test]
    fn reads_regions_from_worksheet() {
        let mut book = umya_spreadsheet::new_file();
        let ws = book.get_sheet_mut(&0).unwrap();
        ws.add_merge_cells("B2:D4");
        ws.add_merge_cells("$A$10:$B$10");
        let map = MergeMap::from_worksheet(ws);
        assert_eq!(map.regions(), &[region(2, 2, 4, 4), region(10, 1, 10, 2)]);
    }

    #[test]
    fn anchor_redirect() {
        let map = MergeMap::new(vec![region(5, 3, 6, 5)]);
        assert_eq!(map.anchor_of(6, 4), (5, 3));
        assert_eq!(map.anchor_of(5, 3), (5, 3));
        assert_eq!(map.anchor_of(7, 4), (7, 4));
    }

    #[test]
    fn blank_write_clears_anchor() {
        let mut book = umya_spreadsheet::new_file();
        let ws = book.get_sheet_mut(&0).unwrap();
        ws.add_merge_cells("A1:B1");
        ws.get_cell_mut((1, 1)).set_value_number(7.0);
        let merges = MergeMap::from_worksheet(ws);
        let mut sheet = SheetWriter::new(ws, merges);
        sheet.write_blank(1, 2);
        assert_eq!(sheet.read(1, 1), CellValue::Empty);
        assert_eq!(sheet.cells_written(), 1);
    }
}
