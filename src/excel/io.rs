use calamine::{open_workbook_from_rs, Data, Reader, Xls, Xlsx};
use std::io::Cursor;
use umya_spreadsheet::Worksheet;

use crate::error::DecodeError;
use crate::models::CellValue;

/// Convierte un `Data` de calamine a String (celdas de archivos fuente)
pub fn data_to_string(d: &Data) -> String {
    match d {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if (f.floor() - f).abs() < f64::EPSILON {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => if *b { "1".to_string() } else { "0".to_string() },
        Data::Empty => String::new(),
        Data::Error(_) => String::new(),
        Data::DateTime(s) => s.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Workbook nativo de origen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeFormat {
    Xlsx,
    Xls,
}

/// Lee la primera hoja de un workbook en memoria como `Vec<Vec<String>>`.
pub fn read_native_rows(bytes: &[u8], format: NativeFormat) -> Result<Vec<Vec<String>>, DecodeError> {
    let cursor = Cursor::new(bytes.to_vec());
    match format {
        NativeFormat::Xlsx => {
            let workbook: Xlsx<_> = open_workbook_from_rs(cursor)
                .map_err(|e| DecodeError::Spreadsheet(format!("xlsx: {}", e)))?;
            first_sheet_rows(workbook)
        }
        NativeFormat::Xls => {
            let workbook: Xls<_> = open_workbook_from_rs(cursor)
                .map_err(|e| DecodeError::Spreadsheet(format!("xls: {}", e)))?;
            first_sheet_rows(workbook)
        }
    }
}

fn first_sheet_rows<R>(mut workbook: R) -> Result<Vec<Vec<String>>, DecodeError>
where
    R: Reader<Cursor<Vec<u8>>>,
    R::Error: std::fmt::Display,
{
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DecodeError::Spreadsheet("workbook has no sheets".to_string()))?
        .map_err(|e| DecodeError::Spreadsheet(e.to_string()))?;

    let rows = range
        .rows()
        .map(|r| r.iter().map(data_to_string).collect())
        .collect();
    Ok(rows)
}

/// Lee una celda de la plantilla (coordenadas 1-based, fila primero).
pub fn read_cell(ws: &Worksheet, row: u32, col: u32) -> CellValue {
    // umya usa (columna, fila)
    match ws.get_cell((col, row)) {
        None => CellValue::Empty,
        Some(cell) => {
            if let Some(n) = cell.get_value_number() {
                return CellValue::Number(n);
            }
            let value = cell.get_value();
            let trimmed = value.trim();
            if trimmed.is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(trimmed.to_string())
            }
        }
    }
}
