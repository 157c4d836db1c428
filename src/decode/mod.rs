//! Módulo `decode`: bytes subidos -> tabla normalizada (tienda, producto, cantidad).
//!
//! Submódulos:
//! - `text`: estrategias de decodificación, reparación de mojibake y búsqueda de encabezado
//! - `columns`: mapeo de columnas, conversión de cantidades y limpieza

pub mod columns;
pub mod text;

pub use columns::{coerce_quantity, map_columns, normalize_rows, ColumnMap, RawTable};
pub use text::{repair_mojibake, DecodeStrategy};

use tracing::{info, warn};

use crate::config::ReportConfig;
use crate::decode::columns::label_matches;
use crate::error::DecodeError;
use crate::excel::io::{read_native_rows, NativeFormat};
use crate::models::{FileError, NormalizedTable, SourceFile};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Rama de lectura según extensión (o contenido si la extensión no ayuda).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Native(NativeFormat),
    Text,
}

pub fn detect_kind(file: &SourceFile) -> SourceKind {
    match file.extension().as_deref() {
        Some("xlsx") | Some("xlsm") => SourceKind::Native(NativeFormat::Xlsx),
        Some("xls") => SourceKind::Native(NativeFormat::Xls),
        Some("csv") | Some("txt") | Some("tsv") => SourceKind::Text,
        _ if file.bytes.starts_with(ZIP_MAGIC) => SourceKind::Native(NativeFormat::Xlsx),
        _ if file.bytes.starts_with(OLE_MAGIC) => SourceKind::Native(NativeFormat::Xls),
        _ => SourceKind::Text,
    }
}

/// Primera fila (dentro de la ventana) con tienda y cantidad; si no hay, la fila 0.
fn native_table(rows: Vec<Vec<String>>, config: &ReportConfig) -> RawTable {
    let markers = &config.markers;
    let header_idx = rows
        .iter()
        .take(config.header_scan_lines)
        .position(|row| {
            row.iter().any(|c| label_matches(c, &markers.store)) && row.iter().any(|c| label_matches(c, &markers.quantity))
        })
        .unwrap_or(0);

    let mut iter = rows.into_iter().skip(header_idx);
    let headers = iter.next().unwrap_or_default();
    RawTable { headers, rows: iter.collect() }
}

/// Decodifica un archivo fuente. Nunca entra en pánico: todo fallo vuelve
/// como `DecodeError` descriptivo.
pub fn decode_source(file: &SourceFile, config: &ReportConfig) -> Result<NormalizedTable, DecodeError> {
    if file.bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let table = match detect_kind(file) {
        SourceKind::Native(format) => {
            let rows = read_native_rows(&file.bytes, format)?;
            native_table(rows, config)
        }
        SourceKind::Text => {
            let (table, strategy) = text::decode_text_table(&file.bytes, config)?;
            info!(file = %file.name, %strategy, "decoded text source");
            table
        }
    };

    let records = normalize_rows(&table, &config.markers)?;
    info!(file = %file.name, records = records.len(), "normalized source");
    Ok(records)
}

/// Decodifica todos los archivos en orden. Los que fallan se saltan y su
/// motivo queda en la lista de errores; el lote nunca se aborta.
pub fn decode_all(files: &[SourceFile], config: &ReportConfig) -> (Vec<NormalizedTable>, Vec<FileError>) {
    let mut tables = Vec::new();
    let mut errors = Vec::new();
    for file in files {
        match decode_source(file, config) {
            Ok(table) => tables.push(table),
            Err(e) => {
                warn!(file = %file.name, error = %e, "skipping source file");
                errors.push(e.into_file_error(&file.name));
            }
        }
    }
    (tables, errors)
}
