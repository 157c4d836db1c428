// Estructuras de datos principales del pipeline de reportes

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Una fila normalizada de ventas: tienda, producto y cantidad vendida.
///
/// La cantidad nunca es negativa; los valores inválidos o vacíos llegan aquí
/// ya convertidos a cero (ver `decode::columns::coerce_quantity`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub store: String,
    pub product: String,
    pub quantity: f64,
}

impl SalesRecord {
    pub fn new(store: impl Into<String>, product: impl Into<String>, quantity: f64) -> Self {
        SalesRecord {
            store: store.into(),
            product: product.into(),
            quantity,
        }
    }
}

/// Filas de un único archivo fuente, en el orden original.
pub type NormalizedTable = Vec<SalesRecord>;

/// Concatenación de todas las tablas normalizadas en orden de subida.
/// Nunca se deduplica antes de agregar.
pub type CombinedTable = Vec<SalesRecord>;

/// Nombre canónico de producto -> unidades (粒) por paquete.
/// El orden de inserción es el orden de matching: la primera clave que
/// coincide gana.
pub type ProductCatalog = IndexMap<String, u32>;

/// tienda -> (producto canónico -> cantidad sumada)
pub type StoreProductAggregate = IndexMap<String, IndexMap<String, f64>>;

/// Archivo subido por el operador: nombre (con extensión) y bytes crudos.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        SourceFile {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Extensión en minúsculas, sin el punto.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }
}

/// Error por archivo que se muestra al operador sin abortar el lote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileError {
    pub file_name: String,
    pub reason: String,
}

/// Valor de celda tal como lo ve la inferencia de layout.
/// Toda la lógica de escaneo trabaja sobre este enum, nunca sobre tipos de la librería.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Texto que contiene `marker` (los números y celdas vacías nunca coinciden).
    pub fn contains(&self, marker: &str) -> bool {
        !marker.is_empty() && self.as_text().is_some_and(|t| t.contains(marker))
    }
}

/// Resultado completo de una generación de reporte.
#[derive(Debug, Clone)]
pub struct ReportOutput {
    /// Workbook final serializado (xlsx)
    pub workbook: Vec<u8>,
    pub file_name: String,
    pub file_errors: Vec<FileError>,
    /// Avisos de inferencia de layout (filas/etiquetas no encontradas)
    pub warnings: Vec<String>,
    pub cells_written: usize,
    pub total_records: usize,
}
