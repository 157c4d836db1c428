//! Módulo `excel` dividido en submódulos para mantener el código organizado.
//!
//! Submódulos:
//! - `io`: lectura de libros nativos (calamine) y de celdas de la plantilla
//! - `merge`: regiones combinadas y escritura segura sobre la celda ancla
//! - `layout`: inferencia del layout de la plantilla por texto
//! - `writer`: relleno de filas de tienda, totales y resumen

/// Helpers de IO y utilidades para parsing de Excel
pub mod io;

/// Celdas combinadas: `MergeMap`, `SheetWriter`
pub mod merge;

/// Inferencia del layout: `infer_layout`
pub mod layout;

/// Escritura de resultados: `fill_template`
pub mod writer;

pub use io::{data_to_string, read_cell, read_native_rows, NativeFormat};
pub use layout::{infer_layout, PackRow, StoreBlock, TemplateLayout};
pub use merge::{MergeMap, MergedRegion, SheetWriter};
pub use writer::{fill_template, fill_worksheet, FillReport};
