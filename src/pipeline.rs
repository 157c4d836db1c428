//! Punto de entrada del pipeline: decodificar lote -> combinar -> agregar ->
//! rellenar plantilla -> serializar.

use std::path::PathBuf;
use tracing::{info, warn};

use crate::aggregate::{aggregate, combine};
use crate::config::ReportConfig;
use crate::decode::decode_all;
use crate::error::{ReportError, TemplateError};
use crate::excel::writer::fill_template;
use crate::models::{CombinedTable, FileError, ReportOutput, SalesRecord, SourceFile};

/// Filas de la vista previa por defecto.
pub const PREVIEW_ROWS: usize = 10;

/// De dónde sale la plantilla de una ejecución.
#[derive(Debug, Clone, Default)]
pub enum TemplateSource {
    /// `config.template_path`
    #[default]
    Default,
    Path(PathBuf),
    /// Plantilla subida por el operador
    Bytes(Vec<u8>),
}

/// Lee los bytes de la plantilla. Cada ejecución trabaja sobre su propia copia.
pub fn load_template_bytes(source: TemplateSource, config: &ReportConfig) -> Result<Vec<u8>, TemplateError> {
    match source {
        TemplateSource::Bytes(bytes) => Ok(bytes),
        TemplateSource::Path(path) => Ok(std::fs::read(path)?),
        TemplateSource::Default => {
            info!(path = %config.template_path.display(), "using default template");
            Ok(std::fs::read(&config.template_path)?)
        }
    }
}

/// Decodifica todas las fuentes y concatena las que tuvieron éxito.
pub fn decode_and_combine(sources: &[SourceFile], config: &ReportConfig) -> (CombinedTable, Vec<FileError>) {
    let (tables, file_errors) = decode_all(sources, config);
    let combined = combine(tables);
    info!(
        files = sources.len(),
        failed = file_errors.len(),
        records = combined.len(),
        "sources combined"
    );
    (combined, file_errors)
}

/// Primeras `n` filas de la tabla combinada.
pub fn preview(combined: &CombinedTable, n: usize) -> Vec<SalesRecord> {
    combined.iter().take(n).cloned().collect()
}

/// Genera el libro final. Los archivos que no se pueden decodificar se
/// saltan y se informan en `file_errors`; si ninguno aporta registros se
/// devuelve `ReportError::NoData` y no se toca la plantilla.
pub fn generate_report(
    template: TemplateSource,
    sources: &[SourceFile],
    config: &ReportConfig,
) -> Result<ReportOutput, ReportError> {
    let (combined, file_errors) = decode_and_combine(sources, config);
    if combined.is_empty() {
        warn!(failed = file_errors.len(), "nothing to write");
        return Err(ReportError::NoData { file_errors });
    }

    let aggregated = aggregate(&combined, &config.catalog);
    let template_bytes = load_template_bytes(template, config)?;
    let (workbook, fill) = fill_template(&template_bytes, &aggregated, &combined, config)?;

    info!(
        bytes = workbook.len(),
        cells = fill.cells_written,
        warnings = fill.warnings.len(),
        "report generated"
    );
    Ok(ReportOutput {
        workbook,
        file_name: config.output_file_name.clone(),
        file_errors,
        warnings: fill.warnings,
        cells_written: fill.cells_written,
        total_records: combined.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_sources_failing_is_no_data() {
        let sources = vec![
            SourceFile::new("a.csv", Vec::new()),
            SourceFile::new("b.csv", b"nothing useful here".to_vec()),
        ];
        let err = generate_report(TemplateSource::Bytes(Vec::new()), &sources, &ReportConfig::default()).unwrap_err();
        match err {
            ReportError::NoData { file_errors } => assert_eq!(file_errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn preview_truncates() {
        let combined: CombinedTable = (0..15).map(|i| SalesRecord::new(format!("S{i}"), "特幼", 1.0)).collect();
        assert_eq!(preview(&combined, PREVIEW_ROWS).len(), 10);
        assert_eq!(preview(&combined, 50).len(), 15);
    }

    #[test]
    fn missing_default_template_is_io_error() {
        let config = ReportConfig { template_path: PathBuf::from("/nonexistent/plantilla.xlsx"), ..ReportConfig::default() };
        assert!(matches!(load_template_bytes(TemplateSource::Default, &config), Err(TemplateError::Io(_))));
    }
}
