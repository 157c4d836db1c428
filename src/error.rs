//! Taxonomía de errores del pipeline.
//!
//! Los errores de decodificación son por archivo y nunca abortan el lote;
//! los errores de plantilla abortan sólo la etapa de escritura.

use thiserror::Error;

use crate::models::FileError;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("file is empty")]
    Empty,

    #[error("bytes are not valid {strategy}")]
    InvalidEncoding { strategy: &'static str },

    #[error("header line not found within the first {scanned} lines (tried {strategy}); preview: {preview:?}")]
    NoHeaderLine {
        strategy: String,
        scanned: usize,
        preview: String,
    },

    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("column mapping failed: {0}")]
    ColumnMapping(String),

    #[error("failed to parse delimited text: {0}")]
    Csv(#[from] csv::Error),
}

impl DecodeError {
    pub fn into_file_error(self, file_name: &str) -> FileError {
        FileError {
            file_name: file_name.to_string(),
            reason: self.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open template workbook: {0}")]
    Open(String),

    #[error("template workbook has no worksheet")]
    NoWorksheet,

    #[error("failed to serialize workbook: {0}")]
    Save(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no usable sales records ({} file(s) failed to decode)", file_errors.len())]
    NoData { file_errors: Vec<FileError> },
}
