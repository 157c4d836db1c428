// Biblioteca raíz del crate `posreport`.
// Reexporta los módulos principales y el punto de entrada `generate_report`,
// que orquesta decodificación, agregación y escritura de la plantilla.
pub mod aggregate;
pub mod config;
pub mod decode;
pub mod error;
pub mod excel;
pub mod models;
pub mod pipeline;
pub mod server;
mod server_handlers;

pub use config::ReportConfig;
pub use error::{ConfigError, DecodeError, ReportError, TemplateError};
pub use models::{FileError, ReportOutput, SalesRecord, SourceFile};
pub use pipeline::{generate_report, TemplateSource};

/// Ejecuta el servidor HTTP (reexport para facilitar uso desde `main`)
pub use server::run_server;
