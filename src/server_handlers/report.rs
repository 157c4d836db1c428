use actix_multipart::Multipart;
use actix_web::http::header::{Charset, ContentDisposition, DispositionParam, DispositionType, ExtendedValue};
use actix_web::{web, HttpResponse, Responder};
use futures_util::stream::StreamExt;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::models::{FileError, SourceFile};
use crate::pipeline::{decode_and_combine, generate_report, preview, TemplateSource, PREVIEW_ROWS};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Partes de un formulario de reporte ya leídas en memoria.
#[derive(Debug, Default)]
pub struct ReportUpload {
    pub template: Option<Vec<u8>>,
    pub sources: Vec<SourceFile>,
    pub config_json: Option<String>,
}

impl ReportUpload {
    /// Configuración del servidor con el JSON del formulario encima.
    pub fn resolve_config(&self, base: &ReportConfig) -> Result<ReportConfig, String> {
        match self.config_json.as_deref().map(str::trim) {
            Some(json) if !json.is_empty() => base.merged_with_json(json).map_err(|e| e.to_string()),
            _ => Ok(base.clone()),
        }
    }
}

/// Lee todas las partes. `template` y `config` son únicas; cualquier otro
/// archivo cuenta como fuente, en el orden de subida.
pub async fn read_upload(mut payload: Multipart) -> Result<ReportUpload, String> {
    let mut upload = ReportUpload::default();
    while let Some(field_res) = payload.next().await {
        let mut field = field_res.map_err(|e| format!("multipart field error: {}", e))?;
        let disposition = field.content_disposition();
        let part_name = disposition.get_name().unwrap_or("").to_string();
        let filename = disposition
            .get_filename()
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("upload-{}.dat", chrono::Utc::now().timestamp_millis()));

        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| format!("upload stream error: {}", e))?;
            bytes.extend_from_slice(&chunk);
        }

        match part_name.as_str() {
            "template" if !bytes.is_empty() => upload.template = Some(bytes),
            "template" => {}
            "config" => {
                upload.config_json = Some(String::from_utf8(bytes).map_err(|_| "config part is not UTF-8".to_string())?)
            }
            _ => upload.sources.push(SourceFile::new(filename, bytes)),
        }
    }
    Ok(upload)
}

fn attachment(name: &str) -> ContentDisposition {
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::FilenameExt(ExtendedValue {
            charset: Charset::Ext("UTF-8".to_string()),
            language_tag: None,
            value: name.as_bytes().to_vec(),
        })],
    }
}

/// Detalle de los archivos saltados como JSON percent-encoded, apto para
/// una cabecera HTTP. `None` si no hubo errores.
pub fn file_errors_header(errors: &[FileError]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }
    let json = serde_json::to_string(errors).ok()?;
    Some(utf8_percent_encode(&json, NON_ALPHANUMERIC).to_string())
}

fn report_error_response(e: ReportError) -> HttpResponse {
    match e {
        ReportError::NoData { file_errors } => HttpResponse::UnprocessableEntity().json(json!({
            "error": "no usable sales records",
            "file_errors": file_errors,
        })),
        ReportError::Config(e) => HttpResponse::BadRequest().json(json!({"error": e.to_string()})),
        ReportError::Template(e) => HttpResponse::InternalServerError().json(json!({"error": e.to_string()})),
    }
}

/// POST /report: multipart -> libro xlsx rellenado.
pub async fn report_handler(config: web::Data<ReportConfig>, payload: Multipart) -> impl Responder {
    let upload = match read_upload(payload).await {
        Ok(u) => u,
        Err(e) => return HttpResponse::BadRequest().json(json!({"error": e})),
    };
    if upload.sources.is_empty() {
        return HttpResponse::BadRequest().json(json!({"error": "at least one source file is required"}));
    }
    let run_config = match upload.resolve_config(&config) {
        Ok(c) => c,
        Err(e) => return HttpResponse::BadRequest().json(json!({"error": format!("invalid config: {}", e)})),
    };

    let template = upload.template.map(TemplateSource::Bytes).unwrap_or_default();
    let sources = upload.sources;
    info!(sources = sources.len(), "report requested");

    let result = web::block(move || generate_report(template, &sources, &run_config)).await;
    match result {
        Ok(Ok(output)) => {
            let mut response = HttpResponse::Ok();
            response
                .content_type(XLSX_MIME)
                .insert_header(attachment(&output.file_name))
                .insert_header(("X-Report-File-Errors", output.file_errors.len().to_string()))
                .insert_header(("X-Report-Warnings", output.warnings.len().to_string()));
            if let Some(details) = file_errors_header(&output.file_errors) {
                response.insert_header(("X-Report-File-Error-Details", details));
            }
            response.body(output.workbook)
        }
        Ok(Err(e)) => {
            warn!(error = %e, "report failed");
            report_error_response(e)
        }
        Err(e) => {
            error!(error = %e, "report worker failed");
            HttpResponse::InternalServerError().json(json!({"error": format!("worker error: {}", e)}))
        }
    }
}

/// POST /report/preview: decodifica y combina sin tocar la plantilla.
pub async fn preview_handler(config: web::Data<ReportConfig>, payload: Multipart) -> impl Responder {
    let upload = match read_upload(payload).await {
        Ok(u) => u,
        Err(e) => return HttpResponse::BadRequest().json(json!({"error": e})),
    };
    let run_config = match upload.resolve_config(&config) {
        Ok(c) => c,
        Err(e) => return HttpResponse::BadRequest().json(json!({"error": format!("invalid config: {}", e)})),
    };
    let sources = upload.sources;

    match web::block(move || decode_and_combine(&sources, &run_config)).await {
        Ok((combined, file_errors)) => HttpResponse::Ok().json(json!({
            "records": preview(&combined, PREVIEW_ROWS),
            "file_errors": file_errors,
            "total_records": combined.len(),
        })),
        Err(e) => HttpResponse::InternalServerError().json(json!({"error": format!("worker error: {}", e)})),
    }
}

/// GET /catalog: catálogo activo en el orden del formulario.
pub async fn catalog_handler(config: web::Data<ReportConfig>) -> impl Responder {
    let products: Vec<serde_json::Value> = config
        .catalog
        .iter()
        .map(|(name, units)| json!({"product": name, "units_per_pack": units}))
        .collect();
    HttpResponse::Ok().json(json!({"catalog": products}))
}
