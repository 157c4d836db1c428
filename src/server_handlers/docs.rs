use actix_web::{HttpResponse, Responder};
use serde_json::json;

pub async fn help_handler() -> impl Responder {
    let help = json!({
        "description": "Genera el libro 檳榔銷售統計 a partir de exportaciones POS (csv/txt/xls/xlsx). POST /report recibe multipart y devuelve el xlsx rellenado; POST /report/preview devuelve las primeras filas combinadas.",
        "multipart_parts": {
            "sources": "uno o más archivos de ventas (cualquier parte con archivo que no sea template/config)",
            "template": "opcional: plantilla xlsx; si falta se usa la plantilla por defecto del servidor",
            "config": "opcional: JSON que sobreescribe campos de la configuración"
        },
        "config_example": {
            "catalog": {"特幼": 116, "幼大口": 50},
            "fill_strategy": "lookup_by_store",
            "header_strategy": "search_header_line",
            "unit_summary_exclusions": ["普通"]
        },
        "response_headers": {
            "X-Report-File-Errors": "número de archivos saltados",
            "X-Report-File-Error-Details": "JSON percent-encoded [{file_name, reason}] de los archivos saltados (sólo si hay alguno)",
            "X-Report-Warnings": "número de avisos de layout"
        },
        "note": "Los archivos que no se pueden decodificar se saltan; si ninguno aporta datos la respuesta es 422 con file_errors."
    });

    HttpResponse::Ok().json(help)
}
