use actix_web::{web, App, HttpServer};
use tracing::info;

use crate::config::ReportConfig;
use crate::server_handlers::{catalog_handler, help_handler, preview_handler, report_handler};

pub async fn run_server(bind_addr: &str, config: ReportConfig) -> std::io::Result<()> {
    let config = web::Data::new(config);
    info!(bind = bind_addr, template = %config.template_path.display(), "starting report server");
    HttpServer::new(move || {
        App::new()
            .app_data(config.clone())
            .route("/report", web::post().to(report_handler))
            .route("/report/preview", web::post().to(preview_handler))
            .route("/catalog", web::get().to(catalog_handler))
            .route("/help", web::get().to(help_handler))
    })
    .bind(bind_addr)?
    .run()
    .await
}
