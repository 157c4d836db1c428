// --- Generador de reportes de ventas POS - Archivo principal ---

use posreport::{run_server, ReportConfig};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ReportConfig::from_env().unwrap_or_else(|e| {
        warn!(error = %e, "invalid report config, falling back to defaults");
        ReportConfig::default()
    });
    let bind = ReportConfig::bind_addr();
    run_server(&bind, config).await
}
