use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cvfit::analysis::provider::MistralProvider;
use cvfit::config::{AppConfig, ProviderConfig};
use cvfit::extraction::ocr::RasterOcrStage;
use cvfit::extraction::ExtractionBackend;
use cvfit::routes::build_router;
use cvfit::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={level},{}={level}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_CRATE_NAME"),
                level = &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV analyzer API v{}", env!("CARGO_PKG_VERSION"));
    info!(
        backend = ?config.extraction_backend,
        ocr_language = %config.ocr_language,
        default_model = MistralProvider::default_model(),
        "Extraction backend selected"
    );

    if config.extraction_backend == ExtractionBackend::Local && !RasterOcrStage::is_available() {
        warn!("pdftoppm/tesseract not found, scanned CVs will fail the local chain");
    }

    // The credential is read per request; only report its absence here.
    if let Err(e) = ProviderConfig::from_env() {
        warn!("{e}");
    }

    let state = AppState::new(config.clone());

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
