pub mod api; // HTTP session controller
pub mod config;
pub mod core_state; // Transport-agnostic session state
pub mod models;
pub mod pipeline; // Extraction, field rules, templates

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Start the session server and block until Ctrl-C.
pub fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = config::Settings::from_env();
    tracing::info!(
        addr = %settings.addr,
        merge_mode = settings.merge_mode.as_str(),
        max_upload_bytes = settings.max_upload_bytes,
        "Settings loaded"
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {e}");
            return;
        }
    };

    runtime.block_on(serve(settings));
}

async fn serve(settings: config::Settings) {
    let addr = settings.addr;
    let core = Arc::new(core_state::CoreState::new(settings));

    let mut server = match api::start_server(core, addr).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("{e}");
            return;
        }
    };
    tracing::info!(addr = %server.info.addr, "Open http://{}/api/health to check the server", server.info.addr);

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
    }

    server.shutdown();
    server.wait().await;
}
