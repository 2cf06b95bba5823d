use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod api;
mod cache;
mod config;
mod media;
mod sources;
mod throttle;

use crate::api::AppState;
use crate::config::Config;
use crate::media::relay::DownloadRelay;
use crate::sources::YtDlpExtractor;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sobaixa=debug".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!("🎬 Iniciando Sobaixa API v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;

    let extractor = Arc::new(YtDlpExtractor::new(&config));

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        extractor.verify().await?;
        println!("OK");
        return Ok(());
    }

    info!("{}", config.summary());

    if let Err(e) = extractor.verify().await {
        error!("❌ {} - las extracciones fallarán hasta instalar yt-dlp", e);
    }

    let relay = DownloadRelay::new(&config)?;
    let state = AppState::new(&config, extractor, relay);

    let shutdown = CancellationToken::new();
    state
        .cache
        .spawn_housekeeping(config.cleanup_interval, shutdown.clone());

    let app = api::router(state, &config)?;
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("🚀 API lista en http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("👋 Servidor detenido");
    Ok(())
}

/// Espera Ctrl+C o SIGTERM y cancela las tareas de fondo
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Error al registrar SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("⚠️ Señal de shutdown recibida, cerrando...");
    shutdown.cancel();
}
