//! # API Module
//!
//! HTTP surface of the proxy (axum):
//!
//! | Method | Path                | Handler                     |
//! |--------|---------------------|-----------------------------|
//! | GET    | `/`                 | liveness marker             |
//! | GET    | `/api/info`         | metadata (cached)           |
//! | GET    | `/api/download`     | streamed format relay       |
//! | POST   | `/api/clear-cache`  | drops cache and throttle    |
//! | GET    | `/api/health`       | cache/throttle counters     |
//!
//! Handlers receive the shared services through [`AppState`]; nothing is
//! global. Every failure becomes an [`AppError`] and is mapped to a status
//! code in one place.

pub mod error;
pub mod handlers;

use anyhow::Result;
use axum::{
    http::{header::CONTENT_DISPOSITION, HeaderValue},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info};

use crate::cache::MetadataCache;
use crate::config::Config;
use crate::media::{relay::DownloadRelay, MediaInfo};
use crate::sources::Extractor;
use crate::throttle::RateLimiter;

pub use error::AppError;

/// Servicios compartidos por todos los handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: MetadataCache,
    pub limiter: RateLimiter,
    pub extractor: Arc<dyn Extractor>,
    pub relay: DownloadRelay,
}

impl AppState {
    pub fn new(config: &Config, extractor: Arc<dyn Extractor>, relay: DownloadRelay) -> Self {
        Self {
            cache: MetadataCache::new(config.cache_ttl),
            limiter: RateLimiter::new(config.min_request_interval),
            extractor,
            relay,
        }
    }

    /// Extrae y arma la metadata de una URL ya normalizada (sin caché)
    pub async fn resolve(&self, url: &str) -> Result<MediaInfo, AppError> {
        let raw = self.extractor.extract(url).await?;
        debug!("🔎 {} resolvió {}", self.extractor.name(), url);

        MediaInfo::from_raw(raw, url).ok_or_else(|| {
            AppError::NotFound("Nenhum formato disponível para este vídeo.".to_string())
        })
    }

    /// Vacía caché y throttle en un solo paso.
    ///
    /// El registro del throttle se limpia con el lock del caché tomado, así
    /// ninguna petición ve uno vacío y el otro todavía lleno.
    pub fn clear_all(&self) -> (usize, usize) {
        let mut throttle_cleared = 0;
        let cache_cleared = self
            .cache
            .clear_with(|| throttle_cleared = self.limiter.clear());

        info!(
            "🧹 Caché limpiado: {} entradas, {} registros de throttle",
            cache_cleared, throttle_cleared
        );
        (cache_cleared, throttle_cleared)
    }
}

pub fn router(state: AppState, config: &Config) -> Result<Router> {
    let app = Router::new()
        .route("/", get(handlers::root))
        .route("/api/info", get(handlers::info))
        .route("/api/download", get(handlers::download))
        .route("/api/clear-cache", post(handlers::clear_cache))
        .route("/api/health", get(handlers::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_allow_origins)?);

    Ok(app)
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed = origins
            .iter()
            .map(|origin| HeaderValue::from_str(origin))
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(parsed)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([CONTENT_DISPOSITION]))
}
