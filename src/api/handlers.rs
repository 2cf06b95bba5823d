use axum::{
    body::Body,
    extract::{Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{AppError, AppState};
use crate::media::{
    relay::{content_disposition, RelayedDownload},
    MediaInfo,
};
use crate::sources::normalize_url;

#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub url: String,
    pub format_id: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache_size: usize,
    pub last_requests: usize,
    pub timestamp: f64,
}

pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "API Sobaixa está funcionando".to_string(),
    })
}

pub async fn info(
    State(state): State<AppState>,
    Query(query): Query<InfoQuery>,
) -> Result<Json<MediaInfo>, AppError> {
    let url = normalize_url(&query.url);
    state.limiter.admit(&url).await;

    if let Some(cached) = state.cache.get(&url) {
        debug!("✅ Cache hit para: {}", url);
        return Ok(Json(cached));
    }
    debug!("❌ Cache miss para: {}", url);

    let info = state.resolve(&url).await?;
    state.cache.insert(url, info.clone());
    Ok(Json(info))
}

pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    let url = normalize_url(&query.url);
    state.limiter.admit(&url).await;

    // La descarga siempre vuelve a resolver: las URLs directas caducan
    let info = state.resolve(&url).await?;
    let download = state.relay.open(&query.format_id, &info).await?;

    info!("⬇️ Relay de {} ({}) iniciado", url, query.format_id);
    Ok(download.into_response())
}

pub async fn clear_cache(State(state): State<AppState>) -> Json<MessageResponse> {
    let (entries, records) = state.clear_all();
    Json(MessageResponse {
        message: format!(
            "Cache limpo com sucesso ({} entradas, {} registros de requisição)",
            entries, records
        ),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cache_size: state.cache.len(),
        last_requests: state.limiter.len(),
        timestamp: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
    })
}

impl IntoResponse for RelayedDownload {
    fn into_response(self) -> Response {
        let mut builder =
            Response::builder().header(CONTENT_DISPOSITION, content_disposition(&self.filename));

        builder = match &self.content_type {
            Some(content_type) => builder.header(CONTENT_TYPE, content_type.clone()),
            None => builder.header(CONTENT_TYPE, "application/octet-stream"),
        };
        if let Some(length) = &self.content_length {
            builder = builder.header(CONTENT_LENGTH, length.clone());
        }

        builder
            .body(Body::from_stream(self.into_stream()))
            .unwrap_or_else(|e| AppError::Internal(e.to_string()).into_response())
    }
}
