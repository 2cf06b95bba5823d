use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::media::relay::RelayError;
use crate::sources::ExtractError;

/// Errores de la API; el código HTTP se decide solo aquí
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro do yt-dlp: {0}")]
    Extraction(String),

    #[error("YouTube está limitando o acesso: {0}")]
    BotDetected(String),

    #[error("{0}")]
    NotFound(String),

    #[error("O servidor remoto respondeu {0}")]
    RemoteFetch(u16),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Extraction(_) => StatusCode::BAD_REQUEST,
            Self::BotDetected(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RemoteFetch(code) => {
                StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        if err.is_bot_block() {
            return Self::BotDetected(err.to_string());
        }
        match err {
            ExtractError::Failed(message) => Self::Extraction(message),
            ExtractError::NoResult => Self::NotFound("Vídeo não encontrado.".to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::FormatNotFound(_) => Self::NotFound("Formato não encontrado.".to_string()),
            RelayError::MissingUrl(_) => {
                Self::NotFound("Formato sem URL de download disponível.".to_string())
            }
            RelayError::RemoteStatus(code) => Self::RemoteFetch(code),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("💥 {} - {}", status, self);
        } else {
            warn!("⚠️ {} - {}", status, self);
        }

        (status, Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    #[test]
    fn extraction_failures_map_to_client_errors() {
        let generic: AppError = ExtractError::Failed("ERROR: Unsupported URL".into()).into();
        assert_eq!(generic.status(), StatusCode::BAD_REQUEST);

        let blocked: AppError =
            ExtractError::Failed("Sign in to confirm you're not a bot".into()).into();
        assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

        let empty: AppError = ExtractError::NoResult.into();
        assert_eq!(empty.status(), StatusCode::NOT_FOUND);

        let timeout: AppError = ExtractError::Timeout(std::time::Duration::from_secs(1)).into();
        assert_eq!(timeout.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn relay_failures_map_to_statuses() {
        let missing: AppError = RelayError::FormatNotFound("22".into()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let remote: AppError = RelayError::RemoteStatus(403).into();
        assert_eq!(remote.status(), StatusCode::FORBIDDEN);

        assert_eq!(AppError::RemoteFetch(42).status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn error_body_uses_detail_field() {
        let response = AppError::NotFound("missing".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let parsed: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(parsed["detail"], "missing");
    }
}
