use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{MediaFormat, MediaInfo};
use crate::config::Config;

/// Longitud máxima del título usado como nombre de archivo
const MAX_TITLE_CHARS: usize = 100;

/// Caracteres no válidos en nombres de archivo
const FORBIDDEN_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("format {0} not found")]
    FormatNotFound(String),

    #[error("format {0} has no usable fetch URL")]
    MissingUrl(String),

    #[error("remote server answered {0}")]
    RemoteStatus(u16),

    #[error("remote server did not answer within {0:?}")]
    Timeout(Duration),

    #[error("remote fetch failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Respuesta remota lista para reenviarse al cliente
#[derive(Debug)]
pub struct RelayedDownload {
    pub filename: String,
    pub content_type: Option<HeaderValue>,
    pub content_length: Option<HeaderValue>,
    response: reqwest::Response,
}

impl RelayedDownload {
    /// Cuerpo remoto como stream incremental; al soltarlo se cierra la conexión.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, reqwest::Error>> + Send {
        let filename = self.filename;
        self.response.bytes_stream().inspect(move |chunk| {
            if let Err(e) = chunk {
                warn!("❌ Stream interrumpido para {}: {}", filename, e);
            }
        })
    }
}

/// Cliente que reenvía el contenido de un formato ya resuelto
#[derive(Debug, Clone)]
pub struct DownloadRelay {
    client: reqwest::Client,
    response_timeout: Duration,
}

impl DownloadRelay {
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.relay_connect_timeout)
            .tcp_keepalive(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            response_timeout: config.relay_response_timeout,
        })
    }

    /// Abre el stream remoto del formato `format_id`.
    ///
    /// Si el formato no existe no se hace ninguna petición saliente.
    pub async fn open(
        &self,
        format_id: &str,
        info: &MediaInfo,
    ) -> Result<RelayedDownload, RelayError> {
        let format = info
            .find_format(format_id)
            .ok_or_else(|| RelayError::FormatNotFound(format_id.to_string()))?;

        let fetch_url = fetch_url(format)?;
        debug!(
            "📥 Relay de {} ({}) desde {}",
            format.format_id,
            format.ext,
            fetch_url.host_str().unwrap_or("?")
        );

        let request = self.client.get(fetch_url).send();
        let response = tokio::time::timeout(self.response_timeout, request)
            .await
            .map_err(|_| RelayError::Timeout(self.response_timeout))??;

        let status = response.status();
        if !status.is_success() {
            warn!(
                "❌ El servidor remoto respondió {} para el formato {}",
                status, format_id
            );
            return Err(RelayError::RemoteStatus(status.as_u16()));
        }

        let filename = download_filename(&info.title, &format.ext);
        info!("⬇️ Iniciando relay: {}", filename);

        Ok(RelayedDownload {
            content_type: response.headers().get(CONTENT_TYPE).cloned(),
            content_length: response.headers().get(CONTENT_LENGTH).cloned(),
            filename,
            response,
        })
    }
}

fn fetch_url(format: &MediaFormat) -> Result<url::Url, RelayError> {
    let raw = format
        .fetch_url()
        .ok_or_else(|| RelayError::MissingUrl(format.format_id.clone()))?;

    url::Url::parse(raw)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .ok_or_else(|| RelayError::MissingUrl(format.format_id.clone()))
}

/// Trunca el título a 100 caracteres y reemplaza los caracteres prohibidos
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .take(MAX_TITLE_CHARS)
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

pub fn download_filename(title: &str, ext: &str) -> String {
    format!("{}.{}", sanitize_title(title), ext)
}

/// Valor de `Content-Disposition` con `filename*` para títulos no ASCII
pub fn content_disposition(filename: &str) -> HeaderValue {
    let visible: String = filename.chars().filter(|c| !c.is_control()).collect();
    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        visible,
        urlencoding::encode(&visible)
    );

    HeaderValue::from_bytes(value.as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
