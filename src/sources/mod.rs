pub mod normalize;
pub mod pacing;
pub mod ytdlp;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub use normalize::normalize_url;
pub use ytdlp::YtDlpExtractor;

/// Fragmentos con los que YouTube señala la detección de bots
const BOT_BLOCK_MARKERS: &[&str] = &["Sign in to confirm", "confirm you're not a bot"];

/// Trait común para los extractores de metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Resuelve una URL a su metadata y lista de formatos sin descargar nada
    async fn extract(&self, url: &str) -> Result<RawMedia, ExtractError>;

    /// Nombre del extractor
    fn name(&self) -> &'static str;
}

/// Salida del extractor tal como la entrega yt-dlp (`--dump-json`).
///
/// Los formatos se conservan como JSON crudo; el selector los interpreta
/// uno por uno.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMedia {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub duration_string: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default, deserialize_with = "crate::media::lenient_u64")]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub formats: Vec<Value>,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    /// Fallo reportado por el propio extractor (stderr de yt-dlp)
    #[error("{0}")]
    Failed(String),

    #[error("extractor returned no result")]
    NoResult,

    #[error("extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not run extractor: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("could not parse extractor output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("extractor worker failed: {0}")]
    Worker(String),
}

impl ExtractError {
    /// Un fallo cuyo mensaje indica bloqueo por detección de bots
    pub fn is_bot_block(&self) -> bool {
        match self {
            Self::Failed(message) => BOT_BLOCK_MARKERS.iter().any(|m| message.contains(m)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_detection_is_recognized_only_on_failures() {
        let blocked = ExtractError::Failed(
            "ERROR: [youtube] abc: Sign in to confirm you're not a bot".to_string(),
        );
        assert!(blocked.is_bot_block());
        assert!(!ExtractError::Failed("ERROR: Video unavailable".to_string()).is_bot_block());
        assert!(!ExtractError::NoResult.is_bot_block());
    }

    #[test]
    fn raw_media_tolerates_nulls_and_unknown_fields() {
        let raw: RawMedia = serde_json::from_str(
            r#"{"title": "T", "thumbnail": null, "view_count": 12.0, "extractor": "youtube", "formats": [{}]}"#,
        )
        .expect("raw");
        assert_eq!(raw.title.as_deref(), Some("T"));
        assert_eq!(raw.view_count, Some(12));
        assert_eq!(raw.formats.len(), 1);
    }
}
