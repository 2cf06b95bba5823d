//! # Media Module
//!
//! Domain types republished by the API and the two operations built on them:
//!
//! - [`selector`]: turns the extractor's raw format list into combined
//!   video+audio candidates and a single best audio-only format
//! - [`relay`]: streams a chosen format's bytes back to the caller
//!
//! [`MediaInfo`] is what `/api/info` returns and what the metadata cache
//! stores by value.

pub mod relay;
pub mod selector;

use serde::{Deserialize, Deserializer, Serialize};

use crate::sources::RawMedia;

/// Título usado cuando el extractor no reporta ninguno
const FALLBACK_TITLE: &str = "video";

/// One encoding offered by the extractor.
///
/// Only `format_id` and `ext` are required; an entry without them is treated
/// as malformed and skipped by the selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFormat {
    pub format_id: String,
    pub ext: String,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub fps: Option<f64>,
    /// Audio bitrate in kbit/s
    #[serde(default)]
    pub abr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub filesize: Option<u64>,
    /// Direct fetch URL; never sent to API clients
    #[serde(default, skip_serializing)]
    pub url: Option<String>,
}

impl MediaFormat {
    /// URL de descarga recortada, si existe y no está vacía
    pub fn fetch_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }

    pub fn has_url(&self) -> bool {
        self.fetch_url().is_some()
    }
}

/// Metadata response for a single video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaInfo {
    pub title: String,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub duration_string: Option<String>,
    pub channel: Option<String>,
    pub upload_date: Option<String>,
    pub view_count: Option<u64>,
    pub video_formats: Vec<MediaFormat>,
    pub best_audio: Option<MediaFormat>,
    pub original_url: String,
    /// Todos los formatos bien formados, para el relay de descargas
    #[serde(skip)]
    pub formats: Vec<MediaFormat>,
}

impl MediaInfo {
    /// Construye la respuesta a partir de la salida del extractor.
    ///
    /// Devuelve `None` cuando no queda ningún formato utilizable.
    pub fn from_raw(raw: RawMedia, original_url: &str) -> Option<Self> {
        let selection = selector::select(&raw.formats);
        if selection.formats.is_empty() {
            return None;
        }

        let duration_string = raw
            .duration_string
            .or_else(|| raw.duration.map(format_duration));

        Some(Self {
            title: raw
                .title
                .filter(|title| !title.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_TITLE.to_string()),
            thumbnail: raw.thumbnail,
            duration: raw.duration,
            duration_string,
            channel: raw.channel.or(raw.uploader),
            upload_date: raw.upload_date,
            view_count: raw.view_count,
            video_formats: selection.video_formats,
            best_audio: selection.best_audio,
            original_url: original_url.to_string(),
            formats: selection.formats,
        })
    }

    /// Busca un formato conocido por su identificador exacto
    pub fn find_format(&self, format_id: &str) -> Option<&MediaFormat> {
        self.formats.iter().find(|f| f.format_id == format_id)
    }
}

/// yt-dlp a veces reporta tamaños y contadores como flotantes
pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = Option::<serde_json::Number>::deserialize(deserializer)?;
    Ok(number.and_then(|n| n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))))
}

/// Formatea segundos como `H:MM:SS` o `M:SS`
fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}
