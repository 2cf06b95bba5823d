//! Format selection over the extractor's raw format list.
//!
//! Two independent passes over the same list: combined video+audio
//! candidates in extractor order, and the single audio-only format with the
//! highest bitrate.

use serde_json::Value;
use tracing::{debug, warn};

use super::MediaFormat;

/// Contenedor que lleva video y audio juntos
pub const COMBINED_CONTAINER: &str = "mp4";

/// Contenedores aceptados para el mejor audio
pub const AUDIO_CONTAINERS: &[&str] = &["m4a", "mp3", "webm", "opus", "ogg"];

/// Valor centinela de yt-dlp para "sin códec"
const NONE_CODEC: &str = "none";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Todos los formatos que se pudieron interpretar
    pub formats: Vec<MediaFormat>,
    pub video_formats: Vec<MediaFormat>,
    pub best_audio: Option<MediaFormat>,
}

pub fn select(raw_formats: &[Value]) -> Selection {
    let formats = parse_formats(raw_formats);
    let video_formats = video_candidates(&formats);
    let best_audio = best_audio(&formats).cloned();

    debug!(
        "🎞️ {} formatos: {} combinados, mejor audio: {}",
        formats.len(),
        video_formats.len(),
        best_audio
            .as_ref()
            .map_or("ninguno".to_string(), |f| f.format_id.clone())
    );

    Selection {
        formats,
        video_formats,
        best_audio,
    }
}

/// Interpreta cada entrada por separado; las mal formadas se descartan
pub fn parse_formats(raw_formats: &[Value]) -> Vec<MediaFormat> {
    raw_formats
        .iter()
        .enumerate()
        .filter_map(
            |(index, raw)| match serde_json::from_value::<MediaFormat>(raw.clone()) {
                Ok(format) => Some(format),
                Err(e) => {
                    warn!("⚠️ Formato #{} descartado: {}", index, e);
                    None
                }
            },
        )
        .collect()
}

pub fn video_candidates(formats: &[MediaFormat]) -> Vec<MediaFormat> {
    formats
        .iter()
        .filter(|f| {
            f.ext == COMBINED_CONTAINER
                && has_codec(f.vcodec.as_deref())
                && has_codec(f.acodec.as_deref())
                && f.has_url()
        })
        .cloned()
        .collect()
}

/// Mayor `abr` entre los formatos solo-audio; ante empate gana el primero.
/// La comparación parte de 0, así que un bitrate ausente o nulo nunca gana.
pub fn best_audio(formats: &[MediaFormat]) -> Option<&MediaFormat> {
    let mut best: Option<&MediaFormat> = None;
    let mut highest = 0.0;

    for format in formats.iter().filter(|f| is_audio_only(f)) {
        let abr = format.abr.unwrap_or(0.0);
        if abr > highest {
            highest = abr;
            best = Some(format);
        }
    }

    best
}

fn is_audio_only(format: &MediaFormat) -> bool {
    AUDIO_CONTAINERS.contains(&format.ext.as_str())
        && has_codec(format.acodec.as_deref())
        && format.vcodec.as_deref() == Some(NONE_CODEC)
        && format.has_url()
}

fn has_codec(codec: Option<&str>) -> bool {
    codec.is_some_and(|c| !c.is_empty() && c != NONE_CODEC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ids(formats: &[MediaFormat]) -> Vec<&str> {
        formats.iter().map(|f| f.format_id.as_str()).collect()
    }

    #[test]
    fn best_audio_picks_highest_bitrate() {
        let selection = select(&[
            json!({"format_id": "139", "ext": "m4a", "acodec": "aac", "vcodec": "none", "abr": 128, "url": "a"}),
            json!({"format_id": "140", "ext": "m4a", "acodec": "aac", "vcodec": "none", "abr": 256, "url": "b"}),
        ]);

        let best = selection.best_audio.expect("best audio");
        assert_eq!(best.abr, Some(256.0));
        assert_eq!(best.url.as_deref(), Some("b"));
    }

    #[test]
    fn best_audio_ties_keep_first_seen() {
        let selection = select(&[
            json!({"format_id": "first", "ext": "m4a", "acodec": "aac", "vcodec": "none", "abr": 160, "url": "a"}),
            json!({"format_id": "second", "ext": "webm", "acodec": "opus", "vcodec": "none", "abr": 160, "url": "b"}),
        ]);
        assert_eq!(selection.best_audio.map(|f| f.format_id), Some("first".to_string()));
    }

    #[test]
    fn missing_bitrate_counts_as_zero() {
        let selection = select(&[
            json!({"format_id": "nobr", "ext": "m4a", "acodec": "aac", "vcodec": "none", "url": "a"}),
            json!({"format_id": "low", "ext": "m4a", "acodec": "aac", "vcodec": "none", "abr": 48, "url": "b"}),
        ]);
        assert_eq!(selection.best_audio.map(|f| f.format_id), Some("low".to_string()));
    }

    #[test]
    fn zero_bitrate_audio_is_never_best() {
        let selection = select(&[
            json!({"format_id": "nobr", "ext": "m4a", "acodec": "aac", "vcodec": "none", "url": "a"}),
        ]);
        assert_eq!(selection.best_audio, None);

        let selection = select(&[
            json!({"format_id": "zero", "ext": "m4a", "acodec": "aac", "vcodec": "none", "abr": 0, "url": "a"}),
        ]);
        assert_eq!(selection.best_audio, None);
    }

    #[test]
    fn best_audio_absent_when_nothing_qualifies() {
        assert_eq!(select(&[]).best_audio, None);

        let selection = select(&[
            // contenedor no permitido
            json!({"format_id": "a", "ext": "flv", "acodec": "aac", "vcodec": "none", "abr": 320, "url": "a"}),
            // tiene video
            json!({"format_id": "b", "ext": "m4a", "acodec": "aac", "vcodec": "avc1", "abr": 320, "url": "b"}),
            // sin audio
            json!({"format_id": "c", "ext": "m4a", "acodec": "none", "vcodec": "none", "url": "c"}),
            // sin URL
            json!({"format_id": "d", "ext": "m4a", "acodec": "aac", "vcodec": "none", "abr": 320}),
        ]);
        assert_eq!(selection.best_audio, None);
        assert_eq!(selection.formats.len(), 4);
    }

    #[test]
    fn video_pass_requires_both_codecs_and_url() {
        let selection = select(&[
            json!({"format_id": "18", "ext": "mp4", "vcodec": "avc1.42001E", "acodec": "mp4a.40.2", "url": "x"}),
            json!({"format_id": "137", "ext": "mp4", "vcodec": "avc1.640028", "acodec": "none", "url": "x"}),
            json!({"format_id": "140", "ext": "mp4", "vcodec": "none", "acodec": "mp4a.40.2", "url": "x"}),
            json!({"format_id": "22", "ext": "mp4", "vcodec": "avc1.64001F", "acodec": "mp4a.40.2"}),
            json!({"format_id": "43", "ext": "webm", "vcodec": "vp8", "acodec": "vorbis", "url": "x"}),
            json!({"format_id": "59", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a", "url": "y"}),
        ]);
        assert_eq!(ids(&selection.video_formats), vec!["18", "59"]);
    }

    #[test]
    fn video_pass_keeps_duplicates_and_order() {
        let selection = select(&[
            json!({"format_id": "b", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a", "url": "x"}),
            json!({"format_id": "a", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a", "url": "x"}),
            json!({"format_id": "b", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a", "url": "x"}),
        ]);
        assert_eq!(ids(&selection.video_formats), vec!["b", "a", "b"]);
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let selection = select(&[
            json!("not an object"),
            json!({"ext": "mp4", "vcodec": "avc1", "acodec": "mp4a", "url": "x"}),
            json!({"format_id": 5, "ext": "mp4"}),
            json!({"format_id": "18", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a", "url": "x", "filesize": 1024.0}),
        ]);
        assert_eq!(ids(&selection.formats), vec!["18"]);
        assert_eq!(selection.video_formats[0].filesize, Some(1024));
    }
}
