use regex::Regex;
use std::sync::LazyLock;

/// URLs de video de YouTube (watch, shorts, youtu.be, music y móvil)
static VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?((www|m|music)\.)?(youtube\.com/(watch|shorts/)|youtu\.be/)")
        .expect("video URL pattern is valid")
});

/// Marcadores de lista, radio e índice, en orden de prioridad
const PLAYLIST_MARKERS: &[&str] = &["list=", "start_radio=", "index="];

/// Quita de una URL de video los fragmentos de playlist/radio/índice.
///
/// La URL se corta en la primera aparición de cada marcador (precedido de
/// `&` o `?`). Las URLs que no son de video se devuelven sin cambios.
pub fn normalize_url(url: &str) -> String {
    if !VIDEO_URL.is_match(url) {
        return url.to_string();
    }

    let mut normalized = url;
    for marker in PLAYLIST_MARKERS {
        if let Some(cut) = find_marker(normalized, marker) {
            normalized = &normalized[..cut];
        }
    }
    normalized.to_string()
}

/// Posición del separador que introduce `marker`, si existe
fn find_marker(url: &str, marker: &str) -> Option<usize> {
    url.match_indices(marker)
        .map(|(index, _)| index)
        .find(|&index| index > 0 && matches!(url.as_bytes()[index - 1], b'&' | b'?'))
        .map(|index| index - 1)
}
