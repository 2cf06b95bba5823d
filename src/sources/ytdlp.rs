use async_trait::async_trait;
use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};
use tokio::{process::Command, sync::Semaphore};
use tracing::{debug, error, info, warn};

use super::{
    pacing::{Pacing, ACCEPT_LANGUAGE},
    ExtractError, Extractor, RawMedia,
};
use crate::config::Config;

/// Extractor que delega en el binario de yt-dlp (`--dump-json`)
pub struct YtDlpExtractor {
    binary: String,
    timeout: Duration,
    cookies: Option<PathBuf>,
    pacing: Pacing,
    // Limitar extracciones concurrentes para evitar rate limiting
    permits: Semaphore,
}

impl YtDlpExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: config.ytdlp_path.clone(),
            timeout: config.extractor_timeout,
            cookies: find_cookies_file(config.cookies_file.as_deref()),
            pacing: Pacing::new(config.jitter_min, config.jitter_max),
            permits: Semaphore::new(config.max_concurrent_extractions),
        }
    }

    /// Verifica que yt-dlp esté disponible y devuelve su versión
    pub async fn verify(&self) -> anyhow::Result<String> {
        let output = Command::new(&self.binary).arg("--version").output().await?;

        if !output.status.success() {
            error!("❌ yt-dlp no encontrado. Instala con: pip install yt-dlp");
            anyhow::bail!("yt-dlp no disponible");
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("✅ yt-dlp versión: {}", version);
        Ok(version)
    }

    fn build_args(&self, url: &str, user_agent: &str) -> Vec<String> {
        let mut args: Vec<String> = [
            "--dump-json",
            "--skip-download",
            "--no-playlist",
            "--no-warnings",
            "--socket-timeout",
            "30",
            "--user-agent",
            user_agent,
            "--add-header",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(format!("Accept-Language:{}", ACCEPT_LANGUAGE));

        // Agregar cookies si están disponibles para evitar throttling
        if let Some(cookies) = &self.cookies {
            args.push("--cookies".to_string());
            args.push(cookies.display().to_string());
        }

        // `--` impide que una URL que empiece con '-' se lea como opción
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    async fn extract(&self, url: &str) -> Result<RawMedia, ExtractError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ExtractError::Worker(e.to_string()))?;

        self.pacing.pause().await;

        info!("📊 Obteniendo info de: {}", url);
        let mut cmd = Command::new(&self.binary);
        cmd.args(self.build_args(url, self.pacing.user_agent()))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                warn!("⏰ yt-dlp excedió {:?} para {}", self.timeout, url);
                ExtractError::Timeout(self.timeout)
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("❌ yt-dlp falló para {}: {}", url, stderr);
            return Err(ExtractError::Failed(stderr));
        }

        // El JSON puede pesar varios MB; se interpreta fuera del runtime async
        let stdout = output.stdout;
        tokio::task::spawn_blocking(move || parse_dump(&stdout))
            .await
            .map_err(|e| ExtractError::Worker(e.to_string()))?
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Interpreta la salida de `--dump-json` (un objeto JSON por línea)
pub fn parse_dump(stdout: &[u8]) -> Result<RawMedia, ExtractError> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or(ExtractError::NoResult)?;

    let value: serde_json::Value = serde_json::from_str(line)?;
    if value.is_null() {
        return Err(ExtractError::NoResult);
    }

    let raw: RawMedia = serde_json::from_value(value)?;
    debug!("yt-dlp devolvió {} formatos", raw.formats.len());
    Ok(raw)
}

/// Busca archivo de cookies disponible
fn find_cookies_file(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            info!("🍪 Usando cookies configuradas: {}", path.display());
            return Some(path.to_path_buf());
        }
        warn!("🍪 COOKIES_FILE no existe: {}", path.display());
    }

    let home = std::env::var_os("HOME");
    let found = cookie_candidates(home.as_deref())
        .into_iter()
        .find(|path| path.exists());
    match &found {
        Some(path) => info!("🍪 Cookies encontradas en: {}", path.display()),
        None => debug!("🍪 No se encontraron cookies"),
    }
    found
}

/// Rutas conocidas de cookies; la de `$HOME` solo si la variable existe
fn cookie_candidates(home: Option<&OsStr>) -> Vec<PathBuf> {
    home.filter(|home| !home.is_empty())
        .map(|home| Path::new(home).join(".config/yt-dlp/cookies.txt"))
        .into_iter()
        .chain([
            PathBuf::from("/app/.config/yt-dlp/cookies.txt"),
            PathBuf::from("./cookies.txt"),
        ])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn extractor() -> YtDlpExtractor {
        YtDlpExtractor::new(&Config {
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
            ..Config::default()
        })
    }

    #[test]
    fn parses_single_dump() {
        let dump = br#"{"title": "Clip", "channel": "Chan", "duration": 61.0, "formats": [{"format_id": "18"}]}
"#;
        let raw = parse_dump(dump).expect("raw");
        assert_eq!(raw.title.as_deref(), Some("Clip"));
        assert_eq!(raw.channel.as_deref(), Some("Chan"));
        assert_eq!(raw.formats.len(), 1);
    }

    #[test]
    fn empty_or_null_output_is_no_result() {
        assert!(matches!(parse_dump(b""), Err(ExtractError::NoResult)));
        assert!(matches!(parse_dump(b"\n  \n"), Err(ExtractError::NoResult)));
        assert!(matches!(parse_dump(b"null\n"), Err(ExtractError::NoResult)));
    }

    #[test]
    fn garbage_output_is_a_parse_error() {
        assert!(matches!(parse_dump(b"<html>"), Err(ExtractError::Parse(_))));
    }

    #[test]
    fn url_goes_last_after_separator() {
        let args = extractor().build_args("-https://evil", "UA");
        let n = args.len();
        assert_eq!(args[n - 2], "--");
        assert_eq!(args[n - 1], "-https://evil");
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"UA".to_string()));
        assert!(args.iter().any(|a| a.starts_with("Accept-Language:")));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let extractor = YtDlpExtractor::new(&Config {
            ytdlp_path: "/nonexistent/yt-dlp-binary".to_string(),
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
            ..Config::default()
        });
        let err = extractor.extract("https://youtu.be/X").await.unwrap_err();
        assert!(matches!(err, ExtractError::Spawn(_)));
    }

    #[test]
    fn configured_cookies_file_is_used_when_present() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("cookies.txt");
        std::fs::write(&path, "# Netscape HTTP Cookie File\n").expect("write");

        assert_eq!(find_cookies_file(Some(path.as_path())), Some(path.clone()));

        let args = YtDlpExtractor::new(&Config {
            cookies_file: Some(path.clone()),
            ..Config::default()
        })
        .build_args("https://youtu.be/X", "UA");
        assert!(args.contains(&path.display().to_string()));
    }

    #[test]
    fn home_candidate_only_when_home_is_set() {
        let without_home = cookie_candidates(None);
        assert!(without_home.iter().all(|p| !p.starts_with("/.config")));
        assert_eq!(without_home.len(), 2);

        let with_home = cookie_candidates(Some(OsStr::new("/home/sobaixa")));
        assert_eq!(
            with_home[0],
            PathBuf::from("/home/sobaixa/.config/yt-dlp/cookies.txt")
        );
        assert_eq!(with_home.len(), 3);
    }

    /// Crea un yt-dlp falso con el cuerpo de shell indicado
    #[cfg(unix)]
    fn fake_ytdlp(dir: &TempDir, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod");
        path.display().to_string()
    }

    #[cfg(unix)]
    fn fake_extractor(binary: String, timeout: Duration, permits: usize) -> YtDlpExtractor {
        YtDlpExtractor::new(&Config {
            ytdlp_path: binary,
            extractor_timeout: timeout,
            max_concurrent_extractions: permits,
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
            ..Config::default()
        })
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_extraction_times_out() {
        let dir = TempDir::new().expect("tempdir");
        let binary = fake_ytdlp(&dir, "sleep 5");
        let extractor = fake_extractor(binary, Duration::from_millis(200), 1);

        let started = std::time::Instant::now();
        let err = extractor.extract("https://youtu.be/X").await.unwrap_err();

        assert!(matches!(err, ExtractError::Timeout(t) if t == Duration::from_millis(200)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_extraction_reports_stderr() {
        let dir = TempDir::new().expect("tempdir");
        let binary = fake_ytdlp(
            &dir,
            "echo 'ERROR: Sign in to confirm you are not a bot' >&2; exit 1",
        );
        let extractor = fake_extractor(binary, Duration::from_secs(10), 1);

        let err = extractor.extract("https://youtu.be/X").await.unwrap_err();
        assert!(err.is_bot_block());
        assert!(matches!(err, ExtractError::Failed(msg) if msg.contains("Sign in to confirm")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn single_permit_serializes_extractions() {
        let dir = TempDir::new().expect("tempdir");
        let log = dir.path().join("calls.log");
        let binary = fake_ytdlp(
            &dir,
            &format!(
                "echo start >> '{log}'\nsleep 0.3\necho end >> '{log}'\n\
                 echo '{{\"title\": \"Clip\", \"formats\": []}}'",
                log = log.display()
            ),
        );
        let extractor = Arc::new(fake_extractor(binary, Duration::from_secs(10), 1));

        let (first, second) = tokio::join!(
            extractor.extract("https://youtu.be/A"),
            extractor.extract("https://youtu.be/B"),
        );
        assert_eq!(first.expect("first").title.as_deref(), Some("Clip"));
        assert!(second.is_ok());

        // con un solo permiso los procesos nunca se solapan
        let calls = std::fs::read_to_string(&log).expect("log");
        assert_eq!(
            calls.lines().collect::<Vec<_>>(),
            vec!["start", "end", "start", "end"]
        );
    }
}
