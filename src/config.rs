use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Servidor
    pub host: String,
    pub port: u16,
    pub cors_allow_origins: Vec<String>,

    // Caché y throttling
    pub cache_ttl: Duration,
    pub min_request_interval: Duration,
    pub cleanup_interval: Duration,

    // Extractor (yt-dlp)
    pub ytdlp_path: String,
    pub extractor_timeout: Duration,
    pub max_concurrent_extractions: usize,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
    pub cookies_file: Option<PathBuf>,

    // Relay de descargas
    pub relay_connect_timeout: Duration,
    pub relay_response_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Servidor
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()?,
            cors_allow_origins: std::env::var("CORS_ALLOW_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),

            // Caché (5 minutos por defecto)
            cache_ttl: secs_var("CACHE_TTL_SECS", 300)?,
            min_request_interval: secs_var("MIN_REQUEST_INTERVAL_SECS", 3)?,
            cleanup_interval: secs_var("CLEANUP_INTERVAL_SECS", 600)?,

            // Extractor
            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string()),
            extractor_timeout: secs_var("EXTRACTOR_TIMEOUT_SECS", 120)?,
            max_concurrent_extractions: match std::env::var("MAX_CONCURRENT_EXTRACTIONS") {
                Ok(val) if !val.trim().is_empty() => val.parse()?,
                _ => num_cpus::get(),
            },
            jitter_min: millis_var("JITTER_MIN_MS", 500)?,
            jitter_max: millis_var("JITTER_MAX_MS", 1500)?,
            cookies_file: std::env::var("COOKIES_FILE")
                .ok()
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),

            // Relay
            relay_connect_timeout: secs_var("RELAY_CONNECT_TIMEOUT_SECS", 10)?,
            relay_response_timeout: secs_var("RELAY_RESPONSE_TIMEOUT_SECS", 30)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// - The cache TTL must be positive (a zero TTL would never serve a hit)
    /// - The jitter window must be ordered (`min <= max`)
    /// - Extraction permits and timeouts must be non-zero
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl.is_zero() {
            anyhow::bail!("Cache TTL must be greater than 0");
        }

        if self.jitter_min > self.jitter_max {
            anyhow::bail!(
                "Jitter window is inverted: min {:?} > max {:?}",
                self.jitter_min,
                self.jitter_max
            );
        }

        if self.max_concurrent_extractions == 0 {
            anyhow::bail!("Max concurrent extractions must be greater than 0");
        }

        if self.extractor_timeout.is_zero() {
            anyhow::bail!("Extractor timeout must be greater than 0");
        }

        if self.relay_connect_timeout.is_zero() || self.relay_response_timeout.is_zero() {
            anyhow::bail!("Relay timeouts must be greater than 0");
        }

        if self.cors_allow_origins.is_empty() {
            anyhow::bail!("CORS_ALLOW_ORIGINS must list at least one origin (use * for any)");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Server: {}:{} (CORS: {})\n  \
            Cache: TTL {}, cleanup every {}\n  \
            Throttle: {} between requests for the same URL\n  \
            Extractor: {} ({} workers, timeout {}, jitter {}-{}, cookies: {})\n  \
            Relay: connect {}, response {}",
            self.host,
            self.port,
            self.cors_allow_origins.join(","),
            humantime::format_duration(self.cache_ttl),
            humantime::format_duration(self.cleanup_interval),
            humantime::format_duration(self.min_request_interval),
            self.ytdlp_path,
            self.max_concurrent_extractions,
            humantime::format_duration(self.extractor_timeout),
            humantime::format_duration(self.jitter_min),
            humantime::format_duration(self.jitter_max),
            self.cookies_file
                .as_ref()
                .map_or("auto".to_string(), |path| path.display().to_string()),
            humantime::format_duration(self.relay_connect_timeout),
            humantime::format_duration(self.relay_response_timeout),
        )
    }
}

fn secs_var(name: &str, default: u64) -> Result<Duration> {
    let secs = std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()?;
    Ok(Duration::from_secs(secs))
}

fn millis_var(name: &str, default: u64) -> Result<Duration> {
    let millis = std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()?;
    Ok(Duration::from_millis(millis))
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allow_origins: vec!["*".to_string()],

            cache_ttl: Duration::from_secs(300),
            min_request_interval: Duration::from_secs(3),
            cleanup_interval: Duration::from_secs(600),

            ytdlp_path: "yt-dlp".to_string(),
            extractor_timeout: Duration::from_secs(120),
            max_concurrent_extractions: num_cpus::get(),
            jitter_min: Duration::from_millis(500),
            jitter_max: Duration::from_millis(1500),
            cookies_file: None,

            relay_connect_timeout: Duration::from_secs(10),
            relay_response_timeout: Duration::from_secs(30),
        }
    }
}
