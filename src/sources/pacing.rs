use std::time::Duration;
use tracing::debug;

/// User agents de navegadores de escritorio; se elige uno por extracción
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
];

pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Espaciado aleatorio y rotación de user agent antes de cada extracción
#[derive(Debug, Clone)]
pub struct Pacing {
    jitter_min: Duration,
    jitter_max: Duration,
}

impl Pacing {
    pub fn new(jitter_min: Duration, jitter_max: Duration) -> Self {
        Self {
            jitter_min: jitter_min.min(jitter_max),
            jitter_max: jitter_max.max(jitter_min),
        }
    }

    /// Retraso uniforme en `[jitter_min, jitter_max]`
    pub fn jitter(&self) -> Duration {
        let min = self.jitter_min.as_millis() as u64;
        let max = self.jitter_max.as_millis() as u64;
        Duration::from_millis(fastrand::u64(min..=max))
    }

    pub async fn pause(&self) {
        let delay = self.jitter();
        if !delay.is_zero() {
            debug!("💤 Pausa aleatoria de {:?} antes de extraer", delay);
            tokio::time::sleep(delay).await;
        }
    }

    pub fn user_agent(&self) -> &'static str {
        USER_AGENTS[fastrand::usize(..USER_AGENTS.len())]
    }
}
