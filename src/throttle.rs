//! Per-URL request spacing.
//!
//! [`RateLimiter`] keeps the last admission time for every normalized URL and
//! postpones (never rejects) a request that arrives before the minimum interval
//! has passed. Records live until [`RateLimiter::clear`].

use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    last_seen: Arc<Mutex<HashMap<String, Instant>>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_seen: Arc::new(Mutex::new(HashMap::new())),
            min_interval,
        }
    }

    /// Espera lo necesario para respetar el intervalo mínimo con la petición
    /// anterior para `key` y devuelve el retraso aplicado.
    ///
    /// El turno se reserva bajo el lock antes de dormir, así dos peticiones
    /// simultáneas para la misma clave quedan separadas por `min_interval`.
    pub async fn admit(&self, key: &str) -> Duration {
        let now = Instant::now();
        let proceed_at = {
            let mut last_seen = self.last_seen.lock();
            let proceed_at = match last_seen.get(key) {
                Some(&last) => now.max(last + self.min_interval),
                None => now,
            };
            last_seen.insert(key.to_string(), proceed_at);
            proceed_at
        };

        let delay = proceed_at.saturating_duration_since(now);
        if !delay.is_zero() {
            debug!("⏳ Throttle: esperando {:?} para {}", delay, key);
            tokio::time::sleep_until(proceed_at).await;
        }
        delay
    }

    /// Número de URLs con registro de última petición
    pub fn len(&self) -> usize {
        self.last_seen.lock().len()
    }

    pub fn clear(&self) -> usize {
        let mut last_seen = self.last_seen.lock();
        let removed = last_seen.len();
        last_seen.clear();
        removed
    }
}
