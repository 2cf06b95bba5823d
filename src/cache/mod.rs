//! # Cache Module
//!
//! In-memory metadata cache for the proxy.
//!
//! Every `/api/info` response is stored by value under its normalized URL and
//! served again while it is younger than the configured TTL (5 minutes by
//! default). A stale entry is never served: the next request re-extracts and
//! overwrites it.
//!
//! ## Features
//!
//! - **TTL Support**: fixed time-to-live measured from insertion
//! - **Thread Safety**: one lock per map, so readers never see partial writes
//! - **Housekeeping**: a background sweep drops expired entries
//!
//! There is no size bound; the cache grows with the number of distinct URLs
//! seen within a cleanup interval.
//!
//! ## Configuration
//!
//! ```env
//! CACHE_TTL_SECS=300          # Time-to-live in seconds
//! CLEANUP_INTERVAL_SECS=600   # Housekeeping sweep period
//! ```

pub mod ttl_cache;

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use ttl_cache::TtlCache;

use crate::media::MediaInfo;

/// Metadata cache keyed by normalized URL.
pub type MetadataCache = TtlCache<String, MediaInfo>;

impl MetadataCache {
    /// Performs cache maintenance by removing expired entries.
    pub fn cleanup_old_entries(&self) -> usize {
        let removed = self.cleanup_expired();
        if removed > 0 {
            info!("🧹 Cache cleanup: removed {} expired entries", removed);
        }
        removed
    }

    /// Lanza la limpieza periódica hasta que se cancele `shutdown`
    pub fn spawn_housekeeping(&self, every: Duration, shutdown: CancellationToken) {
        let cache = self.clone();
        info!(
            "🗄️ Caché iniciado con TTL de {}s, limpieza cada {}s",
            cache.ttl().as_secs(),
            every.as_secs()
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // el primer tick es inmediato
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        cache.cleanup_old_entries();
                    }
                }
            }
        });
    }
}
