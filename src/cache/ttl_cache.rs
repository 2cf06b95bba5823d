use parking_lot::RwLock;
use std::{collections::HashMap, hash::Hash, sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::debug;

/// Entrada del cache con su instante de captura
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            created_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

/// Cache con TTL fijo y sin límite de tamaño.
///
/// Todas las operaciones toman el lock del mapa completo, de modo que ningún
/// lector observa una entrada a medio escribir ni un `clear` a medias.
#[derive(Debug)]
pub struct TtlCache<K: Clone + Eq + Hash, V> {
    data: Arc<RwLock<HashMap<K, CacheEntry<V>>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Devuelve el valor solo mientras `now - created_at < ttl`.
    /// Una entrada vencida no se sirve, pero tampoco se borra aquí.
    pub fn get(&self, key: &K) -> Option<V> {
        let data = self.data.read();
        let value = data
            .get(key)
            .filter(|entry| !entry.is_expired(self.ttl))
            .map(|entry| entry.value.clone());
        value
    }

    /// Inserta o reemplaza la entrada, reiniciando su TTL.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.data
            .write()
            .insert(key, CacheEntry::new(value))
            .map(|old| old.value)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Vacía el cache ejecutando `also` mientras se mantiene el lock de
    /// escritura, para que otro estado se limpie en el mismo paso.
    pub fn clear_with(&self, also: impl FnOnce()) -> usize {
        let mut data = self.data.write();
        let removed = data.len();
        also();
        data.clear();
        removed
    }

    /// Limpia entradas expiradas y retorna el número de elementos removidos
    pub fn cleanup_expired(&self) -> usize {
        let mut data = self.data.write();
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired(self.ttl));
        let removed = before - data.len();

        if removed > 0 {
            debug!("Limpiadas {} entradas expiradas del cache", removed);
        }

        removed
    }
}

impl<K, V> Clone for TtlCache<K, V>
where
    K: Clone + Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            ttl: self.ttl,
        }
    }
}
