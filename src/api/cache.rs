// ============================================================================
// Cache de réponses avec durée de vie (TTL)
// ============================================================================
// Clé = (endpoint, paramètres de requête). Chaque client possède son propre
// cache : aucune donnée n'est partagée entre deux sessions.
//
// CONCEPT RUST : Mutex intérieur
// - Le client est utilisé via &self depuis le worker
// - Le Mutex permet de modifier le cache derrière une référence partagée
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::trace;

/// Clé de cache : endpoint + paramètres triés
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: String,
    pub params: Vec<(String, String)>,
}

impl CacheKey {
    /// Crée une clé ; les paramètres sont triés pour que l'ordre n'importe pas
    pub fn new(endpoint: impl Into<String>, params: &[(&str, String)]) -> Self {
        let mut params: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        params.sort();

        Self {
            endpoint: endpoint.into(),
            params,
        }
    }
}

/// Cache clé → valeur avec expiration
#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, (V, Instant)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Retourne la valeur si elle existe et n'a pas expiré
    ///
    /// Une entrée expirée est supprimée au passage.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        match entries.get(key) {
            Some((value, stored_at)) if stored_at.elapsed() < self.ttl => {
                trace!(endpoint = %key.endpoint, "Cache hit");
                Some(value.clone())
            }
            Some(_) => {
                trace!(endpoint = %key.endpoint, "Cache entry expired");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insère (ou remplace) une valeur
    pub fn insert(&self, key: CacheKey, value: V) {
        if self.ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, (value, Instant::now()));
    }

    /// Vide le cache (rafraîchissement forcé)
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(days: &str) -> CacheKey {
        CacheKey::new(
            "/coins/bitcoin/ohlc",
            &[("vs_currency", "usd".to_string()), ("days", days.to_string())],
        )
    }

    #[test]
    fn test_hit_before_expiry() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert(key("7"), "[[1,2,3,4,5]]".to_string());

        assert_eq!(cache.get(&key("7")), Some("[[1,2,3,4,5]]".to_string()));
        assert_eq!(cache.get(&key("30")), None);
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = TtlCache::new(Duration::from_millis(1));
        cache.insert(key("7"), 42);
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(cache.get(&key("7")), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert(key("7"), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_param_order_does_not_matter() {
        let a = CacheKey::new("/x", &[("a", "1".to_string()), ("b", "2".to_string())]);
        let b = CacheKey::new("/x", &[("b", "2".to_string()), ("a", "1".to_string())]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_clear() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert(key("1"), 1);
        cache.insert(key("7"), 7);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
