// ============================================================================
// Module : config
// ============================================================================
// Configuration de l'application (API, cache, prévision, export)
//
// Pas de fichier ni de variable d'environnement : les valeurs par défaut
// conviennent, les méthodes with_* servent aux tests et aux intégrations.
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

/// URL de base de l'API CoinGecko v3
pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Horizon de prévision : 5 ans
pub const FORECAST_HORIZON_DAYS: u32 = 1825;

/// Configuration globale
#[derive(Debug, Clone)]
pub struct Config {
    /// URL de base de l'API
    pub base_url: String,

    /// Devise de cotation (ex: "usd")
    pub vs_currency: String,

    /// Timeout des requêtes HTTP
    pub timeout: Duration,

    /// User-Agent envoyé au fournisseur
    pub user_agent: String,

    /// Durée de vie des réponses en cache
    pub cache_ttl: Duration,

    /// Nombre de lignes du classement par capitalisation
    pub ranking_size: u32,

    /// Nombre de jours prédits au-delà du dernier point
    pub forecast_horizon_days: u32,

    /// Largeur de l'intervalle d'incertitude (0.80 = 80%)
    pub interval_width: f64,

    /// Répertoire où les prévisions sont exportées
    pub export_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let export_dir = dirs::download_dir()
            .map(|dir| dir.join("coincast"))
            .unwrap_or_else(|| PathBuf::from("./exports"));

        Self {
            base_url: COINGECKO_BASE_URL.to_string(),
            vs_currency: "usd".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("coincast/{}", env!("CARGO_PKG_VERSION")),
            cache_ttl: Duration::from_secs(300),
            ranking_size: 5,
            forecast_horizon_days: FORECAST_HORIZON_DAYS,
            interval_width: 0.80,
            export_dir,
        }
    }
}

impl Config {
    /// Change l'URL de base
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Change le timeout HTTP
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Change la durée de vie du cache
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Change la taille du classement
    pub fn with_ranking_size(mut self, size: u32) -> Self {
        self.ranking_size = size;
        self
    }

    /// Change le répertoire d'export
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    /// Paramètres du modèle de prévision dérivés de la configuration
    pub fn forecast(&self) -> crate::forecast::ForecastConfig {
        crate::forecast::ForecastConfig {
            horizon_days: self.forecast_horizon_days,
            interval_width: self.interval_width,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.base_url, COINGECKO_BASE_URL);
        assert_eq!(config.vs_currency, "usd");
        assert_eq!(config.ranking_size, 5);
        assert_eq!(config.forecast_horizon_days, 1825);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_builders() {
        let config = Config::default()
            .with_base_url("http://localhost:9000")
            .with_timeout(Duration::from_secs(5))
            .with_cache_ttl(Duration::ZERO)
            .with_ranking_size(10)
            .with_export_dir("/tmp/out");

        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.cache_ttl, Duration::ZERO);
        assert_eq!(config.ranking_size, 10);
        assert_eq!(config.export_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_forecast_config_follows_horizon() {
        let config = Config::default();
        let forecast = config.forecast();
        assert_eq!(forecast.horizon_days, 1825);
        assert!((forecast.interval_width - 0.80).abs() < 1e-12);
    }
}
