// ============================================================================
// Module : api
// ============================================================================
// Client de données de marché (CoinGecko), cache TTL par session et
// interface commune des sources de séries.
// ============================================================================

pub mod cache;     // Cache de réponses (endpoint, paramètres) → corps JSON
pub mod coingecko; // Client API CoinGecko
pub mod source;    // Traits PriceSource / RankingSource et variantes

// Re-export des types principaux
pub use coingecko::CoinGeckoClient;
pub use source::{MarketChartSource, OhlcSource, PriceSource, RankingSource, SourceKind};
