// ============================================================================
// Module : models
// ============================================================================
// Ce module contient toutes les structures de données de l'application
//
// Toutes les entités sont éphémères : recalculées à chaque passe de rendu,
// jamais persistées.
// ============================================================================

pub mod forecast; // Prévision (points, composantes, mode)
pub mod ranking;  // Classement par capitalisation
pub mod series;   // Séries de prix (points, chandelles, variation)
pub mod window;   // Fenêtre historique et catalogue de coins

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use coincast::models::series::PriceSeries;
// On peut faire : use coincast::models::PriceSeries;
pub use forecast::{Forecast, ForecastComponents, ForecastMode, ForecastPoint};
pub use ranking::MarketRankingRow;
pub use series::{Candle, Polarity, PriceChange, PricePoint, PriceSeries};
pub use window::{coin_label, Window, COINS};
