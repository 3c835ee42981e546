// ============================================================================
// CoinCast - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod api;       // Client CoinGecko, cache, sources de séries
pub mod app;       // État de l'application
pub mod config;    // Configuration (API, cache, prévision, export)
pub mod error;     // Erreurs typées
pub mod export;    // Export tableur de la prévision
pub mod forecast;  // Modèle additif de prévision
pub mod models;    // Structures de données
pub mod normalize; // Réponses brutes → séries ordonnées
pub mod pipeline;  // Passe de rendu : fetch, variation, prévision
pub mod ui;        // Interface utilisateur
