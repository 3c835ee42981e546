// ============================================================================
// Module : ui
// ============================================================================
// Gère toute l'interface utilisateur (Terminal User Interface)
// ============================================================================

pub mod events;        // Gestion des événements clavier
pub mod dashboard;     // Layout, onglets, bandeau de messages, footer
pub mod chart;         // Graphique historique et bandeau de variation
pub mod forecast_view; // Prévision et composantes
pub mod markets;       // Classement par capitalisation

// Re-exports pour simplifier les imports
pub use events::{Event, EventHandler};
pub use dashboard::render;
