// ============================================================================
// Module : error
// ============================================================================
// Erreurs typées de la bibliothèque
//
// Chaque composant (client, normaliseur, prévision, export) échoue avec une
// variante précise. Le pipeline convertit ensuite chaque erreur en message
// visible (bandeau d'erreur ou d'avertissement) sans jamais faire planter l'UI.
//
// CONCEPT RUST : thiserror
// - #[derive(Error)] génère std::error::Error + Display
// - #[error("...")] : message affiché
// - #[from] : conversion automatique avec l'opérateur ?
// ============================================================================

use thiserror::Error;

/// Résultat standard de la bibliothèque
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Gravité d'une erreur pour l'affichage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Bandeau rouge : la branche concernée n'est pas affichée
    Error,
    /// Bandeau jaune : situation attendue (données vides, modèle impossible)
    Warning,
    /// Message informatif (export réussi, etc.)
    Info,
}

/// Erreurs du tableau de bord
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Statut HTTP non-succès renvoyé par le fournisseur
    #[error("Échec de la récupération des données (HTTP {status}) : {url}")]
    Network { status: u16, url: String },

    /// Erreur de transport (connexion, timeout, lecture du corps)
    #[error("Échec de la requête HTTP : {0}")]
    Transport(#[from] reqwest::Error),

    /// Réponse valide mais vide
    #[error("Données vides pour {what}")]
    EmptyResult { what: String },

    /// JSON qui ne correspond pas au format attendu
    #[error("Format de réponse inattendu pour {endpoint} : {source}")]
    Parse {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// Données syntaxiquement correctes mais incohérentes
    #[error("Données invalides : {0}")]
    Malformed(String),

    /// Le modèle de prévision ne peut pas être ajusté
    #[error("Prévision impossible : {0}")]
    ModelFit(String),

    /// Échec de l'export tableur
    #[error("Échec de l'export : {0}")]
    Export(String),
}

impl DashboardError {
    /// Gravité à utiliser pour le bandeau affiché à l'utilisateur
    pub fn severity(&self) -> Severity {
        match self {
            DashboardError::EmptyResult { .. } | DashboardError::ModelFit(_) => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Vrai pour les erreurs réseau (statut HTTP ou transport)
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            DashboardError::Network { .. } | DashboardError::Transport(_)
        )
    }
}

impl From<rust_xlsxwriter::XlsxError> for DashboardError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        DashboardError::Export(e.to_string())
    }
}

impl From<calamine::XlsxError> for DashboardError {
    fn from(e: calamine::XlsxError) -> Self {
        DashboardError::Export(e.to_string())
    }
}
