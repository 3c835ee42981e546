// ============================================================================
// Module : pipeline
// ============================================================================
// Une "passe de rendu" : à partir des sélections courantes, récupère les
// données, calcule la variation et la prévision, et rassemble le tout (avec
// les messages à afficher) dans un RenderPass.
//
// Ordre (séquentiel) :
// 1. Série principale  → en cas d'échec : bandeau, arrêt de la passe
// 2. Série de comparaison (optionnelle) → échec limité à sa branche
// 3. Classement des capitalisations → échec limité à sa branche
// 4. Prévision (CPU) → ModelFit = avertissement, pas de prévision
//
// Aucune erreur ne remonte : tout est converti en Notice.
// ============================================================================

use tracing::{info, instrument, warn};

use crate::api::{PriceSource, RankingSource, SourceKind};
use crate::error::{DashboardError, Severity};
use crate::forecast::{self, ForecastConfig};
use crate::models::{
    coin_label, Forecast, ForecastMode, MarketRankingRow, PriceChange, PriceSeries, Window, COINS,
};

/// Sélections de l'utilisateur
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Coin principal
    pub coin: String,
    /// Coin superposé (None = pas de comparaison)
    pub compare: Option<String>,
    pub window: Window,
    pub mode: ForecastMode,
    pub source: SourceKind,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            coin: COINS[0].to_string(),
            compare: None,
            window: Window::default(),
            mode: ForecastMode::default(),
            source: SourceKind::default(),
        }
    }
}

/// Message affiché dans le bandeau
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Convertit une erreur en message, préfixé par la branche concernée
    ///
    /// Les erreurs réseau sont souvent passagères (limite de débit) : le
    /// message rappelle le rafraîchissement manuel.
    pub fn from_error(branch: &str, error: &DashboardError) -> Self {
        let message = if error.is_network() {
            format!("{} : {} ([r] pour réessayer)", branch, error)
        } else {
            format!("{} : {}", branch, error)
        };
        Self::new(error.severity(), message)
    }
}

/// Gravité la plus forte parmi des messages (Error > Warning > Info)
pub fn worst_severity<'a>(notices: impl IntoIterator<Item = &'a Notice>) -> Option<Severity> {
    let rank = |s: &Severity| match s {
        Severity::Error => 2,
        Severity::Warning => 1,
        Severity::Info => 0,
    };
    notices.into_iter().map(|n| n.severity).max_by_key(rank)
}

/// Résultat d'une passe de rendu
#[derive(Debug, Clone, Default)]
pub struct RenderPass {
    /// Sélections ayant produit cette passe
    pub selection: Selection,
    pub primary: Option<PriceSeries>,
    pub comparison: Option<PriceSeries>,
    /// Variation jour précédent → dernier (None si moins de deux points)
    pub change: Option<PriceChange>,
    pub forecast: Option<Forecast>,
    pub rankings: Vec<MarketRankingRow>,
    pub notices: Vec<Notice>,
    /// Vrai si la série principale a échoué (rien d'autre n'a été calculé)
    pub halted: bool,
}

impl RenderPass {
    fn for_selection(selection: &Selection) -> Self {
        Self {
            selection: selection.clone(),
            ..Default::default()
        }
    }

    /// Gravité la plus haute parmi les messages
    pub fn worst_severity(&self) -> Option<Severity> {
        worst_severity(&self.notices)
    }
}

/// Exécute une passe complète
#[instrument(skip(prices, rankings, config), fields(coin = %selection.coin, window = %selection.window.as_query()))]
pub async fn run_pass(
    prices: &dyn PriceSource,
    rankings: &dyn RankingSource,
    selection: &Selection,
    config: &ForecastConfig,
) -> RenderPass {
    let mut pass = RenderPass::for_selection(selection);

    // 1. Série principale
    let primary = match prices.price_series(&selection.coin, selection.window).await {
        Ok(series) => series,
        Err(e) => {
            warn!(error = %e, "Primary series unavailable, halting pass");
            pass.notices.push(Notice::from_error(&coin_label(&selection.coin), &e));
            pass.halted = true;
            return pass;
        }
    };
    pass.change = primary.change();

    // 2. Comparaison
    if let Some(other) = selection.compare.as_deref().filter(|c| *c != selection.coin) {
        match prices.price_series(other, selection.window).await {
            Ok(series) => pass.comparison = Some(series),
            Err(e) => {
                warn!(compare = other, error = %e, "Comparison series unavailable");
                pass.notices.push(Notice::from_error(&coin_label(other), &e));
            }
        }
    }

    // 3. Classement
    match rankings.top_markets().await {
        Ok(rows) => pass.rankings = rows,
        Err(e) => {
            warn!(error = %e, "Market ranking unavailable");
            pass.notices.push(Notice::from_error("Classement", &e));
        }
    }

    // 4. Prévision
    match forecast::forecast(&primary, selection.mode, config) {
        Ok(f) => pass.forecast = Some(f),
        Err(e) => pass.notices.push(Notice::from_error("Prévision", &e)),
    }

    info!(
        points = primary.len(),
        notices = pass.notices.len(),
        forecast = pass.forecast.is_some(),
        "Render pass completed"
    );
    pass.primary = Some(primary);
    pass
}
