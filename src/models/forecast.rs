// ============================================================================
// Structures : prévision (Forecast)
// ============================================================================
// Sortie du modèle de prévision : une estimation ponctuelle et un intervalle
// d'incertitude pour chaque timestamp (historique + horizon futur), plus la
// décomposition en composantes (tendance, saisonnalités).
// ============================================================================

use chrono::{DateTime, Utc};

/// Mode de prévision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastMode {
    /// Ajustement direct sur la série récupérée
    Historical,
    /// Dernier prix répété chaque jour sur 5 ans, horizon nul
    FlatProjection,
}

impl ForecastMode {
    pub fn label(&self) -> &'static str {
        match self {
            ForecastMode::Historical => "Historique",
            ForecastMode::FlatProjection => "Projection plate",
        }
    }

    /// Bascule entre les deux modes
    pub fn toggle(&self) -> ForecastMode {
        match self {
            ForecastMode::Historical => ForecastMode::FlatProjection,
            ForecastMode::FlatProjection => ForecastMode::Historical,
        }
    }
}

impl Default for ForecastMode {
    fn default() -> Self {
        ForecastMode::Historical
    }
}

/// Un point de prévision (colonnes ds, yhat, yhat_lower, yhat_upper)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

impl ForecastPoint {
    /// Vérifie lower <= yhat <= upper
    pub fn is_ordered(&self) -> bool {
        self.yhat_lower <= self.yhat && self.yhat <= self.yhat_upper
    }
}

/// Décomposition additive d'un point
///
/// Les saisonnalités désactivées valent None.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastComponents {
    pub timestamp: DateTime<Utc>,
    pub trend: f64,
    pub yearly: Option<f64>,
    pub weekly: Option<f64>,
    pub daily: Option<f64>,
}

/// Prévision complète pour un coin
#[derive(Debug, Clone)]
pub struct Forecast {
    pub coin: String,
    pub mode: ForecastMode,

    /// Points couvrant la plage ajustée puis l'horizon
    pub points: Vec<ForecastPoint>,

    /// Décomposition, alignée sur `points`
    pub components: Vec<ForecastComponents>,

    /// Nombre de points appartenant à la plage ajustée
    pub history_len: usize,
}

impl Forecast {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points futurs uniquement (au-delà de la plage ajustée)
    pub fn future(&self) -> &[ForecastPoint] {
        &self.points[self.history_len.min(self.points.len())..]
    }

    /// Dernier point (fin de l'horizon)
    pub fn last(&self) -> Option<&ForecastPoint> {
        self.points.last()
    }

    /// Séries (x = secondes Unix) pour yhat, lower et upper
    pub fn chart_lines(&self) -> (Vec<(f64, f64)>, Vec<(f64, f64)>, Vec<(f64, f64)>) {
        let mut yhat = Vec::with_capacity(self.points.len());
        let mut lower = Vec::with_capacity(self.points.len());
        let mut upper = Vec::with_capacity(self.points.len());

        for p in &self.points {
            let x = p.timestamp.timestamp() as f64;
            yhat.push((x, p.yhat));
            lower.push((x, p.yhat_lower));
            upper.push((x, p.yhat_upper));
        }

        (yhat, lower, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(yhat: f64, lower: f64, upper: f64) -> ForecastPoint {
        ForecastPoint {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            yhat,
            yhat_lower: lower,
            yhat_upper: upper,
        }
    }

    #[test]
    fn test_is_ordered() {
        assert!(point(10.0, 9.0, 11.0).is_ordered());
        assert!(point(10.0, 10.0, 10.0).is_ordered());
        assert!(!point(10.0, 11.0, 12.0).is_ordered());
    }

    #[test]
    fn test_future_slice() {
        let forecast = Forecast {
            coin: "bitcoin".to_string(),
            mode: ForecastMode::Historical,
            points: vec![point(1.0, 0.0, 2.0), point(2.0, 1.0, 3.0), point(3.0, 2.0, 4.0)],
            components: Vec::new(),
            history_len: 2,
        };
        assert_eq!(forecast.future().len(), 1);
        assert_eq!(forecast.future()[0].yhat, 3.0);
    }

    #[test]
    fn test_mode_toggle() {
        assert_eq!(ForecastMode::Historical.toggle(), ForecastMode::FlatProjection);
        assert_eq!(ForecastMode::FlatProjection.toggle(), ForecastMode::Historical);
    }
}
