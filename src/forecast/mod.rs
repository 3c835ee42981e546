// ============================================================================
// Module : forecast
// ============================================================================
// Modèle additif de séries temporelles (dans l'esprit de Prophet) :
//
//   y(t) = tendance(t) + annuelle(t) + hebdomadaire(t) + journalière(t) + ε
//
// - Tendance linéaire par morceaux, points de rupture dans les premiers 80%
//   de l'historique, pénalisés (ridge)
// - Saisonnalités en séries de Fourier
// - Ajustement par moindres carrés pénalisés, résolus par nalgebra
//   (Cholesky, voir linalg.rs)
// - Quantile de l'intervalle par statrs (loi normale)
// - Intervalle d'incertitude : bruit résiduel + incertitude de tendance qui
//   croît avec la distance au dernier point observé
//
// Deux modes :
// - Historical     : ajusté sur la série récupérée, horizon de 1825 jours
// - FlatProjection : dernier prix répété 1825 jours, horizon nul
// ============================================================================

pub mod linalg;

use std::f64::consts::PI;

use chrono::{DateTime, Duration, Utc};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, info, instrument, warn};

use crate::config::FORECAST_HORIZON_DAYS;
use crate::error::{DashboardError, Result};
use crate::models::{Forecast, ForecastComponents, ForecastMode, ForecastPoint, PriceSeries};
use crate::normalize;

use linalg::NormalEquations;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Échelle a priori du bruit (sur y normalisé) utilisée pour convertir les
/// échelles a priori en pénalités ridge : λ = (NOISE_PRIOR / échelle)²
const NOISE_PRIOR: f64 = 0.05;

/// Pénalité quasi nulle des paramètres de tendance (ordonnée, pente)
const TREND_PENALTY: f64 = 1e-9;

/// Paramètres du modèle
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    /// Périodes (jours) ajoutées après le dernier timestamp
    pub horizon_days: u32,

    /// Largeur de l'intervalle d'incertitude (ex: 0.80)
    pub interval_width: f64,

    /// Active la saisonnalité journalière
    pub daily_seasonality: bool,

    /// Nombre maximum de points de rupture de tendance
    pub n_changepoints: usize,

    /// Part de l'historique où placer les points de rupture
    pub changepoint_range: f64,

    /// Échelle a priori des ruptures de tendance
    pub changepoint_prior_scale: f64,

    /// Échelle a priori des saisonnalités
    pub seasonality_prior_scale: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: FORECAST_HORIZON_DAYS,
            interval_width: 0.80,
            daily_seasonality: true,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
        }
    }
}

/// Composante saisonnière
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeasonKind {
    Yearly,
    Weekly,
    Daily,
}

#[derive(Debug, Clone, Copy)]
struct Seasonality {
    kind: SeasonKind,
    period_days: f64,
    order: usize,
}

impl Seasonality {
    fn width(&self) -> usize {
        2 * self.order
    }

    /// Features de Fourier [sin(2πkt/P), cos(2πkt/P)] pour k = 1..=order
    fn features(&self, t_days: f64, out: &mut Vec<f64>) {
        for k in 1..=self.order {
            let angle = 2.0 * PI * k as f64 * t_days / self.period_days;
            out.push(angle.sin());
            out.push(angle.cos());
        }
    }
}

/// Modèle additif ajusté
#[derive(Debug, Clone)]
pub struct AdditiveModel {
    /// Premier timestamp de l'historique (secondes Unix)
    t_start: f64,
    /// Durée de l'historique (secondes), > 0
    t_span: f64,
    /// Facteur de normalisation de y (max |y|)
    y_scale: f64,
    /// Points de rupture (temps normalisé dans [0, 1])
    changepoints: Vec<f64>,
    seasonalities: Vec<Seasonality>,
    /// Coefficients : [m, k, δ..., saisonnalités...]
    beta: Vec<f64>,
    /// Écart-type résiduel (y normalisé)
    sigma: f64,
    /// Magnitude moyenne des ruptures ajustées (incertitude future)
    mean_abs_delta: f64,
    /// Quantile normal de l'intervalle (ex: 1.28 pour 80%)
    z: f64,
    /// Dernier timestamp de l'historique
    last: DateTime<Utc>,
}

impl AdditiveModel {
    /// Ajuste le modèle sur des couples (ds, y)
    ///
    /// Échoue avec ModelFit si moins de deux timestamps distincts.
    #[instrument(skip(frame, config), fields(points = frame.len()))]
    pub fn fit(frame: &[(DateTime<Utc>, f64)], config: &ForecastConfig) -> Result<Self> {
        if !(config.interval_width > 0.0 && config.interval_width < 1.0) {
            return Err(DashboardError::ModelFit(format!(
                "largeur d'intervalle invalide : {}",
                config.interval_width
            )));
        }

        let mut sorted: Vec<(DateTime<Utc>, f64)> = frame.to_vec();
        sorted.sort_by_key(|(ts, _)| *ts);

        let distinct = count_distinct(&sorted);
        if distinct < 2 {
            return Err(DashboardError::ModelFit(format!(
                "au moins deux timestamps distincts requis ({} fourni)",
                distinct
            )));
        }
        if sorted.iter().any(|(_, y)| !y.is_finite()) {
            return Err(DashboardError::ModelFit("valeur non finie dans la série".to_string()));
        }

        let first = sorted[0].0;
        let last = sorted[sorted.len() - 1].0;
        let t_start = first.timestamp() as f64;
        let t_span = (last.timestamp() - first.timestamp()) as f64;
        if t_span <= 0.0 {
            return Err(DashboardError::ModelFit("historique de durée nulle".to_string()));
        }

        let y_max = sorted.iter().fold(0.0_f64, |acc, (_, y)| acc.max(y.abs()));
        let y_scale = if y_max > 0.0 { y_max } else { 1.0 };

        let span_days = t_span / SECONDS_PER_DAY;
        let seasonalities = detect_seasonalities(&sorted, span_days, config.daily_seasonality);
        let changepoints = place_changepoints(&sorted, t_start, t_span, config);

        debug!(
            span_days,
            changepoints = changepoints.len(),
            seasonalities = ?seasonalities.iter().map(|s| s.kind).collect::<Vec<_>>(),
            "Model structure selected"
        );

        let mut model = Self {
            t_start,
            t_span,
            y_scale,
            changepoints,
            seasonalities,
            beta: Vec::new(),
            sigma: 0.0,
            mean_abs_delta: 0.0,
            z: interval_quantile(config.interval_width)?,
            last,
        };

        // Équations normales
        let n_params = model.n_params();
        let mut equations = NormalEquations::new(n_params);
        let mut row = Vec::with_capacity(n_params);
        for (ts, y) in &sorted {
            model.design_row(*ts, &mut row);
            equations.add_row(&row, y / y_scale);
        }

        let penalties = model.penalties(config);
        model.beta = equations.solve(&penalties).ok_or_else(|| {
            DashboardError::ModelFit("système singulier lors de l'ajustement".to_string())
        })?;

        // Résidus
        let sse: f64 = sorted
            .iter()
            .map(|(ts, y)| {
                model.design_row(*ts, &mut row);
                let fitted: f64 = row.iter().zip(&model.beta).map(|(x, b)| x * b).sum();
                (y / y_scale - fitted).powi(2)
            })
            .sum();
        model.sigma = (sse / sorted.len() as f64).sqrt();

        let deltas = model.deltas();
        model.mean_abs_delta = if deltas.is_empty() {
            0.0
        } else {
            deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64
        };

        info!(
            sigma = model.sigma * y_scale,
            mean_abs_delta = model.mean_abs_delta,
            "Forecast model fitted"
        );
        Ok(model)
    }

    /// Nombre total de coefficients
    fn n_params(&self) -> usize {
        2 + self.changepoints.len() + self.seasonalities.iter().map(|s| s.width()).sum::<usize>()
    }

    /// Temps normalisé : 0 au premier point, 1 au dernier
    fn scaled_time(&self, ts: DateTime<Utc>) -> f64 {
        (ts.timestamp() as f64 - self.t_start) / self.t_span
    }

    /// Ligne de la matrice de design pour un timestamp
    fn design_row(&self, ts: DateTime<Utc>, row: &mut Vec<f64>) {
        row.clear();
        let t = self.scaled_time(ts);

        row.push(1.0);
        row.push(t);
        for &s in &self.changepoints {
            row.push((t - s).max(0.0));
        }

        let t_days = ts.timestamp() as f64 / SECONDS_PER_DAY;
        for season in &self.seasonalities {
            season.features(t_days, row);
        }
    }

    /// Pénalités ridge alignées sur les colonnes
    fn penalties(&self, config: &ForecastConfig) -> Vec<f64> {
        let delta_penalty = (NOISE_PRIOR / config.changepoint_prior_scale).powi(2);
        let season_penalty = (NOISE_PRIOR / config.seasonality_prior_scale).powi(2);

        let mut penalties = vec![TREND_PENALTY, TREND_PENALTY];
        penalties.extend(std::iter::repeat(delta_penalty).take(self.changepoints.len()));
        let seasonal_width: usize = self.seasonalities.iter().map(|s| s.width()).sum();
        penalties.extend(std::iter::repeat(season_penalty).take(seasonal_width));
        penalties
    }

    /// Coefficients des ruptures de tendance
    fn deltas(&self) -> &[f64] {
        &self.beta[2..2 + self.changepoints.len()]
    }

    /// Timestamps futurs : un par jour après le dernier point historique
    pub fn future_timestamps(&self, periods: u32) -> Vec<DateTime<Utc>> {
        (1..=periods as i64)
            .map(|i| self.last + Duration::days(i))
            .collect()
    }

    /// Écart-type de prédiction (y normalisé) à un temps normalisé t
    ///
    /// Au-delà de l'historique (h = t - 1 > 0), les ruptures futures suivent
    /// le rythme observé (un par unité de temps et par point de rupture) avec
    /// la magnitude moyenne ajustée : variance de niveau ≈ r·2b²·h³/3.
    fn prediction_sigma(&self, t: f64) -> f64 {
        let h = (t - 1.0).max(0.0);
        let rate = self.changepoints.len() as f64;
        let trend_var = rate * 2.0 * self.mean_abs_delta.powi(2) * h.powi(3) / 3.0;
        (self.sigma.powi(2) + trend_var).sqrt()
    }

    /// Prédit les points et composantes pour des timestamps
    pub fn predict(&self, timestamps: &[DateTime<Utc>]) -> (Vec<ForecastPoint>, Vec<ForecastComponents>) {
        let n_cp = self.changepoints.len();
        let mut row = Vec::with_capacity(self.n_params());
        let mut points = Vec::with_capacity(timestamps.len());
        let mut components = Vec::with_capacity(timestamps.len());

        for &ts in timestamps {
            self.design_row(ts, &mut row);

            let trend: f64 = row[..2 + n_cp]
                .iter()
                .zip(&self.beta[..2 + n_cp])
                .map(|(x, b)| x * b)
                .sum();

            let mut yearly = None;
            let mut weekly = None;
            let mut daily = None;
            let mut offset = 2 + n_cp;
            for season in &self.seasonalities {
                let end = offset + season.width();
                let value: f64 = row[offset..end]
                    .iter()
                    .zip(&self.beta[offset..end])
                    .map(|(x, b)| x * b)
                    .sum::<f64>()
                    * self.y_scale;
                match season.kind {
                    SeasonKind::Yearly => yearly = Some(value),
                    SeasonKind::Weekly => weekly = Some(value),
                    SeasonKind::Daily => daily = Some(value),
                }
                offset = end;
            }

            let trend = trend * self.y_scale;
            let yhat = trend + yearly.unwrap_or(0.0) + weekly.unwrap_or(0.0) + daily.unwrap_or(0.0);
            let half_width = self.z * self.prediction_sigma(self.scaled_time(ts)) * self.y_scale;

            points.push(ForecastPoint {
                timestamp: ts,
                yhat,
                yhat_lower: yhat - half_width,
                yhat_upper: yhat + half_width,
            });
            components.push(ForecastComponents {
                timestamp: ts,
                trend,
                yearly,
                weekly,
                daily,
            });
        }

        (points, components)
    }
}

/// Nombre de timestamps distincts d'une série triée
fn count_distinct(sorted: &[(DateTime<Utc>, f64)]) -> usize {
    let mut timestamps: Vec<DateTime<Utc>> = sorted.iter().map(|(ts, _)| *ts).collect();
    timestamps.dedup();
    timestamps.len()
}

/// Quantile normal pour un intervalle centré de largeur donnée
fn interval_quantile(width: f64) -> Result<f64> {
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| DashboardError::ModelFit(format!("loi normale : {}", e)))?;
    Ok(normal.inverse_cdf(0.5 + width / 2.0))
}

/// Sélection automatique des saisonnalités
///
/// - annuelle : au moins deux ans d'historique
/// - hebdomadaire : au moins deux semaines et un pas inférieur à 7 jours
/// - journalière : sur demande
fn detect_seasonalities(
    sorted: &[(DateTime<Utc>, f64)],
    span_days: f64,
    daily: bool,
) -> Vec<Seasonality> {
    let min_step_days = sorted
        .windows(2)
        .map(|w| (w[1].0 - w[0].0).num_seconds() as f64 / SECONDS_PER_DAY)
        .filter(|d| *d > 0.0)
        .fold(f64::MAX, f64::min);

    let mut seasonalities = Vec::new();
    if span_days >= 730.0 {
        seasonalities.push(Seasonality {
            kind: SeasonKind::Yearly,
            period_days: 365.25,
            order: 10,
        });
    }
    if span_days >= 14.0 && min_step_days < 7.0 {
        seasonalities.push(Seasonality {
            kind: SeasonKind::Weekly,
            period_days: 7.0,
            order: 3,
        });
    }
    if daily {
        seasonalities.push(Seasonality {
            kind: SeasonKind::Daily,
            period_days: 1.0,
            order: 4,
        });
    }
    seasonalities
}

/// Points de rupture répartis sur les premiers `changepoint_range` de l'historique
fn place_changepoints(
    sorted: &[(DateTime<Utc>, f64)],
    t_start: f64,
    t_span: f64,
    config: &ForecastConfig,
) -> Vec<f64> {
    let hist_size = (sorted.len() as f64 * config.changepoint_range).floor() as usize;
    if hist_size < 2 {
        return Vec::new();
    }

    let n_cp = config.n_changepoints.min(hist_size - 1);
    if n_cp == 0 {
        return Vec::new();
    }

    let mut changepoints: Vec<f64> = (1..=n_cp)
        .map(|i| {
            let index = (i as f64 * (hist_size - 1) as f64 / n_cp as f64).round() as usize;
            (sorted[index].0.timestamp() as f64 - t_start) / t_span
        })
        .filter(|s| *s > 0.0 && *s < 1.0)
        .collect();
    changepoints.dedup();
    changepoints
}

/// Série synthétique de la projection plate : dernier prix, un point par jour
pub fn flat_projection_frame(series: &PriceSeries, days: u32) -> Result<Vec<(DateTime<Utc>, f64)>> {
    let last = series.last().ok_or_else(|| {
        DashboardError::ModelFit(format!("aucun prix connu pour {}", series.coin))
    })?;

    Ok((0..days as i64)
        .map(|i| (last.timestamp + Duration::days(i), last.price))
        .collect())
}

/// Produit une prévision pour une série selon le mode demandé
#[instrument(skip(series, config), fields(coin = %series.coin, points = series.len()))]
pub fn forecast(series: &PriceSeries, mode: ForecastMode, config: &ForecastConfig) -> Result<Forecast> {
    let (frame, horizon, model_config) = match mode {
        ForecastMode::Historical => (normalize::to_model_frame(series), config.horizon_days, config.clone()),
        ForecastMode::FlatProjection => {
            let frame = flat_projection_frame(series, config.horizon_days)?;
            let model_config = ForecastConfig {
                daily_seasonality: false,
                ..config.clone()
            };
            (frame, 0, model_config)
        }
    };

    let model = AdditiveModel::fit(&frame, &model_config).map_err(|e| {
        warn!(error = %e, "Forecast skipped");
        e
    })?;

    let mut timestamps: Vec<DateTime<Utc>> = frame.iter().map(|(ts, _)| *ts).collect();
    timestamps.sort();
    timestamps.dedup();
    let history_len = timestamps.len();
    timestamps.extend(model.future_timestamps(horizon));

    let (points, components) = model.predict(&timestamps);
    if let Some(bad) = points.iter().find(|p| !p.is_ordered() || !p.yhat.is_finite()) {
        return Err(DashboardError::ModelFit(format!(
            "intervalle incohérent au {}",
            bad.timestamp.format("%Y-%m-%d")
        )));
    }

    info!(history = history_len, total = points.len(), mode = mode.label(), "Forecast produced");
    Ok(Forecast {
        coin: series.coin.clone(),
        mode,
        points,
        components,
        history_len,
    })
}
