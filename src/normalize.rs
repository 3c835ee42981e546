// ============================================================================
// Normaliseur de séries
// ============================================================================
// Convertit les tableaux bruts de l'API en PriceSeries :
// - timestamps en millisecondes epoch → DateTime<Utc>
// - un point par timestamp (les doublons gardent la dernière valeur)
// - l'ordre d'entrée est conservé : l'API renvoie déjà des données
//   croissantes, un timestamp qui recule est une erreur de format
//
// Deux chemins d'extraction distincts :
// - ohlc_series : lignes [ts, open, high, low, close]
// - market_chart_series : lignes [ts, price]
// ============================================================================

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{DashboardError, Result};
use crate::models::{Candle, PricePoint, PriceSeries, Window};

/// Convertit un timestamp en millisecondes (f64 JSON) en DateTime<Utc>
fn timestamp_from_millis(raw: f64) -> Result<DateTime<Utc>> {
    if !raw.is_finite() {
        return Err(DashboardError::Malformed(format!("timestamp invalide : {}", raw)));
    }

    DateTime::from_timestamp_millis(raw as i64)
        .ok_or_else(|| DashboardError::Malformed(format!("timestamp hors limites : {}", raw)))
}

/// Vérifie qu'un prix est un réel positif ou nul
fn check_price(value: f64, timestamp: DateTime<Utc>) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(DashboardError::Malformed(format!(
            "prix invalide {} à {}",
            value, timestamp
        )))
    }
}

/// Ajoute un élément en fusionnant les timestamps identiques
///
/// Retourne true si l'élément a remplacé le précédent (doublon).
fn push_ordered<T>(
    items: &mut Vec<T>,
    item: T,
    timestamp_of: impl Fn(&T) -> DateTime<Utc>,
) -> Result<bool> {
    if let Some(previous) = items.last_mut() {
        let previous_ts = timestamp_of(previous);
        let ts = timestamp_of(&item);

        if ts == previous_ts {
            *previous = item;
            return Ok(true);
        }
        if ts < previous_ts {
            return Err(DashboardError::Malformed(format!(
                "timestamps non croissants : {} après {}",
                ts, previous_ts
            )));
        }
    }

    items.push(item);
    Ok(false)
}

/// Série issue de l'endpoint OHLC
///
/// Le prix retenu pour chaque point est le Close.
pub fn ohlc_series(coin: &str, window: Window, rows: &[[f64; 5]]) -> Result<PriceSeries> {
    if rows.is_empty() {
        return Err(DashboardError::EmptyResult {
            what: format!("{} (OHLC, {})", coin, window.label()),
        });
    }

    let mut candles: Vec<Candle> = Vec::with_capacity(rows.len());
    let mut duplicates = 0;

    for &[ts, open, high, low, close] in rows {
        let timestamp = timestamp_from_millis(ts)?;
        let candle = Candle::new(
            timestamp,
            check_price(open, timestamp)?,
            check_price(high, timestamp)?,
            check_price(low, timestamp)?,
            check_price(close, timestamp)?,
        );

        if push_ordered(&mut candles, candle, |c| c.timestamp)? {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        warn!(coin, duplicates, "Merged duplicate OHLC timestamps");
    }

    let points = candles
        .iter()
        .map(|c| PricePoint::new(c.timestamp, c.close))
        .collect();

    debug!(coin, rows = rows.len(), candles = candles.len(), "Normalized OHLC series");

    Ok(PriceSeries {
        coin: coin.to_string(),
        window,
        points,
        candles,
    })
}

/// Série issue de l'endpoint market_chart (tableau "prices")
pub fn market_chart_series(coin: &str, window: Window, rows: &[[f64; 2]]) -> Result<PriceSeries> {
    if rows.is_empty() {
        return Err(DashboardError::EmptyResult {
            what: format!("{} (market chart, {})", coin, window.label()),
        });
    }

    let mut points: Vec<PricePoint> = Vec::with_capacity(rows.len());
    let mut duplicates = 0;

    for &[ts, price] in rows {
        let timestamp = timestamp_from_millis(ts)?;
        let point = PricePoint::new(timestamp, check_price(price, timestamp)?);

        if push_ordered(&mut points, point, |p| p.timestamp)? {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        warn!(coin, duplicates, "Merged duplicate market chart timestamps");
    }

    debug!(coin, rows = rows.len(), points = points.len(), "Normalized market chart series");

    Ok(PriceSeries::with_points(coin, window, points))
}

/// Couples (ds, y) attendus par le modèle de prévision
pub fn to_model_frame(series: &PriceSeries) -> Vec<(DateTime<Utc>, f64)> {
    series.points.iter().map(|p| (p.timestamp, p.price)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DAY_MS: f64 = 86_400_000.0;

    #[test]
    fn test_ohlc_uses_close_and_converts_timestamps() {
        let rows = [
            [1_704_067_200_000.0, 100.0, 110.0, 90.0, 105.0],
            [1_704_067_200_000.0 + DAY_MS, 105.0, 120.0, 100.0, 118.0],
        ];
        let series = ohlc_series("bitcoin", Window::Days(7), &rows).unwrap();

        assert_eq!(series.len(), 2);
        assert!(series.is_ohlc());
        assert_eq!(series.points[0].price, 105.0);
        assert_eq!(series.points[1].price, 118.0);
        assert_eq!(series.candles[1].open, 105.0);
        assert_eq!(series.points[0].timestamp.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_market_chart_series() {
        let rows = [[1_704_067_200_000.0, 42000.0], [1_704_067_200_000.0 + DAY_MS, 43000.0]];
        let series = market_chart_series("bitcoin", Window::Max, &rows).unwrap();

        assert_eq!(series.len(), 2);
        assert!(!series.is_ohlc());
        assert_eq!(series.window, Window::Max);
        assert_eq!(series.last().unwrap().price, 43000.0);
    }

    #[test]
    fn test_duplicates_keep_last_value() {
        let rows = [[0.0, 1.0], [DAY_MS, 2.0], [DAY_MS, 3.0], [2.0 * DAY_MS, 4.0]];
        let series = market_chart_series("ethereum", Window::Days(3), &rows).unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.points[1].price, 3.0);
    }

    #[test]
    fn test_decreasing_timestamp_is_rejected() {
        let rows = [[DAY_MS, 1.0], [0.0, 2.0]];
        let err = market_chart_series("ethereum", Window::Days(3), &rows).unwrap_err();
        assert!(matches!(err, DashboardError::Malformed(_)));
    }

    #[test]
    fn test_empty_rows() {
        let err = ohlc_series("dogecoin", Window::Days(1), &[]).unwrap_err();
        assert!(matches!(err, DashboardError::EmptyResult { .. }));

        let err = market_chart_series("dogecoin", Window::Days(1), &[]).unwrap_err();
        assert!(matches!(err, DashboardError::EmptyResult { .. }));
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let rows = [[0.0, -1.0]];
        assert!(market_chart_series("cardano", Window::Days(1), &rows).is_err());
    }

    #[test]
    fn test_model_frame() {
        let rows = [[0.0, 1.5], [DAY_MS, 2.5]];
        let series = market_chart_series("solana", Window::Days(2), &rows).unwrap();
        let frame = to_model_frame(&series);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame[1].1, 2.5);
    }

    proptest! {
        // Entrée croissante (avec doublons) → sortie strictement croissante,
        // un point par timestamp distinct
        #[test]
        fn prop_one_row_per_distinct_timestamp(
            steps in prop::collection::vec((0u8..3, 0.0f64..1e6), 1..200)
        ) {
            let mut ts = 1_600_000_000_000.0;
            let mut rows = Vec::new();
            for (step, price) in steps {
                ts += step as f64 * 3_600_000.0;
                rows.push([ts, price]);
            }

            let mut distinct: Vec<f64> = rows.iter().map(|r| r[0]).collect();
            distinct.dedup();

            let series = market_chart_series("bitcoin", Window::Max, &rows).unwrap();
            prop_assert_eq!(series.len(), distinct.len());
            for pair in series.points.windows(2) {
                prop_assert!(pair[0].timestamp < pair[1].timestamp);
            }
        }
    }
}
