// ============================================================================
// Structure : PriceSeries (série de prix)
// ============================================================================
// Une série = une suite ordonnée d'observations (timestamp, prix) pour un
// coin sur une fenêtre donnée.
//
// Deux formes de source :
// - OHLC : chaque point est une chandelle (Open/High/Low/Close), le prix
//   retenu est le Close
// - Market chart : un seul prix par timestamp
//
// CONCEPTS RUST :
// 1. DateTime<Utc> : type de chrono pour dates avec timezone UTC
// 2. Vec<T> : la série possède ses points (ownership)
// 3. Option<T> : la variation n'existe qu'avec au moins deux points
// ============================================================================

use chrono::{DateTime, Utc};

use crate::models::Window;

/// Une observation (timestamp, prix)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Une chandelle OHLC
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }
}

/// Sens de la variation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
    Flat,
}

/// Variation en pourcentage entre deux prix consécutifs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceChange {
    /// Variation en %, arrondie à 2 décimales
    pub percent: f64,
    pub polarity: Polarity,
}

impl PriceChange {
    /// Calcule la variation de `previous` vers `current`
    ///
    /// Retourne None si le prix de référence est nul (division impossible).
    /// La polarité suit la valeur arrondie : ce qui s'affiche "0.00%" est Flat.
    pub fn between(previous: f64, current: f64) -> Option<Self> {
        if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
            return None;
        }

        let raw = (current - previous) / previous * 100.0;
        let percent = (raw * 100.0).round() / 100.0;

        let polarity = if percent > 0.0 {
            Polarity::Positive
        } else if percent < 0.0 {
            Polarity::Negative
        } else {
            Polarity::Flat
        };

        // Évite un "-0.00"
        let percent = if polarity == Polarity::Flat { 0.0 } else { percent };

        Some(Self { percent, polarity })
    }

    /// Texte affiché dans le bandeau (ex: "+10.00%")
    pub fn label(&self) -> String {
        match self.polarity {
            Polarity::Flat => format!("{:.2}%", self.percent),
            _ => format!("{:+.2}%", self.percent),
        }
    }

    /// Flèche associée à la polarité
    pub fn arrow(&self) -> &'static str {
        match self.polarity {
            Polarity::Positive => "▲",
            Polarity::Negative => "▼",
            Polarity::Flat => "■",
        }
    }
}

/// Série de prix pour un coin et une fenêtre
#[derive(Debug, Clone)]
pub struct PriceSeries {
    /// Identifiant du coin (ex: "bitcoin")
    pub coin: String,

    /// Fenêtre demandée
    pub window: Window,

    /// Points (timestamp croissant, un point par timestamp)
    pub points: Vec<PricePoint>,

    /// Chandelles, uniquement pour une source OHLC (sinon vide)
    pub candles: Vec<Candle>,
}

impl PriceSeries {
    /// Crée une série vide
    pub fn new(coin: impl Into<String>, window: Window) -> Self {
        Self {
            coin: coin.into(),
            window,
            points: Vec::new(),
            candles: Vec::new(),
        }
    }

    /// Crée une série à partir de points déjà normalisés
    pub fn with_points(coin: impl Into<String>, window: Window, points: Vec<PricePoint>) -> Self {
        Self {
            coin: coin.into(),
            window,
            points,
            candles: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Vrai si la série vient d'une source OHLC
    pub fn is_ohlc(&self) -> bool {
        !self.candles.is_empty()
    }

    /// Au moins un point : on peut tracer un graphique
    pub fn is_chartable(&self) -> bool {
        !self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Variation entre les deux derniers points (jour précédent → dernier)
    pub fn change(&self) -> Option<PriceChange> {
        match self.points.as_slice() {
            [.., previous, current] => PriceChange::between(previous.price, current.price),
            _ => None,
        }
    }

    /// Points (x = secondes Unix, y = prix) pour le widget Chart
    pub fn chart_points(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|p| (p.timestamp.timestamp() as f64, p.price))
            .collect()
    }

    /// Points des prix d'ouverture (séries OHLC uniquement)
    pub fn open_chart_points(&self) -> Vec<(f64, f64)> {
        self.candles
            .iter()
            .map(|c| (c.timestamp.timestamp() as f64, c.open))
            .collect()
    }

    /// Points rebasés à 100 sur le premier prix (superposition de deux coins)
    ///
    /// Retourne un Vec vide si le premier prix est nul.
    pub fn rebased_chart_points(&self) -> Vec<(f64, f64)> {
        let base = match self.first() {
            Some(p) if p.price != 0.0 => p.price,
            _ => return Vec::new(),
        };

        self.points
            .iter()
            .map(|p| (p.timestamp.timestamp() as f64, p.price / base * 100.0))
            .collect()
    }
}
