// ============================================================================
// Structure : MarketRankingRow
// ============================================================================
// Une ligne du classement par capitalisation (endpoint /coins/markets)
//
// Les champs JSON sont mappés strictement : un champ obligatoire manquant
// fait échouer la désérialisation (ParseError) dès la frontière API.
// ============================================================================

use serde::Deserialize;

/// Ligne du classement des coins par capitalisation
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketRankingRow {
    /// Nom complet (ex: "Bitcoin")
    pub name: String,

    /// Symbole (ex: "btc")
    pub symbol: String,

    /// Prix actuel
    pub current_price: f64,

    /// Capitalisation
    pub market_cap: f64,

    /// Variation sur 24h en pourcentage (parfois null chez CoinGecko)
    #[serde(rename = "price_change_percentage_24h")]
    pub price_change_24h: Option<f64>,
}

impl MarketRankingRow {
    /// Vrai si le coin est en hausse sur 24h
    pub fn is_positive(&self) -> bool {
        self.price_change_24h.map(|c| c >= 0.0).unwrap_or(false)
    }

    /// Variation 24h formatée avec flèche
    pub fn change_label(&self) -> String {
        match self.price_change_24h {
            Some(change) => {
                let arrow = if change >= 0.0 { "▲" } else { "▼" };
                format!("{} {:+.2}%", arrow, change)
            }
            None => "N/A".to_string(),
        }
    }
}

/// Formate une capitalisation en notation compacte ($1.23T, $456.70B, ...)
pub fn format_market_cap(value: f64) -> String {
    const UNITS: [(f64, &str); 3] = [(1e12, "T"), (1e9, "B"), (1e6, "M")];

    for (scale, suffix) in UNITS {
        if value.abs() >= scale {
            return format!("${:.2}{}", value / scale, suffix);
        }
    }
    format!("${:.0}", value)
}

/// Formate un prix : plus de décimales pour les petits prix (ex: dogecoin)
pub fn format_price(price: f64) -> String {
    if price.abs() >= 1.0 {
        format!("${:.2}", price)
    } else {
        format!("${:.6}", price)
    }
}
