// ============================================================================
// Sources de données : interface commune
// ============================================================================
// "Une source de PriceSeries pour (coin, fenêtre)" : le pipeline ne connaît
// que les traits, pas la forme de l'endpoint.
//
// Variantes :
// - OhlcSource        : /coins/{id}/ohlc → chandelles, prix = Close
// - MarketChartSource : /coins/{id}/market_chart → un prix par timestamp
//
// CONCEPT RUST : async-trait
// - Les méthodes async dans un trait utilisé en objet (&dyn PriceSource)
//   passent par la macro #[async_trait]
// ============================================================================

use async_trait::async_trait;

use crate::api::coingecko::CoinGeckoClient;
use crate::error::Result;
use crate::models::{MarketRankingRow, PriceSeries, Window};
use crate::normalize;

/// Forme de l'endpoint utilisé pour les séries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    Ohlc,
    MarketChart,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Ohlc => "OHLC",
            SourceKind::MarketChart => "Market chart",
        }
    }

    pub fn toggle(&self) -> SourceKind {
        match self {
            SourceKind::Ohlc => SourceKind::MarketChart,
            SourceKind::MarketChart => SourceKind::Ohlc,
        }
    }
}

/// Source de séries de prix
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Série normalisée pour un coin et une fenêtre
    async fn price_series(&self, coin: &str, window: Window) -> Result<PriceSeries>;
}

/// Source du classement par capitalisation
#[async_trait]
pub trait RankingSource: Send + Sync {
    async fn top_markets(&self) -> Result<Vec<MarketRankingRow>>;
}

/// Variante OHLC
pub struct OhlcSource<'a> {
    client: &'a CoinGeckoClient,
}

impl<'a> OhlcSource<'a> {
    pub fn new(client: &'a CoinGeckoClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PriceSource for OhlcSource<'_> {
    async fn price_series(&self, coin: &str, window: Window) -> Result<PriceSeries> {
        let rows = self.client.fetch_ohlc(coin, window).await?;
        normalize::ohlc_series(coin, window, &rows)
    }
}

/// Variante market chart
pub struct MarketChartSource<'a> {
    client: &'a CoinGeckoClient,
}

impl<'a> MarketChartSource<'a> {
    pub fn new(client: &'a CoinGeckoClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PriceSource for MarketChartSource<'_> {
    async fn price_series(&self, coin: &str, window: Window) -> Result<PriceSeries> {
        let rows = self.client.fetch_market_chart(coin, window).await?;
        normalize::market_chart_series(coin, window, &rows)
    }
}

#[async_trait]
impl RankingSource for CoinGeckoClient {
    async fn top_markets(&self) -> Result<Vec<MarketRankingRow>> {
        self.fetch_top_markets().await
    }
}

impl CoinGeckoClient {
    /// Source de séries correspondant à la forme choisie
    pub fn price_source(&self, kind: SourceKind) -> Box<dyn PriceSource + '_> {
        match kind {
            SourceKind::Ohlc => Box::new(OhlcSource::new(self)),
            SourceKind::MarketChart => Box::new(MarketChartSource::new(self)),
        }
    }
}
