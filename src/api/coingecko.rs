// ============================================================================
// API Client : CoinGecko
// ============================================================================
// Récupère les données de marché depuis l'API publique CoinGecko v3
//
// Endpoints utilisés :
// - /coins/{id}/ohlc          → [[ts, open, high, low, close], ...]
// - /coins/{id}/market_chart  → { "prices": [[ts, price], ...], ... }
// - /coins/markets            → [{ name, symbol, current_price, ... }, ...]
//
// CONCEPTS RUST :
// 1. async/await : requêtes HTTP non-bloquantes
// 2. Serde : le JSON est mappé sur des types stricts dès la frontière
// 3. Génériques : fetch_json<T> partagé par les trois endpoints
// ============================================================================

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::api::cache::{CacheKey, TtlCache};
use crate::config::Config;
use crate::error::{DashboardError, Result};
use crate::models::{MarketRankingRow, Window};

/// Réponse de /coins/{id}/market_chart
///
/// Seul "prices" est utilisé ; market_caps et total_volumes sont ignorés.
#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<[f64; 2]>,
}

/// Client HTTP pour CoinGecko
///
/// Chaque instance possède son propre cache (une instance par session).
#[derive(Debug)]
pub struct CoinGeckoClient {
    http: reqwest::Client,
    base_url: String,
    vs_currency: String,
    ranking_size: u32,
    cache: TtlCache<String>,
}

impl CoinGeckoClient {
    /// Crée un client à partir de la configuration
    pub fn new(config: &Config) -> Result<Self> {
        debug!(base_url = %config.base_url, "Creating CoinGecko HTTP client");
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            vs_currency: config.vs_currency.clone(),
            ranking_size: config.ranking_size,
            cache: TtlCache::new(config.cache_ttl),
        })
    }

    /// Vide le cache (rafraîchissement manuel)
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Construit l'URL complète d'un endpoint
    fn build_url(&self, endpoint: &str, params: &[(&str, String)]) -> String {
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}{}?{}", self.base_url, endpoint, query)
    }

    /// Paramètres communs des endpoints de séries
    fn series_params(&self, window: Window) -> Vec<(&'static str, String)> {
        vec![
            ("vs_currency", self.vs_currency.clone()),
            ("days", window.as_query()),
        ]
    }

    /// Paramètres de l'endpoint de classement
    fn markets_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("vs_currency", self.vs_currency.clone()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", self.ranking_size.to_string()),
            ("page", "1".to_string()),
        ]
    }

    /// Exécute une requête GET et désérialise le corps JSON
    ///
    /// - Cache consulté d'abord (clé = endpoint + paramètres)
    /// - Statut non-succès → DashboardError::Network
    /// - Corps qui ne correspond pas à T → DashboardError::Parse
    /// - Seules les réponses non vides sont mises en cache
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        is_empty: fn(&T) -> bool,
    ) -> Result<T> {
        let key = CacheKey::new(endpoint, params);

        if let Some(body) = self.cache.get(&key) {
            debug!(endpoint, "Serving response from cache");
            return parse_body(&body, endpoint);
        }

        let url = self.build_url(endpoint, params);
        debug!(url = %url, "Sending HTTP request to CoinGecko");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        debug!(status = %status, "Received HTTP response");
        check_status(status, &url)?;

        let body = response.text().await?;
        let value: T = parse_body(&body, endpoint)?;

        if is_empty(&value) {
            warn!(endpoint, "Provider returned an empty payload");
        } else {
            self.cache.insert(key, body);
        }

        Ok(value)
    }

    /// Lignes OHLC brutes [ts_ms, open, high, low, close]
    #[instrument(skip(self), fields(window = %window.as_query()))]
    pub async fn fetch_ohlc(&self, coin: &str, window: Window) -> Result<Vec<[f64; 5]>> {
        let endpoint = format!("/coins/{}/ohlc", coin);
        let rows: Vec<[f64; 5]> = self
            .fetch_json(&endpoint, &self.series_params(window), |rows: &Vec<[f64; 5]>| rows.is_empty())
            .await?;

        info!(rows = rows.len(), "Fetched OHLC rows");
        Ok(rows)
    }

    /// Prix bruts [ts_ms, price] du market chart
    #[instrument(skip(self), fields(window = %window.as_query()))]
    pub async fn fetch_market_chart(&self, coin: &str, window: Window) -> Result<Vec<[f64; 2]>> {
        let endpoint = format!("/coins/{}/market_chart", coin);
        let chart: MarketChartResponse = self
            .fetch_json(&endpoint, &self.series_params(window), |c: &MarketChartResponse| {
                c.prices.is_empty()
            })
            .await?;

        info!(rows = chart.prices.len(), "Fetched market chart prices");
        Ok(chart.prices)
    }

    /// Top N des coins par capitalisation décroissante
    #[instrument(skip(self), fields(size = self.ranking_size))]
    pub async fn fetch_top_markets(&self) -> Result<Vec<MarketRankingRow>> {
        let rows: Vec<MarketRankingRow> = self
            .fetch_json("/coins/markets", &self.markets_params(), |rows: &Vec<MarketRankingRow>| {
                rows.is_empty()
            })
            .await?;

        if rows.is_empty() {
            return Err(DashboardError::EmptyResult {
                what: "classement des capitalisations".to_string(),
            });
        }

        info!(rows = rows.len(), "Fetched market ranking");
        Ok(rows)
    }
}

/// Convertit un statut HTTP non-succès en erreur réseau
pub(crate) fn check_status(status: StatusCode, url: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }

    error!(status = %status, url, "CoinGecko returned error status");
    Err(DashboardError::Network {
        status: status.as_u16(),
        url: url.to_string(),
    })
}

/// Désérialise un corps JSON vers un type strict
pub(crate) fn parse_body<T: DeserializeOwned>(body: &str, endpoint: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| {
        error!(endpoint, error = %source, "Unexpected payload shape");
        DashboardError::Parse {
            endpoint: endpoint.to_string(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const OHLC_BODY: &str = "[[1704067200000, 1.0, 2.0, 0.5, 1.5], [1704153600000, 1.5, 2.5, 1.0, 2.0]]";

    /// Serveur HTTP local : sert les réponses (statut, corps) dans l'ordre,
    /// une par connexion, et compte les requêtes reçues
    async fn local_server(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);

                // Lit la requête jusqu'à la fin des en-têtes
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let response = format!(
                    "HTTP/1.1 {} Local\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.ok();
                socket.shutdown().await.ok();
            }
        });

        (format!("http://{}", addr), hits)
    }

    fn local_client(base_url: &str) -> CoinGeckoClient {
        CoinGeckoClient::new(&Config::default().with_base_url(base_url)).unwrap()
    }

    #[tokio::test]
    async fn test_identical_requests_hit_upstream_once() {
        let (url, hits) = local_server(vec![(200, OHLC_BODY), (200, OHLC_BODY)]).await;
        let client = local_client(&url);

        let first = client.fetch_ohlc("bitcoin", Window::Days(7)).await.unwrap();
        let second = client.fetch_ohlc("bitcoin", Window::Days(7)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_other_params_are_a_distinct_cache_entry() {
        let (url, hits) = local_server(vec![(200, OHLC_BODY), (200, OHLC_BODY)]).await;
        let client = local_client(&url);

        client.fetch_ohlc("bitcoin", Window::Days(7)).await.unwrap();
        client.fetch_ohlc("bitcoin", Window::Days(30)).await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_body_is_not_cached() {
        let (url, hits) = local_server(vec![(200, "[]"), (200, OHLC_BODY)]).await;
        let client = local_client(&url);

        let empty = client.fetch_ohlc("bitcoin", Window::Days(1)).await.unwrap();
        assert!(empty.is_empty());

        // La réponse vide n'est pas servie depuis le cache : nouvelle requête
        let rows = client.fetch_ohlc("bitcoin", Window::Days(1)).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        // La réponse non vide, elle, est en cache
        client.fetch_ohlc("bitcoin", Window::Days(1)).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_error_status_becomes_network_error() {
        let body = r#"{"status": {"error_code": 429, "error_message": "rate limited"}}"#;
        let (url, hits) = local_server(vec![(429, body), (200, OHLC_BODY)]).await;
        let client = local_client(&url);

        let err = client.fetch_ohlc("bitcoin", Window::Days(7)).await.unwrap_err();
        assert!(matches!(err, DashboardError::Network { status: 429, .. }));
        assert!(err.is_network());

        // Une erreur n'est jamais mise en cache
        let rows = client.fetch_ohlc("bitcoin", Window::Days(7)).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let (url, hits) = local_server(vec![(200, OHLC_BODY), (200, OHLC_BODY)]).await;
        let client = local_client(&url);

        client.fetch_ohlc("ethereum", Window::Days(7)).await.unwrap();
        client.clear_cache();
        client.fetch_ohlc("ethereum", Window::Days(7)).await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_markets_is_empty_result() {
        let (url, _hits) = local_server(vec![(200, "[]")]).await;
        let client = local_client(&url);

        let err = client.fetch_top_markets().await.unwrap_err();
        assert!(matches!(err, DashboardError::EmptyResult { .. }));
    }

    fn client() -> CoinGeckoClient {
        CoinGeckoClient::new(&Config::default()).unwrap()
    }

    #[test]
    fn test_ohlc_url() {
        let client = client();
        let url = client.build_url("/coins/bitcoin/ohlc", &client.series_params(Window::Days(7)));
        assert_eq!(
            url,
            "https://api.coingecko.com/api/v3/coins/bitcoin/ohlc?vs_currency=usd&days=7"
        );
    }

    #[test]
    fn test_market_chart_url_with_max() {
        let client = client();
        let url = client.build_url("/coins/ethereum/market_chart", &client.series_params(Window::Max));
        assert!(url.ends_with("/coins/ethereum/market_chart?vs_currency=usd&days=max"));
    }

    #[test]
    fn test_markets_url() {
        let client = client();
        let url = client.build_url("/coins/markets", &client.markets_params());
        assert!(url.ends_with(
            "/coins/markets?vs_currency=usd&order=market_cap_desc&per_page=5&page=1"
        ));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config = Config::default().with_base_url("http://localhost:8080/");
        let client = CoinGeckoClient::new(&config).unwrap();
        assert_eq!(
            client.build_url("/coins/markets", &client.markets_params()),
            "http://localhost:8080/coins/markets?vs_currency=usd&order=market_cap_desc&per_page=5&page=1"
        );
    }

    #[test]
    fn test_check_status() {
        assert!(check_status(StatusCode::OK, "u").is_ok());

        let err = check_status(StatusCode::TOO_MANY_REQUESTS, "u").unwrap_err();
        assert!(matches!(err, DashboardError::Network { status: 429, .. }));

        let err = check_status(StatusCode::NOT_FOUND, "u").unwrap_err();
        assert!(err.is_network());
    }

    #[test]
    fn test_parse_ohlc_body() {
        let rows: Vec<[f64; 5]> =
            parse_body("[[1704067200000, 1.0, 2.0, 0.5, 1.5]]", "/coins/x/ohlc").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][4], 1.5);

        let empty: Vec<[f64; 5]> = parse_body("[]", "/coins/x/ohlc").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_parse_market_chart_body() {
        let body = r#"{"prices": [[1704067200000, 42000.1]], "market_caps": [], "total_volumes": []}"#;
        let chart: MarketChartResponse = parse_body(body, "/coins/x/market_chart").unwrap();
        assert_eq!(chart.prices[0][1], 42000.1);
    }

    #[test]
    fn test_shape_mismatch_is_parse_error() {
        // Erreur renvoyée par l'API à la place des données
        let body = r#"{"error": "coin not found"}"#;
        let err = parse_body::<Vec<[f64; 5]>>(body, "/coins/x/ohlc").unwrap_err();
        assert!(matches!(err, DashboardError::Parse { .. }));

        let err = parse_body::<MarketChartResponse>(body, "/coins/x/market_chart").unwrap_err();
        assert!(matches!(err, DashboardError::Parse { .. }));

        // Lignes de longueur incorrecte
        let err = parse_body::<Vec<[f64; 5]>>("[[1, 2]]", "/coins/x/ohlc").unwrap_err();
        assert!(matches!(err, DashboardError::Parse { .. }));
    }
}
