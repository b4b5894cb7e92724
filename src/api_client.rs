use crate::error::{AppError, RepoResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// USD price per requested symbol. Symbols the provider does not list map to 0.
    async fn query_coin_prices(&self, symbols: &[String]) -> RepoResult<HashMap<String, f64>>;
}

#[derive(Deserialize, Debug, Clone)]
struct ApiResponse {
    status: ApiStatus,
    #[serde(default)]
    data: Vec<CryptoData>,
}

#[derive(Deserialize, Debug, Clone)]
struct ApiStatus {
    error_code: i32,
    error_message: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
struct CryptoData {
    symbol: String,
    cmc_rank: u32,
    quote: QuoteData,
}

#[derive(Deserialize, Debug, Clone)]
struct QuoteData {
    #[serde(rename = "USD")]
    usd: PriceInfo,
}

#[derive(Deserialize, Debug, Clone)]
struct PriceInfo {
    price: Option<f64>,
}

/// CoinMarketCap listing-backed price lookup.
pub struct ReqwestPriceProvider {
    client: Client,
    url: String,
    api_key: String,
}

impl ReqwestPriceProvider {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    async fn fetch_latest(&self) -> Result<ApiResponse, reqwest::Error> {
        let response = self
            .client
            .get(&self.url)
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .header("Accept", "application/json")
            .query(&[("limit", "5000"), ("convert", "USD")])
            .send()
            .await?
            .error_for_status()?;
        response.json().await
    }
}

// Several listings can share a ticker; the best ranked one wins.
fn price_map(listings: Vec<CryptoData>, symbols: &[String]) -> HashMap<String, f64> {
    let mut best: HashMap<String, (u32, f64)> = HashMap::new();
    for c in listings {
        let symbol = c.symbol.to_uppercase();
        let price = c.quote.usd.price.unwrap_or(0.0);
        match best.get(&symbol) {
            Some((rank, _)) if *rank <= c.cmc_rank => {}
            _ => {
                best.insert(symbol, (c.cmc_rank, price));
            }
        }
    }
    symbols
        .iter()
        .map(|s| {
            let price = best.get(&s.to_uppercase()).map(|(_, p)| *p).unwrap_or(0.0);
            (s.clone(), price)
        })
        .collect()
}

#[async_trait]
impl PriceProvider for ReqwestPriceProvider {
    async fn query_coin_prices(&self, symbols: &[String]) -> RepoResult<HashMap<String, f64>> {
        let parsed = self
            .fetch_latest()
            .await
            .map_err(|e| AppError::PriceLookup(e.to_string()))?;
        if parsed.status.error_code != 0 {
            return Err(AppError::PriceLookup(
                parsed
                    .status
                    .error_message
                    .unwrap_or_else(|| format!("error code {}", parsed.status.error_code)),
            ));
        }
        info!(fetched = parsed.data.len(), requested = symbols.len(), "Fetched coin prices");
        let prices = price_map(parsed.data, symbols);
        debug!(prices = ?prices);
        Ok(prices)
    }
}

// Simple mock provider for tests and offline runs
pub struct MockPriceProvider {
    pub prices: HashMap<String, f64>,
    pub fail: bool,
}

impl MockPriceProvider {
    pub fn new(prices: &[(&str, f64)]) -> Self {
        Self {
            prices: prices.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            prices: HashMap::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl PriceProvider for MockPriceProvider {
    async fn query_coin_prices(&self, symbols: &[String]) -> RepoResult<HashMap<String, f64>> {
        if self.fail {
            return Err(AppError::PriceLookup("mock provider unavailable".to_string()));
        }
        Ok(symbols
            .iter()
            .map(|s| (s.clone(), self.prices.get(s).copied().unwrap_or(0.0)))
            .collect())
    }
}
