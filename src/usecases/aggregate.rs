use crate::api_client::PriceProvider;
use crate::config::GlobalConfig;
use crate::domain::models::{CoinValue, WalletCoin};
use crate::error::{AppError, RepoResult};
use crate::sources::{Analyzer, OthersAnalyzer, RequestCache};
use futures::future::try_join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info};

pub const STABLE_COINS: [&str; 6] = ["USDT", "USDC", "BUSD", "DAI", "TUSD", "PAX"];
const USDT: &str = "USDT";
const BTC: &str = "BTC";

/// Run every adapter concurrently against one shared request cache.
///
/// The first failure aborts the run and names the adapter; no partial
/// results are returned.
pub async fn load_portfolios(analyzers: &[Box<dyn Analyzer>]) -> RepoResult<Vec<WalletCoin>> {
    let cache = RequestCache::new();
    let cache = &cache;
    let lists = try_join_all(analyzers.iter().map(|analyzer| async move {
        let name = analyzer.analyzer_name();
        info!(analyzer = %name, "Loading portfolio");
        match analyzer.load_portfolio(cache).await {
            Ok(coins) => {
                info!(analyzer = %name, coins = coins.len(), "Loaded portfolio");
                Ok(coins)
            }
            Err(e) => {
                error!(analyzer = %name, error = %e, "Failed to load portfolio");
                Err(AppError::AdapterFailure {
                    analyzer: name.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }))
    .await?;
    Ok(lists.into_iter().flatten().collect())
}

/// Replace each wallet's stablecoin rows by one summed USDT row.
pub fn group_stablecoins(coins: Vec<WalletCoin>) -> Vec<WalletCoin> {
    let mut usd_by_wallet: Vec<(String, f64)> = Vec::new();
    let mut out = Vec::with_capacity(coins.len());
    for coin in coins {
        if !STABLE_COINS.contains(&coin.symbol.as_str()) {
            out.push(coin);
            continue;
        }
        match usd_by_wallet.iter_mut().find(|(w, _)| *w == coin.wallet) {
            Some((_, amount)) => *amount += coin.amount,
            None => usd_by_wallet.push((coin.wallet, coin.amount)),
        }
    }
    out.extend(
        usd_by_wallet
            .into_iter()
            .filter(|(_, amount)| *amount > 0.0)
            .map(|(wallet, amount)| WalletCoin::new(USDT, amount, wallet)),
    );
    out
}

/// Baseline charts compare against BTC, so a zero BTC row is added when no
/// source holds any.
pub fn ensure_btc(coins: &mut Vec<WalletCoin>) {
    if !coins.iter().any(|c| c.symbol == BTC) {
        coins.push(WalletCoin::new(BTC, 0.0, OthersAnalyzer::WALLET));
    }
}

/// Symbols to price: every coin without a source price, plus USDT and BTC.
pub fn symbols_to_price(coins: &[WalletCoin]) -> Vec<String> {
    let mut seen = HashSet::new();
    coins
        .iter()
        .filter(|c| c.price.is_none())
        .map(|c| c.symbol.as_str())
        .chain([USDT, BTC])
        .filter(|s| !s.is_empty() && seen.insert(s.to_string()))
        .map(|s| s.to_string())
        .collect()
}

pub fn calculate_total_value(coins: Vec<WalletCoin>, prices: &HashMap<String, f64>) -> Vec<CoinValue> {
    coins
        .into_iter()
        .map(|c| {
            let price = c
                .price
                .or_else(|| prices.get(&c.symbol).copied())
                .unwrap_or(0.0);
            CoinValue {
                value: c.amount * price,
                symbol: c.symbol,
                wallet: c.wallet,
                amount: c.amount,
                price,
            }
        })
        .collect()
}

pub struct Aggregator {
    pub price_provider: Arc<dyn PriceProvider>,
}

impl Aggregator {
    pub fn new(price_provider: Arc<dyn PriceProvider>) -> Self {
        Self { price_provider }
    }

    /// Valued holdings for "now", not yet stamped with a batch id.
    pub async fn query_coins_data(
        &self,
        config: &GlobalConfig,
        analyzers: &[Box<dyn Analyzer>],
    ) -> RepoResult<Vec<CoinValue>> {
        let assets = load_portfolios(analyzers).await?;
        let prices = self
            .price_provider
            .query_coin_prices(&symbols_to_price(&assets))
            .await?;

        let mut coins = if config.configs.group_usd {
            group_stablecoins(assets)
        } else {
            assets
        };
        ensure_btc(&mut coins);
        Ok(calculate_total_value(coins, &prices))
    }
}
