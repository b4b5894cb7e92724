//! Source adapters: one `Analyzer` per kind of holding source.

pub mod cache;
pub mod http;
pub mod others;
pub mod sol;
pub mod utxo;

use crate::config::{Endpoints, GlobalConfig};
use crate::domain::models::WalletCoin;
use async_trait::async_trait;
use std::time::Duration;

pub use cache::RequestCache;
pub use http::{HttpFetcher, RetryPolicy};
pub use others::OthersAnalyzer;
pub use sol::SolAnalyzer;
pub use utxo::UtxoAnalyzer;

#[async_trait]
pub trait Analyzer: Send + Sync {
    fn analyzer_name(&self) -> &str;

    /// Syntax check of the configured addresses.
    async fn verify_configs(&self) -> bool {
        true
    }

    async fn load_portfolio(&self, cache: &RequestCache) -> anyhow::Result<Vec<WalletCoin>>;
}

/// Builds the adapters for one aggregation run from the portfolio configuration.
pub trait AnalyzerFactory: Send + Sync {
    fn build(&self, config: &GlobalConfig) -> Vec<Box<dyn Analyzer>>;
}

pub struct DefaultAnalyzers {
    pub http: HttpFetcher,
    pub endpoints: Endpoints,
    // delay between two requests of the same adapter
    pub pace: Duration,
}

impl DefaultAnalyzers {
    pub fn new(http: HttpFetcher, endpoints: Endpoints) -> Self {
        Self {
            http,
            endpoints,
            pace: Duration::from_secs(1),
        }
    }
}

impl AnalyzerFactory for DefaultAnalyzers {
    fn build(&self, config: &GlobalConfig) -> Vec<Box<dyn Analyzer>> {
        let mut analyzers: Vec<Box<dyn Analyzer>> = Vec::new();
        analyzers.push(Box::new(OthersAnalyzer::new(config.others.clone())));
        analyzers.push(Box::new(UtxoAnalyzer::btc(
            config.btc.clone(),
            self.http.clone(),
            self.endpoints.btc_api_url.clone(),
            self.pace,
        )));
        analyzers.push(Box::new(UtxoAnalyzer::doge(
            config.doge.clone(),
            self.http.clone(),
            self.endpoints.doge_api_url.clone(),
            self.pace,
        )));
        analyzers.push(Box::new(SolAnalyzer::new(
            config.sol.clone(),
            self.http.clone(),
            self.endpoints.sol_rpc_url.clone(),
            self.pace,
        )));
        analyzers
    }
}
